use super::helpers::*;
use proptest::prelude::*;
use selune_bridge::{BridgeError, State, TypeTag, Value};

// ---- Index resolution ----

#[test]
fn test_index_zero_is_rejected() {
    let mut s = state();
    s.push(1).unwrap();
    assert_eq!(s.read(0), Err(BridgeError::Index { index: 0, depth: 1 }));
}

#[test]
fn test_index_beyond_depth_is_rejected() {
    let mut s = state();
    push_strs(&mut s, &["a", "b"]);
    assert_eq!(s.read(3), Err(BridgeError::Index { index: 3, depth: 2 }));
    assert_eq!(s.read(-3), Err(BridgeError::Index { index: -3, depth: 2 }));
    assert!(s.read(-3).unwrap_err().is_programming_error());
}

#[test]
fn test_negative_and_positive_agree() {
    let mut s = state();
    push_strs(&mut s, &["a", "b", "c"]);
    assert_eq!(s.read(-1).unwrap(), s.read(3).unwrap());
    assert_eq!(s.read(-3).unwrap(), s.read(1).unwrap());
    assert_eq!(s.resolve(-2), Ok(2));
}

#[test]
fn test_empty_stack_rejects_every_index() {
    let mut s = state();
    assert_eq!(s.top(), 0);
    assert!(s.read(1).is_err());
    assert!(s.read(-1).is_err());
    assert!(s.remove(-1).is_err());
    assert!(s.duplicate(1).is_err());
}

// ---- Rotation ----

#[test]
fn test_rotate_scenario() {
    let mut s = state();
    push_strs(&mut s, &["a", "b", "c", "d"]);
    s.rotate(-4, 1).unwrap();
    assert_eq!(stack_strs(&mut s), ["d", "a", "b", "c"]);
    s.rotate(-4, -3).unwrap();
    assert_eq!(stack_strs(&mut s), ["c", "d", "a", "b"]);
}

#[test]
fn test_rotate_partial_window() {
    let mut s = state();
    push_strs(&mut s, &["a", "b", "c", "d"]);
    s.rotate(2, 1).unwrap();
    assert_eq!(stack_strs(&mut s), ["a", "d", "b", "c"]);
}

#[test]
fn test_rotate_by_window_size_is_identity() {
    let mut s = state();
    push_strs(&mut s, &["a", "b", "c"]);
    s.rotate(1, 3).unwrap();
    s.rotate(1, -6).unwrap();
    assert_eq!(stack_strs(&mut s), ["a", "b", "c"]);
}

proptest! {
    #[test]
    fn prop_rotate_then_unrotate_restores(
        depth in 1i32..10,
        window in 1i32..10,
        amount in -25i32..25,
    ) {
        let window = window.min(depth);
        let mut s = State::new(false).unwrap();
        for i in 0..depth {
            s.push(i64::from(i)).unwrap();
        }
        let before = s.read_batch(depth, Some(1)).unwrap();
        s.rotate(-window, amount).unwrap();
        s.rotate(-window, -amount).unwrap();
        prop_assert_eq!(s.read_batch(depth, Some(1)).unwrap(), before);
    }
}

// ---- Top ----

#[test]
fn test_set_top_grows_with_nil() {
    let mut s = state();
    s.push(true).unwrap();
    s.set_top(3).unwrap();
    assert_eq!(s.top(), 3);
    assert_eq!(s.type_of(2), Ok(TypeTag::Nil));
    assert_eq!(s.read(3), Ok(Value::Nil));
}

#[test]
fn test_set_top_negative_keeps_that_slot() {
    let mut s = state();
    push_strs(&mut s, &["a", "b", "c"]);
    s.set_top(-2).unwrap();
    assert_eq!(stack_strs(&mut s), ["a", "b"]);
    s.set_top(0).unwrap();
    assert_eq!(s.top(), 0);
}

// ---- Remove / duplicate / replace / copy / pop ----

#[test]
fn test_remove_shifts_down() {
    let mut s = state();
    push_strs(&mut s, &["a", "b", "c"]);
    s.remove(1).unwrap();
    assert_eq!(stack_strs(&mut s), ["b", "c"]);
    s.remove(-1).unwrap();
    assert_eq!(stack_strs(&mut s), ["b"]);
}

#[test]
fn test_duplicate_pushes_copy() {
    let mut s = state();
    push_strs(&mut s, &["a", "b"]);
    s.duplicate(1).unwrap();
    assert_eq!(stack_strs(&mut s), ["a", "b", "a"]);
}

#[test]
fn test_replace_pops_into_slot() {
    let mut s = state();
    push_strs(&mut s, &["a", "b", "c", "z"]);
    s.replace(2).unwrap();
    assert_eq!(stack_strs(&mut s), ["a", "z", "c"]);
}

#[test]
fn test_copy_overwrites_target() {
    let mut s = state();
    push_strs(&mut s, &["a", "b", "c"]);
    s.copy(-1, 1).unwrap();
    assert_eq!(stack_strs(&mut s), ["c", "b", "c"]);
}

#[test]
fn test_pop_more_than_depth_fails_without_change() {
    let mut s = state();
    push_strs(&mut s, &["a", "b"]);
    assert!(matches!(s.pop(3), Err(BridgeError::Index { .. })));
    assert_eq!(s.top(), 2);
    s.pop(2).unwrap();
    assert_eq!(s.top(), 0);
}

#[test]
fn test_check_stack_reserves_room() {
    let mut s = state();
    s.check_stack(500).unwrap();
    for i in 0..500 {
        s.push(i).unwrap();
    }
    assert_eq!(s.top(), 500);
}

// ---- Globals ----

#[test]
fn test_globals_round_trip() {
    let mut s = state();
    s.push("hello").unwrap();
    s.set_global("greeting").unwrap();
    assert_eq!(s.top(), 0);
    let results = run_on(&mut s, "return greeting");
    assert_str(&results, 0, "hello");
    assert_eq!(s.get_global("greeting"), Ok(Value::from("hello")));
    assert_eq!(s.top(), 1);
    assert_eq!(s.get_global("missing"), Ok(Value::Nil));
}

#[test]
fn test_set_global_on_empty_stack_fails() {
    let mut s = state();
    assert!(matches!(s.set_global("x"), Err(BridgeError::Index { .. })));
}
