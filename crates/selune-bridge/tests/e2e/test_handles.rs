use super::helpers::*;
use selune_bridge::{BridgeError, OpaqueHandle, ResultCount, State, TypeTag, Value};

/// Run `source` leaving its results on the stack; return them as read.
fn results_in_place(s: &mut State, source: &str) -> Vec<Value> {
    s.load(source.as_bytes()).unwrap();
    let n = s.call_in_place(&[], ResultCount::Variable).unwrap();
    s.read_batch(n, None).unwrap()
}

fn opaque(value: &Value) -> OpaqueHandle {
    value
        .as_opaque()
        .unwrap_or_else(|| panic!("{value:?} is not opaque"))
        .clone()
}

#[test]
fn test_handle_records_tag_and_position() {
    let mut s = state();
    s.push(1).unwrap();
    let r = results_in_place(&mut s, "return {}");
    let h = opaque(&r[0]);
    assert_eq!(h.tag(), TypeTag::Table);
    assert_eq!(h.position(), 2);
    assert_eq!(h.stack(), s.stack_id());
    assert!(h.display_name().starts_with("table: 0x"), "{}", h.display_name());
}

#[test]
fn test_valid_handle_pushes_same_value() {
    let mut s = state();
    let r = results_in_place(&mut s, "return {}");
    let h = opaque(&r[0]);
    s.push(h.clone()).unwrap();
    assert_eq!(s.top(), 2);
    let copy = s.read(-1).unwrap();
    assert_eq!(opaque(&copy).display_name(), h.display_name());
    assert_eq!(opaque(&copy).position(), 2);
}

#[test]
fn test_handle_passed_as_argument_is_identical() {
    let mut s = state();
    let r = results_in_place(&mut s, "t = {} return t");
    let h = opaque(&r[0]);
    s.load(b"local x = ... return rawequal(x, t)").unwrap();
    let eq = s.call(&[Value::Opaque(h)]).unwrap();
    assert_bool(&eq, 0, true);
}

#[test]
fn test_handle_stale_after_slot_replaced() {
    let mut s = state();
    let r = results_in_place(&mut s, "return {}, {}");
    let first = opaque(&r[0]);
    s.copy(2, 1).unwrap();
    let err = s.push(first).unwrap_err();
    assert!(matches!(err, BridgeError::StaleHandle { position: 1, .. }), "{err:?}");
    assert_eq!(s.top(), 2);
}

#[test]
fn test_handle_stale_after_type_change() {
    let mut s = state();
    let r = results_in_place(&mut s, "return function() end");
    let h = opaque(&r[0]);
    s.push("text").unwrap();
    s.replace(1).unwrap();
    match s.validate(&h) {
        Err(BridgeError::StaleHandle { expected, found, .. }) => {
            assert!(expected.starts_with("function"), "{expected}");
            assert!(found.starts_with("string"), "{found}");
        }
        other => panic!("expected stale handle, got {other:?}"),
    }
}

#[test]
fn test_handle_stale_after_pop() {
    let mut s = state();
    let r = results_in_place(&mut s, "return {}");
    let h = opaque(&r[0]);
    s.pop(1).unwrap();
    match s.push(h) {
        Err(BridgeError::StaleHandle { found, .. }) => assert!(found.contains("empty slot")),
        other => panic!("expected stale handle, got {other:?}"),
    }
}

#[test]
fn test_handle_survives_unrelated_pushes_above() {
    let mut s = state();
    let r = results_in_place(&mut s, "return {}");
    let h = opaque(&r[0]);
    push_strs(&mut s, &["x", "y"]);
    assert!(s.validate(&h).is_ok());
    s.push(h).unwrap();
    assert_eq!(s.type_of(-1), Ok(TypeTag::Table));
}

#[test]
fn test_handle_from_another_stack_is_stale() {
    let mut s = state();
    let r = results_in_place(&mut s, "return {}");
    let h = opaque(&r[0]);
    let thread = s.new_thread().unwrap();
    let mut co = thread.stack().unwrap();
    co.push(1).unwrap();
    match co.push(h) {
        Err(BridgeError::StaleHandle { found, .. }) => assert!(found.contains("another stack")),
        other => panic!("expected stale handle, got {other:?}"),
    }
}

#[test]
fn test_userdata_display_uses_type_name() {
    let mut s = state();
    let r = results_in_place(&mut s, "return io.stdout");
    let h = opaque(&r[0]);
    assert_eq!(h.tag(), TypeTag::Userdata);
    assert!(h.display_name().starts_with("FILE*: 0x"), "{}", h.display_name());
}

#[test]
fn test_display_name_ignores_tostring() {
    let mut s = state();
    let r = results_in_place(
        &mut s,
        "return setmetatable({}, { __tostring = function() error('never') end })",
    );
    assert!(opaque(&r[0]).display_name().starts_with("table: "));
}
