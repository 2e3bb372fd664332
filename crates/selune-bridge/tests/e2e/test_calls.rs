use super::helpers::*;
use selune_bridge::{BridgeError, Config, LoadMode, LoadStatus, ResultCount, State, TypeTag, Value};

// ---- load ----

#[test]
fn test_load_pushes_one_function() {
    let mut s = state();
    s.load(b"return 1").unwrap();
    assert_eq!(s.top(), 1);
    assert_eq!(s.type_of(-1), Ok(TypeTag::Function));
}

#[test]
fn test_load_syntax_error_is_compile_error() {
    let mut s = state();
    s.push(0).unwrap();
    match s.load(b"return +") {
        Err(BridgeError::Compile(msg)) => assert!(msg.contains("chunk:1:"), "{msg}"),
        other => panic!("expected compile error, got {other:?}"),
    }
    assert_eq!(s.top(), 1);
}

#[test]
fn test_fixed_text_chunk_returns_one_value() {
    let mut s = state();
    s.load(b"return 'hello from the chunk'").unwrap();
    let r = s.call(&[]).unwrap();
    assert_eq!(r, vec![Value::from("hello from the chunk")]);
    assert_eq!(s.top(), 0);
}

#[test]
fn test_try_load_leaves_raw_outcome() {
    let mut s = state();
    assert_eq!(s.try_load(b"return 1"), Ok(LoadStatus::Ok));
    assert_eq!(s.type_of(-1), Ok(TypeTag::Function));
    assert_eq!(s.try_load(b"local = 3"), Ok(LoadStatus::Syntax));
    assert_eq!(s.top(), 2);
    assert_eq!(s.type_of(-1), Ok(TypeTag::String));
}

#[test]
fn test_load_named_uses_name_in_messages() {
    let mut s = state();
    match s.load_named(b"x = = 1", "=config.lua", LoadMode::Text) {
        Err(BridgeError::Compile(msg)) => assert!(msg.starts_with("config.lua:1:"), "{msg}"),
        other => panic!("expected compile error, got {other:?}"),
    }
}

#[test]
fn test_load_named_rejects_nul_in_name() {
    let mut s = state();
    assert!(matches!(
        s.load_named(b"return 1", "bad\0name", LoadMode::Any),
        Err(BridgeError::UnsupportedValue(_))
    ));
    assert_eq!(s.top(), 0);
}

#[test]
fn test_text_mode_rejects_binary_chunk() {
    let mut s = state();
    let dumped = run_on(&mut s, "return string.dump(function() return 5 end)");
    let bytes = dumped[0].as_text().unwrap().as_bytes().to_vec();
    assert!(matches!(
        s.load_named(&bytes, "=dumped", LoadMode::Text),
        Err(BridgeError::Compile(_))
    ));
    s.load_named(&bytes, "=dumped", LoadMode::Binary).unwrap();
    assert_eq!(s.call(&[]), Ok(vec![Value::Integer(5)]));
}

#[test]
fn test_config_chunk_name() {
    let mut s = State::with_config(Config::default().chunk_name("=boot")).unwrap();
    let msg = match s.load(b"error('stop')").and_then(|_| s.call(&[])) {
        Err(BridgeError::Call(msg)) => msg,
        other => panic!("expected call error, got {other:?}"),
    };
    assert_eq!(msg, "boot:1: stop");
}

// ---- call ----

#[test]
fn test_varargs_loop_keeps_callable() {
    let mut s = state();
    s.load(b"return ...").unwrap();
    assert_eq!(s.top(), 1);
    let rounds: [&[Value]; 3] = [
        &[Value::Integer(1), Value::Integer(2)],
        &[Value::Integer(9)],
        &[],
    ];
    for args in rounds {
        s.duplicate(-1).unwrap();
        let r = s.call(args).unwrap();
        assert_eq!(r, args);
        assert_eq!(s.top(), 1);
    }
}

#[test]
fn test_call_consumes_callable() {
    let mut s = state();
    s.push("below").unwrap();
    s.load(b"return 1, 2, 3").unwrap();
    let r = s.call(&[]).unwrap();
    assert_eq!(r.len(), 3);
    assert_eq!(s.top(), 1);
    assert_eq!(s.read(1), Ok(Value::from("below")));
}

#[test]
fn test_fixed_result_count_pads_and_truncates() {
    let mut s = state();
    s.load(b"return 1, 2, 3").unwrap();
    s.duplicate(-1).unwrap();
    assert_eq!(
        s.call_with(&[], ResultCount::Fixed(2)),
        Ok(vec![Value::Integer(1), Value::Integer(2)])
    );
    let r = s.call_with(&[], ResultCount::Fixed(5)).unwrap();
    assert_eq!(r.len(), 5);
    assert_int(&r, 2, 3);
    assert_nil(&r, 3);
    assert_nil(&r, 4);
    assert_eq!(s.top(), 0);
}

#[test]
fn test_call_error_leaves_stack_consistent() {
    let mut s = state();
    s.push(1).unwrap();
    s.load(b"local a = ... error('boom: ' .. a)").unwrap();
    match s.call(&[Value::from("x")]) {
        Err(BridgeError::Call(msg)) => assert_eq!(msg, "chunk:1: boom: x"),
        other => panic!("expected call error, got {other:?}"),
    }
    assert_eq!(s.top(), 1);
    // Further operations still work.
    s.load(b"return 'ok'").unwrap();
    assert_eq!(s.call(&[]), Ok(vec![Value::from("ok")]));
}

#[test]
fn test_non_string_error_values() {
    assert_eq!(run_err("error(42)"), "42");
    let msg = run_err("error({})");
    assert!(msg.starts_with("(error object is a table value: table: 0x"), "{msg}");
}

#[test]
fn test_calling_non_function_is_call_error() {
    let mut s = state();
    s.push(3).unwrap();
    match s.call(&[]) {
        Err(BridgeError::Call(msg)) => assert!(msg.contains("attempt to call"), "{msg}"),
        other => panic!("expected call error, got {other:?}"),
    }
    assert_eq!(s.top(), 0);
}

#[test]
fn test_call_on_empty_stack_is_index_error() {
    let mut s = state();
    assert_eq!(s.call(&[]), Err(BridgeError::Index { index: -1, depth: 0 }));
}

#[test]
fn test_call_in_place_keeps_results() {
    let mut s = state();
    s.load(b"return {}, 'x'").unwrap();
    let n = s.call_in_place(&[], ResultCount::Variable).unwrap();
    assert_eq!(n, 2);
    assert_eq!(s.top(), 2);
    let table = s.read(1).unwrap();
    s.load(b"local t = ... return type(t)").unwrap();
    assert_eq!(s.call(&[table]), Ok(vec![Value::from("table")]));
}

#[test]
fn test_arguments_pushed_after_stale_handle_fail() {
    let mut s = state();
    s.load(b"return {}").unwrap();
    s.call_in_place(&[], ResultCount::Fixed(1)).unwrap();
    let stale = s.read(1).unwrap();
    s.set_top(0).unwrap();
    s.push(0).unwrap();
    s.load(b"return ...").unwrap();
    assert!(matches!(
        s.call(&[Value::Integer(1), stale]),
        Err(BridgeError::StaleHandle { .. })
    ));
    // The callable and the pushed arguments are gone.
    assert_eq!(s.top(), 1);
}

// ---- len ----

#[test]
fn test_len_of_string_and_table() {
    let mut s = state();
    s.push("abcd").unwrap();
    assert_eq!(s.len(-1), Ok(Value::Integer(4)));
    s.load(b"return {1, 2, 3}").unwrap();
    s.call_in_place(&[], ResultCount::Fixed(1)).unwrap();
    assert_eq!(s.len(-1), Ok(Value::Integer(3)));
    assert_eq!(s.raw_len(-1), Ok(3));
    assert_eq!(s.top(), 2);
}

#[test]
fn test_len_honours_metamethod() {
    let mut s = state();
    s.load(b"return setmetatable({}, { __len = function() return 7 end })")
        .unwrap();
    s.call_in_place(&[], ResultCount::Fixed(1)).unwrap();
    assert_eq!(s.len(1), Ok(Value::Integer(7)));
    assert_eq!(s.raw_len(1), Ok(0));
    assert_eq!(s.top(), 1);
}

#[test]
fn test_len_failure_is_call_error() {
    let mut s = state();
    s.push(true).unwrap();
    assert!(matches!(s.len(-1), Err(BridgeError::Call(_))));
    assert_eq!(s.top(), 1);
}
