#![no_main]

use libfuzzer_sys::fuzz_target;
use selune_bridge::{LoadMode, State};

fuzz_target!(|data: &[u8]| {
    let Ok(mut state) = State::new(false) else {
        return;
    };
    // Any input may fail to load; a failure must leave the stack empty.
    match state.load_named(data, "=fuzz", LoadMode::Text) {
        Ok(()) => assert_eq!(state.top(), 1),
        Err(_) => assert_eq!(state.top(), 0),
    }
});
