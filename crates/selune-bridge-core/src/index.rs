//! Stack index resolution.
//!
//! Positive indices count from the bottom of the stack (1 = first pushed).
//! Negative indices count from the top (-1 = top). Zero is never valid.

use crate::error::{BridgeError, Result};

/// Resolve `index` against a stack of `depth` values to an absolute 1-based
/// position.
pub fn resolve(index: i32, depth: i32) -> Result<i32> {
    let absolute = if index < 0 {
        depth.saturating_add(index).saturating_add(1)
    } else {
        index
    };
    if index == 0 || absolute < 1 || absolute > depth {
        return Err(BridgeError::Index { index, depth });
    }
    Ok(absolute)
}

/// Resolve the start of a window of `count` values ending at the top.
///
/// `start` defaults to `-count`. The whole window `[start, start + count)` must
/// fit inside the stack.
pub fn resolve_window(count: i32, start: Option<i32>, depth: i32) -> Result<i32> {
    if count < 0 {
        return Err(BridgeError::Index {
            index: start.unwrap_or(count),
            depth,
        });
    }
    let first = resolve(start.unwrap_or(-count), depth)?;
    match (first - 1).checked_add(count) {
        Some(last) if last <= depth => Ok(first),
        _ => Err(BridgeError::Index {
            index: first.saturating_add(count).saturating_sub(1),
            depth,
        }),
    }
}
