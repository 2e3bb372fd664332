//! Position-bound opaque handles.
//!
//! Tables, functions and userdata cannot be copied out of the VM. Reading one
//! produces an `OpaqueHandle` that remembers where the value sat, what type it
//! had and how the engine printed it. Identity is approximated by those three
//! facts: a handle is only trustworthy until the stack at or below its
//! position changes, and two distinct values with the same type and printed
//! form at the same position cannot be told apart.

use crate::error::{BridgeError, Result};
use crate::tag::TypeTag;
use std::fmt;

/// Identity of the stack (main thread or coroutine) a handle was captured on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StackId(pub usize);

/// A snapshot reference to a non-copyable VM value. Holds no ownership.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpaqueHandle {
    tag: TypeTag,
    display_name: String,
    position: i32,
    stack: StackId,
}

impl OpaqueHandle {
    pub fn new(tag: TypeTag, display_name: String, position: i32, stack: StackId) -> Self {
        OpaqueHandle {
            tag,
            display_name,
            position,
            stack,
        }
    }

    #[inline]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    #[inline]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Absolute stack position at capture time.
    #[inline]
    pub fn position(&self) -> i32 {
        self.position
    }

    #[inline]
    pub fn stack(&self) -> StackId {
        self.stack
    }

    /// Compare against what currently occupies the captured position.
    ///
    /// `current` is `None` when the position is no longer on the stack.
    pub fn check(&self, stack: StackId, current: Option<(TypeTag, &str)>) -> Result<()> {
        let expected = (self.tag, self.display_name.as_str());
        match current {
            Some(found) if stack == self.stack && found == expected => Ok(()),
            Some(found) if stack == self.stack => {
                Err(BridgeError::stale(self.position, expected, found))
            }
            Some(_) => Err(BridgeError::stale(
                self.position,
                expected,
                (TypeTag::None, "another stack"),
            )),
            None => Err(BridgeError::stale(
                self.position,
                expected,
                (TypeTag::None, "empty slot"),
            )),
        }
    }
}

impl fmt::Display for OpaqueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}
