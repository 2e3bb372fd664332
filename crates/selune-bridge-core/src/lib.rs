//! Selune bridge core: the engine-independent half of the host bridge.
//!
//! Nothing in this crate touches the interpreter. It holds the error taxonomy,
//! the stack index rules, the VM type tags and the data carried by opaque
//! handles, so the FFI side can stay a thin layer over these types.

pub mod error;
pub mod handle;
pub mod index;
pub mod tag;
pub mod text;

pub use error::{BridgeError, Result};
pub use handle::{OpaqueHandle, StackId};
pub use index::resolve;
pub use tag::TypeTag;
pub use text::Text;
