//! Host-side values exchanged with the VM stack.

use crate::function::HostFunction;
use crate::thread::ThreadHandle;
use selune_bridge_core::{OpaqueHandle, Text};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// A value crossing the bridge.
///
/// Primitive kinds are copied in both directions. `Function`, `Foreign` and
/// `Thread` only travel host-to-VM (plus threads coming back as live
/// handles); everything the VM cannot hand over by value comes back as
/// `Opaque`.
#[derive(Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(Text),
    /// A host callable, installed as a native function when pushed.
    Function(HostFunction),
    /// A coroutine of this (or another) VM instance.
    Thread(ThreadHandle),
    /// A table, function or userdata left inside the VM.
    Opaque(OpaqueHandle),
    /// Any other host value, carried by reference.
    Foreign(Foreign),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer payload. Floats are not coerced, even whole-valued ones.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Value::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_text().and_then(Text::to_str)
    }

    pub fn as_opaque(&self) -> Option<&OpaqueHandle> {
        match self {
            Value::Opaque(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_thread(&self) -> Option<&ThreadHandle> {
        match self {
            Value::Thread(t) => Some(t),
            _ => None,
        }
    }

    /// Lua truthiness: only nil and false are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "string",
            Value::Function(_) => "host function",
            Value::Thread(_) => "thread",
            Value::Opaque(h) => h.tag().name(),
            Value::Foreign(_) => "foreign",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Thread(a), Value::Thread(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a == b,
            (Value::Foreign(a), Value::Foreign(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Text(t) => write!(f, "{t:?}"),
            Value::Function(func) => write!(f, "{func:?}"),
            Value::Thread(t) => write!(f, "{t:?}"),
            Value::Opaque(h) => write!(f, "<{}>", h.display_name()),
            Value::Foreign(x) => write!(f, "{x:?}"),
        }
    }
}

/// An arbitrary host value parked in a VM userdata slot.
///
/// The VM can move it around but not look inside; the host gets the same
/// allocation back and compares by reference.
#[derive(Clone)]
pub struct Foreign(pub(crate) Rc<dyn Any>);

impl Foreign {
    pub fn new<T: Any>(value: T) -> Self {
        Foreign(Rc::new(value))
    }

    pub fn from_rc(value: Rc<dyn Any>) -> Self {
        Foreign(value)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &Foreign) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Foreign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "foreign: {:p}", Rc::as_ptr(&self.0) as *const ())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(Text::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(Text::from(s))
    }
}

impl From<Text> for Value {
    fn from(t: Text) -> Self {
        Value::Text(t)
    }
}

impl From<HostFunction> for Value {
    fn from(f: HostFunction) -> Self {
        Value::Function(f)
    }
}

impl From<ThreadHandle> for Value {
    fn from(t: ThreadHandle) -> Self {
        Value::Thread(t)
    }
}

impl From<OpaqueHandle> for Value {
    fn from(h: OpaqueHandle) -> Self {
        Value::Opaque(h)
    }
}

impl From<Foreign> for Value {
    fn from(x: Foreign) -> Self {
        Value::Foreign(x)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}
