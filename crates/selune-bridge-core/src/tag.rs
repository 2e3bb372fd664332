//! VM type tags.

use std::fmt;

/// The type of a stack slot as the engine reports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// No value (index past the top of a valid frame).
    None,
    Nil,
    Boolean,
    LightUserdata,
    Number,
    String,
    Table,
    Function,
    Userdata,
    Thread,
}

impl TypeTag {
    /// Convert from the engine's numeric type code.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => TypeTag::Nil,
            1 => TypeTag::Boolean,
            2 => TypeTag::LightUserdata,
            3 => TypeTag::Number,
            4 => TypeTag::String,
            5 => TypeTag::Table,
            6 => TypeTag::Function,
            7 => TypeTag::Userdata,
            8 => TypeTag::Thread,
            _ => TypeTag::None,
        }
    }

    /// The Lua-visible type name, as `type()` reports it.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::None => "no value",
            TypeTag::Nil => "nil",
            TypeTag::Boolean => "boolean",
            TypeTag::LightUserdata | TypeTag::Userdata => "userdata",
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Table => "table",
            TypeTag::Function => "function",
            TypeTag::Thread => "thread",
        }
    }

    /// Values of these types cannot be copied out and are read as handles.
    pub fn is_opaque(self) -> bool {
        matches!(
            self,
            TypeTag::Table | TypeTag::Function | TypeTag::Userdata | TypeTag::LightUserdata
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
