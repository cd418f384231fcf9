use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete value which may be pushed by an instruction.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Constant {
    Int(i64),
    Bool(bool),
    Str(String),
    Null,
}

impl Constant {
    /// Get the value of this constant if it is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Constant::Bool(value) => Some(value),
            Constant::Int(_) | Constant::Str(_) | Constant::Null => None,
        }
    }
}

impl From<i64> for Constant {
    fn from(value: i64) -> Constant {
        Constant::Int(value)
    }
}

impl From<i32> for Constant {
    fn from(value: i32) -> Constant {
        Constant::Int(value as i64)
    }
}

impl From<bool> for Constant {
    fn from(value: bool) -> Constant {
        Constant::Bool(value)
    }
}

impl From<&str> for Constant {
    fn from(value: &str) -> Constant {
        Constant::Str(value.to_string())
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Constant::Int(value) => write!(f, "{}", value),
            Constant::Bool(value) => write!(f, "{}", value),
            Constant::Str(ref value) => write!(f, "{:?}", value),
            Constant::Null => write!(f, "null"),
        }
    }
}
