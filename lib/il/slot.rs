use serde::{Deserialize, Serialize};
use std::fmt;

/// A symbolic storage location tracked by the analysis.
///
/// Slots are ordered so abstract states iterate them deterministically.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Slot {
    /// A local variable, or a parameter.
    Local(String),
    /// A stack temporary the front end chose to materialize.
    Temp(usize),
    /// A field access fingerprint, `qualifier.name`.
    Field { qualifier: String, name: String },
}

impl Slot {
    pub fn local<S: Into<String>>(name: S) -> Slot {
        Slot::Local(name.into())
    }

    pub fn field<Q: Into<String>, N: Into<String>>(qualifier: Q, name: N) -> Slot {
        Slot::Field {
            qualifier: qualifier.into(),
            name: name.into(),
        }
    }

    /// Returns true if this slot is a field access, and must be flushed when
    /// the heap may have changed.
    pub fn is_field(&self) -> bool {
        matches!(*self, Slot::Field { .. })
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Slot::Local(ref name) => write!(f, "{}", name),
            Slot::Temp(index) => write!(f, "$t{}", index),
            Slot::Field {
                ref qualifier,
                ref name,
            } => write!(f, "{}.{}", qualifier, name),
        }
    }
}
