use crate::il::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A binary operator over the two values on top of the operand stack.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Returns true if this operator compares its operands and produces a
    /// boolean.
    pub fn is_comparison(&self) -> bool {
        matches!(
            *self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    /// The comparison which holds exactly when this comparison does not.
    pub fn negate(&self) -> Option<BinaryOp> {
        Some(match *self {
            BinaryOp::Eq => BinaryOp::Ne,
            BinaryOp::Ne => BinaryOp::Eq,
            BinaryOp::Lt => BinaryOp::Ge,
            BinaryOp::Le => BinaryOp::Gt,
            BinaryOp::Gt => BinaryOp::Le,
            BinaryOp::Ge => BinaryOp::Lt,
            _ => return None,
        })
    }

    /// The comparison which holds with the operands swapped, `a < b` becomes
    /// `b > a`.
    pub fn flip(&self) -> Option<BinaryOp> {
        Some(match *self {
            BinaryOp::Eq => BinaryOp::Eq,
            BinaryOp::Ne => BinaryOp::Ne,
            BinaryOp::Lt => BinaryOp::Gt,
            BinaryOp::Le => BinaryOp::Ge,
            BinaryOp::Gt => BinaryOp::Lt,
            BinaryOp::Ge => BinaryOp::Le,
            _ => return None,
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}

/// A unary operator over the value on top of the operand stack.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Boolean negation.
    Not,
    /// Bitwise complement.
    BitNot,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            UnaryOp::Neg => write!(f, "neg"),
            UnaryOp::Not => write!(f, "not"),
            UnaryOp::BitNot => write!(f, "bitnot"),
        }
    }
}

/// An IL Operation transforms the abstract state.
///
/// Values are passed between operations on an operand stack. Every operation
/// except `Goto`, `Return` and `Exit` falls through to the next offset.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Operation {
    /// Push a constant.
    Push { constant: Constant },
    /// Push a value about which nothing is known.
    PushUnknown,
    /// Push a freshly allocated, non-null object of the given type.
    New { type_name: String },
    /// Push the value held in a slot.
    Load { slot: Slot },
    /// Pop a value and bind it to a slot.
    Store { slot: Slot },
    /// Discard the value on top of the stack.
    Pop,
    /// Duplicate the value on top of the stack.
    Dup,
    /// Pop two values, and push the result of the operator.
    Binary { op: BinaryOp },
    /// Pop a value, and push the result of the operator.
    Unary { op: UnaryOp },
    /// Continue at `target`.
    Goto { target: usize },
    /// Pop a condition. Continue at `target` if it equals `jump_if`, else
    /// fall through.
    ConditionalGoto { target: usize, jump_if: bool },
    /// The value on top of the stack is dereferenced, and must not be null.
    Dereference,
    /// Forget everything known about a slot, for example a field written
    /// through an alias.
    Flush { slot: Slot },
    /// Call a method whose body is not available. Pops `arguments` values,
    /// and pushes an unknown result if `returns` is set. Unless the method is
    /// `pure`, every field slot is flushed.
    Invoke {
        arguments: usize,
        returns: bool,
        pure: bool,
    },
    /// Call an inlined method or closure whose body begins at `entry`.
    ///
    /// One argument is popped for each of `parameters`, and bound to that
    /// slot in the callee. The caller's values of `captures` are visible to
    /// the callee, and written back when it returns. The callee must return
    /// exactly `results` values.
    Call {
        entry: usize,
        parameters: Vec<Slot>,
        captures: Vec<Slot>,
        results: usize,
    },
    /// Return `values` values from an inlined call.
    Return { values: usize },
    /// Leave the method being analyzed.
    Exit,
    /// Do nothing.
    Nop,
    /// An instruction the analysis does not model.
    ///
    /// Pops `pops` values and pushes `pushes` unknown values. If `writes` is
    /// `None`, every slot may have been written.
    Unsupported {
        name: String,
        pops: usize,
        pushes: usize,
        writes: Option<Vec<Slot>>,
    },
}

impl Operation {
    /// The explicit targets this operation may transfer control to.
    pub fn targets(&self) -> Vec<usize> {
        match *self {
            Operation::Goto { target } | Operation::ConditionalGoto { target, .. } => vec![target],
            Operation::Call { entry, .. } => vec![entry],
            _ => Vec::new(),
        }
    }

    /// Returns true if control may reach the next offset directly after this
    /// operation. For `Call`, control reaches the next offset once the callee
    /// returns.
    pub fn falls_through(&self) -> bool {
        !matches!(
            *self,
            Operation::Goto { .. } | Operation::Return { .. } | Operation::Exit
        )
    }

    /// Returns true if this operation is a conditional branch.
    pub fn is_conditional_branch(&self) -> bool {
        matches!(*self, Operation::ConditionalGoto { .. })
    }

    /// The slots written by this operation. Returns `None` if this operation
    /// may write any slot.
    pub fn slots_written(&self) -> Option<Vec<&Slot>> {
        match *self {
            Operation::Store { ref slot } | Operation::Flush { ref slot } => Some(vec![slot]),
            Operation::Call { ref captures, .. } => Some(captures.iter().collect()),
            Operation::Unsupported { ref writes, .. } => {
                writes.as_ref().map(|writes| writes.iter().collect())
            }
            Operation::Invoke { pure: false, .. } => None,
            _ => Some(Vec::new()),
        }
    }

}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Operation::Push { ref constant } => write!(f, "push {}", constant),
            Operation::PushUnknown => write!(f, "push ?"),
            Operation::New { ref type_name } => write!(f, "new {}", type_name),
            Operation::Load { ref slot } => write!(f, "load {}", slot),
            Operation::Store { ref slot } => write!(f, "store {}", slot),
            Operation::Pop => write!(f, "pop"),
            Operation::Dup => write!(f, "dup"),
            Operation::Binary { op } => write!(f, "binary {}", op),
            Operation::Unary { op } => write!(f, "unary {}", op),
            Operation::Goto { target } => write!(f, "goto {}", target),
            Operation::ConditionalGoto { target, jump_if } => {
                write!(f, "if {} goto {}", jump_if, target)
            }
            Operation::Dereference => write!(f, "deref"),
            Operation::Flush { ref slot } => write!(f, "flush {}", slot),
            Operation::Invoke {
                arguments,
                returns,
                pure,
            } => write!(
                f,
                "invoke({}){}{}",
                arguments,
                if returns { " -> ?" } else { "" },
                if pure { " pure" } else { "" }
            ),
            Operation::Call {
                entry,
                ref parameters,
                ref captures,
                results,
            } => write!(
                f,
                "call {} ({}) [{}] -> {}",
                entry,
                parameters
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<String>>()
                    .join(", "),
                captures
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<String>>()
                    .join(", "),
                results
            ),
            Operation::Return { values } => write!(f, "return {}", values),
            Operation::Exit => write!(f, "exit"),
            Operation::Nop => write!(f, "nop"),
            Operation::Unsupported {
                ref name,
                pops,
                pushes,
                ..
            } => write!(f, "unsupported {} ({} -> {})", name, pops, pushes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il;

    #[test]
    fn slots_written() {
        let store = Operation::Store {
            slot: il::local("x"),
        };
        assert_eq!(store.slots_written(), Some(vec![&il::local("x")]));

        let opaque = Operation::Invoke {
            arguments: 0,
            returns: false,
            pure: false,
        };
        assert_eq!(opaque.slots_written(), None);

        let unsupported = Operation::Unsupported {
            name: "monitorenter".to_string(),
            pops: 1,
            pushes: 0,
            writes: None,
        };
        assert_eq!(unsupported.slots_written(), None);
        assert_eq!(Operation::Nop.slots_written(), Some(Vec::new()));
    }

    #[test]
    fn comparisons_negate_and_flip() {
        assert_eq!(BinaryOp::Lt.negate(), Some(BinaryOp::Ge));
        assert_eq!(BinaryOp::Lt.flip(), Some(BinaryOp::Gt));
        assert_eq!(BinaryOp::Add.negate(), None);
    }
}
