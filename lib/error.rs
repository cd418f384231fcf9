use thiserror::Error;

/// The ways the call stack, or the operand stack, of an abstract state can
/// disagree with the instruction being executed.
///
/// Every `StateMismatch` means the control-flow graph is malformed. It is
/// never an ambiguity the analysis could recover from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StateMismatch {
    /// A `Return` was executed with no call frame to return to.
    EmptyCallStack,
    /// A `Return` produced a different number of values than its call site
    /// expects.
    ReturnValueCount { expected: usize, actual: usize },
    /// An instruction needed more operands than the stack holds.
    StackUnderflow { needed: usize, available: usize },
    /// Two states reaching the same point have operand stacks of differing
    /// height.
    StackHeight { left: usize, right: usize },
    /// Two states reaching the same point disagree on their call stacks.
    CallStack,
}

impl std::fmt::Display for StateMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            StateMismatch::EmptyCallStack => write!(f, "return with an empty call stack"),
            StateMismatch::ReturnValueCount { expected, actual } => write!(
                f,
                "return produced {} values, call site expects {}",
                actual, expected
            ),
            StateMismatch::StackUnderflow { needed, available } => write!(
                f,
                "stack underflow, needed {} values, {} available",
                needed, available
            ),
            StateMismatch::StackHeight { left, right } => {
                write!(f, "stack heights {} and {} do not agree", left, right)
            }
            StateMismatch::CallStack => write!(f, "call stacks do not agree"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Control flow graph has no instructions")]
    EmptyControlFlowGraph,
    #[error("Instruction at offset {offset} jumps to {target}, which does not exist")]
    DanglingJumpTarget { offset: usize, target: usize },
    #[error("Instruction at offset {0} falls off the end of the control flow graph")]
    FallsOffEnd(usize),
    #[error("Instruction offset {actual} does not match its position {expected}")]
    OffsetMismatch { expected: usize, actual: usize },
    #[error("State mismatch at offset {offset}: {mismatch}")]
    StateMismatch {
        offset: usize,
        mismatch: StateMismatch,
    },
    #[error("No instruction at offset {0}")]
    InstructionNotFound(usize),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// The offset of the malformed instruction, if this error describes a
    /// malformed control-flow graph.
    pub fn offset(&self) -> Option<usize> {
        match *self {
            Error::DanglingJumpTarget { offset, .. }
            | Error::FallsOffEnd(offset)
            | Error::StateMismatch { offset, .. }
            | Error::InstructionNotFound(offset) => Some(offset),
            Error::OffsetMismatch { actual, .. } => Some(actual),
            Error::EmptyControlFlowGraph
            | Error::Json(_)
            | Error::Io(_)
            | Error::Custom(_) => None,
        }
    }

    /// Returns true if this error means the control-flow graph is malformed.
    pub fn is_malformed(&self) -> bool {
        matches!(
            *self,
            Error::EmptyControlFlowGraph
                | Error::DanglingJumpTarget { .. }
                | Error::FallsOffEnd(_)
                | Error::OffsetMismatch { .. }
                | Error::StateMismatch { .. }
                | Error::InstructionNotFound(_)
        )
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Error {
        Error::Custom(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::Custom(s)
    }
}
