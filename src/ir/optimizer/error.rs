//! Fatal-error taxonomy for the constant-propagation passes.
//!
//! Per the crate's error handling design, most irregularities (unsupported opcodes,
//! division by zero, unknown environment keys) degrade silently to [`super::lattice::Lattice::Bottom`]
//! and never reach this type. `PassError` is reserved for malformed IR that the pass
//! is not expected to recover from — a caller/programmer error, not an analysis result.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PassError {
    #[error("block `{0}` referenced as a branch target but not present in the function")]
    MissingBlock(String),

    #[error("phi node in block `{0}` has no incoming edges")]
    EmptyPhi(String),

    #[error("entry block `{0}` is missing from the function's control-flow graph")]
    MissingEntry(String),
}
