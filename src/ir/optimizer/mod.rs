pub mod config;
pub mod error;
pub mod eval;
pub mod ident;
pub mod lattice;
pub mod ns_cp;
pub mod phase;
pub mod rewriter;
pub mod sccp;
pub mod stats;
pub mod worklist;

pub use config::PassConfig;
pub use error::PassError;
pub use ident::DefId;
pub use lattice::Lattice;
pub use ns_cp::NsCp;
pub use phase::{Pass, run_pipeline};
pub use rewriter::Rewriter;
pub use sccp::Sccp;
pub use stats::OptimizationStats;
pub use worklist::Worklist;
