//! Summary statistics produced by a pass run, in the style of the bootstrap crate's
//! `OptimizationStatistics`/`OptimizationStats`.
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizationStats {
    /// Number of definitions whose uses were replaced with a materialized constant.
    pub definitions_rewritten: usize,
    /// Number of defining instructions erased as a consequence of rewriting.
    pub instructions_erased: usize,
}

impl OptimizationStats {
    #[must_use]
    pub fn merge(mut self, other: OptimizationStats) -> Self {
        self.definitions_rewritten += other.definitions_rewritten;
        self.instructions_erased += other.instructions_erased;
        self
    }
}

impl fmt::Display for OptimizationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} definition(s) rewritten, {} instruction(s) erased",
            self.definitions_rewritten, self.instructions_erased
        )
    }
}
