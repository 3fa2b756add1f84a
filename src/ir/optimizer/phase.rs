//! Pass-manager-facing surface: a function-scoped transformation that reports whether
//! it modified its input, adapted from the bootstrap crate's `Phase`/`run_pipeline`
//! pair (there specified over a `Module` the rest of that crate never actually built;
//! here specified over the `Function` this crate's IR container really exposes).
use super::error::PassError;
use crate::ir::Function;

pub trait Pass {
    fn name(&self) -> &'static str;

    /// Runs the pass over `function`, mutating it in place. Returns whether the
    /// function was modified, or a [`PassError`] if the IR was malformed beyond what
    /// the pass is expected to recover from.
    fn run(&mut self, function: &mut Function) -> Result<bool, PassError>;
}

/// Runs `passes` over `function` in order, stopping at the first error.
pub fn run_pipeline(function: &mut Function, passes: Vec<Box<dyn Pass>>) -> Result<bool, PassError> {
    let mut modified = false;
    for mut pass in passes {
        println!("Running phase: {}", pass.name());
        modified |= pass.run(function)?;
    }
    Ok(modified)
}
