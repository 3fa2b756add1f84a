//! Sparse Conditional Constant Propagation (SCCP): the Wegman-Zadeck algorithm over
//! SSA-form IR with explicit phi-merges, executable-edge tracking, and dual worklists.
use std::collections::HashMap;
use std::sync::Arc;

use crate::ir::terminator::TerminatorKind;
use crate::ir::{BasicBlock, Function, InstructionKind, Value};

use super::config::PassConfig;
use super::error::PassError;
use super::eval::{fold_binary, resolve, value_key};
use super::ident::DefId;
use super::lattice::Lattice;
use super::phase::Pass;
use super::rewriter::Rewriter;
use super::worklist::Worklist;

/// The pseudo-predecessor of the function's entry block: entry has no real
/// predecessors, so the initial flow-edge worklist entry is seeded from this
/// sentinel rather than from any block the CFG actually contains.
const SENTINEL_PRED: &str = "<entry>";

type Edge = (String, String);

pub struct Sccp {
    config: PassConfig,
}

impl Sccp {
    #[must_use]
    pub fn new(config: PassConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn with_default_config() -> Self {
        Self::new(PassConfig::default())
    }

    /// Computes the final lattice value of every SSA definition in `function`,
    /// without mutating it.
    pub fn analyze(&self, function: &Function) -> Result<HashMap<DefId, Lattice>, PassError> {
        let entry = function.cfg.entry_label.clone();
        if function.cfg.get_block(&entry).is_none() {
            return Err(PassError::MissingEntry(entry));
        }

        let def_of = build_def_of(function);
        let users_of = build_users_of(function, &def_of);

        let mut lat: HashMap<DefId, Lattice> = HashMap::new();
        for label in function.cfg.block_labels() {
            let Some(block) = function.cfg.get_block(&label) else { continue };
            for (index, inst) in block.instructions.iter().enumerate() {
                if inst.result.is_some() {
                    lat.insert(DefId::new(Arc::from(label.as_str()), index), Lattice::Top);
                }
            }
        }

        let mut exec: HashMap<Edge, bool> = HashMap::new();
        let mut visits: HashMap<String, usize> = HashMap::new();
        let mut fwl: Worklist<Edge> = Worklist::new();
        let mut swl: Worklist<(DefId, DefId)> = Worklist::new();

        fwl.push((SENTINEL_PRED.to_string(), entry.clone()));

        let mut iterations = 0usize;
        loop {
            while let Some((pred, succ)) = fwl.pop() {
                iterations += 1;
                if iterations > self.config.max_iterations {
                    return Ok(lat);
                }
                let edge = (pred, succ.clone());
                if exec.get(&edge).copied().unwrap_or(false) {
                    continue;
                }
                exec.insert(edge, true);
                let visit_count = visits.entry(succ.clone()).or_insert(0);
                *visit_count += 1;
                let first_activation = *visit_count == 1;

                let Some(block) = function.cfg.get_block(&succ) else {
                    return Err(PassError::MissingBlock(succ));
                };

                evaluate_all_phis(block, &succ, &exec, &def_of, &users_of, &mut lat, &mut swl)?;
                if first_activation {
                    evaluate_block_body(block, &succ, &def_of, &users_of, &mut lat, &mut swl, &mut fwl);
                }
            }

            while let Some((_def, user)) = swl.pop() {
                iterations += 1;
                if iterations > self.config.max_iterations {
                    return Ok(lat);
                }
                let Some(block) = function.cfg.get_block(user.block.as_ref()) else {
                    return Err(PassError::MissingBlock(user.block.to_string()));
                };

                if user.index < block.instructions.len() && matches!(block.instructions[user.index].kind, InstructionKind::Phi { .. }) {
                    evaluate_phi_at(block, user.block.as_ref(), user.index, &exec, &def_of, &mut lat, &mut swl, &users_of)?;
                } else if has_any_executable_incoming(function, user.block.as_ref(), &exec) {
                    evaluate_block_body(block, user.block.as_ref(), &def_of, &users_of, &mut lat, &mut swl, &mut fwl);
                }
            }

            if fwl.is_empty() && swl.is_empty() {
                break;
            }
        }

        Ok(lat)
    }
}

impl Pass for Sccp {
    fn name(&self) -> &'static str {
        "SCCP"
    }

    fn run(&mut self, function: &mut Function) -> Result<bool, PassError> {
        let lattice = self.analyze(function)?;
        let stats = Rewriter::new(&lattice).rewrite(function);
        if self.config.verbose {
            println!("{function}");
            println!("{stats}");
        }
        Ok(stats.definitions_rewritten > 0)
    }
}

/// Maps each defined key (a register or phi result name) to the `DefId` of the
/// instruction that defines it. Assumes SSA form: at most one definition per key.
fn build_def_of(function: &Function) -> HashMap<String, DefId> {
    let mut def_of = HashMap::new();
    for label in function.cfg.block_labels() {
        let Some(block) = function.cfg.get_block(&label) else { continue };
        for (index, inst) in block.instructions.iter().enumerate() {
            if let Some(result) = &inst.result {
                if let Some(key) = value_key(result) {
                    def_of.insert(key, DefId::new(Arc::from(label.as_str()), index));
                }
            }
        }
    }
    def_of
}

/// Maps each defined key to every `DefId` that uses it — ordinary instructions, phi
/// operands, and (via a one-past-the-end pseudo index) block terminators. Used to
/// drive the SSA-use worklist when a definition's lattice value changes.
fn build_users_of(function: &Function, def_of: &HashMap<String, DefId>) -> HashMap<String, Vec<DefId>> {
    let mut users_of: HashMap<String, Vec<DefId>> = HashMap::new();
    let mut register = |key: Option<String>, user: DefId, users_of: &mut HashMap<String, Vec<DefId>>| {
        if let Some(key) = key {
            if def_of.contains_key(&key) {
                users_of.entry(key).or_default().push(user);
            }
        }
    };

    for label in function.cfg.block_labels() {
        let Some(block) = function.cfg.get_block(&label) else { continue };
        for (index, inst) in block.instructions.iter().enumerate() {
            let user = DefId::new(Arc::from(label.as_str()), index);
            match &inst.kind {
                InstructionKind::Binary { left, right, .. } => {
                    register(value_key(left), user.clone(), &mut users_of);
                    register(value_key(right), user.clone(), &mut users_of);
                }
                InstructionKind::Unary { operand, .. } => register(value_key(operand), user.clone(), &mut users_of),
                InstructionKind::Phi { incoming, .. } => {
                    for (value, _) in incoming {
                        register(value_key(value), user.clone(), &mut users_of);
                    }
                }
                InstructionKind::Load { src, .. } => register(value_key(src), user.clone(), &mut users_of),
                InstructionKind::Call { func, args, .. } => {
                    register(value_key(func), user.clone(), &mut users_of);
                    for arg in args {
                        register(value_key(arg), user.clone(), &mut users_of);
                    }
                }
                _ => {}
            }
        }

        let terminator_user = DefId::new(Arc::from(label.as_str()), block.instructions.len());
        for value in block.terminator().get_used_values() {
            register(value_key(value), terminator_user.clone(), &mut users_of);
        }
    }

    users_of
}

fn enqueue_users(key: &str, users_of: &HashMap<String, Vec<DefId>>, def: &DefId, swl: &mut Worklist<(DefId, DefId)>) {
    if let Some(users) = users_of.get(key) {
        for user in users {
            swl.push((def.clone(), user.clone()));
        }
    }
}

fn lookup(value: &Value, def_of: &HashMap<String, DefId>, lat: &HashMap<DefId, Lattice>) -> Lattice {
    resolve(value, |key| match def_of.get(key) {
        Some(def) => lat.get(def).copied().unwrap_or(Lattice::Top),
        None => Lattice::Top,
    })
}

/// Whether any edge (real or the entry's sentinel) into `label` is marked executable.
fn has_any_executable_incoming(function: &Function, label: &str, exec: &HashMap<Edge, bool>) -> bool {
    if label == function.cfg.entry_label.as_str() {
        if exec.get(&(SENTINEL_PRED.to_string(), label.to_string())).copied().unwrap_or(false) {
            return true;
        }
    }
    function.cfg.predecessors_of(label).iter().any(|pred| exec.get(&(pred.clone(), label.to_string())).copied().unwrap_or(false))
}

/// The phi rule: meets the lattice value of every incoming (value, predecessor) pair
/// whose edge into `label` is executable; non-executable incoming edges contribute
/// nothing (as if `⊤`), per the reachability definition in the main loop's design.
fn phi_value(label: &str, incoming: &[(Value, String)], exec: &HashMap<Edge, bool>, def_of: &HashMap<String, DefId>, lat: &HashMap<DefId, Lattice>) -> Lattice {
    let mut acc = Lattice::Top;
    for (value, pred) in incoming {
        let edge = (pred.clone(), label.to_string());
        if exec.get(&edge).copied().unwrap_or(false) {
            acc = acc.meet(&lookup(value, def_of, lat));
        }
    }
    acc
}

fn evaluate_all_phis(
    block: &BasicBlock, label: &str, exec: &HashMap<Edge, bool>, def_of: &HashMap<String, DefId>,
    users_of: &HashMap<String, Vec<DefId>>, lat: &mut HashMap<DefId, Lattice>, swl: &mut Worklist<(DefId, DefId)>,
) -> Result<(), PassError> {
    for index in 0..block.instructions.len() {
        if matches!(block.instructions[index].kind, InstructionKind::Phi { .. }) {
            update_phi(block, label, index, exec, def_of, users_of, lat, swl)?;
        }
    }
    Ok(())
}

fn evaluate_phi_at(
    block: &BasicBlock, label: &str, index: usize, exec: &HashMap<Edge, bool>, def_of: &HashMap<String, DefId>,
    lat: &mut HashMap<DefId, Lattice>, swl: &mut Worklist<(DefId, DefId)>, users_of: &HashMap<String, Vec<DefId>>,
) -> Result<(), PassError> {
    update_phi(block, label, index, exec, def_of, users_of, lat, swl)
}

/// Updates one phi's lattice value, raising [`PassError::EmptyPhi`] if it declares no
/// incoming edges at all — malformed IR the algorithm is not expected to recover from,
/// distinct from a phi whose edges are merely all non-executable (which resolves to
/// `⊤`, see [`phi_value`]).
fn update_phi(
    block: &BasicBlock, label: &str, index: usize, exec: &HashMap<Edge, bool>, def_of: &HashMap<String, DefId>,
    users_of: &HashMap<String, Vec<DefId>>, lat: &mut HashMap<DefId, Lattice>, swl: &mut Worklist<(DefId, DefId)>,
) -> Result<(), PassError> {
    let InstructionKind::Phi { incoming, .. } = &block.instructions[index].kind else { return Ok(()) };
    if incoming.is_empty() {
        return Err(PassError::EmptyPhi(label.to_string()));
    }
    let def = DefId::new(Arc::from(label), index);
    let new_value = phi_value(label, incoming, exec, def_of, lat);
    let changed = lat.get(&def).copied() != Some(new_value);
    if changed {
        lat.insert(def.clone(), new_value);
        if let Some(result) = &block.instructions[index].result {
            if let Some(key) = value_key(result) {
                enqueue_users(&key, users_of, &def, swl);
            }
        }
    }
    Ok(())
}

/// Evaluates every non-phi instruction of `block` once in program order, then checks
/// its terminator to decide which successor edges to push onto `fwl`.
fn evaluate_block_body(
    block: &BasicBlock, label: &str, def_of: &HashMap<String, DefId>, users_of: &HashMap<String, Vec<DefId>>,
    lat: &mut HashMap<DefId, Lattice>, swl: &mut Worklist<(DefId, DefId)>, fwl: &mut Worklist<Edge>,
) {
    for (index, inst) in block.instructions.iter().enumerate() {
        let def = DefId::new(Arc::from(label), index);
        let new_value = match &inst.kind {
            InstructionKind::Binary { op, left, right, .. } => {
                let lv = lookup(left, def_of, lat);
                let rv = lookup(right, def_of, lat);
                Some(fold_binary(op, lv, rv))
            }
            _ => None,
        };
        if let Some(new_value) = new_value {
            let changed = lat.get(&def).copied() != Some(new_value);
            if changed {
                lat.insert(def.clone(), new_value);
                if let Some(result) = &inst.result {
                    if let Some(key) = value_key(result) {
                        enqueue_users(&key, users_of, &def, swl);
                    }
                }
            }
        }
    }

    match &block.terminator().kind {
        TerminatorKind::ConditionalBranch { condition, true_label, false_label } => {
            let v = lookup(condition, def_of, lat);
            match v {
                Lattice::Const(1) => fwl.push((label.to_string(), true_label.to_string())),
                Lattice::Const(0) => fwl.push((label.to_string(), false_label.to_string())),
                _ => {
                    fwl.push((label.to_string(), true_label.to_string()));
                    fwl.push((label.to_string(), false_label.to_string()));
                }
            }
        }
        TerminatorKind::Branch { label: target } => fwl.push((label.to_string(), target.to_string())),
        _ => {}
    }
}
