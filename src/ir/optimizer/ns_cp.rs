//! Non-SSA constant propagation (NS-CP): forward iterative block-level dataflow over
//! an alloca/store/load stack-slot abstraction.
use std::collections::HashMap;
use std::sync::Arc;

use crate::ir::terminator::TerminatorKind;
use crate::ir::{BasicBlock, Function, ImmediateValue, Instruction, InstructionKind, IrBinaryOp, Terminator, Value};

use super::config::PassConfig;
use super::error::PassError;
use super::eval::{fold_binary, resolve, value_key};
use super::ident::DefId;
use super::lattice::Lattice;
use super::phase::Pass;
use super::rewriter::Rewriter;
use super::worklist::Worklist;

/// A block's environment: register/stack-slot key -> lattice value.
type Env = HashMap<String, Lattice>;

pub struct NsCp {
    config: PassConfig,
}

impl NsCp {
    #[must_use]
    pub fn new(config: PassConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn with_default_config() -> Self {
        Self::new(PassConfig::default())
    }

    /// Computes the final lattice value of every register- or stack-slot-defining
    /// instruction in `function`, without mutating it.
    pub fn analyze(&self, function: &Function) -> Result<HashMap<DefId, Lattice>, PassError> {
        let entry = function.cfg.entry_label.clone();
        if function.cfg.get_block(&entry).is_none() {
            return Err(PassError::MissingEntry(entry));
        }

        let tracked_keys = tracked_key_domain(function);

        let mut out: HashMap<String, Env> = HashMap::new();
        for label in function.cfg.block_labels() {
            out.insert(label, top_env(&tracked_keys));
        }

        let mut worklist: Worklist<String> = Worklist::new();
        worklist.push(entry.clone());

        let mut iterations = 0usize;
        while let Some(label) = worklist.pop() {
            iterations += 1;
            if iterations > self.config.max_iterations {
                break;
            }
            let block = function.cfg.get_block(&label).ok_or_else(|| PassError::MissingBlock(label.clone()))?;

            let in_env = meet_predecessors(function, &label, &entry, &tracked_keys, &out);
            let (new_out, successors_to_enqueue) = run_transfer(block, in_env);

            let changed = out.get(&label) != Some(&new_out);
            out.insert(label.clone(), new_out);

            if changed {
                for succ in successors_to_enqueue {
                    worklist.push(succ);
                }
            }
        }

        // Final deterministic replay: record each definition's value at the point it
        // is computed, using the now-converged block entry environments.
        let mut definitions = HashMap::new();
        for label in function.cfg.block_labels() {
            let block = function.cfg.get_block(&label).ok_or_else(|| PassError::MissingBlock(label.clone()))?;
            let in_env = meet_predecessors(function, &label, &entry, &tracked_keys, &out);
            record_definitions(&label, block, in_env, &mut definitions);
        }

        Ok(definitions)
    }
}

impl Pass for NsCp {
    fn name(&self) -> &'static str {
        "NS-CP"
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

/// The set of keys NS-CP tracks: the result key of every alloca, load, and binary
/// (arithmetic or compare) instruction in the function.
fn tracked_key_domain(function: &Function) -> Vec<String> {
    let mut keys = Vec::new();
    for label in function.cfg.block_labels() {
        let Some(block) = function.cfg.get_block(&label) else { continue };
        for inst in &block.instructions {
            if matches!(inst.kind, InstructionKind::Alloca { .. } | InstructionKind::Load { .. } | InstructionKind::Binary { .. }) {
                if let Some(result) = &inst.result {
                    if let Some(key) = value_key(result) {
                        keys.push(key);
                    }
                }
            }
        }
    }
    keys
}

fn top_env(keys: &[String]) -> Env {
    keys.iter().cloned().map(|k| (k, Lattice::Top)).collect()
}

fn bottom_env(keys: &[String]) -> Env {
    keys.iter().cloned().map(|k| (k, Lattice::Bottom)).collect()
}

/// Rebuilds a block's IN environment from scratch as the meet over its predecessors'
/// OUT environments, rebuilt from scratch on every visit rather than reused, special-casing
/// the entry block to start at `⊥` for every tracked key.
fn meet_predecessors(
    function: &Function, label: &str, entry: &str, tracked_keys: &[String], out: &HashMap<String, Env>,
) -> Env {
    if label == entry {
        return bottom_env(tracked_keys);
    }

    let mut acc = top_env(tracked_keys);
    for pred in function.cfg.predecessors_of(label) {
        if let Some(pred_out) = out.get(&pred) {
            for key in tracked_keys {
                let current = acc.get(key).copied().unwrap_or(Lattice::Top);
                let incoming = pred_out.get(key).copied().unwrap_or(Lattice::Top);
                acc.insert(key.clone(), current.meet(&incoming));
            }
        }
    }
    acc
}

fn lookup(env: &Env, key: &str) -> Lattice {
    env.get(key).copied().unwrap_or(Lattice::Top)
}

/// Runs the per-instruction transfer function over `block`,
/// starting from `in_env`, returning the resulting OUT environment and the successor
/// labels that should be (re-)enqueued given the pruning rules for branches.
fn run_transfer(block: &BasicBlock, in_env: Env) -> (Env, Vec<String>) {
    let mut env = in_env;
    for inst in &block.instructions {
        apply_instruction(inst, &mut env);
    }

    let mut to_enqueue = Vec::new();
    match &block.terminator.kind {
        TerminatorKind::ConditionalBranch { condition, true_label, false_label } => {
            let v = resolve(condition, |k| lookup(&env, k));
            match v {
                Lattice::Const(1) => to_enqueue.push(true_label.to_string()),
                Lattice::Const(0) => to_enqueue.push(false_label.to_string()),
                _ => {
                    to_enqueue.push(true_label.to_string());
                    to_enqueue.push(false_label.to_string());
                }
            }
        }
        TerminatorKind::Branch { label } => {
            to_enqueue.push(label.to_string());
        }
        _ => {}
    }

    (env, to_enqueue)
}

fn apply_instruction(inst: &Instruction, env: &mut Env) {
    match &inst.kind {
        InstructionKind::Alloca { .. } => {}
        InstructionKind::Store { value, dest } => {
            if let Some(k) = value_key(dest) {
                let v = resolve(value, |key| lookup(env, key));
                env.insert(k, v);
            }
        }
        InstructionKind::Load { src, .. } => {
            if let Some(result) = &inst.result {
                if let Some(rk) = value_key(result) {
                    let v = resolve(src, |key| lookup(env, key));
                    env.insert(rk, v);
                }
            }
        }
        InstructionKind::Binary { op, left, right, .. } => {
            if let Some(result) = &inst.result {
                if let Some(rk) = value_key(result) {
                    let lv = resolve(left, |key| lookup(env, key));
                    let rv = resolve(right, |key| lookup(env, key));
                    env.insert(rk, fold_binary(op, lv, rv));
                }
            }
        }
        _ => {}
    }
}

/// Replays `block` from `in_env` one more time, recording the final lattice value of
/// every instruction that produces a result, keyed by its stable [`DefId`].
fn record_definitions(label: &str, block: &BasicBlock, in_env: Env, out: &mut HashMap<DefId, Lattice>) {
    let mut env = in_env;
    for (index, inst) in block.instructions.iter().enumerate() {
        apply_instruction(inst, &mut env);
        if let Some(result) = &inst.result {
            if let Some(key) = value_key(result) {
                out.insert(DefId::new(Arc::from(label), index), lookup(&env, &key));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BasicBlock, Function, IrType};
    use crate::location::source_span::SourceSpan;

    fn span() -> SourceSpan {
        SourceSpan::default()
    }

    fn imm_i32(v: i32) -> Value {
        Value::new_immediate(ImmediateValue::I32(v))
    }

    /// S1 — straight-line arithmetic: a=alloca; store 3->a; x=load a; y=x+4; return y.
    #[test]
    fn straight_line_arithmetic_propagates_to_a_constant() {
        let mut function = Function::new("f", vec![], IrType::I32);
        let entry = function.cfg.entry_label.clone();
        let a = Value::new_local("a".into(), IrType::I32);
        let x = Value::new_local("x".into(), IrType::I32);
        let y = Value::new_local("y".into(), IrType::I32);

        let block = function.cfg.get_block_mut(&entry).unwrap();
        block.instructions.push(Instruction::new(InstructionKind::Alloca { ty: IrType::I32 }, span()).with_result(a.clone()));
        block.instructions.push(Instruction::new(
            InstructionKind::Store { value: imm_i32(3), dest: a.clone() },
            span(),
        ));
        block.instructions.push(Instruction::new(InstructionKind::Load { src: a.clone(), ty: IrType::I32 }, span()).with_result(x.clone()));
        block.instructions.push(
            Instruction::new(
                InstructionKind::Binary { op: IrBinaryOp::Add, left: x.clone(), right: imm_i32(4), ty: IrType::I32 },
                span(),
            )
            .with_result(y.clone()),
        );
        block.set_terminator(Terminator::new(
            TerminatorKind::Return { value: y.clone(), ty: IrType::I32 },
            span(),
        ));

        let pass = NsCp::with_default_config();
        let result = pass.analyze(&function).unwrap();
        let y_def = DefId::new(Arc::from(entry.as_str()), 3);
        assert_eq!(result.get(&y_def), Some(&Lattice::Const(7)));
    }

    /// S2 — unknown input: a parameter's stack slot is never stored to within the
    /// function, so the entry block's `⊥`-initialized IN carries through; `y = p + 1`
    /// must stay non-constant.
    #[test]
    fn unknown_parameter_keeps_result_non_constant() {
        let mut function = Function::new("f", vec![("p".to_string(), IrType::I32)], IrType::I32);
        let entry = function.cfg.entry_label.clone();
        let p_slot = Value::new_local("p".into(), IrType::I32);
        let x = Value::new_local("x".into(), IrType::I32);
        let y = Value::new_local("y".into(), IrType::I32);

        let block = function.cfg.get_block_mut(&entry).unwrap();
        block.instructions.push(Instruction::new(InstructionKind::Alloca { ty: IrType::I32 }, span()).with_result(p_slot.clone()));
        block.instructions.push(Instruction::new(InstructionKind::Load { src: p_slot.clone(), ty: IrType::I32 }, span()).with_result(x.clone()));
        block.instructions.push(
            Instruction::new(
                InstructionKind::Binary { op: IrBinaryOp::Add, left: x.clone(), right: imm_i32(1), ty: IrType::I32 },
                span(),
            )
            .with_result(y.clone()),
        );
        block.set_terminator(Terminator::new(
            TerminatorKind::Return { value: y.clone(), ty: IrType::I32 },
            span(),
        ));

        let pass = NsCp::with_default_config();
        let result = pass.analyze(&function).unwrap();
        let y_def = DefId::new(Arc::from(entry.as_str()), 2);
        assert_eq!(result.get(&y_def), Some(&Lattice::Bottom));
    }

    /// S3 — divergent stores: `if (c) store 1->a else store 2->a; x = load a; return
    /// x`. `c` is unresolved (no defining instruction), so both arms run and `a`
    /// receives two distinct constants; `Lat[x]` must land on `⊥`.
    #[test]
    fn divergent_stores_through_the_same_slot_are_non_constant() {
        let mut function = Function::new("f", vec![], IrType::I32);
        let entry = function.cfg.entry_label.clone();
        function.cfg.add_block(BasicBlock::new("true_arm", span()));
        function.cfg.add_block(BasicBlock::new("false_arm", span()));
        function.cfg.add_block(BasicBlock::new("join", span()));
        function.cfg.add_edge(&entry, "true_arm");
        function.cfg.add_edge(&entry, "false_arm");
        function.cfg.add_edge("true_arm", "join");
        function.cfg.add_edge("false_arm", "join");

        let a = Value::new_local("a".into(), IrType::I32);
        let c = Value::new_local("c".into(), IrType::Bool);
        let x = Value::new_local("x".into(), IrType::I32);

        let entry_block = function.cfg.get_block_mut(&entry).unwrap();
        entry_block.instructions.push(Instruction::new(InstructionKind::Alloca { ty: IrType::I32 }, span()).with_result(a.clone()));
        entry_block.set_terminator(Terminator::new(
            TerminatorKind::ConditionalBranch { condition: c.clone(), true_label: Arc::from("true_arm"), false_label: Arc::from("false_arm") },
            span(),
        ));

        let true_block = function.cfg.get_block_mut("true_arm").unwrap();
        true_block.instructions.push(Instruction::new(InstructionKind::Store { value: imm_i32(1), dest: a.clone() }, span()));
        true_block.set_terminator(Terminator::new(TerminatorKind::Branch { label: Arc::from("join") }, span()));

        let false_block = function.cfg.get_block_mut("false_arm").unwrap();
        false_block.instructions.push(Instruction::new(InstructionKind::Store { value: imm_i32(2), dest: a.clone() }, span()));
        false_block.set_terminator(Terminator::new(TerminatorKind::Branch { label: Arc::from("join") }, span()));

        let join_block = function.cfg.get_block_mut("join").unwrap();
        join_block.instructions.push(Instruction::new(InstructionKind::Load { src: a.clone(), ty: IrType::I32 }, span()).with_result(x.clone()));
        join_block.set_terminator(Terminator::new(TerminatorKind::Return { value: x.clone(), ty: IrType::I32 }, span()));

        let pass = NsCp::with_default_config();
        let result = pass.analyze(&function).unwrap();
        let x_def = DefId::new(Arc::from("join"), 0);
        assert_eq!(result.get(&x_def), Some(&Lattice::Bottom));
    }

    /// S4 — known branch pruning: `x=5; if (x==5) y=7 else y=9; return y`. The
    /// comparison resolves to a known `1`, so only the true successor is ever
    /// enqueued; `y` propagates to the literal `7`.
    #[test]
    fn known_branch_condition_prunes_the_false_successor() {
        let mut function = Function::new("f", vec![], IrType::I32);
        let entry = function.cfg.entry_label.clone();
        function.cfg.add_block(BasicBlock::new("true_arm", span()));
        function.cfg.add_block(BasicBlock::new("false_arm", span()));
        function.cfg.add_block(BasicBlock::new("join", span()));
        function.cfg.add_edge(&entry, "true_arm");
        function.cfg.add_edge(&entry, "false_arm");
        function.cfg.add_edge("true_arm", "join");
        function.cfg.add_edge("false_arm", "join");

        let x_slot = Value::new_local("x".into(), IrType::I32);
        let y_slot = Value::new_local("y".into(), IrType::I32);
        let xv = Value::new_local("xv".into(), IrType::I32);
        let cond = Value::new_local("cond".into(), IrType::Bool);
        let yv = Value::new_local("yv".into(), IrType::I32);

        let entry_block = function.cfg.get_block_mut(&entry).unwrap();
        entry_block.instructions.push(Instruction::new(InstructionKind::Alloca { ty: IrType::I32 }, span()).with_result(x_slot.clone()));
        entry_block.instructions.push(Instruction::new(
            InstructionKind::Store { value: imm_i32(5), dest: x_slot.clone() },
            span(),
        ));
        entry_block.instructions.push(Instruction::new(InstructionKind::Load { src: x_slot.clone(), ty: IrType::I32 }, span()).with_result(xv.clone()));
        entry_block.instructions.push(
            Instruction::new(
                InstructionKind::Binary { op: IrBinaryOp::Equal, left: xv.clone(), right: imm_i32(5), ty: IrType::Bool },
                span(),
            )
            .with_result(cond.clone()),
        );
        entry_block.set_terminator(Terminator::new(
            TerminatorKind::ConditionalBranch { condition: cond.clone(), true_label: Arc::from("true_arm"), false_label: Arc::from("false_arm") },
            span(),
        ));

        let true_block = function.cfg.get_block_mut("true_arm").unwrap();
        true_block.instructions.push(Instruction::new(InstructionKind::Alloca { ty: IrType::I32 }, span()).with_result(y_slot.clone()));
        true_block.instructions.push(Instruction::new(
            InstructionKind::Store { value: imm_i32(7), dest: y_slot.clone() },
            span(),
        ));
        true_block.set_terminator(Terminator::new(TerminatorKind::Branch { label: Arc::from("join") }, span()));

        let false_block = function.cfg.get_block_mut("false_arm").unwrap();
        false_block.instructions.push(Instruction::new(
            InstructionKind::Store { value: imm_i32(9), dest: y_slot.clone() },
            span(),
        ));
        false_block.set_terminator(Terminator::new(TerminatorKind::Branch { label: Arc::from("join") }, span()));

        let join_block = function.cfg.get_block_mut("join").unwrap();
        join_block.instructions.push(Instruction::new(InstructionKind::Load { src: y_slot.clone(), ty: IrType::I32 }, span()).with_result(yv.clone()));
        join_block.set_terminator(Terminator::new(TerminatorKind::Return { value: yv.clone(), ty: IrType::I32 }, span()));

        let pass = NsCp::with_default_config();
        let result = pass.analyze(&function).unwrap();
        let yv_def = DefId::new(Arc::from("join"), 0);
        assert_eq!(result.get(&yv_def), Some(&Lattice::Const(7)));
    }

    /// S6 — loop with invariant induction: `i=0; while(i<10){ k=2*3; i=i+1 } return
    /// k`. `k`'s defining computation never reads `i`, so it stays constant across
    /// every back-edge iteration even though `i` itself does not.
    #[test]
    fn loop_invariant_computation_stays_constant_across_back_edge() {
        let mut function = Function::new("f", vec![], IrType::I32);
        let entry = function.cfg.entry_label.clone();
        function.cfg.add_block(BasicBlock::new("header", span()));
        function.cfg.add_block(BasicBlock::new("body", span()));
        function.cfg.add_block(BasicBlock::new("exit", span()));
        function.cfg.add_edge(&entry, "header");
        function.cfg.add_edge("header", "body");
        function.cfg.add_edge("header", "exit");
        function.cfg.add_edge("body", "header");

        let i_slot = Value::new_local("i".into(), IrType::I32);
        let k_slot = Value::new_local("k".into(), IrType::I32);
        let iv = Value::new_local("iv".into(), IrType::I32);
        let cond = Value::new_local("cond".into(), IrType::Bool);
        let kv = Value::new_local("kv".into(), IrType::I32);
        let i2 = Value::new_local("i2".into(), IrType::I32);
        let kr = Value::new_local("kr".into(), IrType::I32);

        let entry_block = function.cfg.get_block_mut(&entry).unwrap();
        entry_block.instructions.push(Instruction::new(InstructionKind::Alloca { ty: IrType::I32 }, span()).with_result(i_slot.clone()));
        entry_block.instructions.push(Instruction::new(InstructionKind::Alloca { ty: IrType::I32 }, span()).with_result(k_slot.clone()));
        entry_block.instructions.push(Instruction::new(InstructionKind::Store { value: imm_i32(0), dest: i_slot.clone() }, span()));
        entry_block.set_terminator(Terminator::new(TerminatorKind::Branch { label: Arc::from("header") }, span()));

        let header_block = function.cfg.get_block_mut("header").unwrap();
        header_block.instructions.push(Instruction::new(InstructionKind::Load { src: i_slot.clone(), ty: IrType::I32 }, span()).with_result(iv.clone()));
        header_block.instructions.push(
            Instruction::new(InstructionKind::Binary { op: IrBinaryOp::Less, left: iv.clone(), right: imm_i32(10), ty: IrType::Bool }, span())
                .with_result(cond.clone()),
        );
        header_block.set_terminator(Terminator::new(
            TerminatorKind::ConditionalBranch { condition: cond.clone(), true_label: Arc::from("body"), false_label: Arc::from("exit") },
            span(),
        ));

        let body_block = function.cfg.get_block_mut("body").unwrap();
        body_block.instructions.push(
            Instruction::new(InstructionKind::Binary { op: IrBinaryOp::Multiply, left: imm_i32(2), right: imm_i32(3), ty: IrType::I32 }, span())
                .with_result(kv.clone()),
        );
        body_block.instructions.push(Instruction::new(InstructionKind::Store { value: kv.clone(), dest: k_slot.clone() }, span()));
        body_block.instructions.push(Instruction::new(InstructionKind::Load { src: i_slot.clone(), ty: IrType::I32 }, span()).with_result(iv.clone()));
        body_block.instructions.push(
            Instruction::new(InstructionKind::Binary { op: IrBinaryOp::Add, left: iv.clone(), right: imm_i32(1), ty: IrType::I32 }, span())
                .with_result(i2.clone()),
        );
        body_block.instructions.push(Instruction::new(InstructionKind::Store { value: i2.clone(), dest: i_slot.clone() }, span()));
        body_block.set_terminator(Terminator::new(TerminatorKind::Branch { label: Arc::from("header") }, span()));

        let exit_block = function.cfg.get_block_mut("exit").unwrap();
        exit_block.instructions.push(Instruction::new(InstructionKind::Load { src: k_slot.clone(), ty: IrType::I32 }, span()).with_result(kr.clone()));
        exit_block.set_terminator(Terminator::new(TerminatorKind::Return { value: kr.clone(), ty: IrType::I32 }, span()));

        let pass = NsCp::with_default_config();
        let result = pass.analyze(&function).unwrap();
        let kr_def = DefId::new(Arc::from("exit"), 0);
        assert_eq!(result.get(&kr_def), Some(&Lattice::Const(6)));
    }
}
