//! Materializes proven-constant definitions as literals and erases the instructions
//! that produced them, given the lattice a propagation pass already computed.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::ir::{Function, ImmediateValue, Instruction, InstructionKind, IrType, Terminator, TerminatorKind, Value};

use super::eval::value_key;
use super::ident::DefId;
use super::lattice::Lattice;
use super::stats::OptimizationStats;

pub struct Rewriter<'a> {
    lattice: &'a HashMap<DefId, Lattice>,
}

impl<'a> Rewriter<'a> {
    #[must_use]
    pub fn new(lattice: &'a HashMap<DefId, Lattice>) -> Self {
        Self { lattice }
    }

    /// Rewrites every rewrite-eligible constant definition in `function` in place,
    /// returning a summary of how much was changed.
    pub fn rewrite(&self, function: &mut Function) -> OptimizationStats {
        let (substitutions, erase) = self.plan(function);
        if substitutions.is_empty() {
            return OptimizationStats::default();
        }

        let mut erased = 0usize;
        for label in function.cfg.block_labels() {
            let Some(block) = function.cfg.get_block_mut(&label) else { continue };
            for inst in &mut block.instructions {
                substitute_instruction(inst, &substitutions);
            }
            substitute_terminator(block.terminator_mut(), &substitutions);

            let before = block.instructions.len();
            let mut index = 0usize;
            block.instructions.retain(|_| {
                let def = DefId::new(Arc::from(label.as_str()), index);
                index += 1;
                !erase.contains(&def)
            });
            erased += before - block.instructions.len();
        }

        OptimizationStats { definitions_rewritten: substitutions.len(), instructions_erased: erased }
    }

    /// Scans every definition the lattice covers and decides which are rewrite-eligible,
    /// without mutating `function`. A definition is eligible when its lattice value is a
    /// concrete `Const` and its defining opcode is not a compare, store, or alloca.
    fn plan(&self, function: &Function) -> (HashMap<String, Value>, HashSet<DefId>) {
        let mut substitutions = HashMap::new();
        let mut erase = HashSet::new();

        for label in function.cfg.block_labels() {
            let Some(block) = function.cfg.get_block(&label) else { continue };
            for (index, inst) in block.instructions.iter().enumerate() {
                let def = DefId::new(Arc::from(label.as_str()), index);
                let Some(Lattice::Const(c)) = self.lattice.get(&def).copied() else { continue };
                if !is_rewrite_eligible(&inst.kind) {
                    continue;
                }
                let Some(result) = &inst.result else { continue };
                let Some(key) = value_key(result) else { continue };
                let Some(literal) = materialize(&result.ty, c) else { continue };
                substitutions.insert(key, literal);
                erase.insert(def);
            }
        }

        (substitutions, erase)
    }
}

/// Whether a definition with this opcode is a rewrite target, per the carve-out that
/// excludes comparisons (branch pruning needs the original comparison), stores (they
/// have no result to rewrite), and allocas (they name a stack slot, not a value).
fn is_rewrite_eligible(kind: &InstructionKind) -> bool {
    match kind {
        InstructionKind::Alloca { .. } | InstructionKind::Store { .. } => false,
        InstructionKind::Binary { op, .. } => !op.is_compare(),
        _ => true,
    }
}

/// Builds the typed literal `Value` a proven constant materializes as, or `None` if
/// `ty` is outside the scalar integer/boolean domain this domain tracks.
fn materialize(ty: &IrType, value: i64) -> Option<Value> {
    let imm = match ty {
        IrType::I8 => ImmediateValue::I8(value as i8),
        IrType::I16 => ImmediateValue::I16(value as i16),
        IrType::I32 => ImmediateValue::I32(value as i32),
        IrType::I64 => ImmediateValue::I64(value),
        IrType::U8 => ImmediateValue::U8(value as u8),
        IrType::U16 => ImmediateValue::U16(value as u16),
        IrType::U32 => ImmediateValue::U32(value as u32),
        IrType::U64 => ImmediateValue::U64(value as u64),
        IrType::Bool => ImmediateValue::Bool(value != 0),
        _ => return None,
    };
    Some(Value::new_immediate(imm))
}

fn substitute_value(value: &mut Value, substitutions: &HashMap<String, Value>) {
    if let Some(key) = value_key(value) {
        if let Some(literal) = substitutions.get(&key) {
            *value = literal.clone();
        }
    }
}

fn substitute_instruction(inst: &mut Instruction, substitutions: &HashMap<String, Value>) {
    match &mut inst.kind {
        InstructionKind::Alloca { .. } => {}
        InstructionKind::Store { value, dest } => {
            substitute_value(value, substitutions);
            substitute_value(dest, substitutions);
        }
        InstructionKind::Load { src, .. } => substitute_value(src, substitutions),
        InstructionKind::Binary { left, right, .. } => {
            substitute_value(left, substitutions);
            substitute_value(right, substitutions);
        }
        InstructionKind::Unary { operand, .. } => substitute_value(operand, substitutions),
        InstructionKind::Call { func, args, .. } => {
            substitute_value(func, substitutions);
            for arg in args {
                substitute_value(arg, substitutions);
            }
        }
        InstructionKind::GetElementPtr { base, index, .. } => {
            substitute_value(base, substitutions);
            substitute_value(index, substitutions);
        }
        InstructionKind::Cast { value, .. } => substitute_value(value, substitutions),
        InstructionKind::Phi { incoming, .. } => {
            for (value, _) in incoming {
                substitute_value(value, substitutions);
            }
        }
        InstructionKind::Vector { operands, .. } => {
            for operand in operands {
                substitute_value(operand, substitutions);
            }
        }
    }
}

fn substitute_terminator(terminator: &mut Terminator, substitutions: &HashMap<String, Value>) {
    match &mut terminator.kind {
        TerminatorKind::Return { value, .. } => substitute_value(value, substitutions),
        TerminatorKind::ConditionalBranch { condition, .. } => substitute_value(condition, substitutions),
        TerminatorKind::IndirectBranch { address, .. } => substitute_value(address, substitutions),
        TerminatorKind::Switch { value, cases, .. } => {
            substitute_value(value, substitutions);
            for (case_value, _) in cases {
                substitute_value(case_value, substitutions);
            }
        }
        TerminatorKind::Branch { .. } | TerminatorKind::Unreachable => {}
    }
}
