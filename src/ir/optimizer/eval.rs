//! Shared helpers for resolving operand identity and evaluating the small set of
//! opcodes both passes fold: signed add/sub/mul/sdiv and the six signed integer
//! comparison predicates, shared by both passes.
use crate::ir::{ImmediateValue, IrBinaryOp, Value, ValueKind};

use super::lattice::Lattice;

/// A hashable key identifying a named value (a definition or a local/global).
/// Literals have no key — they resolve directly to their own lattice value.
#[must_use]
pub fn value_key(value: &Value) -> Option<String> {
    match &value.kind {
        ValueKind::Immediate(_) => None,
        ValueKind::Local(name) => Some(format!("L:{name}")),
        ValueKind::Global(name) => Some(format!("G:{name}")),
        ValueKind::Temporary(id) => Some(format!("T:{id}")),
    }
}

/// The lattice value a literal operand contributes, if it is one this domain tracks
/// (signed/unsigned integers and booleans — the scalar subset this domain tracks).
#[must_use]
pub fn literal_lattice(imm: &ImmediateValue) -> Option<Lattice> {
    match *imm {
        ImmediateValue::I8(v) => Some(Lattice::Const(i64::from(v))),
        ImmediateValue::I16(v) => Some(Lattice::Const(i64::from(v))),
        ImmediateValue::I32(v) => Some(Lattice::Const(i64::from(v))),
        ImmediateValue::I64(v) => Some(Lattice::Const(v)),
        ImmediateValue::U8(v) => Some(Lattice::Const(i64::from(v))),
        ImmediateValue::U16(v) => Some(Lattice::Const(i64::from(v))),
        ImmediateValue::U32(v) => Some(Lattice::Const(i64::from(v))),
        ImmediateValue::U64(v) => i64::try_from(v).ok().map(Lattice::Const),
        ImmediateValue::Bool(b) => Some(Lattice::from_bool(b)),
        ImmediateValue::Char(_) | ImmediateValue::F32(_) | ImmediateValue::F64(_) | ImmediateValue::String(_) => None,
    }
}

/// Resolves an operand `Value` to a lattice value using `lookup` for named values.
/// Unsupported literal types (floats, chars, strings) and absent environment keys
/// both degrade to `Top`/`Bottom` via `lookup`'s own default, never panicking.
pub fn resolve(value: &Value, lookup: impl FnOnce(&str) -> Lattice) -> Lattice {
    match &value.kind {
        ValueKind::Immediate(imm) => literal_lattice(imm).unwrap_or(Lattice::Bottom),
        _ => match value_key(value) {
            Some(key) => lookup(&key),
            None => Lattice::Bottom,
        },
    }
}

/// Folds a signed binary arithmetic opcode (`add`/`sub`/`mul`/`sdiv`) over two
/// already-resolved operand lattice values. Any other opcode (modulo, bitwise,
/// logical, shifts) is opaque to this domain and yields `Bottom`, matching the rule
/// "any opcode outside the four above yields ⊥". Division by zero never traps; it
/// folds to `Bottom`.
#[must_use]
pub fn fold_binary(op: &IrBinaryOp, lhs: Lattice, rhs: Lattice) -> Lattice {
    if op.is_compare() {
        return fold_compare(op, lhs, rhs);
    }
    match (lhs, rhs) {
        (Lattice::Bottom, _) | (_, Lattice::Bottom) => Lattice::Bottom,
        (Lattice::Top, _) | (_, Lattice::Top) => Lattice::Top,
        (Lattice::Const(a), Lattice::Const(b)) => match op {
            IrBinaryOp::Add => Lattice::Const(a.wrapping_add(b)),
            IrBinaryOp::Subtract => Lattice::Const(a.wrapping_sub(b)),
            IrBinaryOp::Multiply => Lattice::Const(a.wrapping_mul(b)),
            IrBinaryOp::Divide => if b == 0 { Lattice::Bottom } else { Lattice::Const(a.wrapping_div(b)) },
            _ => Lattice::Bottom,
        },
    }
}

/// Evaluates one of the six signed integer comparison predicates. If either operand
/// is `Bottom` the result is the `UNDEF_CMP` sentinel, represented as `Bottom` (see
/// [`Lattice`]'s docs); if either is `Top` the result stays `Top` (not enough
/// information yet); otherwise the boolean result is computed directly.
#[must_use]
pub fn fold_compare(op: &IrBinaryOp, lhs: Lattice, rhs: Lattice) -> Lattice {
    match (lhs, rhs) {
        (Lattice::Bottom, _) | (_, Lattice::Bottom) => Lattice::Bottom,
        (Lattice::Top, _) | (_, Lattice::Top) => Lattice::Top,
        (Lattice::Const(a), Lattice::Const(b)) => {
            let result = match op {
                IrBinaryOp::Equal => a == b,
                IrBinaryOp::NotEqual => a != b,
                IrBinaryOp::Greater => a > b,
                IrBinaryOp::Less => a < b,
                IrBinaryOp::GreaterEqual => a >= b,
                IrBinaryOp::LessEqual => a <= b,
                _ => return Lattice::Bottom,
            };
            Lattice::from_bool(result)
        }
    }
}
