//! The three-point constant-propagation lattice shared by NS-CP and SCCP.
use std::fmt;

/// A value drawn from the domain `{⊤, c ∈ ℤ, ⊥}`.
///
/// `Top` means "no information yet" and is the identity element of [`Lattice::meet`];
/// `Bottom` means "proven not constant" (or conservatively assumed so) and is the
/// absorbing element. `Const` carries the one integer value a definition is proven to
/// take on every path that reaches it.
///
/// Boolean/compare results live in this same domain: `true`/`false` are `Const(1)`/
/// `Const(0)`, and the `UNDEF_CMP` sentinel (a comparison whose inputs are themselves
/// `⊥`/`⊤`) is represented directly as `Bottom` — it is behaviorally
/// equivalent to `⊥` everywhere it is consumed (branch pruning), so no separate tag is
/// needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lattice {
    #[default]
    Top,
    Const(i64),
    Bottom,
}

impl Lattice {
    /// Greatest lower bound of `self` and `other`.
    ///
    /// Commutative, associative, idempotent. Only ever descends the lattice
    /// (`Top -> Const -> Bottom`); never ascends.
    #[must_use]
    pub fn meet(&self, other: &Lattice) -> Lattice {
        match (self, other) {
            (Lattice::Top, x) | (x, Lattice::Top) => *x,
            (Lattice::Bottom, _) | (_, Lattice::Bottom) => Lattice::Bottom,
            (Lattice::Const(a), Lattice::Const(b)) => {
                if a == b { Lattice::Const(*a) } else { Lattice::Bottom }
            }
        }
    }

    #[must_use]
    pub fn is_bottom(&self) -> bool {
        matches!(self, Lattice::Bottom)
    }

    #[must_use]
    pub fn is_top(&self) -> bool {
        matches!(self, Lattice::Top)
    }

    #[must_use]
    pub fn as_const(&self) -> Option<i64> {
        match self {
            Lattice::Const(c) => Some(*c),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_bool(b: bool) -> Lattice {
        Lattice::Const(i64::from(b))
    }
}

impl fmt::Display for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lattice::Top => write!(f, "⊤"),
            Lattice::Const(c) => write!(f, "{c}"),
            Lattice::Bottom => write!(f, "⊥"),
        }
    }
}
