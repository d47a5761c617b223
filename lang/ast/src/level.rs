use std::fmt;
use std::rc::Rc;

use crate::ident::Name;

/// A universe level.
///
/// Levels appear in `Sort` expressions and as arguments of level-polymorphic
/// constants.  The equality engine consults levels through
/// [Level::is_equiv], which normalizes both sides and compares structurally;
/// this is the level-equality oracle consumed by the elaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Level {
    /// Universe level 0 (the level of `Prop`).
    Zero,
    /// Successor of a universe level.
    Succ(Rc<Level>),
    /// Maximum of two universe levels.
    Max(Rc<Level>, Rc<Level>),
    /// Impredicative maximum: `IMax u v` is `0` when `v` is `0` and
    /// `Max u v` otherwise.
    IMax(Rc<Level>, Rc<Level>),
    /// A named universe parameter of the enclosing declaration.
    Param(Name),
}

impl Level {
    pub fn succ(self) -> Level {
        Level::Succ(Rc::new(self))
    }

    pub fn max(a: Level, b: Level) -> Level {
        Level::Max(Rc::new(a), Rc::new(b))
    }

    pub fn imax(a: Level, b: Level) -> Level {
        Level::IMax(Rc::new(a), Rc::new(b))
    }

    pub fn of_nat(n: u64) -> Level {
        let mut l = Level::Zero;
        for _ in 0..n {
            l = l.succ();
        }
        l
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Level::Zero)
    }

    /// Whether the level is never `0` for any parameter instantiation.
    pub fn is_never_zero(&self) -> bool {
        match self {
            Level::Zero | Level::Param(_) => false,
            Level::Succ(_) => true,
            Level::Max(a, b) => a.is_never_zero() || b.is_never_zero(),
            Level::IMax(_, b) => b.is_never_zero(),
        }
    }

    /// Split a level into its base and the number of outer successors.
    pub fn to_offset(&self) -> (&Level, u64) {
        let mut l = self;
        let mut k = 0;
        while let Level::Succ(inner) = l {
            l = inner;
            k += 1;
        }
        (l, k)
    }

    fn add_offset(self, k: u64) -> Level {
        let mut l = self;
        for _ in 0..k {
            l = l.succ();
        }
        l
    }

    /// Normalize a level.
    ///
    /// The normal form resolves `IMax` wherever its right component is known
    /// to be zero or never zero, distributes successors over `Max`, and sorts
    /// and deduplicates the components of nested `Max`es.  Two levels are
    /// equivalent for all parameter instantiations only if their normal forms
    /// coincide on the fragment without unresolved `IMax`; this is the
    /// documented approximation of the oracle.
    pub fn normalize(&self) -> Level {
        match self {
            Level::Zero | Level::Param(_) => self.clone(),
            Level::Succ(l) => l.normalize().succ(),
            Level::Max(a, b) => {
                let (na, ka) = {
                    let n = a.normalize();
                    let (base, k) = n.to_offset();
                    (base.clone(), k)
                };
                let (nb, kb) = {
                    let n = b.normalize();
                    let (base, k) = n.to_offset();
                    (base.clone(), k)
                };
                // max (l + i) (l + j) = l + max i j
                if na == nb {
                    return na.add_offset(ka.max(kb));
                }
                if na.is_zero() && ka <= kb {
                    return nb.add_offset(kb);
                }
                if nb.is_zero() && kb <= ka {
                    return na.add_offset(ka);
                }
                let mut components = Vec::new();
                collect_max_components(&na.add_offset(ka), &mut components);
                collect_max_components(&nb.add_offset(kb), &mut components);
                components.sort_by(level_cmp);
                components.dedup();
                let mut iter = components.into_iter();
                let first = iter.next().expect("max of no components");
                iter.fold(first, Level::max)
            }
            Level::IMax(a, b) => {
                let nb = b.normalize();
                if nb.is_zero() {
                    Level::Zero
                } else if nb.is_never_zero() {
                    Level::max(a.as_ref().clone(), nb).normalize()
                } else {
                    let na = a.normalize();
                    if na == nb { nb } else { Level::imax(na, nb) }
                }
            }
        }
    }

    /// The level-equality oracle: equivalence after normalization.
    pub fn is_equiv(&self, other: &Level) -> bool {
        self == other || self.normalize() == other.normalize()
    }

    /// Substitute level parameters, e.g. when instantiating the type of a
    /// level-polymorphic constant.  Parameters not listed are kept.
    pub fn instantiate_params(&self, params: &[Name], levels: &[Level]) -> Level {
        debug_assert_eq!(params.len(), levels.len());
        match self {
            Level::Zero => Level::Zero,
            Level::Succ(l) => l.instantiate_params(params, levels).succ(),
            Level::Max(a, b) => Level::max(
                a.instantiate_params(params, levels),
                b.instantiate_params(params, levels),
            ),
            Level::IMax(a, b) => Level::imax(
                a.instantiate_params(params, levels),
                b.instantiate_params(params, levels),
            ),
            Level::Param(n) => match params.iter().position(|p| p == n) {
                Some(i) => levels[i].clone(),
                None => self.clone(),
            },
        }
    }
}

fn collect_max_components(l: &Level, out: &mut Vec<Level>) {
    match l {
        Level::Max(a, b) => {
            collect_max_components(a, out);
            collect_max_components(b, out);
        }
        _ => out.push(l.clone()),
    }
}

/// A syntactic total order on levels, used to canonicalize `Max` components.
fn level_cmp(a: &Level, b: &Level) -> std::cmp::Ordering {
    fn rank(l: &Level) -> u8 {
        match l {
            Level::Zero => 0,
            Level::Succ(_) => 1,
            Level::Max(_, _) => 2,
            Level::IMax(_, _) => 3,
            Level::Param(_) => 4,
        }
    }
    use std::cmp::Ordering;
    match (a, b) {
        (Level::Succ(x), Level::Succ(y)) => level_cmp(x, y),
        (Level::Max(x1, y1), Level::Max(x2, y2)) | (Level::IMax(x1, y1), Level::IMax(x2, y2)) => {
            level_cmp(x1, x2).then_with(|| level_cmp(y1, y2))
        }
        (Level::Param(n), Level::Param(m)) => n.cmp(m),
        _ => rank(a).cmp(&rank(b)).then(Ordering::Equal),
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Zero => write!(f, "0"),
            Level::Succ(_) => {
                let (base, k) = self.to_offset();
                if base.is_zero() { write!(f, "{k}") } else { write!(f, "{base}+{k}") }
            }
            Level::Max(a, b) => write!(f, "max {a} {b}"),
            Level::IMax(a, b) => write!(f, "imax {a} {b}"),
            Level::Param(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(s: &str) -> Level {
        Level::Param(Name::from(s))
    }

    #[test]
    fn max_is_commutative_and_idempotent() {
        let u = param("u");
        let v = param("v");
        assert!(Level::max(u.clone(), v.clone()).is_equiv(&Level::max(v.clone(), u.clone())));
        assert!(Level::max(u.clone(), u.clone()).is_equiv(&u));
    }

    #[test]
    fn imax_zero_right_collapses() {
        let u = param("u");
        assert!(Level::imax(u.clone(), Level::Zero).is_equiv(&Level::Zero));
        assert!(Level::imax(u.clone(), Level::of_nat(1)).is_equiv(&Level::max(u, Level::of_nat(1))));
    }

    #[test]
    fn succ_distributes_over_equal_bases() {
        let u = param("u");
        let lhs = Level::max(u.clone().succ(), u.clone());
        assert!(lhs.is_equiv(&u.clone().succ()));
    }

    #[test]
    fn instantiate_params_replaces_only_listed() {
        let u = param("u");
        let inst = u.instantiate_params(&[Name::from("u")], &[Level::of_nat(2)]);
        assert_eq!(inst, Level::of_nat(2));
        let keep = param("v").instantiate_params(&[Name::from("u")], &[Level::of_nat(2)]);
        assert_eq!(keep, param("v"));
    }
}
