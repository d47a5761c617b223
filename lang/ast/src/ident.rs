use std::fmt;
use std::rc::Rc;

/// A hierarchical name for constants and level parameters.
///
/// Names are built from string and numeric components appended to a prefix,
/// e.g. `Nat.succ` is `Str(Str(Anonymous, "Nat"), "succ")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Name {
    /// The root (empty) name.
    Anonymous,
    /// A string component appended to a prefix name.
    Str(Rc<Name>, String),
    /// A numeric component appended to a prefix name.
    Num(Rc<Name>, u64),
}

impl Name {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Name::Anonymous)
    }

    /// Append a string component.
    pub fn str(self, s: impl Into<String>) -> Name {
        Name::Str(Rc::new(self), s.into())
    }

    /// Append a numeric component.
    pub fn num(self, n: u64) -> Name {
        Name::Num(Rc::new(self), n)
    }
}

/// Parse a dot-separated name, e.g. `"Nat.succ"`.
impl From<&str> for Name {
    fn from(s: &str) -> Self {
        s.split('.').filter(|c| !c.is_empty()).fold(Name::Anonymous, |pre, c| pre.str(c))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Anonymous => Ok(()),
            Name::Str(pre, s) => {
                if !pre.is_anonymous() {
                    write!(f, "{pre}.")?;
                }
                write!(f, "{s}")
            }
            Name::Num(pre, n) => {
                if !pre.is_anonymous() {
                    write!(f, "{pre}.")?;
                }
                write!(f, "{n}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_roundtrip() {
        let n = Name::from("Nat.succ");
        assert_eq!(n.to_string(), "Nat.succ");
        assert_eq!(n, Name::Anonymous.str("Nat").str("succ"));
    }

    #[test]
    fn numeric_components() {
        let n = Name::from("foo").num(0);
        assert_eq!(n.to_string(), "foo.0");
        assert_ne!(n, Name::from("foo").num(1));
    }
}
