//!
//! Filter lookup operators.
//!

use bitflags::bitflags;

use crate::{NodeEdgeError, NodeEdgeResult};

bitflags! {
    /// A base lookup, optionally combined with [`Lookup::NOT`].
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub struct Lookup: u16 {
        const NOT = 1 << 0;
        const EQUAL = 1 << 1;
        const IN = 1 << 2;
        const GE = 1 << 3;
        const GT = 1 << 4;
        const LE = 1 << 5;
        const LT = 1 << 6;
        const EXISTS = 1 << 7;
        const LIKE = 1 << 8;
        const ILIKE = 1 << 9;
    }
}

impl Lookup {
    /// Base lookups that may be combined with [`Lookup::NOT`].
    pub const fn allowed_negate_expr() -> [Lookup; 5] {
        [
            Self::EQUAL,
            Self::IN,
            Self::EXISTS,
            Self::LIKE,
            Self::ILIKE,
        ]
    }

    /// The lookup without [`Lookup::NOT`].
    pub fn base(self) -> Self {
        self.difference(Self::NOT)
    }

    pub fn can_negate(self) -> bool {
        Self::allowed_negate_expr().contains(&self.base())
    }

    pub fn is_negate_expr(self) -> bool {
        self.contains(Self::NOT)
    }

    pub fn is_func_lookup(self) -> bool {
        self.contains(Self::EXISTS)
    }

    pub fn is_in_lookup(self) -> bool {
        self.contains(Self::IN)
    }

    pub fn is_equal_lookup(self) -> bool {
        self.contains(Self::EQUAL)
    }

    pub fn can_jsonable_as_value(self) -> bool {
        self.is_equal_lookup() || self.is_in_lookup()
    }

    pub fn can_subquery_as_value(self) -> bool {
        self.is_equal_lookup() || self.is_in_lookup()
    }

    /// Flag names joined by `|`, e.g. `NOT|EQUAL`.
    pub fn as_jsonable_value(self) -> String {
        self.iter_names()
            .map(|(name, _)| name)
            .collect::<Vec<_>>()
            .join("|")
    }

    pub fn find_member(name: &str) -> NodeEdgeResult<Self> {
        name.split('|')
            .map(|part| {
                Self::from_name(part.trim()).ok_or_else(|| {
                    NodeEdgeError::Value(format!("'{}' is not a valid Lookup", part))
                })
            })
            .try_fold(Self::empty(), |lookup, member| Ok(lookup | member?))
    }

    pub fn find_by_bits(bits: u16) -> NodeEdgeResult<Self> {
        Self::from_bits(bits)
            .ok_or_else(|| NodeEdgeError::Value(format!("{} is not a valid Lookup", bits)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_rules() {
        assert!(Lookup::EQUAL.can_negate());
        assert!((Lookup::NOT | Lookup::IN).can_negate());
        assert!(!Lookup::GT.can_negate());
        assert!(!Lookup::LE.can_negate());
        assert!((Lookup::NOT | Lookup::LIKE).is_negate_expr());
    }

    #[test]
    fn predicates() {
        assert!(Lookup::EXISTS.is_func_lookup());
        assert!((Lookup::NOT | Lookup::IN).is_in_lookup());
        assert!(Lookup::EQUAL.can_jsonable_as_value());
        assert!(!Lookup::LIKE.can_subquery_as_value());
    }

    #[test]
    fn names() {
        let lookup = Lookup::NOT | Lookup::EQUAL;
        assert_eq!(lookup.as_jsonable_value(), "NOT|EQUAL");
        assert_eq!(Lookup::find_member("NOT|EQUAL").unwrap(), lookup);
        assert_eq!(Lookup::find_member("ILIKE").unwrap(), Lookup::ILIKE);
        assert!(Lookup::find_member("BETWEEN").is_err());
        assert_eq!(Lookup::find_by_bits(2).unwrap(), Lookup::EQUAL);
        assert!(Lookup::find_by_bits(1 << 12).is_err());
    }
}
