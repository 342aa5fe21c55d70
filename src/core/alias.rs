//! May-alias oracle interface.
//!
//! The pass does not implement alias analysis. It asks an [`AliasOracle`]
//! whether two location descriptors can overlap and only distinguishes
//! "provably disjoint" from everything else.

use std::fmt;

/// Verdict of a may-alias query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasResult {
    NoAlias,
    MayAlias,
    MustAlias,
}

impl AliasResult {
    /// `MayAlias` and `MustAlias` are treated identically by the pass.
    pub const fn may_overlap(self) -> bool {
        !matches!(self, AliasResult::NoAlias)
    }
}

impl fmt::Display for AliasResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AliasResult::NoAlias => "NoAlias",
            AliasResult::MayAlias => "MayAlias",
            AliasResult::MustAlias => "MustAlias",
        };
        f.write_str(name)
    }
}

/// Alias oracle provided by the host.
pub trait AliasOracle {
    type Location;
    type FuncRef;

    /// Whether alias information exists for the function.
    ///
    /// Functions without it are left untouched by the pass.
    fn covers(&self, _func: Self::FuncRef) -> bool {
        true
    }

    /// May-alias query between two locations.
    fn alias(&self, a: &Self::Location, b: &Self::Location) -> AliasResult;
}

/// Resolve the verdict for two possibly-unresolved descriptors.
///
/// A missing descriptor can never be proven disjoint from anything.
pub fn query<O: AliasOracle>(
    oracle: &O,
    a: Option<&O::Location>,
    b: Option<&O::Location>,
) -> AliasResult {
    match (a, b) {
        (Some(a), Some(b)) => oracle.alias(a, b),
        _ => AliasResult::MayAlias,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Disjoint;

    impl AliasOracle for Disjoint {
        type Location = u32;
        type FuncRef = u32;

        fn alias(&self, a: &u32, b: &u32) -> AliasResult {
            if a == b { AliasResult::MustAlias } else { AliasResult::NoAlias }
        }
    }

    #[test]
    fn test_missing_location_is_may_alias() {
        assert_eq!(query(&Disjoint, Some(&1), None), AliasResult::MayAlias);
        assert_eq!(query(&Disjoint, None, Some(&1)), AliasResult::MayAlias);
        assert_eq!(query(&Disjoint, None, None), AliasResult::MayAlias);
    }

    #[test]
    fn test_resolved_locations_ask_oracle() {
        assert_eq!(query(&Disjoint, Some(&1), Some(&1)), AliasResult::MustAlias);
        assert_eq!(query(&Disjoint, Some(&1), Some(&2)), AliasResult::NoAlias);
        assert!(Disjoint.covers(0));
    }

    #[test]
    fn test_may_overlap() {
        assert!(!AliasResult::NoAlias.may_overlap());
        assert!(AliasResult::MayAlias.may_overlap());
        assert!(AliasResult::MustAlias.may_overlap());
    }
}
