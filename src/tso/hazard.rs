// This module implements the hazard classifier: the single decision of whether an ordered
// pair of memory accesses must keep its order under Total Store Order. TSO lets a store be
// satisfied after a later load (store buffering), so write-then-read is never a hazard.
// Read-then-write and write-then-write are. Read-then-read is classified as a hazard by
// default, which is stricter than TSO hardware requires; compiler and scheduler reordering
// of reads can still expose stale values, and relaxing it is an explicit opt-in on the
// policy. Accesses the alias oracle proves disjoint are never hazardous. The classifier
// is pure: it receives the alias verdict as an argument and never queries the oracle.

//! Hazard classification under TSO.

use super::event::{AccessKind, MemoryAccessEvent};
use crate::core::AliasResult;
use std::fmt;

/// Ordered pair of access kinds, named after the original program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairKind {
    /// Load then store.
    ReadWrite,
    /// Store then store.
    WriteWrite,
    /// Load then load.
    ReadRead,
    /// Store then load; permitted by TSO.
    WriteRead,
}

impl PairKind {
    pub const fn from_kinds(first: AccessKind, second: AccessKind) -> Self {
        match (first, second) {
            (AccessKind::Load, AccessKind::Store) => PairKind::ReadWrite,
            (AccessKind::Store, AccessKind::Store) => PairKind::WriteWrite,
            (AccessKind::Load, AccessKind::Load) => PairKind::ReadRead,
            (AccessKind::Store, AccessKind::Load) => PairKind::WriteRead,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            PairKind::ReadWrite => "RW",
            PairKind::WriteWrite => "WW",
            PairKind::ReadRead => "RR",
            PairKind::WriteRead => "WR",
        }
    }
}

impl fmt::Display for PairKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which pair kinds require ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HazardPolicy {
    /// Treat load-then-load as a hazard.
    pub read_read: bool,
}

impl HazardPolicy {
    /// TSO with conservative read-read ordering.
    pub const TSO: Self = Self { read_read: true };

    /// Plain TSO hardware model: only RW and WW need ordering.
    pub const TSO_RELAXED_READS: Self = Self { read_read: false };

    /// Whether the pair kind must keep its order, assuming the accesses overlap.
    pub const fn requires_ordering(&self, pair: PairKind) -> bool {
        match pair {
            PairKind::ReadWrite | PairKind::WriteWrite => true,
            PairKind::ReadRead => self.read_read,
            PairKind::WriteRead => false,
        }
    }

    /// Classify access kinds `first` (earlier) and `second` (later).
    pub const fn is_hazard_kinds(
        &self,
        first: AccessKind,
        second: AccessKind,
        verdict: AliasResult,
    ) -> bool {
        verdict.may_overlap() && self.requires_ordering(PairKind::from_kinds(first, second))
    }

    /// Classify an earlier event `first` against a later event `second`.
    pub fn is_hazard<I, F, L>(
        &self,
        first: &MemoryAccessEvent<I, F, L>,
        second: &MemoryAccessEvent<I, F, L>,
        verdict: AliasResult,
    ) -> bool {
        self.is_hazard_kinds(first.kind, second.kind, verdict)
    }
}

impl Default for HazardPolicy {
    fn default() -> Self {
        Self::TSO
    }
}

/// Classify with the default TSO policy.
pub fn is_hazard<I, F, L>(
    first: &MemoryAccessEvent<I, F, L>,
    second: &MemoryAccessEvent<I, F, L>,
    verdict: AliasResult,
) -> bool {
    HazardPolicy::TSO.is_hazard(first, second, verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Visibility;

    const KINDS: [AccessKind; 2] = [AccessKind::Load, AccessKind::Store];
    const VERDICTS: [AliasResult; 3] =
        [AliasResult::NoAlias, AliasResult::MayAlias, AliasResult::MustAlias];

    fn event(id: u32, kind: AccessKind) -> MemoryAccessEvent<u32, u32, ()> {
        MemoryAccessEvent {
            id,
            kind,
            location: Some(()),
            inst: id,
            func: 0,
            block: 0,
            order: id,
            visibility: Visibility::ProcessVisible,
        }
    }

    #[test]
    fn test_write_read_never_hazard() {
        for verdict in VERDICTS {
            assert!(!is_hazard(&event(0, AccessKind::Store), &event(1, AccessKind::Load), verdict));
        }
    }

    #[test]
    fn test_ordering_pairs_with_overlap_are_hazards() {
        let pairs = [
            (AccessKind::Load, AccessKind::Store),
            (AccessKind::Store, AccessKind::Store),
            (AccessKind::Load, AccessKind::Load),
        ];
        for (first, second) in pairs {
            for verdict in [AliasResult::MayAlias, AliasResult::MustAlias] {
                assert!(
                    is_hazard(&event(0, first), &event(1, second), verdict),
                    "{:?} -> {:?} with {}",
                    first,
                    second,
                    verdict
                );
            }
        }
    }

    #[test]
    fn test_no_alias_never_hazard() {
        for first in KINDS {
            for second in KINDS {
                assert!(!is_hazard(&event(0, first), &event(1, second), AliasResult::NoAlias));
            }
        }
    }

    #[test]
    fn test_relaxed_reads() {
        let policy = HazardPolicy::TSO_RELAXED_READS;
        assert!(!policy.is_hazard_kinds(AccessKind::Load, AccessKind::Load, AliasResult::MustAlias));
        assert!(policy.is_hazard_kinds(AccessKind::Load, AccessKind::Store, AliasResult::MustAlias));
        assert!(policy.is_hazard_kinds(AccessKind::Store, AccessKind::Store, AliasResult::MayAlias));
        assert_eq!(HazardPolicy::default(), HazardPolicy::TSO);
    }

    #[test]
    fn test_pair_labels() {
        assert_eq!(PairKind::from_kinds(AccessKind::Load, AccessKind::Store).label(), "RW");
        assert_eq!(PairKind::from_kinds(AccessKind::Store, AccessKind::Store).label(), "WW");
        assert_eq!(PairKind::from_kinds(AccessKind::Load, AccessKind::Load).label(), "RR");
        assert_eq!(PairKind::from_kinds(AccessKind::Store, AccessKind::Load).to_string(), "WR");
    }
}
