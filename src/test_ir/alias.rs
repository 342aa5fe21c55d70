//! Alias oracle backed by TIR pointer provenance.

use super::adaptor::FuncRef;
use super::provenance::{MemBase, Provenance, TirLocation};
use super::TestIR;
use crate::core::{AliasOracle, AliasResult, FenceError, FenceResult};
use hashbrown::HashSet;
use std::rc::Rc;

/// Bytes touched by one TIR load or store.
pub const ACCESS_SIZE: u32 = 4;

/// Answers alias queries from the bases and offsets computed by [`Provenance`].
///
/// Same base: must-alias when the offsets match, no-alias when the accesses
/// are at least [`ACCESS_SIZE`] bytes apart, may-alias when they partially
/// overlap. Distinct globals and stack slots never alias.
/// An argument may point anywhere except a stack slot that never escapes.
#[derive(Debug, Clone)]
pub struct TestAliasOracle {
    provenance: Rc<Provenance>,
    unavailable: HashSet<u32>,
}

impl TestAliasOracle {
    pub fn new(provenance: Rc<Provenance>) -> Self {
        Self { provenance, unavailable: HashSet::new() }
    }

    /// Pretend no alias information exists for `func`.
    pub fn disable_function(&mut self, func: FuncRef) {
        self.unavailable.insert(func.0);
    }

    pub fn disable_by_name(&mut self, ir: &TestIR, name: &str) -> FenceResult<()> {
        let func = ir
            .func_index(name)
            .ok_or_else(|| FenceError::UnknownFunction { name: name.to_string() })?;
        self.disable_function(FuncRef(func));
        Ok(())
    }
}

impl AliasOracle for TestAliasOracle {
    type Location = TirLocation;
    type FuncRef = FuncRef;

    fn covers(&self, func: FuncRef) -> bool {
        !self.unavailable.contains(&func.0)
    }

    fn alias(&self, a: &TirLocation, b: &TirLocation) -> AliasResult {
        use MemBase::*;
        match (a.base, b.base) {
            (x, y) if x == y => {
                let distance = a.offset.abs_diff(b.offset);
                if distance == 0 {
                    AliasResult::MustAlias
                } else if distance >= ACCESS_SIZE {
                    AliasResult::NoAlias
                } else {
                    AliasResult::MayAlias
                }
            }
            (Param(_), Stack(slot)) | (Stack(slot), Param(_)) => {
                if self.provenance.slot_escapes(slot) {
                    AliasResult::MayAlias
                } else {
                    AliasResult::NoAlias
                }
            }
            (Param(_), _) | (_, Param(_)) => AliasResult::MayAlias,
            _ => AliasResult::NoAlias,
        }
    }
}
