//! TestIR adaptor implementation for the fence pass.
//!
//! This adaptor lets the pass run on TestIR, enabling tests of the whole
//! pipeline on small hand-written modules. Fence insertion is recorded
//! rather than applied in place; [`TestIRAdaptor::fenced_ir`] produces the
//! rewritten module.

use super::alias::TestAliasOracle;
use super::provenance::{Provenance, TirLocation};
use super::{Operation, TestIR, ValueType};
use crate::core::{InstKind, IrAdaptor, Visibility};
use std::collections::BTreeSet;
use std::rc::Rc;

/// Type aliases for TestIR references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstRef(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncRef(pub u32);

/// Adaptor that implements IrAdaptor for TestIR
pub struct TestIRAdaptor<'ir> {
    ir: &'ir TestIR,
    cur_func: u32,
    provenance: Rc<Provenance>,
    inserted: BTreeSet<u32>,
}

impl<'ir> TestIRAdaptor<'ir> {
    pub fn new(ir: &'ir TestIR) -> Self {
        Self {
            ir,
            cur_func: 0,
            provenance: Rc::new(Provenance::compute(ir)),
            inserted: BTreeSet::new(),
        }
    }

    pub fn ir(&self) -> &'ir TestIR {
        self.ir
    }

    pub fn func_by_name(&self, name: &str) -> Option<FuncRef> {
        self.ir.func_index(name).map(FuncRef)
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Oracle answering from this module's provenance.
    pub fn alias_oracle(&self) -> TestAliasOracle {
        TestAliasOracle::new(Rc::clone(&self.provenance))
    }

    /// TIR text of an instruction.
    pub fn inst_text(&self, inst: InstRef) -> String {
        self.ir.format_inst(inst.0)
    }

    /// Instructions a fence was inserted before, in module order.
    pub fn inserted_fences(&self) -> impl Iterator<Item = InstRef> + '_ {
        self.inserted.iter().copied().map(InstRef)
    }

    /// The module with every inserted fence written out, parsed again.
    pub fn fenced_ir(&self) -> Result<TestIR, String> {
        TestIR::parse(&self.ir.write_tir(|idx| self.inserted.contains(&idx)))
    }
}

impl<'ir> IrAdaptor for TestIRAdaptor<'ir> {
    type InstRef = InstRef;
    type BlockRef = BlockRef;
    type FuncRef = FuncRef;
    type Location = TirLocation;

    fn func_count(&self) -> u32 {
        self.ir.functions.len() as u32
    }

    fn funcs(&self) -> Box<dyn Iterator<Item = Self::FuncRef> + '_> {
        Box::new((0..self.ir.functions.len()).map(|i| FuncRef(i as u32)))
    }

    fn func_link_name(&self, func: Self::FuncRef) -> &str {
        &self.ir.functions[func.0 as usize].name
    }

    fn func_is_declaration(&self, func: Self::FuncRef) -> bool {
        self.ir.functions[func.0 as usize].declaration
    }

    fn switch_func(&mut self, func: Self::FuncRef) -> bool {
        self.cur_func = func.0;
        !self.func_is_declaration(func)
    }

    fn blocks(&self) -> Box<dyn Iterator<Item = Self::BlockRef> + '_> {
        let func = &self.ir.functions[self.cur_func as usize];
        Box::new((func.block_begin_idx..func.block_end_idx).map(BlockRef))
    }

    fn block_insts(&self, block: Self::BlockRef) -> Box<dyn Iterator<Item = Self::InstRef> + '_> {
        let block_info = &self.ir.blocks[block.0 as usize];
        Box::new((block_info.phi_end_idx..block_info.inst_end_idx).map(InstRef))
    }

    fn inst_kind(&self, inst: Self::InstRef) -> InstKind {
        let value = &self.ir.values[inst.0 as usize];
        match (value.value_type, value.op) {
            (ValueType::Normal, Operation::Load) => InstKind::Load,
            (ValueType::Normal, Operation::Store) => InstKind::Store,
            _ => InstKind::Other,
        }
    }

    fn inst_location(&self, inst: Self::InstRef) -> Option<Self::Location> {
        self.provenance.access_location(self.ir, inst.0)
    }

    fn inst_visibility(&self, inst: Self::InstRef) -> Visibility {
        self.provenance.visibility(self.inst_location(inst).as_ref())
    }

    fn has_fence_before(&self, inst: Self::InstRef) -> bool {
        // Values of a block are contiguous and a fence never ends one.
        self.inserted.contains(&inst.0)
            || (inst.0 > 0 && self.ir.values[inst.0 as usize - 1].op == Operation::Fence)
    }

    fn insert_fence_before(&mut self, inst: Self::InstRef) {
        self.inserted.insert(inst.0);
    }

    fn block_name(&self, block: Self::BlockRef) -> &str {
        &self.ir.blocks[block.0 as usize].name
    }
}
