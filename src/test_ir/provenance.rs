//! Pointer provenance for TIR.
//!
//! Every pointer value is traced back to a base (a global, a stack slot or a
//! function argument) plus a constant byte offset. Pointers that cannot be
//! traced (loaded pointers, phis, arithmetic, opaque values) have no location.

use super::{Operation, TestIR, ValueType};
use crate::core::Visibility;
use std::fmt;

/// Storage a pointer is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemBase {
    /// Index into [`TestIR::globals`].
    Global(u32),
    /// Value index of the `alloca`.
    Stack(u32),
    /// Value index of the argument.
    Param(u32),
}

/// Location descriptor handed to the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TirLocation {
    pub base: MemBase,
    pub offset: u32,
}

impl fmt::Display for TirLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base {
            MemBase::Global(g) => write!(f, "global#{}", g)?,
            MemBase::Stack(s) => write!(f, "stack#{}", s)?,
            MemBase::Param(p) => write!(f, "param#{}", p)?,
        }
        write!(f, "+{}", self.offset)
    }
}

#[derive(Debug, Clone)]
pub struct Provenance {
    /// Location of each value used as a pointer, by value index.
    locations: Vec<Option<TirLocation>>,
    /// Whether the alloca at a value index escapes.
    escaped: Vec<bool>,
}

impl Provenance {
    pub fn compute(ir: &TestIR) -> Self {
        let mut locations: Vec<Option<TirLocation>> = ir
            .values
            .iter()
            .enumerate()
            .map(|(idx, value)| {
                let base = match (value.value_type, value.op) {
                    (ValueType::Arg, _) => MemBase::Param(idx as u32),
                    (_, Operation::Alloca) => MemBase::Stack(idx as u32),
                    (_, Operation::Addr) => MemBase::Global(ir.imm(idx as u32, 0)),
                    _ => return None,
                };
                Some(TirLocation { base, offset: 0 })
            })
            .collect();

        // Offsets may use a base defined later in block order.
        let offsets: Vec<u32> = (0..ir.values.len() as u32)
            .filter(|&idx| ir.values[idx as usize].op == Operation::Offset)
            .collect();
        let mut changed = true;
        while changed {
            changed = false;
            for &idx in &offsets {
                if locations[idx as usize].is_some() {
                    continue;
                }
                if let Some(base) = locations[ir.operands(idx)[0] as usize] {
                    locations[idx as usize] = Some(TirLocation {
                        base: base.base,
                        offset: base.offset.wrapping_add(ir.imm(idx, 0)),
                    });
                    changed = true;
                }
            }
        }

        let mut escaped = vec![false; ir.values.len()];
        for (idx, value) in ir.values.iter().enumerate() {
            for (pos, &operand) in ir.operands(idx as u32).iter().enumerate() {
                let address_use = pos == 0
                    && value.value_type != ValueType::Phi
                    && matches!(value.op, Operation::Load | Operation::Store | Operation::Offset);
                if address_use {
                    continue;
                }
                if let Some(TirLocation { base: MemBase::Stack(slot), .. }) = locations[operand as usize] {
                    escaped[slot as usize] = true;
                }
            }
        }

        Self { locations, escaped }
    }

    /// Location of a pointer value.
    pub fn location(&self, value: u32) -> Option<TirLocation> {
        self.locations.get(value as usize).copied().flatten()
    }

    /// Location accessed by a load or store.
    pub fn access_location(&self, ir: &TestIR, inst: u32) -> Option<TirLocation> {
        match ir.values[inst as usize].op {
            Operation::Load | Operation::Store => self.location(ir.operands(inst)[0]),
            _ => None,
        }
    }

    pub fn slot_escapes(&self, slot: u32) -> bool {
        self.escaped.get(slot as usize).copied().unwrap_or(true)
    }

    pub fn visibility(&self, location: Option<&TirLocation>) -> Visibility {
        match location.map(|l| l.base) {
            Some(MemBase::Stack(slot)) if !self.slot_escapes(slot) => Visibility::Local,
            _ => Visibility::ProcessVisible,
        }
    }
}
