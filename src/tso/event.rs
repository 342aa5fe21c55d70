//! Memory-access events.
//!
//! An event is one load or store of the analysed module, captured with just
//! enough context to classify it against other events: its kind, the opaque
//! location descriptor from the host, and non-owning handles back into the
//! host IR. Events are immutable once collected.

use crate::core::{InstKind, IrAdaptor, Visibility};
use std::fmt;

/// Index of an event in a run's discovery order.
pub type EventId = u32;

/// Direction of a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Load,
    Store,
}

impl AccessKind {
    /// Map the adaptor's instruction classification onto an access kind.
    pub const fn from_inst_kind(kind: InstKind) -> Option<Self> {
        match kind {
            InstKind::Load => Some(AccessKind::Load),
            InstKind::Store => Some(AccessKind::Store),
            InstKind::Other => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            AccessKind::Load => "load",
            AccessKind::Store => "store",
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One load or store, in program order.
#[derive(Debug, Clone)]
pub struct MemoryAccessEvent<I, F, L> {
    /// Position in the run-wide discovery order.
    pub id: EventId,
    pub kind: AccessKind,
    /// Descriptor for the oracle; `None` when the host could not resolve one.
    pub location: Option<L>,
    /// Source instruction (non-owning).
    pub inst: I,
    /// Enclosing function (non-owning).
    pub func: F,
    /// Ordinal of the enclosing block within the function.
    pub block: u32,
    /// Strictly increasing within one function.
    pub order: u32,
    pub visibility: Visibility,
}

/// Event type produced for a given adaptor.
pub type EventOf<A> = MemoryAccessEvent<
    <A as IrAdaptor>::InstRef,
    <A as IrAdaptor>::FuncRef,
    <A as IrAdaptor>::Location,
>;

impl<I, F, L> MemoryAccessEvent<I, F, L> {
    pub fn is_load(&self) -> bool {
        self.kind == AccessKind::Load
    }

    pub fn is_store(&self) -> bool {
        self.kind == AccessKind::Store
    }

    pub fn is_process_visible(&self) -> bool {
        self.visibility.is_process_visible()
    }

    /// Whether `self` comes before `other` in the order edges are oriented by.
    pub fn precedes(&self, other: &Self) -> bool {
        self.id < other.id
    }
}

impl<I: PartialEq, F: PartialEq, L> MemoryAccessEvent<I, F, L> {
    /// Same function, and the same block ordinal.
    pub fn same_block(&self, other: &Self) -> bool {
        self.func == other.func && self.block == other.block
    }
}
