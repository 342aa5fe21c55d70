// This module defines the IrAdaptor trait, which serves as the bridge between the fence
// insertion pass and the host compiler's intermediate representation. The pass never owns
// or copies instructions: every function, block and instruction is an opaque Copy handle
// that only the adaptor can interpret. The trait exposes the minimal set of queries the
// analysis needs (enumerate functions, tell declarations apart from definitions, iterate
// blocks and instructions in program order, classify an instruction as Load/Store/Other,
// hand out the location descriptor and visibility of a memory access) plus the single
// mutation primitive the pass issues: insert a fence immediately before an instruction.
// Location descriptors are opaque as well; they are only ever compared through the alias
// oracle, never by address.

//! IrAdaptor responsibilities.
//!
//! The adaptor is the glue between the pass and the host IR. The framework
//! assumes:
//! - Functions are either declarations (no body) or a sequence of blocks.
//! - Block and instruction iteration order is program order.
//! - Instruction handles stay valid while fences are inserted; the pass
//!   computes every insertion point before it issues the first one.
//!
//! Implementations may preprocess data in `switch_func` to speed up later calls.

/// Coarse instruction classification seen by the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstKind {
    Load,
    Store,
    Other,
}

/// Whether an access may be observed from outside the current function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Provably private to the function, e.g. a stack slot that never escapes.
    Local,
    /// Globals, escaped parameters, escaped stack slots and unknown pointers.
    ProcessVisible,
}

impl Visibility {
    pub const fn is_process_visible(self) -> bool {
        matches!(self, Visibility::ProcessVisible)
    }
}

/// Bridge between a host IR and the fence insertion pass.
///
/// The [`IrAdaptor`] trait provides the hooks the pass needs to walk an
/// arbitrary IR and to place fences in it. Only loads and stores are
/// interesting; every other instruction reports [`InstKind::Other`] and is
/// skipped by the collector.
pub trait IrAdaptor {
    type InstRef: Copy + Eq + core::hash::Hash + core::fmt::Debug;
    type BlockRef: Copy + Eq;
    type FuncRef: Copy + Eq + core::hash::Hash + core::fmt::Debug;
    /// Abstract memory location touched by a load or store.
    type Location: Clone + core::fmt::Debug;

    /// Number of functions contained in the module.
    fn func_count(&self) -> u32;

    /// Iterator over all functions in the module, in module order.
    fn funcs(&self) -> Box<dyn Iterator<Item = Self::FuncRef> + '_>;

    /// Linkage name of the function.
    fn func_link_name(&self, func: Self::FuncRef) -> &str;

    /// Whether the function is only declared (its body is not available).
    fn func_is_declaration(&self, func: Self::FuncRef) -> bool;

    /// Switch to the given function before walking its body.
    fn switch_func(&mut self, func: Self::FuncRef) -> bool;

    /// Iterator over blocks in the current function.
    ///
    /// ```ignore
    /// adaptor.switch_func(func);
    /// for block in adaptor.blocks() {
    ///     for inst in adaptor.block_insts(block) {
    ///         let _ = adaptor.inst_kind(inst);
    ///     }
    /// }
    /// ```
    fn blocks(&self) -> Box<dyn Iterator<Item = Self::BlockRef> + '_>;

    /// Iterator over instructions of the given block.
    fn block_insts(&self, block: Self::BlockRef) -> Box<dyn Iterator<Item = Self::InstRef> + '_>;

    /// Load, Store or Other.
    fn inst_kind(&self, inst: Self::InstRef) -> InstKind;

    /// Location accessed by a load or store.
    ///
    /// `None` means the host could not resolve a descriptor. The pass treats
    /// such accesses as aliasing everything.
    fn inst_location(&self, inst: Self::InstRef) -> Option<Self::Location>;

    /// Visibility of the storage accessed by a load or store.
    fn inst_visibility(&self, inst: Self::InstRef) -> Visibility;

    /// Whether a fence already sits immediately before the instruction.
    fn has_fence_before(&self, _inst: Self::InstRef) -> bool {
        false
    }

    /// Insert a sequentially consistent fence immediately before `inst`.
    ///
    /// The pass calls this at most once per instruction and run.
    fn insert_fence_before(&mut self, inst: Self::InstRef);

    /// Get the name of a block (for printing).
    fn block_name(&self, _block: Self::BlockRef) -> &str {
        ""
    }
}
