//! tsofence - TSO fence insertion for SSA-based IRs.
//!
//! The pass finds pairs of memory accesses whose program order Total Store
//! Order does not preserve on its own and places sequentially consistent
//! fences so that it does. It is written against the [`IrAdaptor`] and
//! [`AliasOracle`] traits, so any host IR with an alias analysis can use it.
//!
//! # Primary Usage
//!
//! ```ignore
//! use tsofence::core::FenceSession;
//! use tsofence::tso::{FenceInsertionPass, PassConfig};
//! use bumpalo::Bump;
//!
//! // One arena and session per run
//! let arena = Bump::new();
//! let session = FenceSession::new(&arena);
//!
//! let pass = FenceInsertionPass::with_config(&session, PassConfig::default());
//! let result = pass.run(&mut adaptor, &oracle);
//! if result.modified() {
//!     // invalidate downstream analyses
//! }
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Host traits, errors and the per-run session
//! - [`tso`] - Event collection, hazard classification, graph, planner, pass
//! - [`test_ir`] - A small textual IR used by the tests and the CLI

pub mod core;
pub mod test_ir;
pub mod tso;

pub use self::core::{
    AliasOracle, AliasResult, FenceError, FenceResult, FenceSession, InstKind, IrAdaptor,
    SessionStats, Visibility,
};
pub use self::tso::{
    FenceDirective, FenceInsertionPass, FenceOrdering, HazardPolicy, MemoryAccessEvent,
    MemoryDependencyGraph, ModuleState, PairKind, PairScope, PassConfig, RunResult,
};
