//! TSO fence insertion.
//!
//! - [`event`] - Memory-access events
//! - [`collector`] - Per-function event collection
//! - [`hazard`] - TSO hazard classification
//! - [`graph`] - Memory dependency graph and its builder
//! - [`planner`] - Fence directives from the graph
//! - [`pass`] - Whole-module orchestration

pub mod collector;
pub mod event;
pub mod graph;
pub mod hazard;
pub mod pass;
pub mod planner;

pub use collector::AccessCollector;
pub use event::{AccessKind, EventId, EventOf, MemoryAccessEvent};
pub use graph::{Edge, GraphBuilder, MemoryDependencyGraph, PairScope};
pub use hazard::{is_hazard, HazardPolicy, PairKind};
pub use pass::{
    EventRecord, FenceInsertionPass, HazardRecord, ModuleState, PassConfig, RunResult,
};
pub use planner::{FenceDirective, FenceOrdering, FencePlanner};
