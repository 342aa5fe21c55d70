// This module serves as the central hub for the framework seams shared by every part of the
// fence insertion pass: the IrAdaptor trait through which the host IR is walked and mutated,
// the AliasOracle trait through which location descriptors are compared, the arena-backed
// FenceSession that scopes one run's events and statistics, and the error types. Nothing
// in here knows about TSO; the memory-model logic lives in the tso module.

//! Core infrastructure
//!
//! # Key Components
//!
//! ## IR Adaptor (`adaptor`)
//! - Function, block and instruction enumeration in program order
//! - Load/Store/Other classification, location descriptors, visibility
//! - The "insert fence before instruction" mutation primitive
//!
//! ## Alias Oracle (`alias`)
//! - `NoAlias` / `MayAlias` / `MustAlias` verdicts
//! - Conservative handling of unresolved descriptors
//!
//! ## Session Management (`session`)
//! - Arena-based allocation using `bumpalo`
//! - Per-run statistics

pub mod adaptor;
pub mod alias;
pub mod error;
pub mod session;
pub mod test_utils;

pub use adaptor::{InstKind, IrAdaptor, Visibility};

pub use alias::{AliasOracle, AliasResult};

pub use error::{FenceError, FenceResult};

pub use session::{FenceSession, SessionStats};
