// This module provides arena-based session management for one fence insertion run using
// the bumpalo crate. FenceSession owns a borrowed arena and the run's statistics: every
// memory-access event collected during the run is allocated in the arena and shares its
// lifetime, so the dependency graph can refer to events by index without copying them.
// A session is created fresh for a run and dropped afterwards; no state survives between
// runs. SessionStats counts what the run looked at and what it changed (functions analysed
// or skipped, events, unresolved locations, pairs examined, edges, directives, fences) and
// renders them through Display for the command-line driver.

//! Arena-based session management for a pass run.
//!
//! All per-run objects are tied to the session lifetime, eliminating complex
//! lifetime propagation.

use bumpalo::Bump;
use std::cell::RefCell;
use std::fmt;

/// Arena-based fence insertion session.
///
/// Statistics live behind a `RefCell` so that collector, builder and planner
/// can record into a shared `&FenceSession`.
pub struct FenceSession<'arena> {
    /// Arena allocator for per-run objects.
    arena: &'arena Bump,

    /// Run statistics.
    stats: RefCell<SessionStats>,
}

impl<'arena> FenceSession<'arena> {
    /// Create a new session with the given arena.
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            stats: RefCell::new(SessionStats::default()),
        }
    }

    /// Get access to the arena allocator.
    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    pub fn record_function_analyzed(&self) {
        self.stats.borrow_mut().functions_analyzed += 1;
    }

    pub fn record_declaration_skipped(&self) {
        self.stats.borrow_mut().declarations_skipped += 1;
    }

    pub fn record_function_skipped(&self) {
        self.stats.borrow_mut().functions_skipped += 1;
    }

    /// Record one collected event.
    pub fn record_event(&self, process_visible: bool, resolved: bool) {
        let mut stats = self.stats.borrow_mut();
        stats.events_collected += 1;
        if process_visible {
            stats.process_visible_events += 1;
        }
        if !resolved {
            stats.unresolved_locations += 1;
        }
    }

    pub fn record_pairs_examined(&self, count: usize) {
        self.stats.borrow_mut().pairs_examined += count;
    }

    pub fn record_local_edge(&self) {
        self.stats.borrow_mut().local_edges += 1;
    }

    pub fn record_cross_function_edge(&self) {
        self.stats.borrow_mut().cross_function_edges += 1;
    }

    pub fn record_directives_planned(&self, count: usize) {
        self.stats.borrow_mut().directives_planned += count;
    }

    pub fn record_fence_inserted(&self) {
        self.stats.borrow_mut().fences_inserted += 1;
    }

    pub fn record_fence_already_present(&self) {
        self.stats.borrow_mut().fences_already_present += 1;
    }

    /// Get run statistics.
    pub fn stats(&self) -> SessionStats {
        self.stats.borrow().clone()
    }
}

/// Fence insertion run statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// Functions whose bodies were walked.
    pub functions_analyzed: usize,

    /// Declarations without a body.
    pub declarations_skipped: usize,

    /// Functions left alone because the oracle had no information.
    pub functions_skipped: usize,

    /// Loads and stores collected.
    pub events_collected: usize,

    /// Events touching process-visible storage.
    pub process_visible_events: usize,

    /// Events without a resolvable location descriptor.
    pub unresolved_locations: usize,

    /// Ordered pairs handed to the classifier.
    pub pairs_examined: usize,

    /// Hazards between accesses of the same function.
    pub local_edges: usize,

    /// Hazards between accesses of different functions.
    pub cross_function_edges: usize,

    /// Fence directives produced by the planner.
    pub directives_planned: usize,

    /// Fences actually inserted.
    pub fences_inserted: usize,

    /// Directives whose target already had a fence.
    pub fences_already_present: usize,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fence Insertion Statistics:")?;
        writeln!(f, "  Functions analyzed: {}", self.functions_analyzed)?;
        writeln!(f, "  Declarations skipped: {}", self.declarations_skipped)?;
        writeln!(f, "  Functions without alias info: {}", self.functions_skipped)?;
        writeln!(
            f,
            "  Memory accesses: {} ({} process-visible, {} unresolved)",
            self.events_collected, self.process_visible_events, self.unresolved_locations
        )?;
        writeln!(f, "  Pairs examined: {}", self.pairs_examined)?;
        writeln!(
            f,
            "  Hazards: {} local, {} cross-function",
            self.local_edges, self.cross_function_edges
        )?;
        writeln!(f, "  Directives planned: {}", self.directives_planned)?;
        writeln!(f, "  Fences inserted: {}", self.fences_inserted)?;
        writeln!(f, "  Fences already present: {}", self.fences_already_present)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let arena = Bump::new();
        let session = FenceSession::new(&arena);

        let stats = session.stats();
        assert_eq!(stats, SessionStats::default());
        assert!(std::ptr::eq(session.arena(), &arena));
    }

    #[test]
    fn test_session_statistics() {
        let arena = Bump::new();
        let session = FenceSession::new(&arena);

        session.record_function_analyzed();
        session.record_declaration_skipped();
        session.record_event(true, true);
        session.record_event(false, true);
        session.record_event(true, false);
        session.record_pairs_examined(3);
        session.record_local_edge();
        session.record_cross_function_edge();
        session.record_directives_planned(2);
        session.record_fence_inserted();
        session.record_fence_already_present();

        let stats = session.stats();
        assert_eq!(stats.functions_analyzed, 1);
        assert_eq!(stats.declarations_skipped, 1);
        assert_eq!(stats.events_collected, 3);
        assert_eq!(stats.process_visible_events, 2);
        assert_eq!(stats.unresolved_locations, 1);
        assert_eq!(stats.pairs_examined, 3);
        assert_eq!(stats.local_edges, 1);
        assert_eq!(stats.cross_function_edges, 1);
        assert_eq!(stats.directives_planned, 2);
        assert_eq!(stats.fences_inserted, 1);
        assert_eq!(stats.fences_already_present, 1);
    }

    #[test]
    fn test_statistics_display() {
        let arena = Bump::new();
        let session = FenceSession::new(&arena);

        session.record_function_analyzed();
        session.record_event(true, true);
        session.record_fence_inserted();

        let output = format!("{}", session.stats());
        assert!(output.contains("Functions analyzed: 1"));
        assert!(output.contains("Memory accesses: 1 (1 process-visible, 0 unresolved)"));
        assert!(output.contains("Fences inserted: 1"));
    }
}
