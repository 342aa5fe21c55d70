//! Access collector.
//!
//! Walks the current function in program order and turns every load and
//! store into a [`MemoryAccessEvent`]. Other instructions are skipped. Events
//! are appended to a run-wide table living in the session arena, so an
//! event's id is its index in that table.

use super::event::{AccessKind, EventId, EventOf, MemoryAccessEvent};
use crate::core::{FenceSession, IrAdaptor};
use bumpalo::collections::Vec as BumpVec;
use log::{trace, warn};
use std::ops::Range;

/// Collects memory-access events for one function at a time.
pub struct AccessCollector<'s, 'arena> {
    session: &'s FenceSession<'arena>,
}

impl<'s, 'arena> AccessCollector<'s, 'arena> {
    pub fn new(session: &'s FenceSession<'arena>) -> Self {
        Self { session }
    }

    /// Append the events of the adaptor's current function to `events`.
    ///
    /// Returns the id range of the appended events. A function without loads
    /// or stores yields an empty range.
    pub fn collect<A: IrAdaptor>(
        &self,
        adaptor: &A,
        func: A::FuncRef,
        events: &mut BumpVec<'arena, EventOf<A>>,
    ) -> Range<usize>
    where
        EventOf<A>: 'arena,
    {
        let start = events.len();
        let mut order = 0u32;

        for (block_idx, block) in adaptor.blocks().enumerate() {
            for inst in adaptor.block_insts(block) {
                let Some(kind) = AccessKind::from_inst_kind(adaptor.inst_kind(inst)) else {
                    continue;
                };

                let location = adaptor.inst_location(inst);
                let visibility = adaptor.inst_visibility(inst);
                if location.is_none() {
                    warn!(
                        "Unresolved location for {} {:?} in {}, assuming it aliases everything",
                        kind,
                        inst,
                        adaptor.func_link_name(func)
                    );
                }
                self.session
                    .record_event(visibility.is_process_visible(), location.is_some());

                let id = events.len() as EventId;
                trace!("event {}: {} {:?} ({:?})", id, kind, inst, visibility);
                events.push(MemoryAccessEvent {
                    id,
                    kind,
                    location,
                    inst,
                    func,
                    block: block_idx as u32,
                    order,
                    visibility,
                });
                order += 1;
            }
        }

        start..events.len()
    }
}
