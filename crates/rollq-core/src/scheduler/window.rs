//! RAII window of transfer slots: every slot opened for a run is closed when
//! the window goes out of scope, whatever path the run took to get there.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::{EngineError, SlotId, TransferEngine, TransferInfo};
use crate::request::{Request, TransferPlan};

pub(super) struct Window<'e, E: TransferEngine> {
    engine: &'e mut E,
    slots: Vec<SlotId>,
    /// Slot → (queue index, request) for every in-flight transfer.
    bound: HashMap<SlotId, (usize, Arc<Request>)>,
}

/// Everything read back from a completed slot.
pub(super) struct Finished {
    pub(super) index: usize,
    pub(super) request: Arc<Request>,
    pub(super) output: Vec<u8>,
    pub(super) info: TransferInfo,
}

impl<'e, E: TransferEngine> Window<'e, E> {
    /// Opens `size` slots. Slots opened before a failure are closed by drop.
    pub(super) fn open(engine: &'e mut E, size: usize) -> Result<Self, EngineError> {
        let mut window = Window {
            engine,
            slots: Vec::with_capacity(size),
            bound: HashMap::with_capacity(size),
        };
        for _ in 0..size {
            let slot = window.engine.open()?;
            window.slots.push(slot);
        }
        Ok(window)
    }

    pub(super) fn slots(&self) -> &[SlotId] {
        &self.slots
    }

    pub(super) fn in_flight(&self) -> usize {
        self.bound.len()
    }

    /// Configures `slot` for `plan` and submits it, binding it to `index`.
    pub(super) fn start(
        &mut self,
        slot: SlotId,
        index: usize,
        request: Arc<Request>,
        plan: &TransferPlan,
    ) -> Result<(), EngineError> {
        self.engine.configure(slot, plan)?;
        self.engine.submit(slot)?;
        self.bound.insert(slot, (index, request));
        Ok(())
    }

    pub(super) fn poll(&mut self, timeout: Duration) -> Result<Vec<SlotId>, EngineError> {
        self.engine.poll(timeout)
    }

    /// Reads a completed slot and frees it for the next request.
    /// Returns `None` for slots the window did not bind.
    pub(super) fn collect(&mut self, slot: SlotId) -> Option<Finished> {
        let (index, request) = self.bound.remove(&slot)?;
        let info = self
            .engine
            .metadata(slot)
            .unwrap_or_else(|e| TransferInfo::failed(request.url(), e));
        let output = self.engine.take_output(slot).unwrap_or_else(|e| {
            tracing::warn!(%slot, "could not read transfer output: {}", e);
            Vec::new()
        });
        if let Err(e) = self.engine.remove(slot) {
            tracing::warn!(%slot, "could not detach finished transfer: {}", e);
        }
        Some(Finished {
            index,
            request,
            output,
            info,
        })
    }
}

impl<E: TransferEngine> Drop for Window<'_, E> {
    fn drop(&mut self) {
        if !self.bound.is_empty() {
            tracing::debug!(in_flight = self.bound.len(), "closing window with unfinished transfers");
        }
        for slot in self.slots.drain(..) {
            self.engine.close(slot);
        }
    }
}
