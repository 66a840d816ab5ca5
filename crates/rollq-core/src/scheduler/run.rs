//! Rolling-window run loop as an explicit state machine:
//! `Filling → Draining ⇄ Refilling → … → Drained`.
//!
//! Draining hands completions out one at a time in engine order; each one is
//! followed by Refilling its freed slot from the queue, so the window stays
//! full until the queue runs dry.

use std::collections::VecDeque;
use std::time::Duration;

use crate::engine::{SlotId, TransferEngine, TransferInfo};
use crate::request::{build_plan, TransferOptions};
use crate::store::ResponseStore;

use super::complete::{finish, Traffic};
use super::control::StopHandle;
use super::error::ExecuteError;
use super::queue::QueueHandle;
use super::window::Window;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Filling,
    Draining,
    Refilling(SlotId),
    Drained,
}

/// Counts reported back to `Scheduler::execute`.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct RunCounts {
    pub(super) completed: usize,
    pub(super) abandoned: usize,
}

pub(super) struct WindowRun<'a, E: TransferEngine> {
    pub(super) window: Window<'a, E>,
    pub(super) queue: &'a QueueHandle,
    pub(super) store: &'a ResponseStore,
    pub(super) traffic: &'a mut Traffic,
    pub(super) stop: &'a StopHandle,
    pub(super) default_options: &'a TransferOptions,
    pub(super) default_headers: &'a [String],
    pub(super) poll_timeout: Duration,
    pub(super) max_poll_faults: u32,
}

impl<E: TransferEngine> WindowRun<'_, E> {
    pub(super) fn drive(mut self) -> Result<RunCounts, ExecuteError> {
        let mut counts = RunCounts::default();
        let mut ready: VecDeque<SlotId> = VecDeque::new();
        let mut faults = 0u32;
        let mut phase = Phase::Filling;

        loop {
            phase = match phase {
                Phase::Filling => {
                    for slot in self.window.slots().to_vec() {
                        if self.stop.is_stop_requested() {
                            break;
                        }
                        self.dispatch(slot, &mut counts)?;
                    }
                    Phase::Draining
                }
                Phase::Draining => {
                    if self.stop.is_stop_requested() {
                        Phase::Drained
                    } else if let Some(slot) = ready.pop_front() {
                        if self.complete(slot, &mut counts)? {
                            Phase::Refilling(slot)
                        } else {
                            Phase::Draining
                        }
                    } else if self.window.in_flight() == 0 {
                        Phase::Drained
                    } else {
                        match self.window.poll(self.poll_timeout) {
                            Ok(done) => {
                                faults = 0;
                                ready.extend(done);
                                Phase::Draining
                            }
                            Err(e) => {
                                faults += 1;
                                tracing::warn!(faults, "engine poll fault: {}", e);
                                if faults >= self.max_poll_faults {
                                    tracing::error!(
                                        in_flight = self.window.in_flight(),
                                        "giving up on remaining transfers after {} consecutive poll faults",
                                        faults
                                    );
                                    Phase::Drained
                                } else {
                                    Phase::Draining
                                }
                            }
                        }
                    }
                }
                Phase::Refilling(slot) => {
                    if self.stop.is_stop_requested() {
                        Phase::Drained
                    } else {
                        self.dispatch(slot, &mut counts)?;
                        Phase::Draining
                    }
                }
                Phase::Drained => break,
            };
        }

        counts.abandoned = self.window.in_flight();
        if counts.abandoned > 0 {
            tracing::info!(abandoned = counts.abandoned, "run stopped with transfers in flight");
        }
        Ok(counts)
    }

    /// Puts the next queued request into `slot`. A request the engine refuses
    /// is completed on the spot with the failure in its info, and the next
    /// one is tried, so every locked request still yields one callback.
    fn dispatch(&mut self, slot: SlotId, counts: &mut RunCounts) -> Result<(), ExecuteError> {
        while let Some((index, request)) = self.queue.lock_next() {
            let plan = build_plan(&request, self.default_options, self.default_headers);
            match self.window.start(slot, index, request.clone(), &plan) {
                Ok(()) => {
                    tracing::debug!(%slot, index, url = %plan.url, method = %plan.method, "dispatched");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(%slot, index, url = %plan.url, "dispatch failed: {}", e);
                    let info = TransferInfo::failed(request.url(), &e);
                    finish(self.store, self.traffic, request, Vec::new(), info)?;
                    self.queue.finish(index);
                    counts.completed += 1;
                    if self.stop.is_stop_requested() {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }

    /// Finishes the request bound to `slot`. Returns false if nothing was bound.
    fn complete(&mut self, slot: SlotId, counts: &mut RunCounts) -> Result<bool, ExecuteError> {
        let Some(done) = self.window.collect(slot) else {
            tracing::debug!(%slot, "completion for a slot with no request bound");
            return Ok(false);
        };
        let index = done.index;
        finish(self.store, self.traffic, done.request, done.output, done.info)?;
        self.queue.finish(index);
        counts.completed += 1;
        Ok(true)
    }
}
