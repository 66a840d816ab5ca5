//! Curl multi backend: one `Multi` wait group, one reusable Easy2 handle per slot.

mod collector;
mod configure;

use std::time::Duration;

use curl::easy::Easy2;
use curl::multi::{Easy2Handle, Multi};

use crate::request::TransferPlan;

use super::{EngineError, SlotId, Transfer, TransferEngine, TransferInfo};
use collector::Collector;

/// Lifecycle of one slot's handle.
enum Slot {
    /// Detached from the wait group; ready to be configured.
    Idle(Easy2<Collector>),
    /// Submitted to the wait group.
    Active(Easy2Handle<Collector>),
    /// Reported finished and already detached; output and info readable.
    Done {
        easy: Easy2<Collector>,
        error: Option<curl::Error>,
    },
    /// Reported finished but could not be detached; the handle is gone.
    Lost(String),
    Closed,
}

/// libcurl-backed transfer engine.
pub struct CurlEngine {
    multi: Multi,
    slots: Vec<Slot>,
    single: Option<Easy2<Collector>>,
}

impl CurlEngine {
    /// Initializes libcurl and checks that it can speak HTTP.
    pub fn new() -> Result<Self, EngineError> {
        curl::init();
        let version = curl::Version::get();
        if !version.protocols().any(|p| p.eq_ignore_ascii_case("http")) {
            return Err(EngineError::Unavailable(format!(
                "libcurl {} was built without HTTP support",
                version.version()
            )));
        }
        tracing::debug!(libcurl = version.version(), "curl engine ready");
        Ok(Self {
            multi: Multi::new(),
            slots: Vec::new(),
            single: None,
        })
    }

    /// Number of slots currently submitted to the wait group.
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Active(_)))
            .count()
    }

    fn slot_mut(&mut self, slot: SlotId) -> Result<&mut Slot, EngineError> {
        self.slots.get_mut(slot.0).ok_or_else(|| EngineError::Slot {
            slot,
            message: "unknown slot".into(),
        })
    }

    fn detach(&mut self, handle: Easy2Handle<Collector>) -> Result<Easy2<Collector>, EngineError> {
        self.multi
            .remove2(handle)
            .map_err(|e| EngineError::Poll(format!("curl multi remove: {}", e)))
    }

    /// perform + drain messages; finished handles are detached immediately.
    fn collect_finished(&mut self) -> Result<Vec<SlotId>, EngineError> {
        self.multi
            .perform()
            .map_err(|e| EngineError::Poll(format!("curl multi perform: {}", e)))?;

        let mut finished: Vec<(usize, Option<curl::Error>)> = Vec::new();
        self.multi.messages(|msg| {
            if let (Ok(token), Some(result)) = (msg.token(), msg.result()) {
                finished.push((token, result.err()));
            }
        });

        Ok(finished
            .into_iter()
            .filter_map(|(index, error)| self.settle(index, error))
            .collect())
    }

    /// Moves a finished slot out of the wait group. A slot whose handle cannot
    /// be detached is still reported, as `Lost`, so its completion is not dropped.
    fn settle(&mut self, index: usize, error: Option<curl::Error>) -> Option<SlotId> {
        let slot = self.slots.get_mut(index)?;
        let Slot::Active(handle) = std::mem::replace(slot, Slot::Closed) else {
            return None;
        };
        self.slots[index] = match self.detach(handle) {
            Ok(easy) => Slot::Done { easy, error },
            Err(e) => {
                tracing::warn!(slot = index, "finished transfer could not be detached: {}", e);
                Slot::Lost(e.to_string())
            }
        };
        Some(SlotId(index))
    }
}

impl TransferEngine for CurlEngine {
    /// Reuses a closed position when there is one, so a long-lived engine
    /// stays at the size of its widest window.
    fn open(&mut self) -> Result<SlotId, EngineError> {
        let fresh = Slot::Idle(Easy2::new(Collector::default()));
        if let Some(index) = self.slots.iter().position(|s| matches!(s, Slot::Closed)) {
            self.slots[index] = fresh;
            return Ok(SlotId(index));
        }
        self.slots.push(fresh);
        Ok(SlotId(self.slots.len() - 1))
    }

    fn configure(&mut self, slot: SlotId, plan: &TransferPlan) -> Result<(), EngineError> {
        let easy = match self.slot_mut(slot)? {
            Slot::Idle(easy) => easy,
            _ => {
                return Err(EngineError::Slot {
                    slot,
                    message: "configure on a busy or closed slot".into(),
                })
            }
        };
        easy.reset();
        easy.get_mut().clear();
        configure::apply_plan(easy, plan).map_err(|e| EngineError::Configure {
            slot,
            message: e.to_string(),
        })
    }

    fn submit(&mut self, slot: SlotId) -> Result<(), EngineError> {
        let entry = self.slot_mut(slot)?;
        let easy = match std::mem::replace(entry, Slot::Closed) {
            Slot::Idle(easy) => easy,
            other => {
                *entry = other;
                return Err(EngineError::Slot {
                    slot,
                    message: "submit on a slot that is not idle".into(),
                });
            }
        };
        let mut handle = self.multi.add2(easy).map_err(|e| EngineError::Slot {
            slot,
            message: format!("curl multi add: {}", e),
        })?;
        if let Err(e) = handle.set_token(slot.0) {
            let _ = self.detach(handle);
            return Err(EngineError::Slot {
                slot,
                message: format!("curl token: {}", e),
            });
        }
        self.slots[slot.0] = Slot::Active(handle);
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> Result<Vec<SlotId>, EngineError> {
        let done = self.collect_finished()?;
        if !done.is_empty() || self.active_count() == 0 {
            return Ok(done);
        }
        self.multi
            .wait(&mut [], timeout)
            .map_err(|e| EngineError::Poll(format!("curl multi wait: {}", e)))?;
        self.collect_finished()
    }

    fn metadata(&mut self, slot: SlotId) -> Result<TransferInfo, EngineError> {
        match self.slot_mut(slot)? {
            Slot::Done { easy, error } => Ok(configure::read_info(easy, error.as_ref())),
            Slot::Lost(message) => Ok(TransferInfo {
                error: Some(message.clone()),
                ..TransferInfo::default()
            }),
            _ => Err(EngineError::Slot {
                slot,
                message: "metadata requested before completion".into(),
            }),
        }
    }

    fn take_output(&mut self, slot: SlotId) -> Result<Vec<u8>, EngineError> {
        match self.slot_mut(slot)? {
            Slot::Done { easy, .. } => Ok(easy.get_mut().take_output()),
            Slot::Lost(_) => Ok(Vec::new()),
            _ => Err(EngineError::Slot {
                slot,
                message: "output requested before completion".into(),
            }),
        }
    }

    fn remove(&mut self, slot: SlotId) -> Result<(), EngineError> {
        let entry = self.slot_mut(slot)?;
        match std::mem::replace(entry, Slot::Closed) {
            Slot::Active(handle) => {
                let easy = self.detach(handle)?;
                self.slots[slot.0] = Slot::Idle(easy);
            }
            Slot::Done { easy, .. } | Slot::Idle(easy) => *entry = Slot::Idle(easy),
            Slot::Lost(_) => *entry = Slot::Idle(Easy2::new(Collector::default())),
            Slot::Closed => {}
        }
        Ok(())
    }

    fn close(&mut self, slot: SlotId) {
        let Some(entry) = self.slots.get_mut(slot.0) else {
            return;
        };
        if let Slot::Active(handle) = std::mem::replace(entry, Slot::Closed) {
            if let Err(e) = self.multi.remove2(handle) {
                tracing::debug!(%slot, "curl multi remove on close: {}", e);
            }
        }
    }

    fn perform_one(&mut self, plan: &TransferPlan) -> Result<Transfer, EngineError> {
        let easy = self
            .single
            .get_or_insert_with(|| Easy2::new(Collector::default()));
        easy.reset();
        easy.get_mut().clear();
        configure::apply_plan(easy, plan).map_err(|e| EngineError::Configure {
            slot: SlotId(usize::MAX),
            message: e.to_string(),
        })?;
        let error = easy.perform().err();
        let info = configure::read_info(easy, error.as_ref());
        let output = easy.get_mut().take_output();
        Ok(Transfer { output, info })
    }
}
