//! Deterministic in-memory engine: each transfer finishes after a fixed
//! number of polls taken from its URL (`?ticks=N`, default 1).

use std::collections::HashSet;
use std::time::Duration;

use crate::engine::{EngineError, SlotId, Transfer, TransferEngine, TransferInfo};
use crate::request::TransferPlan;

pub(super) enum State {
    Idle,
    Configured(TransferPlan),
    Active { plan: TransferPlan, remaining: u32 },
    Done(TransferPlan),
    Closed,
}

#[derive(Default)]
pub(super) struct ScriptedEngine {
    pub(super) slots: Vec<State>,
    pub(super) opened: usize,
    pub(super) closed: usize,
    pub(super) max_active: usize,
    pub(super) single_calls: usize,
    pub(super) polls: usize,
    /// Fail this many polls before behaving.
    pub(super) fail_polls: u32,
    pub(super) always_fail_polls: bool,
    /// URLs whose configure call fails.
    pub(super) refuse: HashSet<String>,
    /// Every plan handed to the engine, in order.
    pub(super) plans: Vec<TransferPlan>,
}

pub(super) const HEADER_PREFIX: &str = "HTTP/1.1 200 OK\r\nX-Url: ";

pub(super) fn ticks(url: &str) -> u32 {
    url.split_once("ticks=")
        .and_then(|(_, n)| n.parse().ok())
        .unwrap_or(1)
}

pub(super) fn output_for(plan: &TransferPlan) -> Transfer {
    let headers = format!("{}{}\r\n\r\n", HEADER_PREFIX, plan.url);
    let body = format!("body:{}", plan.url);
    let mut output = headers.clone().into_bytes();
    output.extend_from_slice(body.as_bytes());
    let uploaded = plan.body.as_ref().map(|b| b.len() as u64).unwrap_or(0);
    Transfer {
        output,
        info: TransferInfo {
            response_code: 200,
            header_size: headers.len() as u64,
            request_size: 10 + uploaded,
            bytes_uploaded: uploaded,
            bytes_downloaded: body.len() as u64,
            effective_url: Some(plan.url.clone()),
            ..TransferInfo::default()
        },
    }
}

impl ScriptedEngine {
    pub(super) fn active(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, State::Active { .. }))
            .count()
    }

    fn bad(slot: SlotId, message: &str) -> EngineError {
        EngineError::Slot {
            slot,
            message: message.to_string(),
        }
    }

    fn state(&mut self, slot: SlotId) -> Result<&mut State, EngineError> {
        self.slots
            .get_mut(slot.0)
            .ok_or_else(|| Self::bad(slot, "unknown slot"))
    }
}

impl TransferEngine for ScriptedEngine {
    fn open(&mut self) -> Result<SlotId, EngineError> {
        self.opened += 1;
        self.slots.push(State::Idle);
        Ok(SlotId(self.slots.len() - 1))
    }

    fn configure(&mut self, slot: SlotId, plan: &TransferPlan) -> Result<(), EngineError> {
        self.plans.push(plan.clone());
        if self.refuse.contains(&plan.url) {
            return Err(EngineError::Configure {
                slot,
                message: "refused".into(),
            });
        }
        let state = self.state(slot)?;
        if !matches!(state, State::Idle) {
            return Err(Self::bad(slot, "configure on busy slot"));
        }
        *state = State::Configured(plan.clone());
        Ok(())
    }

    fn submit(&mut self, slot: SlotId) -> Result<(), EngineError> {
        let state = self.state(slot)?;
        let State::Configured(plan) = std::mem::replace(state, State::Idle) else {
            return Err(Self::bad(slot, "submit without configure"));
        };
        let remaining = ticks(&plan.url);
        *state = State::Active { plan, remaining };
        self.max_active = self.max_active.max(self.active());
        Ok(())
    }

    fn poll(&mut self, _timeout: Duration) -> Result<Vec<SlotId>, EngineError> {
        self.polls += 1;
        if self.always_fail_polls {
            return Err(EngineError::Poll("scripted fault".into()));
        }
        if self.fail_polls > 0 {
            self.fail_polls -= 1;
            return Err(EngineError::Poll("scripted fault".into()));
        }
        let mut done = Vec::new();
        for (i, state) in self.slots.iter_mut().enumerate() {
            if let State::Active { remaining, .. } = state {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    if let State::Active { plan, .. } = std::mem::replace(state, State::Closed) {
                        *state = State::Done(plan);
                    }
                    done.push(SlotId(i));
                }
            }
        }
        Ok(done)
    }

    fn metadata(&mut self, slot: SlotId) -> Result<TransferInfo, EngineError> {
        match self.state(slot)? {
            State::Done(plan) => Ok(output_for(plan).info),
            _ => Err(Self::bad(slot, "not done")),
        }
    }

    fn take_output(&mut self, slot: SlotId) -> Result<Vec<u8>, EngineError> {
        match self.state(slot)? {
            State::Done(plan) => Ok(output_for(plan).output),
            _ => Err(Self::bad(slot, "not done")),
        }
    }

    fn remove(&mut self, slot: SlotId) -> Result<(), EngineError> {
        let state = self.state(slot)?;
        if !matches!(state, State::Closed) {
            *state = State::Idle;
        }
        Ok(())
    }

    fn close(&mut self, slot: SlotId) {
        if let Some(state) = self.slots.get_mut(slot.0) {
            if !matches!(state, State::Closed) {
                *state = State::Closed;
                self.closed += 1;
            }
        }
    }

    fn perform_one(&mut self, plan: &TransferPlan) -> Result<Transfer, EngineError> {
        self.single_calls += 1;
        self.plans.push(plan.clone());
        if self.refuse.contains(&plan.url) {
            return Err(EngineError::Configure {
                slot: SlotId(usize::MAX),
                message: "refused".into(),
            });
        }
        Ok(output_for(plan))
    }
}
