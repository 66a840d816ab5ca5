//! Transfer engine seam.
//!
//! The scheduler never talks to sockets itself. It drives an engine that can
//! run many single-request transfers concurrently inside one wait group and
//! report which of them finished. `CurlEngine` is the libcurl-backed
//! implementation; tests plug in scripted engines.

mod curl_engine;
mod info;

pub use curl_engine::CurlEngine;
pub use info::TransferInfo;

use std::fmt;
use std::time::Duration;

use crate::request::TransferPlan;

/// Identity of one reusable transfer handle owned by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// Engine-level failure. Transport failures of a single transfer are not
/// engine errors; they are reported through `TransferInfo::error`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine cannot be used at all (library missing a protocol, init failed).
    #[error("transfer engine unavailable: {0}")]
    Unavailable(String),
    /// A handle could not be configured for a plan (bad URL, bad option value).
    #[error("configure {slot}: {message}")]
    Configure { slot: SlotId, message: String },
    /// Operation on a slot that does not exist or is in the wrong state.
    #[error("{slot}: {message}")]
    Slot { slot: SlotId, message: String },
    /// The multi-transfer wait group reported a non-recoverable status.
    #[error("poll fault: {0}")]
    Poll(String),
}

/// Output of a blocking single transfer: raw header block followed by the body.
#[derive(Debug, Default)]
pub struct Transfer {
    pub output: Vec<u8>,
    pub info: TransferInfo,
}

/// Capability the scheduler consumes, one call per step of a slot's life:
/// open → configure → submit → (poll reports it) → metadata/take_output →
/// remove → configure again or close.
pub trait TransferEngine {
    /// Allocates a new idle slot.
    fn open(&mut self) -> Result<SlotId, EngineError>;

    /// Prepares an idle slot for `plan`, discarding anything from its previous use.
    fn configure(&mut self, slot: SlotId, plan: &TransferPlan) -> Result<(), EngineError>;

    /// Adds a configured slot to the wait group.
    fn submit(&mut self, slot: SlotId) -> Result<(), EngineError>;

    /// Makes progress on all submitted slots, blocking up to `timeout` for
    /// activity. Returns completed slots in the order the engine reported
    /// them; an empty list means nothing finished within the timeout.
    fn poll(&mut self, timeout: Duration) -> Result<Vec<SlotId>, EngineError>;

    /// Metadata of a completed slot.
    fn metadata(&mut self, slot: SlotId) -> Result<TransferInfo, EngineError>;

    /// Moves the raw output (header block + body) out of a completed slot.
    fn take_output(&mut self, slot: SlotId) -> Result<Vec<u8>, EngineError>;

    /// Detaches a slot from the wait group, returning it to idle.
    fn remove(&mut self, slot: SlotId) -> Result<(), EngineError>;

    /// Releases a slot. Closing an active slot abandons its transfer.
    fn close(&mut self, slot: SlotId);

    /// Runs one transfer to completion on the calling thread.
    fn perform_one(&mut self, plan: &TransferPlan) -> Result<Transfer, EngineError>;
}
