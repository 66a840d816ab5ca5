use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Transfer metadata as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferInfo {
    /// URL of the originating request, as submitted.
    pub requested_url: String,
    /// Last URL used, after redirects.
    pub effective_url: Option<String>,
    /// HTTP status of the final response; 0 when no response was received.
    pub response_code: u32,
    pub content_type: Option<String>,
    /// Bytes of all received header blocks (every redirect hop included).
    pub header_size: u64,
    /// Bytes of request headers sent.
    pub request_size: u64,
    pub bytes_downloaded: u64,
    pub bytes_uploaded: u64,
    pub redirect_count: u32,
    pub primary_ip: Option<String>,
    pub namelookup_time: Duration,
    pub connect_time: Duration,
    pub total_time: Duration,
    /// Transport failure, if the transfer did not complete cleanly.
    pub error: Option<String>,
}

impl TransferInfo {
    /// Info for a request that never reached the wire.
    pub(crate) fn failed(requested_url: &str, error: impl ToString) -> Self {
        Self {
            requested_url: requested_url.to_string(),
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    /// Outbound bytes. The request size already includes any body sent with it.
    pub fn bytes_out(&self) -> u64 {
        self.request_size
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.response_code)
    }
}
