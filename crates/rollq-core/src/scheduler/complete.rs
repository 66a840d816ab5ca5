//! Completion handling shared by pooled and single-request paths:
//! traffic accounting, response construction, callback dispatch.

use std::sync::Arc;

use crate::engine::TransferInfo;
use crate::request::Request;
use crate::response::Response;
use crate::store::ResponseStore;

use super::error::ExecuteError;

/// Byte counters accumulated across runs until explicitly reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Traffic {
    pub bytes_in: u64,
    pub bytes_out: u64,
}

impl Traffic {
    pub(super) fn record(&mut self, info: &TransferInfo) {
        self.bytes_in = self.bytes_in.saturating_add(info.bytes_downloaded);
        self.bytes_out = self.bytes_out.saturating_add(info.bytes_out());
    }
}

/// Turns one finished transfer into a Response and runs the request's callback.
pub(super) fn finish(
    store: &ResponseStore,
    traffic: &mut Traffic,
    request: Arc<Request>,
    output: Vec<u8>,
    mut info: TransferInfo,
) -> Result<Response, ExecuteError> {
    info.requested_url = request.url().to_string();
    traffic.record(&info);
    if let Some(ref error) = info.error {
        tracing::debug!(url = %info.requested_url, "transfer failed: {}", error);
    } else {
        tracing::debug!(
            url = %info.requested_url,
            status = info.response_code,
            bytes = info.bytes_downloaded,
            "transfer complete"
        );
    }
    let response = Response::from_output(store, output, info, Arc::clone(&request));
    if let Some(callback) = request.callback() {
        callback(&response).map_err(|source| ExecuteError::Callback {
            url: request.url().to_string(),
            source,
        })?;
    }
    Ok(response)
}
