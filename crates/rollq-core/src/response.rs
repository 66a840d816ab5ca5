//! Response: a handle over stored transfer artifacts plus the originating request.

use anyhow::Result;
use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

use crate::engine::TransferInfo;
use crate::request::Request;
use crate::store::{ResponseStore, StoreEntry};

/// Result of one completed transfer. Owns its store entry; spooled files are
/// removed by [`close`](Self::close) or when the response is dropped.
#[derive(Debug)]
pub struct Response {
    entry: StoreEntry,
    info: TransferInfo,
    request: Arc<Request>,
    json: OnceLock<Option<serde_json::Value>>,
}

impl Response {
    /// Builds a response from raw engine output (header block then body),
    /// split at `info.header_size`.
    pub fn from_output(
        store: &ResponseStore,
        mut output: Vec<u8>,
        info: TransferInfo,
        request: Arc<Request>,
    ) -> Self {
        let split = usize::try_from(info.header_size)
            .unwrap_or(usize::MAX)
            .min(output.len());
        let body = output.split_off(split);
        Self::new(store, output, body, info, request)
    }

    pub fn new(
        store: &ResponseStore,
        headers: Vec<u8>,
        body: Vec<u8>,
        info: TransferInfo,
        request: Arc<Request>,
    ) -> Self {
        Self {
            entry: store.put(headers, body),
            info,
            request,
            json: OnceLock::new(),
        }
    }

    /// Raw header block as received (every redirect hop included).
    pub fn headers(&self) -> Result<Cow<'_, [u8]>> {
        self.entry.headers()
    }

    /// Header block trimmed and split into lines, recomputed on every call.
    pub fn headers_as_lines(&self) -> Result<Vec<String>> {
        let raw = self.headers()?;
        Ok(String::from_utf8_lossy(&raw)
            .trim()
            .lines()
            .map(str::to_string)
            .collect())
    }

    /// Raw body bytes, reloaded from the spool file when spooled.
    pub fn body(&self) -> Result<Cow<'_, [u8]>> {
        self.entry.body()
    }

    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn body_text(&self) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.body()?).into_owned())
    }

    /// Body parsed as JSON; `None` if unreadable or not valid JSON.
    /// Parsed once, later calls return the cached value.
    pub fn body_as_json(&self) -> Option<&serde_json::Value> {
        self.json
            .get_or_init(|| {
                let body = self.body().ok()?;
                serde_json::from_slice(&body).ok()
            })
            .as_ref()
    }

    pub fn info(&self) -> &TransferInfo {
        &self.info
    }

    /// HTTP status of the final response, 0 if none was received.
    pub fn status(&self) -> u32 {
        self.info.response_code
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn is_spooled(&self) -> bool {
        self.entry.is_spooled()
    }

    /// Releases stored artifacts now instead of at drop. Idempotent.
    pub fn close(&mut self) {
        self.entry.release();
    }
}
