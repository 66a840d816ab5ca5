//! Per-transfer engine knobs and their key-by-key merge.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Redirect ceiling applied when neither the defaults nor the request set one.
pub const DEFAULT_MAX_REDIRECTIONS: u32 = 5;

/// Engine options for one transfer. Every field is optional; `None` means
/// "leave the engine default alone".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    pub follow_location: Option<bool>,
    pub max_redirections: Option<u32>,
    pub connect_timeout_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub ssl_verify_peer: Option<bool>,
    pub ssl_verify_host: Option<bool>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub cookie: Option<String>,
    /// Value for Accept-Encoding; empty string asks for every encoding libcurl supports.
    pub accept_encoding: Option<String>,
    pub proxy: Option<String>,
    /// Receive bandwidth cap in bytes per second.
    pub max_recv_speed: Option<u64>,
    pub buffer_size: Option<usize>,
    pub low_speed_limit: Option<u32>,
    pub low_speed_time_secs: Option<u64>,
}

impl TransferOptions {
    /// Defaults used for every request unless overridden: 60s connect and
    /// total timeouts, peer verification off.
    pub fn standard() -> Self {
        Self {
            connect_timeout_secs: Some(60),
            timeout_secs: Some(60),
            ssl_verify_peer: Some(false),
            ..Self::default()
        }
    }

    /// Returns `overrides` layered on top of `self`: a field set in `overrides`
    /// wins, otherwise the value from `self` is kept.
    pub fn merge(&self, overrides: &TransferOptions) -> TransferOptions {
        fn pick<T: Clone>(over: &Option<T>, base: &Option<T>) -> Option<T> {
            over.as_ref().or(base.as_ref()).cloned()
        }
        TransferOptions {
            follow_location: pick(&overrides.follow_location, &self.follow_location),
            max_redirections: pick(&overrides.max_redirections, &self.max_redirections),
            connect_timeout_secs: pick(&overrides.connect_timeout_secs, &self.connect_timeout_secs),
            timeout_secs: pick(&overrides.timeout_secs, &self.timeout_secs),
            ssl_verify_peer: pick(&overrides.ssl_verify_peer, &self.ssl_verify_peer),
            ssl_verify_host: pick(&overrides.ssl_verify_host, &self.ssl_verify_host),
            user_agent: pick(&overrides.user_agent, &self.user_agent),
            referer: pick(&overrides.referer, &self.referer),
            cookie: pick(&overrides.cookie, &self.cookie),
            accept_encoding: pick(&overrides.accept_encoding, &self.accept_encoding),
            proxy: pick(&overrides.proxy, &self.proxy),
            max_recv_speed: pick(&overrides.max_recv_speed, &self.max_recv_speed),
            buffer_size: pick(&overrides.buffer_size, &self.buffer_size),
            low_speed_limit: pick(&overrides.low_speed_limit, &self.low_speed_limit),
            low_speed_time_secs: pick(&overrides.low_speed_time_secs, &self.low_speed_time_secs),
        }
    }

    /// Fills in redirect following (on, at most 5 hops) where still unset.
    pub(crate) fn with_redirect_defaults(mut self) -> Self {
        self.follow_location.get_or_insert(true);
        self.max_redirections.get_or_insert(DEFAULT_MAX_REDIRECTIONS);
        self
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn low_speed_time(&self) -> Option<Duration> {
        self.low_speed_time_secs.map(Duration::from_secs)
    }
}
