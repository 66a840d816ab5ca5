//! Merge of scheduler defaults with one request into a concrete transfer plan.

use super::{Method, Request, TransferOptions};

/// Everything the engine needs to run one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub url: String,
    pub method: Method,
    /// Encoded payload, when the request carries one.
    pub body: Option<Vec<u8>>,
    /// Default headers first, then the request's own.
    pub headers: Vec<String>,
    pub options: TransferOptions,
}

/// Builds the effective plan for `request`. Request options override defaults
/// key by key; request headers are appended after the defaults (same-named
/// lines are both sent).
pub fn build_plan(
    request: &Request,
    default_options: &TransferOptions,
    default_headers: &[String],
) -> TransferPlan {
    let options = default_options
        .merge(request.get_options())
        .with_redirect_defaults();
    let headers = default_headers
        .iter()
        .chain(request.get_headers())
        .cloned()
        .collect();
    TransferPlan {
        url: request.url().to_string(),
        method: request.get_method().clone(),
        body: request.get_payload().map(|p| p.encode()),
        headers,
        options,
    }
}
