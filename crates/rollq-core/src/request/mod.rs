//! Request value object: what to fetch, how, and who to tell when it is done.

mod options;
mod plan;

pub use options::{TransferOptions, DEFAULT_MAX_REDIRECTIONS};
pub use plan::{build_plan, TransferPlan};

use std::fmt;
use std::sync::Arc;

use crate::response::Response;

/// Completion callback. Runs once per request, after its Response is built.
/// An `Err` aborts the run it was called from.
pub type Callback = Arc<dyn Fn(&Response) -> anyhow::Result<()> + Send + Sync>;

/// HTTP method of a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Custom(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Custom(verb) => verb,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Method {
    fn from(verb: &str) -> Self {
        match verb.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            other => Method::Custom(other.to_string()),
        }
    }
}

/// Request payload: an ordered form mapping or pre-encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Encoded as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Sent verbatim.
    Raw(Vec<u8>),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Form(pairs) => pairs.is_empty(),
            Payload::Raw(bytes) => bytes.is_empty(),
        }
    }

    /// Wire bytes of the payload.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Payload::Form(pairs) => url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs.iter())
                .finish()
                .into_bytes(),
            Payload::Raw(bytes) => bytes.clone(),
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Raw(s.as_bytes().to_vec())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Raw(s.into_bytes())
    }
}

/// One desired transfer.
#[derive(Clone, Default)]
pub struct Request {
    url: String,
    method: Method,
    payload: Option<Payload>,
    headers: Vec<String>,
    options: TransferOptions,
    callback: Option<Callback>,
}

impl Request {
    /// GET request for `url` with no payload, headers, options or callback.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: impl Into<Method>) -> Self {
        self.method = method.into();
        self
    }

    pub fn payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Form payload built from `(name, value)` pairs, kept in the given order.
    pub fn form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.payload = Some(Payload::Form(
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ));
        self
    }

    /// Appends a raw `Name: value` header line.
    pub fn header(mut self, line: impl Into<String>) -> Self {
        self.headers.push(line.into());
        self
    }

    pub fn headers<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers.extend(lines.into_iter().map(Into::into));
        self
    }

    pub fn options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Response) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn get_method(&self) -> &Method {
        &self.method
    }

    /// Payload, if one was set and is non-empty.
    pub fn get_payload(&self) -> Option<&Payload> {
        self.payload.as_ref().filter(|p| !p.is_empty())
    }

    pub fn get_headers(&self) -> &[String] {
        &self.headers
    }

    pub fn get_options(&self) -> &TransferOptions {
        &self.options
    }

    pub fn callback(&self) -> Option<&Callback> {
        self.callback.as_ref()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("payload", &self.payload)
            .field("headers", &self.headers)
            .field("options", &self.options)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_from_str_is_case_insensitive() {
        assert_eq!(Method::from("post"), Method::Post);
        assert_eq!(Method::from("Put"), Method::Put);
        assert_eq!(Method::from("delete"), Method::Custom("DELETE".into()));
        assert_eq!(Method::Custom("PATCH".into()).to_string(), "PATCH");
    }

    #[test]
    fn form_payload_is_url_encoded_in_order() {
        let p = Payload::Form(vec![
            ("q".into(), "rust lang".into()),
            ("page".into(), "2".into()),
            ("sym".into(), "a&b=c".into()),
        ]);
        assert_eq!(p.encode(), b"q=rust+lang&page=2&sym=a%26b%3Dc".to_vec());
    }

    #[test]
    fn empty_payload_counts_as_none() {
        let r = Request::new("http://x/").payload("");
        assert!(r.get_payload().is_none());
        let r = Request::new("http://x/").form(Vec::<(String, String)>::new());
        assert!(r.get_payload().is_none());
    }

    #[test]
    fn builder_collects_fields() {
        let r = Request::new("http://x/a")
            .method("PUT")
            .header("X-One: 1")
            .headers(["X-Two: 2"])
            .on_complete(|_| Ok(()));
        assert_eq!(r.url(), "http://x/a");
        assert_eq!(r.get_method(), &Method::Put);
        assert_eq!(r.get_headers(), ["X-One: 1", "X-Two: 2"]);
        assert!(r.callback().is_some());
        assert!(format!("{:?}", r).contains("callback: true"));
    }
}
