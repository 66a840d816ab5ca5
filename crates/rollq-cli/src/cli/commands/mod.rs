//! CLI command handlers, one file per command.

mod fetch;
mod sweep;

pub use fetch::{run_fetch, FetchArgs};
#[cfg(test)]
pub(crate) use fetch::parse_url_list;
pub use sweep::run_sweep;
