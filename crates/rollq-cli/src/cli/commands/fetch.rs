//! `rollq fetch` – run a batch of URLs through the scheduler.

use anyhow::{bail, Context, Result};
use rollq_core::config::RollqConfig;
use rollq_core::{Method, Request, Response, Scheduler};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct FetchArgs {
    pub urls: Vec<String>,
    pub input: Option<PathBuf>,
    pub window: Option<usize>,
    pub method: String,
    pub headers: Vec<String>,
    pub data: Option<String>,
    pub lenient: bool,
    pub json: bool,
}

pub fn run_fetch(cfg: &RollqConfig, args: FetchArgs) -> Result<()> {
    let mut urls = args.urls.clone();
    if let Some(path) = &args.input {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        urls.extend(parse_url_list(&text));
    }
    if urls.is_empty() {
        bail!("no URLs given (pass them as arguments or with --input)");
    }

    let mut scheduler = Scheduler::from_config(cfg)?;
    if args.lenient {
        scheduler.set_rise_errors(false);
    }
    let method = Method::from(args.method.as_str());
    for url in urls {
        let mut request = Request::new(url)
            .method(method.clone())
            .headers(args.headers.iter().cloned());
        if let Some(data) = &args.data {
            request = request.payload(data.as_str());
        }
        let json = args.json;
        scheduler.add_request(request.on_complete(move |resp| {
            println!("{}", render(resp, json)?);
            Ok(())
        }));
    }

    let summary = scheduler.execute(args.window)?;
    println!(
        "{} completed, {} abandoned, {} bytes in, {} bytes out",
        summary.completed, summary.abandoned, summary.traffic_in, summary.traffic_out
    );
    Ok(())
}

/// One URL per non-blank line; `#` starts a comment line.
pub(crate) fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn render(resp: &Response, json: bool) -> Result<String> {
    let info = resp.info();
    if json {
        let value = serde_json::json!({
            "url": resp.request().url(),
            "status": resp.status(),
            "size": info.bytes_downloaded,
            "info": info,
            "body": resp.body_text()?,
        });
        return Ok(value.to_string());
    }
    let status = match &info.error {
        Some(e) => format!("ERR ({})", e),
        None => info.response_code.to_string(),
    };
    Ok(format!(
        "{:<5} {:>10} {:>8.3}s {}",
        status,
        info.bytes_downloaded,
        info.total_time.as_secs_f64(),
        resp.request().url()
    ))
}
