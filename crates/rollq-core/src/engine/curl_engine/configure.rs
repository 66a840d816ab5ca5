//! Applies a `TransferPlan` to an Easy2 handle and reads its metadata back.

use curl::easy::{Easy2, List};

use crate::engine::TransferInfo;
use crate::request::{Method, TransferPlan};

use super::collector::Collector;

/// Configure `easy` for `plan`: URL, method and payload, headers, and every
/// option the plan sets. Options left unset keep libcurl defaults.
pub(super) fn apply_plan(easy: &mut Easy2<Collector>, plan: &TransferPlan) -> Result<(), curl::Error> {
    easy.url(&plan.url)?;

    let opts = &plan.options;
    if let Some(follow) = opts.follow_location {
        easy.follow_location(follow)?;
    }
    if let Some(max) = opts.max_redirections {
        easy.max_redirections(max)?;
    }
    if let Some(d) = opts.connect_timeout() {
        easy.connect_timeout(d)?;
    }
    if let Some(d) = opts.timeout() {
        easy.timeout(d)?;
    }
    if let Some(verify) = opts.ssl_verify_peer {
        easy.ssl_verify_peer(verify)?;
    }
    if let Some(verify) = opts.ssl_verify_host {
        easy.ssl_verify_host(verify)?;
    }
    if let Some(ref ua) = opts.user_agent {
        easy.useragent(ua)?;
    }
    if let Some(ref referer) = opts.referer {
        easy.referer(referer)?;
    }
    if let Some(ref cookie) = opts.cookie {
        easy.cookie(cookie)?;
    }
    if let Some(ref encoding) = opts.accept_encoding {
        easy.accept_encoding(encoding)?;
    }
    if let Some(ref proxy) = opts.proxy {
        easy.proxy(proxy)?;
    }
    if let Some(speed) = opts.max_recv_speed {
        easy.max_recv_speed(speed)?;
    }
    if let Some(sz) = opts.buffer_size {
        easy.buffer_size(sz)?;
    }
    if let Some(limit) = opts.low_speed_limit {
        easy.low_speed_limit(limit)?;
    }
    if let Some(d) = opts.low_speed_time() {
        easy.low_speed_time(d)?;
    }

    match plan.body {
        Some(ref body) => {
            easy.post_fields_copy(body)?;
            easy.custom_request(plan.method.as_str())?;
        }
        None if plan.method != Method::Get => {
            easy.custom_request(plan.method.as_str())?;
        }
        None => {}
    }

    if !plan.headers.is_empty() {
        let mut list = List::new();
        for line in &plan.headers {
            list.append(line.trim())?;
        }
        easy.http_headers(list)?;
    }
    Ok(())
}

/// Snapshot of the handle's transfer info. Fields libcurl cannot report are left at defaults.
pub(super) fn read_info(easy: &mut Easy2<Collector>, error: Option<&curl::Error>) -> TransferInfo {
    TransferInfo {
        requested_url: String::new(),
        effective_url: easy.effective_url().ok().flatten().map(str::to_string),
        response_code: easy.response_code().unwrap_or(0),
        content_type: easy.content_type().ok().flatten().map(str::to_string),
        header_size: easy.header_size().unwrap_or(0),
        request_size: easy.request_size().unwrap_or(0),
        bytes_downloaded: easy.download_size().map(|n| n as u64).unwrap_or(0),
        bytes_uploaded: easy.upload_size().map(|n| n as u64).unwrap_or(0),
        redirect_count: easy.redirect_count().unwrap_or(0),
        primary_ip: easy.primary_ip().ok().flatten().map(str::to_string),
        namelookup_time: easy.namelookup_time().unwrap_or_default(),
        connect_time: easy.connect_time().unwrap_or_default(),
        total_time: easy.total_time().unwrap_or_default(),
        error: error.map(|e| e.to_string()),
    }
}
