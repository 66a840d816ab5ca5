//! Scheduler tests against a scripted engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::Scheduler;
use crate::config::RollqConfig;
use crate::request::Request;

mod scripted;

use scripted::ScriptedEngine;

pub(super) fn scheduler() -> Scheduler<ScriptedEngine> {
    scheduler_with(ScriptedEngine::default())
}

pub(super) fn scheduler_with(engine: ScriptedEngine) -> Scheduler<ScriptedEngine> {
    let cfg = RollqConfig {
        spool_threshold_bytes: None,
        poll_timeout_secs: 0.0,
        ..RollqConfig::default()
    };
    Scheduler::with_engine(engine, &cfg)
}

/// Completion log shared with callbacks: URLs in callback order.
#[derive(Clone, Default)]
pub(super) struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub(super) fn request(&self, url: &str) -> Request {
        let log = self.clone();
        Request::new(url).on_complete(move |resp| {
            log.0.lock().unwrap().push(resp.request().url().to_string());
            Ok(())
        })
    }

    pub(super) fn urls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub(super) fn counting(url: &str, counter: &Arc<AtomicUsize>) -> Request {
    let counter = Arc::clone(counter);
    Request::new(url).on_complete(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}
