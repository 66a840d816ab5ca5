//! Rolling-window scheduler.
//!
//! Owns the pending queue and drives it through a fixed-size window of
//! transfer slots: fill the window, wait for any transfer to finish, build
//! its Response, run its callback, refill the freed slot, repeat until the
//! queue and the window are both empty or a stop is requested. Callbacks run
//! on the calling thread in completion order, never concurrently.

mod complete;
mod control;
mod error;
mod queue;
mod run;
mod window;

pub use complete::Traffic;
pub use control::StopHandle;
pub use error::ExecuteError;
pub use queue::QueueHandle;

use std::sync::Arc;
use std::time::Duration;

use crate::config::RollqConfig;
use crate::engine::{CurlEngine, TransferEngine, TransferInfo};
use crate::request::{build_plan, Request, TransferOptions};
use crate::response::Response;
use crate::store::ResponseStore;

use run::WindowRun;
use window::Window;

/// Smallest window the rolling loop accepts when strict checking is on.
pub const MIN_WINDOW_SIZE: usize = 2;

/// Outcome of one `execute` call. Traffic figures are the scheduler's
/// running totals after the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub traffic_in: u64,
    pub traffic_out: u64,
    /// Requests whose Response was built during this run.
    pub completed: usize,
    /// In-flight requests dropped because the run stopped early.
    pub abandoned: usize,
}

/// Bounded-concurrency HTTP executor over a [`TransferEngine`].
pub struct Scheduler<E: TransferEngine = CurlEngine> {
    engine: E,
    store: ResponseStore,
    queue: QueueHandle,
    stop: StopHandle,
    window_size: usize,
    poll_timeout: Duration,
    strict_window: bool,
    max_poll_faults: u32,
    default_options: TransferOptions,
    default_headers: Vec<String>,
    traffic: Traffic,
}

impl Scheduler<CurlEngine> {
    /// libcurl-backed scheduler with default configuration.
    pub fn new() -> Result<Self, ExecuteError> {
        Self::from_config(&RollqConfig::default())
    }

    /// libcurl-backed scheduler configured from `cfg`.
    pub fn from_config(cfg: &RollqConfig) -> Result<Self, ExecuteError> {
        let engine = CurlEngine::new()?;
        Ok(Self::with_engine(engine, cfg))
    }
}

impl<E: TransferEngine> Scheduler<E> {
    pub fn with_engine(engine: E, cfg: &RollqConfig) -> Self {
        Self {
            engine,
            store: ResponseStore::new(cfg.spool_dir.as_deref(), cfg.spool_threshold_bytes),
            queue: QueueHandle::default(),
            stop: StopHandle::new(),
            window_size: cfg.window_size,
            poll_timeout: cfg.poll_timeout(),
            strict_window: cfg.strict_window,
            max_poll_faults: cfg.max_poll_faults.max(1),
            default_options: cfg.options.clone(),
            default_headers: cfg.default_headers.clone(),
            traffic: Traffic::default(),
        }
    }

    /// Queues a request; returns its stable index.
    pub fn add_request(&mut self, request: Request) -> usize {
        self.queue.push(request)
    }

    /// Replaces the queue with `requests`.
    pub fn set_requests(&mut self, requests: Vec<Request>) -> &mut Self {
        self.queue.replace(requests);
        self
    }

    /// Drops a queued request. Fails (false) only if it is already in flight.
    pub fn remove_request(&mut self, index: usize) -> bool {
        self.queue.remove(index)
    }

    /// Handle for inspecting or trimming the queue from inside callbacks.
    pub fn queue_handle(&self) -> QueueHandle {
        self.queue.clone()
    }

    /// Handle that stops the current run at its next checkpoint.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn set_window_size(&mut self, window_size: usize) -> &mut Self {
        self.window_size = window_size;
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Upper bound on how long one engine poll blocks.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.poll_timeout = timeout;
        self
    }

    /// Replaces the default engine options applied to every request.
    pub fn set_options(&mut self, options: TransferOptions) -> &mut Self {
        self.default_options = options;
        self
    }

    /// Replaces the header lines sent ahead of every request's own headers.
    pub fn set_headers(&mut self, headers: Vec<String>) -> &mut Self {
        self.default_headers = headers;
        self
    }

    pub fn set_store(&mut self, store: ResponseStore) -> &mut Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &ResponseStore {
        &self.store
    }

    /// Sets the cooperative stop flag. `execute` clears it when it starts.
    pub fn set_immediately_stop(&mut self, stop: bool) -> &mut Self {
        self.stop.set(stop);
        self
    }

    /// Strict mode: reject runs whose effective window is below 2.
    pub fn set_rise_errors(&mut self, strict: bool) -> &mut Self {
        self.strict_window = strict;
        self
    }

    pub fn traffic_in(&self) -> u64 {
        self.traffic.bytes_in
    }

    pub fn traffic_out(&self) -> u64 {
        self.traffic.bytes_out
    }

    pub fn reset_traffic_in(&mut self) -> &mut Self {
        self.traffic.bytes_in = 0;
        self
    }

    pub fn reset_traffic_out(&mut self) -> &mut Self {
        self.traffic.bytes_out = 0;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Runs every queued request. `window_size`, when given, replaces the
    /// configured window size. A rolling run keeps the window it actually used,
    /// clamped to the queue length. Responses reach callers only through request
    /// callbacks. The queue is empty afterwards, whatever the outcome.
    pub fn execute(&mut self, window_size: Option<usize>) -> Result<RunSummary, ExecuteError> {
        self.stop.clear();
        if let Some(n) = window_size {
            self.window_size = n;
        }
        let result = self.run();
        self.queue.clear();
        let counts = result?;
        let summary = RunSummary {
            traffic_in: self.traffic.bytes_in,
            traffic_out: self.traffic.bytes_out,
            completed: counts.completed,
            abandoned: counts.abandoned,
        };
        tracing::info!(
            completed = summary.completed,
            abandoned = summary.abandoned,
            traffic_in = summary.traffic_in,
            traffic_out = summary.traffic_out,
            "run finished"
        );
        Ok(summary)
    }

    /// Runs one request right away on the calling thread, outside the queue.
    /// Builds its Response exactly as the pooled path would, runs its
    /// callback, and returns the Response.
    pub fn execute_request(&mut self, request: Request) -> Result<Response, ExecuteError> {
        self.perform(Arc::new(request))
    }

    fn run(&mut self) -> Result<run::RunCounts, ExecuteError> {
        let queued = self.queue.len();
        if queued == 0 {
            return Ok(run::RunCounts::default());
        }
        if queued == 1 {
            tracing::debug!("single queued request, using the direct path");
            return self.run_sequential();
        }
        let window = self.window_size.min(queued);
        self.window_size = window;
        if window < MIN_WINDOW_SIZE {
            if self.strict_window {
                return Err(ExecuteError::Configuration(format!(
                    "window size {} is below the minimum of {} for rolling execution",
                    window, MIN_WINDOW_SIZE
                )));
            }
            tracing::warn!(window, "window too narrow to roll, running requests one by one");
            return self.run_sequential();
        }
        self.run_window(window)
    }

    fn run_window(&mut self, size: usize) -> Result<run::RunCounts, ExecuteError> {
        tracing::debug!(window = size, queued = self.queue.len(), "starting rolling run");
        let window = Window::open(&mut self.engine, size)?;
        WindowRun {
            window,
            queue: &self.queue,
            store: &self.store,
            traffic: &mut self.traffic,
            stop: &self.stop,
            default_options: &self.default_options,
            default_headers: &self.default_headers,
            poll_timeout: self.poll_timeout,
            max_poll_faults: self.max_poll_faults,
        }
        .drive()
    }

    /// Direct path for each queued request in order (one request, or a narrow
    /// window with strict checking off).
    fn run_sequential(&mut self) -> Result<run::RunCounts, ExecuteError> {
        let mut counts = run::RunCounts::default();
        while !self.stop.is_stop_requested() {
            let Some((index, request)) = self.queue.lock_next() else {
                break;
            };
            self.perform(request)?;
            self.queue.finish(index);
            counts.completed += 1;
        }
        Ok(counts)
    }

    fn perform(&mut self, request: Arc<Request>) -> Result<Response, ExecuteError> {
        let plan = build_plan(&request, &self.default_options, &self.default_headers);
        tracing::debug!(url = %plan.url, method = %plan.method, "performing single transfer");
        let (output, info) = match self.engine.perform_one(&plan) {
            Ok(transfer) => (transfer.output, transfer.info),
            Err(e) => {
                tracing::warn!(url = %plan.url, "single transfer could not start: {}", e);
                (Vec::new(), TransferInfo::failed(request.url(), &e))
            }
        };
        complete::finish(&self.store, &mut self.traffic, request, output, info)
    }
}

#[cfg(test)]
mod tests;
