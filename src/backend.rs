// =============================================================================
// Compute Backend — single-threaded actor owning the resident dataset
// =============================================================================
//
// The backend runs on its own OS thread and drains an ordered inbox:
//
//   SetDataset  -> replace the resident dataset, emit DatasetReady at once.
//   Compute     -> reject with "Stale dataset" unless the request's id
//                  matches the resident one; otherwise run the algorithm.
//
// Requests are handled strictly in arrival order, so a SetDataset sent
// before a Compute is always applied first. A failing or panicking algorithm
// is reported as `ok=false`; it never takes the thread down and never touches
// the resident dataset.
// =============================================================================

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::dataset::{Columns, Dataset, DatasetId};
use crate::error::ComputeError;
use crate::indicators::Indicator;
use crate::protocol::{BackendRequest, BackendResponse};
use crate::types::Series;

/// Channel ends the coordinator keeps after spawning a backend.
pub struct BackendHandle {
    pub requests: UnboundedSender<BackendRequest>,
    pub responses: UnboundedReceiver<BackendResponse>,
    pub thread: JoinHandle<()>,
}

pub struct ComputeBackend {
    dataset: Option<Dataset>,
    slow_compute_warn: Duration,
}

impl ComputeBackend {
    pub fn new(slow_compute_warn: Duration) -> Self {
        Self {
            dataset: None,
            slow_compute_warn,
        }
    }

    pub fn resident_id(&self) -> Option<&DatasetId> {
        self.dataset.as_ref().map(|d| &d.id)
    }

    /// Process one request and produce its response.
    pub fn handle(&mut self, request: BackendRequest) -> BackendResponse {
        match request {
            BackendRequest::SetDataset {
                dataset_id,
                columns,
            } => self.set_dataset(dataset_id, columns),
            BackendRequest::Compute {
                id,
                indicator,
                params,
                dataset_id,
            } => match self.compute(id, &indicator, &params, &dataset_id) {
                Ok(series) => BackendResponse::success(id, series),
                Err(e) => BackendResponse::failure(id, &e),
            },
        }
    }

    fn set_dataset(&mut self, dataset_id: DatasetId, columns: Columns) -> BackendResponse {
        info!(dataset_id = %dataset_id, bars = columns.len(), "dataset loaded");
        self.dataset = Some(Dataset::new(dataset_id.clone(), columns));
        BackendResponse::DatasetReady { dataset_id }
    }

    fn compute(
        &self,
        id: u64,
        name: &str,
        params: &[f64],
        dataset_id: &DatasetId,
    ) -> Result<Series, ComputeError> {
        self.compute_with(id, name, params, dataset_id, |indicator, columns| {
            indicator.compute(columns)
        })
    }

    /// Resolve and run `algorithm` against the resident dataset. Panics
    /// inside `algorithm` are reported as `Algorithm` errors.
    fn compute_with<F>(
        &self,
        id: u64,
        name: &str,
        params: &[f64],
        dataset_id: &DatasetId,
        algorithm: F,
    ) -> Result<Series, ComputeError>
    where
        F: FnOnce(&Indicator, &Columns) -> Result<Series, ComputeError>,
    {
        // Staleness is checked before the name so that any request against an
        // old dataset fails the same way.
        let dataset = match &self.dataset {
            Some(d) if &d.id == dataset_id => d,
            _ => {
                debug!(id, dataset_id = %dataset_id, "stale compute request rejected");
                return Err(ComputeError::StaleDataset);
            }
        };

        let indicator = Indicator::parse(name, params)?;
        let started = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| algorithm(&indicator, &dataset.columns)))
            .unwrap_or_else(|payload| Err(ComputeError::Algorithm(panic_message(payload))));

        let elapsed = started.elapsed();
        match &outcome {
            Ok(_) if elapsed >= self.slow_compute_warn => warn!(
                id,
                indicator = indicator.name(),
                bars = dataset.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "slow indicator computation"
            ),
            Ok(_) => debug!(
                id,
                indicator = indicator.name(),
                bars = dataset.len(),
                elapsed_us = elapsed.as_micros() as u64,
                "indicator computed"
            ),
            Err(e) => warn!(id, indicator = indicator.name(), error = %e, "indicator computation failed"),
        }
        outcome
    }

    /// Drain `inbox` until every sender is gone, replying on `outbox`.
    pub fn run(
        mut self,
        mut inbox: UnboundedReceiver<BackendRequest>,
        outbox: UnboundedSender<BackendResponse>,
    ) {
        while let Some(request) = inbox.blocking_recv() {
            let response = self.handle(request);
            if outbox.send(response).is_err() {
                warn!("response channel closed, backend stopping");
                break;
            }
        }
        info!("compute backend stopped");
    }

    /// Move the backend onto a dedicated named thread.
    pub fn spawn(self, thread_name: &str) -> std::io::Result<BackendHandle> {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();
        let thread = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || self.run(req_rx, resp_tx))?;
        Ok(BackendHandle {
            requests: req_tx,
            responses: resp_rx,
            thread,
        })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("indicator panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("indicator panicked: {s}")
    } else {
        "indicator panicked".to_string()
    }
}
