// =============================================================================
// Coordinator — dataset freshness, request correlation and result caching
// =============================================================================
//
// `compute(name, params, bars)` is the only public operation. Per call:
//
//   1. Derive the DatasetId of `bars` (length + endpoints, see dataset.rs).
//   2. If it differs from the last id sent: clear the cache, move freshly
//      built columns to the backend and remember a future that resolves when
//      the backend acknowledges with DatasetReady.
//   3. Look up `datasetId:name:params`. A hit returns the existing shared
//      future, resolved or still in flight, so identical concurrent calls
//      share one backend computation. Failed entries are returned like any
//      other; the cache only empties on a dataset change.
//   4. On a miss, build a shared future that waits for the dataset ack,
//      registers a oneshot under a fresh request id, sends Compute and
//      awaits the routed ComputeResult.
//
// A router task owns the backend's response channel and completes the
// oneshots by id. Obsolete requests need no tracking here: the backend
// itself rejects anything that references a dataset it no longer holds.
// =============================================================================

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::backend::{BackendHandle, ComputeBackend};
use crate::config::EngineConfig;
use crate::dataset::{Columns, DatasetId};
use crate::error::ComputeError;
use crate::protocol::{into_result, BackendRequest, BackendResponse};
use crate::types::{Bar, Series};

type SharedSeries = Shared<BoxFuture<'static, Result<Arc<Series>, ComputeError>>>;
type ReadySignal = Shared<BoxFuture<'static, Result<(), ComputeError>>>;

/// Oneshot resolvers waiting on backend messages.
#[derive(Default)]
struct Pending {
    results: HashMap<u64, oneshot::Sender<Result<Series, ComputeError>>>,
    ready: HashMap<DatasetId, VecDeque<oneshot::Sender<()>>>,
    /// Set once the response channel is gone; nothing registered after this
    /// could ever be completed.
    closed: bool,
}

#[derive(Default)]
struct CacheState {
    dataset_id: Option<DatasetId>,
    ready: Option<ReadySignal>,
    entries: HashMap<String, SharedSeries>,
}

pub struct Coordinator {
    requests: UnboundedSender<BackendRequest>,
    state: Mutex<CacheState>,
    pending: Arc<Mutex<Pending>>,
    next_id: Arc<AtomicU64>,
    transfers: AtomicU64,
    requests_sent: Arc<AtomicU64>,
    backend_thread: std::thread::JoinHandle<()>,
    router: JoinHandle<()>,
}

impl Coordinator {
    /// Start a backend thread and the response router.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: &EngineConfig) -> Result<Self> {
        let backend = ComputeBackend::new(Duration::from_millis(config.slow_compute_warn_ms));
        let handle = backend
            .spawn(&config.backend_thread_name)
            .with_context(|| format!("failed to spawn backend thread `{}`", config.backend_thread_name))?;

        info!(thread = %config.backend_thread_name, "indicator coordinator started");
        Ok(Self::attach(handle))
    }

    fn attach(handle: BackendHandle) -> Self {
        let pending = Arc::new(Mutex::new(Pending::default()));
        let router = tokio::spawn(route_responses(handle.responses, pending.clone()));
        Self {
            requests: handle.requests,
            state: Mutex::new(CacheState::default()),
            pending,
            next_id: Arc::new(AtomicU64::new(0)),
            transfers: AtomicU64::new(0),
            requests_sent: Arc::new(AtomicU64::new(0)),
            backend_thread: handle.thread,
            router,
        }
    }

    /// Compute `name` with `params` over `bars`.
    ///
    /// Returns one record per bar. An empty history resolves immediately to
    /// an empty series without touching the backend.
    pub async fn compute(
        &self,
        name: &str,
        params: &[f64],
        bars: &[Bar],
    ) -> Result<Arc<Series>, ComputeError> {
        let Some(dataset_id) = DatasetId::from_bars(bars) else {
            return Ok(Arc::new(Series::new()));
        };
        let entry = self.cache_entry(name, params, bars, dataset_id)?;
        entry.await
    }

    /// Number of datasets moved to the backend so far.
    pub fn transfers(&self) -> u64 {
        self.transfers.load(Ordering::Relaxed)
    }

    /// Number of Compute messages sent to the backend so far.
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent.load(Ordering::Relaxed)
    }

    /// The id of the last dataset sent to the backend.
    pub fn resident_dataset(&self) -> Option<DatasetId> {
        self.state.lock().dataset_id.clone()
    }

    /// Stop the backend and wait for it to exit.
    ///
    /// Futures still held by callers keep the request channel open, so this
    /// returns only after they have been dropped.
    pub async fn shutdown(self) {
        let Self {
            requests,
            state,
            backend_thread,
            router,
            ..
        } = self;
        drop(state);
        drop(requests);
        match tokio::task::spawn_blocking(move || backend_thread.join()).await {
            Ok(Ok(())) => {}
            Ok(Err(payload)) => error!(
                panic = payload
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("unknown"),
                "backend thread panicked"
            ),
            Err(e) => error!(error = %e, "backend thread join failed"),
        }
        if let Err(e) = router.await {
            error!(error = %e, "response router task failed");
        }
        info!("indicator coordinator stopped");
    }

    fn cache_entry(
        &self,
        name: &str,
        params: &[f64],
        bars: &[Bar],
        dataset_id: DatasetId,
    ) -> Result<SharedSeries, ComputeError> {
        let mut state = self.state.lock();
        if state.dataset_id.as_ref() != Some(&dataset_id) {
            self.transfer(&mut state, &dataset_id, bars)?;
        }

        let key = cache_key(&dataset_id, name, params);
        if let Some(existing) = state.entries.get(&key) {
            debug!(key = %key, "indicator cache hit");
            return Ok(existing.clone());
        }

        let ready = state.ready.clone().ok_or(ComputeError::BackendUnavailable)?;
        let entry = self.request(name, params, dataset_id, ready);
        debug!(key = %key, "indicator cache miss");
        state.entries.insert(key, entry.clone());
        Ok(entry)
    }

    fn transfer(
        &self,
        state: &mut CacheState,
        dataset_id: &DatasetId,
        bars: &[Bar],
    ) -> Result<(), ComputeError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            if pending.closed {
                return Err(ComputeError::BackendUnavailable);
            }
            pending
                .ready
                .entry(dataset_id.clone())
                .or_default()
                .push_back(ack_tx);
        }

        let columns = Columns::from_bars(bars);
        let sent = self.requests.send(BackendRequest::SetDataset {
            dataset_id: dataset_id.clone(),
            columns,
        });
        if sent.is_err() {
            self.pending.lock().ready.remove(dataset_id);
            error!(dataset_id = %dataset_id, "backend request channel closed");
            return Err(ComputeError::BackendUnavailable);
        }

        self.transfers.fetch_add(1, Ordering::Relaxed);
        info!(dataset_id = %dataset_id, bars = bars.len(), "dataset transferred to backend");

        state.entries.clear();
        state.dataset_id = Some(dataset_id.clone());
        state.ready = Some(
            async move { ack_rx.await.map_err(|_| ComputeError::BackendUnavailable) }
                .boxed()
                .shared(),
        );
        Ok(())
    }

    fn request(
        &self,
        name: &str,
        params: &[f64],
        dataset_id: DatasetId,
        ready: ReadySignal,
    ) -> SharedSeries {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let message = BackendRequest::Compute {
            id,
            indicator: name.to_string(),
            params: params.to_vec(),
            dataset_id,
        };
        let requests = self.requests.clone();
        let pending = self.pending.clone();
        let sent_counter = self.requests_sent.clone();

        async move {
            ready.await?;

            let result_rx = {
                let mut pending = pending.lock();
                if pending.closed {
                    return Err(ComputeError::BackendUnavailable);
                }
                let (tx, rx) = oneshot::channel();
                pending.results.insert(id, tx);
                rx
            };

            if requests.send(message).is_err() {
                pending.lock().results.remove(&id);
                return Err(ComputeError::BackendUnavailable);
            }
            sent_counter.fetch_add(1, Ordering::Relaxed);

            let series = result_rx
                .await
                .map_err(|_| ComputeError::BackendUnavailable)??;
            Ok(Arc::new(series))
        }
        .boxed()
        .shared()
    }
}

/// `datasetId:name:p1,p2,...` with params in the caller's order.
fn cache_key(dataset_id: &DatasetId, name: &str, params: &[f64]) -> String {
    let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
    format!("{}:{}:{}", dataset_id, name, params.join(","))
}

/// Complete pending oneshots from backend messages until the channel closes.
async fn route_responses(
    mut responses: UnboundedReceiver<BackendResponse>,
    pending: Arc<Mutex<Pending>>,
) {
    while let Some(response) = responses.recv().await {
        match response {
            BackendResponse::DatasetReady { dataset_id } => {
                let waiter = {
                    let mut pending = pending.lock();
                    let waiter = pending
                        .ready
                        .get_mut(&dataset_id)
                        .and_then(VecDeque::pop_front);
                    if pending.ready.get(&dataset_id).is_some_and(VecDeque::is_empty) {
                        pending.ready.remove(&dataset_id);
                    }
                    waiter
                };
                debug!(dataset_id = %dataset_id, "dataset ready");
                if let Some(tx) = waiter {
                    let _ = tx.send(());
                }
            }
            BackendResponse::ComputeResult {
                id,
                ok,
                series,
                error,
            } => {
                let waiter = pending.lock().results.remove(&id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(into_result(ok, series, error));
                    }
                    None => debug!(id, "result for unknown request dropped"),
                }
            }
        }
    }

    let mut pending = pending.lock();
    if pending.results.is_empty() && pending.ready.is_empty() {
        debug!("backend response channel closed");
    } else {
        error!(
            waiting = pending.results.len() + pending.ready.len(),
            "backend response channel closed with requests outstanding"
        );
    }
    pending.closed = true;
    pending.results.clear();
    pending.ready.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> Coordinator {
        Coordinator::spawn(&EngineConfig::default()).unwrap()
    }

    fn daily(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(1_700_000_000_000 + i as i64 * 86_400_000, c, c + 1.0, c - 1.0, c, 500.0))
            .collect()
    }

    fn ramp(n: usize) -> Vec<Bar> {
        daily(&(0..n).map(|i| 100.0 + i as f64).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn moving_average_end_to_end() {
        let c = coordinator();
        let series = c.compute("ma", &[20.0], &ramp(25)).await.unwrap();
        assert_eq!(series.len(), 25);
        assert!(series[..19].iter().all(|r| r.is_empty()));
        assert!((series[19]["ma1"] - 109.5).abs() < 1e-9);
        for i in 19..25 {
            let expected = (i + 1 - 20..=i).map(|j| 100.0 + j as f64).sum::<f64>() / 20.0;
            assert!((series[i]["ma1"] - expected).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn empty_history_skips_backend() {
        let c = coordinator();
        let series = c.compute("rsi", &[], &[]).await.unwrap();
        assert!(series.is_empty());
        assert_eq!(c.transfers(), 0);
        assert_eq!(c.requests_sent(), 0);
        assert_eq!(c.resident_dataset(), None);
    }

    #[tokio::test]
    async fn concurrent_identical_calls_share_one_request() {
        let c = coordinator();
        let bars = ramp(60);
        let (a, b) = tokio::join!(
            c.compute("rsi", &[14.0], &bars),
            c.compute("rsi", &[14.0], &bars)
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(c.requests_sent(), 1);
        assert_eq!(c.transfers(), 1);
    }

    #[tokio::test]
    async fn repeated_call_is_served_from_cache() {
        let c = coordinator();
        let bars = ramp(40);
        let first = c.compute("boll", &[20.0, 2.0], &bars).await.unwrap();
        let second = c.compute("boll", &[20.0, 2.0], &bars).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(c.requests_sent(), 1);
    }

    #[tokio::test]
    async fn same_history_transfers_once() {
        let c = coordinator();
        let bars = ramp(50);
        c.compute("ma", &[], &bars).await.unwrap();
        c.compute("ema", &[], &bars).await.unwrap();
        c.compute("macd", &[12.0, 26.0, 9.0], &bars).await.unwrap();
        assert_eq!(c.transfers(), 1);
        assert_eq!(c.requests_sent(), 3);
        assert_eq!(c.resident_dataset(), DatasetId::from_bars(&bars));
    }

    #[tokio::test]
    async fn param_order_is_part_of_the_key() {
        let c = coordinator();
        let bars = ramp(50);
        c.compute("macd", &[12.0, 26.0, 9.0], &bars).await.unwrap();
        c.compute("macd", &[9.0, 12.0, 26.0], &bars).await.unwrap();
        assert_eq!(c.requests_sent(), 2);
    }

    #[tokio::test]
    async fn interior_change_keeps_cached_result() {
        // Documented signature trade-off: interior edits are not detected.
        let c = coordinator();
        let bars = ramp(30);
        let before = c.compute("ma", &[5.0], &bars).await.unwrap();

        let mut edited = bars.clone();
        edited[10].close = 1_000.0;
        let after = c.compute("ma", &[5.0], &edited).await.unwrap();

        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(c.transfers(), 1);
        assert_eq!(c.requests_sent(), 1);
    }

    #[tokio::test]
    async fn last_close_change_invalidates() {
        let c = coordinator();
        let bars = ramp(30);
        let before = c.compute("ma", &[5.0], &bars).await.unwrap();

        let mut edited = bars.clone();
        edited[29].close += 5.0;
        let after = c.compute("ma", &[5.0], &edited).await.unwrap();

        assert_eq!(c.transfers(), 2);
        assert_eq!(c.requests_sent(), 2);
        assert!((after[29]["ma1"] - before[29]["ma1"] - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn results_are_deterministic() {
        let bars = daily(&(0..80).map(|i| 100.0 + (i as f64 * 0.3).sin() * 7.0).collect::<Vec<_>>());
        let a = coordinator().compute("stochcross", &[9.0, 3.0], &bars).await.unwrap();
        let b = coordinator().compute("stochcross", &[9.0, 3.0], &bars).await.unwrap();
        assert_eq!(*a, *b);
    }

    #[tokio::test]
    async fn rsi_of_rising_prices_is_100() {
        let c = coordinator();
        let series = c.compute("rsi", &[14.0], &ramp(40)).await.unwrap();
        for rec in &series[14..] {
            let v = rec["rsi1"];
            assert!(v.is_finite());
            assert!((v - 100.0).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn unknown_indicator_failure_is_cached_until_dataset_changes() {
        let c = coordinator();
        let bars = ramp(10);
        let err = c.compute("nope", &[], &bars).await.unwrap_err();
        assert!(err.to_string().contains("nope"), "{err}");
        assert_eq!(c.compute("nope", &[], &bars).await.unwrap_err(), err);
        assert_eq!(c.requests_sent(), 1);

        let _ = c.compute("nope", &[], &ramp(11)).await;
        assert_eq!(c.requests_sent(), 2);
    }

    #[tokio::test]
    async fn superseded_dataset_request_is_stale() {
        let c = coordinator();
        let a = ramp(30);
        let b = ramp(31);
        let (ra, rb) = tokio::join!(c.compute("ma", &[5.0], &a), c.compute("ma", &[5.0], &b));
        assert_eq!(ra.unwrap_err(), ComputeError::StaleDataset);
        assert_eq!(rb.unwrap().len(), 31);

        // Re-issuing re-checks the signature and transfers again.
        let retry = c.compute("ma", &[5.0], &a).await.unwrap();
        assert_eq!(retry.len(), 30);
        assert_eq!(c.transfers(), 3);
    }

    #[tokio::test]
    async fn switching_back_and_forth_retransfers() {
        let c = coordinator();
        let a = ramp(20);
        let b = ramp(21);
        c.compute("atr", &[], &a).await.unwrap();
        c.compute("atr", &[], &b).await.unwrap();
        let again = c.compute("atr", &[], &a).await.unwrap();
        assert_eq!(again.len(), 20);
        assert_eq!(c.transfers(), 3);
        assert_eq!(c.requests_sent(), 3);
    }

    #[tokio::test]
    async fn shutdown_stops_backend() {
        let c = coordinator();
        c.compute("obv", &[], &ramp(10)).await.unwrap();
        c.shutdown().await;
    }

    /// A coordinator wired to channel ends the test controls.
    fn detached() -> (
        Coordinator,
        UnboundedReceiver<BackendRequest>,
        UnboundedSender<BackendResponse>,
    ) {
        let (req_tx, req_rx) = tokio::sync::mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = tokio::sync::mpsc::unbounded_channel();
        let c = Coordinator::attach(BackendHandle {
            requests: req_tx,
            responses: resp_rx,
            thread: std::thread::spawn(|| {}),
        });
        (c, req_rx, resp_tx)
    }

    #[tokio::test]
    async fn gone_backend_fails_new_calls() {
        let (c, req_rx, resp_tx) = detached();
        drop(req_rx);
        drop(resp_tx);
        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            c.compute("ma", &[2.0], &ramp(5)),
        )
        .await
        .expect("compute must not hang");
        assert_eq!(outcome.unwrap_err(), ComputeError::BackendUnavailable);
        assert_eq!(c.transfers(), 0);
        assert_eq!(c.requests_sent(), 0);
    }

    #[tokio::test]
    async fn closed_responses_fail_in_flight_request() {
        let (c, mut req_rx, resp_tx) = detached();
        let bars = ramp(5);

        let fake_backend = async move {
            match req_rx.recv().await {
                Some(BackendRequest::SetDataset { dataset_id, .. }) => {
                    resp_tx
                        .send(BackendResponse::DatasetReady { dataset_id })
                        .unwrap();
                }
                other => panic!("expected SetDataset, got {other:?}"),
            }
            assert!(matches!(
                req_rx.recv().await,
                Some(BackendRequest::Compute { .. })
            ));
            // Backend dies with the request outstanding.
            drop(resp_tx);
            req_rx
        };

        let (outcome, _req_rx) = tokio::time::timeout(
            Duration::from_secs(2),
            async { tokio::join!(c.compute("ma", &[2.0], &bars), fake_backend) },
        )
        .await
        .expect("compute must not hang");
        assert_eq!(outcome.unwrap_err(), ComputeError::BackendUnavailable);
        assert_eq!(c.requests_sent(), 1);
        assert!(c.pending.lock().results.is_empty());
        assert!(c.pending.lock().closed);

        // A different history now fails at transfer time.
        let next = c.compute("ma", &[2.0], &ramp(6)).await;
        assert_eq!(next.unwrap_err(), ComputeError::BackendUnavailable);
        assert_eq!(c.transfers(), 1);
    }

    #[tokio::test]
    async fn shutdown_after_backend_thread_panic() {
        let (req_tx, req_rx) = tokio::sync::mpsc::unbounded_channel::<BackendRequest>();
        let (resp_tx, resp_rx) = tokio::sync::mpsc::unbounded_channel::<BackendResponse>();
        let thread = std::thread::spawn(move || {
            drop(req_rx);
            drop(resp_tx);
            panic!("backend blew up");
        });
        let c = Coordinator::attach(BackendHandle {
            requests: req_tx,
            responses: resp_rx,
            thread,
        });
        tokio::time::timeout(Duration::from_secs(2), c.shutdown())
            .await
            .expect("shutdown must not hang");
    }

    #[test]
    fn cache_key_layout() {
        let id = DatasetId::from("3:0:2:1:1:1:0");
        assert_eq!(cache_key(&id, "macd", &[12.0, 26.0, 9.0]), "3:0:2:1:1:1:0:macd:12,26,9");
        assert_eq!(cache_key(&id, "fib", &[]), "3:0:2:1:1:1:0:fib:");
    }
}
