//! End-to-end behaviour of `ChunkedFetcher` against in-memory collaborators.
//!
//! Each query mock records the chunk bounds it was called with so tests can
//! assert exactly which chunks ran.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use chainfetch_core::{
    ChunkProgress, ChunkedFetcher, FetchError, FetchOutcome, FetchRequest, HeadResolver,
    ProgressSink, RangeQuery,
};

// ─── Helpers ──────────────────────────────────────────────────────────────────

type Script = Vec<Result<Vec<&'static str>, &'static str>>;

/// Replays one scripted response per chunk; chunks past the script return `[]`.
#[derive(Default)]
struct ScriptedQuery {
    script: Script,
    calls: Mutex<Vec<(u64, u64)>>,
}

impl ScriptedQuery {
    fn new(script: Script) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(u64, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RangeQuery for ScriptedQuery {
    type Filter = &'static str;
    type Record = &'static str;

    async fn query(
        &self,
        filter: &&'static str,
        from: u64,
        to: u64,
    ) -> Result<Vec<&'static str>, FetchError> {
        assert_eq!(*filter, "Transfer", "filter must be passed through unchanged");
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((from, to));
            calls.len() - 1
        };
        match self.script.get(n) {
            Some(Ok(records)) => Ok(records.clone()),
            Some(Err(msg)) => Err(FetchError::Rpc((*msg).to_string())),
            None => Ok(Vec::new()),
        }
    }
}

/// Collects every progress report it receives.
#[derive(Default)]
struct RecordingSink {
    reports: Mutex<Vec<(ChunkProgress, Vec<&'static str>)>>,
}

impl RecordingSink {
    fn reports(&self) -> Vec<(ChunkProgress, Vec<&'static str>)> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressSink<&'static str> for RecordingSink {
    async fn on_chunk(
        &self,
        progress: &ChunkProgress,
        records: &[&'static str],
    ) -> Result<(), FetchError> {
        self.reports
            .lock()
            .unwrap()
            .push((*progress, records.to_vec()));
        Ok(())
    }
}

struct FixedHead {
    head: u64,
    calls: AtomicUsize,
}

#[async_trait]
impl HeadResolver for FixedHead {
    async fn resolve_latest(&self) -> Result<u64, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.head)
    }
}

const FROM: u64 = 8_661_240;
const TO: u64 = 8_662_230;

fn transfer_request(from: u64, to: u64) -> FetchRequest<&'static str, &'static str> {
    FetchRequest::new("Transfer", from, to)
}

// ─── Chunk count & coverage ───────────────────────────────────────────────────

#[tokio::test]
async fn default_chunk_size_yields_ten_chunks() {
    let fetcher = ChunkedFetcher::new();
    let query = ScriptedQuery::default();
    let sink = Arc::new(RecordingSink::default());

    fetcher
        .fetch(&query, transfer_request(FROM, TO).progress(sink.clone()))
        .await
        .unwrap();

    assert_eq!(sink.reports().len(), 10);
    let calls = query.calls();
    assert_eq!(calls.len(), 10);
    assert_eq!(calls.first(), Some(&(FROM, FROM + 100)));
    assert_eq!(calls.last(), Some(&(FROM + 900, TO)));
}

#[tokio::test]
async fn custom_chunk_size_yields_seventeen_chunks() {
    let fetcher = ChunkedFetcher::new();
    let query = ScriptedQuery::default();
    let sink = Arc::new(RecordingSink::default());

    fetcher
        .fetch(
            &query,
            transfer_request(FROM, TO).chunk_size(61).progress(sink.clone()),
        )
        .await
        .unwrap();

    assert_eq!(sink.reports().len(), 17);
    let calls = query.calls();
    for pair in calls.windows(2) {
        assert_eq!(pair[0].1, pair[1].0, "chunks must be contiguous");
    }
    assert_eq!(calls[0].0, FROM);
    assert_eq!(calls[16].1, TO);
}

#[tokio::test]
async fn zero_width_range_does_nothing() {
    let fetcher = ChunkedFetcher::new();
    let query = ScriptedQuery::new(vec![Ok(vec!["A"])]);
    let sink = Arc::new(RecordingSink::default());

    let records = fetcher
        .fetch(&query, transfer_request(500, 500).progress(sink.clone()))
        .await
        .unwrap();

    assert!(records.is_empty());
    assert!(query.calls().is_empty());
    assert!(sink.reports().is_empty());
}

// ─── Results & progress ───────────────────────────────────────────────────────

#[tokio::test]
async fn results_are_concatenated_in_chunk_order() {
    let fetcher = ChunkedFetcher::new();
    let query = ScriptedQuery::new(vec![Ok(vec!["A"]), Ok(vec!["B", "C"]), Ok(vec![])]);

    let records = fetcher
        .fetch(&query, transfer_request(0, 30).chunk_size(10))
        .await
        .unwrap();

    assert_eq!(records, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn progress_reports_each_chunk_once_in_order() {
    let fetcher = ChunkedFetcher::new();
    let query = ScriptedQuery::new(vec![Ok(vec!["A"]), Ok(vec!["B", "C"]), Ok(vec![])]);
    let sink = Arc::new(RecordingSink::default());

    fetcher
        .fetch(
            &query,
            transfer_request(0, 30).chunk_size(10).progress(sink.clone()),
        )
        .await
        .unwrap();

    let reports = sink.reports();
    let completed: Vec<u64> = reports.iter().map(|(p, _)| p.completed).collect();
    let percentages: Vec<u8> = reports.iter().map(|(p, _)| p.percentage).collect();
    assert_eq!(completed, vec![1, 2, 3]);
    assert_eq!(percentages, vec![33, 66, 100]);
    assert!(reports.iter().all(|(p, _)| p.total == 3));
    assert_eq!(reports[1].1, vec!["B", "C"]);
    assert_eq!((reports[2].0.span.from, reports[2].0.span.to), (20, 30));
}

// ─── Cancellation ─────────────────────────────────────────────────────────────

/// Cancels the fetcher from inside its first progress callback.
struct CancellingSink {
    fetcher: Arc<ChunkedFetcher>,
    invocations: AtomicUsize,
}

#[async_trait]
impl ProgressSink<&'static str> for CancellingSink {
    async fn on_chunk(&self, _: &ChunkProgress, _: &[&'static str]) -> Result<(), FetchError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.fetcher.cancel();
        Ok(())
    }
}

#[tokio::test]
async fn cancel_from_progress_sink_discards_results() {
    let fetcher = Arc::new(ChunkedFetcher::new());
    let query = ScriptedQuery::new(vec![Ok(vec!["A", "B"]), Ok(vec!["C"])]);
    let sink = Arc::new(CancellingSink {
        fetcher: fetcher.clone(),
        invocations: AtomicUsize::new(0),
    });

    let records = fetcher
        .fetch(&query, transfer_request(FROM, TO).progress(sink.clone()))
        .await
        .unwrap();

    assert!(records.is_empty());
    assert_eq!(sink.invocations.load(Ordering::SeqCst), 1);
    assert_eq!(query.calls().len(), 1);
    assert!(!fetcher.is_cancel_requested());
}

#[tokio::test]
async fn cancel_while_idle_cancels_only_the_next_fetch() {
    let fetcher = ChunkedFetcher::new();
    fetcher.cancel();
    fetcher.cancel();

    let query = ScriptedQuery::new(vec![Ok(vec!["A"])]);
    let outcome = fetcher
        .fetch_outcome(&query, transfer_request(0, 100))
        .await
        .unwrap();
    assert!(outcome.is_cancelled());
    assert!(query.calls().is_empty());

    let records = fetcher
        .fetch(&query, transfer_request(0, 100))
        .await
        .unwrap();
    assert_eq!(records, vec!["A"]);
}

#[tokio::test]
async fn cancel_during_only_chunk_keeps_results_and_cancels_next_fetch() {
    let fetcher = Arc::new(ChunkedFetcher::new());
    let query = ScriptedQuery::new(vec![Ok(vec!["A"])]);
    let sink = Arc::new(CancellingSink {
        fetcher: fetcher.clone(),
        invocations: AtomicUsize::new(0),
    });

    let records = fetcher
        .fetch(&query, transfer_request(0, 50).progress(sink.clone()))
        .await
        .unwrap();
    assert_eq!(records, vec!["A"]);
    assert_eq!(sink.invocations.load(Ordering::SeqCst), 1);
    assert!(fetcher.is_cancel_requested());

    let next = ScriptedQuery::new(vec![Ok(vec!["B"])]);
    let outcome = fetcher
        .fetch_outcome(&next, transfer_request(0, 50))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        FetchOutcome::Cancelled {
            completed_chunks: 0,
            total_chunks: 1
        }
    );
    assert!(next.calls().is_empty());
    assert!(!fetcher.is_cancel_requested());
}

#[tokio::test]
async fn cancel_during_last_chunk_returns_full_results() {
    let fetcher = ChunkedFetcher::new();
    let handle = fetcher.cancel_handle();
    let query = ScriptedQuery::new(vec![Ok(vec!["A"]), Ok(vec!["B"]), Ok(vec!["C"])]);

    let records = fetcher
        .fetch(
            &query,
            transfer_request(0, 30).chunk_size(10).progress_fn(
                move |p: &ChunkProgress, _: &[&'static str]| {
                    if p.is_last() {
                        handle.cancel();
                    }
                },
            ),
        )
        .await
        .unwrap();

    assert_eq!(records, vec!["A", "B", "C"]);
    assert_eq!(query.calls().len(), 3);
    assert!(fetcher.is_cancel_requested());
}

#[tokio::test]
async fn zero_width_fetch_leaves_pending_cancel_in_place() {
    let fetcher = ChunkedFetcher::new();
    fetcher.cancel();

    let query = ScriptedQuery::new(vec![Ok(vec!["A"])]);
    let outcome = fetcher
        .fetch_outcome(&query, transfer_request(500, 500))
        .await
        .unwrap();
    assert_eq!(outcome, FetchOutcome::Complete(vec![]));
    assert!(fetcher.is_cancel_requested());

    let outcome = fetcher
        .fetch_outcome(&query, transfer_request(500, 600))
        .await
        .unwrap();
    assert!(outcome.is_cancelled());
    assert!(query.calls().is_empty());
    assert!(!fetcher.is_cancel_requested());

    let records = fetcher
        .fetch(&query, transfer_request(500, 600))
        .await
        .unwrap();
    assert_eq!(records, vec!["A"]);
}

/// Blocks inside the second chunk until the test releases it.
#[derive(Default)]
struct GatedQuery {
    entered: Notify,
    release: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl RangeQuery for GatedQuery {
    type Filter = ();
    type Record = u64;

    async fn query(&self, _: &(), from: u64, _to: u64) -> Result<Vec<u64>, FetchError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(vec![from])
    }
}

#[tokio::test]
async fn cancel_from_another_task_waits_for_in_flight_chunk() {
    let fetcher = Arc::new(ChunkedFetcher::new());
    let query = Arc::new(GatedQuery::default());
    let reported = Arc::new(Mutex::new(Vec::new()));

    let sink_log = reported.clone();
    let request = FetchRequest::new((), 0, 500u64).progress_fn(
        move |p: &ChunkProgress, _: &[u64]| sink_log.lock().unwrap().push(p.completed),
    );

    let task = {
        let fetcher = fetcher.clone();
        let query = query.clone();
        tokio::spawn(async move { fetcher.fetch_outcome(&*query, request).await })
    };

    query.entered.notified().await;
    assert!(fetcher.is_running());
    fetcher.cancel_handle().cancel();
    query.release.notify_one();

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        FetchOutcome::Cancelled {
            completed_chunks: 2,
            total_chunks: 5
        }
    );
    assert_eq!(query.calls.load(Ordering::SeqCst), 2);
    assert_eq!(*reported.lock().unwrap(), vec![1, 2]);
    assert!(!fetcher.is_running());
}

// ─── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn query_failure_aborts_without_partial_results() {
    let fetcher = ChunkedFetcher::new();
    let query = ScriptedQuery::new(vec![
        Ok(vec!["A"]),
        Ok(vec!["B"]),
        Err("node unavailable"),
        Ok(vec!["D"]),
        Ok(vec!["E"]),
    ]);
    let sink = Arc::new(RecordingSink::default());

    let err = fetcher
        .fetch(
            &query,
            transfer_request(0, 50).chunk_size(10).progress(sink.clone()),
        )
        .await
        .unwrap_err();

    assert_eq!(err.chunk_index(), Some(2));
    assert!(matches!(err.root_cause(), FetchError::Rpc(m) if m == "node unavailable"));
    assert_eq!(query.calls().len(), 3);
    assert_eq!(sink.reports().len(), 2);
    assert!(!fetcher.is_running());
}

struct FailingSink;

#[async_trait]
impl ProgressSink<&'static str> for FailingSink {
    async fn on_chunk(&self, _: &ChunkProgress, _: &[&'static str]) -> Result<(), FetchError> {
        Err(FetchError::Progress("ui closed".into()))
    }
}

#[tokio::test]
async fn failing_progress_sink_aborts_remaining_chunks() {
    let fetcher = ChunkedFetcher::new();
    let query = ScriptedQuery::new(vec![Ok(vec!["A"]), Ok(vec!["B"])]);

    let err = fetcher
        .fetch(
            &query,
            transfer_request(0, 20).chunk_size(10).progress(Arc::new(FailingSink)),
        )
        .await
        .unwrap_err();

    assert_eq!(err.chunk_index(), Some(0));
    assert!(matches!(err.root_cause(), FetchError::Progress(_)));
    assert_eq!(query.calls().len(), 1);
}

#[tokio::test]
async fn invalid_configuration_has_no_side_effects() {
    let fetcher = ChunkedFetcher::new();
    let query = ScriptedQuery::default();
    fetcher.cancel();

    let err = fetcher
        .fetch(&query, transfer_request(0, 100).chunk_size(0))
        .await
        .unwrap_err();
    assert!(err.is_invalid_config());

    let err = fetcher
        .fetch(&query, transfer_request(100, 99))
        .await
        .unwrap_err();
    assert!(err.is_invalid_config());

    assert!(query.calls().is_empty());
    assert!(fetcher.is_cancel_requested(), "pending cancel must survive rejected requests");
}

// ─── Re-entrancy ──────────────────────────────────────────────────────────────

/// Tries to start a nested fetch on the same fetcher from its progress sink.
struct ReentrantSink {
    fetcher: Arc<ChunkedFetcher>,
    nested: Mutex<Vec<bool>>,
}

#[async_trait]
impl ProgressSink<&'static str> for ReentrantSink {
    async fn on_chunk(&self, _: &ChunkProgress, _: &[&'static str]) -> Result<(), FetchError> {
        let query = ScriptedQuery::default();
        let result = self.fetcher.fetch(&query, transfer_request(0, 10)).await;
        self.nested
            .lock()
            .unwrap()
            .push(matches!(result, Err(FetchError::AlreadyRunning)));
        assert!(query.calls().is_empty());
        Ok(())
    }
}

#[tokio::test]
async fn concurrent_fetch_on_same_instance_fails_fast() {
    let fetcher = Arc::new(ChunkedFetcher::new());
    let query = ScriptedQuery::new(vec![Ok(vec!["A"]), Ok(vec!["B"])]);
    let sink = Arc::new(ReentrantSink {
        fetcher: fetcher.clone(),
        nested: Mutex::new(Vec::new()),
    });

    let records = fetcher
        .fetch(
            &query,
            transfer_request(0, 20).chunk_size(10).progress(sink.clone()),
        )
        .await
        .unwrap();

    assert_eq!(records, vec!["A", "B"]);
    assert_eq!(*sink.nested.lock().unwrap(), vec![true, true]);
    assert!(!fetcher.is_running());
}

// ─── Latest resolution ────────────────────────────────────────────────────────

#[tokio::test]
async fn latest_is_resolved_once_before_chunking() {
    let head = Arc::new(FixedHead {
        head: 250,
        calls: AtomicUsize::new(0),
    });
    let fetcher = ChunkedFetcher::new().with_resolver(head.clone());
    let query = ScriptedQuery::default();

    fetcher
        .fetch(&query, FetchRequest::latest("Transfer", 0))
        .await
        .unwrap();

    assert_eq!(head.calls.load(Ordering::SeqCst), 1);
    assert_eq!(query.calls(), vec![(0, 100), (100, 200), (200, 250)]);
}

#[tokio::test]
async fn latest_behind_start_is_invalid() {
    let fetcher = ChunkedFetcher::new().with_resolver(Arc::new(FixedHead {
        head: 10,
        calls: AtomicUsize::new(0),
    }));
    let query = ScriptedQuery::default();

    let err = fetcher
        .fetch(&query, FetchRequest::latest("Transfer", 11))
        .await
        .unwrap_err();

    assert!(err.is_invalid_config());
    assert!(query.calls().is_empty());
    assert!(!fetcher.is_running());
}
