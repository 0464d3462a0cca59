//! Collection engine
//!
//! Runs every reporter as its own task, fans their facts into one bounded
//! queue and folds the surviving facts into a [`Namespace`]. Completion is
//! tracked by counting sentinels, one per reporter, never by waiting for the
//! queue to close.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::custom::{CustomFacts, CustomFactsOrder};
use crate::error::CoreError;
use crate::fact::{Fact, STATS_PREFIX};
use crate::filter::{FactFilter, Rejection};
use crate::namespace::{Displaced, Namespace};
use crate::reporter::{FactSink, ReportOptions, Reporter};

/// Default capacity of the shared fact queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Counters describing one collection run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSummary {
    /// Reporters whose sentinel was observed
    pub reporters_finished: usize,
    /// Real facts taken off the queue
    pub received: usize,
    /// Facts that reached the namespace
    pub accepted: usize,
    /// Facts dropped by the filter, per reason
    pub dropped: HashMap<Rejection, usize>,
    /// Values overwritten at the same path
    pub overwritten: usize,
    /// Insertions that turned a value into a subtree or the reverse
    pub conflicts: usize,
}

impl CollectionSummary {
    /// Number of facts dropped for `reason`
    #[must_use]
    pub fn dropped_for(&self, reason: Rejection) -> usize {
        self.dropped.get(&reason).copied().unwrap_or(0)
    }

    /// Total number of dropped facts
    #[must_use]
    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }

    fn record(&mut self, displaced: Option<&Displaced>) {
        self.accepted += 1;
        match displaced {
            Some(d) if d.is_structural() => self.conflicts += 1,
            Some(_) => self.overwritten += 1,
            None => {}
        }
    }

    fn merge(&mut self, other: &CollectionSummary) {
        self.reporters_finished += other.reporters_finished;
        self.received += other.received;
        self.accepted += other.accepted;
        self.overwritten += other.overwritten;
        self.conflicts += other.conflicts;
        for (reason, count) in &other.dropped {
            *self.dropped.entry(*reason).or_insert(0) += count;
        }
    }
}

/// Runs reporters concurrently and aggregates their facts
#[derive(Clone)]
pub struct CollectionEngine {
    options: ReportOptions,
    queue_capacity: usize,
    reporter_timeout: Option<Duration>,
}

impl CollectionEngine {
    /// Create an engine with default queue capacity and no timeout
    #[must_use]
    pub fn new(options: ReportOptions) -> Self {
        Self {
            options,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            reporter_timeout: None,
        }
    }

    /// Set the capacity of the shared fact queue
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Bound the time a single reporter may run
    #[must_use]
    pub fn with_reporter_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.reporter_timeout = timeout;
        self
    }

    #[must_use]
    pub fn options(&self) -> ReportOptions {
        self.options
    }

    fn filter(&self) -> FactFilter {
        FactFilter::from(self.options)
    }

    /// Collect facts from all reporters and merge custom facts
    ///
    /// Custom facts are merged before or after the reporters' facts
    /// depending on `order`, with the same last-write-wins rule.
    ///
    /// # Errors
    /// Returns an error if the fact queue cannot be set up or breaks down.
    #[instrument(skip_all, fields(reporters = reporters.len()))]
    pub async fn run(
        &self,
        reporters: Vec<Arc<dyn Reporter>>,
        custom: Option<&CustomFacts>,
        order: CustomFactsOrder,
    ) -> Result<(Namespace, CollectionSummary), CoreError> {
        let mut namespace = Namespace::new();
        let mut summary = CollectionSummary::default();

        if order == CustomFactsOrder::BeforeReporters
            && let Some(custom) = custom
        {
            summary.merge(&self.apply_custom(custom, &mut namespace));
        }

        summary.merge(&self.collect(reporters, &mut namespace).await?);

        if order == CustomFactsOrder::AfterReporters
            && let Some(custom) = custom
        {
            summary.merge(&self.apply_custom(custom, &mut namespace));
        }

        info!(
            reporters = summary.reporters_finished,
            received = summary.received,
            accepted = summary.accepted,
            dropped = summary.dropped_total(),
            conflicts = summary.conflicts,
            "fact collection completed"
        );

        Ok((namespace, summary))
    }

    /// Run all reporters and fold their facts into `namespace`
    ///
    /// Returns once every reporter has signalled completion.
    ///
    /// # Errors
    /// Returns an error if the queue capacity is zero or the queue closes
    /// before every reporter finished.
    pub async fn collect(
        &self,
        reporters: Vec<Arc<dyn Reporter>>,
        namespace: &mut Namespace,
    ) -> Result<CollectionSummary, CoreError> {
        if reporters.is_empty() {
            debug!("no reporters selected");
            return Ok(CollectionSummary::default());
        }
        if self.queue_capacity == 0 {
            return Err(CoreError::QueueCapacity(self.queue_capacity));
        }

        let (tx, mut rx) = mpsc::channel(self.queue_capacity);
        let expected = reporters.len();

        for reporter in reporters {
            let sink = FactSink::new(tx.clone(), reporter.name());
            tokio::spawn(supervise(
                reporter,
                sink,
                self.options,
                self.reporter_timeout,
            ));
        }
        // only supervisors hold senders from here on
        drop(tx);

        self.drain(&mut rx, expected, namespace).await
    }

    /// Read facts from `rx` until `expected` sentinels were seen
    ///
    /// Nothing is read from the queue after the last sentinel.
    ///
    /// # Errors
    /// Returns [`CoreError::QueueClosed`] if every sender is dropped before
    /// `expected` sentinels arrived.
    pub async fn drain(
        &self,
        rx: &mut mpsc::Receiver<Fact>,
        expected: usize,
        namespace: &mut Namespace,
    ) -> Result<CollectionSummary, CoreError> {
        let filter = self.filter();
        let mut summary = CollectionSummary::default();

        while summary.reporters_finished < expected {
            let Some(fact) = rx.recv().await else {
                return Err(CoreError::QueueClosed {
                    expected,
                    finished: summary.reporters_finished,
                });
            };

            if fact.is_sentinel() {
                summary.reporters_finished += 1;
                trace!(
                    finished = summary.reporters_finished,
                    expected, "reporter finished"
                );
                continue;
            }

            summary.received += 1;
            self.accept(fact, &filter, namespace, &mut summary);
        }

        Ok(summary)
    }

    fn apply_custom(&self, custom: &CustomFacts, namespace: &mut Namespace) -> CollectionSummary {
        let filter = self.filter();
        let mut summary = CollectionSummary::default();
        for fact in custom.facts() {
            summary.received += 1;
            self.accept(fact.clone(), &filter, namespace, &mut summary);
        }
        debug!(accepted = summary.accepted, "custom facts merged");
        summary
    }

    fn accept(
        &self,
        fact: Fact,
        filter: &FactFilter,
        namespace: &mut Namespace,
        summary: &mut CollectionSummary,
    ) {
        if let Err(reason) = filter.check(&fact) {
            trace!(fact = %fact.dotted(), reason = %reason, "fact dropped");
            *summary.dropped.entry(reason).or_insert(0) += 1;
            return;
        }

        let displaced = namespace.insert_fact(fact);
        if let Some(d) = &displaced {
            if d.is_structural() {
                warn!(path = d.path(), displaced = ?d, "fact replaced existing structure");
            } else {
                debug!(path = d.path(), "fact value overwritten");
            }
        }
        summary.record(displaced.as_ref());
    }
}

impl Default for CollectionEngine {
    fn default() -> Self {
        Self::new(ReportOptions::default())
    }
}

impl fmt::Debug for CollectionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionEngine")
            .field("options", &self.options)
            .field("queue_capacity", &self.queue_capacity)
            .field("reporter_timeout", &self.reporter_timeout)
            .finish()
    }
}

// ============================================================================
// Reporter supervision
// ============================================================================

/// Run one reporter to completion and emit its sentinel
///
/// The reporter runs in a task of its own so that a panic or a timeout is
/// contained. Whatever happens, the timing fact and exactly one sentinel
/// follow the reporter's own facts.
async fn supervise(
    reporter: Arc<dyn Reporter>,
    sink: FactSink,
    options: ReportOptions,
    timeout: Option<Duration>,
) {
    let name = reporter.name();
    let start = Instant::now();
    debug!(reporter = name, "reporter started");

    let worker_sink = sink.detached();
    let mut worker: JoinHandle<()> =
        tokio::spawn(async move { reporter.report(&worker_sink, options).await });

    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, &mut worker).await,
        None => Ok((&mut worker).await),
    };

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(reporter = name, error = %e, "reporter task failed");
            sink.error(format!("reporter task failed: {e}"), &["panic"])
                .await;
        }
        Err(_) => {
            worker.abort();
            // the aborted task still owns its sink until it is reaped
            if let Err(e) = worker.await
                && !e.is_cancelled()
            {
                debug!(reporter = name, error = %e, "reporter ended while being aborted");
            }
            let limit = timeout.unwrap_or_default();
            warn!(reporter = name, timeout = ?limit, "reporter timed out");
            sink.error(format!("timed out after {limit:?}"), &["timeout"])
                .await;
        }
    }

    let elapsed = start.elapsed();
    debug!(reporter = name, elapsed = ?elapsed, "reporter finished");

    let stats = STATS_PREFIX.iter().copied().chain(std::iter::once(name));
    sink.send(Fact::new(stats, format!("{elapsed:?}")).volatile().extended())
        .await;
    sink.finish().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::FactValue;
    use async_trait::async_trait;

    struct StaticReporter {
        name: &'static str,
        facts: Vec<Fact>,
    }

    #[async_trait]
    impl Reporter for StaticReporter {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn report(&self, sink: &FactSink, _options: ReportOptions) {
            for fact in &self.facts {
                sink.send(fact.clone()).await;
            }
        }
    }

    struct StalledReporter;

    #[async_trait]
    impl Reporter for StalledReporter {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn report(&self, sink: &FactSink, _options: ReportOptions) {
            sink.send(Fact::new(["stalled", "before"], "yes")).await;
            std::future::pending::<()>().await;
        }
    }

    /// Keeps writing until it is stopped
    struct ChattyReporter;

    #[async_trait]
    impl Reporter for ChattyReporter {
        fn name(&self) -> &'static str {
            "chatty"
        }

        async fn report(&self, sink: &FactSink, _options: ReportOptions) {
            let mut n = 0u64;
            loop {
                sink.send(Fact::new(["chatty", "tick"], n)).await;
                n += 1;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
    }

    struct PanickingReporter;

    #[async_trait]
    impl Reporter for PanickingReporter {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn report(&self, _sink: &FactSink, _options: ReportOptions) {
            panic!("inspection blew up");
        }
    }

    fn engine() -> CollectionEngine {
        CollectionEngine::new(ReportOptions::default())
    }

    #[tokio::test]
    async fn test_drain_stops_at_last_sentinel() {
        let (tx, mut rx) = mpsc::channel(16);
        tx.send(Fact::new(["a"], 1)).await.unwrap();
        tx.send(Fact::sentinel()).await.unwrap();
        tx.send(Fact::new(["b"], 2)).await.unwrap();
        tx.send(Fact::sentinel()).await.unwrap();
        // written after completion, must stay in the queue
        tx.send(Fact::new(["c"], 3)).await.unwrap();

        let mut ns = Namespace::new();
        let summary = engine().drain(&mut rx, 2, &mut ns).await.unwrap();

        assert_eq!(summary.reporters_finished, 2);
        assert_eq!(summary.received, 2);
        assert!(ns.value(&["c"]).is_none());
        assert_eq!(rx.recv().await.unwrap().dotted(), "c");
    }

    #[tokio::test]
    async fn test_drain_sentinels_first() {
        let (tx, mut rx) = mpsc::channel(16);
        tx.send(Fact::sentinel()).await.unwrap();
        tx.send(Fact::sentinel()).await.unwrap();
        tx.send(Fact::new(["late"], 1)).await.unwrap();

        let mut ns = Namespace::new();
        let summary = engine().drain(&mut rx, 2, &mut ns).await.unwrap();

        assert_eq!(summary.received, 0);
        assert!(ns.is_empty());
    }

    #[tokio::test]
    async fn test_drain_queue_closed_early() {
        let (tx, mut rx) = mpsc::channel(16);
        tx.send(Fact::sentinel()).await.unwrap();
        drop(tx);

        let mut ns = Namespace::new();
        let result = engine().drain(&mut rx, 3, &mut ns).await;

        assert!(matches!(
            result,
            Err(CoreError::QueueClosed {
                expected: 3,
                finished: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_collect_without_reporters() {
        let mut ns = Namespace::new();
        let summary = engine().collect(Vec::new(), &mut ns).await.unwrap();

        assert_eq!(summary, CollectionSummary::default());
        assert!(ns.is_empty());
    }

    #[tokio::test]
    async fn test_zero_capacity_is_fatal() {
        let reporter: Arc<dyn Reporter> = Arc::new(StaticReporter {
            name: "cpu",
            facts: Vec::new(),
        });
        let mut ns = Namespace::new();
        let result = engine()
            .with_queue_capacity(0)
            .collect(vec![reporter], &mut ns)
            .await;

        assert!(matches!(result, Err(CoreError::QueueCapacity(0))));
    }

    #[tokio::test]
    async fn test_stats_fact_per_reporter() {
        let reporter: Arc<dyn Reporter> = Arc::new(StaticReporter {
            name: "cpu",
            facts: vec![Fact::new(["processors", "count"], 4u64)],
        });
        let mut ns = Namespace::new();
        engine().collect(vec![reporter], &mut ns).await.unwrap();

        assert!(matches!(
            ns.value(&["ufacter", "stats", "cpu"]),
            Some(FactValue::String(_))
        ));
    }

    #[tokio::test]
    async fn test_stats_fact_is_volatile_and_extended() {
        let reporter: Arc<dyn Reporter> = Arc::new(StaticReporter {
            name: "cpu",
            facts: Vec::new(),
        });
        let mut ns = Namespace::new();
        let summary = CollectionEngine::new(ReportOptions {
            include_volatile: false,
            include_extended: true,
        })
        .collect(vec![reporter], &mut ns)
        .await
        .unwrap();

        assert!(ns.is_empty());
        assert_eq!(summary.dropped_for(Rejection::Volatile), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_emits_diagnostic_and_sentinel() {
        let stalled: Arc<dyn Reporter> = Arc::new(StalledReporter);
        let quick: Arc<dyn Reporter> = Arc::new(StaticReporter {
            name: "mem",
            facts: vec![Fact::new(["memory", "system", "total_bytes"], 1024u64)],
        });

        let mut ns = Namespace::new();
        let summary = engine()
            .with_reporter_timeout(Some(Duration::from_secs(5)))
            .collect(vec![stalled, quick], &mut ns)
            .await
            .unwrap();

        assert_eq!(summary.reporters_finished, 2);
        assert_eq!(ns.value(&["stalled", "before"]), Some(&FactValue::from("yes")));
        assert_eq!(
            ns.value(&["ufacter", "errors", "stalled", "timeout"]),
            Some(&FactValue::from("timed out after 5s"))
        );
        assert!(ns.value(&["memory", "system", "total_bytes"]).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_follows_sentinel_after_timeout() {
        let (tx, mut rx) = mpsc::channel(4096);
        let sink = FactSink::new(tx, "chatty");
        supervise(
            Arc::new(ChattyReporter),
            sink,
            ReportOptions::default(),
            Some(Duration::from_millis(50)),
        )
        .await;

        // every sender is gone once the supervisor returns
        let mut facts = Vec::new();
        while let Some(fact) = rx.recv().await {
            facts.push(fact);
        }
        let last = facts.pop().unwrap();
        assert!(last.is_sentinel());
        assert!(facts.iter().all(|f| !f.is_sentinel()));
        assert!(
            facts
                .iter()
                .any(|f| f.dotted() == "ufacter.errors.chatty.timeout")
        );
    }

    #[tokio::test]
    async fn test_panicking_reporter_still_completes() {
        let broken: Arc<dyn Reporter> = Arc::new(PanickingReporter);

        let mut ns = Namespace::new();
        let summary = engine().collect(vec![broken], &mut ns).await.unwrap();

        assert_eq!(summary.reporters_finished, 1);
        assert!(
            ns.value(&["ufacter", "errors", "broken", "panic"])
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_custom_facts_order() {
        let custom = CustomFacts::from_yaml_str("networking:\n  hostname: override\n").unwrap();
        let reporter = || -> Vec<Arc<dyn Reporter>> {
            let host: Arc<dyn Reporter> = Arc::new(StaticReporter {
                name: "host",
                facts: vec![Fact::new(["networking", "hostname"], "detected")],
            });
            vec![host]
        };

        let (before, _) = engine()
            .run(reporter(), Some(&custom), CustomFactsOrder::BeforeReporters)
            .await
            .unwrap();
        assert_eq!(
            before.value(&["networking", "hostname"]),
            Some(&FactValue::from("detected"))
        );

        let (after, _) = engine()
            .run(reporter(), Some(&custom), CustomFactsOrder::AfterReporters)
            .await
            .unwrap();
        assert_eq!(
            after.value(&["networking", "hostname"]),
            Some(&FactValue::from("override"))
        );
    }
}
