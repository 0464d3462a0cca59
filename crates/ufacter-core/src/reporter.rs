//! Reporter contract and the fact sink reporters write into

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::fact::{ERRORS_PREFIX, Fact};

/// Which kinds of facts a run asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Report facts that change between invocations
    pub include_volatile: bool,
    /// Report facts the legacy facter tool does not know about
    pub include_extended: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_volatile: true,
            include_extended: true,
        }
    }
}

/// A unit of work that inspects one subsystem and emits facts
///
/// Implementations write any number of facts into the sink and return.
/// They must not return errors: a failed inspection is reported with
/// [`FactSink::error`]. The engine emits the completion sentinel once
/// `report` returns, so implementations never send one themselves.
#[async_trait]
pub trait Reporter: Send + Sync {
    /// Short module name (`cpu`, `mem`, ...), used for diagnostics paths
    fn name(&self) -> &'static str;

    /// Inspect the subsystem and write facts into `sink`
    async fn report(&self, sink: &FactSink, options: ReportOptions);
}

/// Producer half of the shared fact queue, bound to one reporter
///
/// Reporters only ever see a borrowed sink, so they cannot keep writing
/// once `report` has returned.
pub struct FactSink {
    tx: mpsc::Sender<Fact>,
    component: &'static str,
}

impl FactSink {
    /// Create a sink writing into `tx` on behalf of `component`
    #[must_use]
    pub fn new(tx: mpsc::Sender<Fact>, component: &'static str) -> Self {
        Self { tx, component }
    }

    /// Name of the reporter owning this sink
    #[must_use]
    pub fn component(&self) -> &'static str {
        self.component
    }

    /// Send one fact
    ///
    /// Facts with an empty path are refused: only the engine may signal
    /// completion. Sending after the consumer is gone is not an error for
    /// the reporter, the fact is discarded.
    pub async fn send(&self, fact: Fact) {
        if fact.is_sentinel() {
            warn!(
                component = self.component,
                "reporter tried to send a fact without a path, ignoring"
            );
            return;
        }
        self.push(fact).await;
    }

    /// Report a failure as a diagnostics fact
    ///
    /// The fact lands at `ufacter.errors.<component>.<what...>` with the
    /// error text as value.
    pub async fn error(&self, err: impl fmt::Display, what: &[&str]) {
        let message = err.to_string();
        debug!(component = self.component, what = ?what, error = %message, "reporting failure");

        let path = ERRORS_PREFIX
            .iter()
            .copied()
            .chain(std::iter::once(self.component))
            .chain(what.iter().copied());
        self.push(Fact::new(path, message)).await;
    }

    /// Second handle for the reporter task, owned by the engine
    pub(crate) fn detached(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            component: self.component,
        }
    }

    /// Signal completion, consuming the sink
    pub(crate) async fn finish(self) {
        self.push(Fact::sentinel()).await;
    }

    async fn push(&self, fact: Fact) {
        if self.tx.send(fact).await.is_err() {
            debug!(component = self.component, "fact queue closed, dropping fact");
        }
    }
}

impl fmt::Debug for FactSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactSink")
            .field("component", &self.component)
            .field("capacity", &self.tx.capacity())
            .finish()
    }
}
