//! Facts about ufacter itself

use async_trait::async_trait;
use ufacter_core::{Fact, FactSink, ReportOptions, Reporter};

/// Fact set version ufacter is compatible with
pub const FACTER_VERSION: &str = "3.0.0";

/// Reports `ufacter.version` and `facterversion`
#[derive(Debug, Clone, Default)]
pub struct UfacterReporter;

impl UfacterReporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Reporter for UfacterReporter {
    fn name(&self) -> &'static str {
        "ufacter"
    }

    async fn report(&self, sink: &FactSink, _options: ReportOptions) {
        sink.send(Fact::new(["ufacter", "version"], env!("CARGO_PKG_VERSION")))
            .await;
        sink.send(Fact::new(["facterversion"], FACTER_VERSION)).await;
    }
}
