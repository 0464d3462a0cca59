//! Memory and swap facts

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::instrument;
use ufacter_core::{Fact, FactSink, ReportOptions, Reporter};

use crate::error::FactsError;
use crate::paths::{HostPaths, read_to_string};
use crate::units::{human_bytes, percent, used_percent};

/// Byte counts of one memory pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub total: u64,
    pub used: u64,
    pub available: u64,
}

impl MemoryUsage {
    /// Facts under `memory.<pool>`; only the totals are stable
    #[must_use]
    pub fn facts(&self, pool: &str) -> Vec<Fact> {
        let path = |key: &'static str| ["memory", pool, key];
        vec![
            Fact::new(path("total_bytes"), self.total),
            Fact::new(path("total"), human_bytes(self.total)),
            Fact::new(path("used_bytes"), self.used).volatile(),
            Fact::new(path("used"), human_bytes(self.used)).volatile(),
            Fact::new(path("capacity"), percent(used_percent(self.used, self.total))).volatile(),
            Fact::new(path("available_bytes"), self.available).volatile(),
            Fact::new(path("available"), human_bytes(self.available)).volatile(),
        ]
    }
}

/// System memory and swap parsed from `/proc/meminfo`
///
/// Kernels older than 3.14 lack `MemAvailable`; free, buffers and page
/// cache stand in for it there.
///
/// # Errors
/// Returns [`FactsError::ParseError`] if `MemTotal` is missing or a value
/// is not a number.
pub fn parse_meminfo(content: &str) -> Result<(MemoryUsage, MemoryUsage), FactsError> {
    let mut fields = HashMap::new();
    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let number = rest.trim().trim_end_matches("kB").trim();
        let kib: u64 = number
            .parse()
            .map_err(|e| FactsError::ParseError(format!("meminfo {key} {number:?}: {e}")))?;
        fields.insert(key.trim(), kib.saturating_mul(1024));
    }
    let field = |key: &str| fields.get(key).copied().unwrap_or_default();

    let total = fields
        .get("MemTotal")
        .copied()
        .ok_or_else(|| FactsError::ParseError("meminfo has no MemTotal".to_string()))?;
    let available = fields.get("MemAvailable").copied().unwrap_or_else(|| {
        field("MemFree") + field("Buffers") + field("Cached")
    });
    let memory = MemoryUsage {
        total,
        used: total.saturating_sub(available),
        available,
    };

    let swap_total = field("SwapTotal");
    let swap_free = field("SwapFree");
    let swap = MemoryUsage {
        total: swap_total,
        used: swap_total.saturating_sub(swap_free),
        available: swap_free,
    };
    Ok((memory, swap))
}

/// Reports `memory.system.*` and `memory.swap.*`
#[derive(Debug, Clone)]
pub struct MemReporter {
    paths: HostPaths,
}

impl MemReporter {
    pub fn new(paths: HostPaths) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl Reporter for MemReporter {
    fn name(&self) -> &'static str {
        "mem"
    }

    #[instrument(skip_all, fields(reporter = "mem"))]
    async fn report(&self, sink: &FactSink, _options: ReportOptions) {
        let parsed = read_to_string(&self.paths.proc.join("meminfo"))
            .await
            .and_then(|content| parse_meminfo(&content));

        match parsed {
            Ok((memory, swap)) => {
                for fact in memory.facts("system") {
                    sink.send(fact).await;
                }
                // hosts without swap report nothing under memory.swap
                if swap.total > 0 {
                    for fact in swap.facts("swap") {
                        sink.send(fact).await;
                    }
                }
            }
            Err(e) => sink.error(e, &["virtual_memory"]).await,
        }
    }
}
