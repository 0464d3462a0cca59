//! Processor facts

use std::collections::BTreeMap;

use async_trait::async_trait;
use sysinfo::{CpuRefreshKind, RefreshKind, System};
use tracing::instrument;
use ufacter_core::{Fact, FactSink, ReportOptions, Reporter};

use crate::paths::{HostPaths, read_to_string};

/// Summary of `/proc/cpuinfo`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuInfo {
    /// Model name per physical package id
    pub packages: BTreeMap<u64, String>,
    /// Highest `cpu MHz` seen across logical processors
    pub max_mhz: Option<f64>,
}

impl CpuInfo {
    /// Distinct package models, sorted
    #[must_use]
    pub fn models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.packages.values().cloned().collect();
        models.sort();
        models
    }

    #[must_use]
    pub fn physical_count(&self) -> usize {
        self.packages.len()
    }
}

/// Parse `/proc/cpuinfo`, one block per logical processor
#[must_use]
pub fn parse_cpuinfo(content: &str) -> CpuInfo {
    let mut info = CpuInfo::default();

    for block in content.split("\n\n") {
        let mut physical_id = None;
        let mut model = None;

        for line in block.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "physical id" => physical_id = value.parse::<u64>().ok(),
                "model name" => model = Some(value.to_string()),
                "cpu MHz" => {
                    if let Ok(mhz) = value.parse::<f64>()
                        && info.max_mhz.is_none_or(|max| mhz > max)
                    {
                        info.max_mhz = Some(mhz);
                    }
                }
                _ => {}
            }
        }

        if let Some(id) = physical_id {
            info.packages.insert(id, model.unwrap_or_default());
        }
    }

    info
}

/// Reports `processors.*`
#[derive(Debug, Clone)]
pub struct CpuReporter {
    paths: HostPaths,
}

impl CpuReporter {
    pub fn new(paths: HostPaths) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl Reporter for CpuReporter {
    fn name(&self) -> &'static str {
        "cpu"
    }

    #[instrument(skip_all, fields(reporter = "cpu"))]
    async fn report(&self, sink: &FactSink, _options: ReportOptions) {
        let sampled = tokio::task::spawn_blocking(|| {
            let system = System::new_with_specifics(
                RefreshKind::new().with_cpu(CpuRefreshKind::everything()),
            );
            let count = system.cpus().len();
            let max_frequency = system.cpus().iter().map(|cpu| cpu.frequency()).max();
            (count, max_frequency)
        })
        .await;

        let sysinfo_mhz = match sampled {
            Ok((count, max_frequency)) => {
                if count > 0 {
                    sink.send(Fact::new(["processors", "count"], count)).await;
                }
                max_frequency
            }
            Err(e) => {
                sink.error(e, &["count"]).await;
                None
            }
        };

        match read_to_string(&self.paths.proc.join("cpuinfo")).await {
            Ok(content) => {
                let info = parse_cpuinfo(&content);
                sink.send(Fact::new(["processors", "models"], info.models()))
                    .await;
                sink.send(Fact::new(
                    ["processors", "physicalcount"],
                    info.physical_count(),
                ))
                .await;

                let speed = info
                    .max_mhz
                    .or_else(|| sysinfo_mhz.filter(|mhz| *mhz > 0).map(|mhz| mhz as f64));
                if let Some(mhz) = speed {
                    sink.send(Fact::new(["processors", "speed"], format!("{mhz:.2} MHz")))
                        .await;
                }
            }
            Err(e) => sink.error(e, &["info"]).await,
        }
    }
}
