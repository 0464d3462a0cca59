//! Host identity, kernel, distribution and uptime facts

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::System;
use tracing::{debug, instrument};
use ufacter_core::{Fact, FactSink, ReportOptions, Reporter};
use ufacter_exec::CommandExecutor;

use crate::paths::{HostPaths, read_to_string};
use crate::units::capitalize;

// ============================================================================
// os-release
// ============================================================================

/// Key/value pairs of an `os-release` file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    fields: HashMap<String, String>,
}

impl OsRelease {
    /// Parse `KEY=value` lines, unquoting values
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let fields = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| {
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                    .unwrap_or(value);
                (key.trim().to_string(), value.to_string())
            })
            .collect();
        Self { fields }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Distribution family: first `ID_LIKE` entry, else `ID`
    #[must_use]
    pub fn family(&self) -> Option<&str> {
        self.get("ID_LIKE")
            .and_then(|like| like.split_whitespace().next())
            .or_else(|| self.get("ID"))
    }
}

/// Facts under `os`
#[must_use]
pub fn os_facts(release: &OsRelease, architecture: &str) -> Vec<Fact> {
    let mut facts = vec![
        Fact::new(["os", "architecture"], architecture),
        Fact::new(["os", "hardware"], architecture),
    ];
    let mut push = |path: &[&str], value: Option<&str>| {
        if let Some(value) = value {
            facts.push(Fact::new(path.iter().copied(), value));
        }
    };

    push(&["os", "family"], release.family());
    push(&["os", "name"], release.get("ID"));
    push(&["os", "release", "full"], release.get("VERSION_ID"));
    push(&["os", "distro", "id"], release.get("ID"));
    push(&["os", "distro", "description"], release.get("PRETTY_NAME"));
    push(&["os", "distro", "codename"], release.get("VERSION_CODENAME"));
    push(&["os", "distro", "release", "full"], release.get("VERSION_ID"));

    if let Some(version) = release.get("VERSION_ID") {
        let mut parts = version.split('.');
        push(&["os", "distro", "release", "major"], parts.next());
        push(&["os", "distro", "release", "minor"], parts.next());
    }

    facts
}

// ============================================================================
// Pure fact builders
// ============================================================================

/// `networking.fqdn`, `networking.hostname` and `networking.domain`
#[must_use]
pub fn hostname_facts(fqdn: &str) -> Vec<Fact> {
    let mut facts = vec![Fact::new(["networking", "fqdn"], fqdn)];
    match fqdn.split_once('.') {
        Some((host, domain)) => {
            facts.push(Fact::new(["networking", "domain"], domain));
            facts.push(Fact::new(["networking", "hostname"], host));
        }
        None => facts.push(Fact::new(["networking", "hostname"], fqdn)),
    }
    facts
}

/// `kernelrelease`, `kernelversion` and `kernelmajversion`
#[must_use]
pub fn kernel_facts(release: &str) -> Vec<Fact> {
    let version = release.split('-').next().unwrap_or(release);
    let major = version.split('.').take(2).collect::<Vec<_>>().join(".");
    vec![
        Fact::new(["kernelrelease"], release),
        Fact::new(["kernelversion"], version),
        Fact::new(["kernelmajversion"], major),
    ]
}

/// `system_uptime.*`
#[must_use]
pub fn uptime_facts(seconds: u64, boot_time: u64) -> Vec<Fact> {
    let days = seconds / 86_400;
    vec![
        Fact::new(["system_uptime", "seconds"], seconds).volatile(),
        Fact::new(["system_uptime", "hours"], seconds / 3600).volatile(),
        Fact::new(["system_uptime", "days"], days).volatile(),
        Fact::new(["system_uptime", "uptime"], format!("{days} days")).volatile(),
        Fact::new(["system_uptime", "boot_time"], boot_time).extended(),
    ]
}

/// `virtual` and `is_virtual` from `systemd-detect-virt` output
#[must_use]
pub fn virtualization_facts(detected: &str) -> Vec<Fact> {
    if detected == "none" {
        vec![
            Fact::new(["is_virtual"], false),
            Fact::new(["virtual"], "physical"),
        ]
    } else {
        vec![
            Fact::new(["is_virtual"], true),
            Fact::new(["virtual"], detected),
        ]
    }
}

/// IANA zone name from `<etc>/timezone` or the `<etc>/localtime` link
pub async fn zone_name(etc: &Path) -> Option<String> {
    if let Ok(content) = tokio::fs::read_to_string(etc.join("timezone")).await {
        let zone = content.trim();
        if !zone.is_empty() {
            return Some(zone.to_string());
        }
    }

    let target = tokio::fs::read_link(etc.join("localtime")).await.ok()?;
    let target = target.to_string_lossy();
    target
        .split_once("zoneinfo/")
        .map(|(_, zone)| zone.to_string())
}

// ============================================================================
// Reporter
// ============================================================================

const DETECT_VIRT_TIMEOUT: Duration = Duration::from_secs(10);

/// Reports identity, kernel, OS, uptime, `path` and `timezone`
pub struct HostReporter {
    paths: HostPaths,
    executor: Arc<dyn CommandExecutor>,
}

impl HostReporter {
    pub fn new(paths: HostPaths, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { paths, executor }
    }

    async fn report_virtualization(&self, sink: &FactSink) {
        // exits non-zero when it prints `none`
        let detected = self
            .executor
            .run_with_timeout("systemd-detect-virt", &[], DETECT_VIRT_TIMEOUT)
            .await;
        match detected {
            Ok(result) if !result.first_line().is_empty() => {
                for fact in virtualization_facts(result.first_line()) {
                    sink.send(fact).await;
                }
            }
            Ok(result) => {
                sink.error(
                    format!("systemd-detect-virt exited with {}", result.status),
                    &["virtualization"],
                )
                .await;
            }
            Err(e) => {
                if e.is_not_found() {
                    debug!("systemd-detect-virt is not installed");
                }
                sink.error(e, &["virtualization"]).await;
            }
        }
    }

    async fn report_os(&self, sink: &FactSink) {
        let release = match read_to_string(&self.paths.etc.join("os-release")).await {
            Ok(content) => OsRelease::parse(&content),
            Err(e) => {
                sink.error(e, &["os_release"]).await;
                OsRelease::default()
            }
        };
        for fact in os_facts(&release, std::env::consts::ARCH) {
            sink.send(fact).await;
        }
    }

    async fn report_timezone(&self, sink: &FactSink) {
        let zone = match zone_name(&self.paths.etc).await {
            Some(zone) => zone,
            None => {
                debug!("no zone name configured, using the current UTC offset");
                chrono::Local::now().format("%:z").to_string()
            }
        };
        sink.send(Fact::new(["timezone"], zone)).await;
    }
}

impl std::fmt::Debug for HostReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostReporter")
            .field("paths", &self.paths)
            .field("executor", &self.executor.executor_type())
            .finish()
    }
}

#[async_trait]
impl Reporter for HostReporter {
    fn name(&self) -> &'static str {
        "host"
    }

    #[instrument(skip_all, fields(reporter = "host"))]
    async fn report(&self, sink: &FactSink, _options: ReportOptions) {
        match System::host_name() {
            Some(fqdn) => {
                for fact in hostname_facts(&fqdn) {
                    sink.send(fact).await;
                }
            }
            None => sink.error("host name unavailable", &["hostname"]).await,
        }

        self.report_virtualization(sink).await;

        sink.send(Fact::new(["kernel"], capitalize(std::env::consts::OS)))
            .await;
        match System::kernel_version() {
            Some(release) => {
                for fact in kernel_facts(&release) {
                    sink.send(fact).await;
                }
            }
            None => sink.error("kernel release unavailable", &["uname"]).await,
        }

        self.report_os(sink).await;

        for fact in uptime_facts(System::uptime(), System::boot_time()) {
            sink.send(fact).await;
        }

        if let Ok(path) = std::env::var("PATH") {
            sink.send(Fact::new(["path"], path)).await;
        }

        self.report_timezone(sink).await;
    }
}
