//! Module names and reporter construction

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ufacter_core::Reporter;
use ufacter_exec::CommandExecutor;

use crate::about::UfacterReporter;
use crate::cpu::CpuReporter;
use crate::disk::DiskReporter;
use crate::error::FactsError;
use crate::host::HostReporter;
use crate::iproute::IpRoute;
use crate::link::LinkReporter;
use crate::mem::MemReporter;
use crate::net::NetReporter;
use crate::paths::HostPaths;
use crate::route::RouteReporter;

/// A selectable fact module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Cpu,
    Mem,
    Host,
    Disk,
    Net,
    Route,
    Link,
    Ufacter,
}

impl Module {
    /// Every module, in the default run order
    pub const ALL: [Module; 8] = [
        Module::Cpu,
        Module::Mem,
        Module::Host,
        Module::Disk,
        Module::Net,
        Module::Route,
        Module::Link,
        Module::Ufacter,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Module::Cpu => "cpu",
            Module::Mem => "mem",
            Module::Host => "host",
            Module::Disk => "disk",
            Module::Net => "net",
            Module::Route => "route",
            Module::Link => "link",
            Module::Ufacter => "ufacter",
        }
    }

    /// Parse a comma-separated module list
    ///
    /// Blank entries are skipped and duplicates collapse to the first
    /// occurrence.
    ///
    /// # Errors
    /// Returns [`FactsError::UnknownModule`] for names that are not modules.
    pub fn parse_list(list: &str) -> Result<Vec<Module>, FactsError> {
        let mut modules = Vec::new();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let module = name.parse()?;
            if !modules.contains(&module) {
                modules.push(module);
            }
        }
        Ok(modules)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = FactsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|module| module.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| FactsError::UnknownModule(s.to_string()))
    }
}

/// Build one reporter per requested module
pub fn build(
    modules: &[Module],
    executor: Arc<dyn CommandExecutor>,
    paths: &HostPaths,
) -> Vec<Arc<dyn Reporter>> {
    let ip = IpRoute::new(Arc::clone(&executor));
    modules
        .iter()
        .map(|module| -> Arc<dyn Reporter> {
            match module {
                Module::Cpu => Arc::new(CpuReporter::new(paths.clone())),
                Module::Mem => Arc::new(MemReporter::new(paths.clone())),
                Module::Host => Arc::new(HostReporter::new(paths.clone(), Arc::clone(&executor))),
                Module::Disk => Arc::new(DiskReporter::new(paths.clone())),
                Module::Net => Arc::new(NetReporter::new(ip.clone())),
                Module::Route => Arc::new(RouteReporter::new(ip.clone())),
                Module::Link => Arc::new(LinkReporter::new(ip.clone())),
                Module::Ufacter => Arc::new(UfacterReporter::new()),
            }
        })
        .collect()
}
