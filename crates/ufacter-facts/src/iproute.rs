//! `ip -json` output from iproute2
//!
//! Interface, link and route facts come from iproute2's JSON mode so no
//! netlink code runs in-process. Only the fields the reporters read are
//! modelled; everything else is ignored by serde.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;
use ufacter_exec::{CommandExecutor, ExecError, traits::run_json};

/// One interface from `ip -json address show`
#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceAddresses {
    pub ifname: String,
    #[serde(default)]
    pub mtu: Option<u64>,
    /// Hardware address, absent for layer-3 devices
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub addr_info: Vec<AddressInfo>,
}

/// One address assigned to an interface
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInfo {
    /// `inet` or `inet6`
    pub family: String,
    pub local: String,
    pub prefixlen: u8,
}

/// One link from `ip -json -details link show`
#[derive(Debug, Clone, Deserialize)]
pub struct LinkDetails {
    pub ifname: String,
    /// Parent device, for example the lower device of a VLAN
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub master: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub linkinfo: Option<LinkInfo>,
}

/// Kind-specific link attributes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkInfo {
    #[serde(default)]
    pub info_kind: Option<String>,
    #[serde(default)]
    pub info_data: Option<Value>,
    #[serde(default)]
    pub info_slave_kind: Option<String>,
}

impl LinkDetails {
    /// Link type as netlink names it; plain devices are `device`
    #[must_use]
    pub fn kind(&self) -> &str {
        self.linkinfo
            .as_ref()
            .and_then(|info| info.info_kind.as_deref())
            .unwrap_or("device")
    }

    /// Slave type when the link is enslaved to a bridge or bond
    #[must_use]
    pub fn slave_kind(&self) -> Option<&str> {
        self.linkinfo
            .as_ref()
            .and_then(|info| info.info_slave_kind.as_deref())
    }

    /// Attribute from the kind-specific data
    #[must_use]
    pub fn info(&self, key: &str) -> Option<&Value> {
        self.linkinfo
            .as_ref()
            .and_then(|info| info.info_data.as_ref())
            .and_then(|data| data.get(key))
    }
}

/// One route from `ip -json route get`
#[derive(Debug, Clone, Deserialize)]
pub struct RouteEntry {
    #[serde(default)]
    pub dev: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
}

/// Upper bound for a single `ip` invocation
pub const IP_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs `ip` through a command executor
#[derive(Clone)]
pub struct IpRoute {
    executor: Arc<dyn CommandExecutor>,
}

impl IpRoute {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    async fn ip<T: serde::de::DeserializeOwned>(&self, args: &[&str]) -> Result<T, ExecError> {
        run_json(self.executor.as_ref(), "ip", args, IP_TIMEOUT).await
    }

    /// All interfaces with their addresses
    ///
    /// # Errors
    /// Returns an error if `ip` fails or prints unexpected output.
    #[instrument(skip(self), level = "debug")]
    pub async fn addresses(&self) -> Result<Vec<InterfaceAddresses>, ExecError> {
        self.ip(&["-json", "address", "show"]).await
    }

    /// All links with kind-specific details
    ///
    /// # Errors
    /// Returns an error if `ip` fails or prints unexpected output.
    #[instrument(skip(self), level = "debug")]
    pub async fn links(&self) -> Result<Vec<LinkDetails>, ExecError> {
        self.ip(&["-json", "-details", "link", "show"]).await
    }

    /// Route the kernel would pick for `destination`
    ///
    /// # Errors
    /// Returns an error if `ip` fails, for example when there is no route.
    #[instrument(skip(self), level = "debug")]
    pub async fn route_get(&self, destination: &str) -> Result<Vec<RouteEntry>, ExecError> {
        let mut args = vec!["-json"];
        if destination.contains(':') {
            args.push("-6");
        }
        args.extend(["route", "get", destination]);
        self.ip(&args).await
    }
}

impl std::fmt::Debug for IpRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpRoute")
            .field("executor", &self.executor.executor_type())
            .finish()
    }
}
