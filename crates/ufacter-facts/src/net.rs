//! Interface address facts

use std::collections::BTreeMap;
use std::net::IpAddr;

use async_trait::async_trait;
use tracing::instrument;
use ufacter_core::{Fact, FactSink, FactValue, ReportOptions, Reporter};

use crate::error::FactsError;
use crate::iproute::{AddressInfo, InterfaceAddresses, IpRoute};
use crate::units::{netmask, network_address};

/// One address binding, rendered as a small mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub address: IpAddr,
    pub netmask: IpAddr,
    pub network: IpAddr,
    pub prefix: u8,
}

impl Binding {
    /// Build a binding from an `ip` address entry
    ///
    /// # Errors
    /// Returns [`FactsError::InvalidAddress`] for unparsable addresses or
    /// prefixes too long for the family.
    pub fn from_info(info: &AddressInfo) -> Result<Self, FactsError> {
        let address: IpAddr = info
            .local
            .parse()
            .map_err(|e| FactsError::InvalidAddress(format!("{}: {e}", info.local)))?;
        Ok(Self {
            address,
            netmask: netmask(address, info.prefixlen)?,
            network: network_address(address, info.prefixlen)?,
            prefix: info.prefixlen,
        })
    }

    #[must_use]
    pub fn is_ipv6(&self) -> bool {
        self.address.is_ipv6()
    }

    /// Mapping with `address`, `netmask`, `network` and, when extended
    /// facts are wanted, `cidr`
    #[must_use]
    pub fn to_value(&self, extended: bool) -> FactValue {
        let mut map = BTreeMap::new();
        map.insert("address".to_string(), self.address.to_string());
        map.insert("netmask".to_string(), self.netmask.to_string());
        map.insert("network".to_string(), self.network.to_string());
        if extended {
            map.insert("cidr".to_string(), format!("{}/{}", self.address, self.prefix));
        }
        FactValue::from(map)
    }
}

/// Reports `networking.interfaces.*`
#[derive(Debug, Clone)]
pub struct NetReporter {
    ip: IpRoute,
}

impl NetReporter {
    pub fn new(ip: IpRoute) -> Self {
        Self { ip }
    }

    async fn report_interface(
        &self,
        sink: &FactSink,
        interface: &InterfaceAddresses,
        options: ReportOptions,
    ) {
        let name = interface.ifname.to_lowercase();
        let path = |key: &'static str| ["networking", "interfaces", name.as_str(), key];

        if let Some(mac) = &interface.address {
            sink.send(Fact::new(path("mac"), mac.as_str())).await;
        }
        if let Some(mtu) = interface.mtu {
            sink.send(Fact::new(path("mtu"), mtu)).await;
        }

        let mut bindings = Vec::new();
        let mut bindings6 = Vec::new();
        for info in &interface.addr_info {
            match Binding::from_info(info) {
                Ok(binding) if binding.is_ipv6() => {
                    bindings6.push(binding.to_value(options.include_extended));
                }
                Ok(binding) => bindings.push(binding.to_value(options.include_extended)),
                Err(e) => {
                    sink.error(e, &["address", name.as_str(), info.local.as_str()])
                        .await;
                }
            }
        }

        if !bindings.is_empty() {
            sink.send(Fact::new(path("bindings"), bindings)).await;
        }
        if !bindings6.is_empty() {
            sink.send(Fact::new(path("bindings6"), bindings6)).await;
        }
    }
}

#[async_trait]
impl Reporter for NetReporter {
    fn name(&self) -> &'static str {
        "net"
    }

    #[instrument(skip_all, fields(reporter = "net"))]
    async fn report(&self, sink: &FactSink, options: ReportOptions) {
        let interfaces = match self.ip.addresses().await {
            Ok(interfaces) => interfaces,
            Err(e) => {
                sink.error(e, &["interfaces"]).await;
                return;
            }
        };

        for interface in &interfaces {
            self.report_interface(sink, interface, options).await;
        }
    }
}
