//! Link topology facts: VLANs, bonds, bridges, veth pairs

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;
use ufacter_core::{Fact, FactSink, FactValue, ReportOptions, Reporter};

use crate::iproute::{IpRoute, LinkDetails};

/// Scalar from `ip` link details as a fact value
fn detail_value(value: &Value) -> Option<FactValue> {
    match value {
        Value::String(s) => Some(FactValue::from(s.as_str())),
        Value::Number(n) => n
            .as_u64()
            .map(FactValue::UInt)
            .or_else(|| n.as_i64().map(FactValue::Int)),
        Value::Bool(b) => Some(FactValue::Bool(*b)),
        _ => None,
    }
}

/// Facts under `link.<device>`
#[must_use]
pub fn link_facts(link: &LinkDetails) -> Vec<Fact> {
    let device = link.ifname.as_str();
    let mut facts = vec![Fact::new(["link", device, "type"], link.kind())];

    if let Some(mac) = &link.address {
        facts.push(Fact::new(["link", device, "mac"], mac.as_str()));
    }
    if let Some(parent) = &link.link {
        facts.push(Fact::new(["link", device, "parent"], parent.as_str()));
    }
    if let Some(master) = &link.master {
        facts.push(Fact::new(["link", device, "master"], master.as_str()));
    }
    if let Some(slave) = link.slave_kind() {
        facts.push(Fact::new(["link", device, "slave"], slave));
    }

    let details: &[(&str, &str, &str)] = match link.kind() {
        "vlan" => &[("vlan", "id", "id"), ("vlan", "protocol", "protocol")],
        "vxlan" => &[("vxlan", "id", "id")],
        "bond" => &[("bond", "mode", "mode")],
        _ => &[],
    };
    for &(group, key, attribute) in details {
        if let Some(value) = link.info(attribute).and_then(detail_value) {
            facts.push(Fact::new(["link", device, group, key], value));
        }
    }

    // a veth's link attribute names its peer
    if link.kind() == "veth"
        && let Some(peer) = &link.link
    {
        facts.push(Fact::new(["link", device, "peer", "name"], peer.as_str()));
    }

    facts
}

/// Reports `link.*`
#[derive(Debug, Clone)]
pub struct LinkReporter {
    ip: IpRoute,
}

impl LinkReporter {
    pub fn new(ip: IpRoute) -> Self {
        Self { ip }
    }
}

#[async_trait]
impl Reporter for LinkReporter {
    fn name(&self) -> &'static str {
        "link"
    }

    #[instrument(skip_all, fields(reporter = "link"))]
    async fn report(&self, sink: &FactSink, _options: ReportOptions) {
        match self.ip.links().await {
            Ok(links) => {
                for fact in links.iter().flat_map(link_facts) {
                    sink.send(fact).await;
                }
            }
            Err(e) => sink.error(e, &["list"]).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::test_support::{MockExecutor, capture, value_of};

    const LINKS: &str = r#"[
      {"ifindex":2,"ifname":"eth0","address":"52:54:00:12:34:56","master":"bond0",
       "linkinfo":{"info_slave_kind":"bond"}},
      {"ifindex":5,"ifname":"bond0","address":"52:54:00:12:34:56",
       "linkinfo":{"info_kind":"bond","info_data":{"mode":"active-backup","miimon":100}}},
      {"ifindex":6,"ifname":"bond0.42","link":"bond0","address":"52:54:00:12:34:56",
       "linkinfo":{"info_kind":"vlan","info_data":{"protocol":"802.1Q","id":42}}},
      {"ifindex":7,"ifname":"vx10","linkinfo":{"info_kind":"vxlan","info_data":{"id":10}}},
      {"ifindex":8,"ifname":"veth0","link":"veth1","linkinfo":{"info_kind":"veth"}}
    ]"#;

    async fn facts() -> Vec<Fact> {
        let executor = MockExecutor::default().with("ip -json -details link show", LINKS);
        let reporter = LinkReporter::new(IpRoute::new(Arc::new(executor)));
        capture(&reporter, ReportOptions::default()).await
    }

    #[tokio::test]
    async fn test_bond_and_slave() {
        let facts = facts().await;

        assert_eq!(value_of(&facts, "link.eth0.type"), Some(&FactValue::from("device")));
        assert_eq!(value_of(&facts, "link.eth0.master"), Some(&FactValue::from("bond0")));
        assert_eq!(value_of(&facts, "link.eth0.slave"), Some(&FactValue::from("bond")));
        assert_eq!(
            value_of(&facts, "link.bond0.bond.mode"),
            Some(&FactValue::from("active-backup"))
        );
    }

    #[tokio::test]
    async fn test_vlan_vxlan_and_veth() {
        let facts = facts().await;

        assert_eq!(
            value_of(&facts, "link.bond0.42.vlan.id"),
            Some(&FactValue::UInt(42))
        );
        assert_eq!(
            value_of(&facts, "link.bond0.42.vlan.protocol"),
            Some(&FactValue::from("802.1Q"))
        );
        assert_eq!(
            value_of(&facts, "link.bond0.42.parent"),
            Some(&FactValue::from("bond0"))
        );

        assert_eq!(value_of(&facts, "link.vx10.vxlan.id"), Some(&FactValue::UInt(10)));
        assert_eq!(value_of(&facts, "link.veth0.peer.name"), Some(&FactValue::from("veth1")));
        assert_eq!(value_of(&facts, "link.veth0.parent"), Some(&FactValue::from("veth1")));
    }
}
