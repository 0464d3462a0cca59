//! Primary interface facts

use async_trait::async_trait;
use tracing::instrument;
use ufacter_core::{Fact, FactSink, ReportOptions, Reporter};

use crate::iproute::IpRoute;

/// Destinations whose routes pick the primary interface per family
const PRIMARY_PROBES: [(&str, &str, &str); 2] = [
    ("1.0.0.0", "primary", "ipv4_route"),
    ("100::", "primary6", "ipv6_route"),
];

/// Reports `network.primary` and `network.primary6`
#[derive(Debug, Clone)]
pub struct RouteReporter {
    ip: IpRoute,
}

impl RouteReporter {
    pub fn new(ip: IpRoute) -> Self {
        Self { ip }
    }
}

#[async_trait]
impl Reporter for RouteReporter {
    fn name(&self) -> &'static str {
        "route"
    }

    #[instrument(skip_all, fields(reporter = "route"))]
    async fn report(&self, sink: &FactSink, _options: ReportOptions) {
        for (destination, key, what) in PRIMARY_PROBES {
            match self.ip.route_get(destination).await {
                Ok(routes) => {
                    if let Some(dev) = routes.into_iter().find_map(|route| route.dev) {
                        sink.send(Fact::new(["network", key], dev)).await;
                    } else {
                        sink.error(format!("no route to {destination}"), &[what]).await;
                    }
                }
                Err(e) => sink.error(e, &[what]).await,
            }
        }
    }
}
