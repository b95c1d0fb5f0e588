use std::time::Duration;

use anyhow::{Context, Result};

use super::parse::parse_snapshot;
use super::snapshot::Snapshot;

/// Something that can produce the current set of vehicles.
///
/// Called from a background worker thread, never from the UI thread.
pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch(&self) -> Result<Snapshot>;

    fn describe(&self) -> String {
        "snapshot source".to_owned()
    }
}

pub struct HttpSnapshotSource {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpSnapshotSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("busmap/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            endpoint: endpoint.into(),
            agent,
        }
    }
}

impl SnapshotSource for HttpSnapshotSource {
    fn fetch(&self) -> Result<Snapshot> {
        let response = self
            .agent
            .get(&self.endpoint)
            .set("Accept", "application/geo+json, application/json")
            .call()
            .with_context(|| format!("request to {} failed", self.endpoint))?;

        let body = response
            .into_string()
            .with_context(|| format!("failed to read response body from {}", self.endpoint))?;

        parse_snapshot(&body)
            .with_context(|| format!("failed to decode snapshot from {}", self.endpoint))
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}
