//! Mock runtime lifecycle.
//!
//! Starts one listener per configured server, in declaration order, and
//! supervises shutdown. A bind failure part-way through leaves the already
//! started listeners tracked so the caller can still stop them.

use crate::config::MockConfig;
use crate::listener::MockListener;
use std::net::SocketAddr;
use tracing::info;

/// Supervises the listeners belonging to one mock configuration.
pub struct MockRuntime {
    config: MockConfig,
    listeners: Vec<MockListener>,
}

impl MockRuntime {
    /// Create a runtime for a validated configuration.
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            listeners: Vec::new(),
        }
    }

    /// The configuration this runtime serves.
    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// Start every configured server.
    ///
    /// Sockets are bound before this returns, so a successful return means
    /// every endpoint is accepting connections. On a bind failure the
    /// already started listeners stay tracked; call [`stop`](Self::stop) to
    /// release them.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        info!(
            service = %self.config.service,
            version = %self.config.version,
            servers = self.config.servers.len(),
            "Starting mock servers"
        );
        for server in self.config.servers.clone() {
            let listener = MockListener::start(server).await?;
            self.listeners.push(listener);
        }
        info!(active = self.listeners.len(), "Mock runtime running");
        Ok(())
    }

    /// Stop every running listener, draining in-flight requests.
    pub async fn stop(&mut self) {
        info!(active = self.listeners.len(), "Stopping mock servers");
        for listener in self.listeners.drain(..) {
            listener.stop().await;
        }
        info!("Mock runtime stopped");
    }

    /// Bound addresses in server declaration order.
    ///
    /// Useful when servers bind port 0 and the real port is only known after
    /// start.
    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.listeners.iter().map(|l| l.addr()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MockConfig;

    fn config_yaml(port_one: u16, port_two: u16) -> MockConfig {
        let yaml = format!(
            r#"
service: Payments
version: 1.0.0
protocol: openapi
servers:
  - name: payments-rest
    protocol: rest
    host: 127.0.0.1
    port: {port_one}
    routes:
      - operation: listPayments
        matcher:
          method: GET
          path: /payments
        response:
          body:
            items: []
  - name: payments-rpc
    protocol: rpc
    host: 127.0.0.1
    port: {port_two}
    routes:
      - operation: payment.get
        matcher:
          rpc_method: payment.get
        response:
          body:
            result: ok
"#
        );
        serde_yaml::from_str(&yaml).unwrap()
    }

    #[tokio::test]
    async fn test_starts_and_stops_all_servers() {
        let mut runtime = MockRuntime::new(config_yaml(0, 0));
        runtime.start().await.unwrap();
        let addrs = runtime.addrs();
        assert_eq!(addrs.len(), 2);

        let url = format!("http://{}/payments", addrs[0]);
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);

        runtime.stop().await;

        // Endpoint is released after stop.
        let err = reqwest::Client::new()
            .get(&url)
            .timeout(std::time::Duration::from_millis(500))
            .send()
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_partial_start_failure_leaves_started_servers_stoppable() {
        // Occupy a port, then configure the second server to collide with it.
        let blocker = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let taken = blocker.local_addr().unwrap().port();

        let mut runtime = MockRuntime::new(config_yaml(0, taken));
        let err = runtime.start().await.unwrap_err();
        assert!(err.to_string().contains("failed to bind"));

        // The first server did start and is still tracked.
        assert_eq!(runtime.addrs().len(), 1);
        runtime.stop().await;
        assert!(runtime.addrs().is_empty());
    }

    #[tokio::test]
    async fn test_rpc_server_dispatches_on_body_method() {
        let mut runtime = MockRuntime::new(config_yaml(0, 0));
        runtime.start().await.unwrap();
        let url = format!("http://{}/", runtime.addrs()[1]);

        let client = reqwest::Client::new();
        let matched = client
            .post(&url)
            .body(r#"{"method": "payment.get"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(matched.status().as_u16(), 200);

        let unmatched = client
            .post(&url)
            .body(r#"{"method": "payment.void"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(unmatched.status().as_u16(), 404);

        runtime.stop().await;
    }
}
