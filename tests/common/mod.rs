// Common helpers for integration tests
#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use playersync::config::ConnectorConfig;
use playersync::{ConnectorError, Endpoint, MediaConnector, MediaEvent, MediaEventListener, PlayerProtocol};

/// Listener recording everything a connector reports
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<MediaEvent>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<MediaEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl MediaEventListener for RecordingListener {
    fn on_event(&self, event: MediaEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn on_error(&self, title: &str, error: &ConnectorError) {
        self.errors.lock().unwrap().push(format!("{}: {}", title, error));
    }
}

/// Fast polling so the tests do not wait long for the first status
pub fn fast_config() -> ConnectorConfig {
    ConnectorConfig {
        poll_interval_ms: 20,
        connect_timeout_ms: 500,
        request_timeout_ms: 500,
        probe_timeout_ms: 200,
    }
}

/// Create a connector pointing at a mock server, with a registered listener
pub fn connector_for<P: PlayerProtocol>(
    protocol: P,
    host_with_port: &str,
) -> (Arc<MediaConnector<P>>, Arc<RecordingListener>, Arc<dyn MediaEventListener>) {
    let connector = Arc::new(MediaConnector::new(protocol, fast_config()));
    let endpoint: Endpoint = host_with_port.parse().expect("mock server address is an endpoint");
    connector.set_endpoint(Some(endpoint));

    let listener = Arc::new(RecordingListener::default());
    let registered: Arc<dyn MediaEventListener> = listener.clone();
    connector.register_listener(Arc::downgrade(&registered));
    (connector, listener, registered)
}

/// Wait until `condition` holds, polling every 10ms
pub async fn wait_for<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Await a future with an upper bound so a hanging session fails the test
pub async fn within<T, F: Future<Output = T>>(future: F) -> T {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("operation finished in time")
}
