// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fire-and-forget delivery of flushed batches.
//!
//! The engine hands batches to a [`DispatcherHandle`] and never waits on the
//! network. A single [`DispatcherService`] task pulls batches off its queue
//! and sends each one on its own task, with at most `max_in_flight` sends
//! running at once:
//!
//! ```text
//!   engine ──dispatch()──> queue ──> service ──permit──> send task ──> Transport
//!                                        │                   │
//!                                        └── waits for a ────┘ (DispatchOutcome)
//!                                            free permit
//! ```
//!
//! Every batch gets exactly one attempt. Failures end in the log; they are
//! never retried, requeued or persisted.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::batch::Batch;
use crate::config::AdapterConfig;
use crate::errors::ShippingError;
use crate::transport::Transport;

/// Result of the single send attempt for one batch.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub records: usize,
    pub result: Result<(), ShippingError>,
}

impl DispatchOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Clone, Debug)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<Batch>,
}

impl DispatcherHandle {
    /// Queues a batch for sending. Never blocks.
    pub fn dispatch(&self, batch: Batch) -> Result<(), mpsc::error::SendError<Batch>> {
        self.tx.send(batch)
    }
}

pub(crate) fn channel() -> (DispatcherHandle, mpsc::UnboundedReceiver<Batch>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DispatcherHandle { tx }, rx)
}

pub struct DispatcherService {
    transport: Arc<dyn Transport>,
    rx: mpsc::UnboundedReceiver<Batch>,
    permits: Arc<Semaphore>,
    outcomes: Option<mpsc::UnboundedSender<DispatchOutcome>>,
}

impl DispatcherService {
    #[must_use]
    pub fn new(config: &AdapterConfig, transport: Arc<dyn Transport>) -> (Self, DispatcherHandle) {
        let (handle, rx) = channel();
        let service = DispatcherService {
            transport,
            rx,
            permits: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            outcomes: None,
        };
        (service, handle)
    }

    /// Reports every send's outcome on `tx` in addition to logging it.
    #[must_use]
    pub fn with_outcomes(mut self, tx: mpsc::UnboundedSender<DispatchOutcome>) -> Self {
        self.outcomes = Some(tx);
        self
    }

    /// Runs until every handle is dropped, then waits for in-flight sends.
    pub async fn run(mut self) {
        debug!("Loggly dispatcher started");
        let mut in_flight = JoinSet::new();

        while let Some(batch) = self.rx.recv().await {
            while let Some(res) = in_flight.try_join_next() {
                log_join_error(res);
            }

            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                error!("Dispatch permits closed, dropping batch of {} records", batch.len());
                break;
            };
            let transport = Arc::clone(&self.transport);
            let outcomes = self.outcomes.clone();
            in_flight.spawn(async move {
                let outcome = send_batch(transport.as_ref(), batch).await;
                drop(permit);
                if let Some(tx) = outcomes {
                    let _ = tx.send(outcome);
                }
            });
        }

        while let Some(res) = in_flight.join_next().await {
            log_join_error(res);
        }
        debug!("Loggly dispatcher stopped");
    }
}

fn log_join_error(res: Result<(), tokio::task::JoinError>) {
    if let Err(e) = res {
        error!("Send task failed: {}", e);
    }
}

/// Encodes and sends one batch, logging any failure.
pub async fn send_batch(transport: &dyn Transport, batch: Batch) -> DispatchOutcome {
    let records = batch.len();
    let body = batch.to_ndjson();
    if body.is_empty() {
        debug!("Nothing to send for batch of {} records", records);
        return DispatchOutcome {
            records,
            result: Ok(()),
        };
    }

    let result = transport.send(body).await;
    match &result {
        Ok(()) => debug!("Sent {} records to Loggly", records),
        Err(e) => error!("Failed to send {} records to Loggly: {}", records, e),
    }
    DispatchOutcome { records, result }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::record::LogRecord;
    use crate::transport::LogglyClient;
    use async_trait::async_trait;
    use mockito::{Matcher, Server};
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::timeout;
    use tracing_test::traced_test;

    fn record(message: &str) -> LogRecord {
        LogRecord {
            message: message.to_string(),
            container_name: "/app".to_string(),
            container_id: "0123456789ab".to_string(),
            container_image: "app:1".to_string(),
            container_hostname: "app-host".to_string(),
        }
    }

    fn batch_of(messages: &[&str]) -> Batch {
        let mut batch = Batch::new(messages.len().max(1));
        for m in messages {
            batch.push(record(m)).unwrap();
        }
        batch
    }

    /// Counts calls and the highest number of concurrent sends.
    #[derive(Default)]
    struct SlowTransport {
        calls: AtomicUsize,
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Transport for SlowTransport {
        async fn send(&self, _body: Vec<u8>) -> Result<(), ShippingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_sends_one_post_per_batch() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/bulk/test-token")
            .match_header("X-LOGGLY-TAG", "docker,prod")
            .match_body(Matcher::Regex(r#"^\{"message":"a".*\}\n\{"message":"b".*\}\n$"#.to_string()))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let config = AdapterConfig::new("test-token")
            .unwrap()
            .with_endpoint(server.url())
            .with_tags("docker,prod");
        let transport = Arc::new(LogglyClient::new(&config).unwrap());
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
        let (service, handle) = DispatcherService::new(&config, transport);
        let service_task = tokio::spawn(service.with_outcomes(outcome_tx).run());

        handle.dispatch(batch_of(&["a", "b"])).unwrap();

        let outcome = outcome_rx.recv().await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.records, 2);

        drop(handle);
        service_task.await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    #[traced_test]
    async fn test_rejected_batch_is_logged_and_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/bulk/test-token")
            .with_status(400)
            .with_body("bad request")
            .expect(1)
            .create_async()
            .await;

        let config = AdapterConfig::new("test-token")
            .unwrap()
            .with_endpoint(server.url());
        let client = LogglyClient::new(&config).unwrap();

        let outcome = send_batch(&client, batch_of(&["a"])).await;

        assert_eq!(
            outcome.result.as_ref().unwrap_err().status(),
            Some(StatusCode::BAD_REQUEST)
        );
        assert!(logs_contain("Failed to send 1 records to Loggly"));
        assert!(logs_contain("400"));
        mock.assert_async().await;
    }

    #[tokio::test]
    #[traced_test]
    async fn test_transport_failure_is_logged() {
        let config = AdapterConfig::new("test-token")
            .unwrap()
            .with_endpoint("http://127.0.0.1:1");
        let client = LogglyClient::new(&config).unwrap();

        let outcome = send_batch(&client, batch_of(&["a", "b", "c"])).await;

        assert!(matches!(outcome.result, Err(ShippingError::Transport(_))));
        assert!(logs_contain("Failed to send 3 records to Loggly"));
        assert!(logs_contain("error from client"));
    }

    #[tokio::test]
    async fn test_no_tags_omits_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/bulk/test-token")
            .match_header("X-LOGGLY-TAG", Matcher::Missing)
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let config = AdapterConfig::new("test-token")
            .unwrap()
            .with_endpoint(server.url())
            .with_tags("");
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
        let (service, handle) = DispatcherService::new(&config, Arc::new(LogglyClient::new(&config).unwrap()));
        tokio::spawn(service.with_outcomes(outcome_tx).run());

        handle.dispatch(batch_of(&["untagged"])).unwrap();

        assert!(outcome_rx.recv().await.unwrap().is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_call() {
        let transport = SlowTransport::default();

        let outcome = send_batch(&transport, Batch::new(4)).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.records, 0);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_sends_are_bounded() {
        let config = AdapterConfig::new("tok")
            .unwrap()
            .with_max_in_flight(2)
            .unwrap();
        let transport = Arc::new(SlowTransport::default());
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
        let (service, handle) = DispatcherService::new(&config, transport.clone());
        let service_task = tokio::spawn(service.with_outcomes(outcome_tx).run());

        for i in 0..6 {
            handle.dispatch(batch_of(&[&format!("r{i}")])).unwrap();
        }
        drop(handle);
        service_task.await.unwrap();

        let mut delivered = 0;
        while let Ok(outcome) = outcome_rx.try_recv() {
            assert!(outcome.is_success());
            delivered += 1;
        }
        assert_eq!(delivered, 6);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 6);
        assert!(transport.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_does_not_wait_for_send() {
        let config = AdapterConfig::new("tok").unwrap();
        let transport = Arc::new(SlowTransport::default());
        let (service, handle) = DispatcherService::new(&config, transport.clone());
        let service_task = tokio::spawn(service.run());

        let start = tokio::time::Instant::now();
        for i in 0..100 {
            handle.dispatch(batch_of(&[&format!("r{i}")])).unwrap();
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        drop(handle);
        service_task.await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_in_flight_still_sends() {
        let mut config = AdapterConfig::new("tok").unwrap();
        config.max_in_flight = 0;
        let transport = Arc::new(SlowTransport::default());
        let (service, handle) = DispatcherService::new(&config, transport.clone());
        let service_task = tokio::spawn(service.run());

        handle.dispatch(batch_of(&["a"])).unwrap();
        drop(handle);

        timeout(Duration::from_secs(60), service_task)
            .await
            .expect("dispatcher should drain")
            .unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }
}
