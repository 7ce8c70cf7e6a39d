use crate::{
    core::{Listener, SmsGateway, SmsReceipt, SmsRecipient, SmsRequest, StatusChange},
    notification::gateway::GatewayError,
};
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::sync::Notify;

/// Fake SMS gateway that records every request it receives.
#[derive(Default)]
pub struct RecordingGateway {
    requests: Arc<Mutex<Vec<SmsRequest>>>,
    fail_on_send: AtomicBool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent sends fail as if no recipient accepted the message.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.fail_on_send.store(fail, Ordering::SeqCst);
    }

    /// Every request received so far, including failed ones.
    pub fn requests(&self) -> Vec<SmsRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsGateway for RecordingGateway {
    async fn send(&self, request: &SmsRequest) -> Result<SmsReceipt, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_on_send.load(Ordering::SeqCst) {
            return Err(GatewayError::Undelivered("Sent to 0/1 Total Cost: 0".to_string()));
        }
        Ok(SmsReceipt {
            summary: "Sent to 1/1".to_string(),
            recipients: vec![SmsRecipient {
                number: request.to.clone(),
                status: "Success".to_string(),
                ..Default::default()
            }],
        })
    }
}

/// Listener that records the changes it receives.
pub struct RecordingListener {
    name: String,
    received: Mutex<Vec<StatusChange>>,
    recorded: Notify,
}

impl RecordingListener {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            received: Mutex::new(Vec::new()),
            recorded: Notify::new(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    pub fn received(&self) -> Vec<StatusChange> {
        self.received.lock().unwrap().clone()
    }

    /// Waits until at least `count` changes were recorded, panicking after `timeout`.
    pub async fn wait_for_count(&self, count: usize, timeout: Duration) {
        let wait = async {
            while self.call_count() < count {
                self.recorded.notified().await;
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .expect("timed out waiting for status changes");
    }
}

#[async_trait]
impl Listener for RecordingListener {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, change: &StatusChange) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        self.received.lock().unwrap().push(change.clone());
        self.recorded.notify_one();
        Ok(())
    }
}

/// Listener that always returns an error.
pub struct FailingListener {
    name: String,
    message: String,
    calls: AtomicUsize,
}

impl FailingListener {
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Listener for FailingListener {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, _change: &StatusChange) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("{}", self.message)
    }
}

/// Listener that panics as soon as it is polled.
pub struct PanickingListener {
    name: String,
    calls: AtomicUsize,
}

impl PanickingListener {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Listener for PanickingListener {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, change: &StatusChange) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("listener crashed on report {}", change.report_id)
    }
}

/// Listener that holds each change open until released.
pub struct GatedListener {
    name: String,
    started: Notify,
    release: Notify,
}

impl GatedListener {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            started: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Resolves once `handle` has been entered.
    pub async fn started(&self) {
        self.started.notified().await;
    }

    /// Lets the pending `handle` call finish.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl Listener for GatedListener {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, _change: &StatusChange) -> anyhow::Result<()> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(())
    }
}
