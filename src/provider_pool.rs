//! Caches worker RPC channels keyed by endpoint (spec §4.6).
//!
//! A client's lifetime is the pool's lifetime — workers sit behind
//! stable in-cluster DNS names, so there is no eviction and no
//! negative caching: a failed dial is not remembered, and the next
//! `get` for that endpoint tries again.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tonic::transport::{Channel, Endpoint};

use crate::config::DriverConfig;
use crate::error::DriverResult;
use crate::service::WorkerClient;

pub struct ProviderPool {
    config: DriverConfig,
    providers: Mutex<HashMap<String, WorkerClient<Channel>>>,
}

impl ProviderPool {
    pub fn new(config: DriverConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            providers: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the cached client for `endpoint`, dialing and caching a
    /// new one if absent.
    pub async fn get(&self, endpoint: &str) -> DriverResult<WorkerClient<Channel>> {
        let mut providers = self.providers.lock().await;
        if let Some(client) = providers.get(endpoint) {
            return Ok(client.clone());
        }
        let channel = self.dial(endpoint).await?;
        let client = WorkerClient::new(channel);
        providers.insert(endpoint.to_string(), client.clone());
        Ok(client)
    }

    /// Insecure transport, keepalive permitted without an active
    /// stream, per spec §3/§4.6.
    async fn dial(&self, endpoint: &str) -> DriverResult<Channel> {
        let uri = format!("http://{endpoint}");
        let channel = Endpoint::from_shared(uri)?
            .keep_alive_while_idle(true)
            .http2_keep_alive_interval(self.config.keepalive_interval)
            .keep_alive_timeout(self.config.keepalive_timeout)
            .connect()
            .await?;
        Ok(channel)
    }
}
