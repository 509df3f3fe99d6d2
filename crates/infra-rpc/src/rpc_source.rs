//! JSON-RPC DataSource
//!
//! One WebSocket connection per admin session: snapshot and mutation calls are
//! plain requests, queue events arrive on a single subscription and are fanned
//! out locally by `EventDispatcher`.

use crate::config::RpcConfig;
use crate::dispatch::EventDispatcher;
use crate::error::{load_error, mutation_error, Result, RpcSourceError};
use crate::wire::{
    check_mutation_reply, parse_snapshot, MutateParams, SnapshotParams, SubscribeParams,
    METHOD_EVENTS_SUBSCRIBE, METHOD_EVENTS_UNSUBSCRIBE, METHOD_MUTATE, METHOD_SNAPSHOT,
};
use async_trait::async_trait;
use futures::StreamExt;
use jsonrpsee::core::client::{ClientT, Subscription as RpcSubscription, SubscriptionClientT};
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use livequeue_core::domain::{LoadError, MutationError, QueueEvent};
use livequeue_core::port::{AuthContext, DataSource, EventHandler, MutationRequest, Subscription};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct RpcDataSource {
    client: WsClient,
    dispatcher: Arc<EventDispatcher>,
    pump: JoinHandle<()>,
    /// `false` once the event stream has closed; items are stale from then on
    connected: watch::Receiver<bool>,
}

impl RpcDataSource {
    /// Connect and open the event stream
    ///
    /// # Errors
    /// - RpcSourceError::InvalidEndpoint for non-WebSocket URLs
    /// - RpcSourceError::Connection when the backend is unreachable
    /// - RpcSourceError::Subscribe when the event stream is refused
    pub async fn connect(config: &RpcConfig, auth: &AuthContext) -> Result<Self> {
        if !(config.endpoint.starts_with("ws://") || config.endpoint.starts_with("wss://")) {
            return Err(RpcSourceError::InvalidEndpoint(config.endpoint.clone()));
        }

        let client = WsClientBuilder::default()
            .request_timeout(config.request_timeout)
            .connection_timeout(config.connection_timeout)
            .build(&config.endpoint)
            .await
            .map_err(|e| {
                RpcSourceError::Connection(format!(
                    "Failed to connect to {}: {}",
                    config.endpoint, e
                ))
            })?;

        let params = rpc_params![SubscribeParams {
            token: auth.token()
        }];
        let stream: RpcSubscription<QueueEvent> = client
            .subscribe(METHOD_EVENTS_SUBSCRIBE, params, METHOD_EVENTS_UNSUBSCRIBE)
            .await
            .map_err(|e| RpcSourceError::Subscribe(e.to_string()))?;

        let dispatcher = EventDispatcher::new();
        let (connected_tx, connected) = watch::channel(true);
        let pump = tokio::spawn(pump_events(stream, Arc::clone(&dispatcher), connected_tx));

        info!(endpoint = %config.endpoint, "Connected to dashboard backend");
        Ok(Self {
            client,
            dispatcher,
            pump,
            connected,
        })
    }

    /// Whether queue events are still arriving
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Watch the event stream; flips to `false` once when it closes
    pub fn connection(&self) -> watch::Receiver<bool> {
        self.connected.clone()
    }
}

async fn pump_events(
    mut stream: RpcSubscription<QueueEvent>,
    dispatcher: Arc<EventDispatcher>,
    connected: watch::Sender<bool>,
) {
    while let Some(next) = stream.next().await {
        match next {
            Ok(event) => {
                let name = event.name.clone();
                let delivered = dispatcher.dispatch(event);
                debug!(event = %name, handlers = delivered, "Event dispatched");
            }
            Err(e) => warn!(error = %e, "Dropping undecodable event notification"),
        }
    }
    warn!("Event stream closed, queues will no longer update");
    connected.send_replace(false);
}

impl Drop for RpcDataSource {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

#[async_trait]
impl DataSource for RpcDataSource {
    async fn request_snapshot(
        &self,
        queue: &str,
        auth: &AuthContext,
    ) -> std::result::Result<Vec<Value>, LoadError> {
        let params = rpc_params![SnapshotParams {
            queue,
            token: auth.token()
        }];
        let reply: Value = self
            .client
            .request(METHOD_SNAPSHOT, params)
            .await
            .map_err(load_error)?;
        parse_snapshot(reply)
    }

    fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription {
        self.dispatcher.register(event, handler)
    }

    async fn mutate(
        &self,
        request: &MutationRequest,
        auth: &AuthContext,
    ) -> std::result::Result<Value, MutationError> {
        let params = rpc_params![MutateParams::new(request, auth)];
        let reply: Value = self
            .client
            .request(METHOD_MUTATE, params)
            .await
            .map_err(mutation_error)?;
        check_mutation_reply(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_http_endpoint() {
        let config = RpcConfig::new("http://127.0.0.1:9600");
        let result = RpcDataSource::connect(&config, &AuthContext::anonymous()).await;
        assert!(matches!(result, Err(RpcSourceError::InvalidEndpoint(_))));
    }
}
