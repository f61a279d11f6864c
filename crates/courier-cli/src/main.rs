use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, sleep, timeout};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use courier_core::catalog::Reactable::{Comment, Post};
use courier_core::impls::InMemoryAuditStore;
use courier_core::{
    DispatcherBuilder, DispatcherConfig, Event, Handler, HandlerError, catalog, handler_fn,
};

/// 投票ごとに署名者の reputation を数える
#[derive(Default)]
struct Reputation {
    scores: Mutex<HashMap<String, i64>>,
}

#[async_trait]
impl Handler for Reputation {
    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        let signer = event
            .signer()
            .ok_or_else(|| HandlerError::failed("vote without signer"))?;
        let delta = match event.param("type").and_then(|v| v.as_str()) {
            Some("up") => 1,
            Some("down") => -1,
            other => return Err(HandlerError::failed(format!("unknown vote type {other:?}"))),
        };
        let delta = if event.param("removed") == Some(&serde_json::Value::Bool(true)) {
            -delta
        } else {
            delta
        };

        let mut scores = self
            .scores
            .lock()
            .map_err(|_| HandlerError::failed("reputation table poisoned"))?;
        *scores.entry(signer.actor_id.to_string()).or_default() += delta;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::from_default_env()
        .add_directive("courier=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // (A) 監査ストアと handler を用意
    let config = DispatcherConfig::from_env()?;
    info!(
        publish_capacity = config.publish_capacity,
        register_capacity = config.register_capacity,
        "config loaded"
    );
    let store = InMemoryAuditStore::new();
    let reputation = Arc::new(Reputation::default());

    // (B) 起動時のワイヤリング
    let (dispatcher, _dispatch_loop) = DispatcherBuilder::new()
        .config(config)
        .on(
            catalog::FLAG_RAISED,
            handler_fn(|event: Event| async move {
                info!(flag = ?event.param("id"), "flag queued for moderation");
                Ok(())
            }),
        )
        .on(
            catalog::ORDER_STATUS_CHANGED,
            handler_fn(|event: Event| async move {
                match catalog::order_transition(&event) {
                    Some((_, to)) if to == "refunded" => {
                        Err(HandlerError::failed("refund notifications are not configured"))
                    }
                    Some((from, to)) => {
                        info!(%from, %to, "order customer notified");
                        Ok(())
                    }
                    None => Err(HandlerError::failed("order event without transition")),
                }
            }),
        )
        .spawn(store.clone())?;

    // 後からの登録も同じ loop を通る
    dispatcher
        .register_shared(catalog::VOTE_CAST, reputation.clone())
        .await;

    // (C) イベント投入
    let events = vec![
        catalog::vote_cast("user-1", "v-1", Post, "p-1", "up", false),
        catalog::vote_cast("user-1", "v-2", Comment, "c-1", "up", false),
        catalog::vote_cast("user-2", "v-3", Post, "p-1", "down", false),
        catalog::flag_raised("f-1"),
        catalog::comment_created("user-2", "c-2", "p-1"),
        catalog::order_status_changed("o-1", "awaiting", "confirmed"),
        catalog::order_status_changed("o-2", "confirmed", "refunded"),
    ];
    let total = events.len();
    for event in events {
        dispatcher.publish(event).await;
    }

    // (D) 全ての監査レコードが finalize されるのをポーリングで待つ
    let waited = timeout(Duration::from_secs(5), async {
        while store.finished_count() < total {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    if waited.is_err() {
        warn!(
            finished = store.finished_count(),
            total,
            "timed out waiting for audit records"
        );
    }

    println!("{}", serde_json::to_string_pretty(&store.records())?);
    if let Ok(scores) = reputation.scores.lock() {
        println!("reputation: {:?}", *scores);
    }
    Ok(())
}
