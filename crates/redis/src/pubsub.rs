// SPDX-License-Identifier: MIT

//! Redis-backed pub/sub (spec §4.7): `PUBLISH` on the shared command
//! connection, `SUBSCRIBE` on one dedicated connection per backend whose
//! incoming messages fan out to locally registered handlers — the same
//! `HashMap<String, Vec<Handler>>` shape as `jobs-memory::pubsub`, just
//! fed by a Redis message stream instead of direct local calls.

use crate::error::from_redis;
use futures::StreamExt;
use jobs_core::{EventHandler, LifecycleEvent, Result};
use parking_lot::Mutex;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct Subscriber {
    id: u64,
    handler: EventHandler,
}

enum Command {
    Subscribe(String),
    Unsubscribe(String),
}

pub struct RedisPubSub {
    client: redis::Client,
    channels: Mutex<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
    commands: mpsc::UnboundedSender<Command>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl RedisPubSub {
    pub async fn connect(client: redis::Client) -> Result<Arc<Self>> {
        let pubsub = client.get_async_pubsub().await.map_err(from_redis)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let this = Arc::new_cyclic(|weak: &Weak<Self>| {
            let reader = tokio::spawn(Self::drive(pubsub, rx, Weak::clone(weak)));
            Self { client, channels: Mutex::new(HashMap::new()), next_id: AtomicU64::new(0), commands: tx, reader: Mutex::new(Some(reader)) }
        });
        Ok(this)
    }

    pub fn subscribe(self: &Arc<Self>, channel: &str, handler: EventHandler) -> jobs_core::Unsubscribe {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let is_new = {
            let mut guard = self.channels.lock();
            let subs = guard.entry(channel.to_string()).or_default();
            let was_empty = subs.is_empty();
            subs.push(Subscriber { id, handler });
            was_empty
        };
        if is_new {
            let _ = self.commands.send(Command::Subscribe(channel.to_string()));
        }

        let this = Arc::clone(self);
        let channel = channel.to_string();
        Box::new(move || {
            let now_empty = {
                let mut guard = this.channels.lock();
                if let Some(subs) = guard.get_mut(&channel) {
                    subs.retain(|s| s.id != id);
                    subs.is_empty()
                } else {
                    false
                }
            };
            if now_empty {
                let _ = this.commands.send(Command::Unsubscribe(channel));
            }
        })
    }

    pub async fn publish(&self, channel: &str, event: &LifecycleEvent) -> Result<()> {
        let payload = serde_json::to_string(event).map_err(crate::error::from_json)?;
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(from_redis)?;
        let _: i64 = conn.publish(channel, payload).await.map_err(from_redis)?;
        Ok(())
    }

    async fn drive(mut pubsub: redis::aio::PubSub, mut commands: mpsc::UnboundedReceiver<Command>, this: Weak<Self>) {
        let mut messages = pubsub.on_message();
        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    match cmd {
                        Some(Command::Subscribe(channel)) => {
                            drop(messages);
                            let _ = pubsub.subscribe(&channel).await;
                            messages = pubsub.on_message();
                        }
                        Some(Command::Unsubscribe(channel)) => {
                            drop(messages);
                            let _ = pubsub.unsubscribe(&channel).await;
                            messages = pubsub.on_message();
                        }
                        None => break,
                    }
                }
                msg = messages.next() => {
                    let Some(msg) = msg else { break };
                    let Some(this) = this.upgrade() else { break };
                    let channel: String = msg.get_channel_name().to_string();
                    let Ok(payload) = msg.get_payload::<String>() else { continue };
                    let Ok(event) = serde_json::from_str::<LifecycleEvent>(&payload) else { continue };
                    let handlers: Vec<EventHandler> = this
                        .channels
                        .lock()
                        .get(&channel)
                        .map(|subs| subs.iter().map(|s| s.handler.clone()).collect())
                        .unwrap_or_default();
                    for handler in handlers {
                        (handler)(event.clone()).await;
                    }
                }
            }
        }
    }

    pub fn shutdown(&self) {
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
    }
}
