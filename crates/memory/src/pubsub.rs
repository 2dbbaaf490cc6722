// SPDX-License-Identifier: MIT

//! In-process pub/sub: one handler list per channel. Publish awaits every
//! handler on a channel serially; independent channels run independently
//! (spec §4.6 "Pub/sub", §9 "In-memory pub/sub fairness").

use jobs_core::{EventHandler, LifecycleEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct Subscriber {
    id: u64,
    handler: EventHandler,
}

#[derive(Default)]
pub struct PubSub {
    channels: Mutex<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl PubSub {
    pub fn subscribe(self: &Arc<Self>, channel: &str, handler: EventHandler) -> Box<dyn FnOnce() + Send> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.channels.lock().entry(channel.to_string()).or_default().push(Subscriber { id, handler });

        let this = Arc::clone(self);
        let channel = channel.to_string();
        Box::new(move || {
            if let Some(subs) = this.channels.lock().get_mut(&channel) {
                subs.retain(|s| s.id != id);
            }
        })
    }

    pub async fn publish(&self, channel: &str, event: LifecycleEvent) {
        let handlers: Vec<EventHandler> = {
            let guard = self.channels.lock();
            guard.get(channel).map(|subs| subs.iter().map(|s| s.handler.clone()).collect()).unwrap_or_default()
        };
        for handler in handlers {
            (handler)(event.clone()).await;
        }
    }
}
