use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};

use crate::config::Config;
use crate::engine::reassignment::EvictionReason;
use crate::models::{CourierId, OrderId};
use crate::observability::metrics::Metrics;
use crate::store::{DispatchStore, InMemoryStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AssignmentEvent {
    Assigned {
        courier_id: CourierId,
        order_ids: Vec<OrderId>,
        assign_time: DateTime<Utc>,
    },
    Evicted {
        courier_id: CourierId,
        order_id: OrderId,
        reason: EvictionReason,
    },
    Completed {
        courier_id: CourierId,
        order_id: OrderId,
        cost: i64,
    },
}

pub struct AppState {
    pub store: Arc<dyn DispatchStore>,
    pub assignment_events_tx: broadcast::Sender<AssignmentEvent>,
    pub metrics: Metrics,
    // One entry per courier id ever locked. Couriers are never removed, so
    // this is bounded by the courier table.
    courier_locks: DashMap<CourierId, Arc<Mutex<()>>>,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), event_buffer_size)
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.event_buffer_size)
    }

    pub fn with_store(store: Arc<dyn DispatchStore>, event_buffer_size: usize) -> Self {
        let (assignment_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            store,
            assignment_events_tx,
            metrics: Metrics::new(),
            courier_locks: DashMap::new(),
        }
    }

    /// Serialises every operation touching one courier's assignments.
    pub async fn lock_courier(&self, courier_id: CourierId) -> OwnedMutexGuard<()> {
        let lock = self
            .courier_locks
            .entry(courier_id)
            .or_default()
            .value()
            .clone();
        lock.lock_owned().await
    }

    pub fn publish(&self, event: AssignmentEvent) {
        let _ = self.assignment_events_tx.send(event);
    }

    pub fn record_free_weight(&self, courier_id: CourierId, free_weight: f64) {
        self.metrics
            .courier_free_weight
            .with_label_values(&[&courier_id.to_string()])
            .set(free_weight);
    }
}
