use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the ledger after a successful commit.
///
/// Events are advisory notifications for downstream consumers (dashboards,
/// compliance sync, alerting); the movement table remains the system of
/// record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StockReceived {
        item_id: Uuid,
        lot_id: Option<Uuid>,
        quantity: Decimal,
        received_at: DateTime<Utc>,
    },
    StockConsumed {
        item_id: Uuid,
        quantity: Decimal,
        batch_id: Option<Uuid>,
        task_id: Option<Uuid>,
        lots: Vec<Uuid>,
    },
    StockTransferred {
        item_id: Uuid,
        quantity: Decimal,
        to_location: String,
        lots: Vec<Uuid>,
    },
    StockAdjusted {
        item_id: Uuid,
        lot_id: Option<Uuid>,
        delta: Decimal,
        reason: String,
    },
    LotDepleted {
        item_id: Uuid,
        lot_id: Uuid,
        lot_code: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates a bounded event channel pair.
pub fn event_channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, logging each event.
///
/// Callers that integrate with an external bus replace this loop with their
/// own consumer; the sender side does not care who is listening.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(%payload, "Processing inventory event"),
            Err(e) => warn!(error = %e, ?event, "Failed to serialize inventory event"),
        }
    }
}
