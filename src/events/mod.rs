use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Domain events emitted after successful state changes. In-process only;
/// the processor task logs them and is the seam for future fan-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    OrderSplit {
        parent_order_id: Uuid,
        sub_order_ids: Vec<Uuid>,
    },
    OrderApproved {
        order_id: Uuid,
        new_pr_status: String,
    },
    OrderRejected {
        order_id: Uuid,
    },
    PurchaseOrderIssued {
        purchase_order_id: Uuid,
        order_id: Uuid,
    },
    GoodsReceiptAcknowledged {
        goods_receipt_id: Uuid,
        purchase_order_id: Uuid,
    },
    ShipmentCreated {
        shipment_id: Uuid,
        order_id: Uuid,
    },
    ShipmentFailed {
        shipment_id: Uuid,
        order_id: Uuid,
    },
    ShipmentTrackingUpdated {
        shipment_id: Uuid,
        status: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Send an event. Failures are reported, but callers treat event
    /// delivery as best-effort: a full channel never fails the business
    /// operation that produced the event.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("failed to send event: {e}"))
    }

    /// Best-effort send used from within committed transactions.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "dropping domain event");
        }
    }
}

/// Build a connected sender/receiver pair.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

/// Background loop draining the event channel.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("event processor started");
    while let Some(event) = rx.recv().await {
        debug!(?event, "domain event");
    }
    info!("event processor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_round_trip_through_the_channel() {
        let (sender, mut rx) = channel(8);
        let order_id = Uuid::new_v4();
        sender
            .send(Event::OrderRejected { order_id })
            .await
            .unwrap();
        assert_eq!(rx.recv().await, Some(Event::OrderRejected { order_id }));
    }
}
