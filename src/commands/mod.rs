use crate::{db::DbPool, errors::ServiceError, events::EventSender};
use async_trait::async_trait;
use std::sync::Arc;

/// Command pattern: each mutating business operation is a self-contained
/// object that validates itself, executes inside a transaction, and emits
/// events on success.
#[async_trait]
pub trait Command: Send + Sync {
    type Result;

    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}

pub mod orders;
pub mod receipts;
