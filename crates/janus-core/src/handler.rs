//! Message handler trait + handler set.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::IndexerError;
use crate::types::{BlockMeta, Message};

/// Trait for user-provided message handlers.
///
/// Called once per unique message per epoch. Invocations arrive from many
/// epoch tasks at once and in no particular order; a handler that persists
/// must be idempotent, since a retried range replays its messages.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process one message. Any error aborts the enclosing sync window.
    async fn handle(&self, block: &BlockMeta, msg: &Message) -> Result<(), IndexerError>;

    /// Handler name used in logs and error context.
    fn name(&self) -> &str {
        "handler"
    }
}

/// An ordered set of handlers dispatched as one.
///
/// Each message is offered to every handler in registration order; the first
/// failure stops dispatch for that message.
#[derive(Clone, Default)]
pub struct HandlerSet {
    handlers: Vec<Arc<dyn MessageHandler>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler.
    pub fn add(&mut self, handler: Arc<dyn MessageHandler>) {
        self.handlers.push(handler);
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.add(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
impl MessageHandler for HandlerSet {
    async fn handle(&self, block: &BlockMeta, msg: &Message) -> Result<(), IndexerError> {
        for handler in &self.handlers {
            handler.handle(block, msg).await?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "handler-set"
    }
}
