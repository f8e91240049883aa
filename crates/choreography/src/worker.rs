//! Consumer workers draining a subscription into a handler.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use messaging::{EventBus, Message, Redelivery, Subscription};
use order_store::OrderStore;
use tokio::sync::Semaphore;

use crate::{ChoreographyError, KitchenService, OrderService};

/// Something that processes one delivered message.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(&self, message: &Message) -> Result<(), ChoreographyError>;
}

#[async_trait]
impl<S, B> MessageHandler for OrderService<S, B>
where
    S: OrderStore + 'static,
    B: EventBus + 'static,
{
    async fn handle(&self, message: &Message) -> Result<(), ChoreographyError> {
        self.consume(&message.payload).await.map(|_| ())
    }
}

#[async_trait]
impl<S, B> MessageHandler for KitchenService<S, B>
where
    S: OrderStore + 'static,
    B: EventBus + 'static,
{
    async fn handle(&self, message: &Message) -> Result<(), ChoreographyError> {
        self.seed_from_event(&message.payload).await.map(|_| ())
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Messages processed concurrently.
    pub workers: usize,
    /// Redeliveries allowed for a message failing with a retryable error.
    pub max_redeliveries: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_redeliveries: 5,
        }
    }
}

/// Runs a bounded pool of workers over a subscription until `shutdown`
/// resolves or the subscription ends, then waits for in-flight messages.
///
/// Messages failing with a retryable error are redelivered with an
/// incremented attempt count until `max_redeliveries` is exhausted.
pub async fn run_consumer<H, F>(
    mut subscription: Subscription,
    handler: Arc<H>,
    config: WorkerConfig,
    shutdown: F,
) where
    H: MessageHandler,
    F: Future<Output = ()>,
{
    // Shutdown reclaims every permit in one `acquire_many`, which takes a u32.
    let workers = u32::try_from(config.workers.max(1)).unwrap_or(u32::MAX);
    let semaphore = Arc::new(Semaphore::new(workers as usize));
    let redelivery = subscription.redelivery();
    let topic = subscription.topic().to_string();
    tokio::pin!(shutdown);

    tracing::info!(%topic, workers, "consumer started");

    loop {
        let message = tokio::select! {
            _ = &mut shutdown => break,
            next = subscription.next() => match next {
                Some(message) => message,
                None => break,
            },
        };

        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let handler = handler.clone();
        let redelivery = redelivery.clone();

        tokio::spawn(async move {
            process(handler.as_ref(), &redelivery, message, config.max_redeliveries).await;
            drop(permit);
        });
    }

    let _ = semaphore.acquire_many(workers).await;
    tracing::info!(%topic, "consumer stopped");
}

async fn process<H: MessageHandler>(
    handler: &H,
    redelivery: &Redelivery,
    message: Message,
    max_redeliveries: u32,
) {
    let attempt = message.delivery_attempt;

    match handler.handle(&message).await {
        Ok(()) => {}
        Err(e) if e.is_retryable() && attempt <= max_redeliveries => {
            tracing::warn!(key = %message.key, attempt, error = %e, "redelivering message");
            if let Err(e) = redelivery.redeliver(message) {
                tracing::error!(error = %e, "redelivery failed");
            }
        }
        Err(e) => {
            tracing::error!(key = %message.key, attempt, error = %e, "dropping message");
        }
    }
}
