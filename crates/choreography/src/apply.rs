use chrono::Utc;
use domain::{Order, Rejection, StatusFact, Transition};
use order_store::{OrderStore, OrderStoreExt, StoreError};

use crate::{ChoreographyError, Result, RetryPolicy};

/// What applying a fact did to a projection.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The order advanced and the new state was persisted.
    Applied(Order),
    /// The order was already in the target status. Nothing was written.
    Unchanged(Order),
    /// The lifecycle forbids the move. Nothing was written.
    Rejected { order: Order, rejection: Rejection },
}

/// Applies a status fact to the stored order with optimistic concurrency.
///
/// Runs read, transition, conditional write. A lost race re-reads and
/// recomputes, up to `policy.max_attempts` times, then fails with a
/// retryable [`ChoreographyError::Conflict`].
pub async fn apply_with_retry<S>(
    store: &S,
    fact: &StatusFact,
    policy: &RetryPolicy,
) -> Result<ApplyOutcome>
where
    S: OrderStore + ?Sized,
{
    let mut attempt = 1;

    loop {
        let mut order = store.get(fact.order_id).await?;

        match order.apply(fact, Utc::now()) {
            Transition::Unchanged => return Ok(ApplyOutcome::Unchanged(order)),
            Transition::Rejected(rejection) => {
                return Ok(ApplyOutcome::Rejected { order, rejection });
            }
            Transition::Advance(_) => {}
        }

        match store.update(&order).await {
            Ok(version) => {
                order.version = version;
                return Ok(ApplyOutcome::Applied(order));
            }
            Err(StoreError::Conflict { .. }) => {
                metrics::counter!("order_update_conflicts_total").increment(1);

                if attempt >= policy.max_attempts {
                    tracing::warn!(order_id = %fact.order_id, attempt, "giving up after conflicts");
                    return Err(ChoreographyError::Conflict {
                        order_id: fact.order_id,
                        attempts: attempt,
                    });
                }

                tracing::debug!(order_id = %fact.order_id, attempt, "version conflict, re-reading");
                tokio::time::sleep(policy.delay_after(attempt)).await;
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
