use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, Version};
use domain::{Order, OrderStatus, SubStatus, target_status};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{OrderStore, Result, StoreError};

/// Table holding one service's projection.
///
/// Services never share a table: the order service and the kitchen keep
/// independent copies of every order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTable {
    /// Authoritative projection of the order-owning service.
    Orders,
    /// Kitchen-side projection.
    KitchenOrders,
}

impl OrderTable {
    pub fn name(&self) -> &'static str {
        match self {
            OrderTable::Orders => "orders",
            OrderTable::KitchenOrders => "kitchen_orders",
        }
    }
}

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
    table: OrderTable,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store over the given table.
    pub fn new(pool: PgPool, table: OrderTable) -> Self {
        Self { pool, table }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let order_id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
        let corrupt = |reason: String| StoreError::Corrupt { order_id, reason };

        let status: String = row.try_get("status")?;
        let status: OrderStatus = status.parse().map_err(|e| corrupt(format!("{e}")))?;

        let sub_status: Option<String> = row.try_get("sub_status")?;
        let sub_status = sub_status
            .map(|raw| raw.parse::<SubStatus>())
            .transpose()
            .map_err(|e| corrupt(format!("{e}")))?;

        let derived = sub_status
            .and_then(target_status)
            .unwrap_or(OrderStatus::Created);
        if derived != status {
            return Err(corrupt(format!(
                "status {status} does not follow from sub-status {}",
                sub_status.map(|s| s.as_str()).unwrap_or("<none>")
            )));
        }

        Ok(Order {
            id: order_id,
            status,
            sub_status,
            failure_reason: row.try_get("failure_reason")?,
            amount: row.try_get("amount")?,
            detail: row.try_get("detail")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
            version: Version::new(row.try_get("version")?),
            refund_pending: row.try_get("refund_pending")?,
        })
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create(&self, order: &Order) -> Result<()> {
        let version = if order.version == Version::initial() {
            Version::first()
        } else {
            order.version
        };

        let result = sqlx::query(&format!(
            r#"
            INSERT INTO {} (id, status, sub_status, failure_reason, amount, detail, created_at, updated_at, version, refund_pending)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO NOTHING
            "#,
            self.table.name()
        ))
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.sub_status.map(|s| s.as_str()))
        .bind(&order.failure_reason)
        .bind(order.amount)
        .bind(&order.detail)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(version.as_i64())
        .bind(order.refund_pending)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(order.id));
        }

        Ok(())
    }

    async fn find(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            r#"
            SELECT id, status, sub_status, failure_reason, amount, detail, created_at, updated_at, version, refund_pending
            FROM {}
            WHERE id = $1
            "#,
            self.table.name()
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn update(&self, order: &Order) -> Result<Version> {
        let updated: Option<i64> = sqlx::query_scalar(&format!(
            r#"
            UPDATE {}
            SET status = $2, sub_status = $3, failure_reason = $4, amount = $5, detail = $6,
                updated_at = $7, refund_pending = $9, version = version + 1
            WHERE id = $1 AND version = $8
            RETURNING version
            "#,
            self.table.name()
        ))
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.sub_status.map(|s| s.as_str()))
        .bind(&order.failure_reason)
        .bind(order.amount)
        .bind(&order.detail)
        .bind(order.updated_at)
        .bind(order.version.as_i64())
        .bind(order.refund_pending)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(version) = updated {
            return Ok(Version::new(version));
        }

        // Nothing matched: either the row is gone or someone else won the race.
        let actual: Option<i64> =
            sqlx::query_scalar(&format!("SELECT version FROM {} WHERE id = $1", self.table.name()))
                .bind(order.id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match actual {
            Some(actual) => {
                tracing::debug!(order_id = %order.id, expected = %order.version, actual, "stale order update");
                Err(StoreError::Conflict {
                    order_id: order.id,
                    expected: order.version,
                    actual: Version::new(actual),
                })
            }
            None => Err(StoreError::NotFound(order.id)),
        }
    }
}
