use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BusinessId, Money, OrderId, OrderItemId, UnitId, UserId};
use domain::{Order, OrderItem, OrderStatus, Version};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Result, StoreError,
    store::OrderStore,
};

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let status_str: String = row.try_get("status")?;
        let status = OrderStatus::from_stored(&status_str)
            .map_err(|_| StoreError::InvalidRow(format!("unknown status '{status_str}'")))?;

        Ok(Order::from_parts(
            OrderId::new(row.try_get("id")?),
            UserId::new(row.try_get("user_id")?),
            BusinessId::new(row.try_get("business_id")?),
            status,
            row.try_get::<DateTime<Utc>, _>("created_at")?,
            Version::new(row.try_get("version")?),
            items,
        ))
    }

    /// Converts a quantity to the `INTEGER` column type. The aggregate caps
    /// quantities at `i32::MAX`, so a failure here means a corrupted order.
    fn column_quantity(quantity: u32) -> Result<i32> {
        i32::try_from(quantity)
            .map_err(|_| StoreError::InvalidRow(format!("quantity {quantity} out of column range")))
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItem> {
        let quantity: i32 = row.try_get("quantity")?;
        Ok(OrderItem {
            id: Some(OrderItemId::new(row.try_get("id")?)),
            unit_id: UnitId::new(row.try_get("unit_id")?),
            quantity: u32::try_from(quantity)
                .map_err(|_| StoreError::InvalidRow(format!("negative quantity {quantity}")))?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }

    async fn items_for_orders(&self, order_ids: &[i64]) -> Result<HashMap<i64, Vec<OrderItem>>> {
        let rows = sqlx::query(
            "SELECT id, order_id, unit_id, quantity, unit_price_cents
             FROM order_items WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in &rows {
            let order_id: i64 = row.try_get("order_id")?;
            by_order
                .entry(order_id)
                .or_default()
                .push(Self::row_to_item(row)?);
        }
        Ok(by_order)
    }

    async fn orders_from_rows(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let ids: Vec<i64> = rows
            .iter()
            .map(|row| row.try_get("id"))
            .collect::<std::result::Result<_, _>>()?;
        let mut items = self.items_for_orders(&ids).await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id")?;
            orders.push(Self::row_to_order(row, items.remove(&id).unwrap_or_default())?);
        }
        Ok(orders)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order))]
    async fn insert(&self, order: Order) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO orders (user_id, business_id, status, total_cents, created_at, version)
             VALUES ($1, $2, $3, $4, $5, 1)
             RETURNING id",
        )
        .bind(order.user_id().as_i64())
        .bind(order.business_id().as_i64())
        .bind(order.status().as_str())
        .bind(order.total().cents())
        .bind(order.created_at())
        .fetch_one(&mut *tx)
        .await?;
        let order_id: i64 = row.try_get("id")?;

        let mut items = Vec::with_capacity(order.items().len());
        for item in order.items() {
            let item_row = sqlx::query(
                "INSERT INTO order_items (order_id, unit_id, quantity, unit_price_cents)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id",
            )
            .bind(order_id)
            .bind(item.unit_id.as_i64())
            .bind(Self::column_quantity(item.quantity)?)
            .bind(item.unit_price.cents())
            .fetch_one(&mut *tx)
            .await?;

            let mut item = item.clone();
            item.id = Some(OrderItemId::new(item_row.try_get("id")?));
            items.push(item);
        }

        tx.commit().await?;
        metrics::counter!("orders_inserted_total").increment(1);

        Ok(Order::from_parts(
            OrderId::new(order_id),
            order.user_id(),
            order.business_id(),
            order.status(),
            order.created_at(),
            Version::new(1),
            items,
        ))
    }

    #[tracing::instrument(skip(self, order))]
    async fn update(&self, order: &Order) -> Result<Order> {
        let id = order.id().ok_or(StoreError::MissingId)?;
        let mut tx = self.pool.begin().await?;

        // Compare-and-swap on the stored version.
        let updated = sqlx::query(
            "UPDATE orders SET status = $2, total_cents = $3, version = version + 1
             WHERE id = $1 AND version = $4
             RETURNING version",
        )
        .bind(id.as_i64())
        .bind(order.status().as_str())
        .bind(order.total().cents())
        .bind(order.version().as_i64())
        .fetch_optional(&mut *tx)
        .await?;

        let new_version = match updated {
            Some(row) => Version::new(row.try_get("version")?),
            None => {
                let actual: Option<i64> =
                    sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                        .bind(id.as_i64())
                        .fetch_optional(&mut *tx)
                        .await?;
                return match actual {
                    Some(actual) => Err(StoreError::VersionConflict {
                        order_id: id,
                        expected: order.version(),
                        actual: Version::new(actual),
                    }),
                    None => Err(StoreError::OrderNotFound(id)),
                };
            }
        };

        // Reconcile the item set: delete rows dropped from the order,
        // update survivors, insert newcomers.
        let kept: Vec<i64> = order
            .items()
            .iter()
            .filter_map(|i| i.id.map(OrderItemId::into))
            .collect();
        sqlx::query("DELETE FROM order_items WHERE order_id = $1 AND NOT (id = ANY($2))")
            .bind(id.as_i64())
            .bind(&kept)
            .execute(&mut *tx)
            .await?;

        let mut items = Vec::with_capacity(order.items().len());
        for item in order.items() {
            match item.id {
                Some(item_id) => {
                    sqlx::query(
                        "UPDATE order_items SET quantity = $2, unit_price_cents = $3
                         WHERE id = $1",
                    )
                    .bind(item_id.as_i64())
                    .bind(Self::column_quantity(item.quantity)?)
                    .bind(item.unit_price.cents())
                    .execute(&mut *tx)
                    .await?;
                    items.push(item.clone());
                }
                None => {
                    let item_row = sqlx::query(
                        "INSERT INTO order_items (order_id, unit_id, quantity, unit_price_cents)
                         VALUES ($1, $2, $3, $4)
                         RETURNING id",
                    )
                    .bind(id.as_i64())
                    .bind(item.unit_id.as_i64())
                    .bind(Self::column_quantity(item.quantity)?)
                    .bind(item.unit_price.cents())
                    .fetch_one(&mut *tx)
                    .await?;

                    let mut item = item.clone();
                    item.id = Some(OrderItemId::new(item_row.try_get("id")?));
                    items.push(item);
                }
            }
        }

        tx.commit().await?;

        Ok(Order::from_parts(
            id,
            order.user_id(),
            order.business_id(),
            order.status(),
            order.created_at(),
            new_version,
            items,
        ))
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            "SELECT id, user_id, business_id, status, total_cents, created_at, version
             FROM orders WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut items = self.items_for_orders(&[id.as_i64()]).await?;
        Ok(Some(Self::row_to_order(
            &row,
            items.remove(&id.as_i64()).unwrap_or_default(),
        )?))
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT id, user_id, business_id, status, total_cents, created_at, version
             FROM orders ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        self.orders_from_rows(rows).await
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT id, user_id, business_id, status, total_cents, created_at, version
             FROM orders WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        self.orders_from_rows(rows).await
    }

    async fn list_by_business(&self, business_id: BusinessId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT id, user_id, business_id, status, total_cents, created_at, version
             FROM orders WHERE business_id = $1 ORDER BY id",
        )
        .bind(business_id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        self.orders_from_rows(rows).await
    }
}
