//! Ordered collection repository
//!
//! Implements the partition reordering engine: every mutation counts the
//! partition, validates the requested position, shifts the affected siblings
//! and persists the item inside one `BEGIN IMMEDIATE` transaction.

use libsql::{params, Connection, Row, Value};

use crate::db::connection::{begin_immediate, finish};
use crate::error::{Error, Result};
use crate::models::{ItemId, OrderedItem, PartitionKey};
use crate::ordering::{self, ShiftPlan};

/// Storage operations for dense-ordered partitions
#[allow(async_fn_in_trait)]
pub trait OrderedCollectionRegistry {
    /// Insert a new item at `order`, pushing later siblings down
    async fn create(&self, partition: &PartitionKey, name: &str, order: i64)
        -> Result<OrderedItem>;

    /// Get an item by ID
    async fn get(&self, id: &ItemId) -> Result<Option<OrderedItem>>;

    /// List a partition in order
    async fn list(&self, partition: &PartitionKey) -> Result<Vec<OrderedItem>>;

    /// Number of live items in a partition
    async fn count(&self, partition: &PartitionKey) -> Result<i64>;

    /// Rename an item and move it to `order`
    async fn update(&self, id: &ItemId, name: &str, order: i64) -> Result<OrderedItem>;

    /// Move an item to `order`, keeping its name
    async fn reorder(&self, id: &ItemId, order: i64) -> Result<OrderedItem>;

    /// Remove an item and close the gap it leaves
    async fn delete(&self, id: &ItemId) -> Result<()>;

    /// Remove every item of a partition, returning how many were removed
    async fn truncate(&self, partition: &PartitionKey) -> Result<u64>;
}

/// libSQL implementation of `OrderedCollectionRegistry`
pub struct LibSqlCollectionRepository<'a> {
    conn: &'a Connection,
}

const SELECT_COLUMNS: &str =
    "SELECT id, partition_key, name, sort_order, created_at, updated_at FROM collections";

impl<'a> LibSqlCollectionRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_item(row: &Row) -> Result<OrderedItem> {
        let id: String = row.get(0)?;
        let partition: String = row.get(1)?;
        Ok(OrderedItem {
            id: id
                .parse()
                .map_err(|_| Error::Database(format!("Invalid collection ID: {id}")))?,
            partition: PartitionKey::new(partition)?,
            name: row.get(2)?,
            order: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    async fn count_in(&self, partition: &PartitionKey) -> Result<i64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM collections WHERE partition_key = ?",
                [partition.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    async fn fetch(&self, id: &ItemId) -> Result<Option<OrderedItem>> {
        let mut rows = self
            .conn
            .query(&format!("{SELECT_COLUMNS} WHERE id = ?"), [id.as_str()])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_item(&row)?)),
            None => Ok(None),
        }
    }

    /// Apply a shift plan to every sibling of `partition` except `exclude`.
    async fn shift(
        &self,
        partition: &PartitionKey,
        exclude: Option<&ItemId>,
        plan: &ShiftPlan,
        now: i64,
    ) -> Result<u64> {
        let exclude = exclude.map(ItemId::as_str).unwrap_or_default();
        let shifted = self
            .conn
            .execute(
                "UPDATE collections
                 SET sort_order = sort_order + ?1, updated_at = ?2
                 WHERE partition_key = ?3
                   AND id != ?4
                   AND sort_order >= ?5
                   AND (?6 IS NULL OR sort_order <= ?6)",
                params![
                    plan.delta,
                    now,
                    partition.as_str(),
                    exclude,
                    plan.from,
                    plan.to.map_or(Value::Null, Value::Integer)
                ],
            )
            .await?;

        tracing::debug!(
            "Shifted {} item(s) in partition '{}' by {} from position {}",
            shifted,
            partition,
            plan.delta,
            plan.from
        );
        Ok(shifted)
    }

    async fn create_locked(
        &self,
        partition: &PartitionKey,
        name: &str,
        order: i64,
    ) -> Result<OrderedItem> {
        let count = self.count_in(partition).await?;
        ordering::validate_insert(count, order)?;

        let item = OrderedItem::new(partition.clone(), name, order);
        self.shift(partition, None, &ShiftPlan::for_insert(order), item.created_at)
            .await?;

        self.conn
            .execute(
                "INSERT INTO collections (id, partition_key, name, sort_order, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    item.id.as_str(),
                    item.partition.as_str(),
                    item.name.clone(),
                    item.order,
                    item.created_at,
                    item.updated_at
                ],
            )
            .await?;

        Ok(item)
    }

    async fn update_locked(
        &self,
        id: &ItemId,
        name: Option<&str>,
        order: i64,
    ) -> Result<OrderedItem> {
        let mut item = self
            .fetch(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let count = self.count_in(&item.partition).await?;
        ordering::validate_move(count, order)?;

        let now = chrono::Utc::now().timestamp_millis();
        if let Some(plan) = ShiftPlan::for_move(item.order, order) {
            self.shift(&item.partition, Some(id), &plan, now).await?;
        }

        if let Some(name) = name {
            item.name = name.to_string();
        }
        item.order = order;
        item.updated_at = now;

        self.conn
            .execute(
                "UPDATE collections SET name = ?, sort_order = ?, updated_at = ? WHERE id = ?",
                params![item.name.clone(), item.order, item.updated_at, id.as_str()],
            )
            .await?;

        Ok(item)
    }

    async fn delete_locked(&self, id: &ItemId) -> Result<()> {
        let item = self
            .fetch(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let now = chrono::Utc::now().timestamp_millis();
        self.shift(&item.partition, Some(id), &ShiftPlan::for_delete(item.order), now)
            .await?;

        self.conn
            .execute("DELETE FROM collections WHERE id = ?", [id.as_str()])
            .await?;

        Ok(())
    }
}

impl OrderedCollectionRegistry for LibSqlCollectionRepository<'_> {
    async fn create(
        &self,
        partition: &PartitionKey,
        name: &str,
        order: i64,
    ) -> Result<OrderedItem> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Collection name cannot be empty".into()));
        }

        begin_immediate(self.conn).await?;
        let result = self.create_locked(partition, name, order).await;
        finish(self.conn, result).await
    }

    async fn get(&self, id: &ItemId) -> Result<Option<OrderedItem>> {
        self.fetch(id).await
    }

    async fn list(&self, partition: &PartitionKey) -> Result<Vec<OrderedItem>> {
        let mut rows = self
            .conn
            .query(
                &format!("{SELECT_COLUMNS} WHERE partition_key = ? ORDER BY sort_order ASC"),
                [partition.as_str()],
            )
            .await?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(Self::parse_item(&row)?);
        }
        Ok(items)
    }

    async fn count(&self, partition: &PartitionKey) -> Result<i64> {
        self.count_in(partition).await
    }

    async fn update(&self, id: &ItemId, name: &str, order: i64) -> Result<OrderedItem> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Collection name cannot be empty".into()));
        }

        begin_immediate(self.conn).await?;
        let result = self.update_locked(id, Some(name), order).await;
        finish(self.conn, result).await
    }

    async fn reorder(&self, id: &ItemId, order: i64) -> Result<OrderedItem> {
        begin_immediate(self.conn).await?;
        let result = self.update_locked(id, None, order).await;
        finish(self.conn, result).await
    }

    async fn delete(&self, id: &ItemId) -> Result<()> {
        begin_immediate(self.conn).await?;
        let result = self.delete_locked(id).await;
        finish(self.conn, result).await
    }

    async fn truncate(&self, partition: &PartitionKey) -> Result<u64> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM collections WHERE partition_key = ?",
                [partition.as_str()],
            )
            .await?;
        tracing::info!("Truncated {} item(s) from partition '{}'", removed, partition);
        Ok(removed)
    }
}
