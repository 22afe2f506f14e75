//! PostgreSQL store.

use super::{GeoStore, GeoTx};
use crate::models::{GeoNode, GeoNodeRow, NodeKind, NodeMovement, NodeMovementRow, Structure};
use crate::services::error::GeoError;
use crate::services::metrics::DB_QUERY_DURATION;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const NODE_COLUMNS: &str = "id, kind, structure, name, code, label, path, level, sort_order, \
     parent_kind, parent_id, created_utc, updated_utc";

fn to_node(row: GeoNodeRow) -> Result<GeoNode, GeoError> {
    GeoNode::try_from(row).map_err(|e| GeoError::Internal(anyhow::anyhow!(e)))
}

fn to_nodes(rows: Vec<GeoNodeRow>) -> Result<Vec<GeoNode>, GeoError> {
    rows.into_iter().map(to_node).collect()
}

fn write_error(context: &str, node: &GeoNode, err: sqlx::Error) -> GeoError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            GeoError::Conflict(format!(
                "{} '{}' already exists under this parent",
                node.kind, node.name
            ))
        }
        _ => GeoError::database(context, err),
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "geo-service"))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, GeoError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| GeoError::database("Failed to connect", e))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), GeoError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| GeoError::database("Migration failed", e))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl GeoStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> Result<Box<dyn GeoTx>, GeoError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| GeoError::database("Failed to begin transaction", e))?;
        Ok(Box::new(PgTx { tx }))
    }

    #[instrument(skip(self))]
    async fn load_all(&self) -> Result<Vec<GeoNode>, GeoError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["load_all"])
            .start_timer();

        let rows = sqlx::query_as::<_, GeoNodeRow>(&format!(
            "SELECT {} FROM geo_nodes",
            NODE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GeoError::database("Failed to load geo nodes", e))?;

        timer.observe_duration();
        to_nodes(rows)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), GeoError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| GeoError::database("Health check failed", e))?;
        Ok(())
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl GeoTx for PgTx {
    #[instrument(skip(self))]
    async fn lock_structure(&mut self, structure: Structure) -> Result<(), GeoError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(structure.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| GeoError::database("Failed to lock structure", e))?;
        Ok(())
    }

    async fn find_by_id(&mut self, kind: NodeKind, id: Uuid) -> Result<Option<GeoNode>, GeoError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_by_id"])
            .start_timer();

        let row = sqlx::query_as::<_, GeoNodeRow>(&format!(
            "SELECT {} FROM geo_nodes WHERE id = $1 AND kind = $2",
            NODE_COLUMNS
        ))
        .bind(id)
        .bind(kind.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| GeoError::database("Failed to get node", e))?;

        timer.observe_duration();
        row.map(to_node).transpose()
    }

    async fn find_by_key(
        &mut self,
        kind: NodeKind,
        parent_id: Uuid,
        name: &str,
    ) -> Result<Option<GeoNode>, GeoError> {
        let row = sqlx::query_as::<_, GeoNodeRow>(&format!(
            "SELECT {} FROM geo_nodes WHERE kind = $1 AND parent_id = $2 AND name = $3",
            NODE_COLUMNS
        ))
        .bind(kind.as_str())
        .bind(parent_id)
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| GeoError::database("Failed to get node by name", e))?;

        row.map(to_node).transpose()
    }

    async fn find_region(&mut self, structure: Structure) -> Result<Option<GeoNode>, GeoError> {
        let row = sqlx::query_as::<_, GeoNodeRow>(&format!(
            "SELECT {} FROM geo_nodes WHERE structure = $1 AND parent_id IS NULL",
            NODE_COLUMNS
        ))
        .bind(structure.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| GeoError::database("Failed to get geo region", e))?;

        row.map(to_node).transpose()
    }

    async fn children(&mut self, parent_id: Uuid) -> Result<Vec<GeoNode>, GeoError> {
        let rows = sqlx::query_as::<_, GeoNodeRow>(&format!(
            "SELECT {} FROM geo_nodes WHERE parent_id = $1 ORDER BY sort_order, name",
            NODE_COLUMNS
        ))
        .bind(parent_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| GeoError::database("Failed to list children", e))?;

        to_nodes(rows)
    }

    async fn count_children(&mut self, parent_id: Uuid) -> Result<u64, GeoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM geo_nodes WHERE parent_id = $1")
            .bind(parent_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| GeoError::database("Failed to count children", e))?;
        Ok(count as u64)
    }

    #[instrument(skip(self, node), fields(node_id = %node.id, kind = %node.kind))]
    async fn insert(&mut self, node: &GeoNode) -> Result<(), GeoError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_node"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO geo_nodes (id, kind, structure, name, code, label, path, level, sort_order,
                                   parent_kind, parent_id, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(node.id)
        .bind(node.kind.as_str())
        .bind(node.structure.as_str())
        .bind(&node.name)
        .bind(&node.code)
        .bind(&node.label)
        .bind(&node.path)
        .bind(node.level)
        .bind(node.order)
        .bind(node.parent.map(|p| p.kind.as_str()))
        .bind(node.parent_id())
        .bind(node.created_utc)
        .bind(node.updated_utc)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error("Failed to insert node", node, e))?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self, node), fields(node_id = %node.id, kind = %node.kind))]
    async fn update(&mut self, node: &GeoNode) -> Result<(), GeoError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_node"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE geo_nodes
            SET name = $2, code = $3, path = $4, level = $5, sort_order = $6, structure = $7,
                parent_kind = $8, parent_id = $9, updated_utc = now()
            WHERE id = $1
            "#,
        )
        .bind(node.id)
        .bind(&node.name)
        .bind(&node.code)
        .bind(&node.path)
        .bind(node.level)
        .bind(node.order)
        .bind(node.structure.as_str())
        .bind(node.parent.map(|p| p.kind.as_str()))
        .bind(node.parent_id())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error("Failed to update node", node, e))?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Err(GeoError::NotFound {
                entity: "Node",
                id: node.id,
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn rewrite_descendants(
        &mut self,
        old_path: &str,
        new_path: &str,
        level_delta: i32,
    ) -> Result<u64, GeoError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["rewrite_descendants"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE geo_nodes
            SET path = $2 || substring(path FROM char_length($1) + 1),
                level = level + $3,
                updated_utc = now()
            WHERE starts_with(path, $1 || '/')
            "#,
        )
        .bind(old_path)
        .bind(new_path)
        .bind(level_delta)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| GeoError::database("Failed to rewrite descendant paths", e))?;

        timer.observe_duration();
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_subtree(&mut self, id: Uuid, path: &str) -> Result<u64, GeoError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_subtree"])
            .start_timer();

        let result = sqlx::query("DELETE FROM geo_nodes WHERE id = $1 OR starts_with(path, $2 || '/')")
            .bind(id)
            .bind(path)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| GeoError::database("Failed to delete subtree", e))?;

        timer.observe_duration();
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete(&mut self, id: Uuid) -> Result<bool, GeoError> {
        let result = sqlx::query("DELETE FROM geo_nodes WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| GeoError::database("Failed to delete node", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, movement), fields(node_id = %movement.node_id))]
    async fn record_movement(&mut self, movement: &NodeMovement) -> Result<(), GeoError> {
        sqlx::query(
            r#"
            INSERT INTO node_movements (id, node_id, node_kind, old_parent_id, new_parent_id,
                                        moved_by, old_path, new_path, moved_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(movement.id)
        .bind(movement.node_id)
        .bind(movement.node_kind.as_str())
        .bind(movement.old_parent_id)
        .bind(movement.new_parent_id)
        .bind(&movement.moved_by)
        .bind(&movement.old_path)
        .bind(&movement.new_path)
        .bind(movement.moved_utc)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| GeoError::database("Failed to record node movement", e))?;
        Ok(())
    }

    async fn movements_for(&mut self, node_id: Uuid) -> Result<Vec<NodeMovement>, GeoError> {
        let rows = sqlx::query_as::<_, NodeMovementRow>(
            r#"
            SELECT id, node_id, node_kind, old_parent_id, new_parent_id, moved_by,
                   old_path, new_path, moved_utc
            FROM node_movements
            WHERE node_id = $1
            ORDER BY moved_utc DESC
            "#,
        )
        .bind(node_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| GeoError::database("Failed to list node movements", e))?;

        rows.into_iter()
            .map(|row| NodeMovement::try_from(row).map_err(|e| GeoError::Internal(anyhow::anyhow!(e))))
            .collect()
    }

    async fn commit(self: Box<Self>) -> Result<(), GeoError> {
        self.tx
            .commit()
            .await
            .map_err(|e| GeoError::database("Failed to commit transaction", e))
    }
}
