//! Postgres store
//!
//! Runtime-checked sqlx queries over the schema in `migrations/`. Task
//! mutations lock the row with `SELECT ... FOR UPDATE`, write it, and
//! append the event inside one transaction; dropping the transaction on
//! any early return rolls both back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, Row, Transaction};

use super::{Store, StoreError};
use crate::shared::acl::{AccessControlEntry, Resource};
use crate::shared::permission::{Grantee, PermissionSet, ResourceType};
use crate::shared::task::{
    Task, TaskChange, TaskEvent, TaskEventType, TaskPriority, TaskStatus, VectorClock,
};

const TASK_COLUMNS: &str = "id, title, description, priority, status, owner_id, due_date, \
     version, vector_clock, created_at, updated_at, deleted_at";

const ACE_COLUMNS: &str = "id, resource_id, resource_type, grantee_type, grantee_id, \
     permissions, granted_by, granted_at, expires_at, metadata";

const EVENT_COLUMNS: &str =
    "id, task_id, event_type, payload, version, vector_clock, actor_id, sequence_number, created_at";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_) => StoreError::Corrupt(err.to_string()),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Apply pending migrations from `migrations/`
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {}", e)))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn append_event(
        tx: &mut Transaction<'_, Postgres>,
        mut event: TaskEvent,
    ) -> Result<TaskEvent, StoreError> {
        let sequence_number: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO task_events (id, task_id, event_type, payload, version, vector_clock, actor_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING sequence_number
            "#,
        )
        .bind(event.id)
        .bind(&event.task_id)
        .bind(event.event_type.as_str())
        .bind(Json(&event.payload))
        .bind(event.version)
        .bind(Json(&event.clock))
        .bind(&event.actor_id)
        .bind(event.created_at)
        .fetch_one(&mut **tx)
        .await?;

        event.sequence_number = sequence_number;
        Ok(event)
    }
}

fn corrupt(err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

fn task_from_row(row: &PgRow) -> Result<Task, StoreError> {
    let priority: String = row.try_get("priority")?;
    let status: String = row.try_get("status")?;
    let clock: Json<VectorClock> = row.try_get("vector_clock")?;
    Ok(Task {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        priority: TaskPriority::parse(&priority).map_err(corrupt)?,
        status: TaskStatus::parse(&status).map_err(corrupt)?,
        owner_id: row.try_get("owner_id")?,
        due_date: row.try_get("due_date")?,
        version: row.try_get("version")?,
        clock: clock.0,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn ace_from_row(row: &PgRow) -> Result<AccessControlEntry, StoreError> {
    let resource_type: String = row.try_get("resource_type")?;
    let grantee_type: String = row.try_get("grantee_type")?;
    let permissions: i16 = row.try_get("permissions")?;
    let metadata: Json<serde_json::Map<String, serde_json::Value>> = row.try_get("metadata")?;
    Ok(AccessControlEntry {
        id: row.try_get("id")?,
        resource_id: row.try_get("resource_id")?,
        resource_type: resource_type.parse().map_err(corrupt)?,
        grantee_type: grantee_type.parse().map_err(corrupt)?,
        grantee_id: row.try_get("grantee_id")?,
        permissions: PermissionSet::from_bits(i64::from(permissions)).map_err(corrupt)?,
        granted_by: row.try_get("granted_by")?,
        granted_at: row.try_get("granted_at")?,
        expires_at: row.try_get("expires_at")?,
        metadata: metadata.0,
    })
}

fn event_from_row(row: &PgRow) -> Result<TaskEvent, StoreError> {
    let event_type: String = row.try_get("event_type")?;
    let payload: Json<serde_json::Value> = row.try_get("payload")?;
    let clock: Json<VectorClock> = row.try_get("vector_clock")?;
    Ok(TaskEvent {
        id: row.try_get("id")?,
        task_id: row.try_get("task_id")?,
        event_type: TaskEventType::parse(&event_type).map_err(corrupt)?,
        payload: payload.0,
        version: row.try_get("version")?,
        clock: clock.0,
        actor_id: row.try_get("actor_id")?,
        sequence_number: row.try_get("sequence_number")?,
        created_at: row.try_get("created_at")?,
    })
}

fn collect<T>(rows: Vec<PgRow>, decode: fn(&PgRow) -> Result<T, StoreError>) -> Result<Vec<T>, StoreError> {
    rows.iter().map(decode).collect()
}

#[async_trait]
impl Store for PgStore {
    async fn is_owner(&self, user_id: &str, resource: &Resource) -> Result<bool, StoreError> {
        let sql = match resource.resource_type {
            ResourceType::Task => {
                "SELECT EXISTS (SELECT 1 FROM tasks WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL)"
            }
            ResourceType::FarmArea => {
                "SELECT EXISTS (SELECT 1 FROM farm_areas WHERE id = $1 AND owner_id = $2)"
            }
            ResourceType::Team => {
                "SELECT EXISTS (SELECT 1 FROM team_members WHERE team_id = $1 AND user_id = $2 AND role = 'Admin')"
            }
            ResourceType::Document => {
                "SELECT EXISTS (SELECT 1 FROM documents WHERE id = $1 AND owner_id = $2)"
            }
        };
        let owned: bool = sqlx::query_scalar(sql)
            .bind(&resource.resource_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(owned)
    }

    async fn teams_of(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let teams: Vec<String> =
            sqlx::query_scalar("SELECT team_id FROM team_members WHERE user_id = $1 ORDER BY team_id")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(teams)
    }

    async fn upsert_ace(&self, ace: AccessControlEntry) -> Result<AccessControlEntry, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO acls (id, resource_id, resource_type, grantee_type, grantee_id,
                              permissions, granted_by, granted_at, expires_at, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (resource_id, resource_type, grantee_type, (COALESCE(grantee_id, '')))
            DO UPDATE SET
                permissions = EXCLUDED.permissions,
                granted_by = EXCLUDED.granted_by,
                granted_at = EXCLUDED.granted_at,
                expires_at = EXCLUDED.expires_at,
                metadata = EXCLUDED.metadata
            RETURNING {}
            "#,
            ACE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(ace.id)
            .bind(&ace.resource_id)
            .bind(ace.resource_type.as_str())
            .bind(ace.grantee_type.as_str())
            .bind(&ace.grantee_id)
            .bind(i16::from(ace.permissions.bits()))
            .bind(&ace.granted_by)
            .bind(ace.granted_at)
            .bind(ace.expires_at)
            .bind(Json(&ace.metadata))
            .fetch_one(&self.pool)
            .await?;
        ace_from_row(&row)
    }

    async fn delete_ace(&self, resource: &Resource, grantee: &Grantee) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM acls
            WHERE resource_id = $1 AND resource_type = $2 AND grantee_type = $3
              AND grantee_id IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(&resource.resource_id)
        .bind(resource.resource_type.as_str())
        .bind(grantee.grantee_type().as_str())
        .bind(grantee.id())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_aces(
        &self,
        resource: &Resource,
        now: DateTime<Utc>,
    ) -> Result<Vec<AccessControlEntry>, StoreError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM acls
            WHERE resource_id = $1 AND resource_type = $2
              AND (expires_at IS NULL OR expires_at > $3)
            ORDER BY granted_at DESC
            "#,
            ACE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(&resource.resource_id)
            .bind(resource.resource_type.as_str())
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        collect(rows, ace_from_row)
    }

    async fn aces_for_principal(
        &self,
        user_id: &str,
        teams: &[String],
        resource_type: Option<ResourceType>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AccessControlEntry>, StoreError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM acls
            WHERE (expires_at IS NULL OR expires_at > $1)
              AND ($2::text IS NULL OR resource_type = $2)
              AND (
                    (grantee_type = 'USER' AND grantee_id = $3)
                 OR (grantee_type = 'TEAM' AND grantee_id = ANY($4))
                 OR grantee_type = 'PUBLIC'
              )
            ORDER BY granted_at DESC
            "#,
            ACE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(now)
            .bind(resource_type.map(ResourceType::as_str))
            .bind(user_id)
            .bind(teams)
            .fetch_all(&self.pool)
            .await?;
        collect(rows, ace_from_row)
    }

    async fn aces_granted_by(
        &self,
        user_id: &str,
        resource_type: Option<ResourceType>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AccessControlEntry>, StoreError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM acls
            WHERE granted_by = $1
              AND (expires_at IS NULL OR expires_at > $2)
              AND ($3::text IS NULL OR resource_type = $3)
            ORDER BY granted_at DESC
            "#,
            ACE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(now)
            .bind(resource_type.map(ResourceType::as_str))
            .fetch_all(&self.pool)
            .await?;
        collect(rows, ace_from_row)
    }

    async fn insert_task(&self, task: &Task, event: TaskEvent) -> Result<TaskEvent, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO tasks (id, title, description, priority, status, owner_id, due_date,
                               version, vector_clock, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(&task.owner_id)
        .bind(task.due_date)
        .bind(task.version)
        .bind(Json(&task.clock))
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(task.deleted_at)
        .execute(&mut *tx)
        .await?;

        let event = Self::append_event(&mut tx, event).await?;
        tx.commit().await?;
        Ok(event)
    }

    async fn apply_change(
        &self,
        task_id: &str,
        actor_id: &str,
        change: &TaskChange,
        now: DateTime<Utc>,
    ) -> Result<Option<(Task, TaskEvent)>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            TASK_COLUMNS
        );
        let Some(row) = sqlx::query(&sql)
            .bind(task_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let mut task = task_from_row(&row)?;
        if matches!(change, TaskChange::Delete) && task.owner_id != actor_id {
            return Ok(None);
        }

        let event = task.apply_change(actor_id, change, now).map_err(corrupt)?;
        sqlx::query(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, priority = $4, status = $5, due_date = $6,
                version = $7, vector_clock = $8, updated_at = $9, deleted_at = $10
            WHERE id = $1
            "#,
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(task.due_date)
        .bind(task.version)
        .bind(Json(&task.clock))
        .bind(task.updated_at)
        .bind(task.deleted_at)
        .execute(&mut *tx)
        .await?;

        let event = Self::append_event(&mut tx, event).await?;
        tx.commit().await?;
        Ok(Some((task, event)))
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(task_from_row).transpose()
    }

    async fn list_tasks(&self, owner_id: &str) -> Result<Vec<Task>, StoreError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE owner_id = $1 AND deleted_at IS NULL ORDER BY created_at DESC, id",
            TASK_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        collect(rows, task_from_row)
    }

    async fn changes_since(&self, owner_id: &str, min_version: i64) -> Result<Vec<Task>, StoreError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE owner_id = $1 AND version > $2 ORDER BY version ASC, id",
            TASK_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .bind(min_version)
            .fetch_all(&self.pool)
            .await?;
        collect(rows, task_from_row)
    }

    async fn task_events(&self, task_id: &str) -> Result<Vec<TaskEvent>, StoreError> {
        let sql = format!(
            "SELECT {} FROM task_events WHERE task_id = $1 ORDER BY sequence_number ASC",
            EVENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(task_id)
            .fetch_all(&self.pool)
            .await?;
        collect(rows, event_from_row)
    }
}
