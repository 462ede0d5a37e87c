use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::Store;
use crate::error::AppError;
use crate::models::{NewUser, Task, TaskFilter, TaskUpdate, User, UserChanges};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, age, avatar, tokens, created_at, updated_at";
const TASK_COLUMNS: &str = "id, description, completed, creator, created_at, updated_at";

/// Postgres-backed store. Owns the connection pool for the life of the process.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations under `migrations/`.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn require_row(rows_affected: u64) -> Result<(), AppError> {
        if rows_affected == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, age) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.name)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.age)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_token(&self, id: Uuid, token: &str) -> Result<Option<User>, AppError> {
        let sql = format!(
            "SELECT {} FROM users WHERE id = $1 AND $2 = ANY(tokens)",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError> {
        let sql = format!(
            "UPDATE users SET name = COALESCE($2, name), email = COALESCE($3, email), \
             password_hash = COALESCE($4, password_hash), age = COALESCE($5, age), \
             updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.email)
            .bind(changes.password_hash)
            .bind(changes.age)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn push_token(&self, id: Uuid, token: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET tokens = array_append(tokens, $2) WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Self::require_row(result.rows_affected())
    }

    async fn remove_token(&self, id: Uuid, token: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET tokens = array_remove(tokens, $2) WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Self::require_row(result.rows_affected())
    }

    async fn clear_tokens(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET tokens = '{}' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Self::require_row(result.rows_affected())
    }

    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE users SET avatar = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(avatar)
                .execute(&self.pool)
                .await?;
        Self::require_row(result.rows_affected())
    }

    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("DELETE FROM users WHERE id = $1 RETURNING {}", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_task(&self, task: Task) -> Result<Task, AppError> {
        let sql = format!(
            "INSERT INTO tasks (id, description, completed, creator, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(task.id)
            .bind(task.description)
            .bind(task.completed)
            .bind(task.creator)
            .bind(task.created_at)
            .bind(task.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_tasks(&self, creator: Uuid, filter: &TaskFilter) -> Result<Vec<Task>, AppError> {
        // The creator scope is always $1; optional clauses are appended in bind order.
        let mut sql = format!("SELECT {} FROM tasks WHERE creator = $1", TASK_COLUMNS);
        let mut param_count = 2;

        if filter.completed.is_some() {
            sql.push_str(&format!(" AND completed = ${}", param_count));
            param_count += 1;
        }

        // Sort columns come from a closed enum, never from request text.
        match filter.sort {
            Some(sort) => sql.push_str(&format!(
                " ORDER BY {} {}, created_at ASC",
                sort.field.column(),
                sort.direction.keyword()
            )),
            None => sql.push_str(" ORDER BY created_at ASC"),
        }

        if filter.limit.is_some() {
            sql.push_str(&format!(" LIMIT ${}", param_count));
            param_count += 1;
        }
        if filter.skip.is_some() {
            sql.push_str(&format!(" OFFSET ${}", param_count));
        }

        let mut query = sqlx::query_as::<_, Task>(&sql).bind(creator);
        if let Some(completed) = filter.completed {
            query = query.bind(completed);
        }
        if let Some(limit) = filter.limit {
            query = query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(skip) = filter.skip {
            query = query.bind(i64::try_from(skip).unwrap_or(i64::MAX));
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn find_task(&self, id: Uuid, creator: Uuid) -> Result<Option<Task>, AppError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND creator = $2",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(creator)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_task(
        &self,
        id: Uuid,
        creator: Uuid,
        update: TaskUpdate,
    ) -> Result<Option<Task>, AppError> {
        let sql = format!(
            "UPDATE tasks SET description = COALESCE($3, description), \
             completed = COALESCE($4, completed), updated_at = NOW() \
             WHERE id = $1 AND creator = $2 RETURNING {}",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(creator)
            .bind(update.description.map(|d| d.trim().to_string()))
            .bind(update.completed)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_task(&self, id: Uuid, creator: Uuid) -> Result<Option<Task>, AppError> {
        let sql = format!(
            "DELETE FROM tasks WHERE id = $1 AND creator = $2 RETURNING {}",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(creator)
            .fetch_optional(&self.pool)
            .await?)
    }
}
