//! Persistence seam.
//!
//! Handlers never talk to a database directly; they receive a `web::Data<dyn Store>`
//! built once at startup. [`PgStore`] is the production implementation and
//! [`MemoryStore`] backs the test-suite and local runs without Postgres.
//!
//! Every task operation takes the owner's id: there is no way to reach a task
//! without naming its creator, so "absent" and "owned by someone else" are the
//! same `None` to callers.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewUser, Task, TaskFilter, TaskUpdate, User, UserChanges};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Round-trips to the backing store. Used by the health check.
    async fn ping(&self) -> Result<(), AppError>;

    /// Persists a new user. Fails with `BadRequest` if the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Returns the user only if `token` is currently in its session list.
    async fn find_user_by_token(&self, id: Uuid, token: &str) -> Result<Option<User>, AppError>;

    /// Applies profile changes. Fails with `BadRequest` if the new email is taken.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError>;

    /// Appends a session token to the end of the user's list.
    async fn push_token(&self, id: Uuid, token: &str) -> Result<(), AppError>;

    /// Removes one session token.
    async fn remove_token(&self, id: Uuid, token: &str) -> Result<(), AppError>;

    /// Empties the user's session list.
    async fn clear_tokens(&self, id: Uuid) -> Result<(), AppError>;

    /// Replaces (or with `None`, clears) the stored avatar.
    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> Result<(), AppError>;

    /// Removes the user record, returning it if it existed. Owned tasks are left in place.
    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn insert_task(&self, task: Task) -> Result<Task, AppError>;

    async fn list_tasks(&self, creator: Uuid, filter: &TaskFilter) -> Result<Vec<Task>, AppError>;

    async fn find_task(&self, id: Uuid, creator: Uuid) -> Result<Option<Task>, AppError>;

    async fn update_task(
        &self,
        id: Uuid,
        creator: Uuid,
        update: TaskUpdate,
    ) -> Result<Option<Task>, AppError>;

    async fn delete_task(&self, id: Uuid, creator: Uuid) -> Result<Option<Task>, AppError>;
}
