use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::error::AppError;
use crate::models::{
    NewUser, SortDirection, Task, TaskFilter, TaskSortField, TaskUpdate, User, UserChanges,
};

/// In-process store. Tasks are kept in insertion order, which is the default
/// listing order.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    tasks: Vec<Task>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl State {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|user| user.email == email && Some(user.id) != except)
    }

    fn user_mut(&mut self, id: Uuid) -> Result<&mut User, AppError> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }
}

fn email_taken() -> AppError {
    AppError::BadRequest("Email is already registered".into())
}

fn compare(a: &Task, b: &Task, field: TaskSortField) -> Ordering {
    match field {
        TaskSortField::Description => a.description.cmp(&b.description),
        TaskSortField::Completed => a.completed.cmp(&b.completed),
        TaskSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        TaskSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut state = self.state.write().await;
        if state.email_taken(&new_user.email, None) {
            return Err(email_taken());
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            age: new_user.age,
            avatar: None,
            tokens: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|user| user.email == email).cloned())
    }

    async fn find_user_by_token(&self, id: Uuid, token: &str) -> Result<Option<User>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .get(&id)
            .filter(|user| user.tokens.iter().any(|t| t == token))
            .cloned())
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError> {
        let mut state = self.state.write().await;
        if let Some(email) = &changes.email {
            if state.email_taken(email, Some(id)) {
                return Err(email_taken());
            }
        }
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(age) = changes.age {
            user.age = Some(age);
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn push_token(&self, id: Uuid, token: &str) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        state.user_mut(id)?.tokens.push(token.to_string());
        Ok(())
    }

    async fn remove_token(&self, id: Uuid, token: &str) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        state.user_mut(id)?.tokens.retain(|t| t != token);
        Ok(())
    }

    async fn clear_tokens(&self, id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        state.user_mut(id)?.tokens.clear();
        Ok(())
    }

    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        let user = state.user_mut(id)?;
        user.avatar = avatar;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.state.write().await.users.remove(&id))
    }

    async fn insert_task(&self, task: Task) -> Result<Task, AppError> {
        self.state.write().await.tasks.push(task.clone());
        Ok(task)
    }

    async fn list_tasks(&self, creator: Uuid, filter: &TaskFilter) -> Result<Vec<Task>, AppError> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .iter()
            .filter(|task| task.creator == creator)
            .filter(|task| filter.completed.map_or(true, |c| task.completed == c))
            .cloned()
            .collect();

        if let Some(sort) = filter.sort {
            tasks.sort_by(|a, b| {
                let ordering = compare(a, b, sort.field);
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let skip = filter.skip.unwrap_or(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |l| l as usize);
        Ok(tasks.into_iter().skip(skip).take(limit).collect())
    }

    async fn find_task(&self, id: Uuid, creator: Uuid) -> Result<Option<Task>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .iter()
            .find(|task| task.id == id && task.creator == creator)
            .cloned())
    }

    async fn update_task(
        &self,
        id: Uuid,
        creator: Uuid,
        update: TaskUpdate,
    ) -> Result<Option<Task>, AppError> {
        let mut state = self.state.write().await;
        let Some(task) = state
            .tasks
            .iter_mut()
            .find(|task| task.id == id && task.creator == creator)
        else {
            return Ok(None);
        };
        task.apply(update);
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: Uuid, creator: Uuid) -> Result<Option<Task>, AppError> {
        let mut state = self.state.write().await;
        let position = state
            .tasks
            .iter()
            .position(|task| task.id == id && task.creator == creator);
        Ok(position.map(|index| state.tasks.remove(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskInput, TaskSort};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Mike".into(),
            email: email.into(),
            password_hash: "hash".into(),
            age: None,
        }
    }

    fn task(description: &str, completed: bool, creator: Uuid) -> Task {
        Task::new(
            TaskInput {
                description: description.into(),
                completed: Some(completed),
            },
            creator,
        )
    }

    #[actix_rt::test]
    async fn test_duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store.insert_user(new_user("mike@example.com")).await.unwrap();
        let err = store
            .insert_user(new_user("mike@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[actix_rt::test]
    async fn test_token_list_lifecycle() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("mike@example.com")).await.unwrap();

        store.push_token(user.id, "first").await.unwrap();
        store.push_token(user.id, "second").await.unwrap();
        assert!(store.find_user_by_token(user.id, "first").await.unwrap().is_some());

        store.remove_token(user.id, "first").await.unwrap();
        assert!(store.find_user_by_token(user.id, "first").await.unwrap().is_none());
        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.tokens, vec!["second".to_string()]);

        store.clear_tokens(user.id).await.unwrap();
        assert!(store.find_user_by_token(user.id, "second").await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn test_tasks_are_scoped_to_creator() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mine = store.insert_task(task("mine", false, owner)).await.unwrap();
        store.insert_task(task("theirs", false, other)).await.unwrap();

        let listed = store.list_tasks(owner, &TaskFilter::default()).await.unwrap();
        assert_eq!(listed, vec![mine.clone()]);

        assert!(store.find_task(mine.id, other).await.unwrap().is_none());
        assert!(store.delete_task(mine.id, other).await.unwrap().is_none());
        assert!(store.find_task(mine.id, owner).await.unwrap().is_some());
    }

    #[actix_rt::test]
    async fn test_list_filter_sort_and_paginate() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        for (description, completed) in [("b", true), ("a", false), ("c", true)] {
            store.insert_task(task(description, completed, owner)).await.unwrap();
        }

        let filter = TaskFilter {
            completed: Some(true),
            ..Default::default()
        };
        let listed = store.list_tasks(owner, &filter).await.unwrap();
        assert_eq!(listed.len(), 2);

        let filter = TaskFilter {
            sort: Some(TaskSort {
                field: TaskSortField::Description,
                direction: SortDirection::Desc,
            }),
            skip: Some(1),
            limit: Some(1),
            ..Default::default()
        };
        let listed = store.list_tasks(owner, &filter).await.unwrap();
        let descriptions: Vec<&str> = listed.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descriptions, vec!["b"]);
    }
}
