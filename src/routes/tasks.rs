use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{patch::parse_patch, Task, TaskInput, TaskQuery, TaskUpdate},
    store::Store,
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

/// Retrieves the authenticated user's tasks.
///
/// ## Query Parameters:
/// - `completed` (optional): `true` for completed tasks, any other non-empty value for
///   incomplete ones. Empty means no filter.
/// - `sortBy` (optional): `<field>:<asc|desc>` with field one of `description`, `completed`,
///   `createdAt`, `updatedAt`.
/// - `skip`, `limit` (optional): pagination. Malformed values are ignored.
///
/// Repeated keys keep their first value.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Task` objects owned by the caller.
/// - `401 Unauthorized`: missing or invalid token.
/// - `500 Internal Server Error`: store failure.
#[get("")]
pub async fn get_tasks(
    store: web::Data<dyn Store>,
    query_params: web::Query<Vec<(String, String)>>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let filter = query_params.into_inner().into_iter().collect::<TaskQuery>().to_filter();
    let tasks = store.list_tasks(auth.user.id, &filter).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task owned by the authenticated user.
///
/// ## Request Body:
/// - `description`: required, non-blank.
/// - `completed` (optional): defaults to `false`.
///
/// ## Responses:
/// - `201 Created`: the new `Task`.
/// - `400 Bad Request`: malformed body or failed validation.
/// - `401 Unauthorized`: missing or invalid token.
#[post("")]
pub async fn create_task(
    store: web::Data<dyn Store>,
    task_data: web::Json<TaskInput>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = Task::new(task_data.into_inner(), auth.user.id);
    let task = store.insert_task(task).await?;

    Ok(HttpResponse::Created().json(task))
}

/// Retrieves one of the caller's tasks.
///
/// ## Responses:
/// - `200 OK`: the `Task`.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[get("/{id}")]
pub async fn get_task(
    store: web::Data<dyn Store>,
    task_id: web::Path<Uuid>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task = store
        .find_task(task_id.into_inner(), auth.user.id)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(HttpResponse::Ok().json(task))
}

/// Updates one of the caller's tasks.
///
/// Only `description` and `completed` may be present; any other key rejects the
/// whole request with 400 and nothing is changed.
///
/// ## Responses:
/// - `200 OK`: the updated `Task`.
/// - `400 Bad Request`: disallowed key or invalid value.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[patch("/{id}")]
pub async fn update_task(
    store: web::Data<dyn Store>,
    task_id: web::Path<Uuid>,
    body: web::Json<Map<String, Value>>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let update: TaskUpdate = parse_patch(body.into_inner(), TaskUpdate::ALLOWED_FIELDS)?;
    update.validate()?;

    let task = store
        .update_task(task_id.into_inner(), auth.user.id, update)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(HttpResponse::Ok().json(task))
}

/// Deletes one of the caller's tasks and returns it.
///
/// ## Responses:
/// - `200 OK`: the deleted `Task`.
/// - `404 Not Found`: no such task (including already deleted), or it belongs to someone else.
#[delete("/{id}")]
pub async fn delete_task(
    store: web::Data<dyn Store>,
    task_id: web::Path<Uuid>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task = store
        .delete_task(task_id.into_inner(), auth.user.id)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(HttpResponse::Ok().json(task))
}

fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}
