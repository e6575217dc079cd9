use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    models::{Task, TaskCreate, TaskQuery, TaskStatusUpdate, TaskUpdate},
};
use actix_web::{delete, get, patch, post, put, web, HttpResponse, Responder};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

const TASK_COLUMNS: &str =
    "id, title, description, status, priority, due_date, created_at, updated_at, user_id";

fn not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

/// Builds the listing query for `user_id`, appending one predicate per filter.
fn list_query(user_id: i32, filters: &TaskQuery) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT {} FROM tasks WHERE user_id = ", TASK_COLUMNS));
    query.push_bind(user_id);

    if let Some(status) = filters.status {
        query.push(" AND status = ").push_bind(status);
    }
    if let Some(priority) = filters.priority {
        query.push(" AND priority = ").push_bind(priority);
    }
    if let Some(search) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        query
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    query.push(" ORDER BY created_at DESC, id DESC");
    query
}

/// Lists the caller's tasks, newest first.
///
/// ## Query Parameters:
/// - `status` (optional): `PENDING`, `IN_PROGRESS`, `COMPLETED` or `CANCELLED`.
/// - `priority` (optional): `LOW`, `MEDIUM`, `HIGH` or `URGENT`.
/// - `search` (optional): case-insensitive match on title or description.
#[get("")]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    query_params: web::Query<TaskQuery>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let tasks = list_query(user_id.0, &query_params)
        .build_query_as::<Task>()
        .fetch_all(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a task owned by the caller.
///
/// `priority` defaults to `MEDIUM` and `status` to `PENDING`.
///
/// ## Responses:
/// - `201 Created`: the stored `Task`.
/// - `422 Unprocessable Entity`: title or description out of bounds.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    task_data: web::Json<TaskCreate>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let input = task_data.into_inner();

    let task = sqlx::query_as::<_, Task>(&format!(
        "INSERT INTO tasks (title, description, priority, status, due_date, user_id)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(input.title)
    .bind(input.description)
    .bind(input.priority)
    .bind(input.status)
    .bind(input.due_date)
    .bind(user_id.0)
    .fetch_one(&**pool)
    .await?;

    log::debug!("user {} created task {}", user_id.0, task.id);
    Ok(HttpResponse::Created().json(task))
}

/// Fetches one task. Tasks owned by someone else are reported as `404`.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<i64>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let task = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
        TASK_COLUMNS
    ))
    .bind(task_id.into_inner())
    .bind(user_id.0)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(not_found)?;

    Ok(HttpResponse::Ok().json(task))
}

/// Partially updates a task; fields missing from the body keep their value.
///
/// ## Responses:
/// - `200 OK`: the updated `Task`.
/// - `404 Not Found`: no such task for this user.
/// - `422 Unprocessable Entity`: a present field failed validation.
#[put("/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<i64>,
    task_data: web::Json<TaskUpdate>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let task_id = task_id.into_inner();
    let update = task_data.into_inner();

    let task = if update.is_empty() {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
            TASK_COLUMNS
        ))
        .bind(task_id)
        .bind(user_id.0)
        .fetch_optional(&**pool)
        .await?
    } else {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks
             SET title = COALESCE($1, title),
                 description = COALESCE($2, description),
                 priority = COALESCE($3, priority),
                 status = COALESCE($4, status),
                 due_date = COALESCE($5, due_date),
                 updated_at = NOW()
             WHERE id = $6 AND user_id = $7
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(update.title)
        .bind(update.description)
        .bind(update.priority)
        .bind(update.status)
        .bind(update.due_date)
        .bind(task_id)
        .bind(user_id.0)
        .fetch_optional(&**pool)
        .await?
    };

    Ok(HttpResponse::Ok().json(task.ok_or_else(not_found)?))
}

/// Moves a task to another status.
#[patch("/{id}/status")]
pub async fn update_task_status(
    pool: web::Data<PgPool>,
    task_id: web::Path<i64>,
    status_data: web::Json<TaskStatusUpdate>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let task = sqlx::query_as::<_, Task>(&format!(
        "UPDATE tasks SET status = $1, updated_at = NOW()
         WHERE id = $2 AND user_id = $3
         RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(status_data.status)
    .bind(task_id.into_inner())
    .bind(user_id.0)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(not_found)?;

    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task.
///
/// ## Responses:
/// - `204 No Content`: deleted.
/// - `404 Not Found`: no such task for this user.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<i64>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
        .bind(task_id.into_inner())
        .bind(user_id.0)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found());
    }

    Ok(HttpResponse::NoContent().finish())
}
