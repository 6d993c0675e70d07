//! Lookup-table endpoints: departments, zones, rental categories.
//!
//! The three tables share the same shape (id, name, created_at), so the
//! handlers delegate to small helpers parameterised by table name. Table
//! names are compile-time constants, never user input.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, ListParams, NoContent, Paginated};
use crate::app::AppState;
use crate::auth::{RequireAuth, Role};
use crate::domain::org::{Department, NameRequest, RentalCategory, Zone};
use crate::error::{ApiError, ApiResult};

async fn list_lookup<T>(
    db: &PgPool,
    table: &str,
    params: &ListParams,
) -> ApiResult<Paginated<T>>
where
    T: Serialize + for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let pattern = params.search_pattern();

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE ($1::text IS NULL OR name ILIKE $1)",
        table
    ))
    .bind(pattern.as_deref())
    .fetch_one(db)
    .await?;

    let sort = params.sort_column(&["name", "created_at"], "name");
    let sql = format!(
        "SELECT * FROM {} WHERE ($1::text IS NULL OR name ILIKE $1) \
         ORDER BY {} {} LIMIT $2 OFFSET $3",
        table,
        sort,
        params.order.as_sql()
    );
    let rows = sqlx::query_as::<_, T>(&sql)
        .bind(pattern.as_deref())
        .bind(params.pagination().limit() as i64)
        .bind(params.pagination().offset() as i64)
        .fetch_all(db)
        .await?;

    Ok(Paginated::new(rows, &params.pagination(), total as u64))
}

async fn create_lookup<T>(db: &PgPool, table: &str, name: &str) -> ApiResult<T>
where
    T: Serialize + for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let row = sqlx::query_as::<_, T>(&format!(
        "INSERT INTO {} (name) VALUES ($1) RETURNING *",
        table
    ))
    .bind(name.trim())
    .fetch_one(db)
    .await
    .map_err(|e| ApiError::from_write(e, "name already exists"))?;

    Ok(row)
}

async fn rename_lookup<T>(db: &PgPool, table: &str, id: Uuid, name: &str) -> ApiResult<T>
where
    T: Serialize + for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    sqlx::query_as::<_, T>(&format!(
        "UPDATE {} SET name = $2 WHERE id = $1 RETURNING *",
        table
    ))
    .bind(id)
    .bind(name.trim())
    .fetch_optional(db)
    .await
    .map_err(|e| ApiError::from_write(e, "name already exists"))?
    .ok_or_else(|| ApiError::NotFound("record not found".to_string()))
}

async fn delete_lookup(db: &PgPool, table: &str, id: Uuid) -> ApiResult<NoContent> {
    let deleted = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table))
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| ApiError::from_delete(e, "record is still referenced"))?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("record not found".to_string()));
    }
    Ok(NoContent)
}

// Departments

pub async fn list_departments(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Paginated<Department>> {
    auth.require(Role::Viewer)?;
    list_lookup(&state.db, "departments", &params).await
}

pub async fn create_department(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<NameRequest>,
) -> ApiResult<Created<Department>> {
    auth.require(Role::Accountant)?;
    Ok(Created(create_lookup(&state.db, "departments", &req.name).await?))
}

pub async fn update_department(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<NameRequest>,
) -> ApiResult<DataResponse<Department>> {
    auth.require(Role::Accountant)?;
    Ok(DataResponse::new(
        rename_lookup(&state.db, "departments", id, &req.name).await?,
    ))
}

pub async fn delete_department(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;
    delete_lookup(&state.db, "departments", id).await
}

// Zones

pub async fn list_zones(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Paginated<Zone>> {
    auth.require(Role::Viewer)?;
    list_lookup(&state.db, "zones", &params).await
}

pub async fn create_zone(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<NameRequest>,
) -> ApiResult<Created<Zone>> {
    auth.require(Role::Accountant)?;
    Ok(Created(create_lookup(&state.db, "zones", &req.name).await?))
}

pub async fn update_zone(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<NameRequest>,
) -> ApiResult<DataResponse<Zone>> {
    auth.require(Role::Accountant)?;
    Ok(DataResponse::new(
        rename_lookup(&state.db, "zones", id, &req.name).await?,
    ))
}

pub async fn delete_zone(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;
    delete_lookup(&state.db, "zones", id).await
}

// Rental categories

pub async fn list_rental_categories(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Paginated<RentalCategory>> {
    auth.require(Role::Viewer)?;
    list_lookup(&state.db, "rental_categories", &params).await
}

pub async fn create_rental_category(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<NameRequest>,
) -> ApiResult<Created<RentalCategory>> {
    auth.require(Role::Accountant)?;
    Ok(Created(
        create_lookup(&state.db, "rental_categories", &req.name).await?,
    ))
}

pub async fn update_rental_category(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<NameRequest>,
) -> ApiResult<DataResponse<RentalCategory>> {
    auth.require(Role::Accountant)?;
    Ok(DataResponse::new(
        rename_lookup(&state.db, "rental_categories", id, &req.name).await?,
    ))
}

pub async fn delete_rental_category(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;
    delete_lookup(&state.db, "rental_categories", id).await
}
