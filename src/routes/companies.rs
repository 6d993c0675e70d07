use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, ListParams, NoContent, Paginated};
use crate::app::AppState;
use crate::auth::{RequireAuth, Role};
use crate::domain::companies::{Company, CreateCompanyRequest, UpdateCompanyRequest};
use crate::error::{ApiError, ApiResult};

pub async fn list_companies(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Paginated<Company>> {
    auth.require(Role::Viewer)?;

    let pattern = params.search_pattern();
    let sort = params.sort_column(&["name", "created_at"], "name");

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM companies WHERE ($1::text IS NULL OR name ILIKE $1)",
    )
    .bind(pattern.as_deref())
    .fetch_one(&state.db)
    .await?;

    let sql = format!(
        "SELECT * FROM companies WHERE ($1::text IS NULL OR name ILIKE $1) \
         ORDER BY {} {} LIMIT $2 OFFSET $3",
        sort,
        params.order.as_sql()
    );
    let companies = sqlx::query_as::<_, Company>(&sql)
        .bind(pattern.as_deref())
        .bind(params.pagination().limit() as i64)
        .bind(params.pagination().offset() as i64)
        .fetch_all(&state.db)
        .await?;

    Ok(Paginated::new(companies, &params.pagination(), total as u64))
}

pub async fn get_company(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
) -> ApiResult<DataResponse<Company>> {
    auth.require(Role::Viewer)?;

    let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
        .bind(company_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("company not found".to_string()))?;

    Ok(DataResponse::new(company))
}

pub async fn create_company(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCompanyRequest>,
) -> ApiResult<Created<Company>> {
    auth.require(Role::Accountant)?;

    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let company = sqlx::query_as::<_, Company>(
        "INSERT INTO companies (name, address, phone) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(req.name.trim())
    .bind(&req.address)
    .bind(&req.phone)
    .fetch_one(&state.db)
    .await?;

    Ok(Created(company))
}

pub async fn update_company(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
    Json(req): Json<UpdateCompanyRequest>,
) -> ApiResult<DataResponse<Company>> {
    auth.require(Role::Accountant)?;

    let company = sqlx::query_as::<_, Company>(
        "UPDATE companies SET \
           name = COALESCE($2, name), \
           address = COALESCE($3, address), \
           phone = COALESCE($4, phone), \
           updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(company_id)
    .bind(&req.name)
    .bind(&req.address)
    .bind(&req.phone)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("company not found".to_string()))?;

    Ok(DataResponse::new(company))
}

pub async fn delete_company(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;

    let deleted = sqlx::query("DELETE FROM companies WHERE id = $1")
        .bind(company_id)
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::from_delete(e, "company is referenced by sites"))?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("company not found".to_string()));
    }

    Ok(NoContent)
}
