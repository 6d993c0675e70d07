use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, ListParams, NoContent, Paginated};
use crate::app::AppState;
use crate::auth::{RequireAuth, Role};
use crate::domain::sites::{is_valid_site_status, CreateSiteRequest, Site, UpdateSiteRequest};
use crate::error::{ApiError, ApiResult};

const SORT_COLUMNS: &[&str] = &["code", "name", "status", "start_date", "created_at"];

pub async fn list_sites(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Paginated<Site>> {
    auth.require(Role::Viewer)?;

    let pattern = params.search_pattern();
    let sort = params.sort_column(SORT_COLUMNS, "created_at");

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sites \
         WHERE ($1::text IS NULL OR code ILIKE $1 OR name ILIKE $1 OR client_name ILIKE $1)",
    )
    .bind(pattern.as_deref())
    .fetch_one(&state.db)
    .await?;

    let sql = format!(
        "SELECT * FROM sites \
         WHERE ($1::text IS NULL OR code ILIKE $1 OR name ILIKE $1 OR client_name ILIKE $1) \
         ORDER BY {} {} LIMIT $2 OFFSET $3",
        sort,
        params.order.as_sql()
    );
    let sites = sqlx::query_as::<_, Site>(&sql)
        .bind(pattern.as_deref())
        .bind(params.pagination().limit() as i64)
        .bind(params.pagination().offset() as i64)
        .fetch_all(&state.db)
        .await?;

    Ok(Paginated::new(sites, &params.pagination(), total as u64))
}

pub async fn get_site(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<Uuid>,
) -> ApiResult<DataResponse<Site>> {
    auth.require(Role::Viewer)?;

    let site = sqlx::query_as::<_, Site>("SELECT * FROM sites WHERE id = $1")
        .bind(site_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("site not found".to_string()))?;

    Ok(DataResponse::new(site))
}

pub async fn create_site(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSiteRequest>,
) -> ApiResult<Created<Site>> {
    auth.require(Role::Accountant)?;

    if req.code.trim().is_empty() || req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("code and name are required".to_string()));
    }

    let site = sqlx::query_as::<_, Site>(
        "INSERT INTO sites (company_id, code, name, client_name, location, start_date) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(req.company_id)
    .bind(req.code.trim())
    .bind(req.name.trim())
    .bind(&req.client_name)
    .bind(&req.location)
    .bind(req.start_date)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::from_write(e, "site code already exists"))?;

    tracing::info!(user_id = %auth.user_id, site_id = %site.id, code = %site.code, "Site created");

    Ok(Created(site))
}

pub async fn update_site(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<Uuid>,
    Json(req): Json<UpdateSiteRequest>,
) -> ApiResult<DataResponse<Site>> {
    auth.require(Role::Accountant)?;

    if let Some(status) = &req.status {
        if !is_valid_site_status(status) {
            return Err(ApiError::BadRequest(format!("unknown site status '{}'", status)));
        }
    }

    let site = sqlx::query_as::<_, Site>(
        "UPDATE sites SET \
           company_id = COALESCE($2, company_id), \
           code = COALESCE($3, code), \
           name = COALESCE($4, name), \
           client_name = COALESCE($5, client_name), \
           location = COALESCE($6, location), \
           status = COALESCE($7, status), \
           start_date = COALESCE($8, start_date), \
           updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(site_id)
    .bind(req.company_id)
    .bind(&req.code)
    .bind(&req.name)
    .bind(&req.client_name)
    .bind(&req.location)
    .bind(&req.status)
    .bind(req.start_date)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::from_write(e, "site code already exists"))?
    .ok_or_else(|| ApiError::NotFound("site not found".to_string()))?;

    Ok(DataResponse::new(site))
}

pub async fn delete_site(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;

    let deleted = sqlx::query("DELETE FROM sites WHERE id = $1")
        .bind(site_id)
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::from_delete(e, "site is referenced by other records"))?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("site not found".to_string()));
    }

    tracing::info!(user_id = %auth.user_id, site_id = %site_id, "Site deleted");

    Ok(NoContent)
}
