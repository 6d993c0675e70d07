use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, ListParams, NoContent, Paginated};
use crate::app::AppState;
use crate::auth::{RequireAuth, Role};
use crate::domain::assets::{
    is_valid_asset_status, Asset, CreateAssetRequest, UpdateAssetRequest,
};
use crate::error::{ApiError, ApiResult};

pub async fn list_assets(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Paginated<Asset>> {
    auth.require(Role::Viewer)?;

    let pattern = params.search_pattern();
    let sort = params.sort_column(&["code", "name", "status", "purchase_date", "created_at"], "code");

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM assets \
         WHERE ($1::text IS NULL OR code ILIKE $1 OR name ILIKE $1)",
    )
    .bind(pattern.as_deref())
    .fetch_one(&state.db)
    .await?;

    let sql = format!(
        "SELECT * FROM assets \
         WHERE ($1::text IS NULL OR code ILIKE $1 OR name ILIKE $1) \
         ORDER BY {} {} LIMIT $2 OFFSET $3",
        sort,
        params.order.as_sql()
    );
    let assets = sqlx::query_as::<_, Asset>(&sql)
        .bind(pattern.as_deref())
        .bind(params.pagination().limit() as i64)
        .bind(params.pagination().offset() as i64)
        .fetch_all(&state.db)
        .await?;

    Ok(Paginated::new(assets, &params.pagination(), total as u64))
}

pub async fn get_asset(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(asset_id): Path<Uuid>,
) -> ApiResult<DataResponse<Asset>> {
    auth.require(Role::Viewer)?;

    let asset = sqlx::query_as::<_, Asset>("SELECT * FROM assets WHERE id = $1")
        .bind(asset_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("asset not found".to_string()))?;

    Ok(DataResponse::new(asset))
}

pub async fn create_asset(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAssetRequest>,
) -> ApiResult<Created<Asset>> {
    auth.require(Role::Accountant)?;

    if req.code.trim().is_empty() || req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("code and name are required".to_string()));
    }

    let asset = sqlx::query_as::<_, Asset>(
        "INSERT INTO assets (code, name, site_id, rental_category_id, purchase_date, purchase_cost) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(req.code.trim())
    .bind(req.name.trim())
    .bind(req.site_id)
    .bind(req.rental_category_id)
    .bind(req.purchase_date)
    .bind(req.purchase_cost)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::from_write(e, "asset code already exists"))?;

    Ok(Created(asset))
}

pub async fn update_asset(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(asset_id): Path<Uuid>,
    Json(req): Json<UpdateAssetRequest>,
) -> ApiResult<DataResponse<Asset>> {
    auth.require(Role::Accountant)?;

    if let Some(status) = &req.status {
        if !is_valid_asset_status(status) {
            return Err(ApiError::BadRequest(format!("unknown asset status '{}'", status)));
        }
    }

    let asset = sqlx::query_as::<_, Asset>(
        "UPDATE assets SET \
           code = COALESCE($2, code), \
           name = COALESCE($3, name), \
           site_id = COALESCE($4, site_id), \
           rental_category_id = COALESCE($5, rental_category_id), \
           purchase_date = COALESCE($6, purchase_date), \
           purchase_cost = COALESCE($7, purchase_cost), \
           status = COALESCE($8, status), \
           updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(asset_id)
    .bind(&req.code)
    .bind(&req.name)
    .bind(req.site_id)
    .bind(req.rental_category_id)
    .bind(req.purchase_date)
    .bind(req.purchase_cost)
    .bind(&req.status)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::from_write(e, "asset code already exists"))?
    .ok_or_else(|| ApiError::NotFound("asset not found".to_string()))?;

    Ok(DataResponse::new(asset))
}

pub async fn delete_asset(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(asset_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;

    let deleted = sqlx::query("DELETE FROM assets WHERE id = $1")
        .bind(asset_id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("asset not found".to_string()));
    }

    Ok(NoContent)
}
