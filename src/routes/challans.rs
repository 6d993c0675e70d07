//! Delivery challan handlers. Outward challans walk a forward-only stage
//! chain; inward challans are plain records.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, ListParams, NoContent, Paginated};
use crate::app::AppState;
use crate::auth::{AuthContext, RequireAuth, Role};
use crate::domain::challans::{
    validate_lines, ChallanStage, CreateInwardChallanRequest, CreateOutwardChallanRequest,
    InwardChallan, InwardChallanLine, InwardChallanResponse, OutwardChallan, OutwardChallanLine,
    OutwardChallanResponse,
};
use crate::domain::manpower::validate_transfer_sites;
use crate::error::{ApiError, ApiResult};

async fn fetch_outward(state: &AppState, challan_id: Uuid) -> ApiResult<OutwardChallan> {
    sqlx::query_as::<_, OutwardChallan>("SELECT * FROM outward_challans WHERE id = $1")
        .bind(challan_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("challan not found".to_string()))
}

async fn fetch_outward_lines(
    state: &AppState,
    challan_id: Uuid,
) -> ApiResult<Vec<OutwardChallanLine>> {
    Ok(sqlx::query_as::<_, OutwardChallanLine>(
        "SELECT * FROM outward_challan_lines WHERE challan_id = $1",
    )
    .bind(challan_id)
    .fetch_all(&state.db)
    .await?)
}

pub async fn list_outward_challans(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Paginated<OutwardChallan>> {
    auth.require(Role::Viewer)?;

    let pattern = params.search_pattern();
    let sort = params.sort_column(&["challan_no", "challan_date", "created_at"], "challan_date");

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM outward_challans WHERE ($1::text IS NULL OR challan_no ILIKE $1)",
    )
    .bind(pattern.as_deref())
    .fetch_one(&state.db)
    .await?;

    let sql = format!(
        "SELECT * FROM outward_challans WHERE ($1::text IS NULL OR challan_no ILIKE $1) \
         ORDER BY {} {} LIMIT $2 OFFSET $3",
        sort,
        params.order.as_sql()
    );
    let challans = sqlx::query_as::<_, OutwardChallan>(&sql)
        .bind(pattern.as_deref())
        .bind(params.pagination().limit() as i64)
        .bind(params.pagination().offset() as i64)
        .fetch_all(&state.db)
        .await?;

    Ok(Paginated::new(challans, &params.pagination(), total as u64))
}

pub async fn get_outward_challan(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(challan_id): Path<Uuid>,
) -> ApiResult<DataResponse<OutwardChallanResponse>> {
    auth.require(Role::Viewer)?;

    let challan = fetch_outward(&state, challan_id).await?;
    let lines = fetch_outward_lines(&state, challan_id).await?;

    Ok(DataResponse::new(OutwardChallanResponse { challan, lines }))
}

pub async fn create_outward_challan(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOutwardChallanRequest>,
) -> ApiResult<Created<OutwardChallanResponse>> {
    auth.require(Role::Accountant)?;

    if req.challan_no.trim().is_empty() {
        return Err(ApiError::BadRequest("challan_no is required".to_string()));
    }
    validate_transfer_sites(req.site_id, req.to_site_id).map_err(ApiError::BadRequest)?;
    validate_lines(&req.lines).map_err(ApiError::BadRequest)?;

    let mut tx = state.db.begin().await?;

    let challan = sqlx::query_as::<_, OutwardChallan>(
        "INSERT INTO outward_challans (site_id, to_site_id, challan_no, challan_date, created_by) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(req.site_id)
    .bind(req.to_site_id)
    .bind(req.challan_no.trim())
    .bind(req.challan_date)
    .bind(auth.user_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| ApiError::from_write(e, "challan number already exists"))?;

    for line in &req.lines {
        sqlx::query(
            "INSERT INTO outward_challan_lines (challan_id, description, qty, unit) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(challan.id)
        .bind(&line.description)
        .bind(line.qty)
        .bind(&line.unit)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(user_id = %auth.user_id, challan_id = %challan.id, "Outward challan created");

    let lines = fetch_outward_lines(&state, challan.id).await?;
    Ok(Created(OutwardChallanResponse { challan, lines }))
}

pub async fn delete_outward_challan(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(challan_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;

    let challan = fetch_outward(&state, challan_id).await?;
    if challan.stage != ChallanStage::Draft {
        return Err(ApiError::Conflict(
            "only draft challans can be deleted".to_string(),
        ));
    }

    sqlx::query("DELETE FROM outward_challans WHERE id = $1")
        .bind(challan_id)
        .execute(&state.db)
        .await?;

    Ok(NoContent)
}

async fn advance_challan(
    state: &AppState,
    auth: &AuthContext,
    challan_id: Uuid,
    target: ChallanStage,
    extra_set: &str,
) -> ApiResult<OutwardChallan> {
    let challan = fetch_outward(state, challan_id).await?;

    if !challan.stage.can_advance_to(target) {
        return Err(ApiError::Conflict(format!(
            "challan is {}; cannot move to {}",
            challan.stage.as_str(),
            target.as_str()
        )));
    }

    let sql = format!(
        "UPDATE outward_challans SET stage = $2, {}, updated_at = now() \
         WHERE id = $1 AND stage = $3 RETURNING *",
        extra_set
    );
    let updated = sqlx::query_as::<_, OutwardChallan>(&sql)
        .bind(challan_id)
        .bind(target)
        .bind(challan.stage)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::Conflict("challan stage changed concurrently".to_string()))?;

    tracing::info!(
        user_id = %auth.user_id,
        challan_id = %challan_id,
        stage = updated.stage.as_str(),
        "Outward challan stage advanced"
    );

    Ok(updated)
}

pub async fn approve_outward_challan(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(challan_id): Path<Uuid>,
) -> ApiResult<DataResponse<OutwardChallan>> {
    auth.require(Role::Manager)?;

    let challan = fetch_outward(&state, challan_id).await?;
    if !challan.stage.can_advance_to(ChallanStage::Approved) {
        return Err(ApiError::Conflict(format!(
            "challan is {}; cannot move to approved",
            challan.stage.as_str()
        )));
    }

    let updated = sqlx::query_as::<_, OutwardChallan>(
        "UPDATE outward_challans \
         SET stage = $2, approved_by = $3, approved_at = now(), updated_at = now() \
         WHERE id = $1 AND stage = 'draft' RETURNING *",
    )
    .bind(challan_id)
    .bind(ChallanStage::Approved)
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::Conflict("challan stage changed concurrently".to_string()))?;

    Ok(DataResponse::new(updated))
}

pub async fn dispatch_outward_challan(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(challan_id): Path<Uuid>,
) -> ApiResult<DataResponse<OutwardChallan>> {
    auth.require(Role::Accountant)?;
    let challan = advance_challan(
        &state,
        &auth,
        challan_id,
        ChallanStage::Dispatched,
        "dispatched_at = now()",
    )
    .await?;
    Ok(DataResponse::new(challan))
}

pub async fn receive_outward_challan(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(challan_id): Path<Uuid>,
) -> ApiResult<DataResponse<OutwardChallan>> {
    auth.require(Role::Accountant)?;
    let challan = advance_challan(
        &state,
        &auth,
        challan_id,
        ChallanStage::Received,
        "received_at = now()",
    )
    .await?;
    Ok(DataResponse::new(challan))
}

// Inward challans

pub async fn list_inward_challans(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Paginated<InwardChallan>> {
    auth.require(Role::Viewer)?;

    let pattern = params.search_pattern();
    let sort = params.sort_column(&["challan_no", "challan_date", "created_at"], "challan_date");

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM inward_challans \
         WHERE ($1::text IS NULL OR challan_no ILIKE $1 OR received_from ILIKE $1)",
    )
    .bind(pattern.as_deref())
    .fetch_one(&state.db)
    .await?;

    let sql = format!(
        "SELECT * FROM inward_challans \
         WHERE ($1::text IS NULL OR challan_no ILIKE $1 OR received_from ILIKE $1) \
         ORDER BY {} {} LIMIT $2 OFFSET $3",
        sort,
        params.order.as_sql()
    );
    let challans = sqlx::query_as::<_, InwardChallan>(&sql)
        .bind(pattern.as_deref())
        .bind(params.pagination().limit() as i64)
        .bind(params.pagination().offset() as i64)
        .fetch_all(&state.db)
        .await?;

    Ok(Paginated::new(challans, &params.pagination(), total as u64))
}

pub async fn get_inward_challan(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(challan_id): Path<Uuid>,
) -> ApiResult<DataResponse<InwardChallanResponse>> {
    auth.require(Role::Viewer)?;

    let challan = sqlx::query_as::<_, InwardChallan>("SELECT * FROM inward_challans WHERE id = $1")
        .bind(challan_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("challan not found".to_string()))?;

    let lines = sqlx::query_as::<_, InwardChallanLine>(
        "SELECT * FROM inward_challan_lines WHERE challan_id = $1",
    )
    .bind(challan_id)
    .fetch_all(&state.db)
    .await?;

    Ok(DataResponse::new(InwardChallanResponse { challan, lines }))
}

pub async fn create_inward_challan(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateInwardChallanRequest>,
) -> ApiResult<Created<InwardChallanResponse>> {
    auth.require(Role::Accountant)?;

    if req.challan_no.trim().is_empty() {
        return Err(ApiError::BadRequest("challan_no is required".to_string()));
    }
    validate_lines(&req.lines).map_err(ApiError::BadRequest)?;

    let mut tx = state.db.begin().await?;

    let challan = sqlx::query_as::<_, InwardChallan>(
        "INSERT INTO inward_challans (site_id, challan_no, challan_date, received_from) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(req.site_id)
    .bind(req.challan_no.trim())
    .bind(req.challan_date)
    .bind(&req.received_from)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| ApiError::from_write(e, "challan number already exists for this site"))?;

    for line in &req.lines {
        sqlx::query(
            "INSERT INTO inward_challan_lines (challan_id, description, qty, unit) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(challan.id)
        .bind(&line.description)
        .bind(line.qty)
        .bind(&line.unit)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let lines = sqlx::query_as::<_, InwardChallanLine>(
        "SELECT * FROM inward_challan_lines WHERE challan_id = $1",
    )
    .bind(challan.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Created(InwardChallanResponse { challan, lines }))
}

pub async fn delete_inward_challan(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(challan_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;

    let deleted = sqlx::query("DELETE FROM inward_challans WHERE id = $1")
        .bind(challan_id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("challan not found".to_string()));
    }

    Ok(NoContent)
}
