use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, ListParams, NoContent, Paginated};
use crate::app::AppState;
use crate::auth::{RequireAuth, Role};
use crate::domain::boqs::{
    validate_item_figures, validate_item_update, validate_ordered_reduction, Boq, BoqItem,
    BoqItemProgress, BoqProgress, CreateBoqItemRequest, CreateBoqRequest, UpdateBoqItemRequest,
    UpdateBoqRequest,
};
use crate::error::{ApiError, ApiResult};

const SORT_COLUMNS: &[&str] = &["boq_no", "title", "start_date", "created_at"];

#[derive(sqlx::FromRow)]
struct ItemFigures {
    ordered_qty: Decimal,
    rate: Decimal,
}

async fn fetch_boq(state: &AppState, boq_id: Uuid) -> ApiResult<Boq> {
    sqlx::query_as::<_, Boq>("SELECT * FROM boqs WHERE id = $1")
        .bind(boq_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("BOQ not found".to_string()))
}

pub async fn list_boqs(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Paginated<Boq>> {
    auth.require(Role::Viewer)?;

    let pattern = params.search_pattern();
    let sort = params.sort_column(SORT_COLUMNS, "created_at");

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM boqs \
         WHERE ($1::text IS NULL OR boq_no ILIKE $1 OR title ILIKE $1)",
    )
    .bind(pattern.as_deref())
    .fetch_one(&state.db)
    .await?;

    let sql = format!(
        "SELECT * FROM boqs \
         WHERE ($1::text IS NULL OR boq_no ILIKE $1 OR title ILIKE $1) \
         ORDER BY {} {} LIMIT $2 OFFSET $3",
        sort,
        params.order.as_sql()
    );
    let boqs = sqlx::query_as::<_, Boq>(&sql)
        .bind(pattern.as_deref())
        .bind(params.pagination().limit() as i64)
        .bind(params.pagination().offset() as i64)
        .fetch_all(&state.db)
        .await?;

    Ok(Paginated::new(boqs, &params.pagination(), total as u64))
}

pub async fn get_boq(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(boq_id): Path<Uuid>,
) -> ApiResult<DataResponse<Boq>> {
    auth.require(Role::Viewer)?;
    Ok(DataResponse::new(fetch_boq(&state, boq_id).await?))
}

pub async fn create_boq(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBoqRequest>,
) -> ApiResult<Created<Boq>> {
    auth.require(Role::Accountant)?;

    if req.boq_no.trim().is_empty() || req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("boq_no and title are required".to_string()));
    }

    let boq = sqlx::query_as::<_, Boq>(
        "INSERT INTO boqs (site_id, boq_no, title, work_order_no, start_date, end_date) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(req.site_id)
    .bind(req.boq_no.trim())
    .bind(req.title.trim())
    .bind(&req.work_order_no)
    .bind(req.start_date)
    .bind(req.end_date)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::from_write(e, "BOQ number already exists for this site"))?;

    tracing::info!(user_id = %auth.user_id, boq_id = %boq.id, "BOQ created");

    Ok(Created(boq))
}

pub async fn update_boq(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(boq_id): Path<Uuid>,
    Json(req): Json<UpdateBoqRequest>,
) -> ApiResult<DataResponse<Boq>> {
    auth.require(Role::Accountant)?;

    let boq = sqlx::query_as::<_, Boq>(
        "UPDATE boqs SET \
           boq_no = COALESCE($2, boq_no), \
           title = COALESCE($3, title), \
           work_order_no = COALESCE($4, work_order_no), \
           start_date = COALESCE($5, start_date), \
           end_date = COALESCE($6, end_date), \
           updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(boq_id)
    .bind(&req.boq_no)
    .bind(&req.title)
    .bind(&req.work_order_no)
    .bind(req.start_date)
    .bind(req.end_date)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::from_write(e, "BOQ number already exists for this site"))?
    .ok_or_else(|| ApiError::NotFound("BOQ not found".to_string()))?;

    Ok(DataResponse::new(boq))
}

pub async fn delete_boq(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(boq_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;

    let deleted = sqlx::query("DELETE FROM boqs WHERE id = $1")
        .bind(boq_id)
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::from_delete(e, "BOQ has bills or cashbook entries"))?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("BOQ not found".to_string()));
    }

    Ok(NoContent)
}

// Items

pub async fn list_boq_items(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(boq_id): Path<Uuid>,
) -> ApiResult<DataResponse<Vec<BoqItem>>> {
    auth.require(Role::Viewer)?;

    fetch_boq(&state, boq_id).await?;

    let items = sqlx::query_as::<_, BoqItem>(
        "SELECT * FROM boq_items WHERE boq_id = $1 ORDER BY item_code",
    )
    .bind(boq_id)
    .fetch_all(&state.db)
    .await?;

    Ok(DataResponse::new(items))
}

pub async fn create_boq_item(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(boq_id): Path<Uuid>,
    Json(req): Json<CreateBoqItemRequest>,
) -> ApiResult<Created<BoqItem>> {
    auth.require(Role::Accountant)?;

    fetch_boq(&state, boq_id).await?;
    validate_item_figures(req.ordered_qty, req.rate).map_err(ApiError::BadRequest)?;

    let item = sqlx::query_as::<_, BoqItem>(
        "INSERT INTO boq_items (boq_id, item_code, description, unit, ordered_qty, rate) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(boq_id)
    .bind(req.item_code.trim())
    .bind(&req.description)
    .bind(&req.unit)
    .bind(req.ordered_qty)
    .bind(req.rate)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::from_write(e, "item code already exists on this BOQ"))?;

    Ok(Created(item))
}

pub async fn update_boq_item(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((boq_id, item_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateBoqItemRequest>,
) -> ApiResult<DataResponse<BoqItem>> {
    auth.require(Role::Accountant)?;

    let current = sqlx::query_as::<_, ItemFigures>(
        "SELECT ordered_qty, rate FROM boq_items WHERE id = $2 AND boq_id = $1",
    )
    .bind(boq_id)
    .bind(item_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("BOQ item not found".to_string()))?;

    let (ordered_qty, _) =
        validate_item_update(current.ordered_qty, current.rate, req.ordered_qty, req.rate)
            .map_err(ApiError::BadRequest)?;

    if req.ordered_qty.is_some() {
        let billed: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(qty), 0) FROM boq_bill_details WHERE boq_item_id = $1",
        )
        .bind(item_id)
        .fetch_one(&state.db)
        .await?;
        validate_ordered_reduction(billed, ordered_qty).map_err(ApiError::BadRequest)?;
    }

    let item = sqlx::query_as::<_, BoqItem>(
        "UPDATE boq_items SET \
           item_code = COALESCE($3, item_code), \
           description = COALESCE($4, description), \
           unit = COALESCE($5, unit), \
           ordered_qty = COALESCE($6, ordered_qty), \
           rate = COALESCE($7, rate) \
         WHERE id = $2 AND boq_id = $1 RETURNING *",
    )
    .bind(boq_id)
    .bind(item_id)
    .bind(&req.item_code)
    .bind(&req.description)
    .bind(&req.unit)
    .bind(req.ordered_qty)
    .bind(req.rate)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::from_write(e, "item code already exists on this BOQ"))?
    .ok_or_else(|| ApiError::NotFound("BOQ item not found".to_string()))?;

    Ok(DataResponse::new(item))
}

pub async fn delete_boq_item(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((boq_id, item_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;

    let deleted = sqlx::query("DELETE FROM boq_items WHERE id = $2 AND boq_id = $1")
        .bind(boq_id)
        .bind(item_id)
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::from_delete(e, "item appears on bills"))?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("BOQ item not found".to_string()));
    }

    Ok(NoContent)
}

/// Billed-vs-ordered reconciliation across all bills of the BOQ.
pub async fn get_boq_progress(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(boq_id): Path<Uuid>,
) -> ApiResult<DataResponse<BoqProgress>> {
    auth.require(Role::Viewer)?;

    fetch_boq(&state, boq_id).await?;

    let items = sqlx::query_as::<_, BoqItemProgress>(
        "SELECT i.id AS item_id, i.item_code, i.description, i.unit, \
                i.ordered_qty, i.rate, \
                COALESCE(SUM(d.qty), 0) AS billed_qty, \
                i.ordered_qty - COALESCE(SUM(d.qty), 0) AS balance_qty, \
                ROUND(i.ordered_qty * i.rate, 2) AS ordered_amount, \
                COALESCE(SUM(d.amount), 0) AS billed_amount \
         FROM boq_items i \
         LEFT JOIN boq_bill_details d ON d.boq_item_id = i.id \
         WHERE i.boq_id = $1 \
         GROUP BY i.id \
         ORDER BY i.item_code",
    )
    .bind(boq_id)
    .fetch_all(&state.db)
    .await?;

    Ok(DataResponse::new(BoqProgress::new(boq_id, items)))
}
