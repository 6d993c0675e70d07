use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, ListParams, NoContent, Paginated};
use crate::app::AppState;
use crate::auth::{RequireAuth, Role};
use crate::domain::cashbooks::{
    CashbookEntry, CashbookSummary, CreateEntryRequest, SummaryFilter, UpdateEntryRequest,
};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct EntryFilter {
    pub site_id: Option<Uuid>,
    pub boq_id: Option<Uuid>,
}

pub async fn list_entries(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
    Query(filter): Query<EntryFilter>,
) -> ApiResult<Paginated<CashbookEntry>> {
    auth.require(Role::Viewer)?;

    let pattern = params.search_pattern();
    let sort =
        params.sort_column(&["entry_date", "category", "amount", "created_at"], "entry_date");

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM cashbook_entries \
         WHERE ($1::uuid IS NULL OR site_id = $1) \
           AND ($2::uuid IS NULL OR boq_id = $2) \
           AND ($3::text IS NULL OR category ILIKE $3 OR voucher_no ILIKE $3)",
    )
    .bind(filter.site_id)
    .bind(filter.boq_id)
    .bind(pattern.as_deref())
    .fetch_one(&state.db)
    .await?;

    let sql = format!(
        "SELECT * FROM cashbook_entries \
         WHERE ($1::uuid IS NULL OR site_id = $1) \
           AND ($2::uuid IS NULL OR boq_id = $2) \
           AND ($3::text IS NULL OR category ILIKE $3 OR voucher_no ILIKE $3) \
         ORDER BY {} {} LIMIT $4 OFFSET $5",
        sort,
        params.order.as_sql()
    );
    let entries = sqlx::query_as::<_, CashbookEntry>(&sql)
        .bind(filter.site_id)
        .bind(filter.boq_id)
        .bind(pattern.as_deref())
        .bind(params.pagination().limit() as i64)
        .bind(params.pagination().offset() as i64)
        .fetch_all(&state.db)
        .await?;

    Ok(Paginated::new(entries, &params.pagination(), total as u64))
}

pub async fn get_entry(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(entry_id): Path<Uuid>,
) -> ApiResult<DataResponse<CashbookEntry>> {
    auth.require(Role::Viewer)?;

    let entry = sqlx::query_as::<_, CashbookEntry>("SELECT * FROM cashbook_entries WHERE id = $1")
        .bind(entry_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("cashbook entry not found".to_string()))?;

    Ok(DataResponse::new(entry))
}

pub async fn create_entry(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEntryRequest>,
) -> ApiResult<Created<CashbookEntry>> {
    auth.require(Role::Accountant)?;

    if req.amount <= Decimal::ZERO {
        return Err(ApiError::BadRequest("amount must be positive".to_string()));
    }
    if req.category.trim().is_empty() {
        return Err(ApiError::BadRequest("category is required".to_string()));
    }

    let entry = sqlx::query_as::<_, CashbookEntry>(
        "INSERT INTO cashbook_entries \
           (site_id, boq_id, entry_date, kind, category, description, voucher_no, amount, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(req.site_id)
    .bind(req.boq_id)
    .bind(req.entry_date)
    .bind(req.kind)
    .bind(req.category.trim())
    .bind(&req.description)
    .bind(&req.voucher_no)
    .bind(req.amount)
    .bind(auth.user_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::from_write(e, "duplicate cashbook entry"))?;

    Ok(Created(entry))
}

pub async fn update_entry(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<UpdateEntryRequest>,
) -> ApiResult<DataResponse<CashbookEntry>> {
    auth.require(Role::Accountant)?;

    if let Some(amount) = req.amount {
        if amount <= Decimal::ZERO {
            return Err(ApiError::BadRequest("amount must be positive".to_string()));
        }
    }

    let entry = sqlx::query_as::<_, CashbookEntry>(
        "UPDATE cashbook_entries SET \
           entry_date = COALESCE($2, entry_date), \
           kind = COALESCE($3, kind), \
           category = COALESCE($4, category), \
           description = COALESCE($5, description), \
           voucher_no = COALESCE($6, voucher_no), \
           amount = COALESCE($7, amount), \
           updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(entry_id)
    .bind(req.entry_date)
    .bind(req.kind)
    .bind(&req.category)
    .bind(&req.description)
    .bind(&req.voucher_no)
    .bind(req.amount)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("cashbook entry not found".to_string()))?;

    Ok(DataResponse::new(entry))
}

pub async fn delete_entry(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(entry_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;

    let deleted = sqlx::query("DELETE FROM cashbook_entries WHERE id = $1")
        .bind(entry_id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("cashbook entry not found".to_string()));
    }

    Ok(NoContent)
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    total_receipts: Decimal,
    total_payments: Decimal,
}

/// Receipts/payments totals and balance for a site, optionally date-bounded.
pub async fn site_summary(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<Uuid>,
    Query(filter): Query<SummaryFilter>,
) -> ApiResult<DataResponse<CashbookSummary>> {
    auth.require(Role::Viewer)?;

    let site_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sites WHERE id = $1)")
        .bind(site_id)
        .fetch_one(&state.db)
        .await?;
    if !site_exists {
        return Err(ApiError::NotFound("site not found".to_string()));
    }

    let row = sqlx::query_as::<_, SummaryRow>(
        "SELECT \
           COALESCE(SUM(amount) FILTER (WHERE kind = 'receipt'), 0) AS total_receipts, \
           COALESCE(SUM(amount) FILTER (WHERE kind = 'payment'), 0) AS total_payments \
         FROM cashbook_entries \
         WHERE site_id = $1 \
           AND ($2::date IS NULL OR entry_date >= $2) \
           AND ($3::date IS NULL OR entry_date <= $3)",
    )
    .bind(site_id)
    .bind(filter.from)
    .bind(filter.to)
    .fetch_one(&state.db)
    .await?;

    Ok(DataResponse::new(CashbookSummary::new(
        row.total_receipts,
        row.total_payments,
    )))
}
