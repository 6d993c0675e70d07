//! BOQ bill handlers. Detail replacement and the billed-quantity checks run
//! inside a single transaction so a failed line leaves nothing behind.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, ListParams, NoContent, Paginated};
use crate::app::AppState;
use crate::auth::{RequireAuth, Role};
use crate::domain::bills::{
    bill_total, validate_billed_qty, BillLineInput, BillResponse, BoqBill, BoqBillDetail,
    CreateBillRequest, UpdateBillRequest,
};
use crate::domain::boqs::line_amount;
use crate::error::{ApiError, ApiResult};

#[derive(sqlx::FromRow)]
struct ItemFigures {
    ordered_qty: Decimal,
    rate: Decimal,
}

/// Inserts the given lines for `bill_id`, enforcing cumulative billed qty
/// ≤ ordered qty per item. Returns the bill total.
async fn insert_details(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    boq_id: Uuid,
    bill_id: Uuid,
    details: &[BillLineInput],
) -> ApiResult<Decimal> {
    if details.is_empty() {
        return Err(ApiError::BadRequest("bill must have at least one line".to_string()));
    }

    let mut seen = HashSet::new();
    for line in details {
        if !seen.insert(line.boq_item_id) {
            return Err(ApiError::BadRequest(
                "duplicate BOQ item in bill lines".to_string(),
            ));
        }
    }

    let mut amounts = Vec::with_capacity(details.len());
    for line in details {
        let item = sqlx::query_as::<_, ItemFigures>(
            "SELECT ordered_qty, rate FROM boq_items WHERE id = $1 AND boq_id = $2",
        )
        .bind(line.boq_item_id)
        .bind(boq_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| {
            ApiError::BadRequest(format!("BOQ item {} not found on this BOQ", line.boq_item_id))
        })?;

        // Billed so far on the item, excluding the bill being written
        let already_billed: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(d.qty), 0) FROM boq_bill_details d \
             WHERE d.boq_item_id = $1 AND d.bill_id <> $2",
        )
        .bind(line.boq_item_id)
        .bind(bill_id)
        .fetch_one(&mut **tx)
        .await?;

        validate_billed_qty(item.ordered_qty, already_billed, line.qty)
            .map_err(ApiError::BadRequest)?;

        let amount = line_amount(line.qty, item.rate);
        sqlx::query(
            "INSERT INTO boq_bill_details (bill_id, boq_item_id, qty, rate, amount) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(bill_id)
        .bind(line.boq_item_id)
        .bind(line.qty)
        .bind(item.rate)
        .bind(amount)
        .execute(&mut **tx)
        .await?;

        amounts.push(amount);
    }

    Ok(bill_total(&amounts))
}

async fn fetch_details(state: &AppState, bill_id: Uuid) -> ApiResult<Vec<BoqBillDetail>> {
    Ok(sqlx::query_as::<_, BoqBillDetail>(
        "SELECT * FROM boq_bill_details WHERE bill_id = $1",
    )
    .bind(bill_id)
    .fetch_all(&state.db)
    .await?)
}

pub async fn list_bills(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(boq_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Paginated<BoqBill>> {
    auth.require(Role::Viewer)?;

    let pattern = params.search_pattern();
    let sort = params.sort_column(&["bill_no", "bill_date", "total_amount", "created_at"], "bill_date");

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM boq_bills \
         WHERE boq_id = $1 AND ($2::text IS NULL OR bill_no ILIKE $2)",
    )
    .bind(boq_id)
    .bind(pattern.as_deref())
    .fetch_one(&state.db)
    .await?;

    let sql = format!(
        "SELECT * FROM boq_bills \
         WHERE boq_id = $1 AND ($2::text IS NULL OR bill_no ILIKE $2) \
         ORDER BY {} {} LIMIT $3 OFFSET $4",
        sort,
        params.order.as_sql()
    );
    let bills = sqlx::query_as::<_, BoqBill>(&sql)
        .bind(boq_id)
        .bind(pattern.as_deref())
        .bind(params.pagination().limit() as i64)
        .bind(params.pagination().offset() as i64)
        .fetch_all(&state.db)
        .await?;

    Ok(Paginated::new(bills, &params.pagination(), total as u64))
}

pub async fn get_bill(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((boq_id, bill_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<DataResponse<BillResponse>> {
    auth.require(Role::Viewer)?;

    let bill = sqlx::query_as::<_, BoqBill>(
        "SELECT * FROM boq_bills WHERE id = $2 AND boq_id = $1",
    )
    .bind(boq_id)
    .bind(bill_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("bill not found".to_string()))?;

    let details = fetch_details(&state, bill.id).await?;

    Ok(DataResponse::new(BillResponse { bill, details }))
}

pub async fn create_bill(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(boq_id): Path<Uuid>,
    Json(req): Json<CreateBillRequest>,
) -> ApiResult<Created<BillResponse>> {
    auth.require(Role::Accountant)?;

    if req.bill_no.trim().is_empty() {
        return Err(ApiError::BadRequest("bill_no is required".to_string()));
    }

    let boq_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM boqs WHERE id = $1)")
        .bind(boq_id)
        .fetch_one(&state.db)
        .await?;
    if !boq_exists {
        return Err(ApiError::NotFound("BOQ not found".to_string()));
    }

    let mut tx = state.db.begin().await?;

    let bill = sqlx::query_as::<_, BoqBill>(
        "INSERT INTO boq_bills (boq_id, bill_no, bill_date) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(boq_id)
    .bind(req.bill_no.trim())
    .bind(req.bill_date)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| ApiError::from_write(e, "bill number already exists for this BOQ"))?;

    let total = insert_details(&mut tx, boq_id, bill.id, &req.details).await?;

    let bill = sqlx::query_as::<_, BoqBill>(
        "UPDATE boq_bills SET total_amount = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(bill.id)
    .bind(total)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        user_id = %auth.user_id,
        bill_id = %bill.id,
        total = %bill.total_amount,
        "BOQ bill created"
    );

    let details = fetch_details(&state, bill.id).await?;
    Ok(Created(BillResponse { bill, details }))
}

pub async fn update_bill(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((boq_id, bill_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateBillRequest>,
) -> ApiResult<DataResponse<BillResponse>> {
    auth.require(Role::Accountant)?;

    let mut tx = state.db.begin().await?;

    let bill = sqlx::query_as::<_, BoqBill>(
        "UPDATE boq_bills SET \
           bill_no = COALESCE($3, bill_no), \
           bill_date = COALESCE($4, bill_date), \
           updated_at = now() \
         WHERE id = $2 AND boq_id = $1 RETURNING *",
    )
    .bind(boq_id)
    .bind(bill_id)
    .bind(&req.bill_no)
    .bind(req.bill_date)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| ApiError::from_write(e, "bill number already exists for this BOQ"))?
    .ok_or_else(|| ApiError::NotFound("bill not found".to_string()))?;

    let bill = if let Some(details) = &req.details {
        // Full replacement of the line set
        sqlx::query("DELETE FROM boq_bill_details WHERE bill_id = $1")
            .bind(bill.id)
            .execute(&mut *tx)
            .await?;

        let total = insert_details(&mut tx, boq_id, bill.id, details).await?;

        sqlx::query_as::<_, BoqBill>(
            "UPDATE boq_bills SET total_amount = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(bill.id)
        .bind(total)
        .fetch_one(&mut *tx)
        .await?
    } else {
        bill
    };

    tx.commit().await?;

    let details = fetch_details(&state, bill.id).await?;
    Ok(DataResponse::new(BillResponse { bill, details }))
}

pub async fn delete_bill(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((boq_id, bill_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;

    // Details go with the bill via ON DELETE CASCADE
    let deleted = sqlx::query("DELETE FROM boq_bills WHERE id = $2 AND boq_id = $1")
        .bind(boq_id)
        .bind(bill_id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("bill not found".to_string()));
    }

    tracing::info!(user_id = %auth.user_id, bill_id = %bill_id, "BOQ bill deleted");

    Ok(NoContent)
}
