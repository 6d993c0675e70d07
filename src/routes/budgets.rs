//! Cashbook budget handlers, including the linear approval chain.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, ListParams, NoContent, Paginated};
use crate::app::AppState;
use crate::auth::{AuthContext, RequireAuth, Role};
use crate::domain::budgets::{
    price_items, ApprovalStage, BudgetItem, BudgetItemInput, BudgetResponse, CashbookBudget,
    CreateBudgetRequest, UpdateBudgetRequest,
};
use crate::domain::payroll::normalize_month;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, serde::Deserialize)]
pub struct BudgetFilter {
    pub site_id: Option<Uuid>,
    pub stage: Option<ApprovalStage>,
}

async fn fetch_budget(state: &AppState, budget_id: Uuid) -> ApiResult<CashbookBudget> {
    sqlx::query_as::<_, CashbookBudget>("SELECT * FROM cashbook_budgets WHERE id = $1")
        .bind(budget_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("budget not found".to_string()))
}

async fn fetch_items(state: &AppState, budget_id: Uuid) -> ApiResult<Vec<BudgetItem>> {
    Ok(sqlx::query_as::<_, BudgetItem>(
        "SELECT * FROM budget_items WHERE budget_id = $1 ORDER BY category",
    )
    .bind(budget_id)
    .fetch_all(&state.db)
    .await?)
}

async fn insert_items(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    budget_id: Uuid,
    items: &[BudgetItemInput],
) -> ApiResult<rust_decimal::Decimal> {
    let (amounts, total) = price_items(items).map_err(ApiError::BadRequest)?;

    for (item, amount) in items.iter().zip(amounts) {
        sqlx::query(
            "INSERT INTO budget_items (budget_id, category, description, qty, rate, amount) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(budget_id)
        .bind(&item.category)
        .bind(&item.description)
        .bind(item.qty)
        .bind(item.rate)
        .bind(amount)
        .execute(&mut **tx)
        .await?;
    }

    sqlx::query("UPDATE cashbook_budgets SET total_amount = $2, updated_at = now() WHERE id = $1")
        .bind(budget_id)
        .bind(total)
        .execute(&mut **tx)
        .await?;

    Ok(total)
}

pub async fn list_budgets(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
    Query(filter): Query<BudgetFilter>,
) -> ApiResult<Paginated<CashbookBudget>> {
    auth.require(Role::Viewer)?;

    let pattern = params.search_pattern();
    let sort =
        params.sort_column(&["title", "period_month", "total_amount", "created_at"], "period_month");

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM cashbook_budgets \
         WHERE ($1::uuid IS NULL OR site_id = $1) \
           AND ($2::approval_stage IS NULL OR stage = $2) \
           AND ($3::text IS NULL OR title ILIKE $3)",
    )
    .bind(filter.site_id)
    .bind(filter.stage)
    .bind(pattern.as_deref())
    .fetch_one(&state.db)
    .await?;

    let sql = format!(
        "SELECT * FROM cashbook_budgets \
         WHERE ($1::uuid IS NULL OR site_id = $1) \
           AND ($2::approval_stage IS NULL OR stage = $2) \
           AND ($3::text IS NULL OR title ILIKE $3) \
         ORDER BY {} {} LIMIT $4 OFFSET $5",
        sort,
        params.order.as_sql()
    );
    let budgets = sqlx::query_as::<_, CashbookBudget>(&sql)
        .bind(filter.site_id)
        .bind(filter.stage)
        .bind(pattern.as_deref())
        .bind(params.pagination().limit() as i64)
        .bind(params.pagination().offset() as i64)
        .fetch_all(&state.db)
        .await?;

    Ok(Paginated::new(budgets, &params.pagination(), total as u64))
}

pub async fn get_budget(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(budget_id): Path<Uuid>,
) -> ApiResult<DataResponse<BudgetResponse>> {
    auth.require(Role::Viewer)?;

    let budget = fetch_budget(&state, budget_id).await?;
    let items = fetch_items(&state, budget_id).await?;

    Ok(DataResponse::new(BudgetResponse { budget, items }))
}

pub async fn create_budget(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBudgetRequest>,
) -> ApiResult<Created<BudgetResponse>> {
    auth.require(Role::Accountant)?;

    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    let mut tx = state.db.begin().await?;

    let budget = sqlx::query_as::<_, CashbookBudget>(
        "INSERT INTO cashbook_budgets (site_id, title, period_month, created_by) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(req.site_id)
    .bind(req.title.trim())
    .bind(normalize_month(req.period_month))
    .bind(auth.user_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| ApiError::from_write(e, "duplicate budget"))?;

    if !req.items.is_empty() {
        insert_items(&mut tx, budget.id, &req.items).await?;
    }

    tx.commit().await?;

    tracing::info!(user_id = %auth.user_id, budget_id = %budget.id, "Budget created");

    let budget = fetch_budget(&state, budget.id).await?;
    let items = fetch_items(&state, budget.id).await?;
    Ok(Created(BudgetResponse { budget, items }))
}

pub async fn update_budget(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(budget_id): Path<Uuid>,
    Json(req): Json<UpdateBudgetRequest>,
) -> ApiResult<DataResponse<CashbookBudget>> {
    auth.require(Role::Accountant)?;

    let current = fetch_budget(&state, budget_id).await?;
    if !current.stage.allows_item_edits() {
        return Err(ApiError::Conflict(format!(
            "budget is {} and can no longer be edited",
            current.stage.as_str()
        )));
    }

    let budget = sqlx::query_as::<_, CashbookBudget>(
        "UPDATE cashbook_budgets SET \
           title = COALESCE($2, title), \
           period_month = COALESCE($3, period_month), \
           updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(budget_id)
    .bind(&req.title)
    .bind(req.period_month.map(normalize_month))
    .fetch_one(&state.db)
    .await?;

    Ok(DataResponse::new(budget))
}

/// Replace the full item set; draft budgets only.
pub async fn replace_budget_items(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(budget_id): Path<Uuid>,
    Json(items): Json<Vec<BudgetItemInput>>,
) -> ApiResult<DataResponse<BudgetResponse>> {
    auth.require(Role::Accountant)?;

    let budget = fetch_budget(&state, budget_id).await?;
    if !budget.stage.allows_item_edits() {
        return Err(ApiError::Conflict(format!(
            "items cannot be changed once the budget is {}",
            budget.stage.as_str()
        )));
    }

    let mut tx = state.db.begin().await?;

    sqlx::query("DELETE FROM budget_items WHERE budget_id = $1")
        .bind(budget_id)
        .execute(&mut *tx)
        .await?;

    insert_items(&mut tx, budget_id, &items).await?;

    tx.commit().await?;

    let budget = fetch_budget(&state, budget_id).await?;
    let items = fetch_items(&state, budget_id).await?;
    Ok(DataResponse::new(BudgetResponse { budget, items }))
}

pub async fn delete_budget(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(budget_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;

    let deleted = sqlx::query("DELETE FROM cashbook_budgets WHERE id = $1")
        .bind(budget_id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("budget not found".to_string()));
    }

    Ok(NoContent)
}

async fn advance_stage(
    state: &AppState,
    auth: &AuthContext,
    budget_id: Uuid,
    target: ApprovalStage,
    actor_col: &str,
    stamp_col: &str,
) -> ApiResult<CashbookBudget> {
    let budget = fetch_budget(state, budget_id).await?;

    if !budget.stage.can_advance_to(target) {
        return Err(ApiError::Conflict(format!(
            "budget is {}; cannot move to {}",
            budget.stage.as_str(),
            target.as_str()
        )));
    }

    // Stage guard in the WHERE clause keeps concurrent approvals from
    // double-applying the same transition.
    let sql = format!(
        "UPDATE cashbook_budgets \
         SET stage = $2, {} = $3, {} = now(), updated_at = now() \
         WHERE id = $1 AND stage = $4 RETURNING *",
        actor_col, stamp_col
    );
    let updated = sqlx::query_as::<_, CashbookBudget>(&sql)
        .bind(budget_id)
        .bind(target)
        .bind(auth.user_id)
        .bind(budget.stage)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::Conflict("budget stage changed concurrently".to_string()))?;

    tracing::info!(
        user_id = %auth.user_id,
        budget_id = %budget_id,
        stage = updated.stage.as_str(),
        "Budget stage advanced"
    );

    Ok(updated)
}

pub async fn first_approve_budget(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(budget_id): Path<Uuid>,
) -> ApiResult<DataResponse<CashbookBudget>> {
    auth.require(Role::Manager)?;
    let budget = advance_stage(
        &state,
        &auth,
        budget_id,
        ApprovalStage::FirstApproved,
        "first_approved_by",
        "first_approved_at",
    )
    .await?;
    Ok(DataResponse::new(budget))
}

pub async fn approve_budget(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(budget_id): Path<Uuid>,
) -> ApiResult<DataResponse<CashbookBudget>> {
    auth.require(Role::Manager)?;
    let budget = advance_stage(
        &state,
        &auth,
        budget_id,
        ApprovalStage::Approved,
        "approved_by",
        "approved_at",
    )
    .await?;
    Ok(DataResponse::new(budget))
}

pub async fn accept_budget(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(budget_id): Path<Uuid>,
) -> ApiResult<DataResponse<CashbookBudget>> {
    auth.require(Role::Admin)?;
    let budget = advance_stage(
        &state,
        &auth,
        budget_id,
        ApprovalStage::Accepted,
        "accepted_by",
        "accepted_at",
    )
    .await?;
    Ok(DataResponse::new(budget))
}
