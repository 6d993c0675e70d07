//! Manpower, suppliers and inter-site transfer handlers.

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
use crate::domain::manpower::{
    validate_transfer_sites, CreateManpowerRequest, CreateSupplierRequest, CreateTransferRequest,
    Manpower, ManpowerSupplier, ManpowerTransfer, SiteAssignment, TransferStatus,
    UpdateManpowerRequest, UpdateSupplierRequest, MANPOWER_STATUSES,
};
use crate::error::{ApiError, ApiResult};

// Suppliers

pub async fn list_suppliers(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Paginated<ManpowerSupplier>> {
    auth.require(Role::Viewer)?;

    let pattern = params.search_pattern();
    let sort = params.sort_column(&["name", "created_at"], "name");

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM manpower_suppliers WHERE ($1::text IS NULL OR name ILIKE $1)",
    )
    .bind(pattern.as_deref())
    .fetch_one(&state.db)
    .await?;

    let sql = format!(
        "SELECT * FROM manpower_suppliers WHERE ($1::text IS NULL OR name ILIKE $1) \
         ORDER BY {} {} LIMIT $2 OFFSET $3",
        sort,
        params.order.as_sql()
    );
    let suppliers = sqlx::query_as::<_, ManpowerSupplier>(&sql)
        .bind(pattern.as_deref())
        .bind(params.pagination().limit() as i64)
        .bind(params.pagination().offset() as i64)
        .fetch_all(&state.db)
        .await?;

    Ok(Paginated::new(suppliers, &params.pagination(), total as u64))
}

pub async fn create_supplier(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSupplierRequest>,
) -> ApiResult<Created<ManpowerSupplier>> {
    auth.require(Role::Accountant)?;

    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let supplier = sqlx::query_as::<_, ManpowerSupplier>(
        "INSERT INTO manpower_suppliers (name, contact_name, phone) \
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(req.name.trim())
    .bind(&req.contact_name)
    .bind(&req.phone)
    .fetch_one(&state.db)
    .await?;

    Ok(Created(supplier))
}

pub async fn update_supplier(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(supplier_id): Path<Uuid>,
    Json(req): Json<UpdateSupplierRequest>,
) -> ApiResult<DataResponse<ManpowerSupplier>> {
    auth.require(Role::Accountant)?;

    let supplier = sqlx::query_as::<_, ManpowerSupplier>(
        "UPDATE manpower_suppliers SET \
           name = COALESCE($2, name), \
           contact_name = COALESCE($3, contact_name), \
           phone = COALESCE($4, phone), \
           updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(supplier_id)
    .bind(&req.name)
    .bind(&req.contact_name)
    .bind(&req.phone)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("supplier not found".to_string()))?;

    Ok(DataResponse::new(supplier))
}

pub async fn delete_supplier(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(supplier_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;

    let deleted = sqlx::query("DELETE FROM manpower_suppliers WHERE id = $1")
        .bind(supplier_id)
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::from_delete(e, "supplier has workers on record"))?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("supplier not found".to_string()));
    }

    Ok(NoContent)
}

// Workers

pub async fn list_manpower(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Paginated<Manpower>> {
    auth.require(Role::Viewer)?;

    let pattern = params.search_pattern();
    let sort = params.sort_column(&["name", "category", "daily_wage", "created_at"], "name");

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM manpower \
         WHERE ($1::text IS NULL OR name ILIKE $1 OR category ILIKE $1 OR skillset ILIKE $1)",
    )
    .bind(pattern.as_deref())
    .fetch_one(&state.db)
    .await?;

    let sql = format!(
        "SELECT * FROM manpower \
         WHERE ($1::text IS NULL OR name ILIKE $1 OR category ILIKE $1 OR skillset ILIKE $1) \
         ORDER BY {} {} LIMIT $2 OFFSET $3",
        sort,
        params.order.as_sql()
    );
    let workers = sqlx::query_as::<_, Manpower>(&sql)
        .bind(pattern.as_deref())
        .bind(params.pagination().limit() as i64)
        .bind(params.pagination().offset() as i64)
        .fetch_all(&state.db)
        .await?;

    Ok(Paginated::new(workers, &params.pagination(), total as u64))
}

pub async fn get_manpower(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(manpower_id): Path<Uuid>,
) -> ApiResult<DataResponse<Manpower>> {
    auth.require(Role::Viewer)?;

    let worker = sqlx::query_as::<_, Manpower>("SELECT * FROM manpower WHERE id = $1")
        .bind(manpower_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("worker not found".to_string()))?;

    Ok(DataResponse::new(worker))
}

pub async fn create_manpower(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateManpowerRequest>,
) -> ApiResult<Created<Manpower>> {
    auth.require(Role::Accountant)?;

    if req.name.trim().is_empty() || req.category.trim().is_empty() {
        return Err(ApiError::BadRequest("name and category are required".to_string()));
    }
    if req.daily_wage < Decimal::ZERO {
        return Err(ApiError::BadRequest("daily_wage must not be negative".to_string()));
    }

    let mut tx = state.db.begin().await?;

    let worker = sqlx::query_as::<_, Manpower>(
        "INSERT INTO manpower (supplier_id, name, category, skillset, daily_wage) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(req.supplier_id)
    .bind(req.name.trim())
    .bind(req.category.trim())
    .bind(&req.skillset)
    .bind(req.daily_wage)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| ApiError::from_write(e, "duplicate worker"))?;

    if let Some(site_id) = req.site_id {
        sqlx::query("INSERT INTO site_assignments (manpower_id, site_id) VALUES ($1, $2)")
            .bind(worker.id)
            .bind(site_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ApiError::from_write(e, "worker is already assigned"))?;
    }

    tx.commit().await?;

    Ok(Created(worker))
}

pub async fn update_manpower(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(manpower_id): Path<Uuid>,
    Json(req): Json<UpdateManpowerRequest>,
) -> ApiResult<DataResponse<Manpower>> {
    auth.require(Role::Accountant)?;

    if let Some(status) = &req.status {
        if !MANPOWER_STATUSES.contains(&status.as_str()) {
            return Err(ApiError::BadRequest(format!("unknown status '{}'", status)));
        }
    }
    if let Some(wage) = req.daily_wage {
        if wage < Decimal::ZERO {
            return Err(ApiError::BadRequest("daily_wage must not be negative".to_string()));
        }
    }

    let worker = sqlx::query_as::<_, Manpower>(
        "UPDATE manpower SET \
           supplier_id = COALESCE($2, supplier_id), \
           name = COALESCE($3, name), \
           category = COALESCE($4, category), \
           skillset = COALESCE($5, skillset), \
           daily_wage = COALESCE($6, daily_wage), \
           status = COALESCE($7, status), \
           updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(manpower_id)
    .bind(req.supplier_id)
    .bind(&req.name)
    .bind(&req.category)
    .bind(&req.skillset)
    .bind(req.daily_wage)
    .bind(&req.status)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("worker not found".to_string()))?;

    Ok(DataResponse::new(worker))
}

pub async fn delete_manpower(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(manpower_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;

    let deleted = sqlx::query("DELETE FROM manpower WHERE id = $1")
        .bind(manpower_id)
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::from_delete(e, "worker has assignments or transfers"))?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("worker not found".to_string()));
    }

    Ok(NoContent)
}

/// Current site assignment for a worker, if any.
pub async fn get_assignment(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(manpower_id): Path<Uuid>,
) -> ApiResult<DataResponse<Option<SiteAssignment>>> {
    auth.require(Role::Viewer)?;

    let assignment = sqlx::query_as::<_, SiteAssignment>(
        "SELECT * FROM site_assignments WHERE manpower_id = $1",
    )
    .bind(manpower_id)
    .fetch_optional(&state.db)
    .await?;

    Ok(DataResponse::new(assignment))
}

// Transfers

pub async fn list_transfers(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Paginated<ManpowerTransfer>> {
    auth.require(Role::Viewer)?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM manpower_transfers")
        .fetch_one(&state.db)
        .await?;

    let sort = params.sort_column(&["created_at", "status"], "created_at");
    let sql = format!(
        "SELECT * FROM manpower_transfers ORDER BY {} {} LIMIT $1 OFFSET $2",
        sort,
        params.order.as_sql()
    );
    let transfers = sqlx::query_as::<_, ManpowerTransfer>(&sql)
        .bind(params.pagination().limit() as i64)
        .bind(params.pagination().offset() as i64)
        .fetch_all(&state.db)
        .await?;

    Ok(Paginated::new(transfers, &params.pagination(), total as u64))
}

pub async fn create_transfer(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTransferRequest>,
) -> ApiResult<Created<ManpowerTransfer>> {
    auth.require(Role::Accountant)?;

    let assignment = sqlx::query_as::<_, SiteAssignment>(
        "SELECT * FROM site_assignments WHERE manpower_id = $1",
    )
    .bind(req.manpower_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| {
        ApiError::BadRequest("worker has no current site assignment".to_string())
    })?;

    validate_transfer_sites(assignment.site_id, req.to_site_id).map_err(ApiError::BadRequest)?;

    let pending: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM manpower_transfers \
         WHERE manpower_id = $1 AND status = 'pending')",
    )
    .bind(req.manpower_id)
    .fetch_one(&state.db)
    .await?;
    if pending {
        return Err(ApiError::Conflict(
            "a pending transfer already exists for this worker".to_string(),
        ));
    }

    let transfer = sqlx::query_as::<_, ManpowerTransfer>(
        "INSERT INTO manpower_transfers (manpower_id, from_site_id, to_site_id, requested_by) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(req.manpower_id)
    .bind(assignment.site_id)
    .bind(req.to_site_id)
    .bind(auth.user_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        // The partial unique index catches a race past the pre-check
        ApiError::from_write(e, "a pending transfer already exists for this worker")
    })?;

    Ok(Created(transfer))
}

/// Accepts a pending transfer: drops the old assignment, writes an audit
/// row and creates the new assignment in one transaction.
pub async fn accept_transfer(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(transfer_id): Path<Uuid>,
) -> ApiResult<DataResponse<ManpowerTransfer>> {
    auth.require(Role::Manager)?;

    let transfer = sqlx::query_as::<_, ManpowerTransfer>(
        "SELECT * FROM manpower_transfers WHERE id = $1",
    )
    .bind(transfer_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("transfer not found".to_string()))?;

    if !transfer.status.is_decidable() {
        return Err(ApiError::Conflict("transfer has already been decided".to_string()));
    }

    let mut tx = state.db.begin().await?;

    sqlx::query("DELETE FROM site_assignments WHERE manpower_id = $1")
        .bind(transfer.manpower_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO manpower_logs (manpower_id, from_site_id, to_site_id, actor, note) \
         VALUES ($1, $2, $3, $4, 'transfer accepted')",
    )
    .bind(transfer.manpower_id)
    .bind(transfer.from_site_id)
    .bind(transfer.to_site_id)
    .bind(auth.user_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO site_assignments (manpower_id, site_id) VALUES ($1, $2)")
        .bind(transfer.manpower_id)
        .bind(transfer.to_site_id)
        .execute(&mut *tx)
        .await?;

    let transfer = sqlx::query_as::<_, ManpowerTransfer>(
        "UPDATE manpower_transfers \
         SET status = $2, decided_by = $3, decided_at = now() \
         WHERE id = $1 AND status = 'pending' RETURNING *",
    )
    .bind(transfer_id)
    .bind(TransferStatus::Accepted)
    .bind(auth.user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::Conflict("transfer was decided concurrently".to_string()))?;

    tx.commit().await?;

    tracing::info!(
        user_id = %auth.user_id,
        transfer_id = %transfer_id,
        manpower_id = %transfer.manpower_id,
        "Manpower transfer accepted"
    );

    Ok(DataResponse::new(transfer))
}

pub async fn reject_transfer(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(transfer_id): Path<Uuid>,
) -> ApiResult<DataResponse<ManpowerTransfer>> {
    auth.require(Role::Manager)?;

    let transfer = sqlx::query_as::<_, ManpowerTransfer>(
        "UPDATE manpower_transfers \
         SET status = $2, decided_by = $3, decided_at = now() \
         WHERE id = $1 AND status = 'pending' RETURNING *",
    )
    .bind(transfer_id)
    .bind(TransferStatus::Rejected)
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await?;

    match transfer {
        Some(t) => Ok(DataResponse::new(t)),
        None => {
            // Distinguish a missing transfer from an already-decided one
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM manpower_transfers WHERE id = $1)",
            )
            .bind(transfer_id)
            .fetch_one(&state.db)
            .await?;
            if exists {
                Err(ApiError::Conflict("transfer has already been decided".to_string()))
            } else {
                Err(ApiError::NotFound("transfer not found".to_string()))
            }
        }
    }
}
