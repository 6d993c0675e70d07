//! Employee and payslip handlers. Payslip figures are computed server-side
//! from the employee's basic salary and the submitted allowances/deductions.

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
use crate::domain::payroll::{
    compute_payslip, normalize_month, CreateEmployeeRequest, CreatePayslipRequest, Employee,
    Payslip, UpdateEmployeeRequest,
};
use crate::error::{ApiError, ApiResult};

pub async fn list_employees(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Paginated<Employee>> {
    auth.require(Role::Viewer)?;

    let pattern = params.search_pattern();
    let sort = params.sort_column(&["emp_code", "name", "basic_salary", "created_at"], "emp_code");

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM employees \
         WHERE ($1::text IS NULL OR emp_code ILIKE $1 OR name ILIKE $1 OR designation ILIKE $1)",
    )
    .bind(pattern.as_deref())
    .fetch_one(&state.db)
    .await?;

    let sql = format!(
        "SELECT * FROM employees \
         WHERE ($1::text IS NULL OR emp_code ILIKE $1 OR name ILIKE $1 OR designation ILIKE $1) \
         ORDER BY {} {} LIMIT $2 OFFSET $3",
        sort,
        params.order.as_sql()
    );
    let employees = sqlx::query_as::<_, Employee>(&sql)
        .bind(pattern.as_deref())
        .bind(params.pagination().limit() as i64)
        .bind(params.pagination().offset() as i64)
        .fetch_all(&state.db)
        .await?;

    Ok(Paginated::new(employees, &params.pagination(), total as u64))
}

pub async fn get_employee(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(employee_id): Path<Uuid>,
) -> ApiResult<DataResponse<Employee>> {
    auth.require(Role::Viewer)?;

    let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
        .bind(employee_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("employee not found".to_string()))?;

    Ok(DataResponse::new(employee))
}

pub async fn create_employee(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEmployeeRequest>,
) -> ApiResult<Created<Employee>> {
    auth.require(Role::Accountant)?;

    if req.emp_code.trim().is_empty() || req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("emp_code and name are required".to_string()));
    }
    if req.basic_salary < Decimal::ZERO {
        return Err(ApiError::BadRequest("basic_salary must not be negative".to_string()));
    }

    let employee = sqlx::query_as::<_, Employee>(
        "INSERT INTO employees (emp_code, name, department_id, designation, basic_salary) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(req.emp_code.trim())
    .bind(req.name.trim())
    .bind(req.department_id)
    .bind(&req.designation)
    .bind(req.basic_salary)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::from_write(e, "employee code already exists"))?;

    Ok(Created(employee))
}

pub async fn update_employee(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(employee_id): Path<Uuid>,
    Json(req): Json<UpdateEmployeeRequest>,
) -> ApiResult<DataResponse<Employee>> {
    auth.require(Role::Accountant)?;

    if let Some(salary) = req.basic_salary {
        if salary < Decimal::ZERO {
            return Err(ApiError::BadRequest("basic_salary must not be negative".to_string()));
        }
    }

    let employee = sqlx::query_as::<_, Employee>(
        "UPDATE employees SET \
           emp_code = COALESCE($2, emp_code), \
           name = COALESCE($3, name), \
           department_id = COALESCE($4, department_id), \
           designation = COALESCE($5, designation), \
           basic_salary = COALESCE($6, basic_salary), \
           updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(employee_id)
    .bind(&req.emp_code)
    .bind(&req.name)
    .bind(req.department_id)
    .bind(&req.designation)
    .bind(req.basic_salary)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::from_write(e, "employee code already exists"))?
    .ok_or_else(|| ApiError::NotFound("employee not found".to_string()))?;

    Ok(DataResponse::new(employee))
}

pub async fn delete_employee(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(employee_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;

    let deleted = sqlx::query("DELETE FROM employees WHERE id = $1")
        .bind(employee_id)
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::from_delete(e, "employee has payslips"))?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("employee not found".to_string()));
    }

    Ok(NoContent)
}

// Payslips

#[derive(Debug, serde::Deserialize)]
pub struct PayslipFilter {
    pub employee_id: Option<Uuid>,
}

pub async fn list_payslips(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
    Query(filter): Query<PayslipFilter>,
) -> ApiResult<Paginated<Payslip>> {
    auth.require(Role::Viewer)?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM payslips WHERE ($1::uuid IS NULL OR employee_id = $1)",
    )
    .bind(filter.employee_id)
    .fetch_one(&state.db)
    .await?;

    let sort = params.sort_column(&["month", "net", "created_at"], "month");
    let sql = format!(
        "SELECT * FROM payslips WHERE ($1::uuid IS NULL OR employee_id = $1) \
         ORDER BY {} {} LIMIT $2 OFFSET $3",
        sort,
        params.order.as_sql()
    );
    let payslips = sqlx::query_as::<_, Payslip>(&sql)
        .bind(filter.employee_id)
        .bind(params.pagination().limit() as i64)
        .bind(params.pagination().offset() as i64)
        .fetch_all(&state.db)
        .await?;

    Ok(Paginated::new(payslips, &params.pagination(), total as u64))
}

pub async fn get_payslip(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(payslip_id): Path<Uuid>,
) -> ApiResult<DataResponse<Payslip>> {
    auth.require(Role::Viewer)?;

    let payslip = sqlx::query_as::<_, Payslip>("SELECT * FROM payslips WHERE id = $1")
        .bind(payslip_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("payslip not found".to_string()))?;

    Ok(DataResponse::new(payslip))
}

pub async fn create_payslip(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePayslipRequest>,
) -> ApiResult<Created<Payslip>> {
    auth.require(Role::Accountant)?;

    let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
        .bind(req.employee_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("employee not found".to_string()))?;

    let basic = req.basic.unwrap_or(employee.basic_salary);
    let allowances = req.allowances.unwrap_or(Decimal::ZERO);
    let deductions = req.deductions.unwrap_or(Decimal::ZERO);
    let figures = compute_payslip(basic, allowances, deductions).map_err(ApiError::BadRequest)?;

    let payslip = sqlx::query_as::<_, Payslip>(
        "INSERT INTO payslips (employee_id, month, basic, allowances, deductions, gross, net) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(req.employee_id)
    .bind(normalize_month(req.month))
    .bind(basic)
    .bind(allowances)
    .bind(deductions)
    .bind(figures.gross)
    .bind(figures.net)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::from_write(e, "payslip already exists for this month"))?;

    tracing::info!(
        user_id = %auth.user_id,
        payslip_id = %payslip.id,
        employee_id = %payslip.employee_id,
        "Payslip created"
    );

    Ok(Created(payslip))
}

pub async fn delete_payslip(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(payslip_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require(Role::Admin)?;

    let deleted = sqlx::query("DELETE FROM payslips WHERE id = $1")
        .bind(payslip_id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("payslip not found".to_string()));
    }

    Ok(NoContent)
}
