//! Employees and payslips. Gross/net are always computed server-side.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub emp_code: String,
    pub name: String,
    pub department_id: Option<Uuid>,
    pub designation: Option<String>,
    pub basic_salary: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEmployeeRequest {
    pub emp_code: String,
    pub name: String,
    #[serde(default)]
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub designation: Option<String>,
    pub basic_salary: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmployeeRequest {
    #[serde(default)]
    pub emp_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub basic_salary: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payslip {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub month: NaiveDate,
    pub basic: Decimal,
    pub allowances: Decimal,
    pub deductions: Decimal,
    pub gross: Decimal,
    pub net: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePayslipRequest {
    pub employee_id: Uuid,
    /// Any day of the target month; normalised to the first
    pub month: NaiveDate,
    /// Defaults to the employee's basic salary
    #[serde(default)]
    pub basic: Option<Decimal>,
    #[serde(default)]
    pub allowances: Option<Decimal>,
    #[serde(default)]
    pub deductions: Option<Decimal>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct PayslipFigures {
    pub gross: Decimal,
    pub net: Decimal,
}

/// gross = basic + allowances, net = gross - deductions.
/// All components must be non-negative.
pub fn compute_payslip(
    basic: Decimal,
    allowances: Decimal,
    deductions: Decimal,
) -> Result<PayslipFigures, String> {
    if basic < Decimal::ZERO || allowances < Decimal::ZERO || deductions < Decimal::ZERO {
        return Err("payslip components must not be negative".to_string());
    }
    let gross = basic + allowances;
    if deductions > gross {
        return Err("deductions exceed gross pay".to_string());
    }
    Ok(PayslipFigures {
        gross,
        net: gross - deductions,
    })
}

/// Snaps a date to the first of its month, for the per-month uniqueness key.
pub fn normalize_month(d: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(d.year(), d.month(), 1).unwrap_or(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn gross_and_net_arithmetic() {
        let f = compute_payslip(dec!(30000), dec!(4500), dec!(1800)).unwrap();
        assert_eq!(f.gross, dec!(34500));
        assert_eq!(f.net, dec!(32700));
    }

    #[test]
    fn zero_extras_leave_basic_untouched() {
        let f = compute_payslip(dec!(25000), dec!(0), dec!(0)).unwrap();
        assert_eq!(f.gross, dec!(25000));
        assert_eq!(f.net, dec!(25000));
    }

    #[test]
    fn negative_components_are_rejected() {
        assert!(compute_payslip(dec!(-1), dec!(0), dec!(0)).is_err());
        assert!(compute_payslip(dec!(100), dec!(-1), dec!(0)).is_err());
        assert!(compute_payslip(dec!(100), dec!(0), dec!(-1)).is_err());
    }

    #[test]
    fn deductions_above_gross_are_rejected() {
        assert!(compute_payslip(dec!(100), dec!(0), dec!(101)).is_err());
    }

    #[test]
    fn month_is_normalized_to_first() {
        let d = NaiveDate::from_ymd_opt(2026, 8, 19).unwrap();
        assert_eq!(normalize_month(d), NaiveDate::from_ymd_opt(2026, 8, 1).unwrap());
    }
}
