//! BOQ bills: billed-quantity reconciliation against ordered quantities.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BoqBill {
    pub id: Uuid,
    pub boq_id: Uuid,
    pub bill_no: String,
    pub bill_date: NaiveDate,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BoqBillDetail {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub boq_item_id: Uuid,
    pub qty: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct BillLineInput {
    pub boq_item_id: Uuid,
    pub qty: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateBillRequest {
    pub bill_no: String,
    pub bill_date: NaiveDate,
    pub details: Vec<BillLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBillRequest {
    #[serde(default)]
    pub bill_no: Option<String>,
    #[serde(default)]
    pub bill_date: Option<NaiveDate>,
    /// When present, replaces the full detail set
    #[serde(default)]
    pub details: Option<Vec<BillLineInput>>,
}

#[derive(Debug, Serialize)]
pub struct BillResponse {
    #[serde(flatten)]
    pub bill: BoqBill,
    pub details: Vec<BoqBillDetail>,
}

/// Checks that billing `qty` more units of an item stays within its ordered
/// quantity, given what the BOQ's other bills have already billed.
pub fn validate_billed_qty(
    ordered_qty: Decimal,
    already_billed: Decimal,
    qty: Decimal,
) -> Result<(), String> {
    if qty <= Decimal::ZERO {
        return Err("billed qty must be positive".to_string());
    }
    if already_billed + qty > ordered_qty {
        return Err(format!(
            "billed qty {} exceeds remaining quantity {} (ordered {}, already billed {})",
            qty,
            ordered_qty - already_billed,
            ordered_qty,
            already_billed
        ));
    }
    Ok(())
}

/// Bill total: sum of line amounts.
pub fn bill_total(line_amounts: &[Decimal]) -> Decimal {
    line_amounts.iter().copied().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn within_remaining_qty_is_ok() {
        assert!(validate_billed_qty(dec!(100), dec!(40), dec!(30)).is_ok());
    }

    #[test]
    fn exact_fill_is_ok() {
        assert!(validate_billed_qty(dec!(100), dec!(40), dec!(60)).is_ok());
    }

    #[test]
    fn overrun_is_rejected() {
        let err = validate_billed_qty(dec!(100), dec!(40), dec!(60.001)).unwrap_err();
        assert!(err.contains("exceeds remaining quantity"));
    }

    #[test]
    fn non_positive_qty_is_rejected() {
        assert!(validate_billed_qty(dec!(100), dec!(0), dec!(0)).is_err());
        assert!(validate_billed_qty(dec!(100), dec!(0), dec!(-5)).is_err());
    }

    #[test]
    fn total_sums_lines() {
        assert_eq!(
            bill_total(&[dec!(1000.50), dec!(249.50), dec!(0.01)]),
            dec!(1250.01)
        );
        assert_eq!(bill_total(&[]), dec!(0));
    }
}
