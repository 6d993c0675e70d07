//! BOQ (bill of quantities) entities and quantity/amount arithmetic.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Boq {
    pub id: Uuid,
    pub site_id: Uuid,
    pub boq_no: String,
    pub title: String,
    pub work_order_no: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BoqItem {
    pub id: Uuid,
    pub boq_id: Uuid,
    pub item_code: String,
    pub description: String,
    pub unit: String,
    pub ordered_qty: Decimal,
    pub rate: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBoqRequest {
    pub site_id: Uuid,
    pub boq_no: String,
    pub title: String,
    #[serde(default)]
    pub work_order_no: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBoqRequest {
    #[serde(default)]
    pub boq_no: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub work_order_no: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBoqItemRequest {
    pub item_code: String,
    pub description: String,
    pub unit: String,
    pub ordered_qty: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBoqItemRequest {
    #[serde(default)]
    pub item_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub ordered_qty: Option<Decimal>,
    #[serde(default)]
    pub rate: Option<Decimal>,
}

/// Per-item billed-vs-ordered progress, aggregated across all bills of a BOQ.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct BoqItemProgress {
    pub item_id: Uuid,
    pub item_code: String,
    pub description: String,
    pub unit: String,
    pub ordered_qty: Decimal,
    pub rate: Decimal,
    pub billed_qty: Decimal,
    pub balance_qty: Decimal,
    pub ordered_amount: Decimal,
    pub billed_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct BoqProgress {
    pub boq_id: Uuid,
    pub items: Vec<BoqItemProgress>,
    pub total_ordered_amount: Decimal,
    pub total_billed_amount: Decimal,
}

impl BoqProgress {
    pub fn new(boq_id: Uuid, items: Vec<BoqItemProgress>) -> Self {
        let total_ordered_amount = items.iter().map(|i| i.ordered_amount).sum();
        let total_billed_amount = items.iter().map(|i| i.billed_amount).sum();
        Self {
            boq_id,
            items,
            total_ordered_amount,
            total_billed_amount,
        }
    }
}

/// Monetary line amount: qty × rate, rounded to 2 decimal places.
pub fn line_amount(qty: Decimal, rate: Decimal) -> Decimal {
    (qty * rate).round_dp(2)
}

/// Validates that a quantity/rate pair is usable on a BOQ item.
pub fn validate_item_figures(ordered_qty: Decimal, rate: Decimal) -> Result<(), String> {
    if ordered_qty <= Decimal::ZERO {
        return Err("ordered_qty must be positive".to_string());
    }
    if rate < Decimal::ZERO {
        return Err("rate must not be negative".to_string());
    }
    Ok(())
}

/// Effective figures for a partial item update: absent fields keep the
/// current value, and the resulting pair is validated as a whole.
pub fn validate_item_update(
    current_qty: Decimal,
    current_rate: Decimal,
    new_qty: Option<Decimal>,
    new_rate: Option<Decimal>,
) -> Result<(Decimal, Decimal), String> {
    let qty = new_qty.unwrap_or(current_qty);
    let rate = new_rate.unwrap_or(current_rate);
    validate_item_figures(qty, rate)?;
    Ok((qty, rate))
}

/// A reduced ordered quantity may not undercut what bills have already drawn
/// against the item.
pub fn validate_ordered_reduction(
    already_billed: Decimal,
    new_ordered_qty: Decimal,
) -> Result<(), String> {
    if new_ordered_qty < already_billed {
        return Err(format!(
            "ordered_qty {} is below the already billed quantity {}",
            new_ordered_qty, already_billed
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_amount_is_qty_times_rate() {
        assert_eq!(line_amount(dec!(12.5), dec!(240)), dec!(3000.00));
        assert_eq!(line_amount(dec!(0), dec!(99.99)), dec!(0));
    }

    #[test]
    fn line_amount_rounds_to_paise() {
        // 3.333 * 3.333 = 11.108889
        assert_eq!(line_amount(dec!(3.333), dec!(3.333)), dec!(11.11));
    }

    #[test]
    fn item_figures_validation() {
        assert!(validate_item_figures(dec!(10), dec!(0)).is_ok());
        assert!(validate_item_figures(dec!(0), dec!(5)).is_err());
        assert!(validate_item_figures(dec!(-1), dec!(5)).is_err());
        assert!(validate_item_figures(dec!(1), dec!(-5)).is_err());
    }

    #[test]
    fn single_field_patch_is_still_validated() {
        // A patch carrying only one bad figure must not slip past the check
        assert!(validate_item_update(dec!(10), dec!(5), None, Some(dec!(-5))).is_err());
        assert!(validate_item_update(dec!(10), dec!(5), Some(dec!(0)), None).is_err());
    }

    #[test]
    fn patch_merges_with_current_figures() {
        let (qty, rate) = validate_item_update(dec!(10), dec!(5), None, Some(dec!(7.50))).unwrap();
        assert_eq!(qty, dec!(10));
        assert_eq!(rate, dec!(7.50));

        let (qty, rate) = validate_item_update(dec!(10), dec!(5), None, None).unwrap();
        assert_eq!((qty, rate), (dec!(10), dec!(5)));
    }

    #[test]
    fn ordered_qty_cannot_drop_below_billed() {
        assert!(validate_ordered_reduction(dec!(40), dec!(39.999)).is_err());
        assert!(validate_ordered_reduction(dec!(40), dec!(40)).is_ok());
        assert!(validate_ordered_reduction(dec!(0), dec!(1)).is_ok());
    }

    fn progress(ordered_amount: Decimal, billed_amount: Decimal) -> BoqItemProgress {
        BoqItemProgress {
            item_id: Uuid::new_v4(),
            item_code: "X".into(),
            description: "x".into(),
            unit: "nos".into(),
            ordered_qty: dec!(1),
            rate: dec!(1),
            billed_qty: dec!(0),
            balance_qty: dec!(1),
            ordered_amount,
            billed_amount,
        }
    }

    #[test]
    fn progress_totals_sum_items() {
        let p = BoqProgress::new(
            Uuid::new_v4(),
            vec![
                progress(dec!(100.50), dec!(40.25)),
                progress(dec!(200.00), dec!(0)),
            ],
        );
        assert_eq!(p.total_ordered_amount, dec!(300.50));
        assert_eq!(p.total_billed_amount, dec!(40.25));
    }
}
