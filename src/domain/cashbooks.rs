//! Cashbook: per-site receipts/payments ledger.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entry_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Receipt,
    Payment,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CashbookEntry {
    pub id: Uuid,
    pub site_id: Uuid,
    pub boq_id: Option<Uuid>,
    pub entry_date: NaiveDate,
    pub kind: EntryKind,
    pub category: String,
    pub description: Option<String>,
    pub voucher_no: Option<String>,
    pub amount: Decimal,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub site_id: Uuid,
    #[serde(default)]
    pub boq_id: Option<Uuid>,
    pub entry_date: NaiveDate,
    pub kind: EntryKind,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub voucher_no: Option<String>,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEntryRequest {
    #[serde(default)]
    pub entry_date: Option<NaiveDate>,
    #[serde(default)]
    pub kind: Option<EntryKind>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub voucher_no: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// Date-range filter for the summary endpoint
#[derive(Debug, Deserialize, Default)]
pub struct SummaryFilter {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct CashbookSummary {
    pub total_receipts: Decimal,
    pub total_payments: Decimal,
    pub balance: Decimal,
}

impl CashbookSummary {
    pub fn new(total_receipts: Decimal, total_payments: Decimal) -> Self {
        Self {
            total_receipts,
            total_payments,
            balance: total_receipts - total_payments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn balance_is_receipts_minus_payments() {
        let s = CashbookSummary::new(dec!(150000), dec!(98750.25));
        assert_eq!(s.balance, dec!(51249.75));
    }

    #[test]
    fn balance_can_go_negative() {
        let s = CashbookSummary::new(dec!(100), dec!(250));
        assert_eq!(s.balance, dec!(-150));
    }
}
