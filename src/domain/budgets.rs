//! Cashbook budgets with a linear, forward-only approval chain:
//! draft → first_approved → approved → accepted.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::boqs::line_amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "approval_stage", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStage {
    Draft,
    FirstApproved,
    Approved,
    Accepted,
}

impl ApprovalStage {
    /// The single legal successor, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Draft => Some(Self::FirstApproved),
            Self::FirstApproved => Some(Self::Approved),
            Self::Approved => Some(Self::Accepted),
            Self::Accepted => None,
        }
    }

    /// A transition is legal only to the immediate successor.
    pub fn can_advance_to(&self, target: Self) -> bool {
        self.next() == Some(target)
    }

    /// Items may only be edited before any approval has happened.
    pub fn allows_item_edits(&self) -> bool {
        matches!(self, Self::Draft)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::FirstApproved => "first_approved",
            Self::Approved => "approved",
            Self::Accepted => "accepted",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CashbookBudget {
    pub id: Uuid,
    pub site_id: Uuid,
    pub title: String,
    pub period_month: NaiveDate,
    pub stage: ApprovalStage,
    pub total_amount: Decimal,
    pub first_approved_by: Option<Uuid>,
    pub first_approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub accepted_by: Option<Uuid>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BudgetItem {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub category: String,
    pub description: Option<String>,
    pub qty: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct BudgetItemInput {
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    pub qty: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateBudgetRequest {
    pub site_id: Uuid,
    pub title: String,
    pub period_month: NaiveDate,
    #[serde(default)]
    pub items: Vec<BudgetItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBudgetRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub period_month: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    #[serde(flatten)]
    pub budget: CashbookBudget,
    pub items: Vec<BudgetItem>,
}

/// Computes line amounts for the given inputs and the budget total.
/// Rejects non-positive quantities and negative rates.
pub fn price_items(items: &[BudgetItemInput]) -> Result<(Vec<Decimal>, Decimal), String> {
    let mut amounts = Vec::with_capacity(items.len());
    for item in items {
        if item.qty <= Decimal::ZERO {
            return Err(format!("item '{}': qty must be positive", item.category));
        }
        if item.rate < Decimal::ZERO {
            return Err(format!("item '{}': rate must not be negative", item.category));
        }
        amounts.push(line_amount(item.qty, item.rate));
    }
    let total = amounts.iter().copied().sum();
    Ok((amounts, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn chain_advances_one_step_at_a_time() {
        assert!(ApprovalStage::Draft.can_advance_to(ApprovalStage::FirstApproved));
        assert!(ApprovalStage::FirstApproved.can_advance_to(ApprovalStage::Approved));
        assert!(ApprovalStage::Approved.can_advance_to(ApprovalStage::Accepted));
    }

    #[test]
    fn skipping_or_repeating_stages_is_rejected() {
        assert!(!ApprovalStage::Draft.can_advance_to(ApprovalStage::Approved));
        assert!(!ApprovalStage::Draft.can_advance_to(ApprovalStage::Accepted));
        assert!(!ApprovalStage::Approved.can_advance_to(ApprovalStage::Approved));
        assert!(!ApprovalStage::Accepted.can_advance_to(ApprovalStage::Accepted));
    }

    #[test]
    fn chain_never_goes_backwards() {
        assert!(!ApprovalStage::Approved.can_advance_to(ApprovalStage::FirstApproved));
        assert!(!ApprovalStage::Accepted.can_advance_to(ApprovalStage::Draft));
    }

    #[test]
    fn item_edits_only_in_draft() {
        assert!(ApprovalStage::Draft.allows_item_edits());
        assert!(!ApprovalStage::FirstApproved.allows_item_edits());
        assert!(!ApprovalStage::Accepted.allows_item_edits());
    }

    fn input(qty: Decimal, rate: Decimal) -> BudgetItemInput {
        BudgetItemInput {
            category: "cement".into(),
            description: None,
            qty,
            rate,
        }
    }

    #[test]
    fn total_is_sum_of_line_amounts() {
        let items = vec![input(dec!(10), dec!(350)), input(dec!(2.5), dec!(1200))];
        let (amounts, total) = price_items(&items).unwrap();
        assert_eq!(amounts, vec![dec!(3500.00), dec!(3000.00)]);
        assert_eq!(total, dec!(6500.00));
    }

    #[test]
    fn bad_figures_are_rejected() {
        assert!(price_items(&[input(dec!(0), dec!(10))]).is_err());
        assert!(price_items(&[input(dec!(1), dec!(-10))]).is_err());
    }
}
