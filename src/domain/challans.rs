//! Delivery challans. Outward challans carry a forward-only stage chain:
//! draft → approved → dispatched → received.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "challan_stage", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChallanStage {
    Draft,
    Approved,
    Dispatched,
    Received,
}

impl ChallanStage {
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Draft => Some(Self::Approved),
            Self::Approved => Some(Self::Dispatched),
            Self::Dispatched => Some(Self::Received),
            Self::Received => None,
        }
    }

    pub fn can_advance_to(&self, target: Self) -> bool {
        self.next() == Some(target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Dispatched => "dispatched",
            Self::Received => "received",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OutwardChallan {
    pub id: Uuid,
    pub site_id: Uuid,
    pub to_site_id: Uuid,
    pub challan_no: String,
    pub challan_date: NaiveDate,
    pub stage: ChallanStage,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OutwardChallanLine {
    pub id: Uuid,
    pub challan_id: Uuid,
    pub description: String,
    pub qty: Decimal,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InwardChallan {
    pub id: Uuid,
    pub site_id: Uuid,
    pub challan_no: String,
    pub challan_date: NaiveDate,
    pub received_from: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InwardChallanLine {
    pub id: Uuid,
    pub challan_id: Uuid,
    pub description: String,
    pub qty: Decimal,
    pub unit: String,
}

#[derive(Debug, Deserialize)]
pub struct ChallanLineInput {
    pub description: String,
    pub qty: Decimal,
    pub unit: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOutwardChallanRequest {
    pub site_id: Uuid,
    pub to_site_id: Uuid,
    pub challan_no: String,
    pub challan_date: NaiveDate,
    pub lines: Vec<ChallanLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInwardChallanRequest {
    pub site_id: Uuid,
    pub challan_no: String,
    pub challan_date: NaiveDate,
    #[serde(default)]
    pub received_from: Option<String>,
    pub lines: Vec<ChallanLineInput>,
}

#[derive(Debug, Serialize)]
pub struct OutwardChallanResponse {
    #[serde(flatten)]
    pub challan: OutwardChallan,
    pub lines: Vec<OutwardChallanLine>,
}

#[derive(Debug, Serialize)]
pub struct InwardChallanResponse {
    #[serde(flatten)]
    pub challan: InwardChallan,
    pub lines: Vec<InwardChallanLine>,
}

/// Lines must be non-empty with positive quantities.
pub fn validate_lines(lines: &[ChallanLineInput]) -> Result<(), String> {
    if lines.is_empty() {
        return Err("challan must have at least one line".to_string());
    }
    for line in lines {
        if line.qty <= Decimal::ZERO {
            return Err(format!("line '{}': qty must be positive", line.description));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn stage_chain_is_linear() {
        assert!(ChallanStage::Draft.can_advance_to(ChallanStage::Approved));
        assert!(ChallanStage::Approved.can_advance_to(ChallanStage::Dispatched));
        assert!(ChallanStage::Dispatched.can_advance_to(ChallanStage::Received));
        assert_eq!(ChallanStage::Received.next(), None);
    }

    #[test]
    fn out_of_order_transitions_are_rejected() {
        assert!(!ChallanStage::Draft.can_advance_to(ChallanStage::Dispatched));
        assert!(!ChallanStage::Dispatched.can_advance_to(ChallanStage::Approved));
        assert!(!ChallanStage::Received.can_advance_to(ChallanStage::Received));
    }

    fn line(qty: Decimal) -> ChallanLineInput {
        ChallanLineInput {
            description: "shuttering plates".into(),
            qty,
            unit: "nos".into(),
        }
    }

    #[test]
    fn lines_must_be_present_and_positive() {
        assert!(validate_lines(&[]).is_err());
        assert!(validate_lines(&[line(dec!(0))]).is_err());
        assert!(validate_lines(&[line(dec!(12))]).is_ok());
    }
}
