//! Manpower, suppliers, site assignments and inter-site transfers.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MANPOWER_STATUSES: &[&str] = &["active", "inactive"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transfer_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Accepted,
    Rejected,
}

impl TransferStatus {
    /// Only pending transfers can be decided.
    pub fn is_decidable(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ManpowerSupplier {
    pub id: Uuid,
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSupplierRequest {
    pub name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSupplierRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Manpower {
    pub id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub name: String,
    pub category: String,
    pub skillset: Option<String>,
    pub daily_wage: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateManpowerRequest {
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub skillset: Option<String>,
    pub daily_wage: Decimal,
    /// Optional initial site assignment
    #[serde(default)]
    pub site_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateManpowerRequest {
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub skillset: Option<String>,
    #[serde(default)]
    pub daily_wage: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SiteAssignment {
    pub id: Uuid,
    pub manpower_id: Uuid,
    pub site_id: Uuid,
    pub assigned_on: NaiveDate,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ManpowerTransfer {
    pub id: Uuid,
    pub manpower_id: Uuid,
    pub from_site_id: Uuid,
    pub to_site_id: Uuid,
    pub status: TransferStatus,
    pub requested_by: Option<Uuid>,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    pub manpower_id: Uuid,
    pub to_site_id: Uuid,
}

/// A transfer must actually move the worker somewhere else.
pub fn validate_transfer_sites(from_site_id: Uuid, to_site_id: Uuid) -> Result<(), String> {
    if from_site_id == to_site_id {
        return Err("transfer target must differ from the current site".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_site_transfer_is_rejected() {
        let site = Uuid::new_v4();
        assert!(validate_transfer_sites(site, site).is_err());
        assert!(validate_transfer_sites(site, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn only_pending_transfers_are_decidable() {
        assert!(TransferStatus::Pending.is_decidable());
        assert!(!TransferStatus::Accepted.is_decidable());
        assert!(!TransferStatus::Rejected.is_decidable());
    }
}
