use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ASSET_STATUSES: &[&str] = &["in_service", "under_repair", "idle", "scrapped"];

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Asset {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub site_id: Option<Uuid>,
    pub rental_category_id: Option<Uuid>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_cost: Option<Decimal>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAssetRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub site_id: Option<Uuid>,
    #[serde(default)]
    pub rental_category_id: Option<Uuid>,
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default)]
    pub purchase_cost: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssetRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub site_id: Option<Uuid>,
    #[serde(default)]
    pub rental_category_id: Option<Uuid>,
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default)]
    pub purchase_cost: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
}

pub fn is_valid_asset_status(status: &str) -> bool {
    ASSET_STATUSES.contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_whitelist() {
        assert!(is_valid_asset_status("in_service"));
        assert!(is_valid_asset_status("scrapped"));
        assert!(!is_valid_asset_status("lost"));
    }
}
