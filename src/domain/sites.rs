use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SITE_STATUSES: &[&str] = &["active", "closed"];

/// Construction site entity
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Site {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub code: String,
    pub name: String,
    pub client_name: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub company_id: Option<Uuid>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSiteRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company_id: Option<Uuid>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

pub fn is_valid_site_status(status: &str) -> bool {
    SITE_STATUSES.contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_statuses_accepted() {
        assert!(is_valid_site_status("active"));
        assert!(is_valid_site_status("closed"));
        assert!(!is_valid_site_status("demolished"));
        assert!(!is_valid_site_status("Active"));
    }
}
