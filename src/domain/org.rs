//! Organisational lookup tables: departments, zones, rental categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Zone {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RentalCategory {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Shared payload for the name-only lookup tables
#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}
