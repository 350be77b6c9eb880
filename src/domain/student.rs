use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A gym member as the engine sees them. Authentication lives with the
/// identity provider; we only keep the stable subject it hands us plus
/// whatever display data the roster needs.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: Uuid,
    /// Stable identifier from the identity provider.
    pub subject: String,
    pub display_name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveStudentRequest {
    pub subject: String,
    pub display_name: String,
    pub email: Option<String>,
}
