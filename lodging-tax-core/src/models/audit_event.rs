use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An administrative action recorded in the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: i64,
    pub event_type: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
