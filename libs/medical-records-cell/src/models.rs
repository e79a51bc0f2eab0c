use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A diagnosed condition in a patient's history. Append-only; owned
/// exclusively by the associated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalHistory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub condition: String,
    pub notes: Option<String>,
    pub diagnosed_at: Option<NaiveDateTime>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allergy {
    pub id: Uuid,
    pub user_id: Uuid,
    pub substance: String,
    pub reaction: Option<String>,
    pub severity: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMedicalHistoryRequest {
    pub condition: String,
    pub notes: Option<String>,
    pub diagnosed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAllergyRequest {
    pub substance: String,
    pub reaction: Option<String>,
    pub severity: Option<String>,
}
