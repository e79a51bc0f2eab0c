use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Allergy, CreateAllergyRequest, CreateMedicalHistoryRequest, MedicalHistory};

pub struct RecordsService {
    supabase: SupabaseClient,
}

impl RecordsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    pub async fn list_history(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<MedicalHistory>> {
        debug!("Listing medical history for user: {}", user_id);

        let path = format!(
            "/rest/v1/medical_history?user_id=eq.{}&order=created_at.asc",
            user_id
        );
        let records: Vec<MedicalHistory> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(records)
    }

    pub async fn add_history(
        &self,
        user_id: Uuid,
        request: CreateMedicalHistoryRequest,
        auth_token: &str,
    ) -> Result<MedicalHistory> {
        debug!("Adding medical history entry for user: {}", user_id);

        let record_data = json!({
            "user_id": user_id,
            "condition": request.condition,
            "notes": request.notes,
            "diagnosed_at": request.diagnosed_at,
            "created_at": Utc::now().to_rfc3339()
        });

        let result: Vec<MedicalHistory> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/medical_history",
                Some(auth_token),
                Some(record_data),
                Some(Self::representation_headers()),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Failed to create medical history entry"))
    }

    pub async fn list_allergies(&self, user_id: Uuid, auth_token: &str) -> Result<Vec<Allergy>> {
        debug!("Listing allergies for user: {}", user_id);

        let path = format!(
            "/rest/v1/allergies?user_id=eq.{}&order=created_at.asc",
            user_id
        );
        let records: Vec<Allergy> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(records)
    }

    pub async fn add_allergy(
        &self,
        user_id: Uuid,
        request: CreateAllergyRequest,
        auth_token: &str,
    ) -> Result<Allergy> {
        debug!("Adding allergy entry for user: {}", user_id);

        let record_data = json!({
            "user_id": user_id,
            "substance": request.substance,
            "reaction": request.reaction,
            "severity": request.severity,
            "created_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Allergy> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/allergies",
                Some(auth_token),
                Some(record_data),
                Some(Self::representation_headers()),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Failed to create allergy entry"))
    }
}
