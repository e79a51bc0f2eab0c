use reqwest::Method;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{IdentityError, UserRecord};

/// Maps an externally authenticated principal to its internal user record.
/// Provisioning of that record happens outside these paths; a principal
/// without a row resolves to `NotFound`.
pub struct IdentityService {
    supabase: SupabaseClient,
}

impl IdentityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn resolve(
        &self,
        auth_id: &str,
        auth_token: &str,
    ) -> Result<UserRecord, IdentityError> {
        debug!("Resolving internal user for principal: {}", auth_id);

        let path = format!("/rest/v1/users?auth_id=eq.{}&limit=1", auth_id);
        let rows: Vec<UserRecord> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        rows.into_iter().next().ok_or(IdentityError::NotFound)
    }
}
