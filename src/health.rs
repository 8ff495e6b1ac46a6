use reqwest::StatusCode;
use tracing::{error, warn};

/// Post-restart reachability check against the production URL.
#[derive(Debug, Clone)]
pub struct HealthChecker {
    client: reqwest::Client,
}

impl HealthChecker {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Single GET, no retries. Only an exact 200 counts as healthy.
    pub async fn check_prod_url(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) if response.status() == StatusCode::OK => true,
            Ok(response) => {
                warn!("Production URL {} answered {}", url, response.status());
                false
            }
            Err(e) => {
                error!("Error checking production URL: {}", e);
                false
            }
        }
    }
}
