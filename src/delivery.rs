//! Upload of finished export files to the remote drop location.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;

use crate::config::DeliveryConfig;
use crate::error::DeliveryError;

/// Something that can take a finished artifact off our hands.
#[allow(async_fn_in_trait)]
pub trait Delivery {
    /// Human readable destination, used in log lines.
    fn destination(&self) -> String;

    async fn upload(&self, artifact: &Path) -> Result<(), DeliveryError>;
}

/// Uploads with `PUT <url>/<remote_path>/<file name>` and basic auth.
pub struct HttpDelivery {
    client: Client,
    url: String,
    remote_path: String,
    user: String,
    password: String,
}

impl HttpDelivery {
    /// Build from configuration. Returns `Ok(None)` when delivery is not
    /// configured, which is not an error.
    pub fn from_config(config: &DeliveryConfig) -> Result<Option<Self>, DeliveryError> {
        if !config.is_configured() {
            return Ok(None);
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(600))
            .build()?;
        Ok(Some(Self {
            client,
            url: config.url.clone().unwrap_or_default(),
            remote_path: config.remote_path.clone(),
            user: config.user.clone().unwrap_or_default(),
            password: config.password.clone().unwrap_or_default(),
        }))
    }

    fn target_url(&self, file_name: &str) -> String {
        let base = self.url.trim_end_matches('/');
        let remote = self.remote_path.trim_matches('/');
        if remote.is_empty() {
            format!("{base}/{file_name}")
        } else {
            format!("{base}/{remote}/{file_name}")
        }
    }
}

impl Delivery for HttpDelivery {
    fn destination(&self) -> String {
        self.target_url("")
    }

    async fn upload(&self, artifact: &Path) -> Result<(), DeliveryError> {
        let body = tokio::fs::read(artifact)
            .await
            .map_err(|source| DeliveryError::Artifact {
                path: artifact.display().to_string(),
                source,
            })?;
        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let response = self
            .client
            .put(self.target_url(&file_name))
            .basic_auth(&self.user, Some(&self.password))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
