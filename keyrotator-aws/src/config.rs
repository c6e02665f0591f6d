//! SDK configuration

use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_secretsmanager::config::Region;
use serde::Deserialize;
use tracing::info;

/// Overrides applied on top of the default AWS provider chain
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AwsSettings {
    /// Region; falls back to AWS_REGION / profile resolution
    #[serde(default)]
    pub region: Option<String>,

    /// Endpoint for every service, e.g. a local emulator
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

/// Load the shared SDK config from the environment plus `settings`
pub async fn load_sdk_config(settings: &AwsSettings) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &settings.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint_url) = &settings.endpoint_url {
        info!(endpoint_url = %endpoint_url, "Using custom AWS endpoint");
        loader = loader.endpoint_url(endpoint_url);
    }

    loader.load().await
}
