//! Secrets Manager client

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_secretsmanager::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::Client;
use keyrotator_core::{SecretMetadata, SecretStore, SecretStoreError, SecretValue, VersionStage};
use tracing::debug;

/// `SecretStore` backed by AWS Secrets Manager
#[derive(Debug, Clone)]
pub struct SecretsManagerStore {
    client: Client,
}

impl SecretsManagerStore {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn store_error<E, R>(secret_id: &str, err: SdkError<E, R>) -> SecretStoreError
where
    E: ProvideErrorMetadata,
{
    let message = err.message().unwrap_or_default().to_string();
    match err.code() {
        Some("ResourceNotFoundException") => {
            SecretStoreError::NotFound(format!("{}: {}", secret_id, message))
        }
        Some(code) => SecretStoreError::service(code, message),
        None => SecretStoreError::service("Unknown", err.to_string()),
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn describe_secret(&self, secret_id: &str) -> Result<SecretMetadata, SecretStoreError> {
        debug!(secret_id = %secret_id, "DescribeSecret");
        let output = self
            .client
            .describe_secret()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| store_error(secret_id, e))?;

        Ok(SecretMetadata {
            name: output.name().unwrap_or(secret_id).to_string(),
            rotation_enabled: output.rotation_enabled().unwrap_or(false),
            version_ids_to_stages: output.version_ids_to_stages().cloned().unwrap_or_default(),
        })
    }

    async fn get_secret_value(
        &self,
        secret_id: &str,
        version_id: Option<&str>,
        stage: Option<VersionStage>,
    ) -> Result<SecretValue, SecretStoreError> {
        debug!(secret_id = %secret_id, version_id = ?version_id, stage = ?stage, "GetSecretValue");
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .set_version_id(version_id.map(str::to_string))
            .set_version_stage(stage.map(|s| s.as_str().to_string()))
            .send()
            .await
            .map_err(|e| store_error(secret_id, e))?;

        Ok(SecretValue {
            version_id: output.version_id().unwrap_or_default().to_string(),
            secret_string: output.secret_string().map(str::to_string),
            version_stages: output.version_stages().to_vec(),
        })
    }

    async fn put_secret_value(
        &self,
        secret_id: &str,
        token: &str,
        secret_string: &str,
        stages: &[VersionStage],
    ) -> Result<(), SecretStoreError> {
        debug!(secret_id = %secret_id, token = %token, stages = ?stages, "PutSecretValue");
        self.client
            .put_secret_value()
            .secret_id(secret_id)
            .client_request_token(token)
            .secret_string(secret_string)
            .set_version_stages(Some(
                stages.iter().map(|s| s.as_str().to_string()).collect(),
            ))
            .send()
            .await
            .map_err(|e| store_error(secret_id, e))?;
        Ok(())
    }

    async fn update_secret_version_stage(
        &self,
        secret_id: &str,
        stage: VersionStage,
        move_to: &str,
        remove_from: Option<&str>,
    ) -> Result<(), SecretStoreError> {
        debug!(
            secret_id = %secret_id,
            stage = %stage,
            move_to = %move_to,
            remove_from = ?remove_from,
            "UpdateSecretVersionStage"
        );
        self.client
            .update_secret_version_stage()
            .secret_id(secret_id)
            .version_stage(stage.as_str())
            .move_to_version_id(move_to)
            .set_remove_from_version_id(remove_from.map(str::to_string))
            .send()
            .await
            .map_err(|e| store_error(secret_id, e))?;
        Ok(())
    }
}
