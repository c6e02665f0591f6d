//! IAM client

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_iam::config::Credentials;
use aws_sdk_iam::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_iam::Client;
use chrono::{DateTime, Utc};
use keyrotator_core::{AccessKey, AccessKeyMetadata, CredentialStore, CredentialStoreError, ProbeOutcome};
use tracing::debug;

/// Provider name attached to probe credentials
const PROBE_CREDENTIALS_PROVIDER: &str = "keyrotator-pending-key";

/// `CredentialStore` backed by AWS IAM
#[derive(Debug, Clone)]
pub struct IamCredentialStore {
    client: Client,
    /// Base config for building probe clients
    sdk_config: SdkConfig,
}

impl IamCredentialStore {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
            sdk_config: config.clone(),
        }
    }

    /// Client that signs with the given key instead of the function's role
    fn probe_client(&self, access_key_id: &str, secret_access_key: &str) -> Client {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            PROBE_CREDENTIALS_PROVIDER,
        );
        let config = aws_sdk_iam::config::Builder::from(&self.sdk_config)
            .credentials_provider(credentials)
            .build();
        Client::from_conf(config)
    }
}

fn credential_error<E, R>(err: SdkError<E, R>) -> CredentialStoreError
where
    E: ProvideErrorMetadata,
{
    let message = err.message().unwrap_or_default().to_string();
    match err.code() {
        Some("NoSuchEntity") => CredentialStoreError::NoSuchEntity(message),
        Some("LimitExceeded") => CredentialStoreError::LimitExceeded(message),
        Some(code) => CredentialStoreError::service(code, message),
        None => CredentialStoreError::service("Unknown", err.to_string()),
    }
}

fn to_chrono(value: &aws_smithy_types::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}

#[async_trait]
impl CredentialStore for IamCredentialStore {
    async fn list_access_keys(
        &self,
        user_name: &str,
    ) -> Result<Vec<AccessKeyMetadata>, CredentialStoreError> {
        debug!(user = %user_name, "ListAccessKeys");
        let output = self
            .client
            .list_access_keys()
            .user_name(user_name)
            .send()
            .await
            .map_err(credential_error)?;

        Ok(output
            .access_key_metadata()
            .iter()
            .filter_map(|k| {
                Some(AccessKeyMetadata {
                    user_name: k.user_name().unwrap_or(user_name).to_string(),
                    access_key_id: k.access_key_id()?.to_string(),
                    status: k.status().map(|s| s.as_str().to_string()),
                    created_at: k.create_date().and_then(to_chrono),
                })
            })
            .collect())
    }

    async fn create_access_key(&self, user_name: &str) -> Result<AccessKey, CredentialStoreError> {
        debug!(user = %user_name, "CreateAccessKey");
        let output = self
            .client
            .create_access_key()
            .user_name(user_name)
            .send()
            .await
            .map_err(credential_error)?;

        let key = output.access_key().ok_or_else(|| {
            CredentialStoreError::service("InvalidResponse", "CreateAccessKey returned no access key")
        })?;

        Ok(AccessKey {
            user_name: key.user_name().to_string(),
            access_key_id: key.access_key_id().to_string(),
            secret_access_key: key.secret_access_key().to_string(),
            created_at: key.create_date().and_then(to_chrono).unwrap_or_else(Utc::now),
        })
    }

    async fn delete_access_key(
        &self,
        user_name: &str,
        access_key_id: &str,
    ) -> Result<(), CredentialStoreError> {
        debug!(user = %user_name, access_key_id = %access_key_id, "DeleteAccessKey");
        self.client
            .delete_access_key()
            .user_name(user_name)
            .access_key_id(access_key_id)
            .send()
            .await
            .map_err(credential_error)?;
        Ok(())
    }

    async fn probe(
        &self,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Result<ProbeOutcome, CredentialStoreError> {
        debug!(access_key_id = %access_key_id, "GetAccountAuthorizationDetails");
        let result = self
            .probe_client(access_key_id, secret_access_key)
            .get_account_authorization_details()
            .max_items(1)
            .send()
            .await;

        match result {
            Ok(_) => Ok(ProbeOutcome::Authenticated),
            Err(err) => match err.code().and_then(ProbeOutcome::from_error_code) {
                Some(outcome) => Ok(outcome),
                None => Err(credential_error(err)),
            },
        }
    }
}
