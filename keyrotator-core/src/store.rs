//! Collaborator traits
//!
//! The rotation handler talks to Secrets Manager and IAM only through these
//! traits, so tests can substitute in-memory emulations for the AWS clients.

use async_trait::async_trait;

use crate::credential::{AccessKey, AccessKeyMetadata, ProbeOutcome};
use crate::error::{CredentialStoreError, SecretStoreError};
use crate::stage::{SecretMetadata, SecretValue, VersionStage};

/// Versioned secret storage (Secrets Manager)
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Describe a secret's rotation state and version stages
    async fn describe_secret(&self, secret_id: &str) -> Result<SecretMetadata, SecretStoreError>;

    /// Get a secret version.
    ///
    /// With both `version_id` and `stage`, the version must carry the stage.
    /// With neither, the AWSCURRENT version is returned.
    async fn get_secret_value(
        &self,
        secret_id: &str,
        version_id: Option<&str>,
        stage: Option<VersionStage>,
    ) -> Result<SecretValue, SecretStoreError>;

    /// Store `secret_string` as version `token` with the given stages
    async fn put_secret_value(
        &self,
        secret_id: &str,
        token: &str,
        secret_string: &str,
        stages: &[VersionStage],
    ) -> Result<(), SecretStoreError>;

    /// Move `stage` onto `move_to`, detaching it from `remove_from`
    async fn update_secret_version_stage(
        &self,
        secret_id: &str,
        stage: VersionStage,
        move_to: &str,
        remove_from: Option<&str>,
    ) -> Result<(), SecretStoreError>;
}

/// Access key management for IAM users
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// List a user's access keys
    async fn list_access_keys(
        &self,
        user_name: &str,
    ) -> Result<Vec<AccessKeyMetadata>, CredentialStoreError>;

    /// Create a new access key for a user
    async fn create_access_key(&self, user_name: &str) -> Result<AccessKey, CredentialStoreError>;

    /// Delete an access key
    async fn delete_access_key(
        &self,
        user_name: &str,
        access_key_id: &str,
    ) -> Result<(), CredentialStoreError>;

    /// Make a read-only call signed with the given key and classify the result
    async fn probe(
        &self,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Result<ProbeOutcome, CredentialStoreError>;
}
