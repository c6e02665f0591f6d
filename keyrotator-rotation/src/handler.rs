//! Rotation step dispatch

use keyrotator_core::{
    CredentialStore, PayloadField, ProbeOutcome, RotationError, RotationEvent, RotationRequest,
    RotationStep, SchemaError, SecretPayload, SecretStore, VersionStage, MAX_ACCESS_KEYS_PER_USER,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::secret::fetch_secret_payload;

/// What a single invocation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    /// The token's version is already AWSCURRENT; nothing was done
    AlreadyCurrent,
    /// createSecret found a key already staged under the token
    AlreadyCreated { access_key_id: String },
    /// createSecret minted a key and staged it as AWSPENDING
    Created {
        access_key_id: String,
        deleted_access_key_id: Option<String>,
    },
    NothingToSet,
    Tested { probe: ProbeOutcome },
    /// finishSecret moved AWSCURRENT to the token's version
    Finished {
        previous_version: Option<String>,
        cleanup: Cleanup,
    },
}

/// Result of deleting the retired access key after promotion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleanup {
    Deleted { access_key_id: String },
    NoPreviousKey,
    Failed { access_key_id: String, reason: String },
}

/// Runs rotation steps against a secret store and a credential store
pub struct RotationHandler {
    secrets: Arc<dyn SecretStore>,
    credentials: Arc<dyn CredentialStore>,
}

impl RotationHandler {
    pub fn new(secrets: Arc<dyn SecretStore>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            secrets,
            credentials,
        }
    }

    /// Validate a raw framework event and run its step
    pub async fn handle_event(&self, event: RotationEvent) -> Result<RotationOutcome, RotationError> {
        let request = RotationRequest::try_from(event)?;
        self.handle(&request).await
    }

    /// Run one rotation step.
    ///
    /// Fails with `RotationError::Validation` if rotation is disabled, the
    /// token is not a version of the secret, or the version is not staged
    /// AWSPENDING. A version that is already AWSCURRENT is left alone.
    pub async fn handle(&self, request: &RotationRequest) -> Result<RotationOutcome, RotationError> {
        let secret_id = request.secret_id.as_str();
        let token = request.client_request_token.as_str();

        info!(secret_id = %secret_id, token = %token, step = %request.step, "Rotation step");

        let metadata = self.secrets.describe_secret(secret_id).await?;
        debug!(
            secret_id = %secret_id,
            name = %metadata.name,
            versions = metadata.version_ids_to_stages.len(),
            "Described secret"
        );
        if !metadata.rotation_enabled {
            error!(secret_id = %secret_id, "Secret is not enabled for rotation");
            return Err(RotationError::validation(format!(
                "Secret {} is not enabled for rotation",
                secret_id
            )));
        }
        if metadata.stages_of(token).is_none() {
            error!(secret_id = %secret_id, token = %token, "Secret version has no stage for rotation");
            return Err(RotationError::validation(format!(
                "Secret version {} has no stage for rotation of secret {}.",
                token, secret_id
            )));
        }
        if metadata.has_stage(token, VersionStage::Current) {
            info!(secret_id = %secret_id, token = %token, "Secret version already set as AWSCURRENT");
            return Ok(RotationOutcome::AlreadyCurrent);
        }
        if !metadata.has_stage(token, VersionStage::Pending) {
            error!(secret_id = %secret_id, token = %token, "Secret version not set as AWSPENDING");
            return Err(RotationError::validation(format!(
                "Secret version {} not set as AWSPENDING for rotation of secret {}.",
                token, secret_id
            )));
        }

        match request.step {
            RotationStep::CreateSecret => self.create_secret(secret_id, token).await,
            RotationStep::SetSecret => Ok(self.set_secret(secret_id)),
            RotationStep::TestSecret => self.test_secret(secret_id, token).await,
            RotationStep::FinishSecret => self.finish_secret(secret_id, token).await,
        }
    }

    /// Mint a new access key for the secret's user and stage it as AWSPENDING
    async fn create_secret(&self, secret_id: &str, token: &str) -> Result<RotationOutcome, RotationError> {
        if let Some(access_key_id) = self.staged_access_key(secret_id, token).await? {
            info!(
                secret_id = %secret_id,
                access_key_id = %access_key_id,
                "createSecret: pending version already holds an access key"
            );
            return Ok(RotationOutcome::AlreadyCreated { access_key_id });
        }

        let current = fetch_secret_payload(
            self.secrets.as_ref(),
            secret_id,
            Some(token),
            VersionStage::Current,
            &[PayloadField::User],
        )
        .await?;
        let user = current.user.as_str();

        // IAM refuses a third key, so make room first
        let mut keys = self.credentials.list_access_keys(user).await?;
        keys.sort_by_key(|k| k.created_at);
        let deleted_access_key_id = if keys.len() >= MAX_ACCESS_KEYS_PER_USER {
            let oldest = keys.remove(0);
            info!(
                user = %user,
                access_key_id = %oldest.access_key_id,
                "createSecret: access key limit reached, deleting the oldest key"
            );
            self.credentials
                .delete_access_key(user, &oldest.access_key_id)
                .await?;
            Some(oldest.access_key_id)
        } else {
            None
        };

        let key = self.credentials.create_access_key(user).await?;
        let pending = current.with_access_key(&key);
        self.secrets
            .put_secret_value(
                secret_id,
                token,
                &pending.to_secret_string()?,
                &[VersionStage::Pending],
            )
            .await?;

        info!(
            secret_id = %secret_id,
            user = %user,
            access_key_id = %key.access_key_id,
            "createSecret: staged new access key as AWSPENDING"
        );
        Ok(RotationOutcome::Created {
            access_key_id: key.access_key_id,
            deleted_access_key_id,
        })
    }

    /// IAM activates keys on creation, so there is nothing to push
    fn set_secret(&self, secret_id: &str) -> RotationOutcome {
        info!(secret_id = %secret_id, "setSecret: nothing to do");
        RotationOutcome::NothingToSet
    }

    /// Sign a read-only IAM call with the pending key.
    ///
    /// Only an authentication failure fails the step; being denied the call
    /// still proves IAM knows the key.
    async fn test_secret(&self, secret_id: &str, token: &str) -> Result<RotationOutcome, RotationError> {
        let pending = fetch_secret_payload(
            self.secrets.as_ref(),
            secret_id,
            Some(token),
            VersionStage::Pending,
            &[
                PayloadField::User,
                PayloadField::AccessKeyId,
                PayloadField::SecretAccessKey,
            ],
        )
        .await?;
        let (access_key_id, secret_access_key) = pending
            .credentials()
            .ok_or(SchemaError::MissingField(PayloadField::AccessKeyId.as_str()))?;

        let probe = self
            .credentials
            .probe(access_key_id, secret_access_key)
            .await?;

        match &probe {
            ProbeOutcome::Authenticated => {
                info!(secret_id = %secret_id, access_key_id = %access_key_id, "testSecret: pending access key authenticated");
            }
            ProbeOutcome::AuthorizationDenied { code } => {
                info!(
                    secret_id = %secret_id,
                    access_key_id = %access_key_id,
                    code = %code,
                    "testSecret: pending access key authenticated but was denied the probe call"
                );
            }
            ProbeOutcome::AuthenticationFailed { code } => {
                error!(
                    secret_id = %secret_id,
                    access_key_id = %access_key_id,
                    code = %code,
                    "testSecret: pending access key failed to authenticate"
                );
                return Err(RotationError::Authentication {
                    secret_id: secret_id.to_string(),
                    user: pending.user.clone(),
                    code: code.clone(),
                });
            }
        }

        Ok(RotationOutcome::Tested { probe })
    }

    /// Promote the token's version to AWSCURRENT, then delete the retired key
    async fn finish_secret(&self, secret_id: &str, token: &str) -> Result<RotationOutcome, RotationError> {
        let metadata = self.secrets.describe_secret(secret_id).await?;
        let current_version = metadata
            .version_with_stage(VersionStage::Current)
            .map(str::to_string);

        if current_version.as_deref() == Some(token) {
            info!(secret_id = %secret_id, token = %token, "finishSecret: version already marked as AWSCURRENT");
            return Ok(RotationOutcome::AlreadyCurrent);
        }

        let retiring = match current_version.as_deref() {
            Some(version) => Some(
                fetch_secret_payload(
                    self.secrets.as_ref(),
                    secret_id,
                    Some(version),
                    VersionStage::Current,
                    &[PayloadField::User],
                )
                .await?,
            ),
            None => None,
        };

        self.secrets
            .update_secret_version_stage(
                secret_id,
                VersionStage::Current,
                token,
                current_version.as_deref(),
            )
            .await?;
        info!(
            secret_id = %secret_id,
            token = %token,
            "finishSecret: set AWSCURRENT stage to version"
        );

        let cleanup = match retiring {
            Some(payload) => self.delete_retired_key(&payload).await,
            None => Cleanup::NoPreviousKey,
        };

        Ok(RotationOutcome::Finished {
            previous_version: current_version,
            cleanup,
        })
    }

    /// Best effort: failures are logged and reported, never raised
    async fn delete_retired_key(&self, retiring: &SecretPayload) -> Cleanup {
        let Some(access_key_id) = retiring.access_key_id.clone() else {
            info!(user = %retiring.user, "finishSecret: no previous access key to clean up");
            return Cleanup::NoPreviousKey;
        };

        match self
            .credentials
            .delete_access_key(&retiring.user, &access_key_id)
            .await
        {
            Ok(()) => {
                info!(user = %retiring.user, access_key_id = %access_key_id, "finishSecret: deleted previous access key");
                Cleanup::Deleted { access_key_id }
            }
            Err(e) => {
                warn!(
                    user = %retiring.user,
                    access_key_id = %access_key_id,
                    error = %e,
                    "finishSecret: failed to delete previous access key"
                );
                Cleanup::Failed {
                    access_key_id,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Access key already written under `token`, if createSecret ran before.
    ///
    /// A value under the token without a usable key is a `SchemaError`, so
    /// createSecret stops before touching IAM.
    async fn staged_access_key(&self, secret_id: &str, token: &str) -> Result<Option<String>, RotationError> {
        match self
            .secrets
            .get_secret_value(secret_id, Some(token), Some(VersionStage::Pending))
            .await
        {
            Ok(value) => {
                // A value under the token must already carry a key
                let secret_string = value
                    .secret_string
                    .ok_or(SchemaError::MissingSecretString(value.version_id))?;
                let payload = SecretPayload::parse(&secret_string, &[PayloadField::AccessKeyId])?;
                Ok(payload.access_key_id)
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
