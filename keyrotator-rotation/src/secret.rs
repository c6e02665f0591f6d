//! Secret payload lookup

use keyrotator_core::{PayloadField, RotationError, SchemaError, SecretPayload, SecretStore, VersionStage};
use tracing::debug;

/// Fetch and parse the secret payload for `stage`.
///
/// With a `token`, the version must carry `stage`. If that exact version is
/// not found, the lookup is retried by stage alone; any other failure of the
/// first lookup is returned as is.
pub async fn fetch_secret_payload(
    store: &dyn SecretStore,
    secret_id: &str,
    token: Option<&str>,
    stage: VersionStage,
    required: &[PayloadField],
) -> Result<SecretPayload, RotationError> {
    let value = match token {
        Some(token) => match store.get_secret_value(secret_id, Some(token), Some(stage)).await {
            Ok(value) => value,
            Err(e) if e.is_not_found() => {
                debug!(
                    secret_id = %secret_id,
                    token = %token,
                    stage = %stage,
                    "Version not staged, looking up by stage only"
                );
                store.get_secret_value(secret_id, None, Some(stage)).await?
            }
            Err(e) => return Err(e.into()),
        },
        None => store.get_secret_value(secret_id, None, Some(stage)).await?,
    };

    debug!(
        secret_id = %secret_id,
        version_id = %value.version_id,
        stages = ?value.version_stages,
        "Fetched secret version"
    );

    let secret_string = value
        .secret_string
        .ok_or(SchemaError::MissingSecretString(value.version_id))?;

    Ok(SecretPayload::parse(&secret_string, required)?)
}
