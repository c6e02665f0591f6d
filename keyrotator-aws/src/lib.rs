//! AWS-backed collaborators for KeyRotator
//!
//! Implements `SecretStore` over Secrets Manager and `CredentialStore` over
//! IAM using the AWS SDK. Both share one `SdkConfig`, loaded once per process.

mod config;
mod iam;
mod secretsmanager;

pub use config::{load_sdk_config, AwsSettings};
pub use iam::IamCredentialStore;
pub use secretsmanager::SecretsManagerStore;
