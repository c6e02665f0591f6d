//! Core types and traits for KeyRotator
//!
//! This crate provides the domain model shared by the rotation handler,
//! the AWS-backed collaborators and the in-memory test emulations.

pub mod credential;
pub mod error;
pub mod payload;
pub mod request;
pub mod stage;
pub mod store;

pub use credential::{AccessKey, AccessKeyMetadata, ProbeOutcome, MAX_ACCESS_KEYS_PER_USER};
pub use error::{CredentialStoreError, RotationError, SchemaError, SecretStoreError};
pub use payload::{PayloadField, SecretPayload};
pub use request::{RotationEvent, RotationRequest, RotationStep};
pub use stage::{SecretMetadata, SecretValue, VersionStage};
pub use store::{CredentialStore, SecretStore};
