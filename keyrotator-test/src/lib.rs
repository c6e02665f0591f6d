//! Test utilities for KeyRotator
//!
//! Provides in-memory emulations of the two services a rotation touches:
//! - `InMemorySecretStore`: versioned secrets with AWSCURRENT/AWSPENDING/AWSPREVIOUS staging
//! - `InMemoryCredentialStore`: IAM users and their access keys, including the
//!   two-keys-per-user limit and signed-call probing
//!
//! ## Usage
//!
//! ```rust
//! use keyrotator_test::{InMemoryCredentialStore, InMemorySecretStore};
//!
//! let secrets = InMemorySecretStore::new();
//! secrets.create_secret("svc-secret", Some(r#"{"User":"svc"}"#)).unwrap();
//!
//! let iam = InMemoryCredentialStore::new();
//! iam.create_user("svc", None).unwrap();
//! ```

pub mod iam;
pub mod secrets;

pub use iam::InMemoryCredentialStore;
pub use secrets::InMemorySecretStore;

/// Install a test-friendly tracing subscriber; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keyrotator=debug,keyrotator_rotation=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
