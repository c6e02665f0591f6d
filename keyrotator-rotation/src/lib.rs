//! Secrets Manager rotation for IAM access keys
//!
//! Implements the four-step rotation protocol driven by the Secrets Manager
//! rotation scheduler:
//! - createSecret: mint a new access key and stage it as AWSPENDING
//! - setSecret: nothing to do, IAM activates keys on creation
//! - testSecret: sign a read-only IAM call with the pending key
//! - finishSecret: promote the pending version to AWSCURRENT and delete the old key
//!
//! Each invocation runs exactly one step. Every step is safe to repeat.

mod handler;
mod secret;

pub use handler::{Cleanup, RotationHandler, RotationOutcome};
pub use secret::fetch_secret_payload;
