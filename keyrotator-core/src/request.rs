//! Rotation requests as delivered by Secrets Manager

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RotationError;

/// Raw invocation payload sent by the rotation framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RotationEvent {
    pub secret_id: String,
    pub client_request_token: String,
    pub step: String,
}

/// The four phases of a rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStep {
    CreateSecret,
    SetSecret,
    TestSecret,
    FinishSecret,
}

impl RotationStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateSecret => "createSecret",
            Self::SetSecret => "setSecret",
            Self::TestSecret => "testSecret",
            Self::FinishSecret => "finishSecret",
        }
    }
}

impl fmt::Display for RotationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RotationStep {
    type Err = RotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createSecret" => Ok(Self::CreateSecret),
            "setSecret" => Ok(Self::SetSecret),
            "testSecret" => Ok(Self::TestSecret),
            "finishSecret" => Ok(Self::FinishSecret),
            other => Err(RotationError::validation(format!(
                "Invalid step parameter: {}",
                other
            ))),
        }
    }
}

/// A validated rotation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationRequest {
    pub secret_id: String,
    pub client_request_token: String,
    pub step: RotationStep,
}

impl RotationRequest {
    pub fn new(
        secret_id: impl Into<String>,
        client_request_token: impl Into<String>,
        step: RotationStep,
    ) -> Self {
        Self {
            secret_id: secret_id.into(),
            client_request_token: client_request_token.into(),
            step,
        }
    }
}

impl TryFrom<RotationEvent> for RotationRequest {
    type Error = RotationError;

    fn try_from(event: RotationEvent) -> Result<Self, Self::Error> {
        let step = event.step.parse()?;
        Ok(Self {
            secret_id: event.secret_id,
            client_request_token: event.client_request_token,
            step,
        })
    }
}
