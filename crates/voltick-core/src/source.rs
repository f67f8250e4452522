use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in quotes and routing metadata.
///
/// `Manual` marks a quote supplied directly by the caller (an explicit
/// override for offline pricing); the router never registers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Yahoo,
    Polygon,
    Alpaca,
    Manual,
}

impl ProviderId {
    /// Providers that can actually be routed to.
    pub const ROUTABLE: [Self; 3] = [Self::Yahoo, Self::Polygon, Self::Alpaca];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo",
            Self::Polygon => "polygon",
            Self::Alpaca => "alpaca",
            Self::Manual => "manual",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(Self::Yahoo),
            "polygon" => Ok(Self::Polygon),
            "alpaca" => Ok(Self::Alpaca),
            "manual" => Ok(Self::Manual),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}
