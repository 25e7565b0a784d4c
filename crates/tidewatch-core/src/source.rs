use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Upstream data providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Open weather and seismic data platform, authenticated with an API key parameter.
    Cwa,
    /// Transport data exchange, authenticated with a client-credentials bearer token.
    Tdx,
}

impl ProviderId {
    pub const ALL: [Self; 2] = [Self::Cwa, Self::Tdx];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cwa => "cwa",
            Self::Tdx => "tdx",
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
            "cwa" => Ok(Self::Cwa),
            "tdx" => Ok(Self::Tdx),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}
