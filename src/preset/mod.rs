use serde::{Deserialize, Serialize};

use crate::amp::params::{ParamSnapshot, Parameters};

pub mod manager;
pub mod state;

pub use manager::Manager;

/// A named set of parameter values. Hand-edited files may omit the optional
/// fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub params: ParamSnapshot,
}

impl Preset {
    pub fn new(name: String, params: ParamSnapshot) -> Self {
        Self {
            name,
            description: None,
            author: None,
            params,
        }
    }

    /// Capture the current parameter values under a name.
    pub fn capture(name: &str, params: &Parameters) -> Self {
        Self::new(name.to_string(), params.snapshot())
    }

    /// Write all four values at once. Out-of-range values are clamped.
    pub fn apply(&self, params: &Parameters) {
        params.restore(&self.params);
    }
}
