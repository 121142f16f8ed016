//! Dataset: an ordered pipeline of stages for one platform.

use serde::{Deserialize, Serialize};

use super::Stage;

/// Platform the simulated app was built for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    #[default]
    Ios,
    Android,
}

impl Platform {
    /// Hostname shown in the shell prompt.
    pub fn hostname(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }

    /// Name of the artifact being decompiled.
    pub fn app_kind(self) -> &'static str {
        match self {
            Self::Ios => "iOS App",
            Self::Android => "Android App",
        }
    }
}

/// A static pipeline fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub platform: Platform,
    pub stages: Vec<Stage>,
}
