use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExtensionUnit {
    Day,
    Month,
}

impl ExtensionUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionUnit::Day => "DAY",
            ExtensionUnit::Month => "MONTH",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DAY" => Some(ExtensionUnit::Day),
            "MONTH" => Some(ExtensionUnit::Month),
            _ => None,
        }
    }
}

impl Display for ExtensionUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
