// Category Domain Model

use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Equipment class with its own independent queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "PCs")]
    Pcs,
    #[serde(rename = "Consoles")]
    Consoles,
    #[serde(rename = "Simuladores")]
    Simuladores,
    #[serde(rename = "VRs")]
    Vrs,
}

impl Category {
    /// All categories in tab order
    pub const ALL: [Category; 4] = [
        Category::Pcs,
        Category::Consoles,
        Category::Simuladores,
        Category::Vrs,
    ];

    /// Store representation (exact string persisted in queue documents)
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pcs => "PCs",
            Category::Consoles => "Consoles",
            Category::Simuladores => "Simuladores",
            Category::Vrs => "VRs",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Pcs
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::UnknownCategory(s.to_string()))
    }
}
