use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stable catalog identifier such as `ACO001`. Assigned once at seeding.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineCode(pub String);

impl MachineCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MachineCode {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub code: MachineCode,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub category: String,
    pub description: String,
    pub active: bool,
}

impl Machine {
    /// Quoting and listings only ever see active machines.
    pub fn is_quotable(&self) -> bool {
        self.active
    }
}
