use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which half of the sleep/wake cycle a firing (or a sidecar record) refers
/// to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Operation {
    #[serde(rename = "SLEEP")]
    Sleep,
    #[serde(rename = "WAKE_UP")]
    WakeUp,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Sleep => write!(f, "SLEEP"),
            Operation::WakeUp => write!(f, "WAKE_UP"),
        }
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SLEEP" => Ok(Operation::Sleep),
            "WAKE_UP" | "WAKE" => Ok(Operation::WakeUp),
            other => Err(format!("unknown operation `{other}`")),
        }
    }
}
