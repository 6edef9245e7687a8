//! Location kind definitions
//!
//! An asset occupies at most one of three physical location kinds at a time.
//! `Factory` is the virtual origin of an asset that has never been placed;
//! it is a valid movement source but never a placement target.

use serde::{Deserialize, Serialize};

/// The three physical location kinds plus the virtual factory origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LocationKind {
    Site,
    Warehouse,
    Datacenter,
    /// Virtual "not yet placed" origin
    Factory,
}

impl LocationKind {
    /// Stable string form used in the movement tables
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::Site => "SITE",
            LocationKind::Warehouse => "WAREHOUSE",
            LocationKind::Datacenter => "DATACENTER",
            LocationKind::Factory => "FACTORY",
        }
    }

    /// The physical kinds an asset can be placed at, in location-code
    /// resolution priority order (Site, then Datacenter, then Warehouse)
    pub fn placeable() -> [LocationKind; 3] {
        [
            LocationKind::Site,
            LocationKind::Datacenter,
            LocationKind::Warehouse,
        ]
    }
}

impl std::fmt::Display for LocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LocationKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SITE" => Ok(LocationKind::Site),
            "WAREHOUSE" => Ok(LocationKind::Warehouse),
            "DATACENTER" => Ok(LocationKind::Datacenter),
            "FACTORY" => Ok(LocationKind::Factory),
            other => Err(crate::Error::Validation(format!(
                "Unknown location kind: {}",
                other
            ))),
        }
    }
}
