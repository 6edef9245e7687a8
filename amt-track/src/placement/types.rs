//! Placement request and projection types

use amt_common::LocationKind;
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// Target location for a placement, with the kind-specific lifecycle dates
#[derive(Debug, Clone)]
pub enum PlacementTarget {
    Site {
        site_guid: Uuid,
        deployed_on: Option<NaiveDate>,
        activated_on: Option<NaiveDate>,
        decommissioned_on: Option<NaiveDate>,
    },
    Warehouse {
        warehouse_guid: Uuid,
        received_on: Option<NaiveDate>,
        disposed_on: Option<NaiveDate>,
        scrapped_on: Option<NaiveDate>,
    },
    Datacenter {
        datacenter_guid: Uuid,
        commissioned_on: Option<NaiveDate>,
        disposed_on: Option<NaiveDate>,
        scrapped_on: Option<NaiveDate>,
    },
}

impl PlacementTarget {
    pub fn kind(&self) -> LocationKind {
        match self {
            PlacementTarget::Site { .. } => LocationKind::Site,
            PlacementTarget::Warehouse { .. } => LocationKind::Warehouse,
            PlacementTarget::Datacenter { .. } => LocationKind::Datacenter,
        }
    }

    pub fn location_guid(&self) -> Uuid {
        match self {
            PlacementTarget::Site { site_guid, .. } => *site_guid,
            PlacementTarget::Warehouse { warehouse_guid, .. } => *warehouse_guid,
            PlacementTarget::Datacenter { datacenter_guid, .. } => *datacenter_guid,
        }
    }

    /// Bare target with no lifecycle dates
    pub fn site(site_guid: Uuid) -> Self {
        PlacementTarget::Site {
            site_guid,
            deployed_on: None,
            activated_on: None,
            decommissioned_on: None,
        }
    }

    /// Bare target with no lifecycle dates
    pub fn warehouse(warehouse_guid: Uuid) -> Self {
        PlacementTarget::Warehouse {
            warehouse_guid,
            received_on: None,
            disposed_on: None,
            scrapped_on: None,
        }
    }

    /// Bare target with no lifecycle dates
    pub fn datacenter(datacenter_guid: Uuid) -> Self {
        PlacementTarget::Datacenter {
            datacenter_guid,
            commissioned_on: None,
            disposed_on: None,
            scrapped_on: None,
        }
    }
}

/// One placement request for the state machine
#[derive(Debug, Clone)]
pub struct PlacementRequest {
    pub asset_guid: Uuid,
    pub status_guid: Uuid,
    pub target: PlacementTarget,
}

/// Result of a completed placement transition
#[derive(Debug, Clone, Serialize)]
pub struct PlacementOutcome {
    pub placement_guid: Uuid,
    pub kind: LocationKind,
    /// Factory when the asset had never been placed
    pub from_kind: LocationKind,
    pub from_placement_guid: Option<Uuid>,
    pub movement_record_guid: Uuid,
    /// None when the (from, to) pair had no seeded movement type
    pub movement_type_guid: Option<Uuid>,
}

/// Read-only projection of where an asset currently is
#[derive(Debug, Clone, Serialize)]
pub struct AssetLocation {
    pub is_placed: bool,
    pub kind: Option<LocationKind>,
    pub location_guid: Option<Uuid>,
    pub location_code: Option<String>,
}

impl AssetLocation {
    pub fn unplaced() -> Self {
        Self {
            is_placed: false,
            kind: None,
            location_guid: None,
            location_code: None,
        }
    }
}
