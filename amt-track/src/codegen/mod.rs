//! Sequence code generation
//!
//! Collision-free identifier codes (asset tags, site codes) drawn from
//! persistent counters scoped to a composite business dimension. The
//! allocator reconciles the counter against codes already issued
//! out-of-band before handing out the next one.

pub mod allocator;
pub mod pattern;

pub use allocator::{Allocation, SequenceAllocator};
pub use pattern::build_code;

use uuid::Uuid;

/// Composite business dimension a sequence counter is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKey {
    /// Asset tags: one counter per category + vendor + bank
    AssetTag {
        category_guid: Uuid,
        vendor_guid: Uuid,
        bank_guid: Uuid,
    },
    /// Site codes: one counter per project + state
    SiteCode {
        project_guid: Uuid,
        state_guid: Uuid,
    },
}

impl SequenceKey {
    /// Canonical string form, used as the generator table's primary key
    pub fn key(&self) -> String {
        match self {
            SequenceKey::AssetTag {
                category_guid,
                vendor_guid,
                bank_guid,
            } => format!("asset:{}:{}:{}", category_guid, vendor_guid, bank_guid),
            SequenceKey::SiteCode {
                project_guid,
                state_guid,
            } => format!("site:{}:{}", project_guid, state_guid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_forms_are_disjoint_across_dimensions() {
        let guid_a = Uuid::new_v4();
        let guid_b = Uuid::new_v4();
        let guid_c = Uuid::new_v4();

        let asset = SequenceKey::AssetTag {
            category_guid: guid_a,
            vendor_guid: guid_b,
            bank_guid: guid_c,
        };
        let site = SequenceKey::SiteCode {
            project_guid: guid_a,
            state_guid: guid_b,
        };

        assert!(asset.key().starts_with("asset:"));
        assert!(site.key().starts_with("site:"));
        assert_ne!(asset.key(), site.key());
    }

    #[test]
    fn test_key_is_stable_for_equal_inputs() {
        let category_guid = Uuid::new_v4();
        let vendor_guid = Uuid::new_v4();
        let bank_guid = Uuid::new_v4();

        let a = SequenceKey::AssetTag {
            category_guid,
            vendor_guid,
            bank_guid,
        };
        let b = SequenceKey::AssetTag {
            category_guid,
            vendor_guid,
            bank_guid,
        };
        assert_eq!(a.key(), b.key());
    }
}
