//! Per-kind lookup profiles
//!
//! Each [`EntityKind`] has one [`EntityProfile`]: where its records live, which
//! identifier types it can be looked up by, and the columns it exports when the
//! configuration does not declare its own.

use crate::adapters::lookup::LookupTarget;
use crate::core::transform::{FieldProcessor, FieldSpec};
use crate::domain::{EntityKind, IdentifierType};
use std::collections::BTreeMap;
use std::fmt;

/// Capabilities of one entity kind
pub trait EntityProfile: Send + Sync + fmt::Debug {
    fn kind(&self) -> EntityKind;

    /// Endpoint and collection key on the lookup service
    fn target(&self) -> LookupTarget;

    /// Query field for an identifier type, `None` if unsupported
    fn query_field(&self, identifier_type: IdentifierType) -> Option<&'static str>;

    /// Whether one identifier may legitimately match several records
    fn allows_multiple(&self, _identifier_type: IdentifierType) -> bool {
        false
    }

    /// Columns exported when none are configured
    fn default_fields(&self) -> Vec<FieldSpec>;

    /// Identifier types this kind can be looked up by
    fn supported_identifiers(&self) -> Vec<IdentifierType> {
        ALL_IDENTIFIER_TYPES
            .iter()
            .copied()
            .filter(|t| self.query_field(*t).is_some())
            .collect()
    }
}

const ALL_IDENTIFIER_TYPES: [IdentifierType; 11] = [
    IdentifierType::Id,
    IdentifierType::Barcode,
    IdentifierType::Hrid,
    IdentifierType::FormerIds,
    IdentifierType::AccessionNumber,
    IdentifierType::HoldingsRecordId,
    IdentifierType::InstanceHrid,
    IdentifierType::ItemBarcode,
    IdentifierType::UserName,
    IdentifierType::ExternalSystemId,
    IdentifierType::PoNumber,
];

/// Pick the profile for a kind
pub fn profile_for(kind: EntityKind) -> Box<dyn EntityProfile> {
    match kind {
        EntityKind::User => Box::new(UserProfile),
        EntityKind::Item => Box::new(ItemProfile),
        EntityKind::Holdings => Box::new(HoldingsProfile),
        EntityKind::PurchaseOrder => Box::new(PurchaseOrderProfile),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserProfile;

impl EntityProfile for UserProfile {
    fn kind(&self) -> EntityKind {
        EntityKind::User
    }

    fn target(&self) -> LookupTarget {
        LookupTarget::new("users", "users")
    }

    fn query_field(&self, identifier_type: IdentifierType) -> Option<&'static str> {
        match identifier_type {
            IdentifierType::Id => Some("id"),
            IdentifierType::Barcode => Some("barcode"),
            IdentifierType::UserName => Some("username"),
            IdentifierType::ExternalSystemId => Some("externalSystemId"),
            _ => None,
        }
    }

    fn default_fields(&self) -> Vec<FieldSpec> {
        let mut active = BTreeMap::new();
        active.insert("true".to_string(), "Active".to_string());
        active.insert("false".to_string(), "Inactive".to_string());

        vec![
            FieldSpec::new("User name", "username").optional(),
            FieldSpec::new("User id", "id"),
            FieldSpec::new("External system id", "externalSystemId").optional(),
            FieldSpec::new("Barcode", "barcode").optional(),
            FieldSpec::new("Active", "active").with_processor(FieldProcessor::EnumLabel {
                labels: active,
                fallback: None,
            }),
            FieldSpec::new("Type", "type").optional(),
            FieldSpec::new("Patron group", "patronGroup").optional(),
            FieldSpec::new("Last name", "personal.lastName").optional(),
            FieldSpec::new("First name", "personal.firstName").optional(),
            FieldSpec::new("Email", "personal.email").optional(),
            FieldSpec::new("Expiration date", "expirationDate").optional(),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ItemProfile;

impl EntityProfile for ItemProfile {
    fn kind(&self) -> EntityKind {
        EntityKind::Item
    }

    fn target(&self) -> LookupTarget {
        LookupTarget::new("inventory/items", "items")
    }

    fn query_field(&self, identifier_type: IdentifierType) -> Option<&'static str> {
        match identifier_type {
            IdentifierType::Id => Some("id"),
            IdentifierType::Barcode => Some("barcode"),
            IdentifierType::Hrid => Some("hrid"),
            IdentifierType::FormerIds => Some("formerIds"),
            IdentifierType::AccessionNumber => Some("accessionNumber"),
            IdentifierType::HoldingsRecordId => Some("holdingsRecordId"),
            _ => None,
        }
    }

    fn allows_multiple(&self, identifier_type: IdentifierType) -> bool {
        identifier_type == IdentifierType::HoldingsRecordId
    }

    fn default_fields(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("Item id", "id"),
            FieldSpec::new("Item HRID", "hrid").optional(),
            FieldSpec::new("Barcode", "barcode").optional(),
            FieldSpec::new("Holdings record id", "holdingsRecordId"),
            FieldSpec::new("Former identifiers", "formerIds")
                .optional()
                .with_processor(FieldProcessor::Join {
                    separator: " | ".to_string(),
                }),
            FieldSpec::new("Accession number", "accessionNumber").optional(),
            FieldSpec::new("Status", "status.name"),
            FieldSpec::new("Material type", "materialType.name").optional(),
            FieldSpec::new("Effective location", "effectiveLocation.name").optional(),
            FieldSpec::new("Call number", "effectiveCallNumberComponents.callNumber").optional(),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HoldingsProfile;

impl EntityProfile for HoldingsProfile {
    fn kind(&self) -> EntityKind {
        EntityKind::Holdings
    }

    fn target(&self) -> LookupTarget {
        LookupTarget::new("holdings-storage/holdings", "holdingsRecords")
    }

    fn query_field(&self, identifier_type: IdentifierType) -> Option<&'static str> {
        match identifier_type {
            IdentifierType::Id => Some("id"),
            IdentifierType::Hrid => Some("hrid"),
            IdentifierType::InstanceHrid => Some("instanceHrid"),
            IdentifierType::ItemBarcode => Some("itemBarcode"),
            _ => None,
        }
    }

    // An instance usually owns several holdings
    fn allows_multiple(&self, identifier_type: IdentifierType) -> bool {
        identifier_type == IdentifierType::InstanceHrid
    }

    fn default_fields(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("Holdings record id", "id"),
            FieldSpec::new("Holdings HRID", "hrid").optional(),
            FieldSpec::new("Instance id", "instanceId"),
            FieldSpec::new("Permanent location", "permanentLocationId").optional(),
            FieldSpec::new("Temporary location", "temporaryLocationId").optional(),
            FieldSpec::new("Call number", "callNumber").optional(),
            FieldSpec::new("Suppress from discovery", "discoverySuppress").optional(),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PurchaseOrderProfile;

impl EntityProfile for PurchaseOrderProfile {
    fn kind(&self) -> EntityKind {
        EntityKind::PurchaseOrder
    }

    fn target(&self) -> LookupTarget {
        LookupTarget::new("orders/composite-orders", "purchaseOrders")
    }

    fn query_field(&self, identifier_type: IdentifierType) -> Option<&'static str> {
        match identifier_type {
            IdentifierType::Id => Some("id"),
            IdentifierType::PoNumber => Some("poNumber"),
            _ => None,
        }
    }

    fn default_fields(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("PO number", "poNumber"),
            FieldSpec::new("Order id", "id"),
            FieldSpec::new("Vendor", "vendor"),
            FieldSpec::new("Order type", "orderType").optional(),
            FieldSpec::new("Workflow status", "workflowStatus").optional(),
            FieldSpec::new("Notes", "notes")
                .optional()
                .with_processor(FieldProcessor::Truncate { max_chars: 500 }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(EntityKind::User, IdentifierType::UserName, Some("username"))]
    #[test_case(EntityKind::User, IdentifierType::Hrid, None)]
    #[test_case(EntityKind::Item, IdentifierType::FormerIds, Some("formerIds"))]
    #[test_case(EntityKind::Item, IdentifierType::PoNumber, None)]
    #[test_case(EntityKind::Holdings, IdentifierType::InstanceHrid, Some("instanceHrid"))]
    #[test_case(EntityKind::PurchaseOrder, IdentifierType::PoNumber, Some("poNumber"))]
    fn test_query_fields(kind: EntityKind, identifier_type: IdentifierType, field: Option<&str>) {
        assert_eq!(profile_for(kind).query_field(identifier_type), field);
    }

    #[test]
    fn test_multiple_matches_only_for_holdings_by_instance() {
        let holdings = profile_for(EntityKind::Holdings);
        assert!(holdings.allows_multiple(IdentifierType::InstanceHrid));
        assert!(!holdings.allows_multiple(IdentifierType::Hrid));
        assert!(!profile_for(EntityKind::User).allows_multiple(IdentifierType::Barcode));
    }

    #[test]
    fn test_profiles_are_consistent() {
        for kind in [
            EntityKind::User,
            EntityKind::Item,
            EntityKind::Holdings,
            EntityKind::PurchaseOrder,
        ] {
            let profile = profile_for(kind);
            assert_eq!(profile.kind(), kind);
            assert!(profile.supported_identifiers().contains(&IdentifierType::Id));
            let fields = profile.default_fields();
            assert!(!fields.is_empty());
            assert!(fields.iter().all(|f| f.validate().is_ok()));
        }
    }
}
