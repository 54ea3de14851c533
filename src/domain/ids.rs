//! Domain identifier types with validation
//!
//! This module provides the job identifier newtype and the enumerations that
//! select entity kinds and identifier types at job construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Job identifier newtype wrapper
///
/// Job identifiers name staged files and published objects, so they must be
/// non-empty and safe to use as a single path segment.
///
/// # Examples
///
/// ```
/// use shelfport::domain::ids::JobId;
/// use std::str::FromStr;
///
/// let job_id = JobId::from_str("3f1c2a9e-bulk-edit").unwrap();
/// assert_eq!(job_id.as_str(), "3f1c2a9e-bulk-edit");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Creates a new JobId from a string
    ///
    /// # Returns
    ///
    /// Returns `Err` if the ID is empty or contains path separators
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err("Job ID cannot be empty".to_string());
        }
        if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
            return Err(format!("Job ID '{trimmed}' must be a single path segment"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Generates a fresh random job identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the job ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Kind of domain record a job exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Library patrons
    User,
    /// Physical items
    Item,
    /// Holdings records
    Holdings,
    /// Acquisition purchase orders
    PurchaseOrder,
}

impl EntityKind {
    /// Stable lowercase name, used in logs and object names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Item => "item",
            Self::Holdings => "holdings",
            Self::PurchaseOrder => "purchase_order",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "user" | "users" => Ok(Self::User),
            "item" | "items" => Ok(Self::Item),
            "holdings" | "holdings_record" => Ok(Self::Holdings),
            "purchase_order" | "purchase_orders" | "order" => Ok(Self::PurchaseOrder),
            _ => Err(format!(
                "Invalid entity kind '{s}'. Expected one of: user, item, holdings, purchase_order"
            )),
        }
    }
}

/// Type of the raw identifiers found in an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierType {
    Id,
    Barcode,
    Hrid,
    FormerIds,
    AccessionNumber,
    HoldingsRecordId,
    InstanceHrid,
    ItemBarcode,
    UserName,
    ExternalSystemId,
    PoNumber,
}

impl IdentifierType {
    /// Stable snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Barcode => "barcode",
            Self::Hrid => "hrid",
            Self::FormerIds => "former_ids",
            Self::AccessionNumber => "accession_number",
            Self::HoldingsRecordId => "holdings_record_id",
            Self::InstanceHrid => "instance_hrid",
            Self::ItemBarcode => "item_barcode",
            Self::UserName => "user_name",
            Self::ExternalSystemId => "external_system_id",
            Self::PoNumber => "po_number",
        }
    }
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentifierType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace('-', "_");
        let parsed = match normalized.as_str() {
            "id" => Self::Id,
            "barcode" => Self::Barcode,
            "hrid" => Self::Hrid,
            "former_ids" => Self::FormerIds,
            "accession_number" => Self::AccessionNumber,
            "holdings_record_id" => Self::HoldingsRecordId,
            "instance_hrid" => Self::InstanceHrid,
            "item_barcode" => Self::ItemBarcode,
            "user_name" | "username" => Self::UserName,
            "external_system_id" => Self::ExternalSystemId,
            "po_number" => Self::PoNumber,
            _ => return Err(format!("Invalid identifier type '{s}'")),
        };
        Ok(parsed)
    }
}
