//! External system integrations for Shelfport.
//!
//! - [`lookup`] - Record lookup collaborator (HTTP service or in-memory fixtures)
//! - [`storage`] - Object storage for published outputs (local directory or S3)
//! - [`notify`] - Job outcome notifiers (log, storage, webhook)
//!
//! # Design Pattern
//!
//! Each integration sits behind a trait ([`lookup::LookupClient`],
//! [`storage::ObjectStorage`], [`notify::OutcomeNotifier`]) so the pipeline can
//! be exercised with in-memory implementations.
//!
//! # Lookup Adapter
//!
//! ```rust,no_run
//! use shelfport::adapters::lookup::{HttpLookupClient, LookupClient, LookupTarget};
//! use shelfport::config::{LookupBackend, LookupConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LookupConfig {
//!     backend: LookupBackend::Http,
//!     base_url: "https://okapi.example.org".to_string(),
//!     tenant: Some("diku".to_string()),
//!     username: None,
//!     password: None,
//!     token: None,
//!     timeout_seconds: 30,
//!     page_limit: 100,
//!     fixtures_path: None,
//!     retry: Default::default(),
//! };
//!
//! let client = HttpLookupClient::new(&config)?;
//! let items = LookupTarget::new("inventory/items", "items");
//! let found = client.find(&items, "barcode", "31234000012345").await?;
//! println!("{} match(es)", found.len());
//! # Ok(())
//! # }
//! ```

pub mod lookup;
pub mod notify;
pub mod storage;
