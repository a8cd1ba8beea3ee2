//! Testing utilities and fixtures for yamltrail.
//!
//! - **Fixtures**: temporary git repositories that record document snapshots
//! - **Builders**: YAML entities and documents in every container shape
//! - **Assertions**: file and YAML comparison helpers
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use yamltrail_test_utils::{builders, TestRepo};
//!
//! #[tokio::test]
//! async fn test_history() {
//!     let repo = TestRepo::new();
//!     let doc = builders::DocumentBuilder::root_list()
//!         .entity(builders::automation("1", "Lights"))
//!         .build();
//!     let commit = repo.commit("automations.yaml", &doc, "add lights").await;
//!     assert_eq!(repo.read("automations.yaml"), doc);
//! }
//! ```

pub mod assertions;
pub mod builders;
pub mod fixtures;

pub use builders::DocumentBuilder;
pub use fixtures::TestRepo;
