//! Domain types for the CTFd manager.
//!
//! Config objects arrive from the cluster as labeled string maps. This crate
//! turns them into a closed set of typed records before any business logic
//! runs:
//! - [`classify`] decides from a single label what an object represents
//! - [`extract_challenge`] / [`extract_page`] validate and decode the payload
//! - [`MappingTable`] translates category/difficulty tokens to display names

pub mod challenge;
pub mod error;
pub mod mapping;
pub mod object;
pub mod page;

pub use challenge::{
    ChallengeRecord, ChallengeSpec, DeliveryMode, FlagSpec, extract_challenge,
    strip_generated_header,
};
pub use error::{ValidationError, ValidationResult};
pub use mapping::MappingTable;
pub use object::{
    CHALLENGE_LABEL_VALUE, CONFIG_OBJECT_LABEL, ConfigObject, ObjectKind, PAGE_LABEL_VALUE,
    classify,
};
pub use page::{PageRecord, PageSpec, extract_page};
