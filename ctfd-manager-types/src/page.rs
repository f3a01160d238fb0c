//! Page records decoded from `page-config` objects.

use crate::error::{ValidationError, ValidationResult};
use crate::object::{ConfigObject, require_fields};
use serde::{Deserialize, Serialize};

/// Payload keys a page object must carry, checked in this order.
pub const REQUIRED_PAGE_FIELDS: [&str; 5] = ["slug", "name", "path", "repository", "page"];

/// The nested `page` JSON blob.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSpec {
    pub slug: String,
    pub title: String,
    pub route: String,
    pub auth_required: bool,
    pub draft: bool,
    /// Rendering format, e.g. `markdown` or `html`.
    pub format: String,
    pub enabled: bool,
    pub content: String,
}

/// A decoded page definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Identity of the page; keys the remote binding.
    pub slug: String,
    pub name: String,
    pub path: String,
    pub repository: String,
    pub page: PageSpec,
    #[serde(default)]
    pub generated_at: String,
}

/// Validates and decodes a `page-config` object.
///
/// A top-level `content` entry replaces the content embedded in the blob, and
/// the blob inherits the outer slug when it has none of its own.
pub fn extract_page(object: &ConfigObject) -> ValidationResult<PageRecord> {
    require_fields(object, &REQUIRED_PAGE_FIELDS)?;

    let field = |key: &str| object.entry(key).unwrap_or_default().to_string();

    let slug = field("slug");
    if slug.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "slug",
            reason: "slug must not be empty".to_string(),
        });
    }

    let mut page: PageSpec =
        serde_json::from_str(&field("page")).map_err(|source| ValidationError::Decode {
            field: "page",
            source,
        })?;

    if let Some(content) = object.entry("content") {
        page.content = content.to_string();
    }
    if page.slug.is_empty() {
        page.slug = slug.clone();
    }

    Ok(PageRecord {
        slug,
        name: field("name"),
        path: field("path"),
        repository: field("repository"),
        page,
        generated_at: field("generated_at"),
    })
}
