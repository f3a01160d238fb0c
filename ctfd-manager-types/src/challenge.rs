//! Challenge records decoded from `challenge-config` objects.

use crate::error::{ValidationError, ValidationResult};
use crate::object::{ConfigObject, null_as_default, require_fields};
use serde::{Deserialize, Serialize};

/// Payload keys a challenge object must carry, checked in this order.
pub const REQUIRED_CHALLENGE_FIELDS: [&str; 5] =
    ["name", "path", "repository", "challenge", "description"];

/// Directory below the challenge path that holds downloadable files.
pub const FILES_DIR: &str = "k8s/files";

const INSTANCED_TYPE: &str = "instanced";

/// One accepted flag.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagSpec {
    pub flag: String,
    pub case_sensitive: bool,
}

/// Location of a container image build context.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerfileLocation {
    pub context: String,
    pub location: String,
    pub identifier: serde_json::Value,
}

/// The nested `challenge` JSON blob.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeSpec {
    #[serde(rename = "$schema", skip_serializing_if = "String::is_empty")]
    pub schema: String,
    pub enabled: bool,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
    pub category: String,
    pub difficulty: String,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub challenge_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub instanced_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub instanced_name: String,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub instanced_subdomains: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub connection: String,
    #[serde(rename = "flag", deserialize_with = "null_as_default")]
    pub flags: Vec<FlagSpec>,
    pub points: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub decay: i64,
    pub min_points: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description_location: String,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub dockerfile_locations: Vec<DockerfileLocation>,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// How players receive a challenge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Shared, statically deployed challenge.
    Standard,
    /// Per-player instances provisioned from a template.
    Instanced {
        template_name: String,
        instance_type: String,
    },
}

impl ChallengeSpec {
    /// Resolves the delivery mode and, for instanced challenges, the template
    /// name and instance-type descriptor.
    pub fn delivery_mode(&self) -> DeliveryMode {
        if self.challenge_type != INSTANCED_TYPE {
            return DeliveryMode::Standard;
        }

        let template_name = if !self.instanced_name.is_empty() && self.instanced_name != self.slug
        {
            self.instanced_name.clone()
        } else {
            self.slug.clone()
        };

        let base_type = if self.instanced_type.is_empty() {
            "none"
        } else {
            self.instanced_type.as_str()
        };

        // A first subdomain carrying its own "type:" prefix means the list is
        // already a complete descriptor.
        let instance_type = match self.instanced_subdomains.first() {
            None => base_type.to_string(),
            Some(first) if first.contains(':') => self.instanced_subdomains.join(","),
            Some(_) => format!("{base_type}:{}", self.instanced_subdomains.join(",")),
        };

        DeliveryMode::Instanced {
            template_name,
            instance_type,
        }
    }

    /// Tags with empty entries removed.
    pub fn non_empty_tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str).filter(|tag| !tag.is_empty())
    }
}

/// A decoded challenge definition, copied out of its config object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub name: String,
    pub path: String,
    pub repository: String,
    pub challenge: ChallengeSpec,
    pub description: String,
    #[serde(default)]
    pub generated_at: String,
}

impl ChallengeRecord {
    /// Stable identity used for idempotent upsert.
    pub fn slug(&self) -> &str {
        &self.challenge.slug
    }

    /// Repository path of the file manifest directory.
    pub fn files_dir(&self) -> String {
        format!("{}/{FILES_DIR}", self.path.trim_end_matches('/'))
    }

    /// Description with the generated header removed.
    pub fn display_description(&self) -> String {
        strip_generated_header(&self.description)
    }
}

/// Drops the first two lines of a description when it has more than two.
pub fn strip_generated_header(description: &str) -> String {
    let lines: Vec<&str> = description.split('\n').collect();
    match lines.get(2..) {
        Some(rest) if !rest.is_empty() => rest.join("\n"),
        _ => description.to_string(),
    }
}

/// Validates and decodes a `challenge-config` object.
pub fn extract_challenge(object: &ConfigObject) -> ValidationResult<ChallengeRecord> {
    require_fields(object, &REQUIRED_CHALLENGE_FIELDS)?;

    let field = |key: &str| object.entry(key).unwrap_or_default().to_string();

    let challenge: ChallengeSpec = serde_json::from_str(&field("challenge"))
        .map_err(|source| ValidationError::Decode {
            field: "challenge",
            source,
        })?;

    if challenge.slug.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "challenge",
            reason: "slug must not be empty".to_string(),
        });
    }

    Ok(ChallengeRecord {
        name: field("name"),
        path: field("path"),
        repository: field("repository"),
        challenge,
        description: field("description"),
        generated_at: field("generated_at"),
    })
}
