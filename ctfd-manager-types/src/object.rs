//! Config objects as observed from the cluster, and their classification.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label key that marks an object as managed by this service.
pub const CONFIG_OBJECT_LABEL: &str = "challenges.kube-ctf.io/configmap";

/// Label value for challenge definitions.
pub const CHALLENGE_LABEL_VALUE: &str = "challenge-config";

/// Label value for page definitions.
pub const PAGE_LABEL_VALUE: &str = "page-config";

/// A namespaced, labeled key-value record sourced from the cluster.
///
/// The payload is kept in a `BTreeMap` so iteration order is always sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigObject {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl ConfigObject {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            labels: BTreeMap::new(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Returns a payload value.
    pub fn entry(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}

/// What a config object represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Challenge,
    Page,
    Unknown,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Challenge => "challenge",
            Self::Page => "page",
            Self::Unknown => "unknown",
        }
    }
}

/// Classifies an object from the value of [`CONFIG_OBJECT_LABEL`].
pub fn classify(object: &ConfigObject) -> ObjectKind {
    match object.labels.get(CONFIG_OBJECT_LABEL).map(String::as_str) {
        Some(CHALLENGE_LABEL_VALUE) => ObjectKind::Challenge,
        Some(PAGE_LABEL_VALUE) => ObjectKind::Page,
        _ => ObjectKind::Unknown,
    }
}

/// Checks that every key in `required` is present, in order.
pub(crate) fn require_fields(
    object: &ConfigObject,
    required: &[&'static str],
) -> crate::ValidationResult<()> {
    match required
        .iter()
        .copied()
        .find(|key| !object.data.contains_key(*key))
    {
        Some(missing) => Err(crate::ValidationError::MissingField(missing)),
        None => Ok(()),
    }
}

/// Deserializes `null` as the type's default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
