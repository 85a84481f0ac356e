//! The published config object
//!
//! The dashboard reads `apps.json` from a single named key/value object.
//! The object carries the document's [`ContentHash`] as an annotation so a
//! pass can tell whether the stored body is already current.

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Data key holding the apps document
pub const APPS_DATA_KEY: &str = "apps.json";

/// Annotation holding the hex SHA-256 of the apps document
pub const CONFIG_HASH_ANNOTATION: &str = "dashboard.homelab.io/config-hash";

/// Label marking objects owned by the operator
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL`]
pub const MANAGED_BY: &str = "duro-operator";

/// Namespace/name of a stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    /// Namespace
    pub namespace: String,
    /// Name
    pub name: String,
}

impl ObjectKey {
    /// Create a key
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A named key/value object with labels and annotations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigObject {
    /// Namespace
    pub namespace: String,
    /// Name
    pub name: String,
    /// Labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Data entries
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    /// Version token assigned by the store; `None` before creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl ConfigObject {
    /// Build a fresh object holding the apps document and its hash
    #[must_use]
    pub fn for_apps(key: &ObjectKey, body: &str, hash: &ContentHash) -> Self {
        let mut object = Self {
            namespace: key.namespace.clone(),
            name: key.name.clone(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            data: BTreeMap::new(),
            resource_version: None,
        };
        object.set_apps(body, hash);
        object
    }

    /// Key of this object
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }

    /// Stored integrity tag, if any
    #[must_use]
    pub fn config_hash(&self) -> Option<&str> {
        self.annotations
            .get(CONFIG_HASH_ANNOTATION)
            .map(String::as_str)
    }

    /// Stored apps document, if any
    #[must_use]
    pub fn apps_body(&self) -> Option<&str> {
        self.data.get(APPS_DATA_KEY).map(String::as_str)
    }

    /// Replace the body and its hash together
    ///
    /// Data is replaced wholesale; unrelated labels and annotations are kept
    /// and the managed-by label is re-asserted.
    pub fn set_apps(&mut self, body: &str, hash: &ContentHash) {
        self.data = BTreeMap::from([(APPS_DATA_KEY.to_string(), body.to_string())]);
        self.labels
            .insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string());
        self.annotations
            .insert(CONFIG_HASH_ANNOTATION.to_string(), hash.to_string());
    }
}
