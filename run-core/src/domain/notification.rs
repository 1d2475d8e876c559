//! Notification domain model
//!
//! A notification tells the pollers that something happened to a repository.
//! On the wire it is a flat JSON object: the operation lives under `op` and
//! every attribute is a sibling string field.
//!
//! ```json
//! {"op": "create", "remote": "https://example.com/repo.git", "branch": "master"}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::repo::GitRepo;

/// What happened to the subject of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// A repository was registered
    Create,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
        }
    }
}

/// Immutable notification payload
///
/// Fields are private so a notification can't change once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    op: Operation,

    #[serde(flatten)]
    attributes: BTreeMap<String, String>,
}

impl Notification {
    /// Builds a notification from an operation and its attributes
    ///
    /// An `op` attribute would collide with the operation key on the wire,
    /// so it is discarded.
    pub fn new(op: Operation, mut attributes: BTreeMap<String, String>) -> Self {
        attributes.remove("op");
        Self { op, attributes }
    }

    /// Notification announcing a newly registered repository
    pub fn created(repo: &GitRepo) -> Self {
        let attributes = BTreeMap::from([
            ("remote".to_string(), repo.remote.clone()),
            ("branch".to_string(), repo.branch.clone()),
        ]);

        Self::new(Operation::Create, attributes)
    }

    pub fn op(&self) -> Operation {
        self.op
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Looks up a single attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Serializes the notification to its JSON wire form
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parses a notification from its JSON wire form
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_notification_wire_shape() {
        let repo = GitRepo::new("test.git", "master");
        let bytes = Notification::created(&repo).to_bytes().unwrap();

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"op": "create", "remote": "test.git", "branch": "master"})
        );
    }

    #[test]
    fn test_parse_keeps_attributes_apart_from_op() {
        let raw = br#"{"op":"create","remote":"a.git","branch":"dev"}"#;
        let notification = Notification::from_bytes(raw).unwrap();

        assert_eq!(notification.op(), Operation::Create);
        assert_eq!(notification.attribute("remote"), Some("a.git"));
        assert_eq!(notification.attribute("branch"), Some("dev"));
        assert_eq!(notification.attribute("op"), None);
        assert_eq!(notification.attributes().len(), 2);
    }

    #[test]
    fn test_op_attribute_is_discarded() {
        let attributes = BTreeMap::from([
            ("op".to_string(), "delete".to_string()),
            ("remote".to_string(), "a.git".to_string()),
        ]);
        let notification = Notification::new(Operation::Create, attributes);

        let value: serde_json::Value =
            serde_json::from_slice(&notification.to_bytes().unwrap()).unwrap();
        assert_eq!(value["op"], "create");
        assert_eq!(value["remote"], "a.git");
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        let raw = br#"{"op":"explode","remote":"a.git"}"#;
        assert!(Notification::from_bytes(raw).is_err());
    }
}
