//! # Operation Failures
//!
//! Structured description of a backend operation the access rules refused:
//! which path, which operation, and what was being written.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Kind of backend operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Single document read.
    Get,
    /// Collection or query read.
    List,
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Get => "get",
            OperationKind::List => "list",
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, OperationKind::Get | OperationKind::List)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A refused operation.
///
/// Reads carry no payload. Writes carry the data that was sent so the
/// developer overlay can show it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationFailure {
    /// Collection name or `collection/id`.
    pub path: String,
    pub operation: OperationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_data: Option<Value>,
}

impl OperationFailure {
    /// A refused `get` or `list`.
    pub fn read(path: impl Into<String>, operation: OperationKind) -> Self {
        OperationFailure {
            path: path.into(),
            operation,
            request_data: None,
        }
    }

    /// A refused write with the payload that was sent.
    pub fn write(path: impl Into<String>, operation: OperationKind, data: Option<Value>) -> Self {
        OperationFailure {
            path: path.into(),
            operation,
            request_data: data,
        }
    }

    /// Full diagnostic record, for development builds only.
    pub fn detail(&self) -> Value {
        json!({
            "path": self.path,
            "method": self.operation.as_str(),
            "requestData": self.request_data,
        })
    }
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} refused on {}", self.operation, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_has_no_payload() {
        let failure = OperationFailure::read("orders/o1", OperationKind::Get);
        assert_eq!(failure.request_data, None);
        assert_eq!(failure.to_string(), "get refused on orders/o1");
    }

    #[test]
    fn test_detail_shape() {
        let failure = OperationFailure::write(
            "products",
            OperationKind::Create,
            Some(json!({"name": "Kiwi"})),
        );
        let detail = failure.detail();
        assert_eq!(detail["path"], "products");
        assert_eq!(detail["method"], "create");
        assert_eq!(detail["requestData"]["name"], "Kiwi");
    }

    #[test]
    fn test_operation_kind_serde() {
        let json = serde_json::to_string(&OperationKind::List).unwrap();
        assert_eq!(json, "\"list\"");
        assert!(OperationKind::List.is_read());
        assert!(!OperationKind::Delete.is_read());
    }
}
