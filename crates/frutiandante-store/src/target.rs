//! # Targets
//!
//! What a live mirror points at: a single document reference or a query
//! over one collection.

use std::cmp::Ordering;
use std::fmt;

use serde_json::{Map, Value};

use frutiandante_core::Record;

// =============================================================================
// Document Reference
// =============================================================================

/// `collection/id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

impl DocumentRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        DocumentRef {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Reference into the collection of a record type.
    pub fn of<T: Record>(id: impl Into<String>) -> Self {
        Self::new(T::COLLECTION, id)
    }

    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

// =============================================================================
// Filters
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Array field contains the value.
    ArrayContains,
}

/// `field <op> value` over a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    /// Whether a document passes the filter. A missing field never matches.
    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::NotEq => actual != &self.value,
            FilterOp::ArrayContains => actual
                .as_array()
                .is_some_and(|items| items.contains(&self.value)),
            op => match compare_values(actual, &self.value) {
                Some(ord) => match op {
                    FilterOp::Lt => ord == Ordering::Less,
                    FilterOp::Lte => ord != Ordering::Greater,
                    FilterOp::Gt => ord == Ordering::Greater,
                    FilterOp::Gte => ord != Ordering::Less,
                    _ => false,
                },
                None => false,
            },
        }
    }
}

// =============================================================================
// Ordering
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Orders two JSON values of the same kind. Mixed kinds are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

// =============================================================================
// Query
// =============================================================================

/// Filtered, ordered, limited read over one collection.
///
/// ## Example
/// ```rust
/// use frutiandante_core::Order;
/// use frutiandante_store::target::{Direction, Query};
///
/// let query = Query::of::<Order>()
///     .where_eq("userId", "uid-1")
///     .order_by("createdAt", Direction::Descending)
///     .limit(20);
/// assert_eq!(query.collection, "orders");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Query {
            collection: name.into(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn of<T: Record>() -> Self {
        Self::collection(T::COLLECTION)
    }

    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_op(field, FilterOp::Eq, value)
    }

    pub fn where_op(
        mut self,
        field: impl Into<String>,
        op: FilterOp,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
            && self.order_by.iter().all(|o| doc.contains_key(&o.field))
    }

    /// Compares two documents by the ordering clauses.
    pub fn compare(&self, a: &Map<String, Value>, b: &Map<String, Value>) -> Ordering {
        for clause in &self.order_by {
            let ord = match (a.get(&clause.field), b.get(&clause.field)) {
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            };
            let ord = match clause.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_document_path() {
        let r = DocumentRef::of::<frutiandante_core::Product>("p1");
        assert_eq!(r.path(), "products/p1");
        assert_eq!(r.to_string(), "products/p1");
    }

    #[test]
    fn test_filter_ops() {
        let d = doc(json!({"price": 1000, "tags": ["fruta"], "status": "completed"}));
        let check = |field: &str, op, value: Value| {
            Filter {
                field: field.into(),
                op,
                value,
            }
            .matches(&d)
        };

        assert!(check("status", FilterOp::Eq, json!("completed")));
        assert!(check("status", FilterOp::NotEq, json!("pending")));
        assert!(check("price", FilterOp::Lt, json!(2000)));
        assert!(check("price", FilterOp::Lte, json!(1000)));
        assert!(check("price", FilterOp::Gte, json!(1000)));
        assert!(!check("price", FilterOp::Gt, json!(1000)));
        assert!(check("tags", FilterOp::ArrayContains, json!("fruta")));
        assert!(!check("missing", FilterOp::NotEq, json!(1)));
        assert!(!check("status", FilterOp::Lt, json!(5)));
    }

    #[test]
    fn test_query_order_requires_field() {
        let query = Query::collection("orders").order_by("createdAt", Direction::Descending);
        assert!(!query.matches(&doc(json!({"total": 1}))));
        assert!(query.matches(&doc(json!({"createdAt": "2024-01-01T00:00:00Z"}))));
    }

    #[test]
    fn test_query_compare_descending() {
        let query = Query::collection("orders").order_by("total", Direction::Descending);
        let a = doc(json!({"total": 10}));
        let b = doc(json!({"total": 20}));
        assert_eq!(query.compare(&a, &b), Ordering::Greater);
    }
}
