use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier field carried by every stored document
pub const ID_FIELD: &str = "_id";

/// Creation timestamp field, also the default sort key
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Query parameters that control the query instead of filtering it
pub const CONTROL_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl ComparisonOp {
    /// Parse a bracketed operator token (`averageCost[lte]`). Tokens are case-sensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "gt" => Some(ComparisonOp::Gt),
            "gte" => Some(ComparisonOp::Gte),
            "lt" => Some(ComparisonOp::Lt),
            "lte" => Some(ComparisonOp::Lte),
            "in" => Some(ComparisonOp::In),
            _ => None,
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
            ComparisonOp::In => "IN",
        }
    }
}

/// One `(field, operator, value)` condition of a predicate.
/// `field` may be a dotted path into nested objects (`location.state`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCondition {
    pub field: String,
    pub op: ComparisonOp,
    pub value: Value,
}

impl FieldCondition {
    pub fn new(field: impl Into<String>, op: ComparisonOp, value: Value) -> Self {
        Self { field: field.into(), op, value }
    }

    pub fn path(&self) -> Vec<&str> {
        self.field.split('.').collect()
    }
}

/// Conjunction of field conditions. An empty predicate matches every document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub conditions: Vec<FieldCondition>,
}

impl Predicate {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self { conditions: vec![FieldCondition::new(field, ComparisonOp::Eq, value)] }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn and(mut self, condition: FieldCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(|c| c.field.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    All,
    /// Returned fields; always contains the identifier field
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Default for Projection {
    fn default() -> Self {
        Projection::All
    }
}

impl Projection {
    /// Whether any part of the top-level `field` survives projection.
    /// Dotted paths (`location.state`) keep their parent key; a dotted
    /// exclusion only prunes inside it.
    pub fn returns(&self, field: &str) -> bool {
        match self {
            Projection::All => true,
            Projection::Include(fields) => fields.iter().any(|f| f == field || is_nested_under(f, field)),
            Projection::Exclude(fields) => !fields.iter().any(|f| f == field),
        }
    }
}

/// `path` names something strictly inside `field`
pub(crate) fn is_nested_under(path: &str, field: &str) -> bool {
    path.strip_prefix(field).is_some_and(|rest| rest.starts_with('.'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    /// Direction for breaking ties by insertion order: follows the primary key
    pub fn tie_break(keys: &[SortKey]) -> SortDirection {
        keys.first().map(|k| k.direction).unwrap_or(SortDirection::Asc)
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Desc }
    }
}

/// Store-level find request: predicate, sort and skip/limit window
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub predicate: Predicate,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    pub fn matching(predicate: Predicate) -> Self {
        Self { predicate, ..Default::default() }
    }
}
