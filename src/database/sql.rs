use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::Postgres;

use crate::geo::SphericalCap;
use crate::query::{ComparisonOp, FieldCondition, Predicate, SortKey};

/// Bind parameter for generated SQL
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    /// `#>` path into the JSONB document
    Path(Vec<String>),
    Json(Value),
    Float(f64),
    Int(i64),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// Generates parameterised SQL over the `documents (collection, id, doc, seq)` table.
/// Placeholders are numbered in the order parameters are pushed.
pub struct SqlBuilder {
    params: Vec<SqlParam>,
}

impl SqlBuilder {
    /// `$1` is always the collection name
    pub fn for_collection(collection: &str) -> Self {
        Self { params: vec![SqlParam::Text(collection.to_string())] }
    }

    pub fn param(&mut self, value: SqlParam) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    pub fn into_params(self) -> Vec<SqlParam> {
        self.params
    }

    pub fn where_clause(&mut self, predicate: &Predicate) -> String {
        let mut conditions = vec!["collection = $1".to_string()];
        for condition in &predicate.conditions {
            conditions.push(self.condition(condition));
        }
        conditions.join(" AND ")
    }

    /// Array-valued fields match when any element matches, so every operator
    /// is evaluated against the expanded elements of the field.
    fn condition(&mut self, condition: &FieldCondition) -> String {
        let path = self.param(SqlParam::Path(condition.path().iter().map(|p| p.to_string()).collect()));
        let value = self.param(SqlParam::Json(condition.value.clone()));
        let elements = format!(
            "jsonb_array_elements(CASE WHEN jsonb_typeof(doc #> {path}::text[]) = 'array' \
             THEN doc #> {path}::text[] ELSE jsonb_build_array(doc #> {path}::text[]) END) AS e(v)"
        );
        let test = match condition.op {
            ComparisonOp::Eq => format!("e.v = {value}::jsonb"),
            ComparisonOp::In => format!("{value}::jsonb @> jsonb_build_array(e.v)"),
            op => format!("jsonb_typeof(e.v) = jsonb_typeof({value}::jsonb) AND e.v {} {value}::jsonb", op.to_sql()),
        };
        format!("doc #> {path}::text[] IS NOT NULL AND EXISTS (SELECT 1 FROM {elements} WHERE {test})")
    }

    /// Missing fields sort as the smallest value. Insertion order breaks ties
    /// in the direction of the primary key.
    pub fn order_clause(&mut self, keys: &[SortKey]) -> String {
        let mut parts: Vec<String> = keys
            .iter()
            .map(|key| {
                let path = self.param(SqlParam::Path(key.field.split('.').map(str::to_string).collect()));
                let nulls = match key.direction {
                    crate::query::SortDirection::Asc => "NULLS FIRST",
                    crate::query::SortDirection::Desc => "NULLS LAST",
                };
                format!("doc #> {}::text[] {} {}", path, key.direction.to_sql(), nulls)
            })
            .collect();
        parts.push(format!("seq {}", SortKey::tie_break(keys).to_sql()));
        format!("ORDER BY {}", parts.join(", "))
    }

    /// Central-angle test against the cap; non-numeric coordinates never match
    pub fn within_clause(&mut self, field: &str, cap: &SphericalCap) -> String {
        let path = self.param(SqlParam::Path(field.split('.').map(str::to_string).collect()));
        let lat = self.param(SqlParam::Float(cap.center_lat));
        let lng = self.param(SqlParam::Float(cap.center_lng));
        let radius = self.param(SqlParam::Float(cap.radius_radians));
        let coords = format!("(doc #> {path}::text[])");
        format!(
            "collection = $1 AND CASE WHEN jsonb_typeof({coords} -> 0) = 'number' AND jsonb_typeof({coords} -> 1) = 'number' \
             THEN acos(LEAST(1.0, GREATEST(-1.0, \
             sin(radians(({coords} ->> 1)::float8)) * sin(radians({lat}::float8)) + \
             cos(radians(({coords} ->> 1)::float8)) * cos(radians({lat}::float8)) * \
             cos(radians(({coords} ->> 0)::float8 - {lng}::float8))))) <= {radius}::float8 \
             ELSE false END"
        )
    }
}

pub fn select_sql(collection: &str, predicate: &Predicate, sort: &[SortKey], skip: u64, limit: Option<u64>) -> SqlResult {
    let mut builder = SqlBuilder::for_collection(collection);
    let where_clause = builder.where_clause(predicate);
    let order_clause = builder.order_clause(sort);
    let mut query = format!("SELECT doc FROM documents WHERE {} {}", where_clause, order_clause);
    if let Some(limit) = limit {
        let p = builder.param(SqlParam::Int(i64::try_from(limit).unwrap_or(i64::MAX)));
        query.push_str(&format!(" LIMIT {}", p));
    }
    if skip > 0 {
        let p = builder.param(SqlParam::Int(i64::try_from(skip).unwrap_or(i64::MAX)));
        query.push_str(&format!(" OFFSET {}", p));
    }
    SqlResult { query, params: builder.into_params() }
}

pub fn count_sql(collection: &str, predicate: &Predicate) -> SqlResult {
    let mut builder = SqlBuilder::for_collection(collection);
    let where_clause = builder.where_clause(predicate);
    SqlResult {
        query: format!("SELECT COUNT(*) AS count FROM documents WHERE {}", where_clause),
        params: builder.into_params(),
    }
}

pub fn delete_sql(collection: &str, predicate: &Predicate) -> SqlResult {
    let mut builder = SqlBuilder::for_collection(collection);
    let where_clause = builder.where_clause(predicate);
    SqlResult { query: format!("DELETE FROM documents WHERE {}", where_clause), params: builder.into_params() }
}

pub fn within_sql(collection: &str, field: &str, cap: &SphericalCap) -> SqlResult {
    let mut builder = SqlBuilder::for_collection(collection);
    let where_clause = builder.within_clause(field, cap);
    SqlResult {
        query: format!("SELECT doc FROM documents WHERE {} ORDER BY seq ASC", where_clause),
        params: builder.into_params(),
    }
}

pub fn bind_param<'q>(
    q: sqlx::query::Query<'q, Postgres, PgArguments>,
    param: &'q SqlParam,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match param {
        SqlParam::Text(s) => q.bind(s.as_str()),
        SqlParam::Path(parts) => q.bind(parts),
        SqlParam::Json(v) => q.bind(v),
        SqlParam::Float(f) => q.bind(*f),
        SqlParam::Int(i) => q.bind(*i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortKey;
    use serde_json::json;

    #[test]
    fn numbers_placeholders_in_push_order() {
        let predicate = Predicate::all()
            .and(FieldCondition::new("averageCost", ComparisonOp::Lte, json!(10000)))
            .and(FieldCondition::new("location.state", ComparisonOp::Eq, json!("MA")));
        let sql = select_sql("bootcamps", &predicate, &[SortKey::desc("createdAt")], 2, Some(2));

        assert!(sql.query.starts_with("SELECT doc FROM documents WHERE collection = $1 AND"));
        assert!(sql.query.contains("e.v <= $3::jsonb"));
        assert!(sql.query.contains("e.v = $5::jsonb"));
        assert!(sql.query.contains("ORDER BY doc #> $6::text[] DESC NULLS LAST, seq DESC"));
        assert!(sql.query.ends_with("LIMIT $7 OFFSET $8"));
        assert_eq!(sql.params.len(), 8);
        assert_eq!(sql.params[3], SqlParam::Path(vec!["location".into(), "state".into()]));
        assert_eq!(sql.params[7], SqlParam::Int(2));
    }

    #[test]
    fn set_membership_uses_containment() {
        let predicate = Predicate::all().and(FieldCondition::new("careers", ComparisonOp::In, json!(["Business"])));
        let sql = count_sql("bootcamps", &predicate);
        assert!(sql.query.starts_with("SELECT COUNT(*) AS count FROM documents WHERE collection = $1"));
        assert!(sql.query.contains("$3::jsonb @> jsonb_build_array(e.v)"));
    }

    #[test]
    fn within_binds_center_and_radius() {
        let cap = SphericalCap::from_miles(40.0, -75.0, 50.0);
        let sql = within_sql("bootcamps", "location.coordinates", &cap);
        assert_eq!(sql.params[2], SqlParam::Float(40.0));
        assert_eq!(sql.params[3], SqlParam::Float(-75.0));
        assert_eq!(sql.params[4], SqlParam::Float(50.0 / 3963.0));
        assert!(sql.query.contains("<= $5::float8"));
    }
}
