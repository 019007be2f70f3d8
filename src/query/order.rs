use super::error::QueryError;
use super::types::{Projection, SortDirection, SortKey, CREATED_AT_FIELD, ID_FIELD};

pub struct QueryOrder;

impl QueryOrder {
    /// `sort=-averageCost,name`; a leading `-` sorts descending.
    /// Absent or empty input falls back to newest first.
    pub fn parse(sort: Option<&str>) -> Vec<SortKey> {
        let keys: Vec<SortKey> = sort
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .filter_map(|part| match part.strip_prefix('-') {
                Some(field) if !field.is_empty() => Some(SortKey::desc(field)),
                Some(_) => None,
                None => Some(SortKey::asc(part.trim_start_matches('+'))),
            })
            .filter(|key| !key.field.is_empty())
            .collect();

        if keys.is_empty() {
            vec![SortKey::desc(CREATED_AT_FIELD)]
        } else {
            keys
        }
    }

    pub fn generate(keys: &[SortKey]) -> String {
        if keys.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = keys
            .iter()
            .map(|k| format!("{}{}", if k.direction == SortDirection::Desc { "-" } else { "" }, k.field))
            .collect();
        parts.join(",")
    }
}

pub struct QuerySelect;

impl QuerySelect {
    /// `select=name,averageCost` returns those fields plus `_id`;
    /// `select=-description` returns everything except the listed fields.
    pub fn parse(select: Option<&str>) -> Result<Projection, QueryError> {
        let fields: Vec<&str> = select
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect();

        if fields.is_empty() {
            return Ok(Projection::All);
        }

        let excluded = fields.iter().filter(|f| f.starts_with('-')).count();
        if excluded == fields.len() {
            let names = fields.iter().map(|f| f.trim_start_matches('-').to_string()).collect();
            return Ok(Projection::Exclude(names));
        }
        if excluded > 0 {
            return Err(QueryError::InvalidProjection(
                "cannot mix included and excluded fields".to_string(),
            ));
        }

        let mut names = vec![ID_FIELD.to_string()];
        for field in fields {
            if !names.iter().any(|n| n == field) {
                names.push(field.to_string());
            }
        }
        Ok(Projection::Include(names))
    }
}
