use url::form_urlencoded;

use super::types::CONTROL_KEYS;

/// All values supplied for one field of the query string.
///
/// `values` collects plain `field=value` pairs in order of appearance.
/// `operators` collects bracketed `field[op]=value` pairs, keyed by the raw
/// operator token (validated later, when the predicate is built).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParam {
    pub values: Vec<String>,
    pub operators: Vec<(String, Vec<String>)>,
}

impl RawParam {
    fn push_operator(&mut self, operator: &str, value: String) {
        match self.operators.iter_mut().find(|(op, _)| op == operator) {
            Some((_, values)) => values.push(value),
            None => self.operators.push((operator.to_string(), vec![value])),
        }
    }

    fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

/// Raw request parameters, grouped by base field name in order of first appearance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRequest {
    entries: Vec<(String, RawParam)>,
}

impl FilterRequest {
    /// Parse an `application/x-www-form-urlencoded` query string
    pub fn parse(query: &str) -> Self {
        Self::from_pairs(form_urlencoded::parse(query.as_bytes()).into_owned())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut request = Self::default();
        for (key, value) in pairs {
            request.insert(key.as_ref(), value.into());
        }
        request
    }

    fn insert(&mut self, key: &str, value: String) {
        let (field, operator) = split_key(key);
        if field.is_empty() {
            return;
        }

        let idx = match self.entries.iter().position(|(f, _)| f == field) {
            Some(idx) => idx,
            None => {
                self.entries.push((field.to_string(), RawParam::default()));
                self.entries.len() - 1
            }
        };
        let param = &mut self.entries[idx].1;

        match operator {
            // `field[]=a&field[]=b` is list syntax, not an operator
            Some("") | None => param.values.push(value),
            Some(op) => param.push_operator(op, value),
        }
    }

    pub fn get(&self, field: &str) -> Option<&RawParam> {
        self.entries.iter().find(|(f, _)| f == field).map(|(_, p)| p)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Field parameters with the control keys removed. Borrows; the request is never modified.
    pub fn filters(&self) -> impl Iterator<Item = (&str, &RawParam)> {
        self.entries
            .iter()
            .filter(|(field, _)| !is_control_key(field))
            .map(|(field, param)| (field.as_str(), param))
    }

    pub fn control(&self) -> ControlParams {
        let value = |key: &str| self.get(key).and_then(RawParam::first_value).map(str::to_string);
        ControlParams {
            select: value("select"),
            sort: value("sort"),
            page: value("page"),
            limit: value("limit"),
        }
    }
}

/// Unparsed `select`, `sort`, `page` and `limit` parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlParams {
    pub select: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

pub fn is_control_key(field: &str) -> bool {
    CONTROL_KEYS.contains(&field)
}

/// Split `averageCost[lte]` into `("averageCost", Some("lte"))`
fn split_key(key: &str) -> (&str, Option<&str>) {
    match key.find('[') {
        Some(open) if key.ends_with(']') => (&key[..open], Some(&key[open + 1..key.len() - 1])),
        _ => (key, None),
    }
}
