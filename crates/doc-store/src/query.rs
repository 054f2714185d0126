use std::cmp::Ordering;

use serde_json::Value;

use crate::{Document, Result, StoreError};

/// Equality filter on a field of the document body.
///
/// `path` is a dot-separated field path such as `"user_id"` or `"totals.total"`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub path: String,
    pub value: Value,
}

/// What to order query results by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Store-managed creation time.
    #[default]
    CreatedAt,
    /// Store-managed last write time.
    UpdatedAt,
    /// A dot-separated field path in the body.
    Field(String),
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Builder for constructing document queries.
///
/// Selects documents of one collection whose body fields equal the given
/// values, ordered by `sort` with insertion order as the tiebreaker.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// Collection to search.
    pub collection: String,

    /// All filters must match.
    pub filters: Vec<FieldFilter>,

    /// Sort key.
    pub sort: SortKey,

    /// Sort direction.
    pub direction: SortDirection,

    /// Maximum number of documents to return.
    pub limit: Option<usize>,

    /// Number of documents to skip.
    pub offset: Option<usize>,
}

impl DocumentQuery {
    /// Creates a query over a whole collection.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// Adds an equality filter on a body field.
    pub fn filter(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    /// Sets the sort key and direction.
    pub fn sort_by(mut self, sort: SortKey, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips a number of results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Checks that every referenced field path is well formed.
    pub fn validate(&self) -> Result<()> {
        if self.collection.trim().is_empty() {
            return Err(StoreError::InvalidQuery("collection is required".to_string()));
        }
        for filter in &self.filters {
            path_segments(&filter.path)?;
        }
        if let SortKey::Field(path) = &self.sort {
            path_segments(path)?;
        }
        Ok(())
    }

    /// Returns true if the document satisfies every filter.
    pub fn matches(&self, document: &Document) -> bool {
        document.collection == self.collection
            && self
                .filters
                .iter()
                .all(|f| lookup(&document.body, &f.path) == Some(&f.value))
    }
}

/// Splits a dot-separated field path into its segments.
///
/// Segments are restricted to ASCII alphanumerics, `_` and `-`.
pub fn path_segments(path: &str) -> Result<Vec<String>> {
    let segments: Vec<String> = path.split('.').map(str::to_string).collect();
    let valid = segments.iter().all(|s| {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    });
    if !valid {
        return Err(StoreError::InvalidQuery(format!("invalid field path '{path}'")));
    }
    Ok(segments)
}

/// Resolves a dot-separated field path inside a JSON body.
pub fn lookup<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(body, |value, segment| value.get(segment))
}

/// Orders two optional JSON values the way the query engine sorts fields.
///
/// Missing values sort first. Numbers compare numerically and strings
/// lexicographically; values of different kinds compare by kind.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                let x = x.as_f64().unwrap_or_default();
                let y = y.as_f64().unwrap_or_default();
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => rank(a).cmp(&rank(b)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_segments_split_on_dots() {
        assert_eq!(
            path_segments("totals.total").unwrap(),
            vec!["totals".to_string(), "total".to_string()]
        );
        assert!(path_segments("totals..total").is_err());
        assert!(path_segments("body'; drop").is_err());
    }

    #[test]
    fn lookup_nested_field() {
        let body = json!({"totals": {"total": 1250}, "status": "pending"});
        assert_eq!(lookup(&body, "totals.total"), Some(&json!(1250)));
        assert_eq!(lookup(&body, "status"), Some(&json!("pending")));
        assert_eq!(lookup(&body, "missing.field"), None);
    }

    #[test]
    fn compare_numbers_numerically() {
        assert_eq!(
            compare_values(Some(&json!(9)), Some(&json!(10))),
            Ordering::Less
        );
        assert_eq!(compare_values(None, Some(&json!(0))), Ordering::Less);
        assert_eq!(
            compare_values(Some(&json!("b")), Some(&json!("a"))),
            Ordering::Greater
        );
    }

    #[test]
    fn validate_rejects_bad_sort_path() {
        let query = DocumentQuery::new("orders").sort_by(
            SortKey::Field("a b".to_string()),
            SortDirection::Descending,
        );
        assert!(matches!(query.validate(), Err(StoreError::InvalidQuery(_))));
    }
}
