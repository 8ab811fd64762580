//! Paginated, filtered, sortable list queries.
//!
//! Turns a [`PageInfo`] plus a set of [`Filter`]s into SQL text and bound
//! parameters. API field names are resolved through a [`FieldMap`]; a name
//! that is not in the map is rejected instead of being interpolated, so the
//! only caller-controlled text that reaches the database is bound.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::db::DatabaseError;

/// API field name to column name.
pub type FieldMap = &'static [(&'static str, &'static str)];

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Desc,
        }
    }
}

/// Pagination and ordering for a list request.
///
/// A `limit` of zero means no limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub offset: i64,
    pub limit: i64,
    #[serde(default)]
    pub sort: Vec<Sort>,
}

/// How a filter compares its value(s) against a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterModifier {
    Equals,
    Not,
    Contains,
    Starts,
    Ends,
    In,
    NotIn,
    Min,
    Max,
}

impl FilterModifier {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Not => "not",
            Self::Contains => "contains",
            Self::Starts => "starts",
            Self::Ends => "ends",
            Self::In => "in",
            Self::NotIn => "notin",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for FilterModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FilterModifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(Self::Equals),
            "not" => Ok(Self::Not),
            "contains" => Ok(Self::Contains),
            "starts" => Ok(Self::Starts),
            "ends" => Ok(Self::Ends),
            "in" => Ok(Self::In),
            "notin" => Ok(Self::NotIn),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => Err(format!("unknown filter modifier: {other}")),
        }
    }
}

/// A single filter condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub modifier: FilterModifier,
    pub value: Vec<String>,
}

impl Filter {
    pub fn new(field: &str, modifier: FilterModifier, value: &[&str]) -> Self {
        Self {
            field: field.to_string(),
            modifier,
            value: value.iter().map(|v| (*v).to_string()).collect(),
        }
    }
}

/// A bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    Text(String),
    Int(i64),
}

/// SQL text with its parameters in bind order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

/// Whether to build the count query or the row query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    Count,
    Rows,
}

/// Build a list query over `table`.
///
/// Soft-deleted rows are always excluded. In [`ListMode::Count`] the query
/// selects `COUNT(*)` and ignores ordering and pagination.
pub fn build_list_query(
    table: &str,
    page: &PageInfo,
    default_sort: &Sort,
    filters: &[Filter],
    field_map: FieldMap,
    mode: ListMode,
) -> Result<ListQuery, DatabaseError> {
    let mut params = Vec::new();
    let mut clauses = vec![format!("{} = 0", quote("is_deleted"))];

    for filter in filters {
        clauses.push(filter_clause(filter, field_map, &mut params)?);
    }

    let select = match mode {
        ListMode::Count => "COUNT(*)",
        ListMode::Rows => "*",
    };
    let mut sql = format!(
        "SELECT {select} FROM {} WHERE {}",
        quote(table),
        clauses.join(" AND ")
    );

    if mode == ListMode::Rows {
        let sorts = if page.sort.is_empty() {
            std::slice::from_ref(default_sort)
        } else {
            page.sort.as_slice()
        };
        let order = sorts
            .iter()
            .map(|s| Ok(format!("{} {}", column(&s.field, field_map)?, s.direction.as_sql())))
            .collect::<Result<Vec<_>, DatabaseError>>()?;
        sql.push_str(" ORDER BY ");
        sql.push_str(&order.join(", "));

        if page.limit > 0 {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(QueryParam::Int(page.limit));
            params.push(QueryParam::Int(page.offset.max(0)));
        } else if page.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(QueryParam::Int(page.offset));
        }
    }

    Ok(ListQuery { sql, params })
}

fn filter_clause(
    filter: &Filter,
    field_map: FieldMap,
    params: &mut Vec<QueryParam>,
) -> Result<String, DatabaseError> {
    let col = column(&filter.field, field_map)?;

    match filter.modifier {
        FilterModifier::In | FilterModifier::NotIn => {
            if filter.value.is_empty() {
                return Err(DatabaseError::Validation(format!(
                    "filter '{}' with modifier '{}' needs at least one value",
                    filter.field, filter.modifier
                )));
            }
            let placeholders = vec!["?"; filter.value.len()].join(", ");
            params.extend(filter.value.iter().cloned().map(QueryParam::Text));
            let op = if filter.modifier == FilterModifier::In {
                "IN"
            } else {
                "NOT IN"
            };
            Ok(format!("{col} {op} ({placeholders})"))
        }
        FilterModifier::Equals
        | FilterModifier::Not
        | FilterModifier::Contains
        | FilterModifier::Starts
        | FilterModifier::Ends
        | FilterModifier::Min
        | FilterModifier::Max => {
            let [value] = filter.value.as_slice() else {
                return Err(DatabaseError::Validation(format!(
                    "filter '{}' with modifier '{}' needs exactly one value",
                    filter.field, filter.modifier
                )));
            };
            let (clause, bound) = match filter.modifier {
                FilterModifier::Equals => (format!("{col} = ?"), value.clone()),
                FilterModifier::Not => (format!("{col} != ?"), value.clone()),
                FilterModifier::Contains => (like(&col), format!("%{}%", escape_like(value))),
                FilterModifier::Starts => (like(&col), format!("{}%", escape_like(value))),
                FilterModifier::Ends => (like(&col), format!("%{}", escape_like(value))),
                FilterModifier::Min => (format!("{col} >= ?"), value.clone()),
                FilterModifier::Max => (format!("{col} <= ?"), value.clone()),
                FilterModifier::In => (format!("{col} IN (?)"), value.clone()),
                FilterModifier::NotIn => (format!("{col} NOT IN (?)"), value.clone()),
            };
            params.push(QueryParam::Text(bound));
            Ok(clause)
        }
    }
}

fn column(field: &str, field_map: FieldMap) -> Result<String, DatabaseError> {
    field_map
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, col)| quote(col))
        .ok_or_else(|| DatabaseError::Validation(format!("unknown field: {field}")))
}

fn quote(ident: &str) -> String {
    format!("\"{ident}\"")
}

fn like(col: &str) -> String {
    format!("{col} LIKE ? ESCAPE '\\'")
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: FieldMap = &[("name", "name"), ("type", "type"), ("expires", "expires_on")];

    fn rows(page: &PageInfo, filters: &[Filter]) -> Result<ListQuery, DatabaseError> {
        build_list_query(
            "certificate",
            page,
            &Sort::asc("name"),
            filters,
            FIELDS,
            ListMode::Rows,
        )
    }

    #[test]
    fn default_sort_applies_when_none_requested() {
        let q = rows(&PageInfo::default(), &[]).unwrap();
        assert_eq!(
            q.sql,
            r#"SELECT * FROM "certificate" WHERE "is_deleted" = 0 ORDER BY "name" ASC"#
        );
        assert!(q.params.is_empty());
    }

    #[test]
    fn count_mode_skips_order_and_limit() {
        let page = PageInfo {
            offset: 10,
            limit: 5,
            sort: vec![Sort::desc("name")],
        };
        let q = build_list_query(
            "certificate",
            &page,
            &Sort::asc("name"),
            &[],
            FIELDS,
            ListMode::Count,
        )
        .unwrap();
        assert_eq!(
            q.sql,
            r#"SELECT COUNT(*) FROM "certificate" WHERE "is_deleted" = 0"#
        );
        assert!(q.params.is_empty());
    }

    #[test]
    fn pagination_binds_limit_then_offset() {
        let page = PageInfo {
            offset: 20,
            limit: 10,
            sort: vec![Sort::desc("expires")],
        };
        let q = rows(&page, &[]).unwrap();
        assert!(q.sql.ends_with(r#"ORDER BY "expires_on" DESC LIMIT ? OFFSET ?"#));
        assert_eq!(q.params, vec![QueryParam::Int(10), QueryParam::Int(20)]);
    }

    #[test]
    fn filters_bind_values_in_order() {
        let filters = [
            Filter::new("type", FilterModifier::In, &["http", "dns"]),
            Filter::new("name", FilterModifier::Starts, &["api_"]),
        ];
        let q = rows(&PageInfo::default(), &filters).unwrap();
        assert!(q.sql.contains(r#""type" IN (?, ?)"#));
        assert!(q.sql.contains(r#""name" LIKE ? ESCAPE '\'"#));
        assert_eq!(
            q.params,
            vec![
                QueryParam::Text("http".into()),
                QueryParam::Text("dns".into()),
                QueryParam::Text("api\\_%".into()),
            ]
        );
    }

    #[test]
    fn unknown_filter_field_is_rejected() {
        let filters = [Filter::new("1=1; DROP TABLE certificate", FilterModifier::Equals, &["x"])];
        let err = rows(&PageInfo::default(), &filters).unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        let page = PageInfo {
            sort: vec![Sort::asc("password")],
            ..PageInfo::default()
        };
        assert!(matches!(
            rows(&page, &[]).unwrap_err(),
            DatabaseError::Validation(_)
        ));
    }

    #[test]
    fn single_value_modifiers_reject_multiple_values() {
        let filters = [Filter::new("name", FilterModifier::Equals, &["a", "b"])];
        assert!(rows(&PageInfo::default(), &filters).is_err());

        let filters = [Filter::new("name", FilterModifier::In, &[])];
        assert!(rows(&PageInfo::default(), &filters).is_err());
    }

    #[test]
    fn modifier_parses_from_str() {
        assert_eq!("notin".parse(), Ok(FilterModifier::NotIn));
        assert!("between".parse::<FilterModifier>().is_err());
    }
}
