use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const SELECT: &str = "$select";
pub const EXPAND: &str = "$expand";
pub const TOP: &str = "$top";
pub const SKIP: &str = "$skip";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("binding fields must contain at least one field")]
    EmptyBindingFields,
    #[error("unsupported filter operator '{0}'")]
    UnknownOperator(String),
    #[error("unknown operation kind '{0}'")]
    UnknownOperationKind(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Read,
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Read => "read",
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "read" => Ok(OperationKind::Read),
            "create" => Ok(OperationKind::Create),
            "update" => Ok(OperationKind::Update),
            "delete" => Ok(OperationKind::Delete),
            other => Err(QueryError::UnknownOperationKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Between,
    Contains,
    StartsWith,
    EndsWith,
}

impl FilterOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Ne => "ne",
            FilterOperator::Gt => "gt",
            FilterOperator::Ge => "ge",
            FilterOperator::Lt => "lt",
            FilterOperator::Le => "le",
            FilterOperator::Between => "bt",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "startswith",
            FilterOperator::EndsWith => "endswith",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let operator = match value.to_ascii_lowercase().as_str() {
            "eq" => FilterOperator::Eq,
            "ne" => FilterOperator::Ne,
            "gt" => FilterOperator::Gt,
            "ge" => FilterOperator::Ge,
            "lt" => FilterOperator::Lt,
            "le" => FilterOperator::Le,
            "bt" | "between" => FilterOperator::Between,
            "contains" => FilterOperator::Contains,
            "startswith" => FilterOperator::StartsWith,
            "endswith" => FilterOperator::EndsWith,
            _ => return Err(QueryError::UnknownOperator(value.to_string())),
        };
        Ok(operator)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single condition or a group of filters joined by AND (`and = true`) or OR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    Condition {
        path: String,
        operator: FilterOperator,
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value2: Option<Value>,
    },
    Group {
        filters: Vec<Filter>,
        and: bool,
    },
}

impl Filter {
    pub fn new(path: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Filter::Condition {
            path: path.into(),
            operator,
            value: value.into(),
            value2: None,
        }
    }

    pub fn between(path: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Filter::Condition {
            path: path.into(),
            operator: FilterOperator::Between,
            value: low.into(),
            value2: Some(high.into()),
        }
    }

    pub fn all(filters: Vec<Filter>) -> Self {
        Filter::Group { filters, and: true }
    }

    pub fn any(filters: Vec<Filter>) -> Self {
        Filter::Group {
            filters,
            and: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorter {
    pub path: String,
    #[serde(default)]
    pub descending: bool,
}

impl Sorter {
    pub fn ascending(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            descending: false,
        }
    }

    pub fn descending(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            descending: true,
        }
    }
}

/// OData system query options (`$select`, `$expand`, `$top`, `$skip`) keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlParameters(BTreeMap<String, String>);

impl UrlParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// One `Contains` condition per binding field, OR-ed together.
pub fn build_filters<S: AsRef<str>>(query: &str, binding_fields: &[S]) -> Result<Filter, QueryError> {
    if binding_fields.is_empty() {
        return Err(QueryError::EmptyBindingFields);
    }

    let filters = binding_fields
        .iter()
        .map(|field| Filter::new(field.as_ref(), FilterOperator::Contains, query))
        .collect();
    Ok(Filter::any(filters))
}

/// Application-level search filter: the OR group from [`build_filters`] wrapped in an AND group.
pub fn search_filter<S: AsRef<str>>(query: &str, binding_fields: &[S]) -> Result<Filter, QueryError> {
    Ok(Filter::all(vec![build_filters(query, binding_fields)?]))
}
