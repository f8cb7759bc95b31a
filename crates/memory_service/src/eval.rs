//! Client-side evaluation of filters, sorters and `$select` over JSON records.

use std::cmp::Ordering;

use serde_json::{Map, Value};
use shared::query::{Filter, FilterOperator, Sorter};

pub(crate) type Entity = Map<String, Value>;

/// Resolves `Customer/Name` style navigation paths.
fn lookup<'a>(entity: &'a Entity, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('/');
    let first = entity.get(segments.next()?)?;
    segments.try_fold(first, |value, segment| value.get(segment))
}

/// Empty groups match everything.
pub(crate) fn matches(entity: &Entity, filter: &Filter) -> bool {
    match filter {
        Filter::Group { filters, and: true } => filters.iter().all(|f| matches(entity, f)),
        Filter::Group { filters, and: false } => {
            filters.is_empty() || filters.iter().any(|f| matches(entity, f))
        }
        Filter::Condition {
            path,
            operator,
            value,
            value2,
        } => {
            let field = lookup(entity, path).unwrap_or(&Value::Null);
            evaluate(field, *operator, value, value2.as_ref())
        }
    }
}

pub(crate) fn matches_all(entity: &Entity, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| matches(entity, filter))
}

fn evaluate(field: &Value, operator: FilterOperator, value: &Value, value2: Option<&Value>) -> bool {
    match operator {
        FilterOperator::Eq => compare(field, value) == Some(Ordering::Equal),
        FilterOperator::Ne => compare(field, value) != Some(Ordering::Equal),
        FilterOperator::Gt => compare(field, value) == Some(Ordering::Greater),
        FilterOperator::Ge => matches!(compare(field, value), Some(Ordering::Greater | Ordering::Equal)),
        FilterOperator::Lt => compare(field, value) == Some(Ordering::Less),
        FilterOperator::Le => matches!(compare(field, value), Some(Ordering::Less | Ordering::Equal)),
        FilterOperator::Between => {
            let Some(high) = value2 else {
                return false;
            };
            matches!(compare(field, value), Some(Ordering::Greater | Ordering::Equal))
                && matches!(compare(field, high), Some(Ordering::Less | Ordering::Equal))
        }
        FilterOperator::Contains => text_test(field, value, |f, v| f.contains(v)),
        FilterOperator::StartsWith => text_test(field, value, |f, v| f.starts_with(v)),
        FilterOperator::EndsWith => text_test(field, value, |f, v| f.ends_with(v)),
    }
}

/// Case-insensitive substring tests; numbers and booleans are matched on their text form.
fn text_test(field: &Value, value: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (as_text(field), as_text(value)) {
        (Some(field), Some(value)) => test(&field.to_lowercase(), &value.to_lowercase()),
        _ => false,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// `None` when the two values are not comparable (mixed types, objects, arrays).
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

/// Stable multi-key sort; missing or null values sort first, incomparable pairs keep their order.
pub(crate) fn sort(entities: &mut [Entity], sorters: &[Sorter]) {
    if sorters.is_empty() {
        return;
    }

    entities.sort_by(|a, b| {
        sorters
            .iter()
            .map(|sorter| {
                let left = lookup(a, &sorter.path).unwrap_or(&Value::Null);
                let right = lookup(b, &sorter.path).unwrap_or(&Value::Null);
                let ordering = match (left.is_null(), right.is_null()) {
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    _ => compare(left, right).unwrap_or(Ordering::Equal),
                };
                if sorter.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

/// Keeps only the comma-separated `$select` fields; `*` keeps everything.
pub(crate) fn project(entity: Entity, select: Option<&str>) -> Entity {
    let Some(select) = select else {
        return entity;
    };
    let fields: Vec<&str> = select
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .collect();
    if fields.is_empty() || fields.contains(&"*") {
        return entity;
    }

    entity
        .into_iter()
        .filter(|(name, _)| fields.contains(&name.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entity(value: Value) -> Entity {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn comparison_operators_follow_json_types() {
        let order = entity(json!({"Amount": 120, "Status": "Open", "Customer": {"Name": "Acme"}}));

        assert!(matches(&order, &Filter::new("Amount", FilterOperator::Gt, 100)));
        assert!(matches(&order, &Filter::new("Amount", FilterOperator::Le, 120.0)));
        assert!(!matches(&order, &Filter::new("Amount", FilterOperator::Lt, 120)));
        assert!(matches(&order, &Filter::between("Amount", 100, 150)));
        assert!(!matches(&order, &Filter::between("Amount", 121, 150)));
        assert!(matches(&order, &Filter::new("Status", FilterOperator::Ne, "Closed")));
        assert!(matches(&order, &Filter::new("Customer/Name", FilterOperator::Eq, "Acme")));
        assert!(!matches(&order, &Filter::new("Amount", FilterOperator::Eq, "120")));
    }

    #[test]
    fn text_operators_ignore_case() {
        let customer = entity(json!({"Name": "Northwind Traders", "Zip": 1234}));

        assert!(matches(&customer, &Filter::new("Name", FilterOperator::Contains, "WIND")));
        assert!(matches(&customer, &Filter::new("Name", FilterOperator::StartsWith, "north")));
        assert!(matches(&customer, &Filter::new("Name", FilterOperator::EndsWith, "traders")));
        assert!(matches(&customer, &Filter::new("Zip", FilterOperator::Contains, "23")));
        assert!(!matches(&customer, &Filter::new("Missing", FilterOperator::Contains, "x")));
    }

    #[test]
    fn groups_combine_with_and_or() {
        let customer = entity(json!({"Name": "Acme", "City": "Berlin"}));
        let either = Filter::any(vec![
            Filter::new("Name", FilterOperator::Eq, "Nope"),
            Filter::new("City", FilterOperator::Eq, "Berlin"),
        ]);
        let both = Filter::all(vec![
            Filter::new("Name", FilterOperator::Eq, "Nope"),
            Filter::new("City", FilterOperator::Eq, "Berlin"),
        ]);

        assert!(matches(&customer, &either));
        assert!(!matches(&customer, &both));
        assert!(matches(&customer, &Filter::any(Vec::new())));
    }

    #[test]
    fn sorts_by_several_keys_with_nulls_first() {
        let mut rows = vec![
            entity(json!({"id": 1, "city": "Berlin", "amount": 5})),
            entity(json!({"id": 2, "city": "Amsterdam", "amount": 7})),
            entity(json!({"id": 3, "city": "Berlin", "amount": 9})),
            entity(json!({"id": 4, "amount": 1})),
        ];
        sort(
            &mut rows,
            &[Sorter::ascending("city"), Sorter::descending("amount")],
        );
        let ids: Vec<i64> = rows.iter().filter_map(|r| r["id"].as_i64()).collect();
        assert_eq!(ids, vec![4, 2, 3, 1]);
    }

    #[test]
    fn select_projects_fields() {
        let row = entity(json!({"id": 1, "name": "Acme", "city": "Berlin"}));
        let projected = project(row.clone(), Some("id, name"));
        assert_eq!(Value::Object(projected), json!({"id": 1, "name": "Acme"}));
        assert_eq!(project(row.clone(), Some("*")), row);
        assert_eq!(project(row.clone(), None), row);
    }
}
