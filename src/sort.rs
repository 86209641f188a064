//! Display ordering of a tab's rows by one column.

use serde_json::Value;
use std::cmp::Ordering;

use crate::flatten::FlatRow;

/// Column the rows are ordered by, and in which direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub ascending: bool,
}

impl SortKey {
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    /// Next sort after the user asks to sort by `column`: ascending, or descending when
    /// `column` is already sorted ascending.
    pub fn toggled(current: Option<&SortKey>, column: &str) -> SortKey {
        match current {
            Some(key) if key.column == column && key.ascending => SortKey {
                column: column.to_string(),
                ascending: false,
            },
            _ => SortKey::ascending(column),
        }
    }

    /// Arrow shown next to the sorted column's header
    pub fn indicator(&self) -> &'static str {
        if self.ascending {
            "↑"
        } else {
            "↓"
        }
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total order over cell values: missing and null first, then booleans, numbers,
/// strings, arrays. Numbers compare numerically, arrays by their JSON text.
pub fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x @ Value::Array(_)), Some(y @ Value::Array(_)))
        | (Some(x @ Value::Object(_)), Some(y @ Value::Object(_))) => {
            x.to_string().cmp(&y.to_string())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Indices into `rows` in display order. The sort is stable, so equal cells keep load order.
pub fn sorted_indices(rows: &[FlatRow], key: Option<&SortKey>) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..rows.len()).collect();
    if let Some(key) = key {
        indices.sort_by(|&a, &b| {
            let ord = compare_cells(rows[a].get(&key.column), rows[b].get(&key.column));
            if key.ascending {
                ord
            } else {
                ord.reverse()
            }
        });
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten_rows;
    use serde_json::json;

    fn rows(values: Vec<Value>) -> Vec<FlatRow> {
        flatten_rows(&values).unwrap()
    }

    #[test]
    fn toggle_cycles_direction() {
        let first = SortKey::toggled(None, "age");
        assert_eq!(first, SortKey::ascending("age"));
        let second = SortKey::toggled(Some(&first), "age");
        assert!(!second.ascending);
        let third = SortKey::toggled(Some(&second), "age");
        assert!(third.ascending);
        let other = SortKey::toggled(Some(&second), "name");
        assert_eq!(other, SortKey::ascending("name"));
    }

    #[test]
    fn numbers_sort_numerically() {
        let rows = rows(vec![json!({"n": 10}), json!({"n": 9}), json!({"n": 100})]);
        assert_eq!(sorted_indices(&rows, Some(&SortKey::ascending("n"))), vec![1, 0, 2]);
        let desc = SortKey {
            column: "n".to_string(),
            ascending: false,
        };
        assert_eq!(sorted_indices(&rows, Some(&desc)), vec![2, 0, 1]);
    }

    #[test]
    fn missing_values_first_and_ties_stable() {
        let rows = rows(vec![
            json!({"s": "b"}),
            json!({"other": 1}),
            json!({"s": "a"}),
            json!({"s": "b", "x": 1}),
            json!({"s": null}),
        ]);
        assert_eq!(
            sorted_indices(&rows, Some(&SortKey::ascending("s"))),
            vec![1, 4, 2, 0, 3]
        );
    }

    #[test]
    fn no_key_keeps_load_order() {
        let rows = rows(vec![json!({"a": 2}), json!({"a": 1})]);
        assert_eq!(sorted_indices(&rows, None), vec![0, 1]);
    }

    #[test]
    fn mixed_types_order_by_kind() {
        assert_eq!(
            compare_cells(Some(&json!(5)), Some(&json!("5"))),
            Ordering::Less
        );
        assert_eq!(
            compare_cells(Some(&json!(true)), Some(&json!(0))),
            Ordering::Less
        );
        assert_eq!(compare_cells(None, Some(&Value::Null)), Ordering::Equal);
    }
}
