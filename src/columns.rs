//! Column set derivation and per-tab column settings (visibility and display order).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::flatten::FlatRow;

/// Synthetic 1-based row number column. Always first and always visible.
pub const ROW_INDEX_COLUMN: &str = "№";

/// Distinct column keys seen in a tab's rows, in first-seen order, led by [`ROW_INDEX_COLUMN`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSet {
    keys: Vec<String>,
}

impl Default for ColumnSet {
    fn default() -> Self {
        Self {
            keys: vec![ROW_INDEX_COLUMN.to_string()],
        }
    }
}

impl ColumnSet {
    /// All keys including the row index column.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Keys without the row index column.
    pub fn data_columns(&self) -> &[String] {
        &self.keys[1..]
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no data columns have been seen.
    pub fn is_empty(&self) -> bool {
        self.keys.len() <= 1
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Append keys from `rows` that are not yet present. Existing keys are never removed.
    pub fn extend_with(&mut self, rows: &[FlatRow]) {
        let mut seen: HashSet<String> = self.keys.iter().cloned().collect();
        for row in rows {
            for key in row.keys() {
                if key != ROW_INDEX_COLUMN && seen.insert(key.clone()) {
                    self.keys.push(key.clone());
                }
            }
        }
    }
}

/// Derive the column set of `rows`: row index first, then every distinct key in first-seen order.
pub fn derive_columns(rows: &[FlatRow]) -> ColumnSet {
    let mut columns = ColumnSet::default();
    columns.extend_with(rows);
    columns
}

/// User-controlled column visibility and display order for one tab.
///
/// `order` never contains [`ROW_INDEX_COLUMN`]; a column missing from `visibility` is visible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSettings {
    pub visibility: BTreeMap<String, bool>,
    pub order: Vec<String>,
}

impl ColumnSettings {
    pub fn is_visible(&self, column: &str) -> bool {
        column == ROW_INDEX_COLUMN || self.visibility.get(column).copied().unwrap_or(true)
    }

    /// Data columns in display order, hidden ones removed.
    pub fn visible_columns(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(String::as_str)
            .filter(|c| self.is_visible(c))
            .collect()
    }

    /// Visible data columns of `order` that `columns` contains, in display order.
    pub fn visible_in<'a>(&'a self, columns: &ColumnSet) -> Vec<&'a str> {
        self.visible_columns()
            .into_iter()
            .filter(|c| columns.contains(c))
            .collect()
    }

    pub fn hidden_columns(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(String::as_str)
            .filter(|c| !self.is_visible(c))
            .collect()
    }

    /// Add columns from `columns` that `order` does not know yet, at the end and visible.
    /// Known columns keep their position and visibility.
    pub fn reconcile(&self, columns: &ColumnSet) -> ColumnSettings {
        let mut next = self.clone();
        let known: HashSet<&str> = self.order.iter().map(String::as_str).collect();
        for key in columns.data_columns() {
            if !known.contains(key.as_str()) && !next.order.contains(key) {
                next.order.push(key.clone());
                next.visibility.entry(key.clone()).or_insert(true);
            }
        }
        next
    }

    /// Show or hide `column`. The row index column cannot be hidden.
    pub fn set_visibility(&self, column: &str, visible: bool) -> ColumnSettings {
        let mut next = self.clone();
        if column != ROW_INDEX_COLUMN {
            next.visibility.insert(column.to_string(), visible);
        }
        next
    }

    pub fn show_all(&self) -> ColumnSettings {
        let mut next = self.clone();
        for visible in next.visibility.values_mut() {
            *visible = true;
        }
        next
    }

    /// Move the column at visible position `from` to visible position `to`.
    ///
    /// Hidden columns keep their place relative to each other in `order`. Out-of-range
    /// positions leave the settings unchanged.
    pub fn reorder(&self, from: usize, to: usize) -> ColumnSettings {
        self.reorder_by(from, to, |_| true)
    }

    /// [`ColumnSettings::reorder`] over the visible columns that `columns` contains.
    /// Columns absent from `columns` keep their place in `order`.
    pub fn reorder_within(&self, from: usize, to: usize, columns: &ColumnSet) -> ColumnSettings {
        self.reorder_by(from, to, |c| columns.contains(c))
    }

    fn reorder_by(&self, from: usize, to: usize, present: impl Fn(&str) -> bool) -> ColumnSettings {
        let shown = |settings: &ColumnSettings, c: &str| settings.is_visible(c) && present(c);
        let visible_positions: Vec<usize> = self
            .order
            .iter()
            .enumerate()
            .filter(|(_, c)| shown(self, c))
            .map(|(i, _)| i)
            .collect();
        let count = visible_positions.len();
        if from >= count || to >= count || from == to {
            return self.clone();
        }

        let mut next = self.clone();
        let moved = next.order.remove(visible_positions[from]);

        // Absolute positions of the remaining visible columns after the removal.
        let remaining: Vec<usize> = next
            .order
            .iter()
            .enumerate()
            .filter(|(_, c)| shown(&next, c))
            .map(|(i, _)| i)
            .collect();
        let insert_at = match remaining.get(to) {
            Some(&abs) => abs,
            None => remaining.last().map_or(next.order.len(), |&abs| abs + 1),
        };
        next.order.insert(insert_at, moved);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: &[serde_json::Value]) -> Vec<FlatRow> {
        values
            .iter()
            .map(|v| crate::flatten::flatten(v).unwrap())
            .collect()
    }

    fn settings(order: &[&str]) -> ColumnSettings {
        ColumnSettings {
            visibility: BTreeMap::new(),
            order: order.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn derive_columns_first_seen_order() {
        let flat = rows(&[
            json!({"b": 1, "a": 2}),
            json!({"c": 3, "a": 4}),
            json!({"z": {"y": 1}}),
        ]);
        let cols = derive_columns(&flat);
        assert_eq!(cols.keys(), &["№", "b", "a", "c", "z.y"]);
        assert_eq!(cols.data_columns(), &["b", "a", "c", "z.y"]);
    }

    #[test]
    fn derive_columns_of_nothing_is_row_index_only() {
        let cols = derive_columns(&[]);
        assert_eq!(cols.keys(), &[ROW_INDEX_COLUMN]);
        assert!(cols.is_empty());
    }

    #[test]
    fn extend_with_never_drops_keys() {
        let mut cols = derive_columns(&rows(&[json!({"a": 1, "b": 2})]));
        cols.extend_with(&rows(&[json!({"c": 3})]));
        assert_eq!(cols.keys(), &["№", "a", "b", "c"]);
    }

    #[test]
    fn reconcile_appends_new_visible_columns() {
        let base = settings(&["a", "b"]).set_visibility("b", false);
        let cols = derive_columns(&rows(&[json!({"c": 1, "a": 2})]));
        let next = base.reconcile(&cols);
        assert_eq!(next.order, vec!["a", "b", "c"]);
        assert!(!next.is_visible("b"));
        assert!(next.is_visible("c"));
        assert!(!next.order.iter().any(|c| c == ROW_INDEX_COLUMN));
    }

    #[test]
    fn set_visibility_ignores_row_index() {
        let s = settings(&["a"]).set_visibility(ROW_INDEX_COLUMN, false);
        assert!(s.is_visible(ROW_INDEX_COLUMN));
        assert!(s.visibility.is_empty());
    }

    #[test]
    fn show_all_unhides() {
        let s = settings(&["a", "b"])
            .set_visibility("a", false)
            .set_visibility("b", false)
            .show_all();
        assert_eq!(s.visible_columns(), vec!["a", "b"]);
    }

    #[test]
    fn reorder_first_to_last() {
        let s = settings(&["a", "b", "c"]).reorder(0, 2);
        assert_eq!(s.visible_columns(), vec!["b", "c", "a"]);
    }

    #[test]
    fn reorder_ignores_interleaved_hidden_columns() {
        let s = settings(&["a", "h1", "b", "h2", "c"])
            .set_visibility("h1", false)
            .set_visibility("h2", false);
        let moved = s.reorder(0, 2);
        assert_eq!(moved.visible_columns(), vec!["b", "c", "a"]);
        assert_eq!(moved.hidden_columns(), vec!["h1", "h2"]);

        let back = s.reorder(2, 0);
        assert_eq!(back.visible_columns(), vec!["c", "a", "b"]);
        assert_eq!(back.order, vec!["c", "a", "h1", "b", "h2"]);
    }

    #[test]
    fn reorder_out_of_range_is_noop() {
        let s = settings(&["a", "b"]);
        assert_eq!(s.reorder(0, 2), s);
        assert_eq!(s.reorder(5, 0), s);
        assert_eq!(s.reorder(1, 1), s);
    }

    #[test]
    fn visible_in_skips_columns_without_data() {
        let s = settings(&["id", "name", "sku"]).set_visibility("sku", false);
        let cols = derive_columns(&rows(&[json!({"sku": "s1", "name": "n"})]));
        assert_eq!(s.visible_in(&cols), vec!["name"]);
    }

    #[test]
    fn reorder_within_moves_among_present_columns() {
        let s = settings(&["id", "name", "sku", "price"]);
        let cols = derive_columns(&rows(&[json!({"sku": "s1", "price": 2})]));
        let moved = s.reorder_within(0, 1, &cols);
        assert_eq!(moved.visible_in(&cols), vec!["price", "sku"]);
        assert_eq!(moved.order, vec!["id", "name", "price", "sku"]);
        assert_eq!(s.reorder_within(0, 2, &cols), s);
    }
}
