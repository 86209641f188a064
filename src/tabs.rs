//! The ordered set of open tabs and which one is active.

use tracing::debug;

use crate::paginator::PaginationCursor;
use crate::persistence::{SessionSnapshot, TabSnapshot, SNAPSHOT_VERSION};
use crate::table::TableState;

/// Open tabs. There is always at least one.
#[derive(Debug, Clone)]
pub struct TabCollection {
    tabs: Vec<TableState>,
    active: usize,
    /// Id for the next new tab. Ids are never reused, so a closed tab's late results
    /// cannot reach a newer tab.
    next_id: u64,
    /// Cursor given to new tabs (configured limit and parameter names, offset 0).
    defaults: PaginationCursor,
}

fn tab_title(id: u64) -> String {
    format!("Tab {}", id + 1)
}

impl TabCollection {
    pub fn new(defaults: PaginationCursor) -> Self {
        let first = TableState::new(0, tab_title(0), defaults.clone());
        Self {
            tabs: vec![first],
            active: 0,
            next_id: 1,
            defaults,
        }
    }

    /// Restore tabs from `snapshot`. An empty snapshot yields a single fresh tab.
    pub fn from_snapshot(snapshot: SessionSnapshot, defaults: PaginationCursor) -> Self {
        let tabs: Vec<TableState> = snapshot
            .tabs
            .into_iter()
            .map(|tab| {
                TableState::new(tab.id, tab.title, tab.cursor)
                    .with_endpoint(tab.endpoint)
                    .with_column_settings(tab.column_settings)
            })
            .collect();
        if tabs.is_empty() {
            return Self::new(defaults);
        }
        let active = tabs
            .iter()
            .position(|t| t.id == snapshot.active_tab)
            .unwrap_or(0);
        let next_id = tabs.iter().map(|t| t.id).max().map_or(0, |max| max + 1);
        Self {
            tabs,
            active,
            next_id,
            defaults,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: SNAPSHOT_VERSION,
            active_tab: self.active().id,
            tabs: self
                .tabs
                .iter()
                .map(|t| TabSnapshot {
                    id: t.id,
                    title: t.title.clone(),
                    endpoint: t.endpoint.clone(),
                    cursor: t.cursor.clone(),
                    column_settings: t.column_settings.clone(),
                })
                .collect(),
        }
    }

    /// Open a new tab after the existing ones and make it active. Returns its id.
    pub fn add_tab(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.tabs
            .push(TableState::new(id, tab_title(id), self.defaults.clone()));
        self.active = self.tabs.len() - 1;
        debug!(tab = id, "tab added");
        id
    }

    /// Close the tab `id`. Closing the last remaining tab or an unknown id does nothing.
    pub fn close_tab(&mut self, id: u64) -> bool {
        if self.tabs.len() <= 1 {
            return false;
        }
        let Some(index) = self.position(id) else {
            return false;
        };
        self.tabs.remove(index);
        if index == self.active {
            self.active = 0;
        } else if index < self.active {
            self.active -= 1;
        }
        debug!(tab = id, "tab closed");
        true
    }

    pub fn select(&mut self, id: u64) -> bool {
        match self.position(id) {
            Some(index) => {
                self.active = index;
                true
            }
            None => false,
        }
    }

    pub fn select_next(&mut self) {
        self.active = (self.active + 1) % self.tabs.len();
    }

    pub fn select_previous(&mut self) {
        self.active = (self.active + self.tabs.len() - 1) % self.tabs.len();
    }

    pub fn active(&self) -> &TableState {
        &self.tabs[self.active]
    }

    pub fn active_mut(&mut self) -> &mut TableState {
        &mut self.tabs[self.active]
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn get(&self, id: u64) -> Option<&TableState> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut TableState> {
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableState> {
        self.tabs.iter()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Always false; kept for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    fn position(&self, id: u64) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == id)
    }
}
