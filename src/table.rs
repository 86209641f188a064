//! Per-tab table state and the reducer that evolves it.
//!
//! A [`TableState`] is only ever changed by [`TableState::apply`], which consumes the old
//! state and an event and returns the next state.

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::columns::{derive_columns, ColumnSet, ColumnSettings, ROW_INDEX_COLUMN};
use crate::error::LoadError;
use crate::flatten::FlatRow;
use crate::paginator::{
    LoadMode, LoadOutcome, LoadRequest, PageFetcher, PaginationCursor, Paginator, ParamNames,
};
use crate::sort::{sorted_indices, SortKey};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    Idle,
    LoadingPage,
    LoadingAll,
    Error(String),
}

impl LoadStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::LoadingPage | Self::LoadingAll)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Everything a tab knows: its request configuration, loaded rows and column settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableState {
    pub id: u64,
    pub title: String,
    pub endpoint: String,
    pub rows: Vec<Value>,
    pub flat_rows: Vec<FlatRow>,
    pub columns: ColumnSet,
    pub column_settings: ColumnSettings,
    pub cursor: PaginationCursor,
    pub meta: Map<String, Value>,
    pub status: LoadStatus,
    /// Display order of the rows. Never persisted or exported.
    pub sort: Option<SortKey>,
}

/// Inputs to the tab reducer.
#[derive(Debug)]
pub enum TableEvent {
    Renamed(String),
    /// New endpoint; the offset goes back to 0.
    EndpointChanged(String),
    /// Ignored when zero.
    LimitChanged(u64),
    OffsetChanged(u64),
    ParamNamesChanged(ParamNames),
    LoadStarted(LoadMode),
    LoadSucceeded(LoadOutcome),
    LoadFailed(LoadError),
    VisibilityChanged { column: String, visible: bool },
    ColumnMoved { from: usize, to: usize },
    AllColumnsShown,
    /// Sort the view by a column, toggling the direction when it is already sorted.
    SortRequested(String),
    SortCleared,
}

impl TableState {
    pub fn new(id: u64, title: impl Into<String>, cursor: PaginationCursor) -> Self {
        Self {
            id,
            title: title.into(),
            cursor,
            ..Self::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_column_settings(mut self, settings: ColumnSettings) -> Self {
        self.column_settings = settings;
        self
    }

    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    /// Build the request for a load in `mode`, or reject it.
    ///
    /// Rejections (`InProgress`, `MissingEndpoint`) do not change the state.
    pub fn begin_load(&self, mode: LoadMode, token: Option<&str>) -> Result<LoadRequest, LoadError> {
        if self.is_loading() {
            return Err(LoadError::InProgress);
        }
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(LoadError::MissingEndpoint);
        }
        Ok(LoadRequest {
            endpoint: endpoint.to_string(),
            cursor: self.cursor.clone(),
            mode,
            token: token.map(str::to_string),
        })
    }

    /// Data columns currently shown, in display order. Only columns of the loaded rows
    /// are shown; settings for other columns are kept for later loads.
    pub fn visible_columns(&self) -> Vec<&str> {
        self.column_settings.visible_in(&self.columns)
    }

    /// Columns as rendered and exported: row index, then visible data columns.
    pub fn display_columns(&self) -> Vec<&str> {
        let mut cols = vec![ROW_INDEX_COLUMN];
        cols.extend(self.visible_columns());
        cols
    }

    /// Hidden columns of the loaded rows.
    pub fn hidden_columns(&self) -> Vec<&str> {
        self.column_settings
            .hidden_columns()
            .into_iter()
            .filter(|c| self.columns.contains(c))
            .collect()
    }

    /// Indices into `flat_rows` in the order they are displayed.
    pub fn display_order(&self) -> Vec<usize> {
        sorted_indices(&self.flat_rows, self.sort.as_ref())
    }

    /// Apply `event` and return the next state.
    pub fn apply(mut self, event: TableEvent) -> Self {
        match event {
            TableEvent::Renamed(title) => self.title = title,
            TableEvent::EndpointChanged(endpoint) => {
                self.endpoint = endpoint;
                self.cursor.offset = 0;
            }
            TableEvent::LimitChanged(limit) => {
                if limit > 0 {
                    self.cursor.limit = limit;
                }
            }
            TableEvent::OffsetChanged(offset) => self.cursor.offset = offset,
            TableEvent::ParamNamesChanged(names) => self.cursor.param_names = names,
            TableEvent::LoadStarted(mode) => {
                self.status = match mode {
                    LoadMode::Single => LoadStatus::LoadingPage,
                    LoadMode::All => LoadStatus::LoadingAll,
                };
            }
            TableEvent::LoadSucceeded(outcome) => self = self.commit(outcome),
            TableEvent::LoadFailed(err) => {
                self.status = match err {
                    LoadError::Cancelled => LoadStatus::Idle,
                    err => {
                        warn!(tab = self.id, error = %err, "load failed");
                        LoadStatus::Error(err.user_message())
                    }
                };
            }
            TableEvent::VisibilityChanged { column, visible } => {
                self.column_settings = self.column_settings.set_visibility(&column, visible);
            }
            TableEvent::ColumnMoved { from, to } => {
                self.column_settings = self.column_settings.reorder_within(from, to, &self.columns);
            }
            TableEvent::AllColumnsShown => self.column_settings = self.column_settings.show_all(),
            TableEvent::SortRequested(column) => {
                self.sort = Some(SortKey::toggled(self.sort.as_ref(), &column));
            }
            TableEvent::SortCleared => self.sort = None,
        }
        self
    }

    /// In-place form of [`TableState::apply`].
    pub fn update(&mut self, event: TableEvent) {
        let state = std::mem::take(self);
        *self = state.apply(event);
    }

    fn commit(mut self, outcome: LoadOutcome) -> Self {
        match outcome.mode {
            LoadMode::Single => {
                self.columns = derive_columns(&outcome.flat_rows);
                self.rows = outcome.rows;
                self.flat_rows = outcome.flat_rows;
            }
            LoadMode::All => {
                self.columns.extend_with(&outcome.flat_rows);
                self.rows.extend(outcome.rows);
                self.flat_rows.extend(outcome.flat_rows);
            }
        }
        self.column_settings = self.column_settings.reconcile(&self.columns);
        self.cursor.offset = outcome.next_offset;
        self.meta.extend(outcome.meta);
        self.status = LoadStatus::Idle;
        info!(
            tab = self.id,
            rows = self.rows.len(),
            columns = self.columns.len(),
            offset = self.cursor.offset,
            "tab updated"
        );
        self
    }
}

/// Run a complete load for `state` on the calling thread.
///
/// Rejected requests leave `state` untouched. Any other failure leaves rows, columns,
/// cursor and meta as they were and records the error in `state.status`.
pub fn load<F: PageFetcher>(
    state: &mut TableState,
    mode: LoadMode,
    fetcher: F,
    token: Option<&str>,
) -> Result<LoadSummary, LoadError> {
    let request = state.begin_load(mode, token)?;
    state.update(TableEvent::LoadStarted(mode));
    match Paginator::new(fetcher).run(&request) {
        Ok(outcome) => {
            let summary = LoadSummary {
                rows_loaded: outcome.rows.len(),
                pages_fetched: outcome.pages_fetched,
                next_offset: outcome.next_offset,
            };
            state.update(TableEvent::LoadSucceeded(outcome));
            Ok(summary)
        }
        Err(err) => {
            state.update(TableEvent::LoadFailed(err.clone()));
            Err(err)
        }
    }
}

/// Counts reported after a successful [`load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows_loaded: usize,
    pub pages_fetched: usize,
    pub next_offset: u64,
}
