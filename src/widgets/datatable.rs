use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{
        Block, Borders, Cell, Padding, Paragraph, Row, StatefulWidget, Table, TableState, Widget,
        Wrap,
    },
};

use crate::columns::ROW_INDEX_COLUMN;
use crate::export::cell_text;
use crate::table::TableState as TabState;

/// Scroll position and column selection of one tab's table view
#[derive(Debug, Default, Clone)]
pub struct DataTableState {
    pub table_state: TableState,
    /// Selected data column, as an index into the visible columns
    pub selected_column: usize,
    /// First data column drawn
    pub column_offset: usize,
    pub visible_rows: usize,
}

impl DataTableState {
    pub fn select_next(&mut self, num_rows: usize) {
        let next = self.table_state.selected().map_or(0, |i| i + 1);
        if next < num_rows {
            self.table_state.select(Some(next));
        }
    }

    pub fn select_previous(&mut self) {
        let prev = self.table_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.table_state.select(Some(prev));
    }

    pub fn page_down(&mut self, num_rows: usize) {
        if num_rows == 0 {
            return;
        }
        let step = self.visible_rows.max(1);
        let next = self.table_state.selected().map_or(0, |i| i + step);
        self.table_state.select(Some(next.min(num_rows - 1)));
    }

    pub fn page_up(&mut self) {
        let step = self.visible_rows.max(1);
        let prev = self.table_state.selected().map_or(0, |i| i.saturating_sub(step));
        self.table_state.select(Some(prev));
    }

    pub fn scroll_right(&mut self, num_columns: usize) {
        if self.selected_column + 1 < num_columns {
            self.selected_column += 1;
        }
    }

    pub fn scroll_left(&mut self) {
        self.selected_column = self.selected_column.saturating_sub(1);
    }

    /// Keep the selections inside a table of `num_rows` x `num_columns`
    pub fn clamp(&mut self, num_rows: usize, num_columns: usize) {
        self.selected_column = self.selected_column.min(num_columns.saturating_sub(1));
        self.column_offset = self.column_offset.min(self.selected_column);
        match self.table_state.selected() {
            Some(_) if num_rows == 0 => self.table_state.select(None),
            Some(i) if i >= num_rows => self.table_state.select(Some(num_rows - 1)),
            None if num_rows > 0 => self.table_state.select(Some(0)),
            _ => {}
        }
    }
}

/// Renders the visible columns of a tab's flattened rows
pub struct DataTable<'a> {
    tab: &'a TabState,
    max_column_width: u16,
}

impl<'a> DataTable<'a> {
    pub fn new(tab: &'a TabState) -> Self {
        Self {
            tab,
            max_column_width: 40,
        }
    }

    pub fn with_max_column_width(mut self, width: u16) -> Self {
        self.max_column_width = width.max(4);
        self
    }

    /// Width of `column` over the rows at `rows`, header (with sort arrow) included
    fn column_width(&self, column: &str, rows: &[usize]) -> u16 {
        let header = column.chars().count() + if self.is_sorted_by(column) { 2 } else { 0 };
        let widest = rows
            .iter()
            .map(|&i| cell_text(self.tab.flat_rows[i].get(column)).chars().count())
            .max()
            .unwrap_or(0)
            .max(header);
        u16::try_from(widest)
            .unwrap_or(u16::MAX)
            .min(self.max_column_width)
    }

    fn is_sorted_by(&self, column: &str) -> bool {
        self.tab.sort.as_ref().is_some_and(|key| key.column == column)
    }

    fn header_text(&self, column: &str) -> String {
        match &self.tab.sort {
            Some(key) if key.column == column => format!("{} {}", column, key.indicator()),
            _ => column.to_string(),
        }
    }
}

fn truncate(text: &str, width: u16) -> String {
    let width = width as usize;
    let flat = text.replace(['\n', '\r'], " ");
    if flat.chars().count() <= width {
        flat
    } else {
        let mut out: String = flat.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

impl StatefulWidget for DataTable<'_> {
    type State = DataTableState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        state.visible_rows = area.height.saturating_sub(1) as usize;
        let columns = self.tab.visible_columns();
        let num_rows = self.tab.flat_rows.len();
        state.clamp(num_rows, columns.len());

        if num_rows == 0 {
            let message = if self.tab.endpoint.trim().is_empty() {
                "Press u to enter an endpoint URL"
            } else {
                "No data loaded. Press l to load a page or L to load everything"
            };
            Paragraph::new(message)
                .centered()
                .style(Style::default().fg(Color::DarkGray))
                .block(
                    Block::default()
                        .borders(Borders::NONE)
                        .padding(Padding::top(area.height / 2)),
                )
                .wrap(Wrap { trim: true })
                .render(area, buf);
            return;
        }

        let order = self.tab.display_order();

        // Rows that will be on screen, to size columns from what is shown
        let first_row = state.table_state.offset().min(num_rows.saturating_sub(1));
        let shown = &order[first_row..(first_row + state.visible_rows.max(1)).min(num_rows)];

        let index_width = num_rows.to_string().len().max(ROW_INDEX_COLUMN.chars().count()) as u16;
        let mut widths = vec![index_width];
        let mut budget = area.width.saturating_sub(index_width + 1);

        // Scroll so the selected column is drawn
        let column_widths: Vec<u16> = columns
            .iter()
            .map(|c| self.column_width(c, shown))
            .collect();
        if state.selected_column < state.column_offset {
            state.column_offset = state.selected_column;
        }
        if !columns.is_empty() {
            while state.column_offset < state.selected_column {
                let used: u16 = column_widths[state.column_offset..=state.selected_column]
                    .iter()
                    .map(|w| w + 1)
                    .sum();
                if used <= budget {
                    break;
                }
                state.column_offset += 1;
            }
        }

        let mut drawn = Vec::new();
        for (i, column) in columns.iter().enumerate().skip(state.column_offset) {
            let width = column_widths[i];
            if budget < width.min(4) + 1 {
                break;
            }
            let width = width.min(budget.saturating_sub(1));
            budget = budget.saturating_sub(width + 1);
            widths.push(width);
            drawn.push((i, *column, width));
        }

        let header_style = Style::default().add_modifier(Modifier::BOLD);
        let header = Row::new(
            std::iter::once(Cell::from(ROW_INDEX_COLUMN).style(header_style.fg(Color::DarkGray)))
                .chain(drawn.iter().map(|(i, column, width)| {
                    let style = if *i == state.selected_column {
                        header_style.fg(Color::Cyan).add_modifier(Modifier::UNDERLINED)
                    } else {
                        header_style
                    };
                    Cell::from(truncate(&self.header_text(column), *width)).style(style)
                })),
        );

        // The row number is the load position, so it follows the row when sorted
        let rows = order.iter().map(|&index| {
            let row = &self.tab.flat_rows[index];
            Row::new(
                std::iter::once(
                    Cell::from((index + 1).to_string()).style(Style::default().fg(Color::DarkGray)),
                )
                .chain(drawn.iter().map(|(_, column, width)| {
                    Cell::from(truncate(&cell_text(row.get(*column)), *width))
                })),
            )
        });

        let table = Table::new(rows, widths.into_iter().map(Constraint::Length))
            .header(header)
            .column_spacing(1)
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        StatefulWidget::render(table, area, buf, &mut state.table_state);
    }
}
