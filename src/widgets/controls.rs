use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    widgets::{Paragraph, Widget},
};

/// Key bindings shown while browsing a table
pub const TABLE_CONTROLS: [(&str, &str); 11] = [
    ("u", "URL"),
    ("l", "Load"),
    ("L", "All"),
    ("x", "Stop"),
    ("s", "Sort"),
    ("h", "Hide"),
    ("H", "Show"),
    ("<>", "Move"),
    ("e", "Export"),
    ("t", "Tab"),
    ("q", "Quit"),
];

/// Key bindings shown while editing a field
pub const EDIT_CONTROLS: [(&str, &str); 2] = [("Enter", "Apply"), ("Esc", "Cancel")];

/// Bottom bar of key/action pairs with an optional row count on the right
pub struct Controls<'a> {
    pub controls: &'a [(&'a str, &'a str)],
    pub row_count: Option<usize>,
    pub dimmed: bool,
}

impl Default for Controls<'_> {
    fn default() -> Self {
        Self {
            controls: &TABLE_CONTROLS,
            row_count: None,
            dimmed: false,
        }
    }
}

impl<'a> Controls<'a> {
    pub fn new(controls: &'a [(&'a str, &'a str)]) -> Self {
        Self {
            controls,
            ..Self::default()
        }
    }

    pub fn with_row_count(mut self, row_count: usize) -> Self {
        self.row_count = Some(row_count);
        self
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }
}

impl Widget for &Controls<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut constraints = self
            .controls
            .iter()
            .fold(vec![], |mut acc, (key, action)| {
                acc.push(Constraint::Length(key.chars().count() as u16 + 2));
                acc.push(Constraint::Length(action.chars().count() as u16 + 1));
                acc
            });

        if self.row_count.is_some() {
            constraints.push(Constraint::Length(15)); // "Rows: 12345"
        }
        constraints.push(Constraint::Fill(1));

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);
        let bar = Color::DarkGray;
        let base_style = if self.dimmed {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        for (i, (key, action)) in self.controls.iter().enumerate() {
            let j = i * 2;
            Paragraph::new(*key)
                .style(base_style.bold())
                .centered()
                .render(layout[j], buf);
            Paragraph::new(*action)
                .style(base_style.bg(bar))
                .render(layout[j + 1], buf);
        }

        let mut fill_idx = self.controls.len() * 2;
        if let Some(count) = self.row_count {
            Paragraph::new(format!("Rows: {}", count))
                .style(base_style.bg(bar).fg(if self.dimmed {
                    Color::DarkGray
                } else {
                    Color::White
                }))
                .right_aligned()
                .render(layout[fill_idx], buf);
            fill_idx += 1;
        }

        Paragraph::new("")
            .style(base_style.bg(bar))
            .render(layout[fill_idx], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(buf: &Buffer) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect()
    }

    #[test]
    fn renders_keys_and_actions() {
        let area = Rect::new(0, 0, 120, 1);
        let mut buf = Buffer::empty(area);
        Controls::default().with_row_count(42).render(area, &mut buf);
        let text = line(&buf);
        assert!(text.contains("Load"));
        assert!(text.contains("Export"));
        assert!(text.contains("Rows: 42"));
    }

    #[test]
    fn edit_controls() {
        let area = Rect::new(0, 0, 40, 1);
        let mut buf = Buffer::empty(area);
        Controls::new(&EDIT_CONTROLS).render(area, &mut buf);
        assert!(line(&buf).contains("Apply"));
    }
}
