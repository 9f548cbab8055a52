//! The UI renders the application state into a tree pane and a hex pane.
//!
//! The tree pane shows the flattened tree with box-drawing characters. The hex pane paints
//! every selected node's bytes in that node's colour and marks the caret.

use crate::app_state::{AppState, Focus, VisibleRow};
use crate::node::NodeKind;
use crate::palette::Rgb;
use crate::tree::Expansion;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

/// Renders both panes and the help bar.
pub fn draw(f: &mut Frame, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    draw_tree(f, app, panes[0]);
    draw_hex(f, app, panes[1]);

    let help_text = if let Some(ref msg) = app.message {
        msg.clone()
    } else {
        format!(
            "{} | Tab: Switch pane | ↑/↓: Navigate | ←/→: Close/Open | e: Load all | r: Reload | q: Quit",
            app.status()
        )
    };
    let help = Paragraph::new(help_text).block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[1]);
}

/// Generate box-drawing prefix for tree structure
fn get_tree_prefix(level: usize, is_last: bool, parent_states: &[bool]) -> String {
    if level == 0 {
        return String::new();
    }

    let mut prefix = String::new();

    // Draw vertical lines for parent levels
    for i in 0..level.saturating_sub(1) {
        if i < parent_states.len() && parent_states[i] {
            prefix.push_str("│   ");
        } else {
            prefix.push_str("    ");
        }
    }

    if is_last {
        prefix.push_str("└── ");
    } else {
        prefix.push_str("├── ");
    }

    prefix
}

/// Whether each row is the last among its siblings.
fn last_at_level(rows: &[VisibleRow]) -> Vec<bool> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let level = row.tree_level;
            !rows[i + 1..]
                .iter()
                .take_while(|next| next.tree_level >= level)
                .any(|next| next.tree_level == level)
        })
        .collect()
}

fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

fn kind_style(kind: NodeKind) -> Style {
    match kind {
        NodeKind::Struct => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        NodeKind::Array => Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        NodeKind::Enum => Style::default().fg(Color::Magenta),
        NodeKind::Value => Style::default(),
        NodeKind::Error => Style::default().fg(Color::Red).add_modifier(Modifier::DIM),
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let block = Block::default().borders(Borders::ALL).title(title);
    if focused {
        block.border_style(Style::default().fg(Color::Yellow))
    } else {
        block
    }
}

fn draw_tree(f: &mut Frame, app: &AppState, area: Rect) {
    let is_last = last_at_level(&app.rows);
    let mut parent_has_siblings: Vec<bool> = Vec::new();

    let items: Vec<ListItem> = app
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            while parent_has_siblings.len() > row.tree_level {
                parent_has_siblings.pop();
            }
            while parent_has_siblings.len() < row.tree_level {
                parent_has_siblings.push(false);
            }
            let prefix = get_tree_prefix(row.tree_level, is_last[i], &parent_has_siblings);
            if let Some(last) = parent_has_siblings.last_mut() {
                *last = !is_last[i];
            }

            let node = app.tree.node(row.node);
            let marker = match node.expansion {
                Expansion::Expanding => "⋯ ",
                _ if !app.tree.may_have_children(row.node) => "  ",
                _ if app.open.contains(&row.node) => "▾ ",
                _ => "▸ ",
            };
            let swatch = if node.data.span.is_some() {
                Span::styled("■ ", Style::default().fg(rgb(node.color)))
            } else {
                Span::raw("  ")
            };

            let line = Line::from(vec![
                Span::raw(prefix),
                Span::raw(marker),
                swatch,
                Span::styled(
                    node.data.label(app.bytes_preview),
                    kind_style(node.data.kind()),
                ),
            ]);

            let style = if app.selected.contains(&row.node) && i != app.current_row {
                Style::default().add_modifier(Modifier::UNDERLINED)
            } else {
                Style::default()
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let title = format!(
        "Tree ({} nodes, {} offsets)",
        app.tree.len(),
        app.tree.offset_mode()
    );
    let list = List::new(items)
        .block(pane_block(title, app.focus == Focus::Tree))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default().with_selected(Some(app.current_row));
    f.render_stateful_widget(list, area, &mut state);
}

fn byte_style(app: &AppState, offset: u64) -> Style {
    let mut style = Style::default();
    if let Some((_, color)) = app
        .highlight
        .painted
        .iter()
        .rev()
        .find(|(range, _)| range.start <= offset && offset < range.end)
    {
        style = style.bg(rgb(*color)).fg(Color::Black);
    }
    if app.anchor.is_some() {
        let interval = app.byte_interval();
        if interval.start <= offset && offset < interval.end {
            style = style.bg(Color::Yellow).fg(Color::Black);
        }
    }
    if offset == app.caret {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

fn draw_hex(f: &mut Frame, app: &AppState, area: Rect) {
    let per_row = app.bytes_per_row;
    let height = usize::from(area.height.saturating_sub(2)).max(1);
    let total_rows = app.data.len().div_ceil(per_row);
    let caret_row = usize::try_from(app.caret).unwrap_or(usize::MAX) / per_row;
    let top = caret_row
        .saturating_sub(height / 2)
        .min(total_rows.saturating_sub(height));

    let lines: Vec<Line> = (top..total_rows.min(top + height))
        .map(|row| {
            let start = row * per_row;
            let chunk = &app.data[start..(start + per_row).min(app.data.len())];

            let mut spans = vec![Span::styled(
                format!("{start:08x}  "),
                Style::default().fg(Color::DarkGray),
            )];
            let first = u64::try_from(start).unwrap_or(u64::MAX);
            for (byte, offset) in chunk.iter().zip(first..) {
                spans.push(Span::styled(format!("{byte:02x}"), byte_style(app, offset)));
                spans.push(Span::raw(" "));
            }
            spans.push(Span::raw("   ".repeat(per_row - chunk.len())));
            spans.push(Span::raw(" "));
            for (byte, offset) in chunk.iter().zip(first..) {
                let ch = if byte.is_ascii_graphic() || *byte == b' ' {
                    char::from(*byte)
                } else {
                    '.'
                };
                spans.push(Span::styled(ch.to_string(), byte_style(app, offset)));
            }
            Line::from(spans)
        })
        .collect();

    let title = format!("Bytes ({} bytes, caret {:#x})", app.data.len(), app.caret);
    let hex = Paragraph::new(lines).block(pane_block(title, app.focus == Focus::Bytes));
    f.render_widget(hex, area);
}
