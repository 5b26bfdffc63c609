//! Draws the shell's element tree. Portals are the last children of `body`,
//! so a preorder walk paints overlays over everything else.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Clear, Paragraph, Wrap};

use crate::dom::{ElementKind, NodeId};
use crate::shell::EditorShell;
use crate::shell::backend::ShellBackend;
use crate::ui::{UiFrame, safe_set_string};

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

pub fn draw<B: ShellBackend>(frame: &mut UiFrame<'_>, shell: &EditorShell<B>) {
    let doc = shell.doc();
    let active = doc.active_element();
    for node in doc.descendants(doc.body()) {
        let rect = doc.rect(node);
        if rect.width == 0 || rect.height == 0 {
            continue;
        }
        draw_node(frame, shell, node, rect, active == Some(node));
    }
    draw_status(frame, shell);
    draw_log(frame, shell);
}

fn draw_node<B: ShellBackend>(
    frame: &mut UiFrame<'_>,
    shell: &EditorShell<B>,
    node: NodeId,
    rect: Rect,
    focused: bool,
) {
    let doc = shell.doc();
    let (Some(kind), Some(label)) = (doc.kind(node), doc.label(node)) else {
        return;
    };
    match kind {
        _ if node == shell.editor() => {
            let border = if focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            let block = Block::bordered().title(label).border_style(border);
            let text: Vec<Line> = shell.text().lines().map(Line::from).collect();
            frame.render_widget(
                Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
                rect,
            );
        }
        // overlay roots carry a title; layout groups do not
        ElementKind::Container if !label.is_empty() => {
            frame.render_widget(Clear, rect);
            let title_style = if focused {
                focus_style(true)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            frame.render_widget(
                Block::bordered().title(Line::styled(label, title_style)),
                rect,
            );
        }
        ElementKind::Button => {
            let selected = shell.selected_bookmark() == Some(label.as_str());
            let marker = if selected { "*" } else { " " };
            set_clipped(frame, rect, &format!("[{marker}{label} ]"), focus_style(focused));
        }
        ElementKind::Input(_) => {
            let value = shell.field_value(node).unwrap_or_default();
            let cursor = if focused { "_" } else { "" };
            let style = focus_style(focused).add_modifier(Modifier::UNDERLINED);
            set_clipped(frame, rect, &format!("{value}{cursor}"), style);
        }
        ElementKind::Text => set_clipped(frame, rect, &label, Style::default()),
        _ => {}
    }
}

/// Text confined to the node's own cell range, so long values cannot spill
/// over a dialog border.
fn set_clipped(frame: &mut UiFrame<'_>, rect: Rect, text: &str, style: Style) {
    let bounds = rect.intersection(frame.area());
    safe_set_string(frame.buffer_mut(), bounds, rect.x, rect.y, text, style);
}

fn draw_status<B: ShellBackend>(frame: &mut UiFrame<'_>, shell: &EditorShell<B>) {
    let area = shell.status_area();
    let open: Vec<&str> = shell
        .open_overlays()
        .into_iter()
        .map(|name| name.title())
        .collect();
    let lock = if shell.doc().scroll_lock().is_locked() {
        " | scroll locked"
    } else {
        ""
    };
    let line = if open.is_empty() {
        format!(" {}{lock}", shell.status())
    } else {
        format!(" {} | open: {}{lock}", shell.status(), open.join(", "))
    };
    let style = Style::default().fg(Color::Black).bg(Color::Gray);
    frame.render_widget(Paragraph::new(line).style(style), area);
}

fn draw_log<B: ShellBackend>(frame: &mut UiFrame<'_>, shell: &EditorShell<B>) {
    let area = shell.log_area();
    let Some(log) = shell.log() else {
        return;
    };
    let block = Block::bordered().title("Log");
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = log.tail(visible).into_iter().map(Line::from).collect();
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .style(Style::default().fg(Color::DarkGray)),
        area,
    );
}
