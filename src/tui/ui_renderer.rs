use super::app_logic::ReviewApp;
use super::app_state::{AppMode, FileTab, Severity};
use crate::tags::Tag;
use crate::utils;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

fn tag_color(tag: Tag) -> Color {
    match tag {
        Tag::Standard => Color::Blue,
        Tag::Template => Color::Green,
        Tag::PendingReview => Color::Red,
    }
}

fn draw_top_bar(f: &mut Frame, app: &ReviewApp, area: Rect) {
    let sel = app.selection();
    let watch = if app.clipboard_watch.is_enabled() {
        Span::styled("ON", Style::default().fg(Color::Green).bold())
    } else {
        Span::styled("off", Style::default().fg(Color::DarkGray))
    };
    let line = Line::from(vec![
        Span::raw("Project: "),
        Span::styled(sel.project, Style::default().bold()),
        Span::raw("  Delivery: "),
        Span::styled(sel.delivery, Style::default().bold()),
        Span::raw("  |  Clipboard watch: "),
        watch,
    ]);
    let bar = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("LMReview v{}", env!("CARGO_PKG_VERSION"))),
    );
    f.render_widget(bar, area);
}

fn draw_file_list(f: &mut Frame, app: &mut ReviewApp, area: Rect) {
    app.list_viewport_height = area.height.saturating_sub(2) as usize;
    app.ensure_cursor_visible_in_viewport();

    let title = match app.file_tab {
        FileTab::Inbox => format!("Untagged ({}) | Tab: tagged", app.listing.untagged_count()),
        FileTab::Tagged => format!("Tagged ({}) | Tab: untagged", app.listing.tagged_count()),
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let entries = app.visible_entries();
    if entries.is_empty() {
        let hint = match app.file_tab {
            FileTab::Inbox => "No untagged files.\n\nDrop files into the input folder (i)\nand tag them here.",
            FileTab::Tagged => "No tagged files yet.",
        };
        let empty = Paragraph::new(hint)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let end = (app.scroll_offset + app.list_viewport_height).min(entries.len());
    let items: Vec<ListItem> = entries[app.scroll_offset..end]
        .iter()
        .map(|entry| match entry.tag {
            Some(tag) => ListItem::new(Line::from(vec![
                Span::styled(
                    format!("[{:<14}] ", tag.label()),
                    Style::default().fg(tag_color(tag)),
                ),
                Span::raw(entry.name.clone()),
            ])),
            None => ListItem::new(entry.name.clone()),
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("❯ ");

    let mut state = ratatui::widgets::ListState::default();
    if app.cursor >= app.scroll_offset && app.cursor < end {
        state.select(Some(app.cursor - app.scroll_offset));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_prompt(f: &mut Frame, app: &ReviewApp, area: Rect) {
    let targets = app.listing.review_targets();
    let title = match app.review_target() {
        Some(t) => format!(
            "Prompt | target {}/{}: {} ([ ] to change)",
            app.review_idx + 1,
            targets.len(),
            t
        ),
        None => "Prompt | no pending-review file".to_string(),
    };
    let body = if app.prompt.is_empty() {
        Text::styled(
            "g: generate   y: copy   x: clear   n: open NotebookLM",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Text::raw(app.prompt.as_str())
    };
    let widget = Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(widget, area);
}

fn reply_line_count(reply: &str) -> u16 {
    u16::try_from(reply.lines().count()).unwrap_or(u16::MAX)
}

fn draw_reply(f: &mut Frame, app: &ReviewApp, area: Rect) {
    let editing = app.mode == AppMode::EditingReply;
    let title = if editing {
        "AI reply | editing, Esc to finish".to_string()
    } else {
        match &app.last_report {
            Some(p) => format!(
                "AI reply | last report: {}",
                p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
            ),
            None => "AI reply".to_string(),
        }
    };
    let mut block = Block::default().borders(Borders::ALL).title(title);
    if editing {
        block = block.border_style(Style::default().fg(Color::Yellow));
    }

    let body = if app.reply.is_empty() && !editing {
        Text::styled(
            "Paste the reply here (terminal paste), r: type, v: take clipboard\nw: export Word   W: export from clipboard   c: watch clipboard",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Text::raw(app.reply.as_str())
    };

    // Keep the tail of a long reply in view.
    let inner_height = area.height.saturating_sub(2);
    let line_count = reply_line_count(&app.reply);
    let scroll = line_count.saturating_sub(inner_height);
    let widget = Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(block);
    f.render_widget(widget, area);
}

fn draw_notification(f: &mut Frame, app: &ReviewApp, area: Rect) {
    if let Some(n) = &app.notification {
        let widget = Paragraph::new(format!(" {}", n.text)).style(Style::default().fg(Color::Cyan));
        f.render_widget(widget, area);
    }
}

fn draw_status_bar(f: &mut Frame, app: &ReviewApp, area: Rect) {
    let sel = app.selection();
    let input = app.workspace.input_dir(&sel);
    let output = app.workspace.output_dir(&sel);
    let text = format!(
        " untagged: {}  tagged: {}  |  input: {}  |  output: {}",
        app.listing.untagged_count(),
        app.listing.tagged_count(),
        utils::shorten_path(&input.to_string_lossy(), 52),
        utils::shorten_path(&output.to_string_lossy(), 52),
    );
    f.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn draw_help_block(f: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from("↑↓/jk: Nav | Tab: Untagged/Tagged | 1 Standard 2 Template 3 Review 0 Clear | p/d: Project/Delivery"),
        Line::from("g: Prompt | y: Copy | r: Edit reply | w/W: Export Word | c: Watch clipboard | i/o: Folders | ?: Help | q: Quit"),
    ];
    let help = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Keys"));
    f.render_widget(help, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn draw_popup(f: &mut Frame, app: &ReviewApp) {
    let Some(popup) = &app.popup else {
        return;
    };
    let color = match popup.severity {
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    };
    let area = centered_rect(60, 30, f.area());
    let body = format!("{}\n\n(press any key)", popup.body);
    let widget = Paragraph::new(body).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(popup.title),
    );
    f.render_widget(Clear, area);
    f.render_widget(widget, area);
}

fn draw_help_screen(f: &mut Frame) {
    let text = "\
1) Press i to open the input folder and drop the documents in.
2) Tag untagged files: 1 Standard, 2 Template, 3 Pending review (0 clears).
3) Pick the review target with [ and ], press g to build the prompt, y to copy it,
   n to open NotebookLM and paste it there.
4) Paste the AI reply into this window (or press v), then w writes the Word report.
5) Or press W to export straight from the clipboard, or c to watch the clipboard
   and export every new reply automatically.

p/P and d/D switch project and delivery. o opens the output folder.
R refreshes the file list. q quits.";
    let area = centered_rect(80, 60, f.area());
    let widget = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("How to use"));
    f.render_widget(Clear, area);
    f.render_widget(widget, area);
}

pub(super) fn ui_frame(frame: &mut Frame, app: &mut ReviewApp) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(38), Constraint::Percentage(62)])
        .split(rows[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(columns[1]);

    draw_top_bar(frame, app, rows[0]);
    draw_file_list(frame, app, columns[0]);
    draw_prompt(frame, app, right[0]);
    draw_reply(frame, app, right[1]);
    draw_notification(frame, app, rows[2]);
    draw_status_bar(frame, app, rows[3]);
    draw_help_block(frame, rows[4]);

    if app.mode == AppMode::Help {
        draw_help_screen(frame);
    }
    draw_popup(frame, app);
}
