use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, DetailPaneMode, InputMode, LIST_PANE_PERCENT, MIN_HEIGHT, MIN_WIDTH};
use crate::dialog::{Dialog, DialogKind};
use crate::model::{
    ContainerItem, ImageItem, ResourceItem, ResourceKind, VolumeItem, format_bytes,
    format_timestamp, short_id,
};

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const SELECTED_BG: Color = Color::Rgb(24, 36, 58);

pub fn render(frame: &mut Frame, app: &App) {
    if app.window_too_small() {
        render_too_small(frame, app);
        return;
    }

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(2),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_tab_bar(frame, root[0], app);
    render_body(frame, root[1], app);
    render_hints(frame, root[2], app);
    render_status(frame, root[3], app);

    if let Some(dialog) = app.dialog() {
        render_dialog(frame, root[1], dialog);
    }
}

fn render_too_small(frame: &mut Frame, app: &App) {
    let (width, height) = app.window_size();
    let lines = vec![
        Line::from(Span::styled(
            "Terminal too small",
            Style::default().fg(WARN).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("current {width}x{height}, need {MIN_WIDTH}x{MIN_HEIGHT}")),
        Line::from("Please resize your terminal."),
    ];
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(BG).fg(Color::White));
    frame.render_widget(paragraph, frame.area());
}

fn render_tab_bar(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        " berth ",
        Style::default()
            .fg(Color::Black)
            .bg(ACCENT)
            .add_modifier(Modifier::BOLD),
    )];
    for kind in app.tabs() {
        let count = app.list(*kind).items().len();
        let label = format!(" {} ({count}) ", kind.title());
        let style = if *kind == app.active_tab() {
            Style::default()
                .fg(ACCENT)
                .bg(PANEL)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(MUTED).bg(BG)
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(label, style));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG).fg(Color::White)),
        area,
    );
}

fn render_body(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(LIST_PANE_PERCENT),
            Constraint::Percentage(100 - LIST_PANE_PERCENT),
        ])
        .split(area);

    render_list(frame, columns[0], app);
    match app.detail_mode() {
        DetailPaneMode::Logs if app.active_tab() == ResourceKind::Containers => {
            render_logs(frame, columns[1], app)
        }
        _ => render_detail(frame, columns[1], app),
    }
}

fn render_list(frame: &mut Frame, area: Rect, app: &App) {
    let list = app.active_list();
    let kind = list.kind();
    let visible = list.visible_items();

    let header_row = Row::new(kind.headers().iter().map(|header| {
        Cell::from(*header).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let (view_width, _) = list.viewport();
    let max_cell = (view_width as usize / kind.headers().len().max(1)).max(8);
    let rows = visible.iter().map(|item| {
        let color = row_color(item);
        Row::new(item.columns().into_iter().map(|column| {
            Cell::from(compact_text(&column, max_cell)).style(Style::default().fg(color))
        }))
    });

    let mut title = format!("{} ({})", kind.title(), visible.len());
    if kind == ResourceKind::Containers && app.list_all() {
        title.push_str(" [all]");
    }
    if !list.filter().is_empty() {
        title.push_str(&format!(" filter: {}", list.filter()));
    }
    let border = if list.error().is_some() { ERROR } else { ACCENT };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(PANEL));

    let table = Table::new(rows, column_constraints(kind))
        .header(header_row)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(SELECTED_BG)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = TableState::default();
    state.select(list.selected_index());
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_detail(frame: &mut Frame, area: Rect, app: &App) {
    let list = app.active_list();
    let lines = match (list.error(), app.selected_item()) {
        (_, Some(ResourceItem::Image(image))) => image_detail_lines(image),
        (_, Some(ResourceItem::Container(container))) => container_detail_lines(app, container),
        (_, Some(ResourceItem::Volume(volume))) => volume_detail_lines(volume),
        (Some(error), None) => vec![Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(ERROR),
        ))],
        (None, None) => vec![Line::from(Span::styled(
            format!("No {} to show", list.kind().title().to_ascii_lowercase()),
            Style::default().fg(MUTED),
        ))],
    };

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title("Info")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(MUTED))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_logs(frame: &mut Frame, area: Rect, app: &App) {
    let title = match app.selected_item() {
        Some(ResourceItem::Container(container)) => format!("Logs {}", container.name()),
        _ => "Logs".to_string(),
    };
    let text = match (app.selected_item(), app.logs_text()) {
        (None, _) => Text::from("No container selected"),
        (Some(_), None) => Text::from("Loading logs..."),
        (Some(_), Some("")) => Text::from("(no output)"),
        (Some(_), Some(text)) => Text::from(text.to_string()),
    };

    // Pin the view to the newest lines.
    let inner_height = area.height.saturating_sub(2) as usize;
    let scroll = log_scroll_offset(text.lines.len(), inner_height);
    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White))
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_dialog(frame: &mut Frame, body: Rect, dialog: &Dialog) {
    let area = centered_rect(50, 50, body);
    frame.render_widget(Clear, area);

    let mut lines = vec![Line::from(dialog.message().to_string()), Line::from("")];
    for (index, field) in dialog.fields().iter().enumerate() {
        let focused = index == dialog.focus();
        let style = if focused {
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        let marker = if focused { "> " } else { "  " };
        lines.push(Line::from(Span::styled(
            format!("{marker}{} {}", field.label, field.value.display()),
            style,
        )));
    }
    if let Some(target) = dialog.target() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("target: {target}"),
            Style::default().fg(MUTED),
        )));
    }

    let border = if dialog.kind() == DialogKind::Error {
        ERROR
    } else {
        WARN
    };
    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(dialog.title().to_string())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn render_hints(frame: &mut Frame, area: Rect, app: &App) {
    let (first, second) = hint_lines(app);
    let lines = vec![
        Line::from(Span::styled(first, Style::default().fg(MUTED))),
        Line::from(Span::styled(second, Style::default().fg(MUTED))),
    ];
    frame.render_widget(
        Paragraph::new(lines).style(Style::default().bg(BG)),
        area,
    );
}

fn hint_lines(app: &App) -> (String, String) {
    match app.mode() {
        InputMode::Dialog => (
            "↑/↓ field  ←/→/space change  enter confirm  esc back".to_string(),
            String::new(),
        ),
        InputMode::Filter => (
            format!("filter: {}_", app.filter_input()),
            "enter keep  esc clear  backspace delete".to_string(),
        ),
        InputMode::Normal => {
            let global = "tab/→ next  shift+tab/← prev  j/k move  g/G top/bottom  / filter  q quit";
            let specific = match app.active_tab() {
                ResourceKind::Images => "d delete  D force delete  p prune",
                ResourceKind::Containers => {
                    "d delete  D force delete  p prune  a all  s start/stop  t pause  r restart  x exec  l logs"
                }
                ResourceKind::Volumes => "d delete  D force delete  p prune",
            };
            (global.to_string(), specific.to_string())
        }
    }
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let list = app.active_list();
    let color = if list.error().is_some() { ERROR } else { Color::White };
    let refreshed = list
        .last_refreshed()
        .map(|at| format!("refreshed {}", at.format("%H:%M:%S")))
        .unwrap_or_else(|| "not refreshed yet".to_string());
    let jobs = app.jobs().queued();

    let mut spans = vec![
        Span::styled(
            format!(" {} ", app.active_tab().title()),
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(app.status().to_string(), Style::default().fg(color)),
        Span::styled(format!("  | {refreshed}"), Style::default().fg(MUTED)),
    ];
    if jobs > 0 {
        spans.push(Span::styled(
            format!("  | {jobs} result(s) pending"),
            Style::default().fg(WARN),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn image_detail_lines(image: &ImageItem) -> Vec<Line<'static>> {
    let tags = if image.repo_tags.is_empty() {
        "<none>".to_string()
    } else {
        image.repo_tags.join(", ")
    };
    vec![
        field_line("ID", short_id(&image.id)),
        field_line("Tags", &tags),
        field_line("Size", &format_bytes(image.size)),
        field_line("Created", &format_timestamp(image.created)),
        field_line("Containers", &count_or_dash(image.containers)),
    ]
}

fn container_detail_lines(app: &App, container: &ContainerItem) -> Vec<Line<'static>> {
    let size = match app.container_size(&container.id) {
        Some(size) => format!(
            "{} (virtual {})",
            format_bytes(size.size_rw),
            format_bytes(size.root_fs)
        ),
        None => "calculating...".to_string(),
    };
    let ports = if container.ports.is_empty() {
        "-".to_string()
    } else {
        container.ports.join(", ")
    };
    vec![
        field_line("Name", container.name()),
        field_line("ID", short_id(&container.id)),
        field_line("Image", &container.image),
        field_line("State", &container.state),
        field_line("Status", &container.status),
        field_line("Ports", &ports),
        field_line("Created", &format_timestamp(container.created)),
        field_line("Size", &size),
    ]
}

fn volume_detail_lines(volume: &VolumeItem) -> Vec<Line<'static>> {
    vec![
        field_line("Name", &volume.name),
        field_line("Driver", &volume.driver),
        field_line("Scope", &volume.scope),
        field_line("Mountpoint", &volume.mountpoint),
        field_line("Created", &volume.created_at),
    ]
}

fn field_line(label: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<11}"), Style::default().fg(ACCENT)),
        Span::raw(if value.is_empty() { "-".to_string() } else { value.to_string() }),
    ])
}

fn count_or_dash(value: i64) -> String {
    if value < 0 {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn log_scroll_offset(line_count: usize, inner_height: usize) -> u16 {
    u16::try_from(line_count.saturating_sub(inner_height)).unwrap_or(u16::MAX)
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn row_color(item: &ResourceItem) -> Color {
    match item {
        ResourceItem::Container(container) => match container.state.as_str() {
            "running" => Color::White,
            "paused" => WARN,
            "restarting" | "dead" => ERROR,
            _ => MUTED,
        },
        _ => Color::White,
    }
}

fn column_constraints(kind: ResourceKind) -> Vec<Constraint> {
    match kind {
        ResourceKind::Images => vec![
            Constraint::Percentage(45),
            Constraint::Length(13),
            Constraint::Length(9),
            Constraint::Min(16),
        ],
        ResourceKind::Containers => vec![
            Constraint::Percentage(28),
            Constraint::Percentage(30),
            Constraint::Length(11),
            Constraint::Min(12),
        ],
        ResourceKind::Volumes => vec![
            Constraint::Percentage(60),
            Constraint::Length(10),
            Constraint::Min(8),
        ],
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{compact_text, log_scroll_offset, render};
    use crate::app::{App, AppSettings};
    use crate::input::Action;
    use crate::model::{ContainerItem, ResourceItem, ResourceKind};
    use crate::size_cache::SizeCache;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn draw(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn sized_app(width: u16, height: u16) -> App {
        let mut app = App::new(SizeCache::new(), AppSettings::default(), false);
        app.handle_resize(width, height);
        app
    }

    #[test]
    fn compact_text_marks_truncation() {
        assert_eq!(compact_text("alpine", 10), "alpine");
        assert_eq!(compact_text("registry.example/app", 8), "registr…");
    }

    #[test]
    fn log_scroll_saturates_on_huge_snapshots() {
        assert_eq!(log_scroll_offset(10, 20), 0);
        assert_eq!(log_scroll_offset(120, 20), 100);
        assert_eq!(log_scroll_offset(70_000, 20), u16::MAX);
    }

    #[test]
    fn small_terminal_shows_placeholder() {
        let app = sized_app(100, 20);
        let screen = draw(&app, 100, 20);
        assert!(screen.contains("resize your terminal"));
        assert!(!screen.contains("Containers ("));
    }

    #[test]
    fn large_terminal_shows_tabs_and_list() {
        let app = sized_app(200, 40);
        let screen = draw(&app, 200, 40);
        assert!(!screen.contains("resize your terminal"));
        for title in ["Images (0)", "Containers (0)", "Volumes (0)"] {
            assert!(screen.contains(title), "missing tab {title}");
        }
        assert!(screen.contains("Repository:Tag"));
    }

    #[test]
    fn open_dialog_replaces_hints() {
        let mut app = sized_app(200, 40);
        app.set_list_items(
            ResourceKind::Containers,
            vec![ResourceItem::Container(ContainerItem {
                id: "c1".to_string(),
                names: vec!["/web".to_string()],
                state: "running".to_string(),
                ..ContainerItem::default()
            })],
        );
        app.apply_action(Action::NextTab);
        let screen = draw(&app, 200, 40);
        assert!(screen.contains("x exec"));
        assert!(screen.contains("calculating..."));

        app.apply_action(Action::Delete);
        let screen = draw(&app, 200, 40);
        assert!(screen.contains("Remove container"));
        assert!(screen.contains("enter confirm"));
        assert!(!screen.contains("x exec"));
    }
}
