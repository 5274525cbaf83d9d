use crate::backend::{ContainerRemoval, ImageRemoval};
use crate::dialog::{Dialog, DialogOutcome, DialogSelection};
use crate::input::Action;
use crate::jobs::JobCoordinator;
use crate::list::ResourceList;
use crate::model::{ContainerSize, ResourceItem, ResourceKind, short_id};
use crate::size_cache::SizeCache;
use chrono::Local;
use std::time::Duration;
use tracing::debug;

pub const MIN_WIDTH: u16 = 169;
pub const MIN_HEIGHT: u16 = 33;
const LIST_CHROME_ROWS: u16 = 10;
/// Share of the body width given to the resource list; the rest is the info pane.
pub const LIST_PANE_PERCENT: u16 = 62;
const LIST_BORDER_COLUMNS: u16 = 2;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Filter,
    Dialog,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DetailPaneMode {
    Info,
    Logs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    Apply(DialogSelection),
    ToggleStartStop { id: String },
    TogglePause { id: String },
    Restart { id: String },
    ToggleListAll,
    OpenShell { id: String },
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub call_timeout: Duration,
    /// Bound for start/stop and restart, which include the stop grace period.
    pub lifecycle_timeout: Duration,
    pub log_tail_lines: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(4),
            lifecycle_timeout: Duration::from_secs(14),
            log_tail_lines: 200,
        }
    }
}

#[derive(Debug, Clone)]
struct LogPanel {
    container_id: String,
    text: String,
}

pub struct App {
    running: bool,
    filtering: bool,
    filter_input: String,
    active_tab: ResourceKind,
    lists: [ResourceList; 3],
    dialog: Option<Dialog>,
    jobs: JobCoordinator,
    sizes: SizeCache,
    settings: AppSettings,
    status: String,
    width: u16,
    height: u16,
    window_too_small: bool,
    detail_mode: DetailPaneMode,
    logs: Option<LogPanel>,
    logs_in_flight: bool,
    list_all: bool,
    last_size_probe: Option<String>,
}

impl App {
    pub fn new(sizes: SizeCache, settings: AppSettings, list_all: bool) -> Self {
        Self {
            running: true,
            filtering: false,
            filter_input: String::new(),
            active_tab: ResourceKind::Images,
            lists: ResourceKind::ALL.map(ResourceList::new),
            dialog: None,
            jobs: JobCoordinator::default(),
            sizes,
            settings,
            status: "Ready".to_string(),
            width: MIN_WIDTH,
            height: MIN_HEIGHT,
            window_too_small: false,
            detail_mode: DetailPaneMode::Info,
            logs: None,
            logs_in_flight: false,
            list_all,
            last_size_probe: None,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        if self.dialog.is_some() {
            InputMode::Dialog
        } else if self.filtering {
            InputMode::Filter
        } else {
            InputMode::Normal
        }
    }

    pub fn tabs(&self) -> &'static [ResourceKind] {
        &ResourceKind::ALL
    }

    pub fn active_tab(&self) -> ResourceKind {
        self.active_tab
    }

    pub fn list(&self, kind: ResourceKind) -> &ResourceList {
        &self.lists[kind.index()]
    }

    pub fn active_list(&self) -> &ResourceList {
        self.list(self.active_tab)
    }

    fn list_mut(&mut self, kind: ResourceKind) -> &mut ResourceList {
        &mut self.lists[kind.index()]
    }

    fn active_list_mut(&mut self) -> &mut ResourceList {
        self.list_mut(self.active_tab)
    }

    pub fn selected_item(&self) -> Option<&ResourceItem> {
        self.active_list().selected_item()
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    pub fn dialog_open(&self) -> bool {
        self.dialog.is_some()
    }

    pub fn jobs(&self) -> &JobCoordinator {
        &self.jobs
    }

    pub fn jobs_mut(&mut self) -> &mut JobCoordinator {
        &mut self.jobs
    }

    pub fn size_cache(&self) -> &SizeCache {
        &self.sizes
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn filter_input(&self) -> &str {
        &self.filter_input
    }

    pub fn window_too_small(&self) -> bool {
        self.window_too_small
    }

    pub fn window_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn detail_mode(&self) -> DetailPaneMode {
        self.detail_mode
    }

    pub fn list_all(&self) -> bool {
        self.list_all
    }

    pub fn container_size(&self, id: &str) -> Option<ContainerSize> {
        self.sizes.lookup(id)
    }

    /// Log text for the selected container, once a snapshot for it arrived.
    pub fn logs_text(&self) -> Option<&str> {
        let selected = self.active_list().selected_item()?;
        self.logs
            .as_ref()
            .filter(|panel| panel.container_id == selected.id())
            .map(|panel| panel.text.as_str())
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into().replace('\n', " ");
    }

    pub fn set_list_all(&mut self, list_all: bool) {
        self.list_all = list_all;
    }

    pub fn open_dialog(&mut self, dialog: Dialog) {
        debug!("opening dialog {:?}", dialog.kind());
        self.dialog = Some(dialog);
    }

    pub fn open_error(&mut self, message: impl Into<String>) {
        self.open_dialog(Dialog::error(message));
    }

    pub fn set_list_items(&mut self, kind: ResourceKind, items: Vec<ResourceItem>) {
        self.list_mut(kind).replace_items(items, Local::now());
    }

    pub fn set_list_error(&mut self, kind: ResourceKind, error: impl Into<String>) {
        let error = error.into();
        self.list_mut(kind).set_error(error.clone(), Local::now());
        let summary = error.lines().next().unwrap_or_default().to_string();
        self.set_status(format!("{} refresh failed: {summary}", kind.title()));
    }

    pub fn set_logs(&mut self, container_id: String, text: String) {
        self.logs_in_flight = false;
        self.logs = Some(LogPanel { container_id, text });
    }

    /// Container whose logs should be fetched next, if the log panel is showing
    /// and no snapshot is already on its way.
    pub fn take_log_request(&mut self) -> Option<String> {
        if self.detail_mode != DetailPaneMode::Logs
            || self.active_tab != ResourceKind::Containers
            || self.logs_in_flight
        {
            return None;
        }
        let id = self.active_list().selected_id()?;
        self.logs_in_flight = true;
        Some(id)
    }

    /// Selected container whose sizes have not been inspected yet.
    pub fn take_size_probe(&mut self) -> Option<String> {
        if self.active_tab != ResourceKind::Containers {
            return None;
        }
        let id = self.active_list().selected_id()?;
        if self.sizes.lookup(&id).is_some() || self.last_size_probe.as_deref() == Some(&id) {
            return None;
        }
        self.last_size_probe = Some(id.clone());
        Some(id)
    }

    pub fn handle_resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.window_too_small = width < MIN_WIDTH || height < MIN_HEIGHT;
        if self.window_too_small {
            return;
        }

        let pane_width = u32::from(width) * u32::from(LIST_PANE_PERCENT) / 100;
        let list_width = u16::try_from(pane_width)
            .unwrap_or(u16::MAX)
            .saturating_sub(LIST_BORDER_COLUMNS);
        let list_height = height.saturating_sub(LIST_CHROME_ROWS);
        for list in &mut self.lists {
            list.set_viewport(list_width, list_height);
        }
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if let Some(dialog) = self.dialog.as_mut() {
            return match dialog.handle(&action) {
                DialogOutcome::Pending => AppCommand::None,
                DialogOutcome::Cancelled => {
                    self.dialog = None;
                    self.set_status("Cancelled");
                    AppCommand::None
                }
                DialogOutcome::Confirmed(DialogSelection::Acknowledged) => {
                    self.dialog = None;
                    AppCommand::None
                }
                DialogOutcome::Confirmed(selection) => {
                    self.dialog = None;
                    debug!("dialog confirmed: {selection:?}");
                    AppCommand::Apply(selection)
                }
            };
        }

        if self.filtering {
            return self.apply_filter_action(action);
        }

        match action {
            Action::Quit => {
                self.running = false;
                self.set_status("Exit requested");
                AppCommand::None
            }
            Action::NextTab => {
                self.active_tab = self.active_tab.next();
                self.sync_filter_input();
                AppCommand::None
            }
            Action::PrevTab => {
                self.active_tab = self.active_tab.prev();
                self.sync_filter_input();
                AppCommand::None
            }
            Action::Down => {
                self.active_list_mut().move_selection(1);
                AppCommand::None
            }
            Action::Up => {
                self.active_list_mut().move_selection(-1);
                AppCommand::None
            }
            Action::PageDown => {
                let step = self.active_list().page_step();
                self.active_list_mut().move_selection(step);
                AppCommand::None
            }
            Action::PageUp => {
                let step = self.active_list().page_step();
                self.active_list_mut().move_selection(-step);
                AppCommand::None
            }
            Action::Top => {
                self.active_list_mut().select_first();
                AppCommand::None
            }
            Action::Bottom => {
                self.active_list_mut().select_last();
                AppCommand::None
            }
            Action::StartFilter => {
                self.filtering = true;
                self.sync_filter_input();
                self.set_status("Filter mode (enter keeps, esc clears)");
                AppCommand::None
            }
            action => self.apply_tab_action(action),
        }
    }

    fn apply_filter_action(&mut self, action: Action) -> AppCommand {
        match action {
            Action::InputChar(c) => {
                self.filter_input.push(c);
                let text = self.filter_input.clone();
                self.active_list_mut().apply_filter(text);
            }
            Action::Backspace => {
                self.filter_input.pop();
                let text = self.filter_input.clone();
                self.active_list_mut().apply_filter(text);
            }
            Action::SubmitInput => {
                self.filtering = false;
                let status = if self.filter_input.is_empty() {
                    "Filter cleared".to_string()
                } else {
                    format!("Filter: {}", self.filter_input)
                };
                self.set_status(status);
            }
            Action::CancelInput => {
                self.filtering = false;
                self.filter_input.clear();
                self.active_list_mut().apply_filter("");
                self.set_status("Filter cleared");
            }
            _ => {}
        }
        AppCommand::None
    }

    fn apply_tab_action(&mut self, action: Action) -> AppCommand {
        let kind = self.active_tab;
        if action == Action::Prune {
            self.open_dialog(Dialog::prune(kind));
            return AppCommand::None;
        }

        let Some(id) = self.active_list().selected_id() else {
            if is_item_action(&action) {
                self.set_status(format!("No {} selected", kind.title().to_ascii_lowercase()));
            }
            return AppCommand::None;
        };

        match (kind, action) {
            (ResourceKind::Images, Action::Delete) => {
                self.open_dialog(Dialog::remove_image(id));
                AppCommand::None
            }
            (ResourceKind::Containers, Action::Delete) => {
                self.open_dialog(Dialog::remove_container(id));
                AppCommand::None
            }
            (ResourceKind::Volumes, Action::Delete) => {
                self.open_dialog(Dialog::remove_volume(id));
                AppCommand::None
            }
            (ResourceKind::Images, Action::ForceDelete) => {
                AppCommand::Apply(DialogSelection::RemoveImage {
                    id,
                    opts: ImageRemoval {
                        force: true,
                        prune_children: false,
                    },
                })
            }
            (ResourceKind::Containers, Action::ForceDelete) => {
                AppCommand::Apply(DialogSelection::RemoveContainer {
                    id,
                    opts: ContainerRemoval {
                        remove_volumes: false,
                        remove_links: false,
                        force: true,
                    },
                })
            }
            (ResourceKind::Volumes, Action::ForceDelete) => {
                AppCommand::Apply(DialogSelection::RemoveVolume { id, force: true })
            }
            (ResourceKind::Containers, Action::ToggleListAll) => AppCommand::ToggleListAll,
            (ResourceKind::Containers, Action::ToggleStartStop) => {
                self.set_status(format!("Toggling start/stop for {}", short_id(&id)));
                AppCommand::ToggleStartStop { id }
            }
            (ResourceKind::Containers, Action::TogglePause) => {
                self.set_status(format!("Toggling pause for {}", short_id(&id)));
                AppCommand::TogglePause { id }
            }
            (ResourceKind::Containers, Action::Restart) => {
                self.set_status(format!("Restarting {}", short_id(&id)));
                AppCommand::Restart { id }
            }
            (ResourceKind::Containers, Action::Exec) => AppCommand::OpenShell { id },
            (ResourceKind::Containers, Action::ToggleLogs) => {
                self.detail_mode = match self.detail_mode {
                    DetailPaneMode::Info => DetailPaneMode::Logs,
                    DetailPaneMode::Logs => DetailPaneMode::Info,
                };
                self.logs = None;
                AppCommand::None
            }
            _ => AppCommand::None,
        }
    }

    fn sync_filter_input(&mut self) {
        self.filter_input = self.active_list().filter().to_string();
    }
}

fn is_item_action(action: &Action) -> bool {
    matches!(
        action,
        Action::Delete
            | Action::ForceDelete
            | Action::ToggleStartStop
            | Action::TogglePause
            | Action::Restart
            | Action::Exec
    )
}
