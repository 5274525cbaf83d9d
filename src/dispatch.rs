use crate::app::{App, AppCommand};
use crate::backend::ContainerBackend;
use crate::dialog::DialogSelection;
use crate::jobs::{Job, JobOutput, JobResult};
use crate::model::{ResourceItem, ResourceKind, short_id};
use anyhow::Result;
use std::future::Future;
use tokio::time::{Duration, timeout};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEffect {
    None,
    OpenShell { container_id: String },
}

pub async fn execute_app_command<B: ContainerBackend>(
    app: &mut App,
    backend: &B,
    command: AppCommand,
) -> LoopEffect {
    match command {
        AppCommand::None => {}
        AppCommand::Apply(selection) => apply_selection(app, backend, selection).await,
        AppCommand::ToggleStartStop { id } => {
            let limit = app.settings().lifecycle_timeout;
            run_mutation(
                app,
                backend,
                ResourceKind::Containers,
                limit,
                format!("Toggled start/stop for {}", short_id(&id)),
                backend.toggle_start_stop_container(&id),
            )
            .await;
        }
        AppCommand::TogglePause { id } => {
            let limit = app.settings().call_timeout;
            run_mutation(
                app,
                backend,
                ResourceKind::Containers,
                limit,
                format!("Toggled pause for {}", short_id(&id)),
                backend.toggle_pause_resume(&id),
            )
            .await;
        }
        AppCommand::Restart { id } => {
            let limit = app.settings().lifecycle_timeout;
            run_mutation(
                app,
                backend,
                ResourceKind::Containers,
                limit,
                format!("Restarted {}", short_id(&id)),
                backend.restart_container(&id),
            )
            .await;
        }
        AppCommand::ToggleListAll => {
            let list_all = backend.toggle_container_list_all();
            app.set_list_all(list_all);
            app.set_status(if list_all {
                "Listing all containers"
            } else {
                "Listing running containers"
            });
            refresh_kind(app, backend, ResourceKind::Containers).await;
        }
        AppCommand::OpenShell { id } => {
            return LoopEffect::OpenShell { container_id: id };
        }
    }

    schedule_size_probe(app, backend);
    LoopEffect::None
}

/// One tick of the main loop: refresh every list, drain at most one job
/// result, then schedule background work the current view needs.
pub async fn handle_tick<B: ContainerBackend>(app: &mut App, backend: &B) {
    refresh_all(app, backend).await;
    drain_one_result(app, backend).await;
    schedule_log_snapshot(app, backend);
    schedule_size_probe(app, backend);
}

pub async fn refresh_all<B: ContainerBackend>(app: &mut App, backend: &B) {
    for kind in ResourceKind::ALL {
        refresh_kind(app, backend, kind).await;
    }
}

pub async fn refresh_kind<B: ContainerBackend>(app: &mut App, backend: &B, kind: ResourceKind) {
    let listing = timeout(app.settings().call_timeout, fetch_items(backend, kind)).await;
    match listing {
        Ok(Ok(items)) => app.set_list_items(kind, items),
        Ok(Err(error)) => app.set_list_error(kind, compact_error(&error)),
        Err(_) => {
            app.set_status(format!(
                "Refresh timed out for {} (showing cached data)",
                kind.title()
            ));
        }
    }
}

async fn fetch_items<B: ContainerBackend>(
    backend: &B,
    kind: ResourceKind,
) -> Result<Vec<ResourceItem>> {
    let items = match kind {
        ResourceKind::Images => backend
            .list_images()
            .await?
            .into_iter()
            .map(ResourceItem::Image)
            .collect(),
        ResourceKind::Containers => backend
            .list_containers(false)
            .await?
            .into_iter()
            .map(ResourceItem::Container)
            .collect(),
        ResourceKind::Volumes => backend
            .list_volumes()
            .await?
            .into_iter()
            .map(ResourceItem::Volume)
            .collect(),
    };
    Ok(items)
}

async fn apply_selection<B: ContainerBackend>(
    app: &mut App,
    backend: &B,
    selection: DialogSelection,
) {
    debug!("applying selection {selection:?}");
    match selection {
        DialogSelection::RemoveContainer { id, opts } => {
            if id.is_empty() {
                return;
            }
            info!("removing container {id} with {opts:?}");
            let limit = app.settings().call_timeout;
            run_mutation(
                app,
                backend,
                ResourceKind::Containers,
                limit,
                format!("Removed container {}", short_id(&id)),
                backend.delete_container(&id, opts),
            )
            .await;
        }
        DialogSelection::RemoveImage { id, opts } => {
            if id.is_empty() {
                return;
            }
            info!("removing image {id} with {opts:?}");
            let limit = app.settings().call_timeout;
            run_mutation(
                app,
                backend,
                ResourceKind::Images,
                limit,
                format!("Removed image {}", short_id(&id)),
                backend.delete_image(&id, opts),
            )
            .await;
        }
        DialogSelection::RemoveVolume { id, force } => {
            if id.is_empty() {
                return;
            }
            info!("removing volume {id} (force={force})");
            let limit = app.settings().call_timeout;
            run_mutation(
                app,
                backend,
                ResourceKind::Volumes,
                limit,
                format!("Removed volume {id}"),
                backend.delete_volume(&id, force),
            )
            .await;
        }
        DialogSelection::Prune { kind, confirmed } => {
            if !confirmed {
                app.set_status("Prune cancelled");
                return;
            }
            info!("pruning {kind}");
            app.jobs().submit(backend, Job::Prune(kind));
            app.set_status(format!("Pruning {}...", kind.title().to_ascii_lowercase()));
        }
        DialogSelection::Acknowledged => {}
    }
}

async fn run_mutation<B, F>(
    app: &mut App,
    backend: &B,
    kind: ResourceKind,
    limit: Duration,
    done: String,
    call: F,
) where
    B: ContainerBackend,
    F: Future<Output = Result<()>>,
{
    match timeout(limit, call).await {
        Ok(Ok(())) => {
            app.set_status(done);
            refresh_kind(app, backend, kind).await;
        }
        Ok(Err(error)) => {
            warn!("{} operation failed: {error:#}", kind.title());
            app.open_error(compact_error(&error));
            refresh_kind(app, backend, kind).await;
        }
        Err(_) => {
            warn!("{} operation timed out", kind.title());
            app.open_error(format!(
                "{} operation timed out after {}ms",
                kind.title(),
                limit.as_millis()
            ));
            // The daemon may still have applied the change.
            refresh_kind(app, backend, kind).await;
        }
    }
}

async fn drain_one_result<B: ContainerBackend>(app: &mut App, backend: &B) {
    // An open dialog holds the remaining results back until it is dismissed.
    if app.dialog_open() {
        return;
    }
    let Some(JobResult { job, outcome }) = app.jobs_mut().try_drain() else {
        return;
    };

    match (job, outcome) {
        (_, Ok(JobOutput::Pruned(report))) => {
            app.set_status(report.summary());
            refresh_kind(app, backend, report.kind).await;
        }
        (_, Ok(JobOutput::Logs { container_id, text })) => app.set_logs(container_id, text),
        (Job::Logs { container_id, .. }, Err(error)) => {
            debug!("log snapshot failed for {container_id}: {error:#}");
            app.set_logs(container_id, compact_error(&error));
        }
        (Job::Prune(kind), Err(error)) => {
            warn!("prune {kind} failed: {error:#}");
            app.open_error(compact_error(&error));
        }
    }
}

fn schedule_log_snapshot<B: ContainerBackend>(app: &mut App, backend: &B) {
    let Some(container_id) = app.take_log_request() else {
        return;
    };
    let tail = app.settings().log_tail_lines;
    app.jobs().submit(backend, Job::Logs { container_id, tail });
}

fn schedule_size_probe<B: ContainerBackend>(app: &mut App, backend: &B) {
    if let Some(id) = app.take_size_probe() {
        app.size_cache().probe(backend, id);
    }
}

pub fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}
