use crate::model::{ContainerItem, ContainerSize, ImageItem, PruneReport, VolumeItem};
use anyhow::Result;
use std::future::Future;
use tokio::process::Command as TokioCommand;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct ImageRemoval {
    pub force: bool,
    pub prune_children: bool,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct ContainerRemoval {
    pub remove_volumes: bool,
    pub remove_links: bool,
    pub force: bool,
}

/// Everything the dashboard needs from a container daemon.
///
/// Implementations are cheap to clone so prune jobs and size probes can carry
/// their own handle into detached tasks.
pub trait ContainerBackend: Clone + Send + Sync + 'static {
    fn list_images(&self) -> impl Future<Output = Result<Vec<ImageItem>>> + Send;

    fn list_containers(
        &self,
        with_size: bool,
    ) -> impl Future<Output = Result<Vec<ContainerItem>>> + Send;

    fn list_volumes(&self) -> impl Future<Output = Result<Vec<VolumeItem>>> + Send;

    fn delete_image(
        &self,
        id: &str,
        opts: ImageRemoval,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_container(
        &self,
        id: &str,
        opts: ContainerRemoval,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_volume(&self, id: &str, force: bool) -> impl Future<Output = Result<()>> + Send;

    fn prune_images(&self) -> impl Future<Output = Result<PruneReport>> + Send;

    fn prune_containers(&self) -> impl Future<Output = Result<PruneReport>> + Send;

    fn prune_volumes(&self) -> impl Future<Output = Result<PruneReport>> + Send;

    fn toggle_start_stop_container(&self, id: &str) -> impl Future<Output = Result<()>> + Send;

    fn toggle_pause_resume(&self, id: &str) -> impl Future<Output = Result<()>> + Send;

    fn restart_container(&self, id: &str) -> impl Future<Output = Result<()>> + Send;

    fn inspect_container_size(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<ContainerSize>> + Send;

    fn container_logs(
        &self,
        id: &str,
        tail: usize,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Flips whether stopped containers are listed and returns the new value.
    fn toggle_container_list_all(&self) -> bool;

    /// Interactive shell process for `id`, run while the TUI is suspended.
    fn exec_command(&self, id: &str) -> TokioCommand;
}
