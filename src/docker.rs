use anyhow::{Context, Result};
use bollard::Docker;
use bollard::container::{
    InspectContainerOptions, ListContainersOptions, LogsOptions, PruneContainersOptions,
    RemoveContainerOptions, RestartContainerOptions, StopContainerOptions,
};
use bollard::image::{ListImagesOptions, PruneImagesOptions, RemoveImageOptions};
use bollard::models::{ContainerSummary, ImageSummary, Port, Volume};
use bollard::volume::{ListVolumesOptions, PruneVolumesOptions, RemoveVolumeOptions};
use futures::StreamExt;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::process::Command as TokioCommand;
use tracing::{debug, info};

use crate::backend::{ContainerBackend, ContainerRemoval, ImageRemoval};
use crate::model::{
    ContainerItem, ContainerSize, ImageItem, PruneReport, ResourceKind, VolumeItem,
};

const LOGIN_SHELL_LOOKUP: &str = "eval $(grep ^$(id -un): /etc/passwd | cut -d : -f 7-)";

fn stop_options(grace_secs: u32) -> StopContainerOptions {
    StopContainerOptions {
        t: i64::from(grace_secs),
    }
}

fn restart_options(grace_secs: u32) -> RestartContainerOptions {
    RestartContainerOptions {
        t: isize::try_from(grace_secs).unwrap_or(isize::MAX),
    }
}

/// [`ContainerBackend`] over the local Docker daemon.
#[derive(Clone)]
pub struct DockerGateway {
    docker: Docker,
    list_all: Arc<AtomicBool>,
    exec_shell: Option<String>,
    stop_grace_secs: u32,
}

impl DockerGateway {
    pub fn connect(
        list_all: bool,
        exec_shell: Option<String>,
        stop_grace_secs: u32,
    ) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .context("failed to connect to the local docker daemon")?;
        Ok(Self {
            docker,
            list_all: Arc::new(AtomicBool::new(list_all)),
            exec_shell,
            stop_grace_secs,
        })
    }

    /// Confirms the daemon answers before the terminal is taken over.
    pub async fn ping(&self) -> Result<()> {
        let version = self
            .docker
            .version()
            .await
            .context("docker daemon did not answer the version probe")?;
        info!(
            "connected to docker {} (api {})",
            version.version.unwrap_or_default(),
            version.api_version.unwrap_or_default()
        );
        Ok(())
    }

    async fn container_state(&self, id: &str) -> Result<(bool, bool)> {
        let inspected = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .with_context(|| format!("failed to inspect container {id}"))?;
        let state = inspected.state.unwrap_or_default();
        Ok((
            state.running.unwrap_or(false),
            state.paused.unwrap_or(false),
        ))
    }
}

impl ContainerBackend for DockerGateway {
    async fn list_images(&self) -> Result<Vec<ImageItem>> {
        let images = self
            .docker
            .list_images(Some(ListImagesOptions::<String> {
                all: false,
                ..Default::default()
            }))
            .await
            .context("failed to list images")?;
        Ok(images.into_iter().map(image_item).collect())
    }

    async fn list_containers(&self, with_size: bool) -> Result<Vec<ContainerItem>> {
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: self.list_all.load(Ordering::Relaxed),
                size: with_size,
                ..Default::default()
            }))
            .await
            .context("failed to list containers")?;
        Ok(containers.into_iter().map(container_item).collect())
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeItem>> {
        let response = self
            .docker
            .list_volumes(None::<ListVolumesOptions<String>>)
            .await
            .context("failed to list volumes")?;
        Ok(response
            .volumes
            .unwrap_or_default()
            .into_iter()
            .map(volume_item)
            .collect())
    }

    async fn delete_image(&self, id: &str, opts: ImageRemoval) -> Result<()> {
        let options = RemoveImageOptions {
            force: opts.force,
            noprune: !opts.prune_children,
        };
        let removed = self
            .docker
            .remove_image(id, Some(options), None)
            .await
            .with_context(|| format!("failed to remove image {id}"))?;
        debug!("image removal of {id} produced {} entries", removed.len());
        Ok(())
    }

    async fn delete_container(&self, id: &str, opts: ContainerRemoval) -> Result<()> {
        let options = RemoveContainerOptions {
            v: opts.remove_volumes,
            force: opts.force,
            link: opts.remove_links,
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .with_context(|| format!("failed to remove container {id}"))
    }

    async fn delete_volume(&self, id: &str, force: bool) -> Result<()> {
        self.docker
            .remove_volume(id, Some(RemoveVolumeOptions { force }))
            .await
            .with_context(|| format!("failed to remove volume {id}"))
    }

    async fn prune_images(&self) -> Result<PruneReport> {
        let response = self
            .docker
            .prune_images(None::<PruneImagesOptions<String>>)
            .await
            .context("failed to prune images")?;
        Ok(prune_report(
            ResourceKind::Images,
            response.images_deleted.map_or(0, |deleted| deleted.len()),
            response.space_reclaimed,
        ))
    }

    async fn prune_containers(&self) -> Result<PruneReport> {
        let response = self
            .docker
            .prune_containers(None::<PruneContainersOptions<String>>)
            .await
            .context("failed to prune containers")?;
        Ok(prune_report(
            ResourceKind::Containers,
            response.containers_deleted.map_or(0, |deleted| deleted.len()),
            response.space_reclaimed,
        ))
    }

    async fn prune_volumes(&self) -> Result<PruneReport> {
        let response = self
            .docker
            .prune_volumes(None::<PruneVolumesOptions<String>>)
            .await
            .context("failed to prune volumes")?;
        Ok(prune_report(
            ResourceKind::Volumes,
            response.volumes_deleted.map_or(0, |deleted| deleted.len()),
            response.space_reclaimed,
        ))
    }

    async fn toggle_start_stop_container(&self, id: &str) -> Result<()> {
        let (running, _) = self.container_state(id).await?;
        if running {
            self.docker
                .stop_container(id, Some(stop_options(self.stop_grace_secs)))
                .await
                .with_context(|| format!("failed to stop container {id}"))
        } else {
            self.docker
                .start_container::<String>(id, None)
                .await
                .with_context(|| format!("failed to start container {id}"))
        }
    }

    async fn toggle_pause_resume(&self, id: &str) -> Result<()> {
        let (running, paused) = self.container_state(id).await?;
        if paused {
            self.docker
                .unpause_container(id)
                .await
                .with_context(|| format!("failed to unpause container {id}"))
        } else if running {
            self.docker
                .pause_container(id)
                .await
                .with_context(|| format!("failed to pause container {id}"))
        } else {
            anyhow::bail!("container {id} is not running")
        }
    }

    async fn restart_container(&self, id: &str) -> Result<()> {
        self.docker
            .restart_container(id, Some(restart_options(self.stop_grace_secs)))
            .await
            .with_context(|| format!("failed to restart container {id}"))
    }

    async fn inspect_container_size(&self, id: &str) -> Result<ContainerSize> {
        let inspected = self
            .docker
            .inspect_container(id, Some(InspectContainerOptions { size: true }))
            .await
            .with_context(|| format!("failed to inspect size of container {id}"))?;
        Ok(ContainerSize {
            size_rw: inspected.size_rw.unwrap_or(0),
            root_fs: inspected.size_root_fs.unwrap_or(0),
        })
    }

    async fn container_logs(&self, id: &str, tail: usize) -> Result<String> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: false,
            tail: tail.to_string(),
            ..Default::default()
        };
        let mut stream = self.docker.logs(id, Some(options));
        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("failed to read logs of container {id}"))?;
            text.push_str(&chunk.to_string());
        }
        Ok(text)
    }

    fn toggle_container_list_all(&self) -> bool {
        !self.list_all.fetch_xor(true, Ordering::Relaxed)
    }

    fn exec_command(&self, id: &str) -> TokioCommand {
        let mut cmd = TokioCommand::new("docker");
        cmd.args(exec_args(id, self.exec_shell.as_deref()))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }
}

fn exec_args(id: &str, shell: Option<&str>) -> Vec<String> {
    let mut args = vec!["exec".to_string(), "-it".to_string(), id.to_string()];
    match shell.map(str::trim).filter(|shell| !shell.is_empty()) {
        Some(shell) => args.push(shell.to_string()),
        None => args.extend([
            "/bin/sh".to_string(),
            "-c".to_string(),
            LOGIN_SHELL_LOOKUP.to_string(),
        ]),
    }
    args
}

fn prune_report(kind: ResourceKind, removed: usize, space_reclaimed: Option<i64>) -> PruneReport {
    PruneReport {
        kind,
        removed,
        space_reclaimed: space_reclaimed.unwrap_or(0).max(0) as u64,
    }
}

fn image_item(image: ImageSummary) -> ImageItem {
    ImageItem {
        id: image.id,
        repo_tags: image.repo_tags,
        size: image.size,
        created: image.created,
        containers: image.containers,
    }
}

fn container_item(container: ContainerSummary) -> ContainerItem {
    ContainerItem {
        id: container.id.unwrap_or_default(),
        names: container.names.unwrap_or_default(),
        image: container.image.unwrap_or_default(),
        state: container.state.unwrap_or_default(),
        status: container.status.unwrap_or_default(),
        ports: container
            .ports
            .unwrap_or_default()
            .iter()
            .map(format_port)
            .collect(),
        created: container.created.unwrap_or(0),
        size_rw: container.size_rw,
        size_root_fs: container.size_root_fs,
    }
}

fn volume_item(volume: Volume) -> VolumeItem {
    VolumeItem {
        name: volume.name,
        driver: volume.driver,
        mountpoint: volume.mountpoint,
        scope: volume
            .scope
            .map(|scope| scope.to_string())
            .unwrap_or_default(),
        created_at: volume.created_at.unwrap_or_default(),
    }
}

fn format_port(port: &Port) -> String {
    match (port.ip.as_deref(), port.public_port) {
        (Some(ip), Some(public)) => format!("{ip}:{public}->{}", port.private_port),
        (None, Some(public)) => format!("{public}->{}", port.private_port),
        _ => port.private_port.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        LOGIN_SHELL_LOOKUP, container_item, exec_args, format_port, prune_report,
        restart_options, stop_options,
    };
    use crate::model::ResourceKind;
    use bollard::models::{ContainerSummary, Port};

    #[test]
    fn stop_and_restart_carry_the_grace_period() {
        assert_eq!(stop_options(7).t, 7);
        assert_eq!(restart_options(7).t, 7);
        assert_eq!(stop_options(0).t, 0);
    }

    #[test]
    fn exec_defaults_to_login_shell_lookup() {
        assert_eq!(
            exec_args("c1", None),
            vec!["exec", "-it", "c1", "/bin/sh", "-c", LOGIN_SHELL_LOOKUP]
        );
        assert_eq!(exec_args("c1", Some("  ")), exec_args("c1", None));
    }

    #[test]
    fn exec_uses_configured_shell() {
        assert_eq!(
            exec_args("c1", Some("/bin/bash")),
            vec!["exec", "-it", "c1", "/bin/bash"]
        );
    }

    #[test]
    fn container_summary_maps_missing_fields_to_defaults() {
        let item = container_item(ContainerSummary {
            id: Some("abc".to_string()),
            names: Some(vec!["/web".to_string()]),
            size_rw: Some(12),
            ..Default::default()
        });
        assert_eq!(item.id, "abc");
        assert_eq!(item.name(), "web");
        assert_eq!(item.state, "");
        assert_eq!(item.size_rw, Some(12));
        assert_eq!(item.size(), None);
    }

    #[test]
    fn ports_render_published_mapping() {
        let published = Port {
            ip: Some("0.0.0.0".to_string()),
            private_port: 80,
            public_port: Some(8080),
            ..Default::default()
        };
        let internal = Port {
            private_port: 5432,
            ..Default::default()
        };
        assert_eq!(format_port(&published), "0.0.0.0:8080->80");
        assert_eq!(format_port(&internal), "5432");
    }

    #[test]
    fn negative_reclaimed_space_clamps_to_zero() {
        let report = prune_report(ResourceKind::Volumes, 2, Some(-1));
        assert_eq!(report.space_reclaimed, 0);
        assert_eq!(report.removed, 2);
    }
}
