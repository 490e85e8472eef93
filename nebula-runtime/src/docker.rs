//! Docker Engine API backend for [`crate::ContainerRuntime`].

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogsOptions, RemoveContainerOptions, RestartContainerOptions,
    StopContainerOptions,
};
use bollard::image::{BuildImageOptions, CreateImageOptions};
use bollard::network::CreateNetworkOptions;
use bollard::service::{HealthConfig, HostConfig, PortBinding as DockerPortBinding};
use bollard::volume::CreateVolumeOptions;
use bollard::Docker;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use crate::error::{Result, RuntimeError};
use crate::types::*;
use crate::LogStreamFuture;

pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }

    fn restart_policy(policy: RestartPolicy) -> bollard::service::RestartPolicy {
        use bollard::service::RestartPolicyNameEnum::*;
        let name = match policy {
            RestartPolicy::UnlessStopped => UNLESS_STOPPED,
            RestartPolicy::Always => ALWAYS,
            RestartPolicy::OnFailure => ON_FAILURE,
            RestartPolicy::No => NO,
        };
        bollard::service::RestartPolicy {
            name: Some(name),
            maximum_retry_count: None,
        }
    }
}

#[async_trait]
impl crate::ContainerRuntime for DockerRuntime {
    async fn pull_image(&self, image: &str, auth: Option<&RegistryAuth>) -> Result<()> {
        let credentials = auth.map(|a| bollard::auth::DockerCredentials {
            username: a.username.clone(),
            password: a.password.clone(),
            serveraddress: a.server_address.clone(),
            ..Default::default()
        });

        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, credentials);
        while let Some(progress) = stream.next().await {
            progress?;
        }
        Ok(())
    }

    async fn build_image(&self, context_dir: &str, image_name: &str) -> Result<BuildOutput> {
        let tarball = tar_gz_directory(context_dir)?;

        let options = BuildImageOptions {
            dockerfile: "Dockerfile",
            t: image_name,
            rm: true,
            ..Default::default()
        };

        let mut stream = self.docker.build_image(options, None, Some(tarball.into()));
        let mut logs = String::new();
        let mut image_id = String::new();
        while let Some(chunk) = stream.next().await {
            let info = chunk?;
            if let Some(stream_text) = info.stream {
                logs.push_str(&stream_text);
            }
            if let Some(aux) = info.aux {
                if let Some(id) = aux.id {
                    image_id = id;
                }
            }
        }
        Ok(BuildOutput { image_id, logs })
    }

    async fn create_container(&self, config: &ContainerConfig) -> Result<String> {
        let env: Vec<String> = config
            .env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();

        let mut port_bindings: HashMap<String, Option<Vec<DockerPortBinding>>> = HashMap::new();
        let mut exposed_ports = HashMap::new();
        for binding in &config.port_bindings {
            let proto = match binding.protocol {
                Protocol::Tcp => "tcp",
                Protocol::Udp => "udp",
            };
            let key = format!("{}/{proto}", binding.container_port);
            exposed_ports.insert(key.clone(), HashMap::new());
            let host_port = if binding.host_port == 0 {
                None
            } else {
                Some(binding.host_port.to_string())
            };
            port_bindings.insert(
                key,
                Some(vec![DockerPortBinding {
                    host_ip: None,
                    host_port,
                }]),
            );
        }

        let binds: Vec<String> = config
            .volumes
            .iter()
            .map(|v| {
                let mode = if v.read_only { "ro" } else { "rw" };
                format!("{}:{}:{mode}", v.source, v.target)
            })
            .collect();

        let health_check = config.health_check.as_ref().map(|hc| HealthConfig {
            test: Some(
                std::iter::once("CMD".to_string())
                    .chain(hc.command.iter().cloned())
                    .collect(),
            ),
            interval: Some((hc.interval_secs * 1_000_000_000) as i64),
            timeout: Some((hc.timeout_secs * 1_000_000_000) as i64),
            retries: Some(hc.retries as i64),
            start_period: Some((hc.start_period_secs * 1_000_000_000) as i64),
        });

        let host_config = HostConfig {
            port_bindings: Some(port_bindings),
            binds: Some(binds),
            network_mode: config.networks.first().cloned(),
            restart_policy: Some(Self::restart_policy(config.restart_policy)),
            nano_cpus: config.resources.cpu_nanos,
            memory: config.resources.memory_bytes,
            ..Default::default()
        };

        let container_config = Config {
            image: Some(config.image.clone()),
            env: Some(env),
            labels: Some(config.labels.clone()),
            exposed_ports: Some(exposed_ports),
            cmd: config.command.clone(),
            entrypoint: config.entrypoint.clone(),
            healthcheck: health_check,
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: config.name.as_str(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), container_config)
            .await?;
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<bollard::container::StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn stop_container(&self, id: &str, timeout_secs: u64) -> Result<()> {
        self.docker
            .stop_container(
                id,
                Some(StopContainerOptions {
                    t: timeout_secs as i64,
                }),
            )
            .await?;
        Ok(())
    }

    async fn restart_container(&self, id: &str, timeout_secs: u64) -> Result<()> {
        self.docker
            .restart_container(
                id,
                Some(RestartContainerOptions {
                    t: timeout_secs as isize,
                }),
            )
            .await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<()> {
        let result = self
            .docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force,
                    ..Default::default()
                }),
            )
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(()), // §6: remove ignores not-found
            Err(other) => Err(other.into()),
        }
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspect> {
        let inspect = self
            .docker
            .inspect_container(id, None::<bollard::container::InspectContainerOptions>)
            .await?;

        let state = inspect
            .state
            .as_ref()
            .and_then(|s| s.status)
            .map(run_state_from_docker)
            .unwrap_or(RunState::Dead);

        let healthy = inspect
            .state
            .as_ref()
            .and_then(|s| s.health.as_ref())
            .and_then(|h| h.status)
            .map(|status| status == bollard::service::HealthStatusEnum::HEALTHY);

        let labels = inspect
            .config
            .as_ref()
            .and_then(|c| c.labels.clone())
            .unwrap_or_default();

        let ports = inspect
            .network_settings
            .as_ref()
            .and_then(|n| n.ports.clone())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(container_port, bindings)| {
                let (port_str, proto_str) = container_port.split_once('/')?;
                let protocol = if proto_str == "udp" {
                    Protocol::Udp
                } else {
                    Protocol::Tcp
                };
                let host_port = bindings?
                    .into_iter()
                    .next()?
                    .host_port?
                    .parse()
                    .ok()?;
                Some(PortBinding {
                    container_port: port_str.parse().ok()?,
                    host_port,
                    protocol,
                })
            })
            .collect();

        Ok(ContainerInspect {
            state,
            healthy,
            ports,
            labels,
        })
    }

    async fn container_logs(&self, id: &str, options: LogOptions) -> Result<LogStreamFuture> {
        let docker_options = LogsOptions::<String> {
            follow: options.follow,
            stdout: options.stdout,
            stderr: options.stderr,
            timestamps: options.timestamps,
            tail: options
                .tail
                .map(|n| n.to_string())
                .unwrap_or_else(|| "all".to_string()),
            ..Default::default()
        };

        let (tx, rx) = tokio::sync::mpsc::channel(256);
        let mut stream = self.docker.logs(id, Some(docker_options));
        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                let chunk = item.map(log_chunk_from_output).map_err(RuntimeError::from);
                if tx.send(chunk).await.is_err() {
                    break; // §4.8: stop on client disconnect
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn create_network(&self, name: &str, opts: &NetworkOpts) -> Result<()> {
        let options = CreateNetworkOptions {
            name,
            internal: opts.internal,
            ..Default::default()
        };
        match self.docker.create_network(options).await {
            Ok(_) => Ok(()),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 409, ..
            }) => Ok(()), // already exists: creation is idempotent by name, §5
            Err(other) => Err(other.into()),
        }
    }

    async fn create_volume(&self, name: &str, opts: &VolumeOpts) -> Result<()> {
        let options = CreateVolumeOptions {
            name,
            labels: opts.labels.clone(),
            ..Default::default()
        };
        match self.docker.create_volume(options).await {
            Ok(_) => Ok(()),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 409, ..
            }) => Ok(()),
            Err(other) => Err(other.into()),
        }
    }

    async fn ping(&self) -> Result<()> {
        self.docker.ping().await?;
        Ok(())
    }
}

fn run_state_from_docker(status: bollard::service::ContainerStateStatusEnum) -> RunState {
    use bollard::service::ContainerStateStatusEnum::*;
    match status {
        CREATED => RunState::Created,
        RUNNING => RunState::Running,
        PAUSED => RunState::Paused,
        RESTARTING => RunState::Restarting,
        EXITED => RunState::Exited,
        DEAD => RunState::Dead,
        _ => RunState::Dead,
    }
}

fn log_chunk_from_output(output: bollard::container::LogOutput) -> LogChunk {
    match output {
        bollard::container::LogOutput::StdOut { message } => LogChunk {
            stream: LogStream::StdOut,
            message: String::from_utf8_lossy(&message).into_owned(),
        },
        bollard::container::LogOutput::StdErr { message } => LogChunk {
            stream: LogStream::StdErr,
            message: String::from_utf8_lossy(&message).into_owned(),
        },
        bollard::container::LogOutput::StdIn { message }
        | bollard::container::LogOutput::Console { message } => LogChunk {
            stream: LogStream::StdOut,
            message: String::from_utf8_lossy(&message).into_owned(),
        },
    }
}

fn tar_gz_directory(context_dir: &str) -> Result<Vec<u8>> {
    let buffer = Vec::new();
    let encoder = GzEncoder::new(buffer, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all(".", context_dir)
        .map_err(|e| RuntimeError::Docker(bollard::errors::Error::IOError { err: e }))?;
    let encoder = builder
        .into_inner()
        .map_err(|e| RuntimeError::Docker(bollard::errors::Error::IOError { err: e }))?;
    let buffer = encoder
        .finish()
        .map_err(|e| RuntimeError::Docker(bollard::errors::Error::IOError { err: e }))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tar_gz_directory_packs_a_real_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), b"FROM scratch\n").unwrap();

        let archive = tar_gz_directory(dir.path().to_str().unwrap()).unwrap();
        assert!(!archive.is_empty());
        // gzip magic bytes
        assert_eq!(&archive[0..2], &[0x1f, 0x8b]);
    }
}
