//! Container config and inspection types consumed by deployment strategies.
//! §6 "Container runtime capability set".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `0` means "let the runtime auto-assign a host port". §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortBinding {
    pub container_port: u16,
    pub host_port: u16,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeMount {
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RestartPolicy {
    #[default]
    UnlessStopped,
    Always,
    OnFailure,
    No,
}

impl RestartPolicy {
    pub fn as_docker_str(self) -> &'static str {
        match self {
            RestartPolicy::UnlessStopped => "unless-stopped",
            RestartPolicy::Always => "always",
            RestartPolicy::OnFailure => "on-failure",
            RestartPolicy::No => "no",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu_nanos: Option<i64>,
    pub memory_bytes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckSpec {
    pub command: Vec<String>,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub retries: u32,
    pub start_period_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub name: String,
    pub image: String,
    pub env: HashMap<String, String>,
    pub labels: HashMap<String, String>,
    pub port_bindings: Vec<PortBinding>,
    pub volumes: Vec<VolumeMount>,
    pub networks: Vec<String>,
    pub command: Option<Vec<String>>,
    pub entrypoint: Option<Vec<String>>,
    pub restart_policy: RestartPolicy,
    pub resources: ResourceLimits,
    pub health_check: Option<HealthCheckSpec>,
}

impl ContainerConfig {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            env: HashMap::new(),
            labels: HashMap::new(),
            port_bindings: Vec::new(),
            volumes: Vec::new(),
            networks: Vec::new(),
            command: None,
            entrypoint: None,
            restart_policy: RestartPolicy::default(),
            resources: ResourceLimits::default(),
            health_check: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Created,
    Running,
    Paused,
    Restarting,
    Exited,
    Dead,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerInspect {
    pub state: RunState,
    pub healthy: Option<bool>,
    pub ports: Vec<PortBinding>,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub follow: bool,
    pub tail: Option<u32>,
    pub stdout: bool,
    pub stderr: bool,
    pub timestamps: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RegistryAuth {
    pub username: Option<String>,
    pub password: Option<String>,
    pub server_address: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NetworkOpts {
    pub internal: bool,
}

#[derive(Debug, Clone, Default)]
pub struct VolumeOpts {
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub image_id: String,
    pub logs: String,
}

/// One chunk of demultiplexed container log output. `stream` distinguishes
/// stdout/stderr the way Docker's framed log protocol does (first byte of
/// each frame: 1 = stdout, 2 = stderr). §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    StdOut,
    StdErr,
}

#[derive(Debug, Clone)]
pub struct LogChunk {
    pub stream: LogStream,
    pub message: String,
}
