use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use scene_bridge_core::ops::hierarchy;
use scene_bridge_core::{
    dispatch_with_deadline, AnyTransport, Batch, BridgeConfig, Command, FocusHook, HealthMonitor,
    HttpTransport, NoFocus, Reply, ReplyStatus, RetryPolicy, ScriptFocus, Transport, Vector3,
    ZmqTransport,
};
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scene-bridge", about = "Drive a running simulation host remotely")]
struct Cli {
    #[arg(long, value_enum, default_value_t = TransportKind::Http)]
    transport: TransportKind,

    /// Overrides SCENE_BRIDGE_HTTP_ENDPOINT.
    #[arg(long)]
    http_endpoint: Option<String>,

    /// Overrides SCENE_BRIDGE_ZMQ_ENDPOINT.
    #[arg(long)]
    zmq_endpoint: Option<String>,

    /// Attempts per command, including the first.
    #[arg(long)]
    retries: Option<u32>,

    /// Script that brings the host window to the foreground before each attempt.
    #[arg(long)]
    focus_script: Option<PathBuf>,

    /// Ping the host first and exit with status 1 if it is down.
    #[arg(long, default_value_t = false)]
    require_host: bool,

    /// Upper bound for the whole dispatch, retries included.
    #[arg(long)]
    deadline_ms: Option<u64>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TransportKind {
    Http,
    Zmq,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Check that the host answers.
    Ping,
    /// Print the host's console log (HTTP only).
    Console,
    /// Print the scene tree (HTTP only).
    Hierarchy {
        /// Only list nodes with this name.
        #[arg(long)]
        find: Option<String>,
    },
    Create {
        kind: String,
        name: String,
        #[arg(long, value_parser = parse_vector)]
        position: Option<Vector3>,
        #[arg(long, value_parser = parse_vector)]
        rotation: Option<Vector3>,
        #[arg(long, value_parser = parse_vector)]
        scale: Option<Vector3>,
        #[arg(long)]
        parent: Option<String>,
    },
    Delete {
        name: String,
    },
    DeleteAll {
        /// Names to keep.
        #[arg(long = "keep")]
        exclude: Vec<String>,
    },
    AddComponent {
        name: String,
        component: String,
    },
    SetProperty {
        name: String,
        component: String,
        property: String,
        /// JSON value; anything that isn't valid JSON is sent as a string.
        value: String,
    },
    CallStatic {
        type_name: String,
        method: String,
    },
    CallMethod {
        name: String,
        component: String,
        method: String,
    },
    Screenshot {
        filename: String,
    },
    SaveScene {
        filename: Option<String>,
    },
    /// Send one raw JSON command, e.g. '{"action":"delete","name":"Cube"}'.
    Exec {
        json: String,
    },
    /// Send a JSON array of commands as one batch. `-` reads stdin.
    Batch {
        file: PathBuf,
    },
}

fn parse_vector(raw: &str) -> Result<Vector3, String> {
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("expected x,y,z: {e}"))?;

    match parts.as_slice() {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        _ => Err(format!("expected 3 components, got {}", parts.len())),
    }
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn read_batch(file: &PathBuf) -> anyhow::Result<Vec<Command>> {
    let text = if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read batch from stdin")?;
        buf
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read batch file {}", file.display()))?
    };
    serde_json::from_str(&text).context("Batch must be a JSON array of commands")
}

impl Cli {
    fn config(&self) -> BridgeConfig {
        let mut config = BridgeConfig::from_env();
        if let Some(endpoint) = &self.http_endpoint {
            config.http_endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(endpoint) = &self.zmq_endpoint {
            config.zmq_endpoint = endpoint.clone();
        }
        if let Some(retries) = self.retries {
            config.retry = RetryPolicy::new(retries, config.retry.delay);
        }
        if let Some(script) = &self.focus_script {
            config.focus_script = Some(script.clone());
        }
        config
    }

    fn command(&self) -> anyhow::Result<Option<Command>> {
        let command = match &self.action {
            Action::Ping | Action::Console | Action::Hierarchy { .. } => return Ok(None),
            Action::Create {
                kind,
                name,
                position,
                rotation,
                scale,
                parent,
            } => Command::Create {
                kind: kind.clone(),
                name: name.clone(),
                position: *position,
                rotation: *rotation,
                scale: *scale,
                parent: parent.clone(),
            },
            Action::Delete { name } => Command::delete(name),
            Action::DeleteAll { exclude } => Command::delete_all(exclude),
            Action::AddComponent { name, component } => Command::add_component(name, component),
            Action::SetProperty {
                name,
                component,
                property,
                value,
            } => Command::set_property(name, component, property, parse_value(value)),
            Action::CallStatic { type_name, method } => Command::call_static(type_name, method),
            Action::CallMethod {
                name,
                component,
                method,
            } => Command::call_method(name, component, method),
            Action::Screenshot { filename } => Command::screenshot(filename),
            Action::SaveScene { filename } => Command::save_scene(filename.clone()),
            Action::Exec { json } => serde_json::from_str(json).context("Invalid command JSON")?,
            Action::Batch { file } => Batch::try_from(read_batch(file)?)?.into_command(),
        };
        Ok(Some(command))
    }
}

fn focus_hook(config: &BridgeConfig) -> Arc<dyn FocusHook> {
    match &config.focus_script {
        Some(script) => Arc::new(ScriptFocus::powershell(script)),
        None => Arc::new(NoFocus),
    }
}

fn print_reply(reply: &Reply) {
    let status = match reply.status {
        ReplyStatus::Ok => "ok",
        ReplyStatus::Error => "error",
    };
    if reply.message.is_empty() {
        println!("{status}");
    } else {
        println!("{status}: {}", reply.message);
    }
    for entity in &reply.entities {
        let components: Vec<_> = entity.components.iter().map(String::as_str).collect();
        println!(
            "  {} pos={} rot={} [{}]",
            entity.name,
            entity.position,
            entity.rotation,
            components.join(", ")
        );
    }
}

async fn send(
    transport: &mut AnyTransport,
    command: &Command,
    deadline: Option<Duration>,
) -> scene_bridge_core::Result<Reply> {
    match deadline {
        Some(deadline) => dispatch_with_deadline(transport, command, deadline).await,
        None => transport.dispatch(command).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    let focus = focus_hook(&config);
    tracing::debug!("Using {:?} transport, config={:?}", cli.transport, config);

    let mut transport: AnyTransport = match cli.transport {
        TransportKind::Http => HttpTransport::new(config.clone())?
            .with_focus(Arc::clone(&focus))
            .into(),
        TransportKind::Zmq => ZmqTransport::new(&config)
            .with_focus(Arc::clone(&focus))
            .into(),
    };
    let monitor = HealthMonitor::from_config(&config);

    if cli.require_host && !monitor.check_connection(&mut transport).await {
        eprintln!("Host is not running at the configured endpoint; start it and retry.");
        std::process::exit(1);
    }

    match &cli.action {
        Action::Ping => {
            let reply = transport
                .dispatch_with(&Command::Ping, monitor.policy())
                .await
                .context("Host did not answer ping")?;
            print_reply(&reply);
            return Ok(ExitCode::SUCCESS);
        }
        Action::Console => {
            let http = HttpTransport::new(config.clone())?;
            print!("{}", http.console().await.context("Failed to read console")?);
            return Ok(ExitCode::SUCCESS);
        }
        Action::Hierarchy { find } => {
            let http = HttpTransport::new(config.clone())?.with_focus(focus);
            let tree = hierarchy::snapshot(&http)
                .await
                .context("Failed to read hierarchy")?;
            match find {
                Some(name) => {
                    let matches = tree.find_all(name);
                    if matches.is_empty() {
                        bail!("No object named '{name}'");
                    }
                    for node in matches {
                        let position = node.position.unwrap_or_default();
                        println!("{} {} [{}]", node.name, position, node.components.join(", "));
                    }
                }
                None => print!("{}", hierarchy::render(&tree)),
            }
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let Some(command) = cli.command()? else {
        return Ok(ExitCode::SUCCESS);
    };

    let deadline = cli.deadline_ms.map(Duration::from_millis);
    let reply = send(&mut transport, &command, deadline)
        .await
        .with_context(|| format!("Failed to dispatch '{}'", command.action()))?;

    print_reply(&reply);
    Ok(if reply.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}
