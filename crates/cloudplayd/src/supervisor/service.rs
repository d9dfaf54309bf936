//! Static catalogue of the services a session runs.

use camino::Utf8PathBuf;
use nix::sys::signal::Signal;

use cloudplay_config::{Config, RuntimePaths};

/// How the supervisor decides a service is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessCheck {
    /// A command that exits successfully once the service answers.
    Command {
        /// Executable.
        program: String,
        /// Arguments.
        args: Vec<String>,
    },
    /// A socket file the service creates when listening.
    SocketExists(Utf8PathBuf),
    /// The service process is still running.
    ProcessAlive,
}

/// One entry in the startup sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Stable service name used in logs and errors.
    pub name: &'static str,
    /// Executable.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Readiness check run after launch.
    pub readiness: ReadinessCheck,
    /// Signal sent on shutdown.
    pub shutdown_signal: Signal,
}

impl ServiceSpec {
    fn new(name: &'static str, program: &str, args: Vec<String>, readiness: ReadinessCheck) -> Self {
        Self {
            name,
            program: program.to_owned(),
            args,
            readiness,
            shutdown_signal: Signal::SIGTERM,
        }
    }
}

/// Builds the ordered service list: display, message bus, audio, streaming
/// daemon. Each service depends on sockets created by its predecessors.
#[must_use]
pub fn service_catalogue(config: &Config, paths: &RuntimePaths) -> Vec<ServiceSpec> {
    let display = config.display().to_owned();
    let bus_socket = paths.bus_socket();
    let pulse_socket = paths.pulse_socket();
    vec![
        ServiceSpec::new(
            "display",
            "Xvfb",
            vec![
                display.clone(),
                "-screen".to_owned(),
                "0".to_owned(),
                config.display_resolution().to_owned(),
                "-nolisten".to_owned(),
                "tcp".to_owned(),
            ],
            ReadinessCheck::Command {
                program: "xdpyinfo".to_owned(),
                args: vec!["-display".to_owned(), display],
            },
        ),
        ServiceSpec::new(
            "message-bus",
            "dbus-daemon",
            vec![
                "--session".to_owned(),
                "--nofork".to_owned(),
                "--nopidfile".to_owned(),
                format!("--address=unix:path={bus_socket}"),
            ],
            ReadinessCheck::SocketExists(bus_socket),
        ),
        ServiceSpec::new(
            "audio",
            "pulseaudio",
            vec![
                "--daemonize=no".to_owned(),
                "--exit-idle-time=-1".to_owned(),
                "--disallow-exit".to_owned(),
                format!("--load=module-native-protocol-unix socket={pulse_socket} auth-anonymous=1"),
            ],
            ReadinessCheck::Command {
                program: "pactl".to_owned(),
                args: vec!["info".to_owned()],
            },
        ),
        ServiceSpec::new(
            "streaming-daemon",
            "sunshine",
            vec![config.sunshine_config_file().to_string()],
            ReadinessCheck::ProcessAlive,
        ),
    ]
}

/// Environment exported to every supervised child.
#[must_use]
pub fn child_environment(config: &Config, paths: &RuntimePaths) -> Vec<(String, String)> {
    vec![
        ("DISPLAY".to_owned(), config.display().to_owned()),
        ("XDG_RUNTIME_DIR".to_owned(), paths.runtime_dir().to_string()),
        ("PULSE_SERVER".to_owned(), format!("unix:{}", paths.pulse_socket())),
        (
            "SUNSHINE_CONFIG_DIR".to_owned(),
            paths.sunshine_config_dir().to_string(),
        ),
    ]
}
