//! Behavioural tests covering a session from service startup to server exit.

use std::cell::RefCell;
use std::sync::Arc;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;
use tempfile::TempDir;

use cloudplay_config::Config;

use crate::environment::{self, EnvironmentView};
use crate::process::{SessionError, SessionExit, SessionPlan, run_session_with};
use crate::relay::RelayChain;
use crate::supervisor::{ProcessControls, Supervisor};
use crate::tests::support::{
    ExitingServerLauncher, FakeProcessLauncher, FakeProcessSignaller, FakeReadinessChecker,
    FakeSignals, LifecycleEvent, RecordingLifecycleReporter, read_artifact, temp_config,
};

type StepResult = Result<(), String>;

struct SessionWorld {
    _root: TempDir,
    config: Config,
    environment: Vec<(String, String)>,
    reporter: Arc<RecordingLifecycleReporter>,
    launcher: FakeProcessLauncher,
    readiness: FakeReadinessChecker,
    signaller: FakeProcessSignaller,
    server: Option<ExitingServerLauncher>,
    outcome: Option<Result<SessionExit, SessionError>>,
}

impl SessionWorld {
    fn new() -> Self {
        let root = TempDir::new().expect("temp dir");
        let config = temp_config(&root);
        Self {
            _root: root,
            config,
            environment: Vec::new(),
            reporter: Arc::new(RecordingLifecycleReporter::default()),
            launcher: FakeProcessLauncher::default(),
            readiness: FakeReadinessChecker::default(),
            signaller: FakeProcessSignaller::default(),
            server: None,
            outcome: None,
        }
    }

    fn set_env(&mut self, key: &str, value: &str) {
        self.environment.push((key.to_owned(), value.to_owned()));
    }

    fn run(&mut self, exit_code: i32) -> StepResult {
        let controls = ProcessControls {
            launcher: self.launcher.clone(),
            readiness: self.readiness.clone(),
            signaller: self.signaller.clone(),
        };
        let supervisor = Supervisor::from_config(&self.config, controls, self.reporter.clone())
            .map_err(|error| error.to_string())?;
        let server = ExitingServerLauncher::new(exit_code);
        self.server = Some(server.clone());
        self.outcome = Some(run_session_with(SessionPlan {
            config: self.config.clone(),
            environment: EnvironmentView::from_pairs(self.environment.clone()),
            reporter: self.reporter.clone(),
            supervisor,
            relays: RelayChain::from_config(&self.config, self.reporter.clone()),
            server,
            signals: FakeSignals::default(),
        }));
        Ok(())
    }

    fn exit(&self) -> Result<SessionExit, String> {
        match &self.outcome {
            Some(Ok(exit)) => Ok(*exit),
            Some(Err(error)) => Err(format!("session failed: {error}")),
            None => Err("session has not run".to_owned()),
        }
    }

    fn ice_servers(&self) -> Vec<Value> {
        read_artifact(&self.config)["webrtc"]["ice_servers"]
            .as_array()
            .cloned()
            .unwrap_or_default()
    }
}

#[fixture]
fn world() -> RefCell<SessionWorld> {
    RefCell::new(SessionWorld::new())
}

#[given("a fresh session world")]
fn given_world(world: &RefCell<SessionWorld>) {
    let _ = world;
}

#[given("the relay \"{url}\" with user \"{user}\" and password \"{password}\"")]
fn given_manual_relay(world: &RefCell<SessionWorld>, url: String, user: String, password: String) {
    let mut world = world.borrow_mut();
    world.set_env(environment::RELAY_URL, &url);
    world.set_env(environment::RELAY_USERNAME, &user);
    world.set_env(environment::RELAY_CREDENTIAL, &password);
}

#[given("the relay \"{url}\" with shared secret \"{secret}\"")]
fn given_shared_secret_relay(world: &RefCell<SessionWorld>, url: String, secret: String) {
    let mut world = world.borrow_mut();
    world.set_env(environment::RELAY_URL, &url);
    world.set_env(environment::RELAY_SHARED_SECRET, &secret);
}

#[given("the display never becomes ready")]
fn given_display_never_ready(world: &RefCell<SessionWorld>) {
    // The display is always the first service and receives the first PID.
    world.borrow().readiness.never_ready(1000);
}

#[when("the session runs with a web server exiting {code}")]
fn when_session_runs(world: &RefCell<SessionWorld>, code: i32) -> StepResult {
    world.borrow_mut().run(code)
}

#[then("the artifact lists {count} ICE servers")]
fn then_artifact_lists(world: &RefCell<SessionWorld>, count: usize) {
    assert_eq!(world.borrow().ice_servers().len(), count);
}

#[then("ICE server {position} authenticates as \"{user}\"")]
fn then_ice_server_user(world: &RefCell<SessionWorld>, position: usize, user: String) {
    let servers = world.borrow().ice_servers();
    let server = servers
        .get(position.saturating_sub(1))
        .expect("ICE server should exist");
    assert_eq!(server["username"], Value::String(user));
}

#[then("the relay was resolved by \"{kind}\"")]
fn then_relay_resolved_by(world: &RefCell<SessionWorld>, kind: String) {
    let resolved = world
        .borrow()
        .reporter
        .events()
        .into_iter()
        .find_map(|event| match event {
            LifecycleEvent::RelayResolved(source, _) => Some(source),
            _ => None,
        });
    assert_eq!(resolved.map(|source| source.to_string()), Some(kind));
}

#[then("connectivity was reported at risk")]
fn then_connectivity_at_risk(world: &RefCell<SessionWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&LifecycleEvent::ConnectivityAtRisk)
    );
}

#[then("the orchestrator exits with code {code}")]
fn then_exit_code(world: &RefCell<SessionWorld>, code: u8) -> StepResult {
    let exit = world.borrow().exit()?;
    if exit.code() == code {
        Ok(())
    } else {
        Err(format!("expected exit code {code}, got {}", exit.code()))
    }
}

#[then("the session fails because \"{service}\" did not start")]
fn then_session_fails(world: &RefCell<SessionWorld>, service: String) {
    let world = world.borrow();
    match &world.outcome {
        Some(Err(SessionError::Supervisor { source })) => {
            assert_eq!(source.service(), Some(service.as_str()));
        }
        other => panic!("expected a supervisor failure, got {other:?}"),
    }
}

#[then("no relay source was consulted")]
fn then_no_relay_consulted(world: &RefCell<SessionWorld>) {
    let events = world.borrow().reporter.events();
    assert!(!events.iter().any(|event| matches!(
        event,
        LifecycleEvent::RelaySkipped(_)
            | LifecycleEvent::RelayFailed(_)
            | LifecycleEvent::RelayResolved(..)
    )));
}

#[then("the web server was never launched")]
fn then_server_not_launched(world: &RefCell<SessionWorld>) {
    let world = world.borrow();
    let commands = world
        .server
        .as_ref()
        .map(ExitingServerLauncher::commands)
        .unwrap_or_default();
    assert!(commands.is_empty());
}

#[then("every service was signalled in reverse order")]
fn then_services_signalled(world: &RefCell<SessionWorld>) {
    assert_eq!(world.borrow().signaller.signalled(), [1003, 1002, 1001, 1000]);
}

#[scenario(path = "tests/features/session_bootstrap.feature", index = 0)]
fn stun_only_without_relays(#[from(world)] _: RefCell<SessionWorld>) {}

#[scenario(path = "tests/features/session_bootstrap.feature", index = 1)]
fn manual_relay_follows_stun(#[from(world)] _: RefCell<SessionWorld>) {}

#[scenario(path = "tests/features/session_bootstrap.feature", index = 2)]
fn shared_secret_relay_is_derived(#[from(world)] _: RefCell<SessionWorld>) {}

#[scenario(path = "tests/features/session_bootstrap.feature", index = 3)]
fn unready_display_stops_session(#[from(world)] _: RefCell<SessionWorld>) {}

#[scenario(path = "tests/features/session_bootstrap.feature", index = 4)]
fn exit_code_is_mirrored(#[from(world)] _: RefCell<SessionWorld>) {}

