use std::{fs::File, io::BufReader, path::PathBuf, process::ExitCode};

use clap::{Parser, ValueEnum};
use dwb_core::utils::{
    DriveController, Outcome, Pose,
    controllers::ControllerConfig,
    platform::{LightSensor, StatusDisplay},
    routines::{DEFAULT_COURSE, Maneuver, MenuAction, SessionState, run_script, self_test},
    sim::{SimParams, SimWorld},
};
use serde::de::DeserializeOwned;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(version = "1.0", about = "Run Differential-Wheel Bot routines against a simulated robot")]
struct Opts {
    /// Menu actions to press, in order, before the course starts
    #[clap(long, value_enum, value_delimiter = ',', default_value = "run")]
    actions: Vec<Action>,
    /// JSON maneuver script (defaults to the built-in course)
    #[clap(long, conflicts_with = "goto")]
    script: Option<PathBuf>,
    /// Drive to a single RPS point instead of running a script, e.g. `30,45`
    #[clap(long, value_parser = parse_point)]
    goto: Option<(f32, f32)>,
    /// JSON controller configuration
    #[clap(long)]
    config: Option<PathBuf>,
    /// JSON simulation parameters
    #[clap(long)]
    sim: Option<PathBuf>,
    #[clap(long, default_value_t = 60.0)]
    start_x: f32,
    #[clap(long, default_value_t = 60.0)]
    start_y: f32,
    #[clap(long, default_value_t = 90.0)]
    start_heading: f32,
    /// Keep running the script after a failed step
    #[clap(long)]
    keep_going: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Action {
    Test,
    Run,
    Verbose,
    Calibrate,
}

impl From<Action> for MenuAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Test => MenuAction::Test,
            Action::Run => MenuAction::Run,
            Action::Verbose => MenuAction::Verbose,
            Action::Calibrate => MenuAction::Calibrate,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("run stopped after {steps} step(s): {outcome}")]
    RunFailed { steps: usize, outcome: Outcome },
}

/// Status screen that logs to the console.
struct ConsoleDisplay;

impl StatusDisplay for ConsoleDisplay {
    fn clear(&mut self) {
        tracing::debug!(target: "lcd", "clear");
    }

    fn write_line(
        &mut self,
        line: &str,
    ) {
        info!(target: "lcd", "{}", line);
    }
}

fn parse_point(s: &str) -> Result<(f32, f32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{s}`"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y: {e}"))?;
    Ok((x, y))
}

fn load_json<T: DeserializeOwned>(path: Option<&PathBuf>) -> Result<Option<T>, AppError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let file = File::open(path).map_err(|source| AppError::Io {
        path: path.clone(),
        source,
    })?;
    let value = serde_json::from_reader(BufReader::new(file)).map_err(|source| AppError::Json {
        path: path.clone(),
        source,
    })?;
    Ok(Some(value))
}

fn run(opts: Opts) -> Result<(), AppError> {
    let config: ControllerConfig = load_json(opts.config.as_ref())?.unwrap_or_default();
    let params: Option<SimParams> = load_json(opts.sim.as_ref())?;
    let steps: Vec<Maneuver> = match (opts.goto, load_json(opts.script.as_ref())?) {
        (Some((x, y)), _) => vec![Maneuver::Goto {
            x,
            y,
            radius: None,
            timeout_secs: None,
        }],
        (None, Some(script)) => script,
        (None, None) => DEFAULT_COURSE.to_vec(),
    };

    let world = SimWorld::new(
        Pose::new(opts.start_x, opts.start_y, opts.start_heading),
        params,
    );
    let mut ctrl = DriveController::new(world.pose(), world.drive(), world.clock(), Some(config));
    let mut display = ConsoleDisplay;
    let mut session = SessionState::default();

    for action in opts.actions {
        let action = MenuAction::from(action);
        session = session.apply(action);
        match action {
            MenuAction::Test => {
                display.write_line("Touch Received on Test");
                let outcome = self_test(&mut ctrl, &mut world.servo(), &mut display);
                info!(%outcome, "self test finished");
            }
            MenuAction::Verbose => info!(label = session.verbose_label(), "verbose toggled"),
            MenuAction::Calibrate => warn!(
                volts = world.light().voltage(),
                "calibration screens belong to the robot platform, skipping"
            ),
            MenuAction::Run => {}
        }
        if !session.in_menu {
            break;
        }
    }

    if session.in_menu {
        info!("menu closed without RUN, nothing to drive");
        return Ok(());
    }

    display.clear();
    display.write_line("Running robot program...");
    let report = run_script(
        &mut ctrl,
        &mut world.light(),
        &mut display,
        &steps,
        &session,
        opts.keep_going,
    );

    let pose = world.true_pose();
    info!(
        steps = report.steps_run,
        failures = report.failures,
        x = pose.x,
        y = pose.y,
        heading = pose.heading,
        elapsed_ms = world.now().as_millis(),
        "run finished"
    );

    match report.last {
        Some(outcome) if !report.succeeded() => Err(AppError::RunFailed {
            steps: report.steps_run,
            outcome,
        }),
        _ => Ok(()),
    }
}

fn main() -> ExitCode {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
