use std::fs::File;
use std::path::Path;
use std::process;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use robot_blocks::{
    config::ToyConfig,
    console::Console,
    interpreter::RunOutcome,
    program::{source::SourceProgram, step::ProgramStep, Compiler},
    session::ApplicationSession,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

const COMPILE_USAGE: &str = "robot-blocks compile <program.json>";
const RUN_USAGE: &str = "robot-blocks run <program.json>";
const PLAY_USAGE: &str = "robot-blocks play [program.json]";

async fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);

    match args.next().as_deref() {
        Some("compile") => {
            let path = args.next().context(COMPILE_USAGE)?;
            init_logging(None)?;
            compile(&path)
        }
        Some("run") => {
            let path = args.next().context(RUN_USAGE)?;
            init_logging(None)?;
            run_headless(&path).await
        }
        Some("play") => {
            let path = args.next();
            let log_path = std::env::temp_dir().join("robot-blocks.log");
            init_logging(Some(&log_path))?;
            play(path.as_deref()).await
        }
        _ => bail!(
            "Robot Blocks: block programs for a toy robot\n\nUsage:\n  {COMPILE_USAGE}\n  {RUN_USAGE}\n  {PLAY_USAGE}"
        ),
    }
}

/// `RUST_LOG` wins; otherwise info. The interactive view logs to a file so
/// the alternate screen stays clean.
fn init_logging(file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn load_steps(path: &str) -> Result<Vec<ProgramStep>> {
    let source = SourceProgram::load(Path::new(path))?;
    let steps = Compiler::compile(&source).with_context(|| format!("Failed to compile {path}"))?;
    info!(
        program = source.name.as_deref().unwrap_or(path),
        steps = steps.len(),
        "program compiled"
    );
    Ok(steps)
}

fn compile(path: &str) -> Result<()> {
    let steps = load_steps(path)?;
    println!("{}", serde_json::to_string_pretty(&steps)?);
    Ok(())
}

async fn run_headless(path: &str) -> Result<()> {
    let steps = load_steps(path)?;
    let config = ToyConfig::load();
    let session = ApplicationSession::new(&config.robot);

    let handle = session.start_program(steps)?;
    let outcome = session.drive(handle, config.robot.frame_rate).await?;

    let pose = session.pose();
    info!(
        ?outcome,
        executed = session.steps_executed(),
        x = pose.position.x,
        z = pose.position.z,
        yaw = pose.yaw,
        hatch = ?pose.hatch,
        form = ?pose.form,
        "run finished"
    );
    println!("{}", serde_json::to_string_pretty(&pose)?);
    if outcome == RunOutcome::Cancelled {
        bail!("program was cancelled");
    }
    Ok(())
}

async fn play(path: Option<&str>) -> Result<()> {
    let program = path.map(load_steps).transpose()?;
    let mut console = Console::new(ToyConfig::load(), program);
    console.run().await
}
