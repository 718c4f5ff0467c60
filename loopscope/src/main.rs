use anyhow::Context;
use clap::{ArgGroup, Parser};
use loopscope::Profiler;
use loopscope::host::replay::ReplayHost;
use loopscope::report::DEFAULT_REPORT_PATH;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
struct LoopscopeConfig {
    pub report_path: PathBuf,
}

impl Default for LoopscopeConfig {
    fn default() -> Self {
        Self {
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
        }
    }
}

impl LoopscopeConfig {
    fn with_overrides(&self, params: &LoopscopeParams) -> Self {
        Self {
            report_path: params
                .output
                .clone()
                .unwrap_or_else(|| self.report_path.clone()),
        }
    }
}

/// This tool prints out information per loop it finds.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["prof", "inst"])))]
struct LoopscopeParams {
    /// Run in profile mode
    #[arg(long)]
    prof: bool,
    /// Run in instrumentation mode
    #[arg(long)]
    inst: bool,
    /// Execution recording to run under the profiler
    #[arg(required_if_eq("prof", "true"))]
    recording: Option<PathBuf>,
    /// Where to write the loop report for this run only
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let params = LoopscopeParams::parse();
    if params.inst {
        println!("inst mode");
        return Ok(());
    }

    println!("prof mode");
    let config = load_config(&params)?;
    let recording = params
        .recording
        .context("profile mode needs an execution recording")?;
    let host = ReplayHost::load(&recording)
        .with_context(|| format!("failed to start host from {}", recording.display()))?;
    let profiler = Profiler::with_report(config.report_path);
    host.run(&profiler);
    Ok(())
}

/// The stored configuration with this run's flags applied. Flags are never
/// written back.
fn load_config(params: &LoopscopeParams) -> anyhow::Result<LoopscopeConfig> {
    let stored_config: LoopscopeConfig = confy::load("loopscope", None)?;
    Ok(stored_config.with_overrides(params))
}
