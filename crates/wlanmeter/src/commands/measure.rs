//! Default action: resolve the run plan, then tick until done or Ctrl-C.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};
use wlanmeter_config::Config;
use wlanmeter_core::{
    EngineConfig, MeasurementEngine, MeasurementMode, RecordFormat, SizeClass, SpeedTestConfig,
};

use crate::cli::{ColorMode, FormatArg, GlobalOpts, MeasureArgs, SizeArg};
use crate::error::CliError;
use crate::output::{self, Banner, Console, RunSummary};
use crate::scheduler::{RunOutcome, Scheduler};
use crate::writer::SampleWriter;

/// Everything a run needs, after the config file and flags are merged.
#[derive(Debug)]
pub struct RunPlan {
    pub interval: Duration,
    pub count: Option<u64>,
    pub mode: MeasurementMode,
    pub speed: SpeedTestConfig,
    pub engine: EngineConfig,
    pub output: Option<PathBuf>,
    pub format: RecordFormat,
    pub color: ColorMode,
}

/// Layer command-line flags over `cfg` and validate the result.
pub fn resolve_plan(
    mut cfg: Config,
    args: &MeasureArgs,
    global: &GlobalOpts,
) -> Result<RunPlan, CliError> {
    if let Some(interval) = args.interval {
        cfg.defaults.interval = humantime::format_duration(interval).to_string();
    }
    if let Some(size) = args.size {
        cfg.defaults.size = match size {
            SizeArg::Small => SizeClass::Small,
            SizeArg::Medium => SizeClass::Medium,
            SizeArg::Large => SizeClass::Large,
        };
    }
    if args.skip_upload {
        cfg.defaults.skip_upload = true;
    }
    if args.wlan_only {
        cfg.defaults.mode = MeasurementMode::WlanOnly;
    } else if args.speed_only {
        cfg.defaults.mode = MeasurementMode::SpeedOnly;
    }
    if let Some(ref output) = args.output {
        cfg.defaults.output = Some(output.clone());
    }
    if let Some(format) = args.format {
        cfg.defaults.format = match format {
            FormatArg::Csv => RecordFormat::Csv,
            FormatArg::Jsonl => RecordFormat::Jsonl,
        };
    }
    if let Some(ref interface) = args.interface {
        cfg.probe.interface = Some(interface.clone());
    }
    if let Some(samples) = args.latency_samples {
        cfg.defaults.latency_samples = samples;
    }
    if args.insecure {
        cfg.transport.insecure = true;
    }

    cfg.validate()?;

    let color = match global.color {
        Some(mode) => mode,
        None => match cfg.defaults.color.as_str() {
            "always" => ColorMode::Always,
            "never" => ColorMode::Never,
            _ => ColorMode::Auto,
        },
    };

    Ok(RunPlan {
        interval: cfg.interval()?,
        count: args.count,
        mode: cfg.defaults.mode,
        speed: cfg.speed_test_config(),
        engine: cfg.engine_config(),
        output: cfg.defaults.output.clone(),
        format: cfg.defaults.format,
        color,
    })
}

pub async fn handle(cfg: Config, args: &MeasureArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let plan = resolve_plan(cfg, args, global)?;
    debug!(?plan, "resolved run plan");

    let engine = MeasurementEngine::new(plan.engine.clone())?;
    let mut writer = plan
        .output
        .as_deref()
        .map(|path| SampleWriter::open(path, plan.format))
        .transpose()?;
    let console = Console::new(output::should_color(plan.color), global.quiet);

    // Ctrl-C or SIGTERM cancels the engine token: the running tick aborts
    // its in-flight sub-tests and the scheduler stops.
    let token = engine.cancellation_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        token.cancel();
    });

    console.print(&output::render_banner(&Banner {
        interval: plan.interval,
        count: plan.count,
        mode: plan.mode,
        speed: &plan.speed,
        output: plan.output.as_deref(),
        format: plan.format,
    }));

    let mut summary = RunSummary::default();
    let outcome = Scheduler::new(plan.interval, plan.count)
        .run(&engine, plan.mode, &plan.speed, |tick| {
            console.print(&output::render_sample(
                tick.sample,
                tick.index,
                plan.count,
                plan.mode,
                console.color(),
            ));
            if let Some(ref mut writer) = writer {
                writer.write(tick.sample)?;
            }
            summary.record(tick.sample);
            if let Some(wait) = tick.next_in {
                console.next_tick(wait);
            }
            Ok(())
        })
        .await;

    // The summary covers whatever completed, even if the run then failed.
    if summary.samples() > 0 {
        console.print(&format!("\n{}", summary.render()));
    }

    match outcome? {
        RunOutcome {
            completed: 0,
            interrupted: true,
        } => {
            warn!("interrupted before the first sample completed");
            Err(CliError::Interrupted)
        }
        _ => Ok(()),
    }
}

/// Resolves on Ctrl-C, or on SIGTERM where the platform has it.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => debug!("interrupt received"),
        () = terminate => debug!("terminate received"),
    }
}
