use cf_app::{
    AppResult, RunProgressEvent, RunStage, RunSummary, project_service, run_service,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cf-cli")]
#[command(about = "ctrlflow CLI - closed-loop instrument control runner", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate plant file syntax and structure
    Validate {
        /// Path to the plant YAML or JSON file
        plant_path: PathBuf,
    },
    /// List the sensors, actuators and loops in a plant
    Describe {
        /// Path to the plant YAML or JSON file
        plant_path: PathBuf,
    },
    /// Run a plant for a fixed wall-clock duration
    Run {
        /// Path to the plant YAML or JSON file
        plant_path: PathBuf,
        /// Run duration in milliseconds
        #[arg(long, default_value_t = 1000)]
        duration_ms: u64,
        /// Summary output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Validate { plant_path } => cmd_validate(&plant_path),
        Commands::Describe { plant_path } => cmd_describe(&plant_path),
        Commands::Run {
            plant_path,
            duration_ms,
            format,
        } => cmd_run(&plant_path, Duration::from_millis(duration_ms), format),
    }
}

fn cmd_validate(plant_path: &Path) -> AppResult<()> {
    println!("Validating plant: {}", plant_path.display());
    let plant = project_service::load_plant(plant_path)?;
    project_service::validate_plant(&plant)?;
    println!("✓ Plant is valid");
    Ok(())
}

fn cmd_describe(plant_path: &Path) -> AppResult<()> {
    let plant = project_service::load_plant(plant_path)?;
    let summary = project_service::describe_plant(&plant);
    println!(
        "{} (v{}): {} sensors, {} actuators, {} loops",
        summary.name,
        summary.version,
        summary.sensor_count,
        summary.actuator_count,
        summary.loop_count
    );

    let sensors = project_service::list_sensors(&plant);
    if !sensors.is_empty() {
        println!("Sensors:");
        for sensor in sensors {
            println!(
                "  {} - {} every {} ms ({})",
                sensor.id, sensor.unit, sensor.sampling_period_ms, sensor.measurement
            );
        }
    }

    if !plant.actuators.is_empty() {
        println!("Actuators:");
        for actuator in &plant.actuators {
            println!("  {} - initial {}", actuator.id, actuator.initial_value);
        }
    }

    let loops = project_service::list_loops(&plant);
    if loops.is_empty() {
        println!("No control loops found in plant");
    } else {
        println!("Control loops:");
        for l in loops {
            println!(
                "  {}: {} -> {}  set point {}  every {} ms  {}",
                l.id, l.sensor_id, l.actuator_id, l.set_point, l.update_period_ms, l.behaviour
            );
        }
    }
    Ok(())
}

fn cmd_run(plant_path: &Path, duration: Duration, format: OutputFormat) -> AppResult<()> {
    let plant = project_service::load_plant(plant_path)?;
    let interactive = matches!(format, OutputFormat::Text);
    if interactive {
        println!("Running plant '{}' for {} ms", plant.name, duration.as_millis());
    }

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let summary = run_service::run_plant_with_progress(
        &plant,
        duration,
        Some(&mut |event| {
            if !interactive {
                return;
            }
            let emit_now =
                last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;

    match format {
        OutputFormat::Text => {
            clear_progress_line();
            println!("✓ Run completed");
            print_run_summary(&summary);
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!(error = %e, "failed to serialize run summary"),
        },
    }
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(80));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match event.stage {
        RunStage::Running => {
            let width = 28usize;
            let filled = ((event.fraction_complete * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            print!(
                "\r[{}] {:>6.2}%  elapsed={:.1}s",
                bar,
                event.fraction_complete * 100.0,
                event.elapsed_wall_s
            );
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
        }
    }
    let _ = io::stdout().flush();
}

fn print_run_summary(summary: &RunSummary) {
    let fmt_opt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));

    println!("Sensors:");
    for s in &summary.sensors {
        println!(
            "  {}  samples={}  last={} {}  mean interval={} ms",
            s.id,
            s.samples,
            fmt_opt(s.last_value),
            s.unit,
            fmt_opt(s.mean_interval_ms)
        );
    }
    println!("Actuators:");
    for a in &summary.actuators {
        println!(
            "  {}  adjustments={}  last={} {}",
            a.id,
            a.samples,
            fmt_opt(a.last_value),
            a.unit
        );
    }
    println!("Control loops:");
    for l in &summary.loops {
        println!(
            "  {}  updates={}  set point={}  error={}  output={}  settled after={} s",
            l.id,
            l.updates,
            l.set_point,
            fmt_opt(l.metrics.steady_state_error),
            fmt_opt(l.metrics.final_output),
            fmt_opt(l.metrics.output_settling_time_s)
        );
    }
}
