//! Timed plant runs.

use std::time::{Duration, Instant};

use cf_project::schema::PlantDef;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::plant::Plant;
use crate::progress::{RunProgressEvent, RunStage};
use crate::query::{RunSummary, summarise_plant};

/// How often progress is reported while the plant runs.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    wall_start: Instant,
    fraction_complete: f64,
    message: Option<String>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            wall_start.elapsed().as_secs_f64(),
            fraction_complete,
            message,
        ));
    }
}

/// Build `def`, run it for `duration`, stop it and summarise the recordings.
pub fn run_plant(def: &PlantDef, duration: Duration) -> AppResult<RunSummary> {
    run_plant_with_progress(def, duration, None)
}

/// As [`run_plant`], streaming progress events to `progress_cb`.
pub fn run_plant_with_progress(
    def: &PlantDef,
    duration: Duration,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunSummary> {
    if duration.is_zero() {
        return Err(AppError::InvalidInput(
            "run duration must be positive".to_string(),
        ));
    }
    let wall_start = Instant::now();

    emit_progress(
        &mut progress_cb,
        RunStage::BuildingPlant,
        wall_start,
        0.0,
        Some(def.name.clone()),
    );
    let plant = Plant::build(def)?;

    emit_progress(&mut progress_cb, RunStage::Starting, wall_start, 0.0, None);
    let started_at = cf_core::utc_now();
    let run_start = Instant::now();
    plant.start();
    info!(plant = %def.name, duration_ms = duration.as_millis() as u64, "run started");

    loop {
        let remaining = duration.saturating_sub(run_start.elapsed());
        std::thread::sleep(remaining.min(PROGRESS_INTERVAL));
        let elapsed = run_start.elapsed();
        let fraction = (elapsed.as_secs_f64() / duration.as_secs_f64()).min(1.0);
        emit_progress(&mut progress_cb, RunStage::Running, wall_start, fraction, None);
        if elapsed >= duration {
            break;
        }
    }

    emit_progress(&mut progress_cb, RunStage::Stopping, wall_start, 1.0, None);
    plant.stop();

    emit_progress(&mut progress_cb, RunStage::Summarising, wall_start, 1.0, None);
    let summary = summarise_plant(&plant, started_at, duration);
    info!(
        plant = %def.name,
        loops = summary.loops.len(),
        "run completed"
    );

    emit_progress(&mut progress_cb, RunStage::Completed, wall_start, 1.0, None);
    Ok(summary)
}
