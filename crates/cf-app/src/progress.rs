/// Stage of a plant run, reported in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    BuildingPlant,
    Starting,
    Running,
    Stopping,
    Summarising,
    Completed,
}

impl RunStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BuildingPlant => "building plant",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Summarising => "summarising",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    /// Share of the requested run duration already spent running (0..=1).
    pub fraction_complete: f64,
    pub message: Option<String>,
}

impl RunProgressEvent {
    pub fn stage(
        stage: RunStage,
        elapsed_wall_s: f64,
        fraction_complete: f64,
        message: Option<String>,
    ) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            fraction_complete,
            message,
        }
    }
}
