#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AnimationMode {
    Running,
    Paused,
}

impl AnimationMode {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Running => Self::Paused,
            Self::Paused => Self::Running,
        }
    }
}

/// Longest frame gap fed to the flow animations, e.g. after the tab was hidden.
const MAX_FRAME_DELTA_MS: f64 = 250.0;

/// Advances the map clock (milliseconds) by the time since `last_tick`.
///
/// The first call only records the time. Paused clocks keep their value but
/// still track wall time, so resuming does not jump.
pub fn advance_clock(
    clock_ms: f64,
    last_tick: Option<f64>,
    now_ms: f64,
    mode: AnimationMode,
) -> (f64, Option<f64>) {
    let delta = last_tick.map_or(0.0, |last| (now_ms - last).clamp(0.0, MAX_FRAME_DELTA_MS));

    let next_clock = match mode {
        AnimationMode::Running => clock_ms + delta,
        AnimationMode::Paused => clock_ms,
    };

    (next_clock, Some(now_ms))
}
