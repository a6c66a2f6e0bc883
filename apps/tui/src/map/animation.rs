use crate::geo::{ArcTable, Point, QuadraticCurve};

/// Map units a marker covers per second at speed 1.
pub const LENGTH_PER_SECOND: f64 = 30.0;
/// Rest between two traversals, marker hidden.
pub const RESTART_PAUSE_MS: f64 = 1200.0;

pub fn ease_in_out_quad(t: f64) -> f64 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0_f64).mul_add(t, 2.0).powi(2) / 2.0
    }
}

/// Milliseconds one traversal of a `length`-long curve takes.
pub fn cycle_duration_ms(length: f64, speed: f64) -> f64 {
    length / LENGTH_PER_SECOND / speed * 1000.0
}

/// What a frame asks of the marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkerFrame {
    Visible { position: Point, progress: f64 },
    Hidden,
}

/// Motion of one marker along a flow curve, repeated forever.
#[derive(Debug, Clone)]
pub struct FlowAnimation {
    arc: ArcTable,
    duration_ms: f64,
    /// Start of the first traversal, set by the first frame.
    started_at: Option<f64>,
}

impl FlowAnimation {
    pub fn new(curve: &QuadraticCurve, speed: f64) -> Self {
        let arc = curve.arc_table();
        let duration_ms = cycle_duration_ms(arc.total(), speed);
        Self {
            arc,
            duration_ms,
            started_at: None,
        }
    }

    pub const fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn length(&self) -> f64 {
        self.arc.total()
    }

    /// Advances to `now_ms` and returns the marker state for this frame.
    ///
    /// Traversals repeat with a fixed period, so the state is computed from
    /// the time since the first frame however long the gap between frames.
    pub fn advance(&mut self, now_ms: f64) -> MarkerFrame {
        let started_at = *self.started_at.get_or_insert(now_ms);
        let period = self.duration_ms + RESTART_PAUSE_MS;
        let elapsed = (now_ms - started_at).max(0.0).rem_euclid(period);

        if elapsed >= self.duration_ms {
            return MarkerFrame::Hidden;
        }
        let progress = ease_in_out_quad(elapsed / self.duration_ms);
        let position = self.arc.point_at_length(progress * self.arc.total());
        MarkerFrame::Visible { position, progress }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(diff < 1e-9, "expected {expected}, got {actual}, diff {diff}");
    }

    fn straight(length: f64) -> QuadraticCurve {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(length, 0.0);
        QuadraticCurve::new(start, start.midpoint(end), end)
    }

    #[test]
    fn easing_is_slow_at_the_ends() {
        assert_close(ease_in_out_quad(0.0), 0.0);
        assert_close(ease_in_out_quad(0.25), 0.125);
        assert_close(ease_in_out_quad(0.5), 0.5);
        assert_close(ease_in_out_quad(0.75), 0.875);
        assert_close(ease_in_out_quad(1.0), 1.0);
    }

    #[test]
    fn duration_follows_length_and_speed() {
        assert_close(cycle_duration_ms(30.0, 1.0), 1000.0);
        assert_close(cycle_duration_ms(90.0, 1.5), 2000.0);
        let animation = FlowAnimation::new(&straight(60.0), 2.0);
        assert!((animation.duration_ms() - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn first_frame_starts_at_the_origin() {
        let mut animation = FlowAnimation::new(&straight(60.0), 1.0);
        let frame = animation.advance(500.0);
        assert_eq!(
            frame,
            MarkerFrame::Visible {
                position: Point::new(0.0, 0.0),
                progress: 0.0
            }
        );
    }

    #[test]
    fn marker_is_midway_at_half_time() {
        let mut animation = FlowAnimation::new(&straight(60.0), 1.0);
        animation.advance(0.0);
        let MarkerFrame::Visible { position, progress } = animation.advance(1000.0) else {
            panic!("marker should be visible mid-cycle");
        };
        assert_close(progress, 0.5);
        assert!((position.x - 30.0).abs() < 1e-6);
    }

    #[test]
    fn hides_then_restarts_after_the_pause() {
        let mut animation = FlowAnimation::new(&straight(60.0), 1.0);
        animation.advance(0.0);

        assert_eq!(animation.advance(2000.0), MarkerFrame::Hidden);
        assert_eq!(animation.advance(2000.0 + RESTART_PAUSE_MS - 1.0), MarkerFrame::Hidden);

        let frame = animation.advance(2000.0 + RESTART_PAUSE_MS);
        assert_eq!(
            frame,
            MarkerFrame::Visible {
                position: Point::new(0.0, 0.0),
                progress: 0.0
            }
        );
    }

    #[test]
    fn long_frame_gap_skips_whole_cycles() {
        let mut animation = FlowAnimation::new(&straight(60.0), 1.0);
        animation.advance(0.0);
        // cycle = 2000 ms moving + 1200 ms rest
        let frame = animation.advance(3200.0 * 3.0 + 1000.0);
        assert!(matches!(frame, MarkerFrame::Visible { progress, .. } if (progress - 0.5).abs() < 1e-9));
    }

    #[test]
    fn huge_frame_gap_lands_in_the_right_cycle() {
        let mut animation = FlowAnimation::new(&straight(60.0), 1.0);
        animation.advance(0.0);
        // 3200 ms period, 1e12 is a whole number of cycles
        let frame = animation.advance(1.0e12 + 1000.0);
        assert!(matches!(frame, MarkerFrame::Visible { progress, .. } if (progress - 0.5).abs() < 1e-3));
        assert_eq!(animation.advance(1.0e12 + 2500.0), MarkerFrame::Hidden);
    }

    #[test]
    fn zero_length_curve_only_rests() {
        let p = Point::new(5.0, 5.0);
        let mut animation = FlowAnimation::new(&QuadraticCurve::new(p, p, p), 1.0);
        assert_eq!(animation.advance(0.0), MarkerFrame::Hidden);
        assert_eq!(animation.advance(100.0), MarkerFrame::Hidden);
    }
}
