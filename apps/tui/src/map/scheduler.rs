use super::animation::{FlowAnimation, MarkerFrame};
use super::FlowId;
use std::cell::Cell;
use std::rc::Rc;

/// Owned by a flow edge; dropping or cancelling it stops the edge's loop.
#[derive(Debug)]
pub struct LoopHandle {
    alive: Rc<Cell<bool>>,
}

impl LoopHandle {
    pub fn cancel(&self) {
        self.alive.set(false);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.alive.set(false);
    }
}

#[derive(Debug)]
struct ScheduledLoop {
    flow: FlowId,
    generation: u64,
    alive: Rc<Cell<bool>>,
    animation: FlowAnimation,
}

/// One frame's result for a live loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUpdate {
    pub flow: FlowId,
    pub frame: MarkerFrame,
}

/// Drives one animation loop per flow edge from the host's frame callback.
///
/// A loop runs until its [`LoopHandle`] is dropped or cancelled, or until the
/// scheduler moves to a new generation. Dead loops are discarded before they
/// produce an update.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    generation: u64,
    loops: Vec<ScheduledLoop>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub fn spawn(&mut self, flow: FlowId, animation: FlowAnimation) -> LoopHandle {
        let alive = Rc::new(Cell::new(true));
        self.loops.push(ScheduledLoop {
            flow,
            generation: self.generation,
            alive: Rc::clone(&alive),
            animation,
        });
        LoopHandle { alive }
    }

    /// Starts a new generation: every loop spawned so far is stopped.
    pub fn invalidate_all(&mut self) {
        self.generation += 1;
        for task in &self.loops {
            task.alive.set(false);
        }
        self.loops.clear();
    }

    /// Number of loops still scheduled (including ones that will be dropped on
    /// the next tick).
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Advances every live loop to `now_ms`, in spawn order.
    pub fn tick(&mut self, now_ms: f64) -> Vec<FrameUpdate> {
        let generation = self.generation;
        self.loops
            .retain(|task| task.alive.get() && task.generation == generation);
        self.loops
            .iter_mut()
            .map(|task| FrameUpdate {
                flow: task.flow,
                frame: task.animation.advance(now_ms),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Point, QuadraticCurve};

    fn animation() -> FlowAnimation {
        let curve = QuadraticCurve::flow(Point::new(0.0, 0.0), Point::new(90.0, 0.0));
        FlowAnimation::new(&curve, 1.0)
    }

    #[test]
    fn live_loops_produce_one_update_each() {
        let mut scheduler = FrameScheduler::new();
        let _a = scheduler.spawn(FlowId(1), animation());
        let _b = scheduler.spawn(FlowId(2), animation());

        let updates = scheduler.tick(0.0);
        let flows: Vec<FlowId> = updates.iter().map(|u| u.flow).collect();
        assert_eq!(flows, vec![FlowId(1), FlowId(2)]);
    }

    #[test]
    fn dropped_handle_stops_its_loop() {
        let mut scheduler = FrameScheduler::new();
        let a = scheduler.spawn(FlowId(1), animation());
        let _b = scheduler.spawn(FlowId(2), animation());

        drop(a);
        let updates = scheduler.tick(16.0);

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].flow, FlowId(2));
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn new_generation_cancels_every_loop() {
        let mut scheduler = FrameScheduler::new();
        let a = scheduler.spawn(FlowId(1), animation());

        scheduler.invalidate_all();

        assert!(!a.is_alive());
        assert!(scheduler.tick(16.0).is_empty());
        assert_eq!(scheduler.generation(), 1);

        let _c = scheduler.spawn(FlowId(3), animation());
        assert_eq!(scheduler.tick(32.0).len(), 1);
    }

    #[test]
    fn cancel_is_observed_on_next_tick() {
        let mut scheduler = FrameScheduler::new();
        let a = scheduler.spawn(FlowId(1), animation());
        assert_eq!(scheduler.tick(0.0).len(), 1);

        a.cancel();

        assert!(scheduler.tick(16.0).is_empty());
        assert!(scheduler.is_empty());
    }
}
