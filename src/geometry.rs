/// Default per-tick interpolation factor for animated rectangles.
pub const LERP_SPEED: f32 = 0.51;

/// Once the remaining per-axis delta drops below this many pixels the
/// animated value snaps exactly to its target.
pub const SNAP_EPSILON: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Key used to merge annotations that land on the same screen position.
    pub fn rounded_key(&self) -> (i64, i64) {
        (self.left.round() as i64, self.top.round() as i64)
    }
}

fn approach(current: f32, target: f32, speed: f32) -> (f32, bool) {
    let delta = target - current;
    if delta.abs() < SNAP_EPSILON {
        (target, true)
    } else {
        (current + delta * speed, false)
    }
}

/// Advance `current` toward `target` by one interpolation step.
///
/// Returns the new rectangle and whether every axis has converged. A
/// converged axis is snapped exactly to the target so callers can compare
/// with `==` and stop scheduling further ticks.
pub fn step_rect(current: Rect, target: Rect, speed: f32) -> (Rect, bool) {
    let (left, a) = approach(current.left, target.left, speed);
    let (top, b) = approach(current.top, target.top, speed);
    let (width, c) = approach(current.width, target.width, speed);
    let (height, d) = approach(current.height, target.height, speed);
    (
        Rect {
            left,
            top,
            width,
            height,
        },
        a && b && c && d,
    )
}

/// An animated rectangle with a mutable interpolated value and an
/// authoritative target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedRect {
    pub current: Rect,
    pub target: Rect,
    converged: bool,
}

impl TrackedRect {
    /// Start already converged on `rect`.
    pub fn pinned(rect: Rect) -> Self {
        Self {
            current: rect,
            target: rect,
            converged: true,
        }
    }

    /// Start at `from` and animate toward `target`.
    pub fn gliding(from: Rect, target: Rect) -> Self {
        Self {
            current: from,
            target,
            converged: from == target,
        }
    }

    pub fn retarget(&mut self, target: Rect) {
        self.target = target;
        self.converged = self.current == target;
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// One interpolation step; returns true once converged.
    pub fn step(&mut self, speed: f32) -> bool {
        if self.converged {
            return true;
        }
        let (next, done) = step_rect(self.current, self.target, speed);
        self.current = next;
        self.converged = done;
        done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_rect_converges_and_snaps_exactly() {
        let target = Rect::new(100.0, 200.0, 50.0, 40.0);
        let mut current = Rect::new(0.0, 0.0, 10.0, 10.0);
        let mut steps = 0;
        loop {
            let (next, done) = step_rect(current, target, LERP_SPEED);
            current = next;
            steps += 1;
            if done {
                break;
            }
            assert!(steps < 64, "interpolation did not converge");
        }
        assert_eq!(current, target);
        // Converged state is stable.
        let (again, done) = step_rect(current, target, LERP_SPEED);
        assert!(done);
        assert_eq!(again, target);
    }

    #[test]
    fn sub_epsilon_delta_snaps_in_one_step() {
        let target = Rect::new(10.3, 20.0, 30.0, 40.0);
        let current = Rect::new(10.0, 20.0, 30.0, 40.0);
        let (next, done) = step_rect(current, target, LERP_SPEED);
        assert!(done);
        assert_eq!(next, target);
    }

    #[test]
    fn tracked_rect_stops_stepping_once_converged() {
        let mut tracked = TrackedRect::gliding(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(40.0, 0.0, 10.0, 10.0),
        );
        let mut steps = 0;
        while !tracked.step(LERP_SPEED) {
            steps += 1;
            assert!(steps < 64);
        }
        assert!(tracked.converged());
        assert_eq!(tracked.current, tracked.target);
    }

    #[test]
    fn retarget_restarts_animation() {
        let mut tracked = TrackedRect::pinned(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(tracked.converged());
        tracked.retarget(Rect::new(100.0, 0.0, 10.0, 10.0));
        assert!(!tracked.converged());
    }
}
