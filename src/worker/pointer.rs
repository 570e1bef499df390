use glam::Vec2;

use crate::effects::{damping_factor, LeaveBehavior};

/// Raw pointer target plus a value that exponentially approaches it.
#[derive(Debug, Clone, PartialEq)]
pub struct DampedPointer {
    target: Vec2,
    value: Vec2,
    tau: f32,
    inside: bool,
}

impl DampedPointer {
    pub fn new(rest: Vec2, tau: f32) -> Self {
        Self {
            target: rest,
            value: rest,
            tau,
            inside: false,
        }
    }

    pub fn set_target(&mut self, target: Vec2) {
        self.target = target;
        self.inside = true;
    }

    pub fn leave(&mut self, behavior: LeaveBehavior) {
        self.inside = false;
        if let LeaveBehavior::ResetTo(rest) = behavior {
            self.target = rest;
        }
    }

    /// Moves the damped value `delta` seconds toward the target.
    pub fn step(&mut self, delta: f32) -> Vec2 {
        let alpha = damping_factor(delta, self.tau);
        self.value += (self.target - self.value) * alpha;
        self.value
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    pub fn value(&self) -> Vec2 {
        self.value
    }

    pub fn is_inside(&self) -> bool {
        self.inside
    }
}
