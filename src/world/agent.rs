// Runner movement: heading, lateral motion with per-axis collision rejection,
// and a two-state vertical controller.
//
//   Grounded --ascend--> Airborne --back on ground, vy <= 0--> Grounded
//
// A candidate that collides is dropped for that axis only. Moving X and Z
// separately lets the runner slide along an obstacle face on a diagonal
// approach instead of stopping dead.

use std::f32::consts::TAU;
use glam::Vec3;
use super::collision::Aabb;
use super::config::AgentTuning;

// ============================================================================
// INTENT & STATE
// ============================================================================

/// One tick of player intent, already decoupled from any key mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementIntent {
    pub turn_left: bool,
    pub turn_right: bool,
    pub advance: bool,
    pub retreat: bool,
    pub ascend: bool,
}

impl MovementIntent {
    /// -1, 0 or 1 along the heading.
    pub fn drive(&self) -> f32 {
        (self.advance as i8 - self.retreat as i8) as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Grounded,
    Airborne,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agent {
    /// Bottom centre of the collision box.
    pub position: Vec3,
    /// Radians in [0, TAU). Zero faces -Z; turning left increases it.
    pub heading: f32,
    pub vertical_velocity: f32,
    pub state: MotionState,
}

impl Agent {
    /// Unit vector on the XZ plane the agent is facing.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(-self.heading.sin(), 0.0, -self.heading.cos())
    }
}

/// What happened during one controller step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub launched: bool,
    /// Launch came from ascending while overlapping an obstacle.
    pub bounced: bool,
    pub landed: bool,
    pub blocked_x: bool,
    pub blocked_z: bool,
    pub blocked_y: bool,
}

// ============================================================================
// CONTROLLER
// ============================================================================

pub struct AgentController {
    agent: Agent,
    tuning: AgentTuning,
}

impl AgentController {
    pub fn new(tuning: AgentTuning) -> Self {
        Self {
            agent: Agent {
                position: Vec3::new(0.0, tuning.ground_height, 0.0),
                heading: 0.0,
                vertical_velocity: 0.0,
                state: MotionState::Grounded,
            },
            tuning,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn tuning(&self) -> &AgentTuning {
        &self.tuning
    }

    /// Collision box for the agent standing at `position`.
    pub fn volume_at(&self, position: Vec3) -> Aabb {
        let size = self.tuning.body_size;
        Aabb::from_center_size(position + Vec3::Y * (size.y * 0.5), size)
    }

    /// Teleport. Height is clamped into the flight band and vertical motion is
    /// reset; the state follows from the new height.
    pub fn place(&mut self, position: Vec3) {
        let t = &self.tuning;
        let y = position.y.clamp(t.ground_height, t.max_flight_height);
        self.agent.position = Vec3::new(position.x, y, position.z);
        self.agent.vertical_velocity = 0.0;
        self.agent.state = if y <= t.ground_height {
            MotionState::Grounded
        } else {
            MotionState::Airborne
        };
    }

    /// Advance one tick. `collides` answers whether a box hits a live obstacle.
    pub fn step<F>(&mut self, intent: &MovementIntent, collides: F) -> StepReport
    where
        F: Fn(&Aabb) -> bool,
    {
        let t = self.tuning;
        let mut report = StepReport::default();
        let mut next = self.agent;

        // 1. Heading
        let turn = (intent.turn_left as i8 - intent.turn_right as i8) as f32;
        if turn != 0.0 {
            next.heading = (next.heading + turn * t.turn_rate).rem_euclid(TAU);
        }

        // 2. Lateral, one axis at a time
        let delta = next.forward() * (t.speed * intent.drive());
        if delta.x != 0.0 {
            let candidate = next.position + Vec3::X * delta.x;
            if collides(&self.volume_at(candidate)) {
                report.blocked_x = true;
            } else {
                next.position = candidate;
            }
        }
        if delta.z != 0.0 {
            let candidate = next.position + Vec3::Z * delta.z;
            if collides(&self.volume_at(candidate)) {
                report.blocked_z = true;
            } else {
                next.position = candidate;
            }
        }

        // 3. Vertical. An agent already overlapping an obstacle may move
        // vertically through it, which is how a bounce escapes.
        let embedded = collides(&self.volume_at(next.position));
        match next.state {
            MotionState::Grounded if intent.ascend => {
                next.state = MotionState::Airborne;
                report.launched = true;
                if embedded {
                    report.bounced = true;
                    next.vertical_velocity = t.max_rise;
                } else {
                    next.vertical_velocity = t.ascend_accel.min(t.max_rise);
                }
            }
            MotionState::Grounded => {
                next.vertical_velocity = 0.0;
            }
            MotionState::Airborne => {
                next.vertical_velocity = if intent.ascend {
                    (next.vertical_velocity + t.ascend_accel).min(t.max_rise)
                } else {
                    (next.vertical_velocity - t.gravity).max(t.max_fall)
                };
            }
        }

        if next.vertical_velocity != 0.0 {
            let raw = next.position.y + next.vertical_velocity;
            let clamped = raw.clamp(t.ground_height, t.max_flight_height);
            let candidate = Vec3::new(next.position.x, clamped, next.position.z);

            if clamped != next.position.y && !embedded && collides(&self.volume_at(candidate)) {
                report.blocked_y = true;
                next.vertical_velocity = 0.0;
            } else {
                next.position.y = clamped;
                if clamped != raw {
                    next.vertical_velocity = 0.0;
                }
            }
        }

        if next.state == MotionState::Airborne
            && next.position.y <= t.ground_height
            && next.vertical_velocity <= 0.0
        {
            next.state = MotionState::Grounded;
            next.vertical_velocity = 0.0;
            report.landed = true;
        }

        // 4. Commit
        self.agent = next;
        report
    }
}
