//! Player - Kinematics of the player's car
//!
//! `RaceSimulator::step` turns one tick of held controls into speed, lateral
//! position and lap progress, and reports lap and finish edges.

use serde::{Deserialize, Serialize};
use crate::race_engine::catalog::{TrackProfile, VehicleProfile};
use crate::race_engine::clock::Tick;
use crate::race_engine::input::InputSnapshot;

/// Shape of the abstract circuit every track shares
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackGeometry {
    /// Forward-progress units per lap
    pub lap_length: f32,
    /// Lateral position is kept within [-half_width, half_width]
    pub half_width: f32,
}

impl Default for TrackGeometry {
    fn default() -> Self {
        Self {
            lap_length: 1000.0,
            half_width: 200.0,
        }
    }
}

/// Kinematic state of the player's car for one race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicState {
    /// Always within [0, top speed]
    pub current_speed: f32,
    pub lateral_position: f32,
    /// Wraps at the lap length
    pub forward_progress: f32,
    pub elapsed_time: f32,
    /// 1-indexed, never above the track's lap count
    pub current_lap: u32,
    /// Set once, never cleared
    pub finished: bool,
    /// Elapsed time at which the current lap began
    pub lap_started_at: f32,
    pub last_lap_time: Option<f32>,
    pub best_lap_time: Option<f32>,
}

impl KinematicState {
    /// Grid position: lap 1, stationary, clock at zero
    pub fn new() -> Self {
        Self {
            current_speed: 0.0,
            lateral_position: 0.0,
            forward_progress: 0.0,
            elapsed_time: 0.0,
            current_lap: 1,
            finished: false,
            lap_started_at: 0.0,
            last_lap_time: None,
            best_lap_time: None,
        }
    }

    pub fn laps_completed(&self) -> u32 {
        if self.finished {
            self.current_lap
        } else {
            self.current_lap - 1
        }
    }

    fn close_lap(&mut self) -> f32 {
        let lap_time = self.elapsed_time - self.lap_started_at;
        self.lap_started_at = self.elapsed_time;
        self.last_lap_time = Some(lap_time);
        self.best_lap_time = Some(match self.best_lap_time {
            Some(best) => best.min(lap_time),
            None => lap_time,
        });
        lap_time
    }
}

impl Default for KinematicState {
    fn default() -> Self {
        Self::new()
    }
}

/// Edge emitted by a single tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RaceEvent {
    /// `lap` is the lap now being driven
    LapCompleted { lap: u32, lap_time: f32 },
    RaceCompleted { elapsed_time: f32, lap_time: f32 },
}

/// Player car simulation logic
pub struct RaceSimulator;

impl RaceSimulator {
    /// Speed gained per tick per point of acceleration rating
    pub const ACCEL_GAIN: f32 = 0.03;
    /// Speed shed per tick per point of acceleration rating while braking
    pub const BRAKE_GAIN: f32 = 0.05;
    /// Coasting loss per tick
    pub const NATURAL_DECAY: f32 = 2.0;
    pub const TURN_GAIN: f32 = 0.2;
    pub const DISTANCE_SCALE: f32 = 0.1;
    /// Below this a wrap of forward progress does not count as a lap
    pub const MIN_LAP_SPEED: f32 = 10.0;

    /// Advance the player car by one tick
    pub fn step(
        state: &mut KinematicState,
        input: &InputSnapshot,
        vehicle: &VehicleProfile,
        track: &TrackProfile,
        geometry: &TrackGeometry,
        tick: Tick,
    ) -> Option<RaceEvent> {
        if state.finished {
            return None;
        }

        let speed = Self::next_speed(state.current_speed, input, vehicle);
        state.current_speed = speed;

        // Steering authority scales with speed, a parked car cannot pivot
        let turn = Self::turn_rate(speed, vehicle);
        let mut lateral = state.lateral_position;
        if input.steer_left {
            lateral -= turn;
        }
        if input.steer_right {
            lateral += turn;
        }
        state.lateral_position = lateral.clamp(-geometry.half_width, geometry.half_width);

        state.elapsed_time += tick.dt;
        let previous = state.forward_progress;
        state.forward_progress =
            (previous + speed * Self::DISTANCE_SCALE).rem_euclid(geometry.lap_length);

        let wrapped = state.forward_progress < previous;
        if !wrapped || speed <= Self::MIN_LAP_SPEED {
            return None;
        }

        let lap_time = state.close_lap();
        if state.current_lap < track.lap_count {
            state.current_lap += 1;
            Some(RaceEvent::LapCompleted {
                lap: state.current_lap,
                lap_time,
            })
        } else {
            state.finished = true;
            Some(RaceEvent::RaceCompleted {
                elapsed_time: state.elapsed_time,
                lap_time,
            })
        }
    }

    /// Longitudinal update. Brake wins when both pedals are held.
    pub fn next_speed(speed: f32, input: &InputSnapshot, vehicle: &VehicleProfile) -> f32 {
        let top = vehicle.top_speed.max(0.0);
        let next = if input.brake {
            speed - vehicle.acceleration * Self::BRAKE_GAIN
        } else if input.accelerate {
            speed + vehicle.acceleration * Self::ACCEL_GAIN
        } else {
            speed - Self::NATURAL_DECAY
        };

        if next.is_nan() {
            0.0
        } else {
            next.clamp(0.0, top)
        }
    }

    /// Lateral displacement per tick at the given speed
    pub fn turn_rate(speed: f32, vehicle: &VehicleProfile) -> f32 {
        if vehicle.top_speed <= 0.0 {
            return 0.0;
        }
        (speed / vehicle.top_speed) * vehicle.handling * Self::TURN_GAIN
    }
}
