//! Opponents - Background AI cars
//!
//! Each opponent drifts and varies its pace at random. They never interact
//! with each other or with the player, count no laps and emit no events.

use rand::Rng;
use serde::{Deserialize, Serialize};
use crate::race_engine::clock::Tick;
use crate::race_engine::player::TrackGeometry;

/// State of a single AI car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentState {
    pub id: u32,
    pub lateral_position: f32,
    pub forward_progress: f32,
    pub speed: f32,
}

/// AI car simulation logic
pub struct AIOpponentSimulator;

impl AIOpponentSimulator {
    /// Max lateral wander per tick
    pub const LATERAL_JITTER: f32 = 1.0;
    /// Max pace change per tick
    pub const SPEED_JITTER: f32 = 0.25;
    pub const MIN_SPEED: f32 = 30.0;
    pub const MAX_SPEED: f32 = 60.0;
    /// Progress per unit of speed per time-unit (0.05 per nominal 0.1 tick)
    pub const DISTANCE_RATE: f32 = 0.5;

    /// Advance one opponent by one tick
    pub fn step<R: Rng + ?Sized>(
        state: &mut OpponentState,
        geometry: &TrackGeometry,
        tick: Tick,
        rng: &mut R,
    ) {
        let drift = rng.gen_range(-Self::LATERAL_JITTER..=Self::LATERAL_JITTER);
        state.lateral_position =
            (state.lateral_position + drift).clamp(-geometry.half_width, geometry.half_width);

        let travelled = state.speed * Self::DISTANCE_RATE * tick.dt;
        state.forward_progress = (state.forward_progress + travelled).rem_euclid(geometry.lap_length);

        let pace = rng.gen_range(-Self::SPEED_JITTER..=Self::SPEED_JITTER);
        state.speed = (state.speed + pace).clamp(Self::MIN_SPEED, Self::MAX_SPEED);
    }
}

/// All opponents of one race
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpponentField {
    pub opponents: Vec<OpponentState>,
}

impl OpponentField {
    /// Stagger `count` cars ahead of the player with some spread in lane and pace
    pub fn starting_grid<R: Rng + ?Sized>(count: u32, geometry: &TrackGeometry, rng: &mut R) -> Self {
        let lane_spread = (geometry.half_width * 0.3).max(1.0);
        let opponents = (0..count)
            .map(|i| OpponentState {
                id: i + 1,
                lateral_position: rng.gen_range(-lane_spread..=lane_spread),
                forward_progress: (100.0 + 50.0 * i as f32).rem_euclid(geometry.lap_length),
                speed: rng.gen_range(40.0..=50.0),
            })
            .collect();

        Self { opponents }
    }

    pub fn step<R: Rng + ?Sized>(&mut self, geometry: &TrackGeometry, tick: Tick, rng: &mut R) {
        for opponent in &mut self.opponents {
            AIOpponentSimulator::step(opponent, geometry, tick, rng);
        }
    }

    pub fn len(&self) -> usize {
        self.opponents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opponents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race_engine::clock::{ClockKind, TickClock};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn grid_places_requested_number_of_cars() {
        let mut rng = StdRng::seed_from_u64(1);
        let geometry = TrackGeometry::default();
        let field = OpponentField::starting_grid(3, &geometry, &mut rng);

        assert_eq!(field.len(), 3);
        for (i, car) in field.opponents.iter().enumerate() {
            assert_eq!(car.id, i as u32 + 1);
            assert!(car.speed >= 40.0 && car.speed <= 50.0);
            assert!(car.lateral_position.abs() <= 60.0);
        }
        assert!(OpponentField::starting_grid(0, &geometry, &mut rng).is_empty());
    }

    #[test]
    fn opponents_stay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let geometry = TrackGeometry::default();
        let mut clock = TickClock::new(ClockKind::Race, 0.1);
        let mut field = OpponentField::starting_grid(5, &geometry, &mut rng);

        for _ in 0..5000 {
            field.step(&geometry, clock.fire(), &mut rng);
            for car in &field.opponents {
                assert!(car.speed >= AIOpponentSimulator::MIN_SPEED);
                assert!(car.speed <= AIOpponentSimulator::MAX_SPEED);
                assert!(car.lateral_position.abs() <= geometry.half_width);
                assert!(car.forward_progress >= 0.0 && car.forward_progress < geometry.lap_length);
            }
        }
    }

    #[test]
    fn progress_scales_with_tick_length() {
        let mut rng = StdRng::seed_from_u64(5);
        let geometry = TrackGeometry::default();
        let start = OpponentState {
            id: 1,
            lateral_position: 0.0,
            forward_progress: 100.0,
            speed: 40.0,
        };

        let mut short = start.clone();
        let tick = TickClock::new(ClockKind::Race, 0.1).fire();
        AIOpponentSimulator::step(&mut short, &geometry, tick, &mut rng);
        assert!((short.forward_progress - 102.0).abs() < 1e-3);

        let mut long = start;
        let tick = TickClock::new(ClockKind::Race, 0.2).fire();
        AIOpponentSimulator::step(&mut long, &geometry, tick, &mut rng);
        assert!((long.forward_progress - 104.0).abs() < 1e-3);
    }

    #[test]
    fn speed_band_pulls_outliers_back() {
        let mut rng = StdRng::seed_from_u64(3);
        let geometry = TrackGeometry::default();
        let mut car = OpponentState {
            id: 1,
            lateral_position: 0.0,
            forward_progress: 0.0,
            speed: 90.0,
        };
        let tick = TickClock::new(ClockKind::Race, 0.1).fire();
        AIOpponentSimulator::step(&mut car, &geometry, tick, &mut rng);
        assert_eq!(car.speed, AIOpponentSimulator::MAX_SPEED);
    }
}
