//! Race - Race configuration and per-race session state
//!
//! A `RaceSession` lives exactly as long as the Racing phase: it is built
//! fresh when the countdown ends and dropped on finish or exit.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use crate::race_engine::catalog::{TrackProfile, VehicleProfile};
use crate::race_engine::clock::Tick;
use crate::race_engine::error::RaceError;
use crate::race_engine::input::InputSnapshot;
use crate::race_engine::opponents::OpponentField;
use crate::race_engine::player::{KinematicState, RaceEvent, RaceSimulator, TrackGeometry};

/// Persisted selection (vehicle id + track id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceConfig {
    pub vehicle_id: String,
    pub track_id: String,
}

/// Engine tuning that is not tied to a particular car
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Race tick length (time-units)
    pub tick_length: f32,
    /// Countdown steps before the race starts
    pub countdown_ticks: u8,
    /// Time between countdown steps
    pub countdown_period: f32,
    /// How many finish-hold periods the results stay up before returning to menu
    pub finish_hold_ticks: u8,
    pub finish_hold_period: f32,
    pub geometry: TrackGeometry,
    pub opponent_count: u32,
    /// Upper bound on ticks replayed by a single `advance`
    pub max_catch_up_ticks: u32,
}

impl EngineConfig {
    /// Periods and lap length must be positive, the half-width non-negative
    pub fn validate(&self) -> Result<(), RaceError> {
        let positive = [
            ("tick_length", self.tick_length),
            ("countdown_period", self.countdown_period),
            ("finish_hold_period", self.finish_hold_period),
            ("geometry.lap_length", self.geometry.lap_length),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(RaceError::InvalidEngineConfig(format!(
                    "{} must be > 0, got {}",
                    name, value
                )));
            }
        }
        let half_width = self.geometry.half_width;
        if !(half_width.is_finite() && half_width >= 0.0) {
            return Err(RaceError::InvalidEngineConfig(format!(
                "geometry.half_width must be >= 0, got {}",
                half_width
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_length: 0.1,
            countdown_ticks: 3,
            countdown_period: 1.0,
            finish_hold_ticks: 3,
            finish_hold_period: 1.0,
            geometry: TrackGeometry::default(),
            opponent_count: 3,
            max_catch_up_ticks: 10,
        }
    }
}

/// Summary of a finished race, persisted as the "last result"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    #[serde(rename = "car")]
    pub vehicle_name: String,
    #[serde(rename = "track")]
    pub track_name: String,
    #[serde(rename = "time")]
    pub elapsed_time: f32,
    #[serde(rename = "laps")]
    pub laps_completed: u32,
    pub position: u32,
    #[serde(rename = "bestLapTime", default)]
    pub best_lap_time: Option<f32>,
}

/// The player is not ranked against the AI field; every finish is reported as 1st.
pub const PLAYER_POSITION: u32 = 1;

/// Upper end of the vehicle rating scale
pub const RATING_MAX: f32 = 100.0;

/// Reject vehicle/track pairs a race cannot be started with
pub fn validate_selection(vehicle: &VehicleProfile, track: &TrackProfile) -> Result<(), RaceError> {
    if !vehicle.unlocked {
        return Err(RaceError::LockedVehicle(vehicle.id.clone()));
    }
    if !track.unlocked {
        return Err(RaceError::LockedTrack(track.id.clone()));
    }
    let ratings = [
        ("top speed", vehicle.top_speed, vehicle.top_speed > 0.0),
        ("acceleration", vehicle.acceleration, vehicle.acceleration >= 0.0),
        ("handling", vehicle.handling, vehicle.handling >= 0.0),
    ];
    for (field, value, lower_ok) in ratings {
        // NaN fails both comparisons
        if !(lower_ok && value <= RATING_MAX) {
            return Err(RaceError::InvalidVehicleConfig {
                id: vehicle.id.clone(),
                field,
                value,
            });
        }
    }
    if track.lap_count < 1 {
        return Err(RaceError::InvalidTrackConfig {
            id: track.id.clone(),
            lap_count: track.lap_count,
        });
    }
    Ok(())
}

/// Everything that exists only while a race is running
#[derive(Debug, Clone)]
pub struct RaceSession {
    pub vehicle: VehicleProfile,
    pub track: TrackProfile,
    pub geometry: TrackGeometry,
    pub player: KinematicState,
    pub opponents: OpponentField,
    rng: StdRng,
}

impl RaceSession {
    /// Fresh session: player on the grid, new opponent field
    pub fn new(vehicle: VehicleProfile, track: TrackProfile, config: &EngineConfig) -> Self {
        Self::with_rng(vehicle, track, config, StdRng::from_entropy())
    }

    pub fn with_rng(
        vehicle: VehicleProfile,
        track: TrackProfile,
        config: &EngineConfig,
        mut rng: StdRng,
    ) -> Self {
        let opponents = OpponentField::starting_grid(config.opponent_count, &config.geometry, &mut rng);
        Self {
            vehicle,
            track,
            geometry: config.geometry,
            player: KinematicState::new(),
            opponents,
            rng,
        }
    }

    /// Advance player and opponents by the same tick
    pub fn step(&mut self, input: &InputSnapshot, tick: Tick) -> Option<RaceEvent> {
        let event = RaceSimulator::step(
            &mut self.player,
            input,
            &self.vehicle,
            &self.track,
            &self.geometry,
            tick,
        );
        self.opponents.step(&self.geometry, tick, &mut self.rng);
        event
    }

    pub fn is_finished(&self) -> bool {
        self.player.finished
    }

    pub fn result(&self) -> RaceResult {
        RaceResult {
            vehicle_name: self.vehicle.name.clone(),
            track_name: self.track.name.clone(),
            elapsed_time: self.player.elapsed_time,
            laps_completed: self.player.laps_completed(),
            position: PLAYER_POSITION,
            best_lap_time: self.player.best_lap_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race_engine::catalog::{Catalog, Difficulty};
    use crate::race_engine::clock::{ClockKind, TickClock};

    fn session(lap_count: u32) -> RaceSession {
        let catalog = Catalog::default();
        let mut track = catalog.track("neon-city").unwrap().clone();
        track.lap_count = lap_count;
        RaceSession::with_rng(
            catalog.vehicle("viper").unwrap().clone(),
            track,
            &EngineConfig::default(),
            StdRng::seed_from_u64(9),
        )
    }

    #[test]
    fn validation_rejects_locked_and_broken_profiles() {
        let catalog = Catalog::default();
        let car = catalog.vehicle("thunderbolt").unwrap();
        let track = catalog.track("neon-city").unwrap();
        assert!(validate_selection(car, track).is_ok());

        let locked_car = catalog.vehicle("phantom").unwrap();
        assert!(matches!(
            validate_selection(locked_car, track),
            Err(RaceError::LockedVehicle(_))
        ));

        let locked_track = catalog.track("space-station").unwrap();
        assert!(matches!(
            validate_selection(car, locked_track),
            Err(RaceError::LockedTrack(_))
        ));

        let empty = TrackProfile::new("empty", "Empty", Difficulty::Easy, 0);
        assert!(matches!(
            validate_selection(car, &empty),
            Err(RaceError::InvalidTrackConfig { lap_count: 0, .. })
        ));

        let stalled = VehicleProfile::new("stalled", "Stalled", 0.0, 50.0, 50.0);
        assert!(matches!(
            validate_selection(&stalled, track),
            Err(RaceError::InvalidVehicleConfig { field: "top speed", .. })
        ));
    }

    #[test]
    fn validation_rejects_out_of_scale_ratings() {
        let catalog = Catalog::default();
        let track = catalog.track("neon-city").unwrap();

        let cases = [
            (VehicleProfile::new("a", "A", 90.0, 50.0, f32::NAN), "handling"),
            (VehicleProfile::new("b", "B", 90.0, -10.0, 50.0), "acceleration"),
            (VehicleProfile::new("c", "C", 90.0, 50.0, 140.0), "handling"),
            (VehicleProfile::new("d", "D", f32::INFINITY, 50.0, 50.0), "top speed"),
            (VehicleProfile::new("e", "E", 90.0, f32::NAN, 50.0), "acceleration"),
        ];
        for (vehicle, expected) in cases {
            match validate_selection(&vehicle, track) {
                Err(RaceError::InvalidVehicleConfig { field, .. }) => assert_eq!(field, expected),
                other => panic!("{} accepted or wrong error: {:?}", vehicle.id, other),
            }
        }

        let edge = VehicleProfile::new("edge", "Edge", 100.0, 0.0, 100.0);
        assert!(validate_selection(&edge, track).is_ok());
    }

    #[test]
    fn engine_config_rejects_degenerate_values() {
        assert!(EngineConfig::default().validate().is_ok());

        let mut narrow = EngineConfig::default();
        narrow.geometry.half_width = 0.0;
        assert!(narrow.validate().is_ok());

        let broken: [fn(&mut EngineConfig); 6] = [
            |c| c.tick_length = 0.0,
            |c| c.countdown_period = -1.0,
            |c| c.finish_hold_period = f32::NAN,
            |c| c.geometry.lap_length = 0.0,
            |c| c.geometry.half_width = -5.0,
            |c| c.geometry.half_width = f32::INFINITY,
        ];
        for (i, breaks) in broken.iter().enumerate() {
            let mut config = EngineConfig::default();
            breaks(&mut config);
            assert!(
                matches!(config.validate(), Err(RaceError::InvalidEngineConfig(_))),
                "case {} was accepted",
                i
            );
        }
    }

    #[test]
    fn new_session_starts_on_the_grid() {
        let s = session(3);
        assert_eq!(s.player, KinematicState::new());
        assert_eq!(s.opponents.len(), 3);
        assert!(!s.is_finished());
    }

    #[test]
    fn one_lap_race_produces_result() {
        let mut s = session(1);
        let mut clock = TickClock::new(ClockKind::Race, 0.1);
        let input = InputSnapshot {
            accelerate: true,
            ..Default::default()
        };

        let mut finish = None;
        for _ in 0..1000 {
            if let Some(event) = s.step(&input, clock.fire()) {
                finish = Some(event);
                break;
            }
        }

        assert!(matches!(finish, Some(RaceEvent::RaceCompleted { .. })));
        let result = s.result();
        assert_eq!(result.vehicle_name, "Neon Viper");
        assert_eq!(result.track_name, "Neon City Circuit");
        assert_eq!(result.laps_completed, 1);
        assert_eq!(result.position, 1);
        assert_eq!(result.elapsed_time, s.player.elapsed_time);
    }

    #[test]
    fn result_uses_stored_key_names() {
        let result = RaceResult {
            vehicle_name: "Thunderbolt X1".into(),
            track_name: "Mountain Pass".into(),
            elapsed_time: 61.5,
            laps_completed: 5,
            position: 1,
            best_lap_time: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["car"], "Thunderbolt X1");
        assert_eq!(json["laps"], 5);

        let legacy = r#"{"car":"A","track":"B","time":1.0,"laps":3,"position":1}"#;
        let parsed: RaceResult = serde_json::from_str(legacy).unwrap();
        assert_eq!(parsed.best_lap_time, None);
    }
}
