//! Error types for race setup and persistence.

use crate::race_engine::simulation::PhaseKind;

/// Errors raised by user actions against the state machine.
///
/// None of these are fatal: the machine stays in its current phase and keeps
/// its current selection whenever one is returned.
#[derive(Debug, thiserror::Error)]
pub enum RaceError {
    #[error("vehicle '{0}' is locked")]
    LockedVehicle(String),
    #[error("track '{0}' is locked")]
    LockedTrack(String),
    #[error("no vehicle with id '{0}'")]
    UnknownVehicle(String),
    #[error("no track with id '{0}'")]
    UnknownTrack(String),
    #[error("catalog has no vehicles or no tracks")]
    EmptyCatalog,
    #[error("track '{id}' has {lap_count} laps, at least 1 is required")]
    InvalidTrackConfig { id: String, lap_count: u32 },
    #[error("vehicle '{id}' has an unusable {field} of {value}")]
    InvalidVehicleConfig {
        id: String,
        field: &'static str,
        value: f32,
    },
    #[error("invalid engine config: {0}")]
    InvalidEngineConfig(String),
    #[error("cannot {action} while in {phase:?}")]
    ActionNotAllowed {
        action: &'static str,
        phase: PhaseKind,
    },
}

/// Failures of the key-value persistence collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
