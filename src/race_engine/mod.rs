//! Race Engine Module
//!
//! Tick-driven race core: input, player and AI kinematics, the phase state
//! machine and result persistence. Rendering lives in the frontend, which
//! only reads snapshots and forwards input and user actions.

pub mod catalog;
pub mod clock;
pub mod error;
pub mod events;
pub mod input;
pub mod opponents;
pub mod persistence;
pub mod player;
pub mod race;
pub mod simulation;

pub use catalog::{Catalog, Difficulty, TrackProfile, VehicleProfile};
pub use clock::{ClockKind, Tick, TickClock};
pub use error::{RaceError, StoreError};
pub use events::{Notification, RejectReason, SelectionKind};
pub use input::{Control, InputSnapshot, InputTracker};
pub use opponents::{AIOpponentSimulator, OpponentField, OpponentState};
pub use persistence::{JsonFileStore, KeyValueStore, MemoryStore, ResultRecorder};
pub use player::{KinematicState, RaceEvent, RaceSimulator, TrackGeometry};
pub use race::{EngineConfig, RaceConfig, RaceResult, RaceSession};
pub use simulation::{EngineStats, GameSnapshot, PhaseKind, RacePhase, RaceStateMachine};
