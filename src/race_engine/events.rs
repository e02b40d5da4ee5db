//! Notifications - Fire-and-forget messages for the presentation layer
//!
//! The state machine queues these as things happen; the shell drains the
//! queue and shows them however it likes. Nothing waits for acknowledgment.

use serde::{Deserialize, Serialize};

/// Why a selection was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    Locked,
    Unknown,
}

/// What kind of catalog entry a selection targeted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionKind {
    Vehicle,
    Track,
}

/// A discrete event surfaced to the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    VehicleSelected { id: String, name: String },
    TrackSelected { id: String, name: String },
    SelectionRejected {
        kind: SelectionKind,
        id: String,
        reason: RejectReason,
    },
    StartRejected { message: String },
    RaceStarted,
    /// `lap` is the lap just started, `lap_time` the one just finished.
    LapCompleted { lap: u32, lap_time: f32 },
    RaceCompleted { elapsed_time: f32 },
    ReturnedToMenu,
}

impl Notification {
    /// Short human-readable text, matching what the game used to toast
    pub fn message(&self) -> String {
        match self {
            Notification::VehicleSelected { name, .. } => format!("{} selected!", name),
            Notification::TrackSelected { name, .. } => format!("{} selected!", name),
            Notification::SelectionRejected {
                kind: SelectionKind::Vehicle,
                reason: RejectReason::Locked,
                ..
            } => "This car is locked! Complete more races to unlock it.".to_string(),
            Notification::SelectionRejected {
                kind: SelectionKind::Track,
                reason: RejectReason::Locked,
                ..
            } => "This track is locked! Complete previous tracks to unlock it.".to_string(),
            Notification::SelectionRejected { id, .. } => format!("Unknown selection '{}'", id),
            Notification::StartRejected { message } => message.clone(),
            Notification::RaceStarted => {
                "Race started! Use WASD or arrow keys to control.".to_string()
            }
            Notification::LapCompleted { lap, .. } => format!("Lap {} started!", lap),
            Notification::RaceCompleted { .. } => "Race completed!".to_string(),
            Notification::ReturnedToMenu => "Back to menu".to_string(),
        }
    }

    /// Whether the shell should present this as an error
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Notification::SelectionRejected { .. } | Notification::StartRejected { .. }
        )
    }
}
