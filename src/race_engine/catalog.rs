//! Catalog - Static vehicle and track descriptors
//!
//! Profiles are immutable once built. Selecting one copies it out of the
//! catalog; nothing ever mutates the catalog itself.

use serde::{Deserialize, Serialize};

/// Track difficulty rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A selectable car. Ratings are on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleProfile {
    pub id: String,
    pub name: String,
    pub top_speed: f32,
    pub acceleration: f32,
    pub handling: f32,
    pub unlocked: bool,
}

impl VehicleProfile {
    pub fn new(id: &str, name: &str, top_speed: f32, acceleration: f32, handling: f32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            top_speed,
            acceleration,
            handling,
            unlocked: true,
        }
    }

    pub fn locked(mut self) -> Self {
        self.unlocked = false;
        self
    }
}

/// A selectable circuit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackProfile {
    pub id: String,
    pub name: String,
    pub difficulty: Difficulty,
    pub lap_count: u32,
    pub unlocked: bool,
}

impl TrackProfile {
    pub fn new(id: &str, name: &str, difficulty: Difficulty, lap_count: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            difficulty,
            lap_count,
            unlocked: true,
        }
    }

    pub fn locked(mut self) -> Self {
        self.unlocked = false;
        self
    }
}

/// The full set of cars and tracks on offer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub vehicles: Vec<VehicleProfile>,
    pub tracks: Vec<TrackProfile>,
}

impl Catalog {
    pub fn new(vehicles: Vec<VehicleProfile>, tracks: Vec<TrackProfile>) -> Self {
        Self { vehicles, tracks }
    }

    pub fn vehicle(&self, id: &str) -> Option<&VehicleProfile> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn track(&self, id: &str) -> Option<&TrackProfile> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// First unlocked vehicle, or the first one at all if every car is locked
    pub fn default_vehicle(&self) -> Option<&VehicleProfile> {
        self.vehicles
            .iter()
            .find(|v| v.unlocked)
            .or_else(|| self.vehicles.first())
    }

    pub fn default_track(&self) -> Option<&TrackProfile> {
        self.tracks
            .iter()
            .find(|t| t.unlocked)
            .or_else(|| self.tracks.first())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            vehicles: vec![
                VehicleProfile::new("thunderbolt", "Thunderbolt X1", 95.0, 85.0, 90.0),
                VehicleProfile::new("viper", "Neon Viper", 88.0, 92.0, 85.0),
                VehicleProfile::new("phantom", "Phantom Ghost", 92.0, 78.0, 95.0).locked(),
            ],
            tracks: vec![
                TrackProfile::new("neon-city", "Neon City Circuit", Difficulty::Easy, 3),
                TrackProfile::new("mountain-pass", "Mountain Pass", Difficulty::Medium, 5),
                TrackProfile::new("space-station", "Space Station Omega", Difficulty::Hard, 7)
                    .locked(),
            ],
        }
    }
}
