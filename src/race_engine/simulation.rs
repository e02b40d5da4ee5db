//! Simulation - Phase state machine and tick driver
//!
//! `RaceStateMachine` owns the current phase, the player's selection, the
//! input tracker and the persistence collaborator. The only clock in the
//! system lives inside the phase that needs it, so leaving a phase stops
//! its clock.

use std::time::Instant;
use serde::{Deserialize, Serialize};
use crate::race_engine::catalog::{Catalog, TrackProfile, VehicleProfile};
use crate::race_engine::clock::{ClockKind, TickClock};
use crate::race_engine::error::RaceError;
use crate::race_engine::events::{Notification, RejectReason, SelectionKind};
use crate::race_engine::input::{Control, InputSnapshot, InputTracker};
use crate::race_engine::opponents::OpponentState;
use crate::race_engine::persistence::{KeyValueStore, ResultRecorder};
use crate::race_engine::player::{KinematicState, RaceEvent};
use crate::race_engine::race::{validate_selection, EngineConfig, RaceConfig, RaceResult, RaceSession};

/// Phase tag, for snapshots and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseKind {
    Menu,
    CarSelect,
    TrackSelect,
    Countdown,
    Racing,
    Finished,
}

/// Current phase together with the data only that phase owns
#[derive(Debug)]
pub enum RacePhase {
    Menu,
    CarSelect,
    TrackSelect,
    Countdown {
        remaining: u8,
        clock: TickClock,
    },
    Racing {
        session: Box<RaceSession>,
        clock: TickClock,
    },
    Finished {
        result: RaceResult,
        hold_remaining: u8,
        clock: TickClock,
    },
}

impl RacePhase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            RacePhase::Menu => PhaseKind::Menu,
            RacePhase::CarSelect => PhaseKind::CarSelect,
            RacePhase::TrackSelect => PhaseKind::TrackSelect,
            RacePhase::Countdown { .. } => PhaseKind::Countdown,
            RacePhase::Racing { .. } => PhaseKind::Racing,
            RacePhase::Finished { .. } => PhaseKind::Finished,
        }
    }

    fn clock_mut(&mut self) -> Option<&mut TickClock> {
        match self {
            RacePhase::Countdown { clock, .. }
            | RacePhase::Racing { clock, .. }
            | RacePhase::Finished { clock, .. } => Some(clock),
            _ => None,
        }
    }

    fn clock(&self) -> Option<&TickClock> {
        match self {
            RacePhase::Countdown { clock, .. }
            | RacePhase::Racing { clock, .. }
            | RacePhase::Finished { clock, .. } => Some(clock),
            _ => None,
        }
    }
}

/// Read-only view handed to the renderer every frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub phase: PhaseKind,
    pub countdown: Option<u8>,
    pub player: Option<KinematicState>,
    pub opponents: Vec<OpponentState>,
    pub vehicle: VehicleProfile,
    pub track: TrackProfile,
    pub input: InputSnapshot,
    /// Result on display while Finished
    pub result: Option<RaceResult>,
}

/// Engine statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub tick_rate: f32,
    pub avg_tick_time_ms: f32,
    pub race_ticks: u64,
    pub phase: PhaseKind,
    pub active_clock: Option<ClockKind>,
}

/// What a tick asked the machine to do once the phase borrow is released
enum Transition {
    Stay,
    StartRacing,
    Finish(RaceResult),
    ToMenu,
}

/// Top-level race controller
pub struct RaceStateMachine {
    phase: RacePhase,
    catalog: Catalog,
    config: EngineConfig,
    vehicle: VehicleProfile,
    track: TrackProfile,
    input: InputTracker,
    recorder: ResultRecorder,
    last_result: Option<RaceResult>,
    outbox: Vec<Notification>,
    /// Last wall-clock tick timestamp
    last_tick: Instant,
    /// Recent tick processing times for averaging
    tick_times: Vec<f32>,
    race_ticks: u64,
}

impl RaceStateMachine {
    /// Built-in catalog and default tuning
    pub fn new(store: Box<dyn KeyValueStore>) -> Result<Self, RaceError> {
        Self::with_catalog(Catalog::default(), EngineConfig::default(), store)
    }

    /// Restores the saved selection and last result when the store allows it
    pub fn with_catalog(
        catalog: Catalog,
        config: EngineConfig,
        store: Box<dyn KeyValueStore>,
    ) -> Result<Self, RaceError> {
        config.validate()?;
        let recorder = ResultRecorder::new(store);

        let saved = match recorder.load_config() {
            Ok(saved) => saved,
            Err(e) => {
                log::warn!("Could not load saved race config, using defaults: {}", e);
                None
            }
        };
        let (vehicle, track) = Self::initial_selection(&catalog, saved.as_ref())?;

        let last_result = match recorder.load() {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Could not load last race result: {}", e);
                None
            }
        };

        log::info!("Race engine ready with {} on {}", vehicle.name, track.name);

        Ok(Self {
            phase: RacePhase::Menu,
            catalog,
            config,
            vehicle,
            track,
            input: InputTracker::new(),
            recorder,
            last_result,
            outbox: Vec::new(),
            last_tick: Instant::now(),
            tick_times: Vec::with_capacity(60),
            race_ticks: 0,
        })
    }

    fn initial_selection(
        catalog: &Catalog,
        saved: Option<&RaceConfig>,
    ) -> Result<(VehicleProfile, TrackProfile), RaceError> {
        let saved_vehicle = saved
            .and_then(|c| catalog.vehicle(&c.vehicle_id))
            .filter(|v| v.unlocked);
        let saved_track = saved
            .and_then(|c| catalog.track(&c.track_id))
            .filter(|t| t.unlocked);

        let vehicle = saved_vehicle
            .or_else(|| catalog.default_vehicle())
            .ok_or(RaceError::EmptyCatalog)?;
        let track = saved_track
            .or_else(|| catalog.default_track())
            .ok_or(RaceError::EmptyCatalog)?;

        Ok((vehicle.clone(), track.clone()))
    }

    // ---------------------------------------------------------------------
    // Input
    // ---------------------------------------------------------------------

    pub fn press(&mut self, control: Control) {
        self.input.press(control);
    }

    pub fn release(&mut self, control: Control) {
        self.input.release(control);
    }

    /// Raw key event; unbound keys are ignored
    pub fn handle_key(&mut self, key: &str, pressed: bool) -> bool {
        self.input.handle_key(key, pressed)
    }

    // ---------------------------------------------------------------------
    // User actions
    // ---------------------------------------------------------------------

    pub fn open_car_select(&mut self) -> Result<(), RaceError> {
        self.require(&[PhaseKind::Menu, PhaseKind::TrackSelect], "open car select")?;
        self.enter(RacePhase::CarSelect);
        Ok(())
    }

    pub fn open_track_select(&mut self) -> Result<(), RaceError> {
        self.require(&[PhaseKind::Menu, PhaseKind::CarSelect], "open track select")?;
        self.enter(RacePhase::TrackSelect);
        Ok(())
    }

    /// CarSelect goes back to Menu, TrackSelect back to CarSelect
    pub fn back(&mut self) -> Result<(), RaceError> {
        match self.phase.kind() {
            PhaseKind::CarSelect => self.enter(RacePhase::Menu),
            PhaseKind::TrackSelect => self.enter(RacePhase::CarSelect),
            phase => {
                return Err(RaceError::ActionNotAllowed {
                    action: "go back",
                    phase,
                })
            }
        }
        Ok(())
    }

    pub fn select_vehicle(&mut self, id: &str) -> Result<(), RaceError> {
        self.require(&[PhaseKind::CarSelect], "select a vehicle")?;

        let vehicle = match self.catalog.vehicle(id) {
            Some(v) if v.unlocked => v.clone(),
            Some(_) => {
                self.reject(SelectionKind::Vehicle, id, RejectReason::Locked);
                return Err(RaceError::LockedVehicle(id.to_string()));
            }
            None => {
                self.reject(SelectionKind::Vehicle, id, RejectReason::Unknown);
                return Err(RaceError::UnknownVehicle(id.to_string()));
            }
        };

        log::info!("Vehicle selected: {}", vehicle.name);
        self.notify(Notification::VehicleSelected {
            id: vehicle.id.clone(),
            name: vehicle.name.clone(),
        });
        self.vehicle = vehicle;
        self.persist_selection();
        Ok(())
    }

    pub fn select_track(&mut self, id: &str) -> Result<(), RaceError> {
        self.require(&[PhaseKind::TrackSelect], "select a track")?;

        let track = match self.catalog.track(id) {
            Some(t) if t.unlocked => t.clone(),
            Some(_) => {
                self.reject(SelectionKind::Track, id, RejectReason::Locked);
                return Err(RaceError::LockedTrack(id.to_string()));
            }
            None => {
                self.reject(SelectionKind::Track, id, RejectReason::Unknown);
                return Err(RaceError::UnknownTrack(id.to_string()));
            }
        };

        log::info!("Track selected: {}", track.name);
        self.notify(Notification::TrackSelected {
            id: track.id.clone(),
            name: track.name.clone(),
        });
        self.track = track;
        self.persist_selection();
        Ok(())
    }

    /// Validate the selection and begin the countdown
    pub fn start_race(&mut self) -> Result<(), RaceError> {
        self.require(
            &[PhaseKind::Menu, PhaseKind::TrackSelect, PhaseKind::Finished],
            "start a race",
        )?;

        if let Err(e) = validate_selection(&self.vehicle, &self.track) {
            log::warn!("Refusing to start race: {}", e);
            self.notify(Notification::StartRejected {
                message: e.to_string(),
            });
            return Err(e);
        }

        log::info!(
            "Countdown started: {} on {} ({} laps)",
            self.vehicle.name,
            self.track.name,
            self.track.lap_count
        );
        self.enter(RacePhase::Countdown {
            remaining: self.config.countdown_ticks.max(1),
            clock: TickClock::new(ClockKind::Countdown, self.config.countdown_period),
        });
        self.last_tick = Instant::now();
        Ok(())
    }

    /// Leave the countdown, a running race or the results screen for the menu.
    ///
    /// Exiting a running race discards it without recording a result.
    pub fn exit_race(&mut self) -> Result<(), RaceError> {
        self.require(
            &[PhaseKind::Countdown, PhaseKind::Racing, PhaseKind::Finished],
            "exit the race",
        )?;

        if let RacePhase::Racing { session, .. } = &self.phase {
            log::info!(
                "Race abandoned on lap {} after {:.1}s",
                session.player.current_lap,
                session.player.elapsed_time
            );
        }
        self.return_to_menu();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Ticking
    // ---------------------------------------------------------------------

    /// Advance by wall-clock time since the previous call and return a snapshot
    pub fn tick(&mut self) -> GameSnapshot {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;

        let tick_start = Instant::now();
        self.advance(delta);

        let tick_time = tick_start.elapsed().as_secs_f32() * 1000.0;
        self.tick_times.push(tick_time);
        if self.tick_times.len() > 60 {
            self.tick_times.remove(0);
        }

        self.snapshot()
    }

    /// Feed `delta` time-units to the active clock and run the ticks that fall due.
    ///
    /// Stops early when a tick changes phase; the next phase's clock starts
    /// from zero. Returns the number of ticks run.
    pub fn advance(&mut self, delta: f32) -> u32 {
        let max_ticks = self.config.max_catch_up_ticks;
        let due = match self.phase.clock_mut() {
            Some(clock) => clock.accumulate(delta, max_ticks),
            None => return 0,
        };

        let kind = self.phase.kind();
        let mut ran = 0;
        for _ in 0..due {
            self.step();
            ran += 1;
            if self.phase.kind() != kind {
                break;
            }
        }
        ran
    }

    /// Fire exactly one tick of the active clock. Returns false when no clock runs.
    pub fn step(&mut self) -> bool {
        let input = self.input.snapshot();

        let transition = match &mut self.phase {
            RacePhase::Countdown { remaining, clock } => {
                clock.fire();
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    Transition::StartRacing
                } else {
                    Transition::Stay
                }
            }
            RacePhase::Racing { session, clock } => {
                let tick = clock.fire();
                self.race_ticks += 1;
                match session.step(&input, tick) {
                    Some(RaceEvent::LapCompleted { lap, lap_time }) => {
                        log::debug!("Lap {} started, previous lap {:.1}s", lap, lap_time);
                        self.outbox.push(Notification::LapCompleted { lap, lap_time });
                        Transition::Stay
                    }
                    Some(RaceEvent::RaceCompleted { .. }) => Transition::Finish(session.result()),
                    None => Transition::Stay,
                }
            }
            RacePhase::Finished {
                hold_remaining,
                clock,
                ..
            } => {
                clock.fire();
                *hold_remaining = hold_remaining.saturating_sub(1);
                if *hold_remaining == 0 {
                    Transition::ToMenu
                } else {
                    Transition::Stay
                }
            }
            RacePhase::Menu | RacePhase::CarSelect | RacePhase::TrackSelect => return false,
        };

        match transition {
            Transition::Stay => {}
            Transition::StartRacing => self.begin_racing(),
            Transition::Finish(result) => self.finish_race(result),
            Transition::ToMenu => self.return_to_menu(),
        }
        true
    }

    fn begin_racing(&mut self) {
        let session = RaceSession::new(self.vehicle.clone(), self.track.clone(), &self.config);
        self.enter(RacePhase::Racing {
            session: Box::new(session),
            clock: TickClock::new(ClockKind::Race, self.config.tick_length),
        });
        self.notify(Notification::RaceStarted);
    }

    fn finish_race(&mut self, result: RaceResult) {
        log::info!(
            "Race completed: {} on {} in {:.1}s",
            result.vehicle_name,
            result.track_name,
            result.elapsed_time
        );

        if let Err(e) = self.recorder.record(&result) {
            log::warn!("Could not persist race result, keeping it in memory: {}", e);
        }
        self.last_result = Some(result.clone());
        self.notify(Notification::RaceCompleted {
            elapsed_time: result.elapsed_time,
        });

        self.enter(RacePhase::Finished {
            result,
            hold_remaining: self.config.finish_hold_ticks.max(1),
            clock: TickClock::new(ClockKind::FinishHold, self.config.finish_hold_period),
        });
    }

    fn return_to_menu(&mut self) {
        self.enter(RacePhase::Menu);
        self.notify(Notification::ReturnedToMenu);
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn snapshot(&self) -> GameSnapshot {
        let (countdown, player, opponents, result) = match &self.phase {
            RacePhase::Countdown { remaining, .. } => (Some(*remaining), None, Vec::new(), None),
            RacePhase::Racing { session, .. } => (
                None,
                Some(session.player.clone()),
                session.opponents.opponents.clone(),
                None,
            ),
            RacePhase::Finished { result, .. } => (None, None, Vec::new(), Some(result.clone())),
            _ => (None, None, Vec::new(), None),
        };

        GameSnapshot {
            phase: self.phase.kind(),
            countdown,
            player,
            opponents,
            vehicle: self.vehicle.clone(),
            track: self.track.clone(),
            input: self.input.snapshot(),
            result,
        }
    }

    pub fn phase(&self) -> &RacePhase {
        &self.phase
    }

    pub fn phase_kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selected_vehicle(&self) -> &VehicleProfile {
        &self.vehicle
    }

    pub fn selected_track(&self) -> &TrackProfile {
        &self.track
    }

    /// Most recent result, even if it could not be persisted
    pub fn last_result(&self) -> Option<&RaceResult> {
        self.last_result.as_ref()
    }

    pub fn recorder(&self) -> &ResultRecorder {
        &self.recorder
    }

    /// Take all queued notifications
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    pub fn get_stats(&self) -> EngineStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        EngineStats {
            tick_rate: 1.0 / self.config.tick_length,
            avg_tick_time_ms: avg_tick_time,
            race_ticks: self.race_ticks,
            phase: self.phase.kind(),
            active_clock: self.phase.clock().map(TickClock::kind),
        }
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn require(&self, allowed: &[PhaseKind], action: &'static str) -> Result<(), RaceError> {
        let phase = self.phase.kind();
        if allowed.contains(&phase) {
            Ok(())
        } else {
            Err(RaceError::ActionNotAllowed { action, phase })
        }
    }

    fn enter(&mut self, next: RacePhase) {
        log::info!("Phase {:?} -> {:?}", self.phase.kind(), next.kind());
        self.phase = next;
    }

    fn reject(&mut self, kind: SelectionKind, id: &str, reason: RejectReason) {
        log::warn!("Rejected {:?} selection '{}': {:?}", kind, id, reason);
        self.notify(Notification::SelectionRejected {
            kind,
            id: id.to_string(),
            reason,
        });
    }

    fn notify(&mut self, notification: Notification) {
        log::debug!("Notify: {}", notification.message());
        self.outbox.push(notification);
    }

    fn persist_selection(&mut self) {
        let config = RaceConfig {
            vehicle_id: self.vehicle.id.clone(),
            track_id: self.track.id.clone(),
        };
        if let Err(e) = self.recorder.save_config(&config) {
            log::warn!("Could not persist race config: {}", e);
        }
    }
}
