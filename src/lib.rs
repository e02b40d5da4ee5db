//! Arcade Racer - Tauri Backend
//!
//! The race engine is a plain library; with the `desktop` feature the crate
//! also exposes it to the frontend through Tauri commands.

pub mod race_engine;

#[cfg(feature = "desktop")]
mod commands {
    use crate::race_engine::{
        Catalog, Control, EngineStats, GameSnapshot, Notification, RaceResult, RaceStateMachine,
    };
    use std::sync::Mutex;
    use tauri::State;

    /// Mark a control as held
    #[tauri::command]
    pub fn press_control(engine: State<'_, Mutex<RaceStateMachine>>, control: Control) -> Result<(), String> {
        let mut engine = engine.lock().map_err(|e| e.to_string())?;
        engine.press(control);
        Ok(())
    }

    /// Mark a control as released
    #[tauri::command]
    pub fn release_control(engine: State<'_, Mutex<RaceStateMachine>>, control: Control) -> Result<(), String> {
        let mut engine = engine.lock().map_err(|e| e.to_string())?;
        engine.release(control);
        Ok(())
    }

    /// Raw keyboard event; returns whether the key is bound
    #[tauri::command]
    pub fn key_event(engine: State<'_, Mutex<RaceStateMachine>>, key: String, pressed: bool) -> Result<bool, String> {
        let mut engine = engine.lock().map_err(|e| e.to_string())?;
        Ok(engine.handle_key(&key, pressed))
    }

    #[tauri::command]
    pub fn open_car_select(engine: State<'_, Mutex<RaceStateMachine>>) -> Result<(), String> {
        let mut engine = engine.lock().map_err(|e| e.to_string())?;
        engine.open_car_select().map_err(|e| e.to_string())
    }

    #[tauri::command]
    pub fn open_track_select(engine: State<'_, Mutex<RaceStateMachine>>) -> Result<(), String> {
        let mut engine = engine.lock().map_err(|e| e.to_string())?;
        engine.open_track_select().map_err(|e| e.to_string())
    }

    #[tauri::command]
    pub fn go_back(engine: State<'_, Mutex<RaceStateMachine>>) -> Result<(), String> {
        let mut engine = engine.lock().map_err(|e| e.to_string())?;
        engine.back().map_err(|e| e.to_string())
    }

    #[tauri::command]
    pub fn select_vehicle(engine: State<'_, Mutex<RaceStateMachine>>, id: String) -> Result<(), String> {
        let mut engine = engine.lock().map_err(|e| e.to_string())?;
        engine.select_vehicle(&id).map_err(|e| e.to_string())
    }

    #[tauri::command]
    pub fn select_track(engine: State<'_, Mutex<RaceStateMachine>>, id: String) -> Result<(), String> {
        let mut engine = engine.lock().map_err(|e| e.to_string())?;
        engine.select_track(&id).map_err(|e| e.to_string())
    }

    /// Start the countdown with the current selection
    #[tauri::command]
    pub fn start_race(engine: State<'_, Mutex<RaceStateMachine>>) -> Result<(), String> {
        let mut engine = engine.lock().map_err(|e| e.to_string())?;
        engine.start_race().map_err(|e| e.to_string())?;
        log::info!("Race countdown started");
        Ok(())
    }

    /// Abandon the race and return to the menu
    #[tauri::command]
    pub fn exit_race(engine: State<'_, Mutex<RaceStateMachine>>) -> Result<(), String> {
        let mut engine = engine.lock().map_err(|e| e.to_string())?;
        engine.exit_race().map_err(|e| e.to_string())
    }

    /// Run whatever ticks are due and return the current state
    #[tauri::command]
    pub fn tick(engine: State<'_, Mutex<RaceStateMachine>>) -> Result<GameSnapshot, String> {
        let mut engine = engine.lock().map_err(|e| e.to_string())?;
        Ok(engine.tick())
    }

    /// Get current snapshot without advancing the simulation
    #[tauri::command]
    pub fn get_snapshot(engine: State<'_, Mutex<RaceStateMachine>>) -> Result<GameSnapshot, String> {
        let engine = engine.lock().map_err(|e| e.to_string())?;
        Ok(engine.snapshot())
    }

    #[tauri::command]
    pub fn get_catalog(engine: State<'_, Mutex<RaceStateMachine>>) -> Result<Catalog, String> {
        let engine = engine.lock().map_err(|e| e.to_string())?;
        Ok(engine.catalog().clone())
    }

    #[tauri::command]
    pub fn get_last_result(engine: State<'_, Mutex<RaceStateMachine>>) -> Result<Option<RaceResult>, String> {
        let engine = engine.lock().map_err(|e| e.to_string())?;
        Ok(engine.last_result().cloned())
    }

    /// Hand queued notifications to the frontend
    #[tauri::command]
    pub fn drain_notifications(engine: State<'_, Mutex<RaceStateMachine>>) -> Result<Vec<Notification>, String> {
        let mut engine = engine.lock().map_err(|e| e.to_string())?;
        Ok(engine.drain_notifications())
    }

    #[tauri::command]
    pub fn get_stats(engine: State<'_, Mutex<RaceStateMachine>>) -> Result<EngineStats, String> {
        let engine = engine.lock().map_err(|e| e.to_string())?;
        Ok(engine.get_stats())
    }
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use crate::race_engine::{JsonFileStore, KeyValueStore, MemoryStore, RaceStateMachine};
    use std::sync::Mutex;
    use tauri::Manager;

    tauri::Builder::default()
        .setup(|app| {
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            let store: Box<dyn KeyValueStore> = match app.path().app_data_dir() {
                Ok(dir) => Box::new(JsonFileStore::new(dir)),
                Err(e) => {
                    log::warn!("No app data dir, results will not survive a restart: {}", e);
                    Box::new(MemoryStore::new())
                }
            };
            let engine = RaceStateMachine::new(store)?;
            app.manage(Mutex::new(engine));

            log::info!("Arcade racer engine initialized");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::press_control,
            commands::release_control,
            commands::key_event,
            commands::open_car_select,
            commands::open_track_select,
            commands::go_back,
            commands::select_vehicle,
            commands::select_track,
            commands::start_race,
            commands::exit_race,
            commands::tick,
            commands::get_snapshot,
            commands::get_catalog,
            commands::get_last_result,
            commands::drain_notifications,
            commands::get_stats,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
