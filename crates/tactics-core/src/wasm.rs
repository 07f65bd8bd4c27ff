//! WebAssembly bindings for the tactics engine.
//!
//! The browser client keeps a mirror of the server's game: it loads the
//! snapshot the server pushes, validates and applies its own actions
//! optimistically, and replays actions relayed from other players.

use wasm_bindgen::prelude::*;

use crate::actions::Action;
use crate::game::{GameSnapshot, GameState, StateUpdate};
use crate::hex::Viewport;
use crate::unit::Seat;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, err))
}

/// WASM-exposed client game mirror
#[wasm_bindgen]
pub struct WasmGame {
    state: GameState,
    seat: Option<Seat>,
}

#[wasm_bindgen]
impl WasmGame {
    /// Build a mirror from a full snapshot JSON
    #[wasm_bindgen(constructor)]
    pub fn new(snapshot_json: &str) -> Result<WasmGame, JsValue> {
        let snapshot: GameSnapshot =
            serde_json::from_str(snapshot_json).map_err(|e| js_error("Invalid snapshot JSON", e))?;
        let state = GameState::from_snapshot(snapshot).map_err(|e| js_error("Load failed", e))?;
        Ok(WasmGame { state, seat: None })
    }

    /// Replace the mirror with a full snapshot pushed by the server
    #[wasm_bindgen(js_name = load)]
    pub fn load(&mut self, snapshot_json: &str) -> Result<(), JsValue> {
        let snapshot: GameSnapshot =
            serde_json::from_str(snapshot_json).map_err(|e| js_error("Invalid snapshot JSON", e))?;
        self.state.load(snapshot).map_err(|e| js_error("Load failed", e))
    }

    /// Merge a partial update
    #[wasm_bindgen(js_name = applyUpdate)]
    pub fn apply_update(&mut self, update_json: &str) -> Result<(), JsValue> {
        let update: StateUpdate =
            serde_json::from_str(update_json).map_err(|e| js_error("Invalid update JSON", e))?;
        self.state
            .apply_update(update)
            .map_err(|e| js_error("Update failed", e))
    }

    /// Get the current game state as snapshot JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.state.dump()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Record which seat this client plays; `undefined` for spectators
    #[wasm_bindgen(js_name = setSeat)]
    pub fn set_seat(&mut self, seat: Option<Seat>) {
        self.seat = seat;
    }

    #[wasm_bindgen(js_name = getSeat)]
    pub fn get_seat(&self) -> Option<Seat> {
        self.seat
    }

    #[wasm_bindgen(js_name = getCurrentTurn)]
    pub fn get_current_turn(&self) -> Seat {
        self.state.current_turn()
    }

    /// Whether this client may perform the action JSON now
    #[wasm_bindgen(js_name = validAction)]
    pub fn valid_action(&self, action_json: &str) -> bool {
        match (self.seat, serde_json::from_str::<Action>(action_json)) {
            (Some(seat), Ok(action)) => self.state.valid_action(seat, &action),
            _ => false,
        }
    }

    /// Validate, apply, and record a local action; returns events JSON
    #[wasm_bindgen(js_name = perform)]
    pub fn perform(&mut self, action_json: &str) -> Result<String, JsValue> {
        let seat = self
            .seat
            .ok_or_else(|| JsValue::from_str("Not seated in this game"))?;
        let action: Action =
            serde_json::from_str(action_json).map_err(|e| js_error("Invalid action JSON", e))?;

        let events = self
            .state
            .perform(seat, action)
            .map_err(|e| js_error("Action failed", e))?;
        Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string()))
    }

    /// Apply a relayed action without validation; returns events JSON
    #[wasm_bindgen(js_name = doAction)]
    pub fn do_action(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: Action =
            serde_json::from_str(action_json).map_err(|e| js_error("Invalid action JSON", e))?;
        let events = self.state.do_action(&action);
        Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string()))
    }

    /// Apply a JSON array of relayed actions without validation
    #[wasm_bindgen(js_name = applyTurn)]
    pub fn apply_turn(&mut self, actions_json: &str) -> Result<String, JsValue> {
        let actions: Vec<Action> =
            serde_json::from_str(actions_json).map_err(|e| js_error("Invalid actions JSON", e))?;
        let events = self.state.apply_turn(&actions);
        Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string()))
    }

    /// Actions performed locally since the last clear, as JSON
    #[wasm_bindgen(js_name = getLocalTurn)]
    pub fn get_local_turn(&self) -> String {
        serde_json::to_string(self.state.local_turn()).unwrap_or_else(|_| "[]".to_string())
    }

    #[wasm_bindgen(js_name = clearTurn)]
    pub fn clear_turn(&mut self) {
        self.state.clear_turn();
    }

    /// Cell under a canvas position as `[q, r]`
    #[wasm_bindgen(js_name = pixelToHex)]
    pub fn pixel_to_hex(
        &self,
        px: f64,
        py: f64,
        origin_x: f64,
        origin_y: f64,
        offset_x: f64,
        offset_y: f64,
        scale: f64,
    ) -> Vec<i32> {
        let viewport = Viewport {
            origin_x,
            origin_y,
            offset_x,
            offset_y,
            scale,
        };
        let hex = self.state.map().pixel_to_hex(px, py, &viewport);
        vec![hex.q, hex.r]
    }

    /// Whether `(q, r)` is a legal board cell
    #[wasm_bindgen(js_name = onGrid)]
    pub fn on_grid(&self, q: i32, r: i32) -> bool {
        self.state.map().on_grid(crate::hex::HexCoord::new(q, r))
    }

    /// Lobby summary JSON
    #[wasm_bindgen(js_name = getSummary)]
    pub fn get_summary(&self) -> String {
        serde_json::to_string(&self.state.summary()).unwrap_or_else(|_| "{}".to_string())
    }
}
