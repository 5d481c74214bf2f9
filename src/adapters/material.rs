// src/adapters/material.rs - Filament accounting over sent G-code
use std::sync::{Mutex, MutexGuard};

use super::MaterialTracker;
use crate::gcode::SentCommand;

#[derive(Debug, Default)]
struct Extrusion {
    relative: bool,
    position: f64,
    /// Furthest E reached since the last position reset. Retract/prime cycles
    /// move below it and back without adding to `consumed`.
    high_water: f64,
    consumed: f64,
}

impl Extrusion {
    fn extrude_to(&mut self, target: f64) {
        self.position = target;
        if target > self.high_water {
            self.consumed += target - self.high_water;
            self.high_water = target;
        }
    }

    fn set_position(&mut self, e: f64) {
        self.position = e;
        self.high_water = e;
    }
}

/// Counts filament pushed through the extruder for the current job.
#[derive(Debug, Default)]
pub struct MaterialCounter {
    state: Mutex<Extrusion>,
}

impl MaterialCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Extrusion> {
        // The state is plain numbers; a panicked writer cannot leave it torn.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn on_move(&self, cmd: &SentCommand<'_>) {
        if let Some(e) = cmd.word('E') {
            let mut state = self.lock();
            let target = if state.relative { state.position + e } else { e };
            state.extrude_to(target);
        }
    }

    fn on_set_position(&self, cmd: &SentCommand<'_>) {
        let mut state = self.lock();
        match cmd.word('E') {
            Some(e) => state.set_position(e),
            // Bare G92 zeroes every axis
            None if cmd.params.is_empty() => state.set_position(0.0),
            None => {}
        }
    }
}

impl MaterialTracker for MaterialCounter {
    fn reset(&self) {
        *self.lock() = Extrusion::default();
    }

    fn total_consumed(&self) -> f64 {
        self.lock().consumed
    }

    fn observe_command(&self, line: &str) {
        let Some(cmd) = SentCommand::parse(line) else {
            return;
        };
        match cmd.code.as_str() {
            "G0" | "G1" => self.on_move(&cmd),
            "G92" => self.on_set_position(&cmd),
            "M82" => self.lock().relative = false,
            "M83" => self.lock().relative = true,
            _ => {}
        }
    }
}
