// Bench65 - 6502 Firmware Simulation Platform
// Copyright (C) 2026 The Bench65 Team
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The machine clock line. The run loop keeps stepping while the line is
/// running; a peripheral (the console's clock-control register) can pause it.
///
/// Clones share the same underlying line.
#[derive(Debug, Clone, Default)]
pub struct ClockLine {
    paused: Arc<AtomicBool>,
}

impl ClockLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
