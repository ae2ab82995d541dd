// Bench65 - 6502 Firmware Simulation Platform
// Copyright (C) 2026 The Bench65 Team
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Console smoke test: prints one formatted timestamp through the host
//! console window and pauses the clock. Useful as a quick end-to-end check
//! of the console registers without assembling a 6502 image.

use anyhow::Result;
use bench65_core::bus::SystemBus;
use bench65_core::peripherals::console::{
    CONSOLE_BASE, PAUSE_SENTINEL, REG_CHAR, REG_CLOCK, REG_ENABLE,
};
use bench65_core::{Bus, SimResult};

mod calendar;
use calendar::CalendarTime;

const CONSOLE_ENABLE_ADDR: u16 = CONSOLE_BASE + REG_ENABLE; // $600A
const CONSOLE_DATA_ADDR: u16 = CONSOLE_BASE + REG_CHAR; // $6001
const CLOCK_CONTROL_ADDR: u16 = CONSOLE_BASE + REG_CLOCK; // $6005

/// Marker written to the enable register; any non-zero value works.
const ENABLE_MARKER: u8 = 69;

const TIMESTAMP_PATTERN: &str = "%x - %I:%M%p";

/// Streams one line to the console: the activation marker, then one byte
/// per character, then the terminating newline.
fn print_line(bus: &mut dyn Bus, text: &str) -> SimResult<()> {
    bus.write_u8(CONSOLE_ENABLE_ADDR, ENABLE_MARKER)?;
    for byte in text.bytes() {
        bus.write_u8(CONSOLE_DATA_ADDR, byte)?;
    }
    bus.write_u8(CONSOLE_DATA_ADDR, b'\n')
}

/// Signals the emulator to pause. The last observable write of the run.
fn pause_clock(bus: &mut dyn Bus) -> SimResult<()> {
    bus.write_u8(CLOCK_CONTROL_ADDR, PAUSE_SENTINEL)
}

fn fixed_time_record() -> CalendarTime {
    CalendarTime {
        seconds: 4,
        minutes: 5,
        hours: 14,
        day_of_month: 3,
        month: 7,
        years_since_1900: 120,
        weekday: 4,
        day_of_year: 150,
        daylight_saving: false,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    let mut bus = SystemBus::new();

    let time = fixed_time_record();
    tracing::debug!(?time, "formatting fixed calendar record");
    let stamp = time.format(TIMESTAMP_PATTERN)?;

    print_line(&mut bus, &stamp)?;
    pause_clock(&mut bus)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench65_core::peripherals::console::{transcript, ConsoleEvent};
    use std::sync::{Arc, Mutex};

    fn captured_bus() -> (SystemBus, Arc<Mutex<Vec<ConsoleEvent>>>) {
        let mut bus = SystemBus::new();
        let sink = Arc::new(Mutex::new(Vec::new()));
        bus.attach_console_sink(sink.clone(), false);
        (bus, sink)
    }

    #[test]
    fn test_print_line_write_sequence() {
        let (mut bus, sink) = captured_bus();
        print_line(&mut bus, "Hi").unwrap();

        let events = sink.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                ConsoleEvent::Enabled(ENABLE_MARKER),
                ConsoleEvent::Char(b'H'),
                ConsoleEvent::Char(b'i'),
                ConsoleEvent::Char(b'\n'),
            ]
        );
    }

    #[test]
    fn test_print_line_empty_input() {
        let (mut bus, sink) = captured_bus();
        print_line(&mut bus, "").unwrap();

        // Activation marker and the bare newline, nothing in between
        let events = sink.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                ConsoleEvent::Enabled(ENABLE_MARKER),
                ConsoleEvent::Char(b'\n'),
            ]
        );
    }

    #[test]
    fn test_smoke_run_end_to_end() {
        let (mut bus, sink) = captured_bus();

        let stamp = fixed_time_record().format(TIMESTAMP_PATTERN).unwrap();
        print_line(&mut bus, &stamp).unwrap();
        pause_clock(&mut bus).unwrap();

        let events = sink.lock().unwrap().clone();
        assert_eq!(transcript(&events), "08/03/20 - 02:05PM\n");
        // The pause signal is the final effect; nothing is recorded after it
        assert!(bus.clock.is_paused());
        assert_eq!(
            events.last(),
            Some(&ConsoleEvent::Char(b'\n')),
            "no console traffic may follow the newline"
        );
    }
}
