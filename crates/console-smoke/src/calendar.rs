// Bench65 - 6502 Firmware Simulation Platform
// Copyright (C) 2026 The Bench65 Team
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

/// Broken-down calendar time, field-for-field what a C `struct tm` carries.
#[derive(Debug, Clone, Copy)]
pub struct CalendarTime {
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub day_of_month: u8,
    /// 0-indexed, so 7 is August.
    pub month: u8,
    pub years_since_1900: u16,
    // Carried for struct-tm parity; the formatter derives these itself.
    #[allow(dead_code)]
    pub weekday: u8,
    #[allow(dead_code)]
    pub day_of_year: u16,
    #[allow(dead_code)]
    pub daylight_saving: bool,
}

impl CalendarTime {
    /// Formats the record with a strftime-style pattern.
    pub fn format(&self, pattern: &str) -> Result<String> {
        let date = NaiveDate::from_ymd_opt(
            1900 + self.years_since_1900 as i32,
            self.month as u32 + 1,
            self.day_of_month as u32,
        )
        .ok_or_else(|| anyhow!("Calendar record does not name a valid date"))?;

        let datetime = date
            .and_hms_opt(
                self.hours.into(),
                self.minutes.into(),
                self.seconds.into(),
            )
            .ok_or_else(|| anyhow!("Calendar record does not name a valid time of day"))?;

        Ok(datetime.format(pattern).to_string())
    }
}
