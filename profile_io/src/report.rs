use aie_types::TileLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterReading {
    pub loc: TileLocation,
    pub count: u32,
}

/// Counter values of one measurement, start endpoint first
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileReport {
    pub readings: Vec<CounterReading>,
}

impl ProfileReport {
    pub fn new(readings: Vec<CounterReading>) -> Self {
        Self { readings }
    }

    pub fn counts(&self) -> Vec<u32> {
        self.readings.iter().map(|r| r.count).collect()
    }
}

impl fmt::Display for ProfileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Profile results ===")?;
        for reading in &self.readings {
            writeln!(f, "\t{}: PerfCount={}", reading.loc, reading.count)?;
        }
        Ok(())
    }
}
