// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Obstacle detections reported by the cane.
//!
//! The cane reports readings over serial in two formats: a combined line
//! such as `Distance: 42 cm  Zone: WARNING`, or a pair of field lines
//! `DIST,42` and `ZONE,WARNING`. This module parses both, keeps a short
//! recent history and replays recorded samples as a demo feed.

use anyhow::{anyhow, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::LazyLock;

/// Number of detections kept in [`DetectionHistory`].
pub const HISTORY_LIMIT: usize = 25;

/// Proximity zone of an obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Zone {
    Safe,
    Warning,
    Danger,
}

impl Zone {
    /// Case-insensitive parse of a zone name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SAFE" => Some(Zone::Safe),
            "WARNING" => Some(Zone::Warning),
            "DANGER" => Some(Zone::Danger),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Safe => "SAFE",
            Zone::Warning => "WARNING",
            Zone::Danger => "DANGER",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single distance reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaneSample {
    /// Distance to the obstacle in centimetres.
    pub distance: u32,
    pub zone: Zone,
}

impl CaneSample {
    pub fn new(distance: u32, zone: Zone) -> Self {
        Self { distance, zone }
    }

    /// Render as a serial log line.
    pub fn to_line(&self) -> String {
        format!("Distance: {} cm Zone: {}", self.distance, self.zone)
    }
}

/// Combined reading anywhere in a line. The zone must be a whole word.
static READING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Distance:\s*(\d+)\s*cm\s*Zone:\s*(SAFE|WARNING|DANGER)\b")
        .expect("READING_REGEX is a compile-time constant")
});

/// Parse one serial log line. Lines that are not readings yield `None`.
///
/// Distances too large for `u32` saturate at `u32::MAX`.
pub fn parse_line(line: &str) -> Option<CaneSample> {
    let caps = READING_REGEX.captures(line)?;
    let distance = caps[1].parse().unwrap_or(u32::MAX);
    let zone = Zone::parse(&caps[2])?;
    Some(CaneSample { distance, zone })
}

/// One half of a reading sent as a separate `DIST,` or `ZONE,` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialField {
    Distance(u32),
    Zone(Zone),
}

/// Parse a `DIST,<cm>` or `ZONE,<zone>` line.
pub fn parse_field(line: &str) -> Option<SerialField> {
    let (key, value) = line.trim().split_once(',')?;
    let value = value.trim();
    match key.trim() {
        "DIST" => value.parse().ok().map(SerialField::Distance),
        "ZONE" => Zone::parse(value).map(SerialField::Zone),
        _ => None,
    }
}

/// Last distance and zone seen as field lines.
///
/// A sample completes once both halves have arrived since the previous one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldPair {
    distance: Option<u32>,
    zone: Option<Zone>,
    fresh_distance: bool,
    fresh_zone: bool,
}

impl FieldPair {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a field. Returns the completed sample when the pair is whole.
    pub fn apply(&mut self, field: SerialField) -> Option<CaneSample> {
        match field {
            SerialField::Distance(distance) => {
                self.distance = Some(distance);
                self.fresh_distance = true;
            }
            SerialField::Zone(zone) => {
                self.zone = Some(zone);
                self.fresh_zone = true;
            }
        }

        if !(self.fresh_distance && self.fresh_zone) {
            return None;
        }
        self.fresh_distance = false;
        self.fresh_zone = false;
        Some(CaneSample::new(self.distance?, self.zone?))
    }

    pub fn last_distance(&self) -> Option<u32> {
        self.distance
    }

    pub fn last_zone(&self) -> Option<Zone> {
        self.zone
    }
}

/// Parse every reading in a serial log, skipping other lines.
pub fn parse_log(text: &str) -> Vec<CaneSample> {
    text.lines().filter_map(parse_line).collect()
}

/// Cyclic successor of `current`; 0 for an empty sequence.
pub fn next_index(current: usize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (current + 1) % len
}

/// Most recent detections, newest first.
#[derive(Debug, Clone, Default)]
pub struct DetectionHistory {
    entries: VecDeque<CaneSample>,
}

impl DetectionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: CaneSample) {
        self.entries.push_front(sample);
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn latest(&self) -> Option<&CaneSample> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CaneSample> {
        self.entries.iter()
    }
}

/// Replays recorded samples in a loop.
#[derive(Debug, Clone)]
pub struct DemoFeed {
    samples: Vec<CaneSample>,
    index: usize,
}

impl DemoFeed {
    pub fn new(samples: Vec<CaneSample>) -> Result<Self> {
        if samples.is_empty() {
            return Err(anyhow!("Demo feed needs at least one sample"));
        }
        Ok(Self { samples, index: 0 })
    }

    /// Feed built from a JSON array as written by `convert_serial_log`.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(serde_json::from_str(json)?)
    }

    /// A short built-in walk towards an obstacle and away again.
    pub fn builtin() -> Self {
        let samples = [
            (150, Zone::Safe),
            (120, Zone::Safe),
            (85, Zone::Warning),
            (60, Zone::Warning),
            (35, Zone::Danger),
            (20, Zone::Danger),
            (55, Zone::Warning),
            (110, Zone::Safe),
        ]
        .into_iter()
        .map(|(distance, zone)| CaneSample::new(distance, zone))
        .collect();
        Self { samples, index: 0 }
    }

    pub fn current(&self) -> CaneSample {
        self.samples[self.index]
    }

    /// Advance and return the new current sample.
    pub fn advance(&mut self) -> CaneSample {
        self.index = next_index(self.index, self.samples.len());
        self.current()
    }

    /// Return the current sample, then move past it.
    pub fn next_sample(&mut self) -> CaneSample {
        let sample = self.current();
        self.advance();
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line("Distance: 42 cm  Zone: WARNING"),
            Some(CaneSample::new(42, Zone::Warning))
        );
        assert_eq!(
            parse_line("[12:00:01] distance:7cm zone:danger"),
            Some(CaneSample::new(7, Zone::Danger))
        );
        assert_eq!(
            parse_line("Distance: 300 cm Zone: Safe\r"),
            Some(CaneSample::new(300, Zone::Safe))
        );
    }

    #[test]
    fn test_parse_line_rejects_noise() {
        assert_eq!(parse_line("Bluetooth Server started."), None);
        assert_eq!(parse_line("Distance: cm Zone: SAFE"), None);
        assert_eq!(parse_line("Distance: 10 m Zone: SAFE"), None);
        assert_eq!(parse_line("Distance: 10 cm Zone: UNKNOWN"), None);
        assert_eq!(parse_line("Distance: 10 cm Zone: SAFEST"), None);
    }

    #[test]
    fn test_parse_line_finds_reading_after_bad_prefix() {
        assert_eq!(
            parse_line("distance: n/a | Distance: 5 cm Zone: SAFE"),
            Some(CaneSample::new(5, Zone::Safe))
        );
    }

    #[test]
    fn test_parse_line_saturates_huge_distance() {
        assert_eq!(
            parse_line("Distance: 99999999999 cm Zone: SAFE"),
            Some(CaneSample::new(u32::MAX, Zone::Safe))
        );
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(parse_field("DIST,42"), Some(SerialField::Distance(42)));
        assert_eq!(parse_field("ZONE,DANGER\r"), Some(SerialField::Zone(Zone::Danger)));
        assert_eq!(parse_field(" DIST, 7 "), Some(SerialField::Distance(7)));
        assert_eq!(parse_field("DIST,far"), None);
        assert_eq!(parse_field("ZONE,UNKNOWN"), None);
        assert_eq!(parse_field("LED,ON"), None);
        assert_eq!(parse_field("Distance: 5 cm Zone: SAFE"), None);
    }

    #[test]
    fn test_field_pair_completes_once_both_halves_arrive() {
        let mut pair = FieldPair::new();

        assert_eq!(pair.apply(SerialField::Distance(40)), None);
        assert_eq!(pair.apply(SerialField::Distance(42)), None);
        assert_eq!(
            pair.apply(SerialField::Zone(Zone::Warning)),
            Some(CaneSample::new(42, Zone::Warning))
        );

        // A new zone alone does not reuse the consumed distance.
        assert_eq!(pair.apply(SerialField::Zone(Zone::Danger)), None);
        assert_eq!(pair.last_distance(), Some(42));
        assert_eq!(pair.last_zone(), Some(Zone::Danger));
        assert_eq!(
            pair.apply(SerialField::Distance(20)),
            Some(CaneSample::new(20, Zone::Danger))
        );
    }

    #[test]
    fn test_parse_log() {
        let log = "boot\nDistance: 100 cm Zone: SAFE\n\nDistance: 30 cm Zone: DANGER\r\nnoise\n";
        assert_eq!(
            parse_log(log),
            vec![
                CaneSample::new(100, Zone::Safe),
                CaneSample::new(30, Zone::Danger)
            ]
        );
    }

    #[test]
    fn test_line_roundtrips_through_parser() {
        let sample = CaneSample::new(64, Zone::Warning);
        assert_eq!(parse_line(&sample.to_line()), Some(sample));
    }

    #[test]
    fn test_sample_json_format() {
        let json = serde_json::to_string(&CaneSample::new(12, Zone::Danger)).unwrap();
        assert_eq!(json, r#"{"distance":12,"zone":"DANGER"}"#);
    }

    #[test]
    fn test_next_index() {
        assert_eq!(next_index(0, 0), 0);
        assert_eq!(next_index(0, 3), 1);
        assert_eq!(next_index(2, 3), 0);
    }

    #[test]
    fn test_history_capped_newest_first() {
        let mut history = DetectionHistory::new();
        for distance in 0..40 {
            history.push(CaneSample::new(distance, Zone::Safe));
        }

        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history.latest().map(|s| s.distance), Some(39));
        assert_eq!(history.iter().last().map(|s| s.distance), Some(15));
    }

    #[test]
    fn test_demo_feed_cycles() {
        let mut feed = DemoFeed::from_json(
            r#"[{"distance":10,"zone":"DANGER"},{"distance":90,"zone":"SAFE"}]"#,
        )
        .unwrap();

        assert_eq!(feed.current().distance, 10);
        assert_eq!(feed.advance().distance, 90);
        assert_eq!(feed.advance().distance, 10);
        assert!(DemoFeed::new(Vec::new()).is_err());
    }

    #[test]
    fn test_next_sample_starts_with_first_entry() {
        let mut feed = DemoFeed::builtin();

        assert_eq!(feed.next_sample(), CaneSample::new(150, Zone::Safe));
        assert_eq!(feed.next_sample(), CaneSample::new(120, Zone::Safe));
        assert_eq!(feed.current().distance, 85);
    }
}
