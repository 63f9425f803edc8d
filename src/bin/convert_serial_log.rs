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

//! Convert a cane serial monitor log into demo detection data.
//!
//! Usage: cargo run --bin convert_serial_log -- <input.txt> [output.json]

use anyhow::{anyhow, Result};
use smartcane_companion::detection::parse_log;
use std::env;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let input = args
        .get(1)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("Usage: convert_serial_log <input.txt> [output.json]"))?;
    let output = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data").join("demoCaneData.json"));

    let raw = std::fs::read_to_string(&input)?;
    let samples = parse_log(&raw);

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output, serde_json::to_string_pretty(&samples)?)?;

    println!("Wrote {} samples to {}", samples.len(), output.display());
    Ok(())
}
