// Bench65 - 6502 Firmware Simulation Platform
// Copyright (C) 2026 The Bench65 Team
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MemoryRange {
    pub base: u16,
    pub size: String, // e.g. "64KB"
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PeripheralConfig {
    pub id: String,
    pub r#type: String, // "console" is the only built-in type today
    pub base_address: u16,
    #[serde(default)]
    pub size: Option<String>,
}

/// Describes one simulated machine: CPU type, RAM window and the
/// memory-mapped peripherals layered on top of it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MachineDescriptor {
    pub name: String,
    pub cpu: String, // e.g. "mos6502"
    pub ram: MemoryRange,
    pub peripherals: Vec<PeripheralConfig>,
}

impl MachineDescriptor {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open machine descriptor at {:?}", path.as_ref()))?;
        serde_yaml::from_reader(f).context("Failed to parse Machine Descriptor")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestInputs {
    pub image: String,
    #[serde(default)]
    pub load_address: Option<u16>,
    #[serde(default)]
    pub machine: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestLimits {
    pub max_steps: u64,
    #[serde(default)]
    pub wall_time_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Paused,
    MaxSteps,
    WallTime,
    MemoryViolation,
    IllegalOpcode,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ConsoleContainsAssertion {
    pub console_contains: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ConsoleRegexAssertion {
    pub console_regex: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StopReasonAssertion {
    pub expected_stop_reason: StopReason,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum TestAssertion {
    ConsoleContains(ConsoleContainsAssertion),
    ConsoleRegex(ConsoleRegexAssertion),
    ExpectedStopReason(StopReasonAssertion),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestScript {
    pub schema_version: String,
    pub inputs: TestInputs,
    pub limits: TestLimits,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

impl TestScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open test script at {:?}", path.as_ref()))?;
        let script: Self =
            serde_yaml::from_reader(f).context("Failed to parse Test Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.inputs.image.trim().is_empty() {
            anyhow::bail!("Input 'image' path cannot be empty");
        }

        if self.limits.max_steps == 0 {
            anyhow::bail!("Limit 'max_steps' must be greater than zero");
        }

        Ok(())
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_script() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  image: "path/to/fw.prg"
  machine: "path/to/machine.yaml"
limits:
  max_steps: 1000
  wall_time_ms: 5000
assertions:
  - console_contains: "Hello"
  - expected_stop_reason: paused
"#;
        let script: TestScript = serde_yaml::from_str(yaml).unwrap();
        assert!(script.validate().is_ok());
        assert_eq!(script.inputs.image, "path/to/fw.prg");
        assert_eq!(script.limits.max_steps, 1000);
        assert_eq!(script.assertions.len(), 2);
    }

    #[test]
    fn test_load_address_is_optional() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  image: "fw.bin"
  load_address: 32768
limits:
  max_steps: 100
"#;
        let script: TestScript = serde_yaml::from_str(yaml).unwrap();
        assert!(script.validate().is_ok());
        assert_eq!(script.inputs.load_address, Some(0x8000));
    }

    #[test]
    fn test_invalid_version() {
        let yaml = r#"
schema_version: "2.0"
inputs:
  image: "fw.prg"
limits:
  max_steps: 100
"#;
        let script: TestScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("Unsupported schema_version"));
    }

    #[test]
    fn test_invalid_max_steps() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  image: "fw.prg"
limits:
  max_steps: 0
"#;
        let script: TestScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("max_steps"));
    }

    #[test]
    fn test_empty_image() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  image: ""
limits:
  max_steps: 100
"#;
        let script: TestScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("image"));
    }

    #[test]
    fn test_machine_descriptor() {
        let yaml = r#"
name: "breadboard-6502"
cpu: "mos6502"
ram:
  base: 0
  size: "64KiB"
peripherals:
  - id: "console0"
    type: "console"
    base_address: 24576
"#;
        let machine: MachineDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(machine.cpu, "mos6502");
        assert_eq!(machine.peripherals[0].base_address, 0x6000);
        assert!(machine.peripherals[0].size.is_none());
        assert_eq!(parse_size(&machine.ram.size).unwrap(), 65536);
    }
}
