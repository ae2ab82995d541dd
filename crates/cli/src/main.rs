// Bench65 - 6502 Firmware Simulation Platform
// Copyright (C) 2026 The Bench65 Team
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

use bench65_config::{StopReason, TestAssertion, TestLimits, TestScript};
use bench65_core::cpu::Mos6502;
use bench65_core::peripherals::console::{transcript, ConsoleEvent};
use bench65_core::Cpu;

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

fn parse_u16_addr(s: &str) -> Result<u16, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u16::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex address '{}': {}", s, e))
    } else {
        u16::from_str(trimmed).map_err(|e| format!("Invalid address '{}': {}", s, e))
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Bench65 Simulator",
    long_about = None,
    subcommand_negates_reqs = true
)]
struct Cli {
    /// Path to the program image (.prg/.c64 with a load-address header, or raw)
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Path to the machine descriptor (YAML)
    #[arg(short, long)]
    machine: Option<PathBuf>,

    /// Load address for raw images (e.g. 0x8000); overrides a .prg header
    #[arg(short, long, value_parser = parse_u16_addr)]
    load_address: Option<u16>,

    /// Enable instruction-level execution tracing
    #[arg(short, long, global = true)]
    trace: bool,

    /// Maximum number of steps to execute (default: 20000)
    #[arg(long, default_value = "20000")]
    max_steps: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deterministic, CI-friendly runner mode driven by a test script (YAML).
    Test(TestArgs),
}

#[derive(Parser, Debug)]
struct TestArgs {
    /// Path to the test script (YAML)
    #[arg(short = 'c', long)]
    script: PathBuf,

    /// Path to the machine descriptor (overrides the script)
    #[arg(short, long)]
    machine: Option<PathBuf>,

    /// Override max steps (takes precedence over script)
    #[arg(long)]
    max_steps: Option<u64>,

    /// Disable console stdout echo (still captured for assertions/artifacts)
    #[arg(long)]
    no_console_stdout: bool,

    /// Directory to write test artifacts (result.json, console.log)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TestResult {
    result_schema_version: String,
    status: String,
    steps_executed: u64,
    instructions: u64,
    stop_reason: StopReason,
    limits: TestLimits,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    assertions: Vec<AssertionResult>,
    image_hash: String,
    config: TestConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct AssertionResult {
    assertion: TestAssertion,
    passed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct TestConfig {
    image: PathBuf,
    machine: Option<PathBuf>,
    script: PathBuf,
}

struct LoopResult {
    stop_reason: StopReason,
    steps_executed: u64,
    stop_message: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    match cli.command {
        Some(Commands::Test(args)) => run_test(args),
        None => run_interactive(cli),
    }
}

fn build_bus(machine_path: Option<&Path>) -> anyhow::Result<bench65_core::bus::SystemBus> {
    if let Some(path) = machine_path {
        info!("Loading machine descriptor: {:?}", path);
        let descriptor = bench65_config::MachineDescriptor::from_file(path)?;
        bench65_core::bus::SystemBus::from_config(&descriptor)
    } else {
        info!("Using default machine configuration");
        Ok(bench65_core::bus::SystemBus::new())
    }
}

fn run_interactive(cli: Cli) -> ExitCode {
    info!("Starting Bench65 Simulator");

    let Some(image_path) = &cli.image else {
        error!("Missing required --image argument");
        return ExitCode::from(EXIT_CONFIG_ERROR);
    };

    let bus = match build_bus(cli.machine.as_deref()) {
        Ok(bus) => bus,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    info!("Loading image: {:?}", image_path);
    let program = match bench65_loader::load_image(image_path, cli.load_address) {
        Ok(program) => program,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    info!("Image Loaded Successfully!");
    info!("Entry Point: {:#06x}", program.entry_point);

    let metrics = Arc::new(bench65_core::metrics::PerformanceMetrics::new());
    let mut machine = bench65_core::Machine::new(Mos6502::new(), bus);
    machine.observers.push(metrics.clone());

    if let Err(e) = machine.load_program(&program) {
        error!("Failed to load program into memory: {}", e);
        return ExitCode::from(EXIT_RUNTIME_ERROR);
    }

    info!("Starting Simulation (MOS 6502)...");
    info!("Initial PC: {:#06x}", machine.cpu.pc);

    let limits = TestLimits {
        max_steps: cli.max_steps,
        wall_time_ms: None,
    };
    let result = run_simulation_loop(&mut machine, &limits);

    info!("Simulation loop finished ({:?}).", result.stop_reason);
    report_metrics(&machine.cpu, &metrics);
    ExitCode::from(EXIT_PASS)
}

fn run_simulation_loop<C: bench65_core::Cpu>(
    machine: &mut bench65_core::Machine<C>,
    limits: &TestLimits,
) -> LoopResult {
    let start = std::time::Instant::now();
    let mut stop_reason = StopReason::MaxSteps;
    let mut steps_executed: u64 = 0;
    let mut stop_message: Option<String> = None;

    info!("Running for up to {} steps...", limits.max_steps);
    for step in 0..limits.max_steps {
        if machine.bus.clock.is_paused() {
            info!("Clock paused at step {}", step);
            stop_reason = StopReason::Paused;
            break;
        }
        if let Some(wall_time_ms) = limits.wall_time_ms {
            if start.elapsed().as_millis() >= wall_time_ms as u128 {
                stop_reason = StopReason::WallTime;
                break;
            }
        }
        match machine.step() {
            Ok(_) => {
                steps_executed = step + 1;
            }
            Err(e) => {
                error!("Simulation error at step {}: {}", step, e);
                stop_reason = match e {
                    bench65_core::SimulationError::MemoryViolation(_) => {
                        StopReason::MemoryViolation
                    }
                    bench65_core::SimulationError::IllegalOpcode { .. } => {
                        StopReason::IllegalOpcode
                    }
                };
                stop_message = Some(e.to_string());
                break;
            }
        }
    }

    // The pause may have landed on the final step of the budget
    if stop_reason == StopReason::MaxSteps && machine.bus.clock.is_paused() {
        stop_reason = StopReason::Paused;
    }

    LoopResult {
        stop_reason,
        steps_executed,
        stop_message,
    }
}

fn report_metrics<C: Cpu>(cpu: &C, metrics: &bench65_core::metrics::PerformanceMetrics) {
    info!("Final PC: {:#06x}", cpu.get_pc());
    info!("Total Instructions: {}", metrics.get_instructions());
    info!("Average IPS: {:.2}", metrics.get_ips());
}

/// Resolve a script-relative path: absolute paths pass through, relative
/// ones are taken from the script's directory.
fn resolve_script_path(script: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        return path;
    }
    script
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(path)
}

fn run_test(args: TestArgs) -> ExitCode {
    let script = match TestScript::from_file(&args.script) {
        Ok(s) => s,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let image_path = resolve_script_path(&args.script, &script.inputs.image);
    let machine_path = args.machine.clone().or_else(|| {
        script
            .inputs
            .machine
            .as_ref()
            .map(|m| resolve_script_path(&args.script, m))
    });

    let mut limits = script.limits.clone();
    if let Some(max_steps) = args.max_steps {
        limits.max_steps = max_steps;
    }

    let image_bytes = match std::fs::read(&image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to read image {:?}: {}", image_path, e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let image_hash = {
        let mut hasher = Sha256::new();
        hasher.update(&image_bytes);
        format!("{:x}", hasher.finalize())
    };

    let bus = match build_bus(machine_path.as_deref()) {
        Ok(bus) => bus,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let program = match bench65_loader::load_image(&image_path, script.inputs.load_address) {
        Ok(program) => program,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let console_events: Arc<Mutex<Vec<ConsoleEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let metrics = Arc::new(bench65_core::metrics::PerformanceMetrics::new());

    let mut machine = bench65_core::Machine::new(Mos6502::new(), bus);
    machine
        .bus
        .attach_console_sink(console_events.clone(), !args.no_console_stdout);
    machine.observers.push(metrics.clone());

    if let Err(e) = machine.load_program(&program) {
        error!("Failed to load program into memory: {}", e);
        return ExitCode::from(EXIT_RUNTIME_ERROR);
    }

    let loop_result = run_simulation_loop(&mut machine, &limits);

    let console_text = {
        let events = console_events.lock().map(|g| g.clone()).unwrap_or_default();
        transcript(&events)
    };

    let mut assertion_results = Vec::new();
    let mut all_passed = true;
    let mut expected_stop_reason_matched = false;

    for assertion in &script.assertions {
        let passed = match assertion {
            TestAssertion::ConsoleContains(a) => console_text.contains(&a.console_contains),
            TestAssertion::ConsoleRegex(a) => simple_regex_is_match(&a.console_regex, &console_text),
            TestAssertion::ExpectedStopReason(a) => {
                a.expected_stop_reason == loop_result.stop_reason
            }
        };

        if matches!(assertion, TestAssertion::ExpectedStopReason(_)) && passed {
            expected_stop_reason_matched = true;
        }

        if !passed {
            all_passed = false;
            error!(
                "Assertion failed: {:?} (captured len={})",
                assertion,
                console_text.len()
            );
        }

        assertion_results.push(AssertionResult {
            assertion: assertion.clone(),
            passed,
        });
    }

    let sim_error_happened = loop_result.stop_message.is_some();
    let status = if !all_passed {
        "fail"
    } else if sim_error_happened && !expected_stop_reason_matched {
        "error"
    } else {
        "pass"
    };

    report_metrics(&machine.cpu, &metrics);
    info!(
        "Test finished: status={} stop_reason={:?} steps={}",
        status, loop_result.stop_reason, loop_result.steps_executed
    );

    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: status.to_string(),
        steps_executed: loop_result.steps_executed,
        instructions: metrics.get_instructions(),
        stop_reason: loop_result.stop_reason,
        limits,
        message: loop_result.stop_message,
        assertions: assertion_results,
        image_hash,
        config: TestConfig {
            image: image_path,
            machine: machine_path,
            script: args.script.clone(),
        },
    };

    if let Some(output_dir) = &args.output_dir {
        if let Err(e) = write_artifacts(output_dir, &result, &console_text) {
            error!("Failed to write test artifacts: {:#}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    }

    match status {
        "pass" => ExitCode::from(EXIT_PASS),
        "fail" => ExitCode::from(EXIT_ASSERT_FAIL),
        _ => ExitCode::from(EXIT_RUNTIME_ERROR),
    }
}

fn write_artifacts(
    output_dir: &Path,
    result: &TestResult,
    console_text: &str,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(output_dir)?;

    let result_path = output_dir.join("result.json");
    let f = std::fs::File::create(&result_path)?;
    serde_json::to_writer_pretty(f, result)?;
    info!("Wrote {:?}", result_path);

    let console_path = output_dir.join("console.log");
    std::fs::write(&console_path, console_text)?;
    info!("Wrote {:?}", console_path);

    Ok(())
}

// Minimal regex matcher supporting: '^' anchor, '$' anchor, '.' and '*' (Kleene star).
// Console assertions rarely need more; keeps the dependency surface small.
fn simple_regex_is_match(pattern: &str, text: &str) -> bool {
    fn match_here(pat: &[u8], text: &[u8]) -> bool {
        match pat {
            [] => true,
            [c, b'*', rest @ ..] => match_star(*c, rest, text),
            [b'$'] => text.is_empty(),
            [c, rest @ ..] if !text.is_empty() && (*c == b'.' || *c == text[0]) => {
                match_here(rest, &text[1..])
            }
            _ => false,
        }
    }

    fn match_star(c: u8, pat: &[u8], text: &[u8]) -> bool {
        let mut t = text;
        loop {
            if match_here(pat, t) {
                return true;
            }
            match t.split_first() {
                Some((head, tail)) if c == b'.' || c == *head => t = tail,
                _ => return false,
            }
        }
    }

    let pat = pattern.as_bytes();
    let text_bytes = text.as_bytes();

    if let Some(rest) = pat.strip_prefix(b"^") {
        return match_here(rest, text_bytes);
    }
    (0..=text_bytes.len()).any(|start| match_here(pat, &text_bytes[start..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u16_addr() {
        assert_eq!(parse_u16_addr("0x8000").unwrap(), 0x8000);
        assert_eq!(parse_u16_addr("512").unwrap(), 512);
        assert!(parse_u16_addr("0x10000").is_err());
        assert!(parse_u16_addr("nope").is_err());
    }

    #[test]
    fn test_simple_regex() {
        assert!(simple_regex_is_match("OK", "...OK..."));
        assert!(simple_regex_is_match("^OK", "OK\n"));
        assert!(!simple_regex_is_match("^OK$", "OK\n"));
        assert!(simple_regex_is_match("O.*K", "OxyzK"));
        assert!(simple_regex_is_match("a*b", "b"));
        assert!(!simple_regex_is_match("^b.d$", "bad!"));
    }
}
