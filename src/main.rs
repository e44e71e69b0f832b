//! Round-trip Bench - entry point
//!
//! ```text
//! ┌──────────┐    ┌───────────────┐    ┌───────────────┐    ┌───────────────┐
//! │  Config  │───▶│ random/schema │───▶│ random/legacy │───▶│ sparse_encoder│
//! │  (YAML)  │    │  round trips  │    │  round trips  │    │ equiv + timing│
//! └──────────┘    └───────────────┘    └───────────────┘    └───────────────┘
//! ```
//!
//! Elapsed milliseconds per benchmark go to stdout. Exit code is 0 on
//! success and non-zero on the first failure.

use std::process::ExitCode;

use roundtrip_bench::config::{AppConfig, StoreBackend};
use roundtrip_bench::driver::{ScenarioReport, run_all};
use roundtrip_bench::logging::init_logging;
use roundtrip_bench::store::{FileStore, MemoryStore};
use tracing::{error, info, warn};

/// Exit code for config/bootstrap failures
const EXIT_BOOTSTRAP: u8 = 4;

// ============================================================
// ARGUMENTS
// ============================================================

fn get_arg_value(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if names.contains(&args[i].as_str()) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn get_env() -> String {
    get_arg_value(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

fn use_memory_store() -> bool {
    std::env::args().any(|a| a == "--memory")
}

/// Apply `--trials`, `--warmup`, `--memory` and `--report` on top of the YAML.
fn apply_overrides(config: &mut AppConfig) -> Result<(), String> {
    if let Some(v) = get_arg_value(&["--trials"]) {
        config.encoder_scenario.trials = v
            .parse()
            .map_err(|_| format!("Invalid --trials value: {}", v))?;
    }
    if let Some(v) = get_arg_value(&["--warmup"]) {
        config.encoder_scenario.warmup_iterations = v
            .parse()
            .map_err(|_| format!("Invalid --warmup value: {}", v))?;
    }
    if use_memory_store() {
        config.persistence.backend = StoreBackend::Memory;
    }
    if let Some(path) = get_arg_value(&["--report"]) {
        config.report_path = Some(path);
    }
    Ok(())
}

// ============================================================
// OUTPUT
// ============================================================

fn print_scenario(scenario: &ScenarioReport) {
    println!("{}: {:.3} ms", scenario.name, scenario.elapsed_ms);
    if scenario.codecs.len() > 1 {
        for codec in &scenario.codecs {
            println!(
                "  {:<8} total {:.3} ms, mean {:.1} us/trial",
                codec.codec,
                codec.total_ms,
                codec.mean_us.unwrap_or(0.0)
            );
        }
    }
}

// ============================================================
// MAIN
// ============================================================

fn main() -> ExitCode {
    let env = get_env();
    let mut config = match AppConfig::load(&env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            return ExitCode::from(EXIT_BOOTSTRAP);
        }
    };
    if let Err(e) = apply_overrides(&mut config) {
        eprintln!("❌ {}", e);
        return ExitCode::from(EXIT_BOOTSTRAP);
    }

    let _log_guard = init_logging(&config);
    info!(env = %env, backend = ?config.persistence.backend, "Starting round-trip benchmark");

    let result = match config.persistence.backend {
        StoreBackend::Memory => run_all(&config, &mut MemoryStore::new(), print_scenario),
        StoreBackend::File => {
            let mut store = match FileStore::open(&config.persistence.dir) {
                Ok(store) => store,
                Err(e) => {
                    error!(dir = %config.persistence.dir, error = %e, "Cannot open blob store");
                    eprintln!("❌ Cannot open {}: {}", config.persistence.dir, e);
                    return ExitCode::from(EXIT_BOOTSTRAP);
                }
            };
            let result = run_all(&config, &mut store, print_scenario);
            if let Err(e) = store.close() {
                warn!(dir = %config.persistence.dir, error = %e, "Blob store directory left behind");
            }
            result
        }
    };

    match result {
        Ok(report) => {
            if let Some(path) = &config.report_path {
                if let Err(e) = report.write_json(path) {
                    error!(path = %path, error = %e, "Failed to write report");
                    eprintln!("❌ Failed to write report {}: {}", path, e);
                    return ExitCode::from(EXIT_BOOTSTRAP);
                }
                info!(path = %path, "Report written");
            }
            info!("All benchmarks passed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Benchmark failed");
            eprintln!("❌ {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
