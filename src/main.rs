// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use caseflow::config::{load_and_validate_config, RuntimeBuilder};
use caseflow::engine::StreamEvent;

const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_CANCELLED: i32 = 130;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "caseflow=warn".into()),
        )
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <config.yaml|config.toml> <patient.json>", args[0]);
        eprintln!("Example: {} configs/case-summary.yaml demos/patient.json", args[0]);
        std::process::exit(EXIT_USAGE);
    }

    let code = run_case_summary(&args[1], &args[2]).await;
    std::process::exit(code);
}

/// Run one case summary, streaming progress to stdout. Returns the exit code.
async fn run_case_summary(config_file: &str, patient_file: &str) -> i32 {
    let config = match load_and_validate_config(config_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            return EXIT_USAGE;
        }
    };
    let workflow = match RuntimeBuilder::from_config(&config) {
        Ok(workflow) => workflow,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            return EXIT_USAGE;
        }
    };

    println!("🩺 Patient Case Summary");
    println!("═══════════════════════════════════");
    println!("Config:  {}", config_file);
    println!("Patient: {}", patient_file);
    println!();

    let started = Instant::now();
    let mut handle = workflow.run(PathBuf::from(patient_file));
    tracing::info!(run_id = %handle.run_id(), "Run started");

    let printer = handle.stream_events().map(|mut stream| {
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if let StreamEvent::Log(log) = event {
                    if log.delta {
                        print!("{}", log.message);
                        let _ = io::stdout().flush();
                    } else {
                        println!("{}", log.message);
                    }
                }
            }
        })
    });

    let cancel = handle.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n⏹  Cancelling run...");
            cancel.cancel();
        }
    });

    let result = handle.wait().await;
    if let Some(printer) = printer {
        let _ = printer.await;
    }
    interrupt.abort();

    match result {
        Ok(summary) => {
            println!("\n{}", "─".repeat(80));
            println!("{}", summary.render());
            println!("{}", "─".repeat(80));
            println!("✅ Completed in {:.2?}", started.elapsed());
            EXIT_SUCCESS
        }
        Err(e) if e.is_cancellation() => {
            eprintln!("⏹  {}", e);
            EXIT_CANCELLED
        }
        Err(e) => {
            eprintln!("❌ Run failed: {}", e);
            EXIT_FAILURE
        }
    }
}
