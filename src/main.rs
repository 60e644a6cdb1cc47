//! # Reportflow CLI
//!
//! Usage:
//!   reportflow template.json data.json -o layout.json
//!   cat data.json | reportflow template.json > layout.json
//!
//! Set `RUST_LOG=reportflow=debug` to trace pagination.

use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let output_path = args
        .windows(2)
        .find(|w| w[0] == "-o")
        .map(|w| w[1].clone());
    let positional: Vec<&String> = args
        .iter()
        .enumerate()
        .filter(|(i, a)| !a.starts_with('-') && (*i == 0 || args[i - 1] != "-o"))
        .map(|(_, a)| a)
        .collect();

    let Some(template_path) = positional.first() else {
        eprintln!("usage: reportflow <template.json> [data.json] [-o output.json]");
        process::exit(2);
    };

    let template = read_or_exit(fs::read_to_string(template_path), template_path);
    let data = match positional.get(1) {
        Some(path) => read_or_exit(fs::read_to_string(path), path),
        None => {
            let mut buf = String::new();
            read_or_exit(io::stdin().read_to_string(&mut buf), "stdin");
            buf
        }
    };

    let result = match reportflow::layout_json(&template, &data) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("✗ Layout failed: {e}");
            process::exit(1);
        }
    };

    let json = match serde_json::to_string_pretty(&result) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("✗ Failed to serialize layout: {e}");
            process::exit(1);
        }
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(&path, &json) {
                eprintln!("✗ Failed to write {path}: {e}");
                process::exit(1);
            }
            eprintln!("✓ {} pages written to {}", result.total_pages, path);
        }
        None => println!("{json}"),
    }
}

fn read_or_exit<T>(result: io::Result<T>, what: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("✗ Failed to read {what}: {e}");
            process::exit(1);
        }
    }
}
