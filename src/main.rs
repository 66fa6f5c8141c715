//! Signature Demo Runner
//!
//! Runs key generation, signing and verification for both engines and
//! prints a JSON report with timings, diagnostics and cumulative metrics.
//!
//! Run with: cargo run --release -- [config.json]
//!
//! The optional argument is a JSON file with `DssConfig` overrides. Set
//! `RUST_LOG=debug` to see resampling.

use log::{error, info};
use serde_json::{Value, json};
use std::time::Instant;
use tdss::hash::digest;
use tdss::{CurveEngine, DssConfig, FiniteFieldEngine, HardProblem, Result, SignatureScheme};

const MESSAGE: &[u8] = b"Digital signatures on transcendental hard problems";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => match DssConfig::from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("could not load {path}: {e}");
                std::process::exit(1);
            }
        },
        None => DssConfig::default(),
    };

    println!("================================================================================");
    println!("Transcendental-form signatures");
    println!("================================================================================\n");
    println!("NOTE: Run with --release for much faster performance!\n");

    let mut report = json!({
        "message": String::from_utf8_lossy(MESSAGE),
        "message_sha256": hex::encode(digest(&[&MESSAGE])),
        "config": config,
    });

    for (name, result) in [
        ("finite_field", run_finite_field(&config)),
        ("elliptic_curve", run_elliptic_curve(&config)),
    ] {
        match result {
            Ok(section) => report[name] = section,
            Err(e) => {
                error!("{name} engine failed: {e}");
                report[name] = json!({ "error": e.to_string() });
            }
        }
    }

    match serde_json::to_string_pretty(&report) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            error!("could not render report: {e}");
            std::process::exit(1);
        }
    }
}

fn forms_json(forms: [HardProblem; 2]) -> Value {
    forms
        .iter()
        .map(|form| {
            json!({
                "form": form.label(),
                "equation": form.equation(),
                "description": form.description(),
            })
        })
        .collect()
}

fn millis(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn run_finite_field(config: &DssConfig) -> Result<Value> {
    info!("finite-field engine, {} bits", config.bit_length);
    let mut engine = FiniteFieldEngine::new(config.clone());

    let start = Instant::now();
    let (private_key, public_key) = engine.generate_key_pair()?;
    let keygen_ms = millis(start);

    let start = Instant::now();
    let (signature, sign_diagnostics) = engine.sign_traced(MESSAGE, &private_key)?;
    let sign_ms = millis(start);

    let start = Instant::now();
    let verification = engine.verify(MESSAGE, &signature, &public_key)?;
    let verify_ms = millis(start);

    let tampered = engine.verify(b"tampered message", &signature, &public_key)?;

    let params = engine.params().map(|p| {
        json!({
            "p": p.p().to_string(),
            "q": p.q().to_string(),
            "bit_length": p.bit_length(),
        })
    });

    Ok(json!({
        "forms": forms_json(engine.forms()),
        "params": params,
        "public_key": public_key.value().to_string(),
        "signature": {
            "r": signature.r.to_string(),
            "s": signature.s.to_string(),
            "z": signature.z.to_string(),
        },
        "valid": verification.valid,
        "tampered_valid": tampered.valid,
        "timings_ms": { "keygen": keygen_ms, "sign": sign_ms, "verify": verify_ms },
        "sign_diagnostics": sign_diagnostics,
        "verify_diagnostics": verification.diagnostics,
        "metrics": engine.metrics_snapshot(),
    }))
}

fn run_elliptic_curve(config: &DssConfig) -> Result<Value> {
    let mut engine = CurveEngine::for_bit_length(256, config.clone())?;
    info!("curve engine, n = {}", engine.params().order());

    let start = Instant::now();
    let (private_key, public_key) = engine.generate_key_pair()?;
    let keygen_ms = millis(start);

    let start = Instant::now();
    let (signature, sign_diagnostics) = engine.sign_traced(MESSAGE, &private_key)?;
    let sign_ms = millis(start);

    let start = Instant::now();
    let verification = engine.verify(MESSAGE, &signature, &public_key)?;
    let verify_ms = millis(start);

    let tampered = engine.verify(b"tampered message", &signature, &public_key)?;

    Ok(json!({
        "forms": forms_json(engine.forms()),
        "curve": engine.params().to_string(),
        "public_key": public_key.point().to_string(),
        "signature": {
            "R": signature.r.to_string(),
            "s": signature.s.to_string(),
            "Z": signature.z.to_string(),
        },
        "valid": verification.valid,
        "tampered_valid": tampered.valid,
        "timings_ms": { "keygen": keygen_ms, "sign": sign_ms, "verify": verify_ms },
        "sign_diagnostics": sign_diagnostics,
        "verify_diagnostics": verification.diagnostics,
        "metrics": engine.metrics_snapshot(),
    }))
}
