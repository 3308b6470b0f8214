use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn tmp_path(name: &str) -> PathBuf {
    let tmp_dir = std::env::temp_dir().join("tonelink-cli-tests");
    fs::create_dir_all(&tmp_dir).ok();
    tmp_dir.join(name)
}

fn run_tonelink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tonelink"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute tonelink")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_config_prints_defaults() {
    let output = run_tonelink(&["config"]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("\"polynomial\": \"010111010111\""), "{}", text);
    assert!(text.contains("\"sync_policy\": \"consecutive\""), "{}", text);
}

#[test]
fn test_config_prints_loaded_file() {
    let config = tmp_path("ratio.json");
    fs::write(&config, r#"{ "rx": { "ratio": 4 } }"#).expect("Failed to write config file");

    let output = run_tonelink(&["--config", config.to_str().unwrap(), "config"]);
    assert!(output.status.success(), "config failed: {:?}", output);
    let text = stdout(&output);
    assert!(text.contains("\"ratio\": 4"), "{}", text);
    assert!(text.contains("\"polynomial\": \"010111010111\""), "{}", text);
}

#[test]
fn test_send_then_receive() {
    let wav = tmp_path("send_then_receive.wav");
    let output = run_tonelink(&["send", "1010", wav.to_str().unwrap()]);
    assert!(output.status.success(), "send failed: {:?}", output);
    assert!(wav.exists(), "Output file was not created");

    // 44.1 kHz 16-bit mono: 0.4 s preamble + 6 symbols of 0.6 s
    let size = fs::metadata(&wav).expect("Output file not created").len();
    assert!(size > 300_000, "File too small: {} bytes", size);
    assert!(size < 400_000, "File too large: {} bytes", size);

    let output = run_tonelink(&["receive", wav.to_str().unwrap()]);
    assert!(output.status.success(), "receive failed: {:?}", output);
    let text = stdout(&output);
    assert!(text.contains("Message: 1010"), "{}", text);
    assert!(text.contains("CRC: clean"), "{}", text);
}

#[test]
fn test_send_with_flip_is_corrected_on_receive() {
    let wav = tmp_path("send_with_flip.wav");
    let output = run_tonelink(&["send", "1010", wav.to_str().unwrap(), "--flip", "0.25"]);
    assert!(output.status.success(), "send failed: {:?}", output);

    let output = run_tonelink(&["receive", wav.to_str().unwrap()]);
    assert!(output.status.success(), "receive failed: {:?}", output);
    let text = stdout(&output);
    assert!(text.contains("Message: 1010"), "{}", text);
    assert!(text.contains("CRC: corrected bits [3]"), "{}", text);
}

#[test]
fn test_simulate_with_noise() {
    let output = run_tonelink(&["simulate", "110011", "--noise", "0.05", "--seed", "3"]);
    assert!(output.status.success(), "simulate failed: {:?}", output);
    let text = stdout(&output);
    assert!(text.contains("Payload recovered"), "{}", text);
}

#[test]
fn test_simulate_three_flips_fails() {
    // Body of 1010 is 16 bits: fractions select indices 0, 5 and 10
    let output = run_tonelink(&[
        "simulate", "1010", "--flip", "0.0625", "--flip", "0.375", "--flip", "0.6875",
    ]);
    assert!(!output.status.success());
    let errors = String::from_utf8_lossy(&output.stderr);
    assert!(errors.contains("Uncorrectable"), "{}", errors);
}

#[test]
fn test_config_file_is_used() {
    let config = tmp_path("cumulative.json");
    fs::write(&config, r#"{ "rx": { "sync_policy": "cumulative" } }"#)
        .expect("Failed to write config file");

    let output = run_tonelink(&["--config", config.to_str().unwrap(), "simulate", "0110"]);
    assert!(output.status.success(), "simulate failed: {:?}", output);
}

#[test]
fn test_invalid_bits_rejected() {
    let output = run_tonelink(&["simulate", "10a1"]);
    assert!(!output.status.success());
    let errors = String::from_utf8_lossy(&output.stderr);
    assert!(errors.contains("InvalidBit"), "{}", errors);
}
