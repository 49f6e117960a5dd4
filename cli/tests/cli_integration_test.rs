use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tonelink-cli-{}-{}", std::process::id(), test));
    fs::create_dir_all(&dir).expect("Failed to create scratch dir");
    dir
}

fn run_tonelink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tonelink"))
        .args(args)
        .output()
        .expect("Failed to execute tonelink")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_encode_then_decode_text() {
    let dir = scratch_dir("text");
    let wav = dir.join("hello.wav");
    let wav = wav.to_str().unwrap();

    let encoded = run_tonelink(&["encode", "--text", "Hello World!", "-o", wav]);
    assert!(encoded.status.success(), "encode failed: {}", stderr(&encoded));
    assert!(stdout(&encoded).contains("Encoded 12 bytes"));

    // 250 ms lead + 480 ms preamble/guard + 56 symbols + 500 ms trail, 16-bit mono
    let size = fs::metadata(wav).unwrap().len();
    assert!(size > 200_000, "file too small: {} bytes", size);
    assert!(size < 300_000, "file too large: {} bytes", size);

    let decoded = run_tonelink(&["decode", wav]);
    assert!(decoded.status.success(), "decode failed: {}", stderr(&decoded));
    assert_eq!(stdout(&decoded).trim(), "Hello World!");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_decode_json_events() {
    let dir = scratch_dir("json");
    let wav = dir.join("msg.wav");
    let wav = wav.to_str().unwrap();

    assert!(run_tonelink(&["encode", "--text", "json", "-o", wav]).status.success());
    let decoded = run_tonelink(&["decode", wav, "--json"]);
    assert!(decoded.status.success(), "decode failed: {}", stderr(&decoded));

    let events: Vec<serde_json::Value> = stdout(&decoded)
        .lines()
        .map(|line| serde_json::from_str(line).expect("not a JSON line"))
        .collect();
    let names: Vec<&str> = events.iter().filter_map(|e| e["event"].as_str()).collect();

    assert_eq!(&names[..3], &["listening", "preamble_detected", "receiving_data"]);
    assert!(names.contains(&"progress"));
    let text = events.iter().find(|e| e["event"] == "text").expect("no text event");
    assert_eq!(text["text"], "json");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_image_round_trip_to_file() {
    let dir = scratch_dir("image");
    let image = dir.join("in.jpg");
    let wav = dir.join("image.wav");
    let out = dir.join("out.jpg");
    let data: Vec<u8> = (0..24u8).map(|i| i.wrapping_mul(91).wrapping_add(3)).collect();
    fs::write(&image, &data).unwrap();

    let encoded = run_tonelink(&[
        "encode",
        "--image",
        image.to_str().unwrap(),
        "--width",
        "6",
        "--height",
        "4",
        "-o",
        wav.to_str().unwrap(),
    ]);
    assert!(encoded.status.success(), "encode failed: {}", stderr(&encoded));

    let decoded = run_tonelink(&[
        "decode",
        wav.to_str().unwrap(),
        "--image-out",
        out.to_str().unwrap(),
    ]);
    assert!(decoded.status.success(), "decode failed: {}", stderr(&decoded));
    assert_eq!(fs::read(&out).unwrap(), data);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_config_file_settings() {
    let dir = scratch_dir("config");
    let config = dir.join("modem.json");
    let wav = dir.join("custom.wav");
    fs::write(
        &config,
        r#"{"symbol_ms": 80, "base_freq": 1200.0, "spacing": 150.0}"#,
    )
    .unwrap();

    let config = config.to_str().unwrap();
    let wav = wav.to_str().unwrap();

    assert!(run_tonelink(&["encode", "--config", config, "--text", "custom", "-o", wav])
        .status
        .success());

    let decoded = run_tonelink(&["decode", "--config", config, wav]);
    assert!(decoded.status.success(), "decode failed: {}", stderr(&decoded));
    assert_eq!(stdout(&decoded).trim(), "custom");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_mismatched_band_decodes_nothing() {
    let dir = scratch_dir("mismatch");
    let wav = dir.join("msg.wav");
    let wav = wav.to_str().unwrap();

    assert!(run_tonelink(&["encode", "--text", "lost", "-o", wav]).status.success());
    let decoded = run_tonelink(&["decode", "--base-freq", "1100", wav]);
    assert!(!decoded.status.success());
    assert!(stdout(&decoded).trim().is_empty());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_input_is_device_error() {
    let dir = scratch_dir("missing");
    let wav = dir.join("nothing-here.wav");

    let decoded = run_tonelink(&["decode", wav.to_str().unwrap()]);
    assert!(!decoded.status.success());
    assert!(stderr(&decoded).contains("DeviceUnavailable"), "{}", stderr(&decoded));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_invalid_settings_rejected() {
    let output = run_tonelink(&["--threshold", "2.0", "tones"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("InvalidConfig"));
}

#[test]
fn test_tones_table() {
    let output = run_tonelink(&["tones", "--base-freq", "1500", "--spacing", "100"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("600.0 Hz"));
    assert!(text.contains("1500.0 Hz"));
    assert!(text.contains("0xF"));
    assert!(text.contains("3000.0 Hz"));
}

#[test]
fn test_loopback() {
    let output = run_tonelink(&["loopback", "--text", "ping"]);
    assert!(output.status.success(), "loopback failed: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "ping");
}
