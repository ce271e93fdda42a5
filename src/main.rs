#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use voicetrim::{StartupConfig, VoiceTrimApp};

const USAGE: &str = "\
voicetrim - capture, trim and export voice samples

USAGE:
    voicetrim [OPTIONS] [FILE]

OPTIONS:
    --open-file <path>    Load an audio file on startup (wav, mp3, m4a, ogg)
    --save-dir <dir>      Directory offered first in the save dialog
    --target-sr <hz>      Sample rate recordings are normalized to (default 16000)
    --settings <path>     Settings file location (default voicetrim.toml)
    -h, --help            Print this help
";

fn parse_startup_config() -> StartupConfig {
    let mut cfg = StartupConfig::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--open-file" => {
                if let Some(p) = args.next() {
                    cfg.open_file = Some(std::path::PathBuf::from(p));
                }
            }
            "--save-dir" => {
                if let Some(p) = args.next() {
                    cfg.save_dir = Some(std::path::PathBuf::from(p));
                }
            }
            "--target-sr" => {
                if let Some(v) = args.next() {
                    if let Ok(sr) = v.parse::<u32>() {
                        cfg.target_sample_rate = Some(sr.max(1));
                    }
                }
            }
            "--settings" => {
                if let Some(p) = args.next() {
                    cfg.settings_path = Some(std::path::PathBuf::from(p));
                }
            }
            "-h" | "--help" => {
                eprint!("{USAGE}");
                std::process::exit(0);
            }
            _ => {
                if arg.starts_with('-') {
                    continue;
                }
                if cfg.open_file.is_none() {
                    cfg.open_file = Some(std::path::PathBuf::from(&arg));
                }
            }
        }
    }
    cfg
}

fn main() -> eframe::Result<()> {
    let startup = parse_startup_config();
    let viewport = egui::ViewportBuilder::default()
        .with_min_inner_size([640.0, 360.0])
        .with_inner_size([900.0, 480.0]);
    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "VoiceTrim Voice Sample Editor",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(
                VoiceTrimApp::new(cc, startup.clone()).expect("failed to init app"),
            ))
        }),
    )
}
