use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use egui::{Color32, Key, PointerButton, RichText, Sense, Stroke};

use crate::audio::{AudioBuffer, AudioEngine};
use crate::audio_io::{self, SampleBuffer, SUPPORTED_EXTS};
use crate::clip::{self, MIN_GAP_SECS};
use crate::record::{self, RawCapture, Recorder};
use crate::session::{AudioAsset, EditSession};
use crate::settings::Settings;
use crate::wave;

const WAVE_BG: Color32 = Color32::from_rgb(16, 16, 18);
const WAVE_BAR: Color32 = Color32::from_rgb(0xa8, 0xdb, 0xa8);
const TRIM_LINE: Color32 = Color32::from_rgb(0, 123, 255);
const CURSOR_LINE: Color32 = Color32::from_rgb(220, 50, 50);
/// Pointer must land this close to a handle, in points, to grab it.
const HANDLE_GRAB_PX: f32 = 8.0;
const NOTICE_TTL: Duration = Duration::from_secs(6);

/// Command-line startup state, parsed in `main`.
#[derive(Clone, Debug, Default)]
pub struct StartupConfig {
    pub open_file: Option<PathBuf>,
    pub save_dir: Option<PathBuf>,
    pub settings_path: Option<PathBuf>,
    pub target_sample_rate: Option<u32>,
}

/// Which trim handle the active drag owns. Exactly one drag session can be
/// live at a time; a press on the other handle while one is held is ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DragTarget {
    Idle,
    Start,
    End,
}

struct Notice {
    text: String,
    error: bool,
    shown_at: Instant,
}

pub struct VoiceTrimApp {
    audio: AudioEngine,
    session: EditSession,
    settings: Settings,
    settings_path: PathBuf,
    recorder: Option<Recorder>,
    rec_peak: f32,
    drag: DragTarget,
    envelope: Vec<f32>,
    envelope_key: Option<(u64, usize)>,
    playback_len: usize,
    volume: f32,
    notice: Option<Notice>,
}

impl VoiceTrimApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, startup: StartupConfig) -> Result<Self> {
        let settings_path = startup
            .settings_path
            .clone()
            .unwrap_or_else(Settings::default_path);
        let mut settings = Settings::load(&settings_path)
            .with_context(|| format!("load settings {}", settings_path.display()))?;
        if let Some(dir) = startup.save_dir {
            settings.save_dir = Some(dir);
        }
        if let Some(sr) = startup.target_sample_rate {
            settings.transcode_sample_rate = sr.max(1);
        }

        let mut notice = None;
        let audio = match AudioEngine::new() {
            Ok(engine) => engine,
            Err(err) => {
                notice = Some(Notice {
                    text: format!("Audio output unavailable, playback disabled: {err}"),
                    error: true,
                    shown_at: Instant::now(),
                });
                AudioEngine::new_detached()
            }
        };
        let volume = settings.volume.clamp(0.0, 1.0);
        audio.set_volume(volume);

        let mut app = Self {
            audio,
            session: EditSession::default(),
            settings,
            settings_path,
            recorder: None,
            rec_peak: 0.0,
            drag: DragTarget::Idle,
            envelope: Vec::new(),
            envelope_key: None,
            playback_len: 0,
            volume,
            notice,
        };
        if let Some(path) = startup.open_file {
            if let Err(err) = app.open_path(&path) {
                app.show_error(format!("Could not open {}: {err}", path.display()));
            }
        }
        Ok(app)
    }

    fn show_notice(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            error: false,
            shown_at: Instant::now(),
        });
    }

    fn show_error(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            error: true,
            shown_at: Instant::now(),
        });
    }

    fn persist_settings(&mut self) {
        if let Err(err) = self.settings.save(&self.settings_path) {
            self.show_error(format!("Could not save settings: {err}"));
        }
    }

    fn open_path(&mut self, path: &std::path::Path) -> Result<()> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if let Some(ext) = &ext {
            if !audio_io::is_supported_extension(ext) {
                anyhow::bail!("unsupported file type .{ext}");
            }
        }
        let bytes =
            std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let decoded = Arc::new(audio_io::decode_bytes(&bytes, ext.as_deref())?);
        let asset = AudioAsset::from_decoded(bytes, ext, &decoded);
        self.adopt(asset, decoded);
        Ok(())
    }

    /// Install a new active asset: session takes ownership, the playback
    /// engine gets a freshly resampled buffer, the envelope cache is left to
    /// lapse via the generation key.
    fn adopt(&mut self, asset: AudioAsset, decoded: Arc<SampleBuffer>) {
        self.session.adopt(asset, Some(decoded.clone()));
        self.drag = DragTarget::Idle;
        self.push_to_engine(&decoded);
    }

    fn push_to_engine(&mut self, decoded: &SampleBuffer) {
        let out_sr = self.audio.shared.out_sample_rate;
        let channels = wave::resample_channels(&decoded.channels, decoded.sample_rate, out_sr);
        self.playback_len = channels.first().map(|c| c.len()).unwrap_or(0);
        self.audio.stop();
        self.audio
            .set_samples(Arc::new(AudioBuffer::from_channels(channels)));
    }

    fn open_dialog(&mut self) {
        let mut dialog = rfd::FileDialog::new().add_filter("Audio", SUPPORTED_EXTS);
        if let Some(dir) = &self.settings.save_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.pick_file() else {
            return;
        };
        match self.open_path(&path) {
            Ok(()) => self.show_notice(format!("Loaded {}", path.display())),
            Err(err) => self.show_error(format!("Could not open {}: {err}", path.display())),
        }
    }

    fn toggle_record(&mut self) {
        if self.recorder.is_some() {
            self.finish_recording();
            return;
        }
        self.audio.stop();
        match Recorder::start() {
            Ok(recorder) => {
                self.rec_peak = 0.0;
                self.recorder = Some(recorder);
            }
            Err(err) => self.show_error(format!("Could not start recording: {err}")),
        }
    }

    fn finish_recording(&mut self) {
        let Some(recorder) = self.recorder.take() else {
            return;
        };
        let raw = recorder.stop();
        if raw.frames() == 0 {
            self.show_error("Recording captured no audio");
            return;
        }
        let blob = match raw.to_blob() {
            Ok(blob) => blob,
            Err(err) => {
                self.show_error(format!("Could not store recording: {err}"));
                return;
            }
        };
        self.adopt_recording(blob, &raw);
    }

    fn adopt_recording(&mut self, blob: Vec<u8>, raw: &RawCapture) {
        let outcome =
            record::transcode_capture(blob, raw, self.settings.transcode_sample_rate);
        let fallback = outcome.fallback;
        match audio_io::decode_bytes(&outcome.blob, Some("wav")) {
            Ok(decoded) => {
                let decoded = Arc::new(decoded);
                let asset = AudioAsset::from_decoded(outcome.blob, Some("wav".into()), &decoded);
                self.adopt(asset, decoded);
                if fallback {
                    self.show_notice(
                        "Recording kept at capture quality; 16 kHz conversion failed",
                    );
                } else {
                    self.show_notice(format!(
                        "Recorded {:.1}s at {} Hz",
                        outcome.duration_secs, outcome.sample_rate
                    ));
                }
            }
            Err(err) => self.show_error(format!("Recording is unreadable: {err}")),
        }
    }

    fn apply_cut(&mut self) {
        match self.session.apply_trim() {
            Ok(()) => {
                if let Ok(decoded) = self.session.decoded() {
                    self.push_to_engine(&decoded);
                }
                self.show_notice(format!(
                    "Trimmed to {:.2}s",
                    self.session.duration_secs()
                ));
            }
            Err(err) => self.show_error(format!("Trim failed: {err}")),
        }
    }

    fn save_dialog(&mut self) {
        let Some(asset) = self.session.asset() else {
            return;
        };
        let bytes = asset.bytes.clone();
        let default_name = format!(
            "voice_sample_{}.wav",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let mut dialog = rfd::FileDialog::new()
            .add_filter("WAV", &["wav"])
            .set_file_name(default_name);
        if let Some(dir) = &self.settings.save_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else {
            return;
        };
        match std::fs::write(&path, &bytes) {
            Ok(()) => {
                self.settings.save_dir = path.parent().map(|p| p.to_path_buf());
                self.persist_settings();
                self.show_notice(format!("Saved {}", path.display()));
            }
            Err(err) => self.show_error(format!("Could not save {}: {err}", path.display())),
        }
    }

    fn refresh_envelope(&mut self, buckets: usize) {
        let key = (self.session.generation(), buckets);
        if self.envelope_key == Some(key) {
            return;
        }
        match self.session.decoded() {
            Ok(decoded) => {
                let samples = decoded.channels.first().map(|c| c.as_slice()).unwrap_or(&[]);
                wave::build_envelope(&mut self.envelope, samples, buckets);
                self.envelope_key = Some(key);
            }
            Err(_) => {
                self.envelope.clear();
                self.envelope_key = Some(key);
            }
        }
    }

    fn waveform_panel(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let avail = ui.available_size();
        let wave_h = (avail.x * 0.3).clamp(140.0, (avail.y - 60.0).max(140.0));
        let (resp, painter) = ui.allocate_painter(egui::vec2(avail.x, wave_h), Sense::click_and_drag());
        let rect = resp.rect;
        let w = rect.width().max(1.0);
        let h = rect.height().max(1.0);
        painter.rect_filled(rect, 0.0, WAVE_BG);

        if self.session.asset().is_none() {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "Open a file or record to start",
                egui::TextStyle::Body.resolve(ui.style()),
                Color32::GRAY,
            );
            return;
        }

        // one bucket per physical pixel
        let buckets = ((w * ctx.pixels_per_point()).round() as usize).max(1);
        self.refresh_envelope(buckets);

        let mid = rect.center().y;
        if !self.envelope.is_empty() {
            let n = self.envelope.len() as f32;
            for (i, &amp) in self.envelope.iter().enumerate() {
                let x = rect.left() + ((i as f32 + 0.5) / n) * w;
                let half = amp.clamp(0.0, 1.0) * h * 0.45;
                painter.line_segment(
                    [egui::pos2(x, mid - half), egui::pos2(x, mid + half)],
                    Stroke::new(1.0, WAVE_BAR),
                );
            }
        }

        let duration = self.session.duration_secs().max(f32::EPSILON);
        let region = self.session.trim();
        let x_of = |secs: f32| rect.left() + (secs / duration).clamp(0.0, 1.0) * w;
        let start_x = x_of(region.start_secs);
        let end_x = x_of(region.end_secs);

        let band = egui::Rect::from_min_max(
            egui::pos2(start_x, rect.top()),
            egui::pos2(end_x, rect.bottom()),
        );
        painter.rect_filled(band, 0.0, Color32::from_rgba_unmultiplied(0, 123, 255, 26));
        for x in [start_x, end_x] {
            painter.line_segment(
                [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
                Stroke::new(2.0, TRIM_LINE),
            );
        }
        painter.circle_filled(egui::pos2(start_x, mid), 5.0, TRIM_LINE);
        painter.circle_filled(egui::pos2(end_x, mid), 5.0, TRIM_LINE);

        // playback cursor, hidden once it runs past the buffer
        if self.playback_len > 0 {
            let progress = self.audio.play_pos() as f32 / self.playback_len as f32;
            if (0.0..=1.0).contains(&progress) {
                let x = rect.left() + progress * w;
                painter.line_segment(
                    [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
                    Stroke::new(2.0, CURSOR_LINE),
                );
            }
        }

        self.handle_pointer(&resp, rect.left(), w, duration);
    }

    fn handle_pointer(&mut self, resp: &egui::Response, left: f32, width: f32, duration: f32) {
        let pointer_secs = |pos: egui::Pos2| clip::pointer_ratio(pos.x - left, width) * duration;

        if resp.drag_started_by(PointerButton::Primary) && self.drag == DragTarget::Idle {
            if let Some(pos) = resp.interact_pointer_pos() {
                let region = self.session.trim();
                let start_x = left + (region.start_secs / duration).clamp(0.0, 1.0) * width;
                let end_x = left + (region.end_secs / duration).clamp(0.0, 1.0) * width;
                let d_start = (pos.x - start_x).abs();
                let d_end = (pos.x - end_x).abs();
                if d_start <= HANDLE_GRAB_PX && d_start <= d_end {
                    self.drag = DragTarget::Start;
                } else if d_end <= HANDLE_GRAB_PX {
                    self.drag = DragTarget::End;
                }
            }
        }

        if resp.dragged_by(PointerButton::Primary) && self.drag != DragTarget::Idle {
            if let Some(pos) = resp.interact_pointer_pos() {
                let secs = pointer_secs(pos);
                match self.drag {
                    DragTarget::Start => self.session.trim_mut().drag_start_to(secs),
                    DragTarget::End => self.session.trim_mut().drag_end_to(secs, duration),
                    DragTarget::Idle => {}
                }
            }
        }

        if resp.drag_stopped_by(PointerButton::Primary) {
            self.drag = DragTarget::Idle;
        }

        // plain click seeks the playhead
        if resp.clicked_by(PointerButton::Primary) && self.drag == DragTarget::Idle {
            if let Some(pos) = resp.interact_pointer_pos() {
                let ratio = clip::pointer_ratio(pos.x - left, width);
                let target = (ratio * self.playback_len as f32) as usize;
                self.audio.seek_to_sample(target);
            }
        }
    }

    fn trim_numeric_row(&mut self, ui: &mut egui::Ui) {
        let duration = self.session.duration_secs();
        let region = self.session.trim();
        let mut start = region.start_secs;
        let mut end = region.end_secs;
        ui.horizontal(|ui| {
            ui.label("Trim");
            let start_resp = ui.add(
                egui::DragValue::new(&mut start)
                    .range(0.0..=(end - MIN_GAP_SECS).max(0.0))
                    .speed(0.01)
                    .fixed_decimals(2)
                    .suffix(" s"),
            );
            if start_resp.changed() {
                self.session.trim_mut().drag_start_to(start);
            }
            ui.label("to");
            let end_resp = ui.add(
                egui::DragValue::new(&mut end)
                    .range((start + MIN_GAP_SECS).min(duration)..=duration)
                    .speed(0.01)
                    .fixed_decimals(2)
                    .suffix(" s"),
            );
            if end_resp.changed() {
                self.session.trim_mut().drag_end_to(end, duration);
            }
            ui.label(
                RichText::new(format!("len {:.2}s", self.session.trim().len_secs())).monospace(),
            );
        });
    }

    fn topbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Open...").clicked() {
                self.open_dialog();
            }
            let rec_label = if self.recorder.is_some() {
                RichText::new("Stop Recording").color(Color32::from_rgb(230, 80, 80))
            } else {
                RichText::new("Record")
            };
            if ui.button(rec_label).clicked() {
                self.toggle_record();
            }
            ui.separator();

            let has_asset = self.session.asset().is_some();
            let play_text = if self.audio.is_playing() {
                "Pause (Space)"
            } else {
                "Play (Space)"
            };
            if ui
                .add_enabled(has_asset && self.recorder.is_none(), egui::Button::new(play_text))
                .clicked()
            {
                self.audio.toggle_play();
            }
            if ui
                .add_enabled(has_asset, egui::Button::new("Cut"))
                .clicked()
            {
                self.apply_cut();
            }
            if ui
                .add_enabled(has_asset, egui::Button::new("Save..."))
                .clicked()
            {
                self.save_dialog();
            }
            ui.separator();

            ui.label("Volume");
            let vol_resp = ui.add(egui::Slider::new(&mut self.volume, 0.0..=1.0).show_value(false));
            if vol_resp.changed() {
                self.audio.set_volume(self.volume);
            }
            if vol_resp.drag_stopped() {
                self.settings.volume = self.volume;
                self.persist_settings();
            }

            if let Some(recorder) = &self.recorder {
                let peak = recorder.take_peak();
                self.rec_peak = self.rec_peak.max(peak) * 0.92 + peak * 0.08;
                let elapsed = recorder.elapsed_secs();
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let (rect, painter) =
                        ui.allocate_painter(egui::vec2(120.0, 14.0), Sense::hover());
                    painter.rect_stroke(
                        rect.rect,
                        2.0,
                        Stroke::new(1.0, Color32::GRAY),
                        egui::StrokeKind::Inside,
                    );
                    let fill = egui::Rect::from_min_size(
                        rect.rect.min,
                        egui::vec2(120.0 * self.rec_peak.clamp(0.0, 1.0), 14.0),
                    );
                    painter.rect_filled(fill, 0.0, Color32::from_rgb(230, 80, 80));
                    ui.label(RichText::new(format!("REC {elapsed:.1}s")).monospace());
                });
            }
        });
    }

    fn notice_row(&mut self, ui: &mut egui::Ui) {
        if let Some(notice) = &self.notice {
            if notice.shown_at.elapsed() > NOTICE_TTL {
                self.notice = None;
                return;
            }
            let color = if notice.error {
                Color32::from_rgb(240, 120, 100)
            } else {
                Color32::from_rgb(140, 200, 140)
            };
            ui.label(RichText::new(&notice.text).color(color));
        }
    }
}

impl eframe::App for VoiceTrimApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("topbar").show(ctx, |ui| {
            self.topbar(ui);
            self.notice_row(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.waveform_panel(ui, ctx);
            if self.session.asset().is_some() {
                ui.separator();
                self.trim_numeric_row(ui);
                if let Some(asset) = self.session.asset() {
                    ui.label(
                        RichText::new(format!(
                            "{:.2}s  {} Hz  {} ch",
                            asset.duration_secs, asset.sample_rate, asset.channel_count
                        ))
                        .monospace()
                        .color(Color32::GRAY),
                    );
                }
            }
        });

        let space = ctx.input(|i| i.key_pressed(Key::Space));
        if space && self.recorder.is_none() && ctx.memory(|m| m.focused().is_none()) {
            self.audio.toggle_play();
        }

        ctx.request_repaint_after(Duration::from_millis(16));
    }
}
