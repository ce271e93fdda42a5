pub mod app;
pub mod audio;
pub mod audio_io;
pub mod clip;
pub mod record;
pub mod session;
pub mod settings;
pub mod wave;

pub use app::{StartupConfig, VoiceTrimApp};
