//! Configuration loading for the reader.
//!
//! All user-tunable settings are centralized here and loaded from
//! `conf/config.toml` if present. Any missing or invalid entries fall back to
//! sensible defaults so the reader can still launch.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{
    CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, config_path, load_config, parse_config, serialize_config,
};
pub use models::{
    AppConfig, LINE_HEIGHTS, LogLevel, MAX_FONT_SIZE, MIN_FONT_SIZE, ReadingSettings,
    clamp_font_size, snap_line_height,
};
