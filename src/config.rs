use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;

lazy_static! {
    static ref CONFIG: RwLock<ParserConfig> = RwLock::new(ParserConfig::load());
}

/// Defaults applied to every newly constructed parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Width of the big-endian size field written before each NALU of a frame (1-4)
    pub nalu_size_length: usize,
    /// Forced field duration in nanoseconds; overrides stream timing when set
    pub forced_default_duration: Option<i64>,
    /// Drop the first reorder batch when it does not start with a keyframe
    pub discard_leading_non_keyframes: bool,
    /// Feed HEVC NALU type 63 payloads to a nested enhancement-layer parser
    pub parse_dovi_enhancement_layer: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            nalu_size_length: 4,
            forced_default_duration: None,
            discard_leading_non_keyframes: true,
            parse_dovi_enhancement_layer: true,
        }
    }
}

impl ParserConfig {
    /// Defaults, then `key = value` lines from the config files, then environment variables.
    pub fn load() -> Self {
        let mut config = ParserConfig::default();

        let config_paths = ["./vdkes_config.toml", "./config.toml"];
        for path in &config_paths {
            if let Ok(mut file) = File::open(path) {
                let mut content = String::new();
                if file.read_to_string(&mut content).is_ok() {
                    for line in content.lines() {
                        let line = line.trim();
                        if line.starts_with('#') {
                            continue;
                        }
                        if let Some((key, value)) = line.split_once('=') {
                            let value = value.trim().trim_matches('"').trim_matches('\'');
                            config.apply(key.trim(), value);
                        }
                    }
                }
            }
        }

        for (key, var) in [
            ("nalu_size_length", "VDKES_NALU_SIZE_LENGTH"),
            ("default_duration", "VDKES_DEFAULT_DURATION"),
            ("discard_leading_non_keyframes", "VDKES_DISCARD_LEADING"),
            ("parse_dovi_enhancement_layer", "VDKES_PARSE_DOVI_EL"),
        ] {
            if let Ok(value) = env::var(var) {
                config.apply(key, value.trim());
            }
        }

        config
    }

    /// Applies one setting. Unknown keys are ignored, invalid values keep the previous value.
    pub fn apply(&mut self, key: &str, value: &str) {
        match key {
            "nalu_size_length" => match value.parse::<usize>() {
                Ok(length @ 1..=4) => self.nalu_size_length = length,
                _ => log::warn!("ignoring invalid nalu_size_length '{}'", value),
            },
            "default_duration" | "forced_default_duration" => match value.parse::<i64>() {
                Ok(duration) if duration > 0 => self.forced_default_duration = Some(duration),
                _ => log::warn!("ignoring invalid default_duration '{}'", value),
            },
            "discard_leading_non_keyframes" => match parse_flag(value) {
                Some(flag) => self.discard_leading_non_keyframes = flag,
                None => log::warn!("ignoring invalid discard_leading_non_keyframes '{}'", value),
            },
            "parse_dovi_enhancement_layer" => match parse_flag(value) {
                Some(flag) => self.parse_dovi_enhancement_layer = flag,
                None => log::warn!("ignoring invalid parse_dovi_enhancement_layer '{}'", value),
            },
            _ => {}
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Returns a copy of the global parser defaults
pub fn current() -> ParserConfig {
    CONFIG.read().clone()
}

/// Re-reads config files and environment variables
pub fn reload() {
    let new_config = ParserConfig::load();
    *CONFIG.write() = new_config;
}

/// Replaces the global parser defaults
pub fn set(config: ParserConfig) {
    *CONFIG.write() = config;
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        std::fs::write(path, TEMPLATE)?;
    }
    Ok(())
}

const TEMPLATE: &str = r#"# VDKES Configuration
# Copy this file to 'vdkes_config.toml' and adjust the values.

# Size field width in bytes for NALUs of emitted frames (1-4)
nalu_size_length = 4

# Forced field duration in nanoseconds (frame duration is twice this)
# default_duration = 20000000

# Drop leading frames before the first keyframe
discard_leading_non_keyframes = true

# Parse Dolby Vision enhancement layers (HEVC NALU type 63)
parse_dovi_enhancement_layer = true
"#;
