use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Create config template if it doesn't exist
    let out_dir = env::var("OUT_DIR").unwrap_or_else(|_| "./".to_string());
    let template_path = Path::new(&out_dir).join("../../../vdkes_config.template.toml");

    let template = r#"# VDKES Configuration Template
# Copy this file to 'vdkes_config.toml' and adjust the values

# Size field width in bytes for NALUs of emitted frames (1-4)
nalu_size_length = 4

# Forced field duration in nanoseconds (frame duration is twice this)
# default_duration = 20000000

# Drop leading frames before the first keyframe
discard_leading_non_keyframes = true

# Parse Dolby Vision enhancement layers (HEVC NALU type 63)
parse_dovi_enhancement_layer = true
"#;

    let _ = fs::write(template_path, template);
    println!("cargo:rerun-if-changed=build.rs");
}
