//! Configuration unit tests.

use super::*;

#[test]
fn default_config_roundtrip() {
    let cfg = RenderConfig::default();
    let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
    let parsed: RenderConfig = toml::from_str(&toml_str).expect("deserialize");
    assert_eq!(parsed.atlas.size, 2048);
    assert_eq!(parsed.atlas.packer, PackerKind::Guillotine);
    assert_eq!(parsed.raster.initial_target_width, 64);
    assert_eq!(parsed.raster.max_attempts, 4);
    assert_eq!(parsed.present.frame_latency_timeout_ms, 100);
    assert!(parsed.present.vsync);
    assert_eq!(parsed.present.background, "#1e1e2e");
    assert!(!parsed.debug.continuous_redraw);
    assert!(parsed.custom_shader.is_none());
}

#[test]
fn partial_toml_uses_defaults() {
    let toml_str = r#"
[atlas]
packer = "shelf"
"#;
    let parsed: RenderConfig = toml::from_str(toml_str).expect("deserialize");
    assert_eq!(parsed.atlas.packer, PackerKind::Shelf);
    // Other fields should be defaults
    assert_eq!(parsed.atlas.size, 2048);
    assert_eq!(parsed.raster.max_attempts, 4);
    assert!((parsed.font.size - 16.0).abs() < f32::EPSILON);
}

#[test]
fn empty_toml_gives_defaults() {
    let parsed: RenderConfig = toml::from_str("").expect("deserialize");
    assert_eq!(parsed.atlas.effective_size(), 2048);
    assert!(!parsed.uses_custom_shader());
}

#[test]
fn atlas_size_rounds_to_power_of_two() {
    let mut atlas = AtlasConfig::default();
    atlas.size = 1000;
    assert_eq!(atlas.effective_size(), 1024);
    atlas.size = 1;
    assert_eq!(atlas.effective_size(), 64);
    atlas.size = 1 << 20;
    assert_eq!(atlas.effective_size(), 16_384);
}

#[test]
fn max_attempts_never_zero() {
    let raster = RasterConfig {
        max_attempts: 0,
        ..RasterConfig::default()
    };
    assert_eq!(raster.effective_max_attempts(), 1);
}

#[test]
fn hex_background_parses() {
    let rgba = parse_hex_color("#ff8000").expect("valid color");
    assert!((rgba[0] - 1.0).abs() < f32::EPSILON);
    assert!((rgba[1] - 128.0 / 255.0).abs() < 1e-6);
    assert!(rgba[2].abs() < f32::EPSILON);
    assert!(parse_hex_color("ff8000").is_none());
    assert!(parse_hex_color("#12345").is_none());
}

#[test]
fn custom_shader_path_from_toml() {
    let toml_str = r#"
custom_shader = "/nonexistent/oriterm_atlas/crt.wgsl"

[debug]
continuous_redraw = true
"#;
    let parsed: RenderConfig = toml::from_str(toml_str).expect("deserialize");
    assert_eq!(
        parsed.custom_shader.as_deref(),
        Some(std::path::Path::new("/nonexistent/oriterm_atlas/crt.wgsl"))
    );
    assert!(parsed.debug.continuous_redraw);
    // Configured but unreadable: the default shader runs, no forced redraws.
    assert!(!parsed.uses_custom_shader());
}

#[test]
fn readable_custom_shader_is_used() {
    let path = std::env::temp_dir().join(format!(
        "oriterm_atlas_config_shader_{}.wgsl",
        std::process::id()
    ));
    std::fs::write(&path, "@fragment\nfn fs_main() {}").expect("write shader");
    let cfg = RenderConfig {
        custom_shader: Some(path.clone()),
        ..RenderConfig::default()
    };
    assert!(cfg.uses_custom_shader());
    assert_eq!(cfg.custom_shader_source().as_deref(), Some("@fragment\nfn fs_main() {}"));
    let _ = std::fs::remove_file(path);
}

#[test]
fn log_level_parses_or_falls_back() {
    let mut debug = DebugConfig::default();
    assert_eq!(debug.log_level_filter(), log::LevelFilter::Info);
    debug.log_level = "TRACE".to_owned();
    assert_eq!(debug.log_level_filter(), log::LevelFilter::Trace);
    debug.log_level = "chatty".to_owned();
    assert_eq!(debug.log_level_filter(), log::LevelFilter::Info);
}
