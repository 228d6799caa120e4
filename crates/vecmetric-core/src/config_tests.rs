//! Tests for layered dispatch configuration.

use std::path::Path;

use figment::Jail;

use crate::capability::Capabilities;
use crate::config::DispatchConfig;
use crate::error::Error;

fn load(path: Option<&Path>) -> figment::error::Result<DispatchConfig> {
    DispatchConfig::load(path).map_err(|e| e.to_string().into())
}

#[test]
fn test_default_allows_everything() {
    assert_eq!(DispatchConfig::default().allowed, Capabilities::all());
}

#[test]
fn test_load_without_sources_is_default() {
    Jail::expect_with(|_jail| {
        assert_eq!(load(None)?, DispatchConfig::default());
        Ok(())
    });
}

#[test]
fn test_toml_list() {
    Jail::expect_with(|jail| {
        jail.create_file("vecmetric.toml", r#"allowed = ["avx2", "neon"]"#)?;
        let config = load(Some(Path::new("vecmetric.toml")))?;
        assert_eq!(config.allowed, Capabilities::AVX2 | Capabilities::NEON);
        Ok(())
    });
}

#[test]
fn test_toml_comma_string() {
    Jail::expect_with(|jail| {
        jail.create_file("vecmetric.toml", r#"allowed = "avx512, avx2-fp16""#)?;
        let config = load(Some(Path::new("vecmetric.toml")))?;
        assert_eq!(config.allowed, Capabilities::AVX512 | Capabilities::AVX2_FP16);
        Ok(())
    });
}

#[test]
fn test_env_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("vecmetric.toml", r#"allowed = ["avx2"]"#)?;
        jail.set_env("VECMETRIC_ALLOWED", "serial");
        let config = load(Some(Path::new("vecmetric.toml")))?;
        assert!(config.allowed.is_empty());
        Ok(())
    });
}

#[test]
fn test_env_accepts_raw_bits() {
    Jail::expect_with(|jail| {
        jail.set_env("VECMETRIC_ALLOWED", "1025");
        let config = load(None)?;
        assert_eq!(config.allowed, Capabilities::NEON | Capabilities::AVX2);
        Ok(())
    });
}

#[test]
fn test_unknown_capability_is_config_error() {
    Jail::expect_with(|jail| {
        jail.set_env("VECMETRIC_ALLOWED", "avx2,3dnow");
        let err = DispatchConfig::load(None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        Ok(())
    });
}

#[test]
fn test_from_env_reads_config_path() {
    Jail::expect_with(|jail| {
        jail.create_file("dispatch.toml", r#"allowed = ["neon"]"#)?;
        jail.set_env("VECMETRIC_CONFIG", "dispatch.toml");
        assert_eq!(DispatchConfig::from_env().allowed, Capabilities::NEON);
        Ok(())
    });
}

#[test]
fn test_from_env_falls_back_on_invalid_value() {
    Jail::expect_with(|jail| {
        jail.set_env("VECMETRIC_ALLOWED", "not-a-feature");
        assert_eq!(DispatchConfig::from_env(), DispatchConfig::default());
        Ok(())
    });
}

#[test]
fn test_config_serializes_as_names() {
    let config = DispatchConfig {
        allowed: Capabilities::SVE | Capabilities::SVE2,
    };
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(json, r#"{"allowed":["sve","sve2"]}"#);
    assert_eq!(serde_json::from_str::<DispatchConfig>(&json).unwrap(), config);
}
