use crate::config::{Config, Limits};
use crate::error::Error;
use color_eyre::eyre::{Report, Result};
use indoc::indoc;

#[test]
fn missing_keys_take_defaults() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        indoc! {r#"
            {
              "executables": { "phylo": "bootstrap-trees {alignment}" },
              "cascade": { "support_threshold": 80, "bands": { "potential": 0.6 } },
              "limits": { "max_length": 12000 }
            }
        "#},
    )?;

    let config = Config::read(&path)?;
    assert_eq!(config.executables.phylo, "bootstrap-trees {alignment}");
    assert_eq!(config.executables.similarity, Config::new().executables.similarity);
    assert_eq!(config.cascade.support_threshold, 80.0);
    assert_eq!(config.cascade.length_gate, 800);
    assert_eq!((config.cascade.bands.potential, config.cascade.bands.confirmed), (0.6, 0.7));
    assert_eq!(config.limits, Limits { max_length: 12000, ..Default::default() });
    assert_eq!((config.scan.window, config.scan.step), (500, 100));
    assert_eq!(config.timeout_secs, 3600);
    Ok(())
}

#[test]
fn write_then_read() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::new();
    config.timeout_secs = 60;
    config.cascade.subtyping_cluster = "3".to_string();
    config.write(&path)?;

    assert_eq!(Config::read(&path)?, config);
    Ok(())
}

#[test]
fn malformed_config() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "timeout_secs": "soon" }"#)?;
    assert!(Config::read(&path).is_err());
    assert!(Config::read(&dir.path().join("missing.json")).is_err());
    Ok(())
}

#[test]
fn scan_overrides() -> Result<(), Report> {
    let mut config = Config::new();
    config.override_scan(Some("300"), Some("30"));
    assert_eq!((config.scan.window, config.scan.step), (300, 30));

    // invalid values keep what was there
    config.override_scan(Some("0"), Some("1e3"));
    assert_eq!((config.scan.window, config.scan.step), (300, 30));

    config.override_scan(None, None);
    assert_eq!((config.scan.window, config.scan.step), (300, 30));
    Ok(())
}

#[test]
fn parameter_error() -> Result<(), Report> {
    let error = crate::config::parse_positive("window", "abc").unwrap_err();
    assert_eq!(error, Error::Parameter { name: "window".to_string(), value: "abc".to_string() });
    assert_eq!(error.to_string(), "Invalid value for parameter window: \"abc\"");
    Ok(())
}
