use anyhow::{Context, Result};
use passbook_core::{DateOrder, NoiseRule, PipelineConfig};
use passbook_export::{ExportFormat, ExportOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parsing: ParsingSection,
    pub export: ExportSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingSection {
    /// How to read `01/02/2023`: "day-first" or "month-first"
    pub date_order: DateOrder,
    /// Extra boilerplate lines to drop, checked after the built-in patterns
    pub extra_noise_patterns: Vec<NoiseRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub date_format: String,
    /// Where exports are written (default: next to the input file)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Formats written by `extract` when no `--format` is given
    pub default_formats: Vec<ExportFormat>,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            date_format: ExportOptions::default().date_format,
            output_dir: None,
            default_formats: vec![ExportFormat::Csv],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// tracing filter directive; RUST_LOG takes precedence
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            date_order: self.parsing.date_order,
            extra_noise: self.parsing.extra_noise_patterns.clone(),
        }
    }

    /// Reject settings that would only fail halfway through an export.
    pub fn validate(&self) -> Result<()> {
        self.export_options(None)
            .validate()
            .context("check [export] date_format or --date-format")
    }

    pub fn export_options(&self, title: Option<String>) -> ExportOptions {
        ExportOptions {
            date_format: self.export.date_format.clone(),
            title,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(());
    }
    save_config(path, &Config::default())?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.export.date_format, "%d/%m/%Y");
        assert_eq!(cfg.export.default_formats, vec![ExportFormat::Csv]);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.parsing.date_order = DateOrder::MonthFirst;
        cfg.parsing.extra_noise_patterns.push(NoiseRule {
            name: "promo".into(),
            pattern: "^visit our branch".into(),
        });
        cfg.export.output_dir = Some(PathBuf::from("/tmp/exports"));
        cfg.export.default_formats = vec![ExportFormat::Csv, ExportFormat::Pdf];

        save_config(&path, &cfg).unwrap();
        assert_eq!(load_config(&path).unwrap(), cfg);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[parsing]
date_order = "month-first"

[[parsing.extra_noise_patterns]]
name = "promo"
pattern = "^visit"
"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.parsing.date_order, DateOrder::MonthFirst);
        assert_eq!(cfg.parsing.extra_noise_patterns.len(), 1);
        assert_eq!(cfg.logging.level, "warn");
        assert_eq!(cfg.pipeline().extra_noise[0].name, "promo");
    }

    #[test]
    fn test_bad_date_format_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[export]\ndate_format = \"%H:%M\"\n").unwrap();

        let cfg = load_config(&path).unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err:#}").contains("%H:%M"));
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_init_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();
        init_config(&path).unwrap();
        assert_eq!(load_config(&path).unwrap().logging.level, "debug");
    }
}
