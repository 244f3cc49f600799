//! Configuration loading and workbook reader factory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use learnmetric_core::model::SheetNames;
use learnmetric_core::traits::SheetReader;

use crate::csv_dir::CsvDirectoryReader;
use crate::error::WorkbookError;
use crate::spreadsheet::{SpreadsheetReader, SPREADSHEET_EXTENSIONS};

/// Top-level learnmetric configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnmetricConfig {
    /// Names of the three required sheets.
    #[serde(default)]
    pub sheets: SheetNames,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Report formats written by `analyze` when `--format` is not given.
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./learnmetric-results")
}
fn default_formats() -> Vec<String> {
    vec!["json".to_string()]
}

impl Default for LearnmetricConfig {
    fn default() -> Self {
        Self {
            sheets: SheetNames::default(),
            output_dir: default_output_dir(),
            formats: default_formats(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_config(config: &mut LearnmetricConfig) {
    for name in [
        &mut config.sheets.baseline,
        &mut config.sheets.endline,
        &mut config.sheets.answer_key,
    ] {
        *name = resolve_env_vars(name);
    }
    let output_dir = resolve_env_vars(&config.output_dir.to_string_lossy());
    config.output_dir = PathBuf::from(output_dir);
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `learnmetric.toml` in the current directory
/// 2. `~/.config/learnmetric/config.toml`
///
/// Environment variable overrides: `LEARNMETRIC_BASELINE_SHEET`,
/// `LEARNMETRIC_ENDLINE_SHEET`, `LEARNMETRIC_ANSWER_KEY_SHEET`.
pub fn load_config() -> Result<LearnmetricConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<LearnmetricConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("learnmetric.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => LearnmetricConfig::default(),
    };

    apply_env_overrides(&mut config);
    resolve_config(&mut config);
    Ok(config)
}

fn parse_config(content: &str) -> Result<LearnmetricConfig> {
    Ok(toml::from_str(content)?)
}

fn apply_env_overrides(config: &mut LearnmetricConfig) {
    let overrides = [
        ("LEARNMETRIC_BASELINE_SHEET", &mut config.sheets.baseline),
        ("LEARNMETRIC_ENDLINE_SHEET", &mut config.sheets.endline),
        ("LEARNMETRIC_ANSWER_KEY_SHEET", &mut config.sheets.answer_key),
    ];
    for (var, target) in overrides {
        if let Ok(value) = std::env::var(var) {
            *target = value;
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("learnmetric"))
}

/// Create a reader for a workbook path.
///
/// Directories are read as one CSV file per sheet; files are dispatched on
/// their extension.
pub fn open_reader(path: &Path) -> Result<Box<dyn SheetReader>> {
    if path.is_dir() {
        return Ok(Box::new(CsvDirectoryReader::new(path)));
    }
    if !path.exists() {
        return Err(WorkbookError::NotFound(path.display().to_string()).into());
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
        Ok(Box::new(SpreadsheetReader::new(path)))
    } else {
        Err(WorkbookError::UnsupportedFormat(path.display().to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_LEARNMETRIC_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_LEARNMETRIC_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_LEARNMETRIC_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("no vars"), "no vars");
        std::env::remove_var("_LEARNMETRIC_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = LearnmetricConfig::default();
        assert_eq!(config.sheets.baseline, "WB-Baseline-English");
        assert_eq!(config.sheets.endline, "WB-Endline-English");
        assert_eq!(config.sheets.answer_key, "AnswerKey");
        assert_eq!(config.output_dir, PathBuf::from("./learnmetric-results"));
        assert_eq!(config.formats, vec!["json"]);
    }

    #[test]
    fn parse_partial_config() {
        let config = parse_config(
            r#"
output_dir = "out"
formats = ["json", "html"]

[sheets]
baseline = "Pre"
"#,
        )
        .unwrap();
        assert_eq!(config.sheets.baseline, "Pre");
        assert_eq!(config.sheets.endline, "WB-Endline-English");
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.formats, vec!["json", "html"]);
    }

    #[test]
    fn explicit_path_must_exist() {
        let err = load_config_from(Some(Path::new("/nonexistent/learnmetric.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn explicit_path_resolves_env_vars() {
        std::env::set_var("_LEARNMETRIC_KEY_SHEET", "Key2024");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[sheets]\nanswer_key = \"${_LEARNMETRIC_KEY_SHEET}\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.sheets.answer_key, "Key2024");
        std::env::remove_var("_LEARNMETRIC_KEY_SHEET");
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "formats = 3").unwrap();
        let err = load_config_from(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn open_reader_dispatches_on_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_reader(dir.path()).is_ok());

        let xlsx = dir.path().join("data.XLSX");
        std::fs::write(&xlsx, b"").unwrap();
        assert!(open_reader(&xlsx).is_ok());

        let txt = dir.path().join("data.txt");
        std::fs::write(&txt, b"").unwrap();
        let err = open_reader(&txt).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<WorkbookError>(),
            Some(WorkbookError::UnsupportedFormat(_))
        ));

        let err = open_reader(&dir.path().join("missing.ods")).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<WorkbookError>(),
            Some(WorkbookError::NotFound(_))
        ));
    }
}
