use crate::error::{LogTargetError, Result};
use crate::logs::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Layout of the default preset target
pub const DEFAULT_LAYOUT: &str =
    r"${date:format=yyyy-MM-dd hh\:mm\:ss} | ${level} | ${logger} | ${message} ${exception}";

/// Terser layout of the error report preset target
pub const ERROR_REPORT_LAYOUT: &str = "${level} | ${message} ${exception}";

/// Configuration of one named log target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogTargetConfiguration {
    /// Target name (unique key among registered targets)
    #[serde(alias = "logName")]
    pub log_name: String,

    /// Path of the backing log file
    #[serde(alias = "logFilePath")]
    pub log_file_path: PathBuf,

    /// Line layout template
    #[serde(default = "default_layout", alias = "logLayout")]
    pub log_layout: String,

    /// Glob matched against logger names
    #[serde(default = "default_name_filter", alias = "nameFilter")]
    pub name_filter: String,

    /// Minimum severity name (`Trace`, `Debug`, `Info`, `Warn`, `Error`)
    #[serde(default = "default_min_level", alias = "minLevel")]
    pub min_level: String,

    /// Whether a viewer should open this log at startup
    #[serde(default, alias = "openOnStartUp")]
    pub open_on_start_up: bool,

    /// Whether a viewer should offer a button for this log
    #[serde(default, alias = "openOnButton")]
    pub open_on_button: bool,
}

// Default value functions for serde
fn default_layout() -> String {
    DEFAULT_LAYOUT.to_string()
}

fn default_name_filter() -> String {
    "*".to_string()
}

fn default_min_level() -> String {
    "Trace".to_string()
}

impl LogTargetConfiguration {
    /// Configuration with the default layout, catch-all filter and Trace minimum
    pub fn new(log_name: impl Into<String>, log_file_path: impl Into<PathBuf>) -> Self {
        Self {
            log_name: log_name.into(),
            log_file_path: log_file_path.into(),
            log_layout: default_layout(),
            name_filter: default_name_filter(),
            min_level: default_min_level(),
            open_on_start_up: false,
            open_on_button: false,
        }
    }

    /// Catch-all target recording everything from Trace up
    pub fn default_preset(log_name: impl Into<String>, log_file_path: impl Into<PathBuf>) -> Self {
        Self::new(log_name, log_file_path)
    }

    /// Catch-all target recording Warn and above with a terse layout
    pub fn error_report_preset(
        log_name: impl Into<String>,
        log_file_path: impl Into<PathBuf>,
    ) -> Self {
        Self::new(log_name, log_file_path)
            .with_layout(ERROR_REPORT_LAYOUT)
            .with_min_level("Warn")
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.log_layout = layout.into();
        self
    }

    pub fn with_name_filter(mut self, filter: impl Into<String>) -> Self {
        self.name_filter = filter.into();
        self
    }

    pub fn with_min_level(mut self, level: impl Into<String>) -> Self {
        self.min_level = level.into();
        self
    }

    /// Minimum severity as used for routing; unknown names map to Trace
    pub fn severity(&self) -> Severity {
        Severity::from_name_or_trace(&self.min_level)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.log_name.trim().is_empty() {
            return Err(LogTargetError::MissingConfigField("log_name".to_string()));
        }

        if self.log_file_path.as_os_str().is_empty() {
            return Err(LogTargetError::MissingConfigField(
                "log_file_path".to_string(),
            ));
        }

        if self.name_filter.is_empty() {
            return Err(LogTargetError::ConfigValidationError(format!(
                "name_filter of target '{}' is empty; use \"*\" to match every logger",
                self.log_name
            )));
        }

        // Catch typos here rather than silently widening the target to Trace
        if Severity::from_exact_name(&self.min_level).is_none() {
            let hint = self
                .min_level
                .parse::<Severity>()
                .map(|s| format!(" (did you mean '{}'?)", s))
                .unwrap_or_default();
            return Err(LogTargetError::ConfigValidationError(format!(
                "Invalid min_level '{}' for target '{}'{}. Must be one of: {}",
                self.min_level,
                self.log_name,
                hint,
                Severity::ALL.map(|s| s.as_str()).join(", ")
            )));
        }

        Ok(())
    }

    /// Expand environment variables in the log file path
    fn expand_env_vars(&mut self) {
        self.log_file_path = expand_env_in_path(&self.log_file_path);
    }
}

/// A set of target configurations loaded from a file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetsFile {
    #[serde(default)]
    pub targets: Vec<LogTargetConfiguration>,
}

impl TargetsFile {
    /// Load target configurations from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LogTargetError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let targets = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(LogTargetError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        let targets: Vec<LogTargetConfiguration> = targets
            .into_iter()
            .map(|mut config| {
                config.expand_env_vars();
                config
            })
            .collect();

        let file = Self { targets };
        file.validate()?;

        Ok(file)
    }

    /// Validate every target and check names are unique
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for config in &self.targets {
            config.validate()?;
            if !seen.insert(config.log_name.as_str()) {
                return Err(LogTargetError::ConfigValidationError(format!(
                    "Duplicate target name: {}",
                    config.log_name
                )));
            }
        }
        Ok(())
    }

    /// Parse TOML: either `[[targets]]` tables or a single top-level target
    fn parse_toml(contents: &str) -> Result<Vec<LogTargetConfiguration>> {
        #[derive(Deserialize)]
        struct ConfigFile {
            #[serde(default)]
            targets: Vec<LogTargetConfiguration>,
            #[serde(flatten)]
            single: Option<LogTargetConfiguration>,
        }

        let config_file: ConfigFile = toml::from_str(contents)
            .map_err(|e| LogTargetError::InvalidConfig(format!("Failed to parse TOML: {}", e)))?;

        if let Some(single) = config_file.single {
            Ok(vec![single])
        } else if !config_file.targets.is_empty() {
            Ok(config_file.targets)
        } else {
            Err(LogTargetError::InvalidConfig(
                "No target configuration found in file".to_string(),
            ))
        }
    }

    /// Parse JSON: either `{"targets": [...]}` or a single target object
    fn parse_json(contents: &str) -> Result<Vec<LogTargetConfiguration>> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ConfigFile {
            Single(LogTargetConfiguration),
            Multiple { targets: Vec<LogTargetConfiguration> },
        }

        let config_file: ConfigFile = serde_json::from_str(contents)
            .map_err(|e| LogTargetError::InvalidConfig(format!("Failed to parse JSON: {}", e)))?;

        match config_file {
            ConfigFile::Single(config) => Ok(vec![config]),
            ConfigFile::Multiple { targets } => {
                if targets.is_empty() {
                    Err(LogTargetError::InvalidConfig(
                        "No target configuration found in file".to_string(),
                    ))
                } else {
                    Ok(targets)
                }
            }
        }
    }
}

/// Expand `$VAR` and `${VAR}` references in a string
fn expand_env_in_string(s: &str) -> String {
    let mut result = s.to_string();

    // Longest names first so `$HOME_DIR` is not clobbered by `$HOME`
    let mut vars: Vec<(String, String)> = std::env::vars().collect();
    vars.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    for (key, value) in vars {
        result = result.replace(&format!("${{{}}}", key), &value);
        result = result.replace(&format!("${}", key), &value);
    }

    result
}

fn expand_env_in_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(expand_env_in_string(&path_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_presets() {
        let default = LogTargetConfiguration::default_preset("app", "/tmp/app.log");
        assert_eq!(default.log_layout, DEFAULT_LAYOUT);
        assert_eq!(default.name_filter, "*");
        assert_eq!(default.severity(), Severity::Trace);
        assert!(!default.open_on_start_up);

        let errors = LogTargetConfiguration::error_report_preset("errors", "/tmp/errors.log");
        assert_eq!(errors.log_layout, ERROR_REPORT_LAYOUT);
        assert_eq!(errors.name_filter, "*");
        assert_eq!(errors.severity(), Severity::Warn);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = LogTargetConfiguration::new("app", "/tmp/app.log").with_min_level("Error");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_name() {
        let config = LogTargetConfiguration::new("", "/tmp/app.log");
        assert!(matches!(
            config.validate(),
            Err(LogTargetError::MissingConfigField(_))
        ));
    }

    #[test]
    fn test_validate_empty_path() {
        let config = LogTargetConfiguration::new("app", "");
        assert!(matches!(
            config.validate(),
            Err(LogTargetError::MissingConfigField(_))
        ));
    }

    #[test]
    fn test_validate_misspelled_level() {
        let config = LogTargetConfiguration::new("app", "/tmp/app.log").with_min_level("warning");
        match config.validate() {
            Err(LogTargetError::ConfigValidationError(msg)) => {
                assert!(msg.contains("did you mean 'Warn'"), "{}", msg)
            }
            other => panic!("unexpected result: {:?}", other),
        }
        // Still routes, just at the most verbose level
        assert_eq!(config.severity(), Severity::Trace);
    }

    #[test]
    fn test_expand_env_vars_in_path_only() {
        std::env::set_var("LOGTARGET_TEST_DIR", "/var/tmp");

        let mut config = LogTargetConfiguration::new("app", "${LOGTARGET_TEST_DIR}/app.log")
            .with_layout("${level} $LOGTARGET_TEST_DIR");
        config.expand_env_vars();

        assert_eq!(config.log_file_path, PathBuf::from("/var/tmp/app.log"));
        assert_eq!(config.log_layout, "${level} $LOGTARGET_TEST_DIR");
    }

    #[test]
    fn test_expand_env_vars_without_braces() {
        std::env::set_var("LOGTARGET_BARE_DIR", "/srv/logs");

        let mut config = LogTargetConfiguration::new("app", "$LOGTARGET_BARE_DIR/app.log");
        config.expand_env_vars();

        assert_eq!(config.log_file_path, PathBuf::from("/srv/logs/app.log"));
    }

    #[test]
    fn test_parse_toml_single() {
        let toml_content = r#"
            log_name = "app"
            log_file_path = "/tmp/app.log"
            min_level = "Info"
        "#;

        let targets = TargetsFile::parse_toml(toml_content).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].log_name, "app");
        assert_eq!(targets[0].name_filter, "*");
        assert_eq!(targets[0].log_layout, DEFAULT_LAYOUT);
        assert_eq!(targets[0].severity(), Severity::Info);
    }

    #[test]
    fn test_parse_toml_multiple() {
        let toml_content = r#"
            [[targets]]
            log_name = "app"
            log_file_path = "/tmp/app.log"

            [[targets]]
            log_name = "db"
            log_file_path = "/tmp/db.log"
            name_filter = "app::db*"
            min_level = "Warn"
        "#;

        let targets = TargetsFile::parse_toml(toml_content).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].name_filter, "app::db*");
        assert_eq!(targets[1].severity(), Severity::Warn);
    }

    #[test]
    fn test_parse_json_camel_case() {
        let json_content = r#"
            {
                "logName": "app",
                "logFilePath": "/tmp/app.log",
                "minLevel": "Debug",
                "openOnStartUp": true
            }
        "#;

        let targets = TargetsFile::parse_json(json_content).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].severity(), Severity::Debug);
        assert!(targets[0].open_on_start_up);
        assert!(!targets[0].open_on_button);
    }

    #[test]
    fn test_parse_json_multiple() {
        let json_content = r#"
            {
                "targets": [
                    { "log_name": "app", "log_file_path": "/tmp/app.log" },
                    { "log_name": "errors", "log_file_path": "/tmp/errors.log", "min_level": "Error" }
                ]
            }
        "#;

        let targets = TargetsFile::parse_json(json_content).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].severity(), Severity::Error);
    }

    #[test]
    fn test_from_file_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("targets.toml");

        fs::write(
            &config_path,
            r#"
                [[targets]]
                log_name = "app"
                log_file_path = "/tmp/app.log"
            "#,
        )
        .unwrap();

        let file = TargetsFile::from_file(&config_path).unwrap();
        assert_eq!(file.targets.len(), 1);
        assert_eq!(file.targets[0].log_name, "app");
    }

    #[test]
    fn test_from_file_duplicate_names() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("targets.json");

        fs::write(
            &config_path,
            r#"{"targets": [
                {"log_name": "app", "log_file_path": "/tmp/a.log"},
                {"log_name": "app", "log_file_path": "/tmp/b.log"}
            ]}"#,
        )
        .unwrap();

        assert!(matches!(
            TargetsFile::from_file(&config_path),
            Err(LogTargetError::ConfigValidationError(_))
        ));
    }

    #[test]
    fn test_from_file_unsupported_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("targets.yaml");

        fs::write(&config_path, "log_name: app").unwrap();

        let result = TargetsFile::from_file(&config_path);
        assert!(matches!(result, Err(LogTargetError::InvalidConfig(_))));
    }
}
