use crate::config::LogTargetConfiguration;
use crate::logs::registry::{NameFilter, RoutingRule, SinkRegistry};
use crate::logs::rollover::{prepare_log_file, SetupOutcome};
use crate::logs::{FileTarget, Layout, Severity};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of registering a target
#[derive(Debug)]
pub struct Registration {
    /// Name the target is registered under
    pub name: String,
    /// File the target writes to
    pub path: PathBuf,
    /// Severity the routing rule was built with
    pub min_severity: Severity,
    /// What happened to the backing file before registration
    pub setup: SetupOutcome,
}

/// LogTargetManager binds named file targets into a [`SinkRegistry`]
pub struct LogTargetManager {
    registry: Arc<SinkRegistry>,
}

impl LogTargetManager {
    /// Create a manager that registers targets into `registry`
    pub fn new(registry: Arc<SinkRegistry>) -> Self {
        Self { registry }
    }

    /// The registry targets are registered into
    pub fn registry(&self) -> &Arc<SinkRegistry> {
        &self.registry
    }

    /// Prepare the backing file and (re)register a target for `configuration`.
    ///
    /// The backing file is created if missing and archived if it grew past
    /// the rollover threshold. Failures there never stop registration; they
    /// are reported in [`Registration::setup`]. A target already registered
    /// under the same name is replaced.
    pub fn register_target(&self, configuration: &LogTargetConfiguration) -> Registration {
        let name = configuration.log_name.clone();
        let path = configuration.log_file_path.clone();

        let setup = prepare_log_file(&path);
        match &setup {
            SetupOutcome::Degraded(e) => tracing::warn!(
                log_name = %name,
                path = %path.display(),
                "Log file setup degraded: {}",
                e
            ),
            SetupOutcome::Archived { archive, lines } => tracing::info!(
                log_name = %name,
                "Archived {} lines to {}",
                lines,
                archive.display()
            ),
            _ => {}
        }

        let min_severity = match Severity::from_exact_name(&configuration.min_level) {
            Some(severity) => severity,
            None => {
                tracing::warn!(
                    log_name = %name,
                    "Unknown min level '{}', falling back to {}",
                    configuration.min_level,
                    Severity::Trace
                );
                Severity::Trace
            }
        };

        let mut table = self.registry.configuration().unwrap_or_default();
        table.remove_target(&name);
        table.add_target(FileTarget::new(
            name.as_str(),
            path.as_path(),
            Layout::parse(&configuration.log_layout),
        ));
        table.add_rule(RoutingRule::new(
            NameFilter::new(configuration.name_filter.as_str()),
            min_severity,
            name.as_str(),
        ));
        self.registry.activate(table);

        tracing::debug!("Using programmatic config");

        Registration {
            name,
            path,
            min_severity,
            setup,
        }
    }

    /// Register every configuration in order
    pub fn register_all(&self, configurations: &[LogTargetConfiguration]) -> Vec<Registration> {
        configurations
            .iter()
            .map(|configuration| self.register_target(configuration))
            .collect()
    }

    /// Remove a named target. No-op if it is not registered.
    pub fn remove_target(&self, name: &str) {
        if self.registry.remove_target(name) {
            tracing::debug!("Removed log target {}", name);
        }
    }

    /// Register a catch-all Trace target with the default layout
    pub fn create_default_target(&self, name: &str, path: impl AsRef<Path>) -> Registration {
        self.register_target(&LogTargetConfiguration::default_preset(
            name,
            path.as_ref(),
        ))
    }

    /// Register a catch-all Warn target with the error report layout
    pub fn create_error_report_target(&self, name: &str, path: impl AsRef<Path>) -> Registration {
        self.register_target(&LogTargetConfiguration::error_report_preset(
            name,
            path.as_ref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::{LogRecord, ROLLOVER_LINE_THRESHOLD};
    use std::fs;
    use tempfile::TempDir;

    fn manager() -> LogTargetManager {
        LogTargetManager::new(Arc::new(SinkRegistry::new()))
    }

    #[test]
    fn test_register_creates_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("x/app.log");
        let manager = manager();

        let registration = manager.register_target(
            &LogTargetConfiguration::new("app", &path).with_min_level("Warn"),
        );

        assert!(matches!(registration.setup, SetupOutcome::Created));
        assert_eq!(registration.min_severity, Severity::Warn);
        assert!(path.exists());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);

        let table = manager.registry().configuration().unwrap();
        assert_eq!(table.targets().len(), 1);
        assert_eq!(table.rules().len(), 1);
        assert_eq!(table.rules()[0].min_severity, Severity::Warn);
        assert_eq!(table.rules()[0].name_filter.pattern(), "*");
    }

    #[test]
    fn test_register_rolls_over_large_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        fs::write(&path, "entry\n".repeat(ROLLOVER_LINE_THRESHOLD + 1)).unwrap();

        let registration = manager().create_default_target("app", &path);

        let archive = registration.setup.archive().unwrap();
        assert_eq!(
            fs::read_to_string(archive).unwrap().lines().count(),
            ROLLOVER_LINE_THRESHOLD + 1
        );
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_reregister_replaces_target() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first.log");
        let second = temp_dir.path().join("second.log");
        let manager = manager();

        manager.create_default_target("app", &first);
        manager.create_default_target("app", &second);

        let table = manager.registry().configuration().unwrap();
        assert_eq!(table.targets().len(), 1);
        assert_eq!(table.rules().len(), 1);
        assert_eq!(table.target("app").unwrap().path(), second.as_path());

        manager
            .registry()
            .dispatch(&LogRecord::new(Severity::Info, "test", "hello"));
        assert_eq!(fs::metadata(&first).unwrap().len(), 0);
        assert!(fs::read_to_string(&second).unwrap().contains("hello"));
    }

    #[test]
    fn test_unknown_level_falls_back_to_trace() {
        let temp_dir = TempDir::new().unwrap();
        let registration = manager().register_target(
            &LogTargetConfiguration::new("app", temp_dir.path().join("app.log"))
                .with_min_level("Verbose"),
        );
        assert_eq!(registration.min_severity, Severity::Trace);
    }

    #[test]
    fn test_degraded_setup_still_registers() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let manager = manager();

        let registration = manager.create_default_target("app", blocker.join("app.log"));

        assert!(registration.setup.is_degraded());
        assert_eq!(manager.registry().target_names(), vec!["app".to_string()]);
    }

    #[test]
    fn test_remove_target() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager();

        // Uninitialized registry
        manager.remove_target("nonexistent");

        manager.create_error_report_target("errors", temp_dir.path().join("errors.log"));
        manager.remove_target("nonexistent");
        assert_eq!(manager.registry().target_names(), vec!["errors".to_string()]);

        manager.remove_target("errors");
        assert!(manager.registry().target_names().is_empty());
        assert!(manager.registry().configuration().unwrap().rules().is_empty());
    }

    #[test]
    fn test_register_all() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager();

        let registrations = manager.register_all(&[
            LogTargetConfiguration::default_preset("app", temp_dir.path().join("app.log")),
            LogTargetConfiguration::error_report_preset("errors", temp_dir.path().join("errors.log")),
        ]);

        assert_eq!(registrations.len(), 2);
        assert_eq!(registrations[1].min_severity, Severity::Warn);
        assert_eq!(manager.registry().target_names(), vec!["app", "errors"]);
    }
}
