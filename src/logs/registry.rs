//! Live routing table shared between target registration and event dispatch.
//!
//! [`SinkRegistry`] is created explicitly and passed to whoever needs it:
//! the [`LogTargetManager`](super::LogTargetManager) mutates it, and
//! [`RoutingLayer`] plugs it into a `tracing` subscriber.

use super::severity::Severity;
use super::target::{FileTarget, LogRecord};
use chrono::Local;
use glob::Pattern;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Glob matcher for logger names, using `glob` pattern syntax
/// (`*`, `?`, `[...]` classes). A pattern that fails to compile is
/// matched literally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFilter {
    raw: String,
    pattern: Option<Pattern>,
}

impl NameFilter {
    pub fn new(pattern: impl Into<String>) -> Self {
        let raw = pattern.into();
        let pattern = Pattern::new(&raw)
            .or_else(|_| Pattern::new(&Pattern::escape(&raw)))
            .ok();

        Self { raw, pattern }
    }

    /// Filter that matches every logger
    pub fn any() -> Self {
        Self::new("*")
    }

    /// The pattern as configured
    pub fn pattern(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, name: &str) -> bool {
        match &self.pattern {
            Some(pattern) => pattern.matches(name),
            None => name == self.raw,
        }
    }
}

/// Binding of (name filter, minimum severity) to a named target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRule {
    pub name_filter: NameFilter,
    pub min_severity: Severity,
    pub target_name: String,
}

impl RoutingRule {
    pub fn new(name_filter: NameFilter, min_severity: Severity, target_name: impl Into<String>) -> Self {
        Self {
            name_filter,
            min_severity,
            target_name: target_name.into(),
        }
    }

    pub fn matches(&self, record: &LogRecord) -> bool {
        self.min_severity.permits(record.severity) && self.name_filter.matches(&record.logger)
    }
}

/// Named targets plus the rules that route records to them
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    targets: Vec<FileTarget>,
    rules: Vec<RoutingRule>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target, replacing any target with the same name
    pub fn add_target(&mut self, target: FileTarget) {
        match self.targets.iter_mut().find(|t| t.name() == target.name()) {
            Some(existing) => *existing = target,
            None => self.targets.push(target),
        }
    }

    /// Remove a target and every rule bound to it. Returns whether it existed.
    pub fn remove_target(&mut self, name: &str) -> bool {
        let before = self.targets.len();
        self.targets.retain(|t| t.name() != name);
        self.rules.retain(|r| r.target_name != name);
        self.targets.len() != before
    }

    pub fn add_rule(&mut self, rule: RoutingRule) {
        self.rules.push(rule);
    }

    pub fn target(&self, name: &str) -> Option<&FileTarget> {
        self.targets.iter().find(|t| t.name() == name)
    }

    pub fn targets(&self) -> &[FileTarget] {
        &self.targets
    }

    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    /// Targets a record is routed to, once per matching rule
    pub fn route<'a>(&'a self, record: &'a LogRecord) -> impl Iterator<Item = &'a FileTarget> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.matches(record))
            .filter_map(move |rule| self.target(&rule.target_name))
    }
}

/// Holder of the active routing table.
///
/// Starts uninitialized. Mutations are last-writer-wins: callers read a
/// snapshot with [`configuration`](Self::configuration), change it and
/// install it with [`activate`](Self::activate).
#[derive(Debug, Default)]
pub struct SinkRegistry {
    active: RwLock<Option<RoutingTable>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the active table, `None` if nothing was activated yet
    pub fn configuration(&self) -> Option<RoutingTable> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install `table` as the active configuration
    pub fn activate(&self, table: RoutingTable) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(table);
    }

    /// Remove a named target from the active table.
    /// No-op when the table is uninitialized or the name is absent.
    pub fn remove_target(&self, name: &str) -> bool {
        self.active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
            .is_some_and(|table| table.remove_target(name))
    }

    pub fn is_active(&self) -> bool {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Names of the currently registered targets
    pub fn target_names(&self) -> Vec<String> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|table| table.targets().iter().map(|t| t.name().to_string()).collect())
            .unwrap_or_default()
    }

    /// Write `record` to every target whose rule matches.
    /// Returns the number of successful writes; write failures are dropped.
    pub fn dispatch(&self, record: &LogRecord) -> usize {
        let guard = self.active.read().unwrap_or_else(PoisonError::into_inner);
        let Some(table) = guard.as_ref() else {
            return 0;
        };

        let written = table
            .route(record)
            .filter(|target| target.write(record).is_ok())
            .count();
        written
    }
}

/// `tracing` layer feeding every event into a [`SinkRegistry`]
pub struct RoutingLayer {
    registry: Arc<SinkRegistry>,
}

impl RoutingLayer {
    pub fn new(registry: Arc<SinkRegistry>) -> Self {
        Self { registry }
    }
}

impl<S> Layer<S> for RoutingLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        let record = LogRecord {
            timestamp: Local::now(),
            severity: Severity::from(*metadata.level()),
            logger: metadata.target().to_string(),
            message: visitor.message(),
            exception: visitor.exception,
        };

        self.registry.dispatch(&record);
    }
}

/// Visitor splitting event fields into message, exception and the rest
#[derive(Default)]
struct RecordVisitor {
    message: String,
    exception: Option<String>,
    fields: Vec<String>,
}

impl RecordVisitor {
    fn message(&self) -> String {
        if self.fields.is_empty() {
            self.message.clone()
        } else if self.message.is_empty() {
            self.fields.join(" ")
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl Visit for RecordVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{:?}", value),
            "error" | "exception" => self.exception = Some(format!("{:?}", value)),
            name => self.fields.push(format!("{}={:?}", name, value)),
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "error" | "exception" => self.exception = Some(value.to_string()),
            name => self.fields.push(format!("{}={}", name, value)),
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "error" | "exception" => self.exception = Some(value.to_string()),
            name => self.fields.push(format!("{}={}", name, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::Layout;
    use std::fs;
    use tempfile::TempDir;
    use tracing_subscriber::layer::SubscriberExt;

    fn target(dir: &TempDir, name: &str) -> FileTarget {
        FileTarget::new(
            name,
            dir.path().join(format!("{}.log", name)),
            Layout::parse("${level}|${logger}|${message}|${exception}"),
        )
    }

    #[test]
    fn test_name_filter() {
        assert!(NameFilter::any().matches(""));
        assert!(NameFilter::any().matches("app::db"));
        assert!(NameFilter::new("app::*").matches("app::db"));
        assert!(!NameFilter::new("app::*").matches("other::db"));
        assert!(NameFilter::new("*::db").matches("app::db"));
        assert!(NameFilter::new("*db*").matches("app::db::pool"));
        assert!(NameFilter::new("app?").matches("app1"));
        assert!(!NameFilter::new("app?").matches("app"));
        assert!(NameFilter::new("app").matches("app"));
        assert!(!NameFilter::new("app").matches("app::db"));
        assert!(NameFilter::new("a*b*c").matches("aXXbYYbc"));
    }

    #[test]
    fn test_name_filter_character_classes() {
        assert!(NameFilter::new("[ab]*").matches("app"));
        assert!(NameFilter::new("[ab]*").matches("billing"));
        assert!(!NameFilter::new("[ab]*").matches("core"));
        assert!(NameFilter::new("app[0-9]").matches("app7"));
        assert!(!NameFilter::new("app[1]").matches("app[1]"));
    }

    #[test]
    fn test_invalid_name_filter_matches_literally() {
        let filter = NameFilter::new("app[");
        assert_eq!(filter.pattern(), "app[");
        assert!(filter.matches("app["));
        assert!(!filter.matches("app"));
    }

    #[test]
    fn test_rule_matches_severity_and_name() {
        let rule = RoutingRule::new(NameFilter::new("app*"), Severity::Warn, "t");

        assert!(rule.matches(&LogRecord::new(Severity::Warn, "app", "m")));
        assert!(rule.matches(&LogRecord::new(Severity::Error, "app::x", "m")));
        assert!(!rule.matches(&LogRecord::new(Severity::Info, "app", "m")));
        assert!(!rule.matches(&LogRecord::new(Severity::Error, "lib", "m")));
    }

    #[test]
    fn test_table_replaces_and_removes_targets() {
        let dir = TempDir::new().unwrap();
        let mut table = RoutingTable::new();

        table.add_target(target(&dir, "a"));
        table.add_target(FileTarget::new("a", dir.path().join("other.log"), Layout::default()));
        table.add_rule(RoutingRule::new(NameFilter::any(), Severity::Trace, "a"));

        assert_eq!(table.targets().len(), 1);
        assert_eq!(table.target("a").unwrap().path(), dir.path().join("other.log"));

        assert!(table.remove_target("a"));
        assert!(table.rules().is_empty());
        assert!(!table.remove_target("a"));
    }

    #[test]
    fn test_registry_uninitialized() {
        let registry = SinkRegistry::new();

        assert!(!registry.is_active());
        assert!(registry.configuration().is_none());
        assert!(!registry.remove_target("missing"));
        assert_eq!(registry.dispatch(&LogRecord::new(Severity::Error, "app", "m")), 0);
        assert!(registry.target_names().is_empty());
    }

    #[test]
    fn test_registry_dispatch() {
        let dir = TempDir::new().unwrap();
        let mut table = RoutingTable::new();
        table.add_target(target(&dir, "all"));
        table.add_target(target(&dir, "errors"));
        table.add_rule(RoutingRule::new(NameFilter::any(), Severity::Trace, "all"));
        table.add_rule(RoutingRule::new(NameFilter::any(), Severity::Error, "errors"));

        let registry = SinkRegistry::new();
        registry.activate(table);

        assert_eq!(registry.dispatch(&LogRecord::new(Severity::Info, "app", "hello")), 1);
        assert_eq!(
            registry.dispatch(&LogRecord::new(Severity::Error, "app", "bad").with_exception("boom")),
            2
        );

        let all = fs::read_to_string(dir.path().join("all.log")).unwrap();
        let errors = fs::read_to_string(dir.path().join("errors.log")).unwrap();
        assert_eq!(all, "Info|app|hello|\nError|app|bad|boom\n");
        assert_eq!(errors, "Error|app|bad|boom\n");
    }

    #[test]
    fn test_routing_layer_captures_tracing_events() {
        let dir = TempDir::new().unwrap();
        let mut table = RoutingTable::new();
        table.add_target(target(&dir, "app"));
        table.add_rule(RoutingRule::new(NameFilter::new("routing*"), Severity::Info, "app"));

        let registry = Arc::new(SinkRegistry::new());
        registry.activate(table);

        let subscriber =
            tracing_subscriber::registry().with(RoutingLayer::new(Arc::clone(&registry)));
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(target: "routing", "too verbose");
            tracing::info!(target: "routing", attempt = 3, "started");
            tracing::error!(target: "routing", error = "disk full", "write failed");
            tracing::warn!(target: "routing", exception = ?"stack overflow", "retrying");
            tracing::error!(target: "elsewhere", "not routed");
        });

        let content = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert_eq!(
            content,
            "Info|routing|started attempt=3|\n\
             Error|routing|write failed|disk full\n\
             Warn|routing|retrying|\"stack overflow\"\n"
        );
    }
}
