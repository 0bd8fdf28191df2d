//! Engine configuration.
//!
//! Configuration is a plain value handed to [`TemplateEngine::new`](crate::TemplateEngine::new)
//! and shared read-only by every pass. There is no global configuration.

/// What happens to instantiations still deferred when a pass completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeferredPolicy {
    /// Report them as `NoImplementationFound` errors.
    #[default]
    FailOnComplete,
    /// Report them as pending warnings and produce no unit.
    ReportPending,
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deliver callback listeners on a dedicated dispatch thread. When false,
    /// or when that thread cannot be started, each notification is delivered
    /// on its own short-lived background thread.
    pub dispatch_lane: bool,
    /// Name of the dispatch thread.
    pub dispatch_thread_name: String,
    /// Separator used when deriving output names (`Comparer_Int32`).
    pub output_name_separator: String,
    /// Emit operator witness types next to units whose parameters require
    /// operators.
    pub emit_operator_witnesses: bool,
    /// How deferred instantiations are reported on completion.
    pub deferred_policy: DeferredPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dispatch_lane: true,
            dispatch_thread_name: "stencil-dispatch".to_string(),
            output_name_separator: "_".to_string(),
            emit_operator_witnesses: true,
            deferred_policy: DeferredPolicy::FailOnComplete,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dispatch_lane(mut self, enabled: bool) -> Self {
        self.dispatch_lane = enabled;
        self
    }

    pub fn with_dispatch_thread_name(mut self, name: impl Into<String>) -> Self {
        self.dispatch_thread_name = name.into();
        self
    }

    pub fn with_output_name_separator(mut self, separator: impl Into<String>) -> Self {
        self.output_name_separator = separator.into();
        self
    }

    pub fn with_operator_witnesses(mut self, enabled: bool) -> Self {
        self.emit_operator_witnesses = enabled;
        self
    }

    pub fn with_deferred_policy(mut self, policy: DeferredPolicy) -> Self {
        self.deferred_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert!(config.dispatch_lane);
        assert!(config.emit_operator_witnesses);
        assert_eq!(config.output_name_separator, "_");
        assert_eq!(config.deferred_policy, DeferredPolicy::FailOnComplete);
    }

    #[test]
    fn builder_methods() {
        let config = EngineConfig::new()
            .with_dispatch_lane(false)
            .with_dispatch_thread_name("lane")
            .with_output_name_separator("__")
            .with_operator_witnesses(false)
            .with_deferred_policy(DeferredPolicy::ReportPending);
        assert!(!config.dispatch_lane);
        assert_eq!(config.dispatch_thread_name, "lane");
        assert_eq!(config.output_name_separator, "__");
        assert!(!config.emit_operator_witnesses);
        assert_eq!(config.deferred_policy, DeferredPolicy::ReportPending);
    }
}
