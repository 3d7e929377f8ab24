//! Rewrite configuration

/// Configuration for loop rewriting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteConfig {
    /// Whether to keep going after a region fails to rewrite
    pub continue_on_error: bool,
    /// Whether to drop nodes no graph output depends on after rewriting
    pub prune_dead_nodes: bool,
    /// Name scope for generated `Scan` nodes
    pub scan_scope: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            prune_dead_nodes: true,
            scan_scope: "custom_rnn_scan".to_string(),
        }
    }
}

impl RewriteConfig {
    /// Set whether to continue after a failed region
    pub fn continue_on_error(mut self, enable: bool) -> Self {
        self.continue_on_error = enable;
        self
    }

    /// Set whether to prune dead nodes
    pub fn prune_dead_nodes(mut self, enable: bool) -> Self {
        self.prune_dead_nodes = enable;
        self
    }

    /// Set the scope for generated `Scan` nodes
    pub fn scan_scope(mut self, scope: &str) -> Self {
        self.scan_scope = scope.to_string();
        self
    }
}
