use log::{debug, info, warn};

/// Thin wrapper over the `log` facade that tags every line with the stage
/// or chunk it came from.
#[derive(Debug, Clone)]
pub struct LogManager {
    scope: String,
}

impl LogManager {
    pub fn new() -> Self {
        Self::scoped("sonar")
    }

    pub fn scoped(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    /// Child logger, e.g. `rectify` -> `rectify/chunk 3`.
    pub fn child(&self, name: impl std::fmt::Display) -> Self {
        Self::scoped(format!("{}/{}", self.scope, name))
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.scope, message);
    }

    pub fn detail(&self, message: &str) {
        debug!("[{}] {}", self.scope, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.scope, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_scopes_nest() {
        let logger = LogManager::scoped("rectify").child("chunk 3");
        assert_eq!(logger.scope(), "rectify/chunk 3");
        assert_eq!(LogManager::default().scope(), "sonar");
    }
}
