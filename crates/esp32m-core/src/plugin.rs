//! Plugin registry.
//!
//! Plugins are named descriptors that may depend on other plugins. The
//! registry resolves dependencies depth-first, so every plugin is listed
//! after the plugins it uses. Loading or running plugin code is up to the
//! host application.

use std::collections::HashMap;
use std::sync::Arc;

/// Maximum dependency chain length.
pub const MAX_RECURSION: usize = 100;

/// A registrable plugin.
pub trait Plugin: Send + Sync {
    /// Unique plugin name.
    fn name(&self) -> &str;

    /// Plugins that must be registered before this one.
    fn uses(&self) -> Vec<Arc<dyn Plugin>> {
        Vec::new()
    }
}

/// Errors that can occur while registering plugins.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PluginError {
    #[error("Plugin must have a name")]
    EmptyName,

    #[error("Duplicate plugin: {0}")]
    Duplicate(String),

    #[error("Plugin dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("Plugin recursion is too deep")]
    TooDeep,
}

/// Registered plugins in dependency order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
    index: HashMap<String, usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin and, first, everything it uses.
    ///
    /// Returns the plugin's registration index. Dependencies registered
    /// before an error is detected stay registered.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<usize, PluginError> {
        let name = plugin.name();
        if name.is_empty() {
            return Err(PluginError::EmptyName);
        }
        if self.index.contains_key(name) {
            return Err(PluginError::Duplicate(name.to_string()));
        }
        let mut stack = Vec::new();
        self.register_with(plugin, &mut stack)
    }

    /// Register several plugins in order.
    pub fn register_all(
        &mut self,
        plugins: impl IntoIterator<Item = Arc<dyn Plugin>>,
    ) -> Result<Vec<usize>, PluginError> {
        plugins.into_iter().map(|p| self.register(p)).collect()
    }

    fn register_with(
        &mut self,
        plugin: Arc<dyn Plugin>,
        stack: &mut Vec<String>,
    ) -> Result<usize, PluginError> {
        if stack.len() >= MAX_RECURSION {
            return Err(PluginError::TooDeep);
        }
        stack.push(plugin.name().to_string());

        for dependency in plugin.uses() {
            let dep_name = dependency.name();
            if dep_name.is_empty() {
                return Err(PluginError::EmptyName);
            }
            if self.index.contains_key(dep_name) {
                continue;
            }
            if stack.iter().any(|n| n == dep_name) {
                let mut chain = stack.clone();
                chain.push(dep_name.to_string());
                return Err(PluginError::Cycle(chain));
            }
            self.register_with(dependency, stack)?;
        }

        stack.pop();
        let position = self.plugins.len();
        self.index.insert(plugin.name().to_string(), position);
        self.plugins.push(plugin);
        Ok(position)
    }

    pub fn find(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.index.get(name).map(|&i| &self.plugins[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All plugins in registration order.
    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    pub fn filter<'a>(
        &'a self,
        predicate: impl Fn(&dyn Plugin) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Arc<dyn Plugin>> + 'a {
        self.plugins.iter().filter(move |p| predicate(Arc::as_ref(*p)))
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestPlugin {
        name: &'static str,
        uses: Vec<&'static str>,
    }

    /// Dependency graph used by the tests; names resolve lazily so cycles
    /// can be expressed.
    fn plugin(name: &'static str) -> Arc<dyn Plugin> {
        let uses = match name {
            "ui" => vec!["backend", "i18n"],
            "backend" => vec!["i18n"],
            "wifi" => vec!["backend", "ui"],
            "a" => vec!["b"],
            "b" => vec!["c"],
            "c" => vec!["a"],
            "nameless-dep" => vec![""],
            _ => vec![],
        };
        Arc::new(TestPlugin { name, uses })
    }

    impl Plugin for TestPlugin {
        fn name(&self) -> &str {
            self.name
        }

        fn uses(&self) -> Vec<Arc<dyn Plugin>> {
            self.uses.iter().map(|&n| plugin(n)).collect()
        }
    }

    fn names(registry: &PluginRegistry) -> Vec<&str> {
        registry.plugins().iter().map(|p| p.name()).collect()
    }

    #[test]
    fn test_dependencies_first() {
        let mut registry = PluginRegistry::new();
        let index = registry.register(plugin("ui")).unwrap();
        assert_eq!(index, 2);
        assert_eq!(names(&registry), vec!["i18n", "backend", "ui"]);
    }

    #[test]
    fn test_shared_dependencies_registered_once() {
        let mut registry = PluginRegistry::new();
        registry
            .register_all([plugin("ui"), plugin("wifi")])
            .unwrap();
        assert_eq!(names(&registry), vec!["i18n", "backend", "ui", "wifi"]);
        assert!(registry.contains("backend"));
        assert_eq!(registry.find("wifi").unwrap().name(), "wifi");
        assert!(registry.find("mqtt").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = PluginRegistry::new();
        registry.register(plugin("backend")).unwrap();
        assert_eq!(
            registry.register(plugin("i18n")).unwrap_err(),
            PluginError::Duplicate("i18n".to_string())
        );
    }

    #[test]
    fn test_cycle_detected() {
        let mut registry = PluginRegistry::new();
        let err = registry.register(plugin("a")).unwrap_err();
        assert_eq!(
            err,
            PluginError::Cycle(vec!["a".into(), "b".into(), "c".into(), "a".into()])
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_empty_names_rejected() {
        let mut registry = PluginRegistry::new();
        assert_eq!(registry.register(plugin("")).unwrap_err(), PluginError::EmptyName);
        assert_eq!(
            registry.register(plugin("nameless-dep")).unwrap_err(),
            PluginError::EmptyName
        );
    }

    #[test]
    fn test_filter() {
        let mut registry = PluginRegistry::new();
        registry.register(plugin("wifi")).unwrap();
        let selected: Vec<&str> = registry
            .filter(|p| p.name().starts_with('b') || p.name() == "ui")
            .map(|p| p.name())
            .collect();
        assert_eq!(selected, vec!["backend", "ui"]);
    }
}
