use std::collections::BTreeMap;

use crate::rule::Rule;

/// Rules keyed by target name. Registering a target twice replaces the
/// earlier rule.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    rules: BTreeMap<String, Rule>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rule previously registered for the same target, if any.
    pub fn register(&mut self, rule: Rule) -> Option<Rule> {
        self.rules.insert(rule.target.clone(), rule)
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.register(rule);
        self
    }

    pub fn get(&self, target: &str) -> Option<&Rule> {
        self.rules.get(target)
    }

    pub fn contains(&self, target: &str) -> bool {
        self.rules.contains_key(target)
    }

    pub fn remove(&mut self, target: &str) -> Option<Rule> {
        self.rules.remove(target)
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<Rule> for Registry {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        let mut registry = Registry::new();
        for rule in iter {
            registry.register(rule);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_registration_wins() {
        let mut registry = Registry::new();
        assert!(registry.register(Rule::new("a.o").dep("a.c")).is_none());

        let previous = registry.register(Rule::new("a.o").dep("a.cpp"));
        assert_eq!(previous.unwrap().deps.resolve(), vec!["a.c"]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a.o").unwrap().deps.resolve(), vec!["a.cpp"]);
    }

    #[test]
    fn test_targets_are_sorted() {
        let registry: Registry = [Rule::new("b"), Rule::new("a"), Rule::phony("all")]
            .into_iter()
            .collect();
        assert_eq!(registry.targets().collect::<Vec<_>>(), vec!["a", "all", "b"]);
    }
}
