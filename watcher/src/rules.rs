//! Sentinel to target mapping.

/// A manifest file and the generated directory that sits next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    /// Manifest file name, e.g. `package.json`.
    pub sentinel: &'static str,

    /// Sibling directory name, e.g. `node_modules`.
    pub target: &'static str,
}

impl Rule {
    /// Create a rule.
    pub const fn new(sentinel: &'static str, target: &'static str) -> Self {
        Self { sentinel, target }
    }
}

/// Sentinel/target pairs checked by default, in evaluation order.
pub const DEFAULT_RULES: &[Rule] = &[
    Rule::new("package.json", "node_modules"),
    Rule::new("composer.json", "vendor"),
    Rule::new("requirements.txt", "venv"),
    Rule::new("Gemfile", "vendor"),
    Rule::new("Cargo.toml", "target"),
];

/// Fixed, ordered list of rules.
///
/// The table is tiny, so lookups are linear scans.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Create a table from an explicit rule list.
    pub fn new(rules: impl Into<Vec<Rule>>) -> Self {
        Self {
            rules: rules.into(),
        }
    }

    /// Target directory for a sentinel file name.
    pub fn forward(&self, filename: &str) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|rule| rule.sentinel == filename)
            .map(|rule| rule.target)
    }

    /// Sentinel file name for a target directory, first match wins.
    pub fn backward(&self, filename: &str) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|rule| rule.target == filename)
            .map(|rule| rule.sentinel)
    }

    /// All rules, in order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(DEFAULT_RULES)
    }
}
