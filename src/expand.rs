//! Build-variable expansion for configured command text.
//!
//! `$NAME` and `${NAME}` are replaced from the build environment. Unknown
//! variables are left as written so a typo shows up in the tracker verbatim
//! rather than silently vanishing.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("variable pattern is valid")
});

/// Variables available to expansion, usually the build's environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn new(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            vars: vars.into_iter().collect(),
        }
    }

    /// The current process environment.
    pub fn from_process() -> Self {
        Self::new(std::env::vars())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// A copy with one more variable set.
    #[must_use]
    pub fn with(&self, name: &str, value: &str) -> Self {
        let mut vars = self.vars.clone();
        vars.insert(name.to_string(), value.to_string());
        Self { vars }
    }

    /// Expand `$NAME` and `${NAME}` references in `text`.
    pub fn expand(&self, text: &str) -> String {
        VARIABLE
            .replace_all(text, |caps: &Captures<'_>| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map_or("", |m| m.as_str());
                match self.get(name) {
                    Some(value) => value.to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::new([
            ("BUILD_NUMBER".to_string(), "42".to_string()),
            ("JOB_NAME".to_string(), "app".to_string()),
        ])
    }

    #[test]
    fn expands_braced_and_bare_references() {
        assert_eq!(
            env().expand("Fixed in build: ${BUILD_NUMBER} ($JOB_NAME)"),
            "Fixed in build: 42 (app)"
        );
    }

    #[test]
    fn leaves_unknown_variables() {
        assert_eq!(env().expand("${NOPE} and $ALSO_NOPE"), "${NOPE} and $ALSO_NOPE");
    }

    #[test]
    fn text_without_variables_is_unchanged() {
        assert_eq!(env().expand("Fixed"), "Fixed");
        assert_eq!(env().expand("costs $5"), "costs $5");
    }

    #[test]
    fn with_adds_a_variable() {
        let env = env().with("YOUTRACK_BUILD_NAME", "42 (app)");
        assert_eq!(env.expand("${YOUTRACK_BUILD_NAME}"), "42 (app)");
    }
}
