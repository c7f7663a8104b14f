//! ytlink configuration.
//!
//! Loaded from `config.toml` under the storage root (`~/.ytlink/` unless
//! `YTLINK_HOME` is set). The `[site]` table describes how a tracker site is
//! used; the `[tracker]` table names the bridge program that talks to it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::FixedValues;
use crate::model::FailureMode;
use crate::scan::PrefixAliases;

/// ytlink configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub site: SiteConfig,

    #[serde(default)]
    pub tracker: TrackerConfig,
}

/// How a tracker site is used by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SiteConfig {
    /// Site name, recorded on every command result.
    pub name: String,

    /// Base URL of the tracker, used for display only.
    pub url: String,

    /// Post a "related build" comment on every mentioned issue.
    pub comments_enabled: bool,

    /// Execute `#ISSUE-1 command` annotations.
    pub commands_enabled: bool,

    /// Apply commands as the tracker user matching the author's e-mail.
    pub run_as_enabled: bool,

    /// Apply commands without notifying watchers.
    pub silent_commands: bool,

    /// Post related-build comments without notifying watchers.
    pub silent_links: bool,

    /// Group the related-build comments are visible to.
    pub link_visibility: Option<String>,

    /// Issue field holding the state. Defaults to `State`.
    pub state_field_name: Option<String>,

    /// State values that count as fixed. Defaults to `Fixed`.
    pub fixed_values: Vec<String>,

    /// Project short names commands may be applied to. Empty means all.
    pub execute_project_limits: Vec<String>,

    /// Remember processed revisions so re-runs don't apply commands twice.
    pub track_commits: bool,

    /// What a tracker failure does to the build.
    pub failure_mode: FailureMode,

    /// Phrases before `#` that imply an extra command, e.g. `Fixes` → `Fixed`.
    pub prefix_commands: Vec<PrefixCommand>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "youtrack".to_string(),
            url: String::new(),
            comments_enabled: true,
            commands_enabled: true,
            run_as_enabled: false,
            silent_commands: false,
            silent_links: false,
            link_visibility: None,
            state_field_name: None,
            fixed_values: Vec::new(),
            execute_project_limits: Vec::new(),
            track_commits: false,
            failure_mode: FailureMode::None,
            prefix_commands: Vec::new(),
        }
    }
}

impl SiteConfig {
    pub fn state_field(&self) -> &str {
        match self.state_field_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.trim(),
            _ => "State",
        }
    }

    pub fn fixed_values(&self) -> FixedValues {
        FixedValues::new(&self.fixed_values)
    }

    pub fn prefix_aliases(&self) -> PrefixAliases {
        PrefixAliases::new(
            self.prefix_commands
                .iter()
                .map(|p| (p.prefix.as_str(), p.command.as_str())),
        )
    }

    /// Visibility group for related-build comments; blank means unrestricted.
    pub fn link_group(&self) -> Option<&str> {
        self.link_visibility
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }
}

/// A configured prefix alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PrefixCommand {
    pub prefix: String,
    pub command: String,
}

/// The bridge program that talks to the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TrackerConfig {
    pub program: String,

    /// Arguments placed before every subcommand (e.g. a server URL).
    pub args: Vec<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            program: "youtrack-bridge".to_string(),
            args: Vec::new(),
        }
    }
}

impl Config {
    /// Load config from `config.toml` under the given root.
    /// Returns an error if the file is missing or invalid.
    pub fn load(root: &Path) -> Result<Self, String> {
        let path = Self::path(root);

        if !path.exists() {
            return Err(format!(
                "no config file found at {}\n\
                 Create one with at minimum:\n\n\
                 [site]\n\
                 name = \"my-youtrack\"",
                path.display()
            ));
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;

        Self::parse(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// Parse config text.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(contents).map_err(|e| e.to_string())?;

        if config.site.name.trim().is_empty() {
            return Err("site.name is empty".to_string());
        }
        if config.tracker.program.trim().is_empty() {
            return Err("tracker.program is empty".to_string());
        }

        Ok(config)
    }

    /// The config file path: `<root>/config.toml`.
    pub fn path(root: &Path) -> PathBuf {
        root.join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_site_table() {
        let config = Config::parse(
            r#"
            [site]
            name = "testsite"
            url = "http://test.com"
            run-as-enabled = true
            link-visibility = "developers"
            state-field-name = "Status"
            fixed-values = ["Fixed", "Verified"]
            execute-project-limits = ["TP1"]
            track-commits = true
            failure-mode = "unstable"

            [[site.prefix-commands]]
            prefix = "Fixes"
            command = "Fixed"

            [tracker]
            program = "yt"
            args = ["--server", "http://test.com"]
            "#,
        )
        .unwrap();

        assert_eq!(config.site.name, "testsite");
        assert!(config.site.commands_enabled);
        assert!(config.site.track_commits);
        assert_eq!(config.site.failure_mode, FailureMode::Unstable);
        assert_eq!(config.site.state_field(), "Status");
        assert_eq!(config.site.link_group(), Some("developers"));
        assert!(config.site.fixed_values().contains("Verified"));
        assert_eq!(
            config.site.prefix_aliases().resolve("This fixes"),
            Some("Fixed")
        );
        assert_eq!(config.tracker.program, "yt");
    }

    #[test]
    fn defaults_apply_for_missing_keys() {
        let config = Config::parse("[site]\nname = \"s\"\n").unwrap();
        assert_eq!(config.site.state_field(), "State");
        assert!(config.site.fixed_values().contains("Fixed"));
        assert_eq!(config.site.link_group(), None);
        assert_eq!(config.tracker.program, "youtrack-bridge");
    }

    #[test]
    fn rejects_empty_site_name() {
        assert!(Config::parse("[site]\nname = \"  \"\n").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(err.contains("no config file found"));
    }
}
