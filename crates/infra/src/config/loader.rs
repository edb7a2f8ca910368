//! Configuration loader
//!
//! Loads process settings from a config file with environment overrides
//! on top, and the household rules document from its own path.
//!
//! ## Loading Strategy
//! 1. Probe standard locations for a config file (JSON or TOML)
//! 2. Apply `SATCHEL_*` environment overrides
//! 3. Anything missing falls back to the built-in defaults
//!
//! Configuration can never fail the process: a broken file is logged and
//! ignored. Rules follow the same policy, degrading to the bundled
//! template.
//!
//! ## File Locations
//! The loader probes (in order): `./config.{json,toml}`,
//! `./satchel.{json,toml}`, the same names one and two directories up,
//! then next to the executable.

use std::path::{Path, PathBuf};

use satchel_domain::config::{PipelineConfig, RuntimeConfig};
use satchel_domain::{Result, SatchelError};
use tracing::{debug, info, warn};

const FILE_NAMES: [&str; 4] = ["config.json", "config.toml", "satchel.json", "satchel.toml"];

/// Load the runtime configuration. Never fails; see module docs.
pub fn load() -> RuntimeConfig {
    let mut config = match probe_config_paths() {
        Some(path) => match load_from_file(&path) {
            Ok(config) => {
                info!(path = %path.display(), "configuration loaded");
                config
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "config file unusable, using defaults");
                RuntimeConfig::default()
            }
        },
        None => {
            debug!("no config file found, using defaults");
            RuntimeConfig::default()
        }
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

/// Load the household rules document. A missing or broken document
/// degrades to the bundled template so a run always has rules to apply.
pub fn load_rules(path: Option<&str>) -> PipelineConfig {
    let Some(path) = path else {
        debug!("no rules path configured, using bundled template");
        return PipelineConfig::default();
    };

    match read_rules(Path::new(path)) {
        Ok(rules) => {
            info!(path, "household rules loaded");
            rules
        }
        Err(err) => {
            warn!(path, error = %err, "rules document unusable, using bundled template");
            PipelineConfig::default()
        }
    }
}

fn read_rules(path: &Path) -> Result<PipelineConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|err| SatchelError::Config(format!("failed to read rules: {err}")))?;
    parse_document(&contents, path)
}

fn load_from_file(path: &Path) -> Result<RuntimeConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|err| SatchelError::Config(format!("failed to read config: {err}")))?;
    parse_document(&contents, path)
}

/// Format is chosen by extension; anything that is not TOML is treated
/// as JSON.
fn parse_document<T: serde::de::DeserializeOwned>(contents: &str, path: &Path) -> Result<T> {
    let is_toml = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(contents).map_err(|err| SatchelError::Config(format!("invalid TOML: {err}")))
    } else {
        serde_json::from_str(contents)
            .map_err(|err| SatchelError::Config(format!("invalid JSON: {err}")))
    }
}

fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    for base in ["./", "../", "../../"] {
        for name in FILE_NAMES {
            candidates.push(PathBuf::from(base).join(name));
        }
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf))
    {
        for name in FILE_NAMES {
            candidates.push(exe_dir.join(name));
        }
    }
    candidates.into_iter().find(|path| path.exists())
}

/// Environment overrides win over file values. Unparseable values are
/// logged and ignored.
fn apply_env_overrides(config: &mut RuntimeConfig, get: impl Fn(&str) -> Option<String>) {
    if let Some(value) = get("SATCHEL_STATE_PATH") {
        config.state_path = value;
    }
    if let Some(value) = get("SATCHEL_RULES_PATH") {
        config.rules_path = Some(value);
    }
    if let Some(value) = get("SATCHEL_BACKFILL_DAYS") {
        match value.parse() {
            Ok(days) => config.backfill_days = days,
            Err(_) => warn!(value, "ignoring invalid SATCHEL_BACKFILL_DAYS"),
        }
    }

    if let Some(value) = get("SATCHEL_GEMINI_API_KEY") {
        config.oracle.api_key = value;
    }
    if let Some(value) = get("SATCHEL_GEMINI_MODEL") {
        config.oracle.model = value;
    }
    if let Some(value) = get("SATCHEL_ORACLE_BASE_URL") {
        config.oracle.base_url = value;
    }

    if let Some(value) = get("SATCHEL_MAIL_TOKEN") {
        config.mail.token = value;
    }
    if let Some(value) = get("SATCHEL_MAIL_BASE_URL") {
        config.mail.base_url = value;
    }
    if let Some(value) = get("SATCHEL_MAIL_ENABLED") {
        config.mail.enabled = parse_bool(&value, config.mail.enabled);
    }

    if let Some(value) = get("SATCHEL_PORTAL_AGENT_URL") {
        config.portal.agent_url = value;
    }
    if let Some(value) = get("SATCHEL_PORTAL_PAGES") {
        config.portal.pages =
            value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect();
    }
    if let Some(value) = get("SATCHEL_PORTAL_ENABLED") {
        config.portal.enabled = parse_bool(&value, config.portal.enabled);
    }

    if let Some(value) = get("SATCHEL_CALENDAR_TOKEN") {
        config.calendar.token = value;
    }
    if let Some(value) = get("SATCHEL_CALENDAR_ID") {
        config.calendar.calendar_id = value;
    }
    if let Some(value) = get("SATCHEL_CALENDAR_BASE_URL") {
        config.calendar.base_url = value;
    }

    if let Some(value) = get("SATCHEL_CRON") {
        config.scheduler.cron = value;
    }
    if let Some(value) = get("SATCHEL_SCHEDULER_ENABLED") {
        config.scheduler.enabled = parse_bool(&value, config.scheduler.enabled);
    }
    if let Some(value) = get("SATCHEL_BIND") {
        config.server.bind = value;
    }
}

fn parse_bool(value: &str, fallback: bool) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => true,
        "false" | "0" | "no" => false,
        _ => {
            warn!(value, "ignoring invalid boolean override");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn toml_config_parses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
state_path = "/var/lib/satchel/state.json"
backfill_days = 30

[oracle]
api_key = "k"
model = "gemini-1.5-flash"

[scheduler]
cron = "0 0 * * * *"
"#,
        )
        .unwrap();

        let config = load_from_file(&path).expect("should parse");
        assert_eq!(config.state_path, "/var/lib/satchel/state.json");
        assert_eq!(config.backfill_days, 30);
        assert_eq!(config.oracle.model, "gemini-1.5-flash");
        assert_eq!(config.scheduler.cron, "0 0 * * * *");
        // untouched sections keep defaults
        assert_eq!(config.calendar.calendar_id, "primary");
    }

    #[test]
    fn json_config_parses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"mail": {"token": "t", "max_results": 5}}"#).unwrap();

        let config = load_from_file(&path).expect("should parse");
        assert_eq!(config.mail.token, "t");
        assert_eq!(config.mail.max_results, 5);
        assert!(config.mail.enabled);
    }

    #[test]
    fn env_overrides_take_precedence() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SATCHEL_GEMINI_API_KEY", "env-key"),
            ("SATCHEL_PORTAL_PAGES", "https://a.example, https://b.example"),
            ("SATCHEL_PORTAL_ENABLED", "true"),
            ("SATCHEL_BACKFILL_DAYS", "14"),
            ("SATCHEL_MAIL_ENABLED", "not-a-bool"),
        ]);

        let mut config = RuntimeConfig::default();
        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.oracle.api_key, "env-key");
        assert_eq!(config.portal.pages, vec!["https://a.example", "https://b.example"]);
        assert!(config.portal.enabled);
        assert_eq!(config.backfill_days, 14);
        // invalid boolean falls back to the file/default value
        assert!(config.mail.enabled);
    }

    #[test]
    fn missing_rules_path_uses_template() {
        let rules = load_rules(None);
        assert!(rules.child_mappings.contains_key("Tristan"));
    }

    #[test]
    fn broken_rules_document_uses_template() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "{ definitely not json").unwrap();

        let rules = load_rules(path.to_str());
        assert!(rules.child_mappings.contains_key("Benjamin"));
    }

    #[test]
    fn valid_rules_document_replaces_template() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{
                "search_settings": {
                    "children": [{"name": "Alice", "year_group": 5}],
                    "year_groups": [5]
                },
                "child_mappings": {"Alice": ["year 5", "alice"]}
            }"#,
        )
        .unwrap();

        let rules = load_rules(path.to_str());
        assert_eq!(rules.search_settings.children[0].name, "Alice");
        assert!(!rules.child_mappings.contains_key("Tristan"));
    }
}
