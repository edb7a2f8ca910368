//! Configuration structures
//!
//! Two layers of configuration:
//! - [`PipelineConfig`] - household matching rules (children, year groups,
//!   override keywords). Every field has a serde default and the bundled
//!   template doubles as the `Default` impl, so a missing or unreadable
//!   rules document degrades to the template instead of failing.
//! - [`RuntimeConfig`] - process settings (endpoints, credentials, paths,
//!   schedule). Loaded env-first by the infra loader.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BACKFILL_DAYS, DEFAULT_CRON, ORACLE_CALL_DELAY_MS};

/// One household member the classifier can label events for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildProfile {
    pub name: String,
    /// Surname used to disambiguate short nickname fragments.
    #[serde(default)]
    pub surname: Option<String>,
    /// Short name fragments; fragments under four characters only match
    /// when the surname co-occurs in the text.
    #[serde(default)]
    pub nicknames: Vec<String>,
    #[serde(default)]
    pub year_group: Option<u32>,
}

/// Terms the classifier scans raw text for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub children: Vec<ChildProfile>,
    #[serde(default)]
    pub schools: Vec<String>,
    /// Club names act as override keywords: their presence keeps an item
    /// relevant even with no named household member.
    #[serde(default)]
    pub clubs: Vec<String>,
    #[serde(default)]
    pub general_keywords: Vec<String>,
    /// Year-group numerals matched via `year N` / `yN` patterns.
    #[serde(default)]
    pub year_groups: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilteringLogic {
    /// Items containing any of these terms are excluded at the mail query
    /// and classifier gate.
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
}

/// Household matching rules. See module docs for the fallback policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub search_settings: SearchSettings,
    #[serde(default)]
    pub filtering_logic: FilteringLogic,
    /// Label -> trigger terms. The primary subject-identification path:
    /// any trigger term found in the text earns the label.
    #[serde(default)]
    pub child_mappings: BTreeMap<String, Vec<String>>,
}

impl Default for PipelineConfig {
    /// Bundled template for the original household: two children keyed
    /// off their year groups plus common school keywords.
    fn default() -> Self {
        let mut child_mappings = BTreeMap::new();
        child_mappings
            .insert("Tristan".to_string(), vec!["year 3".to_string(), "tristan".to_string()]);
        child_mappings.insert(
            "Benjamin".to_string(),
            vec!["reception".to_string(), "year 2".to_string(), "benjamin".to_string()],
        );

        Self {
            search_settings: SearchSettings {
                children: vec![
                    ChildProfile {
                        name: "Tristan".to_string(),
                        surname: None,
                        nicknames: vec![],
                        year_group: Some(3),
                    },
                    ChildProfile {
                        name: "Benjamin".to_string(),
                        surname: None,
                        nicknames: vec!["ben".to_string()],
                        year_group: Some(2),
                    },
                ],
                schools: vec![],
                clubs: vec![],
                general_keywords: vec![
                    "trip".to_string(),
                    "assembly".to_string(),
                    "birthday".to_string(),
                    "party".to_string(),
                    "costume".to_string(),
                    "bring".to_string(),
                    "mufti".to_string(),
                ],
                year_groups: vec![2, 3],
            },
            filtering_logic: FilteringLogic::default(),
            child_mappings,
        }
    }
}

/// Extraction oracle settings (Gemini REST contract).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_oracle_model")]
    pub model: String,
    #[serde(default = "default_oracle_base_url")]
    pub base_url: String,
    /// Fixed pause between consecutive oracle calls (quota pacing).
    #[serde(default = "default_call_delay_ms")]
    pub call_delay_ms: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_oracle_model(),
            base_url: default_oracle_base_url(),
            call_delay_ms: default_call_delay_ms(),
        }
    }
}

/// Mail source adapter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailSettings {
    #[serde(default = "default_mail_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            base_url: default_mail_base_url(),
            token: String::new(),
            max_results: default_max_results(),
            enabled: true,
        }
    }
}

/// Portal source adapter settings (browser-agent service).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalSettings {
    #[serde(default)]
    pub agent_url: String,
    /// Portal pages scanned in order per run.
    #[serde(default)]
    pub pages: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
}

/// Calendar gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSettings {
    #[serde(default = "default_calendar_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            base_url: default_calendar_base_url(),
            token: String::new(),
            calendar_id: default_calendar_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_cron")]
    pub cron: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self { cron: default_cron(), enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

/// Process-level settings for the pipeline service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Path of the run-state JSON record.
    #[serde(default = "default_state_path")]
    pub state_path: String,
    /// Optional path of the household rules document.
    #[serde(default)]
    pub rules_path: Option<String>,
    /// First-run lookback window in days.
    #[serde(default = "default_backfill_days")]
    pub backfill_days: i64,
    #[serde(default)]
    pub oracle: OracleSettings,
    #[serde(default)]
    pub mail: MailSettings,
    #[serde(default)]
    pub portal: PortalSettings,
    #[serde(default)]
    pub calendar: CalendarSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            rules_path: None,
            backfill_days: default_backfill_days(),
            oracle: OracleSettings::default(),
            mail: MailSettings::default(),
            portal: PortalSettings::default(),
            calendar: CalendarSettings::default(),
            scheduler: SchedulerSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

fn default_oracle_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_oracle_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_call_delay_ms() -> u64 {
    ORACLE_CALL_DELAY_MS
}

fn default_mail_base_url() -> String {
    "https://gmail.googleapis.com".to_string()
}

fn default_max_results() -> u32 {
    25
}

fn default_calendar_base_url() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_cron() -> String {
    DEFAULT_CRON.to_string()
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_state_path() -> String {
    "pipeline_state.json".to_string()
}

fn default_backfill_days() -> i64 {
    DEFAULT_BACKFILL_DAYS
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_template_free_defaults() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert!(config.search_settings.children.is_empty());
        assert!(config.child_mappings.is_empty());
    }

    #[test]
    fn bundled_template_maps_year_groups() {
        let config = PipelineConfig::default();
        assert!(config.child_mappings["Tristan"].contains(&"year 3".to_string()));
        assert!(config.child_mappings["Benjamin"].contains(&"reception".to_string()));
        assert_eq!(config.search_settings.year_groups, vec![2, 3]);
    }

    #[test]
    fn partial_runtime_config_fills_defaults() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{"oracle": {"api_key": "k"}}"#).unwrap();
        assert_eq!(config.oracle.api_key, "k");
        assert_eq!(config.oracle.model, "gemini-1.5-pro");
        assert_eq!(config.backfill_days, 180);
        assert_eq!(config.scheduler.cron, "0 0 */6 * * *");
        assert!(config.mail.enabled);
        assert!(!config.portal.enabled);
    }
}
