use std::io::Write;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use tempfile::NamedTempFile;
use supportdesk_api::DEFAULT_API_BASE_URL;

use crate::chat::{DEFAULT_ESCALATION_REASON, SessionOptions};

pub const SETTINGS_DIRECTORY_NAME: &str = "supportdesk";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SETTINGS_ENV_PREFIX: &str = "SUPPORTDESK_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_escalation_reason")]
    pub escalation_reason: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            user_id: None,
            escalation_reason: default_escalation_reason(),
        }
    }
}

impl Settings {
    pub fn normalized(mut self) -> Self {
        let api_base_url = self.api_base_url.trim().trim_end_matches('/');
        self.api_base_url = if api_base_url.is_empty() {
            default_api_base_url()
        } else {
            api_base_url.to_string()
        };
        self.user_id = self
            .user_id
            .map(|user_id| user_id.trim().to_string())
            .filter(|user_id| !user_id.is_empty());
        self.escalation_reason = if self.escalation_reason.trim().is_empty() {
            default_escalation_reason()
        } else {
            self.escalation_reason.trim().to_string()
        };

        self
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            user_id: self.user_id.clone(),
            escalation_reason: self.escalation_reason.clone(),
            server_label: server_origin(&self.api_base_url).to_string(),
        }
    }
}

/// Scheme and authority of an API base URL, which is what users start the backend on.
fn server_origin(api_base_url: &str) -> &str {
    let authority_start = api_base_url.find("://").map(|index| index + 3).unwrap_or(0);
    match api_base_url[authority_start..].find('/') {
        Some(path_start) => &api_base_url[..authority_start + path_start],
        None => api_base_url,
    }
}

pub struct SettingsStore {
    settings: Settings,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".supportdesk"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    /// Defaults, then the settings file, then `SUPPORTDESK_*` environment variables.
    pub fn load(config_path: PathBuf) -> Self {
        let settings = Self::load_layers(&config_path, true);
        Self {
            settings,
            config_path,
        }
    }

    /// Defaults and the settings file only, for edits that are written back to disk.
    pub fn load_file_only(config_path: PathBuf) -> Self {
        let settings = Self::load_layers(&config_path, false);
        Self {
            settings,
            config_path,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Applies a command-line override without persisting it.
    pub fn override_api_base_url(&mut self, api_base_url: &str) {
        let mut settings = self.settings.clone();
        settings.api_base_url = api_base_url.to_string();
        self.settings = settings.normalized();
    }

    pub fn update(&mut self, settings: Settings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings = normalized_settings;
        Ok(())
    }

    fn load_layers(path: &Path, include_env: bool) -> Settings {
        let defaults = Figment::from(Serialized::defaults(Settings::default()));
        let with_env = |figment: Figment| {
            if include_env {
                figment.merge(Env::prefixed(SETTINGS_ENV_PREFIX))
            } else {
                figment
            }
        };

        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
            return Self::extract_or_default(with_env(defaults), path);
        }

        match with_env(defaults.clone().merge(Json::file(path))).extract::<Settings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                Self::extract_or_default(with_env(defaults), path)
            }
        }
    }

    fn extract_or_default(figment: Figment, path: &Path) -> Settings {
        match figment.extract::<Settings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "ignoring environment overrides for {:?}: {}",
                    path,
                    error
                );
                Settings::default()
            }
        }
    }

    fn persist(&self, settings: &Settings) -> Result<(), SettingsError> {
        let directory = self
            .config_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(directory).context(PrepareDirectorySnafu {
            stage: "prepare-settings-directory",
            path: directory.to_path_buf(),
        })?;

        let mut encoded = serde_json::to_vec_pretty(settings).context(EncodeSettingsSnafu {
            stage: "encode-client-settings",
        })?;
        encoded.push(b'\n');

        // Staged next to the target so the final rename never crosses filesystems.
        let mut staged = NamedTempFile::new_in(directory).context(StageSettingsSnafu {
            stage: "create-staged-settings",
            path: directory.to_path_buf(),
        })?;
        staged.write_all(&encoded).context(StageSettingsSnafu {
            stage: "write-staged-settings",
            path: staged.path().to_path_buf(),
        })?;
        staged
            .persist(&self.config_path)
            .context(ReplaceSettingsSnafu {
                stage: "replace-settings-file",
                path: self.config_path.clone(),
            })?;

        tracing::info!(
            path = %self.config_path.display(),
            api_base_url = %settings.api_base_url,
            "saved client settings"
        );
        Ok(())
    }
}

/// Failures while saving client settings. Loading never fails; unreadable settings
/// fall back to defaults.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("cannot prepare settings directory {path:?} on `{stage}`: {source}"))]
    PrepareDirectory {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot encode client settings on `{stage}`: {source}"))]
    EncodeSettings {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("cannot stage settings in {path:?} on `{stage}`: {source}"))]
    StageSettings {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot replace settings file {path:?} on `{stage}`: {source}"))]
    ReplaceSettings {
        stage: &'static str,
        path: PathBuf,
        source: tempfile::PersistError,
    },
}

impl SettingsError {
    /// Name of the step that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::PrepareDirectory { stage, .. }
            | Self::EncodeSettings { stage, .. }
            | Self::StageSettings { stage, .. }
            | Self::ReplaceSettings { stage, .. } => stage,
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_escalation_reason() -> String {
    DEFAULT_ESCALATION_REASON.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_trims_and_restores_defaults() {
        let settings = Settings {
            api_base_url: " https://support.example.com/api/ ".to_string(),
            user_id: Some("   ".to_string()),
            escalation_reason: String::new(),
        }
        .normalized();

        assert_eq!(settings.api_base_url, "https://support.example.com/api");
        assert_eq!(settings.user_id, None);
        assert_eq!(settings.escalation_reason, DEFAULT_ESCALATION_REASON);
    }

    #[test]
    fn failure_alert_names_the_server_origin() {
        let options = Settings::default().session_options();
        assert_eq!(options.server_label, "http://localhost:8002");
        assert_eq!(server_origin("support.local"), "support.local");
    }

    #[test]
    fn update_persists_and_reloads_from_disk() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("nested").join(SETTINGS_FILE_NAME);

        let mut store = SettingsStore::load_file_only(path.clone());
        assert_eq!(store.settings(), &Settings::default());

        let mut settings = store.settings().clone();
        settings.api_base_url = "http://10.0.0.5:8002/api/".to_string();
        settings.user_id = Some("agent-desk".to_string());
        store.update(settings).unwrap();

        let reloaded = SettingsStore::load_file_only(path.clone());
        assert_eq!(reloaded.settings().api_base_url, "http://10.0.0.5:8002/api");
        assert_eq!(reloaded.settings().user_id.as_deref(), Some("agent-desk"));

        let leftovers = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect::<Vec<_>>();
        assert_eq!(leftovers, vec![std::ffi::OsString::from(SETTINGS_FILE_NAME)]);
    }

    #[test]
    fn update_into_a_file_path_reports_directory_stage() {
        let directory = tempfile::tempdir().unwrap();
        let blocker = directory.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut store = SettingsStore::load_file_only(blocker.join(SETTINGS_FILE_NAME));
        let error = store.update(Settings::default()).unwrap_err();

        assert_eq!(error.stage(), "prepare-settings-directory");
        assert_eq!(store.settings(), &Settings::default());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::load_file_only(path);
        assert_eq!(store.settings(), &Settings::default());
    }

    #[test]
    fn command_line_override_is_normalized() {
        let directory = tempfile::tempdir().unwrap();
        let mut store =
            SettingsStore::load_file_only(directory.path().join(SETTINGS_FILE_NAME));
        store.override_api_base_url("http://127.0.0.1:9000/api/");
        assert_eq!(store.settings().api_base_url, "http://127.0.0.1:9000/api");
    }
}
