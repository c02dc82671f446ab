use std::{collections::HashMap, fs, path::Path, time::Duration};

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "card_client.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid {key} '{value}': {source}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub media_api_url: String,
    pub media_delivery_url: String,
    /// Without a cloud name uploads fail with "media service is unavailable".
    pub media_cloud_name: Option<String>,
    pub media_upload_preset: String,
    /// `None` leaves requests without a timeout.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000/api".into(),
            media_api_url: "https://api.cloudinary.com/v1_1".into(),
            media_delivery_url: "https://res.cloudinary.com".into(),
            media_cloud_name: None,
            media_upload_preset: "cards_unsigned".into(),
            request_timeout_secs: None,
        }
    }
}

impl ClientSettings {
    /// Base URL with a trailing slash so relative endpoint joins append.
    pub fn api_base_url(&self) -> Result<Url, SettingsError> {
        parse_base_url("api_base_url", &self.api_base_url)
    }

    pub fn media_api_url(&self) -> Result<Url, SettingsError> {
        parse_base_url("media_api_url", &self.media_api_url)
    }

    pub fn media_delivery_url(&self) -> Result<Url, SettingsError> {
        parse_base_url("media_delivery_url", &self.media_delivery_url)
    }

    pub fn build_http_client(&self) -> Result<Client, SettingsError> {
        let mut builder = Client::builder();
        if let Some(secs) = self.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(builder.build()?)
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> ClientSettings {
    let mut settings = ClientSettings::default();
    if let Ok(raw) = fs::read_to_string(path) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file_overrides(settings: &mut ClientSettings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        return;
    };
    let get = |key: &str| -> Option<String> {
        match file_cfg.get(key)? {
            toml::Value::String(v) => Some(v.clone()),
            toml::Value::Integer(v) => Some(v.to_string()),
            _ => None,
        }
    };

    if let Some(v) = get("api_base_url") {
        settings.api_base_url = v;
    }
    if let Some(v) = get("media_api_url") {
        settings.media_api_url = v;
    }
    if let Some(v) = get("media_delivery_url") {
        settings.media_delivery_url = v;
    }
    if let Some(v) = get("media_cloud_name") {
        settings.media_cloud_name = Some(v);
    }
    if let Some(v) = get("media_upload_preset") {
        settings.media_upload_preset = v;
    }
    if let Some(v) = get("request_timeout_secs") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = Some(parsed);
        }
    }
}

fn apply_env_overrides(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("CARD_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("APP__MEDIA_API_URL") {
        settings.media_api_url = v;
    }
    if let Some(v) = lookup("APP__MEDIA_DELIVERY_URL") {
        settings.media_delivery_url = v;
    }

    if let Some(v) = lookup("CLOUDINARY_CLOUD_NAME") {
        settings.media_cloud_name = Some(v);
    }
    if let Some(v) = lookup("APP__MEDIA_CLOUD_NAME") {
        settings.media_cloud_name = Some(v);
    }

    if let Some(v) = lookup("CLOUDINARY_UPLOAD_PRESET") {
        settings.media_upload_preset = v;
    }
    if let Some(v) = lookup("APP__MEDIA_UPLOAD_PRESET") {
        settings.media_upload_preset = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = Some(parsed);
        }
    }
}

fn parse_base_url(key: &'static str, raw: &str) -> Result<Url, SettingsError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).map_err(|source| SettingsError::InvalidUrl {
        key,
        value: raw.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let mut settings = ClientSettings::default();
        apply_file_overrides(
            &mut settings,
            r#"
api_base_url = "https://cards.example.test/v2"
media_cloud_name = "demo"
request_timeout_secs = 30
"#,
        );
        assert_eq!(settings.api_base_url, "https://cards.example.test/v2");
        assert_eq!(settings.media_cloud_name.as_deref(), Some("demo"));
        assert_eq!(settings.request_timeout_secs, Some(30));
        assert_eq!(settings.media_upload_preset, "cards_unsigned");
    }

    #[test]
    fn malformed_file_is_ignored() {
        let mut settings = ClientSettings::default();
        apply_file_overrides(&mut settings, "api_base_url = ");
        assert_eq!(settings, ClientSettings::default());
    }

    #[test]
    fn app_prefixed_env_wins_over_legacy_name() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CARD_API_URL", "http://legacy.test"),
            ("APP__API_BASE_URL", "http://app.test"),
            ("CLOUDINARY_UPLOAD_PRESET", "preset-a"),
            ("APP__REQUEST_TIMEOUT_SECS", "not-a-number"),
        ]);
        let mut settings = ClientSettings::default();
        apply_env_overrides(&mut settings, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.api_base_url, "http://app.test");
        assert_eq!(settings.media_upload_preset, "preset-a");
        assert_eq!(settings.request_timeout_secs, None);
    }

    #[test]
    fn base_url_gets_trailing_slash_for_joins() {
        let settings = ClientSettings {
            api_base_url: "http://127.0.0.1:9000/api".into(),
            ..ClientSettings::default()
        };
        let base = settings.api_base_url().expect("url");
        assert_eq!(
            base.join("card/field").expect("join").as_str(),
            "http://127.0.0.1:9000/api/card/field"
        );
    }

    #[test]
    fn invalid_base_url_names_the_key() {
        let settings = ClientSettings {
            api_base_url: "not a url".into(),
            ..ClientSettings::default()
        };
        let err = settings.api_base_url().expect_err("must fail");
        assert!(err.to_string().contains("api_base_url"));
    }

    #[test]
    fn loads_settings_file_from_path() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("card_client_settings_{suffix}.toml"));
        fs::write(&path, "media_delivery_url = \"https://cdn.example.test\"\n").expect("write");

        let settings = load_settings_from(&path);
        assert_eq!(settings.media_delivery_url, "https://cdn.example.test");

        fs::remove_file(path).expect("cleanup");
    }
}
