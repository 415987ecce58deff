use std::time::Duration;

use serde::Deserialize;

/// Plugin configuration, read from `plugins.receive-share` in `tauri.conf.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// App Group shared between the app and its share extension.
    /// Defaults to `group.<app identifier>`.
    pub app_group_id: Option<String>,
    /// Key the share extension stores its payload under.
    pub shared_key: String,
    /// URL scheme the share extension uses to open the host app.
    pub url_scheme: String,
    /// Prefix copied cache files with a random id instead of overwriting
    /// files that share a name.
    pub uniquify_cache_files: bool,
    /// Where in a shared video the share extension grabs its thumbnail.
    pub thumbnail_offset_ms: u64,
    /// Desktop only: treat command-line arguments as the initial share.
    pub capture_launch_args: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_group_id: None,
            shared_key: "ShareKey".to_string(),
            url_scheme: "ShareMedia".to_string(),
            uniquify_cache_files: false,
            thumbnail_offset_ms: 500,
            capture_launch_args: true,
        }
    }
}

impl Config {
    pub fn app_group(&self, app_identifier: &str) -> String {
        self.app_group_id
            .clone()
            .unwrap_or_else(|| format!("group.{app_identifier}"))
    }

    pub fn thumbnail_offset(&self) -> Duration {
        Duration::from_millis(self.thumbnail_offset_ms)
    }
}
