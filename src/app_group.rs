//! Host-app side of the iOS share extension hand-off.
//!
//! The extension writes what it received into the App Group's shared
//! defaults and opens `<scheme>://dataUrl=<key>#<kind>`. The host reads the
//! stored entries back and turns them into paths it can open.

use std::borrow::Cow;

use serde::Deserialize;
use serde_json::Value;
use tauri::Url;

use crate::models::{SharedMediaRecord, SharedPayload, StreamKind};
use crate::{Error, Result};

const DIRECT_PATH_PREFIXES: &[&str] = &["file://", "/var/mobile/Media", "/private/var/mobile"];
const FILE_SCHEME: &str = "file://";

/// Key-value store shared between the app and its extensions
/// (`UserDefaults(suiteName:)` on iOS).
pub trait SharedStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>>;
    fn set(&self, namespace: &str, key: &str, value: Value) -> Result<()>;
}

/// The device photo library.
pub trait AssetLibrary {
    /// Backing file URL of the asset with this local identifier.
    fn file_url(&self, local_identifier: &str) -> Result<Option<String>>;

    /// Local identifier of the asset whose original file name (without
    /// extension) is `stem`.
    fn find_by_file_stem(&self, stem: &str) -> Result<Option<String>>;
}

impl<T: SharedStore + ?Sized> SharedStore for &T {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>> {
        (**self).get(namespace, key)
    }

    fn set(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
        (**self).set(namespace, key, value)
    }
}

impl<T: AssetLibrary + ?Sized> AssetLibrary for &T {
    fn file_url(&self, local_identifier: &str) -> Result<Option<String>> {
        (**self).file_url(local_identifier)
    }

    fn find_by_file_stem(&self, stem: &str) -> Result<Option<String>> {
        (**self).find_by_file_stem(stem)
    }
}

/// The URL a share extension opens the host app with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareUrl {
    pub key: String,
    pub kind: StreamKind,
}

impl ShareUrl {
    pub fn new(key: impl Into<String>, kind: StreamKind) -> Self {
        Self {
            key: key.into(),
            kind,
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw)
            .map_err(|e| Error::InvalidArgs(format!("`{raw}` is not a URL: {e}")))?;
        let key = url
            .host_str()
            .and_then(|host| host.rsplit('=').next())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::InvalidArgs(format!("`{raw}` names no shared key")))?;
        let kind = match url.fragment() {
            Some("text") => StreamKind::Text,
            _ => StreamKind::File,
        };
        Ok(Self::new(key, kind))
    }

    pub fn to_url(&self, scheme: &str) -> String {
        format!("{scheme}://dataUrl={}#{}", self.key, self.kind)
    }
}

fn scheme_of(raw_url: &str) -> &str {
    raw_url.split_once(':').map_or("", |(scheme, _)| scheme)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Path(String),
    Record(SharedMediaRecord),
}

impl StoredEntry {
    fn identifier(&self) -> &str {
        match self {
            StoredEntry::Path(path) => path,
            StoredEntry::Record(record) => &record.path,
        }
    }
}

/// Maps a stored identifier to a path the host process can open.
///
/// File URLs and paths inside the device media area are used as they are;
/// anything else is looked up as a photo-library identifier.
pub fn resolve_identifier<A: AssetLibrary>(identifier: &str, assets: &A) -> Option<String> {
    if DIRECT_PATH_PREFIXES
        .iter()
        .any(|prefix| identifier.starts_with(prefix))
    {
        return Some(strip_file_scheme(identifier));
    }

    match assets.file_url(identifier) {
        Ok(Some(url)) => Some(strip_file_scheme(&url)),
        Ok(None) => {
            log::debug!("no photo library asset for `{identifier}`");
            None
        }
        Err(e) => {
            log::warn!("could not look up asset `{identifier}`: {e}");
            None
        }
    }
}

fn strip_file_scheme(value: &str) -> String {
    match value.strip_prefix(FILE_SCHEME) {
        Some(path) => urlencoding::decode(path)
            .map(Cow::into_owned)
            .unwrap_or_else(|_| path.to_string()),
        None => value.to_string(),
    }
}

/// Reads shares left in an App Group by the share extension.
pub struct AppGroup<S, A> {
    store: S,
    assets: A,
    namespace: String,
    shared_key: String,
    url_scheme: String,
}

impl<S: SharedStore, A: AssetLibrary> AppGroup<S, A> {
    pub fn new(store: S, assets: A, namespace: impl Into<String>) -> Self {
        Self {
            store,
            assets,
            namespace: namespace.into(),
            shared_key: "ShareKey".to_string(),
            url_scheme: "ShareMedia".to_string(),
        }
    }

    pub fn with_shared_key(mut self, key: impl Into<String>) -> Self {
        self.shared_key = key.into();
        self
    }

    pub fn with_url_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.url_scheme = scheme.into();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Classifies an open-URL event. `None` when the URL is not a share
    /// hand-off for this app or the store holds nothing under its key.
    pub fn read_share(&self, raw_url: &str) -> Option<SharedPayload> {
        let share_url = match ShareUrl::parse(raw_url) {
            Ok(share_url) => share_url,
            Err(e) => {
                log::debug!("ignoring url: {e}");
                return None;
            }
        };
        if !scheme_of(raw_url).eq_ignore_ascii_case(&self.url_scheme) {
            log::debug!("ignoring url with foreign scheme: {raw_url}");
            return None;
        }
        if share_url.key != self.shared_key {
            log::debug!("ignoring url for unknown key `{}`", share_url.key);
            return None;
        }

        let value = match self.store.get(&self.namespace, &share_url.key) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("could not read `{}` from {}: {e}", share_url.key, self.namespace);
                return None;
            }
        };

        match share_url.kind {
            StreamKind::Text => match serde_json::from_value::<Vec<String>>(value) {
                Ok(texts) => Some(SharedPayload::Text(texts.join(","))),
                Err(e) => {
                    log::warn!("shared text under `{}` is malformed: {e}", share_url.key);
                    None
                }
            },
            StreamKind::File => match serde_json::from_value::<Vec<StoredEntry>>(value) {
                Ok(entries) => Some(SharedPayload::FileList(
                    entries
                        .iter()
                        .filter_map(|entry| resolve_identifier(entry.identifier(), &self.assets))
                        .collect(),
                )),
                Err(e) => {
                    log::warn!("shared files under `{}` are malformed: {e}", share_url.key);
                    None
                }
            },
        }
    }
}
