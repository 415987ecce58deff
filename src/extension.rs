//! Extension-process side of the iOS share flow.
//!
//! A share extension receives a request with optional content text and a
//! list of attachments. Attachments are loaded asynchronously by the
//! platform; each result is fed back through [`ShareExtension::complete`].
//! Once the batch is complete the entries are written to the App Group and
//! the URL that opens the host app is returned.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tauri::Url;

use crate::app_group::{AssetLibrary, SharedStore, ShareUrl};
use crate::batch::AttachmentBatch;
use crate::models::{SharedMediaRecord, SharedMediaType, StreamKind};
use crate::thumbnail::{self, FrameExtractor};
use crate::{Config, Error, Result};

pub const IMAGE_TYPE: &str = "public.image";
pub const MOVIE_TYPE: &str = "public.movie";
pub const TEXT_TYPE: &str = "public.text";
pub const URL_TYPE: &str = "public.url";

/// What an attachment is handled as, picked from its type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Video,
    Text,
    Url,
    File,
}

impl AttachmentKind {
    pub fn classify<S: AsRef<str>>(type_identifiers: &[S]) -> Self {
        let conforms = |wanted: &str| type_identifiers.iter().any(|t| t.as_ref() == wanted);
        if conforms(IMAGE_TYPE) {
            AttachmentKind::Image
        } else if conforms(MOVIE_TYPE) {
            AttachmentKind::Video
        } else if conforms(TEXT_TYPE) {
            AttachmentKind::Text
        } else if conforms(URL_TYPE) {
            AttachmentKind::Url
        } else {
            AttachmentKind::File
        }
    }

    fn media_type(self) -> SharedMediaType {
        match self {
            AttachmentKind::Image => SharedMediaType::Image,
            AttachmentKind::Video => SharedMediaType::Video,
            AttachmentKind::Text | AttachmentKind::Url | AttachmentKind::File => {
                SharedMediaType::File
            }
        }
    }
}

/// The input of one share extension invocation.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRequest {
    /// Text typed or passed explicitly with the share.
    pub content_text: Option<String>,
    /// Type identifiers of each attachment, in attachment order.
    pub attachments: Vec<Vec<String>>,
}

/// What the platform produced when loading an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedItem {
    Text(String),
    File(PathBuf),
}

#[derive(Debug)]
enum Entry {
    Text(String),
    Media(SharedMediaRecord),
}

/// Attachments still being loaded for one request.
#[derive(Debug)]
pub struct PendingShare {
    kinds: Vec<AttachmentKind>,
    batch: AttachmentBatch<Entry>,
}

impl PendingShare {
    /// How each attachment should be loaded, by index.
    pub fn kinds(&self) -> &[AttachmentKind] {
        &self.kinds
    }
}

/// Next step after [`ShareExtension::begin`].
#[derive(Debug)]
pub enum Dispatch {
    /// The share is stored; open the host app with this URL.
    Redirect(String),
    /// Load every attachment and report back through
    /// [`ShareExtension::complete`].
    Load(PendingShare),
}

pub struct ShareExtension<S, A, E> {
    store: S,
    assets: A,
    extractor: E,
    container: PathBuf,
    namespace: String,
    shared_key: String,
    url_scheme: String,
    thumbnail_offset: Duration,
}

impl<S: SharedStore, A: AssetLibrary, E: FrameExtractor> ShareExtension<S, A, E> {
    pub fn new(
        store: S,
        assets: A,
        extractor: E,
        container: impl Into<PathBuf>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            assets,
            extractor,
            container: container.into(),
            namespace: namespace.into(),
            shared_key: "ShareKey".to_string(),
            url_scheme: "ShareMedia".to_string(),
            thumbnail_offset: Duration::from_millis(500),
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

    pub fn with_thumbnail_offset(mut self, offset: Duration) -> Self {
        self.thumbnail_offset = offset;
        self
    }

    /// Applies the key, scheme and thumbnail offset the host app is
    /// configured with, so both sides of the hand-off agree.
    pub fn with_config(self, config: &Config) -> Self {
        self.with_shared_key(config.shared_key.clone())
            .with_url_scheme(config.url_scheme.clone())
            .with_thumbnail_offset(config.thumbnail_offset())
    }

    /// Starts handling a request. Explicit content text wins over
    /// attachments; a request with neither yields `None`.
    pub fn begin(&self, request: ExtensionRequest) -> Result<Option<Dispatch>> {
        if let Some(text) = request.content_text.filter(|text| !text.is_empty()) {
            let url = self.store_share(StreamKind::Text, serde_json::to_value([text])?)?;
            return Ok(Some(Dispatch::Redirect(url)));
        }
        if request.attachments.is_empty() {
            return Ok(None);
        }

        let kinds: Vec<_> = request
            .attachments
            .iter()
            .map(|identifiers| AttachmentKind::classify(identifiers.as_slice()))
            .collect();
        let batch = AttachmentBatch::new(kinds.len());
        Ok(Some(Dispatch::Load(PendingShare { kinds, batch })))
    }

    /// Reports the outcome of loading attachment `index`. Returns the
    /// redirect URL once every attachment has reported.
    pub fn complete(
        &self,
        pending: &mut PendingShare,
        index: usize,
        loaded: Result<LoadedItem>,
    ) -> Result<Option<String>> {
        let kind = *pending.kinds.get(index).ok_or_else(|| {
            Error::InvalidArgs(format!("attachment {index} is not part of this share"))
        })?;
        let entry = match loaded {
            Ok(item) => self.entry_for(kind, item),
            Err(e) => {
                log::warn!("attachment {index} failed to load: {e}");
                None
            }
        };

        let Some(entries) = pending.batch.complete(index, entry)? else {
            return Ok(None);
        };
        self.finish(entries).map(Some)
    }

    fn entry_for(&self, kind: AttachmentKind, item: LoadedItem) -> Option<Entry> {
        match item {
            LoadedItem::Text(text) => Some(Entry::Text(text)),
            LoadedItem::File(path) => self.media_record(kind, &path).map(Entry::Media),
        }
    }

    fn media_record(&self, kind: AttachmentKind, source: &Path) -> Option<SharedMediaRecord> {
        let media_type = kind.media_type();

        if kind != AttachmentKind::Video {
            if let Some(identifier) = self.library_identifier(source) {
                return Some(SharedMediaRecord {
                    path: identifier,
                    thumbnail: None,
                    media_type,
                });
            }
        }

        let copied = match self.copy_into_container(source) {
            Ok(copied) => copied,
            Err(e) => {
                log::warn!("cannot copy {} into the App Group: {e}", source.display());
                return None;
            }
        };
        let thumbnail = if kind == AttachmentKind::Video {
            thumbnail::ensure_thumbnail(
                &self.extractor,
                &self.container,
                &copied,
                self.thumbnail_offset,
            )
            .map(|path| path.to_string_lossy().into_owned())
        } else {
            None
        };

        let path = Url::from_file_path(&copied)
            .map(String::from)
            .unwrap_or_else(|_| copied.to_string_lossy().into_owned());
        Some(SharedMediaRecord {
            path,
            thumbnail,
            media_type,
        })
    }

    fn library_identifier(&self, source: &Path) -> Option<String> {
        let file_name = source.file_name()?.to_str()?;
        let stem = file_name.split('.').next()?;
        match self.assets.find_by_file_stem(stem) {
            Ok(identifier) => identifier,
            Err(e) => {
                log::debug!("photo library lookup for `{stem}` failed: {e}");
                None
            }
        }
    }

    fn copy_into_container(&self, source: &Path) -> Result<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| {
            Error::InvalidArgs(format!("{} has no file name", source.display()))
        })?;
        fs::create_dir_all(&self.container)?;
        let target = self.container.join(file_name);
        if target.exists() {
            fs::remove_file(&target)?;
        }
        fs::copy(source, &target)?;
        Ok(target)
    }

    fn finish(&self, entries: Vec<Entry>) -> Result<String> {
        let mut texts = Vec::new();
        let mut records = Vec::new();
        for entry in entries {
            match entry {
                Entry::Text(text) => texts.push(text),
                Entry::Media(record) => records.push(record),
            }
        }

        if !records.is_empty() {
            if !texts.is_empty() {
                log::debug!("dropping {} text items from a file share", texts.len());
            }
            return self.store_share(StreamKind::File, serde_json::to_value(records)?);
        }
        if !texts.is_empty() {
            return self.store_share(StreamKind::Text, serde_json::to_value(texts)?);
        }
        self.store_share(StreamKind::File, serde_json::Value::Array(Vec::new()))
    }

    fn store_share(&self, kind: StreamKind, value: serde_json::Value) -> Result<String> {
        self.store.set(&self.namespace, &self.shared_key, value)?;
        let url = ShareUrl::new(self.shared_key.clone(), kind).to_url(&self.url_scheme);
        log::info!("stored {kind} share, opening host app");
        Ok(url)
    }
}
