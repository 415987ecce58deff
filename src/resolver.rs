//! Turns Android content URIs into paths the host app can open.
//!
//! Storage Access Framework documents are mapped through the three system
//! document providers; other `content://` URIs go through their `_data`
//! column. Anything that cannot be mapped to a real path is streamed into
//! the app cache directory.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use tauri::Url;
use uuid::Uuid;

use crate::{Error, Result};

pub const EXTERNAL_STORAGE_AUTHORITY: &str = "com.android.externalstorage.documents";
pub const DOWNLOADS_AUTHORITY: &str = "com.android.providers.downloads.documents";
pub const MEDIA_AUTHORITY: &str = "com.android.providers.media.documents";

const DOWNLOAD_CONTENT_PREFIXES: &[&str] = &[
    "content://downloads/public_downloads",
    "content://downloads/my_downloads",
];
const RAW_PATH_MARKER: &str = "/document/raw";

/// A `WHERE` clause with positional arguments for a provider query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub clause: String,
    pub args: Vec<String>,
}

impl Selection {
    pub fn by_id(id: &str) -> Self {
        Self {
            clause: "_id=?".to_string(),
            args: vec![id.to_string()],
        }
    }
}

/// Access to the platform content resolver.
pub trait ContentProvider {
    /// Reads the `_data` column of the first row matching `uri` and `selection`.
    fn query_data_column(&self, uri: &str, selection: Option<&Selection>) -> Result<Option<String>>;

    /// The `OpenableColumns.DISPLAY_NAME` of `uri`.
    fn display_name(&self, uri: &str) -> Result<Option<String>>;

    /// For a virtual document (one without a byte stream of its own), the
    /// MIME type it can be exported as. `None` for regular content.
    fn virtual_stream_type(&self, uri: &str) -> Result<Option<String>>;

    /// Streams the content behind `uri` into the file at `target`, opening
    /// virtual documents as `stream_type`. Returns `false` if the provider
    /// has nothing to offer.
    fn copy_content(&self, uri: &str, stream_type: Option<&str>, target: &Path) -> Result<bool>;
}

/// MediaStore collections a media document can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCollection {
    Images,
    Video,
    Audio,
}

impl MediaCollection {
    pub fn from_type(token: &str) -> Option<Self> {
        match token {
            "image" => Some(MediaCollection::Images),
            "video" => Some(MediaCollection::Video),
            "audio" => Some(MediaCollection::Audio),
            _ => None,
        }
    }

    pub fn content_uri(self) -> &'static str {
        match self {
            MediaCollection::Images => "content://media/external/images/media",
            MediaCollection::Video => "content://media/external/video/media",
            MediaCollection::Audio => "content://media/external/audio/media",
        }
    }
}

/// A parsed URI with its path already percent-decoded.
#[derive(Debug, Clone)]
pub struct ContentHandle {
    uri: String,
    scheme: String,
    authority: Option<String>,
    path: String,
    segments: Vec<String>,
}

impl ContentHandle {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw)
            .map_err(|e| Error::InvalidArgs(format!("`{raw}` is not a URI: {e}")))?;
        let segments = match url.path_segments() {
            Some(segments) => segments
                .filter(|segment| !segment.is_empty())
                .map(decode)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(Self {
            uri: raw.to_string(),
            scheme: url.scheme().to_ascii_lowercase(),
            authority: url
                .host_str()
                .filter(|host| !host.is_empty())
                .map(str::to_string),
            path: decode(url.path())?,
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// The document id of a Storage Access Framework URI, either
    /// `/document/<id>` or `/tree/<tree>/document/<id>`.
    pub fn document_id(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [document, id] if document == "document" => Some(id.as_str()),
            [tree, _, document, id] if tree == "tree" && document == "document" => {
                Some(id.as_str())
            }
            _ => None,
        }
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.path.rsplit('/').next().filter(|segment| !segment.is_empty())
    }
}

fn decode(value: &str) -> Result<String> {
    urlencoding::decode(value)
        .map(Cow::into_owned)
        .map_err(|e| Error::InvalidArgs(format!("`{value}` is not valid UTF-8: {e}")))
}

/// Resolves content handles against a [`ContentProvider`].
pub struct UriResolver<P> {
    provider: P,
    storage_root: PathBuf,
    cache_dir: PathBuf,
    uniquify: bool,
}

impl<P: ContentProvider> UriResolver<P> {
    pub fn new(provider: P, storage_root: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            storage_root: storage_root.into(),
            cache_dir: cache_dir.into(),
            uniquify: false,
        }
    }

    /// Prefix every copied file with a random id so unrelated shares with
    /// the same file name do not overwrite each other.
    pub fn uniquify_cache_files(mut self, uniquify: bool) -> Self {
        self.uniquify = uniquify;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Maps `handle` to a local path. Errors are logged and reported as
    /// `None` so a single bad item never fails a whole share.
    pub fn resolve(&self, handle: &str) -> Option<String> {
        match self.try_resolve(handle) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("could not resolve `{handle}`: {e}");
                None
            }
        }
    }

    fn try_resolve(&self, raw: &str) -> Result<Option<String>> {
        if raw.starts_with('/') {
            return Ok(Some(raw.to_string()));
        }
        let handle = ContentHandle::parse(raw)?;

        if let Some(document_id) = handle.document_id() {
            match handle.authority() {
                Some(EXTERNAL_STORAGE_AUTHORITY) => {
                    return Ok(self.external_storage_path(document_id));
                }
                Some(DOWNLOADS_AUTHORITY) => return self.download_path(&handle, document_id),
                Some(MEDIA_AUTHORITY) => return self.media_path(document_id),
                _ => {}
            }
        }

        if handle.scheme == "content" {
            return self.content_path(&handle);
        }

        Ok(Some(handle.path).filter(|path| !path.is_empty()))
    }

    fn external_storage_path(&self, document_id: &str) -> Option<String> {
        let (volume, rest) = document_id.split_once(':').unwrap_or((document_id, ""));
        let base = if volume.eq_ignore_ascii_case("primary") {
            self.storage_root.clone()
        } else if volume.eq_ignore_ascii_case("home") {
            self.storage_root.join("documents")
        } else {
            log::debug!("unsupported storage volume `{volume}`");
            return None;
        };
        let rest = rest.trim_start_matches('/');
        let path = if rest.is_empty() { base } else { base.join(rest) };
        Some(path.to_string_lossy().into_owned())
    }

    fn download_path(&self, handle: &ContentHandle, document_id: &str) -> Result<Option<String>> {
        if let Some((marker, raw_path)) = handle.path.split_once(':') {
            if marker.starts_with(RAW_PATH_MARKER) && !raw_path.is_empty() {
                return Ok(Some(raw_path.to_string()));
            }
        }

        let row_id = document_id.parse::<i64>().ok().or_else(|| {
            document_id
                .split(':')
                .nth(1)
                .and_then(|id| id.parse::<i64>().ok())
        });

        if let Some(row_id) = row_id {
            for prefix in DOWNLOAD_CONTENT_PREFIXES {
                let uri = format!("{prefix}/{row_id}");
                match self.provider.query_data_column(&uri, None) {
                    Ok(Some(path)) if !path.is_empty() => return Ok(Some(path)),
                    Ok(_) => {}
                    Err(e) => log::debug!("query of `{uri}` failed: {e}"),
                }
            }
        } else {
            log::debug!("download id `{document_id}` is not numeric");
        }

        self.copy_to_cache(handle)
    }

    fn media_path(&self, document_id: &str) -> Result<Option<String>> {
        let (kind, id) = document_id.split_once(':').unwrap_or((document_id, ""));
        let Some(collection) = MediaCollection::from_type(kind) else {
            log::debug!("unsupported media type `{kind}`");
            return Ok(None);
        };
        self.provider
            .query_data_column(collection.content_uri(), Some(&Selection::by_id(id)))
    }

    fn content_path(&self, handle: &ContentHandle) -> Result<Option<String>> {
        if handle.authority().is_some() {
            match self.provider.query_data_column(handle.as_str(), None) {
                Ok(Some(path)) if !path.is_empty() => return Ok(Some(path)),
                Ok(_) => {}
                Err(e) => log::debug!("query of `{}` failed: {e}", handle.as_str()),
            }
        }
        self.copy_to_cache(handle)
    }

    /// Streams the content into the cache directory, named after the
    /// provider's display name or else the last path segment of the handle.
    fn copy_to_cache(&self, handle: &ContentHandle) -> Result<Option<String>> {
        let file_name = self.cache_file_name(handle).ok_or_else(|| {
            Error::InvalidArgs(format!("`{}` has no usable file name", handle.as_str()))
        })?;
        let file_name = if self.uniquify {
            format!("{}-{}", Uuid::new_v4(), file_name)
        } else {
            file_name
        };
        let stream_type = match self.provider.virtual_stream_type(handle.as_str()) {
            Ok(stream_type) => stream_type,
            Err(e) => {
                log::debug!("cannot tell whether `{}` is virtual: {e}", handle.as_str());
                None
            }
        };

        fs::create_dir_all(&self.cache_dir)?;
        let temp_file = tempfile::Builder::new()
            .prefix(".incoming-")
            .tempfile_in(&self.cache_dir)
            .map_err(|e| Error::TempFile(format!("Failed to create temp file: {}", e)))?;
        if !self
            .provider
            .copy_content(handle.as_str(), stream_type.as_deref(), temp_file.path())?
        {
            return Ok(None);
        }

        let target = self.cache_dir.join(file_name);
        temp_file.persist(&target).map_err(|e| {
            Error::TempFile(format!("Failed to persist {}: {}", target.display(), e.error))
        })?;
        log::debug!("copied `{}` to {}", handle.as_str(), target.display());
        Ok(Some(target.to_string_lossy().into_owned()))
    }

    fn cache_file_name(&self, handle: &ContentHandle) -> Option<String> {
        let display_name = match self.provider.display_name(handle.as_str()) {
            Ok(name) => name,
            Err(e) => {
                log::debug!("no display name for `{}`: {e}", handle.as_str());
                None
            }
        };
        display_name
            .as_deref()
            .and_then(plain_file_name)
            .or_else(|| handle.last_segment().and_then(plain_file_name))
    }
}

fn plain_file_name(name: &str) -> Option<String> {
    Path::new(name)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    use super::*;

    pub(crate) const STORAGE_ROOT: &str = "/storage/emulated/0";

    /// Content provider backed by maps. Selections are keyed as
    /// `<uri>?<clause>=<args>`.
    #[derive(Default)]
    pub(crate) struct FakeProvider {
        pub columns: HashMap<String, String>,
        pub streams: HashMap<String, Vec<u8>>,
        pub display_names: HashMap<String, String>,
        /// virtual document uri -> export MIME type
        pub virtual_types: HashMap<String, String>,
        pub failing: HashSet<String>,
        pub copies: RefCell<Vec<(String, Option<String>)>>,
    }

    impl FakeProvider {
        pub fn with_column(mut self, key: &str, path: &str) -> Self {
            self.columns.insert(key.to_string(), path.to_string());
            self
        }

        pub fn with_stream(mut self, uri: &str, bytes: &[u8]) -> Self {
            self.streams.insert(uri.to_string(), bytes.to_vec());
            self
        }

        pub fn with_display_name(mut self, uri: &str, name: &str) -> Self {
            self.display_names.insert(uri.to_string(), name.to_string());
            self
        }

        pub fn with_virtual_type(mut self, uri: &str, mime_type: &str) -> Self {
            self.virtual_types
                .insert(uri.to_string(), mime_type.to_string());
            self
        }

        pub fn failing_on(mut self, uri: &str) -> Self {
            self.failing.insert(uri.to_string());
            self
        }
    }

    impl ContentProvider for FakeProvider {
        fn query_data_column(
            &self,
            uri: &str,
            selection: Option<&Selection>,
        ) -> Result<Option<String>> {
            if self.failing.contains(uri) {
                return Err(Error::NativeApi(format!("query of {uri} failed")));
            }
            let key = match selection {
                Some(selection) => format!("{uri}?{}={}", selection.clause, selection.args.join(",")),
                None => uri.to_string(),
            };
            Ok(self.columns.get(&key).cloned())
        }

        fn display_name(&self, uri: &str) -> Result<Option<String>> {
            if self.failing.contains(uri) {
                return Err(Error::NativeApi(format!("query of {uri} failed")));
            }
            Ok(self.display_names.get(uri).cloned())
        }

        fn virtual_stream_type(&self, uri: &str) -> Result<Option<String>> {
            Ok(self.virtual_types.get(uri).cloned())
        }

        fn copy_content(
            &self,
            uri: &str,
            stream_type: Option<&str>,
            target: &Path,
        ) -> Result<bool> {
            self.copies
                .borrow_mut()
                .push((uri.to_string(), stream_type.map(str::to_string)));
            if self.virtual_types.contains_key(uri) && stream_type.is_none() {
                return Err(Error::NativeApi(format!("{uri} has no direct stream")));
            }
            match self.streams.get(uri) {
                Some(bytes) => {
                    fs::write(target, bytes)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    fn resolver(provider: FakeProvider, cache_dir: &Path) -> UriResolver<FakeProvider> {
        UriResolver::new(provider, STORAGE_ROOT, cache_dir)
    }

    #[test]
    fn resolves_known_providers() {
        let provider = FakeProvider::default()
            .with_column(
                "content://downloads/public_downloads/42",
                "/storage/emulated/0/Download/archive.zip",
            )
            .with_column(
                "content://downloads/my_downloads/17",
                "/storage/emulated/0/Download/mine.pdf",
            )
            .with_column(
                "content://media/external/images/media?_id=?=31",
                "/storage/emulated/0/DCIM/cat.jpg",
            )
            .with_column(
                "content://media/external/audio/media?_id=?=8",
                "/storage/emulated/0/Music/song.mp3",
            )
            .with_column(
                "content://media/external/video/media/9",
                "/storage/emulated/0/Movies/clip.mp4",
            );
        let cache = tempfile::tempdir().unwrap();
        let resolver = resolver(provider, cache.path());

        let cases: &[(&str, Option<&str>)] = &[
            (
                "/storage/emulated/0/Pictures/a.jpg",
                Some("/storage/emulated/0/Pictures/a.jpg"),
            ),
            (
                "file:///storage/emulated/0/My%20Doc.pdf",
                Some("/storage/emulated/0/My Doc.pdf"),
            ),
            (
                "content://com.android.externalstorage.documents/document/primary%3ADownload%2Freport.pdf",
                Some("/storage/emulated/0/Download/report.pdf"),
            ),
            (
                "content://com.android.externalstorage.documents/document/PRIMARY%3Anotes.txt",
                Some("/storage/emulated/0/notes.txt"),
            ),
            (
                "content://com.android.externalstorage.documents/document/home%3Aletter.odt",
                Some("/storage/emulated/0/documents/letter.odt"),
            ),
            (
                "content://com.android.externalstorage.documents/tree/primary%3ADownload/document/primary%3ADownload%2Fa.txt",
                Some("/storage/emulated/0/Download/a.txt"),
            ),
            (
                "content://com.android.externalstorage.documents/document/1234-ABCD%3Aphoto.jpg",
                None,
            ),
            (
                "content://com.android.providers.downloads.documents/document/raw%3A%2Fstorage%2Femulated%2F0%2FDownload%2Fbook.epub",
                Some("/storage/emulated/0/Download/book.epub"),
            ),
            (
                "content://com.android.providers.downloads.documents/document/42",
                Some("/storage/emulated/0/Download/archive.zip"),
            ),
            (
                "content://com.android.providers.downloads.documents/document/msf%3A17",
                Some("/storage/emulated/0/Download/mine.pdf"),
            ),
            (
                "content://com.android.providers.media.documents/document/image%3A31",
                Some("/storage/emulated/0/DCIM/cat.jpg"),
            ),
            (
                "content://com.android.providers.media.documents/document/audio%3A8",
                Some("/storage/emulated/0/Music/song.mp3"),
            ),
            (
                "content://com.android.providers.media.documents/document/video%3A404",
                None,
            ),
            (
                "content://com.android.providers.media.documents/document/document%3A5",
                None,
            ),
            (
                "content://media/external/video/media/9",
                Some("/storage/emulated/0/Movies/clip.mp4"),
            ),
            ("https://example.com/some/page", Some("/some/page")),
        ];

        for (handle, expected) in cases {
            assert_eq!(
                resolver.resolve(handle).as_deref(),
                *expected,
                "resolving {handle}"
            );
        }
    }

    #[test]
    fn unknown_download_is_copied_into_cache() {
        let uri = "content://com.android.providers.downloads.documents/document/58";
        let provider = FakeProvider::default().with_stream(uri, b"pdf bytes");
        let cache = tempfile::tempdir().unwrap();
        let resolver = resolver(provider, cache.path());

        let path = resolver.resolve(uri).unwrap();
        assert_eq!(Path::new(&path), cache.path().join("58"));
        assert_eq!(fs::read(&path).unwrap(), b"pdf bytes");
    }

    #[test]
    fn copies_are_named_after_the_display_name() {
        let uri = "content://media/external/images/media/3";
        let provider = FakeProvider::default()
            .with_stream(uri, b"jpeg")
            .with_display_name(uri, "IMG_2024.jpg");
        let cache = tempfile::tempdir().unwrap();
        let resolver = resolver(provider, cache.path());

        let path = resolver.resolve(uri).unwrap();
        assert_eq!(Path::new(&path), cache.path().join("IMG_2024.jpg"));
        assert_eq!(fs::read(&path).unwrap(), b"jpeg");
    }

    #[test]
    fn display_names_cannot_escape_the_cache() {
        let uri = "content://com.example.files/shared/7";
        let provider = FakeProvider::default()
            .with_stream(uri, b"x")
            .with_display_name(uri, "../../etc/passwd");
        let cache = tempfile::tempdir().unwrap();
        let resolver = resolver(provider, cache.path());

        let path = resolver.resolve(uri).unwrap();
        assert_eq!(Path::new(&path), cache.path().join("passwd"));
    }

    #[test]
    fn virtual_documents_are_exported_by_type() {
        let uri = "content://com.google.android.apps.docs.storage/document/acc%3D1%3Bdoc%3D9";
        let provider = FakeProvider::default()
            .with_stream(uri, b"%PDF")
            .with_display_name(uri, "Budget.pdf")
            .with_virtual_type(uri, "application/pdf");
        let cache = tempfile::tempdir().unwrap();
        let resolver = resolver(provider, cache.path());

        let path = resolver.resolve(uri).unwrap();
        assert_eq!(Path::new(&path), cache.path().join("Budget.pdf"));
        assert_eq!(
            *resolver.provider.copies.borrow(),
            vec![(uri.to_string(), Some("application/pdf".to_string()))]
        );
    }

    #[test]
    fn non_numeric_download_id_falls_back_to_copy() {
        let uri = "content://com.android.providers.downloads.documents/document/msf%3Aabc";
        let provider = FakeProvider::default().with_stream(uri, b"data");
        let cache = tempfile::tempdir().unwrap();
        let resolver = resolver(provider, cache.path());

        let path = resolver.resolve(uri).unwrap();
        assert_eq!(Path::new(&path), cache.path().join("msf:abc"));
    }

    #[test]
    fn generic_content_without_data_column_is_copied() {
        let uri = "content://com.whatsapp.provider.media/item/photo.jpg";
        let provider = FakeProvider::default()
            .failing_on(uri)
            .with_stream(uri, b"jpeg");
        let cache = tempfile::tempdir().unwrap();
        let resolver = resolver(provider, cache.path());

        let path = resolver.resolve(uri).unwrap();
        assert_eq!(Path::new(&path), cache.path().join("photo.jpg"));
        assert_eq!(fs::read(&path).unwrap(), b"jpeg");
    }

    #[test]
    fn copies_with_the_same_name_overwrite() {
        let uri = "content://com.example.files/shared/report.txt";
        let cache = tempfile::tempdir().unwrap();

        let first = resolver(FakeProvider::default().with_stream(uri, b"one"), cache.path());
        let second = resolver(FakeProvider::default().with_stream(uri, b"two"), cache.path());
        let a = first.resolve(uri).unwrap();
        let b = second.resolve(uri).unwrap();

        assert_eq!(a, b);
        assert_eq!(fs::read(&b).unwrap(), b"two");
    }

    #[test]
    fn uniquified_copies_do_not_collide() {
        let uri = "content://com.example.files/shared/report.txt";
        let cache = tempfile::tempdir().unwrap();
        let resolver = resolver(FakeProvider::default().with_stream(uri, b"x"), cache.path())
            .uniquify_cache_files(true);

        let a = resolver.resolve(uri).unwrap();
        let b = resolver.resolve(uri).unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with("-report.txt"));
        assert!(Path::new(&a).starts_with(cache.path()));
    }

    #[test]
    fn missing_stream_resolves_to_nothing() {
        let cache = tempfile::tempdir().unwrap();
        let resolver = resolver(FakeProvider::default(), cache.path());
        assert_eq!(
            resolver.resolve("content://com.example.files/shared/gone.txt"),
            None
        );
        assert_eq!(fs::read_dir(cache.path()).unwrap().count(), 0);
    }

    #[test]
    fn io_failure_during_copy_is_not_fatal() {
        let uri = "content://com.example.files/shared/report.txt";
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("not-a-dir");
        fs::write(&blocked, b"").unwrap();
        let resolver = resolver(FakeProvider::default().with_stream(uri, b"x"), &blocked);

        assert_eq!(resolver.resolve(uri), None);
    }

    #[test]
    fn handle_exposes_document_id_and_last_segment() {
        let handle = ContentHandle::parse(
            "content://com.android.providers.downloads.documents/document/msf%3A17",
        )
        .unwrap();
        assert_eq!(handle.authority(), Some(DOWNLOADS_AUTHORITY));
        assert_eq!(handle.document_id(), Some("msf:17"));
        assert_eq!(handle.last_segment(), Some("msf:17"));

        let plain = ContentHandle::parse("content://media/external/images/media/3").unwrap();
        assert_eq!(plain.document_id(), None);
        assert_eq!(plain.last_segment(), Some("3"));
    }
}
