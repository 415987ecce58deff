use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tauri::{plugin::PluginApi, AppHandle, Runtime, Url};

use crate::{models::SharedPayload, Config, ShareSession};

/// Initialize the desktop plugin. Desktop has no share sheet to receive
/// from, so the command line stands in for the initial share.
pub fn init<R: Runtime, C: DeserializeOwned>(
    app: &AppHandle<R>,
    _api: PluginApi<R, C>,
    config: &Config,
    session: Arc<ShareSession>,
) -> crate::Result<ReceiveShare<R>> {
    let receive_share = ReceiveShare {
        _app: app.clone(),
        session,
    };
    if config.capture_launch_args {
        if let Some(payload) = classify_launch_args(std::env::args().skip(1)) {
            log::info!("launched with a {} share", payload.kind());
            receive_share.session.publish(payload);
        }
    }
    Ok(receive_share)
}

/// Access to the receive-share APIs.
pub struct ReceiveShare<R: Runtime> {
    _app: AppHandle<R>,
    session: Arc<ShareSession>,
}

impl<R: Runtime> ReceiveShare<R> {
    pub fn session(&self) -> &ShareSession {
        &self.session
    }

    /// Feeds a text or URL handed over by the host, e.g. from a
    /// single-instance or deep-link handler.
    pub fn share_text(&self, text: impl Into<String>) {
        self.session.publish(SharedPayload::Text(text.into()));
    }

    /// Feeds files handed over by the host. Paths that do not name an
    /// existing file are dropped.
    pub fn share_files<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let files = paths
            .into_iter()
            .filter_map(|path| local_file(path.as_ref()))
            .collect();
        self.session.publish(SharedPayload::FileList(files));
    }
}

fn local_file(path: &Path) -> Option<String> {
    if !path.is_file() {
        log::debug!("ignoring {}: not a file", path.display());
        return None;
    }
    let path = path.canonicalize().ok()?;
    Some(path.to_string_lossy().into_owned())
}

/// Existing files (plain or `file://`) win over URLs; flags are skipped.
fn classify_launch_args<I: IntoIterator<Item = String>>(args: I) -> Option<SharedPayload> {
    let args: Vec<String> = args
        .into_iter()
        .filter(|arg| !arg.is_empty() && !arg.starts_with('-'))
        .collect();

    let files: Vec<String> = args
        .iter()
        .filter_map(|arg| match Url::parse(arg) {
            Ok(url) if url.scheme() == "file" => {
                url.to_file_path().ok().and_then(|path| local_file(&path))
            }
            _ => local_file(Path::new(arg)),
        })
        .collect();
    if !files.is_empty() {
        return Some(SharedPayload::FileList(files));
    }

    args.into_iter()
        .find(|arg| Url::parse(arg).is_ok())
        .map(SharedPayload::Text)
}
