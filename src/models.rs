use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Content handed to the app by a single share event.
///
/// Serialized untagged so the frontend receives either a plain string or an
/// array of file paths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SharedPayload {
    Text(String),
    FileList(Vec<String>),
}

impl SharedPayload {
    pub fn kind(&self) -> StreamKind {
        match self {
            SharedPayload::Text(_) => StreamKind::Text,
            SharedPayload::FileList(_) => StreamKind::File,
        }
    }
}

/// The two push subscriptions a host can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Text,
    File,
}

impl FromStr for StreamKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(StreamKind::Text),
            "file" => Ok(StreamKind::File),
            other => Err(Error::NotImplemented(format!("stream kind `{other}`"))),
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Text => f.write_str("text"),
            StreamKind::File => f.write_str("file"),
        }
    }
}

/// Request names understood by the generic `request` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    GetInitialText,
    GetInitialFile,
    Reset,
}

impl FromStr for Request {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "getInitialText" => Ok(Request::GetInitialText),
            "getInitialFile" => Ok(Request::GetInitialFile),
            "reset" => Ok(Request::Reset),
            other => Err(Error::NotImplemented(format!("method `{other}`"))),
        }
    }
}

/// Android intent action, as delivered by the native shim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum IntentAction {
    Send,
    SendMultiple,
    View,
    Other(String),
}

impl IntentAction {
    pub const SEND: &'static str = "android.intent.action.SEND";
    pub const SEND_MULTIPLE: &'static str = "android.intent.action.SEND_MULTIPLE";
    pub const VIEW: &'static str = "android.intent.action.VIEW";
}

impl From<String> for IntentAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            Self::SEND => IntentAction::Send,
            Self::SEND_MULTIPLE => IntentAction::SendMultiple,
            Self::VIEW => IntentAction::View,
            _ => IntentAction::Other(value),
        }
    }
}

impl From<IntentAction> for String {
    fn from(value: IntentAction) -> Self {
        match value {
            IntentAction::Send => IntentAction::SEND.to_string(),
            IntentAction::SendMultiple => IntentAction::SEND_MULTIPLE.to_string(),
            IntentAction::View => IntentAction::VIEW.to_string(),
            IntentAction::Other(action) => action,
        }
    }
}

/// The parts of an Android `Intent` the plugin looks at.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIntent {
    pub action: IntentAction,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// `Intent.EXTRA_TEXT`.
    #[serde(default)]
    pub text: Option<String>,
    /// `Intent.getDataString()`.
    #[serde(default)]
    pub data: Option<String>,
    /// `Intent.EXTRA_STREAM` URIs, in the order the sender attached them.
    #[serde(default)]
    pub streams: Vec<String>,
}

/// Payload of the iOS `openUrl` event.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenUrlEvent {
    pub url: Option<String>,
}

/// Kind of media a share extension recorded for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SharedMediaType {
    Image,
    Video,
    File,
}

/// A file entry written to the shared store by the share extension.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedMediaRecord {
    /// A `file://` URL inside the shared container, or a photo-library
    /// local identifier.
    pub path: String,
    pub thumbnail: Option<String>,
    #[serde(rename = "type")]
    pub media_type: SharedMediaType,
}
