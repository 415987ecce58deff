use crate::models::{IntentAction, RawIntent, SharedPayload};
use crate::resolver::{ContentProvider, UriResolver};

/// Classifies an Android intent into a share payload.
///
/// `None` means the intent carries nothing shareable (a plain launch, a
/// text action without text, a file action without streams) and must not
/// touch the session. A text-typed `SEND` with only a stream is a file share.
pub fn classify<P: ContentProvider>(
    intent: &RawIntent,
    resolver: &UriResolver<P>,
) -> Option<SharedPayload> {
    match intent.action {
        IntentAction::Send
            if is_text_type(intent.mime_type.as_deref())
                && (intent.text.is_some() || intent.streams.is_empty()) =>
        {
            intent.text.clone().map(SharedPayload::Text)
        }
        IntentAction::View => intent.data.clone().map(SharedPayload::Text),
        IntentAction::Send => {
            let stream = intent.streams.first()?;
            Some(SharedPayload::FileList(
                resolver.resolve(stream).into_iter().collect(),
            ))
        }
        IntentAction::SendMultiple if !intent.streams.is_empty() => Some(SharedPayload::FileList(
            intent
                .streams
                .iter()
                .filter_map(|stream| resolver.resolve(stream))
                .collect(),
        )),
        IntentAction::SendMultiple | IntentAction::Other(_) => None,
    }
}

fn is_text_type(mime_type: Option<&str>) -> bool {
    mime_type.map_or(true, |mime| mime.starts_with("text"))
}
