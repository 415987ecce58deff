use std::sync::Arc;

use serde_json::Value;
use tauri::{command, ipc::Channel, AppHandle, Runtime};

use crate::{error, models::SharedPayload, models::StreamKind, ReceiveShareExt};

#[command]
pub async fn get_initial_text<R: Runtime>(
    app: AppHandle<R>,
) -> Result<Option<String>, error::Error> {
    Ok(app.receive_share().session().initial_text())
}

#[command]
pub async fn get_initial_file<R: Runtime>(
    app: AppHandle<R>,
) -> Result<Option<Vec<String>>, error::Error> {
    Ok(app.receive_share().session().initial_file())
}

#[command]
pub async fn reset<R: Runtime>(app: AppHandle<R>) -> Result<(), error::Error> {
    app.receive_share().session().reset();
    Ok(())
}

#[command]
pub async fn listen<R: Runtime>(
    app: AppHandle<R>,
    kind: String,
    on_event: Channel<SharedPayload>,
) -> Result<(), error::Error> {
    let kind: StreamKind = kind.parse()?;
    app.receive_share().session().subscribe(
        kind,
        Arc::new(move |payload| {
            if let Err(e) = on_event.send(payload.clone()) {
                log::warn!("could not deliver {kind} share: {e}");
            }
        }),
    );
    Ok(())
}

#[command]
pub async fn cancel<R: Runtime>(app: AppHandle<R>, kind: String) -> Result<(), error::Error> {
    let kind: StreamKind = kind.parse()?;
    app.receive_share().session().unsubscribe(kind);
    Ok(())
}

#[command]
pub async fn request<R: Runtime>(app: AppHandle<R>, method: String) -> Result<Value, error::Error> {
    app.receive_share().session().handle_request(&method)
}
