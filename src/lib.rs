//! # tauri-plugin-receive-share
//!
//! A Tauri plugin that receives text, URLs and files shared into the app by other applications.
//!
//! On Android the plugin listens for `SEND`, `SEND_MULTIPLE` and `VIEW` intents and resolves the
//! attached content URIs to paths the app can open, copying content into the app cache when no
//! real path exists. On iOS the app's share extension stores what it received in the App Group
//! and opens the app through a custom URL; the plugin reads the stored entries back. On desktop,
//! files and URLs passed on the command line count as the initial share.
//!
//! The plugin keeps the *initial* share (the first one since start-up or the last reset) and
//! pushes every later share to the frontend through a channel.
//!
//! ## Usage
//!
//! ### Rust
//!
//! ```rust,ignore
//! // src/main.rs
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(tauri_plugin_receive_share::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
//!
//! ### Configuration
//!
//! ```json
//! {
//!   "plugins": {
//!     "receive-share": {
//!       "appGroupId": "group.com.example.app",
//!       "sharedKey": "ShareKey",
//!       "urlScheme": "ShareMedia",
//!       "uniquifyCacheFiles": false
//!     }
//!   }
//! }
//! ```
//!
//! ### Frontend (JavaScript/TypeScript)
//!
//! ```js
//! import { invoke, Channel } from '@tauri-apps/api/core';
//!
//! const initialFiles = await invoke('plugin:receive-share|get_initial_file');
//!
//! const onEvent = new Channel();
//! onEvent.onmessage = (text) => console.log('shared text', text);
//! await invoke('plugin:receive-share|listen', { kind: 'text', onEvent });
//!
//! // once handled
//! await invoke('plugin:receive-share|reset');
//! ```

use std::sync::Arc;

use tauri::{
    plugin::{Builder, TauriPlugin},
    Manager, Runtime,
};

pub use models::*;

#[cfg(desktop)]
mod desktop;
#[cfg(mobile)]
mod mobile;

pub mod app_group;
pub mod batch;
mod commands;
mod config;
mod error;
pub mod extension;
pub mod intent;
mod models;
pub mod resolver;
mod session;
mod state;
pub mod thumbnail;

pub use config::Config;
pub use error::{Error, Result};
pub use session::{PayloadSink, ShareSession};
pub use state::{ShareSessionState, Track, TrackPhase};

#[cfg(desktop)]
pub use desktop::ReceiveShare;
#[cfg(mobile)]
pub use mobile::ReceiveShare;

/// Extensions to [`tauri::App`], [`tauri::AppHandle`] and [`tauri::Window`] to access the receive-share APIs.
pub trait ReceiveShareExt<R: Runtime> {
    fn receive_share(&self) -> &ReceiveShare<R>;
}

impl<R: Runtime, T: Manager<R>> crate::ReceiveShareExt<R> for T {
    fn receive_share(&self) -> &ReceiveShare<R> {
        self.state::<ReceiveShare<R>>().inner()
    }
}

/// Initializes the plugin.
///
/// Creates the share session, hooks the platform share source up to it and
/// captures the share the app was launched with, if any.
pub fn init<R: Runtime>() -> TauriPlugin<R, Option<Config>> {
    Builder::<R, Option<Config>>::new("receive-share")
        .invoke_handler(tauri::generate_handler![
            commands::get_initial_text,
            commands::get_initial_file,
            commands::reset,
            commands::listen,
            commands::cancel,
            commands::request,
        ])
        .setup(|app, api| {
            let config = api.config().clone().unwrap_or_default();
            let session = Arc::new(ShareSession::new());
            #[cfg(mobile)]
            let receive_share = mobile::init(app, api, &config, session)?;
            #[cfg(desktop)]
            let receive_share = desktop::init(app, api, &config, session)?;
            app.manage(receive_share);
            Ok(())
        })
        .build()
}
