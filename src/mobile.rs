use std::sync::Arc;

#[cfg(target_os = "android")]
use serde::Deserialize;
use serde::{de::DeserializeOwned, Serialize};
use tauri::{
    ipc::{Channel, InvokeResponseBody},
    plugin::{PluginApi, PluginHandle},
    AppHandle, Manager, Runtime,
};

use crate::{Config, ShareSession};

#[cfg(target_os = "android")]
use crate::{intent, models::RawIntent, resolver::UriResolver};
#[cfg(target_os = "ios")]
use crate::{app_group::AppGroup, models::OpenUrlEvent};

#[cfg(target_os = "android")]
pub use self::android::NativeContentProvider;
#[cfg(target_os = "ios")]
pub use self::ios::{NativeAssetLibrary, NativeSharedStore};

#[cfg(target_os = "android")]
const PLUGIN_IDENTIFIER: &str = "app.tauri.receiveshare";
#[cfg(target_os = "android")]
const DEFAULT_STORAGE_ROOT: &str = "/storage/emulated/0";

#[cfg(target_os = "ios")]
tauri::ios_plugin_binding!(init_plugin_receive_share);

#[derive(Serialize)]
struct RegisterListener {
    event: &'static str,
    handler: Channel,
}

// initializes the Kotlin or Swift plugin classes and wires their share
// events into the session
pub fn init<R: Runtime, C: DeserializeOwned>(
    app: &AppHandle<R>,
    api: PluginApi<R, C>,
    config: &Config,
    session: Arc<ShareSession>,
) -> crate::Result<ReceiveShare<R>> {
    #[cfg(target_os = "android")]
    let handle = api.register_android_plugin(PLUGIN_IDENTIFIER, "ReceiveSharePlugin")?;
    #[cfg(target_os = "ios")]
    let handle = api.register_ios_plugin(init_plugin_receive_share)?;

    let receive_share = ReceiveShare::new(app, handle, config, session)?;
    if let Err(e) = receive_share.capture_launch_share() {
        log::warn!("could not read the launch share: {e}");
    }
    if let Err(e) = receive_share.listen_for_shares() {
        log::error!("share events will not be received: {e}");
    }
    Ok(receive_share)
}

/// Access to the receive-share APIs.
pub struct ReceiveShare<R: Runtime> {
    handle: PluginHandle<R>,
    session: Arc<ShareSession>,
    #[cfg(target_os = "android")]
    resolver: Arc<UriResolver<NativeContentProvider<R>>>,
    #[cfg(target_os = "ios")]
    app_group: Arc<AppGroup<NativeSharedStore<R>, NativeAssetLibrary<R>>>,
}

impl<R: Runtime> ReceiveShare<R> {
    pub fn session(&self) -> &ShareSession {
        &self.session
    }
}

#[cfg(target_os = "android")]
#[derive(Deserialize)]
struct LaunchIntentResponse {
    intent: Option<RawIntent>,
}

#[cfg(target_os = "android")]
#[derive(Deserialize)]
struct PathResponse {
    path: String,
}

#[cfg(target_os = "android")]
impl<R: Runtime> ReceiveShare<R> {
    fn new(
        app: &AppHandle<R>,
        handle: PluginHandle<R>,
        config: &Config,
        session: Arc<ShareSession>,
    ) -> crate::Result<Self> {
        let storage_root = match handle.run_mobile_plugin::<PathResponse>("getExternalStorageDirectory", ()) {
            Ok(response) => response.path,
            Err(e) => {
                log::warn!("external storage directory unavailable, using {DEFAULT_STORAGE_ROOT}: {e}");
                DEFAULT_STORAGE_ROOT.to_string()
            }
        };
        let cache_dir = app.path().app_cache_dir()?;
        let resolver = UriResolver::new(NativeContentProvider(handle.clone()), storage_root, cache_dir)
            .uniquify_cache_files(config.uniquify_cache_files);

        Ok(Self {
            handle,
            session,
            resolver: Arc::new(resolver),
        })
    }

    /// Classifies an intent and records it. Intents without shareable
    /// content are ignored.
    pub fn handle_intent(&self, intent: &RawIntent) {
        publish_intent(&self.session, &self.resolver, intent);
    }

    fn capture_launch_share(&self) -> crate::Result<()> {
        let response: LaunchIntentResponse = self.handle.run_mobile_plugin("getLaunchIntent", ())?;
        if let Some(intent) = response.intent {
            self.handle_intent(&intent);
        }
        Ok(())
    }

    fn listen_for_shares(&self) -> crate::Result<()> {
        let session = self.session.clone();
        let resolver = self.resolver.clone();
        let handler = Channel::new(move |body: InvokeResponseBody| {
            match body.deserialize::<RawIntent>() {
                Ok(intent) => publish_intent(&session, &resolver, &intent),
                Err(e) => log::warn!("malformed intent from native plugin: {e}"),
            }
            Ok(())
        });
        self.handle.run_mobile_plugin::<serde_json::Value>(
            "registerListener",
            RegisterListener {
                event: "newIntent",
                handler,
            },
        )?;
        Ok(())
    }
}

#[cfg(target_os = "android")]
fn publish_intent<R: Runtime>(
    session: &ShareSession,
    resolver: &UriResolver<NativeContentProvider<R>>,
    intent: &RawIntent,
) {
    match intent::classify(intent, resolver) {
        Some(payload) => session.publish(payload),
        None => log::debug!("intent {:?} carries nothing to share", intent.action),
    }
}

#[cfg(target_os = "ios")]
impl<R: Runtime> ReceiveShare<R> {
    fn new(
        app: &AppHandle<R>,
        handle: PluginHandle<R>,
        config: &Config,
        session: Arc<ShareSession>,
    ) -> crate::Result<Self> {
        let namespace = config.app_group(&app.config().identifier);
        let app_group = AppGroup::new(
            NativeSharedStore(handle.clone()),
            NativeAssetLibrary(handle.clone()),
            namespace,
        )
        .with_shared_key(config.shared_key.clone())
        .with_url_scheme(config.url_scheme.clone());
        Ok(Self {
            handle,
            session,
            app_group: Arc::new(app_group),
        })
    }

    /// Reads the share behind an open-URL event and records it.
    pub fn handle_open_url(&self, url: &str) {
        publish_url(&self.session, &self.app_group, url);
    }

    fn capture_launch_share(&self) -> crate::Result<()> {
        let response: OpenUrlEvent = self.handle.run_mobile_plugin("getLaunchUrl", ())?;
        if let Some(url) = response.url {
            self.handle_open_url(&url);
        }
        Ok(())
    }

    fn listen_for_shares(&self) -> crate::Result<()> {
        let session = self.session.clone();
        let app_group = self.app_group.clone();
        let handler = Channel::new(move |body: InvokeResponseBody| {
            match body.deserialize::<OpenUrlEvent>() {
                Ok(OpenUrlEvent { url: Some(url) }) => publish_url(&session, &app_group, &url),
                Ok(OpenUrlEvent { url: None }) => {}
                Err(e) => log::warn!("malformed open-url event from native plugin: {e}"),
            }
            Ok(())
        });
        self.handle.run_mobile_plugin::<serde_json::Value>(
            "registerListener",
            RegisterListener {
                event: "openUrl",
                handler,
            },
        )?;
        Ok(())
    }
}

#[cfg(target_os = "ios")]
fn publish_url<R: Runtime>(
    session: &ShareSession,
    app_group: &AppGroup<NativeSharedStore<R>, NativeAssetLibrary<R>>,
    url: &str,
) {
    match app_group.read_share(url) {
        Some(payload) => session.publish(payload),
        None => log::debug!("url `{url}` carries nothing to share"),
    }
}

#[cfg(target_os = "android")]
mod android {
    use std::path::Path;

    use serde::{Deserialize, Serialize};
    use tauri::{plugin::PluginHandle, Runtime};

    use crate::resolver::{ContentProvider, Selection};
    use crate::{Error, Result};

    /// Content resolver calls forwarded to the Kotlin plugin. Content bytes
    /// never cross the bridge; the Kotlin side writes them to the target file.
    pub struct NativeContentProvider<R: Runtime>(pub(super) PluginHandle<R>);

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct QueryDataColumnArgs<'a> {
        uri: &'a str,
        selection: Option<&'a str>,
        selection_args: &'a [String],
    }

    #[derive(Serialize)]
    struct UriArgs<'a> {
        uri: &'a str,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct CopyContentArgs<'a> {
        uri: &'a str,
        stream_type: Option<&'a str>,
        target: &'a str,
    }

    #[derive(Deserialize)]
    struct ValueResponse {
        value: Option<String>,
    }

    #[derive(Deserialize)]
    struct CopyContentResponse {
        copied: bool,
    }

    impl<R: Runtime> NativeContentProvider<R> {
        fn value(&self, method: &str, uri: &str) -> Result<Option<String>> {
            let response: ValueResponse = self.0.run_mobile_plugin(method, UriArgs { uri })?;
            Ok(response.value)
        }
    }

    impl<R: Runtime> ContentProvider for NativeContentProvider<R> {
        fn query_data_column(&self, uri: &str, selection: Option<&Selection>) -> Result<Option<String>> {
            let response: ValueResponse = self.0.run_mobile_plugin(
                "queryDataColumn",
                QueryDataColumnArgs {
                    uri,
                    selection: selection.map(|selection| selection.clause.as_str()),
                    selection_args: selection
                        .map(|selection| selection.args.as_slice())
                        .unwrap_or_default(),
                },
            )?;
            Ok(response.value)
        }

        fn display_name(&self, uri: &str) -> Result<Option<String>> {
            self.value("queryDisplayName", uri)
        }

        fn virtual_stream_type(&self, uri: &str) -> Result<Option<String>> {
            self.value("virtualStreamType", uri)
        }

        fn copy_content(&self, uri: &str, stream_type: Option<&str>, target: &Path) -> Result<bool> {
            let target = target
                .to_str()
                .ok_or_else(|| Error::InvalidArgs(format!("{} is not UTF-8", target.display())))?;
            let response: CopyContentResponse = self.0.run_mobile_plugin(
                "copyContent",
                CopyContentArgs {
                    uri,
                    stream_type,
                    target,
                },
            )?;
            Ok(response.copied)
        }
    }
}

#[cfg(target_os = "ios")]
mod ios {
    use serde::{Deserialize, Serialize};
    use serde_json::Value;
    use tauri::{plugin::PluginHandle, Runtime};

    use crate::app_group::{AssetLibrary, SharedStore};
    use crate::Result;

    /// App Group `UserDefaults` access through the Swift plugin.
    pub struct NativeSharedStore<R: Runtime>(pub(super) PluginHandle<R>);

    /// Photo library access through the Swift plugin.
    pub struct NativeAssetLibrary<R: Runtime>(pub(super) PluginHandle<R>);

    #[derive(Serialize)]
    struct DefaultsArgs<'a> {
        suite: &'a str,
        key: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    }

    #[derive(Deserialize)]
    struct DefaultsResponse {
        value: Option<Value>,
    }

    #[derive(Serialize)]
    struct AssetArgs<'a> {
        identifier: &'a str,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct FindAssetArgs<'a> {
        file_name: &'a str,
    }

    #[derive(Deserialize)]
    struct UrlResponse {
        url: Option<String>,
    }

    #[derive(Deserialize)]
    struct IdentifierResponse {
        identifier: Option<String>,
    }

    impl<R: Runtime> SharedStore for NativeSharedStore<R> {
        fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>> {
            let response: DefaultsResponse = self.0.run_mobile_plugin(
                "readSharedDefaults",
                DefaultsArgs {
                    suite: namespace,
                    key,
                    value: None,
                },
            )?;
            Ok(response.value)
        }

        fn set(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
            self.0.run_mobile_plugin::<Value>(
                "writeSharedDefaults",
                DefaultsArgs {
                    suite: namespace,
                    key,
                    value: Some(value),
                },
            )?;
            Ok(())
        }
    }

    impl<R: Runtime> AssetLibrary for NativeAssetLibrary<R> {
        fn file_url(&self, local_identifier: &str) -> Result<Option<String>> {
            let response: UrlResponse = self.0.run_mobile_plugin(
                "resolveAsset",
                AssetArgs {
                    identifier: local_identifier,
                },
            )?;
            Ok(response.url)
        }

        fn find_by_file_stem(&self, stem: &str) -> Result<Option<String>> {
            let response: IdentifierResponse =
                self.0.run_mobile_plugin("findAsset", FindAssetArgs { file_name: stem })?;
            Ok(response.identifier)
        }
    }
}
