use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::models::{Request, SharedPayload, StreamKind};
use crate::state::ShareSessionState;
use crate::Result;

/// Receives every update of one stream while attached.
pub type PayloadSink = Arc<dyn Fn(&SharedPayload) + Send + Sync>;

#[derive(Default)]
struct Subscriptions {
    text: Option<PayloadSink>,
    file: Option<PayloadSink>,
}

impl Subscriptions {
    fn slot(&mut self, kind: StreamKind) -> &mut Option<PayloadSink> {
        match kind {
            StreamKind::Text => &mut self.text,
            StreamKind::File => &mut self.file,
        }
    }
}

#[derive(Default)]
struct Inner {
    state: ShareSessionState,
    subscriptions: Subscriptions,
}

/// Share state for the running app plus the sinks attached to it.
///
/// One instance is created by the plugin setup and shared with whichever
/// platform adapter feeds it events. Publishing is serialized, so an event is
/// recorded and delivered before the next one starts. Sinks run outside the
/// state lock and may read the session.
#[derive(Default)]
pub struct ShareSession {
    inner: Mutex<Inner>,
    publishing: Mutex<()>,
}

impl ShareSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        recover(self.inner.lock())
    }

    /// Records a normalized share event and pushes it to the matching sink.
    ///
    /// A sink must not publish on the calling thread.
    pub fn publish(&self, payload: SharedPayload) {
        let _publishing = recover(self.publishing.lock());
        let kind = payload.kind();
        log::debug!("received {kind} share");
        let sink = {
            let mut inner = self.lock();
            inner.state.record(payload.clone());
            inner.subscriptions.slot(kind).clone()
        };
        if let Some(sink) = sink {
            sink(&payload);
        }
    }

    pub fn initial_text(&self) -> Option<String> {
        self.lock().state.text.initial().cloned()
    }

    pub fn latest_text(&self) -> Option<String> {
        self.lock().state.text.latest().cloned()
    }

    pub fn initial_file(&self) -> Option<Vec<String>> {
        self.lock().state.file.initial().cloned()
    }

    pub fn latest_file(&self) -> Option<Vec<String>> {
        self.lock().state.file.latest().cloned()
    }

    pub fn reset(&self) {
        self.lock().state.reset();
        log::debug!("share session reset");
    }

    /// Attaches `sink` to a stream, replacing any previous one. Missed
    /// events are not replayed.
    pub fn subscribe(&self, kind: StreamKind, sink: PayloadSink) {
        *self.lock().subscriptions.slot(kind) = Some(sink);
    }

    pub fn unsubscribe(&self, kind: StreamKind) {
        self.lock().subscriptions.slot(kind).take();
    }

    /// Dispatches a request by its bridge method name.
    pub fn handle_request(&self, method: &str) -> Result<Value> {
        let value = match method.parse::<Request>()? {
            Request::GetInitialText => serde_json::to_value(self.initial_text())?,
            Request::GetInitialFile => serde_json::to_value(self.initial_file())?,
            Request::Reset => {
                self.reset();
                Value::Null
            }
        };
        Ok(value)
    }
}

fn recover<T>(result: std::sync::LockResult<MutexGuard<'_, T>>) -> MutexGuard<'_, T> {
    match result {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::error!("share session mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::Error;

    fn recorder() -> (Arc<Mutex<Vec<SharedPayload>>>, PayloadSink) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let sink: PayloadSink = Arc::new(move |payload| {
            sink_seen.lock().unwrap().push(payload.clone());
        });
        (seen, sink)
    }

    #[test]
    fn text_share_keeps_first_as_initial() {
        let session = ShareSession::new();
        let (seen, sink) = recorder();

        session.publish(SharedPayload::Text("hello world".into()));
        session.subscribe(StreamKind::Text, sink);
        session.publish(SharedPayload::Text("bye".into()));

        assert_eq!(session.initial_text().as_deref(), Some("hello world"));
        assert_eq!(session.latest_text().as_deref(), Some("bye"));
        assert_eq!(*seen.lock().unwrap(), vec![SharedPayload::Text("bye".into())]);
    }

    #[test]
    fn initial_is_first_and_latest_is_last_of_many() {
        let session = ShareSession::new();
        for n in 1..=5 {
            session.publish(SharedPayload::Text(format!("share {n}")));
        }
        assert_eq!(session.initial_text().as_deref(), Some("share 1"));
        assert_eq!(session.latest_text().as_deref(), Some("share 5"));
    }

    #[test]
    fn getters_are_idempotent() {
        let session = ShareSession::new();
        session.publish(SharedPayload::FileList(vec!["/a".into(), "/b".into()]));

        let first = session.initial_file();
        assert_eq!(first, session.initial_file());
        assert_eq!(first, session.initial_file());
        assert_eq!(session.initial_text(), None);
        assert_eq!(session.initial_text(), None);
    }

    #[test]
    fn reset_clears_everything_and_next_event_is_initial() {
        let session = ShareSession::new();
        session.publish(SharedPayload::Text("old".into()));
        session.publish(SharedPayload::FileList(vec!["/old".into()]));

        session.reset();
        assert_eq!(session.initial_text(), None);
        assert_eq!(session.latest_text(), None);
        assert_eq!(session.initial_file(), None);
        assert_eq!(session.latest_file(), None);

        session.publish(SharedPayload::Text("new".into()));
        assert_eq!(session.initial_text().as_deref(), Some("new"));
    }

    #[test]
    fn sinks_only_see_their_own_kind() {
        let session = ShareSession::new();
        let (texts, text_sink) = recorder();
        let (files, file_sink) = recorder();
        session.subscribe(StreamKind::Text, text_sink);
        session.subscribe(StreamKind::File, file_sink);

        session.publish(SharedPayload::FileList(vec!["/f".into()]));
        session.publish(SharedPayload::Text("t".into()));

        assert_eq!(*texts.lock().unwrap(), vec![SharedPayload::Text("t".into())]);
        assert_eq!(
            *files.lock().unwrap(),
            vec![SharedPayload::FileList(vec!["/f".into()])]
        );
    }

    #[test]
    fn unsubscribed_sink_stops_receiving() {
        let session = ShareSession::new();
        let (seen, sink) = recorder();
        session.subscribe(StreamKind::Text, sink);
        session.publish(SharedPayload::Text("one".into()));
        session.unsubscribe(StreamKind::Text);
        session.publish(SharedPayload::Text("two".into()));

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn sink_can_read_the_session() {
        let session = Arc::new(ShareSession::new());
        let (tx, rx) = mpsc::channel();
        let reader = Arc::downgrade(&session);
        session.subscribe(
            StreamKind::Text,
            Arc::new(move |_| {
                let latest = reader.upgrade().and_then(|session| session.latest_text());
                tx.send(latest).unwrap();
            }),
        );

        let publisher = session.clone();
        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || {
            publisher.publish(SharedPayload::Text("x".into()));
            done_tx.send(()).unwrap();
        });

        done_rx
            .recv_timeout(Duration::from_secs(3))
            .expect("publish did not return");
        assert_eq!(rx.recv().unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn concurrent_publishes_are_delivered_one_at_a_time() {
        let session = Arc::new(ShareSession::new());
        let (seen, sink) = recorder();
        session.subscribe(StreamKind::File, sink);

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let session = session.clone();
                thread::spawn(move || {
                    session.publish(SharedPayload::FileList(vec![format!("/f{n}")]));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 8);
        assert_eq!(
            session.latest_file(),
            match seen.last() {
                Some(SharedPayload::FileList(files)) => Some(files.clone()),
                other => panic!("unexpected delivery {other:?}"),
            }
        );
    }

    #[test]
    fn requests_dispatch_by_method_name() {
        let session = ShareSession::new();
        session.publish(SharedPayload::Text("hi".into()));

        assert_eq!(
            session.handle_request("getInitialText").unwrap(),
            serde_json::json!("hi")
        );
        assert_eq!(
            session.handle_request("getInitialFile").unwrap(),
            Value::Null
        );
        assert_eq!(session.handle_request("reset").unwrap(), Value::Null);
        assert_eq!(session.initial_text(), None);
        assert!(matches!(
            session.handle_request("getLatestText"),
            Err(Error::NotImplemented(_))
        ));
    }
}
