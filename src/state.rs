use crate::models::SharedPayload;

/// Where a track is in its lifecycle since start-up or the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackPhase {
    #[default]
    Empty,
    InitialSet,
    Updated,
}

/// The initial and latest value of one kind of share.
#[derive(Debug, Clone)]
pub struct Track<T> {
    initial: Option<T>,
    latest: Option<T>,
    phase: TrackPhase,
}

impl<T> Default for Track<T> {
    fn default() -> Self {
        Self {
            initial: None,
            latest: None,
            phase: TrackPhase::Empty,
        }
    }
}

impl<T: Clone> Track<T> {
    /// The first value after start-up (or reset) becomes the initial value;
    /// every value overwrites the latest one.
    pub fn record(&mut self, value: T) {
        match self.phase {
            TrackPhase::Empty => {
                self.initial = Some(value.clone());
                self.phase = TrackPhase::InitialSet;
            }
            TrackPhase::InitialSet | TrackPhase::Updated => {
                self.phase = TrackPhase::Updated;
            }
        }
        self.latest = Some(value);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn initial(&self) -> Option<&T> {
        self.initial.as_ref()
    }

    pub fn latest(&self) -> Option<&T> {
        self.latest.as_ref()
    }

    pub fn phase(&self) -> TrackPhase {
        self.phase
    }
}

/// Everything the plugin remembers about received shares.
#[derive(Debug, Clone, Default)]
pub struct ShareSessionState {
    pub text: Track<String>,
    pub file: Track<Vec<String>>,
}

impl ShareSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, payload: SharedPayload) {
        match payload {
            SharedPayload::Text(text) => self.text.record(text),
            SharedPayload::FileList(files) => self.file.record(files),
        }
    }

    pub fn reset(&mut self) {
        self.text.clear();
        self.file.clear();
    }
}
