use crate::catalog::{AssetCatalog, ImageHandle};
use crate::error::BackdropError;
use crate::key::{BackgroundKey, KeyNormalizer};
use crate::sink::Sink;
use crate::video::backend::{Completion, PrepareOutcome, VideoBackend};
use crate::video::{DEFAULT_MIN_SURFACE, VideoSession};

/// What is currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Nothing,
    Static(BackgroundKey),
    Video(BackgroundKey),
}

impl Shown {
    pub fn key(&self) -> Option<&BackgroundKey> {
        match self {
            Shown::Nothing => None,
            Shown::Static(k) | Shown::Video(k) => Some(k),
        }
    }
}

/// The controller's state. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing requested yet, or a video could not start and nothing replaced it.
    Idle,
    ShowingStatic(BackgroundKey),
    /// A prepare for `key` is in flight; `shown` stays on screen meanwhile.
    Preparing {
        key: BackgroundKey,
        generation: u64,
        shown: Shown,
    },
    ShowingVideo(BackgroundKey),
}

impl PlaybackState {
    /// The key this state is handling, shown or in flight.
    pub fn key(&self) -> Option<&BackgroundKey> {
        match self {
            PlaybackState::Idle => None,
            PlaybackState::ShowingStatic(k)
            | PlaybackState::ShowingVideo(k)
            | PlaybackState::Preparing { key: k, .. } => Some(k),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::ShowingStatic(_) => "static",
            PlaybackState::Preparing { .. } => "preparing",
            PlaybackState::ShowingVideo(_) => "video",
        }
    }

    fn shown(&self) -> Shown {
        match self {
            PlaybackState::Idle => Shown::Nothing,
            PlaybackState::ShowingStatic(k) => Shown::Static(k.clone()),
            PlaybackState::ShowingVideo(k) => Shown::Video(k.clone()),
            PlaybackState::Preparing { shown, .. } => shown.clone(),
        }
    }
}

impl From<Shown> for PlaybackState {
    fn from(shown: Shown) -> Self {
        match shown {
            Shown::Nothing => PlaybackState::Idle,
            Shown::Static(k) => PlaybackState::ShowingStatic(k),
            Shown::Video(k) => PlaybackState::ShowingVideo(k),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    /// Surface size used when a video reports a degenerate size.
    pub min_surface: (u32, u32),
    /// Try a speculative video prepare even when a static image resolves.
    pub prefer_video: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            min_surface: DEFAULT_MIN_SURFACE,
            prefer_video: false,
        }
    }
}

/// Read-only snapshot for a host UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundInfo {
    pub state: &'static str,
    pub key: Option<String>,
    pub shown: Option<String>,
    pub surface: Option<(u32, u32)>,
    pub playing: bool,
    pub known_videos: usize,
    pub static_images: usize,
}

/// The video session is created on first video need and released on shutdown.
enum SessionSlot {
    Unstarted(Box<dyn VideoBackend>),
    Live(VideoSession),
    Released,
}

/// Decides between static and video backgrounds and drives the video session.
///
/// `request` is called once per "change background" directive and `poll`
/// once per host frame. Nothing here blocks or returns an error: failures
/// fall back to the static image or leave the display unchanged with a warning.
pub struct PlaybackController<S: Sink> {
    normalizer: KeyNormalizer,
    catalog: AssetCatalog,
    sink: S,
    video: SessionSlot,
    options: ControllerOptions,
    video_active: bool,
    state: PlaybackState,
}

impl<S: Sink> PlaybackController<S> {
    pub fn new(
        normalizer: KeyNormalizer,
        catalog: AssetCatalog,
        backend: Box<dyn VideoBackend>,
        sink: S,
        options: ControllerOptions,
    ) -> Self {
        Self {
            normalizer,
            catalog,
            sink,
            video: SessionSlot::Unstarted(backend),
            options,
            video_active: true,
            state: PlaybackState::Idle,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn session(&self) -> Option<&VideoSession> {
        match &self.video {
            SessionSlot::Live(s) => Some(s),
            _ => None,
        }
    }

    /// Tell the controller whether the video surface's owner is live.
    /// Reactivating while a video is shown restarts playback.
    pub fn set_video_active(&mut self, active: bool) {
        self.video_active = active;
        let SessionSlot::Live(session) = &mut self.video else {
            return;
        };
        session.set_active(active);
        if !active || session.is_playing() {
            return;
        }
        let PlaybackState::ShowingVideo(key) = &self.state else {
            return;
        };
        let key = key.clone();
        match session.play() {
            Ok(()) => log::debug!("Background '{key}' video resumed"),
            Err(cause) => {
                self.sink.hide_video();
                self.fall_back(key, Shown::Nothing, &cause);
            }
        }
    }

    pub fn info(&self) -> BackgroundInfo {
        let session = self.session();
        BackgroundInfo {
            state: self.state.label(),
            key: self.state.key().map(ToString::to_string),
            shown: self.state.shown().key().map(ToString::to_string),
            surface: session.and_then(|s| s.surface()).map(|s| (s.width, s.height)),
            playing: session.is_some_and(VideoSession::is_playing),
            known_videos: self.catalog.video_count(),
            static_images: self.catalog.static_count(),
        }
    }

    /// Handle a "change background" directive.
    pub fn request(&mut self, raw: &str) {
        if matches!(self.video, SessionSlot::Released) {
            log::debug!("Background request {raw:?} after shutdown ignored");
            return;
        }
        let key = match self.normalizer.normalize(raw) {
            Ok(key) => key,
            Err(e) => {
                log::debug!("Ignoring background request {raw:?}: {e}");
                return;
            }
        };

        if self.state.key() == Some(&key) {
            log::debug!("Background '{key}' already {}", self.state.label());
            return;
        }

        // Asking for what is still on screen while something else prepares:
        // drop the prepare and keep the current output as is.
        if let PlaybackState::Preparing { shown, .. } = &self.state {
            if shown.key() == Some(&key) {
                let shown = shown.clone();
                if let Some(s) = self.live_session_mut() {
                    s.abandon();
                }
                log::debug!("Background '{key}' still shown; pending prepare dropped");
                self.state = shown.into();
                return;
            }
        }

        if self.catalog.has_known_video(&key) {
            self.begin_prepare(key);
            return;
        }

        if !self.options.prefer_video {
            if let Some(image) = self.catalog.resolve_static(&key) {
                self.show_static(key, &image);
                return;
            }
        }

        log::debug!("No known video for '{key}'; trying a speculative prepare");
        self.begin_prepare(key);
    }

    /// Apply finished prepares. Returns true if the state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Some(completion) = self.live_session_mut().and_then(VideoSession::poll) {
            changed |= self.on_completion(completion);
        }
        changed
    }

    /// Stop playback and release the video session.
    pub fn shutdown(&mut self) {
        if let SessionSlot::Live(session) = &mut self.video {
            session.release();
            if matches!(self.state.shown(), Shown::Video(_)) {
                self.sink.hide_video();
            }
        }
        self.video = SessionSlot::Released;
        self.state = match self.state.shown() {
            Shown::Static(k) => PlaybackState::ShowingStatic(k),
            Shown::Nothing | Shown::Video(_) => PlaybackState::Idle,
        };
        log::debug!("Background controller shut down");
    }

    fn live_session_mut(&mut self) -> Option<&mut VideoSession> {
        match &mut self.video {
            SessionSlot::Live(s) => Some(s),
            _ => None,
        }
    }

    fn session_mut(&mut self) -> Option<&mut VideoSession> {
        if matches!(self.video, SessionSlot::Unstarted(_)) {
            if let SessionSlot::Unstarted(backend) =
                std::mem::replace(&mut self.video, SessionSlot::Released)
            {
                let mut session = VideoSession::new(backend, self.options.min_surface);
                session.set_active(self.video_active);
                self.video = SessionSlot::Live(session);
            }
        }
        self.live_session_mut()
    }

    fn begin_prepare(&mut self, key: BackgroundKey) {
        let url = self.catalog.video_url(&key);
        let shown = self.state.shown();
        let Some(session) = self.session_mut() else {
            return;
        };
        let generation = session.prepare(&url);
        self.state = PlaybackState::Preparing {
            key,
            generation,
            shown,
        };
    }

    fn show_static(&mut self, key: BackgroundKey, image: &ImageHandle) {
        if let Some(s) = self.live_session_mut() {
            s.abandon();
            s.stop();
        }
        self.sink.hide_video();
        self.sink.show_static(image);
        log::info!("Background '{key}' -> image '{}'", image.name);
        self.state = PlaybackState::ShowingStatic(key);
    }

    fn on_completion(&mut self, completion: Completion) -> bool {
        let (key, shown) = match &self.state {
            PlaybackState::Preparing {
                key,
                generation,
                shown,
            } if *generation == completion.generation => (key.clone(), shown.clone()),
            _ => {
                log::debug!("Ignoring stale video completion (gen {})", completion.generation);
                return false;
            }
        };

        match completion.outcome {
            PrepareOutcome::Ready { width, height } => self.on_ready(key, shown, width, height),
            PrepareOutcome::Failed { reason } => {
                let cause = BackdropError::PrepareFailed {
                    key: key.to_string(),
                    reason,
                };
                self.fall_back(key, shown, &cause)
            }
        }
    }

    fn on_ready(&mut self, key: BackgroundKey, shown: Shown, width: u32, height: u32) -> bool {
        self.catalog.register_video_success(&key);
        let Some(session) = self.live_session_mut() else {
            return false;
        };
        session.ensure_render_target(width, height);
        let played = session.play();
        let surface = session.surface().copied();

        match (played, surface) {
            (Ok(()), Some(surface)) => {
                self.sink.hide_static();
                self.sink.show_video_surface(&surface);
                log::info!("Background '{key}' -> video {}x{}", surface.width, surface.height);
                self.state = PlaybackState::ShowingVideo(key);
                true
            }
            (Err(cause), _) => self.fall_back(key, shown, &cause),
            (Ok(()), None) => {
                let cause = BackdropError::PlayActivationFailed {
                    reason: "render surface missing".into(),
                };
                self.fall_back(key, shown, &cause)
            }
        }
    }

    /// Static fallback after a failed prepare or play.
    fn fall_back(&mut self, key: BackgroundKey, shown: Shown, cause: &BackdropError) -> bool {
        if let Some(image) = self.catalog.resolve_static(&key) {
            log::info!("{cause}; falling back to image '{}'", image.name);
            self.show_static(key, &image);
            return true;
        }

        let missing = BackdropError::NoAssetFound {
            key: key.to_string(),
        };
        log::warn!("{cause}; {missing}");
        let next = match cause {
            BackdropError::PlayActivationFailed { .. } => PlaybackState::Idle,
            _ => shown.into(),
        };
        let changed = next != self.state;
        self.state = next;
        changed
    }
}

impl<S: Sink> Drop for PlaybackController<S> {
    fn drop(&mut self) {
        if !matches!(self.video, SessionSlot::Released) {
            self.shutdown();
        }
    }
}
