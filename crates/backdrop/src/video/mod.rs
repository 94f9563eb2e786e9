pub mod backend;
pub mod probe;

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};

use crate::error::BackdropError;
use backend::{Completion, PrepareRequest, VideoBackend};

/// Surface size used when a prepare reports a degenerate size.
pub const DEFAULT_MIN_SURFACE: (u32, u32) = (1280, 720);

/// The render surface the video is decoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSurface {
    pub width: u32,
    pub height: u32,
}

/// Owns the video backend, the single outstanding prepare and the render
/// surface. Playback always loops and is always muted.
pub struct VideoSession {
    backend: Box<dyn VideoBackend>,
    result_tx: Sender<Completion>,
    result_rx: Receiver<Completion>,
    generation: u64,
    outstanding: Option<u64>,
    surface: Option<RenderSurface>,
    /// Number of surface (re)allocations so far.
    pub allocations: u32,
    min_surface: (u32, u32),
    playing: bool,
    /// Whether the surface's owner is live. Set by the host.
    active: bool,
}

impl VideoSession {
    pub fn new(backend: Box<dyn VideoBackend>, min_surface: (u32, u32)) -> Self {
        let (result_tx, result_rx) = unbounded();
        log::debug!("Video session created");
        Self {
            backend,
            result_tx,
            result_rx,
            generation: 0,
            outstanding: None,
            surface: None,
            allocations: 0,
            min_surface,
            playing: false,
            active: true,
        }
    }

    /// Start preparing `url`. Returns the generation identifying this prepare;
    /// any earlier outstanding prepare becomes stale.
    pub fn prepare(&mut self, url: &str) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        if let Some(previous) = self.outstanding.replace(generation) {
            log::debug!("Video prepare gen {previous} superseded by gen {generation}");
        }
        log::info!("Preparing video {url} (gen {generation})");
        self.backend.prepare(
            PrepareRequest {
                url: url.to_string(),
                generation,
            },
            self.result_tx.clone(),
        );
        generation
    }

    /// Forget the outstanding prepare; its completion will be discarded.
    pub fn abandon(&mut self) {
        if let Some(generation) = self.outstanding.take() {
            log::debug!("Video prepare gen {generation} abandoned");
        }
    }

    pub fn outstanding(&self) -> Option<u64> {
        self.outstanding
    }

    /// Non-blocking read of the completion for the outstanding prepare.
    /// Completions for earlier generations are dropped.
    pub fn poll(&mut self) -> Option<Completion> {
        loop {
            match self.result_rx.try_recv() {
                Ok(completion) => {
                    if self.outstanding == Some(completion.generation) {
                        self.outstanding = None;
                        return Some(completion);
                    }
                    log::debug!(
                        "Discarded stale video completion (gen {} vs outstanding {:?})",
                        completion.generation,
                        self.outstanding
                    );
                }
                // We hold a sender ourselves, so the channel never disconnects.
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Allocate or resize the surface when the size actually changes.
    /// Returns true if an allocation happened.
    pub fn ensure_render_target(&mut self, width: u32, height: u32) -> bool {
        let (w, h) = if width == 0 || height == 0 {
            self.min_surface
        } else {
            (width, height)
        };
        if self
            .surface
            .is_some_and(|s| s.width == w && s.height == h)
        {
            return false;
        }
        self.surface = Some(RenderSurface {
            width: w,
            height: h,
        });
        self.allocations += 1;
        log::info!("Video surface allocated: {w}x{h}");
        true
    }

    pub fn surface(&self) -> Option<&RenderSurface> {
        self.surface.as_ref()
    }

    /// Mark whether the surface's owner is live. Playback cannot start while
    /// inactive.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.playing = false;
        }
    }

    pub fn play(&mut self) -> Result<(), BackdropError> {
        if !self.active {
            return Err(BackdropError::PlayActivationFailed {
                reason: "video surface owner is not live".into(),
            });
        }
        if self.surface.is_none() {
            return Err(BackdropError::PlayActivationFailed {
                reason: "no render surface allocated".into(),
            });
        }
        self.playing = true;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_looping(&self) -> bool {
        true
    }

    pub fn is_muted(&self) -> bool {
        true
    }

    /// Stop playback, drop the surface and forget any outstanding prepare.
    pub fn release(&mut self) {
        self.playing = false;
        self.outstanding = None;
        if self.surface.take().is_some() {
            log::debug!("Video surface released");
        }
    }
}
