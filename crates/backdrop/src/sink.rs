use crate::catalog::ImageHandle;
use crate::video::RenderSurface;

/// The two rendering outputs the controller switches between. The controller
/// never draws; it only chooses which output is visible.
pub trait Sink {
    fn show_static(&mut self, image: &ImageHandle);
    fn show_video_surface(&mut self, surface: &RenderSurface);
    fn hide_static(&mut self);
    fn hide_video(&mut self);
}

/// Logs every output change. Used by the command-line host.
#[derive(Debug, Default)]
pub struct LogSink;

impl Sink for LogSink {
    fn show_static(&mut self, image: &ImageHandle) {
        match image.dimensions {
            Some((w, h)) => log::info!(
                "Background image: {} ({w}x{h}, {})",
                image.name,
                image.path.display()
            ),
            None => log::info!("Background image: {} ({})", image.name, image.path.display()),
        }
    }

    fn show_video_surface(&mut self, surface: &RenderSurface) {
        log::info!("Background video: {}x{} surface", surface.width, surface.height);
    }

    fn hide_static(&mut self) {
        log::debug!("Background image hidden");
    }

    fn hide_video(&mut self) {
        log::debug!("Background video hidden");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    ShowStatic(String),
    ShowVideo { width: u32, height: u32 },
    HideStatic,
    HideVideo,
}

/// Records output changes and tracks what is currently visible.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
    pub visible_static: Option<String>,
    pub video_visible: bool,
}

impl RecordingSink {
    /// Number of "show" events, i.e. visible changes.
    pub fn shows(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SinkEvent::ShowStatic(_) | SinkEvent::ShowVideo { .. }))
            .count()
    }
}

impl Sink for RecordingSink {
    fn show_static(&mut self, image: &ImageHandle) {
        self.visible_static = Some(image.name.clone());
        self.events.push(SinkEvent::ShowStatic(image.name.clone()));
    }

    fn show_video_surface(&mut self, surface: &RenderSurface) {
        self.video_visible = true;
        self.events.push(SinkEvent::ShowVideo {
            width: surface.width,
            height: surface.height,
        });
    }

    fn hide_static(&mut self) {
        self.visible_static = None;
        self.events.push(SinkEvent::HideStatic);
    }

    fn hide_video(&mut self) {
        self.video_visible = false;
        self.events.push(SinkEvent::HideVideo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_tracks_visibility() {
        let mut sink = RecordingSink::default();
        sink.show_static(&ImageHandle::new("bg_office", "bg_office.png"));
        assert_eq!(sink.visible_static.as_deref(), Some("bg_office"));

        sink.hide_static();
        sink.show_video_surface(&RenderSurface {
            width: 1280,
            height: 720,
        });
        assert!(sink.visible_static.is_none());
        assert!(sink.video_visible);
        assert_eq!(sink.shows(), 2);
        assert_eq!(
            sink.events,
            vec![
                SinkEvent::ShowStatic("bg_office".into()),
                SinkEvent::HideStatic,
                SinkEvent::ShowVideo {
                    width: 1280,
                    height: 720
                },
            ]
        );
    }
}
