//! Background media resolution and playback for dialogue-driven scenes.
//!
//! A "change background" directive names a key such as `office`. The
//! [`PlaybackController`] normalizes it, picks a looping video when one is
//! known (or might exist) and a static image otherwise, and makes sure
//! repeated or overlapping directives never restart or flicker the output.

pub mod catalog;
pub mod command;
pub mod controller;
pub mod error;
pub mod key;
pub mod listing;
pub mod settings;
pub mod sink;
pub mod video;

#[cfg(test)]
mod test_log;

pub use catalog::{AssetCatalog, ImageHandle};
pub use controller::{BackgroundInfo, ControllerOptions, PlaybackController, PlaybackState};
pub use error::BackdropError;
pub use key::{BackgroundKey, KeyNormalizer};
pub use sink::Sink;
pub use video::VideoSession;
