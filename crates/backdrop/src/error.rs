use thiserror::Error;

/// Failures the background controller can run into.
///
/// None of these reach the caller of [`crate::PlaybackController::request`];
/// the controller recovers locally and logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackdropError {
    /// Blank or quote-only request. Ignored without a warning.
    #[error("background key is empty")]
    EmptyKey,
    /// The video backend reported an error while preparing.
    #[error("video prepare failed for '{key}': {reason}")]
    PrepareFailed { key: String, reason: String },
    /// Prepare succeeded but playback could not start.
    #[error("video playback could not start: {reason}")]
    PlayActivationFailed { reason: String },
    /// Neither a video nor a static image resolves.
    #[error("no background asset found for '{key}'")]
    NoAssetFound { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_key() {
        let e = BackdropError::NoAssetFound { key: "bg_office".into() };
        assert_eq!(e.to_string(), "no background asset found for 'bg_office'");

        let e = BackdropError::PrepareFailed {
            key: "bg_rooftop".into(),
            reason: "no video stream".into(),
        };
        assert!(e.to_string().contains("bg_rooftop"));
        assert!(e.to_string().contains("no video stream"));
    }

    #[test]
    fn empty_key_equality() {
        assert_eq!(BackdropError::EmptyKey, BackdropError::EmptyKey);
        assert_ne!(
            BackdropError::EmptyKey,
            BackdropError::NoAssetFound { key: String::new() }
        );
    }
}
