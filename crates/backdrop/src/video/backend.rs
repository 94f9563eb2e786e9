use crossbeam_channel::{Receiver, Sender, unbounded};

/// Result of one prepare, reported exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareOutcome {
    Ready { width: u32, height: u32 },
    Failed { reason: String },
}

/// A prepare outcome tagged with the generation that requested it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub generation: u64,
    pub outcome: PrepareOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareRequest {
    pub url: String,
    pub generation: u64,
}

/// Out-of-thread video preparation.
///
/// Implementations must send exactly one [`Completion`] on `done` for every
/// request, possibly from another thread, possibly before returning.
pub trait VideoBackend: Send {
    fn prepare(&mut self, request: PrepareRequest, done: Sender<Completion>);
}

/// A prepare handed to the host's own video player.
///
/// Consuming it with [`ready`](Self::ready) or [`fail`](Self::fail) reports
/// the outcome; dropping it unanswered reports a failure.
pub struct PendingPrepare {
    pub request: PrepareRequest,
    responder: Option<Sender<Completion>>,
}

impl PendingPrepare {
    pub fn ready(mut self, width: u32, height: u32) {
        self.respond(PrepareOutcome::Ready { width, height });
    }

    pub fn fail(mut self, reason: impl Into<String>) {
        self.respond(PrepareOutcome::Failed {
            reason: reason.into(),
        });
    }

    fn respond(&mut self, outcome: PrepareOutcome) {
        if let Some(tx) = self.responder.take() {
            // Receiver gone means the session was torn down.
            let _ = tx.send(Completion {
                generation: self.request.generation,
                outcome,
            });
        }
    }
}

impl Drop for PendingPrepare {
    fn drop(&mut self) {
        self.respond(PrepareOutcome::Failed {
            reason: "prepare abandoned by host".into(),
        });
    }
}

/// Forwards prepare requests to the host over a channel.
pub struct ChannelBackend {
    tx: Sender<PendingPrepare>,
}

impl ChannelBackend {
    pub fn new() -> (Self, Receiver<PendingPrepare>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl VideoBackend for ChannelBackend {
    fn prepare(&mut self, request: PrepareRequest, done: Sender<Completion>) {
        let pending = PendingPrepare {
            request,
            responder: Some(done),
        };
        // A closed host channel drops `pending`, which reports the failure.
        if let Err(e) = self.tx.send(pending) {
            log::debug!("Video host channel closed; prepare {} dropped", e.0.request.generation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(generation: u64) -> PrepareRequest {
        PrepareRequest {
            url: "bg_rain.mp4".into(),
            generation,
        }
    }

    #[test]
    fn channel_backend_forwards_and_reports_ready() {
        let (mut backend, host_rx) = ChannelBackend::new();
        let (done_tx, done_rx) = unbounded();
        backend.prepare(request(3), done_tx);

        let pending = host_rx.try_recv().unwrap();
        assert_eq!(pending.request.url, "bg_rain.mp4");
        pending.ready(1920, 1080);

        let completion = done_rx.try_recv().unwrap();
        assert_eq!(completion.generation, 3);
        assert_eq!(
            completion.outcome,
            PrepareOutcome::Ready {
                width: 1920,
                height: 1080
            }
        );
        assert!(done_rx.try_recv().is_err());
    }

    #[test]
    fn dropped_pending_reports_failure_once() {
        let (mut backend, host_rx) = ChannelBackend::new();
        let (done_tx, done_rx) = unbounded();
        backend.prepare(request(1), done_tx);
        drop(host_rx.try_recv().unwrap());

        let completion = done_rx.try_recv().unwrap();
        assert!(matches!(completion.outcome, PrepareOutcome::Failed { .. }));
        assert!(done_rx.try_recv().is_err());
    }

    #[test]
    fn fail_reports_reason_without_extra_completion() {
        let (mut backend, host_rx) = ChannelBackend::new();
        let (done_tx, done_rx) = unbounded();
        backend.prepare(request(2), done_tx);
        host_rx.try_recv().unwrap().fail("codec not supported");

        let completion = done_rx.try_recv().unwrap();
        assert_eq!(
            completion.outcome,
            PrepareOutcome::Failed {
                reason: "codec not supported".into()
            }
        );
        assert!(done_rx.try_recv().is_err());
    }

    #[test]
    fn closed_host_channel_fails_immediately() {
        let (mut backend, host_rx) = ChannelBackend::new();
        drop(host_rx);
        let (done_tx, done_rx) = unbounded();
        backend.prepare(request(5), done_tx);
        let completion = done_rx.try_recv().unwrap();
        assert_eq!(completion.generation, 5);
        assert!(matches!(completion.outcome, PrepareOutcome::Failed { .. }));
    }
}
