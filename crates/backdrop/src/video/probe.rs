//! Video preparation via an `ffprobe` subprocess on a worker thread.
//!
//! - Requests queue on an unbounded channel so `prepare` never blocks the
//!   caller; the worker drains to the newest one and answers skipped requests
//!   as superseded
//! - "Ready" means ffprobe found a video stream; the reported size is the
//!   stream's width and height

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, unbounded};

use super::backend::{Completion, PrepareOutcome, PrepareRequest, VideoBackend};

/// Check if ffprobe is available on the system. Cached per process.
pub fn ffprobe_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        Command::new("ffprobe")
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

type Job = (PrepareRequest, Sender<Completion>);

/// Reports a video's dimensions, or why it cannot be played.
pub type ProbeFn = Box<dyn Fn(&Path) -> Result<(u32, u32), String> + Send>;

pub struct ProbeBackend {
    request_tx: Option<Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl ProbeBackend {
    pub fn spawn() -> Result<Self> {
        Self::spawn_with(Box::new(probe_dimensions))
    }

    pub fn spawn_with(probe: ProbeFn) -> Result<Self> {
        let (request_tx, request_rx) = unbounded::<Job>();
        let handle = thread::Builder::new()
            .name("backdrop-video-probe".into())
            .spawn(move || probe_thread(&request_rx, &probe))
            .context("Failed to spawn video probe thread")?;
        Ok(Self {
            request_tx: Some(request_tx),
            thread: Some(handle),
        })
    }
}

impl VideoBackend for ProbeBackend {
    fn prepare(&mut self, request: PrepareRequest, done: Sender<Completion>) {
        let Some(tx) = &self.request_tx else {
            reply(&done, request.generation, failed("video probe stopped"));
            return;
        };
        if let Err(e) = tx.send((request, done)) {
            let (request, done) = e.into_inner();
            reply(&done, request.generation, failed("video probe thread exited"));
        }
    }
}

impl Drop for ProbeBackend {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.request_tx.take();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn failed(reason: &str) -> PrepareOutcome {
    PrepareOutcome::Failed {
        reason: reason.to_string(),
    }
}

fn reply(done: &Sender<Completion>, generation: u64, outcome: PrepareOutcome) {
    let _ = done.send(Completion { generation, outcome });
}

fn probe_thread(request_rx: &Receiver<Job>, probe: &ProbeFn) {
    loop {
        let Ok(mut job) = request_rx.recv() else {
            log::debug!("Video probe thread exiting (channel closed)");
            return;
        };

        // Only the newest request matters; answer the rest so each gets one reply.
        while let Ok(newer) = request_rx.try_recv() {
            let (skipped, done) = job;
            log::debug!(
                "Video probe: skipping gen {} for newer gen {}",
                skipped.generation,
                newer.0.generation
            );
            reply(&done, skipped.generation, failed("superseded"));
            job = newer;
        }

        let (request, done) = job;
        let outcome = match probe(Path::new(&request.url)) {
            Ok((width, height)) => PrepareOutcome::Ready { width, height },
            Err(reason) => {
                log::debug!("Video probe failed for {}: {reason}", request.url);
                PrepareOutcome::Failed { reason }
            }
        };
        reply(&done, request.generation, outcome);
    }
}

/// Probe the first video stream's dimensions.
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32), String> {
    if !path.is_file() {
        return Err(format!("video file not found: {}", path.display()));
    }
    if !ffprobe_available() {
        return Err("ffprobe is not available".to_string());
    }

    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| format!("ffprobe failed to execute: {e}"))?;

    if !output.status.success() {
        return Err("ffprobe returned non-zero exit code".to_string());
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(stdout: &[u8]) -> Result<(u32, u32), String> {
    let json: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|e| format!("Failed to parse ffprobe JSON: {e}"))?;

    let streams = json["streams"]
        .as_array()
        .ok_or("No streams in ffprobe output")?;

    let video_stream = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))
        .ok_or("No video stream found")?;

    // Missing sizes are reported as 0 and floored by the session.
    let width = video_stream["width"].as_u64().unwrap_or(0) as u32;
    let height = video_stream["height"].as_u64().unwrap_or(0) as u32;
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn parse_finds_video_stream() {
        let json = br#"{"streams":[
            {"codec_type":"audio","channels":2},
            {"codec_type":"video","width":1920,"height":1080}
        ]}"#;
        assert_eq!(parse_probe_output(json), Ok((1920, 1080)));
    }

    #[test]
    fn parse_missing_size_is_zero() {
        let json = br#"{"streams":[{"codec_type":"video"}]}"#;
        assert_eq!(parse_probe_output(json), Ok((0, 0)));
    }

    #[test]
    fn parse_rejects_audio_only() {
        let json = br#"{"streams":[{"codec_type":"audio"}]}"#;
        assert_eq!(
            parse_probe_output(json),
            Err("No video stream found".to_string())
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_probe_output(b"not json").is_err());
        assert!(parse_probe_output(b"{}").is_err());
    }

    #[test]
    fn missing_file_fails_without_ffprobe() {
        let dir = tempfile::tempdir().unwrap();
        let err = probe_dimensions(&dir.path().join("missing.mp4")).unwrap_err();
        assert!(err.contains("not found"));
    }

    #[test]
    fn worker_reports_failure_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = dir.path().join("bg_rain.mp4").display().to_string();

        let mut backend = ProbeBackend::spawn().unwrap();
        let (done_tx, done_rx) = unbounded();
        backend.prepare(PrepareRequest { url, generation: 7 }, done_tx);

        let completion = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(completion.generation, 7);
        assert!(matches!(completion.outcome, PrepareOutcome::Failed { .. }));
    }

    #[test]
    fn every_request_gets_one_reply() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = ProbeBackend::spawn().unwrap();
        let (done_tx, done_rx) = unbounded();
        for generation in 1..=4 {
            let url = dir.path().join(format!("{generation}.mp4")).display().to_string();
            backend.prepare(PrepareRequest { url, generation }, done_tx.clone());
        }
        drop(done_tx);

        let mut seen: Vec<u64> = Vec::new();
        while let Ok(c) = done_rx.recv_timeout(Duration::from_secs(5)) {
            seen.push(c.generation);
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[test]
    fn prepare_does_not_block_while_worker_is_busy() {
        let (gate_tx, gate_rx) = unbounded::<()>();
        let (started_tx, started_rx) = unbounded::<()>();
        let probe: ProbeFn = Box::new(move |_: &Path| {
            let _ = started_tx.send(());
            // Blocks until the test closes the gate.
            let _ = gate_rx.recv();
            Ok((640, 360))
        });
        let mut backend = ProbeBackend::spawn_with(probe).unwrap();
        let (done_tx, done_rx) = unbounded();

        backend.prepare(
            PrepareRequest {
                url: "first.mp4".into(),
                generation: 0,
            },
            done_tx.clone(),
        );
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // Far more requests than any queue bound while the worker is stuck.
        for generation in 1..=32 {
            let url = format!("{generation}.mp4");
            backend.prepare(PrepareRequest { url, generation }, done_tx.clone());
        }
        assert!(done_rx.try_recv().is_err());

        drop(gate_tx);
        drop(done_tx);
        let mut replies: Vec<Completion> = Vec::new();
        while let Ok(c) = done_rx.recv_timeout(Duration::from_secs(5)) {
            replies.push(c);
        }
        assert_eq!(replies.len(), 33);
        let newest = replies.iter().find(|c| c.generation == 32).unwrap();
        assert_eq!(
            newest.outcome,
            PrepareOutcome::Ready {
                width: 640,
                height: 360
            }
        );
    }
}
