//! Background frame extraction
//!
//! Each request is split across a small pool of worker threads. Worker `k`
//! handles every `n`-th timestamp starting at `k`, each with its own decoder,
//! so results arrive out of order. Workers poll the session's cancellation
//! token between frames.

use crate::VideoReader;
use filmstrip_core::RationalTime;
use filmstrip_engine::{CancellationToken, ExtractError, ExtractionRequest, FrameExtractor, FrameSink};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Upper bound on decoder threads per request
const MAX_WORKERS: usize = 4;

/// Frame extractor backed by FFmpeg decoders on background threads
pub struct FfmpegFrameExtractor {
    workers: usize,
    active: Arc<Mutex<HashMap<u64, CancellationToken>>>,
    next_job: u64,
}

struct Job {
    id: u64,
    source: PathBuf,
    times: Vec<RationalTime>,
    target_size: (u32, u32),
    quarter_turns: u8,
    sink: FrameSink,
}

impl FfmpegFrameExtractor {
    /// Creates an extractor using up to one worker per CPU
    pub fn new() -> Self {
        Self::with_workers(num_cpus::get().clamp(1, MAX_WORKERS))
    }

    /// Creates an extractor with a fixed number of workers per request
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            active: Arc::new(Mutex::new(HashMap::new())),
            next_job: 0,
        }
    }

    /// Number of worker jobs still running
    pub fn active_jobs(&self) -> usize {
        self.active.lock().len()
    }
}

impl Default for FfmpegFrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameExtractor for FfmpegFrameExtractor {
    fn begin_extraction(&mut self, request: ExtractionRequest, sink: FrameSink) {
        let quarter_turns = request
            .asset
            .first_video_track()
            .map_or(0, |track| track.preferred_transform.quarter_turns());
        let workers = self.workers.min(request.times.len()).max(1);

        debug!(
            session = %sink.session(),
            frames = request.times.len(),
            workers,
            width = request.target_size.0,
            height = request.target_size.1,
            "starting frame extraction"
        );

        for worker in 0..workers {
            self.next_job += 1;
            let job = Job {
                id: self.next_job,
                source: request.asset.source.clone(),
                times: request.times.iter().copied().skip(worker).step_by(workers).collect(),
                target_size: request.target_size,
                quarter_turns,
                sink: sink.clone(),
            };
            let job_id = job.id;
            self.active.lock().insert(job_id, sink.token().clone());

            let active = Arc::clone(&self.active);
            let spawned = thread::Builder::new()
                .name(format!("filmstrip-extract-{job_id}"))
                .spawn(move || {
                    run_job(&job);
                    active.lock().remove(&job.id);
                });
            if let Err(e) = spawned {
                // Its tiles stay unfilled.
                warn!(job = job_id, error = %e, "failed to spawn extraction worker");
                self.active.lock().remove(&job_id);
            }
        }
    }

    fn cancel_all(&mut self) {
        let mut active = self.active.lock();
        for token in active.values() {
            token.cancel();
        }
        debug!(jobs = active.len(), "cancelled frame extraction");
        active.clear();
    }
}

fn run_job(job: &Job) {
    if job.sink.is_cancelled() {
        return;
    }

    let mut reader = match VideoReader::open(&job.source) {
        Ok(reader) => reader,
        Err(e) => {
            warn!(source = %job.source.display(), error = %e, "could not open asset for extraction");
            for &time in &job.times {
                job.sink.failure(time, ExtractError::Open(e.to_string()));
            }
            return;
        }
    };

    for &time in &job.times {
        if job.sink.is_cancelled() {
            debug!(job = job.id, "extraction cancelled");
            return;
        }
        match reader.frame_at(time, job.target_size, job.quarter_turns) {
            Ok((image, actual)) => {
                job.sink.frame(time, actual, Arc::new(image));
            }
            Err(e) => {
                warn!(job = job.id, %time, error = %e, "frame extraction failed");
                job.sink.failure(time, e.into_extract_error(time));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, RecvTimeoutError};
    use filmstrip_core::{AffineTransform, Size, VideoAsset, VideoTrack};
    use filmstrip_engine::SessionId;
    use std::time::Duration;

    fn request(times: Vec<RationalTime>) -> ExtractionRequest {
        ExtractionRequest {
            asset: Arc::new(VideoAsset::new(
                "/nonexistent/clip.mov",
                RationalTime::from_millis(3000),
                vec![VideoTrack::new(Size::new(64.0, 36.0), AffineTransform::identity())],
            )),
            times,
            target_size: (64, 36),
        }
    }

    #[test]
    fn test_unreadable_asset_reports_every_frame() {
        let (tx, rx) = unbounded();
        let sink = FrameSink::new(SessionId(1), CancellationToken::new(), tx);
        let times: Vec<_> = (0..5).map(|i| RationalTime::from_millis(i * 500)).collect();

        let mut extractor = FfmpegFrameExtractor::with_workers(2);
        extractor.begin_extraction(request(times.clone()), sink);

        let mut seen = Vec::new();
        for _ in 0..times.len() {
            let event = rx.recv_timeout(Duration::from_secs(10)).unwrap();
            assert!(matches!(event.result, Err(ExtractError::Open(_))));
            seen.push(event.requested);
        }
        seen.sort_by_key(|t| t.value);
        assert_eq!(seen, times);
    }

    #[test]
    fn test_cancelled_session_delivers_nothing() {
        let (tx, rx) = unbounded();
        let token = CancellationToken::new();
        token.cancel();
        let sink = FrameSink::new(SessionId(1), token, tx);

        let mut extractor = FfmpegFrameExtractor::with_workers(2);
        extractor.begin_extraction(request(vec![RationalTime::from_millis(0)]), sink);
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(200)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected)
        ));
    }

    #[test]
    fn test_cancel_all_clears_registry() {
        let mut extractor = FfmpegFrameExtractor::with_workers(1);
        let token = CancellationToken::new();
        extractor.active.lock().insert(42, token.clone());
        extractor.cancel_all();
        assert!(token.is_cancelled());
        assert_eq!(extractor.active_jobs(), 0);
    }
}
