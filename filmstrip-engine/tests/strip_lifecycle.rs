use filmstrip_core::{AffineTransform, RationalTime, Size, Tile, VideoAsset, VideoTrack};
use filmstrip_engine::{
    ExtractError, ExtractionRequest, FrameEvent, FrameExtractor, FrameSink, LayoutHost,
    SessionId, SessionOutcome, SessionState, StripConfig, ThumbnailStrip, Thumbnail,
    TilePresenter,
};
use image::{Rgba, RgbaImage};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Default)]
struct ExtractorLog {
    requests: Vec<(ExtractionRequest, FrameSink)>,
    cancels: usize,
}

#[derive(Clone, Default)]
struct ScriptedExtractor(Rc<RefCell<ExtractorLog>>);

impl FrameExtractor for ScriptedExtractor {
    fn begin_extraction(&mut self, request: ExtractionRequest, sink: FrameSink) {
        self.0.borrow_mut().requests.push((request, sink));
    }

    fn cancel_all(&mut self) {
        self.0.borrow_mut().cancels += 1;
    }
}

#[derive(Default)]
struct RecordingPresenter {
    tiles: Vec<Tile>,
    shades: HashMap<usize, u8>,
    clears: usize,
    content_width: f64,
}

impl TilePresenter for RecordingPresenter {
    fn set_tiles(&mut self, tiles: &[Tile]) {
        self.tiles = tiles.to_vec();
    }

    fn set_tile_image(&mut self, index: usize, image: &Thumbnail) {
        self.shades.insert(index, image.get_pixel(0, 0)[0]);
    }

    fn clear_all_tiles(&mut self) {
        self.shades.clear();
        self.clears += 1;
    }

    fn set_content_width(&mut self, width: f64) {
        self.content_width = width;
    }
}

#[derive(Default)]
struct CountingHost {
    requested: usize,
}

impl LayoutHost for CountingHost {
    fn request_layout_pass(&mut self) {
        self.requested += 1;
    }
}

type Strip = ThumbnailStrip<ScriptedExtractor, RecordingPresenter, CountingHost>;

fn clip(seconds: i64) -> VideoAsset {
    VideoAsset::new(
        "clip.mov",
        RationalTime::new(seconds * 600, 600),
        vec![VideoTrack::new(
            Size::new(1920.0, 1080.0),
            AffineTransform::identity(),
        )],
    )
}

fn strip() -> (Strip, Rc<RefCell<ExtractorLog>>) {
    let extractor = ScriptedExtractor::default();
    let log = extractor.0.clone();
    let strip = ThumbnailStrip::new(
        extractor,
        RecordingPresenter::default(),
        CountingHost::default(),
        StripConfig::default(),
    );
    (strip, log)
}

fn thumb(shade: u8) -> Thumbnail {
    Arc::new(RgbaImage::from_pixel(4, 4, Rgba([shade, shade, shade, 255])))
}

fn request(log: &Rc<RefCell<ExtractorLog>>, n: usize) -> (Vec<RationalTime>, FrameSink) {
    let log = log.borrow();
    let (request, sink) = &log.requests[n];
    (request.times.clone(), sink.clone())
}

#[test]
fn test_generation_waits_for_layout_bounds() {
    let (mut strip, log) = strip();
    strip.set_asset(clip(30));

    assert!(log.borrow().requests.is_empty());
    assert_eq!(strip.layout_host().requested, 1);
    assert!(strip.is_waiting_for_layout());

    strip.layout_pass_completed(0.0, 0.0);
    strip.layout_pass_completed(300.0, 0.0);
    assert!(log.borrow().requests.is_empty());

    strip.layout_pass_completed(300.0, 50.0);
    assert_eq!(log.borrow().requests.len(), 1);
    assert!(!strip.is_waiting_for_layout());

    strip.layout_pass_completed(300.0, 50.0);
    strip.layout_pass_completed(300.0, 50.0);
    assert_eq!(log.borrow().requests.len(), 1);
}

#[test]
fn test_geometry_reaches_extractor_and_presenter() {
    let (mut strip, log) = strip();
    strip.layout_pass_completed(300.0, 50.0);
    strip.set_asset(clip(30));

    assert_eq!(strip.strip_width(), 600.0);
    assert_eq!(strip.presenter().content_width, 600.0);
    assert_eq!(strip.presenter().tiles.len(), 7);
    assert_eq!(strip.tiles().len(), 7);
    assert_eq!(strip.session_state(), SessionState::Extracting);

    let log = log.borrow();
    let (request, _) = &log.requests[0];
    assert_eq!(request.times.len(), 7);
    assert_eq!(request.target_size, (89, 50));
    assert!(request.times.iter().all(|t| t.value < 30_000));
}

#[test]
fn test_short_clip_fills_viewport() {
    let (mut strip, _log) = strip();
    strip.layout_pass_completed(300.0, 50.0);
    strip.set_asset(clip(10));
    assert_eq!(strip.strip_width(), 300.0);
}

#[test]
fn test_first_frame_backfills_visible_tiles() {
    let (mut strip, log) = strip();
    strip.layout_pass_completed(300.0, 50.0);
    strip.set_asset(clip(30));
    let (times, sink) = request(&log, 0);

    // Tile 5 arrives first and covers the four visible tiles.
    assert!(sink.frame(times[5], times[5], thumb(50)));
    assert!(sink.frame(times[1], times[1], thumb(10)));
    assert_eq!(strip.process_completions(), 2);

    let shades = &strip.presenter().shades;
    assert_eq!(shades.get(&0), Some(&50));
    assert_eq!(shades.get(&1), Some(&10));
    assert_eq!(shades.get(&3), Some(&50));
    assert_eq!(shades.get(&4), None);
    assert_eq!(shades.get(&5), Some(&50));
}

#[test]
fn test_failures_leave_tiles_alone_and_session_completes() {
    let (mut strip, log) = strip();
    strip.layout_pass_completed(300.0, 50.0);
    strip.set_asset(clip(10));
    let (times, sink) = request(&log, 0);
    assert_eq!(times.len(), 4);

    sink.failure(times[0], ExtractError::Decode("bad packet".into()));
    strip.process_completions();
    assert!(strip.presenter().shades.is_empty());
    assert_eq!(strip.tiles().filled(), 0);

    for (i, t) in times.iter().enumerate().skip(1) {
        sink.frame(*t, *t, thumb(i as u8));
    }
    strip.process_completions();
    assert_eq!(strip.session_state(), SessionState::Completed);
    // Tile 0 failed but was back-filled by the first successful frame.
    assert_eq!(strip.presenter().shades.get(&0), Some(&1));
}

#[test]
fn test_superseded_session_cannot_touch_tiles() {
    let (mut strip, log) = strip();
    strip.layout_pass_completed(300.0, 50.0);
    strip.set_asset(clip(30));
    let (first_times, first_sink) = request(&log, 0);
    let first_id = strip.current_session_id().unwrap();

    strip.regenerate_thumbnails();
    assert_eq!(log.borrow().requests.len(), 2);
    assert_eq!(log.borrow().cancels, 1);
    assert!(first_sink.is_cancelled());
    let second_id = strip.current_session_id().unwrap();
    assert!(second_id > first_id);

    // Cooperative extractors see the cancellation...
    assert!(!first_sink.frame(first_times[0], first_times[0], thumb(200)));

    // ...and results that slip through are discarded by identifier.
    let late = FrameEvent {
        session: first_id,
        requested: first_times[0],
        result: Ok(filmstrip_engine::ExtractedFrame {
            image: thumb(200),
            actual_time: first_times[0],
        }),
    };
    assert_eq!(strip.apply_frame(late), SessionOutcome::Stale);

    let (times, sink) = request(&log, 1);
    for t in &times {
        sink.frame(*t, *t, thumb(7));
    }
    strip.process_completions();
    assert_eq!(strip.session_state(), SessionState::Completed);
    assert!(strip.presenter().shades.values().all(|shade| *shade == 7));
    assert_eq!(strip.presenter().shades.len(), times.len());
}

#[test]
fn test_new_asset_mid_flight_supersedes() {
    let (mut strip, log) = strip();
    strip.layout_pass_completed(300.0, 50.0);
    strip.set_asset(clip(30));
    strip.set_asset(clip(60));

    let log = log.borrow();
    assert_eq!(log.requests.len(), 2);
    assert_eq!(log.cancels, 1);
    assert_eq!(log.requests[1].0.times.len(), 14);
    assert_eq!(strip.strip_width(), 1200.0);
}

#[test]
fn test_degenerate_asset_leaves_strip_empty() {
    let (mut strip, log) = strip();
    strip.layout_pass_completed(300.0, 50.0);
    let mut bare = clip(30);
    bare.video_tracks.clear();
    strip.set_asset(bare);

    assert!(log.borrow().requests.is_empty());
    assert_eq!(strip.session_state(), SessionState::Idle);
    assert!(strip.tiles().is_empty());
    assert!(strip.time_for_position(10.0).is_none());
}

#[test]
fn test_resize_regenerates_only_on_change() {
    let (mut strip, log) = strip();
    strip.layout_pass_completed(300.0, 50.0);
    strip.set_asset(clip(30));
    assert_eq!(log.borrow().requests.len(), 1);

    strip.layout_pass_completed(300.0, 50.0);
    assert_eq!(log.borrow().requests.len(), 1);

    strip.layout_pass_completed(400.0, 50.0);
    assert_eq!(log.borrow().requests.len(), 2);
    assert_eq!(strip.strip_width(), 800.0);
}

#[test]
fn test_max_visible_duration_change_rescales() {
    let (mut strip, log) = strip();
    strip.layout_pass_completed(300.0, 50.0);
    strip.set_asset(clip(30));
    strip.set_max_visible_duration(30.0);
    assert_eq!(log.borrow().requests.len(), 2);
    assert_eq!(strip.strip_width(), 300.0);
}

#[test]
fn test_max_visible_change_before_bounds_is_deferred() {
    let (mut strip, log) = strip();
    strip.set_asset(clip(30));
    strip.set_max_visible_duration(10.0);
    assert!(log.borrow().requests.is_empty());

    strip.layout_pass_completed(300.0, 50.0);
    assert_eq!(log.borrow().requests.len(), 1);
    assert_eq!(strip.strip_width(), 900.0);
}

#[test]
fn test_time_position_mapping() {
    let (mut strip, _log) = strip();
    assert!(strip.time_for_position(0.0).is_none());

    strip.layout_pass_completed(300.0, 50.0);
    strip.set_asset(clip(30));
    assert_eq!(strip.time_for_position(300.0), Some(RationalTime::new(9_000, 600)));
    assert_eq!(strip.position_for_time(RationalTime::new(4_500, 600)), Some(150.0));
}

#[test]
fn test_teardown_silences_late_frames() {
    let (mut strip, log) = strip();
    strip.layout_pass_completed(300.0, 50.0);
    strip.set_asset(clip(30));
    let (times, sink) = request(&log, 0);

    strip.teardown();
    assert!(sink.is_cancelled());
    assert_eq!(log.borrow().cancels, 1);
    assert!(!sink.frame(times[0], times[0], thumb(1)));
    assert_eq!(strip.process_completions(), 0);
    assert!(strip.tiles().is_empty());
    assert_eq!(strip.session_state(), SessionState::Idle);
}

#[test]
fn test_dropping_strip_cancels_in_flight_work() {
    let (mut strip, log) = strip();
    strip.layout_pass_completed(300.0, 50.0);
    strip.set_asset(clip(30));
    let (times, sink) = request(&log, 0);

    drop(strip);
    assert_eq!(log.borrow().cancels, 1);
    assert!(!sink.frame(times[0], times[0], thumb(1)));
}

#[test]
fn test_stale_session_id_from_unrelated_strip() {
    let (mut strip, _log) = strip();
    strip.layout_pass_completed(300.0, 50.0);
    strip.set_asset(clip(30));
    let event = FrameEvent {
        session: SessionId(99),
        requested: RationalTime::from_millis(0),
        result: Err(ExtractError::Decode("x".into())),
    };
    assert_eq!(strip.apply_frame(event), SessionOutcome::Stale);
}

#[test]
fn test_zero_max_visible_duration_keeps_previous_value() {
    let (mut strip, log) = strip();
    strip.layout_pass_completed(300.0, 50.0);
    strip.set_asset(clip(3600));
    assert_eq!(strip.strip_width(), 72_000.0);

    strip.set_max_visible_duration(0.0);
    strip.set_max_visible_duration(-5.0);
    strip.set_max_visible_duration(f64::NAN);
    assert_eq!(strip.viewport().max_visible_duration, 15.0);
    assert_eq!(log.borrow().requests.len(), 1);
    assert_eq!(strip.strip_width(), 72_000.0);

    strip.set_scale_factor(0.0);
    strip.set_scale_factor(f64::INFINITY);
    assert_eq!(strip.viewport().scale_factor, 1.0);
    assert_eq!(log.borrow().requests.len(), 1);
}

#[test]
fn test_degenerate_config_falls_back_to_defaults() {
    let extractor = ScriptedExtractor::default();
    let log = extractor.0.clone();
    let mut strip = ThumbnailStrip::new(
        extractor,
        RecordingPresenter::default(),
        CountingHost::default(),
        StripConfig {
            max_visible_duration: 0.0,
            scale_factor: -1.0,
        },
    );
    strip.layout_pass_completed(300.0, 50.0);
    strip.set_asset(clip(3600));

    assert_eq!(strip.strip_width(), 72_000.0);
    let log = log.borrow();
    let (request, _) = &log.requests[0];
    assert_eq!(request.times.len(), strip.tiles().len());
    assert_eq!(request.target_size, (89, 50));
}

#[test]
fn test_deferred_asset_does_not_disturb_current_strip() {
    let (mut strip, log) = strip();
    strip.layout_pass_completed(300.0, 50.0);
    strip.set_asset(clip(30));
    strip.layout_pass_completed(0.0, 0.0);

    strip.set_asset(clip(60));
    assert!(strip.is_waiting_for_layout());
    assert_eq!(log.borrow().requests.len(), 1);
    assert_eq!(strip.asset().map(|a| a.duration), Some(RationalTime::new(18_000, 600)));
    assert_eq!(strip.time_for_position(300.0), Some(RationalTime::new(9_000, 600)));
    assert_eq!(strip.position_for_time(RationalTime::new(4_500, 600)), Some(150.0));

    strip.layout_pass_completed(300.0, 50.0);
    assert_eq!(log.borrow().requests.len(), 2);
    assert_eq!(strip.strip_width(), 1200.0);
    assert_eq!(strip.time_for_position(1200.0), Some(RationalTime::new(36_000, 600)));
}

#[test]
fn test_repeated_deferral_requests_one_layout_pass() {
    let (mut strip, log) = strip();
    strip.set_asset(clip(30));
    strip.set_asset(clip(60));
    strip.regenerate_thumbnails();
    strip.set_max_visible_duration(10.0);
    assert_eq!(strip.layout_host().requested, 1);

    strip.layout_pass_completed(300.0, 50.0);
    assert_eq!(log.borrow().requests.len(), 1);
    assert_eq!(strip.strip_width(), 1800.0);

    strip.clear_asset();
    strip.layout_pass_completed(0.0, 0.0);
    strip.set_asset(clip(30));
    assert_eq!(strip.layout_host().requested, 2);
}
