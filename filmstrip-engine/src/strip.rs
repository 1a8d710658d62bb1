//! The thumbnail strip controller
//!
//! `ThumbnailStrip` is driven entirely by inbound events (asset assignment,
//! zoom changes, layout passes, marshaled frame completions) on a single owner
//! thread. Extraction runs elsewhere; its results queue up in a channel and are
//! applied one at a time by `process_completions`.

use crate::gate::ReadinessGate;
use crate::ports::{ExtractionRequest, FrameExtractor, LayoutHost, TilePresenter};
use crate::session::{GenerationSession, SessionOutcome, SessionState};
use crate::sink::{FrameEvent, FrameSink, SessionId};
use crate::{StripConfig, Thumbnail};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use filmstrip_core::sampler::sample_times;
use filmstrip_core::{
    PositionTimeMapper, RationalTime, StripGeometry, Tile, TileTable, VideoAsset, ViewportState,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// A horizontally scrollable strip of video thumbnails
pub struct ThumbnailStrip<E: FrameExtractor, P: TilePresenter, L: LayoutHost> {
    extractor: E,
    presenter: P,
    layout_host: L,
    viewport: ViewportState,
    asset: Option<Arc<VideoAsset>>,
    gate: ReadinessGate<Arc<VideoAsset>>,
    tiles: TileTable<Thumbnail>,
    geometry: Option<StripGeometry>,
    session: Option<GenerationSession>,
    /// Viewport the current tiles were generated for
    generated_for: Option<ViewportState>,
    last_session: u64,
    tx: Sender<FrameEvent>,
    rx: Receiver<FrameEvent>,
}

impl<E: FrameExtractor, P: TilePresenter, L: LayoutHost> ThumbnailStrip<E, P, L> {
    /// Creates an empty strip with zero bounds
    pub fn new(extractor: E, presenter: P, layout_host: L, config: StripConfig) -> Self {
        let (tx, rx) = unbounded();
        let mut viewport = ViewportState::default();
        if is_positive(config.scale_factor) {
            viewport.scale_factor = config.scale_factor;
        }
        if is_positive(config.max_visible_duration) {
            viewport.max_visible_duration = config.max_visible_duration;
        }
        Self {
            extractor,
            presenter,
            layout_host,
            viewport,
            asset: None,
            gate: ReadinessGate::new(),
            tiles: TileTable::new(),
            geometry: None,
            session: None,
            generated_for: None,
            last_session: 0,
            tx,
            rx,
        }
    }

    /// Assigns the asset to generate thumbnails for.
    ///
    /// The asset becomes current once its generation starts; until then the
    /// previous asset and strip width stay in effect.
    pub fn set_asset(&mut self, asset: impl Into<Arc<VideoAsset>>) {
        let asset = asset.into();
        debug!(source = %asset.source().display(), duration = %asset.duration, "asset assigned");
        self.schedule(asset);
    }

    /// Removes the asset, cancelling any in-flight work and emptying the strip
    pub fn clear_asset(&mut self) {
        self.asset = None;
        self.gate.clear();
        self.reset();
    }

    /// Changes how many seconds of video fit in one viewport width
    /// Non-positive and non-finite values are ignored.
    pub fn set_max_visible_duration(&mut self, seconds: f64) {
        if !is_positive(seconds) {
            debug!(seconds, "ignoring invalid max visible duration");
            return;
        }
        self.viewport.max_visible_duration = seconds;
        self.request_regeneration();
    }

    /// Changes the device pixels per point used for extraction
    /// Non-positive and non-finite values are ignored.
    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        if !is_positive(scale_factor) {
            debug!(scale_factor, "ignoring invalid scale factor");
            return;
        }
        self.viewport.scale_factor = scale_factor;
        self.request_regeneration();
    }

    /// Rebuilds every thumbnail for the current asset
    pub fn regenerate_thumbnails(&mut self) {
        self.request_regeneration();
    }

    /// Reports new viewport bounds from the layout system.
    ///
    /// Runs a deferred regeneration once bounds become non-zero, and
    /// regenerates when the bounds differ from those the tiles were built for.
    pub fn layout_pass_completed(&mut self, width: f64, height: f64) {
        self.viewport.width = width;
        self.viewport.height = height;
        if !self.viewport.has_bounds() {
            return;
        }

        if let Some(asset) = self.gate.release(&self.viewport) {
            debug!(width, height, "viewport ready, running deferred generation");
            self.regenerate(asset);
            return;
        }

        let resized = self
            .generated_for
            .is_some_and(|previous| !previous.same_bounds(&self.viewport));
        if resized {
            if let Some(asset) = self.asset.clone() {
                debug!(width, height, "viewport resized");
                self.regenerate(asset);
            }
        }
    }

    /// Applies every queued frame result. Returns how many were processed.
    pub fn process_completions(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.apply_frame(event);
            processed += 1;
        }
        processed
    }

    /// Applies queued results until the current session completes or
    /// `timeout` elapses. Returns true if the session completed.
    pub fn wait_for_completion(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_completions();
            if !self.session.as_ref().is_some_and(GenerationSession::is_active) {
                return self.session_state() == SessionState::Completed;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(event) => {
                    self.apply_frame(event);
                }
                Err(RecvTimeoutError::Timeout) => return false,
                // The strip holds a sender, so the channel never disconnects.
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    /// Applies one frame result on the owner thread
    pub fn apply_frame(&mut self, event: FrameEvent) -> SessionOutcome {
        let Some(session) = self.session.as_mut() else {
            trace!(session = %event.session, "frame arrived with no session");
            return SessionOutcome::Stale;
        };

        let outcome = session.apply(event, &mut self.tiles);
        for index in outcome.updated_tiles() {
            if let Some(image) = self.tiles.image(index) {
                self.presenter.set_tile_image(index, image);
            }
        }
        outcome
    }

    /// Cancels in-flight work and empties the strip. Late results become no-ops.
    pub fn teardown(&mut self) {
        self.gate.clear();
        self.reset();
        while self.rx.try_recv().is_ok() {}
    }

    /// Time at a scroll position
    pub fn time_for_position(&self, position: f64) -> Option<RationalTime> {
        self.mapper().time_for_position(position)
    }

    /// Scroll position of a time
    pub fn position_for_time(&self, time: RationalTime) -> Option<f64> {
        self.mapper().position_for_time(time)
    }

    /// Mapper for the current strip width and asset
    pub fn mapper(&self) -> PositionTimeMapper {
        PositionTimeMapper::new(self.strip_width(), self.asset.as_ref().map(|a| a.duration))
    }

    /// Current scrollable width; 0 until a generation has run
    pub fn strip_width(&self) -> f64 {
        self.geometry.as_ref().map_or(0.0, |g| g.strip_width)
    }

    pub fn geometry(&self) -> Option<&StripGeometry> {
        self.geometry.as_ref()
    }

    pub fn asset(&self) -> Option<&Arc<VideoAsset>> {
        self.asset.as_ref()
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn tiles(&self) -> &TileTable<Thumbnail> {
        &self.tiles
    }

    pub fn session_state(&self) -> SessionState {
        self.session.as_ref().map_or(SessionState::Idle, GenerationSession::state)
    }

    pub fn current_session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(GenerationSession::id)
    }

    /// True while an asset waits for the viewport to get bounds
    pub fn is_waiting_for_layout(&self) -> bool {
        self.gate.is_pending()
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn layout_host(&self) -> &L {
        &self.layout_host
    }

    fn request_regeneration(&mut self) {
        // A deferred asset picks up the new settings when it is released.
        if self.gate.is_pending() {
            return;
        }
        if let Some(asset) = self.asset.clone() {
            self.schedule(asset);
        }
    }

    fn schedule(&mut self, asset: Arc<VideoAsset>) {
        if !self.viewport.has_bounds() {
            debug!("viewport has no bounds yet, deferring generation");
            if self.gate.defer(asset) {
                self.layout_host.request_layout_pass();
            }
            return;
        }

        self.regenerate(asset);
    }

    fn regenerate(&mut self, asset: Arc<VideoAsset>) {
        self.cancel_session();
        self.asset = Some(Arc::clone(&asset));
        self.tiles.clear();
        self.presenter.clear_all_tiles();
        self.generated_for = Some(self.viewport);

        let geometry = match StripGeometry::compute(&asset, &self.viewport) {
            Ok(geometry) => geometry,
            Err(error) => {
                debug!(%error, "no usable geometry, leaving strip empty");
                self.geometry = None;
                self.session = None;
                return;
            }
        };

        self.presenter.set_content_width(geometry.strip_width);
        let tiles: Vec<Tile> = geometry.tiles();
        self.tiles.rebuild(tiles);
        self.presenter.set_tiles(self.tiles.tiles());

        let times = sample_times(&asset.duration, geometry.tile_count);
        self.last_session += 1;
        let id = SessionId(self.last_session);
        let mut session = GenerationSession::new(id, times.clone(), geometry.visible_tile_count);
        let sink = FrameSink::new(id, session.token().clone(), self.tx.clone());
        let request = ExtractionRequest {
            asset,
            times,
            target_size: geometry.target_pixel_size,
        };

        debug!(
            session = %id,
            tiles = geometry.tile_count,
            visible = geometry.visible_tile_count,
            strip_width = geometry.strip_width,
            tile_width = geometry.tile_size.width,
            "starting thumbnail generation"
        );
        session.begin_extracting();
        self.session = Some(session);
        self.geometry = Some(geometry);
        self.extractor.begin_extraction(request, sink);
    }

    fn cancel_session(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.is_active() {
                self.extractor.cancel_all();
                session.supersede();
                debug!(session = %session.id(), "superseded in-flight generation");
            }
        }
    }

    fn reset(&mut self) {
        self.cancel_session();
        self.session = None;
        self.geometry = None;
        self.generated_for = None;
        self.tiles.clear();
        self.presenter.clear_all_tiles();
    }
}

impl<E: FrameExtractor, P: TilePresenter, L: LayoutHost> Drop for ThumbnailStrip<E, P, L> {
    fn drop(&mut self) {
        self.cancel_session();
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
