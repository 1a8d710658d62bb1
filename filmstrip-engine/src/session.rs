//! Generation session state machine
//!
//! A session owns one extraction run: its identifier, the ordered sample list,
//! how many leading tiles are visible and the cancellation token handed to the
//! extractor. Exactly one session is alive per strip; results carrying any
//! other identifier are discarded.

use crate::sink::{CancellationToken, FrameEvent, SessionId};
use crate::Thumbnail;
use filmstrip_core::{RationalTime, TileTable};
use tracing::trace;

/// Lifecycle of a generation session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Preparing,
    Extracting,
    Completed,
    Superseded,
}

/// One requested sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSlot {
    pub tile_index: usize,
    pub time: RationalTime,
}

/// What applying a frame result did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The frame was written to its tile, plus any visible tiles back-filled
    Applied {
        tile_index: usize,
        backfilled: Vec<usize>,
    },
    /// Extraction failed; the tile keeps its previous image
    Failed { tile_index: usize },
    /// The result belongs to another or a cancelled session
    Stale,
    /// The timestamp was never requested by this session
    UnknownTimestamp,
}

impl SessionOutcome {
    /// Indices whose image changed
    pub fn updated_tiles(&self) -> Vec<usize> {
        match self {
            SessionOutcome::Applied {
                tile_index,
                backfilled,
            } => std::iter::once(*tile_index)
                .chain(backfilled.iter().copied())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Bookkeeping for one extraction run
#[derive(Debug)]
pub struct GenerationSession {
    id: SessionId,
    state: SessionState,
    samples: Vec<SampleSlot>,
    visible_tile_count: usize,
    token: CancellationToken,
    delivered: Vec<bool>,
    own_frame: Vec<bool>,
    delivered_count: usize,
    first_frame_seen: bool,
}

impl GenerationSession {
    /// Creates a session in `Preparing` for samples listed in tile order
    pub fn new(id: SessionId, times: Vec<RationalTime>, visible_tile_count: usize) -> Self {
        let samples: Vec<SampleSlot> = times
            .into_iter()
            .enumerate()
            .map(|(tile_index, time)| SampleSlot { tile_index, time })
            .collect();
        let count = samples.len();
        Self {
            id,
            state: SessionState::Preparing,
            samples,
            visible_tile_count,
            token: CancellationToken::new(),
            delivered: vec![false; count],
            own_frame: vec![false; count],
            delivered_count: 0,
            first_frame_seen: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn samples(&self) -> &[SampleSlot] {
        &self.samples
    }

    pub fn visible_tile_count(&self) -> usize {
        self.visible_tile_count
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Number of results received so far, successful or not
    pub fn delivered(&self) -> usize {
        self.delivered_count
    }

    /// True while results are still expected
    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Preparing | SessionState::Extracting)
    }

    /// Marks the extraction request as issued
    pub fn begin_extracting(&mut self) {
        if self.state == SessionState::Preparing {
            self.state = if self.samples.is_empty() {
                SessionState::Completed
            } else {
                SessionState::Extracting
            };
        }
    }

    /// Cancels the session in favour of a newer one.
    ///
    /// Returns false if the session had already finished.
    pub fn supersede(&mut self) -> bool {
        self.token.cancel();
        if self.is_active() {
            self.state = SessionState::Superseded;
            true
        } else {
            false
        }
    }

    /// Applies one extraction result to `tiles`.
    ///
    /// The first successful frame of the session also fills every visible tile
    /// that has not received its own frame yet.
    pub fn apply(&mut self, event: FrameEvent, tiles: &mut TileTable<Thumbnail>) -> SessionOutcome {
        if event.session != self.id || self.state != SessionState::Extracting {
            trace!(session = %event.session, current = %self.id, "discarding stale frame");
            return SessionOutcome::Stale;
        }

        let Some(position) = self.position_of(&event.requested) else {
            trace!(session = %self.id, requested = %event.requested, "frame for unknown timestamp");
            return SessionOutcome::UnknownTimestamp;
        };
        let tile_index = self.samples[position].tile_index;

        if !self.delivered[position] {
            self.delivered[position] = true;
            self.delivered_count += 1;
        }

        let outcome = match event.result {
            Err(error) => {
                trace!(session = %self.id, tile_index, %error, "frame extraction failed");
                SessionOutcome::Failed { tile_index }
            }
            Ok(frame) => {
                tiles.set_image(tile_index, frame.image.clone());
                self.own_frame[position] = true;

                let mut backfilled = Vec::new();
                if !self.first_frame_seen {
                    self.first_frame_seen = true;
                    let visible = self.visible_tile_count.min(self.samples.len());
                    for slot in 0..visible {
                        if !self.own_frame[slot] && tiles.set_image(slot, frame.image.clone()) {
                            backfilled.push(slot);
                        }
                    }
                }
                SessionOutcome::Applied {
                    tile_index,
                    backfilled,
                }
            }
        };

        if self.delivered_count == self.samples.len() {
            self.state = SessionState::Completed;
            trace!(session = %self.id, "all frames delivered");
        }
        outcome
    }

    /// Sample position for a requested time; repeated timestamps resolve to
    /// the first slot still waiting for its result.
    fn position_of(&self, requested: &RationalTime) -> Option<usize> {
        let mut fallback = None;
        for (position, slot) in self.samples.iter().enumerate() {
            if slot.time.is_equivalent(requested) {
                if !self.delivered[position] {
                    return Some(position);
                }
                fallback.get_or_insert(position);
            }
        }
        fallback
    }
}
