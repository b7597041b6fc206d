// Monitor loop: polls the board, detects moves, scores them and publishes
// one annotation per scored move.
//
// Strictly sequential: every collaborator call is awaited before the next
// one starts, so annotations reach the channel in tick order.

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use movewatch_core::capability::{Evaluator, PositionSource, Publisher, SourceError};
use movewatch_core::classify::classify;
use movewatch_core::config::MonitorSettings;
use movewatch_core::types::{Classification, Color, Position, Score};

// ---------------------------------------------------------------------------
// Error and report types
// ---------------------------------------------------------------------------

/// Fatal session failure. Carries the session video if it could still be
/// obtained after the failure.
#[derive(Debug, Error)]
#[error("monitoring session failed: {source}")]
pub struct SessionError {
    #[source]
    pub source: SourceError,
    pub artifact: Option<PathBuf>,
}

/// Summary of a completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub ticks: u32,
    pub accepted_moves: u32,
    /// Annotations the publisher accepted. A failed post is not counted.
    pub annotations: u32,
    /// Accepted moves where at least one evaluation was unavailable.
    pub evaluation_gaps: u32,
    pub final_color: Color,
    pub last_position: Option<Position>,
    pub video: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// MonitorState
// ---------------------------------------------------------------------------

/// Per-session mutable state. Owned by one `Monitor` run and dropped with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorState {
    pub last_position: Option<Position>,
    pub mover_color: Color,
    pub ticks_remaining: u32,
}

impl MonitorState {
    pub fn new(settings: &MonitorSettings) -> Self {
        Self {
            last_position: None,
            mover_color: settings.initial_color,
            ticks_remaining: settings.tick_count,
        }
    }

    /// The previous position when `current` counts as a move: a position was
    /// already seen and it differs from `current`.
    pub fn accepts(&self, current: &Position) -> Option<&Position> {
        self.last_position.as_ref().filter(|last| *last != current)
    }
}

/// Annotation text for one scored move.
pub fn format_annotation(mover: Color, label: Classification, before: Score, after: Score) -> String {
    format!("{} plays: **{label}** ({before} → {after})", mover.glyph())
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct Monitor<S, E, P> {
    source: S,
    evaluator: E,
    publisher: P,
    settings: MonitorSettings,
    video_caption: String,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<S, E, P> Monitor<S, E, P>
where
    S: PositionSource,
    E: Evaluator,
    P: Publisher,
{
    pub fn new(source: S, evaluator: E, publisher: P, settings: MonitorSettings) -> Self {
        Self {
            source,
            evaluator,
            publisher,
            settings,
            video_caption: "Session recording".to_string(),
            shutdown: None,
        }
    }

    pub fn with_video_caption(mut self, caption: impl Into<String>) -> Self {
        self.video_caption = caption.into();
        self
    }

    /// Stop ticking once `shutdown` flips to `true`. The video is still
    /// uploaded.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Run one monitoring session to completion.
    pub async fn run(&mut self) -> Result<SessionReport, SessionError> {
        let mut state = MonitorState::new(&self.settings);
        let mut report = SessionReport {
            ticks: 0,
            accepted_moves: 0,
            annotations: 0,
            evaluation_gaps: 0,
            final_color: state.mover_color,
            last_position: None,
            video: None,
        };

        info!(
            "Monitor started: {} ticks every {:?}, {} to move",
            self.settings.tick_count, self.settings.tick_interval, state.mover_color
        );

        while state.ticks_remaining > 0 {
            if !self.wait_for_tick().await {
                info!("Shutdown requested, ending session early");
                break;
            }
            report.ticks += 1;

            let current = match self.source.read_current_position().await {
                Ok(current) => current,
                Err(source) => return Err(self.abort(source).await),
            };
            info!(tick = report.ticks, position = ?current.as_ref().map(Position::as_str), "board read");

            if let Some(current) = current {
                self.tick(&mut state, &mut report, &current).await;
                state.last_position = Some(current);
            }

            state.ticks_remaining -= 1;
        }

        report.final_color = state.mover_color;
        report.last_position = state.last_position.clone();

        let video = match self.source.video_artifact().await {
            Ok(video) => video,
            Err(source) => {
                return Err(SessionError {
                    source,
                    artifact: None,
                })
            }
        };
        if let Some(path) = &video {
            if let Err(e) = self.publisher.post_file(&self.video_caption, path).await {
                warn!("Failed to upload session video {}: {e}", path.display());
            }
        } else {
            debug!("No session video reported");
        }
        report.video = video;

        info!(
            "Monitor finished: {} ticks, {} moves, {} annotations",
            report.ticks, report.accepted_moves, report.annotations
        );
        Ok(report)
    }

    /// Process a non-empty board read. Does not update `last_position`.
    async fn tick(&self, state: &mut MonitorState, report: &mut SessionReport, current: &Position) {
        let Some(last) = state.accepts(current) else {
            return;
        };
        report.accepted_moves += 1;

        let before = self.evaluator.evaluate(last).await;
        let after = self.evaluator.evaluate(current).await;

        match (before, after) {
            (Some(before), Some(after)) => {
                let label = classify(before, after, state.mover_color);
                let text = format_annotation(state.mover_color, label, before, after);
                info!("{text}");
                match self.publisher.post_text(&text).await {
                    Ok(()) => report.annotations += 1,
                    Err(e) => warn!("Failed to publish annotation: {e}"),
                }
            }
            _ => {
                debug!(
                    mover = %state.mover_color,
                    "skipping annotation, evaluation unavailable"
                );
                report.evaluation_gaps += 1;
            }
        }

        // Flip on every accepted move so an evaluation gap cannot desync turns.
        state.mover_color = state.mover_color.opposite();
    }

    /// Sleep one tick interval. Returns `false` if shutdown was requested.
    async fn wait_for_tick(&mut self) -> bool {
        let interval = self.settings.tick_interval;
        let Some(shutdown) = self.shutdown.as_mut() else {
            tokio::time::sleep(interval).await;
            return true;
        };
        if *shutdown.borrow() {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => true,
            changed = shutdown.changed() => match changed {
                Ok(()) => !*shutdown.borrow(),
                // Sender gone: no shutdown can arrive any more.
                Err(_) => {
                    tokio::time::sleep(interval).await;
                    true
                }
            },
        }
    }

    /// Build the fatal error, salvaging the video path if the source still
    /// answers.
    async fn abort(&mut self, source: SourceError) -> SessionError {
        warn!("Position source failed: {source}");
        let artifact = self.source.video_artifact().await.ok().flatten();
        SessionError { source, artifact }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
