use crate::{
    error::{DetectionError, DetectionResult},
    timer::Timer,
};
use std::time::Duration;
use strum::Display;
use tracing::debug;

/// The states one recording passes through. Variants are ordered so that
/// every legal forward transition goes to a greater state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum PipelineStage {
    Loaded,
    Normalized,
    PeaksFound,
    PeaksFiltered,
    Reconciled,
    Segmented,
    Classified,
    Done,
    RejectedPoorFit,
    RejectedInvalidStatistics,
}

impl PipelineStage {
    pub fn is_rejection(self) -> bool {
        matches!(
            self,
            PipelineStage::RejectedPoorFit | PipelineStage::RejectedInvalidStatistics
        )
    }

    pub fn is_terminal(self) -> bool {
        self == PipelineStage::Done || self.is_rejection()
    }

    fn can_advance_to(self, next: PipelineStage) -> bool {
        if self.is_terminal() {
            false
        } else if next.is_rejection() {
            self == PipelineStage::Normalized
        } else {
            next > self
        }
    }
}

/// Walks a recording through [PipelineStage]s, refusing to revisit a stage
/// and enforcing the processing time limit at every transition.
#[derive(Debug)]
pub(crate) struct StageTracker {
    stage: PipelineStage,
    timer: Timer,
}

impl StageTracker {
    pub(crate) fn new(limit: Option<Duration>) -> Self {
        Self {
            stage: PipelineStage::Loaded,
            timer: Timer::new(limit),
        }
    }

    pub(crate) fn advance(&mut self, next: PipelineStage) -> DetectionResult<()> {
        if !self.stage.can_advance_to(next) {
            return Err(DetectionError::InvalidTransition {
                from: self.stage,
                to: next,
            });
        }
        let lap = self.timer.lap();
        debug!(from = %self.stage, to = %next, duration_us = lap.as_micros(), "Stage complete");
        self.stage = next;
        if let (Some(elapsed), Some(limit)) = (self.timer.overrun(), self.timer.limit()) {
            return Err(DetectionError::Timeout {
                stage: next,
                elapsed,
                limit,
            });
        }
        Ok(())
    }

    /// Records a rejection then returns `error`.
    pub(crate) fn reject<T>(
        &mut self,
        rejection: PipelineStage,
        error: DetectionError,
    ) -> DetectionResult<T> {
        self.advance(rejection)?;
        Err(error)
    }
}
