//! Reconstruction state machine
//!
//! ```text
//! Idle --reset--> Configured --start--> Running
//!                     ^                    |
//!                     +---- stop / halt ---+
//! ```
//!
//! The orchestrator owns the reference frame. It is written only when a
//! baseline is taken (explicitly, after `reset`, or on a length mismatch)
//! and by `reset_baseline`.

use crate::config::{ReconstructionConfig, ReferenceSource};
use crate::error::{EitError, Result};
use crate::image::{Image, ImageKind};
use crate::model::EitModel;
use crate::reference::load_reference;
use crate::strategy::{Algorithm, Reconstructor};
use std::time::Instant;

/// One sweep of boundary measurements
pub type Frame = Vec<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No strategy built yet
    Idle,
    /// Strategy ready, frames are ignored
    Configured,
    /// Frames are reconstructed
    Running,
}

/// What happened to a frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Not running; the frame was dropped
    Ignored,
    /// Frame shorter than two samples; the run stopped
    Halted,
    /// Frame stored as the new reference
    Baselined,
    /// Frame length differed from the reference and replaced it
    Rebaselined,
    Image(Image),
    /// Reconstruction failed; the error was logged
    Skipped,
}

struct Active {
    algorithm: Algorithm,
    model: EitModel,
    strategy: Box<dyn Reconstructor>,
}

pub struct Orchestrator {
    config: ReconstructionConfig,
    state: State,
    active: Option<Active>,
    reference: Option<Frame>,
    need_baseline: bool,
}

impl Orchestrator {
    pub fn new(config: ReconstructionConfig) -> Self {
        Self {
            config,
            state: State::Idle,
            active: None,
            reference: None,
            need_baseline: true,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    pub fn algorithm(&self) -> Option<Algorithm> {
        self.active.as_ref().map(|a| a.algorithm)
    }

    pub fn image_kind(&self) -> Option<ImageKind> {
        self.active.as_ref().map(|a| a.strategy.kind())
    }

    pub fn model(&self) -> Option<&EitModel> {
        self.active.as_ref().map(|a| &a.model)
    }

    pub fn num_measurements(&self) -> Option<usize> {
        self.active.as_ref().map(|a| a.strategy.num_measurements())
    }

    pub fn reference(&self) -> Option<&[f64]> {
        self.reference.as_deref()
    }

    pub fn needs_baseline(&self) -> bool {
        self.need_baseline
    }

    /// Rebuild mesh, forward model and strategy.
    ///
    /// On failure the previous configuration (and state) is kept.
    pub fn reset(&mut self, algorithm: Algorithm, n_el: usize) -> Result<ImageKind> {
        let start = Instant::now();
        let mut config = self.config.clone();
        config.algorithm = algorithm;
        config.n_el = n_el;

        let model = EitModel::build(&config)?;
        let strategy = algorithm.build(&model, &config)?;
        let kind = strategy.kind();

        self.config = config;
        self.active = Some(Active {
            algorithm,
            model,
            strategy,
        });
        self.reference = None;
        self.need_baseline = true;
        self.state = State::Configured;
        log::info!(
            "configured {algorithm} for {n_el} electrodes ({kind:?} images) in {:.2?}",
            start.elapsed()
        );
        Ok(kind)
    }

    /// Begin reconstructing frames
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            State::Idle => Err(EitError::Configuration(
                "cannot start before a successful reset".into(),
            )),
            State::Configured | State::Running => {
                self.state = State::Running;
                Ok(())
            }
        }
    }

    /// Stop reconstructing; the strategy is kept
    pub fn stop(&mut self) {
        if self.state == State::Running {
            self.state = State::Configured;
        }
    }

    /// The next processed frame becomes the reference
    pub fn baseline(&mut self) {
        self.need_baseline = true;
    }

    /// Reload the persisted reference
    pub fn reset_baseline(&mut self) -> Result<()> {
        let active = self.active.as_ref().ok_or_else(|| {
            EitError::Configuration("no configuration to load a reference for".into())
        })?;
        let values = match &self.config.reference {
            ReferenceSource::Simulated => active.model.simulated_reference(),
            ReferenceSource::File { path, label } => load_reference(path, label.as_deref())?,
        };
        let expected = active.strategy.num_measurements();
        if values.len() != expected {
            return Err(EitError::Configuration(format!(
                "reference has {} values, the protocol measures {expected}",
                values.len()
            )));
        }
        self.reference = Some(self.replace_zeros(values));
        self.need_baseline = false;
        log::info!("reference reloaded");
        Ok(())
    }

    fn replace_zeros(&self, mut frame: Frame) -> Frame {
        for v in frame.iter_mut().filter(|v| **v == 0.0) {
            *v = self.config.zero_sentinel;
        }
        frame
    }

    /// Handle one incoming frame
    pub fn process_frame(&mut self, frame: Frame) -> FrameOutcome {
        if self.state != State::Running {
            log::debug!("dropping frame while {:?}", self.state);
            return FrameOutcome::Ignored;
        }
        if frame.len() < 2 {
            log::warn!(
                "frame with {} samples, stopping reconstruction",
                frame.len()
            );
            self.state = State::Configured;
            return FrameOutcome::Halted;
        }
        let frame = self.replace_zeros(frame);

        let reference = match self.reference.as_ref() {
            Some(reference) if !self.need_baseline => reference,
            _ => {
                log::info!("baseline taken ({} measurements)", frame.len());
                self.reference = Some(frame);
                self.need_baseline = false;
                return FrameOutcome::Baselined;
            }
        };
        if reference.len() != frame.len() {
            log::warn!(
                "frame length {} differs from reference length {}, re-baselining",
                frame.len(),
                reference.len()
            );
            self.reference = Some(frame);
            return FrameOutcome::Rebaselined;
        }

        let Some(active) = self.active.as_ref() else {
            return FrameOutcome::Ignored;
        };
        let start = Instant::now();
        match active.strategy.reconstruct(&frame, reference) {
            Ok(image) => {
                log::debug!("reconstruction time: {:.2?}", start.elapsed());
                FrameOutcome::Image(image)
            }
            Err(e) => {
                log::error!("skipping frame: {e}");
                FrameOutcome::Skipped
            }
        }
    }
}
