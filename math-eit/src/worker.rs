//! Background reconstruction thread
//!
//! Frames arrive on one channel and images leave on another. Control
//! commands travel on a third channel that is drained before every frame,
//! so a command sent before a frame always takes effect first.
//!
//! The image channel holds at most `image_queue_capacity` images. When the
//! consumer falls behind, the worker blocks on the next image and stops
//! pulling frames until there is room again.

use crate::config::ReconstructionConfig;
use crate::error::{EitError, Result};
use crate::image::{Image, ImageKind};
use crate::orchestrator::{Frame, FrameOutcome, Orchestrator};
use crate::strategy::Algorithm;
use crossbeam_channel::{
    Receiver, RecvTimeoutError, Sender, TryRecvError, bounded, never, unbounded,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Control messages for the worker
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Reset { algorithm: Algorithm, n_el: usize },
    Start,
    Stop,
    Baseline,
    ResetBaseline,
    Shutdown,
}

/// Notifications from the worker
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Configured(ImageKind),
    /// A command failed; the message is the error text
    Failed(String),
    Baselined,
    Rebaselined,
    /// A short frame stopped the run
    Halted,
}

/// Handle to a running reconstruction thread
pub struct ReconstructionWorker {
    commands: Sender<Command>,
    frames: Sender<Frame>,
    images: Receiver<Image>,
    events: Receiver<Event>,
    handle: Option<JoinHandle<()>>,
}

struct Channels {
    commands: Receiver<Command>,
    frames: Receiver<Frame>,
    images: Sender<Image>,
    events: Sender<Event>,
}

impl ReconstructionWorker {
    /// Start the thread; it stays idle until it receives `Reset`
    pub fn spawn(config: ReconstructionConfig) -> Result<Self> {
        let (command_tx, command_rx) = unbounded();
        let (frame_tx, frame_rx) = unbounded();
        let (image_tx, image_rx) = bounded(config.image_queue_capacity.max(1));
        let (event_tx, event_rx) = unbounded();
        let poll = Duration::from_millis(config.poll_interval_ms.max(1));

        let channels = Channels {
            commands: command_rx,
            frames: frame_rx,
            images: image_tx,
            events: event_tx,
        };
        let handle = thread::Builder::new()
            .name("eit-reconstruction".into())
            .spawn(move || run(Orchestrator::new(config), channels, poll))?;

        Ok(Self {
            commands: command_tx,
            frames: frame_tx,
            images: image_rx,
            events: event_rx,
            handle: Some(handle),
        })
    }

    pub fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| EitError::Runtime("reconstruction worker has exited".into()))
    }

    pub fn push_frame(&self, frame: Frame) -> Result<()> {
        self.frames
            .send(frame)
            .map_err(|_| EitError::Runtime("reconstruction worker has exited".into()))
    }

    /// Sender for a transport thread to feed frames directly
    pub fn frame_sender(&self) -> Sender<Frame> {
        self.frames.clone()
    }

    pub fn images(&self) -> &Receiver<Image> {
        &self.images
    }

    pub fn events(&self) -> &Receiver<Event> {
        &self.events
    }

    /// Stop the thread and wait for it
    pub fn shutdown(mut self) -> Result<()> {
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let _ = self.commands.send(Command::Shutdown);
        // disconnect the image queue so a worker blocked on a full queue exits
        drop(std::mem::replace(&mut self.images, never()));
        handle
            .join()
            .map_err(|_| EitError::Runtime("reconstruction worker panicked".into()))
    }
}

impl Drop for ReconstructionWorker {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            log::error!("{e}");
        }
    }
}

fn run(mut orch: Orchestrator, channels: Channels, poll: Duration) {
    log::debug!("reconstruction worker started");
    loop {
        if !drain_commands(&mut orch, &channels) {
            break;
        }
        let frame = match channels.frames.recv_timeout(poll) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if !drain_commands(&mut orch, &channels) {
            break;
        }
        let event = match orch.process_frame(frame) {
            FrameOutcome::Image(image) => {
                if channels.images.send(image).is_err() {
                    log::warn!("image receiver dropped, stopping worker");
                    break;
                }
                None
            }
            FrameOutcome::Baselined => Some(Event::Baselined),
            FrameOutcome::Rebaselined => Some(Event::Rebaselined),
            FrameOutcome::Halted => Some(Event::Halted),
            FrameOutcome::Ignored | FrameOutcome::Skipped => None,
        };
        if let Some(event) = event {
            let _ = channels.events.send(event);
        }
    }
    log::debug!("reconstruction worker stopped");
}

/// Apply every pending command; `false` once the worker should exit
fn drain_commands(orch: &mut Orchestrator, channels: &Channels) -> bool {
    loop {
        let command = match channels.commands.try_recv() {
            Ok(command) => command,
            Err(TryRecvError::Empty) => return true,
            Err(TryRecvError::Disconnected) => return false,
        };
        let event = match command {
            Command::Shutdown => return false,
            Command::Reset { algorithm, n_el } => match orch.reset(algorithm, n_el) {
                Ok(kind) => Some(Event::Configured(kind)),
                Err(e) => {
                    log::error!("reset failed: {e}");
                    Some(Event::Failed(e.to_string()))
                }
            },
            Command::Start => orch.start().err().map(|e| Event::Failed(e.to_string())),
            Command::Stop => {
                orch.stop();
                None
            }
            Command::Baseline => {
                orch.baseline();
                None
            }
            Command::ResetBaseline => orch
                .reset_baseline()
                .err()
                .map(|e| Event::Failed(e.to_string())),
        };
        if let Some(event) = event {
            let _ = channels.events.send(event);
        }
    }
}
