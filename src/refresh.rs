//! Background worker that keeps the composite current.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::clock::Clock;
use crate::compositor::GreylineCompositor;
use crate::job::RenderJob;
use crate::wallpaper::PostRenderHook;

/// Command messages sent to the refresh worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshCommand {
    /// Stop the worker loop.
    Stop,
    /// Render again without waiting for the interval.
    Now,
}

/// Events emitted after every render attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    /// The composite was written to this path.
    Rendered(PathBuf),
    /// The render failed; the worker keeps running.
    Error(String),
}

/// Handle to a background refresh thread.
#[derive(Debug)]
pub struct RefreshWorker {
    cmd_tx: Sender<RefreshCommand>,
    event_rx: Receiver<RefreshEvent>,
    join: Option<thread::JoinHandle<()>>,
}

impl RefreshWorker {
    /// Spawn a worker that renders immediately and then once per `interval`.
    pub fn start<C: Clock + 'static>(
        job: RenderJob,
        compositor: GreylineCompositor<C>,
        hook: Option<Box<dyn PostRenderHook>>,
        interval: Duration,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (evt_tx, evt_rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            run_worker(&job, &compositor, hook.as_deref(), interval, &cmd_rx, &evt_tx);
        });

        Self {
            cmd_tx,
            event_rx: evt_rx,
            join: Some(handle),
        }
    }

    /// Ask for an immediate re-render.
    pub fn request_now(&self) {
        let _ = self.cmd_tx.send(RefreshCommand::Now);
    }

    /// Stop the worker and wait for the current render to finish.
    pub fn stop(mut self) {
        let _ = self.cmd_tx.send(RefreshCommand::Stop);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }

    /// Block until the next event; `None` once the worker has exited.
    pub fn next_event(&self) -> Option<RefreshEvent> {
        self.event_rx.recv().ok()
    }
}

fn run_worker<C: Clock>(
    job: &RenderJob,
    compositor: &GreylineCompositor<C>,
    hook: Option<&dyn PostRenderHook>,
    interval: Duration,
    cmd_rx: &Receiver<RefreshCommand>,
    evt_tx: &Sender<RefreshEvent>,
) {
    loop {
        loop {
            match cmd_rx.try_recv() {
                Ok(RefreshCommand::Stop) | Err(TryRecvError::Disconnected) => return,
                // Already about to render.
                Ok(RefreshCommand::Now) => {}
                Err(TryRecvError::Empty) => break,
            }
        }

        let event = match job.run(compositor, hook) {
            Ok(path) => RefreshEvent::Rendered(path),
            Err(err) => {
                error!(error = %err, "refresh render failed");
                RefreshEvent::Error(err.to_string())
            }
        };
        if evt_tx.send(event).is_err() {
            return;
        }

        match wait_or_command(cmd_rx, interval) {
            Some(RefreshCommand::Stop) => return,
            Some(RefreshCommand::Now) => debug!("refresh requested early"),
            None => {}
        }
    }
}

/// Block until the interval elapses or a command arrives.
fn wait_or_command(cmd_rx: &Receiver<RefreshCommand>, interval: Duration) -> Option<RefreshCommand> {
    let step = Duration::from_millis(500);
    let start = Instant::now();
    while start.elapsed() < interval {
        match cmd_rx.try_recv() {
            Ok(cmd) => return Some(cmd),
            Err(TryRecvError::Disconnected) => return Some(RefreshCommand::Stop),
            Err(TryRecvError::Empty) => {}
        }
        let remaining = interval.saturating_sub(start.elapsed());
        thread::sleep(step.min(remaining));
    }
    None
}
