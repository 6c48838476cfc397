// THEORY:
// The `parallel_pipeline` module moves the detector off the caller's path. The
// host never calls into a `ShotDetector` directly; it posts commands into a
// bounded queue and receives events back on a separate channel, so per-frame
// work never blocks whoever produces the frames.
//
// Layout:
// 1.  **Command queue**: a bounded `mpsc` channel. Senders wait when it is full;
//     nothing is dropped and no frame is skipped on the worker side.
// 2.  **Worker task**: one `tokio` task exclusively owns the detector and
//     processes commands strictly one at a time, in arrival order. No locks are
//     needed because nothing else can reach the detector.
// 3.  **Event channel**: unbounded, so a slow consumer never stalls detection.
//     Events carry no sequence number; a caller that resets while frames are in
//     flight discards late shots itself.
// 4.  **Shutdown**: dropping every command sender ends the worker after it has
//     drained the queue. `shutdown` does exactly that and hands back whatever
//     events were still unread.

use crate::error::DetectError;
use crate::pipeline::{
    BaselineRequest, Command, DetectorConfig, DetectorEvent, FrameRequest, ShotDetector,
};
use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// Cloneable sending side of a detector's command queue.
#[derive(Clone)]
pub struct CommandSender {
    inner: mpsc::Sender<Command>,
}

impl CommandSender {
    pub async fn send(&self, command: Command) -> Result<(), DetectError> {
        self.inner.send(command).await.map_err(|_| DetectError::WorkerClosed)
    }

    pub async fn reset(&self) -> Result<(), DetectError> {
        self.send(Command::Reset).await
    }

    pub async fn set_baseline(&self, request: BaselineRequest) -> Result<(), DetectError> {
        self.send(Command::SetBaseline(request)).await
    }

    pub async fn submit_frame(&self, request: FrameRequest) -> Result<(), DetectError> {
        self.send(Command::SubmitFrame(request)).await
    }
}

/// Owner-side handle of a detector running on its own task.
pub struct DetectorHandle {
    commands: CommandSender,
    events: mpsc::UnboundedReceiver<DetectorEvent>,
    worker: JoinHandle<()>,
}

impl DetectorHandle {
    /// Builds a detector and starts its worker. Must be called inside a tokio runtime.
    pub fn spawn(config: DetectorConfig, queue_capacity: usize) -> Result<Self, DetectError> {
        let detector = ShotDetector::new(config)?;
        let (command_sender, command_receiver) = mpsc::channel(queue_capacity.max(1));
        let (event_sender, events) = mpsc::unbounded_channel();

        let worker = tokio::spawn(run_worker(detector, command_receiver, event_sender));

        Ok(Self {
            commands: CommandSender { inner: command_sender },
            events,
            worker,
        })
    }

    /// Another sender for the same queue. The worker keeps running while any exists.
    pub fn commands(&self) -> CommandSender {
        self.commands.clone()
    }

    pub async fn send(&self, command: Command) -> Result<(), DetectError> {
        self.commands.send(command).await
    }

    pub async fn reset(&self) -> Result<(), DetectError> {
        self.commands.reset().await
    }

    pub async fn set_baseline(&self, request: BaselineRequest) -> Result<(), DetectError> {
        self.commands.set_baseline(request).await
    }

    pub async fn submit_frame(&self, request: FrameRequest) -> Result<(), DetectError> {
        self.commands.submit_frame(request).await
    }

    /// Waits for the next event. Only returns `None` once the worker has stopped.
    pub async fn next_event(&mut self) -> Option<DetectorEvent> {
        self.events.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<DetectorEvent> {
        self.events.try_recv().ok()
    }

    /// Turns the handle into a stream of events. The stream ends once every
    /// `CommandSender` is dropped and the worker has drained its queue.
    pub fn into_event_stream(self) -> impl Stream<Item = DetectorEvent> {
        let Self { events, .. } = self;
        futures::stream::unfold(events, |mut events| async move {
            events.recv().await.map(|event| (event, events))
        })
    }

    /// Closes this handle's side of the queue, waits for the worker to finish
    /// the commands already queued and returns the events nobody has read yet.
    /// Any `CommandSender` obtained from `commands()` must be dropped as well,
    /// or this waits for it.
    pub async fn shutdown(self) -> Result<Vec<DetectorEvent>, DetectError> {
        let Self {
            commands,
            mut events,
            worker,
        } = self;
        drop(commands);
        worker.await.map_err(|e| {
            log::warn!("detector worker ended abnormally: {e}");
            DetectError::WorkerClosed
        })?;

        let mut remaining = Vec::new();
        while let Ok(event) = events.try_recv() {
            remaining.push(event);
        }
        Ok(remaining)
    }
}

async fn run_worker(
    mut detector: ShotDetector,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::UnboundedSender<DetectorEvent>,
) {
    log::info!("detector worker started");
    let mut processed = 0u64;
    while let Some(command) = commands.recv().await {
        processed += 1;
        if let Some(event) = detector.handle(command) {
            if events.send(event).is_err() {
                log::trace!("event receiver gone; event dropped");
            }
        }
    }
    log::info!("detector worker stopped after {processed} commands");
}
