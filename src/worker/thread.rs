use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::config::PipelineConfig;
use crate::effects::EffectKind;
use crate::error::HostError;
use crate::gl::GraphicsContext;
use crate::host::WorkerPort;
use crate::protocol::{HostMessage, WorkerMessage};

use super::{RenderSession, SessionState};

/// A render session on its own thread, fed over a channel.
///
/// Frame callbacks are emulated with a deadline of one nominal frame
/// interval. Dropping the handle terminates the worker.
pub struct WorkerThread<S> {
    inbox: Option<Sender<HostMessage<S>>>,
    handle: Option<JoinHandle<()>>,
}

impl<S: Send + 'static> WorkerThread<S> {
    /// Spawns a worker for `effect`. Replies are delivered on the returned
    /// receiver.
    pub fn spawn<G>(
        effect: EffectKind,
        config: PipelineConfig,
    ) -> Result<(Self, Receiver<WorkerMessage>), HostError>
    where
        G: GraphicsContext<Surface = S> + 'static,
    {
        let (inbox, messages) = mpsc::channel();
        let (replies, outbox) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(format!("render-{effect}"))
            .spawn(move || run_session::<G>(effect, config, messages, replies))
            .map_err(|err| HostError::WorkerSpawn(err.to_string()))?;
        Ok((
            Self {
                inbox: Some(inbox),
                handle: Some(handle),
            },
            outbox,
        ))
    }
}

impl<S> WorkerThread<S> {
    pub fn is_terminated(&self) -> bool {
        self.inbox.is_none()
    }
}

impl<S> WorkerPort for WorkerThread<S> {
    type Surface = S;

    fn post(&mut self, message: HostMessage<S>) -> Result<(), HostError> {
        let inbox = self
            .inbox
            .as_ref()
            .ok_or_else(|| HostError::Post("worker was terminated".into()))?;
        inbox
            .send(message)
            .map_err(|_| HostError::Post("worker thread has exited".into()))
    }

    /// Closes the channel and waits for the thread. Messages already
    /// posted are still handled first.
    fn terminate(&mut self) -> Result<(), HostError> {
        self.inbox = None;
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        handle.join().map_err(|panic| HostError::Detach {
            what: "render worker",
            reason: format!("thread panicked: {panic:?}"),
        })
    }
}

impl<S> Drop for WorkerThread<S> {
    fn drop(&mut self) {
        let _ = self.terminate();
    }
}

fn run_session<G: GraphicsContext>(
    effect: EffectKind,
    config: PipelineConfig,
    messages: Receiver<HostMessage<G::Surface>>,
    replies: Sender<WorkerMessage>,
) {
    let frame_interval = Duration::from_secs_f32(config.nominal_frame_interval);
    let mut session = RenderSession::<G>::new(effect.build(), &config);
    let epoch = Instant::now();
    let mut next_frame: Option<Instant> = None;
    info!("{effect} worker thread started");

    loop {
        let received = match next_frame {
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match messages.recv_timeout(timeout) {
                    Ok(message) => Some(message),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match messages.recv() {
                Ok(message) => Some(message),
                Err(_) => break,
            },
        };

        match received {
            Some(message) => {
                debug!("{effect} worker <- {}", message.kind());
                let dispatch = session.handle(message);
                if let Some(reply) = dispatch.reply {
                    if replies.send(reply).is_err() {
                        debug!("{effect} worker reply dropped, host is gone");
                    }
                }
                if dispatch.request_frame {
                    next_frame = Some(Instant::now() + frame_interval);
                }
                if session.state() == SessionState::Terminated {
                    break;
                }
            }
            None => {
                next_frame = None;
                if session.tick(epoch.elapsed().as_secs_f64()) {
                    next_frame = Some(Instant::now() + frame_interval);
                }
            }
        }
    }
    info!("{effect} worker thread stopped");
}
