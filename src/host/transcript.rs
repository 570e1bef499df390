use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::HostError;
use crate::protocol::HostMessage;

use super::WorkerPort;

#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    /// A posted message, with any transferred surface stripped.
    Posted(HostMessage<()>),
    Terminated,
}

/// Shared, ordered record of what a host sent to its worker.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Arc<Mutex<Vec<TranscriptEntry>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: TranscriptEntry) {
        self.entries.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.entries.lock().clone()
    }

    /// Posted messages only, in order.
    pub fn messages(&self) -> Vec<HostMessage<()>> {
        self.entries
            .lock()
            .iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::Posted(message) => Some(message.clone()),
                TranscriptEntry::Terminated => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Wraps a port and records everything sent through it.
pub struct TranscriptPort<P> {
    inner: P,
    transcript: Transcript,
}

impl<P> TranscriptPort<P> {
    pub fn new(inner: P, transcript: Transcript) -> Self {
        Self { inner, transcript }
    }
}

impl<P: WorkerPort> WorkerPort for TranscriptPort<P> {
    type Surface = P::Surface;

    fn post(&mut self, message: HostMessage<P::Surface>) -> Result<(), HostError> {
        let (envelope, surface) = message.split_surface();
        self.transcript
            .push(TranscriptEntry::Posted(envelope.clone()));
        let message = envelope
            .attach_surface(surface)
            .map_err(|err| HostError::Post(err.to_string()))?;
        self.inner.post(message)
    }

    fn terminate(&mut self) -> Result<(), HostError> {
        self.transcript.push(TranscriptEntry::Terminated);
        self.inner.terminate()
    }
}
