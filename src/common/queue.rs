//! Broadcast queue for one-to-many message distribution.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{BpmnGenError, Result};

/// Broadcast queue where every subscriber receives every message.
///
/// Backed by tokio's broadcast channel. Sending with no live subscriber is an
/// error, which publishers are free to ignore.
#[derive(Clone)]
pub struct BroadcastQueue<T> {
    sender: Arc<broadcast::Sender<T>>,
}

impl<T: Clone> BroadcastQueue<T> {
    /// create a new broadcast queue
    pub fn new(cap: usize) -> Arc<Self> {
        let (tx, _) = broadcast::channel(cap);

        Arc::new(Self {
            sender: Arc::new(tx),
        })
    }

    /// send a message to the queue
    pub fn send(
        &self,
        msg: T,
    ) -> Result<()> {
        self.sender.send(msg).map_err(|e| BpmnGenError::IoError(e.to_string()))?;
        Ok(())
    }

    /// subscribe to the queue
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }
}
