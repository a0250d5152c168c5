use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::block::{Block, BlockBody};
use crate::error::SqlReplError;

/// Capacity of the append notification channel
const NOTIFY_CAPACITY: usize = 256;

/// Append-only, id-ordered log of blocks for one session
///
/// The store owns id allocation: ids start at 0 and grow by one per
/// [`append`](Transcript::append). Nothing is ever removed or rewritten.
#[derive(Debug)]
pub struct Transcript {
    inner: Mutex<Inner>,
    notify: broadcast::Sender<Block>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    blocks: Vec<Block>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            inner: Mutex::new(Inner::default()),
            notify,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            // appends never leave the log half-written, so the data is usable
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Stamp `body` with the next id and the current time and store it
    pub fn append(&self, body: BlockBody) -> Block {
        let mut inner = self.lock();
        let block = Block {
            id: inner.next_id,
            when: Utc::now(),
            body,
        };
        inner.next_id += 1;
        inner.blocks.push(block.clone());
        // sent under the lock so subscribers see ids in order; no subscribers is fine
        let _ = self.notify.send(block.clone());
        drop(inner);
        tracing::debug!(id = block.id, kind = block.body.tag(), "block appended");
        block
    }

    /// Copy of every block in id order
    #[must_use]
    pub fn snapshot(&self) -> Vec<Block> {
        self.lock().blocks.clone()
    }

    /// Receive each block as it is appended
    ///
    /// A receiver that falls more than the channel capacity behind gets
    /// `RecvError::Lagged`; [`snapshot`](Transcript::snapshot) still has
    /// everything.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Block> {
        self.notify.subscribe()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().blocks.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<Block> {
        self.lock().blocks.last().cloned()
    }

    /// Pretty JSON array of the current snapshot
    ///
    /// # Errors
    /// Returns `SqlReplError::SerializationError` if a block fails to serialize.
    pub fn to_json(&self) -> Result<String, SqlReplError> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}
