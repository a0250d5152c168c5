//! The per-query state machine.
//!
//! Every admitted [`QueryRunner::submit`] walks `Idle -> Submitted -> Settled`
//! and leaves exactly two blocks behind: the question and one outcome.
//! Overlapping submissions are handled by [`SubmitPolicy`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

use crate::block::{Block, BlockBody};
use crate::connection::QueryConnection;
use crate::error::SqlReplError;
use crate::transcript::Transcript;

/// What to do with a submission while another one is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitPolicy {
    /// Fail fast with [`SqlReplError::Busy`]
    #[default]
    Reject,
    /// Hold one submission until the current one settles (FIFO, depth 1)
    Queue,
}

impl SubmitPolicy {
    /// Submissions admitted at once: the one running plus the queue
    fn capacity(self) -> usize {
        match self {
            SubmitPolicy::Reject => 1,
            SubmitPolicy::Queue => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Nothing submitted yet
    Idle,
    /// A query is executing
    Submitted,
    /// The last query settled; ready for the next one
    Settled,
}

/// Runs submitted text against one connection and records it in a transcript
pub struct QueryRunner<C> {
    conn: AsyncMutex<C>,
    transcript: Arc<Transcript>,
    policy: SubmitPolicy,
    admitted: AtomicUsize,
    state: Mutex<RunnerState>,
}

/// Releases an admission slot when the submission ends
struct Admission<'a>(&'a AtomicUsize);

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<C: QueryConnection> QueryRunner<C> {
    #[must_use]
    pub fn new(conn: C, transcript: Arc<Transcript>, policy: SubmitPolicy) -> Self {
        Self {
            conn: AsyncMutex::new(conn),
            transcript,
            policy,
            admitted: AtomicUsize::new(0),
            state: Mutex::new(RunnerState::Idle),
        }
    }

    #[must_use]
    pub fn transcript(&self) -> &Arc<Transcript> {
        &self.transcript
    }

    #[must_use]
    pub fn policy(&self) -> SubmitPolicy {
        self.policy
    }

    #[must_use]
    pub fn state(&self) -> RunnerState {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, next: RunnerState) {
        match self.state.lock() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    fn admit(&self) -> Result<Admission<'_>, SqlReplError> {
        let capacity = self.policy.capacity();
        self.admitted
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            })
            .map(|_| Admission(&self.admitted))
            .map_err(|_| SqlReplError::Busy)
    }

    /// Submit `text` verbatim and wait for it to settle
    ///
    /// Appends the question block once the query starts executing and one
    /// outcome block once it settles; the outcome block is returned. Query
    /// failures are outcomes, not errors.
    ///
    /// The future must be driven to completion: dropping it mid-query leaves
    /// the question without an answer.
    ///
    /// # Errors
    /// Returns `SqlReplError::Busy`, with nothing appended, if the policy
    /// doesn't admit another submission right now.
    pub async fn submit(&self, text: &str) -> Result<Block, SqlReplError> {
        let _admission = match self.admit() {
            Ok(admission) => admission,
            Err(err) => {
                tracing::warn!(policy = ?self.policy, "submission rejected while busy");
                return Err(err);
            }
        };

        let mut conn = self.conn.lock().await;
        self.set_state(RunnerState::Submitted);
        let question = self.transcript.append(BlockBody::question(text));
        tracing::debug!(id = question.id, "query submitted");

        let outcome = conn.run(text).await;
        let block = self.transcript.append(outcome.into_block_body());
        self.set_state(RunnerState::Settled);
        tracing::debug!(question = question.id, outcome = block.id, kind = block.body.tag(), "query settled");
        Ok(block)
    }
}
