/*!
 * Session Worker
 * Single-writer command loop over a tokio channel
 *
 * Concurrent control requests serialize onto the worker; successful
 * commands publish exactly one snapshot. Suspension points exist only at
 * message receive and snapshot send; a tick never suspends.
 */

use super::command::Command;
use super::publisher::{Publisher, Subscription};
use super::Session;
use crate::core::errors::SimError;
use crate::core::types::SimResult;
use crate::sched::SchedConfig;
use crate::snapshot::StateSnapshot;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

const COMMAND_QUEUE_DEPTH: usize = 64;

struct Request {
    cmd: Command,
    reply: oneshot::Sender<SimResult<Arc<StateSnapshot>>>,
}

/// Cloneable handle to a running session worker
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Request>,
    publisher: Publisher,
    cancel: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Submit a command and await its result.
    ///
    /// An `Ok` snapshot has already been broadcast to all subscribers.
    pub async fn send(&self, cmd: Command) -> SimResult<Arc<StateSnapshot>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Request {
                cmd,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SimError::Internal("session worker stopped".into()))?;
        reply_rx
            .await
            .map_err(|_| SimError::Internal("session worker dropped the reply".into()))?
    }

    /// Submit a raw JSON control message
    pub async fn send_json(&self, raw: &str) -> SimResult<Arc<StateSnapshot>> {
        let cmd: Command = serde_json::from_str(raw)
            .map_err(|e| SimError::config(format!("invalid control message: {e}")))?;
        self.send(cmd).await
    }

    /// Register a snapshot subscriber (latest-wins slot of depth 1)
    pub fn subscribe(&self) -> Subscription {
        self.publisher.subscribe()
    }

    /// Request cancellation of an in-flight `run` between ticks
    pub fn cancel_run(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Most recently broadcast snapshot
    pub fn latest(&self) -> Arc<StateSnapshot> {
        self.publisher.latest()
    }
}

/// Spawn the worker task and return its handle
pub fn spawn_session(config: SchedConfig) -> SimResult<SessionHandle> {
    let mut session = Session::new(config)?;
    let publisher = Publisher::new(session.snapshot());
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, mut rx) = mpsc::channel::<Request>(COMMAND_QUEUE_DEPTH);

    let worker_publisher = publisher.clone();
    let worker_cancel = Arc::clone(&cancel);
    tokio::spawn(async move {
        while let Some(Request { cmd, reply }) = rx.recv().await {
            debug!("session command: {cmd:?}");
            let result = session.handle_command(cmd, &worker_cancel);
            match &result {
                Ok(snapshot) => worker_publisher.publish(Arc::clone(snapshot)),
                Err(err) => warn!("command rejected: {err}"),
            }
            // A dropped reply means the caller went away; the state change
            // (and its broadcast) are already committed
            let _ = reply.send(result);
        }
        debug!("session worker stopped");
    });

    Ok(SessionHandle {
        tx,
        publisher,
        cancel,
    })
}
