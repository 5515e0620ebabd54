//! Serialised outbound sends.
//!
//! [`OutboundQueue`] owns a [`Sender`] and runs commands from any number of
//! [`OutboundHandle`]s strictly one at a time, so a send issued before an
//! earlier write has finished waits its turn instead of interleaving bytes.
//! The channel is unbounded: bursts are buffered, never rejected. Each
//! command resolves a [`Completion`] once its frame is on the wire.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use tokio::{
    io::AsyncWrite,
    sync::{mpsc, oneshot},
};
use tokio_util::sync::CancellationToken;

use super::{SendError, SendOptions, Sender, check_control_len, close_frame_payload};

#[derive(Debug)]
enum Command {
    Data { payload: Bytes, options: SendOptions },
    Ping { payload: Bytes, mask: bool },
    Pong { payload: Bytes, mask: bool },
    Close { payload: Bytes, mask: bool },
}

#[derive(Debug)]
struct Pending {
    command: Command,
    ack: oneshot::Sender<Result<(), SendError>>,
}

/// Resolves when a queued command has been written, or with the reason it
/// was not.
///
/// Dropping a completion does not cancel the command.
#[derive(Debug)]
#[must_use = "a completion reports whether the frame was written"]
pub struct Completion(oneshot::Receiver<Result<(), SendError>>);

impl Future for Completion {
    type Output = Result<(), SendError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0)
            .poll(cx)
            .map(|ack| ack.unwrap_or(Err(SendError::Closed)))
    }
}

/// Cloneable handle for queueing outbound frames.
#[derive(Clone, Debug)]
pub struct OutboundHandle {
    tx: mpsc::UnboundedSender<Pending>,
}

impl OutboundHandle {
    fn enqueue(&self, command: Command) -> Completion {
        let (ack, done) = oneshot::channel();
        // A closed queue drops `ack`, which resolves the completion as closed.
        let _ = self.tx.send(Pending { command, ack });
        Completion(done)
    }

    /// Queue a data frame; see [`Sender::send`].
    pub fn send(&self, payload: Bytes, options: SendOptions) -> Completion {
        self.enqueue(Command::Data { payload, options })
    }

    /// Queue a ping.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::ControlPayloadTooLong`] without queueing.
    pub fn ping(&self, payload: Bytes, mask: bool) -> Result<Completion, SendError> {
        check_control_len(&payload)?;
        Ok(self.enqueue(Command::Ping { payload, mask }))
    }

    /// Queue a pong.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::ControlPayloadTooLong`] without queueing.
    pub fn pong(&self, payload: Bytes, mask: bool) -> Result<Completion, SendError> {
        check_control_len(&payload)?;
        Ok(self.enqueue(Command::Pong { payload, mask }))
    }

    /// Queue a close frame; `code` defaults to 1000.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::InvalidCloseCode`] or
    /// [`SendError::ControlPayloadTooLong`] without queueing.
    pub fn close(&self, code: Option<u16>, reason: &str, mask: bool) -> Result<Completion, SendError> {
        let payload = close_frame_payload(code, reason)?;
        Ok(self.enqueue(Command::Close { payload, mask }))
    }

    /// Whether the queue has stopped accepting work.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.tx.is_closed() }
}

/// Task side of the outbound queue.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use tokio_util::sync::CancellationToken;
/// use wsframe::sender::{OutboundQueue, SendOptions, Sender};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let (queue, handle) = OutboundQueue::new(Sender::new(Vec::new()), CancellationToken::new());
/// let task = tokio::spawn(queue.run());
/// handle.send(Bytes::from_static(b"a"), SendOptions::default()).await.unwrap();
/// drop(handle);
/// let sender = task.await.unwrap();
/// assert_eq!(sender.get_ref(), b"\x81\x01a");
/// # });
/// ```
#[derive(Debug)]
pub struct OutboundQueue<W> {
    sender: Sender<W>,
    rx: mpsc::UnboundedReceiver<Pending>,
    shutdown: CancellationToken,
}

impl<W: AsyncWrite + Unpin + Send> OutboundQueue<W> {
    /// Create a queue around `sender`; cancelling `shutdown` stops it.
    #[must_use]
    pub fn new(sender: Sender<W>, shutdown: CancellationToken) -> (Self, OutboundHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Self { sender, rx, shutdown };
        (queue, OutboundHandle { tx })
    }

    /// Process commands until every handle is dropped, the shutdown token is
    /// cancelled, or a write fails. Returns the sender.
    ///
    /// Commands still queued when the loop ends resolve with
    /// [`SendError::Closed`].
    pub async fn run(mut self) -> Sender<W> {
        loop {
            let pending = tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,
                pending = self.rx.recv() => match pending {
                    Some(pending) => pending,
                    None => break,
                },
            };
            let result = self.execute(pending.command).await;
            let fatal = matches!(result, Err(SendError::Io(_)));
            if let Err(err) = &result {
                log::warn!("outbound frame failed: {err}");
            }
            let _ = pending.ack.send(result);
            if fatal {
                break;
            }
        }
        self.rx.close();
        while let Ok(pending) = self.rx.try_recv() {
            let _ = pending.ack.send(Err(SendError::Closed));
        }
        self.sender
    }

    async fn execute(&mut self, command: Command) -> Result<(), SendError> {
        match command {
            Command::Data { payload, options } => self.sender.send(payload, options).await,
            Command::Ping { payload, mask } => self.sender.ping(payload, mask).await,
            Command::Pong { payload, mask } => self.sender.pong(payload, mask).await,
            Command::Close { payload, mask } => self.sender.close_with_payload(payload, mask).await,
        }
    }
}
