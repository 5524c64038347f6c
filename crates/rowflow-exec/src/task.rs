//! Operator base type and the task contract
//!
//! Every operator in a statement's dataflow is a task: an inbox, an outbox,
//! a handle on the shared cancellation signal, and a `run` that drives it
//! until its inputs close or the signal fires. Outboxes close by sender
//! drop on every return path, so downstream operators always observe
//! end-of-stream exactly once.

use crate::context::ExecutionContext;
use crate::error::Result;
use async_trait::async_trait;
use rowflow_source::Message;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Bound on in-flight messages between two operators.
pub const MESSAGE_BUFFER: usize = 100;

/// One node in the execution dataflow.
#[async_trait]
pub trait Task: Send {
    /// Kind tag, e.g. `"Source"` or `"SourceJoin"`.
    fn task_type(&self) -> &str;

    /// Steal the outbox receiver; the downstream operator reads from it.
    fn message_out(&mut self) -> mpsc::Receiver<Message>;

    /// Drive the operator until inputs close or cancellation is signaled.
    /// The outbox must be closed on return by any path.
    async fn run(&mut self, ctx: &ExecutionContext) -> Result<()>;

    /// Release underlying resources (scanner handles, connections).
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("task_type", &self.task_type()).finish()
    }
}

/// Common operator state: channels, signal handle, child tasks.
#[derive(Debug)]
pub struct TaskBase {
    task_type: String,
    out_tx: Option<mpsc::Sender<Message>>,
    out_rx: Option<mpsc::Receiver<Message>>,
    in_rx: Option<mpsc::Receiver<Message>>,
    sig: watch::Receiver<bool>,
    children: Vec<Box<dyn Task>>,
}

impl TaskBase {
    pub fn new<S: Into<String>>(task_type: S, ctx: &ExecutionContext) -> Self {
        let (out_tx, out_rx) = mpsc::channel(MESSAGE_BUFFER);
        Self {
            task_type: task_type.into(),
            out_tx: Some(out_tx),
            out_rx: Some(out_rx),
            in_rx: None,
            sig: ctx.signal(),
            children: Vec::new(),
        }
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    /// Steal the outbox receiver; the downstream operator reads from it.
    pub fn message_out(&mut self) -> mpsc::Receiver<Message> {
        self.out_rx.take().expect("outbox receiver already taken")
    }

    /// Take the outbox sender. `run` takes it once at the top; dropping it
    /// on every return path is what closes the channel.
    pub fn take_sender(&mut self) -> mpsc::Sender<Message> {
        self.out_tx.take().expect("outbox sender already taken")
    }

    /// Connect an upstream operator's output as this task's inbox.
    pub fn set_input(&mut self, rx: mpsc::Receiver<Message>) {
        self.in_rx = Some(rx);
    }

    pub fn take_input(&mut self) -> Option<mpsc::Receiver<Message>> {
        self.in_rx.take()
    }

    /// A fresh receiver on the shared cancellation signal.
    pub fn signal(&self) -> watch::Receiver<bool> {
        self.sig.clone()
    }

    /// Attach a child task; composite operators close their children with
    /// themselves.
    pub fn add_child(&mut self, child: Box<dyn Task>) {
        self.children.push(child);
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn close(&mut self) -> Result<()> {
        for child in &mut self.children {
            child.close()?;
        }
        Ok(())
    }
}

/// Owns one statement execution: constructs the context and hands a handle
/// to each operator, spawns them, and folds their outcomes back in.
pub struct Execution {
    ctx: ExecutionContext,
}

impl Execution {
    pub fn new() -> Self {
        Self {
            ctx: ExecutionContext::new(),
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Spawn an operator onto the runtime. A returned error lands in the
    /// context; so does a recovered panic once the handle is joined.
    pub fn spawn<T: Task + 'static>(&self, mut task: T) -> JoinHandle<()> {
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            if let Err(err) = task.run(&ctx).await {
                tracing::error!("task failed: {}", err);
                ctx.store_error(err);
            }
        })
    }

    /// Wait for a spawned operator, recovering panics into the context.
    pub async fn join(&self, handle: JoinHandle<()>) {
        self.ctx.recover(handle.await);
    }
}

impl Default for Execution {
    fn default() -> Self {
        Self::new()
    }
}
