//! Worker pool that runs renders off the caller's thread.
//!
//! Jobs are independent: they may finish in any order and share no mutable
//! state besides the font cache.

use crate::color::Color;
use crate::error::{Error, Result};
use crate::render::{RenderedImage, Renderer};

use log::{info, warn};
use std::collections::VecDeque;
use std::future::Future;
use std::marker::PhantomData;
use std::num::NonZero;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::task::{Context, Poll, Waker};
use std::thread::{self, JoinHandle};

/// Something that turns a template id and text into an image.
pub trait Render: Send + Sync + 'static {
    fn render_id(&self, template_id: &str, text: &str, color: Color) -> Result<RenderedImage>;
}

impl Render for Renderer {
    fn render_id(&self, template_id: &str, text: &str, color: Color) -> Result<RenderedImage> {
        Renderer::render_id(self, template_id, text, color)
    }
}

pub struct RenderPool<R: Render = Renderer> {
    queue: Arc<JobQueue>,
    workers: Vec<JoinHandle<Result<()>>>,
    next_id: AtomicUsize,
    _renderer: PhantomData<R>,
}

impl<R: Render> RenderPool<R> {
    /// Starts `n_workers` threads, at most one per available core.
    pub fn new(renderer: R, n_workers: NonZero<usize>) -> Self {
        let n_workers = Self::check_n_workers(n_workers);
        let renderer = Arc::new(renderer);
        let queue = Arc::new(JobQueue::new());
        let workers = (1..=n_workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    queue: queue.clone(),
                    renderer: renderer.clone(),
                };
                thread::spawn(move || worker.run())
            })
            .collect();
        info!("started {n_workers} render workers");
        Self {
            queue,
            workers,
            next_id: AtomicUsize::new(0),
            _renderer: PhantomData,
        }
    }

    fn check_n_workers(n_workers: NonZero<usize>) -> usize {
        let av_workers = thread::available_parallelism().map_or(1, NonZero::get);
        n_workers.get().min(av_workers)
    }

    pub fn n_workers(&self) -> usize {
        self.workers.len()
    }

    /// Queues a render and returns immediately.
    pub fn submit(
        &self,
        template_id: impl Into<String>,
        text: impl Into<String>,
        color: Color,
    ) -> Result<RenderTicket> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(TicketSlot::default());
        let job = Job {
            id,
            template_id: template_id.into(),
            text: text.into(),
            color,
            reply: Responder {
                id,
                slot: Some(slot.clone()),
            },
        };
        self.queue.push(job)?;
        Ok(RenderTicket { id, slot })
    }

    /// Stops accepting jobs, finishes the queued ones and joins the workers.
    pub fn shutdown(mut self) -> Result<()> {
        self.close()
    }

    fn close(&mut self) -> Result<()> {
        self.queue.done()?;
        let mut result = Ok(());
        for (i, handle) in self.workers.drain(..).enumerate() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("render worker {} stopped: {e}", i + 1);
                    result = Err(e);
                }
                Err(_) => result = Err(Error::thread_join(i + 1)),
            }
        }
        result
    }
}

impl<R: Render> Drop for RenderPool<R> {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            if let Err(e) = self.close() {
                warn!("failed to stop render pool: {e}");
            }
        }
    }
}

struct Job {
    id: usize,
    template_id: String,
    text: String,
    color: Color,
    reply: Responder,
}

/// Completes a ticket exactly once, with [`Error::RenderAborted`] if dropped unanswered.
struct Responder {
    id: usize,
    slot: Option<Arc<TicketSlot>>,
}

impl Responder {
    fn send(mut self, result: Result<RenderedImage>) {
        if let Some(slot) = self.slot.take() {
            slot.fulfill(result);
        }
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.fulfill(Err(Error::RenderAborted(self.id)));
        }
    }
}

#[derive(Default)]
struct TicketSlot {
    state: Mutex<TicketState>,
    cond: Condvar,
}

#[derive(Default)]
struct TicketState {
    result: Option<Result<RenderedImage>>,
    waker: Option<Waker>,
}

impl TicketSlot {
    fn fulfill(&self, result: Result<RenderedImage>) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.result = Some(result);
        if let Some(waker) = state.waker.take() {
            waker.wake();
        }
        self.cond.notify_all();
    }
}

/// Handle to a queued render.
///
/// Block on it with [`RenderTicket::wait`] or `.await` it from async code.
pub struct RenderTicket {
    id: usize,
    slot: Arc<TicketSlot>,
}

impl RenderTicket {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn wait(self) -> Result<RenderedImage> {
        let state = lock!("render ticket" self.slot.state);
        let mut state = self
            .slot
            .cond
            .wait_while(state, |s| s.result.is_none())
            .map_err(|e| Error::mutex_lock("render ticket", e))?;
        state.result.take().unwrap_or(Err(Error::RenderAborted(self.id)))
    }

    /// Takes the result if the render already finished.
    pub fn try_wait(&mut self) -> Option<Result<RenderedImage>> {
        match self.slot.state.lock() {
            Ok(mut state) => state.result.take(),
            Err(e) => Some(Err(Error::mutex_lock("render ticket", e))),
        }
    }
}

impl Future for RenderTicket {
    type Output = Result<RenderedImage>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = match self.slot.state.lock() {
            Ok(state) => state,
            Err(e) => return Poll::Ready(Err(Error::mutex_lock("render ticket", e))),
        };
        match state.result.take() {
            Some(result) => Poll::Ready(result),
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

struct JobQueue {
    queue: Mutex<JobQueueState>,
    cond: Condvar,
}

#[derive(Default)]
struct JobQueueState {
    queue: VecDeque<Job>,
    done: bool,
}

impl JobQueue {
    fn new() -> Self {
        Self {
            queue: Mutex::new(JobQueueState::default()),
            cond: Condvar::new(),
        }
    }

    fn push(&self, job: Job) -> Result<()> {
        let mut state = lock!("job queue" self.queue);
        if state.done {
            return Err(Error::PoolClosed);
        }
        state.queue.push_back(job);
        self.cond.notify_one();
        Ok(())
    }

    fn pop(&self) -> Result<Option<Job>> {
        let state = lock!("job queue" self.queue);
        let mut state = self
            .cond
            .wait_while(state, |s| s.queue.is_empty() && !s.done)
            .map_err(|e| Error::mutex_lock("job queue", e))?;
        Ok(state.queue.pop_front())
    }

    fn done(&self) -> Result<()> {
        let mut state = lock!("job queue" self.queue);
        state.done = true;
        self.cond.notify_all();
        Ok(())
    }
}

struct Worker<R: Render> {
    id: usize,
    queue: Arc<JobQueue>,
    renderer: Arc<R>,
}

impl<R: Render> Worker<R> {
    fn run(&self) -> Result<()> {
        while let Some(job) = self.queue.pop()? {
            let Job {
                id,
                template_id,
                text,
                color,
                reply,
            } = job;
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                self.renderer.render_id(&template_id, &text, color)
            }))
            .unwrap_or_else(|_| {
                warn!("worker {}: job {id} on `{template_id}` panicked", self.id);
                Err(Error::RenderAborted(id))
            });
            if let Err(e) = &result {
                warn!("worker {}: job {id} on `{template_id}` failed: {e}", self.id);
            }
            reply.send(result);
        }
        Ok(())
    }
}
