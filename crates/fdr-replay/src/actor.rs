//! One task per session.
//!
//! The task owns the [`SessionState`], the pending advance deadline and the
//! current sink. Every control command and every timer firing is handled on
//! that task, one at a time, so the session is never mutated concurrently.
//! Commands are polled before the timer; a pause that races a due advance
//! therefore wins, and a cleared deadline can never fire.

use std::sync::Arc;
use std::time::Duration;

use fdr_telemetry::{FlightKey, Sample};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::session::{SessionState, Snapshot};
use crate::sink::TickSink;

enum Command {
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    Resume {
        sink: Arc<dyn TickSink>,
        reply: oneshot::Sender<Snapshot>,
    },
    Pause {
        reply: oneshot::Sender<Snapshot>,
    },
    SetRate {
        rate: f64,
        reply: oneshot::Sender<f64>,
    },
    SeekSeconds {
        seconds: f64,
        reply: oneshot::Sender<Snapshot>,
    },
    SeekPoints {
        count: i64,
        reply: oneshot::Sender<Snapshot>,
    },
}

/// Cloneable address of a running session.
#[derive(Clone)]
pub struct SessionHandle {
    key: FlightKey,
    samples: Arc<[Sample]>,
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Spawn the session task for `samples` and return its handle.
    pub(crate) fn spawn(
        key: FlightKey,
        samples: Arc<[Sample]>,
        command_buffer: usize,
        idle_timeout: Option<Duration>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(command_buffer.max(1));
        let actor = SessionActor {
            state: SessionState::new(key.clone(), Arc::clone(&samples)),
            deadline: None,
            sink: None,
            rx,
            idle_timeout,
        };
        tokio::spawn(actor.run());
        Self { key, samples, tx }
    }

    pub fn key(&self) -> &FlightKey {
        &self.key
    }

    /// The session's samples. Loaded once, never modified.
    pub fn samples(&self) -> &Arc<[Sample]> {
        &self.samples
    }

    /// Whether the session task has exited.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| Error::SessionClosed(self.key.clone()))?;
        rx.await.map_err(|_| Error::SessionClosed(self.key.clone()))
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Make `sink` the session's sink and start playing if idle.
    pub async fn resume(&self, sink: Arc<dyn TickSink>) -> Result<Snapshot> {
        self.request(|reply| Command::Resume { sink, reply }).await
    }

    pub async fn pause(&self) -> Result<Snapshot> {
        self.request(|reply| Command::Pause { reply }).await
    }

    /// Returns the rate actually applied.
    pub async fn set_rate(&self, rate: f64) -> Result<f64> {
        self.request(|reply| Command::SetRate { rate, reply }).await
    }

    pub async fn seek_seconds(&self, seconds: f64) -> Result<Snapshot> {
        self.request(|reply| Command::SeekSeconds { seconds, reply })
            .await
    }

    pub async fn seek_points(&self, count: i64) -> Result<Snapshot> {
        self.request(|reply| Command::SeekPoints { count, reply }).await
    }
}

struct SessionActor {
    state: SessionState,
    /// When the pending advance fires. `None` while idle.
    deadline: Option<Instant>,
    sink: Option<Arc<dyn TickSink>>,
    rx: mpsc::Receiver<Command>,
    idle_timeout: Option<Duration>,
}

impl SessionActor {
    async fn run(mut self) {
        let key = self.state.key().clone();
        loop {
            let deadline = self.deadline;
            let idle = self.idle_timeout.filter(|_| !self.state.is_playing());

            tokio::select! {
                biased;

                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.fire();
                }
                _ = sleep(idle.unwrap_or_default()), if idle.is_some() => {
                    info!("{}: idle for {:?}, evicting session", key, idle.unwrap_or_default());
                    break;
                }
            }
        }
        debug!("{}: session task exited", key);
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Snapshot { reply } => {
                let _ = reply.send(self.state.snapshot());
            }
            Command::Resume { sink, reply } => {
                self.sink = Some(sink);
                self.resume();
                let _ = reply.send(self.state.snapshot());
            }
            Command::Pause { reply } => {
                self.pause();
                let _ = reply.send(self.state.snapshot());
            }
            Command::SetRate { rate, reply } => {
                let applied = self.state.set_rate(rate);
                info!("{}: rate set to {}", self.state.key(), applied);
                self.rearm();
                let _ = reply.send(applied);
            }
            Command::SeekSeconds { seconds, reply } => {
                self.state.seek_seconds(seconds);
                self.rearm();
                let _ = reply.send(self.state.snapshot());
            }
            Command::SeekPoints { count, reply } => {
                self.state.seek_points(count);
                self.rearm();
                let _ = reply.send(self.state.snapshot());
            }
        }
    }

    fn resume(&mut self) {
        if self.state.start() {
            info!(
                "{}: playing from {}/{} at {}x",
                self.state.key(),
                self.state.cursor(),
                self.state.total(),
                self.state.rate()
            );
            self.schedule();
        }
    }

    fn pause(&mut self) {
        self.deadline = None;
        if self.state.is_playing() {
            info!("{}: paused at {}", self.state.key(), self.state.cursor());
        }
        self.state.stop();
    }

    /// Replace the pending advance with one timed from the current cursor and
    /// rate. Used after a rate change or a seek while running.
    fn rearm(&mut self) {
        if self.state.is_playing() {
            self.schedule();
        }
    }

    fn schedule(&mut self) {
        self.deadline = Some(Instant::now() + self.state.next_delay());
    }

    fn fire(&mut self) {
        self.deadline = None;
        let Some(tick) = self.state.advance() else {
            return;
        };
        debug!("{}: tick {} (id {})", tick.key, tick.index, tick.sample.id);

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.deliver(tick) {
                debug!("{}: {}", self.state.key(), e);
            }
        }

        if self.state.is_playing() {
            self.schedule();
        } else {
            info!("{}: reached end of recording", self.state.key());
        }
    }
}
