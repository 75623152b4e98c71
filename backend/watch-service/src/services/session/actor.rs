//! Session actor
//!
//! One task owns `SessionState`. Commands from the handle, resolution
//! reports from the store task and the three recurring ticks (caption, mood,
//! peer chat) are all consumed by a single `select!` loop, so no two
//! mutations ever interleave. Every store call runs in a spawned task; the
//! loop itself never awaits the network.
//!
//! Timers live in `Option<SessionTimers>`: they exist exactly while the
//! session is active and live, and every exit path drops them.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::chat::persist_chat_message;
use super::commands::{ResolutionReport, SessionCommand};
use super::peers::{PeerFeed, SimulatedPeers};
use super::registration::{persist_viewer, GateDecision, RegistrationRejection, ViewerIdentity};
use super::resolver::{ChannelResolver, ResolutionOutcome, UNEXPECTED_RESOLUTION_ERROR};
use super::state::{SessionPhase, SessionSnapshot, SessionState};
use super::telemetry::{SimulatedTelemetry, TelemetrySource};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::store::SharedStore;

const COMMAND_BUFFER: usize = 64;
const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Collaborators injected into a session
pub struct SessionDeps {
    pub store: SharedStore,
    pub telemetry: Box<dyn TelemetrySource>,
    pub peers: Box<dyn PeerFeed>,
    pub request_timeout: Duration,
}

impl SessionDeps {
    /// Store-backed session with the simulated caption, mood and peer feeds
    pub fn simulated(store: SharedStore, config: &Config) -> Result<Self> {
        Ok(Self {
            store,
            telemetry: Box::new(SimulatedTelemetry::new(
                config.caption_interval(),
                config.mood_interval(),
            )?),
            peers: Box::new(SimulatedPeers::new(
                config.peer_chat_interval(),
                config.peer_admission_probability,
            )?),
            request_timeout: config.request_timeout(),
        })
    }
}

struct SessionTimers {
    caption: Interval,
    mood: Interval,
    peers: Interval,
}

impl SessionTimers {
    fn start(caption: Duration, mood: Duration, peers: Duration) -> Self {
        Self {
            caption: periodic(caption),
            mood: periodic(mood),
            peers: periodic(peers),
        }
    }
}

/// First tick one full period from now
fn periodic(period: Duration) -> Interval {
    // interval_at panics on a zero period
    let period = period.max(MIN_TICK_PERIOD);
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

enum Tick {
    Caption,
    Mood,
    Peers,
}

async fn next_tick(timers: &mut Option<SessionTimers>) -> Tick {
    match timers {
        Some(timers) => tokio::select! {
            _ = timers.caption.tick() => Tick::Caption,
            _ = timers.mood.tick() => Tick::Mood,
            _ = timers.peers.tick() => Tick::Peers,
        },
        None => std::future::pending().await,
    }
}

pub struct SessionActor {
    state: SessionState,
    store: SharedStore,
    resolver: ChannelResolver,
    telemetry: Box<dyn TelemetrySource>,
    peers: Box<dyn PeerFeed>,
    request_timeout: Duration,
    timers: Option<SessionTimers>,
    resolution: Option<JoinHandle<()>>,
    commands: mpsc::Receiver<SessionCommand>,
    reports_tx: mpsc::UnboundedSender<ResolutionReport>,
    reports_rx: mpsc::UnboundedReceiver<ResolutionReport>,
    shutdown: watch::Receiver<bool>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionActor {
    /// Start a session for `identifier` and return the handle that drives it
    pub fn spawn(identifier: Option<String>, deps: SessionDeps) -> SessionHandle {
        let SessionDeps {
            store,
            mut telemetry,
            mut peers,
            request_timeout,
        } = deps;

        telemetry.reset();
        peers.reset();
        let mut state = SessionState::new(telemetry.current_caption(), telemetry.current_mood());
        state.begin(identifier, telemetry.current_caption(), telemetry.current_mood());

        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown) = watch::channel(false);
        let (snapshots, snapshot_rx) = watch::channel(state.snapshot());

        let mut actor = Self {
            state,
            resolver: ChannelResolver::new(store.clone(), request_timeout),
            store,
            telemetry,
            peers,
            request_timeout,
            timers: None,
            resolution: None,
            commands,
            reports_tx,
            reports_rx,
            shutdown,
            snapshots,
        };

        info!(identifier = ?actor.state.identifier(), "viewer session started");
        actor.start_resolution();
        let join = tokio::spawn(actor.run());

        SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.changed() => {
                    debug!("session shutdown requested");
                    break;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("all session handles dropped");
                        break;
                    }
                },
                Some(report) = self.reports_rx.recv() => self.handle_report(report),
                tick = next_tick(&mut self.timers) => self.handle_tick(tick),
            }

            self.sync_timers();
            self.publish();
        }

        self.close();
    }

    // =========================================================================
    // Commands
    // =========================================================================

    fn handle_command(&mut self, command: SessionCommand) {
        debug!(command = command.name(), "session command");
        match command {
            SessionCommand::Navigate { identifier } => self.navigate(identifier),
            SessionCommand::Refresh => {
                self.state.begin_refresh();
                self.start_resolution();
            }
            SessionCommand::Register {
                first_name,
                last_name,
                email,
                responder,
            } => {
                let result = self.register(&first_name, &last_name, &email);
                let _ = responder.send(result);
            }
            SessionCommand::SendMessage { text } => self.send_message(&text),
        }
    }

    fn navigate(&mut self, identifier: Option<String>) {
        // Leaving the current session: no timer or resolution may outlive it
        self.timers = None;
        self.telemetry.reset();
        self.peers.reset();
        let generation = self.state.begin(
            identifier,
            self.telemetry.current_caption(),
            self.telemetry.current_mood(),
        );
        info!(identifier = ?self.state.identifier(), generation, "viewer session replaced");
        self.start_resolution();
    }

    fn register(
        &mut self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> std::result::Result<ViewerIdentity, RegistrationRejection> {
        let decision = self.state.register(first_name, last_name, email)?;

        if let GateDecision::Opened(identity) = &decision {
            info!(email = %identity.email, "registration accepted");
            let live = self.state.channel().map(|c| c.is_live).unwrap_or(false);
            match self.state.active_stream_id() {
                Some(stream_id) if live => {
                    tokio::spawn(persist_viewer(
                        self.store.clone(),
                        stream_id,
                        identity.clone(),
                        self.request_timeout,
                    ));
                }
                _ => debug!("no active stream, viewer registration kept local"),
            }
        }

        Ok(decision.identity().clone())
    }

    fn send_message(&mut self, text: &str) {
        let Some(channel_id) = self.state.channel().map(|c| c.id) else {
            debug!("chat send ignored, no channel resolved");
            return;
        };

        match self.state.compose(text) {
            Some(message) => {
                let text = message.text.clone();
                tokio::spawn(persist_chat_message(
                    self.store.clone(),
                    channel_id,
                    text,
                    self.request_timeout,
                ));
            }
            None => debug!("chat send ignored, blank text or chat disabled"),
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    fn start_resolution(&mut self) {
        if let Some(task) = self.resolution.take() {
            task.abort();
        }

        let resolver = self.resolver.clone();
        let reports = self.reports_tx.clone();
        let generation = self.state.generation();
        let identifier = self.state.identifier().map(str::to_string);

        self.resolution = Some(tokio::spawn(async move {
            let outcome = AssertUnwindSafe(resolver.resolve(identifier.as_deref()))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(generation, "channel resolution panicked");
                    ResolutionOutcome::Error(UNEXPECTED_RESOLUTION_ERROR.to_string())
                });

            let _ = reports.send(ResolutionReport {
                generation,
                identifier,
                outcome,
            });
        }));
    }

    fn handle_report(&mut self, report: ResolutionReport) {
        if !self.state.accepts(report.generation, &report.identifier) {
            debug!(
                generation = report.generation,
                current = self.state.generation(),
                "discarding stale resolution"
            );
            return;
        }

        self.resolution = None;
        if !self.state.apply_resolution(report.outcome) {
            warn!(
                identifier = ?self.state.identifier(),
                "refresh failed, keeping last known channel state"
            );
        }
    }

    // =========================================================================
    // Ticks
    // =========================================================================

    fn handle_tick(&mut self, tick: Tick) {
        match tick {
            Tick::Caption => {
                self.telemetry.advance_caption();
                self.state.set_caption(self.telemetry.current_caption());
            }
            Tick::Mood => {
                self.telemetry.advance_mood();
                self.state.set_mood(self.telemetry.current_mood());
            }
            Tick::Peers => {
                if let Some(message) = self.peers.poll() {
                    self.state.inject_peer(message);
                }
            }
        }
    }

    fn sync_timers(&mut self) {
        let live = self.state.is_active_live();
        match (&self.timers, live) {
            (None, true) => {
                debug!("starting telemetry and peer timers");
                self.timers = Some(SessionTimers::start(
                    self.telemetry.caption_interval(),
                    self.telemetry.mood_interval(),
                    self.peers.interval(),
                ));
            }
            (Some(_), false) => {
                debug!("stopping telemetry and peer timers");
                self.timers = None;
            }
            _ => {}
        }
    }

    fn publish(&mut self) {
        let snapshot = self.state.snapshot();
        let current = snapshot.phase.clone();
        let previous = self.snapshots.send_replace(snapshot);
        if previous.phase != current {
            info!(
                identifier = ?self.state.identifier(),
                from = ?previous.phase,
                to = ?current,
                "session phase changed"
            );
        }
    }

    fn close(&mut self) {
        if let Some(task) = self.resolution.take() {
            task.abort();
        }
        self.timers = None;
        self.state.close();
        self.snapshots.send_replace(self.state.snapshot());
        info!(identifier = ?self.state.identifier(), "viewer session closed");
    }
}

/// Caller side of a session. Dropping it ends the session.
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
    shutdown: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
}

impl SessionHandle {
    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| AppError::SessionClosed)
    }

    /// Tear down the current session and start one for `identifier`
    pub async fn navigate(&self, identifier: Option<&str>) -> Result<()> {
        self.send(SessionCommand::Navigate {
            identifier: identifier.map(str::to_string),
        })
        .await
    }

    /// Re-fetch channel status and viewer count for the current identifier
    pub async fn refresh(&self) -> Result<()> {
        self.send(SessionCommand::Refresh).await
    }

    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<ViewerIdentity> {
        let (responder, response) = oneshot::channel();
        self.send(SessionCommand::Register {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            responder,
        })
        .await?;

        let result = response.await.map_err(|_| AppError::SessionClosed)?;
        Ok(result?)
    }

    /// Fire-and-forget; blank text and sends while chat is disabled are ignored
    pub async fn send_message(&self, text: &str) -> Result<()> {
        self.send(SessionCommand::SendMessage {
            text: text.to_string(),
        })
        .await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.snapshots.borrow().phase.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<SessionSnapshot>
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map_err(|_| AppError::SessionClosed)?;
        Ok(snapshot.clone())
    }

    /// Stop every timer, cancel in-flight resolution and wait for the actor
    pub async fn teardown(mut self) -> Result<SessionSnapshot> {
        let _ = self.shutdown.send(true);
        if let Some(join) = self.join.take() {
            join.await
                .map_err(|e| AppError::Internal(format!("session task failed: {}", e)))?;
        }
        let last = self.snapshots.borrow().clone();
        Ok(last)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
