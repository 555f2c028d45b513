//! Play session bookkeeping shared by external and embedded launches

use chrono::{DateTime, Utc};
use romdock_library::{GameId, LibraryStore};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc::UnboundedSender;

const MS_PER_MINUTE: u64 = 60_000;

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Which kind of launch a session belonged to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    External,
    Embedded,
}

/// Sent when a session ends, after play time has been persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEvent {
    pub kind: SessionKind,
    pub game_id: GameId,
    pub duration_minutes: u64,
}

/// Receives session-ended notifications. Delivery is fire-and-forget.
pub trait SessionObserver: Send + Sync {
    fn session_ended(&self, event: &SessionEvent);
}

impl SessionObserver for UnboundedSender<SessionEvent> {
    fn session_ended(&self, event: &SessionEvent) {
        if self.send(event.clone()).is_err() {
            tracing::debug!(
                "No listener attached, dropping session event for game {}",
                event.game_id
            );
        }
    }
}

/// Tracks active sessions by game and accrues play time when they end.
///
/// One start time is kept per game; starting again overwrites it.
pub struct SessionTracker {
    kind: SessionKind,
    library: Arc<dyn LibraryStore>,
    clock: Arc<dyn Clock>,
    active: Mutex<HashMap<GameId, DateTime<Utc>>>,
    observers: RwLock<Vec<Arc<dyn SessionObserver>>>,
}

impl SessionTracker {
    pub fn new(kind: SessionKind, library: Arc<dyn LibraryStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            kind,
            library,
            clock,
            active: Mutex::new(HashMap::new()),
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Attach an observer for session-ended events
    pub fn subscribe(&self, observer: Arc<dyn SessionObserver>) {
        match self.observers.write() {
            Ok(mut observers) => observers.push(observer),
            Err(poisoned) => poisoned.into_inner().push(observer),
        }
    }

    /// Record a session start for `game_id`
    pub fn begin(&self, game_id: GameId) -> DateTime<Utc> {
        let started = self.clock.now();
        let previous = self.with_active(|active| active.insert(game_id, started));
        if previous.is_some() {
            tracing::warn!(
                "Game {} already had an active session; tracking the newest one",
                game_id
            );
        }
        tracing::info!("Session started for game {}", game_id);
        started
    }

    pub fn is_active(&self, game_id: GameId) -> bool {
        self.with_active(|active| active.contains_key(&game_id))
    }

    /// End the session for `game_id`, persist its minutes and notify observers.
    ///
    /// `elapsed_ms` overrides the recorded start time. Without either, the
    /// duration is zero. Never fails: persistence errors are logged.
    pub fn finish(&self, game_id: GameId, elapsed_ms: Option<u64>) -> SessionEvent {
        let now = self.clock.now();
        let started = self.with_active(|active| active.remove(&game_id));

        let elapsed_ms = elapsed_ms.unwrap_or_else(|| {
            started
                .map(|start| (now - start).num_milliseconds().max(0) as u64)
                .unwrap_or(0)
        });
        let duration_minutes = elapsed_ms / MS_PER_MINUTE;

        if let Err(e) = self.library.add_play_time(game_id, duration_minutes, now) {
            tracing::error!("Failed to record play time for game {}: {}", game_id, e);
        }

        let event = SessionEvent {
            kind: self.kind,
            game_id,
            duration_minutes,
        };
        tracing::info!(
            "Session ended for game {} after {} minute(s)",
            game_id,
            duration_minutes
        );
        self.notify(&event);
        event
    }

    fn notify(&self, event: &SessionEvent) {
        let observers = match self.observers.read() {
            Ok(observers) => observers.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if observers.is_empty() {
            tracing::debug!("No session observers attached, event dropped");
        }
        for observer in observers {
            observer.session_ended(event);
        }
    }

    fn with_active<T>(&self, f: impl FnOnce(&mut HashMap<GameId, DateTime<Utc>>) -> T) -> T {
        match self.active.lock() {
            Ok(mut active) => f(&mut active),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}
