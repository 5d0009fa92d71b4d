//! A single-writer, multiple-observer wrapper around a [`Game`].
//!
//! Every mutation happens under one lock and carries a version number;
//! observers attach a stream and receive every state the game moves
//! through, in version order with no gaps. State hand-off uses unbounded
//! channels, so broadcasting never blocks while the lock is held.

use crate::board::{Board, Color};
use crate::game::{Game, GameResult};
use crate::moves::execute::ExecuteError;
use crate::moves::movegen::{BestRule, CaptureRule};
use crate::moves::types::Ply;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// A consistent snapshot of the wrapped game.
#[derive(Clone, Debug, Serialize)]
pub struct GameState {
    pub board: Board,
    pub to_play: Color,
    pub result: GameResult,
    pub plies: Vec<Ply>,
    pub version: u32,
}

/// Why a mutation was declined (or, for [`PlayError::Corrupt`], why it
/// failed midway and poisoned the game).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayError {
    #[error("game already over")]
    GameOver,
    #[error("stale game state version")]
    StaleVersion,
    #[error("not your turn")]
    WrongTurn,
    #[error("ply index out of bounds")]
    PlyIndexOutOfBounds,
    #[error(transparent)]
    Corrupt(#[from] ExecuteError),
}

/// An attached observer's receiving end. Iterating yields every state from
/// the version current at attach time onward, until detached or the game
/// ends (the terminal state is delivered before the stream closes).
pub struct StateStream {
    id: u64,
    receiver: Receiver<GameState>,
}

impl StateStream {
    /// Non-blocking-ish receive for callers that must not hang.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<GameState> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

impl Iterator for StateStream {
    type Item = GameState;

    fn next(&mut self) -> Option<GameState> {
        self.receiver.recv().ok()
    }
}

struct Inner {
    game: Game,
    version: u32,
    // Rebuilt only when the version moved past it.
    snapshot: Option<GameState>,
    observers: HashMap<u64, mpsc::Sender<GameState>>,
    next_observer: u64,
}

/// The serialized single-writer wrapper. Share it behind an `Arc` to drive
/// and observe one game from many tasks.
pub struct ConcurrentGame {
    inner: Mutex<Inner>,
}

impl ConcurrentGame {
    #[must_use]
    pub fn new(game: Game) -> Self {
        ConcurrentGame {
            inner: Mutex::new(Inner {
                game,
                version: 1,
                snapshot: None,
                observers: HashMap::new(),
                next_observer: 0,
            }),
        }
    }

    #[must_use]
    pub fn standard(capture_rule: CaptureRule, best_rule: BestRule) -> Self {
        ConcurrentGame::new(Game::standard(capture_rule, best_rule))
    }

    #[must_use]
    pub fn current_state(&self) -> GameState {
        self.inner.lock().snapshot().clone()
    }

    /// Attaches an observer. When the game is already over the stream is
    /// returned closed, with no elements.
    #[must_use]
    pub fn next_states(&self) -> StateStream {
        let mut inner = self.inner.lock();
        let (sender, receiver) = mpsc::channel();
        let id = inner.next_observer;
        inner.next_observer += 1;
        if !inner.snapshot().result.is_over() {
            inner.observers.insert(id, sender);
        }
        // An unregistered sender is dropped here, closing the stream.
        StateStream { id, receiver }
    }

    /// Detaches one observer, closing its stream. Detaching twice, or
    /// detaching a stream the game already closed, is a no-op.
    pub fn detach(&self, stream: &StateStream) {
        self.inner.lock().observers.remove(&stream.id);
    }

    pub fn detach_all(&self) {
        self.inner.lock().observers.clear();
    }

    /// Plays the ply at `index` in the current ply list on behalf of
    /// `player`, provided the caller's view (`expected_version`) is still
    /// current.
    pub fn do_ply_index(
        &self,
        player: Color,
        expected_version: u32,
        index: usize,
    ) -> Result<(), PlayError> {
        let mut inner = self.inner.lock();
        inner.validate(player, expected_version)?;
        let ply = inner
            .snapshot()
            .plies
            .get(index)
            .cloned()
            .ok_or(PlayError::PlyIndexOutOfBounds)?;
        inner.apply(&ply)
    }

    /// Plays a caller-supplied ply on behalf of `player` under the same
    /// version and turn validation.
    pub fn do_ply_given(
        &self,
        player: Color,
        expected_version: u32,
        ply: &Ply,
    ) -> Result<(), PlayError> {
        let mut inner = self.inner.lock();
        inner.validate(player, expected_version)?;
        inner.apply(ply)
    }
}

impl Inner {
    fn snapshot(&mut self) -> &GameState {
        let stale = self
            .snapshot
            .as_ref()
            .is_none_or(|snapshot| snapshot.version != self.version);
        if stale {
            self.snapshot = Some(GameState {
                board: *self.game.board(),
                to_play: self.game.to_play(),
                result: self.game.result(),
                plies: self.game.plies().to_vec(),
                version: self.version,
            });
        }
        self.snapshot.as_ref().expect("snapshot just rebuilt")
    }

    fn validate(&mut self, player: Color, expected_version: u32) -> Result<(), PlayError> {
        if self.snapshot().result.is_over() {
            return Err(PlayError::GameOver);
        }
        if expected_version != self.version {
            return Err(PlayError::StaleVersion);
        }
        if player != self.game.to_play() {
            return Err(PlayError::WrongTurn);
        }
        Ok(())
    }

    fn apply(&mut self, ply: &Ply) -> Result<(), PlayError> {
        self.game.do_ply(ply)?;
        self.version += 1;
        let state = self.snapshot().clone();
        trace!(
            version = state.version,
            observers = self.observers.len(),
            "broadcasting game state"
        );
        for sender in self.observers.values() {
            // A send only fails when the receiver is gone; that observer
            // is detached later or already dropped, so ignore it.
            let _ = sender.send(state.clone());
        }
        if state.result.is_over() {
            // Streams end after the terminal state.
            self.observers.clear();
        }
        Ok(())
    }
}
