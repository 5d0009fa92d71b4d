//! Alpha-beta minimax over a [`Game`], with a depth-limited searcher and an
//! iterative-deepening, deadline-bound searcher on the same recursion.

use super::eval::Heuristic;
use crate::board::Color;
use crate::game::Game;
use crate::moves::types::Ply;
use rand::Rng;
use rand::seq::SliceRandom;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DRAW_VALUE: i32 = 0;
pub const WIN_VALUE: i32 = 1_000_000;
pub const LOSS_VALUE: i32 = -1_000_000;

/// Bounds applied to a [`TimeLimitedSearcher`]'s budget.
pub const MIN_TIME_LIMIT: Duration = Duration::from_millis(100);
pub const MAX_TIME_LIMIT: Duration = Duration::from_secs(10);

const MAX_DEPTH: u32 = 64;
// Stop deepening when the last iteration's duration comes within this
// margin of the remaining budget.
const ITERATION_MARGIN: Duration = Duration::from_millis(100);
// Consult the clock every this many nodes (power of two minus one).
const TIME_CHECK_MASK: u64 = 63;

/// Deadline bookkeeping for a search. With no allotted duration the search
/// runs to completion; otherwise `check_time` latches the stop signal once
/// the deadline passes, and the recursion bails out cooperatively.
pub struct TimeManager {
    start: Instant,
    allotted: Option<Duration>,
    stop_signal: bool,
}

impl TimeManager {
    #[must_use]
    pub fn new(allotted: Option<Duration>) -> Self {
        TimeManager {
            start: Instant::now(),
            allotted,
            stop_signal: false,
        }
    }

    #[inline]
    pub fn check_time(&mut self) {
        if self.stop_signal {
            return;
        }
        if let Some(allotted) = self.allotted {
            if self.start.elapsed() >= allotted {
                self.stop_signal = true;
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn stopped(&self) -> bool {
        self.stop_signal
    }

    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Budget left, `None` once it ran out (or when there is no budget at
    /// all, in which case the caller has no business asking).
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.allotted?.checked_sub(self.start.elapsed())
    }
}

/// A move chooser driving a [`Game`]. Implementations are plain
/// configuration values, re-entrant across distinct games.
pub trait Searcher {
    /// The chosen ply, or `None` when the game is already decided.
    fn search(&self, game: &mut Game) -> Option<Ply>;
}

/// Minimax to a fixed depth, leaves evaluated with the heuristic.
#[derive(Clone, Copy)]
pub struct DepthLimitedSearcher {
    pub to_max: Color,
    pub heuristic: Heuristic,
    pub depth_limit: u32,
}

impl DepthLimitedSearcher {
    /// Same as [`Searcher::search`] but with a caller-provided randomness
    /// source, so tie-breaking can be made deterministic in tests.
    pub fn search_with_rng<R: Rng>(&self, game: &mut Game, rng: &mut R) -> Option<Ply> {
        let mut time = TimeManager::new(None);
        let mut nodes = 0u64;
        let (_, ply) = alpha_beta(
            game,
            self.to_max,
            self.heuristic,
            self.depth_limit,
            0,
            i32::MIN,
            i32::MAX,
            rng,
            &mut nodes,
            &mut time,
        );
        ply
    }
}

impl Searcher for DepthLimitedSearcher {
    fn search(&self, game: &mut Game) -> Option<Ply> {
        self.search_with_rng(game, &mut rand::rng())
    }
}

/// Iterative deepening under a wall-clock budget. Each depth runs the same
/// recursion as [`DepthLimitedSearcher`]; an iteration's ply is accepted
/// only if the iteration completed before the deadline fired.
#[derive(Clone, Copy)]
pub struct TimeLimitedSearcher {
    pub to_max: Color,
    pub heuristic: Heuristic,
    pub time_limit: Duration,
}

impl TimeLimitedSearcher {
    pub fn search_with_rng<R: Rng>(&self, game: &mut Game, rng: &mut R) -> Option<Ply> {
        let allotted = self.time_limit.clamp(MIN_TIME_LIMIT, MAX_TIME_LIMIT);
        let mut time = TimeManager::new(Some(allotted));
        let mut best: Option<Ply> = None;
        let mut depth = 1;

        loop {
            let iteration_start = Instant::now();
            let mut nodes = 0u64;
            let (value, ply) = alpha_beta(
                game,
                self.to_max,
                self.heuristic,
                depth,
                0,
                i32::MIN,
                i32::MAX,
                rng,
                &mut nodes,
                &mut time,
            );

            if time.stopped() {
                // The deadline fired mid-recursion; the partial result is
                // unverified and discarded.
                break;
            }
            let Some(ply) = ply else {
                // The game is already decided; nothing to choose.
                break;
            };
            let iteration_elapsed = iteration_start.elapsed();
            debug!(
                depth,
                value,
                nodes,
                elapsed_ms = iteration_elapsed.as_millis() as u64,
                "search iteration complete"
            );
            best = Some(ply);

            let Some(remaining) = time.remaining() else {
                break;
            };
            if depth >= MAX_DEPTH || iteration_elapsed + ITERATION_MARGIN >= remaining {
                break;
            }
            depth += 1;
        }

        best
    }
}

impl Searcher for TimeLimitedSearcher {
    fn search(&self, game: &mut Game) -> Option<Ply> {
        self.search_with_rng(game, &mut rand::rng())
    }
}

/// The shared recursion. Not negamax: `value` is always from `to_max`'s
/// perspective, and whether a node maximizes depends on the side to move.
#[allow(clippy::too_many_arguments)]
fn alpha_beta<R: Rng>(
    game: &mut Game,
    to_max: Color,
    heuristic: Heuristic,
    depth_left: u32,
    ply_from_root: u32,
    mut alpha: i32,
    mut beta: i32,
    rng: &mut R,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> (i32, Option<Ply>) {
    *nodes += 1;
    if *nodes & TIME_CHECK_MASK == 0 {
        time.check_time();
    }

    let result = game.result();
    if result.is_over() {
        let value = match result.winner() {
            None => DRAW_VALUE,
            Some(winner) if winner == to_max => WIN_VALUE,
            Some(_) => LOSS_VALUE,
        };
        return (value, None);
    }

    if time.stopped() || depth_left == 0 {
        return (heuristic(game.board(), to_max), None);
    }

    // Shuffled so equal-valued plies are not always resolved the same way
    // and move ordering has no pathological fixed pattern.
    let mut plies = game.plies().to_vec();
    plies.shuffle(rng);

    if ply_from_root == 0 && plies.len() == 1 {
        // Only one legal reply; no point searching the tree.
        return (0, plies.pop());
    }

    let maximize = game.to_play() == to_max;
    let mut value = if maximize { i32::MIN } else { i32::MAX };
    let mut best: Option<Ply> = None;

    for ply in plies {
        let undo = game.do_ply(&ply).expect("generated ply must apply cleanly");
        let (child_value, _) = alpha_beta(
            game,
            to_max,
            heuristic,
            depth_left - 1,
            ply_from_root + 1,
            alpha,
            beta,
            rng,
            nodes,
            time,
        );
        game.undo_ply(undo);

        if maximize {
            if child_value > value {
                value = child_value;
                best = Some(ply);
            }
            alpha = alpha.max(child_value);
            if child_value >= beta {
                return (value, best);
            }
        } else {
            if child_value < value {
                value = child_value;
                best = Some(ply);
            }
            beta = beta.min(child_value);
            if child_value <= alpha {
                return (value, best);
            }
        }
    }

    (value, best)
}
