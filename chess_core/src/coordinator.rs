//! Runs computer searches on a dedicated worker thread and decides when, and
//! whether, their results reach the game.
//!
//! Every request carries a token. Cancelling bumps the token, so a result
//! that arrives late is recognised as stale and dropped. A result that is
//! still current waits until the minimum thinking time has passed, then is
//! re-checked against the game before it is applied.

use crate::engine::{EngineMove, SearchStats, Searcher};
use crate::logic::game::{GameSession, MoveOutcome};
use crate::logic::position::Position;
use crate::logic::rules::MoveError;
use crate::settings::AppSettings;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

enum Input {
    ComputeMove {
        token: u64,
        position: Position,
        depth: u8,
    },
}

enum Output {
    MoveFound {
        token: u64,
        mv: EngineMove,
        stats: SearchStats,
    },
    NoMove {
        token: u64,
    },
    Failed {
        token: u64,
        reason: String,
    },
}

impl Output {
    const fn token(&self) -> u64 {
        match self {
            Self::MoveFound { token, .. } | Self::NoMove { token } | Self::Failed { token, .. } => {
                *token
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("failed to start the search worker")]
    Spawn(#[source] std::io::Error),
    #[error("a computer move is already being computed")]
    Busy,
    #[error("it is not the computer's turn")]
    NotComputersTurn,
    #[error("the game is already over")]
    GameOver,
    #[error("the search worker has stopped")]
    WorkerGone,
}

/// Conditions owned by the caller that block a computer move from landing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnGate {
    pub paused: bool,
    pub time_expired: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    /// The computer's move was played.
    Applied {
        outcome: MoveOutcome,
        stats: SearchStats,
    },
    /// The search found nothing to play.
    NoMove,
    /// The search panicked; the game is untouched.
    SearchFailed(String),
    /// The move was ready but the game no longer wanted it.
    Aborted,
    /// The session refused the move.
    Rejected(MoveError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Computing {
        token: u64,
        started: Instant,
    },
    DelayPending {
        token: u64,
        mv: EngineMove,
        stats: SearchStats,
        apply_at: Instant,
    },
}

pub struct MoveCoordinator {
    requests: Sender<Input>,
    results: Receiver<Output>,
    token: u64,
    phase: Phase,
    depth: u8,
    min_thinking: Duration,
}

impl MoveCoordinator {
    /// Starts the search worker. It lives until the coordinator is dropped
    /// and the search it is running, if any, has finished.
    pub fn new<S>(searcher: S, settings: &AppSettings) -> Result<Self, CoordinatorError>
    where
        S: Searcher + Send + 'static,
    {
        let (requests, inbox) = mpsc::channel();
        let (outbox, results) = mpsc::channel();
        thread::Builder::new()
            .name("search-worker".to_string())
            .spawn(move || run_worker(searcher, &inbox, &outbox))
            .map_err(CoordinatorError::Spawn)?;

        Ok(Self {
            requests,
            results,
            token: 0,
            phase: Phase::Idle,
            depth: settings.difficulty.search_depth(),
            min_thinking: settings.min_thinking_time(),
        })
    }

    /// Picks up difficulty and thinking-time changes for the next request.
    pub fn configure(&mut self, settings: &AppSettings) {
        self.depth = settings.difficulty.search_depth();
        self.min_thinking = settings.min_thinking_time();
    }

    /// Dispatches a search for the computer's reply and returns its token.
    pub fn request(&mut self, session: &GameSession, now: Instant) -> Result<u64, CoordinatorError> {
        if self.phase != Phase::Idle {
            return Err(CoordinatorError::Busy);
        }
        if session.is_over() {
            return Err(CoordinatorError::GameOver);
        }
        if !session.is_computers_turn() {
            return Err(CoordinatorError::NotComputersTurn);
        }

        self.token += 1;
        let token = self.token;
        self.requests
            .send(Input::ComputeMove {
                token,
                position: session.copy_of_position(),
                depth: self.depth,
            })
            .map_err(|_| CoordinatorError::WorkerGone)?;

        log::debug!("coordinator: request {token} at depth {}", self.depth);
        self.phase = Phase::Computing {
            token,
            started: now,
        };
        Ok(token)
    }

    /// Invalidates whatever is outstanding. A running search is left to
    /// finish; its result will be ignored.
    pub fn cancel(&mut self) {
        self.token += 1;
        if self.phase != Phase::Idle {
            log::debug!("coordinator: cancelled, token now {}", self.token);
        }
        self.phase = Phase::Idle;
    }

    /// Advances the state machine. Call regularly from the thread that owns
    /// the session.
    pub fn poll(
        &mut self,
        session: &mut GameSession,
        gate: TurnGate,
        now: Instant,
    ) -> Option<CoordinatorEvent> {
        loop {
            match self.results.try_recv() {
                Ok(output) => {
                    if let Some(event) = self.accept(output, now) {
                        return Some(event);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if matches!(self.phase, Phase::Computing { .. }) {
                        self.phase = Phase::Idle;
                        return Some(CoordinatorEvent::SearchFailed(
                            CoordinatorError::WorkerGone.to_string(),
                        ));
                    }
                    break;
                }
            }
        }

        let Phase::DelayPending {
            token,
            mv,
            stats,
            apply_at,
        } = self.phase
        else {
            return None;
        };
        if now < apply_at {
            return None;
        }
        self.phase = Phase::Idle;

        if token != self.token
            || gate.paused
            || gate.time_expired
            || session.is_over()
            || !session.is_computers_turn()
        {
            log::info!("coordinator: dropped {mv}, the game moved on");
            return Some(CoordinatorEvent::Aborted);
        }

        match session.apply_computer_move(&mv) {
            Ok(outcome) => Some(CoordinatorEvent::Applied { outcome, stats }),
            Err(err) => {
                log::warn!("coordinator: {mv} was refused: {err}");
                Some(CoordinatorEvent::Rejected(err))
            }
        }
    }

    fn accept(&mut self, output: Output, now: Instant) -> Option<CoordinatorEvent> {
        let started = match self.phase {
            Phase::Computing { token, started } if token == output.token() => started,
            _ => {
                log::debug!("coordinator: discarded stale result {}", output.token());
                return None;
            }
        };

        match output {
            Output::MoveFound { token, mv, stats } => {
                let elapsed = now.saturating_duration_since(started);
                let remaining = self.min_thinking.saturating_sub(elapsed);
                self.phase = Phase::DelayPending {
                    token,
                    mv,
                    stats,
                    apply_at: now + remaining,
                };
                None
            }
            Output::NoMove { .. } => {
                self.phase = Phase::Idle;
                Some(CoordinatorEvent::NoMove)
            }
            Output::Failed { reason, .. } => {
                self.phase = Phase::Idle;
                log::warn!("coordinator: search failed: {reason}");
                Some(CoordinatorEvent::SearchFailed(reason))
            }
        }
    }

    /// True from `request` until the move lands, is dropped or is cancelled.
    #[must_use]
    pub fn is_thinking(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// The computed move waiting out the minimum thinking time, if any.
    #[must_use]
    pub const fn pending_move(&self) -> Option<EngineMove> {
        match self.phase {
            Phase::DelayPending { mv, .. } => Some(mv),
            _ => None,
        }
    }

    #[must_use]
    pub const fn current_token(&self) -> u64 {
        self.token
    }
}

fn run_worker<S: Searcher>(mut searcher: S, inbox: &Receiver<Input>, outbox: &Sender<Output>) {
    for input in inbox {
        let Input::ComputeMove {
            token,
            mut position,
            depth,
        } = input;

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            searcher.search(&mut position, depth)
        }));
        let output = match result {
            Ok(Some((mv, stats))) => Output::MoveFound { token, mv, stats },
            Ok(None) => Output::NoMove { token },
            Err(payload) => Output::Failed {
                token,
                reason: panic_message(payload.as_ref()),
            },
        };
        if outbox.send(output).is_err() {
            break;
        }
    }
    log::debug!("search worker stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "search panicked".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::EngineConfig;
    use crate::engine::search::AlphaBetaEngine;
    use crate::logic::game::MoveSource;
    use crate::logic::position::to_legal_move;
    use crate::settings::{Difficulty, GameMode};
    use shakmaty::Square;
    use std::sync::Arc;

    /// Plays the first legal move, optionally waiting for a go signal.
    struct FirstMove {
        gate: Option<Receiver<()>>,
    }

    impl Searcher for FirstMove {
        fn search(&mut self, position: &mut Position, depth: u8) -> Option<(EngineMove, SearchStats)> {
            if let Some(gate) = &self.gate {
                gate.recv().ok()?;
            }
            let mv = position.legal_moves().iter().find_map(to_legal_move)?;
            let stats = SearchStats {
                depth,
                ..SearchStats::default()
            };
            Some((EngineMove::from(&mv), stats))
        }
    }

    struct NeverFinds;

    impl Searcher for NeverFinds {
        fn search(&mut self, _: &mut Position, _: u8) -> Option<(EngineMove, SearchStats)> {
            None
        }
    }

    struct PanicsOnce {
        panicked: bool,
    }

    impl Searcher for PanicsOnce {
        fn search(&mut self, position: &mut Position, depth: u8) -> Option<(EngineMove, SearchStats)> {
            if !self.panicked {
                self.panicked = true;
                panic!("evaluation blew up");
            }
            FirstMove { gate: None }.search(position, depth)
        }
    }

    fn settings(min_thinking_ms: u64) -> AppSettings {
        AppSettings {
            difficulty: Difficulty::Easy,
            min_thinking_ms,
            ..AppSettings::default()
        }
    }

    fn after_white_opening() -> GameSession {
        let mut session = GameSession::new(GameMode::SinglePlayer);
        session.apply_move(Square::E2, Square::E4).unwrap();
        session
    }

    fn poll_until_event(
        coordinator: &mut MoveCoordinator,
        session: &mut GameSession,
        gate: TurnGate,
    ) -> Option<CoordinatorEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(event) = coordinator.poll(session, gate, Instant::now()) {
                return Some(event);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn computer_move_is_applied() {
        let mut coordinator = MoveCoordinator::new(FirstMove { gate: None }, &settings(0)).unwrap();
        let mut session = after_white_opening();

        let token = coordinator.request(&session, Instant::now()).unwrap();
        assert_eq!(token, coordinator.current_token());
        assert!(coordinator.is_thinking());

        let event = poll_until_event(&mut coordinator, &mut session, TurnGate::default());
        let Some(CoordinatorEvent::Applied { outcome, stats }) = event else {
            panic!("expected a move, got {event:?}");
        };
        assert_eq!(outcome.source, MoveSource::Computer);
        assert_eq!(stats.depth, 1);
        assert_eq!(session.move_history().len(), 2);
        assert!(!coordinator.is_thinking());
    }

    #[test]
    fn request_needs_the_computers_turn() {
        let mut coordinator = MoveCoordinator::new(FirstMove { gate: None }, &settings(0)).unwrap();
        let session = GameSession::new(GameMode::SinglePlayer);
        assert!(matches!(
            coordinator.request(&session, Instant::now()),
            Err(CoordinatorError::NotComputersTurn)
        ));

        let mut two_player = after_white_opening();
        two_player.set_game_mode(GameMode::TwoPlayer);
        assert!(matches!(
            coordinator.request(&two_player, Instant::now()),
            Err(CoordinatorError::NotComputersTurn)
        ));
        assert!(!coordinator.is_thinking());
    }

    #[test]
    fn only_one_request_at_a_time() {
        let (_go, gate) = mpsc::channel();
        let searcher = FirstMove { gate: Some(gate) };
        let mut coordinator = MoveCoordinator::new(searcher, &settings(0)).unwrap();
        let session = after_white_opening();

        coordinator.request(&session, Instant::now()).unwrap();
        assert!(matches!(
            coordinator.request(&session, Instant::now()),
            Err(CoordinatorError::Busy)
        ));
    }

    #[test]
    fn cancelled_result_never_lands() {
        let (go, gate) = mpsc::channel();
        let searcher = FirstMove { gate: Some(gate) };
        let mut coordinator = MoveCoordinator::new(searcher, &settings(0)).unwrap();
        let mut session = after_white_opening();
        let fen = session.current_fen();

        let first = coordinator.request(&session, Instant::now()).unwrap();
        coordinator.cancel();
        assert!(coordinator.current_token() > first);
        assert!(!coordinator.is_thinking());

        go.send(()).unwrap();
        let deadline = Instant::now() + Duration::from_millis(300);
        while Instant::now() < deadline {
            assert_eq!(
                coordinator.poll(&mut session, TurnGate::default(), Instant::now()),
                None
            );
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(session.current_fen(), fen);
        assert_eq!(session.move_history().len(), 1);

        // The next request gets a fresh token and still works.
        let second = coordinator.request(&session, Instant::now()).unwrap();
        assert!(second > first);
        go.send(()).unwrap();
        let event = poll_until_event(&mut coordinator, &mut session, TurnGate::default());
        assert!(matches!(event, Some(CoordinatorEvent::Applied { .. })));
    }

    #[test]
    fn minimum_thinking_time_is_enforced() {
        let mut coordinator =
            MoveCoordinator::new(FirstMove { gate: None }, &settings(200)).unwrap();
        let mut session = after_white_opening();
        let start = Instant::now();
        coordinator.request(&session, start).unwrap();

        // Polling at the request instant: the result arrives but must wait.
        let deadline = Instant::now() + Duration::from_secs(5);
        while coordinator.pending_move().is_none() && Instant::now() < deadline {
            assert_eq!(coordinator.poll(&mut session, TurnGate::default(), start), None);
            thread::sleep(Duration::from_millis(5));
        }
        assert!(coordinator.pending_move().is_some());

        let early = start + Duration::from_millis(150);
        assert_eq!(coordinator.poll(&mut session, TurnGate::default(), early), None);
        assert_eq!(session.move_history().len(), 1);

        let late = start + Duration::from_millis(200);
        let event = coordinator.poll(&mut session, TurnGate::default(), late);
        assert!(matches!(event, Some(CoordinatorEvent::Applied { .. })));
    }

    #[test]
    fn pause_aborts_the_pending_move() {
        let mut coordinator = MoveCoordinator::new(FirstMove { gate: None }, &settings(0)).unwrap();
        let mut session = after_white_opening();
        let fen = session.current_fen();
        coordinator.request(&session, Instant::now()).unwrap();

        let paused = TurnGate {
            paused: true,
            time_expired: false,
        };
        let event = poll_until_event(&mut coordinator, &mut session, paused);
        assert_eq!(event, Some(CoordinatorEvent::Aborted));
        assert_eq!(session.current_fen(), fen);
        assert!(!coordinator.is_thinking());
    }

    #[test]
    fn expired_clock_aborts_the_pending_move() {
        let mut coordinator = MoveCoordinator::new(FirstMove { gate: None }, &settings(0)).unwrap();
        let mut session = after_white_opening();
        coordinator.request(&session, Instant::now()).unwrap();

        let expired = TurnGate {
            paused: false,
            time_expired: true,
        };
        let event = poll_until_event(&mut coordinator, &mut session, expired);
        assert_eq!(event, Some(CoordinatorEvent::Aborted));
        assert_eq!(session.move_history().len(), 1);
    }

    #[test]
    fn empty_search_reports_no_move() {
        let mut coordinator = MoveCoordinator::new(NeverFinds, &settings(0)).unwrap();
        let mut session = after_white_opening();
        coordinator.request(&session, Instant::now()).unwrap();

        let event = poll_until_event(&mut coordinator, &mut session, TurnGate::default());
        assert_eq!(event, Some(CoordinatorEvent::NoMove));
        assert!(!coordinator.is_thinking());
    }

    #[test]
    fn panicking_search_is_contained() {
        let searcher = PanicsOnce { panicked: false };
        let mut coordinator = MoveCoordinator::new(searcher, &settings(0)).unwrap();
        let mut session = after_white_opening();
        coordinator.request(&session, Instant::now()).unwrap();

        let event = poll_until_event(&mut coordinator, &mut session, TurnGate::default());
        assert_eq!(
            event,
            Some(CoordinatorEvent::SearchFailed("evaluation blew up".to_string()))
        );
        assert_eq!(session.move_history().len(), 1);

        // The worker survives the panic.
        coordinator.request(&session, Instant::now()).unwrap();
        let event = poll_until_event(&mut coordinator, &mut session, TurnGate::default());
        assert!(matches!(event, Some(CoordinatorEvent::Applied { .. })));
    }

    #[test]
    fn real_engine_replies() {
        let engine = AlphaBetaEngine::with_seed(Arc::new(EngineConfig::default()), 3);
        let mut app_settings = settings(0);
        app_settings.difficulty = Difficulty::Medium;
        let mut coordinator = MoveCoordinator::new(engine, &app_settings).unwrap();
        let mut session = after_white_opening();
        coordinator.request(&session, Instant::now()).unwrap();

        let event = poll_until_event(&mut coordinator, &mut session, TurnGate::default());
        let Some(CoordinatorEvent::Applied { stats, .. }) = event else {
            panic!("expected a move, got {event:?}");
        };
        assert_eq!(stats.depth, 2);
        assert!(stats.nodes > 0);
        assert!(!session.is_computers_turn());
    }
}
