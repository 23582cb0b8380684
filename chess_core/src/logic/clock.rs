use shakmaty::Color;
use std::time::Duration;

/// Per-turn countdown. Only the side to move loses time, and each side's
/// allowance is refilled when its turn starts.
#[derive(Debug, Clone)]
pub struct TurnClock {
    per_turn: Option<Duration>,
    white: Duration,
    black: Duration,
    flagged: Option<Color>,
}

impl TurnClock {
    /// A clock with `seconds_per_turn` for each turn; zero disables it.
    #[must_use]
    pub fn new(seconds_per_turn: u32) -> Self {
        let per_turn = (seconds_per_turn > 0).then(|| Duration::from_secs(seconds_per_turn.into()));
        let full = per_turn.unwrap_or_default();
        Self {
            per_turn,
            white: full,
            black: full,
            flagged: None,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.per_turn.is_some()
    }

    pub fn reset_for_new_game(&mut self) {
        let full = self.per_turn.unwrap_or_default();
        self.white = full;
        self.black = full;
        self.flagged = None;
    }

    pub fn reset_for_turn(&mut self, side: Color) {
        let full = self.per_turn.unwrap_or_default();
        match side {
            Color::White => self.white = full,
            Color::Black => self.black = full,
        }
    }

    /// Charges `elapsed` to `side_to_move`. Returns the winner on the tick
    /// that runs the clock out; later ticks are ignored.
    pub fn tick(&mut self, side_to_move: Color, elapsed: Duration) -> Option<Color> {
        if !self.is_enabled() || self.flagged.is_some() {
            return None;
        }
        let remaining = match side_to_move {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        };
        *remaining = remaining.saturating_sub(elapsed);
        if remaining.is_zero() {
            self.flagged = Some(side_to_move);
            return Some(side_to_move.other());
        }
        None
    }

    #[must_use]
    pub const fn remaining(&self, side: Color) -> Duration {
        match side {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.flagged.is_some()
    }

    #[must_use]
    pub fn winner(&self) -> Option<Color> {
        self.flagged.map(Color::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_clock_never_expires() {
        let mut clock = TurnClock::new(0);
        assert!(!clock.is_enabled());
        assert_eq!(clock.tick(Color::White, Duration::from_secs(3600)), None);
        assert!(!clock.is_expired());
    }

    #[test]
    fn only_the_side_to_move_is_charged() {
        let mut clock = TurnClock::new(30);
        clock.tick(Color::White, Duration::from_secs(10));
        assert_eq!(clock.remaining(Color::White), Duration::from_secs(20));
        assert_eq!(clock.remaining(Color::Black), Duration::from_secs(30));

        clock.reset_for_turn(Color::White);
        assert_eq!(clock.remaining(Color::White), Duration::from_secs(30));
    }

    #[test]
    fn running_out_flags_once_and_names_the_opponent() {
        let mut clock = TurnClock::new(30);
        assert_eq!(clock.tick(Color::Black, Duration::from_secs(29)), None);
        assert_eq!(
            clock.tick(Color::Black, Duration::from_secs(5)),
            Some(Color::White)
        );
        assert!(clock.is_expired());
        assert_eq!(clock.winner(), Some(Color::White));
        assert_eq!(clock.tick(Color::Black, Duration::from_secs(5)), None);

        clock.reset_for_new_game();
        assert!(!clock.is_expired());
        assert_eq!(clock.remaining(Color::Black), Duration::from_secs(30));
    }
}
