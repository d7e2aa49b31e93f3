//! Match model shared by the state machine, the storage layer and the DTOs.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Number of cells on the 3×3 grid.
pub const BOARD_SIZE: usize = 9;

/// Grid contents, one entry per cell in row-major order.
pub type Board = [Option<Seat>; BOARD_SIZE];

/// One of the two fixed player slots of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Seat {
    /// Seat held by the match creator; always moves first.
    #[serde(rename = "X")]
    A,
    /// Seat bound to the second player when they join.
    #[serde(rename = "O")]
    B,
}

impl Seat {
    /// The opposing seat.
    pub fn other(self) -> Self {
        match self {
            Seat::A => Seat::B,
            Seat::B => Seat::A,
        }
    }

    /// Wire label of the seat (`X` or `O`).
    pub fn label(self) -> &'static str {
        match self {
            Seat::A => "X",
            Seat::B => "O",
        }
    }
}

/// Result of a match so far. Only moves forward: in progress → won or drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Moves are still accepted.
    InProgress,
    /// The seat completed a line.
    Won(Seat),
    /// All cells are filled without a line.
    Drawn,
}

impl Outcome {
    /// Whether the match reached a terminal state.
    pub fn is_concluded(self) -> bool {
        !matches!(self, Outcome::InProgress)
    }
}

/// One instance of the two-player grid game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Opaque identifier, unique per match instance.
    pub id: String,
    /// Game kind discriminator (e.g. `tic-tac-toe`).
    pub category: String,
    /// Display name bound to [`Seat::A`].
    pub seat_a: String,
    /// Display name bound to [`Seat::B`]; `None` while the seat is open.
    pub seat_b: Option<String>,
    /// Nine cells in row-major order.
    pub board: Board,
    /// Seat expected to play the next move.
    pub turn: Seat,
    /// Whether the match is still running, won or drawn.
    pub outcome: Outcome,
    /// Seat currently asking for a fresh match, if any.
    pub rematch_requested_by: Option<Seat>,
    /// Last time the storage layer accepted a write for this match.
    pub updated_at: SystemTime,
}

impl Match {
    /// Open a new match in `category` with `creator` sitting in seat A and seat B open.
    pub fn open(category: impl Into<String>, creator: impl Into<String>) -> Self {
        Self {
            id: new_match_id(),
            category: category.into(),
            seat_a: creator.into(),
            seat_b: None,
            board: [None; BOARD_SIZE],
            turn: Seat::A,
            outcome: Outcome::InProgress,
            rematch_requested_by: None,
            updated_at: SystemTime::now(),
        }
    }

    /// Resolve which seat a display name occupies.
    pub fn seat_of(&self, name: &str) -> Option<Seat> {
        if self.seat_a == name {
            Some(Seat::A)
        } else if self.seat_b.as_deref() == Some(name) {
            Some(Seat::B)
        } else {
            None
        }
    }

    /// Display name sitting in `seat`, if bound.
    pub fn player(&self, seat: Seat) -> Option<&str> {
        match seat {
            Seat::A => Some(self.seat_a.as_str()),
            Seat::B => self.seat_b.as_deref(),
        }
    }

    /// Name of the winning player once the match is won.
    pub fn winner_name(&self) -> Option<&str> {
        match self.outcome {
            Outcome::Won(seat) => self.player(seat),
            _ => None,
        }
    }
}

/// Generate a fresh, unique match identifier.
pub fn new_match_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_match_starts_with_empty_board_and_open_seat() {
        let game = Match::open("tic-tac-toe", "alice");
        assert_eq!(game.seat_a, "alice");
        assert!(game.seat_b.is_none());
        assert!(game.board.iter().all(Option::is_none));
        assert_eq!(game.turn, Seat::A);
        assert_eq!(game.outcome, Outcome::InProgress);
        assert!(game.rematch_requested_by.is_none());
    }

    #[test]
    fn seat_lookup_by_name() {
        let mut game = Match::open("tic-tac-toe", "alice");
        assert_eq!(game.seat_of("alice"), Some(Seat::A));
        assert_eq!(game.seat_of("bob"), None);

        game.seat_b = Some("bob".into());
        assert_eq!(game.seat_of("bob"), Some(Seat::B));
        assert_eq!(game.player(Seat::B), Some("bob"));
    }

    #[test]
    fn seats_serialize_with_legacy_labels() {
        assert_eq!(serde_json::to_string(&Seat::A).unwrap(), "\"X\"");
        assert_eq!(serde_json::to_string(&Seat::B).unwrap(), "\"O\"");
        assert_eq!(Seat::A.other(), Seat::B);
    }

    #[test]
    fn match_ids_are_unique() {
        assert_ne!(new_match_id(), new_match_id());
    }
}
