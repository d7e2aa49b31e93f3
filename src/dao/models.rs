use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::state::{
    game::{Board, Match, Outcome, Seat},
    state_machine::evaluate,
};

/// Persisted row describing the current state of one match.
///
/// Mirrors the legacy `active_games` layout: the outcome is stored as the
/// winner's display name plus a draw flag rather than a structured enum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Primary key of the match.
    pub id: String,
    /// Game kind the match belongs to.
    pub category: String,
    /// Player sitting in seat `X`.
    pub player_x: String,
    /// Player sitting in seat `O`, absent while the seat is open.
    pub player_o: Option<String>,
    /// Nine cells in row-major order.
    pub board: Board,
    /// Seat expected to move next.
    pub current_turn: Seat,
    /// Display name of the winner, when the match is won.
    pub winner: Option<String>,
    /// Whether the match ended without a winner.
    pub is_draw: bool,
    /// Seat asking for a fresh match, if any.
    pub new_game_requested_by: Option<Seat>,
    /// Refreshed by the store on every upsert.
    pub updated_at: SystemTime,
}

impl From<Match> for MatchEntity {
    fn from(game: Match) -> Self {
        let winner = game.winner_name().map(str::to_owned);
        Self {
            id: game.id,
            category: game.category,
            player_x: game.seat_a,
            player_o: game.seat_b,
            board: game.board,
            current_turn: game.turn,
            winner,
            is_draw: matches!(game.outcome, Outcome::Drawn),
            new_game_requested_by: game.rematch_requested_by,
            updated_at: game.updated_at,
        }
    }
}

impl From<MatchEntity> for Match {
    fn from(entity: MatchEntity) -> Self {
        // The board is the source of truth; the legacy winner/draw columns only
        // matter when a writer flagged a draw the board does not show yet.
        let outcome = match evaluate(&entity.board) {
            Outcome::InProgress if entity.is_draw => Outcome::Drawn,
            outcome => outcome,
        };

        Self {
            id: entity.id,
            category: entity.category,
            seat_a: entity.player_x,
            seat_b: entity.player_o,
            board: entity.board,
            turn: entity.current_turn,
            outcome,
            rematch_requested_by: entity.new_game_requested_by,
            updated_at: entity.updated_at,
        }
    }
}

/// How a finished match ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchResultKind {
    /// One of the players completed a line.
    Win,
    /// The board filled up without a line.
    Draw,
}

/// Ledger entry written once per concluded match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchResultEntity {
    /// Derived from the match id (`<match id>-result`).
    pub id: String,
    /// Game kind the match belonged to.
    pub category: String,
    /// Player that sat in seat `X`.
    pub player_x: String,
    /// Player that sat in seat `O`.
    pub player_o: String,
    /// Display name of the winner, absent on a draw.
    pub winner: Option<String>,
    /// Final result.
    pub result: MatchResultKind,
    /// When the result was recorded.
    pub recorded_at: SystemTime,
}

impl MatchResultEntity {
    /// Build the ledger entry for a concluded match, or `None` while it is still running.
    pub fn from_concluded(game: &Match) -> Option<Self> {
        let result = match game.outcome {
            Outcome::InProgress => return None,
            Outcome::Won(_) => MatchResultKind::Win,
            Outcome::Drawn => MatchResultKind::Draw,
        };

        Some(Self {
            id: format!("{}-result", game.id),
            category: game.category.clone(),
            player_x: game.seat_a.clone(),
            player_o: game.seat_b.clone().unwrap_or_default(),
            winner: game.winner_name().map(str::to_owned),
            result,
            recorded_at: SystemTime::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::state_machine::{assign_second_seat, propose_move};

    fn won_match() -> Match {
        let game = Match::open("tic-tac-toe", "alice");
        let game = assign_second_seat(&game, "bob").unwrap();
        [0, 3, 1, 4, 2].iter().fold(game, |game, &cell| {
            propose_move(&game, game.turn, cell).unwrap()
        })
    }

    #[test]
    fn entity_records_winner_by_name() {
        let entity = MatchEntity::from(won_match());
        assert_eq!(entity.winner.as_deref(), Some("alice"));
        assert!(!entity.is_draw);

        let game = Match::from(entity);
        assert_eq!(game.outcome, Outcome::Won(Seat::A));
    }

    #[test]
    fn draw_flag_is_honoured_on_load() {
        let mut entity = MatchEntity::from(Match::open("tic-tac-toe", "alice"));
        entity.is_draw = true;
        assert_eq!(Match::from(entity).outcome, Outcome::Drawn);
    }

    #[test]
    fn results_exist_only_for_concluded_matches() {
        assert!(MatchResultEntity::from_concluded(&Match::open("tic-tac-toe", "alice")).is_none());

        let game = won_match();
        let result = MatchResultEntity::from_concluded(&game).unwrap();
        assert_eq!(result.id, format!("{}-result", game.id));
        assert_eq!(result.result, MatchResultKind::Win);
        assert_eq!(result.winner.as_deref(), Some("alice"));
        assert_eq!(result.player_o, "bob");
    }
}
