use std::{
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{MatchResultEntity, MatchResultKind},
    dto::{format_system_time, validation::validate_player_name},
    state::{
        game::{Match, Outcome, Seat},
        state_machine::winning_line,
    },
};

/// Full match payload exchanged with clients on every read path.
///
/// Field names follow the camelCase layout the browser client already speaks.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchDto {
    /// Match identifier.
    pub id: String,
    /// Game category the match belongs to.
    pub game_type: String,
    /// Player sitting in seat `X`.
    pub player_x: String,
    /// `null` while the second seat is open.
    pub player_o: Option<String>,
    /// Nine cells, row-major; `null` for an empty cell.
    pub board: Vec<Option<Seat>>,
    /// Seat expected to move next.
    pub current_turn: Seat,
    /// Display name of the winner.
    pub winner: Option<String>,
    /// Whether the board filled up without a line.
    pub is_draw: bool,
    /// Cells of the completed line when the match is won.
    pub winning_line: Option<Vec<usize>>,
    /// Seat asking for a fresh match, if any.
    pub new_game_requested_by: Option<Seat>,
    /// RFC 3339 timestamp of the last accepted write.
    pub updated_at: String,
    /// Same instant as `updated_at`, in milliseconds since the Unix epoch.
    pub updated_at_ms: u64,
}

impl From<&Match> for MatchDto {
    fn from(game: &Match) -> Self {
        Self {
            id: game.id.clone(),
            game_type: game.category.clone(),
            player_x: game.seat_a.clone(),
            player_o: game.seat_b.clone(),
            board: game.board.to_vec(),
            current_turn: game.turn,
            winner: game.winner_name().map(str::to_owned),
            is_draw: matches!(game.outcome, Outcome::Drawn),
            winning_line: winning_line(&game.board).map(|(_, line)| line.to_vec()),
            new_game_requested_by: game.rematch_requested_by,
            updated_at: format_system_time(game.updated_at),
            updated_at_ms: unix_millis(game.updated_at),
        }
    }
}

impl From<Match> for MatchDto {
    fn from(game: Match) -> Self {
        Self::from(&game)
    }
}

/// Poll response: the most recent match of a category, if any.
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentMatchResponse {
    /// `null` when the category has no stored match.
    pub game: Option<MatchDto>,
}

/// Request to place the acting player's mark on a cell.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct MoveRequest {
    /// Cell index, row-major, 0 through 8.
    #[validate(range(max = 8))]
    pub cell: u8,
}

/// Result of a move attempt. Illegal moves are not errors: they come back
/// with `applied = false` and the match untouched.
#[derive(Debug, Serialize, ToSchema)]
pub struct MoveResponse {
    /// Whether the move was stored.
    pub applied: bool,
    /// Why the move was ignored, when it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Match after the attempt.
    pub game: MatchDto,
}

/// Complete match state pushed by a client on the legacy write path.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SyncMatchRequest {
    /// Player sitting in seat `X`.
    #[validate(custom(function = "validate_player_name"))]
    pub player_x: String,
    /// Player sitting in seat `O`.
    #[validate(custom(function = "validate_player_name"))]
    pub player_o: String,
    /// Nine cells, row-major.
    #[validate(length(equal = 9))]
    pub board: Vec<Option<Seat>>,
    /// Seat expected to move next.
    pub current_turn: Seat,
    /// Whether the client considers the match drawn.
    #[serde(default)]
    pub is_draw: bool,
    /// Seat asking for a fresh match, if any.
    #[serde(default)]
    pub new_game_requested_by: Option<Seat>,
}

/// One finished match in the history ledger.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchResultDto {
    /// Ledger entry identifier.
    pub id: String,
    /// Game category the match belonged to.
    pub game_type: String,
    /// Player that sat in seat `X`.
    pub player_x: String,
    /// Player that sat in seat `O`.
    pub player_o: String,
    /// Display name of the winner, `null` on a draw.
    pub winner: Option<String>,
    /// `win` or `draw`.
    pub result: String,
    /// RFC 3339 timestamp of when the result was recorded.
    pub created_at: String,
}

impl From<MatchResultEntity> for MatchResultDto {
    fn from(entity: MatchResultEntity) -> Self {
        let result = match entity.result {
            MatchResultKind::Win => "win",
            MatchResultKind::Draw => "draw",
        };
        Self {
            id: entity.id,
            game_type: entity.category,
            player_x: entity.player_x,
            player_o: entity.player_o,
            winner: entity.winner,
            result: result.to_owned(),
            created_at: format_system_time(entity.recorded_at),
        }
    }
}

/// Aggregated record of one player over the history ledger.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatsDto {
    /// Finished matches the player took part in.
    pub total_games: u32,
    /// Matches the player won.
    pub wins: u32,
    /// Matches that ended without a winner.
    pub draws: u32,
    /// Matches the opponent won.
    pub losses: u32,
}

/// Player name → record.
pub type StatsResponse = BTreeMap<String, PlayerStatsDto>;

fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
