use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use super::error::MongoDaoError;
use crate::{
    dao::models::{MatchEntity, MatchResultEntity, MatchResultKind},
    state::game::{Board, Seat},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub category: String,
    pub player_x: String,
    pub player_o: Option<String>,
    pub board: Vec<Option<Seat>>,
    pub current_turn: Seat,
    pub winner: Option<String>,
    #[serde(default)]
    pub is_draw: bool,
    pub new_game_requested_by: Option<Seat>,
    pub updated_at: DateTime,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(value: MatchEntity) -> Self {
        Self {
            id: value.id,
            category: value.category,
            player_x: value.player_x,
            player_o: value.player_o,
            board: value.board.to_vec(),
            current_turn: value.current_turn,
            winner: value.winner,
            is_draw: value.is_draw,
            new_game_requested_by: value.new_game_requested_by,
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoMatchDocument> for MatchEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoMatchDocument) -> Result<Self, Self::Error> {
        let cells = value.board.len();
        let board: Board = value
            .board
            .try_into()
            .map_err(|_| MongoDaoError::CorruptBoard {
                id: value.id.clone(),
                cells,
            })?;

        Ok(Self {
            id: value.id,
            category: value.category,
            player_x: value.player_x,
            player_o: value.player_o,
            board,
            current_turn: value.current_turn,
            winner: value.winner,
            is_draw: value.is_draw,
            new_game_requested_by: value.new_game_requested_by,
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoResultDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub category: String,
    pub player_x: String,
    pub player_o: String,
    pub winner: Option<String>,
    pub result: MatchResultKind,
    pub recorded_at: DateTime,
}

impl From<MatchResultEntity> for MongoResultDocument {
    fn from(value: MatchResultEntity) -> Self {
        Self {
            id: value.id,
            category: value.category,
            player_x: value.player_x,
            player_o: value.player_o,
            winner: value.winner,
            result: value.result,
            recorded_at: DateTime::from_system_time(value.recorded_at),
        }
    }
}

impl From<MongoResultDocument> for MatchResultEntity {
    fn from(value: MongoResultDocument) -> Self {
        Self {
            id: value.id,
            category: value.category,
            player_x: value.player_x,
            player_o: value.player_o,
            winner: value.winner,
            result: value.result,
            recorded_at: value.recorded_at.to_system_time(),
        }
    }
}
