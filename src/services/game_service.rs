use std::{collections::BTreeMap, sync::Arc, time::SystemTime};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    dao::{
        game_store::GameStore,
        models::{MatchEntity, MatchResultEntity, MatchResultKind},
    },
    dto::game::{
        CurrentMatchResponse, MatchDto, MatchResultDto, MoveResponse, PlayerStatsDto,
        StatsResponse, SyncMatchRequest,
    },
    error::ServiceError,
    state::{
        SharedState,
        game::{BOARD_SIZE, Board, Match, Outcome, Seat},
        state_machine::{self, RematchOutcome, evaluate},
    },
};

/// Largest number of ledger entries returned by the history read.
pub const HISTORY_LIMIT: usize = 100;

/// Latest match of `category`, as served to polling clients.
pub async fn current_match(
    state: &SharedState,
    category: &str,
) -> Result<CurrentMatchResponse, ServiceError> {
    ensure_category(state, category)?;
    let store = state.require_game_store().await?;
    let game = load_latest(&store, category).await?;
    Ok(CurrentMatchResponse {
        game: game.map(MatchDto::from),
    })
}

/// Seat `player` in the category's current match.
///
/// A player already seated gets their match back untouched. An open seat B is
/// bound to the caller. When there is no match, or the latest one is over and
/// the caller was not part of it, a fresh match is opened with the caller in
/// seat A.
pub async fn join_match(
    state: &SharedState,
    category: &str,
    player: &str,
) -> Result<MatchDto, ServiceError> {
    ensure_category(state, category)?;
    let store = state.require_game_store().await?;
    let gate = state.category_gate(category);
    let _guard = gate.lock().await;

    let latest = load_latest(&store, category).await?;
    let next = match latest {
        Some(game) if game.seat_of(player).is_some() => return Ok(game.into()),
        Some(game) if !game.outcome.is_concluded() => {
            let Some(next) = state_machine::assign_second_seat(&game, player) else {
                return Err(ServiceError::InvalidState(format!(
                    "match `{}` already has two players",
                    game.id
                )));
            };
            info!(category, match_id = %next.id, player, "second seat taken");
            next
        }
        _ => {
            let next = Match::open(category, player);
            info!(category, match_id = %next.id, player, "opened new match");
            next
        }
    };

    let stored = persist_and_publish(state, &store, None, next).await?;
    Ok(stored.into())
}

/// Apply `player`'s mark on `cell` of the current match.
///
/// Illegal moves are not errors: the stored match is returned unchanged with
/// `applied = false` and nothing is written or published.
pub async fn play_move(
    state: &SharedState,
    category: &str,
    match_id: &str,
    player: &str,
    cell: usize,
) -> Result<MoveResponse, ServiceError> {
    ensure_category(state, category)?;
    let store = state.require_game_store().await?;
    let gate = state.category_gate(category);
    let _guard = gate.lock().await;

    let current = load_current(&store, category, match_id).await?;
    let seat = seat_of(&current, player)?;

    match state_machine::propose_move(&current, seat, cell) {
        Ok(next) => {
            let stored = persist_and_publish(state, &store, Some(&current), next).await?;
            debug!(category, match_id, player, cell, "move applied");
            Ok(MoveResponse {
                applied: true,
                reason: None,
                game: stored.into(),
            })
        }
        Err(rejection) => {
            debug!(category, match_id, player, cell, %rejection, "move ignored");
            Ok(MoveResponse {
                applied: false,
                reason: Some(rejection.to_string()),
                game: current.into(),
            })
        }
    }
}

/// Raise, withdraw or accept a rematch on the current match.
///
/// On acceptance the fresh match is stored and published first, then the old
/// row is removed.
pub async fn request_rematch(
    state: &SharedState,
    category: &str,
    match_id: &str,
    player: &str,
) -> Result<MatchDto, ServiceError> {
    ensure_category(state, category)?;
    let store = state.require_game_store().await?;
    let gate = state.category_gate(category);
    let _guard = gate.lock().await;

    let current = load_current(&store, category, match_id).await?;
    let seat = seat_of(&current, player)?;
    if current.seat_b.is_none() {
        return Err(ServiceError::InvalidState(
            "a rematch needs both seats taken".into(),
        ));
    }

    let stored = match state_machine::request_rematch(&current, seat) {
        RematchOutcome::Requested(next) => {
            info!(category, match_id, player, "rematch requested");
            persist_and_publish(state, &store, Some(&current), next).await?
        }
        RematchOutcome::Cancelled(next) => {
            info!(category, match_id, player, "rematch request withdrawn");
            persist_and_publish(state, &store, Some(&current), next).await?
        }
        RematchOutcome::Accepted(fresh) => {
            let stored = persist_and_publish(state, &store, Some(&current), fresh).await?;
            info!(category, old_match = match_id, new_match = %stored.id, "rematch accepted");
            if let Err(err) = store.delete_match(current.id.clone()).await {
                warn!(match_id, error = %err, "failed to remove replaced match");
            }
            stored
        }
    };

    Ok(stored.into())
}

/// Store a complete match pushed by a client.
///
/// Writes stay last-write-wins, but a sync cannot reopen a concluded match,
/// erase or overwrite a mark already on the board, or reseat the players of
/// the match it targets.
pub async fn sync_match(
    state: &SharedState,
    category: &str,
    match_id: &str,
    player: &str,
    request: SyncMatchRequest,
) -> Result<MatchDto, ServiceError> {
    ensure_category(state, category)?;
    let board: Board = request.board.try_into().map_err(|cells: Vec<Option<Seat>>| {
        ServiceError::InvalidInput(format!(
            "board must have {BOARD_SIZE} cells, got {}",
            cells.len()
        ))
    })?;
    if request.player_x == request.player_o {
        return Err(ServiceError::InvalidInput(
            "both seats cannot hold the same player".into(),
        ));
    }
    if player != request.player_x && player != request.player_o {
        return Err(ServiceError::Unauthorized(
            "only a seated player can sync the match".into(),
        ));
    }

    let store = state.require_game_store().await?;
    let gate = state.category_gate(category);
    let _guard = gate.lock().await;

    let outcome = match evaluate(&board) {
        Outcome::InProgress if request.is_draw => Outcome::Drawn,
        outcome => outcome,
    };
    let next = Match {
        id: match_id.to_owned(),
        category: category.to_owned(),
        seat_a: request.player_x,
        seat_b: Some(request.player_o),
        board,
        turn: request.current_turn,
        outcome,
        rematch_requested_by: request.new_game_requested_by,
        updated_at: SystemTime::now(),
    };

    ensure_consistent_board(&next)?;
    let latest = load_latest(&store, category).await?;
    let previous = latest.as_ref().filter(|game| game.id == match_id);
    if let Some(previous) = previous {
        ensure_forward_sync(previous, &next)?;
    }

    let stored = persist_and_publish(state, &store, previous, next).await?;
    debug!(category, match_id, player, "match synced");
    Ok(stored.into())
}

/// Schedule removal of a concluded match once `player` leaves it.
///
/// Returns whether a cleanup was scheduled; leaving a match that is still
/// running keeps it in place.
pub async fn leave_match(
    state: &SharedState,
    category: &str,
    match_id: &str,
    player: &str,
) -> Result<bool, ServiceError> {
    ensure_category(state, category)?;
    let store = state.require_game_store().await?;
    let current = load_current(&store, category, match_id).await?;
    seat_of(&current, player)?;

    if !current.outcome.is_concluded() {
        debug!(category, match_id, player, "left running match; keeping it");
        return Ok(false);
    }

    schedule_cleanup(state.clone(), current.id);
    Ok(true)
}

/// Remove `match_id` after the configured cleanup delay, without waiting for it.
pub fn schedule_cleanup(state: SharedState, match_id: String) {
    let delay = state.config().cleanup_delay();
    tokio::spawn(async move {
        sleep(delay).await;
        let store = match state.require_game_store().await {
            Ok(store) => store,
            Err(err) => {
                warn!(%match_id, error = %err, "skipping match cleanup");
                return;
            }
        };
        match store.delete_match(match_id.clone()).await {
            Ok(true) => info!(%match_id, "concluded match removed"),
            Ok(false) => debug!(%match_id, "match already gone"),
            Err(err) => warn!(%match_id, error = %err, "failed to remove concluded match"),
        }
    });
}

/// Finished matches of `category`, newest first.
pub async fn history(
    state: &SharedState,
    category: &str,
) -> Result<Vec<MatchResultDto>, ServiceError> {
    ensure_category(state, category)?;
    let store = state.require_game_store().await?;
    let results = store
        .list_results(category.to_owned(), Some(HISTORY_LIMIT))
        .await?;
    Ok(results.into_iter().map(MatchResultDto::from).collect())
}

/// Per-player record over every finished match of `category`.
pub async fn stats(state: &SharedState, category: &str) -> Result<StatsResponse, ServiceError> {
    ensure_category(state, category)?;
    let store = state.require_game_store().await?;
    let results = store.list_results(category.to_owned(), None).await?;
    Ok(tally_stats(&results))
}

/// Count games, wins, draws and losses per player.
pub fn tally_stats(results: &[MatchResultEntity]) -> StatsResponse {
    let mut stats: BTreeMap<String, PlayerStatsDto> = BTreeMap::new();

    for result in results {
        for player in [&result.player_x, &result.player_o] {
            if player.is_empty() {
                continue;
            }
            let entry = stats.entry(player.clone()).or_default();
            entry.total_games += 1;
            match result.result {
                MatchResultKind::Draw => entry.draws += 1,
                MatchResultKind::Win if result.winner.as_ref() == Some(player) => {
                    entry.wins += 1
                }
                MatchResultKind::Win => entry.losses += 1,
            }
        }
    }

    stats
}

fn ensure_category(state: &SharedState, category: &str) -> Result<(), ServiceError> {
    if state.config().supports_category(category) {
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!(
            "unknown game category `{category}`"
        )))
    }
}

fn seat_of(game: &Match, player: &str) -> Result<Seat, ServiceError> {
    game.seat_of(player).ok_or_else(|| {
        ServiceError::Unauthorized(format!("`{player}` is not seated in match `{}`", game.id))
    })
}

async fn load_latest(
    store: &Arc<dyn GameStore>,
    category: &str,
) -> Result<Option<Match>, ServiceError> {
    let latest = store
        .latest_match(category.to_owned())
        .await
        .inspect_err(|err| warn!(category, error = %err, "failed to read latest match"))?;
    Ok(latest.map(Match::from))
}

/// Latest match of `category`, provided it is the one the caller targets.
async fn load_current(
    store: &Arc<dyn GameStore>,
    category: &str,
    match_id: &str,
) -> Result<Match, ServiceError> {
    match load_latest(store, category).await? {
        Some(game) if game.id == match_id => Ok(game),
        _ => Err(ServiceError::NotFound(format!(
            "match `{match_id}` is not the current {category} match"
        ))),
    }
}

fn ensure_forward_sync(previous: &Match, next: &Match) -> Result<(), ServiceError> {
    if previous.seat_a != next.seat_a
        || previous
            .seat_b
            .as_ref()
            .is_some_and(|seat_b| Some(seat_b) != next.seat_b.as_ref())
    {
        return Err(ServiceError::InvalidState(
            "sync cannot change the seated players".into(),
        ));
    }
    if previous.outcome.is_concluded() && !next.outcome.is_concluded() {
        return Err(ServiceError::InvalidState(
            "sync cannot reopen a concluded match".into(),
        ));
    }
    let overwritten = previous
        .board
        .iter()
        .zip(next.board.iter())
        .position(|(before, after)| before.is_some() && before != after);
    if let Some(cell) = overwritten {
        return Err(ServiceError::InvalidState(format!(
            "sync cannot change the mark on cell {cell}"
        )));
    }

    let mut placed = previous
        .board
        .iter()
        .zip(next.board.iter())
        .filter_map(|(before, after)| match (before, after) {
            (None, Some(seat)) => Some(*seat),
            _ => None,
        });
    match (placed.next(), placed.next()) {
        (None, _) => Ok(()),
        (Some(seat), None) if !previous.outcome.is_concluded() && seat == previous.turn => Ok(()),
        (Some(_), None) => Err(ServiceError::InvalidState(
            "sync adds a mark out of turn".into(),
        )),
        (Some(_), Some(_)) => Err(ServiceError::InvalidState(
            "sync can add at most one mark".into(),
        )),
    }
}

/// Seat A opens, so it holds as many marks as seat B or one more, and a
/// running match must be waiting on the seat with fewer marks.
fn ensure_consistent_board(game: &Match) -> Result<(), ServiceError> {
    let count = |seat: Seat| game.board.iter().filter(|cell| **cell == Some(seat)).count();
    let (marks_a, marks_b) = (count(Seat::A), count(Seat::B));

    let expected_turn = if marks_a == marks_b {
        Seat::A
    } else if marks_a == marks_b + 1 {
        Seat::B
    } else {
        return Err(ServiceError::InvalidInput(format!(
            "board holds {marks_a} X marks and {marks_b} O marks"
        )));
    };

    if !game.outcome.is_concluded() && game.turn != expected_turn {
        return Err(ServiceError::InvalidInput(format!(
            "it cannot be {}'s turn on this board",
            game.turn.label()
        )));
    }
    Ok(())
}

/// Upsert `next`, then fan the stored row out to live viewers.
///
/// The ledger gets an entry the first time a match is stored as concluded.
async fn persist_and_publish(
    state: &SharedState,
    store: &Arc<dyn GameStore>,
    previous: Option<&Match>,
    next: Match,
) -> Result<Match, ServiceError> {
    let stored: Match = store
        .upsert_match(MatchEntity::from(next))
        .await
        .inspect_err(|err| warn!(error = %err, "failed to store match"))?
        .into();

    let newly_concluded = stored.outcome.is_concluded()
        && previous.is_none_or(|previous| {
            previous.id != stored.id || !previous.outcome.is_concluded()
        });
    if newly_concluded && let Some(result) = MatchResultEntity::from_concluded(&stored) {
        if let Err(err) = store.record_result(result).await {
            warn!(match_id = %stored.id, error = %err, "failed to record match result");
        }
    }

    let viewers = state.hub().publish(&stored.category, &stored);
    debug!(category = %stored.category, match_id = %stored.id, viewers, "match published");
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{AppConfig, DEFAULT_CATEGORY},
        dao::game_store::MemoryGameStore,
        state::AppState,
    };

    const CATEGORY: &str = DEFAULT_CATEGORY;

    fn test_state() -> SharedState {
        AppState::with_store(AppConfig::default(), Arc::new(MemoryGameStore::new()))
    }

    async fn seated_match(state: &SharedState) -> MatchDto {
        join_match(state, CATEGORY, "alice").await.unwrap();
        join_match(state, CATEGORY, "bob").await.unwrap()
    }

    #[tokio::test]
    async fn join_opens_then_fills_the_match() {
        let state = test_state();

        let opened = join_match(&state, CATEGORY, "alice").await.unwrap();
        assert_eq!(opened.player_x, "alice");
        assert!(opened.player_o.is_none());

        let filled = join_match(&state, CATEGORY, "bob").await.unwrap();
        assert_eq!(filled.id, opened.id);
        assert_eq!(filled.player_o.as_deref(), Some("bob"));

        let again = join_match(&state, CATEGORY, "alice").await.unwrap();
        assert_eq!(again.id, opened.id);
    }

    #[tokio::test]
    async fn third_player_cannot_join_running_match() {
        let state = test_state();
        seated_match(&state).await;

        let err = join_match(&state, CATEGORY, "carol").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn unknown_category_is_not_found() {
        let state = test_state();
        let err = current_match(&state, "chess").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn degraded_state_refuses_reads() {
        let state = AppState::new(AppConfig::default());
        let err = current_match(&state, CATEGORY).await.unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }

    #[tokio::test]
    async fn out_of_turn_move_is_ignored_without_publishing() {
        let state = test_state();
        let game = seated_match(&state).await;
        let mut viewer = state.hub().subscribe(CATEGORY);

        let response = play_move(&state, CATEGORY, &game.id, "bob", 4).await.unwrap();
        assert!(!response.applied);
        assert!(response.reason.is_some());
        assert!(response.game.board.iter().all(Option::is_none));
        assert!(viewer.try_recv().is_none());
    }

    #[tokio::test]
    async fn accepted_move_is_stored_and_published() {
        let state = test_state();
        let game = seated_match(&state).await;
        let mut viewer = state.hub().subscribe(CATEGORY);

        let response = play_move(&state, CATEGORY, &game.id, "alice", 4).await.unwrap();
        assert!(response.applied);
        assert_eq!(response.game.board[4], Some(Seat::A));
        assert_eq!(response.game.current_turn, Seat::B);

        let published = viewer.try_recv().unwrap();
        assert_eq!(published.board[4], Some(Seat::A));

        let current = current_match(&state, CATEGORY).await.unwrap();
        assert_eq!(current.game.unwrap().board[4], Some(Seat::A));
    }

    #[tokio::test]
    async fn strangers_cannot_move() {
        let state = test_state();
        let game = seated_match(&state).await;

        let err = play_move(&state, CATEGORY, &game.id, "mallory", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn win_is_recorded_once_in_history() {
        let state = test_state();
        let game = seated_match(&state).await;

        for (player, cell) in [("alice", 0), ("bob", 3), ("alice", 1), ("bob", 4), ("alice", 2)] {
            play_move(&state, CATEGORY, &game.id, player, cell).await.unwrap();
        }
        let late = play_move(&state, CATEGORY, &game.id, "bob", 5).await.unwrap();
        assert!(!late.applied);
        assert_eq!(late.game.winner.as_deref(), Some("alice"));
        assert_eq!(late.game.winning_line, Some(vec![0, 1, 2]));

        request_rematch(&state, CATEGORY, &game.id, "alice").await.unwrap();

        let history = history(&state, CATEGORY).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].winner.as_deref(), Some("alice"));
        assert_eq!(history[0].result, "win");
    }

    #[tokio::test]
    async fn rematch_handshake_replaces_the_match() {
        let state = test_state();
        let game = seated_match(&state).await;

        let requested = request_rematch(&state, CATEGORY, &game.id, "alice").await.unwrap();
        assert_eq!(requested.new_game_requested_by, Some(Seat::A));

        let cancelled = request_rematch(&state, CATEGORY, &game.id, "alice").await.unwrap();
        assert!(cancelled.new_game_requested_by.is_none());

        request_rematch(&state, CATEGORY, &game.id, "bob").await.unwrap();
        let fresh = request_rematch(&state, CATEGORY, &game.id, "alice").await.unwrap();
        assert_ne!(fresh.id, game.id);
        assert_eq!(fresh.player_x, "alice");
        assert_eq!(fresh.player_o.as_deref(), Some("bob"));
        assert!(fresh.board.iter().all(Option::is_none));

        let current = current_match(&state, CATEGORY).await.unwrap().game.unwrap();
        assert_eq!(current.id, fresh.id);
    }

    #[tokio::test]
    async fn rematch_needs_two_players() {
        let state = test_state();
        let game = join_match(&state, CATEGORY, "alice").await.unwrap();

        let err = request_rematch(&state, CATEGORY, &game.id, "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    fn sync_request(board: [Option<Seat>; BOARD_SIZE], turn: Seat) -> SyncMatchRequest {
        SyncMatchRequest {
            player_x: "alice".into(),
            player_o: "bob".into(),
            board: board.to_vec(),
            current_turn: turn,
            is_draw: false,
            new_game_requested_by: None,
        }
    }

    #[tokio::test]
    async fn sync_stores_full_state_and_refuses_rewrites() {
        let state = test_state();
        let mut board = [None; BOARD_SIZE];
        board[0] = Some(Seat::A);

        let stored = sync_match(&state, CATEGORY, "legacy-1", "alice", sync_request(board, Seat::B))
            .await
            .unwrap();
        assert_eq!(stored.id, "legacy-1");
        assert_eq!(stored.board[0], Some(Seat::A));

        let mut rewritten = [None; BOARD_SIZE];
        rewritten[0] = Some(Seat::B);
        rewritten[1] = Some(Seat::A);
        let err = sync_match(&state, CATEGORY, "legacy-1", "bob", sync_request(rewritten, Seat::A))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let err = sync_match(&state, CATEGORY, "legacy-1", "carol", sync_request(board, Seat::B))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn sync_turn_must_follow_from_the_marks() {
        let state = test_state();
        let mut board = [None; BOARD_SIZE];
        board[0] = Some(Seat::A);
        sync_match(&state, CATEGORY, "legacy-2", "alice", sync_request(board, Seat::B))
            .await
            .unwrap();

        let err = sync_match(&state, CATEGORY, "legacy-2", "bob", sync_request(board, Seat::A))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let mut two_moves = board;
        two_moves[1] = Some(Seat::B);
        two_moves[2] = Some(Seat::A);
        let err = sync_match(&state, CATEGORY, "legacy-2", "bob", sync_request(two_moves, Seat::B))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let mut one_move = board;
        one_move[4] = Some(Seat::B);
        let stored = sync_match(&state, CATEGORY, "legacy-2", "bob", sync_request(one_move, Seat::A))
            .await
            .unwrap();
        assert_eq!(stored.board[4], Some(Seat::B));
        assert_eq!(stored.current_turn, Seat::A);
    }

    #[tokio::test]
    async fn leaving_a_concluded_match_removes_it_after_the_delay() {
        let config = AppConfig::default().with_cleanup_delay(std::time::Duration::from_millis(10));
        let state = AppState::with_store(config, Arc::new(MemoryGameStore::new()));
        let game = seated_match(&state).await;

        assert!(!leave_match(&state, CATEGORY, &game.id, "alice").await.unwrap());

        for (player, cell) in [("alice", 0), ("bob", 3), ("alice", 1), ("bob", 4), ("alice", 2)] {
            play_move(&state, CATEGORY, &game.id, player, cell).await.unwrap();
        }
        assert!(leave_match(&state, CATEGORY, &game.id, "bob").await.unwrap());
        assert!(current_match(&state, CATEGORY).await.unwrap().game.is_some());

        sleep(std::time::Duration::from_millis(100)).await;
        assert!(current_match(&state, CATEGORY).await.unwrap().game.is_none());
    }

    #[test]
    fn stats_count_wins_draws_and_losses() {
        let entry = |x: &str, o: &str, winner: Option<&str>| MatchResultEntity {
            id: format!("{x}-{o}-{winner:?}"),
            category: CATEGORY.into(),
            player_x: x.into(),
            player_o: o.into(),
            winner: winner.map(str::to_owned),
            result: if winner.is_some() {
                MatchResultKind::Win
            } else {
                MatchResultKind::Draw
            },
            recorded_at: SystemTime::now(),
        };
        let results = [
            entry("alice", "bob", Some("alice")),
            entry("bob", "alice", Some("alice")),
            entry("alice", "bob", None),
        ];

        let stats = tally_stats(&results);
        assert_eq!(
            stats["alice"],
            PlayerStatsDto {
                total_games: 3,
                wins: 2,
                draws: 1,
                losses: 0
            }
        );
        assert_eq!(stats["bob"].losses, 2);
        assert_eq!(stats["bob"].draws, 1);
    }

    #[tokio::test]
    async fn stats_cover_the_whole_ledger_while_history_is_capped() {
        let store = MemoryGameStore::new();
        let state = AppState::with_store(AppConfig::default(), Arc::new(store.clone()));
        for round in 0..150 {
            store
                .record_result(MatchResultEntity {
                    id: format!("round-{round}-result"),
                    category: CATEGORY.into(),
                    player_x: "alice".into(),
                    player_o: "bob".into(),
                    winner: Some("alice".into()),
                    result: MatchResultKind::Win,
                    recorded_at: SystemTime::now(),
                })
                .await
                .unwrap();
        }

        let stats = stats(&state, CATEGORY).await.unwrap();
        assert_eq!(stats["alice"].wins, 150);
        assert_eq!(stats["bob"].losses, 150);
        assert_eq!(history(&state, CATEGORY).await.unwrap().len(), HISTORY_LIMIT);
    }
}
