//! Pure rules of the grid game: move validation, win/draw detection and the
//! rematch handshake. Every function takes the current [`Match`] by reference
//! and returns the next one, leaving the input untouched on rejection.

use std::time::SystemTime;

use thiserror::Error;

use crate::state::game::{BOARD_SIZE, Board, Match, Outcome, Seat, new_match_id};

/// The eight winning triples, scanned rows first, then columns, then diagonals.
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Reasons a proposed move is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveRejection {
    /// The match was already won or drawn.
    #[error("match is already concluded")]
    Concluded,
    /// The seat moved out of turn; carries the seat that is due.
    #[error("it is not {}'s turn", .0.label())]
    NotYourTurn(Seat),
    /// The cell index is past the last cell.
    #[error("cell {0} is outside the board")]
    CellOutOfRange(usize),
    /// The cell already holds a mark.
    #[error("cell {0} is already taken")]
    CellOccupied(usize),
}

/// What a rematch request turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RematchOutcome {
    /// The requester flag was raised.
    Requested(Match),
    /// The requester asked again, which withdraws the request.
    Cancelled(Match),
    /// The opponent had already asked: a brand-new match replaces the old one.
    Accepted(Match),
}

impl RematchOutcome {
    /// Resulting match regardless of how the request resolved.
    pub fn into_match(self) -> Match {
        match self {
            Self::Requested(game) | Self::Cancelled(game) | Self::Accepted(game) => game,
        }
    }
}

/// Find the first completed line on `board`, returning its owner and cells.
pub fn winning_line(board: &Board) -> Option<(Seat, [usize; 3])> {
    WINNING_LINES.iter().find_map(|&line| {
        let [a, b, c] = line;
        match (board[a], board[b], board[c]) {
            (Some(first), Some(second), Some(third)) if first == second && second == third => {
                Some((first, line))
            }
            _ => None,
        }
    })
}

/// Outcome implied by the marks on `board`.
pub fn evaluate(board: &Board) -> Outcome {
    if let Some((seat, _)) = winning_line(board) {
        Outcome::Won(seat)
    } else if board.iter().all(Option::is_some) {
        Outcome::Drawn
    } else {
        Outcome::InProgress
    }
}

/// Place `seat`'s mark on `cell`.
///
/// The turn only flips when the move neither wins nor fills the board, so a
/// concluded match keeps the turn of whoever played last.
pub fn propose_move(current: &Match, seat: Seat, cell: usize) -> Result<Match, MoveRejection> {
    if current.outcome.is_concluded() {
        return Err(MoveRejection::Concluded);
    }
    if seat != current.turn {
        return Err(MoveRejection::NotYourTurn(seat));
    }
    if cell >= BOARD_SIZE {
        return Err(MoveRejection::CellOutOfRange(cell));
    }
    if current.board[cell].is_some() {
        return Err(MoveRejection::CellOccupied(cell));
    }

    let mut next = current.clone();
    next.board[cell] = Some(seat);
    next.outcome = evaluate(&next.board);
    if !next.outcome.is_concluded() {
        next.turn = seat.other();
    }

    Ok(next)
}

/// Raise, withdraw, or accept a request for a fresh match.
pub fn request_rematch(current: &Match, requester: Seat) -> RematchOutcome {
    match current.rematch_requested_by {
        None => {
            let mut next = current.clone();
            next.rematch_requested_by = Some(requester);
            RematchOutcome::Requested(next)
        }
        Some(existing) if existing == requester => {
            let mut next = current.clone();
            next.rematch_requested_by = None;
            RematchOutcome::Cancelled(next)
        }
        Some(_) => RematchOutcome::Accepted(accept_rematch(current)),
    }
}

/// Replace `current` with a fresh match between the same two players.
pub fn accept_rematch(current: &Match) -> Match {
    Match {
        id: new_match_id(),
        category: current.category.clone(),
        seat_a: current.seat_a.clone(),
        seat_b: current.seat_b.clone(),
        board: [None; BOARD_SIZE],
        turn: Seat::A,
        outcome: Outcome::InProgress,
        rematch_requested_by: None,
        updated_at: SystemTime::now(),
    }
}

/// Bind `name` to the open seat B. Returns `None` when the seat is taken or
/// `name` already sits in seat A.
pub fn assign_second_seat(current: &Match, name: &str) -> Option<Match> {
    if current.seat_b.is_some() || current.seat_a == name {
        return None;
    }

    let mut next = current.clone();
    next.seat_b = Some(name.to_owned());
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_match() -> Match {
        let game = Match::open("tic-tac-toe", "alice");
        assign_second_seat(&game, "bob").unwrap()
    }

    fn play(game: Match, cells: &[usize]) -> Match {
        cells.iter().fold(game, |game, &cell| {
            let seat = game.turn;
            propose_move(&game, seat, cell).unwrap()
        })
    }

    #[test]
    fn move_succeeds_only_for_current_turn_on_empty_cell() {
        let game = ready_match();

        let err = propose_move(&game, Seat::B, 4).unwrap_err();
        assert_eq!(err, MoveRejection::NotYourTurn(Seat::B));

        let next = propose_move(&game, Seat::A, 4).unwrap();
        assert_eq!(next.board[4], Some(Seat::A));
        assert_eq!(next.turn, Seat::B);

        let err = propose_move(&next, Seat::B, 4).unwrap_err();
        assert_eq!(err, MoveRejection::CellOccupied(4));

        let err = propose_move(&next, Seat::B, 9).unwrap_err();
        assert_eq!(err, MoveRejection::CellOutOfRange(9));
    }

    #[test]
    fn rejected_move_leaves_state_unchanged() {
        let game = play(ready_match(), &[0]);
        let before = game.clone();

        assert!(propose_move(&game, Seat::A, 1).is_err());
        assert!(propose_move(&game, Seat::B, 0).is_err());
        assert_eq!(game, before);
    }

    #[test]
    fn every_line_wins_for_its_owner() {
        for line in WINNING_LINES {
            let filler: Vec<usize> = (0..BOARD_SIZE)
                .filter(|cell| !line.contains(cell))
                .take(2)
                .collect();
            let sequence = [line[0], filler[0], line[1], filler[1], line[2]];

            let game = play(ready_match(), &sequence);
            assert_eq!(game.outcome, Outcome::Won(Seat::A), "line {line:?}");
            assert_eq!(winning_line(&game.board), Some((Seat::A, line)));

            let free = game.board.iter().position(Option::is_none).unwrap();
            assert_eq!(
                propose_move(&game, Seat::B, free).unwrap_err(),
                MoveRejection::Concluded
            );
        }
    }

    #[test]
    fn top_row_win_freezes_turn() {
        let game = play(ready_match(), &[0, 3, 1, 4, 2]);

        assert_eq!(game.outcome, Outcome::Won(Seat::A));
        assert_eq!(game.turn, Seat::A);
        assert_eq!(game.winner_name(), Some("alice"));

        for cell in [5, 6, 7, 8] {
            assert_eq!(
                propose_move(&game, game.turn, cell).unwrap_err(),
                MoveRejection::Concluded
            );
            assert_eq!(
                propose_move(&game, game.turn.other(), cell).unwrap_err(),
                MoveRejection::Concluded
            );
        }
    }

    #[test]
    fn full_board_without_line_is_a_draw() {
        let game = play(ready_match(), &[0, 1, 2, 3, 5, 4, 6, 8, 7]);
        assert_eq!(game.outcome, Outcome::Drawn);
        assert!(winning_line(&game.board).is_none());
        assert!(game.winner_name().is_none());
    }

    #[test]
    fn turn_alternates_with_move_parity() {
        let sequence = [0, 1, 2, 3, 5, 4, 6, 8];
        let mut game = ready_match();
        for (played, &cell) in sequence.iter().enumerate() {
            game = propose_move(&game, game.turn, cell).unwrap();
            let expected = if (played + 1) % 2 == 0 { Seat::A } else { Seat::B };
            assert_eq!(game.turn, expected);
            assert_eq!(game.outcome, Outcome::InProgress);
        }
    }

    #[test]
    fn repeated_request_cancels_rematch() {
        let game = play(ready_match(), &[0, 3, 1, 4, 2]);

        let requested = request_rematch(&game, Seat::A);
        let RematchOutcome::Requested(requested) = requested else {
            panic!("expected a pending request, got {requested:?}");
        };
        assert_eq!(requested.rematch_requested_by, Some(Seat::A));

        let cancelled = request_rematch(&requested, Seat::A);
        let RematchOutcome::Cancelled(cancelled) = cancelled else {
            panic!("expected a cancellation, got {cancelled:?}");
        };
        assert_eq!(cancelled.rematch_requested_by, None);
        assert_eq!(cancelled.id, game.id);
    }

    #[test]
    fn opponent_request_accepts_rematch() {
        let game = play(ready_match(), &[0, 1, 2, 3, 5, 4, 6, 8, 7]);
        let requested = request_rematch(&game, Seat::B).into_match();

        let accepted = request_rematch(&requested, Seat::A);
        let RematchOutcome::Accepted(fresh) = accepted else {
            panic!("expected acceptance, got {accepted:?}");
        };

        assert_ne!(fresh.id, game.id);
        assert_eq!(fresh.seat_a, "alice");
        assert_eq!(fresh.seat_b.as_deref(), Some("bob"));
        assert!(fresh.board.iter().all(Option::is_none));
        assert_eq!(fresh.turn, Seat::A);
        assert_eq!(fresh.outcome, Outcome::InProgress);
        assert!(fresh.rematch_requested_by.is_none());
    }

    #[test]
    fn second_seat_binds_only_once_and_never_to_creator() {
        let game = Match::open("tic-tac-toe", "alice");
        assert!(assign_second_seat(&game, "alice").is_none());

        let joined = assign_second_seat(&game, "bob").unwrap();
        assert_eq!(joined.seat_b.as_deref(), Some("bob"));
        assert!(assign_second_seat(&joined, "carol").is_none());
    }

    #[test]
    fn evaluate_matches_board_contents() {
        let mut board: Board = [None; BOARD_SIZE];
        assert_eq!(evaluate(&board), Outcome::InProgress);

        board[2] = Some(Seat::B);
        board[4] = Some(Seat::B);
        board[6] = Some(Seat::B);
        assert_eq!(evaluate(&board), Outcome::Won(Seat::B));
    }
}
