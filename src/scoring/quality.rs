use shakmaty::{Chess, Position, Role};
use crate::core::types::{Move, MIN_DEPTH};
use crate::storage::record::Record;

/// Static evaluation collaborator, score from the side to move's point of view
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, pos: &Chess) -> i32;

    fn name(&self) -> &str;
}

/// Plain material count, used when no stronger evaluator is wired in
pub struct MaterialEvaluator;

const PIECE_VALUES: [(Role, i32); 5] = [
    (Role::Pawn, 100),
    (Role::Knight, 320),
    (Role::Bishop, 330),
    (Role::Rook, 500),
    (Role::Queen, 900),
];

impl Evaluator for MaterialEvaluator {
    fn evaluate(&self, pos: &Chess) -> i32 {
        let board = pos.board();
        let us = board.by_color(pos.turn());
        let them = board.by_color(!pos.turn());

        PIECE_VALUES
            .iter()
            .map(|&(role, value)| {
                let pieces = board.by_role(role);
                value * ((pieces & us).count() as i32 - (pieces & them).count() as i32)
            })
            .sum()
    }

    fn name(&self) -> &str {
        "material"
    }
}

/// Finds the legal move of `pos` with the given encoding.
pub fn legal_move(pos: &Chess, mv: Move) -> Option<shakmaty::Move> {
    pos.legal_moves().into_iter().find(|m| Move::from(m) == mv)
}

/// Blends the stored value with a fresh evaluation of the position after the
/// move. `eval_importance` (0..=10) is the weight of the fresh evaluation.
/// The second element is false when the record is too shallow to trust or
/// its move is not legal in `pos`.
pub fn quality(record: &Record, pos: &Chess, eval_importance: i32, evaluator: &dyn Evaluator) -> (i32, bool) {
    let Some(m) = legal_move(pos, record.mv) else {
        return (record.value, false);
    };

    let weight = eval_importance.clamp(0, 10) as i64;
    let mut after = pos.clone();
    after.play_unchecked(&m);
    let eval = -(evaluator.evaluate(&after) as i64);

    let score = (record.value as i64 * (10 - weight) + eval * weight) / 10;
    (score as i32, record.depth >= MIN_DEPTH)
}
