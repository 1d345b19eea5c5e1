use std::fmt;
use serde::{Deserialize, Serialize};
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::uci::UciMove;
use shakmaty::{Chess, EnPassantMode, Role};
use crate::core::error::{Error, ErrorKind, Result};

/// Minimum depth at which a stored fact is trusted by the search.
pub const MIN_DEPTH: i32 = 4;
pub const MAX_PLY: i32 = 246;
pub const VALUE_INFINITE: i32 = 32001;
/// Depth and score given to facts that did not come out of a search.
pub const IMPORT_DEPTH: i32 = 0;
pub const IMPORT_VALUE: i32 = 0;

/// 64-bit position hash, the only key shape of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    pub fn new(key: u64) -> Self {
        Fingerprint(key)
    }

    /// Zobrist fingerprint of a position, en passant counted only when it is playable.
    pub fn of(pos: &Chess) -> Self {
        let hash: Zobrist64 = pos.zobrist_hash(EnPassantMode::Legal);
        Fingerprint(hash.0)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Fingerprint {
    fn from(key: u64) -> Self {
        Fingerprint(key)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Normal,
    Promotion,
    EnPassant,
    Castling,
}

/// Packed move: to (6 bits), from (6 bits), promotion piece (2 bits), kind (2 bits).
/// Castling moves are stored king square to rook square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Move(pub u16);

const PROMOTION_FLAG: u16 = 1 << 14;
const EN_PASSANT_FLAG: u16 = 2 << 14;
const CASTLING_FLAG: u16 = 3 << 14;

impl Move {
    pub const NONE: Move = Move(0);

    pub fn new(from: u8, to: u8) -> Self {
        Move(((from as u16 & 0x3F) << 6) | (to as u16 & 0x3F))
    }

    pub fn promotion(from: u8, to: u8, role: Role) -> Self {
        let piece = match role {
            Role::Knight => 0,
            Role::Bishop => 1,
            Role::Rook => 2,
            _ => 3,
        };
        Move(PROMOTION_FLAG | (piece << 12) | Move::new(from, to).0)
    }

    pub fn en_passant(from: u8, to: u8) -> Self {
        Move(EN_PASSANT_FLAG | Move::new(from, to).0)
    }

    pub fn castling(king: u8, rook: u8) -> Self {
        Move(CASTLING_FLAG | Move::new(king, rook).0)
    }

    pub fn from_sq(&self) -> u8 {
        ((self.0 >> 6) & 0x3F) as u8
    }

    pub fn to_sq(&self) -> u8 {
        (self.0 & 0x3F) as u8
    }

    pub fn kind(&self) -> MoveKind {
        match self.0 >> 14 {
            0 => MoveKind::Normal,
            1 => MoveKind::Promotion,
            2 => MoveKind::EnPassant,
            _ => MoveKind::Castling,
        }
    }

    pub fn promotion_role(&self) -> Option<Role> {
        if self.kind() != MoveKind::Promotion {
            return None;
        }
        Some(match (self.0 >> 12) & 0x3 {
            0 => Role::Knight,
            1 => Role::Bishop,
            2 => Role::Rook,
            _ => Role::Queen,
        })
    }

    pub fn is_none(&self) -> bool {
        self.from_sq() == self.to_sq()
    }

    /// Parses long algebraic notation ("e2e4", "e7e8q"). Castling and en passant
    /// cannot be told apart from normal moves without a position; use
    /// `from_uci_in` when one is at hand.
    pub fn from_uci(text: &str) -> Result<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != 4 && bytes.len() != 5 {
            return Err(Error::new(ErrorKind::Parse, format!("Invalid move '{}'", text)));
        }
        let from = parse_square(&bytes[0..2])
            .ok_or_else(|| Error::new(ErrorKind::Parse, format!("Invalid origin in '{}'", text)))?;
        let to = parse_square(&bytes[2..4])
            .ok_or_else(|| Error::new(ErrorKind::Parse, format!("Invalid destination in '{}'", text)))?;

        match bytes.get(4) {
            None => Ok(Move::new(from, to)),
            Some(piece) => {
                let role = match piece.to_ascii_lowercase() {
                    b'n' => Role::Knight,
                    b'b' => Role::Bishop,
                    b'r' => Role::Rook,
                    b'q' => Role::Queen,
                    _ => return Err(Error::new(ErrorKind::Parse, format!("Invalid promotion in '{}'", text))),
                };
                Ok(Move::promotion(from, to, role))
            }
        }
    }

    /// Resolves UCI text against `pos`, so "e1g1" becomes the stored king to
    /// rook castling encoding.
    pub fn from_uci_in(pos: &Chess, text: &str) -> Result<Self> {
        let uci = UciMove::from_ascii(text.trim().as_bytes())
            .map_err(|e| Error::new(ErrorKind::Parse, format!("Invalid move '{}': {}", text, e)))?;
        let m = uci
            .to_move(pos)
            .map_err(|e| Error::new(ErrorKind::InvalidArgument, format!("Illegal move '{}': {}", text, e)))?;
        Ok(Move::from(&m))
    }
}

fn parse_square(bytes: &[u8]) -> Option<u8> {
    let file = bytes[0].checked_sub(b'a')?;
    let rank = bytes[1].checked_sub(b'1')?;
    if file > 7 || rank > 7 {
        return None;
    }
    Some(rank * 8 + file)
}

fn write_square(f: &mut fmt::Formatter, square: u8) -> fmt::Result {
    write!(f, "{}{}", (b'a' + square % 8) as char, (b'1' + square / 8) as char)
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_none() {
            return write!(f, "(none)");
        }

        let from = self.from_sq();
        let mut to = self.to_sq();
        if self.kind() == MoveKind::Castling {
            // king lands on the g or c file
            let file = if to % 8 > from % 8 { 6 } else { 2 };
            to = (from / 8) * 8 + file;
        }

        write_square(f, from)?;
        write_square(f, to)?;
        if let Some(role) = self.promotion_role() {
            write!(f, "{}", role.char())?;
        }
        Ok(())
    }
}

impl From<&shakmaty::Move> for Move {
    fn from(m: &shakmaty::Move) -> Self {
        match *m {
            shakmaty::Move::Normal { from, to, promotion: Some(role), .. } => {
                Move::promotion(from as u8, to as u8, role)
            }
            shakmaty::Move::Normal { from, to, promotion: None, .. } => Move::new(from as u8, to as u8),
            shakmaty::Move::EnPassant { from, to } => Move::en_passant(from as u8, to as u8),
            shakmaty::Move::Castle { king, rook } => Move::castling(king as u8, rook as u8),
            shakmaty::Move::Put { .. } => Move::NONE,
        }
    }
}

/// Learning mode selected through the option layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LearningMode {
    #[default]
    Off,
    Standard,
    SelfPlay,
}

impl LearningMode {
    pub fn is_enabled(&self) -> bool {
        *self != LearningMode::Off
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "disabled" => Ok(LearningMode::Off),
            "standard" => Ok(LearningMode::Standard),
            "self" | "selfplay" | "self-play" => Ok(LearningMode::SelfPlay),
            other => Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("Unknown learning mode '{}'", other),
            )),
        }
    }
}

impl fmt::Display for LearningMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            LearningMode::Off => "Off",
            LearningMode::Standard => "Standard",
            LearningMode::SelfPlay => "Self",
        };
        write!(f, "{}", name)
    }
}

/// A fact observed by the search, not yet folded into a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearningMove {
    pub depth: i32,
    pub score: i32,
    pub mv: Move,
    /// Confidence in the observation, 0..=100
    pub performance: i32,
}

impl Default for LearningMove {
    fn default() -> Self {
        LearningMove {
            depth: 0,
            score: IMPORT_VALUE,
            mv: Move::NONE,
            performance: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedLearningMove {
    pub key: Fingerprint,
    pub learning_move: LearningMove,
}

impl PersistedLearningMove {
    pub fn new(key: Fingerprint, mv: Move, score: i32, depth: i32) -> Self {
        PersistedLearningMove {
            key,
            learning_move: LearningMove {
                depth,
                score,
                mv,
                performance: 100,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uci_text_survives_parse_and_display() {
        for text in ["e2e4", "g1f3", "a7a8q", "h2h1n"] {
            let mv = Move::from_uci(text).unwrap();
            assert_eq!(mv.to_string(), text);
        }
    }

    #[test]
    fn castling_displays_king_destination() {
        // e1 = 4, h1 = 7, a8 = 56, e8 = 60
        assert_eq!(Move::castling(4, 7).to_string(), "e1g1");
        assert_eq!(Move::castling(60, 56).to_string(), "e8c8");
    }

    #[test]
    fn rejects_malformed_moves() {
        assert!(Move::from_uci("e9e4").is_err());
        assert!(Move::from_uci("e2").is_err());
        assert!(Move::from_uci("e7e8k").is_err());
    }

    #[test]
    fn learning_mode_names() {
        assert_eq!(LearningMode::parse("Self").unwrap(), LearningMode::SelfPlay);
        assert_eq!(LearningMode::parse("standard").unwrap(), LearningMode::Standard);
        assert!(!LearningMode::parse("Off").unwrap().is_enabled());
        assert!(LearningMode::parse("sometimes").is_err());
    }

    #[test]
    fn uci_in_position_resolves_castling() {
        let fen: shakmaty::fen::Fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        let pos: Chess = fen.into_position(shakmaty::CastlingMode::Standard).unwrap();

        assert_eq!(Move::from_uci_in(&pos, "e1g1").unwrap(), Move::castling(4, 7));
        assert_eq!(Move::from_uci_in(&pos, "e1c1").unwrap(), Move::castling(4, 0));
        assert_eq!(Move::from_uci_in(&pos, "a1a5").unwrap(), Move::from_uci("a1a5").unwrap());
        assert_eq!(Move::from_uci_in(&pos, "e1e3").unwrap_err().kind, ErrorKind::InvalidArgument);
        assert_eq!(Move::from_uci_in(&pos, "zz").unwrap_err().kind, ErrorKind::Parse);
    }
}
