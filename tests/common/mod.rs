// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use tier_solver::api::{Capabilities, Game, TierGame};
use tier_solver::{
    Config, Database, LoopySolver, Move, Position, SolveOptions, Tier, TierManager, TierPosition,
    TierResult, TierType, Value,
};

/// Solves `game` into a fresh database under `folder` and hands the
/// database back for inspection.
pub fn solve(
    game: Arc<dyn TierGame>,
    folder: &Path,
    loopy_solver: LoopySolver,
) -> tier_solver::Result<(Database, Vec<(Tier, TierResult)>)> {
    let db = Config::new(folder, "fixture", 0)
        .block_size(1_024)
        .loopy_solver(loopy_solver)
        .open()?;

    let mut manager = TierManager::new(db, game);
    let results = manager.solve_all(SolveOptions::default())?;

    Ok((manager.into_database(), results))
}

/// Reads one record of a regular (single-tier) game back out.
pub fn record_of(db: &Database, position: Position) -> tier_solver::Result<(Value, u32)> {
    let mut probe = db.probe_init();
    let tp = TierPosition::new(0, position);

    Ok((
        db.probe_value(&mut probe, tp)?,
        db.probe_remoteness(&mut probe, tp)?,
    ))
}

/// One position, no moves, lost for the player to move.
pub struct OneLose;

impl Game for OneLose {
    fn size(&self) -> u64 {
        1
    }

    fn initial_position(&self) -> Position {
        0
    }

    fn generate_moves(&self, _position: Position) -> Vec<Move> {
        Vec::new()
    }

    fn primitive(&self, _position: Position) -> Value {
        Value::Lose
    }

    fn do_move(&self, position: Position, _mv: Move) -> Position {
        position
    }
}

/// Two positions passing the move back and forth forever.
pub struct TwoCycle;

impl Game for TwoCycle {
    fn size(&self) -> u64 {
        2
    }

    fn initial_position(&self) -> Position {
        0
    }

    fn generate_moves(&self, _position: Position) -> Vec<Move> {
        vec![0]
    }

    fn primitive(&self, _position: Position) -> Value {
        Value::Undecided
    }

    fn do_move(&self, position: Position, _mv: Move) -> Position {
        1 - position
    }
}

/// 0 -> 1 -> 2, where 2 is a lost terminal.
pub struct Chain3;

impl Game for Chain3 {
    fn size(&self) -> u64 {
        3
    }

    fn initial_position(&self) -> Position {
        0
    }

    fn generate_moves(&self, position: Position) -> Vec<Move> {
        if position < 2 {
            vec![0]
        } else {
            Vec::new()
        }
    }

    fn primitive(&self, position: Position) -> Value {
        if position == 2 {
            Value::Lose
        } else {
            Value::Undecided
        }
    }

    fn do_move(&self, position: Position, _mv: Move) -> Position {
        position + 1
    }
}

/// 0 -> 1 -> 2 -> 3 -> 0 with no exit.
pub struct FourCycle;

impl Game for FourCycle {
    fn size(&self) -> u64 {
        4
    }

    fn initial_position(&self) -> Position {
        0
    }

    fn generate_moves(&self, _position: Position) -> Vec<Move> {
        vec![0]
    }

    fn primitive(&self, _position: Position) -> Value {
        Value::Undecided
    }

    fn do_move(&self, position: Position, _mv: Move) -> Position {
        (position + 1) % 4
    }
}

/// A zoo of value/remoteness combinations in one loopy game.
///
/// Terminals: 1 is a tie, 2 is a loss. Expected records:
///
/// | position | children        | record    |
/// |----------|-----------------|-----------|
/// | 0        | 1, 2            | Win @ 1   |
/// | 1        | (terminal)      | Tie @ 0   |
/// | 2        | (terminal)      | Lose @ 0  |
/// | 3        | 1               | Tie @ 1   |
/// | 4        | 5               | Draw      |
/// | 5        | 4               | Draw      |
/// | 6        | 2               | Win @ 1   |
/// | 7        | 6               | Lose @ 2  |
/// | 8        | 7, 1            | Win @ 3   |
/// | 9        | 6, 1            | Tie @ 1   |
/// | 10       | 6               | Lose @ 2  |
/// | 11       | 1, 4            | Tie @ 1   |
/// | 12       | 4               | Draw      |
/// | 13       | 1, 10           | Win @ 3   |
///
/// Position 13 is the trap: its tie child is nearer than its losing
/// child, but moving to the loss wins.
pub struct Mixed;

pub const MIXED_EXPECTED: [(Value, u32); 14] = [
    (Value::Win, 1),
    (Value::Tie, 0),
    (Value::Lose, 0),
    (Value::Tie, 1),
    (Value::Draw, 0),
    (Value::Draw, 0),
    (Value::Win, 1),
    (Value::Lose, 2),
    (Value::Win, 3),
    (Value::Tie, 1),
    (Value::Lose, 2),
    (Value::Tie, 1),
    (Value::Draw, 0),
    (Value::Win, 3),
];

impl Mixed {
    fn children(position: Position) -> &'static [Position] {
        match position {
            0 => &[1, 2],
            3 => &[1],
            4 => &[5],
            5 => &[4],
            6 => &[2],
            7 => &[6],
            8 => &[7, 1],
            9 => &[6, 1],
            10 => &[6],
            11 => &[1, 4],
            12 => &[4],
            13 => &[1, 10],
            _ => &[],
        }
    }
}

impl Game for Mixed {
    fn size(&self) -> u64 {
        14
    }

    fn initial_position(&self) -> Position {
        0
    }

    fn generate_moves(&self, position: Position) -> Vec<Move> {
        (0..Self::children(position).len() as Move).collect()
    }

    fn primitive(&self, position: Position) -> Value {
        match position {
            1 => Value::Tie,
            2 => Value::Lose,
            _ => Value::Undecided,
        }
    }

    fn do_move(&self, position: Position, mv: Move) -> Position {
        Self::children(position)[mv as usize]
    }
}

/// Two tiers: tier 1 is loopy with internal moves and exits into the
/// all-primitive tier 0.
///
/// Expected records in tier 1: 0 = Win @ 1, 1 = Lose @ 2, 2 = Lose @ 1,
/// 3 = Draw (self-loop).
pub struct TieredLoopy {
    /// Whether `canonical_parent_positions` is implemented
    pub with_parents: bool,
}

impl TierGame for TieredLoopy {
    fn initial_tier(&self) -> Tier {
        1
    }

    fn initial_position(&self) -> Position {
        0
    }

    fn tier_size(&self, tier: Tier) -> u64 {
        match tier {
            0 => 2,
            _ => 4,
        }
    }

    fn generate_moves(&self, tp: TierPosition) -> Vec<Move> {
        match (tp.tier, tp.position) {
            (0, _) => Vec::new(),
            (_, 0 | 3) => vec![0, 1],
            _ => vec![0],
        }
    }

    fn primitive(&self, tp: TierPosition) -> Value {
        match (tp.tier, tp.position) {
            (0, 0) => Value::Lose,
            (0, _) => Value::Win,
            _ => Value::Undecided,
        }
    }

    fn do_move(&self, tp: TierPosition, mv: Move) -> TierPosition {
        match (tp.position, mv) {
            (0, 0) => TierPosition::new(1, 1),
            (0, _) => TierPosition::new(0, 0),
            (1, _) => TierPosition::new(1, 0),
            (2, _) => TierPosition::new(0, 1),
            (3, 0) => TierPosition::new(1, 3),
            _ => TierPosition::new(0, 1),
        }
    }

    fn canonical_parent_positions(&self, tp: TierPosition, parent_tier: Tier) -> Vec<Position> {
        if !self.with_parents || parent_tier != 1 {
            return Vec::new();
        }

        match (tp.tier, tp.position) {
            (1, 0) => vec![1],
            (1, 1) => vec![0],
            (1, 3) => vec![3],
            (0, 0) => vec![0],
            (0, 1) => vec![2, 3],
            _ => Vec::new(),
        }
    }

    fn child_tiers(&self, tier: Tier) -> Vec<Tier> {
        match tier {
            1 => vec![0],
            _ => Vec::new(),
        }
    }

    fn tier_type(&self, tier: Tier) -> TierType {
        match tier {
            0 => TierType::ImmediateTransition,
            _ => TierType::Loopy,
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            canonical_parents: self.with_parents,
            ..Capabilities::default()
        }
    }
}

pub const TIERED_LOOPY_EXPECTED: [(Value, u32); 4] = [
    (Value::Win, 1),
    (Value::Lose, 2),
    (Value::Lose, 1),
    (Value::Draw, 0),
];

/// One immediate-transition tier over three all-primitive child tiers
/// of different sizes, for exercising the memory-budgeted child
/// loading rounds.
///
/// Tier 0 (12 positions) is all losses, tier 1 (8 positions) all wins,
/// tier 2 (4 positions) all ties. Tier 3 (5 positions) fans out:
///
/// | position | children              | record  |
/// |----------|-----------------------|---------|
/// | 0        | (0,0), (1,0)          | Win @ 1 |
/// | 1        | (1,3)                 | Lose @ 1|
/// | 2        | (1,0), (2,0)          | Tie @ 1 |
/// | 3        | (0,3), (1,3), (2,3)   | Win @ 1 |
/// | 4        | (2,0)                 | Tie @ 1 |
pub struct WideImmediate;

impl WideImmediate {
    fn children(position: Position) -> &'static [(Tier, Position)] {
        match position {
            0 => &[(0, 0), (1, 0)],
            1 => &[(1, 3)],
            2 => &[(1, 0), (2, 0)],
            3 => &[(0, 3), (1, 3), (2, 3)],
            _ => &[(2, 0)],
        }
    }
}

impl TierGame for WideImmediate {
    fn initial_tier(&self) -> Tier {
        3
    }

    fn initial_position(&self) -> Position {
        0
    }

    fn tier_size(&self, tier: Tier) -> u64 {
        match tier {
            0 => 12,
            1 => 8,
            2 => 4,
            _ => 5,
        }
    }

    fn generate_moves(&self, tp: TierPosition) -> Vec<Move> {
        if tp.tier != 3 {
            return Vec::new();
        }

        (0..Self::children(tp.position).len() as Move).collect()
    }

    fn primitive(&self, tp: TierPosition) -> Value {
        match tp.tier {
            0 => Value::Lose,
            1 => Value::Win,
            2 => Value::Tie,
            _ => Value::Undecided,
        }
    }

    fn do_move(&self, tp: TierPosition, mv: Move) -> TierPosition {
        let (tier, position) = Self::children(tp.position)[mv as usize];
        TierPosition::new(tier, position)
    }

    fn child_tiers(&self, tier: Tier) -> Vec<Tier> {
        match tier {
            3 => vec![0, 1, 2],
            _ => Vec::new(),
        }
    }

    fn tier_type(&self, _tier: Tier) -> TierType {
        TierType::ImmediateTransition
    }
}

pub const WIDE_IMMEDIATE_EXPECTED: [(Value, u32); 5] = [
    (Value::Win, 1),
    (Value::Lose, 1),
    (Value::Tie, 1),
    (Value::Win, 1),
    (Value::Tie, 1),
];

/// 3x3 tic-tac-toe as a tier game: tier = piece count, position =
/// base-3 board encoding (0 empty, 1 = X, 2 = O).
pub struct TicTacToe {
    /// Whether `canonical_parent_positions` is implemented
    pub with_parents: bool,
}

const TTT_SIZE: u64 = 19_683; // 3^9

const TTT_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Encodes a board (cell 0 is the least-significant digit) as a
/// position.
pub fn ttt_encode(board: [u8; 9]) -> Position {
    board
        .iter()
        .rev()
        .fold(0u64, |acc, &digit| acc * 3 + u64::from(digit))
}

fn ttt_board(position: Position) -> [u8; 9] {
    let mut board = [0u8; 9];
    let mut rest = position;

    for cell in &mut board {
        *cell = (rest % 3) as u8;
        rest /= 3;
    }

    board
}

fn ttt_wins(board: &[u8; 9], mark: u8) -> bool {
    TTT_LINES
        .iter()
        .any(|line| line.iter().all(|&cell| board[cell] == mark))
}

/// Mark of the player to move at tier `t`: X places on even tiers.
fn ttt_mover(tier: Tier) -> u8 {
    if tier % 2 == 0 {
        1
    } else {
        2
    }
}

fn ttt_pow3(cell: usize) -> u64 {
    3u64.pow(cell as u32)
}

impl TierGame for TicTacToe {
    fn initial_tier(&self) -> Tier {
        0
    }

    fn initial_position(&self) -> Position {
        0
    }

    fn tier_size(&self, _tier: Tier) -> u64 {
        TTT_SIZE
    }

    fn generate_moves(&self, tp: TierPosition) -> Vec<Move> {
        if self.primitive(tp).is_decided() {
            return Vec::new();
        }

        let board = ttt_board(tp.position);

        (0..9)
            .filter(|&cell| board[cell] == 0)
            .map(|cell| cell as Move)
            .collect()
    }

    fn primitive(&self, tp: TierPosition) -> Value {
        let board = ttt_board(tp.position);
        let last_mover = ttt_mover(tp.tier.wrapping_sub(1));

        if tp.tier > 0 && ttt_wins(&board, last_mover) {
            return Value::Lose;
        }

        if tp.tier == 9 {
            return Value::Tie;
        }

        Value::Undecided
    }

    fn do_move(&self, tp: TierPosition, mv: Move) -> TierPosition {
        let cell = mv as usize;
        debug_assert_eq!(0, ttt_board(tp.position)[cell]);

        TierPosition::new(
            tp.tier + 1,
            tp.position + u64::from(ttt_mover(tp.tier)) * ttt_pow3(cell),
        )
    }

    fn is_legal_position(&self, tp: TierPosition) -> bool {
        let board = ttt_board(tp.position);

        let x = board.iter().filter(|&&c| c == 1).count() as u64;
        let o = board.iter().filter(|&&c| c == 2).count() as u64;

        if x + o != tp.tier || x != o + tp.tier % 2 {
            return false;
        }

        // The player to move cannot already have a line; play would
        // have stopped a ply earlier
        if ttt_wins(&board, ttt_mover(tp.tier)) {
            return false;
        }

        !(ttt_wins(&board, 1) && ttt_wins(&board, 2))
    }

    fn canonical_parent_positions(&self, tp: TierPosition, parent_tier: Tier) -> Vec<Position> {
        if !self.with_parents || parent_tier + 1 != tp.tier {
            return Vec::new();
        }

        let board = ttt_board(tp.position);
        let last_mark = ttt_mover(parent_tier);
        let mut parents = Vec::new();

        for cell in 0..9 {
            if board[cell] != last_mark {
                continue;
            }

            let parent = TierPosition::new(
                parent_tier,
                tp.position - u64::from(last_mark) * ttt_pow3(cell),
            );

            if self.is_legal_position(parent) && self.primitive(parent) == Value::Undecided {
                parents.push(parent.position);
            }
        }

        parents
    }

    fn child_tiers(&self, tier: Tier) -> Vec<Tier> {
        if tier < 9 {
            vec![tier + 1]
        } else {
            Vec::new()
        }
    }

    fn tier_type(&self, _tier: Tier) -> TierType {
        TierType::ImmediateTransition
    }

    fn tier_name(&self, tier: Tier) -> Option<String> {
        Some(format!("{tier}-pieces"))
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            canonical_parents: self.with_parents,
            ..Capabilities::default()
        }
    }
}
