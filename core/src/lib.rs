#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Reef Clash engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point and produces a fresh game snapshot, and then broadcasts
//! [`Event`] values describing what happened. Systems receive immutable
//! snapshots plus an injected random source and respond with new values.

mod catalog;
mod piece;

pub use catalog::{
    Catalog, CatalogError, Footprint, Offset, PieceCategory, PieceTemplate, Rarity, StatBonus,
    Stats, Tag,
};
pub use piece::{AppliedEffect, Enhancement, Piece, PlacedPiece};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Reef Clash.";

/// Number of cell columns in every tank.
pub const GRID_COLUMNS: u32 = 8;

/// Number of cell rows in every tank.
pub const GRID_ROWS: u32 = 6;

/// Total number of cells available in a tank.
pub const GRID_CELLS: u32 = GRID_COLUMNS * GRID_ROWS;

/// Commands that express all permissible game state transitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Buys a piece offered in the player's shop and benches it.
    Purchase {
        /// Instance identifier of the shop offer.
        piece: PieceId,
    },
    /// Places a benched piece into the player's tank.
    PlacePiece {
        /// Identifier of the benched piece.
        piece: PieceId,
        /// Cell anchoring the piece's footprint.
        origin: CellCoord,
    },
    /// Moves an already placed piece to a new origin.
    MovePiece {
        /// Identifier of the placed piece.
        piece: PieceId,
        /// Cell that should anchor the footprint after the move.
        origin: CellCoord,
    },
    /// Sells a placed or benched piece back to the shop.
    SellPiece {
        /// Identifier of the piece being sold.
        piece: PieceId,
    },
    /// Pays the current reroll cost and redraws every unlocked shop slot.
    RerollShop,
    /// Locks the provided shop slot, or unlocks it when it is already locked.
    ToggleShopLock {
        /// Zero-based index of the shop slot.
        slot: usize,
    },
    /// Removes the shop lock, if any.
    ClearShopLock,
    /// Selects the provided piece, or clears the selection when it is already selected.
    SelectPiece {
        /// Identifier of the piece to select.
        piece: PieceId,
    },
    /// Ends the shopping phase: the opponent drafts, consumables resolve and a battle begins.
    StartBattle,
    /// Advances the active battle by a single round.
    StepBattle,
    /// Resolves any remaining battle rounds and pays out the round's rewards.
    CompleteBattle,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Announces that a new shopping round began.
    RoundStarted {
        /// One-based round number.
        round: u32,
    },
    /// Confirms that a shop offer was bought.
    PiecePurchased {
        /// Identifier of the bought piece.
        piece: PieceId,
        /// Shop slot the piece was taken from.
        slot: usize,
        /// Gold paid for the piece.
        cost: u32,
    },
    /// Confirms that a benched piece was placed into the tank.
    PiecePlaced {
        /// Identifier of the placed piece.
        piece: PieceId,
        /// Origin cell anchoring the piece.
        origin: CellCoord,
    },
    /// Confirms that a placed piece moved.
    PieceMoved {
        /// Identifier of the moved piece.
        piece: PieceId,
        /// Origin before the move.
        from: CellCoord,
        /// Origin after the move.
        to: CellCoord,
    },
    /// Confirms that a piece was sold.
    PieceSold {
        /// Identifier of the sold piece.
        piece: PieceId,
        /// Gold refunded for the piece.
        value: u32,
    },
    /// Confirms that a shop was rerolled.
    ShopRerolled {
        /// Side whose shop was redrawn.
        side: Side,
        /// Gold paid for the reroll.
        cost: u32,
    },
    /// Reports the player's shop lock after it changed.
    ShopLockChanged {
        /// Locked slot, if any.
        slot: Option<usize>,
    },
    /// Reports the player's selection after it changed.
    SelectionChanged {
        /// Selected piece, if any.
        piece: Option<PieceId>,
    },
    /// Summarises the opponent's drafting pass for the round.
    OpponentDrafted {
        /// Number of pieces the opponent bought and placed.
        purchases: u32,
        /// Number of rerolls the opponent paid for.
        rerolls: u32,
        /// Gold left after drafting.
        gold: u32,
    },
    /// Reports the consumables resolved for one side at battle entry.
    ConsumablesResolved {
        /// Side whose consumables were resolved.
        side: Side,
        /// Number of placed consumables used up.
        consumed: u32,
        /// Number of creature buffs applied.
        effects: u32,
    },
    /// Announces that a battle began.
    BattleStarted {
        /// Water quality of the player's tank for the battle.
        player_water: u8,
        /// Water quality of the opponent's tank for the battle.
        opponent_water: u8,
    },
    /// Confirms that a battle round was resolved.
    BattleRoundResolved {
        /// One-based battle round number.
        round: u32,
    },
    /// Announces the final outcome of a battle.
    BattleConcluded {
        /// Outcome of the battle.
        outcome: BattleOutcome,
        /// Number of rounds that were fought.
        rounds: u32,
    },
    /// Reports the gold paid to a side after a battle.
    RewardsGranted {
        /// Side receiving the gold.
        side: Side,
        /// Base reward for the battle result.
        reward: u32,
        /// Catch-up bonus for an active loss streak.
        streak_bonus: u32,
        /// Interest earned on the post-reward balance.
        interest: u32,
    },
    /// Announces that the final round ended and the campaign reset.
    CampaignFinished {
        /// Battles won by the player.
        player_wins: u32,
        /// Battles won by the opponent.
        opponent_wins: u32,
    },
    /// Reports that a command was rejected and the state left unchanged.
    CommandRejected {
        /// Specific reason the command failed.
        reason: Rejection,
    },
}

/// Reasons a command may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum Rejection {
    /// The command is not permitted in the current phase.
    #[error("command is not permitted in the {0:?} phase")]
    WrongPhase(Phase),
    /// No piece with the provided identifier exists where the command expects it.
    #[error("piece {0:?} is unknown")]
    UnknownPiece(PieceId),
    /// The side cannot afford the action.
    #[error("action costs {required} gold but only {available} is available")]
    InsufficientGold {
        /// Gold required by the action.
        required: u32,
        /// Gold currently available.
        available: u32,
    },
    /// The requested placement is invalid.
    #[error("invalid placement: {0}")]
    InvalidPlacement(PlacementError),
    /// The shop slot does not exist or holds no offer.
    #[error("shop slot {0} is unavailable")]
    InvalidSlot(usize),
    /// No battle is currently active.
    #[error("no battle is active")]
    NoActiveBattle,
}

/// Reasons a placement request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlacementError {
    /// The requested footprint extends beyond the grid bounds.
    #[error("footprint leaves the grid")]
    OutOfBounds,
    /// The requested footprint overlaps a cell owned by another piece.
    #[error("footprint overlaps an occupied cell")]
    Occupied,
    /// The piece is not present in the tank.
    #[error("piece is not in the tank")]
    MissingPiece,
    /// The piece is already present in the tank.
    #[error("piece is already in the tank")]
    DuplicatePiece,
}

/// Phase of a campaign round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Players buy, place, move and sell pieces.
    Shopping,
    /// The tanks fight and no shop commands are accepted.
    Battle,
}

/// One of the two competing sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// The human-controlled side.
    Player,
    /// The autonomous opponent.
    Opponent,
}

impl Side {
    /// Both sides in deterministic order.
    pub const ALL: [Side; 2] = [Side::Player, Side::Opponent];
}

/// Final result of a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// The provided side won.
    Victory(Side),
    /// Neither side won.
    Draw,
}

impl BattleOutcome {
    /// Projects the outcome onto a single side.
    #[must_use]
    pub fn result_for(self, side: Side) -> SideResult {
        match self {
            Self::Victory(winner) if winner == side => SideResult::Win,
            Self::Victory(_) => SideResult::Loss,
            Self::Draw => SideResult::Draw,
        }
    }
}

/// Battle outcome seen from one side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SideResult {
    /// The side won.
    Win,
    /// The side lost.
    Loss,
    /// The battle was drawn.
    Draw,
}

/// Logical timestamp assigned by the world's monotonic clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp from its raw tick value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the raw tick value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Returns the timestamp that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Unique identifier assigned to a piece instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(u32);

impl PieceId {
    /// Creates a new piece identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Allocates unique piece identifiers for freshly stamped instances.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PieceIdAllocator {
    next: u32,
}

impl PieceIdAllocator {
    /// Creates an allocator whose first identifier is zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Hands out the next unused identifier.
    pub fn allocate(&mut self) -> PieceId {
        let id = PieceId::new(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

/// Cardinal directions on the tank grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward decreasing row indices.
    North,
    /// Toward increasing column indices.
    East,
    /// Toward increasing row indices.
    South,
    /// Toward decreasing column indices.
    West,
}

impl Direction {
    /// All four directions in clockwise order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Reports whether the cell lies inside the tank grid.
    #[must_use]
    pub const fn in_grid(&self) -> bool {
        self.column < GRID_COLUMNS && self.row < GRID_ROWS
    }

    /// Translates the cell by a relative offset.
    ///
    /// Returns `None` when the result would have a negative coordinate. Grid
    /// bounds are not checked here; see [`CellCoord::in_grid`].
    #[must_use]
    pub fn offset_by(self, offset: Offset) -> Option<Self> {
        let column = i64::from(self.column) + i64::from(offset.dx());
        let row = i64::from(self.row) + i64::from(offset.dy());
        let column = u32::try_from(column).ok()?;
        let row = u32::try_from(row).ok()?;
        Some(Self::new(column, row))
    }

    /// Returns the orthogonal neighbour in the provided direction, if it exists.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<Self> {
        match direction {
            Direction::North => self.row.checked_sub(1).map(|row| Self::new(self.column, row)),
            Direction::East => self.column.checked_add(1).map(|column| Self::new(column, self.row)),
            Direction::South => self.row.checked_add(1).map(|row| Self::new(self.column, row)),
            Direction::West => self.column.checked_sub(1).map(|column| Self::new(column, self.row)),
        }
    }
}
