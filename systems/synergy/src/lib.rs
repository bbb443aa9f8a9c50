#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that derives adjacency bonuses and water quality from a tank.
//!
//! Nothing here mutates a tank. Enhanced stats and water quality are computed
//! on demand from the current placement, so they can never drift from the
//! pieces that produced them.

use std::collections::BTreeSet;

use reef_clash_core::{
    CellCoord, Direction, PieceCategory, PieceId, PlacedPiece, StatBonus, Stats, Tag,
};
use reef_clash_system_placement::Tank;

/// Water quality of a tank before any piece is counted.
pub const BASE_WATER_QUALITY: u8 = 5;

/// Highest attainable water quality.
pub const MAX_WATER_QUALITY: u8 = 10;

/// Creatures a tank supports before water quality starts to drop.
pub const CREATURE_CAPACITY: u32 = 4;

/// Number of adjacent schooling creatures that doubles a neon-class speed.
pub const SCHOOL_SPEED_THRESHOLD: u32 = 3;

/// Single adjacency bonus contributing to a piece's enhanced stats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bonus {
    /// Piece that grants the bonus; schooling bonuses name the target itself.
    pub source: PieceId,
    /// Human-readable description for display.
    pub description: String,
    /// Additive change to the target's stats.
    pub delta: StatBonus,
}

/// Base and derived stats of a placed piece together with their explanation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnhancedStats {
    /// Current stats, including consumable effects already applied.
    pub base: Stats,
    /// Stats after every adjacency bonus.
    pub enhanced: Stats,
    /// Additive bonuses in evaluation order.
    pub bonuses: Vec<Bonus>,
    /// Whether the schooling speed doubling applied.
    pub speed_doubled: bool,
}

impl EnhancedStats {
    /// Descriptions of every active bonus, in evaluation order.
    #[must_use]
    pub fn descriptions(&self) -> Vec<&str> {
        let mut descriptions: Vec<&str> = self
            .bonuses
            .iter()
            .map(|bonus| bonus.description.as_str())
            .collect();
        if self.speed_doubled {
            descriptions.push("Schooling: speed doubled");
        }
        descriptions
    }
}

/// Orthogonal neighbours of every footprint cell, excluding the piece's own cells.
///
/// Cells are deduplicated, inside the grid and returned in row-major order.
#[must_use]
pub fn adjacent_cells(placed: &PlacedPiece) -> Vec<CellCoord> {
    let own: BTreeSet<CellCoord> = placed.cells().into_iter().collect();
    let neighbours: BTreeSet<CellCoord> = own
        .iter()
        .flat_map(|cell| Direction::ALL.into_iter().filter_map(|direction| cell.step(direction)))
        .filter(|cell| cell.in_grid() && !own.contains(cell))
        .collect();

    let mut cells: Vec<CellCoord> = neighbours.into_iter().collect();
    cells.sort_by_key(|cell| (cell.row(), cell.column()));
    cells
}

/// Distinct pieces occupying the adjacent set of `id`.
///
/// Returns an empty list when the piece is not placed in the tank.
#[must_use]
pub fn adjacent_pieces(tank: &Tank, id: PieceId) -> Vec<&PlacedPiece> {
    let Some(placed) = tank.placed_piece(id) else {
        return Vec::new();
    };

    let mut seen = BTreeSet::new();
    adjacent_cells(placed)
        .into_iter()
        .filter_map(|cell| tank.occupant(cell))
        .filter(|occupant| seen.insert(*occupant))
        .filter_map(|occupant| tank.placed_piece(occupant))
        .collect()
}

/// Computes the enhanced stats of a placed piece without mutating the tank.
///
/// Returns `None` when the piece is not placed in the tank.
#[must_use]
pub fn enhanced_stats(tank: &Tank, id: PieceId) -> Option<EnhancedStats> {
    let target = tank.placed_piece(id)?;
    let neighbours = adjacent_pieces(tank, id);
    let base = target.stats();
    let is_creature = target.template().category == PieceCategory::Creature;

    let mut bonuses = Vec::new();
    for neighbour in &neighbours {
        let template = neighbour.template();
        if template.category == PieceCategory::Flora && template.has_tag(Tag::Fern) {
            bonuses.push(Bonus {
                source: neighbour.id(),
                description: format!("{}: +1 attack, +1 health", template.name),
                delta: StatBonus::new(1, 1, 0),
            });
        }
        if template.category == PieceCategory::Flora && template.has_tag(Tag::Anubias) {
            bonuses.push(Bonus {
                source: neighbour.id(),
                description: format!("{}: +1 health", template.name),
                delta: StatBonus::new(0, 1, 0),
            });
        }
        if template.category == PieceCategory::Consumable && is_creature {
            bonuses.push(Bonus {
                source: neighbour.id(),
                description: format!("{} nearby: +1 attack, +1 health", template.name),
                delta: StatBonus::new(1, 1, 0),
            });
        }
    }

    let mut speed_doubled = false;
    if is_schooling_creature(target) {
        let school = neighbours
            .iter()
            .filter(|neighbour| is_schooling_creature(neighbour))
            .count();
        let count = u32::try_from(school).unwrap_or(u32::MAX);

        if count > 0 && target.template().has_tag(Tag::Neon) {
            bonuses.push(Bonus {
                source: target.id(),
                description: format!("Schooling: +{count} attack from {count} neighbours"),
                delta: StatBonus::new(count, 0, 0),
            });
            speed_doubled = count >= SCHOOL_SPEED_THRESHOLD;
        }
        if count > 0 && target.template().has_tag(Tag::Cardinal) {
            let attack = count.saturating_mul(2);
            bonuses.push(Bonus {
                source: target.id(),
                description: format!("Schooling: +{attack} attack from {count} neighbours"),
                delta: StatBonus::new(attack, 0, 0),
            });
        }
    }

    let mut enhanced = bonuses
        .iter()
        .fold(base, |stats, bonus| stats.boosted(bonus.delta));
    if speed_doubled {
        enhanced.speed = enhanced.speed.saturating_mul(2);
    }

    Some(EnhancedStats {
        base,
        enhanced,
        bonuses,
        speed_doubled,
    })
}

/// Aggregate water quality of the tank's placed pieces, in `0..=10`.
///
/// Starts at 5, gains one per flora or filtration piece and loses one per
/// creature beyond the fourth.
#[must_use]
pub fn water_quality(tank: &Tank) -> u8 {
    let mut improving = 0_i64;
    let mut creatures = 0_i64;
    for placed in tank.placed() {
        let template = placed.template();
        if template.category == PieceCategory::Flora || template.has_tag(Tag::Filtration) {
            improving += 1;
        }
        if template.category == PieceCategory::Creature {
            creatures += 1;
        }
    }

    let crowding = (creatures - i64::from(CREATURE_CAPACITY)).max(0);
    let quality = i64::from(BASE_WATER_QUALITY) + improving - crowding;
    let clamped = quality.clamp(0, i64::from(MAX_WATER_QUALITY));
    u8::try_from(clamped).unwrap_or(MAX_WATER_QUALITY)
}

fn is_schooling_creature(placed: &PlacedPiece) -> bool {
    placed.template().category == PieceCategory::Creature && placed.template().has_tag(Tag::Schooling)
}
