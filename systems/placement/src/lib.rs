#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid placement model for footprint-shaped pieces inside a tank.
//!
//! Every operation takes the current [`Tank`] by reference and returns a new
//! tank on success. A rejected operation leaves the caller's tank untouched,
//! so no partially applied placement is ever observable.

use reef_clash_core::{
    AppliedEffect, CellCoord, Piece, PieceId, PlacedPiece, PlacementError, Side, GRID_COLUMNS,
    GRID_ROWS,
};
use tracing::trace;

/// A side's collection of pieces together with its occupancy grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tank {
    owner: Side,
    placed: Vec<PlacedPiece>,
    bench: Vec<Piece>,
    occupancy: OccupancyGrid,
}

impl Tank {
    /// Creates an empty tank owned by `owner`.
    #[must_use]
    pub fn new(owner: Side) -> Self {
        Self {
            owner,
            placed: Vec::new(),
            bench: Vec::new(),
            occupancy: OccupancyGrid::new(GRID_COLUMNS, GRID_ROWS),
        }
    }

    /// Side that owns the tank.
    #[must_use]
    pub const fn owner(&self) -> Side {
        self.owner
    }

    /// Placed pieces in placement order.
    #[must_use]
    pub fn placed(&self) -> &[PlacedPiece] {
        &self.placed
    }

    /// Pieces bought but not yet placed, in purchase order.
    #[must_use]
    pub fn bench(&self) -> &[Piece] {
        &self.bench
    }

    /// Looks up a placed piece.
    #[must_use]
    pub fn placed_piece(&self, id: PieceId) -> Option<&PlacedPiece> {
        self.placed.iter().find(|placed| placed.id() == id)
    }

    /// Looks up a benched piece.
    #[must_use]
    pub fn benched_piece(&self, id: PieceId) -> Option<&Piece> {
        self.bench.iter().find(|piece| piece.id() == id)
    }

    /// Reports whether the piece is placed or benched in this tank.
    #[must_use]
    pub fn contains(&self, id: PieceId) -> bool {
        self.placed_piece(id).is_some() || self.benched_piece(id).is_some()
    }

    /// Returns the piece occupying the provided cell, if any.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<PieceId> {
        self.occupancy.occupant(cell)
    }

    /// Lists every occupied cell in row-major order.
    #[must_use]
    pub fn occupied_cells(&self) -> Vec<CellCoord> {
        self.occupancy.occupied().collect()
    }

    /// Number of cells currently occupied.
    #[must_use]
    pub fn occupied_count(&self) -> u32 {
        u32::try_from(self.occupancy.occupied().count()).unwrap_or(u32::MAX)
    }

    /// Adds an unplaced piece to the bench.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::DuplicatePiece`] when the piece is already in the tank.
    pub fn with_benched(&self, piece: Piece) -> Result<Self, PlacementError> {
        if self.contains(piece.id()) {
            return Err(PlacementError::DuplicatePiece);
        }
        let mut next = self.clone();
        next.bench.push(piece);
        Ok(next)
    }

    /// Applies a consumable effect to a placed piece.
    ///
    /// Returns `false` when the piece is not placed in this tank.
    pub fn apply_effect(&mut self, id: PieceId, effect: AppliedEffect) -> bool {
        match self.placed.iter_mut().find(|placed| placed.id() == id) {
            Some(placed) => {
                placed.apply_effect(effect);
                true
            }
            None => false,
        }
    }
}

/// Piece released by [`remove`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Removed {
    /// The piece was placed on the grid.
    Placed(PlacedPiece),
    /// The piece was waiting on the bench.
    Benched(Piece),
}

impl Removed {
    /// Underlying piece regardless of where it was stored.
    #[must_use]
    pub fn piece(&self) -> &Piece {
        match self {
            Self::Placed(placed) => placed.piece(),
            Self::Benched(piece) => piece,
        }
    }
}

/// Reports whether `piece` fits at `origin`.
///
/// Cells owned by the same piece count as free so in-place moves validate.
#[must_use]
pub fn can_place(tank: &Tank, piece: &Piece, origin: CellCoord) -> bool {
    footprint_cells(tank, piece, origin).is_ok()
}

/// Places a piece that is not yet in the tank.
///
/// # Errors
///
/// Returns [`PlacementError`] when the footprint leaves the grid, overlaps
/// another piece, or the piece is already in the tank.
pub fn place(tank: &Tank, piece: Piece, origin: CellCoord) -> Result<Tank, PlacementError> {
    if tank.contains(piece.id()) {
        return Err(PlacementError::DuplicatePiece);
    }

    let cells = footprint_cells(tank, &piece, origin)?;
    let mut next = tank.clone();
    next.occupancy.occupy_all(piece.id(), &cells);
    trace!(piece = piece.id().get(), ?origin, "piece placed");
    next.placed.push(PlacedPiece::new(piece, origin));
    Ok(next)
}

/// Moves a benched piece onto the grid.
///
/// # Errors
///
/// Returns [`PlacementError::MissingPiece`] when the piece is not benched, or
/// the placement error for an invalid origin.
pub fn place_from_bench(tank: &Tank, id: PieceId, origin: CellCoord) -> Result<Tank, PlacementError> {
    let index = tank
        .bench
        .iter()
        .position(|piece| piece.id() == id)
        .ok_or(PlacementError::MissingPiece)?;

    let piece = &tank.bench[index];
    let cells = footprint_cells(tank, piece, origin)?;

    let mut next = tank.clone();
    let piece = next.bench.remove(index);
    next.occupancy.occupy_all(id, &cells);
    next.placed.push(PlacedPiece::new(piece, origin));
    Ok(next)
}

/// Moves a placed piece to a new origin.
///
/// The piece's own cells are cleared before validation; on failure the
/// original tank is left as it was.
///
/// # Errors
///
/// Returns [`PlacementError::MissingPiece`] when the piece is not placed, or
/// the placement error for an invalid origin.
pub fn move_piece(tank: &Tank, id: PieceId, origin: CellCoord) -> Result<Tank, PlacementError> {
    let index = tank
        .placed
        .iter()
        .position(|placed| placed.id() == id)
        .ok_or(PlacementError::MissingPiece)?;

    let mut next = tank.clone();
    let current = next.placed.remove(index);
    next.occupancy.vacate_all(&current.cells());

    let cells = footprint_cells(&next, current.piece(), origin)?;
    next.occupancy.occupy_all(id, &cells);
    next.placed.insert(index, current.relocated(origin));
    Ok(next)
}

/// Removes a placed or benched piece, clearing every cell it owned.
///
/// # Errors
///
/// Returns [`PlacementError::MissingPiece`] when the piece is not in the tank.
pub fn remove(tank: &Tank, id: PieceId) -> Result<(Tank, Removed), PlacementError> {
    let mut next = tank.clone();

    if let Some(index) = next.placed.iter().position(|placed| placed.id() == id) {
        let placed = next.placed.remove(index);
        next.occupancy.vacate_all(&placed.cells());
        return Ok((next, Removed::Placed(placed)));
    }

    if let Some(index) = next.bench.iter().position(|piece| piece.id() == id) {
        let piece = next.bench.remove(index);
        return Ok((next, Removed::Benched(piece)));
    }

    Err(PlacementError::MissingPiece)
}

/// Enumerates every origin where `piece` currently fits, in row-major order.
#[must_use]
pub fn valid_origins(tank: &Tank, piece: &Piece) -> Vec<CellCoord> {
    (0..GRID_ROWS)
        .flat_map(|row| (0..GRID_COLUMNS).map(move |column| CellCoord::new(column, row)))
        .filter(|origin| can_place(tank, piece, *origin))
        .collect()
}

fn footprint_cells(
    tank: &Tank,
    piece: &Piece,
    origin: CellCoord,
) -> Result<Vec<CellCoord>, PlacementError> {
    let cells = piece
        .template()
        .footprint
        .cells_at(origin)
        .ok_or(PlacementError::OutOfBounds)?;

    let blocked = cells.iter().any(|cell| {
        tank.occupancy
            .occupant(*cell)
            .is_some_and(|occupant| occupant != piece.id())
    });
    if blocked {
        return Err(PlacementError::Occupied);
    }

    Ok(cells)
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct OccupancyGrid {
    columns: u32,
    rows: u32,
    cells: Vec<Option<PieceId>>,
}

impl OccupancyGrid {
    fn new(columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![None; capacity],
        }
    }

    fn occupant(&self, cell: CellCoord) -> Option<PieceId> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    fn occupied(&self) -> impl Iterator<Item = CellCoord> + '_ {
        let columns = self.columns.max(1);
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .filter_map(move |(index, _)| {
                let index = u32::try_from(index).ok()?;
                Some(CellCoord::new(index % columns, index / columns))
            })
    }

    fn occupy_all(&mut self, piece: PieceId, cells: &[CellCoord]) {
        for cell in cells {
            if let Some(slot) = self.index(*cell).and_then(|index| self.cells.get_mut(index)) {
                *slot = Some(piece);
            }
        }
    }

    fn vacate_all(&mut self, cells: &[CellCoord]) {
        for cell in cells {
            if let Some(slot) = self.index(*cell).and_then(|index| self.cells.get_mut(index)) {
                *slot = None;
            }
        }
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reef_clash_core::Catalog;

    fn piece(id: u32, key: &str) -> Piece {
        let catalog = Catalog::standard();
        Piece::new(PieceId::new(id), catalog.get(key).expect("template").clone())
    }

    #[test]
    fn occupancy_index_is_row_major() {
        let grid = OccupancyGrid::new(GRID_COLUMNS, GRID_ROWS);
        assert_eq!(grid.index(CellCoord::new(0, 0)), Some(0));
        assert_eq!(grid.index(CellCoord::new(3, 2)), Some(19));
        assert_eq!(grid.index(CellCoord::new(8, 0)), None);
    }

    #[test]
    fn in_place_move_validates_against_own_cells() {
        let tank = place(&Tank::new(Side::Player), piece(1, "oscar"), CellCoord::new(0, 0))
            .expect("oscar fits");
        let oscar = tank.placed_piece(PieceId::new(1)).expect("placed").piece().clone();
        assert!(can_place(&tank, &oscar, CellCoord::new(1, 0)));
        assert!(can_place(&tank, &oscar, CellCoord::new(0, 0)));
    }

    #[test]
    fn removing_a_benched_piece_leaves_the_grid_alone() {
        let tank = Tank::new(Side::Opponent)
            .with_benched(piece(4, "anubias"))
            .expect("bench");
        let (next, removed) = remove(&tank, PieceId::new(4)).expect("benched piece");
        assert!(matches!(removed, Removed::Benched(_)));
        assert!(next.bench().is_empty());
        assert!(next.occupied_cells().is_empty());
    }
}
