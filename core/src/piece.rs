//! Piece instances in their benched and placed forms.

use std::sync::Arc;

use crate::{CellCoord, PieceCategory, PieceId, PieceTemplate, StatBonus, Stats, Tag, Timestamp};

/// A catalog template stamped with a unique instance identifier.
///
/// Unplaced pieces always carry their template's base statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Piece {
    id: PieceId,
    template: Arc<PieceTemplate>,
}

impl Piece {
    /// Stamps a template with the provided identifier.
    #[must_use]
    pub fn new(id: PieceId, template: Arc<PieceTemplate>) -> Self {
        Self { id, template }
    }

    /// Instance identifier.
    #[must_use]
    pub const fn id(&self) -> PieceId {
        self.id
    }

    /// Template the piece was drawn from.
    #[must_use]
    pub fn template(&self) -> &PieceTemplate {
        &self.template
    }

    /// Display name of the template.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.template.name
    }

    /// Category of the template.
    #[must_use]
    pub fn category(&self) -> PieceCategory {
        self.template.category
    }

    /// Purchase price of the template.
    #[must_use]
    pub fn cost(&self) -> u32 {
        self.template.cost
    }

    /// Reports whether the template carries the provided tag.
    #[must_use]
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.template.has_tag(tag)
    }
}

/// Record of a one-shot consumable bonus applied to a creature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedEffect {
    /// Consumable that granted the bonus.
    pub source: PieceId,
    /// Display name of the consumable.
    pub source_name: String,
    /// Human-readable description of the bonus.
    pub description: String,
    /// Bonus that was applied.
    pub bonus: StatBonus,
    /// Logical time the bonus was applied.
    pub stamp: Timestamp,
}

/// Whether a placed piece still has its template stats.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Enhancement {
    /// Template stats are current.
    #[default]
    Base,
    /// Consumables changed the stats; the template stats remain the baseline.
    Augmented {
        /// Current stats including every applied effect.
        stats: Stats,
        /// Effects in application order.
        effects: Vec<AppliedEffect>,
    },
}

/// A piece anchored at an origin cell inside a tank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedPiece {
    piece: Piece,
    origin: CellCoord,
    enhancement: Enhancement,
}

impl PlacedPiece {
    /// Anchors a base piece at `origin`.
    #[must_use]
    pub fn new(piece: Piece, origin: CellCoord) -> Self {
        Self {
            piece,
            origin,
            enhancement: Enhancement::Base,
        }
    }

    /// Underlying piece.
    #[must_use]
    pub const fn piece(&self) -> &Piece {
        &self.piece
    }

    /// Instance identifier.
    #[must_use]
    pub const fn id(&self) -> PieceId {
        self.piece.id
    }

    /// Template the piece was drawn from.
    #[must_use]
    pub fn template(&self) -> &PieceTemplate {
        self.piece.template()
    }

    /// Origin cell anchoring the footprint.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Enhancement state of the piece.
    #[must_use]
    pub const fn enhancement(&self) -> &Enhancement {
        &self.enhancement
    }

    /// Absolute cells covered by the footprint.
    #[must_use]
    pub fn cells(&self) -> Vec<CellCoord> {
        self.template()
            .footprint
            .cells_at(self.origin)
            .unwrap_or_default()
    }

    /// Current stats, including applied consumable effects.
    #[must_use]
    pub fn stats(&self) -> Stats {
        match &self.enhancement {
            Enhancement::Base => self.template().stats,
            Enhancement::Augmented { stats, .. } => *stats,
        }
    }

    /// Stats before any consumable effect was applied.
    #[must_use]
    pub fn original_stats(&self) -> Stats {
        self.template().stats
    }

    /// Consumable effects applied so far, oldest first.
    #[must_use]
    pub fn effects(&self) -> &[AppliedEffect] {
        match &self.enhancement {
            Enhancement::Base => &[],
            Enhancement::Augmented { effects, .. } => effects,
        }
    }

    /// Returns the same piece anchored at a different origin.
    #[must_use]
    pub fn relocated(mut self, origin: CellCoord) -> Self {
        self.origin = origin;
        self
    }

    /// Adds a consumable effect on top of the current stats.
    pub fn apply_effect(&mut self, effect: AppliedEffect) {
        let boosted = self.stats().boosted(effect.bonus);
        match &mut self.enhancement {
            Enhancement::Base => {
                self.enhancement = Enhancement::Augmented {
                    stats: boosted,
                    effects: vec![effect],
                };
            }
            Enhancement::Augmented { stats, effects } => {
                *stats = boosted;
                effects.push(effect);
            }
        }
    }

    /// Releases the underlying piece, discarding placement and effects.
    #[must_use]
    pub fn into_piece(self) -> Piece {
        self.piece
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Catalog;

    fn neon() -> PlacedPiece {
        let catalog = Catalog::standard();
        let template = catalog.get("neon_tetra").expect("neon tetra").clone();
        PlacedPiece::new(Piece::new(PieceId::new(3), template), CellCoord::new(1, 1))
    }

    fn effect(bonus: StatBonus) -> AppliedEffect {
        AppliedEffect {
            source: PieceId::new(9),
            source_name: "Bloodworms".to_owned(),
            description: "+2 attack".to_owned(),
            bonus,
            stamp: Timestamp::new(4),
        }
    }

    #[test]
    fn effects_accumulate_over_original_baseline() {
        let mut placed = neon();
        assert_eq!(placed.enhancement(), &Enhancement::Base);

        placed.apply_effect(effect(StatBonus::new(2, 0, 0)));
        placed.apply_effect(effect(StatBonus::new(0, 3, 1)));

        assert_eq!(placed.original_stats(), Stats::new(2, 3, 6));
        assert_eq!(placed.stats(), Stats::new(4, 6, 7));
        assert_eq!(placed.effects().len(), 2);
    }

    #[test]
    fn relocation_keeps_effects() {
        let mut placed = neon();
        placed.apply_effect(effect(StatBonus::new(1, 1, 1)));
        let moved = placed.relocated(CellCoord::new(4, 2));
        assert_eq!(moved.origin(), CellCoord::new(4, 2));
        assert_eq!(moved.cells(), vec![CellCoord::new(4, 2)]);
        assert_eq!(moved.effects().len(), 1);
    }
}
