#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shop generator that stamps catalog templates into fixed-size offer slots.

use std::sync::Arc;

use rand::{distributions::WeightedIndex, prelude::Distribution, seq::SliceRandom, Rng};
use reef_clash_core::{Catalog, Piece, PieceId, PieceIdAllocator, PieceTemplate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Strategy used to pick a template for each slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sampling {
    /// Every template is equally likely.
    #[default]
    Uniform,
    /// Templates are drawn in proportion to their rarity weight.
    Weighted,
}

/// Reasons a shop operation may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ShopError {
    /// The slot is out of range or empty.
    #[error("shop slot {0} holds no offer")]
    InvalidSlot(usize),
    /// No slot offers the piece.
    #[error("piece {0:?} is not offered")]
    UnknownPiece(PieceId),
}

/// Draws a single template from the catalog.
///
/// Returns `None` only for an empty catalog.
pub fn draw<R>(catalog: &Catalog, sampling: Sampling, rng: &mut R) -> Option<Arc<PieceTemplate>>
where
    R: Rng + ?Sized,
{
    let templates = catalog.templates();
    match sampling {
        Sampling::Uniform => templates.choose(rng).cloned(),
        Sampling::Weighted => {
            let weights = templates.iter().map(|template| template.rarity.weight());
            match WeightedIndex::new(weights) {
                Ok(distribution) => templates.get(distribution.sample(rng)).cloned(),
                Err(_) => templates.choose(rng).cloned(),
            }
        }
    }
}

/// Fills `slot_count` slots with independently drawn, freshly stamped pieces.
///
/// Duplicate templates across slots are expected.
pub fn generate<R>(
    catalog: &Catalog,
    slot_count: usize,
    sampling: Sampling,
    ids: &mut PieceIdAllocator,
    rng: &mut R,
) -> Vec<Option<Piece>>
where
    R: Rng + ?Sized,
{
    (0..slot_count)
        .map(|_| draw(catalog, sampling, rng).map(|template| Piece::new(ids.allocate(), template)))
        .collect()
}

/// Fixed-size array of shop offers with an optional locked slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Shop {
    slots: Vec<Option<Piece>>,
    locked: Option<usize>,
}

impl Shop {
    /// Creates a freshly stocked shop.
    pub fn stocked<R>(
        catalog: &Catalog,
        slot_count: usize,
        sampling: Sampling,
        ids: &mut PieceIdAllocator,
        rng: &mut R,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        Self::from_slots(generate(catalog, slot_count, sampling, ids, rng))
    }

    /// Wraps pre-drawn slots without a lock.
    #[must_use]
    pub fn from_slots(slots: Vec<Option<Piece>>) -> Self {
        Self {
            slots,
            locked: None,
        }
    }

    /// Offer slots in display order.
    #[must_use]
    pub fn slots(&self) -> &[Option<Piece>] {
        &self.slots
    }

    /// Currently locked slot, if any.
    #[must_use]
    pub const fn locked(&self) -> Option<usize> {
        self.locked
    }

    /// Iterates over occupied slots together with their index.
    pub fn offers(&self) -> impl Iterator<Item = (usize, &Piece)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|piece| (index, piece)))
    }

    /// Finds the slot offering the provided piece.
    #[must_use]
    pub fn find(&self, id: PieceId) -> Option<(usize, &Piece)> {
        self.offers().find(|(_, piece)| piece.id() == id)
    }

    /// Cheapest offer currently in the shop.
    #[must_use]
    pub fn cheapest(&self) -> Option<u32> {
        self.offers().map(|(_, piece)| piece.cost()).min()
    }

    /// Redraws every slot except the locked one, which keeps its occupant.
    #[must_use]
    pub fn reroll<R>(
        &self,
        catalog: &Catalog,
        sampling: Sampling,
        ids: &mut PieceIdAllocator,
        rng: &mut R,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        let slots = self
            .slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                if self.locked == Some(index) {
                    slot.clone()
                } else {
                    draw(catalog, sampling, rng).map(|template| Piece::new(ids.allocate(), template))
                }
            })
            .collect();

        debug!(locked = ?self.locked, "shop rerolled");
        Self {
            slots,
            locked: self.locked,
        }
    }

    /// Locks `slot`, or unlocks it when it is already the locked slot.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::InvalidSlot`] when the slot is missing or empty.
    pub fn toggle_lock(&self, slot: usize) -> Result<Self, ShopError> {
        if !matches!(self.slots.get(slot), Some(Some(_))) {
            return Err(ShopError::InvalidSlot(slot));
        }

        let mut next = self.clone();
        next.locked = if self.locked == Some(slot) {
            None
        } else {
            Some(slot)
        };
        Ok(next)
    }

    /// Removes the lock, if any.
    #[must_use]
    pub fn clear_lock(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            locked: None,
        }
    }

    /// Takes the offered piece out of its slot, leaving the slot empty.
    ///
    /// Taking the locked slot's occupant clears the lock.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::UnknownPiece`] when no slot offers the piece.
    pub fn take(&self, id: PieceId) -> Result<(Self, usize, Piece), ShopError> {
        let (index, _) = self.find(id).ok_or(ShopError::UnknownPiece(id))?;
        let mut next = self.clone();
        let piece = next
            .slots
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(ShopError::InvalidSlot(index))?;
        if next.locked == Some(index) {
            next.locked = None;
        }
        Ok((next, index, piece))
    }
}
