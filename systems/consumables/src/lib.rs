#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Battle-entry resolution of one-shot consumables.
//!
//! Both sides run through the same [`resolve`] function so the rules for the
//! player and the opponent can never diverge.

use reef_clash_core::{AppliedEffect, PieceCategory, PieceId, StatBonus, Timestamp};
use reef_clash_system_placement::{remove, Tank};
use reef_clash_system_synergy::adjacent_pieces;
use tracing::debug;

/// Buff applied to a single creature during resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedEffect {
    /// Creature that received the buff.
    pub target: PieceId,
    /// Effect appended to the creature's history.
    pub effect: AppliedEffect,
}

/// Result of resolving a side's consumables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Tank with buffs applied and every placed consumable removed.
    pub tank: Tank,
    /// Buffs in application order.
    pub effects: Vec<ResolvedEffect>,
    /// Consumables removed from the grid, in placement order.
    pub consumed: Vec<PieceId>,
    /// Benched consumables dropped without effect, in bench order.
    pub discarded: Vec<PieceId>,
}

/// Applies every placed consumable to its adjacent creatures, then removes
/// all placed consumables whether or not they found a target.
///
/// Consumables still on the bench are discarded without effect. Other
/// benched pieces stay where they are.
#[must_use]
pub fn resolve(tank: &Tank, stamp: Timestamp) -> Resolution {
    let consumables: Vec<PieceId> = tank
        .placed()
        .iter()
        .filter(|placed| placed.template().category == PieceCategory::Consumable)
        .map(|placed| placed.id())
        .collect();

    let discarded: Vec<PieceId> = tank
        .bench()
        .iter()
        .filter(|piece| piece.category() == PieceCategory::Consumable)
        .map(|piece| piece.id())
        .collect();

    let mut working = tank.clone();
    let mut effects = Vec::new();

    for source in &consumables {
        let Some(consumable) = tank.placed_piece(*source) else {
            continue;
        };
        let Some(bonus) = consumable.template().bonus else {
            continue;
        };

        let targets: Vec<PieceId> = adjacent_pieces(tank, *source)
            .into_iter()
            .filter(|neighbour| neighbour.template().category == PieceCategory::Creature)
            .map(|neighbour| neighbour.id())
            .collect();

        for target in targets {
            let effect = AppliedEffect {
                source: *source,
                source_name: consumable.template().name.clone(),
                description: format!("{}: {}", consumable.template().name, describe(bonus)),
                bonus,
                stamp,
            };
            if working.apply_effect(target, effect.clone()) {
                effects.push(ResolvedEffect { target, effect });
            }
        }
    }

    for source in consumables.iter().chain(&discarded) {
        if let Ok((next, _)) = remove(&working, *source) {
            working = next;
        }
    }

    debug!(
        owner = ?tank.owner(),
        consumed = consumables.len(),
        discarded = discarded.len(),
        buffs = effects.len(),
        "consumables resolved"
    );

    Resolution {
        tank: working,
        effects,
        consumed: consumables,
        discarded,
    }
}

/// Formats a bonus as `+2 attack, +1 health`.
#[must_use]
pub fn describe(bonus: StatBonus) -> String {
    let parts: Vec<String> = [
        (bonus.attack, "attack"),
        (bonus.health, "health"),
        (bonus.speed, "speed"),
    ]
    .into_iter()
    .filter(|(amount, _)| *amount > 0)
    .map(|(amount, stat)| format!("+{amount} {stat}"))
    .collect();

    if parts.is_empty() {
        "no effect".to_owned()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_lists_nonzero_stats() {
        assert_eq!(describe(StatBonus::new(2, 0, 0)), "+2 attack");
        assert_eq!(describe(StatBonus::new(1, 1, 1)), "+1 attack, +1 health, +1 speed");
        assert_eq!(describe(StatBonus::default()), "no effect");
    }
}
