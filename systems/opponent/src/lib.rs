#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Heuristic drafting agent for the autonomous side.
//!
//! The drafter owns no rules of its own: it rerolls and buys through the same
//! shop, ledger and placement code the player uses, and only decides *what*
//! to do with them.

use std::collections::BTreeSet;

use rand::Rng;
use reef_clash_core::{
    Catalog, PieceCategory, PieceId, PieceIdAllocator, PieceTemplate, Rarity, Tag, Timestamp,
    GRID_CELLS,
};
use reef_clash_system_economy::{reroll_cost, Account};
use reef_clash_system_placement::{place, valid_origins, Tank};
use reef_clash_system_shop::{Sampling, Shop};
use tracing::{debug, info};

/// Most rerolls the drafter takes in a round.
pub const MAX_REROLLS: u32 = 2;

/// Most rerolls the drafter takes in the opening rounds.
pub const OPENING_MAX_REROLLS: u32 = 1;

/// Minimum gold the drafter aims to spend each round.
pub const MIN_SPEND_TARGET: u32 = 6;

/// Relative improvement a fresh shop must show before a reroll is adopted.
pub const REROLL_IMPROVEMENT: f64 = 1.1;

/// Stage of the campaign that selects the purchase priority function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DraftPhase {
    /// Rounds 1 to 3: cheap, efficient stats.
    Early,
    /// Rounds 4 to 6: attack and flora, apparatus or rare synergy.
    Mid,
    /// Round 7 onwards: raw stats, rarity and price.
    Late,
}

impl DraftPhase {
    /// Phase for the provided one-based round.
    #[must_use]
    pub const fn for_round(round: u32) -> Self {
        if round <= 3 {
            Self::Early
        } else if round <= 6 {
            Self::Mid
        } else {
            Self::Late
        }
    }

    /// Average shop score below which a reroll is considered.
    #[must_use]
    pub const fn reroll_threshold(self) -> f64 {
        match self {
            Self::Early => 2.5,
            Self::Mid => 3.0,
            Self::Late => 3.5,
        }
    }
}

/// Number of rerolls the drafter may take with `gold` in `round`.
#[must_use]
pub fn reroll_budget(gold: u32, round: u32) -> u32 {
    let budget = (gold / 6).min(MAX_REROLLS);
    if round <= 3 {
        budget.min(OPENING_MAX_REROLLS)
    } else {
        budget
    }
}

/// Gold the drafter tries to spend in a round.
#[must_use]
pub fn spend_target(gold: u32, round: u32) -> u32 {
    let seventy_percent = gold.saturating_mul(7) / 10;
    seventy_percent
        .min(round.saturating_mul(2))
        .max(MIN_SPEND_TARGET)
}

/// Largest number of occupied cells the drafter allows in a round.
#[must_use]
pub fn board_cap(round: u32) -> u32 {
    round.saturating_add(1).saturating_mul(6).min(GRID_CELLS)
}

/// Scoring bonus for a rarity tier.
#[must_use]
pub fn rarity_bonus(rarity: Rarity) -> f64 {
    f64::from(rarity.tier()) * 0.5
}

/// Tags present anywhere in the tank, placed or benched.
#[must_use]
pub fn collection_tags(tank: &Tank) -> BTreeSet<Tag> {
    tank.placed()
        .iter()
        .map(|placed| placed.piece())
        .chain(tank.bench())
        .flat_map(|piece| piece.template().tags.iter().copied())
        .collect()
}

fn shared_tags(template: &PieceTemplate, tags: &BTreeSet<Tag>) -> f64 {
    let shared = template.tags.intersection(tags).count();
    f64::from(u32::try_from(shared).unwrap_or(u32::MAX))
}

fn efficiency(template: &PieceTemplate) -> f64 {
    let raw = f64::from(template.stats.attack) + f64::from(template.stats.health);
    raw / f64::from(template.cost.max(1))
}

/// Average quality of the offers affordable with `gold`; zero when none are.
#[must_use]
pub fn shop_score(shop: &Shop, tags: &BTreeSet<Tag>, gold: u32) -> f64 {
    let scores: Vec<f64> = shop
        .offers()
        .map(|(_, piece)| piece.template())
        .filter(|template| template.cost <= gold)
        .map(|template| {
            efficiency(template) + rarity_bonus(template.rarity) + shared_tags(template, tags)
        })
        .collect();

    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / f64::from(u32::try_from(scores.len()).unwrap_or(u32::MAX))
    }
}

/// Purchase priority of a template in the provided phase.
#[must_use]
pub fn priority(template: &PieceTemplate, phase: DraftPhase, tags: &BTreeSet<Tag>) -> f64 {
    let stats = template.stats;
    let base = match phase {
        DraftPhase::Early => {
            let cheap = if template.cost <= 3 { 1.0 } else { 0.0 };
            efficiency(template) + cheap
        }
        DraftPhase::Mid => {
            let supportive = matches!(
                template.category,
                PieceCategory::Flora | PieceCategory::Apparatus
            );
            let synergy = if supportive { 1.5 } else { 0.0 };
            let rare = if template.rarity >= Rarity::Rare { 1.0 } else { 0.0 };
            f64::from(stats.attack) + synergy + rare
        }
        DraftPhase::Late => {
            let raw = f64::from(stats.attack) + f64::from(stats.health);
            raw / 2.0 + f64::from(template.rarity.tier()) + f64::from(template.cost) * 0.5
        }
    };
    base + shared_tags(template, tags) * 0.5
}

/// Everything the drafter works on for one round.
#[derive(Clone, Debug)]
pub struct DraftInput {
    /// One-based campaign round.
    pub round: u32,
    /// The drafter's current shop.
    pub shop: Shop,
    /// The drafter's tank.
    pub tank: Tank,
    /// The drafter's account.
    pub account: Account,
    /// Shared identifier allocator.
    pub ids: PieceIdAllocator,
    /// Logical time of the first transaction the draft records.
    pub stamp: Timestamp,
}

/// Result of a drafting pass.
#[derive(Clone, Debug)]
pub struct Draft {
    /// Shop after rerolls and purchases.
    pub shop: Shop,
    /// Tank with every purchase placed.
    pub tank: Tank,
    /// Account after every debit.
    pub account: Account,
    /// Allocator after any rerolls.
    pub ids: PieceIdAllocator,
    /// Next unused logical time.
    pub stamp: Timestamp,
    /// Pieces bought and placed, in purchase order.
    pub purchases: Vec<PieceId>,
    /// Rerolls paid for.
    pub rerolls: u32,
    /// Affordable picks skipped because no origin fitted them.
    pub skipped: u32,
}

/// Drafting agent bound to a catalog and sampling strategy.
#[derive(Clone, Copy, Debug)]
pub struct Drafter<'a> {
    catalog: &'a Catalog,
    sampling: Sampling,
}

impl<'a> Drafter<'a> {
    /// Creates a drafter that rerolls from `catalog` using `sampling`.
    #[must_use]
    pub const fn new(catalog: &'a Catalog, sampling: Sampling) -> Self {
        Self { catalog, sampling }
    }

    /// Rerolls while it pays off, then buys and places ranked offers.
    pub fn draft<R>(&self, input: DraftInput, rng: &mut R) -> Draft
    where
        R: Rng + ?Sized,
    {
        let DraftInput {
            round,
            mut shop,
            mut tank,
            mut account,
            mut ids,
            mut stamp,
        } = input;
        let tags = collection_tags(&tank);
        let phase = DraftPhase::for_round(round);

        let mut rerolls = 0;
        let budget = reroll_budget(account.gold(), round);
        while rerolls < budget {
            let gold = account.gold();
            let current = shop_score(&shop, &tags, gold);
            if current >= phase.reroll_threshold() {
                break;
            }

            let cost = reroll_cost(rerolls);
            let cheapest = shop.cheapest().unwrap_or(0);
            if gold < cost.saturating_add(cheapest) {
                break;
            }

            let fresh = shop.reroll(self.catalog, self.sampling, &mut ids, rng);
            let fresh_score = shop_score(&fresh, &tags, gold - cost);
            if fresh_score < current * REROLL_IMPROVEMENT {
                debug!(current, fresh_score, "opponent kept its shop");
                break;
            }

            if account.reroll(cost, round, stamp).is_err() {
                break;
            }
            stamp = stamp.next();
            shop = fresh;
            rerolls += 1;
        }

        let target = spend_target(account.gold(), round);
        let cap = board_cap(round);
        let mut ranked: Vec<(f64, PieceId)> = shop
            .offers()
            .map(|(_, piece)| (priority(piece.template(), phase, &tags), piece.id()))
            .collect();
        ranked.sort_by(|left, right| right.0.total_cmp(&left.0));

        let mut spent = 0_u32;
        let mut purchases = Vec::new();
        let mut skipped = 0;
        for (_, id) in ranked {
            if spent >= target {
                break;
            }
            let Some((_, offer)) = shop.find(id) else {
                continue;
            };
            let cost = offer.cost();
            let area = offer.template().footprint.area();
            if cost > account.gold() || tank.occupied_count().saturating_add(area) > cap {
                continue;
            }

            let origins = valid_origins(&tank, offer);
            if origins.is_empty() {
                skipped += 1;
                continue;
            }
            let origin = origins[rng.gen_range(0..origins.len())];

            let Ok((next_shop, _, piece)) = shop.take(id) else {
                continue;
            };
            let next_tank = match place(&tank, piece.clone(), origin) {
                Ok(next_tank) => next_tank,
                Err(error) => {
                    debug!(?error, "opponent placement failed");
                    continue;
                }
            };
            if account.purchase(&piece, round, stamp).is_err() {
                continue;
            }
            stamp = stamp.next();
            tank = next_tank;
            shop = next_shop;
            spent += cost;
            purchases.push(id);
        }

        info!(
            round,
            purchases = purchases.len(),
            rerolls,
            gold = account.gold(),
            "opponent drafted"
        );

        Draft {
            shop,
            tank,
            account,
            ids,
            stamp,
            purchases,
            rerolls,
            skipped,
        }
    }
}
