#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Round-based battle resolver between two tanks.
//!
//! A [`Battle`] moves through `Idle -> Resolving -> Concluded`. Every round is
//! a pure function of the current snapshot and the injected random source, so
//! a presentation layer may step it on a timer or resolve it in one call and
//! observe the same log for the same seed.

use rand::Rng;
use reef_clash_core::{BattleOutcome, PieceCategory, PieceId, Side, Stats, Tag};
use reef_clash_system_placement::Tank;
use reef_clash_system_synergy::{enhanced_stats, water_quality};
use tracing::{debug, info};

/// Maximum number of rounds fought before remaining health decides the battle.
pub const BATTLE_ROUND_CAP: u32 = 10;

/// Water quality below which a side deals reduced damage and suffers each round.
pub const POOR_WATER_BELOW: u8 = 3;

/// Water quality above which a side deals increased damage.
pub const CLEAN_WATER_ABOVE: u8 = 7;

/// Damage multiplier in tenths for the provided water quality.
#[must_use]
pub const fn damage_multiplier_tenths(water_quality: u8) -> u32 {
    if water_quality < POOR_WATER_BELOW {
        7
    } else if water_quality > CLEAN_WATER_ABOVE {
        12
    } else {
        10
    }
}

/// Damage dealt by an attack after water-quality scaling, rounded down.
#[must_use]
pub const fn scaled_damage(attack: u32, water_quality: u8) -> u32 {
    attack.saturating_mul(damage_multiplier_tenths(water_quality)) / 10
}

/// Unavoidable damage a piece takes each round in poor water.
#[must_use]
pub fn environmental_damage(max_health: u32) -> u32 {
    (max_health / 10).max(1)
}

/// Immutable description of a piece entering a battle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Combatant {
    /// Piece the combatant was built from.
    pub id: PieceId,
    /// Display name.
    pub name: String,
    /// Enhanced stats at battle entry.
    pub stats: Stats,
    /// Whether the combatant takes turns.
    pub attacks: bool,
}

impl Combatant {
    /// Creates a combatant with explicit stats.
    #[must_use]
    pub fn new(id: PieceId, name: impl Into<String>, stats: Stats, attacks: bool) -> Self {
        Self {
            id,
            name: name.into(),
            stats,
            attacks,
        }
    }
}

/// One side's combatants together with its fixed water quality.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleRoster {
    /// Side the roster fights for.
    pub side: Side,
    /// Combatants in roster order.
    pub combatants: Vec<Combatant>,
    /// Water quality fixed for the whole battle.
    pub water_quality: u8,
}

impl BattleRoster {
    /// Creates a roster from explicit combatants.
    #[must_use]
    pub fn new(side: Side, combatants: Vec<Combatant>, water_quality: u8) -> Self {
        Self {
            side,
            combatants,
            water_quality,
        }
    }

    /// Snapshots the placed pieces of a tank using their enhanced stats.
    ///
    /// Consumables never fight; they are expected to be resolved beforehand.
    #[must_use]
    pub fn from_tank(tank: &Tank) -> Self {
        let combatants = tank
            .placed()
            .iter()
            .filter(|placed| placed.template().category != PieceCategory::Consumable)
            .filter_map(|placed| {
                let stats = enhanced_stats(tank, placed.id())?.enhanced;
                let template = placed.template();
                let attacks = template.category == PieceCategory::Creature
                    || template.has_tag(Tag::Aggressive);
                Some(Combatant::new(placed.id(), template.name.clone(), stats, attacks))
            })
            .collect();

        Self::new(tank.owner(), combatants, water_quality(tank))
    }
}

/// Lifecycle of a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BattlePhase {
    /// No round has been fought yet.
    Idle,
    /// At least one round was fought and the battle is still open.
    Resolving,
    /// The battle ended with the provided outcome.
    Concluded(BattleOutcome),
}

/// Ordered record of everything that happened in a battle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BattleEvent {
    /// A combatant attacked an enemy.
    Attack {
        /// One-based round number.
        round: u32,
        /// Side of the attacker.
        side: Side,
        /// Attacking piece.
        attacker: PieceId,
        /// Piece that was hit.
        target: PieceId,
        /// Damage dealt after water scaling.
        damage: u32,
        /// Whether the hit reduced the target to zero health.
        defeated: bool,
    },
    /// Poor water damaged every living combatant of a side.
    Environment {
        /// One-based round number.
        round: u32,
        /// Side whose water hurt its pieces.
        side: Side,
        /// Total damage applied across the side.
        damage: u32,
        /// Number of combatants that died from it.
        defeated: u32,
    },
    /// The battle ended.
    Concluded {
        /// Round in which the battle ended.
        round: u32,
        /// Final outcome.
        outcome: BattleOutcome,
    },
}

/// Final summary returned by [`Battle::resolve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleReport {
    /// Final outcome.
    pub outcome: BattleOutcome,
    /// Number of rounds fought.
    pub rounds: u32,
    /// Full event log in order.
    pub events: Vec<BattleEvent>,
    /// Total remaining health per side, in roster order.
    pub remaining_health: [(Side, u32); 2],
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Fighter {
    combatant: Combatant,
    health: u32,
}

impl Fighter {
    const fn alive(&self) -> bool {
        self.health > 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Squad {
    side: Side,
    water_quality: u8,
    fighters: Vec<Fighter>,
}

impl Squad {
    fn from_roster(roster: BattleRoster) -> Self {
        let fighters = roster
            .combatants
            .into_iter()
            .map(|combatant| Fighter {
                health: combatant.stats.max_health,
                combatant,
            })
            .collect();
        Self {
            side: roster.side,
            water_quality: roster.water_quality,
            fighters,
        }
    }

    fn remaining_health(&self) -> u32 {
        self.fighters
            .iter()
            .fold(0_u32, |total, fighter| total.saturating_add(fighter.health))
    }

    fn has_living_attacker(&self) -> bool {
        self.fighters
            .iter()
            .any(|fighter| fighter.alive() && fighter.combatant.attacks)
    }
}

/// Resumable battle between two rosters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Battle {
    squads: [Squad; 2],
    round: u32,
    phase: BattlePhase,
    log: Vec<BattleEvent>,
}

impl Battle {
    /// Creates an idle battle; every combatant starts at its enhanced max health.
    #[must_use]
    pub fn new(side_a: BattleRoster, side_b: BattleRoster) -> Self {
        Self {
            squads: [Squad::from_roster(side_a), Squad::from_roster(side_b)],
            round: 0,
            phase: BattlePhase::Idle,
            log: Vec::new(),
        }
    }

    /// Number of rounds fought so far.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> BattlePhase {
        self.phase
    }

    /// Outcome once the battle concluded.
    #[must_use]
    pub const fn outcome(&self) -> Option<BattleOutcome> {
        match self.phase {
            BattlePhase::Concluded(outcome) => Some(outcome),
            BattlePhase::Idle | BattlePhase::Resolving => None,
        }
    }

    /// Events recorded so far.
    #[must_use]
    pub fn log(&self) -> &[BattleEvent] {
        &self.log
    }

    /// Water quality the side fights with.
    #[must_use]
    pub fn water_quality(&self, side: Side) -> Option<u8> {
        self.squad(side).map(|squad| squad.water_quality)
    }

    /// Total remaining health of a side.
    #[must_use]
    pub fn remaining_health(&self, side: Side) -> u32 {
        self.squad(side).map_or(0, Squad::remaining_health)
    }

    /// Combatants of a side paired with their current health.
    pub fn combatants(&self, side: Side) -> impl Iterator<Item = (&Combatant, u32)> {
        self.squad(side)
            .into_iter()
            .flat_map(|squad| squad.fighters.iter())
            .map(|fighter| (&fighter.combatant, fighter.health))
    }

    /// Fights a single round; does nothing once the battle concluded.
    pub fn step<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        if matches!(self.phase, BattlePhase::Concluded(_)) {
            return;
        }

        self.phase = BattlePhase::Resolving;
        self.round += 1;
        self.attack_phase(rng);
        self.environment_phase();
        debug!(
            round = self.round,
            side_a = self.squads[0].remaining_health(),
            side_b = self.squads[1].remaining_health(),
            "battle round resolved"
        );

        if let Some(outcome) = self.conclusion() {
            self.phase = BattlePhase::Concluded(outcome);
            self.log.push(BattleEvent::Concluded {
                round: self.round,
                outcome,
            });
            info!(?outcome, rounds = self.round, "battle concluded");
        }
    }

    /// Fights rounds until the battle concludes and summarises it.
    pub fn resolve<R>(&mut self, rng: &mut R) -> BattleReport
    where
        R: Rng + ?Sized,
    {
        while self.outcome().is_none() {
            self.step(rng);
        }

        BattleReport {
            outcome: self.outcome().unwrap_or(BattleOutcome::Draw),
            rounds: self.round,
            events: self.log.clone(),
            remaining_health: [
                (self.squads[0].side, self.squads[0].remaining_health()),
                (self.squads[1].side, self.squads[1].remaining_health()),
            ],
        }
    }

    fn squad(&self, side: Side) -> Option<&Squad> {
        self.squads.iter().find(|squad| squad.side == side)
    }

    fn turn_order(&self) -> Vec<(usize, usize)> {
        let mut order: Vec<(usize, usize)> = self
            .squads
            .iter()
            .enumerate()
            .flat_map(|(squad_index, squad)| {
                squad
                    .fighters
                    .iter()
                    .enumerate()
                    .filter(|(_, fighter)| fighter.alive() && fighter.combatant.attacks)
                    .map(move |(fighter_index, _)| (squad_index, fighter_index))
            })
            .collect();

        // Stable sort: equal speeds keep side order, then roster order.
        order.sort_by_key(|(squad_index, fighter_index)| {
            std::cmp::Reverse(self.squads[*squad_index].fighters[*fighter_index].combatant.stats.speed)
        });
        order
    }

    fn attack_phase<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        for (squad_index, fighter_index) in self.turn_order() {
            let attacker = &self.squads[squad_index].fighters[fighter_index];
            if !attacker.alive() {
                continue;
            }
            let attacker_id = attacker.combatant.id;
            let damage = scaled_damage(
                attacker.combatant.stats.attack,
                self.squads[squad_index].water_quality,
            );

            let enemy_index = 1 - squad_index;
            let targets: Vec<usize> = self.squads[enemy_index]
                .fighters
                .iter()
                .enumerate()
                .filter(|(_, fighter)| fighter.alive())
                .map(|(index, _)| index)
                .collect();
            if targets.is_empty() {
                continue;
            }

            let target_index = targets[rng.gen_range(0..targets.len())];
            let target = &mut self.squads[enemy_index].fighters[target_index];
            target.health = target.health.saturating_sub(damage);
            self.log.push(BattleEvent::Attack {
                round: self.round,
                side: self.squads[squad_index].side,
                attacker: attacker_id,
                target: self.squads[enemy_index].fighters[target_index].combatant.id,
                damage,
                defeated: !self.squads[enemy_index].fighters[target_index].alive(),
            });
        }
    }

    fn environment_phase(&mut self) {
        for squad in &mut self.squads {
            if squad.water_quality >= POOR_WATER_BELOW {
                continue;
            }

            let mut damage = 0_u32;
            let mut defeated = 0_u32;
            for fighter in squad.fighters.iter_mut().filter(|fighter| fighter.alive()) {
                let hit = environmental_damage(fighter.combatant.stats.max_health).min(fighter.health);
                fighter.health -= hit;
                damage = damage.saturating_add(hit);
                if !fighter.alive() {
                    defeated += 1;
                }
            }

            if damage > 0 {
                self.log.push(BattleEvent::Environment {
                    round: self.round,
                    side: squad.side,
                    damage,
                    defeated,
                });
            }
        }
    }

    fn conclusion(&self) -> Option<BattleOutcome> {
        let [a, b] = &self.squads;
        match (a.has_living_attacker(), b.has_living_attacker()) {
            (false, false) => return Some(BattleOutcome::Draw),
            (true, false) => return Some(BattleOutcome::Victory(a.side)),
            (false, true) => return Some(BattleOutcome::Victory(b.side)),
            (true, true) => {}
        }

        if self.round < BATTLE_ROUND_CAP {
            return None;
        }

        let (a_health, b_health) = (a.remaining_health(), b.remaining_health());
        Some(match a_health.cmp(&b_health) {
            std::cmp::Ordering::Greater => BattleOutcome::Victory(a.side),
            std::cmp::Ordering::Less => BattleOutcome::Victory(b.side),
            std::cmp::Ordering::Equal => BattleOutcome::Draw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_scales_damage_with_floor() {
        assert_eq!(scaled_damage(4, 2), 2);
        assert_eq!(scaled_damage(4, 5), 4);
        assert_eq!(scaled_damage(4, 8), 4);
        assert_eq!(scaled_damage(5, 8), 6);
        assert_eq!(scaled_damage(1, 0), 0);
    }

    #[test]
    fn environmental_damage_has_a_floor_of_one() {
        assert_eq!(environmental_damage(3), 1);
        assert_eq!(environmental_damage(14), 1);
        assert_eq!(environmental_damage(25), 2);
    }
}
