//! Static piece templates and the validated catalog that serves them.

use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CellCoord, GRID_CELLS};

/// Broad family a piece belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceCategory {
    /// Fish and invertebrates that take turns in battle.
    Creature,
    /// Plants that buff neighbours and improve water quality.
    Flora,
    /// Equipment such as filters and heaters.
    Apparatus,
    /// One-shot food that buffs adjacent creatures when a battle starts.
    Consumable,
}

/// Rarity tier of a template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    /// Most frequently offered tier.
    Common,
    /// Second tier.
    Uncommon,
    /// Third tier.
    Rare,
    /// Scarcest tier.
    Epic,
}

impl Rarity {
    /// Relative weight used when the shop samples by rarity.
    #[must_use]
    pub const fn weight(self) -> u32 {
        match self {
            Self::Common => 60,
            Self::Uncommon => 25,
            Self::Rare => 12,
            Self::Epic => 3,
        }
    }

    /// Zero-based tier index, higher meaning scarcer.
    #[must_use]
    pub const fn tier(self) -> u32 {
        match self {
            Self::Common => 0,
            Self::Uncommon => 1,
            Self::Rare => 2,
            Self::Epic => 3,
        }
    }
}

/// Descriptive tags that drive synergies, water quality and battle eligibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    /// Creature that gains strength from schooling neighbours.
    Schooling,
    /// Neon-class schooling variant.
    Neon,
    /// Cardinal-class schooling variant.
    Cardinal,
    /// Fern-class flora granting attack and health to neighbours.
    Fern,
    /// Anubias-class flora granting health to neighbours.
    Anubias,
    /// Improves water quality.
    Filtration,
    /// Takes turns in battle even when it is not a creature.
    Aggressive,
    /// Large hunter.
    Predator,
    /// Bottom feeder.
    Scavenger,
    /// Living plant.
    Plant,
    /// Mechanical equipment.
    Equipment,
    /// Edible consumable.
    Food,
}

/// Combat statistics of a piece.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stats {
    /// Damage dealt per attack before water-quality scaling.
    pub attack: u32,
    /// Current health.
    pub health: u32,
    /// Turn-order priority; higher acts first.
    pub speed: u32,
    /// Health ceiling.
    pub max_health: u32,
}

impl Stats {
    /// Creates stats at full health.
    #[must_use]
    pub const fn new(attack: u32, health: u32, speed: u32) -> Self {
        Self {
            attack,
            health,
            speed,
            max_health: health,
        }
    }

    /// Adds a flat bonus; health bonuses also raise the health ceiling.
    #[must_use]
    pub const fn boosted(self, bonus: StatBonus) -> Self {
        Self {
            attack: self.attack.saturating_add(bonus.attack),
            health: self.health.saturating_add(bonus.health),
            speed: self.speed.saturating_add(bonus.speed),
            max_health: self.max_health.saturating_add(bonus.health),
        }
    }
}

/// Flat additive stat bonus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatBonus {
    /// Attack added.
    #[serde(default)]
    pub attack: u32,
    /// Health and max health added.
    #[serde(default)]
    pub health: u32,
    /// Speed added.
    #[serde(default)]
    pub speed: u32,
}

impl StatBonus {
    /// Creates a new bonus.
    #[must_use]
    pub const fn new(attack: u32, health: u32, speed: u32) -> Self {
        Self {
            attack,
            health,
            speed,
        }
    }

    /// Reports whether the bonus changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.attack == 0 && self.health == 0 && self.speed == 0
    }
}

/// Relative grid offset from a piece's origin cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Offset {
    dx: i32,
    dy: i32,
}

impl Offset {
    /// Creates an offset of `dx` columns and `dy` rows.
    #[must_use]
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Column delta.
    #[must_use]
    pub const fn dx(&self) -> i32 {
        self.dx
    }

    /// Row delta.
    #[must_use]
    pub const fn dy(&self) -> i32 {
        self.dy
    }
}

impl From<(i32, i32)> for Offset {
    fn from((dx, dy): (i32, i32)) -> Self {
        Self::new(dx, dy)
    }
}

impl From<Offset> for (i32, i32) {
    fn from(offset: Offset) -> Self {
        (offset.dx, offset.dy)
    }
}

/// Set of offsets a piece occupies relative to its origin.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Footprint {
    offsets: Vec<Offset>,
}

impl Footprint {
    /// Creates a footprint from raw offsets.
    #[must_use]
    pub fn new(offsets: Vec<Offset>) -> Self {
        Self { offsets }
    }

    /// Footprint covering only the origin cell.
    #[must_use]
    pub fn single() -> Self {
        Self::rect(1, 1)
    }

    /// Rectangular footprint anchored at its upper-left cell.
    #[must_use]
    pub fn rect(width: i32, height: i32) -> Self {
        let offsets = (0..height)
            .flat_map(|dy| (0..width).map(move |dx| Offset::new(dx, dy)))
            .collect();
        Self { offsets }
    }

    /// Offsets composing the footprint.
    #[must_use]
    pub fn offsets(&self) -> &[Offset] {
        &self.offsets
    }

    /// Number of cells covered by the footprint.
    #[must_use]
    pub fn area(&self) -> u32 {
        u32::try_from(self.offsets.len()).unwrap_or(u32::MAX)
    }

    /// Resolves the absolute cells covered when anchored at `origin`.
    ///
    /// Returns `None` when any cell falls outside the tank grid.
    #[must_use]
    pub fn cells_at(&self, origin: CellCoord) -> Option<Vec<CellCoord>> {
        self.offsets
            .iter()
            .map(|offset| origin.offset_by(*offset).filter(CellCoord::in_grid))
            .collect()
    }
}

/// Immutable catalog entry describing a purchasable piece.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceTemplate {
    /// Stable lookup key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Broad family of the piece.
    pub category: PieceCategory,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Cells occupied relative to the origin.
    pub footprint: Footprint,
    /// Base statistics.
    #[serde(default)]
    pub stats: Stats,
    /// Descriptive tags.
    #[serde(default)]
    pub tags: BTreeSet<Tag>,
    /// Purchase price in gold.
    pub cost: u32,
    /// Human-readable ability descriptions.
    #[serde(default)]
    pub abilities: Vec<String>,
    /// One-shot bonus granted to adjacent creatures; consumables only.
    #[serde(default)]
    pub bonus: Option<StatBonus>,
}

impl PieceTemplate {
    /// Reports whether the template carries the provided tag.
    #[must_use]
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// Reports whether the piece takes turns in battle.
    #[must_use]
    pub fn attacks_in_battle(&self) -> bool {
        self.category == PieceCategory::Creature || self.has_tag(Tag::Aggressive)
    }
}

/// Configuration defects detected while loading catalog data.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The catalog contains no templates.
    #[error("catalog contains no templates")]
    Empty,
    /// Two templates share a key.
    #[error("duplicate template key `{0}`")]
    DuplicateKey(String),
    /// A template has an empty footprint.
    #[error("template `{0}` has an empty footprint")]
    EmptyFootprint(String),
    /// A template lists the same offset twice.
    #[error("template `{0}` repeats a footprint offset")]
    DuplicateOffset(String),
    /// A template cannot fit on an empty grid anywhere.
    #[error("template `{0}` covers more cells than the grid holds")]
    OversizedFootprint(String),
    /// A template is free.
    #[error("template `{0}` has zero cost")]
    ZeroCost(String),
    /// A non-consumable template has no health.
    #[error("template `{0}` has zero max health")]
    ZeroHealth(String),
    /// A template's health exceeds its max health.
    #[error("template `{0}` starts above its max health")]
    HealthAboveMax(String),
    /// A consumable has no bonus, or a non-consumable carries one.
    #[error("template `{0}` has a bonus that does not match its category")]
    BonusMismatch(String),
}

/// Validated, load-time fixed table of piece templates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    templates: Vec<Arc<PieceTemplate>>,
}

impl Catalog {
    /// Validates and wraps the provided templates.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] describing the first malformed template.
    pub fn new(templates: Vec<PieceTemplate>) -> Result<Self, CatalogError> {
        if templates.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut keys = HashSet::with_capacity(templates.len());
        for template in &templates {
            if !keys.insert(template.key.as_str()) {
                return Err(CatalogError::DuplicateKey(template.key.clone()));
            }
            validate(template)?;
        }

        Ok(Self {
            templates: templates.into_iter().map(Arc::new).collect(),
        })
    }

    /// Built-in aquarium catalog.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            templates: standard_templates().into_iter().map(Arc::new).collect(),
        }
    }

    /// Templates in catalog order.
    #[must_use]
    pub fn templates(&self) -> &[Arc<PieceTemplate>] {
        &self.templates
    }

    /// Looks up a template by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Arc<PieceTemplate>> {
        self.templates.iter().find(|template| template.key == key)
    }

    /// Number of templates in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Always false; an empty catalog is rejected at construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn validate(template: &PieceTemplate) -> Result<(), CatalogError> {
    let key = || template.key.clone();
    let offsets = template.footprint.offsets();
    if offsets.is_empty() {
        return Err(CatalogError::EmptyFootprint(key()));
    }

    let distinct: HashSet<&Offset> = offsets.iter().collect();
    if distinct.len() != offsets.len() {
        return Err(CatalogError::DuplicateOffset(key()));
    }

    if template.footprint.area() > GRID_CELLS {
        return Err(CatalogError::OversizedFootprint(key()));
    }

    if template.cost == 0 {
        return Err(CatalogError::ZeroCost(key()));
    }

    let consumable = template.category == PieceCategory::Consumable;
    if !consumable && template.stats.max_health == 0 {
        return Err(CatalogError::ZeroHealth(key()));
    }

    if template.stats.health > template.stats.max_health {
        return Err(CatalogError::HealthAboveMax(key()));
    }

    let has_bonus = template.bonus.is_some_and(|bonus| !bonus.is_empty());
    if consumable != has_bonus {
        return Err(CatalogError::BonusMismatch(key()));
    }

    Ok(())
}

struct Entry {
    key: &'static str,
    name: &'static str,
    category: PieceCategory,
    rarity: Rarity,
    footprint: Footprint,
    stats: Stats,
    tags: &'static [Tag],
    cost: u32,
    ability: &'static str,
    bonus: Option<StatBonus>,
}

impl From<Entry> for PieceTemplate {
    fn from(entry: Entry) -> Self {
        Self {
            key: entry.key.to_owned(),
            name: entry.name.to_owned(),
            category: entry.category,
            rarity: entry.rarity,
            footprint: entry.footprint,
            stats: entry.stats,
            tags: entry.tags.iter().copied().collect(),
            cost: entry.cost,
            abilities: if entry.ability.is_empty() {
                Vec::new()
            } else {
                vec![entry.ability.to_owned()]
            },
            bonus: entry.bonus,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn creature(
    key: &'static str,
    name: &'static str,
    rarity: Rarity,
    footprint: Footprint,
    stats: Stats,
    tags: &'static [Tag],
    cost: u32,
    ability: &'static str,
) -> PieceTemplate {
    Entry {
        key,
        name,
        category: PieceCategory::Creature,
        rarity,
        footprint,
        stats,
        tags,
        cost,
        ability,
        bonus: None,
    }
    .into()
}

#[allow(clippy::too_many_arguments)]
fn fixture(
    key: &'static str,
    name: &'static str,
    category: PieceCategory,
    rarity: Rarity,
    footprint: Footprint,
    stats: Stats,
    tags: &'static [Tag],
    cost: u32,
    ability: &'static str,
) -> PieceTemplate {
    Entry {
        key,
        name,
        category,
        rarity,
        footprint,
        stats,
        tags,
        cost,
        ability,
        bonus: None,
    }
    .into()
}

fn food(
    key: &'static str,
    name: &'static str,
    rarity: Rarity,
    bonus: StatBonus,
    cost: u32,
    ability: &'static str,
) -> PieceTemplate {
    Entry {
        key,
        name,
        category: PieceCategory::Consumable,
        rarity,
        footprint: Footprint::single(),
        stats: Stats::default(),
        tags: &[Tag::Food],
        cost,
        ability,
        bonus: Some(bonus),
    }
    .into()
}

#[allow(clippy::too_many_lines)]
fn standard_templates() -> Vec<PieceTemplate> {
    use PieceCategory::{Apparatus, Flora};
    use Rarity::{Common, Epic, Rare, Uncommon};

    vec![
        creature(
            "neon_tetra",
            "Neon Tetra",
            Common,
            Footprint::single(),
            Stats::new(2, 3, 6),
            &[Tag::Schooling, Tag::Neon],
            2,
            "+1 attack per adjacent schooling fish; speed doubles with 3 or more.",
        ),
        creature(
            "cardinal_tetra",
            "Cardinal Tetra",
            Uncommon,
            Footprint::single(),
            Stats::new(2, 4, 5),
            &[Tag::Schooling, Tag::Cardinal],
            3,
            "+2 attack per adjacent schooling fish.",
        ),
        creature(
            "corydoras",
            "Corydoras",
            Common,
            Footprint::single(),
            Stats::new(1, 4, 4),
            &[Tag::Schooling, Tag::Scavenger],
            2,
            "Counts as a schooling neighbour.",
        ),
        creature(
            "cherry_shrimp",
            "Cherry Shrimp",
            Common,
            Footprint::single(),
            Stats::new(1, 3, 3),
            &[Tag::Scavenger],
            1,
            "",
        ),
        creature(
            "betta",
            "Betta",
            Uncommon,
            Footprint::single(),
            Stats::new(4, 5, 4),
            &[Tag::Aggressive],
            4,
            "",
        ),
        creature(
            "angelfish",
            "Angelfish",
            Rare,
            Footprint::rect(1, 2),
            Stats::new(5, 8, 3),
            &[Tag::Predator],
            5,
            "",
        ),
        creature(
            "bristlenose_pleco",
            "Bristlenose Pleco",
            Uncommon,
            Footprint::rect(2, 1),
            Stats::new(2, 10, 1),
            &[Tag::Scavenger, Tag::Filtration],
            4,
            "Keeps the glass clean: counts as filtration.",
        ),
        creature(
            "oscar",
            "Oscar",
            Epic,
            Footprint::rect(2, 2),
            Stats::new(8, 14, 2),
            &[Tag::Predator, Tag::Aggressive],
            8,
            "",
        ),
        fixture(
            "java_fern",
            "Java Fern",
            Flora,
            Common,
            Footprint::single(),
            Stats::new(0, 4, 0),
            &[Tag::Plant, Tag::Fern],
            2,
            "Adjacent pieces gain +1 attack and +1 health.",
        ),
        fixture(
            "anubias",
            "Anubias",
            Flora,
            Common,
            Footprint::single(),
            Stats::new(0, 5, 0),
            &[Tag::Plant, Tag::Anubias],
            2,
            "Adjacent pieces gain +1 health.",
        ),
        fixture(
            "amazon_sword",
            "Amazon Sword",
            Flora,
            Uncommon,
            Footprint::rect(1, 2),
            Stats::new(0, 8, 0),
            &[Tag::Plant],
            3,
            "",
        ),
        fixture(
            "java_moss_carpet",
            "Java Moss Carpet",
            Flora,
            Rare,
            Footprint::rect(3, 1),
            Stats::new(0, 9, 0),
            &[Tag::Plant, Tag::Fern],
            5,
            "Adjacent pieces gain +1 attack and +1 health.",
        ),
        fixture(
            "sponge_filter",
            "Sponge Filter",
            Apparatus,
            Common,
            Footprint::single(),
            Stats::new(0, 6, 0),
            &[Tag::Equipment, Tag::Filtration],
            3,
            "Improves water quality.",
        ),
        fixture(
            "canister_filter",
            "Canister Filter",
            Apparatus,
            Rare,
            Footprint::new(vec![Offset::new(0, 0), Offset::new(1, 0), Offset::new(1, 1)]),
            Stats::new(0, 10, 0),
            &[Tag::Equipment, Tag::Filtration],
            6,
            "Improves water quality.",
        ),
        fixture(
            "heater",
            "Heater",
            Apparatus,
            Uncommon,
            Footprint::rect(1, 2),
            Stats::new(0, 5, 0),
            &[Tag::Equipment],
            3,
            "",
        ),
        fixture(
            "bubble_cannon",
            "Bubble Cannon",
            Apparatus,
            Rare,
            Footprint::single(),
            Stats::new(3, 4, 2),
            &[Tag::Equipment, Tag::Aggressive],
            5,
            "Fires at enemies every round.",
        ),
        food(
            "bloodworms",
            "Bloodworms",
            Common,
            StatBonus::new(2, 0, 0),
            2,
            "Adjacent creatures gain +2 attack when battle starts.",
        ),
        food(
            "spirulina_flakes",
            "Spirulina Flakes",
            Common,
            StatBonus::new(0, 3, 0),
            2,
            "Adjacent creatures gain +3 health when battle starts.",
        ),
        food(
            "vitamin_drops",
            "Vitamin Drops",
            Uncommon,
            StatBonus::new(1, 1, 1),
            3,
            "Adjacent creatures gain +1 to every stat when battle starts.",
        ),
        food(
            "live_brine_shrimp",
            "Live Brine Shrimp",
            Rare,
            StatBonus::new(3, 2, 0),
            4,
            "Adjacent creatures gain +3 attack and +2 health when battle starts.",
        ),
    ]
}
