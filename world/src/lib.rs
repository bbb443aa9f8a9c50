#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative game state for Reef Clash.
//!
//! [`apply`] is the only way to change a [`GameState`]. It never mutates the
//! snapshot it is given: a successful command yields a new snapshot plus the
//! events describing it, and a rejected command yields a copy of the prior
//! snapshot plus a single [`Event::CommandRejected`].

use std::sync::Arc;

use rand::Rng;
use reef_clash_core::{
    BattleOutcome, Catalog, CellCoord, Command, Event, Phase, PieceId, PieceIdAllocator,
    Rejection, Side, Timestamp,
};
use reef_clash_system_battle::{Battle, BattlePhase, BattleRoster};
use reef_clash_system_consumables::resolve;
use reef_clash_system_economy::{reroll_cost, Account, LedgerError};
use reef_clash_system_opponent::{DraftInput, Drafter};
use reef_clash_system_placement::{move_piece, place_from_bench, remove, Tank};
use reef_clash_system_shop::{Sampling, Shop, ShopError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Tunable campaign parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Gold each side starts the campaign with.
    pub starting_gold: u32,
    /// Number of offers in each shop.
    pub shop_slots: usize,
    /// Number of rounds before the campaign resets.
    pub campaign_rounds: u32,
    /// Template sampling strategy used by both shops.
    pub sampling: Sampling,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            starting_gold: 10,
            shop_slots: 5,
            campaign_rounds: 10,
            sampling: Sampling::Uniform,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct SideState {
    tank: Tank,
    account: Account,
    shop: Shop,
}

/// Immutable snapshot of a campaign.
#[derive(Clone, Debug, PartialEq)]
pub struct GameState {
    config: Config,
    catalog: Arc<Catalog>,
    round: u32,
    phase: Phase,
    player: SideState,
    opponent: SideState,
    rerolls: u32,
    selected: Option<PieceId>,
    battle: Option<Battle>,
    last_outcome: Option<BattleOutcome>,
    ids: PieceIdAllocator,
    clock: Timestamp,
}

impl GameState {
    /// Starts a fresh campaign with stocked shops and starting gold.
    pub fn new<R>(config: Config, catalog: Arc<Catalog>, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut ids = PieceIdAllocator::new();
        let player = open_side(&config, &catalog, Side::Player, Timestamp::new(0), &mut ids, rng);
        let opponent =
            open_side(&config, &catalog, Side::Opponent, Timestamp::new(1), &mut ids, rng);

        Self {
            config,
            catalog,
            round: 1,
            phase: Phase::Shopping,
            player,
            opponent,
            rerolls: 0,
            selected: None,
            battle: None,
            last_outcome: None,
            ids,
            clock: Timestamp::new(2),
        }
    }

    fn side(&self, side: Side) -> &SideState {
        match side {
            Side::Player => &self.player,
            Side::Opponent => &self.opponent,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut SideState {
        match side {
            Side::Player => &mut self.player,
            Side::Opponent => &mut self.opponent,
        }
    }

    fn tick(&mut self) -> Timestamp {
        let now = self.clock;
        self.clock = now.next();
        now
    }

    fn require_shopping(&self) -> Result<(), Rejection> {
        if self.phase == Phase::Shopping {
            Ok(())
        } else {
            Err(Rejection::WrongPhase(self.phase))
        }
    }
}

fn open_side<R>(
    config: &Config,
    catalog: &Catalog,
    owner: Side,
    stamp: Timestamp,
    ids: &mut PieceIdAllocator,
    rng: &mut R,
) -> SideState
where
    R: Rng + ?Sized,
{
    SideState {
        tank: Tank::new(owner),
        account: Account::new(config.starting_gold, stamp),
        shop: Shop::stocked(catalog, config.shop_slots, config.sampling, ids, rng),
    }
}

/// Applies a command to a snapshot and returns the resulting snapshot.
///
/// Events describing the transition are appended to `out_events`.
pub fn apply<R>(
    state: &GameState,
    command: Command,
    rng: &mut R,
    out_events: &mut Vec<Event>,
) -> GameState
where
    R: Rng + ?Sized,
{
    let mut events = Vec::new();
    match transition(state, command.clone(), rng, &mut events) {
        Ok(next) => {
            debug!(?command, events = events.len(), "command applied");
            out_events.append(&mut events);
            next
        }
        Err(reason) => {
            warn!(?command, %reason, "command rejected");
            out_events.push(Event::CommandRejected { reason });
            state.clone()
        }
    }
}

fn transition<R>(
    state: &GameState,
    command: Command,
    rng: &mut R,
    events: &mut Vec<Event>,
) -> Result<GameState, Rejection>
where
    R: Rng + ?Sized,
{
    let mut next = state.clone();
    match command {
        Command::Purchase { piece } => purchase(&mut next, piece, events)?,
        Command::PlacePiece { piece, origin } => place_piece(&mut next, piece, origin, events)?,
        Command::MovePiece { piece, origin } => relocate_piece(&mut next, piece, origin, events)?,
        Command::SellPiece { piece } => sell_piece(&mut next, piece, events)?,
        Command::RerollShop => reroll_shop(&mut next, rng, events)?,
        Command::ToggleShopLock { slot } => {
            next.require_shopping()?;
            next.player.shop = next.player.shop.toggle_lock(slot).map_err(shop_rejection)?;
            events.push(Event::ShopLockChanged {
                slot: next.player.shop.locked(),
            });
        }
        Command::ClearShopLock => {
            next.require_shopping()?;
            next.player.shop = next.player.shop.clear_lock();
            events.push(Event::ShopLockChanged { slot: None });
        }
        Command::SelectPiece { piece } => {
            let known = next.player.tank.contains(piece) || next.player.shop.find(piece).is_some();
            if !known {
                return Err(Rejection::UnknownPiece(piece));
            }
            next.selected = if next.selected == Some(piece) {
                None
            } else {
                Some(piece)
            };
            events.push(Event::SelectionChanged {
                piece: next.selected,
            });
        }
        Command::StartBattle => start_battle(&mut next, rng, events)?,
        Command::StepBattle => step_battle(&mut next, rng, events)?,
        Command::CompleteBattle => return complete_battle(next, rng, events),
    }
    Ok(next)
}

fn purchase(
    state: &mut GameState,
    piece: PieceId,
    events: &mut Vec<Event>,
) -> Result<(), Rejection> {
    state.require_shopping()?;
    let cost = state
        .player
        .shop
        .find(piece)
        .map(|(_, offer)| offer.cost())
        .ok_or(Rejection::UnknownPiece(piece))?;
    let available = state.player.account.gold();
    if cost > available {
        return Err(Rejection::InsufficientGold {
            required: cost,
            available,
        });
    }

    let was_locked = state.player.shop.locked();
    let (shop, slot, bought) = state.player.shop.take(piece).map_err(shop_rejection)?;
    let tank = state
        .player
        .tank
        .with_benched(bought.clone())
        .map_err(Rejection::InvalidPlacement)?;
    let stamp = state.tick();
    let round = state.round;
    let _ = state
        .player
        .account
        .purchase(&bought, round, stamp)
        .map_err(ledger_rejection)?;

    state.player.shop = shop;
    state.player.tank = tank;
    events.push(Event::PiecePurchased { piece, slot, cost });
    if was_locked == Some(slot) {
        events.push(Event::ShopLockChanged { slot: None });
    }
    Ok(())
}

fn place_piece(
    state: &mut GameState,
    piece: PieceId,
    origin: CellCoord,
    events: &mut Vec<Event>,
) -> Result<(), Rejection> {
    state.require_shopping()?;
    if state.player.tank.benched_piece(piece).is_none() {
        return Err(Rejection::UnknownPiece(piece));
    }
    state.player.tank =
        place_from_bench(&state.player.tank, piece, origin).map_err(Rejection::InvalidPlacement)?;
    events.push(Event::PiecePlaced { piece, origin });
    Ok(())
}

fn relocate_piece(
    state: &mut GameState,
    piece: PieceId,
    origin: CellCoord,
    events: &mut Vec<Event>,
) -> Result<(), Rejection> {
    state.require_shopping()?;
    let from = state
        .player
        .tank
        .placed_piece(piece)
        .map(|placed| placed.origin())
        .ok_or(Rejection::UnknownPiece(piece))?;
    state.player.tank =
        move_piece(&state.player.tank, piece, origin).map_err(Rejection::InvalidPlacement)?;
    events.push(Event::PieceMoved {
        piece,
        from,
        to: origin,
    });
    Ok(())
}

fn sell_piece(
    state: &mut GameState,
    piece: PieceId,
    events: &mut Vec<Event>,
) -> Result<(), Rejection> {
    state.require_shopping()?;
    let (tank, removed) =
        remove(&state.player.tank, piece).map_err(|_| Rejection::UnknownPiece(piece))?;
    let stamp = state.tick();
    let round = state.round;
    let value = state.player.account.sell(removed.piece(), round, stamp);
    state.player.tank = tank;
    if state.selected == Some(piece) {
        state.selected = None;
        events.push(Event::SelectionChanged { piece: None });
    }
    events.push(Event::PieceSold { piece, value });
    Ok(())
}

fn reroll_shop<R>(
    state: &mut GameState,
    rng: &mut R,
    events: &mut Vec<Event>,
) -> Result<(), Rejection>
where
    R: Rng + ?Sized,
{
    state.require_shopping()?;
    let cost = reroll_cost(state.rerolls);
    let stamp = state.tick();
    let round = state.round;
    let _ = state
        .player
        .account
        .reroll(cost, round, stamp)
        .map_err(ledger_rejection)?;

    state.player.shop =
        state
            .player
            .shop
            .reroll(&state.catalog, state.config.sampling, &mut state.ids, rng);
    state.rerolls += 1;
    events.push(Event::ShopRerolled {
        side: Side::Player,
        cost,
    });
    Ok(())
}

fn start_battle<R>(
    state: &mut GameState,
    rng: &mut R,
    events: &mut Vec<Event>,
) -> Result<(), Rejection>
where
    R: Rng + ?Sized,
{
    state.require_shopping()?;

    let drafter = Drafter::new(&state.catalog, state.config.sampling);
    let draft = drafter.draft(
        DraftInput {
            round: state.round,
            shop: state.opponent.shop.clone(),
            tank: state.opponent.tank.clone(),
            account: state.opponent.account.clone(),
            ids: state.ids.clone(),
            stamp: state.clock,
        },
        rng,
    );
    events.push(Event::OpponentDrafted {
        purchases: u32::try_from(draft.purchases.len()).unwrap_or(u32::MAX),
        rerolls: draft.rerolls,
        gold: draft.account.gold(),
    });
    state.opponent = SideState {
        tank: draft.tank,
        account: draft.account,
        shop: draft.shop,
    };
    state.ids = draft.ids;
    state.clock = draft.stamp;

    for side in Side::ALL {
        let stamp = state.tick();
        let resolution = resolve(&state.side(side).tank, stamp);
        events.push(Event::ConsumablesResolved {
            side,
            consumed: u32::try_from(resolution.consumed.len()).unwrap_or(u32::MAX),
            effects: u32::try_from(resolution.effects.len()).unwrap_or(u32::MAX),
        });
        state.side_mut(side).tank = resolution.tank;
    }

    let player = BattleRoster::from_tank(&state.player.tank);
    let opponent = BattleRoster::from_tank(&state.opponent.tank);
    events.push(Event::BattleStarted {
        player_water: player.water_quality,
        opponent_water: opponent.water_quality,
    });
    info!(
        round = state.round,
        player = player.combatants.len(),
        opponent = opponent.combatants.len(),
        "battle started"
    );

    state.battle = Some(Battle::new(player, opponent));
    state.phase = Phase::Battle;
    state.selected = None;
    Ok(())
}

fn step_battle<R>(
    state: &mut GameState,
    rng: &mut R,
    events: &mut Vec<Event>,
) -> Result<(), Rejection>
where
    R: Rng + ?Sized,
{
    let battle = state.battle.as_mut().ok_or(Rejection::NoActiveBattle)?;
    if battle.outcome().is_some() {
        return Ok(());
    }

    battle.step(rng);
    events.push(Event::BattleRoundResolved {
        round: battle.round(),
    });
    if let BattlePhase::Concluded(outcome) = battle.phase() {
        events.push(Event::BattleConcluded {
            outcome,
            rounds: battle.round(),
        });
    }
    Ok(())
}

fn complete_battle<R>(
    mut state: GameState,
    rng: &mut R,
    events: &mut Vec<Event>,
) -> Result<GameState, Rejection>
where
    R: Rng + ?Sized,
{
    let mut battle = state.battle.take().ok_or(Rejection::NoActiveBattle)?;
    let already_concluded = battle.outcome().is_some();
    let report = battle.resolve(rng);
    if !already_concluded {
        events.push(Event::BattleConcluded {
            outcome: report.outcome,
            rounds: report.rounds,
        });
    }

    let round = state.round;
    for side in Side::ALL {
        let stamp = state.tick();
        let settlement = state
            .side_mut(side)
            .account
            .settle(report.outcome.result_for(side), round, stamp);
        events.push(Event::RewardsGranted {
            side,
            reward: settlement.reward,
            streak_bonus: settlement.streak_bonus,
            interest: settlement.interest,
        });
    }
    state.last_outcome = Some(report.outcome);

    if round >= state.config.campaign_rounds.max(1) {
        let player_wins = state.player.account.wins();
        let opponent_wins = state.opponent.account.wins();
        info!(player_wins, opponent_wins, "campaign finished");
        events.push(Event::CampaignFinished {
            player_wins,
            opponent_wins,
        });
        let fresh = GameState::new(state.config, Arc::clone(&state.catalog), rng);
        events.push(Event::RoundStarted { round: fresh.round });
        return Ok(fresh);
    }

    state.round += 1;
    state.phase = Phase::Shopping;
    state.rerolls = 0;
    let sampling = state.config.sampling;
    state.player.shop = state
        .player
        .shop
        .reroll(&state.catalog, sampling, &mut state.ids, rng);
    state.opponent.shop =
        Shop::stocked(&state.catalog, state.config.shop_slots, sampling, &mut state.ids, rng);
    info!(round = state.round, "round started");
    events.push(Event::RoundStarted { round: state.round });
    Ok(state)
}

fn shop_rejection(error: ShopError) -> Rejection {
    match error {
        ShopError::InvalidSlot(slot) => Rejection::InvalidSlot(slot),
        ShopError::UnknownPiece(piece) => Rejection::UnknownPiece(piece),
    }
}

fn ledger_rejection(error: LedgerError) -> Rejection {
    match error {
        LedgerError::InsufficientGold {
            required,
            available,
        } => Rejection::InsufficientGold {
            required,
            available,
        },
    }
}

/// Query functions that provide read-only access to the game state.
pub mod query {
    use super::{GameState, SideState};
    use reef_clash_core::{
        BattleOutcome, CellCoord, Phase, PieceId, Side, PlacedPiece, WELCOME_BANNER,
    };
    use reef_clash_system_battle::Battle;
    use reef_clash_system_economy::{reroll_cost, Account, Transaction};
    use reef_clash_system_placement::{valid_origins as fitting_origins, Tank};
    use reef_clash_system_shop::Shop;
    use reef_clash_system_synergy::EnhancedStats;

    fn side(state: &GameState, side: Side) -> &SideState {
        state.side(side)
    }

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(_state: &GameState) -> &'static str {
        WELCOME_BANNER
    }

    /// Current one-based campaign round.
    #[must_use]
    pub const fn round(state: &GameState) -> u32 {
        state.round
    }

    /// Current phase of the round.
    #[must_use]
    pub const fn phase(state: &GameState) -> Phase {
        state.phase
    }

    /// Number of rounds in the campaign.
    #[must_use]
    pub const fn campaign_rounds(state: &GameState) -> u32 {
        state.config.campaign_rounds
    }

    /// Gold currently held by a side.
    #[must_use]
    pub fn gold(state: &GameState, owner: Side) -> u32 {
        side(state, owner).account.gold()
    }

    /// Account of a side, including streak and tallies.
    #[must_use]
    pub fn account(state: &GameState, owner: Side) -> &Account {
        &side(state, owner).account
    }

    /// Full transaction history of a side.
    #[must_use]
    pub fn transactions(state: &GameState, owner: Side) -> &[Transaction] {
        side(state, owner).account.ledger().transactions()
    }

    /// Shop offered to a side.
    #[must_use]
    pub fn shop(state: &GameState, owner: Side) -> &Shop {
        &side(state, owner).shop
    }

    /// Tank of a side.
    #[must_use]
    pub fn tank(state: &GameState, owner: Side) -> &Tank {
        &side(state, owner).tank
    }

    /// Placed piece of a side, if present.
    #[must_use]
    pub fn placed_piece(state: &GameState, owner: Side, piece: PieceId) -> Option<&PlacedPiece> {
        side(state, owner).tank.placed_piece(piece)
    }

    /// Enhanced stats of a placed piece.
    #[must_use]
    pub fn enhanced_stats(state: &GameState, owner: Side, piece: PieceId) -> Option<EnhancedStats> {
        reef_clash_system_synergy::enhanced_stats(&side(state, owner).tank, piece)
    }

    /// Descriptions of the bonuses currently acting on a placed piece.
    #[must_use]
    pub fn bonus_descriptions(state: &GameState, owner: Side, piece: PieceId) -> Vec<String> {
        enhanced_stats(state, owner, piece)
            .map(|stats| stats.descriptions().into_iter().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Water quality of a side's tank, recomputed from its contents.
    #[must_use]
    pub fn water_quality(state: &GameState, owner: Side) -> u8 {
        reef_clash_system_synergy::water_quality(&side(state, owner).tank)
    }

    /// Origins where one of the player's pieces currently fits.
    ///
    /// Placed pieces may stay where they are, so their own origin is included.
    #[must_use]
    pub fn valid_origins(state: &GameState, piece: PieceId) -> Vec<CellCoord> {
        let tank = &state.player.tank;
        tank.benched_piece(piece)
            .or_else(|| tank.placed_piece(piece).map(PlacedPiece::piece))
            .map(|piece| fitting_origins(tank, piece))
            .unwrap_or_default()
    }

    /// Price of the player's next reroll this round.
    #[must_use]
    pub const fn next_reroll_cost(state: &GameState) -> u32 {
        reroll_cost(state.rerolls)
    }

    /// Rerolls the player bought this round.
    #[must_use]
    pub const fn rerolls(state: &GameState) -> u32 {
        state.rerolls
    }

    /// Currently selected piece, if any.
    #[must_use]
    pub const fn selected(state: &GameState) -> Option<PieceId> {
        state.selected
    }

    /// Active battle, if any.
    #[must_use]
    pub const fn battle(state: &GameState) -> Option<&Battle> {
        state.battle.as_ref()
    }

    /// Outcome of the most recent battle.
    #[must_use]
    pub const fn last_outcome(state: &GameState) -> Option<BattleOutcome> {
        state.last_outcome
    }
}
