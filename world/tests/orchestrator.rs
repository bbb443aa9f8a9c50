use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use reef_clash_core::{
    BattleOutcome, Catalog, CellCoord, Command, Event, Phase, PieceId, PlacementError, Rejection,
    Side,
};
use reef_clash_system_economy::TransactionKind;
use reef_clash_world::{self as world, query, Config, GameState};

fn single_template_catalog(key: &str) -> Arc<Catalog> {
    let template = Catalog::standard()
        .get(key)
        .map(|template| (**template).clone())
        .expect("standard template");
    Arc::new(Catalog::new(vec![template]).expect("valid catalog"))
}

fn start(config: Config, catalog: Arc<Catalog>, rng: &mut ChaCha8Rng) -> GameState {
    GameState::new(config, catalog, rng)
}

fn first_offer(state: &GameState) -> PieceId {
    query::shop(state, Side::Player)
        .offers()
        .map(|(_, piece)| piece.id())
        .next()
        .expect("stocked shop")
}

fn run(state: &GameState, command: Command, rng: &mut ChaCha8Rng) -> (GameState, Vec<Event>) {
    let mut events = Vec::new();
    let next = world::apply(state, command, rng, &mut events);
    (next, events)
}

fn ledger_sum(state: &GameState, side: Side) -> i64 {
    query::transactions(state, side)
        .iter()
        .map(|transaction| transaction.amount)
        .sum()
}

#[test]
fn purchase_reroll_and_sale_keep_the_ledger_in_step() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let state = start(Config::default(), single_template_catalog("amazon_sword"), &mut rng);
    assert_eq!(query::gold(&state, Side::Player), 10);
    let piece = first_offer(&state);

    let (state, events) = run(&state, Command::Purchase { piece }, &mut rng);
    assert_eq!(
        events,
        vec![Event::PiecePurchased {
            piece,
            slot: 0,
            cost: 3
        }]
    );
    assert_eq!(query::gold(&state, Side::Player), 7);
    let bought = query::transactions(&state, Side::Player)
        .last()
        .expect("purchase recorded");
    assert_eq!(bought.kind, TransactionKind::Purchase);
    assert_eq!(bought.amount, -3);
    assert_eq!(bought.piece, Some(piece));
    assert!(query::tank(&state, Side::Player).benched_piece(piece).is_some());
    assert!(query::shop(&state, Side::Player).find(piece).is_none());

    let (state, events) = run(&state, Command::RerollShop, &mut rng);
    assert_eq!(
        events,
        vec![Event::ShopRerolled {
            side: Side::Player,
            cost: 2
        }]
    );
    assert_eq!(query::gold(&state, Side::Player), 5);
    assert_eq!(query::rerolls(&state), 1);

    let (state, events) = run(&state, Command::SellPiece { piece }, &mut rng);
    assert_eq!(events, vec![Event::PieceSold { piece, value: 2 }]);
    assert_eq!(query::gold(&state, Side::Player), 7);
    assert!(!query::tank(&state, Side::Player).contains(piece));
    assert_eq!(ledger_sum(&state, Side::Player), 7);
}

#[test]
fn rejected_commands_leave_the_snapshot_untouched() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let config = Config {
        starting_gold: 2,
        ..Config::default()
    };
    let state = start(config, single_template_catalog("amazon_sword"), &mut rng);
    let piece = first_offer(&state);

    let (next, events) = run(&state, Command::Purchase { piece }, &mut rng);
    assert_eq!(next, state);
    assert_eq!(
        events,
        vec![Event::CommandRejected {
            reason: Rejection::InsufficientGold {
                required: 3,
                available: 2,
            },
        }]
    );

    let missing = PieceId::new(9_999);
    let (next, events) = run(&state, Command::SellPiece { piece: missing }, &mut rng);
    assert_eq!(next, state);
    assert_eq!(
        events,
        vec![Event::CommandRejected {
            reason: Rejection::UnknownPiece(missing),
        }]
    );

    let (next, events) = run(&state, Command::ToggleShopLock { slot: 42 }, &mut rng);
    assert_eq!(next, state);
    assert_eq!(
        events,
        vec![Event::CommandRejected {
            reason: Rejection::InvalidSlot(42),
        }]
    );

    let (next, events) = run(&state, Command::StepBattle, &mut rng);
    assert_eq!(next, state);
    assert_eq!(
        events,
        vec![Event::CommandRejected {
            reason: Rejection::NoActiveBattle,
        }]
    );
}

#[test]
fn placement_moves_and_water_quality_flow_through_the_tank() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let state = start(Config::default(), single_template_catalog("amazon_sword"), &mut rng);
    let piece = first_offer(&state);
    let (state, _) = run(&state, Command::Purchase { piece }, &mut rng);
    assert_eq!(query::water_quality(&state, Side::Player), 5);
    assert_eq!(query::valid_origins(&state, piece).len(), 40);

    let origin = CellCoord::new(0, 0);
    let (state, events) = run(&state, Command::PlacePiece { piece, origin }, &mut rng);
    assert_eq!(events, vec![Event::PiecePlaced { piece, origin }]);
    assert_eq!(query::water_quality(&state, Side::Player), 6);

    let off_grid = CellCoord::new(8, 0);
    let (next, events) = run(
        &state,
        Command::MovePiece {
            piece,
            origin: off_grid,
        },
        &mut rng,
    );
    assert_eq!(next, state);
    assert_eq!(
        events,
        vec![Event::CommandRejected {
            reason: Rejection::InvalidPlacement(PlacementError::OutOfBounds),
        }]
    );

    let to = CellCoord::new(3, 2);
    let (state, events) = run(&state, Command::MovePiece { piece, origin: to }, &mut rng);
    assert_eq!(
        events,
        vec![Event::PieceMoved {
            piece,
            from: origin,
            to,
        }]
    );
    let placed = query::placed_piece(&state, Side::Player, piece).expect("placed");
    assert_eq!(placed.origin(), to);
}

#[test]
fn selection_toggles_and_clears_on_sale() {
    let mut rng = ChaCha8Rng::seed_from_u64(13);
    let state = start(Config::default(), single_template_catalog("amazon_sword"), &mut rng);
    let piece = first_offer(&state);

    let (state, events) = run(&state, Command::SelectPiece { piece }, &mut rng);
    assert_eq!(events, vec![Event::SelectionChanged { piece: Some(piece) }]);
    let (state, _) = run(&state, Command::SelectPiece { piece }, &mut rng);
    assert_eq!(query::selected(&state), None);

    let (state, _) = run(&state, Command::Purchase { piece }, &mut rng);
    let (state, _) = run(&state, Command::SelectPiece { piece }, &mut rng);
    let (state, events) = run(&state, Command::SellPiece { piece }, &mut rng);
    assert_eq!(
        events,
        vec![
            Event::SelectionChanged { piece: None },
            Event::PieceSold { piece, value: 2 },
        ]
    );
    assert_eq!(query::selected(&state), None);
}

#[test]
fn shopping_commands_are_refused_during_battle() {
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let state = start(Config::default(), single_template_catalog("amazon_sword"), &mut rng);
    let piece = first_offer(&state);

    let (state, events) = run(&state, Command::StartBattle, &mut rng);
    assert_eq!(query::phase(&state), Phase::Battle);
    assert!(query::battle(&state).is_some());
    assert!(matches!(events.first(), Some(Event::OpponentDrafted { .. })));
    assert!(matches!(events.last(), Some(Event::BattleStarted { .. })));

    let (next, events) = run(&state, Command::Purchase { piece }, &mut rng);
    assert_eq!(next, state);
    assert_eq!(
        events,
        vec![Event::CommandRejected {
            reason: Rejection::WrongPhase(Phase::Battle),
        }]
    );

    let (next, _) = run(&state, Command::RerollShop, &mut rng);
    assert_eq!(next, state);
}

#[test]
fn locked_offers_survive_into_the_next_round() {
    let mut rng = ChaCha8Rng::seed_from_u64(19);
    let state = start(Config::default(), single_template_catalog("amazon_sword"), &mut rng);
    let piece = first_offer(&state);

    let (state, events) = run(&state, Command::ToggleShopLock { slot: 0 }, &mut rng);
    assert_eq!(events, vec![Event::ShopLockChanged { slot: Some(0) }]);
    let (state, _) = run(&state, Command::StartBattle, &mut rng);
    let (state, events) = run(&state, Command::CompleteBattle, &mut rng);

    assert_eq!(events.last(), Some(&Event::RoundStarted { round: 2 }));
    assert_eq!(query::round(&state), 2);
    assert_eq!(query::phase(&state), Phase::Shopping);
    assert_eq!(query::rerolls(&state), 0);
    let shop = query::shop(&state, Side::Player);
    assert_eq!(shop.locked(), Some(0));
    assert_eq!(shop.find(piece).map(|(slot, _)| slot), Some(0));
}

#[test]
fn boards_without_attackers_draw_and_are_paid() {
    let mut rng = ChaCha8Rng::seed_from_u64(23);
    let state = start(Config::default(), single_template_catalog("amazon_sword"), &mut rng);

    let (state, _) = run(&state, Command::StartBattle, &mut rng);
    let (state, events) = run(&state, Command::CompleteBattle, &mut rng);

    assert!(events.contains(&Event::BattleConcluded {
        outcome: BattleOutcome::Draw,
        rounds: 1,
    }));
    assert!(events.contains(&Event::RewardsGranted {
        side: Side::Player,
        reward: 4,
        streak_bonus: 0,
        interest: 1,
    }));
    assert_eq!(query::last_outcome(&state), Some(BattleOutcome::Draw));
    assert_eq!(query::gold(&state, Side::Player), 15);
    for side in Side::ALL {
        assert_eq!(ledger_sum(&state, side), i64::from(query::gold(&state, side)));
    }
}

#[test]
fn stepping_reports_each_round_until_the_battle_ends() {
    let mut rng = ChaCha8Rng::seed_from_u64(29);
    let state = start(Config::default(), single_template_catalog("amazon_sword"), &mut rng);
    let (state, _) = run(&state, Command::StartBattle, &mut rng);

    let (state, events) = run(&state, Command::StepBattle, &mut rng);
    assert_eq!(
        events,
        vec![
            Event::BattleRoundResolved { round: 1 },
            Event::BattleConcluded {
                outcome: BattleOutcome::Draw,
                rounds: 1,
            },
        ]
    );

    let (state, events) = run(&state, Command::CompleteBattle, &mut rng);
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::BattleConcluded { .. })));
    assert!(query::battle(&state).is_none());
}

#[test]
fn the_campaign_resets_after_its_final_round() {
    let mut rng = ChaCha8Rng::seed_from_u64(31);
    let config = Config {
        campaign_rounds: 2,
        ..Config::default()
    };
    let mut state = start(config, single_template_catalog("amazon_sword"), &mut rng);
    let mut finished = Vec::new();

    for _ in 0..2 {
        let (next, _) = run(&state, Command::StartBattle, &mut rng);
        let (next, events) = run(&next, Command::CompleteBattle, &mut rng);
        finished.extend(
            events
                .into_iter()
                .filter(|event| matches!(event, Event::CampaignFinished { .. })),
        );
        state = next;
    }

    assert_eq!(
        finished,
        vec![Event::CampaignFinished {
            player_wins: 0,
            opponent_wins: 0,
        }]
    );
    assert_eq!(query::round(&state), 1);
    assert_eq!(query::phase(&state), Phase::Shopping);
    assert_eq!(query::gold(&state, Side::Player), 10);
    assert_eq!(query::transactions(&state, Side::Player).len(), 1);
    assert!(query::tank(&state, Side::Opponent).placed().is_empty());
    assert_eq!(query::last_outcome(&state), None);
}

#[test]
fn identical_seeds_replay_identically() {
    fn autopilot(seed: u64) -> (GameState, Vec<Event>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut state = GameState::new(Config::default(), Arc::new(Catalog::standard()), &mut rng);
        let mut log = Vec::new();
        for _ in 0..4 {
            let affordable = query::shop(&state, Side::Player)
                .offers()
                .find(|(_, piece)| piece.cost() <= query::gold(&state, Side::Player))
                .map(|(_, piece)| piece.id());
            if let Some(piece) = affordable {
                state = world::apply(&state, Command::Purchase { piece }, &mut rng, &mut log);
                if let Some(origin) = query::valid_origins(&state, piece).first().copied() {
                    state = world::apply(
                        &state,
                        Command::PlacePiece { piece, origin },
                        &mut rng,
                        &mut log,
                    );
                }
            }
            state = world::apply(&state, Command::StartBattle, &mut rng, &mut log);
            state = world::apply(&state, Command::CompleteBattle, &mut rng, &mut log);
        }
        (state, log)
    }

    let (first_state, first_log) = autopilot(41);
    let (second_state, second_log) = autopilot(41);
    assert_eq!(first_state, second_state);
    assert_eq!(first_log, second_log);
    assert!(!first_log
        .iter()
        .any(|event| matches!(event, Event::CommandRejected { .. })));
    for side in Side::ALL {
        assert_eq!(
            ledger_sum(&first_state, side),
            i64::from(query::gold(&first_state, side))
        );
    }
}

fn catalog_of(keys: &[&str]) -> Arc<Catalog> {
    let standard = Catalog::standard();
    let templates = keys
        .iter()
        .map(|key| {
            standard
                .get(key)
                .map(|template| (**template).clone())
                .expect("standard template")
        })
        .collect();
    Arc::new(Catalog::new(templates).expect("valid catalog"))
}

fn offer_of(state: &GameState, key: &str) -> Option<PieceId> {
    query::shop(state, Side::Player)
        .offers()
        .find(|(_, piece)| piece.template().key == key)
        .map(|(_, piece)| piece.id())
}

fn stocked_with(keys: &[&str]) -> (GameState, ChaCha8Rng) {
    let catalog = catalog_of(keys);
    (0..256)
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let state = start(Config::default(), Arc::clone(&catalog), &mut rng);
            (state, rng)
        })
        .find(|(state, _)| keys.iter().all(|key| offer_of(state, key).is_some()))
        .expect("a seed stocks every template")
}

#[test]
fn consumables_buff_neighbours_when_the_battle_starts() {
    let (state, mut rng) = stocked_with(&["neon_tetra", "bloodworms"]);
    let neon = offer_of(&state, "neon_tetra").expect("neon offer");
    let worms = offer_of(&state, "bloodworms").expect("bloodworms offer");

    let (state, _) = run(&state, Command::Purchase { piece: neon }, &mut rng);
    let (state, _) = run(&state, Command::Purchase { piece: worms }, &mut rng);
    let (state, _) = run(
        &state,
        Command::PlacePiece {
            piece: neon,
            origin: CellCoord::new(0, 0),
        },
        &mut rng,
    );
    let (state, events) = run(
        &state,
        Command::PlacePiece {
            piece: worms,
            origin: CellCoord::new(1, 0),
        },
        &mut rng,
    );
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::CommandRejected { .. })));

    let (state, events) = run(&state, Command::StartBattle, &mut rng);
    assert!(events.contains(&Event::ConsumablesResolved {
        side: Side::Player,
        consumed: 1,
        effects: 1,
    }));

    let tank = query::tank(&state, Side::Player);
    assert!(!tank.contains(worms));
    let fed = tank.placed_piece(neon).expect("neon stays placed");
    assert_eq!(fed.stats().attack, 4);
    assert_eq!(fed.stats().health, 3);

    let battle = query::battle(&state).expect("battle running");
    let roster: Vec<_> = battle.combatants(Side::Player).collect();
    assert_eq!(roster.len(), 1);
    let (combatant, health) = roster[0];
    assert_eq!(combatant.id, neon);
    assert_eq!(combatant.stats.attack, 4);
    assert_eq!(health, 3);
    assert_eq!(battle.water_quality(Side::Player), Some(5));
}

#[test]
fn display_queries_describe_the_player_tank() {
    let (state, mut rng) = stocked_with(&["neon_tetra", "java_fern"]);
    let neon = offer_of(&state, "neon_tetra").expect("neon offer");
    let fern = offer_of(&state, "java_fern").expect("fern offer");
    assert_eq!(query::next_reroll_cost(&state), 2);

    let (state, _) = run(&state, Command::Purchase { piece: neon }, &mut rng);
    let (state, _) = run(&state, Command::Purchase { piece: fern }, &mut rng);
    assert!(query::enhanced_stats(&state, Side::Player, neon).is_none());
    assert!(query::bonus_descriptions(&state, Side::Player, neon).is_empty());

    let (state, _) = run(
        &state,
        Command::PlacePiece {
            piece: neon,
            origin: CellCoord::new(2, 2),
        },
        &mut rng,
    );
    let (state, _) = run(
        &state,
        Command::PlacePiece {
            piece: fern,
            origin: CellCoord::new(2, 3),
        },
        &mut rng,
    );

    let stats = query::enhanced_stats(&state, Side::Player, neon).expect("neon is placed");
    assert_eq!(stats.base.attack, 2);
    assert_eq!(stats.enhanced.attack, 3);
    assert_eq!(stats.enhanced.health, 4);
    assert!(!stats.speed_doubled);
    assert_eq!(
        query::bonus_descriptions(&state, Side::Player, neon),
        vec!["Java Fern: +1 attack, +1 health".to_owned()]
    );
    assert!(query::bonus_descriptions(&state, Side::Player, fern).is_empty());
    assert_eq!(query::water_quality(&state, Side::Player), 6);

    let (state, events) = run(&state, Command::RerollShop, &mut rng);
    assert_eq!(
        events,
        vec![Event::ShopRerolled {
            side: Side::Player,
            cost: 2
        }]
    );
    assert_eq!(query::next_reroll_cost(&state), 2);
    assert_eq!(query::gold(&state, Side::Player), 4);
}
