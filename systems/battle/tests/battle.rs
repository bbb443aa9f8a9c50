use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use reef_clash_core::{BattleOutcome, Catalog, CellCoord, Piece, PieceId, Side, Stats};
use reef_clash_system_battle::{
    Battle, BattleEvent, BattlePhase, BattleRoster, Combatant, BATTLE_ROUND_CAP,
};
use reef_clash_system_placement::{place, Tank};

fn fighter(id: u32, attack: u32, health: u32, speed: u32) -> Combatant {
    Combatant::new(
        PieceId::new(id),
        format!("fighter {id}"),
        Stats::new(attack, health, speed),
        true,
    )
}

fn roster(side: Side, combatants: Vec<Combatant>, water: u8) -> BattleRoster {
    BattleRoster::new(side, combatants, water)
}

fn tank(side: Side, pieces: &[(u32, &str, (u32, u32))]) -> Tank {
    let catalog = Catalog::standard();
    pieces.iter().fold(Tank::new(side), |tank, (id, key, (column, row))| {
        let template = catalog.get(key).expect("template").clone();
        place(
            &tank,
            Piece::new(PieceId::new(*id), template),
            CellCoord::new(*column, *row),
        )
        .expect("fits")
    })
}

#[test]
fn identical_seeds_produce_identical_logs() {
    let player = BattleRoster::from_tank(&tank(
        Side::Player,
        &[
            (1, "neon_tetra", (0, 0)),
            (2, "neon_tetra", (1, 0)),
            (3, "betta", (0, 1)),
            (4, "java_fern", (1, 1)),
        ],
    ));
    let opponent = BattleRoster::from_tank(&tank(
        Side::Opponent,
        &[
            (10, "angelfish", (3, 3)),
            (11, "corydoras", (4, 3)),
            (12, "bubble_cannon", (5, 5)),
        ],
    ));

    let first = Battle::new(player.clone(), opponent.clone())
        .resolve(&mut ChaCha8Rng::seed_from_u64(2024));
    let second =
        Battle::new(player, opponent).resolve(&mut ChaCha8Rng::seed_from_u64(2024));

    assert_eq!(first, second);
    assert!(first.rounds <= BATTLE_ROUND_CAP);
    assert!(matches!(
        first.events.last(),
        Some(BattleEvent::Concluded { .. })
    ));
}

#[test]
fn stepping_matches_resolving_in_one_call() {
    let a = roster(Side::Player, vec![fighter(1, 3, 12, 4), fighter(2, 2, 9, 4)], 5);
    let b = roster(Side::Opponent, vec![fighter(3, 4, 10, 4)], 5);

    let mut stepped = Battle::new(a.clone(), b.clone());
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    assert_eq!(stepped.phase(), BattlePhase::Idle);
    stepped.step(&mut rng);
    assert_eq!(stepped.round(), 1);
    while stepped.outcome().is_none() {
        stepped.step(&mut rng);
    }

    let report = Battle::new(a, b).resolve(&mut ChaCha8Rng::seed_from_u64(5));
    assert_eq!(stepped.log(), report.events.as_slice());
    assert_eq!(stepped.outcome(), Some(report.outcome));

    let rounds = stepped.round();
    stepped.step(&mut rng);
    assert_eq!(stepped.round(), rounds, "concluded battles ignore steps");
}

#[test]
fn round_cap_awards_the_side_with_more_health() {
    let a = roster(Side::Player, vec![fighter(1, 1, 100, 3), fighter(2, 1, 100, 3)], 5);
    let b = roster(Side::Opponent, vec![fighter(3, 1, 100, 3)], 5);

    let report = Battle::new(a, b).resolve(&mut ChaCha8Rng::seed_from_u64(9));
    assert_eq!(report.rounds, BATTLE_ROUND_CAP);
    assert_eq!(report.outcome, BattleOutcome::Victory(Side::Player));
    assert_eq!(report.remaining_health, [(Side::Player, 190), (Side::Opponent, 80)]);
}

#[test]
fn equal_health_at_the_cap_is_a_draw() {
    let a = roster(Side::Player, vec![fighter(1, 1, 50, 3)], 5);
    let b = roster(Side::Opponent, vec![fighter(2, 1, 50, 3)], 5);

    let report = Battle::new(a, b).resolve(&mut ChaCha8Rng::seed_from_u64(1));
    assert_eq!(report.outcome, BattleOutcome::Draw);
    assert_eq!(report.remaining_health, [(Side::Player, 40), (Side::Opponent, 40)]);
}

#[test]
fn a_side_without_attackers_loses_after_the_first_round() {
    let a = roster(Side::Player, vec![fighter(1, 2, 10, 3)], 5);
    let b = roster(
        Side::Opponent,
        vec![Combatant::new(PieceId::new(2), "Java Fern", Stats::new(0, 4, 0), false)],
        5,
    );

    let mut battle = Battle::new(a, b);
    battle.step(&mut ChaCha8Rng::seed_from_u64(0));
    assert_eq!(battle.outcome(), Some(BattleOutcome::Victory(Side::Player)));
    assert_eq!(battle.remaining_health(Side::Opponent), 2);
}

#[test]
fn empty_rosters_draw() {
    let report = Battle::new(
        roster(Side::Player, Vec::new(), 5),
        roster(Side::Opponent, Vec::new(), 5),
    )
    .resolve(&mut ChaCha8Rng::seed_from_u64(0));
    assert_eq!(report.outcome, BattleOutcome::Draw);
    assert_eq!(report.rounds, 1);
}

#[test]
fn faster_combatants_strike_first() {
    let a = roster(Side::Player, vec![fighter(1, 10, 5, 1)], 5);
    let b = roster(Side::Opponent, vec![fighter(2, 10, 5, 9)], 5);

    let report = Battle::new(a, b).resolve(&mut ChaCha8Rng::seed_from_u64(0));
    assert_eq!(report.outcome, BattleOutcome::Victory(Side::Opponent));
    assert_eq!(
        report.events[0],
        BattleEvent::Attack {
            round: 1,
            side: Side::Opponent,
            attacker: PieceId::new(2),
            target: PieceId::new(1),
            damage: 10,
            defeated: true,
        }
    );
    assert_eq!(report.events.len(), 2);
}

#[test]
fn speed_ties_resolve_by_side_then_roster_order() {
    let a = roster(Side::Player, vec![fighter(1, 1, 50, 4), fighter(2, 1, 50, 4)], 5);
    let b = roster(Side::Opponent, vec![fighter(3, 1, 50, 4)], 5);

    let mut battle = Battle::new(a, b);
    battle.step(&mut ChaCha8Rng::seed_from_u64(3));
    let attackers: Vec<PieceId> = battle
        .log()
        .iter()
        .filter_map(|event| match event {
            BattleEvent::Attack { attacker, .. } => Some(*attacker),
            _ => None,
        })
        .collect();
    assert_eq!(attackers, vec![PieceId::new(1), PieceId::new(2), PieceId::new(3)]);
}

#[test]
fn poor_water_weakens_attacks_and_hurts_every_round() {
    let a = roster(Side::Player, vec![fighter(1, 4, 30, 5)], 2);
    let b = roster(Side::Opponent, vec![fighter(2, 0, 30, 1)], 5);

    let mut battle = Battle::new(a, b);
    battle.step(&mut ChaCha8Rng::seed_from_u64(8));

    assert_eq!(battle.remaining_health(Side::Opponent), 28);
    assert_eq!(battle.remaining_health(Side::Player), 27);
    assert!(battle.log().contains(&BattleEvent::Environment {
        round: 1,
        side: Side::Player,
        damage: 3,
        defeated: 0,
    }));
}

#[test]
fn clean_water_boosts_attacks() {
    let a = roster(Side::Player, vec![fighter(1, 5, 30, 5)], 9);
    let b = roster(Side::Opponent, vec![fighter(2, 0, 30, 1)], 5);

    let mut battle = Battle::new(a, b);
    battle.step(&mut ChaCha8Rng::seed_from_u64(8));
    assert_eq!(battle.remaining_health(Side::Opponent), 24);
}

#[test]
fn rosters_fight_with_enhanced_stats_and_tank_water() {
    let roster = BattleRoster::from_tank(&tank(
        Side::Player,
        &[(1, "neon_tetra", (0, 0)), (2, "java_fern", (1, 0))],
    ));

    assert_eq!(roster.water_quality, 6);
    assert_eq!(roster.combatants.len(), 2);
    assert_eq!(
        roster.combatants[0].stats,
        Stats {
            attack: 3,
            health: 4,
            speed: 6,
            max_health: 4,
        }
    );
    assert!(roster.combatants[0].attacks);
    assert!(!roster.combatants[1].attacks);
}
