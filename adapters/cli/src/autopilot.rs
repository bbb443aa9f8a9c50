use rand::Rng;
use reef_clash_core::{BattleOutcome, Command, Event, PieceId, Side};
use reef_clash_system_battle::BATTLE_ROUND_CAP;
use reef_clash_system_placement::valid_origins;
use reef_clash_world::{self as world, query, GameState};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Result of one campaign round as seen from the player's side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct RoundRecord {
    pub(crate) round: u32,
    pub(crate) outcome: BattleOutcome,
    pub(crate) battle_rounds: u32,
    pub(crate) purchases: u32,
    pub(crate) player_gold: u32,
    pub(crate) opponent_gold: u32,
}

/// Summary of a full campaign.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub(crate) struct CampaignSummary {
    pub(crate) rounds: Vec<RoundRecord>,
    pub(crate) player_wins: u32,
    pub(crate) opponent_wins: u32,
    pub(crate) rejected: u32,
}

/// Plays the player's side with a greedy buyer until the campaign finishes.
///
/// Returns the snapshot of the freshly reset campaign together with the summary.
pub(crate) fn play_campaign<R>(state: GameState, rng: &mut R) -> (GameState, CampaignSummary)
where
    R: Rng + ?Sized,
{
    let mut state = state;
    let mut summary = CampaignSummary::default();
    info!("{}", query::welcome_banner(&state));

    loop {
        let round = query::round(&state);
        let (shopped, purchases) = shop_greedily(state, rng, &mut summary);
        state = shopped;

        let mut events = Vec::new();
        state = world::apply(&state, Command::StartBattle, rng, &mut events);
        for _ in 0..BATTLE_ROUND_CAP {
            let concluded = events
                .iter()
                .any(|event| matches!(event, Event::BattleConcluded { .. }));
            if concluded {
                break;
            }
            state = world::apply(&state, Command::StepBattle, rng, &mut events);
        }

        let mut gold = [
            query::gold(&state, Side::Player),
            query::gold(&state, Side::Opponent),
        ];
        state = world::apply(&state, Command::CompleteBattle, rng, &mut events);

        let mut record = RoundRecord {
            round,
            outcome: BattleOutcome::Draw,
            battle_rounds: 0,
            purchases,
            player_gold: 0,
            opponent_gold: 0,
        };
        let mut finished = false;
        for event in &events {
            report(event, &mut summary);
            match *event {
                Event::BattleConcluded { outcome, rounds } => {
                    record.outcome = outcome;
                    record.battle_rounds = rounds;
                }
                Event::RewardsGranted {
                    side,
                    reward,
                    streak_bonus,
                    interest,
                } => {
                    let index = usize::from(side == Side::Opponent);
                    gold[index] += reward + streak_bonus + interest;
                }
                Event::CampaignFinished {
                    player_wins,
                    opponent_wins,
                } => {
                    summary.player_wins = player_wins;
                    summary.opponent_wins = opponent_wins;
                    finished = true;
                }
                _ => {}
            }
        }
        record.player_gold = gold[0];
        record.opponent_gold = gold[1];
        summary.rounds.push(record);

        if finished {
            return (state, summary);
        }
    }
}

/// Buys the priciest affordable offer that fits, places it, and repeats.
fn shop_greedily<R>(state: GameState, rng: &mut R, summary: &mut CampaignSummary) -> (GameState, u32)
where
    R: Rng + ?Sized,
{
    let mut state = state;
    let mut purchases = 0;
    while let Some(piece) = best_offer(&state) {
        let mut events = Vec::new();
        state = world::apply(&state, Command::Purchase { piece }, rng, &mut events);
        if let Some(origin) = query::valid_origins(&state, piece).first().copied() {
            state = world::apply(&state, Command::PlacePiece { piece, origin }, rng, &mut events);
        }
        for event in &events {
            report(event, summary);
        }
        if events
            .iter()
            .any(|event| matches!(event, Event::CommandRejected { .. }))
        {
            break;
        }
        purchases += 1;
    }
    (state, purchases)
}

fn best_offer(state: &GameState) -> Option<PieceId> {
    let gold = query::gold(state, Side::Player);
    let tank = query::tank(state, Side::Player);
    query::shop(state, Side::Player)
        .offers()
        .filter(|(_, piece)| piece.cost() <= gold)
        .filter(|(_, piece)| !valid_origins(tank, piece).is_empty())
        .max_by_key(|(slot, piece)| (piece.cost(), std::cmp::Reverse(*slot)))
        .map(|(_, piece)| piece.id())
}

fn report(event: &Event, summary: &mut CampaignSummary) {
    match event {
        Event::RoundStarted { round } => info!(round, "round started"),
        Event::BattleStarted {
            player_water,
            opponent_water,
        } => info!(player_water, opponent_water, "battle started"),
        Event::BattleConcluded { outcome, rounds } => {
            info!(?outcome, rounds, "battle concluded");
        }
        Event::RewardsGranted {
            side,
            reward,
            streak_bonus,
            interest,
        } => info!(?side, reward, streak_bonus, interest, "rewards granted"),
        Event::CampaignFinished {
            player_wins,
            opponent_wins,
        } => info!(player_wins, opponent_wins, "campaign finished"),
        Event::CommandRejected { reason } => {
            summary.rejected += 1;
            warn!(%reason, "autopilot command rejected");
        }
        other => debug!(event = ?other),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use reef_clash_core::Catalog;
    use reef_clash_world::Config;

    use super::*;

    fn campaign(seed: u64, rounds: u32) -> (GameState, CampaignSummary) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let config = Config {
            campaign_rounds: rounds,
            ..Config::default()
        };
        let state = GameState::new(config, Arc::new(Catalog::standard()), &mut rng);
        play_campaign(state, &mut rng)
    }

    #[test]
    fn plays_every_round_and_resets() {
        let (state, summary) = campaign(7, 3);
        assert_eq!(summary.rounds.len(), 3);
        assert_eq!(summary.rejected, 0);
        assert_eq!(
            summary.rounds.iter().map(|record| record.round).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(summary.player_wins + summary.opponent_wins <= 3);
        assert_eq!(query::round(&state), 1);
    }

    #[test]
    fn the_opening_round_spends_gold() {
        let (_, summary) = campaign(11, 1);
        assert!(summary.rounds[0].purchases > 0);
    }

    #[test]
    fn campaigns_replay_for_a_seed() {
        assert_eq!(campaign(21, 4).1, campaign(21, 4).1);
    }
}
