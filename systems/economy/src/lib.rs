#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Gold accounting for one side: pricing rules, an append-only transaction
//! ledger and the per-side account that settles battle rewards.
//!
//! The balance is never stored independently of the history. Every change is
//! a [`Transaction`] appended to a [`Ledger`], and a debit that would push the
//! balance below zero is rejected before anything is written.

use reef_clash_core::{Piece, PieceId, SideResult, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Reroll price while the round's cheap rerolls last.
pub const BASE_REROLL_COST: u32 = 2;

/// Number of rerolls per round charged at the base price.
pub const CHEAP_REROLLS: u32 = 5;

/// Largest interest payment per round.
pub const MAX_INTEREST: u32 = 5;

/// Largest loss-streak bonus per round.
pub const MAX_LOSS_STREAK_BONUS: u32 = 10;

/// Price of the next reroll given how many rerolls were already bought this round.
#[must_use]
pub const fn reroll_cost(rerolls_this_round: u32) -> u32 {
    if rerolls_this_round < CHEAP_REROLLS {
        BASE_REROLL_COST
    } else {
        BASE_REROLL_COST + (rerolls_this_round - (CHEAP_REROLLS - 1))
    }
}

/// Refund for selling a piece: three quarters of its cost, rounded down.
#[must_use]
pub const fn sale_value(cost: u32) -> u32 {
    cost.saturating_mul(3) / 4
}

/// Base reward for a battle result in the provided round.
#[must_use]
pub const fn battle_reward(result: SideResult, round: u32) -> u32 {
    match result {
        SideResult::Win => 5 + round,
        SideResult::Loss => 3,
        SideResult::Draw => 4 + round / 2,
    }
}

/// Catch-up bonus for a side on a loss streak of the provided length.
#[must_use]
pub const fn loss_streak_bonus(streak: u32) -> u32 {
    let bonus = streak.saturating_mul(2);
    if bonus > MAX_LOSS_STREAK_BONUS {
        MAX_LOSS_STREAK_BONUS
    } else {
        bonus
    }
}

/// Interest earned on the provided balance.
#[must_use]
pub const fn interest(gold: u32) -> u32 {
    let earned = gold / 10;
    if earned > MAX_INTEREST {
        MAX_INTEREST
    } else {
        earned
    }
}

/// Category of a gold movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionKind {
    /// A shop offer was bought.
    Purchase,
    /// A piece was sold back.
    Sale,
    /// The shop was rerolled.
    Reroll,
    /// Gold paid for a battle result.
    BattleReward,
    /// Interest on savings.
    Interest,
    /// Catch-up gold for a loss streak.
    LossStreakBonus,
    /// Starting gold of a campaign.
    RoundStart,
}

/// Single immutable entry in a ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Category of the movement.
    pub kind: TransactionKind,
    /// Signed change in gold.
    pub amount: i64,
    /// Campaign round the movement happened in.
    pub round: u32,
    /// Logical time of the movement.
    pub stamp: Timestamp,
    /// Human-readable description.
    pub description: String,
    /// Piece involved, if any.
    pub piece: Option<PieceId>,
    /// Display name of the piece involved, if any.
    pub piece_name: Option<String>,
}

impl Transaction {
    /// Creates a transaction with no associated piece.
    #[must_use]
    pub fn new(
        kind: TransactionKind,
        amount: i64,
        round: u32,
        stamp: Timestamp,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            amount,
            round,
            stamp,
            description: description.into(),
            piece: None,
            piece_name: None,
        }
    }

    /// Associates the transaction with a piece.
    #[must_use]
    pub fn with_piece(mut self, piece: &Piece) -> Self {
        self.piece = Some(piece.id());
        self.piece_name = Some(piece.name().to_owned());
        self
    }
}

/// Errors raised by ledger operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The debit exceeds the current balance.
    #[error("needs {required} gold but only {available} is available")]
    InsufficientGold {
        /// Gold the debit requires.
        required: u32,
        /// Gold currently held.
        available: u32,
    },
}

/// Append-only gold history whose balance is the running sum of its entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    transactions: Vec<Transaction>,
    balance: u32,
}

impl Ledger {
    /// Creates an empty ledger with a zero balance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance.
    #[must_use]
    pub const fn balance(&self) -> u32 {
        self.balance
    }

    /// Every transaction in the order it was recorded.
    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Appends a transaction and returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientGold`] when the transaction would
    /// leave a negative balance; the ledger is unchanged in that case.
    pub fn record(&mut self, transaction: Transaction) -> Result<u32, LedgerError> {
        let next = i64::from(self.balance) + transaction.amount;
        let balance = u32::try_from(next).map_err(|_| LedgerError::InsufficientGold {
            required: u32::try_from(transaction.amount.unsigned_abs()).unwrap_or(u32::MAX),
            available: self.balance,
        })?;

        debug!(
            kind = ?transaction.kind,
            amount = transaction.amount,
            balance,
            "transaction recorded"
        );
        self.transactions.push(transaction);
        self.balance = balance;
        Ok(balance)
    }

    /// Reports whether the provided debit is affordable.
    #[must_use]
    pub const fn can_afford(&self, cost: u32) -> bool {
        self.balance >= cost
    }
}

/// Gold credited after a battle, itemised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement {
    /// Base reward for the battle result.
    pub reward: u32,
    /// Loss-streak catch-up bonus.
    pub streak_bonus: u32,
    /// Interest on the post-reward balance.
    pub interest: u32,
    /// Balance after every credit.
    pub balance: u32,
}

/// One side's gold, loss streak and win/loss tallies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    ledger: Ledger,
    loss_streak: u32,
    wins: u32,
    losses: u32,
}

impl Account {
    /// Opens an account seeded with a round-start transaction.
    ///
    /// A zero starting balance records nothing.
    #[must_use]
    pub fn new(starting_gold: u32, stamp: Timestamp) -> Self {
        let mut account = Self::default();
        let _ = account.credit(starting_gold, |amount| {
            Transaction::new(
                TransactionKind::RoundStart,
                amount,
                1,
                stamp,
                format!("Starting gold: {starting_gold}"),
            )
        });
        account
    }

    /// Current gold.
    #[must_use]
    pub const fn gold(&self) -> u32 {
        self.ledger.balance()
    }

    /// Underlying ledger.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Consecutive non-draw losses.
    #[must_use]
    pub const fn loss_streak(&self) -> u32 {
        self.loss_streak
    }

    /// Battles won.
    #[must_use]
    pub const fn wins(&self) -> u32 {
        self.wins
    }

    /// Battles lost.
    #[must_use]
    pub const fn losses(&self) -> u32 {
        self.losses
    }

    /// Pays for a shop offer.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientGold`] when the piece is unaffordable.
    pub fn purchase(
        &mut self,
        piece: &Piece,
        round: u32,
        stamp: Timestamp,
    ) -> Result<u32, LedgerError> {
        self.ledger.record(
            Transaction::new(
                TransactionKind::Purchase,
                -i64::from(piece.cost()),
                round,
                stamp,
                format!("Bought {}", piece.name()),
            )
            .with_piece(piece),
        )
    }

    /// Refunds a sold piece and returns the gold actually credited.
    ///
    /// The refund is clamped so the balance never exceeds `u32::MAX`.
    pub fn sell(&mut self, piece: &Piece, round: u32, stamp: Timestamp) -> u32 {
        self.credit(sale_value(piece.cost()), |amount| {
            Transaction::new(
                TransactionKind::Sale,
                amount,
                round,
                stamp,
                format!("Sold {}", piece.name()),
            )
            .with_piece(piece)
        })
    }

    /// Pays for a reroll.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientGold`] when the reroll is unaffordable.
    pub fn reroll(&mut self, cost: u32, round: u32, stamp: Timestamp) -> Result<u32, LedgerError> {
        self.ledger.record(Transaction::new(
            TransactionKind::Reroll,
            -i64::from(cost),
            round,
            stamp,
            format!("Rerolled shop for {cost} gold"),
        ))
    }

    /// Updates tallies for a battle result and credits reward, streak bonus
    /// and interest, in that order.
    pub fn settle(&mut self, result: SideResult, round: u32, stamp: Timestamp) -> Settlement {
        match result {
            SideResult::Win => {
                self.wins += 1;
                self.loss_streak = 0;
            }
            SideResult::Loss => {
                self.losses += 1;
                self.loss_streak += 1;
            }
            SideResult::Draw => self.loss_streak = 0,
        }

        let reward = self.credit(battle_reward(result, round), |amount| {
            Transaction::new(
                TransactionKind::BattleReward,
                amount,
                round,
                stamp,
                format!("Battle reward ({result:?}) for round {round}"),
            )
        });

        let streak = self.loss_streak;
        let owed_bonus = if streak > 0 { loss_streak_bonus(streak) } else { 0 };
        let streak_bonus = self.credit(owed_bonus, |amount| {
            Transaction::new(
                TransactionKind::LossStreakBonus,
                amount,
                round,
                stamp,
                format!("Loss streak bonus ({streak} in a row)"),
            )
        });

        let interest = self.credit(interest(self.gold()), |amount| {
            Transaction::new(TransactionKind::Interest, amount, round, stamp, "Interest on savings")
        });

        Settlement {
            reward,
            streak_bonus,
            interest,
            balance: self.gold(),
        }
    }

    /// Records a credit clamped to the balance headroom and returns the gold
    /// actually credited. Nothing is recorded for a zero credit.
    fn credit(&mut self, amount: u32, transaction: impl FnOnce(i64) -> Transaction) -> u32 {
        let amount = amount.min(u32::MAX - self.gold());
        if amount == 0 {
            return 0;
        }
        match self.ledger.record(transaction(i64::from(amount))) {
            Ok(_) => amount,
            Err(error) => {
                debug!(%error, "credit not recorded");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credits_saturate_at_the_balance_ceiling() {
        let mut account = Account::new(u32::MAX - 2, Timestamp::new(0));
        let settlement = account.settle(SideResult::Win, 1, Timestamp::new(1));
        assert_eq!(settlement.reward, 2);
        assert_eq!(settlement.interest, 0);
        assert_eq!(settlement.balance, u32::MAX);

        let total: i64 = account
            .ledger()
            .transactions()
            .iter()
            .map(|transaction| transaction.amount)
            .sum();
        assert_eq!(total, i64::from(u32::MAX));
        assert_eq!(account.ledger().transactions().len(), 2);
    }

    #[test]
    fn reroll_costs_escalate_after_five() {
        let costs: Vec<u32> = (0..8).map(reroll_cost).collect();
        assert_eq!(costs, vec![2, 2, 2, 2, 2, 3, 4, 5]);
    }

    #[test]
    fn interest_is_capped() {
        assert_eq!(interest(47), 4);
        assert_eq!(interest(52), 5);
        assert_eq!(interest(58), 5);
        assert_eq!(interest(9), 0);
    }

    #[test]
    fn sale_value_rounds_down() {
        assert_eq!(sale_value(6), 4);
        assert_eq!(sale_value(3), 2);
        assert_eq!(sale_value(1), 0);
    }

    #[test]
    fn rewards_follow_the_result() {
        assert_eq!(battle_reward(SideResult::Win, 3), 8);
        assert_eq!(battle_reward(SideResult::Loss, 3), 3);
        assert_eq!(battle_reward(SideResult::Draw, 3), 5);
        assert_eq!(loss_streak_bonus(1), 2);
        assert_eq!(loss_streak_bonus(7), 10);
    }
}
