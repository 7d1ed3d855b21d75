//! Read access to the caller-owned account data.
//!
//! The engine never borrows into the caller's collections: every accessor
//! hands back owned copies, so a snapshot taken for one computation is not
//! affected by later edits to the source.

use serde::{Deserialize, Serialize};

use crate::types::{BillSnapshot, CardSnapshot, Transaction};

pub trait AccountRepository {
    fn cards(&self) -> Vec<CardSnapshot>;
    fn bills(&self) -> Vec<BillSnapshot>;
    fn transactions(&self) -> Vec<Transaction>;

    /// Transactions made on a single card.
    fn transactions_for(&self, card_id: &str) -> Vec<Transaction> {
        self.transactions()
            .into_iter()
            .filter(|t| t.owner_id == card_id)
            .collect()
    }
}

/// A dataset held in memory, typically loaded from a JSON fixture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryRepository {
    #[serde(default)]
    pub cards: Vec<CardSnapshot>,
    #[serde(default)]
    pub bills: Vec<BillSnapshot>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl InMemoryRepository {
    pub fn new(
        cards: Vec<CardSnapshot>,
        bills: Vec<BillSnapshot>,
        transactions: Vec<Transaction>,
    ) -> Self {
        Self {
            cards,
            bills,
            transactions,
        }
    }

    pub fn upsert_card(&mut self, card: CardSnapshot) {
        match self.cards.iter_mut().find(|c| c.id == card.id) {
            Some(existing) => *existing = card,
            None => self.cards.push(card),
        }
    }

    pub fn add_transaction(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }

    /// Removes a bill once paid. Returns whether it was present.
    pub fn remove_bill(&mut self, bill_id: &str) -> bool {
        let before = self.bills.len();
        self.bills.retain(|b| b.id != bill_id);
        self.bills.len() != before
    }
}

impl AccountRepository for InMemoryRepository {
    fn cards(&self) -> Vec<CardSnapshot> {
        self.cards.clone()
    }

    fn bills(&self) -> Vec<BillSnapshot> {
        self.bills.clone()
    }

    fn transactions(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }
}
