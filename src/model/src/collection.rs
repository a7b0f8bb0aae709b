// Copyright © Roundtable 2026-present

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at

//    https://www.apache.org/licenses/LICENSE-2.0

// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The full card deck generated once at game creation.

use rand::RngCore;
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};

use crate::card::{Card, CardType};
use crate::primitives::CardId;

/// An ordered sequence of cards. Shuffling is seeded so that replaying the
/// same `Shuffle` event against the same starting order reproduces the same
/// ordering.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Collection {
    cards: Vec<Card>,
}

impl Collection {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn by_id(&self, id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|card| &card.id == id)
    }

    pub fn iter_of_type(&self, card_type: CardType) -> impl Iterator<Item = &Card> {
        self.cards.iter().filter(move |card| card.card_type == card_type)
    }

    /// Fisher-Yates shuffle, deterministic in `seed`.
    pub fn shuffle(&mut self, seed: u64) {
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        let len = self.cards.len();
        for i in (1..len).rev() {
            let j = (rng.next_u64() % (i as u64 + 1)) as usize;
            self.cards.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: usize) -> Collection {
        let cards = (0..n)
            .map(|i| Card::new(format!("W{i}"), CardType::White, format!("card {i}")))
            .collect();
        Collection::new(cards)
    }

    #[test]
    fn shuffle_is_deterministic_for_same_seed() {
        let mut a = sample(20);
        let mut b = sample(20);
        a.shuffle(42);
        b.shuffle(42);
        let ids_a: Vec<_> = a.cards().iter().map(|c| c.id.clone()).collect();
        let ids_b: Vec<_> = b.cards().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn shuffle_preserves_card_set() {
        let mut collection = sample(15);
        let before: std::collections::HashSet<_> =
            collection.cards().iter().map(|c| c.id.clone()).collect();
        collection.shuffle(7);
        let after: std::collections::HashSet<_> =
            collection.cards().iter().map(|c| c.id.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn lookup_by_id() {
        let collection = sample(5);
        assert!(collection.by_id(&CardId::new("W2")).is_some());
        assert!(collection.by_id(&CardId::new("nope")).is_none());
    }
}
