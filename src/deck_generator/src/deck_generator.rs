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

//! Produces a game's card collection from a subject string.
//!
//! The real content source is an LLM-backed service out of scope for this
//! crate; [StaticDeckGenerator] is a deterministic offline stand-in so
//! `CreateGame` is exercisable end-to-end without that dependency.

use anyhow::Result;
use async_trait::async_trait;
use model::{Card, CardType, Collection};

const WHITE_CARD_COUNT: usize = 40;
const BLACK_CARD_COUNT: usize = 10;

const PROMPTS: &[&str] = &[
    "Why did the chicken cross ____?",
    "I never leave home without ____.",
    "The secret to a happy life is ____.",
    "Scientists have discovered ____.",
    "My therapist says I should stop thinking about ____.",
    "What's that smell? ____.",
    "Breaking news: local man arrested for ____.",
    "The last thing I expected to find in my sock drawer: ____.",
    "Instead of a gold watch, the retiree received ____.",
    "This meeting could have been ____.",
];

const ANSWERS: &[&str] = &[
    "a sentient kazoo",
    "my student loan debt",
    "an inexplicable sense of dread",
    "a perfectly reasonable explanation",
    "three raccoons in a trench coat",
    "the last slice of pizza",
    "an aggressively mediocre birthday card",
    "a minor cult",
    "unsolicited parenting advice",
    "a glitch in the simulation",
    "my browser history",
    "a single, judgmental owl",
    "existential dread, lightly seasoned",
    "the wifi password",
    "a very stern talking-to",
    "competitive extreme ironing",
    "a loophole in the fabric of reality",
    "my emotional support spreadsheet",
    "a surprisingly assertive houseplant",
    "group chat drama",
];

#[async_trait]
pub trait DeckGenerator: Send + Sync {
    async fn generate(&self, subject: &str) -> Result<Collection>;
}

/// Deterministic, offline deck generator. Seeds its padding from a hash of
/// `subject` so the same subject always yields the same collection, useful
/// for reproducible tests, not a claim about card quality.
#[derive(Default)]
pub struct StaticDeckGenerator;

impl StaticDeckGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeckGenerator for StaticDeckGenerator {
    async fn generate(&self, subject: &str) -> Result<Collection> {
        let seed = subject_hash(subject);
        let mut cards = Vec::with_capacity(WHITE_CARD_COUNT + BLACK_CARD_COUNT);

        for i in 0..BLACK_CARD_COUNT {
            let text = PROMPTS[(i + seed as usize) % PROMPTS.len()];
            cards.push(Card::new(format!("B{i}"), CardType::Black, text));
        }
        for i in 0..WHITE_CARD_COUNT {
            let text = ANSWERS[(i + seed as usize) % ANSWERS.len()];
            let suffix = if i >= ANSWERS.len() { format!(" ({})", i / ANSWERS.len() + 1) } else { String::new() };
            cards.push(Card::new(format!("W{i}"), CardType::White, format!("{text}{suffix}")));
        }

        Ok(Collection::new(cards))
    }
}

fn subject_hash(subject: &str) -> u64 {
    // FNV-1a: small, dependency-free, and stable across runs/platforms,
    // which a `Hash`/`DefaultHasher`-based approach does not guarantee.
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in subject.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generates_the_expected_card_counts() {
        let generator = StaticDeckGenerator::new();
        let collection = generator.generate("space").await.unwrap();
        assert_eq!(collection.cards().len(), WHITE_CARD_COUNT + BLACK_CARD_COUNT);
        assert_eq!(collection.iter_of_type(CardType::Black).count(), BLACK_CARD_COUNT);
        assert_eq!(collection.iter_of_type(CardType::White).count(), WHITE_CARD_COUNT);
    }

    #[tokio::test]
    async fn same_subject_yields_the_same_collection() {
        let generator = StaticDeckGenerator::new();
        let a = generator.generate("office life").await.unwrap();
        let b = generator.generate("office life").await.unwrap();
        let a_ids: Vec<_> = a.cards().iter().map(|c| c.text.clone()).collect();
        let b_ids: Vec<_> = b.cards().iter().map(|c| c.text.clone()).collect();
        assert_eq!(a_ids, b_ids);
    }

    #[tokio::test]
    async fn card_ids_are_unique_within_the_collection() {
        let generator = StaticDeckGenerator::new();
        let collection = generator.generate("space").await.unwrap();
        let mut ids: Vec<_> = collection.cards().iter().map(|c| c.id.as_str().to_string()).collect();
        let before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }
}
