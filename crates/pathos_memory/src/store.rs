//! Two-tier memory: a bounded short-term FIFO and a salience-weighted
//! long-term store keyed by normalized topic.
//!
//! The clock is the turn index, advanced by `consolidate`; nothing here
//! reads wall time.

use crate::importance::summarise;
use crate::record::{
    jaccard, normalize_key, overlap, significant_tokens, MemoryRecord, MemoryTier, RecalledMemory,
};
use pathos_core::appraisal::EmotionTag;
use pathos_core::config::{DecayRates, MemoryConfig};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Token-set similarity at which a new turn counts as a repeat mention.
const REPEAT_SIMILARITY: f32 = 0.6;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub promoted: usize,
    pub reinforced: usize,
    pub evicted: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySystem {
    config: MemoryConfig,
    stm_decay: f32,
    ltm_decay: f32,
    now: u64,
    stm: VecDeque<MemoryRecord>,
    ltm: BTreeMap<String, MemoryRecord>,
}

impl Default for MemorySystem {
    fn default() -> Self {
        Self::new(MemoryConfig::default(), &DecayRates::default())
    }
}

impl MemorySystem {
    pub fn new(config: MemoryConfig, decay: &DecayRates) -> Self {
        Self {
            stm: VecDeque::with_capacity(config.stm_capacity),
            config,
            stm_decay: decay.stm,
            ltm_decay: decay.ltm,
            now: 0,
            ltm: BTreeMap::new(),
        }
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn stm(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.stm.iter()
    }

    pub fn ltm(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.ltm.values()
    }

    pub fn stm_len(&self) -> usize {
        self.stm.len()
    }

    pub fn ltm_len(&self) -> usize {
        self.ltm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stm.is_empty() && self.ltm.is_empty()
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Record a turn with an explicit salience hint.
    pub fn write_turn(&mut self, content: &str, salience_hint: f32) {
        self.write_tagged(content, salience_hint, EmotionTag::Neutral, false);
    }

    /// Record a turn. Repeats of a recent topic reinforce the existing record
    /// instead of adding a new one; overflow silently drops the oldest.
    pub fn write_tagged(
        &mut self,
        content: &str,
        salience_hint: f32,
        emotion: EmotionTag,
        flagged: bool,
    ) {
        let content = content.trim();
        if content.is_empty() {
            return;
        }
        let salience = if salience_hint.is_finite() {
            salience_hint.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let tokens = significant_tokens(content);
        let now = self.now;
        let boost = self.config.reinforcement_boost;

        // Mentioning a remembered topic keeps it alive in LTM.
        for record in self.ltm.values_mut() {
            if jaccard(&tokens, &record.key_tokens()) >= REPEAT_SIMILARITY {
                record.reinforce(now, boost);
            }
        }

        if !tokens.is_empty() {
            if let Some(existing) = self
                .stm
                .iter_mut()
                .rev()
                .find(|r| jaccard(&tokens, &r.key_tokens()) >= REPEAT_SIMILARITY)
            {
                existing.reinforce(now, 0.0);
                existing.salience = existing.salience.max(salience);
                existing.content = content.to_string();
                existing.flagged |= flagged;
                if emotion != EmotionTag::Neutral {
                    existing.emotion = emotion;
                }
                return;
            }
        }

        self.stm.push_back(MemoryRecord {
            key: normalize_key(content),
            content: content.to_string(),
            emotion,
            flagged,
            salience,
            created_at: now,
            last_reinforced_at: now,
            decay_rate: self.stm_decay,
            mentions: 1,
            promoted: false,
        });
        while self.stm.len() > self.config.stm_capacity {
            self.stm.pop_front();
        }
    }

    // ========================================================================
    // Recall
    // ========================================================================

    /// Up to `k` memories, most relevant first.
    ///
    /// STM relevance is recency-weighted, LTM relevance salience-weighted;
    /// both scale with how much of the query the record covers.
    /// STM records already promoted are represented by their LTM entry.
    pub fn recall(&self, query: &str, k: usize) -> Vec<RecalledMemory> {
        if k == 0 || self.is_empty() {
            return Vec::new();
        }
        let q = significant_tokens(query);

        let stm = self.stm.iter().filter(|r| !r.promoted).map(|r| RecalledMemory {
            relevance: (0.5 + overlap(&q, &r.key_tokens())) * r.recency(self.now),
            tier: MemoryTier::Stm,
            record: r.clone(),
        });
        let ltm = self.ltm.values().map(|r| RecalledMemory {
            relevance: (0.5 + overlap(&q, &r.key_tokens())) * r.effective_salience(self.now),
            tier: MemoryTier::Ltm,
            record: r.clone(),
        });

        let mut hits: Vec<RecalledMemory> = stm.chain(ltm).collect();
        // Stable sort: equal scores keep STM-newest-last, LTM-key order.
        hits.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        hits.truncate(k);
        hits
    }

    // ========================================================================
    // Consolidation
    // ========================================================================

    /// Run once per turn: advance the clock, promote salient or repeated STM
    /// records, then evict faded LTM records and enforce the LTM cap.
    pub fn consolidate(&mut self) -> ConsolidationReport {
        self.now += 1;
        let now = self.now;
        let mut report = ConsolidationReport::default();

        let candidates: Vec<usize> = self
            .stm
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                !r.promoted
                    && (r.salience >= self.config.promotion_salience
                        || r.mentions >= self.config.promotion_mentions)
            })
            .map(|(i, _)| i)
            .collect();

        for i in candidates {
            let Some(source) = self.stm.get_mut(i) else {
                continue;
            };
            source.promoted = true;
            let source = source.clone();
            let tokens = source.key_tokens();

            let similar = self
                .ltm
                .iter()
                .find(|(_, r)| jaccard(&tokens, &r.key_tokens()) >= REPEAT_SIMILARITY)
                .map(|(k, _)| k.clone());

            match similar.or_else(|| self.ltm.contains_key(&source.key).then(|| source.key.clone())) {
                Some(key) => {
                    if let Some(existing) = self.ltm.get_mut(&key) {
                        existing.reinforce(now, self.config.reinforcement_boost);
                        existing.salience = existing.salience.max(source.salience);
                        report.reinforced += 1;
                    }
                }
                None => {
                    self.ltm.insert(
                        source.key.clone(),
                        MemoryRecord {
                            content: summarise(&source.content, source.emotion, source.flagged),
                            created_at: now,
                            last_reinforced_at: now,
                            decay_rate: self.ltm_decay,
                            promoted: false,
                            ..source
                        },
                    );
                    report.promoted += 1;
                }
            }
        }

        let floor = self.config.salience_floor;
        let before = self.ltm.len();
        self.ltm.retain(|_, r| r.effective_salience(now) >= floor);
        report.evicted += before - self.ltm.len();

        while self.ltm.len() > self.config.ltm_capacity {
            let weakest = self
                .ltm
                .iter()
                .min_by(|a, b| {
                    a.1.effective_salience(now)
                        .total_cmp(&b.1.effective_salience(now))
                })
                .map(|(k, _)| k.clone());
            match weakest {
                Some(k) => {
                    self.ltm.remove(&k);
                    report.evicted += 1;
                }
                None => break,
            }
        }

        if report != ConsolidationReport::default() {
            tracing::debug!(
                promoted = report.promoted,
                reinforced = report.reinforced,
                evicted = report.evicted,
                "Memory consolidated"
            );
        }
        report
    }
}
