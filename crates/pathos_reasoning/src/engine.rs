//! Conversation Engine - the turn orchestration boundary
//!
//! One `ConversationEngine` serves any number of conversations. Each
//! conversation's `Session` sits behind its own async mutex, so turns of one
//! conversation run strictly in submission order while distinct
//! conversations proceed in parallel.
//!
//! Turn order: plan (pure) → commit → checkpoint → external generation.
//! The LLM call only ever sees already-committed state; its failure
//! degrades the reply text and nothing else.

use crate::llm::{CompletionParams, GenerationError, LlmClient};
use crate::prompts::{Prompt, PromptBuilder};
use crate::providers;
use pathos_core::config::{ConfigHandle, PathosConfig};
use pathos_core::error::ConfigError;
use pathos_core::persona::{PersonaBias, PersonaDelta, PersonaProfile};
use pathos_limbic::{ReflectionRecord, StyleParams};
use pathos_memory::{
    open_store, PersistenceError, PreparedTurn, Session, SessionStore, TurnPlanner,
};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::Mutex;

// ============================================================================
// Reply clean-up
// ============================================================================

static RE_ROLE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(assistant|ai|bot)\s*:\s*").expect("valid regex"));
static RE_EMOTION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?\s*emotion\s*>").expect("valid regex"));
static RE_MULTI_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static RE_EMOJI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Extended_Pictographic}\u{FE0F}?").expect("valid regex"));

/// Below this emoji level the model's emojis are stripped from the reply.
const EMOJI_STRIP_BELOW: f32 = 0.2;

/// Strip artefacts the model sometimes emits and enforce a no-emoji style.
pub fn sanitize_reply(text: &str, style: &StyleParams) -> String {
    let mut out = RE_ROLE_PREFIX.replace(text, "").into_owned();
    out = RE_EMOTION_TAG.replace_all(&out, "").into_owned();
    if style.emoji < EMOJI_STRIP_BELOW {
        out = RE_EMOJI.replace_all(&out, "").into_owned();
    }
    out = RE_MULTI_NEWLINE.replace_all(&out, "\n\n").into_owned();
    out.trim().to_string()
}

// ============================================================================
// Engine
// ============================================================================

/// What the caller gets back for one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnResult {
    pub reply_text: String,
    pub reflection: ReflectionRecord,
    /// True when the reply is the fallback text because generation failed.
    pub degraded: bool,
}

/// A change applied while the stored copy was unreadable, replayed onto it
/// once the store answers again.
#[derive(Debug, Clone)]
enum PendingChange {
    Turn(String),
    Persona(PersonaProfile),
}

struct SessionSlot {
    session: Session,
    /// Committed but not yet persisted.
    dirty: bool,
    /// The stored copy has been read (or is known not to exist). Nothing is
    /// saved for an unverified slot so a good snapshot is never overwritten.
    verified: bool,
    pending: Vec<PendingChange>,
}

impl SessionSlot {
    fn loaded(session: Session) -> Self {
        Self {
            session,
            dirty: false,
            verified: true,
            pending: Vec::new(),
        }
    }

    fn unverified(session: Session) -> Self {
        Self {
            verified: false,
            ..Self::loaded(session)
        }
    }

    fn record(&mut self, change: PendingChange) {
        if !self.verified {
            self.pending.push(change);
        }
    }
}

type SlotHandle = Arc<Mutex<Option<SessionSlot>>>;

pub struct ConversationEngine {
    config: ConfigHandle,
    store: Arc<dyn SessionStore>,
    client: Arc<dyn LlmClient>,
    sessions: Mutex<HashMap<String, SlotHandle>>,
}

impl ConversationEngine {
    pub fn new(config: ConfigHandle, store: Arc<dyn SessionStore>, client: Arc<dyn LlmClient>) -> Self {
        Self {
            config,
            store,
            client,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Validate the config, open the configured store and provider.
    pub async fn from_config(config: PathosConfig) -> anyhow::Result<Self> {
        let handle = ConfigHandle::new(config)?;
        let current = handle.current();
        let store = open_store(&current.session).await?;
        let client = providers::from_config(&current.llm)?;
        Ok(Self::new(handle, store, client))
    }

    pub fn config(&self) -> Arc<PathosConfig> {
        self.config.current()
    }

    pub fn provider_name(&self) -> &str {
        self.client.name()
    }

    /// Swap in a new config. Invalid candidates are rejected and the
    /// last-known-good config stays active.
    ///
    /// Dynamics, safety, policy and LLM settings apply from the next turn;
    /// memory capacities apply to sessions created afterwards.
    pub fn reconfigure(&self, config: PathosConfig) -> Result<(), ConfigError> {
        self.config.replace(config)
    }

    /// Ids of the conversations currently held in memory.
    pub async fn conversation_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn slot(&self, id: &str) -> SlotHandle {
        self.sessions
            .lock()
            .await
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Free an id whose stored snapshot cannot be decoded. Returns false
    /// when the snapshot could not be moved aside.
    async fn quarantine(&self, id: &str, cause: &PersistenceError) -> bool {
        match self.store.quarantine_session(id).await {
            Ok(moved_to) => {
                tracing::warn!(
                    session = id,
                    moved_to = ?moved_to,
                    "Stored session unreadable, moved aside and starting fresh: {}",
                    cause
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    session = id,
                    "Stored session unreadable and could not be moved aside: {}",
                    e
                );
                false
            }
        }
    }

    async fn load_slot(&self, id: &str, config: &PathosConfig) -> SessionSlot {
        match self.store.load_session(id).await {
            Ok(Some(session)) => {
                tracing::info!(session = id, turn = session.turn, "Session resumed from store");
                SessionSlot::loaded(session)
            }
            Ok(None) => {
                tracing::info!(session = id, persona = %config.persona.name, "New session");
                SessionSlot::loaded(Session::new(id, config))
            }
            Err(e @ PersistenceError::Serialization { .. }) => {
                if self.quarantine(id, &e).await {
                    SessionSlot::loaded(Session::new(id, config))
                } else {
                    SessionSlot::unverified(Session::new(id, config))
                }
            }
            Err(e) => {
                tracing::warn!(
                    session = id,
                    "Session load failed, continuing in memory and holding saves: {}",
                    e
                );
                SessionSlot::unverified(Session::new(id, config))
            }
        }
    }

    /// Retry the load for an unverified slot. A recovered snapshot becomes the
    /// base and the changes made in the meantime are replayed onto it.
    async fn reconcile(&self, id: &str, slot: &mut SessionSlot, config: &Arc<PathosConfig>) {
        if slot.verified {
            return;
        }
        let stored = match self.store.load_session(id).await {
            Ok(found) => found,
            Err(e @ PersistenceError::Serialization { .. }) => {
                if !self.quarantine(id, &e).await {
                    return;
                }
                None
            }
            Err(e) => {
                tracing::debug!(session = id, "Store still unavailable, saves held: {}", e);
                return;
            }
        };

        let pending = std::mem::take(&mut slot.pending);
        if let Some(mut session) = stored {
            let planner = TurnPlanner::new(config.clone());
            let stored_turn = session.turn;
            for change in &pending {
                match change {
                    PendingChange::Turn(message) => session = planner.plan(&session, message).next,
                    PendingChange::Persona(persona) => session.persona = persona.clone(),
                }
            }
            tracing::info!(
                session = id,
                stored_turn,
                replayed = pending.len(),
                "Stored session recovered, interim changes replayed"
            );
            slot.session = session;
        }
        slot.verified = true;
    }

    async fn ensure_loaded<'a>(
        &self,
        slot: &'a mut Option<SessionSlot>,
        id: &str,
        config: &Arc<PathosConfig>,
    ) -> &'a mut SessionSlot {
        match slot {
            Some(existing) => {
                self.reconcile(id, existing, config).await;
                existing
            }
            empty => empty.insert(self.load_slot(id, config).await),
        }
    }

    /// Persist a dirty session. Failure keeps it dirty for the next checkpoint.
    async fn checkpoint(&self, id: &str, slot: &mut SessionSlot) {
        if !slot.dirty {
            return;
        }
        if !slot.verified {
            tracing::debug!(
                session = id,
                turn = slot.session.turn,
                "Checkpoint held until the store answers"
            );
            return;
        }
        match self.store.save_session(id, &slot.session).await {
            Ok(()) => {
                slot.dirty = false;
                tracing::debug!(session = id, turn = slot.session.turn, "Checkpoint saved");
            }
            Err(e) => {
                tracing::warn!(
                    session = id,
                    turn = slot.session.turn,
                    "Checkpoint failed, continuing in memory: {}",
                    e
                );
            }
        }
    }

    /// Process one user message. Never fails: provider and persistence
    /// problems degrade the result instead.
    pub async fn submit_turn(&self, conversation_id: &str, message: &str) -> TurnResult {
        let config = self.config.current();
        let handle = self.slot(conversation_id).await;
        let mut guard = handle.lock().await;
        let slot = self.ensure_loaded(&mut guard, conversation_id, &config).await;

        let PreparedTurn {
            next,
            directive,
            reflection,
            appraisal,
            ..
        } = TurnPlanner::new(config.clone()).plan(&slot.session, message);

        // Commit: from here on the turn is fully applied.
        slot.session = next;
        slot.dirty = true;
        slot.record(PendingChange::Turn(message.to_string()));
        self.checkpoint(conversation_id, slot).await;

        tracing::debug!(
            session = conversation_id,
            turn = slot.session.turn,
            emotion = %appraisal.emotion,
            confidence = appraisal.confidence,
            mood = slot.session.mood.label(),
            strategy = directive.strategy.as_str(),
            "Turn committed"
        );

        if directive.is_safe_mode() {
            tracing::info!(
                session = conversation_id,
                indicators = ?directive.safety.indicators,
                "Crisis indicators present, replying in safe mode"
            );
            return TurnResult {
                reply_text: config.safety.crisis_reply.clone(),
                reflection,
                degraded: false,
            };
        }

        let prompt = PromptBuilder::new(config.llm.context_budget_chars).build(
            &slot.session.persona,
            &directive,
            message,
        );
        let params = CompletionParams::modulated(&config.llm, &directive.sampling);
        let timeout = Duration::from_secs(config.llm.timeout_secs);

        match self.generate(&prompt, params, timeout, &directive.style).await {
            Ok(reply_text) => TurnResult {
                reply_text,
                reflection,
                degraded: false,
            },
            Err(e) => {
                tracing::warn!(
                    session = conversation_id,
                    provider = self.client.name(),
                    "Generation failed, using fallback reply: {}",
                    e
                );
                TurnResult {
                    reply_text: config.llm.fallback_reply.clone(),
                    reflection,
                    degraded: true,
                }
            }
        }
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        params: CompletionParams,
        timeout: Duration,
        style: &StyleParams,
    ) -> Result<String, GenerationError> {
        let call = self.client.complete(&prompt.system, &prompt.user, params);
        let raw = match tokio::time::timeout(timeout, call).await {
            Err(_) => return Err(GenerationError::Timeout(timeout)),
            Ok(Err(e)) => return Err(GenerationError::Provider(format!("{:#}", e))),
            Ok(Ok(text)) => text,
        };
        let reply = sanitize_reply(&raw, style);
        if reply.is_empty() {
            return Err(GenerationError::Provider("empty response".into()));
        }
        Ok(reply)
    }

    /// Shift the conversation's persona bias. Out-of-range results are
    /// rejected and the persona stays as it was. Mood follows from the next turn.
    pub async fn adjust_persona(
        &self,
        conversation_id: &str,
        delta: PersonaDelta,
    ) -> Result<PersonaBias, ConfigError> {
        let config = self.config.current();
        let handle = self.slot(conversation_id).await;
        let mut guard = handle.lock().await;
        let slot = self.ensure_loaded(&mut guard, conversation_id, &config).await;

        let adjusted = slot.session.persona.bias.adjust(delta).map_err(|e| {
            tracing::warn!(session = conversation_id, "Persona adjustment rejected: {}", e);
            e
        })?;
        slot.session.persona.bias = adjusted;
        slot.dirty = true;
        slot.record(PendingChange::Persona(slot.session.persona.clone()));
        self.checkpoint(conversation_id, slot).await;

        tracing::info!(
            session = conversation_id,
            optimism = adjusted.optimism,
            energy = adjusted.energy,
            confidence = adjusted.confidence,
            "Persona adjusted"
        );
        Ok(adjusted)
    }

    /// Replace the conversation's whole persona (e.g. a preset).
    pub async fn set_persona(
        &self,
        conversation_id: &str,
        persona: PersonaProfile,
    ) -> Result<(), ConfigError> {
        persona.validate()?;
        let config = self.config.current();
        let handle = self.slot(conversation_id).await;
        let mut guard = handle.lock().await;
        let slot = self.ensure_loaded(&mut guard, conversation_id, &config).await;

        tracing::info!(session = conversation_id, persona = %persona.name, "Persona switched");
        slot.session.persona = persona;
        slot.dirty = true;
        slot.record(PendingChange::Persona(slot.session.persona.clone()));
        self.checkpoint(conversation_id, slot).await;
        Ok(())
    }

    /// A copy of the conversation's current state, from memory or the store.
    pub async fn session_snapshot(&self, conversation_id: &str) -> Option<Session> {
        let handle = self.sessions.lock().await.get(conversation_id).cloned();
        if let Some(handle) = handle {
            if let Some(slot) = handle.lock().await.as_ref() {
                return Some(slot.session.clone());
            }
        }
        match self.store.load_session(conversation_id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(session = conversation_id, "Snapshot load failed: {}", e);
                None
            }
        }
    }

    /// Retry every held load and pending checkpoint. Returns how many
    /// sessions are still unsaved.
    pub async fn flush(&self) -> usize {
        let config = self.config.current();
        let handles: Vec<(String, SlotHandle)> = self
            .sessions
            .lock()
            .await
            .iter()
            .map(|(id, h)| (id.clone(), h.clone()))
            .collect();

        let mut unsaved = 0;
        for (id, handle) in handles {
            let mut guard = handle.lock().await;
            if let Some(slot) = guard.as_mut() {
                self.reconcile(&id, slot, &config).await;
                self.checkpoint(&id, slot).await;
                if slot.dirty {
                    unsaved += 1;
                }
            }
        }
        if unsaved > 0 {
            tracing::warn!(unsaved, "Some sessions could not be persisted");
        }
        unsaved
    }

    /// Save the conversation and release its in-memory state. Returns false
    /// when the state could not be saved; it is then kept for a later retry.
    pub async fn close_conversation(&self, conversation_id: &str) -> bool {
        let Some(handle) = self.sessions.lock().await.get(conversation_id).cloned() else {
            return true;
        };
        let config = self.config.current();
        {
            let mut guard = handle.lock().await;
            if let Some(slot) = guard.as_mut() {
                self.reconcile(conversation_id, slot, &config).await;
                self.checkpoint(conversation_id, slot).await;
                if slot.dirty {
                    tracing::warn!(session = conversation_id, "Close deferred, session not saved");
                    return false;
                }
            }
            *guard = None;
        }

        // Only drop the map entry when no concurrent call holds the handle;
        // otherwise the emptied slot reloads from the store on next use.
        let mut sessions = self.sessions.lock().await;
        let ours = sessions
            .get(conversation_id)
            .is_some_and(|current| Arc::ptr_eq(current, &handle));
        if ours && Arc::strong_count(&handle) == 2 {
            sessions.remove(conversation_id);
        }
        tracing::info!(session = conversation_id, "Conversation closed");
        true
    }
}
