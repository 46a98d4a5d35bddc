//! IntakeSession owns one conversation and drives it step by step.
//!
//! The presentation layer never mutates session state directly. It either
//! calls the entry points (`toggle_symptom`, `select_gender`, ...) or sends
//! an [`IntakeEvent`] through [`IntakeSession::dispatch`] / [`reduce`].
//! Input that does not fit the current step is ignored, so the flow can't
//! dead-end.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::classifier::KeywordClassifier;
use super::messages::{Chip, Message, MessageContent, MessageLog, Role};
use super::model::{AgeRange, Criteria, GenderPreference, Recommendation};
use super::recommend::{CandidateSource, recommend};
use super::selection::SelectionState;
use super::state::{ConversationStep, next_in};
use super::tier::{RandomTier, SubscriptionTier, TierPolicy};
use crate::config::IntakeConfig;
use crate::error::IntakeError;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// A user gesture the session reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IntakeEvent {
    /// Open the symptom sheet of a category.
    OpenCategory { category: String },
    ToggleSymptom { category: String, symptom: String },
    /// Switch to "describe in my own words"; wipes structured selections.
    EnterFreeText,
    SubmitFreeText { text: String },
    /// The "Next" button of the current step.
    Advance,
    SelectGender { gender: GenderPreference },
    ToggleAge { range: AgeRange },
    ToggleMethod { method: String },
    SkipMethods,
    /// A chip tapped on any question still in the log.
    ClickChip { message_id: Uuid, chip: Chip },
    Restart,
}

/// What an event did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Not applicable to the current state; nothing changed.
    Ignored,
    /// State changed, same step.
    Updated,
    /// Moved forward.
    Advanced {
        from: ConversationStep,
        to: ConversationStep,
    },
    /// An earlier answer was edited; the session now sits at `to`.
    Rewound {
        edited: ConversationStep,
        to: ConversationStep,
    },
}

/// One intake conversation.
#[derive(Clone)]
pub struct IntakeSession {
    config: Arc<IntakeConfig>,
    classifier: KeywordClassifier,
    candidates: Arc<dyn CandidateSource>,
    tier_policy: Arc<dyn TierPolicy>,
    tier: Option<SubscriptionTier>,

    step: ConversationStep,
    selection: SelectionState,
    active_category: Option<String>,
    free_text_mode: bool,
    free_text: Option<String>,
    symptoms: BTreeSet<String>,
    gender: Option<GenderPreference>,
    age_ranges: BTreeSet<AgeRange>,
    methods: BTreeSet<String>,

    criteria: Option<Criteria>,
    outcome: Option<Recommendation>,
    log: MessageLog,
}

impl IntakeSession {
    /// Start a conversation: logs the greeting and the first question.
    pub fn new(config: Arc<IntakeConfig>, candidates: Arc<dyn CandidateSource>) -> Self {
        let classifier = KeywordClassifier::new(&config.catalog);
        let mut session = Self {
            config,
            classifier,
            candidates,
            tier_policy: Arc::new(RandomTier::default()),
            tier: None,
            step: ConversationStep::Category,
            selection: SelectionState::new(),
            active_category: None,
            free_text_mode: false,
            free_text: None,
            symptoms: BTreeSet::new(),
            gender: None,
            age_ranges: BTreeSet::new(),
            methods: BTreeSet::new(),
            criteria: None,
            outcome: None,
            log: MessageLog::new(),
        };
        session.start();
        session
    }

    /// Replace the tier policy. Takes effect if the tier is not resolved yet.
    pub fn with_tier_policy(mut self, policy: Arc<dyn TierPolicy>) -> Self {
        self.tier_policy = policy;
        self
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn current_step(&self) -> ConversationStep {
        self.step
    }

    pub fn messages(&self) -> &[Message] {
        self.log.as_slice()
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn selected_count(&self, category_id: &str) -> usize {
        self.selection.selected_count(category_id)
    }

    pub fn active_category(&self) -> Option<&str> {
        self.active_category.as_deref()
    }

    pub fn is_free_text_mode(&self) -> bool {
        self.free_text_mode
    }

    pub fn free_text(&self) -> Option<&str> {
        self.free_text.as_deref()
    }

    /// Symptoms fixed when the category step was left.
    pub fn symptoms(&self) -> &BTreeSet<String> {
        &self.symptoms
    }

    pub fn gender(&self) -> Option<GenderPreference> {
        self.gender
    }

    pub fn age_ranges(&self) -> &BTreeSet<AgeRange> {
        &self.age_ranges
    }

    pub fn methods(&self) -> &BTreeSet<String> {
        &self.methods
    }

    /// The subscription tier, once resolved.
    pub fn tier(&self) -> Option<SubscriptionTier> {
        self.tier
    }

    /// Criteria used by the last search.
    pub fn last_criteria(&self) -> Option<&Criteria> {
        self.criteria.as_ref()
    }

    /// Result of the last search.
    pub fn outcome(&self) -> Option<&Recommendation> {
        self.outcome.as_ref()
    }

    /// Criteria as they stand now.
    pub fn criteria(&self) -> Criteria {
        Criteria {
            symptoms: self.symptoms.clone(),
            gender: self.gender,
            age_ranges: self.age_ranges.clone(),
            methods: self.methods.clone(),
        }
    }

    // ── Event dispatch ──────────────────────────────────────────────────

    pub fn dispatch(&mut self, event: IntakeEvent) -> EventOutcome {
        match event {
            IntakeEvent::OpenCategory { category } => self.open_category(&category),
            IntakeEvent::ToggleSymptom { category, symptom } => {
                self.toggle_symptom(&category, &symptom)
            }
            IntakeEvent::EnterFreeText => self.enter_free_text(),
            IntakeEvent::SubmitFreeText { text } => self.submit_free_text(&text),
            IntakeEvent::Advance => self.advance(),
            IntakeEvent::SelectGender { gender } => self.select_gender(gender),
            IntakeEvent::ToggleAge { range } => self.toggle_age(range),
            IntakeEvent::ToggleMethod { method } => self.toggle_method(&method),
            IntakeEvent::SkipMethods => self.skip_methods(),
            IntakeEvent::ClickChip { message_id, chip } => self.click_chip(message_id, chip),
            IntakeEvent::Restart => self.restart(),
        }
    }

    // ── Category step ───────────────────────────────────────────────────

    pub fn open_category(&mut self, category_id: &str) -> EventOutcome {
        if !self.expect_step(ConversationStep::Category) {
            return EventOutcome::Ignored;
        }
        if self.config.catalog.category(category_id).is_none() {
            let e = IntakeError::UnknownCategory(category_id.to_string());
            warn!(error = %e, "Ignoring category chip");
            return EventOutcome::Ignored;
        }
        self.active_category = Some(category_id.to_string());
        EventOutcome::Updated
    }

    pub fn toggle_symptom(&mut self, category_id: &str, symptom: &str) -> EventOutcome {
        if !self.expect_step(ConversationStep::Category) {
            return EventOutcome::Ignored;
        }
        match self
            .selection
            .toggle_symptom(&self.config.catalog, category_id, symptom)
        {
            Ok(selected) => {
                debug!(category = category_id, symptom, selected, "Toggled symptom");
                EventOutcome::Updated
            }
            Err(e) => {
                warn!(error = %e, "Ignoring symptom toggle");
                EventOutcome::Ignored
            }
        }
    }

    /// Switch to free-text input. Structured selections are discarded.
    pub fn enter_free_text(&mut self) -> EventOutcome {
        if !self.expect_step(ConversationStep::Category) {
            return EventOutcome::Ignored;
        }
        self.selection.clear();
        self.active_category = None;
        if !self.free_text_mode {
            self.free_text_mode = true;
            let invite = self.config.prompts.free_text_invite.clone();
            self.log.push(Message::bot(invite));
        }
        EventOutcome::Updated
    }

    /// Submit the free-text description and move on. Blank text is ignored.
    ///
    /// Submitting without entering free-text mode first switches the mode on,
    /// which discards structured selections like `enter_free_text` does.
    pub fn submit_free_text(&mut self, text: &str) -> EventOutcome {
        if !self.expect_step(ConversationStep::Category) {
            return EventOutcome::Ignored;
        }
        let text = WHITESPACE.replace_all(text.trim(), " ").into_owned();
        if text.is_empty() {
            return EventOutcome::Ignored;
        }
        if !self.free_text_mode {
            self.free_text_mode = true;
            self.selection.clear();
            self.active_category = None;
        }
        self.free_text = Some(text);
        self.advance_from_category()
    }

    fn advance_from_category(&mut self) -> EventOutcome {
        let has_text = self.free_text.as_deref().is_some_and(|t| !t.is_empty());
        if self.selection.is_empty() && !has_text {
            debug!("Nothing selected yet, staying on category step");
            return EventOutcome::Ignored;
        }

        if !self.selection.is_empty() {
            let summary = self.selection.summary(&self.config.catalog);
            self.log.push(Message::user(summary));
        }
        if let Some(text) = self.free_text.clone() {
            self.log.push(Message::user(text));
        }

        let mut symptoms = self.selection.all_selected();
        if let Some(text) = self.free_text.as_deref() {
            symptoms.extend(self.classifier.classify(text));
        }
        self.symptoms = symptoms;
        self.active_category = None;

        if self.config.content_branch && self.resolve_tier() == SubscriptionTier::Free {
            return self.enter_content_recommendation();
        }

        match next_in(&self.config.steps, ConversationStep::Category) {
            Some(next) => self.enter_step(next),
            None => EventOutcome::Ignored,
        }
    }

    fn resolve_tier(&mut self) -> SubscriptionTier {
        if let Some(tier) = self.tier {
            return tier;
        }
        let tier = self.tier_policy.resolve();
        debug!(%tier, "Resolved subscription tier");
        self.tier = Some(tier);
        tier
    }

    fn enter_content_recommendation(&mut self) -> EventOutcome {
        let from = self.step;
        let topics: Vec<String> = self.symptoms.iter().cloned().collect();
        let reading = self.config.catalog.reading_for(&self.symptoms);
        self.log.push(Message::new(
            Role::Bot,
            MessageContent::ContentRecommendation {
                text: self.config.prompts.content_recommendation.clone(),
                topics,
                reading,
            },
        ));
        self.step = ConversationStep::ContentRecommendation;
        debug!(from = %from, "Diverted to content recommendation");
        EventOutcome::Advanced {
            from,
            to: self.step,
        }
    }

    // ── Gender, age, and method steps ───────────────────────────────────

    pub fn select_gender(&mut self, gender: GenderPreference) -> EventOutcome {
        if !self.expect_step(ConversationStep::Gender) {
            return EventOutcome::Ignored;
        }
        self.gender = Some(gender);
        let label = self.config.prompts.gender_label(gender).to_string();
        self.log.push(Message::user(label));
        self.move_on()
    }

    pub fn toggle_age(&mut self, range: AgeRange) -> EventOutcome {
        if !self.expect_step(ConversationStep::Age) {
            return EventOutcome::Ignored;
        }
        if !self.age_ranges.remove(&range) {
            self.age_ranges.insert(range);
        }
        EventOutcome::Updated
    }

    pub fn toggle_method(&mut self, method: &str) -> EventOutcome {
        if !self.expect_step(ConversationStep::Method) {
            return EventOutcome::Ignored;
        }
        let Some(canonical) = self.config.catalog.canonical_method(method) else {
            let e = IntakeError::UnknownMethod(method.to_string());
            warn!(error = %e, "Ignoring method toggle");
            return EventOutcome::Ignored;
        };
        if !self.methods.remove(canonical) {
            self.methods.insert(canonical.to_string());
        }
        EventOutcome::Updated
    }

    /// Leave the method step without a preference.
    pub fn skip_methods(&mut self) -> EventOutcome {
        if !self.step.is_skippable() {
            debug!(current = %self.step, "Current step cannot be skipped");
            return EventOutcome::Ignored;
        }
        self.methods.clear();
        let answer = self.config.prompts.no_method_answer.clone();
        self.log.push(Message::user(answer));
        self.move_on()
    }

    /// The "Next" button. Only moves when the current step has an answer.
    pub fn advance(&mut self) -> EventOutcome {
        if self.step.is_terminal() {
            debug!(current = %self.step, "Conversation is over, nothing to advance");
            return EventOutcome::Ignored;
        }
        match self.step {
            ConversationStep::Category => self.advance_from_category(),
            ConversationStep::Gender => {
                if self.gender.is_none() {
                    return EventOutcome::Ignored;
                }
                self.move_on()
            }
            ConversationStep::Age => {
                if self.age_ranges.is_empty() {
                    return EventOutcome::Ignored;
                }
                let answer = self
                    .age_ranges
                    .iter()
                    .map(AgeRange::label)
                    .collect::<Vec<_>>()
                    .join(", ");
                self.log.push(Message::user(answer));
                self.move_on()
            }
            ConversationStep::Method => {
                if self.methods.is_empty() {
                    return EventOutcome::Ignored;
                }
                let answer = self.methods.iter().cloned().collect::<Vec<_>>().join(", ");
                self.log.push(Message::user(answer));
                self.move_on()
            }
            ConversationStep::Loading
            | ConversationStep::Results
            | ConversationStep::ContentRecommendation => EventOutcome::Ignored,
        }
    }

    fn move_on(&mut self) -> EventOutcome {
        match next_in(&self.config.steps, self.step) {
            Some(next) => self.enter_step(next),
            None => EventOutcome::Ignored,
        }
    }

    fn enter_step(&mut self, next: ConversationStep) -> EventOutcome {
        let from = self.step;
        if !from.can_transition_to(next, &self.config.steps) {
            let e = IntakeError::InvalidTransition {
                from: from.to_string(),
                to: next.to_string(),
            };
            warn!(error = %e, "Refusing step change");
            return EventOutcome::Ignored;
        }

        debug!(from = %from, to = %next, "Step transition");
        self.step = next;

        if next == ConversationStep::Loading {
            self.run_search();
        } else {
            self.ask(next);
        }

        EventOutcome::Advanced {
            from,
            to: self.step,
        }
    }

    fn ask(&mut self, step: ConversationStep) {
        let prompts = &self.config.prompts;
        let text = prompts.question_text(step).to_string();
        let chips = prompts.chips(step, &self.config.catalog);
        self.log.push(Message::question(step, text, chips));
    }

    /// Loading → Results: run the engine over the candidate table.
    fn run_search(&mut self) {
        let criteria = self.criteria();
        let recommendation = recommend(
            &criteria,
            self.candidates.candidates(),
            &self.config.catalog,
            self.config.limits,
        );

        self.log.push(Message::new(
            Role::Bot,
            MessageContent::Results {
                text: self.config.prompts.results_text(&recommendation).to_string(),
                recommendation: recommendation.clone(),
            },
        ));

        self.criteria = Some(criteria);
        self.outcome = Some(recommendation);
        self.step = ConversationStep::Results;
    }

    // ── Chips and editing ───────────────────────────────────────────────

    /// Handle a tap on a chip of the question `message_id`.
    ///
    /// A chip on the current question is a normal answer. A chip on an
    /// earlier question rewinds the conversation to that question and
    /// replays the chip there. Anything else is ignored.
    pub fn click_chip(&mut self, message_id: Uuid, chip: Chip) -> EventOutcome {
        let Some(question) = self.log.find(message_id) else {
            let e = IntakeError::MessageNotFound(message_id);
            debug!(error = %e, "Ignoring stale chip");
            return EventOutcome::Ignored;
        };
        let Some(step) = question.question_step() else {
            debug!(%message_id, "Ignoring chip on a message that is not a question");
            return EventOutcome::Ignored;
        };
        if !question.offers(&chip) {
            debug!(chip_step = %chip.step(), question_step = %step, ?chip, "Chip is not offered by question");
            return EventOutcome::Ignored;
        }

        if step == self.step {
            return self.apply_chip(chip);
        }

        self.rewind_to(message_id, step);
        self.apply_chip(chip);
        EventOutcome::Rewound {
            edited: step,
            to: self.step,
        }
    }

    fn apply_chip(&mut self, chip: Chip) -> EventOutcome {
        match chip {
            Chip::Category(id) => self.open_category(&id),
            Chip::FreeText => self.enter_free_text(),
            Chip::Gender(gender) => self.select_gender(gender),
            Chip::Age(range) => self.toggle_age(range),
            Chip::Method(method) => self.toggle_method(&method),
            Chip::SkipMethod => self.skip_methods(),
        }
    }

    /// Truncate the log after the question and forget every answer given
    /// after `step`.
    fn rewind_to(&mut self, question_id: Uuid, step: ConversationStep) {
        let removed = self.log.truncate_after(question_id).unwrap_or(0);
        debug!(step = %step, removed, "Rewinding conversation");

        let later: Vec<ConversationStep> = self
            .config
            .steps
            .iter()
            .skip_while(|s| **s != step)
            .skip(1)
            .copied()
            .collect();

        for s in later {
            match s {
                ConversationStep::Gender => self.gender = None,
                ConversationStep::Age => self.age_ranges.clear(),
                ConversationStep::Method => self.methods.clear(),
                _ => {}
            }
        }
        if step == ConversationStep::Category {
            self.symptoms.clear();
        }
        self.criteria = None;
        self.outcome = None;
        self.step = step;
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Throw away all answers and start over. The resolved tier is kept.
    pub fn restart(&mut self) -> EventOutcome {
        let from = self.step;
        self.selection.clear();
        self.active_category = None;
        self.free_text_mode = false;
        self.free_text = None;
        self.symptoms.clear();
        self.gender = None;
        self.age_ranges.clear();
        self.methods.clear();
        self.criteria = None;
        self.outcome = None;
        self.log.clear();
        self.start();
        debug!(from = %from, "Conversation restarted");
        EventOutcome::Rewound {
            edited: ConversationStep::Category,
            to: self.step,
        }
    }

    fn start(&mut self) {
        self.step = ConversationStep::Category;
        let greeting = self.config.prompts.greeting.clone();
        self.log.push(Message::bot(greeting));
        self.ask(ConversationStep::Category);
    }

    fn expect_step(&self, step: ConversationStep) -> bool {
        if self.step == step {
            true
        } else {
            debug!(current = %self.step, expected = %step, "Event does not apply to current step");
            false
        }
    }
}

/// Apply `event` and hand the session back.
pub fn reduce(mut session: IntakeSession, event: IntakeEvent) -> IntakeSession {
    session.dispatch(event);
    session
}
