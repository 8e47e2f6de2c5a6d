//! Conversation engine — the per-turn state machine.
//!
//! Each inbound message is one synchronous read-modify-write of the user's
//! durable record plus their transient dialogue session. Turn priority:
//!
//! 1. Onboarding sub-dialogue while the profile is incomplete.
//! 2. Fixed welcome on the first message of a session.
//! 3. Pending goal confirmation (yes/no).
//! 4. Pending target-weight capture.
//! 5. Steady state: intent classification, with the answer generator as
//!    the catch-all.
//!
//! Turns for the same user are serialized on a per-user async lock; turns
//! for different users run in parallel. No path returns an error to the
//! end user — generator failures become a fixed fallback reply.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::BotConfig;
use crate::dialogue::{DialogueSession, DialogueState, OnboardingStep};
use crate::error::{ChatError, GenerationError, Result};
use crate::generator::{AnswerGenerator, prompt};
use crate::goals::{Goal, GoalDirection};
use crate::intent::{self, Intent};
use crate::milestones::{self, Milestone};
use crate::profile::{Gender, ProfileSetup, UserProfile};
use crate::store::Store;
use crate::vision::IngredientDetector;
use crate::weight::WeightEntry;

const WELCOME: &str = "Welcome to Nutri Assist! Ask me anything about food and diet, \
or tell me about a weight goal you'd like to work on.";

const GREETING_REPLY: &str = "Hello! How can I help with your nutrition today?";

const FAREWELL_REPLY: &str = "Goodbye! Keep up the healthy habits — I'll be here.";

const PROFILE_REDIRECT: &str =
    "I don't have your current weight on record yet. Let's complete your profile first.";

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern is valid"));

/// First decimal number in free text, if any.
fn first_number(text: &str) -> Option<f64> {
    NUMBER_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Result of a weight-log operation.
#[derive(Debug, Clone)]
pub struct WeightLogOutcome {
    pub entry: WeightEntry,
    /// Milestones newly unlocked by this entry, in catalog order.
    pub unlocked: Vec<Milestone>,
}

/// The orchestrator: owns dialogue sessions and drives the profile
/// calculator, intent classifier, milestone evaluator and answer generator.
pub struct ConversationEngine {
    store: Arc<dyn Store>,
    generator: Arc<dyn AnswerGenerator>,
    detector: Option<Arc<dyn IngredientDetector>>,
    config: BotConfig,
    /// Transient dialogue state, keyed by user id. The inner lock doubles
    /// as the per-user turn serializer.
    sessions: Mutex<HashMap<String, Arc<Mutex<DialogueSession>>>>,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<dyn Store>,
        generator: Arc<dyn AnswerGenerator>,
        config: BotConfig,
    ) -> Self {
        Self {
            store,
            generator,
            detector: None,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Attach an ingredient detector for the grocery intake path.
    pub fn with_detector(mut self, detector: Arc<dyn IngredientDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Get (or create) the dialogue session handle for a user.
    async fn session(&self, user_id: &str) -> Arc<Mutex<DialogueSession>> {
        let mut sessions = self.sessions.lock().await;
        Arc::clone(sessions.entry(user_id.to_string()).or_default())
    }

    /// Handle one chat turn. Always yields a reply string; the only error
    /// paths are store failures, which the boundary maps to the fallback.
    pub async fn handle_message(&self, user_id: &str, message: &str) -> Result<String> {
        let handle = self.session(user_id).await;
        let mut session = handle.lock().await;
        let reply = self.turn(user_id, &mut session, message).await?;

        // A farewell resets the session to its default, so the map entry is
        // dead weight; evict it rather than let one-off users accumulate.
        if !session.started {
            drop(session);
            self.sessions.lock().await.remove(user_id);
        }
        Ok(reply)
    }

    async fn turn(
        &self,
        user_id: &str,
        session: &mut DialogueSession,
        message: &str,
    ) -> Result<String> {
        let mut profile = self.store.get_profile(user_id).await?.unwrap_or_default();

        debug!(user_id, state = ?session.state, "Handling turn");

        if !profile.completed {
            return self
                .onboarding_turn(user_id, session, &mut profile, message)
                .await;
        }

        if !session.started {
            // The first message of a session gets the welcome regardless of
            // its content; it is not processed as a command.
            session.started = true;
            return Ok(WELCOME.to_string());
        }

        match session.state {
            DialogueState::AwaitingGoalConfirmation { direction } => {
                Ok(self.goal_confirmation_turn(session, &profile, direction, message))
            }
            DialogueState::AwaitingTargetWeight { direction } => {
                self.target_weight_turn(user_id, session, &mut profile, direction, message)
                    .await
            }
            DialogueState::Idle | DialogueState::Onboarding { .. } => {
                self.steady_turn(user_id, session, &profile, message).await
            }
        }
    }

    // ── Onboarding sub-dialogue ─────────────────────────────────────

    async fn onboarding_turn(
        &self,
        user_id: &str,
        session: &mut DialogueSession,
        profile: &mut UserProfile,
        message: &str,
    ) -> Result<String> {
        let DialogueState::Onboarding { step } = session.state else {
            // Kick off: greet and ask the first question. The triggering
            // message itself is not interpreted.
            session.started = true;
            session.state = DialogueState::Onboarding {
                step: OnboardingStep::Age,
            };
            return Ok(format!(
                "Welcome to Nutri Assist! Let's set up your profile. {}",
                OnboardingStep::Age.prompt()
            ));
        };

        match step {
            OnboardingStep::Age => {
                let Some(age) = first_number(message)
                    .filter(|n| *n > 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX))
                else {
                    return Ok("Please give me your age as a whole number, e.g. 30.".to_string());
                };
                profile.age = Some(age as u32);
            }
            OnboardingStep::Height => {
                let Some(height) = first_number(message).filter(|n| *n > 0.0) else {
                    return Ok(
                        "Please give me your height in centimeters, e.g. 170.".to_string()
                    );
                };
                profile.height_cm = Some(height);
            }
            OnboardingStep::Weight => {
                let Some(weight) = first_number(message).filter(|n| *n > 0.0) else {
                    return Ok(
                        "Please give me your weight in kilograms, e.g. 65.".to_string()
                    );
                };
                profile.weight_kg = Some(weight);
            }
            OnboardingStep::Gender => {
                if message.trim().is_empty() {
                    return Ok(OnboardingStep::Gender.prompt().to_string());
                }
                profile.gender = Some(Gender::parse(message));
            }
        }

        let reply = match step.next() {
            Some(next) => {
                session.state = DialogueState::Onboarding { step: next };
                next.prompt().to_string()
            }
            None => {
                // Gender was the last field: onboarding finishes here.
                profile.completed = true;
                profile.completed_at = Some(chrono::Utc::now());
                profile.refresh_derived();
                session.resolve();
                self.completion_reply(profile)
            }
        };

        self.store.upsert_profile(user_id, profile).await?;
        Ok(reply)
    }

    /// Confirmation shown when the profile completes, summarizing the
    /// derived metrics.
    fn completion_reply(&self, profile: &UserProfile) -> String {
        match (profile.bmi, profile.bmi_category, profile.daily_calories) {
            (Some(bmi), Some(category), Some(calories)) => format!(
                "Gender recorded — you're all set! Your BMI is {bmi:.2} ({category}) and \
                 your estimated daily need is about {calories:.0} kcal. Ask me anything, \
                 or tell me about a weight goal."
            ),
            _ => "Gender recorded — you're all set! Ask me anything about nutrition.".to_string(),
        }
    }

    // ── Goal sub-dialogues ──────────────────────────────────────────

    fn goal_confirmation_turn(
        &self,
        session: &mut DialogueSession,
        profile: &UserProfile,
        direction: GoalDirection,
        message: &str,
    ) -> String {
        // Whole-token match: "I don't know yet" contains "no" as a substring
        // but is not a decline.
        let lower = message.to_lowercase();
        if intent::has_token(&lower, "yes") {
            let Some(current) = profile.weight_kg else {
                session.resolve();
                return PROFILE_REDIRECT.to_string();
            };
            session.state = DialogueState::AwaitingTargetWeight { direction };
            format!(
                "Great! You're at {current:.1} kg right now. What target weight (in kg) \
                 should we aim for?"
            )
        } else if intent::has_token(&lower, "no") {
            session.resolve();
            "No problem — no tracked goal then. I'm still happy to answer questions.".to_string()
        } else {
            // Neither yes nor no: keep the proposal pending and ask again.
            format!(
                "Just to confirm — should I set up a tracked {direction}-weight program \
                 for you? (yes/no)"
            )
        }
    }

    async fn target_weight_turn(
        &self,
        user_id: &str,
        session: &mut DialogueSession,
        profile: &mut UserProfile,
        direction: GoalDirection,
        message: &str,
    ) -> Result<String> {
        let Some(current) = profile.weight_kg else {
            session.resolve();
            return Ok(PROFILE_REDIRECT.to_string());
        };
        let Some(target) = first_number(message) else {
            return Ok("I need a number — what target weight in kg?".to_string());
        };

        match Goal::new(direction, target, current) {
            Ok(goal) => {
                self.store.set_goal(user_id, &goal).await?;
                profile.target_weight = Some(target);
                self.store.upsert_profile(user_id, profile).await?;
                session.resolve();
                Ok(format!(
                    "Done — goal set: {direction} from {current:.1} kg to {target:.1} kg. \
                     Log your weight regularly and I'll track your progress."
                ))
            }
            // Wrong direction: correct the user and keep waiting.
            Err(ChatError::Validation(correction)) => Ok(correction),
            Err(e) => Err(e.into()),
        }
    }

    // ── Steady state ────────────────────────────────────────────────

    async fn steady_turn(
        &self,
        user_id: &str,
        session: &mut DialogueSession,
        profile: &UserProfile,
        message: &str,
    ) -> Result<String> {
        match intent::classify(message) {
            Intent::Greeting => Ok(GREETING_REPLY.to_string()),
            Intent::Farewell => {
                session.end();
                Ok(FAREWELL_REPLY.to_string())
            }
            Intent::MythTrigger(correction) => Ok(correction.to_string()),
            Intent::WeightLossIntent => {
                session.state = DialogueState::AwaitingGoalConfirmation {
                    direction: GoalDirection::Lose,
                };
                Ok(self.propose_goal(GoalDirection::Lose))
            }
            Intent::WeightGainIntent => {
                session.state = DialogueState::AwaitingGoalConfirmation {
                    direction: GoalDirection::Gain,
                };
                Ok(self.propose_goal(GoalDirection::Gain))
            }
            Intent::WeightQuestion | Intent::Unclassified => {
                Ok(self.answer(user_id, profile, message).await)
            }
        }
    }

    fn propose_goal(&self, direction: GoalDirection) -> String {
        format!(
            "It sounds like you'd like to {direction} weight. Want me to set up a \
             tracked program for you? (yes/no)"
        )
    }

    /// Delegate to the answer generator. Failures are logged and replaced
    /// with the configured fallback — never surfaced to the user.
    async fn answer(&self, user_id: &str, profile: &UserProfile, message: &str) -> String {
        let prompt = prompt::build_prompt(message, profile);
        match self.generator.generate(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(user_id, error = %e, "Answer generator failed; using fallback");
                self.config.fallback_reply.clone()
            }
        }
    }

    // ── Boundary operations ─────────────────────────────────────────

    /// One-shot profile setup (the non-chat path). Completes the profile
    /// and clears any pending onboarding question.
    pub async fn setup_profile(
        &self,
        user_id: &str,
        setup: &ProfileSetup,
    ) -> Result<UserProfile> {
        let session = self.session(user_id).await;
        let mut session = session.lock().await;

        let mut profile = self.store.get_profile(user_id).await?.unwrap_or_default();
        setup.apply(&mut profile)?;
        self.store.upsert_profile(user_id, &profile).await?;
        session.resolve();
        Ok(profile)
    }

    /// Append a weight entry, refresh the profile's derived fields and
    /// evaluate milestones.
    pub async fn log_weight(
        &self,
        user_id: &str,
        weight_kg: f64,
        notes: Option<String>,
    ) -> Result<WeightLogOutcome> {
        if !weight_kg.is_finite() || weight_kg <= 0.0 {
            return Err(ChatError::Validation(
                "Weight must be a positive number of kilograms.".to_string(),
            )
            .into());
        }

        let session = self.session(user_id).await;
        let _turn = session.lock().await;

        let mut record = self.store.load_record(user_id).await?;
        if !record.profile.completed {
            return Err(ChatError::ProfileIncomplete {
                user_id: user_id.to_string(),
            }
            .into());
        }

        let entry = WeightEntry::new(weight_kg, record.profile.height_cm, notes);
        self.store.append_weight_entry(user_id, &entry).await?;
        record.entries.push(entry.clone());

        record.profile.weight_kg = Some(weight_kg);
        record.profile.refresh_derived();
        self.store.upsert_profile(user_id, &record.profile).await?;

        let already: HashSet<String> = record.milestones.iter().map(|m| m.id.clone()).collect();
        let unlocked = milestones::evaluate(
            &record.entries,
            record.goal.as_ref(),
            record.profile.target_weight,
            &already,
        );
        for milestone in &unlocked {
            debug!(user_id, milestone = %milestone.id, "Milestone unlocked");
            self.store.insert_milestone(user_id, milestone).await?;
        }

        Ok(WeightLogOutcome { entry, unlocked })
    }

    /// Grocery intake: run the detector and append whatever it returns.
    pub async fn ingest_grocery_photo(
        &self,
        user_id: &str,
        image: &[u8],
    ) -> Result<Vec<String>> {
        let Some(detector) = &self.detector else {
            return Err(GenerationError::Detection(
                "No ingredient detector configured".to_string(),
            )
            .into());
        };
        let names = detector.detect(image).await?;
        if !names.is_empty() {
            self.store.add_grocery_items(user_id, &names).await?;
        }
        Ok(names)
    }
}
