//! Conversation orchestrator
//!
//! The state machine that drives a session: questionnaire, product intro,
//! allocation rounds, model-generated recommendations, free chat, and
//! finalization. Transitions are explicit functions over a `Session` value;
//! each step returns the updated session plus the bot messages it emitted.
//!
//! Error discipline: malformed user input re-prompts and never advances the
//! stage; a model-endpoint failure appends a fixed apology and leaves the
//! stage where it was, so the user can retry the same input.

use crate::allocation::{format_amount, AllocationValidator};
use crate::catalog::{self, Bucket};
use crate::completion::CompletionClient;
use crate::content;
use crate::extractor;
use crate::models::{Session, SessionSettings, Stage, Vertical};
use crate::prompt::PromptComposer;
use crate::questionnaire;
use crate::recommend;
use crate::score::ScoreEngine;
use crate::transcript::ChatMessage;
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

/// An input the state machine reacts to
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A free-text line from the user
    UserMessage { text: String },
    /// The allocation widget saved a map (may be incomplete; validated here)
    AllocationSubmitted { amounts: BTreeMap<Bucket, u64> },
    /// The plan-choice widget returned a plan label
    PlanSelected { plan: String },
}

/// Result of one orchestration step
#[derive(Debug)]
pub struct StepOutcome {
    pub session: Session,
    /// Bot messages emitted this step, already appended to the session log
    pub replies: Vec<ChatMessage>,
}

/// Drives one session at a time; owns the completion collaborator
pub struct Orchestrator {
    completion: Box<dyn CompletionClient>,
    /// When set, the advisory turn after the first allocation is generated
    /// from the fixed model portfolios instead of the model endpoint
    fixed_recommendations: bool,
}

impl Orchestrator {
    pub fn new(completion: Box<dyn CompletionClient>) -> Self {
        Self {
            completion,
            fixed_recommendations: false,
        }
    }

    pub fn with_fixed_recommendations(mut self, enabled: bool) -> Self {
        self.fixed_recommendations = enabled;
        self
    }

    /// Create a fresh session for the submitted settings and emit the
    /// opening messages. Resubmitting settings replaces any prior session
    /// under the same id wholesale.
    pub fn start_session(&self, session_id: Uuid, settings: SessionSettings) -> StepOutcome {
        let mut session = Session::new(session_id, settings);
        let mut replies = Vec::new();

        info!(
            session_id = %session_id,
            vertical = %settings.vertical,
            persona = %settings.persona,
            "Starting session"
        );

        say(
            &mut session,
            &mut replies,
            content::greeting(settings.vertical, settings.persona),
        );

        match settings.vertical {
            Vertical::Chat => {
                session.stage = Stage::FreeChat;
            }
            Vertical::Investment => {
                session.stage = Stage::Questionnaire { index: 0 };
                let items = questionnaire::questionnaire(Vertical::Investment);
                say(
                    &mut session,
                    &mut replies,
                    questionnaire::render_question(0, &items[0]),
                );
            }
            Vertical::Insurance => {
                session.stage = Stage::PlanChoice;
                say(
                    &mut session,
                    &mut replies,
                    content::plan_choice_briefing(settings.persona),
                );
            }
        }

        StepOutcome { session, replies }
    }

    /// Advance the session by one event. Never panics on user input; the
    /// worst outcome is a corrective re-prompt.
    pub async fn handle_event(&self, session: Session, event: SessionEvent) -> StepOutcome {
        if session.is_finalized {
            warn!(session_id = %session.session_id, "Input after finalization ignored");
            return StepOutcome {
                session,
                replies: Vec::new(),
            };
        }

        match event {
            SessionEvent::UserMessage { text } => self.handle_user_message(session, text).await,
            SessionEvent::AllocationSubmitted { amounts } => {
                self.handle_allocation(session, amounts).await
            }
            SessionEvent::PlanSelected { plan } => self.handle_plan(session, plan),
        }
    }

    async fn handle_user_message(&self, mut session: Session, text: String) -> StepOutcome {
        let mut replies = Vec::new();
        session.log.append(ChatMessage::user(text.clone()));

        match session.stage {
            Stage::Questionnaire { index } => {
                self.handle_questionnaire_answer(&mut session, &mut replies, index, &text)
                    .await;
            }

            Stage::ProductIntro | Stage::FirstAllocation => {
                if is_final_token(&text) {
                    say(
                        &mut session,
                        &mut replies,
                        "Please complete your first allocation before finalizing. \
                         Use the allocation form to submit it.",
                    );
                } else {
                    say(
                        &mut session,
                        &mut replies,
                        "When you're ready, enter your allocation through the allocation form. \
                         Every category needs a value (0 is fine) and the total must be NT$1,000,000.",
                    );
                }
            }

            Stage::RecommendationReview | Stage::FreeChat | Stage::PlanConfirmation => {
                if session.vertical != Vertical::Chat && is_final_token(&text) {
                    self.begin_finalization(&mut session, &mut replies);
                } else {
                    let forwarded = self.forward_to_model(&mut session, &mut replies, &text).await;
                    if forwarded {
                        // Review and confirmation flow into open-ended chat
                        if matches!(
                            session.stage,
                            Stage::RecommendationReview | Stage::PlanConfirmation
                        ) {
                            session.stage = Stage::FreeChat;
                        }
                    }
                }
            }

            Stage::FinalAllocation => {
                say(
                    &mut session,
                    &mut replies,
                    "Use the allocation form to save your final portfolio. The form is pre-filled \
                     with the recommended adjustments.",
                );
            }

            Stage::PlanChoice | Stage::PlanChoiceFinal => {
                say(
                    &mut session,
                    &mut replies,
                    "Please pick one of the plans from the plan selector to continue.",
                );
            }

            Stage::AwaitingSettings => {
                say(
                    &mut session,
                    &mut replies,
                    "Please submit your conversation settings to begin.",
                );
            }

            // Guarded by the finalization check above
            Stage::Completed => {}
        }

        StepOutcome { session, replies }
    }

    async fn handle_questionnaire_answer(
        &self,
        session: &mut Session,
        replies: &mut Vec<ChatMessage>,
        index: usize,
        text: &str,
    ) {
        let items = questionnaire::questionnaire(session.vertical);
        let Some(item) = items.get(index) else {
            warn!(index, "Questionnaire index out of range; restarting");
            session.questionnaire_answers.clear();
            session.stage = Stage::Questionnaire { index: 0 };
            if let Some(first) = items.first() {
                say(session, replies, questionnaire::render_question(0, first));
            }
            return;
        };

        let Some(choice) = questionnaire::parse_answer(text, item) else {
            say(
                session,
                replies,
                format!(
                    "That doesn't match one of the options. {}",
                    questionnaire::render_question(index, item)
                ),
            );
            return;
        };

        session.questionnaire_answers.push(choice);

        if index + 1 < items.len() {
            session.stage = Stage::Questionnaire { index: index + 1 };
            say(
                session,
                replies,
                questionnaire::render_question(index + 1, &items[index + 1]),
            );
            return;
        }

        // Last question answered; score and move on
        let score = ScoreEngine::score(&session.questionnaire_answers);
        session.risk_score = Some(score);

        match session.vertical {
            Vertical::Investment => match ScoreEngine::tier(score) {
                Ok(tier) => {
                    session.tier = Some(tier);
                    session.stage = Stage::ProductIntro;
                    info!(session_id = %session.session_id, score, %tier, "Questionnaire scored");
                    say(
                        session,
                        replies,
                        format!(
                            "Thanks — that completes the questionnaire. Your risk score is {} ({} risk tier).",
                            score, tier
                        ),
                    );
                    say(session, replies, content::RISK_CATEGORY_INTRO);
                    say(session, replies, content::allocation_briefing(session.persona));
                }
                Err(e) => {
                    // Unscorable answer sequences restart the questionnaire
                    // rather than guessing a tier
                    warn!(score, error = %e, "Score outside tier bands; restarting questionnaire");
                    session.questionnaire_answers.clear();
                    session.risk_score = None;
                    session.stage = Stage::Questionnaire { index: 0 };
                    say(
                        session,
                        replies,
                        format!(
                            "Your answers could not be scored ({}). Let's go through the questions once more.",
                            e
                        ),
                    );
                    say(session, replies, questionnaire::render_question(0, &items[0]));
                }
            },
            Vertical::Insurance => {
                // The insurance system prompt already carries the chosen plan
                // and the answers; the model is asked to confirm the fit
                session.stage = Stage::PlanConfirmation;
                let messages = PromptComposer::compose(session);
                match self.completion.complete(&messages).await {
                    Ok(reply) => say(session, replies, reply),
                    Err(e) => {
                        warn!(session_id = %session.session_id, error = %e, "Plan confirmation turn failed");
                        say(session, replies, content::TRANSPORT_APOLOGY);
                    }
                }
            }
            Vertical::Chat => {
                // The chat vertical has no questionnaire
                session.stage = Stage::FreeChat;
            }
        }
    }

    async fn handle_allocation(
        &self,
        mut session: Session,
        amounts: BTreeMap<Bucket, u64>,
    ) -> StepOutcome {
        let mut replies = Vec::new();

        session
            .log
            .append(ChatMessage::user(describe_submission(&amounts)));

        match session.stage {
            Stage::ProductIntro | Stage::FirstAllocation => {
                match AllocationValidator::validate(&amounts) {
                    Ok(allocation) => {
                        session.allocation = Some(allocation);
                        self.advisory_turn(&mut session, &mut replies).await;
                    }
                    Err(violation) => {
                        say(
                            &mut session,
                            &mut replies,
                            format!(
                                "That allocation can't be saved: {}. Please adjust it and try again.",
                                violation
                            ),
                        );
                    }
                }
            }

            Stage::FinalAllocation => match AllocationValidator::validate(&amounts) {
                Ok(allocation) => {
                    session.allocation = Some(allocation);
                    session.is_finalized = true;
                    session.stage = Stage::Completed;
                    info!(session_id = %session.session_id, "Session finalized");
                    say(
                        &mut session,
                        &mut replies,
                        "✅ Your final portfolio is saved. Thank you for consulting with me — \
                         this session is now complete.",
                    );
                }
                Err(violation) => {
                    say(
                        &mut session,
                        &mut replies,
                        format!(
                            "That allocation can't be saved: {}. Please adjust it and try again.",
                            violation
                        ),
                    );
                }
            },

            _ => {
                say(
                    &mut session,
                    &mut replies,
                    "An allocation isn't expected at this point in the conversation.",
                );
            }
        }

        StepOutcome { session, replies }
    }

    /// The recommendation turn after a validated first allocation: either a
    /// model call whose reply is mined for deltas, or the fixed
    /// persona/tier portfolio when fixed-recommendation mode is on.
    async fn advisory_turn(&self, session: &mut Session, replies: &mut Vec<ChatMessage>) {
        let Some(allocation) = session.allocation.clone() else {
            return;
        };

        if self.fixed_recommendations {
            if let (Some(tier), Some(score)) = (session.tier, session.risk_score) {
                let deltas = recommend::fixed_delta(session.persona, tier, &allocation);
                let text = recommend::advisory_text(session.persona, score, &deltas);
                session.recommended_delta = deltas;
                session.stage = Stage::RecommendationReview;
                say(session, replies, text);
                return;
            }
        }

        session.stage = Stage::FirstAllocation;
        let messages = PromptComposer::compose(session);

        match self.completion.complete(&messages).await {
            Ok(reply) => {
                session.recommended_delta = extractor::extract(&reply, &allocation);
                info!(
                    session_id = %session.session_id,
                    delta_buckets = session.recommended_delta.len(),
                    "Advisory reply extracted"
                );
                session.stage = Stage::RecommendationReview;
                say(session, replies, reply);
            }
            Err(e) => {
                warn!(session_id = %session.session_id, error = %e, "Advisory turn failed");
                // No advance: resubmitting the allocation retries the turn
                session.stage = Stage::ProductIntro;
                say(session, replies, content::TRANSPORT_APOLOGY);
            }
        }
    }

    fn handle_plan(&self, mut session: Session, plan: String) -> StepOutcome {
        let mut replies = Vec::new();

        match session.stage {
            Stage::PlanChoice => {
                if !catalog::is_known_plan(session.persona, &plan) {
                    say(
                        &mut session,
                        &mut replies,
                        format!("\"{}\" isn't one of the available plans. Please choose from the plan selector.", plan),
                    );
                    return StepOutcome { session, replies };
                }

                session
                    .log
                    .append(ChatMessage::user(format!("Selected plan: {}", plan)));
                session.chosen_plan = Some(plan.clone());
                session.stage = Stage::Questionnaire { index: 0 };

                let items = questionnaire::questionnaire(Vertical::Insurance);
                say(
                    &mut session,
                    &mut replies,
                    format!(
                        "Got it — the {} it is, for now. A few questions so I can check the fit.",
                        plan
                    ),
                );
                say(
                    &mut session,
                    &mut replies,
                    questionnaire::render_question(0, &items[0]),
                );
            }

            Stage::PlanChoiceFinal => {
                if !catalog::is_known_plan(session.persona, &plan) {
                    say(
                        &mut session,
                        &mut replies,
                        format!("\"{}\" isn't one of the available plans. Please choose from the plan selector.", plan),
                    );
                    return StepOutcome { session, replies };
                }

                session
                    .log
                    .append(ChatMessage::user(format!("Final plan choice: {}", plan)));
                session.chosen_plan = Some(plan.clone());
                session.is_finalized = true;
                session.stage = Stage::Completed;
                info!(session_id = %session.session_id, %plan, "Session finalized");
                say(
                    &mut session,
                    &mut replies,
                    format!(
                        "✅ The {} is locked in. Thank you — this session is now complete.",
                        plan
                    ),
                );
            }

            _ => {
                say(
                    &mut session,
                    &mut replies,
                    "A plan choice isn't expected at this point in the conversation.",
                );
            }
        }

        StepOutcome { session, replies }
    }

    /// "FINAL" received in a review/chat stage
    fn begin_finalization(&self, session: &mut Session, replies: &mut Vec<ChatMessage>) {
        match session.vertical {
            Vertical::Investment => {
                if !session.has_allocation() {
                    say(
                        session,
                        replies,
                        "Please complete your first allocation before finalizing.",
                    );
                    return;
                }
                session.stage = Stage::FinalAllocation;
                let seeded = session.seeded_final_allocation();
                say(session, replies, content::final_allocation_invite(&seeded));
            }
            Vertical::Insurance => {
                session.stage = Stage::PlanChoiceFinal;
                say(
                    session,
                    replies,
                    "Understood — time to make your final plan choice. Pick a plan from the selector to confirm.",
                );
            }
            Vertical::Chat => {}
        }
    }

    /// Forward a user turn to the model with the composed system context
    /// and trailing history. Returns false on transport failure, in which
    /// case an apology was appended and the stage was left untouched.
    async fn forward_to_model(
        &self,
        session: &mut Session,
        replies: &mut Vec<ChatMessage>,
        text: &str,
    ) -> bool {
        let mut messages = PromptComposer::compose(session);

        // Requests mentioning "exact" get a formatting nudge appended to the
        // forwarded copy; the log keeps what the user actually typed
        if text.to_lowercase().contains("exact") {
            if let Some(last) = messages.last_mut() {
                last.content.push_str(content::EXACT_CLAUSE);
            }
        }

        match self.completion.complete(&messages).await {
            Ok(reply) => {
                say(session, replies, reply);
                true
            }
            Err(e) => {
                warn!(session_id = %session.session_id, error = %e, "Model call failed");
                say(session, replies, content::TRANSPORT_APOLOGY);
                false
            }
        }
    }
}

/// The literal token that gates the finalization stages
fn is_final_token(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("final")
}

/// Append a bot message to the log and to the step replies
fn say(session: &mut Session, replies: &mut Vec<ChatMessage>, text: impl Into<String>) {
    let message = ChatMessage::bot(text);
    session.log.append(message.clone());
    replies.push(message);
}

/// Render a submitted allocation map for the transcript
fn describe_submission(amounts: &BTreeMap<Bucket, u64>) -> String {
    let rendered: Vec<String> = amounts
        .iter()
        .map(|(bucket, amount)| format!("{}: NT${}", bucket, format_amount(*amount)))
        .collect();
    format!("Submitted allocation — {}", rendered.join(", "))
}

#[cfg(test)]
mod tests;
