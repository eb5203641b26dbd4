//! Chat transcript, usage ticks and ad rotation

use chrono::{DateTime, Utc};
use hydra_core::{format_remaining, Ad, Error, Result, TickOutcome};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{Session, View};
use crate::assistant::{ask, AssistantReply, AssistantRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub text: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub is_simulated_video: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    fn from_user(text: String, attachment: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::User,
            text,
            image: attachment,
            video: None,
            is_simulated_video: false,
            created_at: Utc::now(),
        }
    }

    fn from_reply(reply: AssistantReply) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::Model,
            text: reply.text,
            image: reply.image,
            video: reply.video,
            is_simulated_video: reply.is_simulated_video,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Replied(AssistantReply),
    /// A previous request is still in flight
    Busy,
    /// Nothing to send
    Ignored,
    /// The session ended while waiting; the reply was dropped
    Discarded,
}

/// Result of one usage tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub outcome: Option<TickOutcome>,
    pub ad: Option<Ad>,
    pub ceiling_reached: bool,
}

impl Session {
    /// Send a prompt to the assistant and append both turns to the transcript
    #[instrument(skip_all)]
    pub async fn send_chat(&self, prompt: &str, attachment: Option<String>) -> Result<SendOutcome> {
        let (request, epoch) = {
            let mut state = self.lock();
            if state.view != View::Chat {
                return Err(Error::InvalidOperation("Chat is not open.".into()));
            }
            if prompt.trim().is_empty() && attachment.is_none() {
                return Ok(SendOutcome::Ignored);
            }
            if state.busy {
                debug!("Send ignored while a reply is pending");
                return Ok(SendOutcome::Busy);
            }
            state.busy = true;
            state
                .transcript
                .push(ChatMessage::from_user(prompt.to_string(), attachment.clone()));
            (AssistantRequest::new(prompt, attachment), state.epoch)
        };

        let reply = ask(self.app().assistant.as_ref(), &request).await;

        let mut state = self.lock();
        if state.epoch != epoch {
            return Ok(SendOutcome::Discarded);
        }
        state.busy = false;
        state.transcript.push(ChatMessage::from_reply(reply.clone()));
        Ok(SendOutcome::Replied(reply))
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.lock().transcript.clone()
    }

    /// Start a new conversation
    pub fn clear_transcript(&self) {
        self.lock().transcript.clear();
    }

    pub fn current_ad(&self) -> Option<Ad> {
        self.lock().current_ad.clone()
    }

    pub fn dismiss_ad(&self) {
        self.lock().current_ad = None;
    }

    /// `m:ss` of free time left; `None` for unmetered accounts
    pub fn remaining_free_time(&self) -> Option<String> {
        self.lock()
            .meter
            .as_ref()
            .map(|m| format_remaining(m.remaining()))
    }

    /// Count one second of chat usage.
    ///
    /// Only counts while the chat view is showing. Reaching the ceiling moves
    /// the session to the plan selector.
    pub fn usage_tick(&self) -> Result<TickReport> {
        let report = {
            let mut state = self.lock();
            if state.view != View::Chat {
                return Ok(TickReport::default());
            }
            let Some(meter) = state.meter.as_mut() else {
                return Ok(TickReport::default());
            };

            let outcome = {
                let db = self.app().db();
                meter.tick(&*db)?
            };
            let elapsed = meter.elapsed();

            let (elapsed_at_tick, ceiling_reached) = match outcome {
                TickOutcome::Counted { elapsed } | TickOutcome::Flushed { elapsed } => (elapsed, false),
                TickOutcome::Exhausted { elapsed } => (elapsed, true),
            };
            if let Some(user) = state.user.as_mut() {
                if !matches!(outcome, TickOutcome::Counted { .. }) {
                    user.usage_seconds = elapsed;
                }
            }

            let ad = if ceiling_reached {
                None
            } else {
                state
                    .rotation
                    .as_ref()
                    .and_then(|r| r.on_elapsed(elapsed_at_tick, &mut rand::thread_rng()))
            };
            if let Some(ad) = &ad {
                debug!(id = %ad.id, "Showing ad");
                state.current_ad = Some(ad.clone());
            }

            TickReport {
                outcome: Some(outcome),
                ad,
                ceiling_reached,
            }
        };

        if report.ceiling_reached {
            self.enter(View::Plans);
        }
        Ok(report)
    }
}
