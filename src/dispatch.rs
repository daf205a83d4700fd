//! Interaction dispatch.
//!
//! A click is classified once into an [`ActionIntent`] by a pure function,
//! then executed against the ledger. The dispatcher keeps no state between
//! events and never touches view state; it returns a [`DispatchOutcome`] that
//! the owner of the page folds into its [`PostViewState`] records.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::ledger::{Ledger, LedgerError, PostId, TxHandle};
use crate::markup::{escape_attr, Markup};

/// A click as seen by the page: the target's classes plus a snapshot of the
/// nearest enclosing post container, if any.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ClickEvent {
    pub target_classes: Vec<String>,
    pub post: Option<PostScope>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PostScope {
    /// Text of the header permalink, e.g. `#42`.
    pub header_id: String,
    #[serde(default)]
    pub tag_input: String,
    #[serde(default)]
    pub reply_input: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionIntent {
    ToggleTagInput,
    ToggleReplyInput,
    Upvote,
    Downvote,
    SubmitTag,
    SubmitReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Tag,
    Reply,
}

const INTENT_TABLE: [(&str, ActionIntent); 6] = [
    ("tag-button", ActionIntent::ToggleTagInput),
    ("reply-button", ActionIntent::ToggleReplyInput),
    ("upvote-button", ActionIntent::Upvote),
    ("downvote-button", ActionIntent::Downvote),
    ("submit-tag", ActionIntent::SubmitTag),
    ("submit-reply", ActionIntent::SubmitReply),
];

pub fn classify_intent(target_classes: &[String]) -> Option<ActionIntent> {
    INTENT_TABLE
        .iter()
        .find(|(class, _)| target_classes.iter().any(|c| c == class))
        .map(|(_, intent)| *intent)
}

/// Post id from the header permalink text (`#42`, `42`).
pub fn parse_header_id(header: &str) -> Option<PostId> {
    header.trim().trim_start_matches('#').parse().ok()
}

/// User-facing explanation appended after a failed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    AlreadyVoted,
    AuthorRestricted,
    InsufficientStake,
    InvalidTag,
}

impl Feedback {
    /// Matches on the contract's revert wording. Anything unrecognised is
    /// reported as a stake problem, which may misdescribe transport errors.
    pub fn for_vote_error(message: &str) -> Self {
        if message.contains("Already") {
            Feedback::AlreadyVoted
        } else if message.contains("Author") {
            Feedback::AuthorRestricted
        } else {
            Feedback::InsufficientStake
        }
    }

    pub fn message(&self, forum_base_url: &str) -> Markup {
        match self {
            Feedback::AlreadyVoted => {
                Markup::trusted(r#"<p class="action-error">You have already voted on this post.</p>"#)
            }
            Feedback::AuthorRestricted => {
                Markup::trusted(r#"<p class="action-error">You are the author of this post and cannot vote on it.</p>"#)
            }
            Feedback::InsufficientStake => Markup::trusted(format!(
                r#"<p class="action-error">You need to hold the forum stake token to do that. <a href="{}">Get stake tokens</a></p>"#,
                escape_attr(&format!("{forum_base_url}/stake"))
            )),
            Feedback::InvalidTag => Markup::trusted(format!(
                r#"<p class="action-error">That tag is invalid. <a href="{}">See tag rules</a></p>"#,
                escape_attr(&format!("{forum_base_url}/tags"))
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// No post container, no recognised control, or unreadable header id.
    Ignored,
    /// Flip the panel's visibility and focus its input.
    TogglePanel { post_id: PostId, panel: Panel },
    Sent { post_id: PostId, intent: ActionIntent, tx_hash: String },
    Failed {
        post_id: PostId,
        intent: ActionIntent,
        feedback: Feedback,
        #[schema(value_type = String)]
        message: Markup,
    },
    /// Reply submission failed; replies have no feedback path.
    Unreported { post_id: PostId, intent: ActionIntent },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RootPostOutcome {
    /// Empty or whitespace-only; nothing was sent.
    Rejected,
    Posted,
    /// Logged only; the form shows nothing.
    Failed,
}

impl RootPostOutcome {
    pub fn clear_input(&self) -> bool {
        matches!(self, RootPostOutcome::Posted)
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    ledger: Arc<dyn Ledger>,
    forum_base_url: String,
}

impl Dispatcher {
    pub fn new(ledger: Arc<dyn Ledger>, forum_base_url: impl Into<String>) -> Self {
        Self { ledger, forum_base_url: forum_base_url.into() }
    }

    /// Classify without side effects.
    pub fn resolve(event: &ClickEvent) -> Option<(ActionIntent, PostId, &PostScope)> {
        let scope = event.post.as_ref()?;
        let intent = classify_intent(&event.target_classes)?;
        match parse_header_id(&scope.header_id) {
            Some(id) => Some((intent, id, scope)),
            None => {
                warn!(header = %scope.header_id, "post header carries no readable id");
                None
            }
        }
    }

    pub async fn dispatch(&self, event: &ClickEvent) -> DispatchOutcome {
        let Some((intent, post_id, scope)) = Self::resolve(event) else {
            return DispatchOutcome::Ignored;
        };
        debug!(post_id, ?intent, "dispatching");
        match intent {
            ActionIntent::ToggleTagInput => DispatchOutcome::TogglePanel { post_id, panel: Panel::Tag },
            ActionIntent::ToggleReplyInput => DispatchOutcome::TogglePanel { post_id, panel: Panel::Reply },
            ActionIntent::Upvote => {
                let res = self.ledger.upvote_post(post_id).await;
                self.vote_outcome(post_id, intent, res)
            }
            ActionIntent::Downvote => {
                let res = self.ledger.downvote_post(post_id).await;
                self.vote_outcome(post_id, intent, res)
            }
            ActionIntent::SubmitTag => {
                let tag = scope.tag_input.trim();
                match self.ledger.tag_post(post_id, tag).await {
                    Ok(tx) => DispatchOutcome::Sent { post_id, intent, tx_hash: tx.hash },
                    Err(e) => {
                        warn!(post_id, tag, "tag rejected: {e}");
                        self.failed(post_id, intent, Feedback::InvalidTag)
                    }
                }
            }
            ActionIntent::SubmitReply => {
                let reply = scope.reply_input.trim();
                match self.ledger.create_post(reply, Some(post_id)).await {
                    Ok(tx) => DispatchOutcome::Sent { post_id, intent, tx_hash: tx.hash },
                    Err(e) => {
                        warn!(post_id, "reply failed: {e}");
                        DispatchOutcome::Unreported { post_id, intent }
                    }
                }
            }
        }
    }

    fn vote_outcome(
        &self,
        post_id: PostId,
        intent: ActionIntent,
        res: Result<TxHandle, LedgerError>,
    ) -> DispatchOutcome {
        match res {
            Ok(tx) => DispatchOutcome::Sent { post_id, intent, tx_hash: tx.hash },
            Err(e) => {
                let text = e.to_string();
                let feedback = Feedback::for_vote_error(&text);
                warn!(post_id, ?intent, ?feedback, "vote rejected: {text}");
                self.failed(post_id, intent, feedback)
            }
        }
    }

    fn failed(&self, post_id: PostId, intent: ActionIntent, feedback: Feedback) -> DispatchOutcome {
        DispatchOutcome::Failed { post_id, intent, feedback, message: feedback.message(&self.forum_base_url) }
    }

    /// Top-level post form: root post, confirmed before the input is cleared.
    pub async fn submit_root_post(&self, content: &str) -> RootPostOutcome {
        let content = content.trim();
        if content.is_empty() {
            return RootPostOutcome::Rejected;
        }
        let tx = match self.ledger.create_post(content, None).await {
            Ok(tx) => tx,
            Err(e) => {
                error!("post creation failed: {e}");
                return RootPostOutcome::Failed;
            }
        };
        match self.ledger.wait_for_confirmation(&tx).await {
            Ok(receipt) => {
                info!(tx = %receipt.tx_hash, block = receipt.block_number, "post confirmed");
                RootPostOutcome::Posted
            }
            Err(e) => {
                error!(tx = %tx.hash, "post confirmation failed: {e}");
                RootPostOutcome::Failed
            }
        }
    }
}

/// Per-post visual state owned by the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostViewState {
    pub post_id: PostId,
    pub tag_panel_open: bool,
    pub reply_panel_open: bool,
    pub focused: Option<Panel>,
    pub feedback: Vec<Markup>,
}

impl PostViewState {
    pub fn new(post_id: PostId) -> Self {
        Self { post_id, tag_panel_open: false, reply_panel_open: false, focused: None, feedback: Vec::new() }
    }

    /// Outcomes for other posts are ignored.
    pub fn apply(&mut self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::TogglePanel { post_id, panel } if *post_id == self.post_id => {
                match panel {
                    Panel::Tag => self.tag_panel_open = !self.tag_panel_open,
                    Panel::Reply => self.reply_panel_open = !self.reply_panel_open,
                }
                self.focused = Some(*panel);
            }
            DispatchOutcome::Failed { post_id, message, .. } if *post_id == self.post_id => {
                self.feedback.push(message.clone());
            }
            _ => {}
        }
    }
}
