//! Message content decoding at the network boundary.
//!
//! The messaging service hands over raw `(content type, payload)` pairs;
//! everything past this module works with the [`MessageContent`] union and
//! matches exhaustively. Unknown content types are dropped here, once, the
//! same way unsupported payloads never reach the message list.

use serde::{Deserialize, Serialize};

const PREVIEW_MAX_CHARS: usize = 80;

/// A message as delivered by the messaging service, content still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    pub id: String,
    pub conversation_id: String,
    /// Sender identifier (inbox id), not a wallet address.
    pub sender: String,
    /// Content type id, e.g. `"text"`, `"reply"`, `"reaction"`,
    /// `"remoteAttachment"`.
    pub content_type: String,
    /// Plain text for `"text"`, JSON for everything else.
    pub payload: String,
    pub sent_at_ns: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    Reply {
        reference: String,
        text: String,
    },
    Reaction {
        reference: String,
        emoji: String,
        action: ReactionAction,
    },
    Attachment {
        url: String,
        filename: String,
        content_digest: String,
    },
}

// Wire payload shapes. Field names match the network codecs.

#[derive(Deserialize)]
struct ReactionPayload {
    reference: String,
    action: ReactionAction,
    content: String,
}

#[derive(Deserialize)]
struct ReplyPayload {
    reference: String,
    content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttachmentPayload {
    url: String,
    #[serde(default)]
    filename: String,
    content_digest: String,
}

impl MessageContent {
    /// Decode one wire payload. `None` means the content type is unsupported
    /// or the payload is malformed; such messages never enter the session.
    pub fn decode(content_type: &str, payload: &str) -> Option<Self> {
        match content_type {
            "text" => Some(Self::Text(payload.to_string())),
            "reply" => {
                let reply: ReplyPayload = serde_json::from_str(payload).ok()?;
                Some(Self::Reply {
                    reference: reply.reference,
                    text: reply.content,
                })
            }
            "reaction" => {
                let reaction: ReactionPayload = serde_json::from_str(payload).ok()?;
                Some(Self::Reaction {
                    reference: reaction.reference,
                    emoji: reaction.content,
                    action: reaction.action,
                })
            }
            "remoteAttachment" => {
                let attachment: AttachmentPayload = serde_json::from_str(payload).ok()?;
                Some(Self::Attachment {
                    url: attachment.url,
                    filename: attachment.filename,
                    content_digest: attachment.content_digest,
                })
            }
            other => {
                log::info!("[Session] Dropping message with unsupported content type: {other}");
                None
            }
        }
    }

    /// One-line conversation-list preview.
    pub fn preview_text(&self) -> String {
        match self {
            Self::Text(text) => normalize_preview_text(text),
            Self::Reply { text, .. } => normalize_preview_text(text),
            Self::Reaction { emoji, action, .. } => match action {
                ReactionAction::Added => format!("Reacted {emoji}"),
                ReactionAction::Removed => "Removed a reaction".to_string(),
            },
            Self::Attachment { filename, .. } => {
                if filename.is_empty() {
                    "Attachment".to_string()
                } else {
                    format!("Attachment: {filename}")
                }
            }
        }
    }
}

pub(crate) fn normalize_preview_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= PREVIEW_MAX_CHARS {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(PREVIEW_MAX_CHARS).collect();
    format!("{truncated}…")
}
