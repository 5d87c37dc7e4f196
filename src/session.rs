//! Per-session conversation, consent, and message state.
//!
//! The messaging network is behind the [`MessagingService`] trait and stays
//! the source of truth for conversations and consent; this module keeps the
//! session-local view the UI renders from: the classified conversation list,
//! the open conversation's messages, unread counters, and the persisted
//! session blob. Consent changes and sends are user actions, so their
//! failures surface to the caller; everything else degrades and logs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

mod content;
mod persistence;
mod recovery;

pub use content::{MessageContent, ReactionAction, WireMessage};
pub use persistence::SessionSnapshot;

// ---------------------------------------------------------------------------
// Consent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentState {
    #[default]
    Allowed,
    Unknown,
    Denied,
}

impl ConsentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Unknown => "unknown",
            Self::Denied => "denied",
        }
    }
}

// ---------------------------------------------------------------------------
// External messaging service
// ---------------------------------------------------------------------------

/// A conversation as reported by the messaging service.
#[derive(Debug, Clone)]
pub struct ConversationInfo {
    pub id: String,
    pub peer_identifier: String,
    pub consent: ConsentState,
    pub last_message: Option<WireMessage>,
}

/// The messaging network, reduced to the calls this session drives.
pub trait MessagingService: Send + Sync {
    /// Connect and return our own identifier (inbox id).
    fn initialize(&self) -> Result<String, String>;
    /// Drop locally persisted network state (identity-conflict recovery).
    fn reset_local_state(&self) -> Result<(), String>;
    fn list_conversations(&self, states: &[ConsentState]) -> Result<Vec<ConversationInfo>, String>;
    fn consent_state(&self, conversation_id: &str) -> Result<ConsentState, String>;
    fn set_consent_state(&self, conversation_id: &str, state: ConsentState) -> Result<(), String>;
    fn sync_conversation(&self, conversation_id: &str) -> Result<(), String>;
    fn list_messages(&self, conversation_id: &str) -> Result<Vec<WireMessage>, String>;
    /// Send and return the network-assigned message id.
    fn send_message(
        &self,
        conversation_id: &str,
        content: &MessageContent,
    ) -> Result<String, String>;
}

// ---------------------------------------------------------------------------
// Session-local views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DisplayConversation {
    pub id: String,
    pub peer_identifier: String,
    pub consent: ConsentState,
    pub last_message: Option<String>,
    pub last_message_at: Option<i64>, // unix millis
    pub unread: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub sender: String,
    pub content: MessageContent,
    pub sent_at_ns: i64,
    pub is_own: bool,
    /// Optimistic placeholder not yet confirmed by the service.
    pub pending: bool,
    /// Reaction emojis folded onto this message.
    pub reactions: Vec<String>,
}

/// A send that did not complete; the draft comes back for retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendError {
    pub error: String,
    pub restored_draft: String,
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

pub struct SessionState {
    service: Arc<dyn MessagingService>,
    session_path: Option<PathBuf>,
    connected: bool,
    own_identifier: Option<String>,
    conversations: Vec<DisplayConversation>,
    open_conversation_id: Option<String>,
    messages: Vec<ChatMessage>,
    unread: HashMap<String, u32>,
    consent_filter: ConsentState,
    show_mobile_chat: bool,
    next_placeholder_id: u64,
}

impl SessionState {
    pub fn new(service: Arc<dyn MessagingService>) -> Self {
        Self::with_session_path(service, Some(persistence::session_path()))
    }

    /// Session with a custom (or no) persistence location.
    pub fn with_session_path(
        service: Arc<dyn MessagingService>,
        session_path: Option<PathBuf>,
    ) -> Self {
        Self {
            service,
            session_path,
            connected: false,
            own_identifier: None,
            conversations: Vec::new(),
            open_conversation_id: None,
            messages: Vec::new(),
            unread: HashMap::new(),
            consent_filter: ConsentState::default(),
            show_mobile_chat: false,
            next_placeholder_id: 0,
        }
    }

    // -- connection ---------------------------------------------------------

    /// Initialize the messaging service and restore the persisted session.
    ///
    /// An identity-conflict failure clears local network state and retries
    /// once; a second failure (or any other failure) is returned to the
    /// caller as a connection error.
    pub fn connect(&mut self) -> Result<(), String> {
        let own = match self.service.initialize() {
            Ok(own) => own,
            Err(e) if recovery::is_identity_conflict_error(&e) => {
                log::warn!(
                    "[Session] Identity conflict during connect; resetting local network state: {e}"
                );
                self.service
                    .reset_local_state()
                    .map_err(|e| format!("Failed to reset local network state: {e}"))?;
                self.service
                    .initialize()
                    .map_err(|e| format!("Connection failed after local state reset: {e}"))?
            }
            Err(e) => return Err(format!("Connection failed: {e}")),
        };

        log::info!("[Session] Connected as {own}");
        self.own_identifier = Some(own);
        self.connected = true;

        // Restore before the first refresh so unread counts land on the
        // rebuilt list.
        let mut restored_selection = None;
        if let Some(path) = &self.session_path {
            if let Some(snapshot) = persistence::load_session(path) {
                self.consent_filter = snapshot.consent_filter;
                self.show_mobile_chat = snapshot.show_mobile_chat;
                self.unread = snapshot.unread_counts;
                restored_selection = snapshot.selected_conversation_id;
            }
        }

        self.refresh_conversations()?;

        if let Some(id) = restored_selection {
            if self.conversations.iter().any(|c| c.id == id) {
                self.open_conversation(&id);
            }
        }
        Ok(())
    }

    /// Tear down the session and clear the persisted blob.
    pub fn disconnect(&mut self) {
        if let Some(path) = &self.session_path {
            persistence::clear_session(path);
        }
        self.connected = false;
        self.own_identifier = None;
        self.conversations.clear();
        self.open_conversation_id = None;
        self.messages.clear();
        self.unread.clear();
        log::info!("[Session] Disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn own_identifier(&self) -> Option<&str> {
        self.own_identifier.as_deref()
    }

    // -- conversation list --------------------------------------------------

    /// Rebuild the conversation list from the service, preserving the open
    /// selection when it survives and sorting newest-first.
    pub fn refresh_conversations(&mut self) -> Result<(), String> {
        let infos = self
            .service
            .list_conversations(&[
                ConsentState::Allowed,
                ConsentState::Unknown,
                ConsentState::Denied,
            ])
            .map_err(|e| format!("Failed to list conversations: {e}"))?;

        let mut conversations: Vec<DisplayConversation> = infos
            .into_iter()
            .map(|info| {
                let preview = info.last_message.as_ref().and_then(|m| {
                    let content = MessageContent::decode(&m.content_type, &m.payload)?;
                    Some((content.preview_text(), m.sent_at_ns / 1_000_000))
                });
                let unread = self.unread.get(&info.id).copied().unwrap_or(0);
                DisplayConversation {
                    id: info.id,
                    peer_identifier: info.peer_identifier,
                    consent: info.consent,
                    last_message: preview.as_ref().map(|(text, _)| text.clone()),
                    last_message_at: preview.map(|(_, at)| at),
                    unread,
                }
            })
            .collect();
        conversations.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        self.conversations = conversations;

        if let Some(open) = self.open_conversation_id.clone() {
            if !self.conversations.iter().any(|c| c.id == open) {
                log::warn!("[Session] Open conversation {open} no longer exists after refresh");
                self.open_conversation_id = None;
                self.messages.clear();
                self.save_session();
            }
        }
        Ok(())
    }

    pub fn conversations(&self) -> &[DisplayConversation] {
        &self.conversations
    }

    /// The list the current consent-filter tab shows.
    pub fn visible_conversations(&self) -> Vec<&DisplayConversation> {
        self.conversations
            .iter()
            .filter(|c| c.consent == self.consent_filter)
            .collect()
    }

    pub fn consent_filter(&self) -> ConsentState {
        self.consent_filter
    }

    pub fn set_consent_filter(&mut self, filter: ConsentState) {
        self.consent_filter = filter;
        self.save_session();
    }

    pub fn show_mobile_chat(&self) -> bool {
        self.show_mobile_chat
    }

    pub fn set_show_mobile_chat(&mut self, show: bool) {
        self.show_mobile_chat = show;
        self.save_session();
    }

    // -- consent transitions ------------------------------------------------

    /// Accept a message request (`unknown → allowed`).
    pub fn allow_conversation(&mut self, conversation_id: &str) -> Result<ConsentState, String> {
        self.update_consent(conversation_id, ConsentState::Allowed)
    }

    /// Decline a message request (`unknown → denied`).
    pub fn deny_conversation(&mut self, conversation_id: &str) -> Result<ConsentState, String> {
        self.update_consent(conversation_id, ConsentState::Denied)
    }

    /// Block an existing contact.
    pub fn block_conversation(&mut self, conversation_id: &str) -> Result<ConsentState, String> {
        self.update_consent(conversation_id, ConsentState::Denied)
    }

    /// Unblock a blocked contact.
    pub fn unblock_conversation(&mut self, conversation_id: &str) -> Result<ConsentState, String> {
        self.update_consent(conversation_id, ConsentState::Allowed)
    }

    /// Fire-and-confirm: push the change to the service, then read the
    /// classification back from it. The service owns consent state.
    fn update_consent(
        &mut self,
        conversation_id: &str,
        target: ConsentState,
    ) -> Result<ConsentState, String> {
        self.service
            .set_consent_state(conversation_id, target)
            .map_err(|e| format!("Failed to update consent: {e}"))?;

        let confirmed = self
            .service
            .consent_state(conversation_id)
            .map_err(|e| format!("Failed to confirm consent: {e}"))?;
        if confirmed != target {
            log::warn!(
                "[Session] Consent for {conversation_id} confirmed as {} (requested {})",
                confirmed.as_str(),
                target.as_str()
            );
        }

        if let Some(conv) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            conv.consent = confirmed;
        }
        Ok(confirmed)
    }

    // -- open conversation and messages -------------------------------------

    /// Open a conversation: reset its unread counter and load its messages.
    pub fn open_conversation(&mut self, conversation_id: &str) {
        self.open_conversation_id = Some(conversation_id.to_string());
        self.messages.clear();
        self.reset_unread(conversation_id);
        self.save_session();

        if let Err(e) = self.service.sync_conversation(conversation_id) {
            log::warn!("[Session] Sync failed for {conversation_id}: {e}");
        }
        match self.service.list_messages(conversation_id) {
            Ok(wire) => {
                self.messages = self.build_messages(&wire);
                if let Some(last) = self.messages.last() {
                    let preview = last.content.preview_text();
                    let sent_at_ns = last.sent_at_ns;
                    self.touch_conversation_preview(conversation_id, &preview, sent_at_ns);
                }
            }
            Err(e) => {
                log::error!("[Session] Failed to load messages for {conversation_id}: {e}");
            }
        }
    }

    pub fn close_conversation(&mut self) {
        self.open_conversation_id = None;
        self.messages.clear();
        self.save_session();
    }

    pub fn open_conversation_id(&self) -> Option<&str> {
        self.open_conversation_id.as_deref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The viewport reached the newest message of the open conversation.
    pub fn scrolled_to_latest(&mut self) {
        let Some(open) = self.open_conversation_id.clone() else {
            return;
        };
        self.reset_unread(&open);
        self.save_session();
    }

    /// Feed one message from the service's stream into the session.
    pub fn handle_incoming(&mut self, msg: &WireMessage) {
        let Some(content) = MessageContent::decode(&msg.content_type, &msg.payload) else {
            return;
        };

        if let MessageContent::Reaction {
            reference,
            emoji,
            action,
        } = &content
        {
            if self.open_conversation_id.as_deref() == Some(msg.conversation_id.as_str()) {
                apply_reaction(&mut self.messages, reference, emoji, *action);
            }
            return;
        }

        let preview = content.preview_text();
        self.touch_conversation_preview(&msg.conversation_id, &preview, msg.sent_at_ns);

        let is_own = self.own_identifier.as_deref() == Some(msg.sender.as_str());
        if self.open_conversation_id.as_deref() == Some(msg.conversation_id.as_str()) {
            if !self.messages.iter().any(|m| m.id == msg.id) {
                self.messages.push(ChatMessage {
                    id: msg.id.clone(),
                    sender: msg.sender.clone(),
                    content,
                    sent_at_ns: msg.sent_at_ns,
                    is_own,
                    pending: false,
                    reactions: Vec::new(),
                });
            }
        } else if !is_own {
            let count = self.unread.entry(msg.conversation_id.clone()).or_insert(0);
            *count += 1;
            let count = *count;
            if let Some(conv) = self
                .conversations
                .iter_mut()
                .find(|c| c.id == msg.conversation_id)
            {
                conv.unread = count;
            }
            self.save_session();
        }
    }

    // -- sending ------------------------------------------------------------

    /// Optimistic send: append a placeholder immediately, reconcile against
    /// the authoritative message list on success, and return the draft for
    /// restore on failure.
    pub fn send_message(&mut self, conversation_id: &str, draft: &str) -> Result<(), SendError> {
        let text = draft.trim();
        if text.is_empty() {
            return Err(SendError {
                error: "Cannot send an empty message.".to_string(),
                restored_draft: String::new(),
            });
        }

        let content = MessageContent::Text(text.to_string());
        let sent_at_ns = now_unix_ns();
        let placeholder_id = format!("pending-{}", self.next_placeholder_id);
        self.next_placeholder_id += 1;

        let open = self.open_conversation_id.as_deref() == Some(conversation_id);
        if open {
            self.messages.push(ChatMessage {
                id: placeholder_id.clone(),
                sender: self.own_identifier.clone().unwrap_or_default(),
                content: content.clone(),
                sent_at_ns,
                is_own: true,
                pending: true,
                reactions: Vec::new(),
            });
        }
        match self.service.send_message(conversation_id, &content) {
            Ok(_) => {
                self.touch_conversation_preview(
                    conversation_id,
                    &content.preview_text(),
                    sent_at_ns,
                );
                self.reconcile_after_send(conversation_id);
                Ok(())
            }
            Err(e) => {
                log::error!("[Session] Failed to send message to {conversation_id}: {e}");
                self.messages.retain(|m| m.id != placeholder_id);
                Err(SendError {
                    error: format!("Failed to send message: {e}"),
                    restored_draft: text.to_string(),
                })
            }
        }
    }

    /// Send a reaction, applied optimistically to the open message list and
    /// reverted if the service rejects it.
    pub fn send_reaction(
        &mut self,
        conversation_id: &str,
        reference: &str,
        emoji: &str,
        action: ReactionAction,
    ) -> Result<(), String> {
        let open = self.open_conversation_id.as_deref() == Some(conversation_id);
        if open {
            apply_reaction(&mut self.messages, reference, emoji, action);
        }

        let content = MessageContent::Reaction {
            reference: reference.to_string(),
            emoji: emoji.to_string(),
            action,
        };
        if let Err(e) = self.service.send_message(conversation_id, &content) {
            log::error!("[Session] Failed to send reaction to {conversation_id}: {e}");
            if open {
                let revert = match action {
                    ReactionAction::Added => ReactionAction::Removed,
                    ReactionAction::Removed => ReactionAction::Added,
                };
                apply_reaction(&mut self.messages, reference, emoji, revert);
            }
            return Err(format!("Failed to send reaction: {e}"));
        }
        Ok(())
    }

    /// Replace the message list with the authoritative one, carrying over
    /// only placeholders the service does not know about yet. Exactly one
    /// copy of each confirmed message survives.
    fn reconcile_after_send(&mut self, conversation_id: &str) {
        if self.open_conversation_id.as_deref() != Some(conversation_id) {
            return;
        }
        match self.service.list_messages(conversation_id) {
            Ok(wire) => {
                let authoritative = self.build_messages(&wire);
                let unconfirmed: Vec<ChatMessage> = self
                    .messages
                    .iter()
                    .filter(|m| {
                        m.pending
                            && !authoritative
                                .iter()
                                .any(|a| a.is_own && a.content == m.content)
                    })
                    .cloned()
                    .collect();
                self.messages = authoritative;
                self.messages.extend(unconfirmed);
            }
            Err(e) => {
                log::warn!("[Session] Reconcile fetch failed for {conversation_id}: {e}");
                // The send itself succeeded; just stop marking it pending.
                for msg in self.messages.iter_mut() {
                    msg.pending = false;
                }
            }
        }
    }

    // -- internals ----------------------------------------------------------

    /// Decode wire messages and fold reactions onto their targets. Ordering
    /// is preserved as given by the service.
    fn build_messages(&self, wire: &[WireMessage]) -> Vec<ChatMessage> {
        let own = self.own_identifier.as_deref();
        let mut messages = Vec::new();
        let mut reactions = Vec::new();
        for msg in wire {
            let Some(content) = MessageContent::decode(&msg.content_type, &msg.payload) else {
                continue;
            };
            if let MessageContent::Reaction {
                reference,
                emoji,
                action,
            } = content
            {
                reactions.push((reference, emoji, action));
                continue;
            }
            messages.push(ChatMessage {
                id: msg.id.clone(),
                sender: msg.sender.clone(),
                content,
                sent_at_ns: msg.sent_at_ns,
                is_own: own == Some(msg.sender.as_str()),
                pending: false,
                reactions: Vec::new(),
            });
        }
        for (reference, emoji, action) in reactions {
            apply_reaction(&mut messages, &reference, &emoji, action);
        }
        messages
    }

    fn touch_conversation_preview(
        &mut self,
        conversation_id: &str,
        preview: &str,
        sent_at_ns: i64,
    ) {
        let Some(idx) = self
            .conversations
            .iter()
            .position(|c| c.id == conversation_id)
        else {
            return;
        };
        let mut conv = self.conversations.remove(idx);
        conv.last_message = Some(preview.to_string());
        conv.last_message_at = Some(sent_at_ns / 1_000_000);
        self.conversations.insert(0, conv);
    }

    fn reset_unread(&mut self, conversation_id: &str) {
        self.unread.remove(conversation_id);
        if let Some(conv) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            conv.unread = 0;
        }
    }

    fn save_session(&self) {
        let Some(path) = &self.session_path else {
            return;
        };
        let snapshot = SessionSnapshot {
            selected_conversation_id: self.open_conversation_id.clone(),
            consent_filter: self.consent_filter,
            show_mobile_chat: self.show_mobile_chat,
            unread_counts: self.unread.clone(),
        };
        if let Err(e) = persistence::save_session(path, &snapshot) {
            log::warn!("[Session] Failed to persist session: {e}");
        }
    }
}

fn apply_reaction(
    messages: &mut [ChatMessage],
    reference: &str,
    emoji: &str,
    action: ReactionAction,
) {
    let Some(target) = messages.iter_mut().find(|m| m.id == reference) else {
        return;
    };
    match action {
        ReactionAction::Added => {
            if !target.reactions.iter().any(|r| r == emoji) {
                target.reactions.push(emoji.to_string());
            }
        }
        ReactionAction::Removed => {
            if let Some(idx) = target.reactions.iter().position(|r| r == emoji) {
                target.reactions.remove(idx);
            }
        }
    }
}

pub(crate) fn now_unix_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}
