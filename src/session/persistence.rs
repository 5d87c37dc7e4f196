//! Session blob persistence.
//!
//! One JSON file in the app data dir holding the bits of session state worth
//! restoring across restarts: the selected conversation, the consent filter
//! tab, the mobile-chat toggle, and the local unread counters. Cleared on
//! disconnect. Load is best-effort; a missing or unparsable file reads as
//! "no session".

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::session::ConsentState;
use crate::shared::config::app_data_dir;

const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSnapshot {
    pub selected_conversation_id: Option<String>,
    pub consent_filter: ConsentState,
    pub show_mobile_chat: bool,
    pub unread_counts: HashMap<String, u32>,
}

pub(crate) fn session_path() -> PathBuf {
    app_data_dir().join(SESSION_FILE)
}

pub(crate) fn save_session(path: &Path, snapshot: &SessionSnapshot) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed creating session dir ({}): {e}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| format!("failed encoding session: {e}"))?;

    std::fs::write(path, json)
        .map_err(|e| format!("failed writing session ({}): {e}", path.display()))
}

pub(crate) fn load_session(path: &Path) -> Option<SessionSnapshot> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<SessionSnapshot>(&text) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            log::warn!(
                "[Session] Failed to parse session at {}: {e}",
                path.display()
            );
            None
        }
    }
}

pub(crate) fn clear_session(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_file(path) {
        log::warn!(
            "[Session] Failed to remove session file ({}): {e}",
            path.display()
        );
    }
}
