use serde::{Deserialize, Serialize};

/// Fully qualified Agent Core endpoints derived from the two base addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub chat: String,
    pub upload: String,
    pub contact: String,
    pub subscribe: String,
}

impl Endpoints {
    pub fn from_bases(api_base: &str, ws_base: &str) -> Self {
        let api = api_base.trim_end_matches('/');
        let ws = ws_base.trim_end_matches('/');
        Self {
            chat:      format!("{ws}/ws/chat"),
            upload:    format!("{api}/api/upload"),
            contact:   format!("{api}/api/contact"),
            subscribe: format!("{api}/subscribe"),
        }
    }
}
