use lettre::Address;
use serde::{Deserialize, Serialize};

use crate::participant::NewParticipant;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_WISHLIST_LEN: usize = 2000;

/// Participant form as sent by the registration page or the admin panel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub wishlist: Option<String>,
}

/// Validates a participant form and returns the trimmed fields
pub fn validate_submission(req: &ParticipantRequest) -> Result<NewParticipant, String> {
    let name = req.name.trim();
    let email = req.email.trim();
    let wishlist = req.wishlist.as_deref().unwrap_or("").trim();

    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("Name must be at most {} characters", MAX_NAME_LEN));
    }

    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if let Err(e) = email.parse::<Address>() {
        return Err(format!("'{}' is not a valid email address: {}", email, e));
    }

    if wishlist.chars().count() > MAX_WISHLIST_LEN {
        return Err(format!("Wishlist must be at most {} characters", MAX_WISHLIST_LEN));
    }

    Ok(NewParticipant {
        name: name.to_string(),
        email: email.to_string(),
        wishlist: wishlist.to_string(),
    })
}
