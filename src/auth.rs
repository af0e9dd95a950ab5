use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{info, warn};

const TOKEN_LEN: usize = 32;

/// How long a login stays valid
pub const TOKEN_TTL: Duration = Duration::from_secs(12 * 60 * 60);
/// Live tokens kept at once; the oldest is dropped past this
pub const MAX_TOKENS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Wrong password")]
    WrongPassword,
    #[error("Unauthorized")]
    MissingToken,
    #[error("Unauthorized")]
    InvalidToken,
}

/// Checks the admin password and hands out bearer tokens for admin requests.
///
/// Tokens expire after `ttl` and at most `MAX_TOKENS` are live at once.
pub struct AdminGate {
    password: String,
    ttl: Duration,
    /// (token, expiry) in login order
    tokens: Mutex<Vec<(String, Instant)>>,
}

impl AdminGate {
    pub fn new(password: impl Into<String>) -> Self {
        Self::with_ttl(password, TOKEN_TTL)
    }

    pub fn with_ttl(password: impl Into<String>, ttl: Duration) -> Self {
        Self {
            password: password.into(),
            ttl,
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn login(&self, password: &str) -> Result<String, AuthError> {
        if self.password.is_empty() || password != self.password {
            warn!("admin login rejected");
            return Err(AuthError::WrongPassword);
        }

        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        let now = Instant::now();
        let mut tokens = self.tokens.lock().map_err(|_| AuthError::InvalidToken)?;
        tokens.retain(|(_, expires)| *expires > now);
        if tokens.len() >= MAX_TOKENS {
            let excess = tokens.len() + 1 - MAX_TOKENS;
            tokens.drain(..excess);
        }
        tokens.push((token.clone(), now + self.ttl));
        info!(live_tokens = tokens.len(), "admin logged in");
        Ok(token)
    }

    pub fn logout(&self, token: &str) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.retain(|(t, _)| t != token);
        }
    }

    /// Accepts an `Authorization` header value of the form `Bearer <token>`
    pub fn authorize(&self, header: Option<&str>) -> Result<String, AuthError> {
        let token = header
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let now = Instant::now();
        let mut tokens = self.tokens.lock().map_err(|_| AuthError::InvalidToken)?;
        match tokens.iter().position(|(t, _)| t == token) {
            Some(i) if tokens[i].1 > now => Ok(token.to_string()),
            Some(i) => {
                tokens.remove(i);
                warn!("request with expired admin token");
                Err(AuthError::InvalidToken)
            }
            None => {
                warn!("request with unknown admin token");
                Err(AuthError::InvalidToken)
            }
        }
    }
}
