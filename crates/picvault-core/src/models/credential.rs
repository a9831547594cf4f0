use chrono::{DateTime, Utc};
use std::fmt;

/// Bearer credential for the hosting provider.
///
/// Not persisted; a restart fetches a fresh one. `Debug` redacts the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub obtained_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            obtained_at: Utc::now(),
        }
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[redacted]")
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_does_not_leak_token() {
        let credential = Credential::new("super-secret");
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[redacted]"));
        assert_eq!(credential.bearer(), "Bearer super-secret");
    }
}
