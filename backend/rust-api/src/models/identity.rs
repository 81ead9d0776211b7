use serde::{Deserialize, Serialize};

/// Who a participant is. Authenticated users and guests live in separate
/// namespaces so a guest token can never collide with a user id.
/// `Anonymous` only appears after a session has been closed with an
/// anonymization policy applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Identity {
    User(String),
    Guest(String),
    Anonymous,
}

impl Identity {
    /// Stable key used for voter lists and attempt lookup.
    pub fn key(&self) -> String {
        match self {
            Identity::User(id) => format!("user:{}", id),
            Identity::Guest(token) => format!("guest:{}", token),
            Identity::Anonymous => "anonymous".to_string(),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest(_))
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Identity::User(id) => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_and_guest_keys_never_collide() {
        let user = Identity::User("abc".to_string());
        let guest = Identity::Guest("abc".to_string());
        assert_ne!(user.key(), guest.key());
    }
}
