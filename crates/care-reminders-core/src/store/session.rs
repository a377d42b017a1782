//! Authenticated identity passed explicitly into the core.

/// The signed-in caregiver, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    uid: Option<String>,
}

impl Session {
    /// A session for a resolved identity.
    pub fn authenticated(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
        }
    }

    /// A session with no identity.
    pub fn anonymous() -> Self {
        Self { uid: None }
    }

    /// The current identity. Blank IDs count as no identity.
    pub fn current_identity(&self) -> Option<&str> {
        self.uid.as_deref().filter(|uid| !uid.trim().is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_identity().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        assert_eq!(Session::authenticated("u1").current_identity(), Some("u1"));
        assert_eq!(Session::anonymous().current_identity(), None);
        assert!(!Session::authenticated("  ").is_authenticated());
        assert!(!Session::default().is_authenticated());
    }
}
