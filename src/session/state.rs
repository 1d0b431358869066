use crate::types::UserProfile;
use serde::Serialize;

/// Snapshot of who is signed in. `is_authenticated` reflects the token as of
/// the last resolution, not a live check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS), ts(export))]
pub struct SessionState {
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
    pub has_paid: bool,
    pub loading: bool,
}

impl SessionState {
    pub fn initial() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            has_paid: false,
            loading: true,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            loading: false,
            ..Self::initial()
        }
    }

    pub fn authenticated(user: UserProfile) -> Self {
        Self {
            has_paid: user.has_paid,
            user: Some(user),
            is_authenticated: true,
            loading: false,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        !self.is_authenticated && self.user.is_none() && !self.has_paid
    }

    /// Replaces the profile; the payment flag follows the new profile.
    pub(crate) fn with_user(&self, user: Option<UserProfile>) -> Self {
        Self {
            has_paid: user.as_ref().is_some_and(|u| u.has_paid),
            user,
            ..self.clone()
        }
    }

    /// Overrides the payment flag. It can only be raised while a profile is
    /// present.
    pub(crate) fn with_has_paid(&self, has_paid: bool) -> Self {
        Self {
            has_paid: has_paid && self.user.is_some(),
            ..self.clone()
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::initial()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS), ts(export))]
pub struct PremiumAccess {
    pub is_authenticated: bool,
    pub has_subscription: bool,
    pub can_access: bool,
}

impl PremiumAccess {
    pub fn denied() -> Self {
        Self {
            is_authenticated: false,
            has_subscription: false,
            can_access: false,
        }
    }

    pub fn signed_in(has_subscription: bool) -> Self {
        Self {
            is_authenticated: true,
            has_subscription,
            can_access: has_subscription,
        }
    }
}
