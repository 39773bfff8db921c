//! Authentication state consumed by the cart.
//!
//! Authentication mechanics live elsewhere; the cart only consumes the
//! login/logout *signal* and decides which backend is authoritative. The
//! initial state is supplied by the caller after probing the auth provider at
//! process start.

use greengrocer_core::UserId;

/// Which backend is authoritative for the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Session storage is authoritative.
    Anonymous,
    /// Persisted per-user rows are authoritative.
    Authenticated(UserId),
}

impl AuthState {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// A transition signal from the external auth provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    LoggedIn(UserId),
    LoggedOut,
}

/// Resolve an auth event against the current state.
///
/// Returns the state to transition to, or `None` when the event re-enters the
/// current state (a no-op). A login while already authenticated as a
/// different user is treated as a fresh login.
#[must_use]
pub fn transition(current: AuthState, event: AuthEvent) -> Option<AuthState> {
    match (current, event) {
        (AuthState::Anonymous, AuthEvent::LoggedOut) => None,
        (AuthState::Authenticated(current_user), AuthEvent::LoggedIn(user))
            if current_user == user =>
        {
            None
        }
        (_, AuthEvent::LoggedIn(user)) => Some(AuthState::Authenticated(user)),
        (AuthState::Authenticated(_), AuthEvent::LoggedOut) => Some(AuthState::Anonymous),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: UserId = UserId::new(7);
    const OTHER: UserId = UserId::new(8);

    #[test]
    fn login_from_anonymous() {
        assert_eq!(
            transition(AuthState::Anonymous, AuthEvent::LoggedIn(USER)),
            Some(AuthState::Authenticated(USER))
        );
    }

    #[test]
    fn logout_from_authenticated() {
        assert_eq!(
            transition(AuthState::Authenticated(USER), AuthEvent::LoggedOut),
            Some(AuthState::Anonymous)
        );
    }

    #[test]
    fn reentering_same_state_is_noop() {
        assert_eq!(transition(AuthState::Anonymous, AuthEvent::LoggedOut), None);
        assert_eq!(
            transition(AuthState::Authenticated(USER), AuthEvent::LoggedIn(USER)),
            None
        );
    }

    #[test]
    fn login_as_different_user_is_fresh_login() {
        assert_eq!(
            transition(AuthState::Authenticated(USER), AuthEvent::LoggedIn(OTHER)),
            Some(AuthState::Authenticated(OTHER))
        );
    }
}
