use crate::model::AuthUser;

/// Identity-provider session as seen by the client.
///
/// Starts in `Unknown` until the provider reports the current session once;
/// afterwards it is exactly one of `SignedOut` or `SignedIn`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Unknown,
    SignedOut,
    SignedIn(AuthUser),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    phase: SessionPhase,
    /// True while an auth operation is in flight; dependent views block
    /// interaction for the duration.
    loading: bool,
}

impl Session {
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn user(&self) -> Option<&AuthUser> {
        match &self.phase {
            SessionPhase::SignedIn(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self.phase, SessionPhase::SignedIn(_))
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn begin_operation(&mut self) {
        self.loading = true;
    }

    pub(crate) fn finish_operation(&mut self) {
        self.loading = false;
    }

    pub(crate) fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.loading = false;
    }

    /// Merge a partial profile update into the signed-in user. No-op when
    /// there is no session.
    pub(crate) fn merge_profile(&mut self, display_name: Option<String>, photo_url: Option<String>) {
        if let SessionPhase::SignedIn(user) = &mut self.phase {
            if display_name.is_some() {
                user.display_name = display_name;
            }
            if photo_url.is_some() {
                user.photo_url = photo_url;
            }
        }
    }
}
