use std::collections::BTreeMap;

use crate::cache::Cache;
use crate::model::CropId;
use crate::session::Session;
use crate::view_model::AppViewModel;

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Warning,
}

/// A transient user-visible notification. Mutation failures always land
/// here; nothing throws past the update loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Stage of the interest submission form.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FormStage {
    #[default]
    Editing,
    /// Parameters staged; waiting for explicit user confirmation. Carries the
    /// total price shown in the confirmation step.
    Confirming { total_price: f64 },
    /// Sent; the triggering control stays disabled until the outcome lands.
    Submitting,
}

/// Buyer-side interest form bound to the open crop detail.
#[derive(Debug, Clone, PartialEq)]
pub struct InterestForm {
    pub quantity: u32,
    pub message: String,
    pub stage: FormStage,
}

impl Default for InterestForm {
    fn default() -> Self {
        Self {
            quantity: 1,
            message: String::new(),
            stage: FormStage::Editing,
        }
    }
}

/// State of the open crop detail view.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailState {
    pub crop_id: CropId,
    pub form: InterestForm,
    /// True while an accept/reject is in flight; blocks further actions.
    pub status_updating: bool,
}

impl DetailState {
    pub fn new(crop_id: CropId) -> Self {
        Self {
            crop_id,
            form: InterestForm::default(),
            status_updating: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub(crate) session: Session,
    pub(crate) cache: Cache,
    pub(crate) detail: Option<DetailState>,
    pub(crate) crop_form_errors: BTreeMap<&'static str, &'static str>,
    pub(crate) notices: Vec<Notice>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn detail(&self) -> Option<&DetailState> {
        self.detail.as_ref()
    }

    pub fn crop_form_errors(&self) -> &BTreeMap<&'static str, &'static str> {
        &self.crop_form_errors
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Drain pending notifications for display.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel::build(self)
    }

    pub(crate) fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
        self.dirty = true;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Take the dirty flag; the caller re-renders when it was set.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
