use crate::model::{Crop, InterestStatus};
use crate::session::SessionPhase;
use crate::state::{AppState, FormStage, Notice};

/// Session as the rendering layer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionView {
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// False until the identity provider has reported the initial session.
    pub resolved: bool,
    pub loading: bool,
}

/// Crop detail view: crop data plus the interest form or its replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct CropDetailView {
    pub crop_id: String,
    /// None while the detail fetch is still in flight.
    pub crop: Option<Crop>,
    /// Owner-only controls (accept/reject table) are gated on this.
    pub is_owner: bool,
    /// Status badge shown instead of the form when the viewer already has an
    /// interest recorded.
    pub existing_status: Option<InterestStatus>,
    pub quantity: u32,
    pub message: String,
    /// `quantity × pricePerUnit` for the current input.
    pub total_price: f64,
    pub stage: FormStage,
    pub can_submit: bool,
    pub status_updating: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub session: SessionView,
    pub detail: Option<CropDetailView>,
    pub notices: Vec<Notice>,
    pub dirty: bool,
}

impl AppViewModel {
    pub(crate) fn build(state: &AppState) -> Self {
        let session = match state.session().phase() {
            SessionPhase::Unknown => SessionView {
                loading: state.session().is_loading(),
                ..SessionView::default()
            },
            SessionPhase::SignedOut => SessionView {
                resolved: true,
                loading: state.session().is_loading(),
                ..SessionView::default()
            },
            SessionPhase::SignedIn(user) => SessionView {
                email: Some(user.email.clone()),
                display_name: Some(user.display_label()),
                resolved: true,
                loading: state.session().is_loading(),
            },
        };

        let detail = state.detail().map(|detail| {
            let crop = state.cache().crop(&detail.crop_id).cloned();
            let viewer = state.session().user();
            let is_owner = match (&crop, viewer) {
                (Some(crop), Some(user)) => crop.is_owned_by(&user.email),
                _ => false,
            };
            let existing_status = match (&crop, viewer) {
                (Some(crop), Some(user)) => crop
                    .interest_by_email(&user.email)
                    .map(|interest| interest.status),
                _ => None,
            };
            let total_price = crop
                .as_ref()
                .map(|crop| crop.total_price_for(detail.form.quantity))
                .unwrap_or(0.0);
            let can_submit = crop.is_some()
                && viewer.is_some()
                && !is_owner
                && existing_status.is_none()
                && detail.form.quantity >= 1
                && detail.form.stage == FormStage::Editing;
            CropDetailView {
                crop_id: detail.crop_id.clone(),
                crop,
                is_owner,
                existing_status,
                quantity: detail.form.quantity,
                message: detail.form.message.clone(),
                total_price,
                stage: detail.form.stage.clone(),
                can_submit,
                status_updating: detail.status_updating,
            }
        });

        Self {
            session,
            detail,
            notices: state.notices().to_vec(),
            dirty: state.is_dirty(),
        }
    }
}
