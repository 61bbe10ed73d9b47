use crate::cache::{CacheKey, CacheValue};
use crate::model::{AuthUser, CropOwner, InterestRequest, InterestStatus};
use crate::session::SessionPhase;
use crate::state::{AppState, DetailState, FormStage, InterestForm, Notice};
use crate::validate::{clamp_quantity, validate_crop_form, validate_password};
use crate::{Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
///
/// Every failure path ends in a notification; no message panics or throws
/// past this function.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SessionChanged(phase) => {
            state.session.set_phase(phase);
            state.mark_dirty();
            Vec::new()
        }
        Msg::SignInSubmitted { email, password } => {
            if state.session.is_loading() {
                return (state, Vec::new());
            }
            state.session.begin_operation();
            state.mark_dirty();
            vec![Effect::SignIn { email, password }]
        }
        Msg::RegisterSubmitted {
            name,
            email,
            photo,
            password,
        } => {
            if state.session.is_loading() {
                return (state, Vec::new());
            }
            // Password rules are enforced before any identity-provider call.
            if let Some(message) = validate_password(&password) {
                state.push_notice(Notice::error(message));
                return (state, Vec::new());
            }
            state.session.begin_operation();
            state.mark_dirty();
            vec![Effect::Register {
                name,
                email,
                photo,
                password,
            }]
        }
        Msg::FederatedSignInClicked => {
            if state.session.is_loading() {
                return (state, Vec::new());
            }
            state.session.begin_operation();
            state.mark_dirty();
            vec![Effect::FederatedSignIn]
        }
        Msg::SignOutClicked => {
            state.session.begin_operation();
            state.mark_dirty();
            vec![Effect::SignOut]
        }
        Msg::AuthCompleted { result } => {
            match result {
                Ok(user) => {
                    state.session.set_phase(SessionPhase::SignedIn(user));
                    state.push_notice(Notice::success("Signed in successfully"));
                }
                Err(message) => {
                    state.session.finish_operation();
                    state.push_notice(Notice::error(message));
                }
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::SignedOut => {
            state.session.set_phase(SessionPhase::SignedOut);
            state.mark_dirty();
            Vec::new()
        }
        Msg::ProfileSaveSubmitted { name, photo } => match signed_in_user(&state) {
            Some(user) => {
                // One save at a time; the triggering control stays disabled
                // until the outcome lands.
                if state.session.is_loading() {
                    return (state, Vec::new());
                }
                let mut profile = user.profile();
                if !name.trim().is_empty() {
                    profile.name = name.trim().to_string();
                }
                profile.photo = photo;
                state.session.begin_operation();
                state.mark_dirty();
                vec![Effect::SaveProfile { profile }]
            }
            None => {
                state.push_notice(Notice::error("Sign in to edit your profile"));
                Vec::new()
            }
        },
        Msg::ProfileSaved { profile } => {
            state.session.finish_operation();
            let photo_url = if profile.photo.is_empty() {
                None
            } else {
                Some(profile.photo.clone())
            };
            state
                .session
                .merge_profile(Some(profile.name.clone()), photo_url);
            state
                .cache
                .write(CacheKey::Profile(profile.email.clone()), CacheValue::Profile(profile));
            state.push_notice(Notice::success("Profile saved successfully"));
            Vec::new()
        }
        Msg::ProfileSaveFailed { message } => {
            state.session.finish_operation();
            state.push_notice(Notice::error(message));
            Vec::new()
        }
        Msg::ProfileSyncFailed { message } => {
            // Secondary effect of an already-successful operation; warn only.
            state.push_notice(Notice::warning(message));
            Vec::new()
        }

        Msg::LatestOpened => begin_fetch(&mut state, CacheKey::Latest),
        Msg::BrowseOpened { search } => {
            let search = search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            begin_fetch(&mut state, CacheKey::CropList { search })
        }
        Msg::MyPostsOpened => match signed_in_user(&state) {
            Some(user) => begin_fetch(
                &mut state,
                CacheKey::MyPosts {
                    owner_email: user.email,
                },
            ),
            None => {
                state.push_notice(Notice::error("Sign in to view your posts"));
                Vec::new()
            }
        },
        Msg::MyInterestsOpened { sort } => match signed_in_user(&state) {
            Some(user) => begin_fetch(
                &mut state,
                CacheKey::MyInterests {
                    email: user.email,
                    sort,
                },
            ),
            None => {
                state.push_notice(Notice::error("Sign in to view your interests"));
                Vec::new()
            }
        },
        Msg::ProfileOpened => match signed_in_user(&state) {
            Some(user) => begin_fetch(&mut state, CacheKey::Profile(user.email)),
            None => {
                state.push_notice(Notice::error("Sign in to view your profile"));
                Vec::new()
            }
        },
        Msg::CropOpened { crop_id } => {
            let mut effects = Vec::new();
            // Replacing an open detail abandons its fetch first.
            if let Some(previous) = state.detail.take() {
                if previous.crop_id != crop_id {
                    let key = CacheKey::CropDetail(previous.crop_id);
                    state.cache.abandon_fetch(&key);
                    effects.push(Effect::CancelFetch { key });
                }
            }
            state.detail = Some(DetailState::new(crop_id.clone()));
            state.mark_dirty();
            effects.extend(begin_fetch(&mut state, CacheKey::CropDetail(crop_id)));
            effects
        }
        Msg::CropClosed => match state.detail.take() {
            Some(detail) => {
                let key = CacheKey::CropDetail(detail.crop_id);
                state.cache.abandon_fetch(&key);
                state.mark_dirty();
                vec![Effect::CancelFetch { key }]
            }
            None => Vec::new(),
        },
        Msg::FetchCompleted { key, epoch, result } => {
            match result {
                Ok(value) => {
                    if state.cache.commit(key.clone(), epoch, value) {
                        state.mark_dirty();
                        reclamp_open_form(&mut state, &key);
                    }
                    // A stale completion is silently discarded; the newer
                    // fetch owns the key.
                }
                Err(message) => {
                    if state.cache.is_current(&key, epoch) {
                        state.push_notice(Notice::error(message));
                    }
                }
            }
            Vec::new()
        }

        Msg::QuantityChanged { value } => {
            let remaining = open_crop_remaining(&state);
            let mut changed = false;
            if let Some(detail) = state.detail.as_mut() {
                if detail.form.stage == FormStage::Editing {
                    detail.form.quantity = clamp_quantity(value, remaining.unwrap_or(u32::MAX));
                    changed = true;
                }
            }
            if changed {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::MessageChanged { value } => {
            let mut changed = false;
            if let Some(detail) = state.detail.as_mut() {
                if detail.form.stage == FormStage::Editing {
                    detail.form.message = value;
                    changed = true;
                }
            }
            if changed {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::InterestSubmitted => {
            stage_interest(&mut state);
            Vec::new()
        }
        Msg::ConfirmDismissed => {
            let mut changed = false;
            if let Some(detail) = state.detail.as_mut() {
                if matches!(detail.form.stage, FormStage::Confirming { .. }) {
                    detail.form.stage = FormStage::Editing;
                    changed = true;
                }
            }
            if changed {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::InterestConfirmed => confirm_interest(&mut state),
        Msg::InterestOutcome { crop_id, result } => {
            match result {
                Ok(crop) => {
                    state
                        .cache
                        .write(CacheKey::CropDetail(crop_id.clone()), CacheValue::Crop(crop));
                    state.cache.invalidate_listings();
                    if let Some(detail) = state.detail.as_mut() {
                        if detail.crop_id == crop_id {
                            detail.form = InterestForm::default();
                        }
                    }
                    state.push_notice(Notice::success("Interest sent successfully"));
                }
                Err(message) => {
                    // Form contents are preserved so the user can retry.
                    if let Some(detail) = state.detail.as_mut() {
                        if detail.crop_id == crop_id {
                            detail.form.stage = FormStage::Editing;
                        }
                    }
                    state.push_notice(Notice::error(message));
                }
            }
            Vec::new()
        }
        Msg::StatusActionClicked {
            interest_id,
            status,
        } => status_action(&mut state, interest_id, status),
        Msg::StatusOutcome {
            crop_id,
            status,
            result,
        } => {
            if let Some(detail) = state.detail.as_mut() {
                if detail.crop_id == crop_id {
                    detail.status_updating = false;
                }
            }
            match result {
                Ok(crop) => {
                    state
                        .cache
                        .write(CacheKey::CropDetail(crop_id), CacheValue::Crop(crop));
                    state.cache.invalidate_listings();
                    state.push_notice(Notice::success(format!("Interest {status}")));
                }
                Err(message) => {
                    state.push_notice(Notice::error(message));
                }
            }
            state.mark_dirty();
            Vec::new()
        }

        Msg::CropFormSubmitted { form } => {
            let user = match signed_in_user(&state) {
                Some(user) => user,
                None => {
                    state.push_notice(Notice::error("Sign in to add a crop"));
                    return (state, Vec::new());
                }
            };
            let errors = validate_crop_form(&form);
            if !errors.is_empty() {
                state.crop_form_errors = errors;
                state.push_notice(Notice::error(
                    "Please fill in all required fields correctly",
                ));
                return (state, Vec::new());
            }
            state.crop_form_errors.clear();
            state.mark_dirty();
            let owner = CropOwner {
                owner_email: user.email.clone(),
                owner_name: user.display_label(),
            };
            match form.into_new_crop(owner) {
                Some(crop) => vec![Effect::CreateCrop { crop }],
                None => Vec::new(),
            }
        }
        Msg::CropCreated { result } => {
            match result {
                Ok(_) => {
                    state.cache.invalidate_listings();
                    state.push_notice(Notice::success("Crop added successfully"));
                }
                Err(message) => {
                    state.push_notice(Notice::error(message));
                }
            }
            Vec::new()
        }
        Msg::CropEditSubmitted { crop_id, patch } => {
            if signed_in_user(&state).is_none() {
                state.push_notice(Notice::error("Sign in to edit your posts"));
                return (state, Vec::new());
            }
            vec![Effect::UpdateCrop { crop_id, patch }]
        }
        Msg::CropUpdated { result } => {
            match result {
                Ok(updated) => {
                    let owner_email = updated.owner.owner_email.clone();
                    state.cache.replace_in_my_posts(&owner_email, &updated);
                    state.cache.invalidate_browse();
                    state.push_notice(Notice::success("Crop updated successfully"));
                }
                Err(message) => {
                    state.push_notice(Notice::error(message));
                }
            }
            Vec::new()
        }
        Msg::CropDeleteRequested { crop_id } => {
            if signed_in_user(&state).is_none() {
                state.push_notice(Notice::error("Sign in to manage your posts"));
                return (state, Vec::new());
            }
            vec![Effect::DeleteCrop { crop_id }]
        }
        Msg::CropDeleted { crop_id, result } => {
            match result {
                Ok(()) => {
                    if let Some(user) = signed_in_user(&state) {
                        state.cache.remove_from_my_posts(&user.email, &crop_id);
                    }
                    state.cache.remove(&CacheKey::CropDetail(crop_id));
                    state.cache.invalidate_browse();
                    state.push_notice(Notice::success("Crop removed"));
                }
                Err(message) => {
                    state.push_notice(Notice::error(message));
                }
            }
            Vec::new()
        }

        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn signed_in_user(state: &AppState) -> Option<AuthUser> {
    state.session.user().cloned()
}

fn begin_fetch(state: &mut AppState, key: CacheKey) -> Vec<Effect> {
    let epoch = state.cache.begin_fetch(key.clone());
    state.mark_dirty();
    vec![Effect::Fetch { key, epoch }]
}

fn open_crop_remaining(state: &AppState) -> Option<u32> {
    let detail = state.detail.as_ref()?;
    state.cache.crop(&detail.crop_id).map(|crop| crop.quantity)
}

/// After a fresh crop detail lands, pull the form quantity back into range.
fn reclamp_open_form(state: &mut AppState, key: &CacheKey) {
    let remaining = match (&state.detail, key) {
        (Some(detail), CacheKey::CropDetail(id)) if *id == detail.crop_id => {
            match state.cache.crop(id) {
                Some(crop) => crop.quantity,
                None => return,
            }
        }
        _ => return,
    };
    if let Some(detail) = state.detail.as_mut() {
        if detail.form.stage == FormStage::Editing {
            detail.form.quantity = clamp_quantity(i64::from(detail.form.quantity), remaining);
        }
    }
}

/// Validate submission preconditions and stage the confirmation step.
fn stage_interest(state: &mut AppState) {
    enum Verdict {
        Stage { quantity: u32, total_price: f64 },
        Notice(Notice),
        Ignore,
    }

    let verdict = {
        let detail = match state.detail.as_ref() {
            Some(detail) => detail,
            None => return,
        };
        if detail.form.stage != FormStage::Editing {
            return;
        }
        match (state.cache.crop(&detail.crop_id), state.session.user()) {
            (None, _) => Verdict::Ignore,
            (_, None) => Verdict::Notice(Notice::error("Sign in to express interest")),
            (Some(crop), Some(user)) => {
                if crop.is_owned_by(&user.email) {
                    Verdict::Notice(Notice::error(
                        "You cannot express interest in your own crop",
                    ))
                } else if crop.interest_by_email(&user.email).is_some() {
                    // Rejected here, before any network call; the view shows
                    // the existing status instead.
                    Verdict::Notice(Notice::error(
                        "You have already sent an interest for this crop",
                    ))
                } else {
                    let quantity =
                        clamp_quantity(i64::from(detail.form.quantity), crop.quantity);
                    if quantity < 1 {
                        Verdict::Notice(Notice::error("Quantity must be at least 1"))
                    } else {
                        Verdict::Stage {
                            quantity,
                            total_price: crop.total_price_for(quantity),
                        }
                    }
                }
            }
        }
    };

    match verdict {
        Verdict::Stage {
            quantity,
            total_price,
        } => {
            if let Some(detail) = state.detail.as_mut() {
                detail.form.quantity = quantity;
                detail.form.stage = FormStage::Confirming { total_price };
            }
            state.mark_dirty();
        }
        Verdict::Notice(notice) => state.push_notice(notice),
        Verdict::Ignore => {}
    }
}

/// Send the staged submission after explicit confirmation.
fn confirm_interest(state: &mut AppState) -> Vec<Effect> {
    let request = {
        let detail = match state.detail.as_ref() {
            Some(detail) => detail,
            None => return Vec::new(),
        };
        if !matches!(detail.form.stage, FormStage::Confirming { .. }) {
            return Vec::new();
        }
        let (crop, user) = match (state.cache.crop(&detail.crop_id), state.session.user()) {
            (Some(crop), Some(user)) => (crop, user),
            _ => return Vec::new(),
        };
        InterestRequest {
            crop_id: crop.id.clone(),
            user_email: user.email.clone(),
            user_name: user.display_label(),
            user_photo: user.photo_url.clone(),
            quantity: detail.form.quantity,
            message: detail.form.message.clone(),
        }
    };

    if let Some(detail) = state.detail.as_mut() {
        detail.form.stage = FormStage::Submitting;
    }
    state.mark_dirty();
    vec![Effect::SubmitInterest { request }]
}

/// Owner-side accept/reject with all client-side gates applied.
fn status_action(
    state: &mut AppState,
    interest_id: String,
    status: InterestStatus,
) -> Vec<Effect> {
    enum Verdict {
        Send { crop_id: String },
        Notice(Notice),
        Ignore,
    }

    let verdict = {
        let detail = match state.detail.as_ref() {
            Some(detail) => detail,
            None => return Vec::new(),
        };
        if detail.status_updating || status == InterestStatus::Pending {
            Verdict::Ignore
        } else {
            match (state.cache.crop(&detail.crop_id), state.session.user()) {
                (Some(crop), Some(user)) => {
                    if !crop.is_owned_by(&user.email) {
                        Verdict::Notice(Notice::error(
                            "Only the crop owner can update interests",
                        ))
                    } else {
                        match crop.interest_by_id(&interest_id) {
                            None => Verdict::Notice(Notice::error("Interest not found")),
                            Some(interest) if !interest.status.can_transition_to(status) => {
                                Verdict::Notice(Notice::error(
                                    "This interest has already been resolved",
                                ))
                            }
                            Some(_) => Verdict::Send {
                                crop_id: crop.id.clone(),
                            },
                        }
                    }
                }
                _ => Verdict::Ignore,
            }
        }
    };

    match verdict {
        Verdict::Send { crop_id } => {
            if let Some(detail) = state.detail.as_mut() {
                detail.status_updating = true;
            }
            state.mark_dirty();
            vec![Effect::UpdateInterestStatus {
                interest_id,
                crop_id,
                status,
            }]
        }
        Verdict::Notice(notice) => {
            state.push_notice(notice);
            Vec::new()
        }
        Verdict::Ignore => Vec::new(),
    }
}
