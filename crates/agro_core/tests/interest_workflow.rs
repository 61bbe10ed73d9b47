use std::sync::Once;

use agro_core::{
    update, AppState, AuthUser, CacheKey, CacheValue, Crop, CropOwner, Effect, FormStage,
    Interest, InterestStatus, Msg, SessionPhase, Severity,
};
use chrono::Utc;
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(client_logging::initialize_for_tests);
}

fn crop(id: &str, owner_email: &str, remaining: u32, price: f64) -> Crop {
    Crop {
        id: id.to_string(),
        name: "Maize".to_string(),
        kind: "Grain".to_string(),
        price_per_unit: price,
        unit: "kg".to_string(),
        total_quantity: remaining.max(20),
        quantity: remaining,
        description: "Sun dried".to_string(),
        location: "Bogura".to_string(),
        image: "https://example.com/maize.png".to_string(),
        owner: CropOwner {
            owner_email: owner_email.to_string(),
            owner_name: "Farmer".to_string(),
        },
        interests: Vec::new(),
    }
}

fn interest(id: &str, crop_id: &str, email: &str, status: InterestStatus) -> Interest {
    Interest {
        id: id.to_string(),
        crop_id: crop_id.to_string(),
        user_email: email.to_string(),
        user_name: email.split('@').next().unwrap().to_string(),
        user_photo: None,
        quantity: 2,
        message: String::new(),
        total_price: 50.0,
        status,
        created_at: Utc::now(),
    }
}

fn signed_in(email: &str) -> AppState {
    let (state, _) = update(
        AppState::new(),
        Msg::SessionChanged(SessionPhase::SignedIn(AuthUser::new(email))),
    );
    state
}

/// Open a detail view and land its fetched crop at the correct epoch.
fn open_with_crop(state: AppState, crop: Crop) -> AppState {
    let crop_id = crop.id.clone();
    let (state, effects) = update(state, Msg::CropOpened { crop_id: crop_id.clone() });
    let epoch = match effects.as_slice() {
        [Effect::Fetch { key, epoch }] => {
            assert_eq!(*key, CacheKey::CropDetail(crop_id.clone()));
            *epoch
        }
        other => panic!("expected one fetch effect, got {other:?}"),
    };
    let (state, _) = update(
        state,
        Msg::FetchCompleted {
            key: CacheKey::CropDetail(crop_id),
            epoch,
            result: Ok(CacheValue::Crop(crop)),
        },
    );
    state
}

#[test]
fn staging_clamps_quantity_and_computes_total() {
    init_logging();
    let state = signed_in("buyer@example.com");
    let state = open_with_crop(state, crop("c1", "farmer@example.com", 10, 25.0));

    let (state, _) = update(state, Msg::QuantityChanged { value: 99 });
    assert_eq!(state.view().detail.unwrap().quantity, 10);

    let (mut state, effects) = update(state, Msg::InterestSubmitted);
    assert!(effects.is_empty());
    let view = state.view().detail.unwrap();
    assert_eq!(view.stage, FormStage::Confirming { total_price: 250.0 });
    assert!(state.take_notices().is_empty());
}

#[test]
fn quantity_below_one_clamps_up() {
    init_logging();
    let state = signed_in("buyer@example.com");
    let state = open_with_crop(state, crop("c1", "farmer@example.com", 10, 25.0));

    let (state, _) = update(state, Msg::QuantityChanged { value: -4 });
    assert_eq!(state.view().detail.unwrap().quantity, 1);
}

#[test]
fn nothing_remaining_blocks_submission() {
    init_logging();
    let state = signed_in("buyer@example.com");
    let state = open_with_crop(state, crop("c1", "farmer@example.com", 0, 25.0));

    let (mut state, effects) = update(state, Msg::InterestSubmitted);
    assert!(effects.is_empty());
    let notices = state.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Quantity must be at least 1");
    assert_eq!(state.view().detail.unwrap().stage, FormStage::Editing);
}

#[test]
fn duplicate_interest_rejected_before_any_effect() {
    init_logging();
    let mut listing = crop("c1", "farmer@example.com", 10, 25.0);
    listing
        .interests
        .push(interest("i1", "c1", "buyer@example.com", InterestStatus::Pending));
    let state = signed_in("buyer@example.com");
    let state = open_with_crop(state, listing);

    let (mut state, effects) = update(state, Msg::InterestSubmitted);
    assert!(effects.is_empty());
    let notices = state.take_notices();
    assert_eq!(
        notices[0].message,
        "You have already sent an interest for this crop"
    );
    // The view surfaces the existing status instead of the form.
    assert_eq!(
        state.view().detail.unwrap().existing_status,
        Some(InterestStatus::Pending)
    );
}

#[test]
fn owner_cannot_express_interest() {
    init_logging();
    let state = signed_in("farmer@example.com");
    let state = open_with_crop(state, crop("c1", "farmer@example.com", 10, 25.0));

    let (mut state, effects) = update(state, Msg::InterestSubmitted);
    assert!(effects.is_empty());
    assert_eq!(
        state.take_notices()[0].message,
        "You cannot express interest in your own crop"
    );
}

#[test]
fn confirm_sends_exactly_one_submission() {
    init_logging();
    let state = signed_in("buyer@example.com");
    let state = open_with_crop(state, crop("c1", "farmer@example.com", 10, 25.0));
    let (state, _) = update(state, Msg::QuantityChanged { value: 4 });
    let (state, _) = update(
        state,
        Msg::MessageChanged {
            value: "Morning pickup".to_string(),
        },
    );
    let (state, _) = update(state, Msg::InterestSubmitted);
    let (state, effects) = update(state, Msg::InterestConfirmed);

    match effects.as_slice() {
        [Effect::SubmitInterest { request }] => {
            assert_eq!(request.crop_id, "c1");
            assert_eq!(request.user_email, "buyer@example.com");
            assert_eq!(request.quantity, 4);
            assert_eq!(request.message, "Morning pickup");
        }
        other => panic!("expected one submit effect, got {other:?}"),
    }
    assert_eq!(state.view().detail.unwrap().stage, FormStage::Submitting);

    // A second confirm while submitting yields nothing.
    let (_, effects) = update(state, Msg::InterestConfirmed);
    assert!(effects.is_empty());
}

#[test]
fn dismissing_confirmation_returns_to_editing() {
    init_logging();
    let state = signed_in("buyer@example.com");
    let state = open_with_crop(state, crop("c1", "farmer@example.com", 10, 25.0));
    let (state, _) = update(state, Msg::QuantityChanged { value: 3 });
    let (state, _) = update(state, Msg::InterestSubmitted);
    let (state, _) = update(state, Msg::ConfirmDismissed);

    let view = state.view().detail.unwrap();
    assert_eq!(view.stage, FormStage::Editing);
    assert_eq!(view.quantity, 3);
}

#[test]
fn successful_outcome_resets_form_and_refreshes_detail() {
    init_logging();
    let state = signed_in("buyer@example.com");
    let state = open_with_crop(state, crop("c1", "farmer@example.com", 10, 25.0));
    // A cached listing must be invalidated by the success.
    let (state, effects) = update(state, Msg::LatestOpened);
    let epoch = match effects.as_slice() {
        [Effect::Fetch { epoch, .. }] => *epoch,
        other => panic!("expected fetch, got {other:?}"),
    };
    let (state, _) = update(
        state,
        Msg::FetchCompleted {
            key: CacheKey::Latest,
            epoch,
            result: Ok(CacheValue::Crops(vec![crop("c1", "farmer@example.com", 10, 25.0)])),
        },
    );
    let (state, _) = update(state, Msg::QuantityChanged { value: 4 });
    let (state, _) = update(state, Msg::InterestSubmitted);
    let (state, _) = update(state, Msg::InterestConfirmed);

    let mut updated = crop("c1", "farmer@example.com", 10, 25.0);
    updated
        .interests
        .push(interest("i9", "c1", "buyer@example.com", InterestStatus::Pending));
    let (mut state, _) = update(
        state,
        Msg::InterestOutcome {
            crop_id: "c1".to_string(),
            result: Ok(updated),
        },
    );

    let notices = state.take_notices();
    assert_eq!(notices[0].message, "Interest sent successfully");
    assert_eq!(notices[0].severity, Severity::Success);
    let view = state.view().detail.unwrap();
    assert_eq!(view.stage, FormStage::Editing);
    assert_eq!(view.quantity, 1);
    assert_eq!(view.message, "");
    assert_eq!(view.existing_status, Some(InterestStatus::Pending));
    assert!(state.cache().get(&CacheKey::Latest).is_none());
}

#[test]
fn failed_outcome_keeps_the_form_inputs() {
    init_logging();
    let state = signed_in("buyer@example.com");
    let state = open_with_crop(state, crop("c1", "farmer@example.com", 10, 25.0));
    let (state, _) = update(state, Msg::QuantityChanged { value: 4 });
    let (state, _) = update(
        state,
        Msg::MessageChanged {
            value: "Morning pickup".to_string(),
        },
    );
    let (state, _) = update(state, Msg::InterestSubmitted);
    let (state, _) = update(state, Msg::InterestConfirmed);

    let (mut state, _) = update(
        state,
        Msg::InterestOutcome {
            crop_id: "c1".to_string(),
            result: Err("Not enough quantity available".to_string()),
        },
    );

    assert_eq!(
        state.take_notices()[0].message,
        "Not enough quantity available"
    );
    let view = state.view().detail.unwrap();
    assert_eq!(view.stage, FormStage::Editing);
    assert_eq!(view.quantity, 4);
    assert_eq!(view.message, "Morning pickup");
}

#[test]
fn owner_accepts_a_pending_interest() {
    init_logging();
    let mut listing = crop("c1", "farmer@example.com", 10, 25.0);
    listing
        .interests
        .push(interest("i1", "c1", "buyer@example.com", InterestStatus::Pending));
    let state = signed_in("farmer@example.com");
    let state = open_with_crop(state, listing);

    let (state, effects) = update(
        state,
        Msg::StatusActionClicked {
            interest_id: "i1".to_string(),
            status: InterestStatus::Accepted,
        },
    );
    assert_eq!(
        effects,
        vec![Effect::UpdateInterestStatus {
            interest_id: "i1".to_string(),
            crop_id: "c1".to_string(),
            status: InterestStatus::Accepted,
        }]
    );
    assert!(state.view().detail.unwrap().status_updating);

    // A second click while the first is in flight is ignored.
    let (state, effects) = update(
        state,
        Msg::StatusActionClicked {
            interest_id: "i1".to_string(),
            status: InterestStatus::Rejected,
        },
    );
    assert!(effects.is_empty());

    let mut resolved = crop("c1", "farmer@example.com", 8, 25.0);
    resolved
        .interests
        .push(interest("i1", "c1", "buyer@example.com", InterestStatus::Accepted));
    let (mut state, _) = update(
        state,
        Msg::StatusOutcome {
            crop_id: "c1".to_string(),
            status: InterestStatus::Accepted,
            result: Ok(resolved),
        },
    );
    assert_eq!(state.take_notices()[0].message, "Interest accepted");
    let view = state.view().detail.unwrap();
    assert!(!view.status_updating);
    assert_eq!(view.crop.unwrap().quantity, 8);
}

#[test]
fn resolved_interest_cannot_transition_again() {
    init_logging();
    let mut listing = crop("c1", "farmer@example.com", 10, 25.0);
    listing
        .interests
        .push(interest("i1", "c1", "buyer@example.com", InterestStatus::Accepted));
    let state = signed_in("farmer@example.com");
    let state = open_with_crop(state, listing);

    let (mut state, effects) = update(
        state,
        Msg::StatusActionClicked {
            interest_id: "i1".to_string(),
            status: InterestStatus::Rejected,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(
        state.take_notices()[0].message,
        "This interest has already been resolved"
    );
}

#[test]
fn only_the_owner_can_update_status() {
    init_logging();
    let mut listing = crop("c1", "farmer@example.com", 10, 25.0);
    listing
        .interests
        .push(interest("i1", "c1", "other@example.com", InterestStatus::Pending));
    let state = signed_in("buyer@example.com");
    let state = open_with_crop(state, listing);

    let (mut state, effects) = update(
        state,
        Msg::StatusActionClicked {
            interest_id: "i1".to_string(),
            status: InterestStatus::Accepted,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(
        state.take_notices()[0].message,
        "Only the crop owner can update interests"
    );
}

#[test]
fn late_detail_fetch_reclamps_the_open_form() {
    init_logging();
    // Quantity typed while the detail fetch is still in flight.
    let state = signed_in("buyer@example.com");
    let (state, effects) = update(
        state,
        Msg::CropOpened {
            crop_id: "c1".to_string(),
        },
    );
    let epoch = match effects.as_slice() {
        [Effect::Fetch { epoch, .. }] => *epoch,
        other => panic!("expected fetch, got {other:?}"),
    };
    let (state, _) = update(state, Msg::QuantityChanged { value: 8 });
    assert_eq!(state.detail().unwrap().form.quantity, 8);

    let (state, _) = update(
        state,
        Msg::FetchCompleted {
            key: CacheKey::CropDetail("c1".to_string()),
            epoch,
            result: Ok(CacheValue::Crop(crop("c1", "farmer@example.com", 3, 25.0))),
        },
    );
    assert_eq!(state.view().detail.unwrap().quantity, 3);
}
