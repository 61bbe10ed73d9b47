use crate::cache::{CacheKey, CacheValue, InterestSort};
use crate::model::{AuthUser, Crop, CropId, CropPatch, InterestId, InterestStatus, UserProfile};
use crate::session::SessionPhase;
use crate::validate::CropForm;

/// Everything that can happen to the application: user intents and engine
/// completions. Applied by [`crate::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    // Session and auth.
    /// Identity provider reported the current session (fires once at startup
    /// and on every session change).
    SessionChanged(SessionPhase),
    SignInSubmitted {
        email: String,
        password: String,
    },
    RegisterSubmitted {
        name: String,
        email: String,
        photo: String,
        password: String,
    },
    FederatedSignInClicked,
    SignOutClicked,
    /// Outcome of a sign-in/sign-up/federated attempt. Errors arrive already
    /// normalized to a message.
    AuthCompleted {
        result: Result<AuthUser, String>,
    },
    SignedOut,
    /// Profile page save: backend upsert then auth-profile sync.
    ProfileSaveSubmitted {
        name: String,
        photo: String,
    },
    ProfileSaved {
        profile: UserProfile,
    },
    ProfileSaveFailed {
        message: String,
    },
    /// Secondary-effect failure (profile sync after a successful primary
    /// operation); downgraded to a warning.
    ProfileSyncFailed {
        message: String,
    },

    // Navigation; each opens a view and starts its keyed fetch.
    LatestOpened,
    BrowseOpened {
        search: Option<String>,
    },
    MyPostsOpened,
    MyInterestsOpened {
        sort: InterestSort,
    },
    ProfileOpened,
    CropOpened {
        crop_id: CropId,
    },
    /// Detail view closed; cancels its in-flight fetch.
    CropClosed,
    /// A keyed read finished. `epoch` identifies the fetch generation.
    FetchCompleted {
        key: CacheKey,
        epoch: u64,
        result: Result<CacheValue, String>,
    },

    // Interest workflow on the open crop detail.
    QuantityChanged {
        value: i64,
    },
    MessageChanged {
        value: String,
    },
    /// Stage the submission and ask for confirmation.
    InterestSubmitted,
    ConfirmDismissed,
    /// User confirmed the staged submission; send it.
    InterestConfirmed,
    InterestOutcome {
        crop_id: CropId,
        result: Result<Crop, String>,
    },
    /// Owner clicked accept/reject on a received interest.
    StatusActionClicked {
        interest_id: InterestId,
        status: InterestStatus,
    },
    StatusOutcome {
        crop_id: CropId,
        status: InterestStatus,
        result: Result<Crop, String>,
    },

    // Crop CRUD.
    CropFormSubmitted {
        form: CropForm,
    },
    CropCreated {
        result: Result<Crop, String>,
    },
    CropEditSubmitted {
        crop_id: CropId,
        patch: CropPatch,
    },
    CropUpdated {
        result: Result<Crop, String>,
    },
    CropDeleteRequested {
        crop_id: CropId,
    },
    CropDeleted {
        crop_id: CropId,
        result: Result<(), String>,
    },

    /// Fallback for placeholder wiring.
    NoOp,
}
