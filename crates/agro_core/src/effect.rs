use crate::cache::CacheKey;
use crate::model::{CropId, CropPatch, InterestId, InterestRequest, InterestStatus, NewCrop, UserProfile};

/// Side effects requested by [`crate::update`], executed by the engine.
///
/// Reads are tagged with the fetch epoch so superseded completions can be
/// discarded; mutations are attempted exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Fetch the resource behind `key`, superseding any in-flight fetch for
    /// the same key.
    Fetch { key: CacheKey, epoch: u64 },
    /// Cancel the in-flight fetch for `key` without starting a new one.
    CancelFetch { key: CacheKey },

    SubmitInterest { request: InterestRequest },
    UpdateInterestStatus {
        interest_id: InterestId,
        crop_id: CropId,
        status: InterestStatus,
    },

    CreateCrop { crop: NewCrop },
    UpdateCrop { crop_id: CropId, patch: CropPatch },
    DeleteCrop { crop_id: CropId },

    SignIn { email: String, password: String },
    Register {
        name: String,
        email: String,
        photo: String,
        password: String,
    },
    FederatedSignIn,
    SignOut,
    /// Backend profile upsert followed by an auth-profile sync; sync failure
    /// is reported as a warning, not as a failure of the save.
    SaveProfile { profile: UserProfile },
}
