//! AgroBridge core: pure state machine for the marketplace client.
//!
//! Holds the domain model, the client-side cache and the interest-lifecycle
//! workflow as a pure `update` function; all I/O happens in the engine crate
//! driven by the returned effects.
mod cache;
mod effect;
mod model;
mod msg;
mod session;
mod state;
mod update;
mod validate;
mod view_model;

pub use cache::{Cache, CacheKey, CacheValue, InterestSort};
pub use effect::Effect;
pub use model::{
    AuthUser, Crop, CropId, CropOwner, CropPatch, Interest, InterestId, InterestRequest,
    InterestStatus, NewCrop, UserProfile,
};
pub use msg::Msg;
pub use session::{Session, SessionPhase};
pub use state::{AppState, DetailState, FormStage, InterestForm, Notice, Severity};
pub use update::update;
pub use validate::{clamp_quantity, validate_crop_form, validate_password, CropForm};
pub use view_model::{AppViewModel, CropDetailView, SessionView};
