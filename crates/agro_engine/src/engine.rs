use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use agro_core::{
    AuthUser, CacheKey, CacheValue, Crop, CropId, Effect, InterestStatus, SessionPhase,
    UserProfile,
};
use client_logging::{client_debug, client_warn};
use tokio_util::sync::CancellationToken;

use crate::auth::{AuthError, IdentityBackend};
use crate::client::ApiClient;
use crate::config::ApiSettings;
use crate::error::{ApiError, ApiErrorKind};
use crate::session::SessionProvider;

/// Completion reported by the engine, mapped to a `Msg` by the shell.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Fired once at startup with the resolved session, and after every
    /// session change the engine itself causes.
    SessionChanged(SessionPhase),
    AuthCompleted {
        result: Result<AuthUser, AuthError>,
    },
    SignedOut,
    ProfileSaved {
        profile: UserProfile,
    },
    ProfileSaveFailed {
        error: ApiError,
    },
    /// Secondary-effect failure after a successful primary operation.
    ProfileSyncFailed {
        message: String,
    },
    FetchCompleted {
        key: CacheKey,
        epoch: u64,
        result: Result<CacheValue, ApiError>,
    },
    InterestSubmitted {
        crop_id: CropId,
        result: Result<Crop, ApiError>,
    },
    StatusUpdated {
        crop_id: CropId,
        status: InterestStatus,
        result: Result<Crop, ApiError>,
    },
    CropCreated {
        result: Result<Crop, ApiError>,
    },
    CropUpdated {
        crop_id: CropId,
        result: Result<Crop, ApiError>,
    },
    CropDeleted {
        crop_id: CropId,
        result: Result<(), ApiError>,
    },
}

/// Handle to the effect-execution engine.
///
/// Commands are core [`Effect`]s; completions come back as
/// [`EngineEvent`]s. The engine owns a dedicated thread with a tokio runtime
/// so the caller never blocks. A fetch for a cache key supersedes (cancels)
/// any in-flight fetch for the same key; cancelled fetches emit nothing.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<Effect>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(
        settings: ApiSettings,
        backend: Arc<dyn IdentityBackend>,
    ) -> Result<Self, ApiError> {
        let api = Arc::new(ApiClient::new(&settings)?);
        let session = Arc::new(SessionProvider::new(backend, api.clone()));
        let (cmd_tx, cmd_rx) = mpsc::channel::<Effect>();
        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");

            // Report the initial session before serving commands, mirroring
            // the provider's one-shot session callback.
            let phase = runtime.block_on(session.bootstrap());
            let _ = event_tx.send(EngineEvent::SessionChanged(phase));

            let mut fetches: HashMap<CacheKey, CancellationToken> = HashMap::new();
            while let Ok(effect) = cmd_rx.recv() {
                match effect {
                    Effect::Fetch { key, epoch } => {
                        // Resolved fetches cancel their own token; drop those
                        // entries so the map only holds live fetches.
                        fetches.retain(|_, token| !token.is_cancelled());
                        if let Some(superseded) = fetches.remove(&key) {
                            superseded.cancel();
                        }
                        let token = CancellationToken::new();
                        fetches.insert(key.clone(), token.clone());
                        let api = api.clone();
                        let session = session.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            run_fetch(api, session, key, epoch, token, event_tx).await;
                        });
                    }
                    Effect::CancelFetch { key } => {
                        if let Some(token) = fetches.remove(&key) {
                            token.cancel();
                        }
                    }
                    other => {
                        let api = api.clone();
                        let session = session.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            run_command(api, session, other, event_tx).await;
                        });
                    }
                }
            }
        });

        Ok(Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        })
    }

    pub fn dispatch(&self, effect: Effect) {
        let _ = self.cmd_tx.send(effect);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.try_recv().ok()
    }
}

async fn run_fetch(
    api: Arc<ApiClient>,
    session: Arc<SessionProvider>,
    key: CacheKey,
    epoch: u64,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let mut result = fetch_value(&api, &session, &key, &token).await;
    // Reads are retried once on transient failure; mutations never are.
    if let Err(err) = &result {
        if err.is_transient() && !token.is_cancelled() {
            client_debug!("retrying read after transient failure: {err}");
            result = fetch_value(&api, &session, &key, &token).await;
        }
    }
    // A superseded or cancelled fetch must not resolve into state.
    if token.is_cancelled() || matches!(&result, Err(err) if err.kind == ApiErrorKind::Cancelled) {
        client_debug!("discarding cancelled fetch result");
        return;
    }
    let _ = event_tx.send(EngineEvent::FetchCompleted { key, epoch, result });
    // Mark the token spent so the command loop can drop its map entry.
    token.cancel();
}

async fn fetch_value(
    api: &ApiClient,
    session: &SessionProvider,
    key: &CacheKey,
    token: &CancellationToken,
) -> Result<CacheValue, ApiError> {
    let cancel = Some(token);
    match key {
        CacheKey::CropDetail(crop_id) => {
            api.crop_detail(crop_id, cancel).await.map(CacheValue::Crop)
        }
        CacheKey::CropList { search } => api
            .list_crops(search.as_deref(), None, cancel)
            .await
            .map(CacheValue::Crops),
        CacheKey::MyPosts { owner_email } => api
            .list_crops(None, Some(owner_email), cancel)
            .await
            .map(CacheValue::Crops),
        CacheKey::Latest => api.latest_crops(cancel).await.map(CacheValue::Crops),
        CacheKey::MyInterests { email, sort } => api
            .list_interests(email, *sort, cancel)
            .await
            .map(CacheValue::Interests),
        CacheKey::Profile(email) => session
            .profile_with_fallback(email, cancel)
            .await
            .map(CacheValue::Profile),
    }
}

async fn run_command(
    api: Arc<ApiClient>,
    session: Arc<SessionProvider>,
    effect: Effect,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    match effect {
        Effect::SubmitInterest { request } => {
            let crop_id = request.crop_id.clone();
            let result = api.submit_interest(&request).await;
            let _ = event_tx.send(EngineEvent::InterestSubmitted { crop_id, result });
        }
        Effect::UpdateInterestStatus {
            interest_id,
            crop_id,
            status,
        } => {
            let result = api.update_interest_status(&interest_id, &crop_id, status).await;
            let _ = event_tx.send(EngineEvent::StatusUpdated {
                crop_id,
                status,
                result,
            });
        }
        Effect::CreateCrop { crop } => {
            let result = api.create_crop(&crop).await;
            let _ = event_tx.send(EngineEvent::CropCreated { result });
        }
        Effect::UpdateCrop { crop_id, patch } => {
            let result = api.update_crop_basic(&crop_id, &patch).await;
            let _ = event_tx.send(EngineEvent::CropUpdated { crop_id, result });
        }
        Effect::DeleteCrop { crop_id } => {
            let result = api.delete_crop(&crop_id).await;
            let _ = event_tx.send(EngineEvent::CropDeleted { crop_id, result });
        }
        Effect::SignIn { email, password } => {
            let (result, warning) = session.sign_in(&email, &password).await;
            let _ = event_tx.send(EngineEvent::AuthCompleted { result });
            send_sync_warning(&event_tx, warning);
        }
        Effect::Register {
            name,
            email,
            photo,
            password,
        } => {
            let (result, warning) = session.register(&name, &email, &photo, &password).await;
            let _ = event_tx.send(EngineEvent::AuthCompleted { result });
            send_sync_warning(&event_tx, warning);
        }
        Effect::FederatedSignIn => {
            let (result, warning) = session.sign_in_federated().await;
            let _ = event_tx.send(EngineEvent::AuthCompleted { result });
            send_sync_warning(&event_tx, warning);
        }
        Effect::SignOut => match session.sign_out().await {
            Ok(()) => {
                let _ = event_tx.send(EngineEvent::SignedOut);
            }
            Err(err) => {
                let _ = event_tx.send(EngineEvent::AuthCompleted { result: Err(err) });
            }
        },
        Effect::SaveProfile { profile } => match session.save_profile(profile).await {
            Ok((saved, warning)) => {
                let _ = event_tx.send(EngineEvent::ProfileSaved { profile: saved });
                if let Some(err) = warning {
                    let _ = event_tx.send(EngineEvent::ProfileSyncFailed {
                        message: err.to_string(),
                    });
                }
            }
            Err(error) => {
                let _ = event_tx.send(EngineEvent::ProfileSaveFailed { error });
            }
        },
        Effect::Fetch { .. } | Effect::CancelFetch { .. } => {
            // Handled by the command loop before reaching here.
            client_warn!("fetch effect routed to the mutation path");
        }
    }
}

fn send_sync_warning(event_tx: &mpsc::Sender<EngineEvent>, warning: Option<ApiError>) {
    if let Some(err) = warning {
        let _ = event_tx.send(EngineEvent::ProfileSyncFailed {
            message: err.to_string(),
        });
    }
}
