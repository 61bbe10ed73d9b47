use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use agro_core::{Effect, Msg};
use agro_engine::{ApiSettings, EngineEvent, EngineHandle, IdentityBackend, LocalIdentityBackend};
use client_logging::{client_info, client_warn};

pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(msg_tx: mpsc::Sender<Msg>) -> anyhow::Result<Self> {
        let settings = ApiSettings::from_env();
        client_info!("API base url: {}", settings.base_url);

        let backend: Arc<dyn IdentityBackend> = Arc::new(LocalIdentityBackend::new());
        let engine = EngineHandle::new(settings, backend)?;
        let runner = Self { engine };
        runner.spawn_event_loop(msg_tx);
        Ok(runner)
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match &effect {
                Effect::Fetch { key, epoch } => {
                    client_info!("Fetch key={:?} epoch={}", key, epoch);
                }
                Effect::CancelFetch { key } => {
                    client_info!("CancelFetch key={:?}", key);
                }
                Effect::SubmitInterest { request } => {
                    client_info!(
                        "SubmitInterest crop={} quantity={}",
                        request.crop_id,
                        request.quantity
                    );
                }
                Effect::UpdateInterestStatus {
                    interest_id,
                    status,
                    ..
                } => {
                    client_info!("UpdateInterestStatus id={} status={}", interest_id, status);
                }
                other => {
                    client_info!("Effect {}", discriminant_name(other));
                }
            }
            self.engine.dispatch(effect);
        }
    }

    fn spawn_event_loop(&self, msg_tx: mpsc::Sender<Msg>) {
        let engine = self.engine.clone();
        thread::spawn(move || loop {
            if let Some(event) = engine.try_recv() {
                if msg_tx.send(map_event(event)).is_err() {
                    return;
                }
            } else {
                thread::sleep(Duration::from_millis(20));
            }
        });
    }
}

/// Engine completions carry typed errors; the core takes normalized messages.
fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::SessionChanged(phase) => Msg::SessionChanged(phase),
        EngineEvent::AuthCompleted { result } => Msg::AuthCompleted {
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::SignedOut => Msg::SignedOut,
        EngineEvent::ProfileSaved { profile } => Msg::ProfileSaved { profile },
        EngineEvent::ProfileSaveFailed { error } => Msg::ProfileSaveFailed {
            message: error.to_string(),
        },
        EngineEvent::ProfileSyncFailed { message } => {
            client_warn!("profile sync failed: {}", message);
            Msg::ProfileSyncFailed { message }
        }
        EngineEvent::FetchCompleted { key, epoch, result } => Msg::FetchCompleted {
            key,
            epoch,
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::InterestSubmitted { crop_id, result } => Msg::InterestOutcome {
            crop_id,
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::StatusUpdated {
            crop_id,
            status,
            result,
        } => Msg::StatusOutcome {
            crop_id,
            status,
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::CropCreated { result } => Msg::CropCreated {
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::CropUpdated { result, .. } => Msg::CropUpdated {
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::CropDeleted { crop_id, result } => Msg::CropDeleted {
            crop_id,
            result: result.map_err(|err| err.to_string()),
        },
    }
}

fn discriminant_name(effect: &Effect) -> &'static str {
    match effect {
        Effect::Fetch { .. } => "Fetch",
        Effect::CancelFetch { .. } => "CancelFetch",
        Effect::SubmitInterest { .. } => "SubmitInterest",
        Effect::UpdateInterestStatus { .. } => "UpdateInterestStatus",
        Effect::CreateCrop { .. } => "CreateCrop",
        Effect::UpdateCrop { .. } => "UpdateCrop",
        Effect::DeleteCrop { .. } => "DeleteCrop",
        Effect::SignIn { .. } => "SignIn",
        Effect::Register { .. } => "Register",
        Effect::FederatedSignIn => "FederatedSignIn",
        Effect::SignOut => "SignOut",
        Effect::SaveProfile { .. } => "SaveProfile",
    }
}
