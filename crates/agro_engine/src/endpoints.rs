//! Typed bindings for the backend REST endpoints.

use agro_core::{
    Crop, CropPatch, Interest, InterestRequest, InterestSort, InterestStatus, NewCrop, UserProfile,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::error::ApiError;

/// POST `/api/interests` wraps the updated crop.
#[derive(Debug, Deserialize)]
struct InterestSubmitResponse {
    crop: Crop,
}

/// PATCH `/api/interests/:id/status` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody<'a> {
    crop_id: &'a str,
    status: InterestStatus,
}

impl ApiClient {
    /// GET `/api/crops`, optionally filtered by search text or owner email.
    pub async fn list_crops(
        &self,
        search: Option<&str>,
        owner_email: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<Crop>, ApiError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(search) = search {
            query.push(("search", search.to_string()));
        }
        if let Some(owner) = owner_email {
            query.push(("ownerEmail", owner.to_string()));
        }
        self.get("/api/crops", &query, cancel).await
    }

    /// GET `/api/crops/latest`.
    pub async fn latest_crops(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<Crop>, ApiError> {
        self.get("/api/crops/latest", &[], cancel).await
    }

    /// GET `/api/crops/:id` (embeds the interests array).
    pub async fn crop_detail(
        &self,
        crop_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Crop, ApiError> {
        self.get(&format!("/api/crops/{crop_id}"), &[], cancel).await
    }

    /// POST `/api/crops`.
    pub async fn create_crop(&self, crop: &NewCrop) -> Result<Crop, ApiError> {
        self.post("/api/crops", crop, None).await
    }

    /// PATCH `/api/crops/:id/basic`.
    pub async fn update_crop_basic(
        &self,
        crop_id: &str,
        patch: &CropPatch,
    ) -> Result<Crop, ApiError> {
        self.patch(&format!("/api/crops/{crop_id}/basic"), patch).await
    }

    /// DELETE `/api/crops/:id`.
    pub async fn delete_crop(&self, crop_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/api/crops/{crop_id}")).await
    }

    /// POST `/api/interests`; returns the updated crop with the new interest
    /// embedded.
    pub async fn submit_interest(&self, request: &InterestRequest) -> Result<Crop, ApiError> {
        let response: InterestSubmitResponse = self.post("/api/interests", request, None).await?;
        Ok(response.crop)
    }

    /// GET `/api/interests?email=...` with an optional sort.
    pub async fn list_interests(
        &self,
        email: &str,
        sort: InterestSort,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<Interest>, ApiError> {
        let mut query: Vec<(&str, String)> = vec![("email", email.to_string())];
        if let Some(sort) = sort.query_value() {
            query.push(("sort", sort.to_string()));
        }
        self.get("/api/interests", &query, cancel).await
    }

    /// PATCH `/api/interests/:id/status`; the backend enforces the
    /// pending-only transition and decrements remaining quantity on
    /// acceptance. Returns the updated crop.
    pub async fn update_interest_status(
        &self,
        interest_id: &str,
        crop_id: &str,
        status: InterestStatus,
    ) -> Result<Crop, ApiError> {
        self.patch(
            &format!("/api/interests/{interest_id}/status"),
            &StatusBody { crop_id, status },
        )
        .await
    }

    /// POST `/api/users` — idempotent profile upsert by email.
    pub async fn upsert_profile(
        &self,
        profile: &UserProfile,
        cancel: Option<&CancellationToken>,
    ) -> Result<UserProfile, ApiError> {
        self.post("/api/users", profile, cancel).await
    }
}
