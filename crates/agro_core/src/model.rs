use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend-assigned crop identifier.
pub type CropId = String;
/// Backend-assigned interest identifier.
pub type InterestId = String;

/// Owner reference embedded in a crop listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropOwner {
    pub owner_email: String,
    pub owner_name: String,
}

/// Lifecycle state of an interest. `Accepted` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InterestStatus {
    /// Returns true if transitioning from self to `next` is valid.
    ///
    /// Only the crop owner may drive a transition, and only out of `Pending`.
    pub fn can_transition_to(self, next: InterestStatus) -> bool {
        matches!(
            (self, next),
            (InterestStatus::Pending, InterestStatus::Accepted)
                | (InterestStatus::Pending, InterestStatus::Rejected)
        )
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, InterestStatus::Pending)
    }

    /// Wire value, also used for the `sort=status` query and notifications.
    pub fn as_str(self) -> &'static str {
        match self {
            InterestStatus::Pending => "pending",
            InterestStatus::Accepted => "accepted",
            InterestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for InterestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A buyer's purchase-intent record against a crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interest {
    #[serde(rename = "_id")]
    pub id: InterestId,
    pub crop_id: CropId,
    pub user_email: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_photo: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub message: String,
    pub total_price: f64,
    pub status: InterestStatus,
    pub created_at: DateTime<Utc>,
}

/// A marketplace listing. `quantity` is the remaining quantity; the backend
/// decrements it when an interest is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crop {
    #[serde(rename = "_id")]
    pub id: CropId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price_per_unit: f64,
    pub unit: String,
    pub total_quantity: u32,
    pub quantity: u32,
    pub description: String,
    pub location: String,
    pub image: String,
    pub owner: CropOwner,
    /// Embedded on detail responses; empty on list responses.
    #[serde(default)]
    pub interests: Vec<Interest>,
}

impl Crop {
    /// Invariant mirrored from the backend: `0 <= quantity <= total_quantity`.
    pub fn quantity_in_bounds(&self) -> bool {
        self.quantity <= self.total_quantity
    }

    pub fn is_owned_by(&self, email: &str) -> bool {
        self.owner.owner_email == email
    }

    /// Any interest already recorded for this requester, regardless of status.
    pub fn interest_by_email(&self, email: &str) -> Option<&Interest> {
        self.interests
            .iter()
            .find(|interest| interest.user_email == email)
    }

    pub fn interest_by_id(&self, interest_id: &str) -> Option<&Interest> {
        self.interests
            .iter()
            .find(|interest| interest.id == interest_id)
    }

    /// Price the buyer confirms before submission.
    pub fn total_price_for(&self, quantity: u32) -> f64 {
        f64::from(quantity) * self.price_per_unit
    }
}

/// Payload for creating a crop listing. The backend sets ids, timestamps and
/// the initial `totalQuantity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCrop {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price_per_unit: f64,
    pub unit: String,
    pub quantity: u32,
    pub description: String,
    pub location: String,
    pub image: String,
    pub owner: CropOwner,
}

/// Partial update for a crop's basic fields (PATCH `/api/crops/:id/basic`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_unit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Payload for submitting an interest (POST `/api/interests`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestRequest {
    pub crop_id: CropId,
    pub user_email: String,
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_photo: Option<String>,
    pub quantity: u32,
    pub message: String,
}

/// Profile record persisted by the backend (POST `/api/users`, idempotent
/// upsert by email).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub photo: String,
}

/// The identity provider's view of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl AuthUser {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
            photo_url: None,
        }
    }

    /// Display name with the email local part as fallback.
    pub fn display_label(&self) -> String {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or(self.email.as_str())
                .to_string(),
        }
    }

    /// Profile payload for the backend upsert.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            email: self.email.clone(),
            name: self.display_label(),
            photo: self.photo_url.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crop(remaining: u32, total: u32) -> Crop {
        Crop {
            id: "c1".into(),
            name: "Summer Tomato".into(),
            kind: "Vegetable".into(),
            price_per_unit: 50.0,
            unit: "kg".into(),
            total_quantity: total,
            quantity: remaining,
            description: "Fresh".into(),
            location: "Rajshahi".into(),
            image: "https://example.com/tomato.png".into(),
            owner: CropOwner {
                owner_email: "farmer@example.com".into(),
                owner_name: "Farmer".into(),
            },
            interests: Vec::new(),
        }
    }

    #[test]
    fn status_transitions_only_leave_pending() {
        assert!(InterestStatus::Pending.can_transition_to(InterestStatus::Accepted));
        assert!(InterestStatus::Pending.can_transition_to(InterestStatus::Rejected));
        assert!(!InterestStatus::Pending.can_transition_to(InterestStatus::Pending));

        assert!(!InterestStatus::Accepted.can_transition_to(InterestStatus::Rejected));
        assert!(!InterestStatus::Accepted.can_transition_to(InterestStatus::Pending));
        assert!(!InterestStatus::Rejected.can_transition_to(InterestStatus::Accepted));

        assert!(!InterestStatus::Pending.is_terminal());
        assert!(InterestStatus::Accepted.is_terminal());
        assert!(InterestStatus::Rejected.is_terminal());
    }

    #[test]
    fn total_price_is_exact() {
        let crop = crop(10, 10);
        assert_eq!(crop.total_price_for(4), 200.0);
        assert_eq!(crop.total_price_for(0), 0.0);
    }

    #[test]
    fn quantity_bounds() {
        assert!(crop(0, 10).quantity_in_bounds());
        assert!(crop(10, 10).quantity_in_bounds());
        assert!(!crop(11, 10).quantity_in_bounds());
    }

    #[test]
    fn display_label_falls_back_to_email_local_part() {
        let mut user = AuthUser::new("buyer@example.com");
        assert_eq!(user.display_label(), "buyer");
        user.display_name = Some("Buyer One".into());
        assert_eq!(user.display_label(), "Buyer One");
    }

    #[test]
    fn crop_deserializes_backend_shape() {
        let raw = r#"{
            "_id": "65f0",
            "name": "Maize",
            "type": "Grain",
            "pricePerUnit": 32.5,
            "unit": "kg",
            "totalQuantity": 120,
            "quantity": 100,
            "description": "Dry maize",
            "location": "Bogura",
            "image": "https://example.com/maize.png",
            "owner": { "ownerEmail": "farmer@example.com", "ownerName": "Farmer" },
            "interests": [{
                "_id": "i1",
                "cropId": "65f0",
                "userEmail": "buyer@example.com",
                "userName": "Buyer",
                "quantity": 5,
                "message": "",
                "totalPrice": 162.5,
                "status": "pending",
                "createdAt": "2026-08-01T10:00:00Z"
            }]
        }"#;
        let crop: Crop = serde_json::from_str(raw).expect("crop decodes");
        assert_eq!(crop.kind, "Grain");
        assert_eq!(crop.quantity, 100);
        assert_eq!(crop.interests[0].status, InterestStatus::Pending);
        assert_eq!(crop.interests[0].user_photo, None);
    }
}
