use std::collections::BTreeMap;

use crate::model::{CropOwner, NewCrop};

/// Crop listing form as entered by the user. Numeric fields are `None` until
/// the input parses.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CropForm {
    pub name: String,
    pub kind: String,
    pub price_per_unit: Option<f64>,
    pub unit: String,
    pub quantity: Option<u32>,
    pub description: String,
    pub location: String,
    pub image: String,
}

/// Field-keyed validation errors; an empty map means the form is valid.
/// Invalid forms are never sent to the network.
pub fn validate_crop_form(form: &CropForm) -> BTreeMap<&'static str, &'static str> {
    let mut errors = BTreeMap::new();
    if form.name.trim().is_empty() {
        errors.insert("name", "Crop name is required");
    }
    if form.kind.trim().is_empty() {
        errors.insert("type", "Type is required");
    }
    if form.location.trim().is_empty() {
        errors.insert("location", "Location is required");
    }
    match form.price_per_unit {
        Some(price) if price > 0.0 => {}
        _ => {
            errors.insert("pricePerUnit", "Valid price is required");
        }
    }
    if form.quantity.is_none() {
        errors.insert("quantity", "Valid quantity is required");
    }
    if form.image.trim().is_empty() {
        errors.insert("image", "Image URL is required");
    }
    if form.description.trim().is_empty() {
        errors.insert("description", "Description is required");
    }
    errors
}

impl CropForm {
    /// Build the create payload. Returns `None` unless the form validates.
    pub fn into_new_crop(self, owner: CropOwner) -> Option<NewCrop> {
        if !validate_crop_form(&self).is_empty() {
            return None;
        }
        Some(NewCrop {
            name: self.name.trim().to_string(),
            kind: self.kind.trim().to_string(),
            price_per_unit: self.price_per_unit?,
            unit: if self.unit.trim().is_empty() {
                "kg".to_string()
            } else {
                self.unit.trim().to_string()
            },
            quantity: self.quantity?,
            description: self.description.trim().to_string(),
            location: self.location.trim().to_string(),
            image: self.image.trim().to_string(),
            owner,
        })
    }
}

/// Registration password rules, checked before any identity-provider call.
pub fn validate_password(password: &str) -> Option<&'static str> {
    if password.len() < 6 {
        return Some("Password must be at least 6 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Some("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Some("Password must contain at least one lowercase letter");
    }
    None
}

/// Clamp a requested quantity to `[1, remaining]`. With nothing remaining the
/// result is 0, which blocks submission.
pub fn clamp_quantity(requested: i64, remaining: u32) -> u32 {
    if remaining == 0 {
        return 0;
    }
    requested.clamp(1, i64::from(remaining)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_form_rejects_missing_fields() {
        let errors = validate_crop_form(&CropForm::default());
        assert_eq!(errors.len(), 7);
        assert_eq!(errors["name"], "Crop name is required");
        assert_eq!(errors["pricePerUnit"], "Valid price is required");
    }

    #[test]
    fn crop_form_rejects_non_positive_price() {
        let form = CropForm {
            name: "Maize".into(),
            kind: "Grain".into(),
            price_per_unit: Some(0.0),
            unit: "kg".into(),
            quantity: Some(10),
            description: "Dry".into(),
            location: "Bogura".into(),
            image: "https://example.com/m.png".into(),
        };
        let errors = validate_crop_form(&form);
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key("pricePerUnit"));
    }

    #[test]
    fn valid_form_builds_payload_with_default_unit() {
        let form = CropForm {
            name: " Maize ".into(),
            kind: "Grain".into(),
            price_per_unit: Some(32.5),
            unit: "  ".into(),
            quantity: Some(10),
            description: "Dry".into(),
            location: "Bogura".into(),
            image: "https://example.com/m.png".into(),
        };
        let owner = CropOwner {
            owner_email: "farmer@example.com".into(),
            owner_name: "Farmer".into(),
        };
        let crop = form.into_new_crop(owner).expect("valid form");
        assert_eq!(crop.name, "Maize");
        assert_eq!(crop.unit, "kg");
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("Ab1xyz").is_none());
        assert_eq!(
            validate_password("Ab1"),
            Some("Password must be at least 6 characters long")
        );
        assert_eq!(
            validate_password("abcdef"),
            Some("Password must contain at least one uppercase letter")
        );
        assert_eq!(
            validate_password("ABCDEF"),
            Some("Password must contain at least one lowercase letter")
        );
    }

    #[test]
    fn quantity_clamps_to_remaining() {
        assert_eq!(clamp_quantity(4, 10), 4);
        assert_eq!(clamp_quantity(0, 10), 1);
        assert_eq!(clamp_quantity(-3, 10), 1);
        assert_eq!(clamp_quantity(25, 10), 10);
        assert_eq!(clamp_quantity(5, 0), 0);
    }
}
