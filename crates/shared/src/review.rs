//! Place review payload sent to `POST /review`.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::transcript::Location;

pub const UNKNOWN_ADDRESS: &str = "Ubicación desconocida";
pub const DEFAULT_CATEGORY: &str = "Lugar Turístico";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub place_name: String,
    /// Star rating, 1 to 5
    pub rating: u8,
    pub comment: String,
    pub address: String,
    pub coords: Option<Location>,
    pub category: String,
}

impl ReviewSubmission {
    /// Review with the backend's fallbacks for places that are not in the dataset yet.
    pub fn new(place_name: impl Into<String>, rating: u8, comment: impl Into<String>) -> Self {
        Self {
            place_name: place_name.into(),
            rating,
            comment: comment.into(),
            address: UNKNOWN_ADDRESS.to_string(),
            coords: None,
            category: DEFAULT_CATEGORY.to_string(),
        }
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        let address = address.into();
        if !address.trim().is_empty() {
            self.address = address;
        }
        self
    }

    pub fn coords(mut self, coords: Location) -> Self {
        self.coords = Some(coords);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        if !category.trim().is_empty() {
            self.category = category;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.place_name.trim().is_empty() {
            return Err(ClientError::InvalidReview("place name is empty".into()));
        }
        if !(1..=5).contains(&self.rating) {
            return Err(ClientError::InvalidReview(format!(
                "rating must be between 1 and 5, got {}",
                self.rating
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_builder() {
        let review = ReviewSubmission::new("Edzná", 5, "")
            .address("  ")
            .category("Zona arqueológica");
        assert_eq!(review.address, UNKNOWN_ADDRESS);
        assert_eq!(review.category, "Zona arqueológica");
        assert!(review.validate().is_ok());
    }

    #[test]
    fn test_rating_zero_rejected() {
        let review = ReviewSubmission::new("Calle 59", 0, "bonito");
        assert!(matches!(review.validate(), Err(ClientError::InvalidReview(_))));
    }

    #[test]
    fn test_wire_shape() {
        let review = ReviewSubmission::new("Fuerte de San Miguel", 4, "vistas")
            .coords(Location { lat: 19.83, lng: -90.55 });
        let value = serde_json::to_value(&review).unwrap();
        assert_eq!(value["place_name"], "Fuerte de San Miguel");
        assert_eq!(value["coords"]["lng"], -90.55);
        assert_eq!(value["category"], DEFAULT_CATEGORY);
    }
}
