//! Property listing models.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::common::{decode_facilities, decode_string_list, Facilities};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Apartment,
    House,
    Room,
    Land,
}

impl PropertyType {
    /// BHK layout only describes apartments and houses
    pub fn has_bhk_layout(&self) -> bool {
        matches!(self, PropertyType::Apartment | PropertyType::House)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "apartment",
            PropertyType::House => "house",
            PropertyType::Room => "room",
            PropertyType::Land => "land",
        }
    }
}

impl std::str::FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "apartment" => Ok(PropertyType::Apartment),
            "house" => Ok(PropertyType::House),
            "room" => Ok(PropertyType::Room),
            "land" => Ok(PropertyType::Land),
            _ => Err(format!(
                "Unknown property type: {} (expected apartment, house, room or land)",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    Available,
    Booked,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Available => "available",
            PropertyStatus::Booked => "booked",
        }
    }
}

impl std::str::FromStr for PropertyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(PropertyStatus::Available),
            "booked" => Ok(PropertyStatus::Booked),
            _ => Err(format!("Unknown property status: {}", s)),
        }
    }
}

/// Raw `properties` row; JSON columns are still encoded text here
#[derive(Debug, Clone, FromRow)]
pub struct PropertyRow {
    pub id: String,
    pub landlord_id: String,
    pub title: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub district: String,
    pub property_type: String,
    pub bhk_type: Option<String>,
    pub bedrooms: i64,
    pub bathrooms: i64,
    pub area: f64,
    pub rent_price: f64,
    pub deposit_amount: f64,
    pub amenities: String,
    pub facilities: String,
    pub rules: String,
    pub images: String,
    pub verification_documents: String,
    pub is_approved: bool,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A property row joined with its landlord's contact details
#[derive(Debug, Clone, FromRow)]
pub struct PropertyWithLandlordRow {
    #[sqlx(flatten)]
    pub property: PropertyRow,
    pub landlord_name: Option<String>,
    pub landlord_phone: Option<String>,
}

/// Decoded property as returned by the API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: String,
    pub landlord_id: String,
    pub title: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub district: String,
    #[serde(rename = "type")]
    pub property_type: String,
    pub bhk_type: Option<String>,
    pub bedrooms: i64,
    pub bathrooms: i64,
    pub area: f64,
    pub rent_price: f64,
    pub deposit_amount: f64,
    pub amenities: Vec<String>,
    pub facilities: Facilities,
    pub rules: String,
    pub images: Vec<String>,
    /// Only present for the owning landlord and administrators
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_documents: Option<Vec<String>>,
    pub is_approved: bool,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landlord_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landlord_phone: Option<String>,
}

impl Property {
    pub fn from_row(row: PropertyRow, include_documents: bool) -> Self {
        let verification_documents =
            include_documents.then(|| decode_string_list(&row.verification_documents));
        Self {
            amenities: decode_string_list(&row.amenities),
            facilities: decode_facilities(&row.facilities),
            images: decode_string_list(&row.images),
            verification_documents,
            id: row.id,
            landlord_id: row.landlord_id,
            title: row.title,
            description: row.description,
            address: row.address,
            city: row.city,
            district: row.district,
            property_type: row.property_type,
            bhk_type: row.bhk_type,
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            area: row.area,
            rent_price: row.rent_price,
            deposit_amount: row.deposit_amount,
            rules: row.rules,
            is_approved: row.is_approved,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            landlord_name: None,
            landlord_phone: None,
        }
    }

    pub fn from_joined(row: PropertyWithLandlordRow, include_documents: bool) -> Self {
        Self {
            landlord_name: row.landlord_name,
            landlord_phone: row.landlord_phone,
            ..Self::from_row(row.property, include_documents)
        }
    }
}

/// Listing fields supplied by a landlord.
///
/// Every field is optional so the same shape serves creation (where the
/// listing manager enforces the required ones) and partial updates.
#[derive(Debug, Clone, Default)]
pub struct PropertyDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub property_type: Option<PropertyType>,
    pub bhk_type: Option<String>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub area: Option<f64>,
    pub rent_price: Option<f64>,
    pub deposit_amount: Option<f64>,
    /// Loosely-typed input: JSON text, plain text or a structured value
    pub amenities: Option<Value>,
    pub facilities: Option<Value>,
    pub rules: Option<String>,
    pub status: Option<PropertyStatus>,
}

/// Public search query; empty parameters count as absent
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub city: Option<String>,
    pub price_min: Option<String>,
    pub price_max: Option<String>,
    pub bedrooms: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
}

/// Parsed search filters, combined with AND
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    pub city: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub bedrooms: Option<i64>,
    pub property_type: Option<PropertyType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> PropertyRow {
        PropertyRow {
            id: "p1".into(),
            landlord_id: "l1".into(),
            title: "Lakeside flat".into(),
            description: String::new(),
            address: "Lakeside 6".into(),
            city: "Pokhara".into(),
            district: "Kaski".into(),
            property_type: "apartment".into(),
            bhk_type: Some("2BHK".into()),
            bedrooms: 2,
            bathrooms: 1,
            area: 850.0,
            rent_price: 30000.0,
            deposit_amount: 5000.0,
            amenities: "[\"wifi\"]".into(),
            facilities: "{\"homeFacilities\":[\"kitchen\"],\"surroundingFacilities\":[]}".into(),
            rules: String::new(),
            images: "[\"a.jpg\",\"b.jpg\"]".into(),
            verification_documents: "[\"deed.pdf\"]".into(),
            is_approved: true,
            status: "available".into(),
            created_at: "2024-01-01T00:00:00.000000Z".into(),
            updated_at: "2024-01-01T00:00:00.000000Z".into(),
        }
    }

    #[test]
    fn documents_are_only_decoded_when_requested() {
        let public = Property::from_row(row(), false);
        assert!(public.verification_documents.is_none());
        let json = serde_json::to_value(&public).unwrap();
        assert!(json.get("verificationDocuments").is_none());
        assert_eq!(json["type"], "apartment");
        assert_eq!(json["images"][1], "b.jpg");

        let owner = Property::from_row(row(), true);
        assert_eq!(owner.verification_documents.unwrap(), vec!["deed.pdf"]);
    }

    #[test]
    fn bhk_layout_applies_to_dwellings_only() {
        assert!(PropertyType::Apartment.has_bhk_layout());
        assert!(PropertyType::House.has_bhk_layout());
        assert!(!PropertyType::Room.has_bhk_layout());
        assert!(!PropertyType::Land.has_bhk_layout());
    }

    #[test]
    fn property_type_rejects_unknown_values() {
        assert_eq!("LAND".parse::<PropertyType>().unwrap(), PropertyType::Land);
        assert!("castle".parse::<PropertyType>().is_err());
    }
}
