//! Listing manager: landlord-owned properties, the public search and the
//! visibility rules for unapproved listings.

use tracing::info;
use uuid::Uuid;

use crate::db::{
    encode_string_list, normalize_json_field, now_timestamp, DbPool, Property, PropertyDraft,
    PropertyRow, PropertyStatus, PropertyType, PropertyWithLandlordRow, SearchFilters,
    SearchQuery,
};
use crate::validation::{validate_amount, validate_required};

use super::access::{require_owner, Caller, LANDLORD_ONLY};
use super::error::{ServiceError, ServiceResult};

const WITH_LANDLORD: &str = r#"
    SELECT p.*, u.name AS landlord_name, u.phone AS landlord_phone
    FROM properties p
    LEFT JOIN users u ON u.id = p.landlord_id
"#;

/// Positional parameter for dynamically built queries
enum Binding {
    Text(String),
    Real(f64),
    Int(i64),
}

impl SearchFilters {
    /// Parse raw query parameters; blank values count as absent
    pub fn parse(query: &SearchQuery) -> ServiceResult<Self> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        let number = |field: &str, value: &Option<String>| -> ServiceResult<Option<f64>> {
            present(value)
                .map(|v| {
                    v.parse::<f64>()
                        .map_err(|_| ServiceError::validation(field, format!("{} must be a number", field)))
                })
                .transpose()
        };

        let bedrooms = present(&query.bedrooms)
            .map(|v| {
                v.parse::<i64>().map_err(|_| {
                    ServiceError::validation("bedrooms", "bedrooms must be a whole number")
                })
            })
            .transpose()?;

        let property_type = present(&query.property_type)
            .map(|v| v.parse::<PropertyType>().map_err(|e| ServiceError::validation("type", e)))
            .transpose()?;

        Ok(Self {
            city: present(&query.city).map(str::to_string),
            price_min: number("priceMin", &query.price_min)?,
            price_max: number("priceMax", &query.price_max)?,
            bedrooms,
            property_type,
        })
    }
}

pub struct ListingService {
    db: DbPool,
}

impl ListingService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Create a listing awaiting admin approval
    pub async fn create(
        &self,
        caller: &Caller,
        draft: PropertyDraft,
        images: Vec<String>,
        documents: Vec<String>,
    ) -> ServiceResult<Property> {
        LANDLORD_ONLY
            .check(caller)
            .map_err(|_| ServiceError::forbidden("Only landlords can create properties"))?;

        let title = required(&draft.title, "title", "Title")?;
        let address = required(&draft.address, "address", "Address")?;
        let city = required(&draft.city, "city", "City")?;
        let property_type = draft
            .property_type
            .ok_or_else(|| ServiceError::validation("type", "Property type is required"))?;
        let rent_price = draft
            .rent_price
            .ok_or_else(|| ServiceError::validation("rentPrice", "Rent price is required"))?;
        validate_numbers(&draft)?;

        let bhk_type = if property_type.has_bhk_layout() {
            draft.bhk_type.clone().filter(|b| !b.trim().is_empty())
        } else {
            None
        };

        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        sqlx::query(
            r#"
            INSERT INTO properties (id, landlord_id, title, description, address, city, district,
                                    property_type, bhk_type, bedrooms, bathrooms, area, rent_price,
                                    deposit_amount, amenities, facilities, rules, images,
                                    verification_documents, is_approved, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&caller.id)
        .bind(title)
        .bind(draft.description.as_deref().unwrap_or_default())
        .bind(address)
        .bind(city)
        .bind(draft.district.as_deref().unwrap_or_default())
        .bind(property_type.as_str())
        .bind(&bhk_type)
        .bind(draft.bedrooms.unwrap_or(0))
        .bind(draft.bathrooms.unwrap_or(0))
        .bind(draft.area.unwrap_or(0.0))
        .bind(rent_price)
        .bind(draft.deposit_amount.unwrap_or(0.0))
        .bind(normalize_json_field(draft.amenities.as_ref()))
        .bind(normalize_json_field(draft.facilities.as_ref()))
        .bind(draft.rules.as_deref().unwrap_or_default())
        .bind(encode_string_list(&images))
        .bind(encode_string_list(&documents))
        .bind(PropertyStatus::Available.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await?;

        info!(property_id = %id, landlord_id = %caller.id, "Property created, pending approval");
        Ok(Property::from_row(self.fetch_row(&id).await?, true))
    }

    /// Partial update by the owning landlord.
    ///
    /// Supplied image or document lists replace the stored ones wholesale;
    /// `None` keeps them.
    pub async fn update(
        &self,
        caller: &Caller,
        id: &str,
        draft: PropertyDraft,
        images: Option<Vec<String>>,
        documents: Option<Vec<String>>,
    ) -> ServiceResult<Property> {
        let existing = self.fetch_row(id).await?;
        require_owner(caller, &existing.landlord_id, "You can only update your own properties")?;

        for (value, field, label) in [
            (&draft.title, "title", "Title"),
            (&draft.address, "address", "Address"),
            (&draft.city, "city", "City"),
        ] {
            if let Some(v) = value {
                validate_required(v, label).map_err(|e| ServiceError::validation(field, e))?;
            }
        }
        validate_numbers(&draft)?;

        let effective_type = match draft.property_type {
            Some(t) => t,
            None => existing
                .property_type
                .parse::<PropertyType>()
                .map_err(ServiceError::internal)?,
        };
        let bhk_type = if effective_type.has_bhk_layout() {
            match &draft.bhk_type {
                Some(b) if b.trim().is_empty() => None,
                Some(b) => Some(b.clone()),
                None => existing.bhk_type.clone(),
            }
        } else {
            None
        };

        sqlx::query(
            r#"
            UPDATE properties SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                address = COALESCE(?, address),
                city = COALESCE(?, city),
                district = COALESCE(?, district),
                property_type = ?,
                bhk_type = ?,
                bedrooms = COALESCE(?, bedrooms),
                bathrooms = COALESCE(?, bathrooms),
                area = COALESCE(?, area),
                rent_price = COALESCE(?, rent_price),
                deposit_amount = COALESCE(?, deposit_amount),
                amenities = COALESCE(?, amenities),
                facilities = COALESCE(?, facilities),
                rules = COALESCE(?, rules),
                images = COALESCE(?, images),
                verification_documents = COALESCE(?, verification_documents),
                status = COALESCE(?, status),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.address)
        .bind(&draft.city)
        .bind(&draft.district)
        .bind(effective_type.as_str())
        .bind(&bhk_type)
        .bind(draft.bedrooms)
        .bind(draft.bathrooms)
        .bind(draft.area)
        .bind(draft.rent_price)
        .bind(draft.deposit_amount)
        .bind(draft.amenities.as_ref().map(|v| normalize_json_field(Some(v))))
        .bind(draft.facilities.as_ref().map(|v| normalize_json_field(Some(v))))
        .bind(&draft.rules)
        .bind(images.as_deref().map(encode_string_list))
        .bind(documents.as_deref().map(encode_string_list))
        .bind(draft.status.map(|s| s.as_str()))
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.db)
        .await?;

        info!(property_id = %id, landlord_id = %caller.id, "Property updated");
        Ok(Property::from_row(self.fetch_row(id).await?, true))
    }

    /// Public search over approved, available listings
    pub async fn search(&self, filters: &SearchFilters) -> ServiceResult<Vec<Property>> {
        let mut conditions = vec!["is_approved = 1".to_string(), "status = ?".to_string()];
        let mut bindings = vec![Binding::Text(PropertyStatus::Available.as_str().to_string())];

        if let Some(city) = &filters.city {
            conditions.push("city = ?".to_string());
            bindings.push(Binding::Text(city.clone()));
        }
        if let Some(min) = filters.price_min {
            conditions.push("rent_price >= ?".to_string());
            bindings.push(Binding::Real(min));
        }
        if let Some(max) = filters.price_max {
            conditions.push("rent_price <= ?".to_string());
            bindings.push(Binding::Real(max));
        }
        if let Some(bedrooms) = filters.bedrooms {
            conditions.push("bedrooms = ?".to_string());
            bindings.push(Binding::Int(bedrooms));
        }
        if let Some(property_type) = filters.property_type {
            conditions.push("property_type = ?".to_string());
            bindings.push(Binding::Text(property_type.as_str().to_string()));
        }

        let sql = format!(
            "SELECT * FROM properties WHERE {} ORDER BY created_at DESC",
            conditions.join(" AND ")
        );
        let mut query = sqlx::query_as::<_, PropertyRow>(&sql);
        for binding in bindings {
            query = match binding {
                Binding::Text(v) => query.bind(v),
                Binding::Real(v) => query.bind(v),
                Binding::Int(v) => query.bind(v),
            };
        }

        let rows = query.fetch_all(&self.db).await?;
        Ok(rows
            .into_iter()
            .map(|row| Property::from_row(row, false))
            .collect())
    }

    /// Property detail. Unapproved listings are visible to their landlord and
    /// administrators only; verification documents likewise.
    pub async fn get(&self, id: &str, caller: Option<&Caller>) -> ServiceResult<Property> {
        let row: PropertyWithLandlordRow =
            sqlx::query_as(&format!("{} WHERE p.id = ?", WITH_LANDLORD))
                .bind(id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| ServiceError::not_found("Property not found"))?;

        let privileged = caller
            .map(|c| c.is_admin() || c.is(&row.property.landlord_id))
            .unwrap_or(false);

        if !row.property.is_approved && !privileged {
            return Err(ServiceError::forbidden(
                "Property is pending approval and you do not have permission to view it.",
            ));
        }

        Ok(Property::from_joined(row, privileged))
    }

    /// Every listing owned by the calling landlord, newest first
    pub async fn list_for_landlord(&self, caller: &Caller) -> ServiceResult<Vec<Property>> {
        LANDLORD_ONLY.check(caller)?;

        let rows: Vec<PropertyRow> = sqlx::query_as(
            "SELECT * FROM properties WHERE landlord_id = ? ORDER BY created_at DESC",
        )
        .bind(&caller.id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Property::from_row(row, true))
            .collect())
    }

    async fn fetch_row(&self, id: &str) -> ServiceResult<PropertyRow> {
        sqlx::query_as("SELECT * FROM properties WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Property not found"))
    }
}

fn required<'a>(value: &'a Option<String>, field: &str, label: &str) -> ServiceResult<&'a str> {
    let value = value.as_deref().map(str::trim).unwrap_or_default();
    validate_required(value, label).map_err(|e| ServiceError::validation(field, e))?;
    Ok(value)
}

fn validate_numbers(draft: &PropertyDraft) -> ServiceResult<()> {
    for (value, field) in [
        (draft.rent_price, "rentPrice"),
        (draft.deposit_amount, "depositAmount"),
        (draft.area, "area"),
    ] {
        if let Some(v) = value {
            validate_amount(v, field).map_err(|e| ServiceError::validation(field, e))?;
        }
    }
    for (value, field) in [(draft.bedrooms, "bedrooms"), (draft.bathrooms, "bathrooms")] {
        if matches!(value, Some(v) if v < 0) {
            return Err(ServiceError::validation(field, format!("{} cannot be negative", field)));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::{init_in_memory, Role};
    use crate::services::access::caller;
    use serde_json::json;

    pub(crate) fn draft(title: &str, city: &str, rent: f64) -> PropertyDraft {
        PropertyDraft {
            title: Some(title.into()),
            description: Some("Sunny, close to the ring road".into()),
            address: Some("Ward 4".into()),
            city: Some(city.into()),
            district: Some("Kathmandu".into()),
            property_type: Some(PropertyType::Apartment),
            bhk_type: Some("2BHK".into()),
            bedrooms: Some(2),
            bathrooms: Some(1),
            area: Some(900.0),
            rent_price: Some(rent),
            deposit_amount: Some(5000.0),
            amenities: Some(json!("[\"wifi\",\"parking\"]")),
            facilities: Some(json!({"homeFacilities": ["kitchen"], "surroundingFacilities": ["school"]})),
            rules: Some("No smoking".into()),
            status: None,
        }
    }

    pub(crate) async fn approve(db: &DbPool, id: &str) {
        sqlx::query("UPDATE properties SET is_approved = 1 WHERE id = ?")
            .bind(id)
            .execute(db)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn only_landlords_create_listings() {
        let db = init_in_memory().await.unwrap();
        let listings = ListingService::new(db);

        for role in [Role::Tenant, Role::Admin] {
            let err = listings
                .create(&caller("x", role), draft("Flat", "Kathmandu", 20000.0), vec![], vec![])
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(_)));
        }

        let property = listings
            .create(
                &caller("l1", Role::Landlord),
                draft("Flat", "Kathmandu", 20000.0),
                vec!["a.jpg".into()],
                vec!["deed.pdf".into()],
            )
            .await
            .unwrap();
        assert!(!property.is_approved);
        assert_eq!(property.status, "available");
        assert_eq!(property.amenities, vec!["wifi", "parking"]);
        assert_eq!(property.facilities.home_facilities, vec!["kitchen"]);
        assert_eq!(property.verification_documents.unwrap(), vec!["deed.pdf"]);
    }

    #[tokio::test]
    async fn land_never_carries_a_bhk_layout() {
        let db = init_in_memory().await.unwrap();
        let listings = ListingService::new(db);

        let mut land = draft("Plot", "Pokhara", 10000.0);
        land.property_type = Some(PropertyType::Land);
        land.bhk_type = None;
        land.bedrooms = None;
        land.bathrooms = None;

        let property = listings
            .create(&caller("l1", Role::Landlord), land, vec![], vec![])
            .await
            .unwrap();
        assert_eq!(property.property_type, "land");
        assert!(property.bhk_type.is_none());
    }

    #[tokio::test]
    async fn search_only_shows_approved_available_listings() {
        let db = init_in_memory().await.unwrap();
        let listings = ListingService::new(db.clone());
        let landlord = caller("l1", Role::Landlord);

        let approved = listings
            .create(&landlord, draft("Approved", "Kathmandu", 20000.0), vec![], vec![])
            .await
            .unwrap();
        let pending = listings
            .create(&landlord, draft("Pending", "Kathmandu", 20000.0), vec![], vec![])
            .await
            .unwrap();
        let booked = listings
            .create(&landlord, draft("Booked", "Kathmandu", 20000.0), vec![], vec![])
            .await
            .unwrap();
        approve(&db, &approved.id).await;
        approve(&db, &booked.id).await;
        sqlx::query("UPDATE properties SET status = 'booked' WHERE id = ?")
            .bind(&booked.id)
            .execute(&db)
            .await
            .unwrap();

        let filter_sets = [
            SearchFilters::default(),
            SearchFilters {
                city: Some("Kathmandu".into()),
                ..Default::default()
            },
            SearchFilters {
                price_min: Some(0.0),
                price_max: Some(1e9),
                bedrooms: Some(2),
                property_type: Some(PropertyType::Apartment),
                ..Default::default()
            },
        ];
        for filters in filter_sets {
            let found = listings.search(&filters).await.unwrap();
            let ids: Vec<&str> = found.iter().map(|p| p.id.as_str()).collect();
            assert_eq!(ids, vec![approved.id.as_str()], "filters {:?}", filters);
            assert!(found.iter().all(|p| p.verification_documents.is_none()));
        }
        assert!(!listings
            .search(&SearchFilters::default())
            .await
            .unwrap()
            .iter()
            .any(|p| p.id == pending.id));
    }

    #[tokio::test]
    async fn search_filters_are_conjunctive() {
        let db = init_in_memory().await.unwrap();
        let listings = ListingService::new(db.clone());
        let landlord = caller("l1", Role::Landlord);

        for (title, city, rent) in [
            ("Cheap KTM", "Kathmandu", 10000.0),
            ("Dear KTM", "Kathmandu", 50000.0),
            ("Cheap PKR", "Pokhara", 10000.0),
        ] {
            let p = listings
                .create(&landlord, draft(title, city, rent), vec![], vec![])
                .await
                .unwrap();
            approve(&db, &p.id).await;
        }

        let found = listings
            .search(&SearchFilters {
                city: Some("Kathmandu".into()),
                price_max: Some(20000.0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Cheap KTM");
    }

    #[test]
    fn blank_query_parameters_are_ignored() {
        let filters = SearchFilters::parse(&SearchQuery {
            city: Some("".into()),
            price_min: Some(" ".into()),
            price_max: Some("25000".into()),
            bedrooms: None,
            property_type: Some("house".into()),
        })
        .unwrap();
        assert_eq!(filters.city, None);
        assert_eq!(filters.price_min, None);
        assert_eq!(filters.price_max, Some(25000.0));
        assert_eq!(filters.property_type, Some(PropertyType::House));

        assert!(SearchFilters::parse(&SearchQuery {
            price_min: Some("cheap".into()),
            ..Default::default()
        })
        .is_err());
    }

    #[tokio::test]
    async fn unapproved_detail_is_private() {
        let db = init_in_memory().await.unwrap();
        let listings = ListingService::new(db.clone());
        let owner = caller("l1", Role::Landlord);

        let property = listings
            .create(&owner, draft("Flat", "Kathmandu", 20000.0), vec![], vec!["deed.pdf".into()])
            .await
            .unwrap();

        assert!(matches!(
            listings.get(&property.id, None).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            listings.get(&property.id, Some(&caller("l2", Role::Landlord))).await,
            Err(ServiceError::Forbidden(_))
        ));

        let as_owner = listings.get(&property.id, Some(&owner)).await.unwrap();
        assert_eq!(as_owner.verification_documents.unwrap(), vec!["deed.pdf"]);
        let as_admin = listings
            .get(&property.id, Some(&caller("a1", Role::Admin)))
            .await
            .unwrap();
        assert!(as_admin.verification_documents.is_some());

        approve(&db, &property.id).await;
        let public = listings.get(&property.id, None).await.unwrap();
        assert!(public.verification_documents.is_none());
        assert!(matches!(
            listings.get("missing", None).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn updates_are_owner_only_and_partial() {
        let db = init_in_memory().await.unwrap();
        let listings = ListingService::new(db);
        let owner = caller("l1", Role::Landlord);

        let property = listings
            .create(&owner, draft("Flat", "Kathmandu", 20000.0), vec!["a.jpg".into()], vec![])
            .await
            .unwrap();

        let err = listings
            .update(
                &caller("l2", Role::Landlord),
                &property.id,
                PropertyDraft::default(),
                None,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let updated = listings
            .update(
                &owner,
                &property.id,
                PropertyDraft {
                    rent_price: Some(22000.0),
                    ..Default::default()
                },
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.rent_price, 22000.0);
        assert_eq!(updated.title, "Flat");
        assert_eq!(updated.images, vec!["a.jpg"]);
        assert_eq!(updated.amenities, vec!["wifi", "parking"]);

        let replaced = listings
            .update(
                &owner,
                &property.id,
                PropertyDraft {
                    property_type: Some(PropertyType::Room),
                    ..Default::default()
                },
                Some(vec!["b.jpg".into(), "c.jpg".into()]),
                None,
            )
            .await
            .unwrap();
        assert_eq!(replaced.images, vec!["b.jpg", "c.jpg"]);
        assert!(replaced.bhk_type.is_none());
    }

    #[tokio::test]
    async fn my_properties_is_landlord_scoped() {
        let db = init_in_memory().await.unwrap();
        let listings = ListingService::new(db);
        let l1 = caller("l1", Role::Landlord);

        listings
            .create(&l1, draft("Mine", "Kathmandu", 20000.0), vec![], vec![])
            .await
            .unwrap();
        listings
            .create(&caller("l2", Role::Landlord), draft("Theirs", "Kathmandu", 20000.0), vec![], vec![])
            .await
            .unwrap();

        let mine = listings.list_for_landlord(&l1).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "Mine");

        assert!(listings
            .list_for_landlord(&caller("t1", Role::Tenant))
            .await
            .is_err());
    }
}
