//! Booking workflow.
//!
//! Bookings start `pending` and are decided once by the property's landlord.
//! Approval flips the property to `booked` in the same transaction; other
//! pending bookings on that property are left for the landlord to decide.

use chrono::Months;
use tracing::info;
use uuid::Uuid;

use crate::db::{
    now_timestamp, Booking, BookingStatus, BookingWithProperty, CreateBookingRequest, DbPool,
    PropertyRow, PropertyStatus,
};
use crate::validation::{parse_date, validate_amount};

use super::access::{require_owner, Caller, TENANT_ONLY};
use super::error::{ServiceError, ServiceResult};

pub struct BookingService {
    db: DbPool,
}

impl BookingService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Request a booking as a tenant
    pub async fn create(&self, caller: &Caller, req: CreateBookingRequest) -> ServiceResult<Booking> {
        TENANT_ONLY
            .check(caller)
            .map_err(|_| ServiceError::forbidden("Only tenants can create bookings"))?;

        let property: PropertyRow = sqlx::query_as("SELECT * FROM properties WHERE id = ?")
            .bind(&req.property_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Property not found"))?;

        let duration_years = req.duration_years.unwrap_or(1);
        if !(1..=99).contains(&duration_years) {
            return Err(ServiceError::validation(
                "durationYears",
                "durationYears must be between 1 and 99",
            ));
        }

        let move_in = parse_date(&req.move_in_date, "moveInDate")
            .map_err(|e| ServiceError::validation("moveInDate", e))?;
        let move_out = match req.move_out_date.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(raw) => {
                let date = parse_date(raw, "moveOutDate")
                    .map_err(|e| ServiceError::validation("moveOutDate", e))?;
                if date < move_in {
                    return Err(ServiceError::validation(
                        "moveOutDate",
                        "moveOutDate cannot be before moveInDate",
                    ));
                }
                date
            }
            None => move_in
                .checked_add_months(Months::new(12 * duration_years as u32))
                .ok_or_else(|| ServiceError::validation("durationYears", "Lease term is out of range"))?,
        };

        let monthly_rent = req.monthly_rent.unwrap_or(property.rent_price);
        let deposit_amount = req.deposit_amount.unwrap_or(property.deposit_amount);
        validate_amount(monthly_rent, "monthlyRent")
            .map_err(|e| ServiceError::validation("monthlyRent", e))?;
        validate_amount(deposit_amount, "depositAmount")
            .map_err(|e| ServiceError::validation("depositAmount", e))?;

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO bookings (id, property_id, tenant_id, landlord_id, move_in_date, move_out_date,
                                  duration_years, monthly_rent, deposit_amount, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&property.id)
        .bind(&caller.id)
        .bind(&property.landlord_id)
        .bind(move_in.format("%Y-%m-%d").to_string())
        .bind(move_out.format("%Y-%m-%d").to_string())
        .bind(duration_years)
        .bind(monthly_rent)
        .bind(deposit_amount)
        .bind(BookingStatus::Pending.as_str())
        .bind(now_timestamp())
        .execute(&self.db)
        .await?;

        info!(
            booking_id = %id,
            property_id = %property.id,
            tenant_id = %caller.id,
            "Booking requested"
        );
        self.get(&id).await
    }

    /// Decide a booking. Only the booking's landlord may do this.
    ///
    /// Repeating the current terminal status is a no-op; anything else out of a
    /// terminal state is rejected.
    pub async fn set_status(
        &self,
        caller: &Caller,
        booking_id: &str,
        status: &str,
    ) -> ServiceResult<Booking> {
        let next: BookingStatus = status
            .parse()
            .map_err(|e| ServiceError::validation("status", e))?;

        let mut tx = self.db.begin().await?;

        let booking: Booking = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
            .bind(booking_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ServiceError::not_found("Booking not found"))?;

        require_owner(
            caller,
            &booking.landlord_id,
            "Only the landlord of this property can update the booking",
        )?;

        let current = booking.status_enum();
        if !current.can_become(next) {
            return Err(ServiceError::InvalidState(format!(
                "Booking is already {} and cannot become {}",
                current, next
            )));
        }
        if current == next {
            return Ok(booking);
        }

        sqlx::query("UPDATE bookings SET status = ? WHERE id = ?")
            .bind(next.as_str())
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;

        if next == BookingStatus::Approved {
            let result = sqlx::query("UPDATE properties SET status = ?, updated_at = ? WHERE id = ?")
                .bind(PropertyStatus::Booked.as_str())
                .bind(now_timestamp())
                .bind(&booking.property_id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(ServiceError::not_found("Property not found"));
            }
        }

        tx.commit().await?;

        info!(booking_id = %booking_id, status = %next, "Booking status updated");
        self.get(booking_id).await
    }

    /// Tenant acknowledgement of the lease on an approved booking
    pub async fn agree_contract(&self, caller: &Caller, booking_id: &str) -> ServiceResult<Booking> {
        let booking = self.get(booking_id).await?;
        require_owner(
            caller,
            &booking.tenant_id,
            "Only the tenant of this booking can agree to its contract",
        )?;

        if booking.status_enum() != BookingStatus::Approved {
            return Err(ServiceError::InvalidState(
                "Only approved bookings have a contract to agree to".to_string(),
            ));
        }
        if booking.contract_agreed_at.is_some() {
            return Ok(booking);
        }

        sqlx::query(
            "UPDATE bookings SET contract_agreed_at = ? WHERE id = ? AND contract_agreed_at IS NULL",
        )
        .bind(now_timestamp())
        .bind(booking_id)
        .execute(&self.db)
        .await?;

        info!(booking_id = %booking_id, tenant_id = %caller.id, "Contract agreed");
        self.get(booking_id).await
    }

    /// Bookings where `user_id` is the tenant or the landlord.
    ///
    /// Callers see their own; administrators may look at anyone's.
    pub async fn list_for_user(
        &self,
        caller: &Caller,
        user_id: &str,
    ) -> ServiceResult<Vec<BookingWithProperty>> {
        if !caller.is(user_id) && !caller.is_admin() {
            return Err(ServiceError::forbidden("You can only view your own bookings"));
        }

        let bookings: Vec<BookingWithProperty> = sqlx::query_as(
            r#"
            SELECT b.*, p.title AS title, p.address AS address
            FROM bookings b
            LEFT JOIN properties p ON p.id = b.property_id
            WHERE b.tenant_id = ? OR b.landlord_id = ?
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(bookings)
    }

    pub async fn get(&self, booking_id: &str) -> ServiceResult<Booking> {
        sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
            .bind(booking_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Booking not found"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::{init_in_memory, Role};
    use crate::services::access::caller;
    use crate::services::listings::tests::{approve, draft};
    use crate::services::listings::ListingService;

    pub(crate) fn request(property_id: &str) -> CreateBookingRequest {
        CreateBookingRequest {
            property_id: property_id.into(),
            move_in_date: "2025-01-01".into(),
            move_out_date: None,
            duration_years: Some(1),
            monthly_rent: None,
            deposit_amount: None,
        }
    }

    /// An approved listing owned by `l1`, rent 30000 and deposit 5000
    pub(crate) async fn listed_property(db: &DbPool) -> String {
        let listings = ListingService::new(db.clone());
        let property = listings
            .create(
                &caller("l1", Role::Landlord),
                draft("Flat", "Kathmandu", 30000.0),
                vec![],
                vec![],
            )
            .await
            .unwrap();
        approve(db, &property.id).await;
        property.id
    }

    async fn property_status(db: &DbPool, id: &str) -> String {
        sqlx::query_scalar("SELECT status FROM properties WHERE id = ?")
            .bind(id)
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn only_tenants_book_and_landlord_is_copied() {
        let db = init_in_memory().await.unwrap();
        let bookings = BookingService::new(db.clone());
        let property_id = listed_property(&db).await;

        let err = bookings
            .create(&caller("l1", Role::Landlord), request(&property_id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = bookings
            .create(&caller("t1", Role::Tenant), request("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let booking = bookings
            .create(&caller("t1", Role::Tenant), request(&property_id))
            .await
            .unwrap();
        assert_eq!(booking.landlord_id, "l1");
        assert_eq!(booking.tenant_id, "t1");
        assert_eq!(booking.status, "pending");
        assert_eq!(booking.monthly_rent, 30000.0);
        assert_eq!(booking.deposit_amount, 5000.0);
        assert_eq!(booking.move_out_date, "2026-01-01");
    }

    #[tokio::test]
    async fn move_out_is_checked_or_derived() {
        let db = init_in_memory().await.unwrap();
        let bookings = BookingService::new(db.clone());
        let property_id = listed_property(&db).await;
        let tenant = caller("t1", Role::Tenant);

        let mut req = request(&property_id);
        req.move_out_date = Some("2024-12-31".into());
        assert!(matches!(
            bookings.create(&tenant, req).await,
            Err(ServiceError::Validation { .. })
        ));

        let mut req = request(&property_id);
        req.duration_years = Some(3);
        req.move_in_date = "2024-02-29".into();
        let booking = bookings.create(&tenant, req).await.unwrap();
        assert_eq!(booking.move_out_date, "2027-02-28");

        let mut req = request(&property_id);
        req.duration_years = Some(0);
        assert!(bookings.create(&tenant, req).await.is_err());
    }

    #[tokio::test]
    async fn only_the_landlord_decides() {
        let db = init_in_memory().await.unwrap();
        let bookings = BookingService::new(db.clone());
        let property_id = listed_property(&db).await;
        let booking = bookings
            .create(&caller("t1", Role::Tenant), request(&property_id))
            .await
            .unwrap();

        for intruder in [
            caller("t1", Role::Tenant),
            caller("l2", Role::Landlord),
            caller("a1", Role::Admin),
        ] {
            let err = bookings
                .set_status(&intruder, &booking.id, "approved")
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(_)));
        }
        assert_eq!(bookings.get(&booking.id).await.unwrap().status, "pending");
        assert_eq!(property_status(&db, &property_id).await, "available");
    }

    #[tokio::test]
    async fn approval_books_the_property() {
        let db = init_in_memory().await.unwrap();
        let bookings = BookingService::new(db.clone());
        let property_id = listed_property(&db).await;
        let landlord = caller("l1", Role::Landlord);

        let first = bookings
            .create(&caller("t1", Role::Tenant), request(&property_id))
            .await
            .unwrap();
        let second = bookings
            .create(&caller("t2", Role::Tenant), request(&property_id))
            .await
            .unwrap();

        let approved = bookings.set_status(&landlord, &first.id, "approved").await.unwrap();
        assert_eq!(approved.status, "approved");
        assert_eq!(property_status(&db, &property_id).await, "booked");

        // Sibling requests stay pending
        assert_eq!(bookings.get(&second.id).await.unwrap().status, "pending");

        // Re-approving is a no-op, reversing is not allowed
        assert!(bookings.set_status(&landlord, &first.id, "approved").await.is_ok());
        assert!(matches!(
            bookings.set_status(&landlord, &first.id, "rejected").await,
            Err(ServiceError::InvalidState(_))
        ));
        assert!(matches!(
            bookings.set_status(&landlord, &first.id, "pending").await,
            Err(ServiceError::InvalidState(_))
        ));
        assert!(matches!(
            bookings.set_status(&landlord, &first.id, "cancelled").await,
            Err(ServiceError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn rejection_leaves_the_property_available() {
        let db = init_in_memory().await.unwrap();
        let bookings = BookingService::new(db.clone());
        let property_id = listed_property(&db).await;

        let booking = bookings
            .create(&caller("t1", Role::Tenant), request(&property_id))
            .await
            .unwrap();
        let rejected = bookings
            .set_status(&caller("l1", Role::Landlord), &booking.id, "rejected")
            .await
            .unwrap();
        assert_eq!(rejected.status, "rejected");
        assert_eq!(property_status(&db, &property_id).await, "available");
    }

    #[tokio::test]
    async fn approval_of_an_orphaned_booking_rolls_back() {
        let db = init_in_memory().await.unwrap();
        let bookings = BookingService::new(db.clone());
        let property_id = listed_property(&db).await;

        let booking = bookings
            .create(&caller("t1", Role::Tenant), request(&property_id))
            .await
            .unwrap();
        sqlx::query("DELETE FROM properties WHERE id = ?")
            .bind(&property_id)
            .execute(&db)
            .await
            .unwrap();

        assert!(matches!(
            bookings
                .set_status(&caller("l1", Role::Landlord), &booking.id, "approved")
                .await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(bookings.get(&booking.id).await.unwrap().status, "pending");
    }

    #[tokio::test]
    async fn contract_agreement_needs_an_approved_booking() {
        let db = init_in_memory().await.unwrap();
        let bookings = BookingService::new(db.clone());
        let property_id = listed_property(&db).await;
        let tenant = caller("t1", Role::Tenant);

        let booking = bookings.create(&tenant, request(&property_id)).await.unwrap();
        assert!(matches!(
            bookings.agree_contract(&tenant, &booking.id).await,
            Err(ServiceError::InvalidState(_))
        ));

        bookings
            .set_status(&caller("l1", Role::Landlord), &booking.id, "approved")
            .await
            .unwrap();
        assert!(matches!(
            bookings.agree_contract(&caller("t2", Role::Tenant), &booking.id).await,
            Err(ServiceError::Forbidden(_))
        ));

        let agreed = bookings.agree_contract(&tenant, &booking.id).await.unwrap();
        let stamp = agreed.contract_agreed_at.clone().unwrap();
        assert_eq!(agreed.status, "approved");

        let again = bookings.agree_contract(&tenant, &booking.id).await.unwrap();
        assert_eq!(again.contract_agreed_at.unwrap(), stamp);
    }

    #[tokio::test]
    async fn listing_covers_both_sides_of_a_booking() {
        let db = init_in_memory().await.unwrap();
        let bookings = BookingService::new(db.clone());
        let property_id = listed_property(&db).await;
        let tenant = caller("t1", Role::Tenant);

        bookings.create(&tenant, request(&property_id)).await.unwrap();

        let as_tenant = bookings.list_for_user(&tenant, "t1").await.unwrap();
        assert_eq!(as_tenant.len(), 1);
        assert_eq!(as_tenant[0].title.as_deref(), Some("Flat"));

        let landlord = caller("l1", Role::Landlord);
        assert_eq!(bookings.list_for_user(&landlord, "l1").await.unwrap().len(), 1);
        assert_eq!(
            bookings
                .list_for_user(&caller("a1", Role::Admin), "t1")
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(matches!(
            bookings.list_for_user(&landlord, "t1").await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}
