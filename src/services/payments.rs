//! Payment ledger.
//!
//! Payments are recorded `pending` against a booking and marked `completed`
//! when the client reports a gateway transaction id. That report is trusted
//! as-is; no gateway is consulted.

use tracing::info;
use uuid::Uuid;

use crate::db::{
    now_timestamp, today, Booking, CreatePaymentRequest, DbPool, DepositPaymentRequest, Payment,
    PaymentBreakdown, PaymentStatus,
};
use crate::validation::{parse_date, validate_amount};

use super::access::{require_owner, Caller, ANY_CALLER};
use super::error::{ServiceError, ServiceResult};

const DEFAULT_PAYMENT_TYPE: &str = "rent";
const DEPOSIT_PAYMENT_TYPE: &str = "deposit";
const DEFAULT_PAYMENT_METHOD: &str = "cash";

pub struct PaymentService {
    db: DbPool,
}

impl PaymentService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Record a pending payment against an existing booking
    pub async fn record(&self, caller: &Caller, req: CreatePaymentRequest) -> ServiceResult<Payment> {
        ANY_CALLER.check(caller)?;

        let booking = self.booking(&req.booking_id).await?;

        let amount = req
            .amount
            .ok_or_else(|| ServiceError::validation("amount", "Amount is required"))?;
        validate_amount(amount, "amount").map_err(|e| ServiceError::validation("amount", e))?;

        let due_date = match req.due_date.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(raw) => Some(
                parse_date(raw, "dueDate")
                    .map_err(|e| ServiceError::validation("dueDate", e))?
                    .format("%Y-%m-%d")
                    .to_string(),
            ),
            None => None,
        };

        let payment_type = non_blank(req.payment_type.as_deref()).unwrap_or(DEFAULT_PAYMENT_TYPE);
        let payment_method =
            non_blank(req.payment_method.as_deref()).unwrap_or(DEFAULT_PAYMENT_METHOD);

        let id = self
            .insert(&booking, amount, payment_type, payment_method, due_date.as_deref())
            .await?;
        info!(payment_id = %id, booking_id = %booking.id, amount, "Payment recorded");
        self.get(&id).await
    }

    /// Record the upfront payment a tenant makes when moving in.
    ///
    /// The deposit counts towards the first month, so the amount due is
    /// `monthly_rent * months_paid`.
    pub async fn deposit(
        &self,
        caller: &Caller,
        req: DepositPaymentRequest,
    ) -> ServiceResult<(Payment, PaymentBreakdown)> {
        let booking = self.booking(&req.booking_id).await?;
        require_owner(
            caller,
            &booking.tenant_id,
            "Only the tenant of this booking can pay its deposit",
        )?;

        let months = req.months_paid.unwrap_or(1);
        let max_months = booking.duration_years.max(1) * 12;
        if !(1..=max_months).contains(&months) {
            return Err(ServiceError::validation(
                "monthsPaid",
                format!("monthsPaid must be between 1 and {}", max_months),
            ));
        }

        let breakdown =
            PaymentBreakdown::compute(booking.monthly_rent, booking.deposit_amount, months);
        let method = non_blank(req.payment_method.as_deref()).unwrap_or(DEFAULT_PAYMENT_METHOD);
        let due_date = today();

        let id = self
            .insert(
                &booking,
                breakdown.total_payment,
                DEPOSIT_PAYMENT_TYPE,
                method,
                Some(due_date.as_str()),
            )
            .await?;
        info!(
            payment_id = %id,
            booking_id = %booking.id,
            months,
            total = breakdown.total_payment,
            "Deposit payment recorded"
        );
        Ok((self.get(&id).await?, breakdown))
    }

    /// Mark a payment completed with the gateway's transaction id
    pub async fn complete(
        &self,
        caller: &Caller,
        payment_id: &str,
        transaction_id: Option<&str>,
    ) -> ServiceResult<Payment> {
        ANY_CALLER.check(caller)?;

        let transaction_id = non_blank(transaction_id)
            .ok_or_else(|| ServiceError::validation("transactionId", "transactionId is required"))?;

        let result = sqlx::query(
            "UPDATE payments SET status = ?, payment_date = ?, transaction_id = ? WHERE id = ?",
        )
        .bind(PaymentStatus::Completed.as_str())
        .bind(now_timestamp())
        .bind(transaction_id)
        .bind(payment_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found("Payment not found"));
        }

        info!(payment_id = %payment_id, caller_id = %caller.id, "Payment completed");
        self.get(payment_id).await
    }

    /// Payments where the caller is the tenant or the landlord, newest first
    pub async fn list_for_user(&self, caller: &Caller) -> ServiceResult<Vec<Payment>> {
        let payments: Vec<Payment> = sqlx::query_as(
            "SELECT * FROM payments WHERE tenant_id = ? OR landlord_id = ? ORDER BY created_at DESC",
        )
        .bind(&caller.id)
        .bind(&caller.id)
        .fetch_all(&self.db)
        .await?;
        Ok(payments)
    }

    pub async fn get(&self, payment_id: &str) -> ServiceResult<Payment> {
        sqlx::query_as("SELECT * FROM payments WHERE id = ?")
            .bind(payment_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Payment not found"))
    }

    async fn booking(&self, booking_id: &str) -> ServiceResult<Booking> {
        sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
            .bind(booking_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Booking not found"))
    }

    async fn insert(
        &self,
        booking: &Booking,
        amount: f64,
        payment_type: &str,
        payment_method: &str,
        due_date: Option<&str>,
    ) -> ServiceResult<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO payments (id, booking_id, tenant_id, landlord_id, amount, payment_type,
                                  payment_method, status, due_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&booking.id)
        .bind(&booking.tenant_id)
        .bind(&booking.landlord_id)
        .bind(amount)
        .bind(payment_type)
        .bind(payment_method)
        .bind(PaymentStatus::Pending.as_str())
        .bind(due_date)
        .bind(now_timestamp())
        .execute(&self.db)
        .await?;
        Ok(id)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_in_memory, Role};
    use crate::services::access::caller;
    use crate::services::bookings::tests::{listed_property, request};
    use crate::services::bookings::BookingService;

    async fn booking(db: &DbPool) -> Booking {
        let property_id = listed_property(db).await;
        BookingService::new(db.clone())
            .create(&caller("t1", Role::Tenant), request(&property_id))
            .await
            .unwrap()
    }

    fn payment_request(booking_id: &str) -> CreatePaymentRequest {
        CreatePaymentRequest {
            booking_id: booking_id.into(),
            amount: Some(30000.0),
            payment_type: Some("rent".into()),
            payment_method: Some("esewa".into()),
            due_date: Some("2025-02-01".into()),
        }
    }

    #[tokio::test]
    async fn records_copy_parties_from_the_booking() {
        let db = init_in_memory().await.unwrap();
        let payments = PaymentService::new(db.clone());
        let booking = booking(&db).await;

        let payment = payments
            .record(&caller("anyone", Role::Landlord), payment_request(&booking.id))
            .await
            .unwrap();
        assert_eq!(payment.tenant_id, "t1");
        assert_eq!(payment.landlord_id, "l1");
        assert_eq!(payment.status, "pending");
        assert_eq!(payment.due_date.as_deref(), Some("2025-02-01"));
        assert!(payment.payment_date.is_none());

        assert!(matches!(
            payments
                .record(&caller("t1", Role::Tenant), payment_request("missing"))
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn completion_stamps_date_and_transaction() {
        let db = init_in_memory().await.unwrap();
        let payments = PaymentService::new(db.clone());
        let booking = booking(&db).await;
        let tenant = caller("t1", Role::Tenant);

        let payment = payments.record(&tenant, payment_request(&booking.id)).await.unwrap();

        assert!(matches!(
            payments.complete(&tenant, &payment.id, Some("  ")).await,
            Err(ServiceError::Validation { .. })
        ));
        assert!(matches!(
            payments.complete(&tenant, "missing", Some("TXN-1")).await,
            Err(ServiceError::NotFound(_))
        ));

        let completed = payments
            .complete(&tenant, &payment.id, Some("TXN-1"))
            .await
            .unwrap();
        assert_eq!(completed.status, "completed");
        assert_eq!(completed.transaction_id.as_deref(), Some("TXN-1"));
        assert!(completed.payment_date.is_some());
    }

    #[tokio::test]
    async fn deposit_breakdown_scales_with_months() {
        let db = init_in_memory().await.unwrap();
        let payments = PaymentService::new(db.clone());
        let booking = booking(&db).await;
        let tenant = caller("t1", Role::Tenant);

        let (payment, breakdown) = payments
            .deposit(
                &tenant,
                DepositPaymentRequest {
                    booking_id: booking.id.clone(),
                    months_paid: Some(1),
                    payment_method: Some("khalti".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(payment.amount, 30000.0);
        assert_eq!(payment.payment_type, "deposit");
        assert_eq!(breakdown.first_month_balance, 25000.0);

        let (payment, breakdown) = payments
            .deposit(
                &tenant,
                DepositPaymentRequest {
                    booking_id: booking.id.clone(),
                    months_paid: Some(3),
                    payment_method: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(payment.amount, 90000.0);
        assert_eq!(breakdown.total_payment, 90000.0);
        assert_eq!(breakdown.first_month_balance, 25000.0);
        assert_eq!(breakdown.additional_months_total, 60000.0);
    }

    #[tokio::test]
    async fn deposit_is_tenant_only_and_bounded_by_the_lease() {
        let db = init_in_memory().await.unwrap();
        let payments = PaymentService::new(db.clone());
        let booking = booking(&db).await;

        let req = |months| DepositPaymentRequest {
            booking_id: booking.id.clone(),
            months_paid: Some(months),
            payment_method: None,
        };

        assert!(matches!(
            payments.deposit(&caller("l1", Role::Landlord), req(1)).await,
            Err(ServiceError::Forbidden(_))
        ));
        for months in [0, 13] {
            assert!(matches!(
                payments.deposit(&caller("t1", Role::Tenant), req(months)).await,
                Err(ServiceError::Validation { .. })
            ));
        }
        assert!(payments.deposit(&caller("t1", Role::Tenant), req(12)).await.is_ok());
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_parties() {
        let db = init_in_memory().await.unwrap();
        let payments = PaymentService::new(db.clone());
        let booking = booking(&db).await;

        payments
            .record(&caller("t1", Role::Tenant), payment_request(&booking.id))
            .await
            .unwrap();

        assert_eq!(payments.list_for_user(&caller("t1", Role::Tenant)).await.unwrap().len(), 1);
        assert_eq!(payments.list_for_user(&caller("l1", Role::Landlord)).await.unwrap().len(), 1);
        assert!(payments
            .list_for_user(&caller("t2", Role::Tenant))
            .await
            .unwrap()
            .is_empty());
    }
}
