use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewPaymentTransaction, OrderId, PaymentResolution, PaymentTransaction, PaymentTransactionStatus};

pub async fn insert_payment(
    payment: NewPaymentTransaction,
    conn: &mut SqliteConnection,
) -> Result<PaymentTransaction, sqlx::Error> {
    let now = Utc::now();
    let payment: PaymentTransaction = sqlx::query_as(
        r#"
            INSERT INTO payment_transactions (
                reference_id,
                order_id,
                amount,
                currency,
                payer,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *;
        "#,
    )
    .bind(payment.reference_id)
    .bind(payment.order_id.0)
    .bind(payment.amount)
    .bind(payment.currency)
    .bind(payment.payer)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Payment attempt {} for order {} recorded", payment.reference_id, payment.order_id);
    Ok(payment)
}

/// Resolves a pending payment. Rows that already carry a final status are never touched again.
pub async fn resolve_payment(
    reference_id: &str,
    resolution: PaymentResolution,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE payment_transactions
            SET status = $1, financial_transaction_id = $2, reason = $3, updated_at = $4
            WHERE reference_id = $5 AND status = $6
            RETURNING *;
        "#,
    )
    .bind(resolution.status.to_string())
    .bind(resolution.financial_transaction_id)
    .bind(resolution.reason)
    .bind(Utc::now())
    .bind(reference_id)
    .bind(PaymentTransactionStatus::Pending.to_string())
    .fetch_optional(conn)
    .await
}

pub async fn fetch_payment(
    reference_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_transactions WHERE reference_id = $1")
        .bind(reference_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_payments_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_transactions WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await
}

pub async fn fetch_latest_pending_payment(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM payment_transactions WHERE order_id = $1 AND status = $2 ORDER BY id DESC LIMIT 1",
    )
    .bind(order_id.as_str())
    .bind(PaymentTransactionStatus::Pending.to_string())
    .fetch_optional(conn)
    .await
}
