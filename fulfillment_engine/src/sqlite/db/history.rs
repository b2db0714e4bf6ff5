use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::{
    db_types::{OrderId, StatusHistory},
    traits::DispositionUpdate,
};

pub async fn insert_history(
    update: &DispositionUpdate,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<StatusHistory, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO order_status_history (
                order_id,
                old_status,
                new_status,
                old_payment_status,
                new_payment_status,
                actor,
                reason,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(update.order_id.as_str())
    .bind(update.expected.status.to_string())
    .bind(update.new.status.to_string())
    .bind(update.expected.payment_status.to_string())
    .bind(update.new.payment_status.to_string())
    .bind(update.actor.as_str())
    .bind(update.reason.as_deref())
    .bind(now)
    .fetch_one(conn)
    .await
}

pub async fn fetch_history(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<StatusHistory>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await
}
