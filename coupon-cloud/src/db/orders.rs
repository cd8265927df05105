use shared::models::{NewOrder, Order, OrderStatus, OrderSummary};
use sqlx::PgPool;

const COLUMNS: &str = "id, order_number, external_order_id, coupon_id, user_id, amount, currency,
    status, payment_url, return_url, fail_url, description, created_at, updated_at";

pub async fn create(pool: &PgPool, order: &NewOrder, now: i64) -> Result<Order, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO orders (order_number, coupon_id, user_id, amount, currency, status,
            return_url, fail_url, description, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
         RETURNING {COLUMNS}"
    ))
    .bind(&order.order_number)
    .bind(order.coupon_id)
    .bind(&order.user_id)
    .bind(order.amount)
    .bind(&order.currency)
    .bind(OrderStatus::Created.as_db())
    .bind(&order.return_url)
    .bind(&order.fail_url)
    .bind(&order.description)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn find_by_number(pool: &PgPool, order_number: &str) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {COLUMNS} FROM orders WHERE order_number = $1"
    ))
    .bind(order_number)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_external_id(
    pool: &PgPool,
    external_order_id: &str,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {COLUMNS} FROM orders WHERE external_order_id = $1"
    ))
    .bind(external_order_id)
    .fetch_optional(pool)
    .await
}

/// Compare-and-set on `status`; returns `true` when the row was updated
pub async fn transition_status(
    pool: &PgPool,
    order_id: i64,
    from: OrderStatus,
    to: OrderStatus,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4",
    )
    .bind(to.as_db())
    .bind(now)
    .bind(order_id)
    .bind(from.as_db())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Returns `false` when no order has this id
pub async fn set_external_id(
    pool: &PgPool,
    order_id: i64,
    external_order_id: &str,
    payment_url: &str,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET external_order_id = $1, payment_url = $2, updated_at = $3 WHERE id = $4",
    )
    .bind(external_order_id)
    .bind(payment_url)
    .bind(now)
    .bind(order_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn list_by_user(pool: &PgPool, user_id: &str) -> Result<Vec<OrderSummary>, sqlx::Error> {
    sqlx::query_as::<_, OrderSummary>(
        "SELECT o.id, o.order_number, o.external_order_id, o.coupon_id, o.user_id, o.amount,
            o.currency, o.status, o.payment_url, o.return_url, o.fail_url, o.description,
            o.created_at, o.updated_at, c.name AS coupon_name
         FROM orders o
         LEFT JOIN coupons c ON c.id = o.coupon_id
         WHERE o.user_id = $1
         ORDER BY o.created_at DESC, o.id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
