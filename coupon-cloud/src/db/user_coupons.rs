use shared::models::{UserCoupon, UserCouponView};
use sqlx::PgPool;

const COLUMNS: &str = "id, user_id, coupon_id, order_id, activated_at, is_used, used_at";

/// `ON CONFLICT (order_id) DO NOTHING`: at most one entitlement per order
pub async fn activate(
    pool: &PgPool,
    user_id: &str,
    coupon_id: i64,
    order_id: i64,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO user_coupons (user_id, coupon_id, order_id, activated_at, is_used)
         VALUES ($1, $2, $3, $4, FALSE)
         ON CONFLICT (order_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(coupon_id)
    .bind(order_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn find_by_order(pool: &PgPool, order_id: i64) -> Result<Option<UserCoupon>, sqlx::Error> {
    sqlx::query_as::<_, UserCoupon>(&format!(
        "SELECT {COLUMNS} FROM user_coupons WHERE order_id = $1"
    ))
    .bind(order_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_for_user(
    pool: &PgPool,
    user_id: &str,
    id: i64,
) -> Result<Option<UserCoupon>, sqlx::Error> {
    sqlx::query_as::<_, UserCoupon>(&format!(
        "SELECT {COLUMNS} FROM user_coupons WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_by_user(pool: &PgPool, user_id: &str) -> Result<Vec<UserCouponView>, sqlx::Error> {
    sqlx::query_as::<_, UserCouponView>(
        "SELECT uc.id, uc.user_id, uc.coupon_id, uc.order_id, uc.activated_at, uc.is_used,
            uc.used_at, c.name AS coupon_name, o.order_number
         FROM user_coupons uc
         LEFT JOIN coupons c ON c.id = uc.coupon_id
         LEFT JOIN orders o ON o.id = uc.order_id
         WHERE uc.user_id = $1
         ORDER BY uc.activated_at DESC, uc.id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Flip `is_used` once; `None` when the row is missing, foreign or already used
pub async fn mark_used(
    pool: &PgPool,
    user_id: &str,
    id: i64,
    now: i64,
) -> Result<Option<UserCoupon>, sqlx::Error> {
    sqlx::query_as::<_, UserCoupon>(&format!(
        "UPDATE user_coupons SET is_used = TRUE, used_at = $1
         WHERE id = $2 AND user_id = $3 AND is_used = FALSE
         RETURNING {COLUMNS}"
    ))
    .bind(now)
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}
