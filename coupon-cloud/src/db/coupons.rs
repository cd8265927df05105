use shared::models::{Coupon, CouponCreate};
use sqlx::PgPool;

const COLUMNS: &str = "id, name, description, price, currency, is_active, created_at, updated_at";

pub async fn create(pool: &PgPool, coupon: &CouponCreate, now: i64) -> Result<Coupon, sqlx::Error> {
    sqlx::query_as::<_, Coupon>(&format!(
        "INSERT INTO coupons (name, description, price, currency, is_active, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $6)
         RETURNING {COLUMNS}"
    ))
    .bind(&coupon.name)
    .bind(&coupon.description)
    .bind(coupon.price)
    .bind(&coupon.currency)
    .bind(coupon.is_active)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Coupon>, sqlx::Error> {
    sqlx::query_as::<_, Coupon>(&format!("SELECT {COLUMNS} FROM coupons WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_active(pool: &PgPool, id: i64) -> Result<Option<Coupon>, sqlx::Error> {
    sqlx::query_as::<_, Coupon>(&format!(
        "SELECT {COLUMNS} FROM coupons WHERE id = $1 AND is_active = TRUE"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list_active(pool: &PgPool) -> Result<Vec<Coupon>, sqlx::Error> {
    sqlx::query_as::<_, Coupon>(&format!(
        "SELECT {COLUMNS} FROM coupons WHERE is_active = TRUE ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM coupons")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
