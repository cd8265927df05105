//! Order number generation
//!
//! Format: `COUPON_{coupon_id}_{user_id}_{unix_secs}_{8 hex}`. The random
//! suffix keeps two orders created in the same second apart; a store
//! conflict still triggers regeneration.

use crate::util::now_secs;

/// Longest user id fragment kept in an order number
const MAX_USER_FRAGMENT: usize = 32;

pub fn generate(coupon_id: i64, user_id: &str) -> String {
    format_order_number(coupon_id, user_id, now_secs(), &random_suffix())
}

fn format_order_number(coupon_id: i64, user_id: &str, unix_secs: i64, suffix: &str) -> String {
    format!(
        "COUPON_{coupon_id}_{}_{unix_secs}_{suffix}",
        user_fragment(user_id)
    )
}

/// User ids end up in URL paths; anything outside `[A-Za-z0-9_-]` becomes `-`
fn user_fragment(user_id: &str) -> String {
    user_id
        .chars()
        .take(MAX_USER_FRAGMENT)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

fn random_suffix() -> String {
    let mut hex = uuid::Uuid::new_v4().simple().to_string();
    hex.truncate(8);
    hex
}
