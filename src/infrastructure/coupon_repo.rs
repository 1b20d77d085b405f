use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::Text;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::coupon::{canonical_code, Coupon, CouponUsageCounts};
use crate::domain::errors::DomainError;
use crate::domain::ports::CouponRepository;
use crate::schema::{coupon_usages, coupons};

use super::models::CouponRow;

diesel::define_sql_function!(fn upper(x: Text) -> Text);

/// Counts redemptions inside the caller's connection so the order writer can
/// re-check limits under its coupon lock.
pub(crate) fn count_usages(
    conn: &mut PgConnection,
    coupon_id: Uuid,
    user_id: Uuid,
) -> QueryResult<CouponUsageCounts> {
    let total: i64 = coupon_usages::table
        .filter(coupon_usages::coupon_id.eq(coupon_id))
        .select(count_star())
        .first(conn)?;
    let by_user: i64 = coupon_usages::table
        .filter(coupon_usages::coupon_id.eq(coupon_id))
        .filter(coupon_usages::user_id.eq(user_id))
        .select(count_star())
        .first(conn)?;

    Ok(CouponUsageCounts { total, by_user })
}

pub struct DieselCouponRepository {
    pool: DbPool,
}

impl DieselCouponRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CouponRepository for DieselCouponRepository {
    fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError> {
        let mut conn = self.pool.get()?;

        coupons::table
            .filter(upper(coupons::code).eq(canonical_code(code)))
            .select(CouponRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Coupon::try_from)
            .transpose()
    }

    fn usage_counts(
        &self,
        coupon_id: Uuid,
        user_id: Uuid,
    ) -> Result<CouponUsageCounts, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(count_usages(&mut conn, coupon_id, user_id)?)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::DieselCouponRepository;
    use crate::domain::coupon::{CouponUsageCounts, DiscountType};
    use crate::domain::ports::CouponRepository;
    use crate::infrastructure::test_db::{seed_coupon, setup_db};

    #[tokio::test]
    async fn finds_coupon_by_canonical_code() {
        let (_container, pool) = setup_db().await;
        let seeded = seed_coupon(&pool, "WELCOME10", Some(100), 1);
        let repo = DieselCouponRepository::new(pool);

        let found = repo
            .find_by_code("WELCOME10")
            .expect("find")
            .expect("coupon exists");

        assert_eq!(found.id, seeded.id);
        assert_eq!(found.discount_type, DiscountType::Percentage);
        assert!(repo.find_by_code("NOPE").expect("find").is_none());
    }

    #[tokio::test]
    async fn lower_case_stored_code_is_found_by_any_casing() {
        let (_container, pool) = setup_db().await;
        let seeded = seed_coupon(&pool, "save10", None, 1);
        let repo = DieselCouponRepository::new(pool);

        for lookup in ["SAVE10", "save10", " Save10 "] {
            let found = repo.find_by_code(lookup).expect("find");
            assert_eq!(found.map(|c| c.id), Some(seeded.id), "{}", lookup);
        }
    }

    #[tokio::test]
    async fn unused_coupon_has_zero_counts() {
        let (_container, pool) = setup_db().await;
        let coupon = seed_coupon(&pool, "FRESH", None, 1);
        let repo = DieselCouponRepository::new(pool);

        let counts = repo
            .usage_counts(coupon.id, Uuid::new_v4())
            .expect("counts");

        assert_eq!(counts, CouponUsageCounts::default());
    }
}
