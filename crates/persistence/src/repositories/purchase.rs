//! Validated purchase repository.

use domain::models::purchase::PurchaseRecord;
use sqlx::PgConnection;

use crate::entities::{PurchasePlatformDb, PurchaseRecordEntity};
use crate::metrics::QueryTimer;

/// Repository for applied store purchases.
pub struct PurchaseRepository;

impl PurchaseRepository {
    pub async fn find_by_transaction_id(
        conn: &mut PgConnection,
        transaction_id: &str,
    ) -> Result<Option<PurchaseRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_purchase_by_transaction_id");
        let result = sqlx::query_as::<_, PurchaseRecordEntity>(
            r#"
            SELECT id, transaction_id, product_id, platform, user_id, created_at
            FROM validated_purchases
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn insert(
        conn: &mut PgConnection,
        purchase: &PurchaseRecord,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_purchase");
        let result = sqlx::query(
            r#"
            INSERT INTO validated_purchases (id, transaction_id, product_id, platform, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(purchase.id)
        .bind(&purchase.transaction_id)
        .bind(&purchase.product_id)
        .bind(PurchasePlatformDb::from(purchase.platform))
        .bind(purchase.user_id)
        .bind(purchase.created_at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|_| ())
    }
}
