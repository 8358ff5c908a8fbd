use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use suki_core::taxonomy::{BrandMapping, CategoryRef, SkuMapping};

use super::{RepositoryError, TaxonomyRepository};
use crate::DbPool;

pub struct SqlTaxonomyRepository {
    pool: DbPool,
}

impl SqlTaxonomyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TaxonomyRepository for SqlTaxonomyRepository {
    async fn load_brand_mappings(&self) -> Result<Vec<BrandMapping>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT brand_key, category_code, category_name, department_code, usage_count
             FROM product_mappings
             ORDER BY brand_key",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(brand_from_row).collect()
    }

    async fn load_sku_mappings(&self) -> Result<Vec<SkuMapping>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT brand_key, sku_code, sku_name, category_code, category_name,
                    department_code, usage_count
             FROM sku_mappings
             ORDER BY brand_key, sku_code",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(sku_from_row).collect()
    }

    async fn replace_mappings(
        &self,
        brands: Vec<BrandMapping>,
        skus: Vec<SkuMapping>,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sku_mappings").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM product_mappings").execute(&mut *tx).await?;

        for brand in &brands {
            sqlx::query(
                "INSERT INTO product_mappings (
                    brand_key,
                    category_code,
                    category_name,
                    department_code,
                    usage_count,
                    updated_at
                 ) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&brand.brand_key)
            .bind(&brand.category.category_code)
            .bind(&brand.category.category_name)
            .bind(&brand.category.department_code)
            .bind(brand.usage_count as i64)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        for sku in &skus {
            sqlx::query(
                "INSERT INTO sku_mappings (
                    brand_key,
                    sku_code,
                    sku_name,
                    category_code,
                    category_name,
                    department_code,
                    usage_count,
                    updated_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&sku.brand_key)
            .bind(&sku.sku_code)
            .bind(sku.sku_name.as_deref())
            .bind(&sku.category.category_code)
            .bind(&sku.category.category_name)
            .bind(&sku.category.department_code)
            .bind(sku.usage_count as i64)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn category_from_row(row: &SqliteRow) -> CategoryRef {
    CategoryRef {
        category_code: row.get("category_code"),
        category_name: row.get("category_name"),
        department_code: row.get("department_code"),
    }
}

fn brand_from_row(row: SqliteRow) -> Result<BrandMapping, RepositoryError> {
    Ok(BrandMapping {
        brand_key: row.get("brand_key"),
        category: category_from_row(&row),
        usage_count: row.get::<i64, _>("usage_count").max(0) as u64,
    })
}

fn sku_from_row(row: SqliteRow) -> Result<SkuMapping, RepositoryError> {
    Ok(SkuMapping {
        brand_key: row.get("brand_key"),
        sku_code: row.get("sku_code"),
        sku_name: row.get("sku_name"),
        category: category_from_row(&row),
        usage_count: row.get::<i64, _>("usage_count").max(0) as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations::run_pending, repositories::TaxonomyRepository};

    fn brand(key: &str, code: &str, usage: u64) -> BrandMapping {
        BrandMapping {
            brand_key: key.to_string(),
            category: CategoryRef {
                category_code: code.to_string(),
                category_name: code.to_string(),
                department_code: "D-01".to_string(),
            },
            usage_count: usage,
        }
    }

    #[tokio::test]
    async fn replace_swaps_the_whole_dictionary() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        let repo = SqlTaxonomyRepository::new(pool);

        repo.replace_mappings(
            vec![brand("alaska", "food-beverages", 100), brand("surf", "household", 40)],
            vec![],
        )
        .await
        .expect("first load");

        repo.replace_mappings(vec![brand("alaska", "dairy", 120)], vec![])
            .await
            .expect("second load");

        let brands = repo.load_brand_mappings().await.expect("load");
        assert_eq!(brands.len(), 1);
        assert_eq!(brands[0].brand_key, "alaska");
        assert_eq!(brands[0].category.category_code, "dairy");
        assert_eq!(brands[0].usage_count, 120);
    }

    #[tokio::test]
    async fn sku_rows_round_trip_with_optional_name() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        let repo = SqlTaxonomyRepository::new(pool);

        let sku = SkuMapping {
            brand_key: "alaska".to_string(),
            sku_code: "ALK-EVAP-370".to_string(),
            sku_name: None,
            category: CategoryRef {
                category_code: "dairy".to_string(),
                category_name: "Dairy".to_string(),
                department_code: "D-02".to_string(),
            },
            usage_count: 7,
        };
        repo.replace_mappings(vec![], vec![sku.clone()]).await.expect("save");

        let loaded = repo.load_sku_mappings().await.expect("load");
        assert_eq!(loaded, vec![sku]);
    }
}
