use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::QueryAs;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{ProductEdit, ProductRecord};
use super::repo_types::ProductRow;
use super::store::{ProductStore, Stored};

const COLUMNS: &str = r#"
    id, barcode, name, brands, ingredients, allergens, labels, categories, packaging,
    nutriments, nova_group, nutriscore_grade, image_url, additives_tags, additives_n,
    ecoscore_grade, origins, origins_tags, recycling, green_score, match_score,
    environment_provenance, created_at, updated_at
"#;

/// Postgres-backed product store.
#[derive(Clone)]
pub struct PgProductStore {
    db: PgPool,
}

impl PgProductStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;

        // Run migrations if present
        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        Ok(Self { db })
    }
}

/// Binds every column of [`COLUMNS`] in order, as `$1..$24`.
fn bind_record<'q>(
    q: QueryAs<'q, Postgres, ProductRow, PgArguments>,
    r: &ProductRecord,
) -> QueryAs<'q, Postgres, ProductRow, PgArguments> {
    q.bind(r.id)
        .bind(r.barcode.clone())
        .bind(r.name.clone())
        .bind(r.brands.clone())
        .bind(r.ingredients.clone())
        .bind(r.allergens.clone())
        .bind(r.labels.clone())
        .bind(r.categories.clone())
        .bind(r.packaging.clone())
        .bind(Json(r.nutriments))
        .bind(r.nova_group.as_number())
        .bind(r.nutriscore_grade.map(|g| g.as_str()))
        .bind(r.image_url.clone())
        .bind(r.additives_tags.clone())
        .bind(r.additives_n)
        .bind(r.derived.ecoscore_grade.map(|g| g.as_str()))
        .bind(r.derived.origins.clone())
        .bind(r.derived.origins_tags.clone())
        .bind(r.derived.recycling.clone())
        .bind(i16::from(r.derived.green_score))
        .bind(i16::from(r.derived.match_score))
        .bind(r.derived.environment_provenance.as_str())
        .bind(r.created_at)
        .bind(r.updated_at)
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn create_if_absent(&self, candidate: ProductRecord) -> anyhow::Result<Stored> {
        let sql = format!(
            r#"
            INSERT INTO products ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)
            ON CONFLICT (barcode) DO NOTHING
            RETURNING {COLUMNS}
            "#
        );
        let inserted = bind_record(sqlx::query_as::<_, ProductRow>(&sql), &candidate)
            .fetch_optional(&self.db)
            .await
            .context("insert product")?;

        if let Some(row) = inserted {
            return Ok(Stored {
                record: row.into(),
                created: true,
            });
        }

        let existing = self
            .find_by_barcode(&candidate.barcode)
            .await?
            .context("product vanished after barcode conflict")?;
        Ok(Stored {
            record: existing,
            created: false,
        })
    }

    async fn find_by_barcode(&self, barcode: &str) -> anyhow::Result<Option<ProductRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM products WHERE barcode = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(barcode)
            .fetch_optional(&self.db)
            .await
            .context("find product by barcode")?;
        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<ProductRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find product by id")?;
        Ok(row.map(Into::into))
    }

    async fn recent(&self, limit: i64) -> anyhow::Result<Vec<ProductRecord>> {
        let sql = format!(
            r#"
            SELECT {COLUMNS}
              FROM products
             ORDER BY created_at DESC
             LIMIT $1
            "#
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(limit.max(0))
            .fetch_all(&self.db)
            .await
            .context("list recent products")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, id: Uuid, edit: ProductEdit) -> anyhow::Result<Option<ProductRecord>> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let select = format!("SELECT {COLUMNS} FROM products WHERE id = $1 FOR UPDATE");
        let Some(row) = sqlx::query_as::<_, ProductRow>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .context("lock product for update")?
        else {
            return Ok(None);
        };

        let mut record = ProductRecord::from(row);
        record.apply_edit(edit, OffsetDateTime::now_utc());

        let update = format!(
            r#"
            UPDATE products
               SET barcode = $2, name = $3, brands = $4, ingredients = $5, allergens = $6,
                   labels = $7, categories = $8, packaging = $9, nutriments = $10,
                   nova_group = $11, nutriscore_grade = $12, image_url = $13,
                   additives_tags = $14, additives_n = $15, ecoscore_grade = $16,
                   origins = $17, origins_tags = $18, recycling = $19, green_score = $20,
                   match_score = $21, environment_provenance = $22, updated_at = $24
             WHERE id = $1 AND created_at = $23
            RETURNING {COLUMNS}
            "#
        );
        let row = bind_record(sqlx::query_as::<_, ProductRow>(&update), &record)
            .fetch_one(&mut *tx)
            .await
            .context("update product")?;
        tx.commit().await.context("commit tx")?;

        Ok(Some(row.into()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete product")?;
        Ok(result.rows_affected() > 0)
    }
}
