//! Suppliers that products are bought from.

use sqlx::SqlitePool;

use super::non_blank;
use crate::error::{DbError, DbResult};
use techstore_core::{NewSupplier, Supplier};

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            "SELECT id, name, phone, email, address FROM suppliers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            "SELECT id, name, phone, email, address FROM suppliers ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }

    pub async fn insert(&self, supplier: &NewSupplier) -> DbResult<Supplier> {
        let result = sqlx::query(
            "INSERT INTO suppliers (name, phone, email, address) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(supplier.name.trim())
        .bind(non_blank(&supplier.phone))
        .bind(non_blank(&supplier.email))
        .bind(non_blank(&supplier.address))
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn update(&self, id: i64, supplier: &NewSupplier) -> DbResult<Supplier> {
        let result = sqlx::query(
            "UPDATE suppliers SET name = ?1, phone = ?2, email = ?3, address = ?4 WHERE id = ?5",
        )
        .bind(supplier.name.trim())
        .bind(non_blank(&supplier.phone))
        .bind(non_blank(&supplier.email))
        .bind(non_blank(&supplier.address))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => {
                    DbError::still_referenced(format!("supplier {id} still supplies products"))
                }
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;

    #[tokio::test]
    async fn test_crud_cycle() {
        let db = test_db().await;
        let repo = db.suppliers();

        let created = repo
            .insert(&NewSupplier {
                name: "Distribuidora Norte".into(),
                phone: Some("022345678".into()),
                email: None,
                address: Some("".into()),
            })
            .await
            .unwrap();
        assert!(created.address.is_none());

        let updated = repo
            .update(
                created.id,
                &NewSupplier {
                    name: "Distribuidora Sur".into(),
                    phone: None,
                    email: Some("ventas@sur.example".into()),
                    address: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Distribuidora Sur");
        assert!(updated.phone.is_none());

        repo.delete(created.id).await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
        assert!(repo.delete(created.id).await.unwrap_err().is_not_found());
    }
}
