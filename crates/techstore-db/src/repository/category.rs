//! Product categories.

use sqlx::SqlitePool;

use super::non_blank;
use crate::error::{DbError, DbResult};
use techstore_core::{Category, NewCategory};

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn insert(&self, category: &NewCategory) -> DbResult<Category> {
        let result = sqlx::query("INSERT INTO categories (name, description) VALUES (?1, ?2)")
            .bind(category.name.trim())
            .bind(non_blank(&category.description))
            .execute(&self.pool)
            .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }

    pub async fn update(&self, id: i64, category: &NewCategory) -> DbResult<Category> {
        let result = sqlx::query("UPDATE categories SET name = ?1, description = ?2 WHERE id = ?3")
            .bind(category.name.trim())
            .bind(non_blank(&category.description))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Deletes an empty category. Refused while products still use it.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => {
                    DbError::still_referenced(format!("category {id} still has products"))
                }
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }
        Ok(())
    }
}
