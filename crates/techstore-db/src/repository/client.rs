//! # Client Repository
//!
//! Customers that sales are registered against. `document` is the national
//! ID / tax number printed on invoices; it is optional and not unique.

use sqlx::SqlitePool;
use tracing::debug;

use super::non_blank;
use crate::error::{DbError, DbResult};
use techstore_core::{Client, NewClient};

const CLIENT_COLUMNS: &str = "id, first_name, last_name, document, phone, address, email";

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    /// Finds the first client carrying the given document number.
    pub async fn find_by_document(&self, document: &str) -> DbResult<Option<Client>> {
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE document = ?1 ORDER BY id LIMIT 1"
        );
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(document.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    /// Lists clients ordered by last name, then first name.
    pub async fn list(&self) -> DbResult<Vec<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY last_name, first_name, id");
        let clients = sqlx::query_as::<_, Client>(&sql).fetch_all(&self.pool).await?;

        Ok(clients)
    }

    pub async fn insert(&self, client: &NewClient) -> DbResult<Client> {
        debug!(first_name = %client.first_name, "Inserting client");

        let result = sqlx::query(
            r#"
            INSERT INTO clients (first_name, last_name, document, phone, address, email)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(client.first_name.trim())
        .bind(client.last_name.trim())
        .bind(non_blank(&client.document))
        .bind(non_blank(&client.phone))
        .bind(non_blank(&client.address))
        .bind(non_blank(&client.email))
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", id))
    }

    pub async fn update(&self, id: i64, client: &NewClient) -> DbResult<Client> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET first_name = ?1, last_name = ?2, document = ?3,
                phone = ?4, address = ?5, email = ?6
            WHERE id = ?7
            "#,
        )
        .bind(client.first_name.trim())
        .bind(client.last_name.trim())
        .bind(non_blank(&client.document))
        .bind(non_blank(&client.phone))
        .bind(non_blank(&client.address))
        .bind(non_blank(&client.email))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", id))
    }

    /// Deletes a client with no sales.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM clients WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => {
                    DbError::still_referenced(format!("client {id} has registered sales"))
                }
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;

    fn sample() -> NewClient {
        NewClient {
            first_name: "Carla".into(),
            last_name: "Gomez".into(),
            document: Some("0912345678".into()),
            phone: Some("  ".into()),
            address: None,
            email: Some("carla@example.com".into()),
        }
    }

    #[tokio::test]
    async fn test_crud_cycle() {
        let db = test_db().await;
        let repo = db.clients();

        let created = repo.insert(&sample()).await.unwrap();
        assert_eq!(created.full_name(), "Carla Gomez");
        // Blank phone stored as NULL
        assert!(created.phone.is_none());

        let mut changes = sample();
        changes.last_name = "Gomez Ruiz".into();
        let updated = repo.update(created.id, &changes).await.unwrap();
        assert_eq!(updated.last_name, "Gomez Ruiz");

        assert_eq!(repo.list().await.unwrap().len(), 1);

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_document() {
        let db = test_db().await;
        let repo = db.clients();

        let created = repo.insert(&sample()).await.unwrap();
        let found = repo.find_by_document(" 0912345678 ").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(repo.find_by_document("000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = test_db().await;
        let err = db.clients().update(77, &sample()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
