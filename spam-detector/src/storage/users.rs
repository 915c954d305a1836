//! User accounts

use sqlx::SqlitePool;
use tracing::{info, warn};

use super::types::{Role, User};
use crate::error::{Result, SpamError};
use crate::security::{hash_password, verify_password};

type UserRow = (i64, String, String, String, String, String);

fn user_from_row((id, name, email, role, status, created_at): UserRow) -> Result<User> {
    Ok(User {
        id,
        name,
        email,
        role: Role::parse(&role)?,
        status,
        created_at,
    })
}

const USER_COLUMNS: &str = "id, name, email, role, status, created_at";

/// User account store
#[derive(Clone)]
pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create the users table
    pub async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Seed the admin account unless that email already exists
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> Result<()> {
        if self.find_by_email(email).await?.is_some() {
            return Ok(());
        }

        self.create_user(name, email, password, Role::Admin).await?;
        info!("Seeded admin account {}", email);
        Ok(())
    }

    /// Create an account; `Conflict` when the email is taken
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User> {
        if self.find_by_email(email).await?.is_some() {
            return Err(SpamError::Conflict(format!("email {} already registered", email)));
        }

        let password_hash = hash_password(password)?;
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, role, status, created_at)
            VALUES (?, ?, ?, ?, 'active', ?)
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(&password_hash)
        .bind(role.as_str())
        .bind(super::now_timestamp())
        .execute(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                SpamError::Conflict(format!("email {} already registered", email))
            }
            other => SpamError::Database(other),
        })?;

        let id = result.last_insert_rowid();
        info!("User created: {} ({})", email, role.as_str());
        self.find_by_id(id)
            .await?
            .ok_or_else(|| SpamError::NotFound(format!("user {}", id)))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(user_from_row).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        row.map(user_from_row).transpose()
    }

    /// Return the user when email and password match
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, password_hash FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        let Some((id, stored_hash)) = row else {
            warn!("Login failed: no user with email {}", email);
            return Ok(None);
        };

        if !verify_password(password, &stored_hash) {
            warn!("Login failed: invalid password for {}", email);
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    /// All users, newest first
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id DESC",
            USER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(user_from_row).collect()
    }

    /// Delete a non-admin user together with their message history
    pub async fn delete_user(&self, id: i64) -> Result<()> {
        let user = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| SpamError::NotFound(format!("user {}", id)))?;
        if user.is_admin() {
            return Err(SpamError::Forbidden("cannot delete admin users".to_string()));
        }

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM messages WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("User deleted: {}", user.email);
        Ok(())
    }

    /// Set the account status (e.g. "active", "suspended")
    pub async fn update_status(&self, id: i64, status: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SpamError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    pub async fn count_users(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;

        Ok(count.0)
    }
}
