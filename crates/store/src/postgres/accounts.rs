use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::UserId;
use domain::{Profile, Role, Session, User};
use sqlx::{Row, postgres::PgRow};
use uuid::Uuid;

use super::{PostgresStore, map_unique_violation, parse_column};
use crate::{AccountStore, Result, StoreError};

const USER_COLUMNS: &str = "id, email, full_name, password_hash, role, is_active, date_joined";

const PROFILE_COLUMNS: &str = "user_id, phone_number, is_approved, created_at";

fn row_to_user(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        password_hash: row.try_get("password_hash")?,
        role: parse_column(&role)?,
        is_active: row.try_get("is_active")?,
        date_joined: row.try_get("date_joined")?,
    })
}

fn row_to_profile(row: &PgRow) -> Result<Profile> {
    Ok(Profile {
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        phone_number: row.try_get("phone_number")?,
        is_approved: row.try_get("is_approved")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl AccountStore for PostgresStore {
    async fn insert_user(&self, user: User, profile: Profile) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, full_name, password_hash, role, is_active, date_joined)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.date_joined)
        .execute(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, phone_number, is_approved, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&profile.phone_number)
        .bind(profile.is_approved)
        .bind(profile.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("User", id))?;
        row_to_user(&row)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY date_joined DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_user).collect()
    }

    async fn users_with_roles(&self, roles: &[Role]) -> Result<Vec<User>> {
        let roles: Vec<&str> = roles.iter().map(Role::as_str).collect();
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_active AND role = ANY($1) \
             ORDER BY date_joined DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(&roles)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_user).collect()
    }

    async fn update_user(&self, user: User) -> Result<User> {
        let result = sqlx::query(
            r#"
            UPDATE users SET email = $2, full_name = $3, password_hash = $4, role = $5,
                is_active = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("User", user.id));
        }
        Ok(user)
    }

    async fn delete_user(&self, id: UserId) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("User", id));
        }
        Ok(())
    }

    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1");
        let row = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_profile).transpose()
    }

    async fn list_profiles(&self, pending_only: bool) -> Result<Vec<Profile>> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE (NOT $1 OR NOT is_approved) \
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(pending_only)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_profile).collect()
    }

    async fn save_profile(&self, profile: Profile) -> Result<Profile> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, phone_number, is_approved, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                phone_number = EXCLUDED.phone_number,
                is_approved = EXCLUDED.is_approved
            "#,
        )
        .bind(profile.user_id.as_uuid())
        .bind(&profile.phone_number)
        .bind(profile.is_approved)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return StoreError::not_found("User", profile.user_id);
            }
            map_unique_violation(e)
        })?;
        Ok(profile)
    }

    async fn create_session(&self, session: Session) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&session.token)
        .bind(session.user_id.as_uuid())
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn resolve_session(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.email, u.full_name, u.password_hash, u.role, u.is_active, u.date_joined
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expires_at > $2
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
