use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use zapshift_core::repository::UserRepository;
use zapshift_core::{Role, StoreError, StoreResult, User};

use crate::map_sqlx;

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl UserRow {
    fn into_user(self) -> StoreResult<User> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| StoreError::Backend(format!("bad role token: {}", self.role)))?;

        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            role,
            created_at: self.created_at,
        })
    }
}

const SELECT_USER: &str = "SELECT id, name, email, role, created_at FROM users";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, role, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_token())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.map(UserRow::into_user).transpose()
    }

    async fn search(&self, text: Option<&str>) -> StoreResult<Vec<User>> {
        let rows = match text {
            Some(text) => {
                let pattern = format!("%{}%", text);
                sqlx::query_as::<_, UserRow>(&format!(
                    "{SELECT_USER} WHERE name ILIKE $1 OR email ILIKE $1 ORDER BY created_at DESC"
                ))
                .bind(pattern)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} ORDER BY created_at DESC"))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(map_sqlx)?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    async fn set_role(&self, id: Uuid, role: Role) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role.as_token())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    async fn set_role_by_email(&self, email: &str, role: Role) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET role = $1 WHERE email = $2")
            .bind(role.as_token())
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {email}")));
        }
        Ok(())
    }
}
