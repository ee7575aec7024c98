use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{eq, SupabaseClient, SupabaseError};

use crate::models::{NewUser, User};

const TABLE: &str = "users";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn create(&self, user: NewUser) -> Result<User>;
}

pub struct SupabaseUserRepository {
    supabase: SupabaseClient,
}

impl SupabaseUserRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl UserRepository for SupabaseUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        debug!("Looking up user by username");

        let rows: Vec<User> = self.supabase
            .select(TABLE, &[eq("username", username), ("limit".to_string(), "1".to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        debug!("Creating {} user {}", user.role, user.username);

        let rows: Vec<User> = self.supabase.insert(TABLE, json!(user)).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("Failed to create user"))
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.values().find(|u| u.username == username).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(SupabaseError::Conflict(format!("username {} exists", user.username)).into());
        }

        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }
}
