use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{eq, SupabaseClient};

use crate::models::Staff;

const TABLE: &str = "staff";

#[async_trait]
pub trait StaffRepository: Send + Sync {
    async fn get(&self, staff_id: Uuid) -> Result<Option<Staff>>;

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Staff>>;

    /// All staff ordered by (last_name, first_name).
    async fn list(&self) -> Result<Vec<Staff>>;
}

pub struct SupabaseStaffRepository {
    supabase: SupabaseClient,
}

impl SupabaseStaffRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn first(&self, column: &str, value: Uuid) -> Result<Option<Staff>> {
        let rows: Vec<Staff> = self.supabase
            .select(TABLE, &[eq(column, value), ("limit".to_string(), "1".to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl StaffRepository for SupabaseStaffRepository {
    async fn get(&self, staff_id: Uuid) -> Result<Option<Staff>> {
        debug!("Fetching staff profile: {}", staff_id);
        self.first("id", staff_id).await
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Staff>> {
        debug!("Resolving staff profile for user: {}", user_id);
        self.first("user_id", user_id).await
    }

    async fn list(&self) -> Result<Vec<Staff>> {
        self.supabase
            .select(TABLE, &[("order".to_string(), "last_name.asc,first_name.asc".to_string())])
            .await
    }
}

#[derive(Default)]
pub struct InMemoryStaffRepository {
    staff: RwLock<HashMap<Uuid, Staff>>,
}

impl InMemoryStaffRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, staff: Staff) {
        self.staff.write().await.insert(staff.id, staff);
    }
}

#[async_trait]
impl StaffRepository for InMemoryStaffRepository {
    async fn get(&self, staff_id: Uuid) -> Result<Option<Staff>> {
        Ok(self.staff.read().await.get(&staff_id).cloned())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Staff>> {
        Ok(self.staff.read().await.values().find(|s| s.user_id == user_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Staff>> {
        let mut all: Vec<Staff> = self.staff.read().await.values().cloned().collect();
        all.sort_by(|a, b| {
            a.last_name.cmp(&b.last_name).then_with(|| a.first_name.cmp(&b.first_name))
        });
        Ok(all)
    }
}
