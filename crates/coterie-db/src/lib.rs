pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database with the same pragmas and schema, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&mut conn)
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::Utc;
    use coterie_types::models::*;
    use uuid::Uuid;

    pub fn user(email: &str, role: UserRole) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$c29tZWhhc2g".to_string(),
            role,
            status: UserStatus::Active,
            verified: true,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }

    pub fn profile(user_id: Uuid, display_name: &str) -> Profile {
        Profile {
            user_id,
            display_name: display_name.to_string(),
            bio: None,
            location: None,
            avatar_url: None,
            website_url: None,
            niches: vec![],
            languages: vec![],
            platforms: PlatformStats::new(),
            rate_card: RateCard::new(),
            portfolio_urls: vec![],
            company_name: None,
            industry: None,
            updated_at: Utc::now(),
        }
    }

    pub fn campaign(brand_id: Uuid, title: &str) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: Uuid::new_v4(),
            brand_id,
            title: title.to_string(),
            description: "test campaign".to_string(),
            brief: None,
            budget_min: 500.0,
            budget_max: 2000.0,
            currency: "USD".to_string(),
            target_audience: TargetAudience::default(),
            platforms: vec!["instagram".to_string()],
            deliverables: vec![],
            application_deadline: None,
            start_date: None,
            end_date: None,
            status: CampaignStatus::Draft,
            tags: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn application(campaign_id: Uuid, creator_id: Uuid) -> Application {
        let now = Utc::now();
        Application {
            id: Uuid::new_v4(),
            campaign_id,
            creator_id,
            message: "pick me".to_string(),
            ask_amount: 750.0,
            currency: "USD".to_string(),
            proposed_start_date: None,
            proposed_end_date: None,
            status: ApplicationStatus::Applied,
            applied_at: now,
            reviewed_at: None,
            updated_at: now,
        }
    }

    pub fn collaboration(
        campaign_id: Uuid,
        application_id: Uuid,
        brand_id: Uuid,
        creator_id: Uuid,
    ) -> Collaboration {
        let now = Utc::now();
        Collaboration {
            id: Uuid::new_v4(),
            campaign_id,
            application_id,
            brand_id,
            creator_id,
            status: CollaborationStatus::Negotiating,
            agreed_rate: 750.0,
            currency: "USD".to_string(),
            agreed_deliverables: vec![],
            brand_signed_at: None,
            creator_signed_at: None,
            content_urls: vec![],
            content_submitted_at: None,
            content_approved_at: None,
            published_urls: vec![],
            content_published_at: None,
            payment_status: PaymentStatus::Pending,
            payment_released_at: None,
            rating_by_brand: None,
            feedback_by_brand: None,
            rating_by_creator: None,
            feedback_by_creator: None,
            status_reason: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}
