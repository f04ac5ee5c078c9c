use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                  TEXT PRIMARY KEY,
            email               TEXT NOT NULL UNIQUE,
            password_hash       TEXT NOT NULL,
            role                TEXT NOT NULL,
            status              TEXT NOT NULL,
            verified            INTEGER NOT NULL DEFAULT 0,
            verification_token  TEXT,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL,
            last_login          TEXT
        );

        CREATE TABLE IF NOT EXISTS profiles (
            user_id         TEXT PRIMARY KEY REFERENCES users(id),
            display_name    TEXT NOT NULL,
            bio             TEXT,
            location        TEXT,
            avatar_url      TEXT,
            website_url     TEXT,
            niches          TEXT NOT NULL DEFAULT '[]',
            languages       TEXT NOT NULL DEFAULT '[]',
            platforms       TEXT NOT NULL DEFAULT '{}',
            rate_card       TEXT NOT NULL DEFAULT '{}',
            portfolio_urls  TEXT NOT NULL DEFAULT '[]',
            company_name    TEXT,
            industry        TEXT,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS campaigns (
            id                    TEXT PRIMARY KEY,
            brand_id              TEXT NOT NULL REFERENCES users(id),
            title                 TEXT NOT NULL,
            description           TEXT NOT NULL,
            brief                 TEXT,
            budget_min            REAL NOT NULL,
            budget_max            REAL NOT NULL,
            currency              TEXT NOT NULL,
            target_audience       TEXT NOT NULL DEFAULT '{}',
            platforms             TEXT NOT NULL DEFAULT '[]',
            deliverables          TEXT NOT NULL DEFAULT '[]',
            application_deadline  TEXT,
            start_date            TEXT,
            end_date              TEXT,
            status                TEXT NOT NULL,
            tags                  TEXT NOT NULL DEFAULT '[]',
            created_at            TEXT NOT NULL,
            updated_at            TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_campaigns_brand
            ON campaigns(brand_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_campaigns_status
            ON campaigns(status, created_at);

        CREATE TABLE IF NOT EXISTS applications (
            id                   TEXT PRIMARY KEY,
            campaign_id          TEXT NOT NULL REFERENCES campaigns(id),
            creator_id           TEXT NOT NULL REFERENCES users(id),
            message              TEXT NOT NULL,
            ask_amount           REAL NOT NULL,
            currency             TEXT NOT NULL,
            proposed_start_date  TEXT,
            proposed_end_date    TEXT,
            status               TEXT NOT NULL,
            applied_at           TEXT NOT NULL,
            reviewed_at          TEXT,
            updated_at           TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_applications_campaign
            ON applications(campaign_id, applied_at);
        CREATE INDEX IF NOT EXISTS idx_applications_creator
            ON applications(creator_id, applied_at);

        -- One live application per campaign/creator pair; withdrawing
        -- frees the slot, rejection does not.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_applications_live
            ON applications(campaign_id, creator_id)
            WHERE status != 'withdrawn';

        CREATE TABLE IF NOT EXISTS collaborations (
            id                    TEXT PRIMARY KEY,
            campaign_id           TEXT NOT NULL REFERENCES campaigns(id),
            application_id        TEXT NOT NULL UNIQUE REFERENCES applications(id),
            brand_id              TEXT NOT NULL REFERENCES users(id),
            creator_id            TEXT NOT NULL REFERENCES users(id),
            status                TEXT NOT NULL,
            agreed_rate           REAL NOT NULL,
            currency              TEXT NOT NULL,
            agreed_deliverables   TEXT NOT NULL DEFAULT '[]',
            brand_signed_at       TEXT,
            creator_signed_at     TEXT,
            content_urls          TEXT NOT NULL DEFAULT '[]',
            content_submitted_at  TEXT,
            content_approved_at   TEXT,
            published_urls        TEXT NOT NULL DEFAULT '[]',
            content_published_at  TEXT,
            payment_status        TEXT NOT NULL,
            payment_released_at   TEXT,
            rating_by_brand       INTEGER,
            feedback_by_brand     TEXT,
            rating_by_creator     INTEGER,
            feedback_by_creator   TEXT,
            status_reason         TEXT,
            created_at            TEXT NOT NULL,
            updated_at            TEXT NOT NULL,
            completed_at          TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_collaborations_brand
            ON collaborations(brand_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_collaborations_creator
            ON collaborations(creator_id, created_at);

        CREATE TABLE IF NOT EXISTS conversations (
            id               TEXT PRIMARY KEY,
            user_a           TEXT NOT NULL REFERENCES users(id),
            user_b           TEXT NOT NULL REFERENCES users(id),
            created_at       TEXT NOT NULL,
            last_message_at  TEXT NOT NULL,
            UNIQUE(user_a, user_b)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id               TEXT PRIMARY KEY,
            conversation_id  TEXT NOT NULL REFERENCES conversations(id),
            sender_id        TEXT NOT NULL REFERENCES users(id),
            body             TEXT NOT NULL,
            is_read          INTEGER NOT NULL DEFAULT 0,
            read_at          TEXT,
            created_at       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, created_at);

        CREATE TABLE IF NOT EXISTS notifications (
            id           TEXT PRIMARY KEY,
            user_id      TEXT NOT NULL REFERENCES users(id),
            kind         TEXT NOT NULL,
            title        TEXT NOT NULL,
            body         TEXT NOT NULL,
            entity_type  TEXT,
            entity_id    TEXT,
            is_read      INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
