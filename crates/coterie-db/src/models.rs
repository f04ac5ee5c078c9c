//! Database row types — these map 1:1 to SQLite rows. Ids, timestamps and
//! JSON columns are stored as TEXT; the `into_*` conversions parse them into
//! `coterie-types` domain values in one place so handlers never touch raw
//! column strings.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use coterie_types::models::{
    Application, ApplicationStatus, Campaign, CampaignStatus, Collaboration, CollaborationStatus,
    Conversation, Message, Notification, NotificationKind, PaymentStatus, Profile, User, UserRole,
    UserStatus,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

// -- Column encoding helpers --

/// Fixed-width RFC 3339 (microseconds, Z suffix) so lexicographic ORDER BY
/// over timestamp columns matches chronological order.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn fmt_opt_ts(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(fmt_ts)
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = raw.parse::<DateTime<Utc>>() {
        return Ok(ts);
    }
    // SQLite's own datetime('now') format, in case a row was touched by hand.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .with_context(|| format!("unparseable timestamp column: {raw:?}"))
}

pub(crate) fn parse_opt_ts(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_ts).transpose()
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("unparseable id column: {raw:?}"))
}

pub(crate) fn parse_opt_id(raw: Option<String>) -> Result<Option<Uuid>> {
    raw.as_deref().map(parse_id).transpose()
}

pub(crate) fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("unparseable JSON column: {raw:?}"))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("serializing JSON column")
}

// -- Rows --

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub status: String,
    pub verified: bool,
    pub verification_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub last_login: Option<String>,
}

impl UserRow {
    /// The verification token stays in the DB layer; the domain `User`
    /// deliberately has no field for it.
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_id(&self.id)?,
            role: UserRole::parse(&self.role)
                .ok_or_else(|| anyhow!("unknown user role '{}'", self.role))?,
            status: UserStatus::parse(&self.status)
                .ok_or_else(|| anyhow!("unknown user status '{}'", self.status))?,
            verified: self.verified,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            last_login: parse_opt_ts(self.last_login)?,
            email: self.email,
            password_hash: self.password_hash,
        })
    }
}

pub struct ProfileRow {
    pub user_id: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub website_url: Option<String>,
    pub niches: String,
    pub languages: String,
    pub platforms: String,
    pub rate_card: String,
    pub portfolio_urls: String,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub updated_at: String,
}

impl ProfileRow {
    pub fn into_profile(self) -> Result<Profile> {
        Ok(Profile {
            user_id: parse_id(&self.user_id)?,
            display_name: self.display_name,
            bio: self.bio,
            location: self.location,
            avatar_url: self.avatar_url,
            website_url: self.website_url,
            niches: parse_json(&self.niches)?,
            languages: parse_json(&self.languages)?,
            platforms: parse_json(&self.platforms)?,
            rate_card: parse_json(&self.rate_card)?,
            portfolio_urls: parse_json(&self.portfolio_urls)?,
            company_name: self.company_name,
            industry: self.industry,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

pub struct CampaignRow {
    pub id: String,
    pub brand_id: String,
    pub title: String,
    pub description: String,
    pub brief: Option<String>,
    pub budget_min: f64,
    pub budget_max: f64,
    pub currency: String,
    pub target_audience: String,
    pub platforms: String,
    pub deliverables: String,
    pub application_deadline: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: String,
    pub tags: String,
    pub created_at: String,
    pub updated_at: String,
}

impl CampaignRow {
    pub fn into_campaign(self) -> Result<Campaign> {
        Ok(Campaign {
            id: parse_id(&self.id)?,
            brand_id: parse_id(&self.brand_id)?,
            title: self.title,
            description: self.description,
            brief: self.brief,
            budget_min: self.budget_min,
            budget_max: self.budget_max,
            currency: self.currency,
            target_audience: parse_json(&self.target_audience)?,
            platforms: parse_json(&self.platforms)?,
            deliverables: parse_json(&self.deliverables)?,
            application_deadline: parse_opt_ts(self.application_deadline)?,
            start_date: parse_opt_ts(self.start_date)?,
            end_date: parse_opt_ts(self.end_date)?,
            status: CampaignStatus::parse(&self.status)
                .ok_or_else(|| anyhow!("unknown campaign status '{}'", self.status))?,
            tags: parse_json(&self.tags)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

pub struct ApplicationRow {
    pub id: String,
    pub campaign_id: String,
    pub creator_id: String,
    pub message: String,
    pub ask_amount: f64,
    pub currency: String,
    pub proposed_start_date: Option<String>,
    pub proposed_end_date: Option<String>,
    pub status: String,
    pub applied_at: String,
    pub reviewed_at: Option<String>,
    pub updated_at: String,
}

impl ApplicationRow {
    pub fn into_application(self) -> Result<Application> {
        Ok(Application {
            id: parse_id(&self.id)?,
            campaign_id: parse_id(&self.campaign_id)?,
            creator_id: parse_id(&self.creator_id)?,
            message: self.message,
            ask_amount: self.ask_amount,
            currency: self.currency,
            proposed_start_date: parse_opt_ts(self.proposed_start_date)?,
            proposed_end_date: parse_opt_ts(self.proposed_end_date)?,
            status: ApplicationStatus::parse(&self.status)
                .ok_or_else(|| anyhow!("unknown application status '{}'", self.status))?,
            applied_at: parse_ts(&self.applied_at)?,
            reviewed_at: parse_opt_ts(self.reviewed_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

pub struct CollaborationRow {
    pub id: String,
    pub campaign_id: String,
    pub application_id: String,
    pub brand_id: String,
    pub creator_id: String,
    pub status: String,
    pub agreed_rate: f64,
    pub currency: String,
    pub agreed_deliverables: String,
    pub brand_signed_at: Option<String>,
    pub creator_signed_at: Option<String>,
    pub content_urls: String,
    pub content_submitted_at: Option<String>,
    pub content_approved_at: Option<String>,
    pub published_urls: String,
    pub content_published_at: Option<String>,
    pub payment_status: String,
    pub payment_released_at: Option<String>,
    pub rating_by_brand: Option<i64>,
    pub feedback_by_brand: Option<String>,
    pub rating_by_creator: Option<i64>,
    pub feedback_by_creator: Option<String>,
    pub status_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

impl CollaborationRow {
    pub fn into_collaboration(self) -> Result<Collaboration> {
        Ok(Collaboration {
            id: parse_id(&self.id)?,
            campaign_id: parse_id(&self.campaign_id)?,
            application_id: parse_id(&self.application_id)?,
            brand_id: parse_id(&self.brand_id)?,
            creator_id: parse_id(&self.creator_id)?,
            status: CollaborationStatus::parse(&self.status)
                .ok_or_else(|| anyhow!("unknown collaboration status '{}'", self.status))?,
            agreed_rate: self.agreed_rate,
            currency: self.currency,
            agreed_deliverables: parse_json(&self.agreed_deliverables)?,
            brand_signed_at: parse_opt_ts(self.brand_signed_at)?,
            creator_signed_at: parse_opt_ts(self.creator_signed_at)?,
            content_urls: parse_json(&self.content_urls)?,
            content_submitted_at: parse_opt_ts(self.content_submitted_at)?,
            content_approved_at: parse_opt_ts(self.content_approved_at)?,
            published_urls: parse_json(&self.published_urls)?,
            content_published_at: parse_opt_ts(self.content_published_at)?,
            payment_status: PaymentStatus::parse(&self.payment_status)
                .ok_or_else(|| anyhow!("unknown payment status '{}'", self.payment_status))?,
            payment_released_at: parse_opt_ts(self.payment_released_at)?,
            rating_by_brand: self.rating_by_brand.map(u8::try_from).transpose()?,
            feedback_by_brand: self.feedback_by_brand,
            rating_by_creator: self.rating_by_creator.map(u8::try_from).transpose()?,
            feedback_by_creator: self.feedback_by_creator,
            status_reason: self.status_reason,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            completed_at: parse_opt_ts(self.completed_at)?,
        })
    }
}

pub struct ConversationRow {
    pub id: String,
    pub user_a: String,
    pub user_b: String,
    pub created_at: String,
    pub last_message_at: String,
}

impl ConversationRow {
    pub fn into_conversation(self) -> Result<Conversation> {
        Ok(Conversation {
            id: parse_id(&self.id)?,
            user_a: parse_id(&self.user_a)?,
            user_b: parse_id(&self.user_b)?,
            created_at: parse_ts(&self.created_at)?,
            last_message_at: parse_ts(&self.last_message_at)?,
        })
    }
}

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub body: String,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub created_at: String,
}

impl MessageRow {
    pub fn into_message(self) -> Result<Message> {
        Ok(Message {
            id: parse_id(&self.id)?,
            conversation_id: parse_id(&self.conversation_id)?,
            sender_id: parse_id(&self.sender_id)?,
            body: self.body,
            is_read: self.is_read,
            read_at: parse_opt_ts(self.read_at)?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

impl NotificationRow {
    pub fn into_notification(self) -> Result<Notification> {
        Ok(Notification {
            id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            kind: NotificationKind::parse(&self.kind)
                .ok_or_else(|| anyhow!("unknown notification kind '{}'", self.kind))?,
            title: self.title,
            body: self.body,
            entity_type: self.entity_type,
            entity_id: parse_opt_id(self.entity_id)?,
            is_read: self.is_read,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_round_trip_keeps_microseconds() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
            + chrono::Duration::microseconds(589_793);
        assert_eq!(parse_ts(&fmt_ts(ts)).unwrap(), ts);
    }

    #[test]
    fn parses_sqlite_datetime_fallback() {
        let ts = parse_ts("2025-03-14 09:26:53").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap());
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(parse_ts("not a timestamp").is_err());
    }

    #[test]
    fn fixed_width_timestamps_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
            + chrono::Duration::microseconds(500_000);
        let late = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
            + chrono::Duration::microseconds(1_500_000);
        assert!(fmt_ts(early) < fmt_ts(late));
    }
}
