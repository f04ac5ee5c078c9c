use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Campaign, Deliverable, PlatformStats, Profile, RateCard, TargetAudience, User, UserRole,
    UserStatus,
};

/// Hard cap on page size for every list endpoint.
pub const MAX_PAGE_SIZE: u32 = 100;

pub fn default_limit() -> u32 {
    20
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            status: user.status,
            verified: user.verified,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub profile: Profile,
}

/// What other users get to see: no email, no account internals.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicUserResponse {
    pub id: Uuid,
    pub role: UserRole,
    pub display_name: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub website_url: Option<String>,
    pub niches: Vec<String>,
    pub languages: Vec<String>,
    pub platforms: PlatformStats,
    pub rate_card: RateCard,
    pub portfolio_urls: Vec<String>,
    pub company_name: Option<String>,
    pub industry: Option<String>,
}

impl PublicUserResponse {
    pub fn from_parts(user: &User, profile: Profile) -> Self {
        Self {
            id: user.id,
            role: user.role,
            display_name: profile.display_name,
            bio: profile.bio,
            location: profile.location,
            avatar_url: profile.avatar_url,
            website_url: profile.website_url,
            niches: profile.niches,
            languages: profile.languages,
            platforms: profile.platforms,
            rate_card: profile.rate_card,
            portfolio_urls: profile.portfolio_urls,
            company_name: profile.company_name,
            industry: profile.industry,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub website_url: Option<String>,
    pub niches: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub platforms: Option<PlatformStats>,
    pub rate_card: Option<RateCard>,
    pub portfolio_urls: Option<Vec<String>>,
    pub company_name: Option<String>,
    pub industry: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    pub q: Option<String>,
    pub role: Option<UserRole>,
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct AdminUserListQuery {
    pub status: Option<UserStatus>,
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetUserStatusRequest {
    pub status: UserStatus,
}

// -- Campaigns --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCampaignRequest {
    pub title: String,
    pub description: String,
    pub brief: Option<String>,
    pub budget_min: f64,
    pub budget_max: f64,
    pub currency: Option<String>,
    pub target_audience: Option<TargetAudience>,
    pub platforms: Option<Vec<String>>,
    pub deliverables: Option<Vec<Deliverable>>,
    pub application_deadline: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCampaignRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub brief: Option<String>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub currency: Option<String>,
    pub target_audience: Option<TargetAudience>,
    pub platforms: Option<Vec<String>>,
    pub deliverables: Option<Vec<Deliverable>>,
    pub application_deadline: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CampaignListQuery {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub status: Option<crate::models::CampaignStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CampaignListResponse {
    pub campaigns: Vec<Campaign>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
    pub has_next: bool,
}

impl CampaignListResponse {
    // skip comes straight off the query string, so the page math has to
    // stay defined for any u32 instead of wrapping.
    pub fn new(campaigns: Vec<Campaign>, total: i64, skip: u32, limit: u32) -> Self {
        Self {
            campaigns,
            total,
            page: (skip / limit.max(1)).saturating_add(1),
            size: limit,
            has_next: i64::from(skip) + i64::from(limit) < total,
        }
    }
}

// -- Applications --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyRequest {
    pub message: String,
    pub ask_amount: f64,
    pub currency: Option<String>,
    pub proposed_start_date: Option<DateTime<Utc>>,
    pub proposed_end_date: Option<DateTime<Utc>>,
}

// -- Collaborations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitContentRequest {
    pub content_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishContentRequest {
    pub published_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReasonRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateRequest {
    pub rating: u8,
    pub feedback: Option<String>,
}

/// Admin verdict on a disputed collaboration: resume work or call it off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeResolution {
    Resume,
    Cancel,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveDisputeRequest {
    pub resolution: DisputeResolution,
    pub note: Option<String>,
}

// -- Messaging --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenConversationRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub body: String,
}

// -- Notifications --

#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

// -- Shared --

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_list_envelope_math() {
        let empty = CampaignListResponse::new(vec![], 0, 0, 20);
        assert_eq!(empty.total, 0);
        assert_eq!(empty.page, 1);
        assert_eq!(empty.size, 20);
        assert!(!empty.has_next);

        let mid = CampaignListResponse::new(vec![], 45, 20, 20);
        assert_eq!(mid.page, 2);
        assert!(mid.has_next);

        let last = CampaignListResponse::new(vec![], 45, 40, 20);
        assert_eq!(last.page, 3);
        assert!(!last.has_next);
    }

    #[test]
    fn envelope_math_holds_at_extreme_skip() {
        // Any u32 deserializes off the query string; the far end of the
        // range must produce an empty page, not a panic.
        let far = CampaignListResponse::new(vec![], 10, u32::MAX, 20);
        assert_eq!(far.page, u32::MAX / 20 + 1);
        assert!(!far.has_next);

        let edge = CampaignListResponse::new(vec![], 10, u32::MAX, 1);
        assert_eq!(edge.page, u32::MAX);
        assert!(!edge.has_next);

        let zero_limit = CampaignListResponse::new(vec![], 10, 0, 0);
        assert_eq!(zero_limit.page, 1);
        assert!(zero_limit.has_next);
    }

    #[test]
    fn signup_request_rejects_unknown_fields() {
        let err = serde_json::from_str::<SignupRequest>(
            r#"{"email":"a@b.c","password":"longenough","role":"creator","display_name":"A","is_admin":true}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn role_deserializes_from_snake_case() {
        let req: SignupRequest = serde_json::from_str(
            r#"{"email":"a@b.c","password":"longenough","role":"brand","display_name":"A"}"#,
        )
        .unwrap();
        assert_eq!(req.role, UserRole::Brand);
    }
}
