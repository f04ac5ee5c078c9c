use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// -- Roles & account status --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Creator,
    Brand,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creator => "creator",
            Self::Brand => "brand",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "creator" => Some(Self::Creator),
            "brand" => Some(Self::Brand),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
    PendingVerification,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
            Self::PendingVerification => "pending_verification",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "suspended" => Some(Self::Suspended),
            "pending_verification" => Some(Self::PendingVerification),
            _ => None,
        }
    }
}

// -- Campaign lifecycle --

/// draft -> published -> in_progress -> completed, with cancelled reachable
/// from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Published,
    InProgress,
    Completed,
    Cancelled,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn can_transition_to(&self, next: CampaignStatus) -> bool {
        match (self, next) {
            (Self::Draft, Self::Published) => true,
            (Self::Published, Self::InProgress) => true,
            (Self::Published | Self::InProgress, Self::Completed) => true,
            (from, Self::Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

// -- Application lifecycle --

/// applied -> under_review -> accepted/rejected, with withdrawn reachable
/// from any non-terminal state by the applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    UnderReview,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::UnderReview => "under_review",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(Self::Applied),
            "under_review" => Some(Self::UnderReview),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "withdrawn" => Some(Self::Withdrawn),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected | Self::Withdrawn)
    }

    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        match (self, next) {
            (Self::Applied, Self::UnderReview) => true,
            (Self::Applied | Self::UnderReview, Self::Accepted | Self::Rejected) => true,
            (from, Self::Withdrawn) => !from.is_terminal(),
            _ => false,
        }
    }
}

// -- Collaboration lifecycle --

/// Strictly sequential forward path with cancelled/disputed escapes.
/// A disputed collaboration only moves again through admin resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationStatus {
    Negotiating,
    Confirmed,
    InProgress,
    ContentSubmitted,
    ContentApproved,
    ContentPublished,
    Completed,
    Cancelled,
    Disputed,
}

impl CollaborationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negotiating => "negotiating",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::ContentSubmitted => "content_submitted",
            Self::ContentApproved => "content_approved",
            Self::ContentPublished => "content_published",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Disputed => "disputed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "negotiating" => Some(Self::Negotiating),
            "confirmed" => Some(Self::Confirmed),
            "in_progress" => Some(Self::InProgress),
            "content_submitted" => Some(Self::ContentSubmitted),
            "content_approved" => Some(Self::ContentApproved),
            "content_published" => Some(Self::ContentPublished),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "disputed" => Some(Self::Disputed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// The single permitted next step on the forward path, if any.
    pub fn next_forward(&self) -> Option<CollaborationStatus> {
        match self {
            Self::Negotiating => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::InProgress),
            Self::InProgress => Some(Self::ContentSubmitted),
            Self::ContentSubmitted => Some(Self::ContentApproved),
            Self::ContentApproved => Some(Self::ContentPublished),
            Self::ContentPublished => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: CollaborationStatus) -> bool {
        if self.next_forward() == Some(next) {
            return true;
        }
        match next {
            // Escapes from any non-terminal state, no self-loops.
            Self::Cancelled | Self::Disputed => !self.is_terminal() && *self != next,
            // Dispute resolution re-enters the forward path.
            Self::InProgress => *self == Self::Disputed,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Released,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Released => "released",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "released" => Some(Self::Released),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApplicationReceived,
    ApplicationStatus,
    CollaborationUpdate,
    NewMessage,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicationReceived => "application_received",
            Self::ApplicationStatus => "application_status",
            Self::CollaborationUpdate => "collaboration_update",
            Self::NewMessage => "new_message",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "application_received" => Some(Self::ApplicationReceived),
            "application_status" => Some(Self::ApplicationStatus),
            "collaboration_update" => Some(Self::CollaborationUpdate),
            "new_message" => Some(Self::NewMessage),
            _ => None,
        }
    }
}

// -- Typed views over JSON columns --

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetAudience {
    pub age_min: Option<u8>,
    pub age_max: Option<u8>,
    pub genders: Vec<String>,
    pub locations: Vec<String>,
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliverable {
    pub platform: String,
    pub content_type: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

/// Audience/engagement numbers per social platform, keyed by platform name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformStat {
    pub handle: Option<String>,
    pub followers: u64,
    pub engagement_rate: Option<f64>,
}

pub type PlatformStats = BTreeMap<String, PlatformStat>;

/// Asking rate per deliverable kind, keyed by e.g. "instagram_post".
pub type RateCard = BTreeMap<String, f64>;

// -- Entities --

/// Canonical account record. Deliberately not serializable: the password
/// hash must never reach a response body, use `api::UserResponse`.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
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
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub title: String,
    pub description: String,
    pub brief: Option<String>,
    pub budget_min: f64,
    pub budget_max: f64,
    pub currency: String,
    pub target_audience: TargetAudience,
    pub platforms: Vec<String>,
    pub deliverables: Vec<Deliverable>,
    pub application_deadline: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: CampaignStatus,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Applications are only taken on a published campaign whose deadline
    /// has not passed.
    pub fn accepts_applications_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CampaignStatus::Published
            && self.application_deadline.is_none_or(|d| now <= d)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub creator_id: Uuid,
    pub message: String,
    pub ask_amount: f64,
    pub currency: String,
    pub proposed_start_date: Option<DateTime<Utc>>,
    pub proposed_end_date: Option<DateTime<Utc>>,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaboration {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub application_id: Uuid,
    pub brand_id: Uuid,
    pub creator_id: Uuid,
    pub status: CollaborationStatus,
    pub agreed_rate: f64,
    pub currency: String,
    pub agreed_deliverables: Vec<Deliverable>,
    pub brand_signed_at: Option<DateTime<Utc>>,
    pub creator_signed_at: Option<DateTime<Utc>>,
    pub content_urls: Vec<String>,
    pub content_submitted_at: Option<DateTime<Utc>>,
    pub content_approved_at: Option<DateTime<Utc>>,
    pub published_urls: Vec<String>,
    pub content_published_at: Option<DateTime<Utc>>,
    pub payment_status: PaymentStatus,
    pub payment_released_at: Option<DateTime<Utc>>,
    pub rating_by_brand: Option<u8>,
    pub feedback_by_brand: Option<String>,
    pub rating_by_creator: Option<u8>,
    pub feedback_by_creator: Option<String>,
    pub status_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Collaboration {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.brand_id == user_id || self.creator_id == user_id
    }

    pub fn both_signed(&self) -> bool {
        self.brand_signed_at.is_some() && self.creator_signed_at.is_some()
    }
}

/// A direct-message thread between exactly two users. Participants are
/// stored in normalized order (user_a < user_b) so a pair maps to one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

impl Conversation {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.user_a == user_id || self.user_b == user_id
    }

    pub fn peer_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user_a == user_id {
            Some(self.user_b)
        } else if self.user_b == user_id {
            Some(self.user_a)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_draft_can_only_publish_or_cancel() {
        let draft = CampaignStatus::Draft;
        assert!(draft.can_transition_to(CampaignStatus::Published));
        assert!(draft.can_transition_to(CampaignStatus::Cancelled));
        assert!(!draft.can_transition_to(CampaignStatus::InProgress));
        assert!(!draft.can_transition_to(CampaignStatus::Completed));
    }

    #[test]
    fn campaign_terminal_states_are_frozen() {
        for terminal in [CampaignStatus::Completed, CampaignStatus::Cancelled] {
            for next in [
                CampaignStatus::Draft,
                CampaignStatus::Published,
                CampaignStatus::InProgress,
                CampaignStatus::Completed,
                CampaignStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next), "{terminal:?} -> {next:?}");
            }
        }
    }

    #[test]
    fn campaign_cannot_return_to_draft() {
        assert!(!CampaignStatus::Published.can_transition_to(CampaignStatus::Draft));
        assert!(!CampaignStatus::InProgress.can_transition_to(CampaignStatus::Draft));
    }

    #[test]
    fn application_review_path() {
        assert!(ApplicationStatus::Applied.can_transition_to(ApplicationStatus::UnderReview));
        assert!(ApplicationStatus::Applied.can_transition_to(ApplicationStatus::Accepted));
        assert!(ApplicationStatus::UnderReview.can_transition_to(ApplicationStatus::Rejected));
        assert!(!ApplicationStatus::UnderReview.can_transition_to(ApplicationStatus::Applied));
        assert!(!ApplicationStatus::Accepted.can_transition_to(ApplicationStatus::Rejected));
    }

    #[test]
    fn application_withdraw_only_from_non_terminal() {
        assert!(ApplicationStatus::Applied.can_transition_to(ApplicationStatus::Withdrawn));
        assert!(ApplicationStatus::UnderReview.can_transition_to(ApplicationStatus::Withdrawn));
        assert!(!ApplicationStatus::Rejected.can_transition_to(ApplicationStatus::Withdrawn));
        assert!(!ApplicationStatus::Withdrawn.can_transition_to(ApplicationStatus::Withdrawn));
    }

    #[test]
    fn collaboration_forward_path_is_strict() {
        let chain = [
            CollaborationStatus::Negotiating,
            CollaborationStatus::Confirmed,
            CollaborationStatus::InProgress,
            CollaborationStatus::ContentSubmitted,
            CollaborationStatus::ContentApproved,
            CollaborationStatus::ContentPublished,
            CollaborationStatus::Completed,
        ];
        for pair in chain.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
        // Skipping a step is never allowed.
        assert!(!CollaborationStatus::Negotiating.can_transition_to(CollaborationStatus::InProgress));
        assert!(!CollaborationStatus::Confirmed.can_transition_to(CollaborationStatus::ContentSubmitted));
        assert!(!CollaborationStatus::InProgress.can_transition_to(CollaborationStatus::ContentApproved));
        assert!(!CollaborationStatus::ContentSubmitted.can_transition_to(CollaborationStatus::Completed));
    }

    #[test]
    fn collaboration_escapes_from_any_non_terminal_state() {
        let non_terminal = [
            CollaborationStatus::Negotiating,
            CollaborationStatus::Confirmed,
            CollaborationStatus::InProgress,
            CollaborationStatus::ContentSubmitted,
            CollaborationStatus::ContentApproved,
            CollaborationStatus::ContentPublished,
        ];
        for state in non_terminal {
            assert!(state.can_transition_to(CollaborationStatus::Cancelled), "{state:?}");
            assert!(state.can_transition_to(CollaborationStatus::Disputed), "{state:?}");
        }
        assert!(!CollaborationStatus::Completed.can_transition_to(CollaborationStatus::Cancelled));
        assert!(!CollaborationStatus::Cancelled.can_transition_to(CollaborationStatus::Disputed));
        assert!(!CollaborationStatus::Disputed.can_transition_to(CollaborationStatus::Disputed));
    }

    #[test]
    fn disputed_resolves_to_in_progress_or_cancelled_only() {
        let disputed = CollaborationStatus::Disputed;
        assert!(disputed.can_transition_to(CollaborationStatus::InProgress));
        assert!(disputed.can_transition_to(CollaborationStatus::Cancelled));
        assert!(!disputed.can_transition_to(CollaborationStatus::Completed));
        assert!(!disputed.can_transition_to(CollaborationStatus::Confirmed));
    }

    #[test]
    fn status_strings_parse_back() {
        for s in [
            CampaignStatus::Draft,
            CampaignStatus::Published,
            CampaignStatus::InProgress,
            CampaignStatus::Completed,
            CampaignStatus::Cancelled,
        ] {
            assert_eq!(CampaignStatus::parse(s.as_str()), Some(s));
        }
        for s in [
            CollaborationStatus::Negotiating,
            CollaborationStatus::ContentSubmitted,
            CollaborationStatus::Disputed,
        ] {
            assert_eq!(CollaborationStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(UserStatus::parse("pending_verification"), Some(UserStatus::PendingVerification));
        assert_eq!(UserRole::parse("superuser"), None);
    }

    #[test]
    fn deadline_gates_applications() {
        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            brand_id: Uuid::new_v4(),
            title: "t".into(),
            description: "d".into(),
            brief: None,
            budget_min: 100.0,
            budget_max: 200.0,
            currency: "USD".into(),
            target_audience: TargetAudience::default(),
            platforms: vec![],
            deliverables: vec![],
            application_deadline: Some(now - chrono::Duration::hours(1)),
            start_date: None,
            end_date: None,
            status: CampaignStatus::Published,
            tags: vec![],
            created_at: now,
            updated_at: now,
        };
        assert!(!campaign.accepts_applications_at(now));

        let open = Campaign { application_deadline: None, ..campaign.clone() };
        assert!(open.accepts_applications_at(now));

        let draft = Campaign { status: CampaignStatus::Draft, application_deadline: None, ..campaign };
        assert!(!draft.accepts_applications_at(now));
    }

    #[test]
    fn conversation_peer_lookup() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let convo = Conversation {
            id: Uuid::new_v4(),
            user_a: a.min(b),
            user_b: a.max(b),
            created_at: Utc::now(),
            last_message_at: Utc::now(),
        };
        assert_eq!(convo.peer_of(a), Some(b));
        assert_eq!(convo.peer_of(b), Some(a));
        assert_eq!(convo.peer_of(Uuid::new_v4()), None);
    }
}
