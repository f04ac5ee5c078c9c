use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ApplicationStatus, CampaignStatus, CollaborationStatus};

/// Events emitted by lifecycle transitions. Consumed by the notification
/// fan-out, which turns each one into rows for the affected users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DomainEvent {
    /// A creator applied to a campaign.
    ApplicationReceived {
        application_id: Uuid,
        campaign_id: Uuid,
        campaign_title: String,
        brand_id: Uuid,
        creator_id: Uuid,
        creator_name: String,
    },

    /// An application moved to a new status (review, accept, reject, withdraw).
    ApplicationStatusChanged {
        application_id: Uuid,
        campaign_id: Uuid,
        campaign_title: String,
        brand_id: Uuid,
        creator_id: Uuid,
        status: ApplicationStatus,
    },

    /// A campaign moved to a new status.
    CampaignStatusChanged {
        campaign_id: Uuid,
        campaign_title: String,
        brand_id: Uuid,
        status: CampaignStatus,
    },

    /// A collaboration moved to a new status or recorded a signature.
    CollaborationUpdated {
        collaboration_id: Uuid,
        campaign_title: String,
        brand_id: Uuid,
        creator_id: Uuid,
        /// The user whose action caused the update.
        actor_id: Uuid,
        status: CollaborationStatus,
        note: Option<String>,
    },

    /// A direct message was sent.
    MessageSent {
        conversation_id: Uuid,
        message_id: Uuid,
        sender_id: Uuid,
        sender_name: String,
        recipient_id: Uuid,
    },
}

impl DomainEvent {
    /// Short tag for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ApplicationReceived { .. } => "application_received",
            Self::ApplicationStatusChanged { .. } => "application_status_changed",
            Self::CampaignStatusChanged { .. } => "campaign_status_changed",
            Self::CollaborationUpdated { .. } => "collaboration_updated",
            Self::MessageSent { .. } => "message_sent",
        }
    }
}
