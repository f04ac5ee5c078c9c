//! Turns domain events into notification rows. Runs inside the mutating
//! handler's blocking closure; callers log a failure here and keep the
//! response, since the mutation itself already landed.

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use coterie_db::Database;
use coterie_types::events::DomainEvent;
use coterie_types::models::{ApplicationStatus, CampaignStatus, Notification, NotificationKind};

pub(crate) fn fan_out(db: &Database, event: &DomainEvent) -> Result<()> {
    tracing::debug!(event = event.kind(), "notification fan-out");
    let now = Utc::now();

    let rows = match event {
        DomainEvent::ApplicationReceived {
            application_id,
            campaign_title,
            brand_id,
            creator_name,
            ..
        } => vec![notification(
            *brand_id,
            NotificationKind::ApplicationReceived,
            "New application".to_string(),
            format!("{creator_name} applied to \"{campaign_title}\""),
            "application",
            *application_id,
            now,
        )],

        DomainEvent::ApplicationStatusChanged {
            application_id,
            campaign_title,
            brand_id,
            creator_id,
            status,
            ..
        } => {
            // Withdrawal is the creator acting, so the brand hears about it;
            // every other transition is the brand acting on the creator.
            let row = if *status == ApplicationStatus::Withdrawn {
                notification(
                    *brand_id,
                    NotificationKind::ApplicationStatus,
                    "Application withdrawn".to_string(),
                    format!("An application to \"{campaign_title}\" was withdrawn"),
                    "application",
                    *application_id,
                    now,
                )
            } else {
                notification(
                    *creator_id,
                    NotificationKind::ApplicationStatus,
                    "Application update".to_string(),
                    format!(
                        "Your application to \"{campaign_title}\" is now {}",
                        status.as_str()
                    ),
                    "application",
                    *application_id,
                    now,
                )
            };
            vec![row]
        }

        DomainEvent::CampaignStatusChanged {
            campaign_id,
            campaign_title,
            status,
            ..
        } => match status {
            // Creators with an application still in flight learn that the
            // campaign went away underneath it.
            CampaignStatus::Cancelled | CampaignStatus::Completed => db
                .creators_with_open_applications(*campaign_id)?
                .into_iter()
                .map(|creator_id| {
                    notification(
                        creator_id,
                        NotificationKind::ApplicationStatus,
                        "Campaign update".to_string(),
                        format!("\"{campaign_title}\" is now {}", status.as_str()),
                        "campaign",
                        *campaign_id,
                        now,
                    )
                })
                .collect(),
            _ => Vec::new(),
        },

        DomainEvent::CollaborationUpdated {
            collaboration_id,
            campaign_title,
            brand_id,
            creator_id,
            actor_id,
            status,
            note,
        } => {
            // The counterparty hears about the actor's move; an admin move
            // (dispute resolution) reaches both sides.
            let recipients: Vec<Uuid> = if *actor_id == *brand_id {
                vec![*creator_id]
            } else if *actor_id == *creator_id {
                vec![*brand_id]
            } else {
                vec![*brand_id, *creator_id]
            };
            let mut body = format!(
                "Collaboration on \"{campaign_title}\" is now {}",
                status.as_str()
            );
            if let Some(note) = note {
                body.push_str(": ");
                body.push_str(note);
            }
            recipients
                .into_iter()
                .map(|recipient| {
                    notification(
                        recipient,
                        NotificationKind::CollaborationUpdate,
                        "Collaboration update".to_string(),
                        body.clone(),
                        "collaboration",
                        *collaboration_id,
                        now,
                    )
                })
                .collect()
        }

        DomainEvent::MessageSent {
            conversation_id,
            sender_name,
            recipient_id,
            ..
        } => vec![notification(
            *recipient_id,
            NotificationKind::NewMessage,
            "New message".to_string(),
            format!("{sender_name} sent you a message"),
            "conversation",
            *conversation_id,
            now,
        )],
    };

    db.insert_notifications(&rows)
}

fn notification(
    user_id: Uuid,
    kind: NotificationKind,
    title: String,
    body: String,
    entity_type: &str,
    entity_id: Uuid,
    at: DateTime<Utc>,
) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        user_id,
        kind,
        title,
        body,
        entity_type: Some(entity_type.to_string()),
        entity_id: Some(entity_id),
        is_read: false,
        created_at: at,
    }
}
