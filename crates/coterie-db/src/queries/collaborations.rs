use crate::Database;
use crate::models::{CollaborationRow, fmt_ts, to_json};
use crate::queries::OptionalExt;
use anyhow::Result;
use chrono::{DateTime, Utc};
use coterie_types::models::{Collaboration, CollaborationStatus};
use uuid::Uuid;

/// Every transition here is a single guarded UPDATE: the WHERE clause names
/// the exact source state (and any extra preconditions), so a request that
/// lost a race affects zero rows and the caller reports the conflict.
impl Database {
    pub fn get_collaboration(&self, id: Uuid) -> Result<Option<Collaboration>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {COLLABORATION_COLS} FROM collaborations WHERE id = ?1"),
                    [id.to_string()],
                    map_collaboration,
                )
                .optional()?;
            row.map(CollaborationRow::into_collaboration).transpose()
        })
    }

    pub fn list_collaborations_for_user(&self, user_id: Uuid) -> Result<Vec<Collaboration>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLLABORATION_COLS} FROM collaborations
                 WHERE brand_id = ?1 OR creator_id = ?1
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([user_id.to_string()], map_collaboration)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(CollaborationRow::into_collaboration)
                .collect()
        })
    }

    /// Records one party's signature while still negotiating; false when that
    /// party already signed or the row moved on.
    pub fn sign_collaboration(&self, id: Uuid, as_brand: bool, at: DateTime<Utc>) -> Result<bool> {
        let sql = if as_brand {
            "UPDATE collaborations SET brand_signed_at = ?1, updated_at = ?1
             WHERE id = ?2 AND status = 'negotiating' AND brand_signed_at IS NULL"
        } else {
            "UPDATE collaborations SET creator_signed_at = ?1, updated_at = ?1
             WHERE id = ?2 AND status = 'negotiating' AND creator_signed_at IS NULL"
        };
        self.with_conn_mut(|conn| {
            let changed = conn.execute(sql, (fmt_ts(at), id.to_string()))?;
            Ok(changed > 0)
        })
    }

    /// negotiating -> confirmed, only once both signatures are in.
    pub fn confirm_collaboration(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE collaborations SET status = 'confirmed', updated_at = ?1
                 WHERE id = ?2 AND status = 'negotiating'
                   AND brand_signed_at IS NOT NULL AND creator_signed_at IS NOT NULL",
                (fmt_ts(at), id.to_string()),
            )?;
            Ok(changed > 0)
        })
    }

    /// confirmed -> in_progress.
    pub fn start_collaboration(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE collaborations SET status = 'in_progress', updated_at = ?1
                 WHERE id = ?2 AND status = 'confirmed'",
                (fmt_ts(at), id.to_string()),
            )?;
            Ok(changed > 0)
        })
    }

    /// in_progress -> content_submitted, recording the submitted URLs.
    pub fn submit_collaboration_content(
        &self,
        id: Uuid,
        urls: &[String],
        at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE collaborations
                 SET status = 'content_submitted', content_urls = ?1,
                     content_submitted_at = ?2, updated_at = ?2
                 WHERE id = ?3 AND status = 'in_progress'",
                (to_json(&urls)?, fmt_ts(at), id.to_string()),
            )?;
            Ok(changed > 0)
        })
    }

    /// content_submitted -> content_approved.
    pub fn approve_collaboration_content(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE collaborations
                 SET status = 'content_approved', content_approved_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND status = 'content_submitted'",
                (fmt_ts(at), id.to_string()),
            )?;
            Ok(changed > 0)
        })
    }

    /// content_approved -> content_published, recording the live URLs.
    pub fn publish_collaboration_content(
        &self,
        id: Uuid,
        urls: &[String],
        at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE collaborations
                 SET status = 'content_published', published_urls = ?1,
                     content_published_at = ?2, updated_at = ?2
                 WHERE id = ?3 AND status = 'content_approved'",
                (to_json(&urls)?, fmt_ts(at), id.to_string()),
            )?;
            Ok(changed > 0)
        })
    }

    /// content_published -> completed.
    pub fn complete_collaboration(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE collaborations
                 SET status = 'completed', completed_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND status = 'content_published'",
                (fmt_ts(at), id.to_string()),
            )?;
            Ok(changed > 0)
        })
    }

    /// Releases a pending payment once content is published, completing the
    /// collaboration if it was not already completed.
    pub fn release_collaboration_payment(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE collaborations
                 SET payment_status = 'released', payment_released_at = ?1,
                     status = 'completed', completed_at = COALESCE(completed_at, ?1),
                     updated_at = ?1
                 WHERE id = ?2 AND payment_status = 'pending'
                   AND status IN ('content_published', 'completed')",
                (fmt_ts(at), id.to_string()),
            )?;
            Ok(changed > 0)
        })
    }

    /// Escape hatch to cancelled/disputed from any live state, reason required.
    pub fn escape_collaboration(
        &self,
        id: Uuid,
        to: CollaborationStatus,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        debug_assert!(matches!(
            to,
            CollaborationStatus::Cancelled | CollaborationStatus::Disputed
        ));
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE collaborations
                 SET status = ?1, status_reason = ?2, updated_at = ?3
                 WHERE id = ?4 AND status NOT IN ('completed', 'cancelled', 'disputed')",
                rusqlite::params![to.as_str(), reason, fmt_ts(at), id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Admin ruling on a disputed collaboration: back to in_progress or on to
    /// cancelled. A note replaces the dispute reason when given.
    pub fn resolve_collaboration_dispute(
        &self,
        id: Uuid,
        to: CollaborationStatus,
        note: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        debug_assert!(matches!(
            to,
            CollaborationStatus::InProgress | CollaborationStatus::Cancelled
        ));
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE collaborations
                 SET status = ?1, status_reason = COALESCE(?2, status_reason), updated_at = ?3
                 WHERE id = ?4 AND status = 'disputed'",
                rusqlite::params![to.as_str(), note, fmt_ts(at), id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    /// One rating per side, only after completion.
    pub fn rate_collaboration(
        &self,
        id: Uuid,
        as_brand: bool,
        rating: u8,
        feedback: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let sql = if as_brand {
            "UPDATE collaborations
             SET rating_by_brand = ?1, feedback_by_brand = ?2, updated_at = ?3
             WHERE id = ?4 AND status = 'completed' AND rating_by_brand IS NULL"
        } else {
            "UPDATE collaborations
             SET rating_by_creator = ?1, feedback_by_creator = ?2, updated_at = ?3
             WHERE id = ?4 AND status = 'completed' AND rating_by_creator IS NULL"
        };
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                sql,
                rusqlite::params![rating, feedback, fmt_ts(at), id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }
}

const COLLABORATION_COLS: &str = "id, campaign_id, application_id, brand_id, creator_id, \
     status, agreed_rate, currency, agreed_deliverables, brand_signed_at, creator_signed_at, \
     content_urls, content_submitted_at, content_approved_at, published_urls, \
     content_published_at, payment_status, payment_released_at, rating_by_brand, \
     feedback_by_brand, rating_by_creator, feedback_by_creator, status_reason, \
     created_at, updated_at, completed_at";

fn map_collaboration(row: &rusqlite::Row<'_>) -> rusqlite::Result<CollaborationRow> {
    Ok(CollaborationRow {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        application_id: row.get(2)?,
        brand_id: row.get(3)?,
        creator_id: row.get(4)?,
        status: row.get(5)?,
        agreed_rate: row.get(6)?,
        currency: row.get(7)?,
        agreed_deliverables: row.get(8)?,
        brand_signed_at: row.get(9)?,
        creator_signed_at: row.get(10)?,
        content_urls: row.get(11)?,
        content_submitted_at: row.get(12)?,
        content_approved_at: row.get(13)?,
        published_urls: row.get(14)?,
        content_published_at: row.get(15)?,
        payment_status: row.get(16)?,
        payment_released_at: row.get(17)?,
        rating_by_brand: row.get(18)?,
        feedback_by_brand: row.get(19)?,
        rating_by_creator: row.get(20)?,
        feedback_by_creator: row.get(21)?,
        status_reason: row.get(22)?,
        created_at: row.get(23)?,
        updated_at: row.get(24)?,
        completed_at: row.get(25)?,
    })
}
