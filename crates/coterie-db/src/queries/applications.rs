use crate::Database;
use crate::models::{ApplicationRow, fmt_opt_ts, fmt_ts, to_json};
use crate::queries::OptionalExt;
use anyhow::Result;
use chrono::{DateTime, Utc};
use coterie_types::models::{Application, ApplicationStatus, Collaboration};
use rusqlite::Connection;
use uuid::Uuid;

impl Database {
    /// Inserts unless the creator already holds a live (non-withdrawn)
    /// application for this campaign; returns false in that case. The partial
    /// unique index on (campaign_id, creator_id) backs this up at the schema
    /// level.
    pub fn create_application(&self, application: &Application) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let live: i64 = conn.query_row(
                "SELECT COUNT(*) FROM applications
                 WHERE campaign_id = ?1 AND creator_id = ?2 AND status != 'withdrawn'",
                (
                    application.campaign_id.to_string(),
                    application.creator_id.to_string(),
                ),
                |row| row.get(0),
            )?;
            if live > 0 {
                return Ok(false);
            }
            insert_application(conn, application)?;
            Ok(true)
        })
    }

    pub fn get_application(&self, id: Uuid) -> Result<Option<Application>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {APPLICATION_COLS} FROM applications WHERE id = ?1"),
                    [id.to_string()],
                    map_application,
                )
                .optional()?;
            row.map(ApplicationRow::into_application).transpose()
        })
    }

    pub fn list_applications_for_creator(&self, creator_id: Uuid) -> Result<Vec<Application>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {APPLICATION_COLS} FROM applications
                 WHERE creator_id = ?1 ORDER BY applied_at DESC"
            ))?;
            let rows = stmt
                .query_map([creator_id.to_string()], map_application)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(ApplicationRow::into_application).collect()
        })
    }

    pub fn list_applications_for_campaign(&self, campaign_id: Uuid) -> Result<Vec<Application>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {APPLICATION_COLS} FROM applications
                 WHERE campaign_id = ?1 ORDER BY applied_at DESC"
            ))?;
            let rows = stmt
                .query_map([campaign_id.to_string()], map_application)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(ApplicationRow::into_application).collect()
        })
    }

    pub fn count_applications_for_campaign(&self, campaign_id: Uuid) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM applications WHERE campaign_id = ?1",
                [campaign_id.to_string()],
                |row| row.get(0),
            )?)
        })
    }

    /// Compare-and-swap status transition. `reviewed` stamps the brand's
    /// review time when given (shortlist/accept/reject); withdraw passes None.
    pub fn set_application_status(
        &self,
        id: Uuid,
        from: &[ApplicationStatus],
        to: ApplicationStatus,
        reviewed: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| cas_application_status(conn, id, from, to, reviewed, at))
    }

    /// Acceptance and collaboration creation in one transaction: either the
    /// application flips to `accepted` and the collaboration row exists, or
    /// neither happened.
    pub fn accept_application(
        &self,
        application_id: Uuid,
        collaboration: &Collaboration,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let accepted = cas_application_status(
                &tx,
                application_id,
                &[ApplicationStatus::Applied, ApplicationStatus::UnderReview],
                ApplicationStatus::Accepted,
                Some(at),
                at,
            )?;
            if !accepted {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO collaborations (id, campaign_id, application_id, brand_id,
                                             creator_id, status, agreed_rate, currency,
                                             agreed_deliverables, content_urls, published_urls,
                                             payment_status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                rusqlite::params![
                    collaboration.id.to_string(),
                    collaboration.campaign_id.to_string(),
                    collaboration.application_id.to_string(),
                    collaboration.brand_id.to_string(),
                    collaboration.creator_id.to_string(),
                    collaboration.status.as_str(),
                    collaboration.agreed_rate,
                    collaboration.currency,
                    to_json(&collaboration.agreed_deliverables)?,
                    to_json(&collaboration.content_urls)?,
                    to_json(&collaboration.published_urls)?,
                    collaboration.payment_status.as_str(),
                    fmt_ts(collaboration.created_at),
                    fmt_ts(collaboration.updated_at),
                ],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    /// Creators whose applications are still open on a campaign, for fan-out
    /// when the campaign itself changes state under them.
    pub fn creators_with_open_applications(&self, campaign_id: Uuid) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT creator_id FROM applications
                 WHERE campaign_id = ?1 AND status IN ('applied', 'under_review')",
            )?;
            let rows = stmt
                .query_map([campaign_id.to_string()], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.iter().map(|id| crate::models::parse_id(id)).collect()
        })
    }
}

const APPLICATION_COLS: &str = "id, campaign_id, creator_id, message, ask_amount, currency, \
     proposed_start_date, proposed_end_date, status, applied_at, reviewed_at, updated_at";

fn map_application(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApplicationRow> {
    Ok(ApplicationRow {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        creator_id: row.get(2)?,
        message: row.get(3)?,
        ask_amount: row.get(4)?,
        currency: row.get(5)?,
        proposed_start_date: row.get(6)?,
        proposed_end_date: row.get(7)?,
        status: row.get(8)?,
        applied_at: row.get(9)?,
        reviewed_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn insert_application(conn: &Connection, application: &Application) -> Result<()> {
    conn.execute(
        "INSERT INTO applications (id, campaign_id, creator_id, message, ask_amount,
                                   currency, proposed_start_date, proposed_end_date,
                                   status, applied_at, reviewed_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        rusqlite::params![
            application.id.to_string(),
            application.campaign_id.to_string(),
            application.creator_id.to_string(),
            application.message,
            application.ask_amount,
            application.currency,
            fmt_opt_ts(application.proposed_start_date),
            fmt_opt_ts(application.proposed_end_date),
            application.status.as_str(),
            fmt_ts(application.applied_at),
            fmt_opt_ts(application.reviewed_at),
            fmt_ts(application.updated_at),
        ],
    )?;
    Ok(())
}

fn cas_application_status(
    conn: &Connection,
    id: Uuid,
    from: &[ApplicationStatus],
    to: ApplicationStatus,
    reviewed: Option<DateTime<Utc>>,
    at: DateTime<Utc>,
) -> Result<bool> {
    let mut owned: Vec<Box<dyn rusqlite::types::ToSql>> = vec![
        Box::new(to.as_str()),
        Box::new(fmt_opt_ts(reviewed)),
        Box::new(fmt_ts(at)),
        Box::new(id.to_string()),
    ];
    let mut placeholders = Vec::new();
    for status in from {
        owned.push(Box::new(status.as_str()));
        placeholders.push(format!("?{}", owned.len()));
    }
    let sql = format!(
        "UPDATE applications
         SET status = ?1, reviewed_at = COALESCE(?2, reviewed_at), updated_at = ?3
         WHERE id = ?4 AND status IN ({})",
        placeholders.join(", ")
    );
    let params: Vec<&dyn rusqlite::types::ToSql> = owned.iter().map(|p| p.as_ref()).collect();
    let changed = conn.execute(&sql, params.as_slice())?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::testutil;
    use chrono::Utc;
    use coterie_types::models::{ApplicationStatus, CollaborationStatus, UserRole};
    use uuid::Uuid;

    fn seeded() -> (Database, Uuid, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let brand = testutil::user("brand@example.com", UserRole::Brand);
        db.create_user(&brand, &testutil::profile(brand.id, "Brand"), None)
            .unwrap();
        let creator = testutil::user("creator@example.com", UserRole::Creator);
        db.create_user(&creator, &testutil::profile(creator.id, "Creator"), None)
            .unwrap();
        let campaign = testutil::campaign(brand.id, "Launch");
        db.insert_campaign(&campaign).unwrap();
        (db, campaign.id, creator.id)
    }

    #[test]
    fn one_live_application_per_campaign_and_creator() {
        let (db, campaign_id, creator_id) = seeded();

        assert!(
            db.create_application(&testutil::application(campaign_id, creator_id))
                .unwrap()
        );
        assert!(
            !db.create_application(&testutil::application(campaign_id, creator_id))
                .unwrap()
        );
    }

    #[test]
    fn withdrawing_frees_the_slot_but_rejection_does_not() {
        let (db, campaign_id, creator_id) = seeded();

        let first = testutil::application(campaign_id, creator_id);
        db.create_application(&first).unwrap();
        db.set_application_status(
            first.id,
            &[ApplicationStatus::Applied, ApplicationStatus::UnderReview],
            ApplicationStatus::Withdrawn,
            None,
            Utc::now(),
        )
        .unwrap();

        let second = testutil::application(campaign_id, creator_id);
        assert!(db.create_application(&second).unwrap());

        db.set_application_status(
            second.id,
            &[ApplicationStatus::Applied, ApplicationStatus::UnderReview],
            ApplicationStatus::Rejected,
            Some(Utc::now()),
            Utc::now(),
        )
        .unwrap();
        assert!(
            !db.create_application(&testutil::application(campaign_id, creator_id))
                .unwrap()
        );
    }

    #[test]
    fn status_cas_stamps_review_time() {
        let (db, campaign_id, creator_id) = seeded();
        let application = testutil::application(campaign_id, creator_id);
        db.create_application(&application).unwrap();

        assert!(
            db.set_application_status(
                application.id,
                &[ApplicationStatus::Applied],
                ApplicationStatus::UnderReview,
                Some(Utc::now()),
                Utc::now(),
            )
            .unwrap()
        );
        // Stale source state loses.
        assert!(
            !db.set_application_status(
                application.id,
                &[ApplicationStatus::Applied],
                ApplicationStatus::UnderReview,
                Some(Utc::now()),
                Utc::now(),
            )
            .unwrap()
        );

        let stored = db.get_application(application.id).unwrap().unwrap();
        assert_eq!(stored.status, ApplicationStatus::UnderReview);
        assert!(stored.reviewed_at.is_some());
    }

    #[test]
    fn accept_creates_the_collaboration_atomically() {
        let (db, campaign_id, creator_id) = seeded();
        let application = testutil::application(campaign_id, creator_id);
        db.create_application(&application).unwrap();

        let brand_id = db.get_campaign(campaign_id).unwrap().unwrap().brand_id;
        let collaboration =
            testutil::collaboration(campaign_id, application.id, brand_id, creator_id);

        assert!(
            db.accept_application(application.id, &collaboration, Utc::now())
                .unwrap()
        );
        assert_eq!(
            db.get_application(application.id).unwrap().unwrap().status,
            ApplicationStatus::Accepted
        );
        let stored = db.get_collaboration(collaboration.id).unwrap().unwrap();
        assert_eq!(stored.status, CollaborationStatus::Negotiating);
        assert_eq!(stored.agreed_rate, 750.0);

        // Re-accepting finds no eligible application and writes nothing.
        let runner_up =
            testutil::collaboration(campaign_id, application.id, brand_id, creator_id);
        assert!(
            !db.accept_application(application.id, &runner_up, Utc::now())
                .unwrap()
        );
        assert!(db.get_collaboration(runner_up.id).unwrap().is_none());
    }

    #[test]
    fn open_applicants_feed_campaign_fanout() {
        let (db, campaign_id, creator_id) = seeded();
        let application = testutil::application(campaign_id, creator_id);
        db.create_application(&application).unwrap();

        let open = db.creators_with_open_applications(campaign_id).unwrap();
        assert_eq!(open, vec![creator_id]);

        db.set_application_status(
            application.id,
            &[ApplicationStatus::Applied],
            ApplicationStatus::Withdrawn,
            None,
            Utc::now(),
        )
        .unwrap();
        assert!(
            db.creators_with_open_applications(campaign_id)
                .unwrap()
                .is_empty()
        );
    }
}
