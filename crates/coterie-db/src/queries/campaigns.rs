use crate::Database;
use crate::models::{CampaignRow, fmt_opt_ts, fmt_ts, to_json};
use crate::queries::OptionalExt;
use anyhow::Result;
use chrono::{DateTime, Utc};
use coterie_types::models::{Campaign, CampaignStatus};
use uuid::Uuid;

impl Database {
    pub fn insert_campaign(&self, campaign: &Campaign) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO campaigns (id, brand_id, title, description, brief,
                                        budget_min, budget_max, currency, target_audience,
                                        platforms, deliverables, application_deadline,
                                        start_date, end_date, status, tags,
                                        created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                rusqlite::params![
                    campaign.id.to_string(),
                    campaign.brand_id.to_string(),
                    campaign.title,
                    campaign.description,
                    campaign.brief,
                    campaign.budget_min,
                    campaign.budget_max,
                    campaign.currency,
                    to_json(&campaign.target_audience)?,
                    to_json(&campaign.platforms)?,
                    to_json(&campaign.deliverables)?,
                    fmt_opt_ts(campaign.application_deadline),
                    fmt_opt_ts(campaign.start_date),
                    fmt_opt_ts(campaign.end_date),
                    campaign.status.as_str(),
                    to_json(&campaign.tags)?,
                    fmt_ts(campaign.created_at),
                    fmt_ts(campaign.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {CAMPAIGN_COLS} FROM campaigns WHERE id = ?1"),
                    [id.to_string()],
                    map_campaign,
                )
                .optional()?;
            row.map(CampaignRow::into_campaign).transpose()
        })
    }

    /// Full-field update of an owner-editable campaign. Compare-and-swap on
    /// the status the caller loaded, so a concurrent transition wins cleanly.
    pub fn update_campaign(&self, campaign: &Campaign, expected: CampaignStatus) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE campaigns
                 SET title = ?1, description = ?2, brief = ?3, budget_min = ?4,
                     budget_max = ?5, currency = ?6, target_audience = ?7, platforms = ?8,
                     deliverables = ?9, application_deadline = ?10, start_date = ?11,
                     end_date = ?12, tags = ?13, updated_at = ?14
                 WHERE id = ?15 AND status = ?16",
                rusqlite::params![
                    campaign.title,
                    campaign.description,
                    campaign.brief,
                    campaign.budget_min,
                    campaign.budget_max,
                    campaign.currency,
                    to_json(&campaign.target_audience)?,
                    to_json(&campaign.platforms)?,
                    to_json(&campaign.deliverables)?,
                    fmt_opt_ts(campaign.application_deadline),
                    fmt_opt_ts(campaign.start_date),
                    fmt_opt_ts(campaign.end_date),
                    to_json(&campaign.tags)?,
                    fmt_ts(campaign.updated_at),
                    campaign.id.to_string(),
                    expected.as_str(),
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Compare-and-swap status transition; returns false when the row is no
    /// longer in any of the allowed source states.
    pub fn set_campaign_status(
        &self,
        id: Uuid,
        from: &[CampaignStatus],
        to: CampaignStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let mut owned: Vec<Box<dyn rusqlite::types::ToSql>> = vec![
                Box::new(to.as_str()),
                Box::new(fmt_ts(at)),
                Box::new(id.to_string()),
            ];
            let mut placeholders = Vec::new();
            for status in from {
                owned.push(Box::new(status.as_str()));
                placeholders.push(format!("?{}", owned.len()));
            }
            let sql = format!(
                "UPDATE campaigns SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND status IN ({})",
                placeholders.join(", ")
            );
            let params: Vec<&dyn rusqlite::types::ToSql> =
                owned.iter().map(|p| p.as_ref()).collect();
            let changed = conn.execute(&sql, params.as_slice())?;
            Ok(changed > 0)
        })
    }

    /// Deletes only while still a draft nobody has applied to.
    pub fn delete_draft_campaign(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM campaigns
                 WHERE id = ?1 AND status = 'draft'
                   AND NOT EXISTS (SELECT 1 FROM applications WHERE campaign_id = ?1)",
                [id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Filtered page plus the total row count for the same filters.
    pub fn list_campaigns(
        &self,
        brand_id: Option<Uuid>,
        status: Option<CampaignStatus>,
        search: Option<&str>,
        skip: u32,
        limit: u32,
    ) -> Result<(Vec<Campaign>, u64)> {
        self.with_conn(|conn| {
            let mut filter = String::new();
            let mut owned: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(brand_id) = brand_id {
                owned.push(Box::new(brand_id.to_string()));
                filter.push_str(&format!(" AND brand_id = ?{}", owned.len()));
            }
            if let Some(status) = status {
                owned.push(Box::new(status.as_str()));
                filter.push_str(&format!(" AND status = ?{}", owned.len()));
            }
            if let Some(search) = search {
                owned.push(Box::new(format!("%{search}%")));
                filter.push_str(&format!(
                    " AND (title LIKE ?{n} OR description LIKE ?{n})",
                    n = owned.len()
                ));
            }

            let count_params: Vec<&dyn rusqlite::types::ToSql> =
                owned.iter().map(|p| p.as_ref()).collect();
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM campaigns WHERE 1=1{filter}"),
                count_params.as_slice(),
                |row| row.get(0),
            )?;

            owned.push(Box::new(limit));
            let limit_ph = owned.len();
            owned.push(Box::new(skip));
            let skip_ph = owned.len();
            let sql = format!(
                "SELECT {CAMPAIGN_COLS} FROM campaigns WHERE 1=1{filter}
                 ORDER BY created_at DESC LIMIT ?{limit_ph} OFFSET ?{skip_ph}"
            );
            let params: Vec<&dyn rusqlite::types::ToSql> =
                owned.iter().map(|p| p.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), map_campaign)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let campaigns = rows
                .into_iter()
                .map(CampaignRow::into_campaign)
                .collect::<Result<Vec<_>>>()?;
            Ok((campaigns, total as u64))
        })
    }
}

const CAMPAIGN_COLS: &str = "id, brand_id, title, description, brief, budget_min, budget_max, \
     currency, target_audience, platforms, deliverables, application_deadline, start_date, \
     end_date, status, tags, created_at, updated_at";

fn map_campaign(row: &rusqlite::Row<'_>) -> rusqlite::Result<CampaignRow> {
    Ok(CampaignRow {
        id: row.get(0)?,
        brand_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        brief: row.get(4)?,
        budget_min: row.get(5)?,
        budget_max: row.get(6)?,
        currency: row.get(7)?,
        target_audience: row.get(8)?,
        platforms: row.get(9)?,
        deliverables: row.get(10)?,
        application_deadline: row.get(11)?,
        start_date: row.get(12)?,
        end_date: row.get(13)?,
        status: row.get(14)?,
        tags: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}
