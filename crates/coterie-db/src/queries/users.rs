use crate::Database;
use crate::models::{ProfileRow, UserRow, fmt_opt_ts, fmt_ts, to_json};
use crate::queries::OptionalExt;
use anyhow::Result;
use chrono::{DateTime, Utc};
use coterie_types::models::{Profile, User, UserRole, UserStatus};
use rusqlite::Connection;
use uuid::Uuid;

impl Database {
    /// Inserts the user and their profile in one transaction. Returns false
    /// (writing nothing) when the email is already registered.
    pub fn create_user(
        &self,
        user: &User,
        profile: &Profile,
        verification_token: Option<&str>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let taken: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE email = ?1",
                [&user.email],
                |row| row.get(0),
            )?;
            if taken > 0 {
                return Ok(false);
            }

            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO users (id, email, password_hash, role, status, verified,
                                    verification_token, created_at, updated_at, last_login)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    user.id.to_string(),
                    user.email,
                    user.password_hash,
                    user.role.as_str(),
                    user.status.as_str(),
                    user.verified,
                    verification_token,
                    fmt_ts(user.created_at),
                    fmt_ts(user.updated_at),
                    fmt_opt_ts(user.last_login),
                ],
            )?;
            insert_profile(&tx, profile)?;
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| query_user_by_id(conn, &id.to_string()))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, email, password_hash, role, status, verified,
                            verification_token, created_at, updated_at, last_login
                     FROM users WHERE email = ?1",
                    [email],
                    map_user,
                )
                .optional()?;
            row.map(UserRow::into_user).transpose()
        })
    }

    pub fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET last_login = ?1 WHERE id = ?2",
                (fmt_ts(at), id.to_string()),
            )?;
            Ok(())
        })
    }

    /// Marks the matching user verified, activates a pending account and
    /// clears the token so it cannot be replayed. Returns the updated user,
    /// or None when no user holds this token.
    pub fn consume_verification_token(&self, token: &str, at: DateTime<Utc>) -> Result<Option<User>> {
        self.with_conn_mut(|conn| {
            let id: Option<String> = conn
                .query_row(
                    "SELECT id FROM users WHERE verification_token = ?1",
                    [token],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(id) = id else { return Ok(None) };

            conn.execute(
                "UPDATE users
                 SET verified = 1,
                     verification_token = NULL,
                     status = CASE WHEN status = 'pending_verification'
                                   THEN 'active' ELSE status END,
                     updated_at = ?1
                 WHERE id = ?2",
                (fmt_ts(at), &id),
            )?;
            query_user_by_id(conn, &id)
        })
    }

    pub fn set_user_status(&self, id: Uuid, status: UserStatus, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET status = ?1, updated_at = ?2 WHERE id = ?3",
                (status.as_str(), fmt_ts(at), id.to_string()),
            )?;
            Ok(changed > 0)
        })
    }

    // -- Profiles --

    pub fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT user_id, display_name, bio, location, avatar_url, website_url,
                            niches, languages, platforms, rate_card, portfolio_urls,
                            company_name, industry, updated_at
                     FROM profiles WHERE user_id = ?1",
                    [user_id.to_string()],
                    map_profile,
                )
                .optional()?;
            row.map(ProfileRow::into_profile).transpose()
        })
    }

    pub fn save_profile(&self, profile: &Profile) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE profiles
                 SET display_name = ?1, bio = ?2, location = ?3, avatar_url = ?4,
                     website_url = ?5, niches = ?6, languages = ?7, platforms = ?8,
                     rate_card = ?9, portfolio_urls = ?10, company_name = ?11,
                     industry = ?12, updated_at = ?13
                 WHERE user_id = ?14",
                rusqlite::params![
                    profile.display_name,
                    profile.bio,
                    profile.location,
                    profile.avatar_url,
                    profile.website_url,
                    to_json(&profile.niches)?,
                    to_json(&profile.languages)?,
                    to_json(&profile.platforms)?,
                    to_json(&profile.rate_card)?,
                    to_json(&profile.portfolio_urls)?,
                    profile.company_name,
                    profile.industry,
                    fmt_ts(profile.updated_at),
                    profile.user_id.to_string(),
                ],
            )?;
            Ok(())
        })
    }

    /// Public directory search over active accounts, by display name.
    pub fn search_users(
        &self,
        q: Option<&str>,
        role: Option<UserRole>,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<(User, Profile)>> {
        self.with_conn(|conn| {
            let mut sql = String::from(
                "SELECT u.id, u.email, u.password_hash, u.role, u.status, u.verified,
                        u.verification_token, u.created_at, u.updated_at, u.last_login,
                        p.user_id, p.display_name, p.bio, p.location, p.avatar_url,
                        p.website_url, p.niches, p.languages, p.platforms, p.rate_card,
                        p.portfolio_urls, p.company_name, p.industry, p.updated_at
                 FROM users u
                 JOIN profiles p ON p.user_id = u.id
                 WHERE u.status = 'active'",
            );
            let mut owned: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(role) = role {
                owned.push(Box::new(role.as_str()));
                sql.push_str(&format!(" AND u.role = ?{}", owned.len()));
            }
            if let Some(q) = q {
                owned.push(Box::new(format!("%{q}%")));
                sql.push_str(&format!(" AND p.display_name LIKE ?{}", owned.len()));
            }
            owned.push(Box::new(limit));
            sql.push_str(&format!(" ORDER BY p.display_name LIMIT ?{}", owned.len()));
            owned.push(Box::new(skip));
            sql.push_str(&format!(" OFFSET ?{}", owned.len()));

            let params: Vec<&dyn rusqlite::types::ToSql> =
                owned.iter().map(|p| p.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    let user = map_user(row)?;
                    let profile = ProfileRow {
                        user_id: row.get(10)?,
                        display_name: row.get(11)?,
                        bio: row.get(12)?,
                        location: row.get(13)?,
                        avatar_url: row.get(14)?,
                        website_url: row.get(15)?,
                        niches: row.get(16)?,
                        languages: row.get(17)?,
                        platforms: row.get(18)?,
                        rate_card: row.get(19)?,
                        portfolio_urls: row.get(20)?,
                        company_name: row.get(21)?,
                        industry: row.get(22)?,
                        updated_at: row.get(23)?,
                    };
                    Ok((user, profile))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(u, p)| Ok((u.into_user()?, p.into_profile()?)))
                .collect()
        })
    }

    /// Admin listing across all statuses.
    pub fn list_users(
        &self,
        status: Option<UserStatus>,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut sql = String::from(
                "SELECT id, email, password_hash, role, status, verified,
                        verification_token, created_at, updated_at, last_login
                 FROM users",
            );
            let mut owned: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(status) = status {
                owned.push(Box::new(status.as_str()));
                sql.push_str(&format!(" WHERE status = ?{}", owned.len()));
            }
            owned.push(Box::new(limit));
            sql.push_str(&format!(" ORDER BY created_at DESC LIMIT ?{}", owned.len()));
            owned.push(Box::new(skip));
            sql.push_str(&format!(" OFFSET ?{}", owned.len()));

            let params: Vec<&dyn rusqlite::types::ToSql> =
                owned.iter().map(|p| p.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(UserRow::into_user).collect()
        })
    }
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        role: row.get(3)?,
        status: row.get(4)?,
        verified: row.get(5)?,
        verification_token: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        last_login: row.get(9)?,
    })
}

fn map_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        user_id: row.get(0)?,
        display_name: row.get(1)?,
        bio: row.get(2)?,
        location: row.get(3)?,
        avatar_url: row.get(4)?,
        website_url: row.get(5)?,
        niches: row.get(6)?,
        languages: row.get(7)?,
        platforms: row.get(8)?,
        rate_card: row.get(9)?,
        portfolio_urls: row.get(10)?,
        company_name: row.get(11)?,
        industry: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, email, password_hash, role, status, verified,
                    verification_token, created_at, updated_at, last_login
             FROM users WHERE id = ?1",
            [id],
            map_user,
        )
        .optional()?;
    row.map(UserRow::into_user).transpose()
}

fn insert_profile(conn: &Connection, profile: &Profile) -> Result<()> {
    conn.execute(
        "INSERT INTO profiles (user_id, display_name, bio, location, avatar_url,
                               website_url, niches, languages, platforms, rate_card,
                               portfolio_urls, company_name, industry, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        rusqlite::params![
            profile.user_id.to_string(),
            profile.display_name,
            profile.bio,
            profile.location,
            profile.avatar_url,
            profile.website_url,
            to_json(&profile.niches)?,
            to_json(&profile.languages)?,
            to_json(&profile.platforms)?,
            to_json(&profile.rate_card)?,
            to_json(&profile.portfolio_urls)?,
            profile.company_name,
            profile.industry,
            fmt_ts(profile.updated_at),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::testutil;
    use chrono::Utc;
    use coterie_types::models::{UserRole, UserStatus};
    use uuid::Uuid;

    #[test]
    fn create_and_fetch_round_trips() {
        let db = Database::open_in_memory().unwrap();
        let user = testutil::user("ana@example.com", UserRole::Creator);
        let profile = testutil::profile(user.id, "Ana");

        assert!(db.create_user(&user, &profile, None).unwrap());

        let by_email = db.get_user_by_email("ana@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.role, UserRole::Creator);
        assert_eq!(by_email.password_hash, user.password_hash);

        let stored = db.get_profile(user.id).unwrap().unwrap();
        assert_eq!(stored.display_name, "Ana");
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let first = testutil::user("dup@example.com", UserRole::Brand);
        assert!(
            db.create_user(&first, &testutil::profile(first.id, "First"), None)
                .unwrap()
        );

        let second = testutil::user("dup@example.com", UserRole::Creator);
        assert!(
            !db.create_user(&second, &testutil::profile(second.id, "Second"), None)
                .unwrap()
        );
        assert!(db.get_user_by_id(second.id).unwrap().is_none());
    }

    #[test]
    fn verification_token_is_single_use() {
        let db = Database::open_in_memory().unwrap();
        let mut user = testutil::user("pending@example.com", UserRole::Creator);
        user.status = UserStatus::PendingVerification;
        user.verified = false;
        db.create_user(&user, &testutil::profile(user.id, "Pending"), Some("tok-123"))
            .unwrap();

        assert!(
            db.consume_verification_token("wrong", Utc::now())
                .unwrap()
                .is_none()
        );

        let verified = db
            .consume_verification_token("tok-123", Utc::now())
            .unwrap()
            .unwrap();
        assert!(verified.verified);
        assert_eq!(verified.status, UserStatus::Active);

        // Token is cleared on first use.
        assert!(
            db.consume_verification_token("tok-123", Utc::now())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn profile_updates_persist() {
        let db = Database::open_in_memory().unwrap();
        let user = testutil::user("edit@example.com", UserRole::Creator);
        db.create_user(&user, &testutil::profile(user.id, "Before"), None)
            .unwrap();

        let mut profile = db.get_profile(user.id).unwrap().unwrap();
        profile.display_name = "After".to_string();
        profile.niches = vec!["fitness".to_string(), "travel".to_string()];
        profile.rate_card.insert("instagram_post".to_string(), 250.0);
        db.save_profile(&profile).unwrap();

        let stored = db.get_profile(user.id).unwrap().unwrap();
        assert_eq!(stored.display_name, "After");
        assert_eq!(stored.niches.len(), 2);
        assert_eq!(stored.rate_card.get("instagram_post"), Some(&250.0));
    }

    #[test]
    fn search_filters_by_role_and_name() {
        let db = Database::open_in_memory().unwrap();
        let creator = testutil::user("c@example.com", UserRole::Creator);
        db.create_user(&creator, &testutil::profile(creator.id, "Maya Lens"), None)
            .unwrap();
        let brand = testutil::user("b@example.com", UserRole::Brand);
        db.create_user(&brand, &testutil::profile(brand.id, "Maya Cosmetics"), None)
            .unwrap();

        let hits = db
            .search_users(Some("Maya"), Some(UserRole::Creator), 0, 20)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1.display_name, "Maya Lens");

        let all = db.search_users(Some("Maya"), None, 0, 20).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn inactive_users_are_hidden_from_search() {
        let db = Database::open_in_memory().unwrap();
        let user = testutil::user("gone@example.com", UserRole::Creator);
        db.create_user(&user, &testutil::profile(user.id, "Ghost"), None)
            .unwrap();
        db.set_user_status(user.id, UserStatus::Inactive, Utc::now())
            .unwrap();

        assert!(db.search_users(Some("Ghost"), None, 0, 20).unwrap().is_empty());
    }

    #[test]
    fn set_status_reports_missing_user() {
        let db = Database::open_in_memory().unwrap();
        assert!(
            !db.set_user_status(Uuid::new_v4(), UserStatus::Suspended, Utc::now())
                .unwrap()
        );
    }

    #[test]
    fn admin_listing_filters_by_status() {
        let db = Database::open_in_memory().unwrap();
        let active = testutil::user("a@example.com", UserRole::Creator);
        db.create_user(&active, &testutil::profile(active.id, "A"), None)
            .unwrap();
        let suspended = testutil::user("s@example.com", UserRole::Brand);
        db.create_user(&suspended, &testutil::profile(suspended.id, "S"), None)
            .unwrap();
        db.set_user_status(suspended.id, UserStatus::Suspended, Utc::now())
            .unwrap();

        let suspended_only = db.list_users(Some(UserStatus::Suspended), 0, 20).unwrap();
        assert_eq!(suspended_only.len(), 1);
        assert_eq!(suspended_only[0].id, suspended.id);

        assert_eq!(db.list_users(None, 0, 20).unwrap().len(), 2);
    }
}
