use sqlx::PgPool;

use crate::error::ApiError;
use crate::models::Profile;

/// Fields accepted by `POST /profiles` and `PATCH /profiles/{user_id}`
/// (`spec.md` §4.3). `birth_date` and `gender` are immutable after
/// creation; the handler layer enforces that, not this repo.
#[derive(Debug, Clone)]
pub struct ProfileUpsert {
    pub name: String,
    pub birth_date: chrono::NaiveDate,
    pub gender: String,
    pub orientation: String,
    pub goal: String,
    pub bio: Option<String>,
    pub interests: Vec<String>,
    pub height_cm: Option<i32>,
    pub education: Option<String>,
    pub has_children: Option<bool>,
    pub wants_children: Option<bool>,
    pub smoking: Option<bool>,
    pub drinking: Option<bool>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub geohash: Option<String>,
    pub hide_age: bool,
    pub hide_distance: bool,
    pub hide_online: bool,
    pub allow_messages_from: String,
    pub is_visible: bool,
}

/// Queries over `profiles` (`spec.md` §3, §4.3).
#[derive(Clone)]
pub struct ProfileRepo {
    pool: PgPool,
}

const SELECT_COLUMNS: &str = "user_id, name, birth_date, gender, orientation, goal, bio, interests,
     height_cm, education, has_children, wants_children, smoking, drinking, country, city, lat, lon,
     geohash, hide_age, hide_distance, hide_online, allow_messages_from, is_visible, is_complete,
     created_at, updated_at";

impl ProfileRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new profile, stamping `is_complete = true` and `created_at`
    /// (`spec.md` §4.3 "POST sets is_complete = true").
    pub async fn create(&self, user_id: i64, fields: &ProfileUpsert) -> Result<Profile, ApiError> {
        let query = format!(
            r#"
            INSERT INTO profiles (
                user_id, name, birth_date, gender, orientation, goal, bio, interests, height_cm,
                education, has_children, wants_children, smoking, drinking, country, city, lat, lon,
                geohash, hide_age, hide_distance, hide_online, allow_messages_from, is_visible,
                is_complete
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19,
                $20, $21, $22, $23, $24, true
            )
            RETURNING {SELECT_COLUMNS}
            "#
        );

        let profile = sqlx::query_as::<_, Profile>(&query)
            .bind(user_id)
            .bind(&fields.name)
            .bind(fields.birth_date)
            .bind(&fields.gender)
            .bind(&fields.orientation)
            .bind(&fields.goal)
            .bind(&fields.bio)
            .bind(&fields.interests)
            .bind(fields.height_cm)
            .bind(&fields.education)
            .bind(fields.has_children)
            .bind(fields.wants_children)
            .bind(fields.smoking)
            .bind(fields.drinking)
            .bind(&fields.country)
            .bind(&fields.city)
            .bind(fields.lat)
            .bind(fields.lon)
            .bind(&fields.geohash)
            .bind(fields.hide_age)
            .bind(fields.hide_distance)
            .bind(fields.hide_online)
            .bind(&fields.allow_messages_from)
            .bind(fields.is_visible)
            .fetch_one(&self.pool)
            .await?;

        Ok(profile)
    }

    /// Patch mutable fields and recompute `is_complete`
    /// (`spec.md` §4.3: complete iff all required fields still populated).
    #[allow(clippy::too_many_arguments)]
    pub async fn update_mutable_fields(
        &self,
        user_id: i64,
        fields: &ProfileUpsert,
        is_complete: bool,
    ) -> Result<Profile, ApiError> {
        let query = format!(
            r#"
            UPDATE profiles SET
                name = $2, orientation = $3, goal = $4, bio = $5, interests = $6, height_cm = $7,
                education = $8, has_children = $9, wants_children = $10, smoking = $11,
                drinking = $12, country = $13, city = $14, lat = $15, lon = $16, geohash = $17,
                hide_age = $18, hide_distance = $19, hide_online = $20, allow_messages_from = $21,
                is_visible = $22, is_complete = $23, updated_at = now()
            WHERE user_id = $1
            RETURNING {SELECT_COLUMNS}
            "#
        );

        let profile = sqlx::query_as::<_, Profile>(&query)
            .bind(user_id)
            .bind(&fields.name)
            .bind(&fields.orientation)
            .bind(&fields.goal)
            .bind(&fields.bio)
            .bind(&fields.interests)
            .bind(fields.height_cm)
            .bind(&fields.education)
            .bind(fields.has_children)
            .bind(fields.wants_children)
            .bind(fields.smoking)
            .bind(fields.drinking)
            .bind(&fields.country)
            .bind(&fields.city)
            .bind(fields.lat)
            .bind(fields.lon)
            .bind(&fields.geohash)
            .bind(fields.hide_age)
            .bind(fields.hide_distance)
            .bind(fields.hide_online)
            .bind(&fields.allow_messages_from)
            .bind(fields.is_visible)
            .bind(is_complete)
            .fetch_one(&self.pool)
            .await?;

        Ok(profile)
    }

    pub async fn find_by_user_id(&self, user_id: i64) -> Result<Option<Profile>, ApiError> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM profiles WHERE user_id = $1");
        let profile = sqlx::query_as::<_, Profile>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    /// Existence probe for `GET /profiles/check` (`spec.md` §4.3).
    pub async fn exists(&self, user_id: i64) -> Result<bool, ApiError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM profiles WHERE user_id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// Base candidate set for discovery (`spec.md` §4.4 steps 1, 2 and 4):
    /// complete, visible, not self, owner not blocked, not already acted
    /// on/matched/blocked (the `exclude_ids` the caller computed), plus
    /// whichever hard filters were supplied on the query string.
    ///
    /// Orientation symmetry (step 3) and ranking (step 5) are applied by
    /// the caller in Rust — they need [`crate::models::Orientation`]'s
    /// matching rules and the weighted score, neither of which belongs in
    /// SQL. This fetches a capped, unranked working set ordered by
    /// `user_id DESC` for a stable base before ranking reorders it.
    #[allow(clippy::too_many_arguments)]
    pub async fn list_candidates(
        &self,
        requester_id: i64,
        exclude_ids: &[i64],
        filters: &CandidateFilters,
        fetch_limit: i64,
    ) -> Result<Vec<Profile>, ApiError> {
        let query = format!(
            r#"
            SELECT p.user_id, p.name, p.birth_date, p.gender, p.orientation, p.goal, p.bio,
                   p.interests, p.height_cm, p.education, p.has_children, p.wants_children,
                   p.smoking, p.drinking, p.country, p.city, p.lat, p.lon, p.geohash,
                   p.hide_age, p.hide_distance, p.hide_online, p.allow_messages_from,
                   p.is_visible, p.is_complete, p.created_at, p.updated_at
            FROM profiles p
            JOIN users u ON u.id = p.user_id
            WHERE p.is_complete = true
              AND p.is_visible = true
              AND p.user_id <> $1
              AND NOT u.is_blocked
              AND NOT (p.user_id = ANY($2))
              AND ($3::date IS NULL OR p.birth_date <= $3)
              AND ($4::date IS NULL OR p.birth_date >= $4)
              AND ($5::int IS NULL OR p.height_cm >= $5)
              AND ($6::int IS NULL OR p.height_cm <= $6)
              AND ($7::text IS NULL OR p.goal = $7)
              AND ($8::bool IS NULL OR p.has_children = $8)
              AND ($9::bool IS NULL OR p.wants_children = $9)
              AND ($10::bool IS NULL OR p.smoking = $10)
              AND ($11::bool IS NULL OR p.drinking = $11)
              AND ($12::text IS NULL OR p.education = $12)
              AND (
                  NOT $13
                  OR EXISTS(
                      SELECT 1 FROM photos ph
                      WHERE ph.profile_id = p.user_id AND ph.is_primary AND ph.status = 'approved'
                  )
              )
            ORDER BY p.user_id DESC
            LIMIT $14
            "#
        );

        let profiles = sqlx::query_as::<_, Profile>(&query)
            .bind(requester_id)
            .bind(exclude_ids)
            .bind(filters.birth_date_max)
            .bind(filters.birth_date_min)
            .bind(filters.height_min)
            .bind(filters.height_max)
            .bind(&filters.goal)
            .bind(filters.has_children)
            .bind(filters.wants_children)
            .bind(filters.smoking)
            .bind(filters.drinking)
            .bind(&filters.education)
            .bind(filters.verified_only)
            .bind(fetch_limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(profiles)
    }
}

/// Hard filters accepted by `GET /discovery/candidates` (`spec.md` §4.4
/// step 4). `birth_date_max`/`birth_date_min` are the caller's
/// `age_min`/`age_max` query params converted to a date range.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilters {
    pub birth_date_max: Option<chrono::NaiveDate>,
    pub birth_date_min: Option<chrono::NaiveDate>,
    pub height_min: Option<i32>,
    pub height_max: Option<i32>,
    pub goal: Option<String>,
    pub has_children: Option<bool>,
    pub wants_children: Option<bool>,
    pub smoking: Option<bool>,
    pub drinking: Option<bool>,
    pub education: Option<String>,
    pub verified_only: bool,
}
