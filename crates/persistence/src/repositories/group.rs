//! Event group repository for database operations.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use domain::services::assignment::PlannedGroup;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::{EventGroupEntity, GroupMemberRow};
use crate::metrics::QueryTimer;

const GROUP_COLUMNS: &str = r#"
    id, name, event_date, activity_name, meeting_point_name, meeting_point_address,
    meeting_time, location_reveal_time, max_participants, is_confirmed,
    created_at, updated_at
"#;

/// Parameters for creating one group.
#[derive(Debug, Clone)]
pub struct NewGroup<'a> {
    pub name: &'a str,
    pub event_date: NaiveDate,
    pub activity_name: &'a str,
    pub meeting_point_name: Option<&'a str>,
    pub meeting_point_address: Option<&'a str>,
    pub meeting_time: NaiveTime,
    pub location_reveal_time: Option<DateTime<Utc>>,
    pub max_participants: i32,
    pub is_confirmed: bool,
}

/// Repository for event-group database operations.
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    /// Creates a new GroupRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create one group with its memberships in a single transaction.
    ///
    /// Fails with a unique violation when any reservation already belongs
    /// to a group.
    pub async fn create_group_with_members(
        &self,
        group: NewGroup<'_>,
        reservation_ids: &[Uuid],
    ) -> Result<EventGroupEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_group_with_members");
        let mut tx = self.pool.begin().await?;
        let entity = insert_group(&mut tx, &group, reservation_ids).await?;
        tx.commit().await?;
        timer.record();
        Ok(entity)
    }

    /// Persist a batch assignment plan: all groups and memberships commit
    /// atomically or not at all.
    ///
    /// Batch groups come out confirmed and sized to their chunk, so a
    /// remainder group of two carries max_participants = 2, not the
    /// requested capacity.
    pub async fn create_groups_batch(
        &self,
        event_date: NaiveDate,
        activity_name: &str,
        meeting_time: NaiveTime,
        plan: &[PlannedGroup],
    ) -> Result<Vec<EventGroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("create_groups_batch");
        let mut tx = self.pool.begin().await?;

        let mut created = Vec::with_capacity(plan.len());
        for planned in plan {
            let group = NewGroup {
                name: &planned.name,
                event_date,
                activity_name,
                meeting_point_name: None,
                meeting_point_address: None,
                meeting_time,
                location_reveal_time: None,
                max_participants: planned.reservation_ids.len() as i32,
                is_confirmed: true,
            };
            created.push(insert_group(&mut tx, &group, &planned.reservation_ids).await?);
        }

        tx.commit().await?;
        timer.record();
        Ok(created)
    }

    /// Find group by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<EventGroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_group_by_id");
        let result = sqlx::query_as::<_, EventGroupEntity>(&format!(
            r#"
            SELECT {GROUP_COLUMNS}
            FROM event_groups
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List groups for one event date.
    pub async fn list_for_event(
        &self,
        event_date: NaiveDate,
    ) -> Result<Vec<EventGroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_groups_for_event");
        let result = sqlx::query_as::<_, EventGroupEntity>(&format!(
            r#"
            SELECT {GROUP_COLUMNS}
            FROM event_groups
            WHERE event_date = $1
            ORDER BY name ASC
            "#
        ))
        .bind(event_date)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List the groups a user belongs to through their confirmed
    /// reservations. A cancelled reservation no longer grants access.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<EventGroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_groups_for_user");
        let result = sqlx::query_as::<_, EventGroupEntity>(&format!(
            r#"
            SELECT {GROUP_COLUMNS}
            FROM event_groups g
            WHERE EXISTS (
                SELECT 1
                FROM group_memberships m
                JOIN reservations r ON r.id = m.reservation_id
                WHERE m.group_id = g.id AND r.user_id = $1 AND r.status = 'confirmed'
            )
            ORDER BY g.event_date DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find the group holding a given reservation, if any.
    pub async fn find_for_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Option<EventGroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_group_for_reservation");
        let result = sqlx::query_as::<_, EventGroupEntity>(&format!(
            r#"
            SELECT {GROUP_COLUMNS}
            FROM event_groups g
            JOIN group_memberships m ON m.group_id = g.id
            WHERE m.reservation_id = $1
            "#
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List a group's members with reservation owner info, in join order.
    ///
    /// Only memberships backed by a confirmed reservation count; a member
    /// who cancels drops out of the roster.
    pub async fn list_members(&self, group_id: Uuid) -> Result<Vec<GroupMemberRow>, sqlx::Error> {
        let timer = QueryTimer::new("list_group_members");
        let result = sqlx::query_as::<_, GroupMemberRow>(
            r#"
            SELECT m.reservation_id, r.user_id, u.first_name, u.last_name, m.joined_at
            FROM group_memberships m
            JOIN reservations r ON r.id = m.reservation_id
            JOIN users u ON u.id = r.user_id
            WHERE m.group_id = $1 AND r.status = 'confirmed'
            ORDER BY m.joined_at ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Set or update a group's meeting point and reveal time.
    pub async fn set_location(
        &self,
        id: Uuid,
        meeting_point_name: &str,
        meeting_point_address: Option<&str>,
        location_reveal_time: Option<DateTime<Utc>>,
    ) -> Result<Option<EventGroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("set_group_location");
        let result = sqlx::query_as::<_, EventGroupEntity>(&format!(
            r#"
            UPDATE event_groups
            SET meeting_point_name = $2,
                meeting_point_address = $3,
                location_reveal_time = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {GROUP_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(meeting_point_name)
        .bind(meeting_point_address)
        .bind(location_reveal_time)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Mark a group as confirmed.
    pub async fn confirm_group(&self, id: Uuid) -> Result<Option<EventGroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("confirm_group");
        let result = sqlx::query_as::<_, EventGroupEntity>(&format!(
            r#"
            UPDATE event_groups
            SET is_confirmed = true, updated_at = NOW()
            WHERE id = $1
            RETURNING {GROUP_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

async fn insert_group(
    tx: &mut Transaction<'_, Postgres>,
    group: &NewGroup<'_>,
    reservation_ids: &[Uuid],
) -> Result<EventGroupEntity, sqlx::Error> {
    let entity = sqlx::query_as::<_, EventGroupEntity>(&format!(
        r#"
        INSERT INTO event_groups (
            name, event_date, activity_name, meeting_point_name, meeting_point_address,
            meeting_time, location_reveal_time, max_participants, is_confirmed
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {GROUP_COLUMNS}
        "#
    ))
    .bind(group.name)
    .bind(group.event_date)
    .bind(group.activity_name)
    .bind(group.meeting_point_name)
    .bind(group.meeting_point_address)
    .bind(group.meeting_time)
    .bind(group.location_reveal_time)
    .bind(group.max_participants)
    .bind(group.is_confirmed)
    .fetch_one(&mut **tx)
    .await?;

    for reservation_id in reservation_ids {
        sqlx::query(
            "INSERT INTO group_memberships (group_id, reservation_id) VALUES ($1, $2)",
        )
        .bind(entity.id)
        .bind(reservation_id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(entity)
}
