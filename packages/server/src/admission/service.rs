use std::collections::HashMap;

use chrono::Utc;
use common::{Occupancy, RegistrationStatus};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QuerySelect, Set, SqlErr, sea_query::LockType,
};

use crate::entity::{event, registration};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::utils::account::normalize_email;

/// Contact details of a registrant without an account.
#[derive(Debug, Clone)]
pub struct GuestContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Who is asking for a place.
#[derive(Debug, Clone)]
pub enum Registrant {
    User(i32),
    Guest(GuestContact),
}

pub struct AdmissionService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> AdmissionService<'a, C> {
    /// `conn` should be a transaction; row locks are released on commit.
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Load the event with `SELECT ... FOR UPDATE`.
    pub async fn lock_event(&self, event_id: i32) -> Result<event::Model, AppError> {
        event::Entity::find_by_id(event_id)
            .lock(LockType::Update)
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".into()))
    }

    /// Count places currently taken at `event`.
    pub async fn occupancy(&self, event: &event::Model) -> Result<Occupancy, DbErr> {
        let occupied = registration::Entity::find()
            .filter(registration::Column::EventId.eq(event.id))
            .filter(registration::Column::Status.is_in(RegistrationStatus::ACTIVE.iter().copied()))
            .count(self.conn)
            .await?;
        Ok(Occupancy::new(event.capacity, occupied))
    }

    /// The registrant's row for this event, whatever its status.
    pub async fn find_for(
        &self,
        event_id: i32,
        registrant: &Registrant,
    ) -> Result<Option<registration::Model>, DbErr> {
        let query =
            registration::Entity::find().filter(registration::Column::EventId.eq(event_id));
        let query = match registrant {
            Registrant::User(user_id) => query.filter(registration::Column::UserId.eq(*user_id)),
            Registrant::Guest(contact) => query
                .filter(registration::Column::UserId.is_null())
                .filter(registration::Column::GuestEmail.eq(normalize_email(&contact.email))),
        };
        query.one(self.conn).await
    }

    /// Give the registrant a place at the event.
    ///
    /// A registrant holding an active registration gets `AlreadyRegistered`
    /// even when the event is full. A previously cancelled row is reactivated
    /// instead of inserting a second one.
    pub async fn admit(
        &self,
        event_id: i32,
        registrant: Registrant,
    ) -> Result<registration::Model, AppError> {
        let event = self.lock_event(event_id).await?;
        let existing = self.find_for(event_id, &registrant).await?;

        if existing.as_ref().is_some_and(|r| r.status.is_active()) {
            return Err(AppError::AlreadyRegistered);
        }

        let occupancy = self.occupancy(&event).await?;
        if !occupancy.has_room() {
            tracing::debug!(
                event_id,
                capacity = event.capacity,
                occupied = occupancy.occupied,
                "Admission rejected, event is full"
            );
            return Err(AppError::EventFull);
        }

        let now = Utc::now();
        if let Some(cancelled) = existing {
            let mut active: registration::ActiveModel = cancelled.into();
            if let Registrant::Guest(contact) = registrant {
                active.guest_name = Set(Some(contact.name.trim().to_string()));
                active.guest_phone = Set(contact.phone.map(|p| p.trim().to_string()));
            }
            active.status = Set(RegistrationStatus::Confirmed);
            active.updated_at = Set(now);
            return Ok(active.update(self.conn).await?);
        }

        let (user_id, guest_name, guest_email, guest_phone) = match registrant {
            Registrant::User(user_id) => (Some(user_id), None, None, None),
            Registrant::Guest(contact) => (
                None,
                Some(contact.name.trim().to_string()),
                Some(normalize_email(&contact.email)),
                contact.phone.map(|p| p.trim().to_string()),
            ),
        };
        let new_registration = registration::ActiveModel {
            event_id: Set(event_id),
            user_id: Set(user_id),
            guest_name: Set(guest_name),
            guest_email: Set(guest_email),
            guest_phone: Set(guest_phone),
            status: Set(RegistrationStatus::Confirmed),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match new_registration.insert(self.conn).await {
            Ok(model) => Ok(model),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(AppError::AlreadyRegistered)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Cancel the user's active registration for an event.
    pub async fn cancel_for_user(
        &self,
        event_id: i32,
        user_id: i32,
    ) -> Result<registration::Model, AppError> {
        self.lock_event(event_id).await?;
        let current = self
            .find_for(event_id, &Registrant::User(user_id))
            .await?
            .filter(|r| r.status.is_active())
            .ok_or_else(|| AppError::NotFound("No active registration for this event".into()))?;

        let mut active: registration::ActiveModel = current.into();
        active.status = Set(RegistrationStatus::Cancelled);
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.conn).await?)
    }

    /// Change a registration's status on behalf of its owner or an admin.
    ///
    /// Moving a cancelled registration back to an active status takes a place
    /// and is rejected with `EventFull` when none is left.
    pub async fn set_status(
        &self,
        registration_id: i32,
        status: RegistrationStatus,
        requester: &AuthUser,
    ) -> Result<registration::Model, AppError> {
        let current = self.find_registration(registration_id, false).await?;
        if !requester.owns_or_admin(current.user_id) {
            return Err(AppError::Forbidden(
                "Not authorized to update this registration".into(),
            ));
        }

        let event = self.lock_event(current.event_id).await?;
        let current = self.find_registration(registration_id, true).await?;
        if current.status == status {
            return Ok(current);
        }

        if !current.status.is_active() && status.is_active() {
            let occupancy = self.occupancy(&event).await?;
            if !occupancy.has_room() {
                return Err(AppError::EventFull);
            }
        }

        let mut active: registration::ActiveModel = current.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.conn).await?)
    }

    async fn find_registration(
        &self,
        registration_id: i32,
        for_update: bool,
    ) -> Result<registration::Model, AppError> {
        let mut query = registration::Entity::find_by_id(registration_id);
        if for_update {
            query = query.lock(LockType::Update);
        }
        query
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Registration not found".into()))
    }
}

/// Active registration counts for the given events, keyed by event id.
/// Events without active registrations are absent from the map.
pub async fn active_counts<C: ConnectionTrait>(
    db: &C,
    event_ids: &[i32],
) -> Result<HashMap<i32, u64>, DbErr> {
    if event_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i32, i64)> = registration::Entity::find()
        .select_only()
        .column(registration::Column::EventId)
        .column_as(registration::Column::Id.count(), "occupied")
        .filter(registration::Column::EventId.is_in(event_ids.iter().copied()))
        .filter(registration::Column::Status.is_in(RegistrationStatus::ACTIVE.iter().copied()))
        .group_by(registration::Column::EventId)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(event_id, occupied)| (event_id, occupied.max(0) as u64))
        .collect())
}
