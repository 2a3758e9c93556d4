//! Storage seams for users, places and bookings.
//!
//! Owner- and user-scoped operations take both the record id and the
//! caller's id. A record that does not match both is treated as absent:
//! updates return `None` and deletes report zero rows.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::booking::{BookedRange, Booking, BookingDraft, BookingWithPlace};
use crate::models::place::{Place, PlaceChanges, PlaceDraft};
use crate::models::user::{NewUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the input, e.g. an email that is already taken.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait PlaceStore: Send + Sync {
    async fn create_place(&self, owner: Uuid, draft: PlaceDraft) -> StoreResult<Place>;

    async fn list_places(&self) -> StoreResult<Vec<Place>>;

    async fn find_place(&self, id: Uuid) -> StoreResult<Option<Place>>;

    async fn list_places_by_owner(&self, owner: Uuid) -> StoreResult<Vec<Place>>;

    /// Applies `changes` when `owner` owns `id`; `None` otherwise.
    async fn update_place(
        &self,
        id: Uuid,
        owner: Uuid,
        changes: PlaceChanges,
    ) -> StoreResult<Option<Place>>;

    async fn delete_place(&self, id: Uuid, owner: Uuid) -> StoreResult<u64>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create_booking(&self, user: Uuid, draft: BookingDraft) -> StoreResult<Booking>;

    /// Bookings made by `user`, each with its place expanded.
    async fn list_bookings_with_place(&self, user: Uuid) -> StoreResult<Vec<BookingWithPlace>>;

    async fn delete_booking(&self, id: Uuid, user: Uuid) -> StoreResult<u64>;

    async fn booked_ranges(&self, place: Uuid) -> StoreResult<Vec<BookedRange>>;
}
