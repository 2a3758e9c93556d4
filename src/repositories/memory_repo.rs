use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::booking::{BookedRange, Booking, BookingDraft, BookingWithPlace};
use crate::models::place::{Place, PlaceChanges, PlaceDraft};
use crate::models::user::{NewUser, User};
use crate::repositories::store::{
    BookingStore, PlaceStore, StoreError, StoreResult, UserStore,
};

/// Process-local store with the same semantics as the Postgres one.
/// Records keep insertion order.
#[derive(Default)]
pub struct InMemoryRepo {
    users: RwLock<Vec<User>>,
    places: RwLock<Vec<Place>>,
    bookings: RwLock<Vec<Booking>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn stored_user(&self, email: &str) -> Option<User> {
        self.users
            .read()
            .await
            .iter()
            .find(|user| user.email == email)
            .cloned()
    }
}

#[async_trait]
impl UserStore for InMemoryRepo {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|existing| existing.email == user.email) {
            return Err(StoreError::Validation(format!(
                "email {} is already registered",
                user.email
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password: user.password_hash,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|user| user.email == email)
            .cloned())
    }
}

#[async_trait]
impl PlaceStore for InMemoryRepo {
    async fn create_place(&self, owner: Uuid, draft: PlaceDraft) -> StoreResult<Place> {
        let place = Place::new(Uuid::new_v4(), owner, draft);
        self.places.write().await.push(place.clone());
        Ok(place)
    }

    async fn list_places(&self) -> StoreResult<Vec<Place>> {
        Ok(self.places.read().await.clone())
    }

    async fn find_place(&self, id: Uuid) -> StoreResult<Option<Place>> {
        Ok(self
            .places
            .read()
            .await
            .iter()
            .find(|place| place.id == id)
            .cloned())
    }

    async fn list_places_by_owner(&self, owner: Uuid) -> StoreResult<Vec<Place>> {
        Ok(self
            .places
            .read()
            .await
            .iter()
            .filter(|place| place.owner == owner)
            .cloned()
            .collect())
    }

    async fn update_place(
        &self,
        id: Uuid,
        owner: Uuid,
        changes: PlaceChanges,
    ) -> StoreResult<Option<Place>> {
        let mut places = self.places.write().await;
        match places
            .iter_mut()
            .find(|place| place.id == id && place.owner == owner)
        {
            Some(place) => {
                place.apply(changes);
                Ok(Some(place.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_place(&self, id: Uuid, owner: Uuid) -> StoreResult<u64> {
        let mut places = self.places.write().await;
        let before = places.len();
        places.retain(|place| !(place.id == id && place.owner == owner));
        Ok((before - places.len()) as u64)
    }
}

#[async_trait]
impl BookingStore for InMemoryRepo {
    async fn create_booking(&self, user: Uuid, draft: BookingDraft) -> StoreResult<Booking> {
        let booking = Booking::new(Uuid::new_v4(), user, draft);
        self.bookings.write().await.push(booking.clone());
        Ok(booking)
    }

    async fn list_bookings_with_place(&self, user: Uuid) -> StoreResult<Vec<BookingWithPlace>> {
        let bookings = self.bookings.read().await;
        let places = self.places.read().await;

        Ok(bookings
            .iter()
            .filter(|booking| booking.user == user)
            .map(|booking| {
                let place = places.iter().find(|place| place.id == booking.place).cloned();
                BookingWithPlace::new(booking.clone(), place)
            })
            .collect())
    }

    async fn delete_booking(&self, id: Uuid, user: Uuid) -> StoreResult<u64> {
        let mut bookings = self.bookings.write().await;
        let before = bookings.len();
        bookings.retain(|booking| !(booking.id == id && booking.user == user));
        Ok((before - bookings.len()) as u64)
    }

    async fn booked_ranges(&self, place: Uuid) -> StoreResult<Vec<BookedRange>> {
        Ok(self
            .bookings
            .read()
            .await
            .iter()
            .filter(|booking| booking.place == place)
            .map(Booking::booked_range)
            .collect())
    }
}
