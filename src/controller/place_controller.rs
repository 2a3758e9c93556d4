use std::sync::Arc;

use axum::extract::Path;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use tracing::{info, warn};
use uuid::Uuid;

use crate::controller::AppState;
use crate::helpers::api_error::ApiError;
use crate::models::booking::BookedRange;
use crate::models::place::{Place, PlaceDraft, UpdatePlace};
use crate::models::DeleteResult;
use crate::repositories::store::{BookingStore, PlaceStore};
use crate::services::session_service::CurrentUser;

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/place", post(create_place).put(update_place))
        .route("/place/:id", delete(delete_place))
        .route("/user-places", get(retrieve_user_places))
        .route("/places", get(retrieve_all_places))
        .route("/places/:id", get(retrieve_place))
        .route("/room/:id", get(retrieve_room))
        .route_layer(Extension(app_state.places))
        .route_layer(Extension(app_state.bookings))
        .route_layer(Extension(app_state.sessions))
}

pub async fn create_place(
    Extension(places): Extension<Arc<dyn PlaceStore>>,
    CurrentUser(caller): CurrentUser,
    Json(body): Json<PlaceDraft>,
) -> Result<Json<Place>, ApiError> {
    let place = places.create_place(caller.id, body).await?;
    info!("User: {} created place: {}", caller.id, place.id);
    Ok(Json(place))
}

pub async fn retrieve_user_places(
    Extension(places): Extension<Arc<dyn PlaceStore>>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<Place>>, ApiError> {
    Ok(Json(places.list_places_by_owner(caller.id).await?))
}

pub async fn retrieve_place(
    Extension(places): Extension<Arc<dyn PlaceStore>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<Place>>, ApiError> {
    Ok(Json(places.find_place(id).await?))
}

/// Returns the updated place, or `null` when the caller does not own `id`.
pub async fn update_place(
    Extension(places): Extension<Arc<dyn PlaceStore>>,
    CurrentUser(caller): CurrentUser,
    Json(body): Json<UpdatePlace>,
) -> Result<Json<Option<Place>>, ApiError> {
    let updated = places.update_place(body.id, caller.id, body.changes).await?;
    if updated.is_none() {
        warn!("User: {} updated no place matching id: {}", caller.id, body.id);
    }
    Ok(Json(updated))
}

pub async fn delete_place(
    Extension(places): Extension<Arc<dyn PlaceStore>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResult>, ApiError> {
    let deleted = places.delete_place(id, caller.id).await?;
    info!("User: {} deleted {} place(s) with id: {}", caller.id, deleted, id);
    Ok(Json(DeleteResult::new(deleted)))
}

pub async fn retrieve_all_places(
    Extension(places): Extension<Arc<dyn PlaceStore>>,
) -> Result<Json<Vec<Place>>, ApiError> {
    Ok(Json(places.list_places().await?))
}

/// The place plus every booked `{checkIn, checkOut}` range for it.
pub async fn retrieve_room(
    Extension(places): Extension<Arc<dyn PlaceStore>>,
    Extension(bookings): Extension<Arc<dyn BookingStore>>,
    Path(id): Path<Uuid>,
) -> Result<Json<(Option<Place>, Vec<BookedRange>)>, ApiError> {
    let booked = bookings.booked_ranges(id).await?;
    let place = places.find_place(id).await?;
    Ok(Json((place, booked)))
}
