use std::sync::Arc;

use axum::extract::Path;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use tracing::info;
use uuid::Uuid;

use crate::controller::AppState;
use crate::helpers::api_error::ApiError;
use crate::models::booking::{Booking, BookingDraft, BookingWithPlace};
use crate::models::DeleteResult;
use crate::repositories::store::BookingStore;
use crate::services::session_service::CurrentUser;

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/booking", post(add_booking))
        .route("/bookings", get(get_all_bookings))
        .route("/booking/:id", delete(delete_booking))
        .route_layer(Extension(app_state.bookings))
        .route_layer(Extension(app_state.sessions))
}

/// Stores the booking as sent. Overlap with existing stays is not checked.
pub async fn add_booking(
    Extension(bookings): Extension<Arc<dyn BookingStore>>,
    CurrentUser(caller): CurrentUser,
    Json(body): Json<BookingDraft>,
) -> Result<Json<Booking>, ApiError> {
    let booking = bookings.create_booking(caller.id, body).await?;
    info!("User: {} booked place: {} as booking: {}", caller.id, booking.place, booking.id);
    Ok(Json(booking))
}

pub async fn get_all_bookings(
    Extension(bookings): Extension<Arc<dyn BookingStore>>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<BookingWithPlace>>, ApiError> {
    Ok(Json(bookings.list_bookings_with_place(caller.id).await?))
}

pub async fn delete_booking(
    Extension(bookings): Extension<Arc<dyn BookingStore>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResult>, ApiError> {
    let deleted = bookings.delete_booking(id, caller.id).await?;
    info!("User: {} deleted {} booking(s) with id: {}", caller.id, deleted, id);
    Ok(Json(DeleteResult::new(deleted)))
}
