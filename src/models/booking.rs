use serde::{Deserialize, Serialize};
use serde_with::{serde_as, skip_serializing_none, DisplayFromStr, PickFirst};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::date_format;
use crate::models::place::Place;

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub place: Uuid,
    pub user: Uuid,
    #[serde(with = "date_format")]
    pub check_in: OffsetDateTime,
    #[serde(with = "date_format")]
    pub check_out: OffsetDateTime,
    pub number_of_guests: Option<i32>,
    pub name: String,
    pub phone: String,
    pub price: Option<f64>,
}

impl Booking {
    pub fn new(id: Uuid, user: Uuid, draft: BookingDraft) -> Self {
        Self {
            id,
            place: draft.place,
            user,
            check_in: draft.check_in,
            check_out: draft.check_out,
            number_of_guests: draft.number_of_guests,
            name: draft.name,
            phone: draft.phone,
            price: draft.price,
        }
    }

    pub fn booked_range(&self) -> BookedRange {
        BookedRange {
            check_in: self.check_in,
            check_out: self.check_out,
        }
    }
}

/// Reservation request. `price` is taken as sent; numbers may also arrive
/// as numeric strings.
#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub place: Uuid,
    #[serde(with = "date_format")]
    pub check_in: OffsetDateTime,
    #[serde(with = "date_format")]
    pub check_out: OffsetDateTime,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub number_of_guests: Option<i32>,
    pub name: String,
    pub phone: String,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub price: Option<f64>,
}

/// A booking with its place expanded. `place` is `None` once the place
/// has been deleted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingWithPlace {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub place: Option<Place>,
    pub user: Uuid,
    #[serde(with = "date_format")]
    pub check_in: OffsetDateTime,
    #[serde(with = "date_format")]
    pub check_out: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub number_of_guests: Option<i32>,
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub price: Option<f64>,
}

impl BookingWithPlace {
    pub fn new(booking: Booking, place: Option<Place>) -> Self {
        Self {
            id: booking.id,
            place,
            user: booking.user,
            check_in: booking.check_in,
            check_out: booking.check_out,
            number_of_guests: booking.number_of_guests,
            name: booking.name,
            phone: booking.phone,
            price: booking.price,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookedRange {
    #[serde(with = "date_format")]
    pub check_in: OffsetDateTime,
    #[serde(with = "date_format")]
    pub check_out: OffsetDateTime,
}
