use serde::{Deserialize, Serialize};
use serde_with::{serde_as, skip_serializing_none, DisplayFromStr, PickFirst};
use uuid::Uuid;

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub owner: Uuid,
    pub title: String,
    pub address: String,
    pub photos: Vec<String>,
    pub description: String,
    pub perks: Vec<String>,
    pub extra_info: String,
    pub price: Option<f64>,
    pub check_in: Option<i32>,
    pub check_out: Option<i32>,
    pub max_guests: Option<i32>,
}

impl Place {
    pub fn new(id: Uuid, owner: Uuid, draft: PlaceDraft) -> Self {
        let draft = draft.normalized();
        Self {
            id,
            owner,
            title: draft.title,
            address: draft.address,
            photos: draft.added_photos,
            description: draft.description,
            perks: draft.perks,
            extra_info: draft.extra_info,
            price: draft.price,
            check_in: draft.check_in,
            check_out: draft.check_out,
            max_guests: draft.max_guests,
        }
    }

    /// Overwrites the fields present in `changes`. `id` and `owner` never change.
    pub fn apply(&mut self, changes: PlaceChanges) {
        let changes = changes.normalized();
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(address) = changes.address {
            self.address = address;
        }
        if let Some(photos) = changes.added_photos {
            self.photos = photos;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(perks) = changes.perks {
            self.perks = perks;
        }
        if let Some(extra_info) = changes.extra_info {
            self.extra_info = extra_info;
        }
        if changes.price.is_some() {
            self.price = changes.price;
        }
        if changes.check_in.is_some() {
            self.check_in = changes.check_in;
        }
        if changes.check_out.is_some() {
            self.check_out = changes.check_out;
        }
        if changes.max_guests.is_some() {
            self.max_guests = changes.max_guests;
        }
    }
}

/// Descriptive fields of a place as submitted by its owner. Numbers may
/// arrive as JSON numbers or as numeric strings from form inputs.
#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceDraft {
    pub title: String,
    pub address: String,
    pub added_photos: Vec<String>,
    pub description: String,
    pub perks: Vec<String>,
    pub extra_info: String,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub price: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub check_in: Option<i32>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub check_out: Option<i32>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub max_guests: Option<i32>,
}

impl PlaceDraft {
    pub fn normalized(mut self) -> Self {
        dedup_perks(&mut self.perks);
        self
    }
}

/// Partial update of a place: absent fields keep their stored value.
#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceChanges {
    pub title: Option<String>,
    pub address: Option<String>,
    pub added_photos: Option<Vec<String>>,
    pub description: Option<String>,
    pub perks: Option<Vec<String>>,
    pub extra_info: Option<String>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub price: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub check_in: Option<i32>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub check_out: Option<i32>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub max_guests: Option<i32>,
}

impl PlaceChanges {
    pub fn normalized(mut self) -> Self {
        if let Some(perks) = self.perks.as_mut() {
            dedup_perks(perks);
        }
        self
    }
}

/// Perks are a set; duplicates are dropped keeping the first occurrence.
fn dedup_perks(perks: &mut Vec<String>) {
    let mut seen = Vec::with_capacity(perks.len());
    perks.retain(|perk| {
        if seen.contains(perk) {
            false
        } else {
            seen.push(perk.clone());
            true
        }
    });
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UpdatePlace {
    pub id: Uuid,
    #[serde(flatten)]
    pub changes: PlaceChanges,
}
