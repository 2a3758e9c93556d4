use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bb8_postgres::bb8::{Pool, PooledConnection};
use bb8_postgres::tokio_postgres::error::SqlState;
use bb8_postgres::tokio_postgres::{NoTls, Row};
use bb8_postgres::PostgresConnectionManager;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::booking::{BookedRange, Booking, BookingDraft, BookingWithPlace};
use crate::models::place::{Place, PlaceChanges, PlaceDraft};
use crate::models::user::{NewUser, User};
use crate::repositories::store::{
    BookingStore, PlaceStore, StoreError, StoreResult, UserStore,
};

pub const RETRY_LIMIT: usize = 5;

pub type PostgresPool = Pool<PostgresConnectionManager<NoTls>>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS places (
        id UUID PRIMARY KEY,
        owner UUID NOT NULL,
        title TEXT NOT NULL DEFAULT '',
        address TEXT NOT NULL DEFAULT '',
        photos TEXT[] NOT NULL DEFAULT '{}',
        description TEXT NOT NULL DEFAULT '',
        perks TEXT[] NOT NULL DEFAULT '{}',
        extra_info TEXT NOT NULL DEFAULT '',
        price DOUBLE PRECISION,
        check_in INTEGER,
        check_out INTEGER,
        max_guests INTEGER
    );
    CREATE INDEX IF NOT EXISTS places_owner_idx ON places (owner);
    CREATE TABLE IF NOT EXISTS bookings (
        id UUID PRIMARY KEY,
        place UUID NOT NULL,
        user_id UUID NOT NULL,
        check_in TIMESTAMPTZ NOT NULL,
        check_out TIMESTAMPTZ NOT NULL,
        number_of_guests INTEGER,
        name TEXT NOT NULL,
        phone TEXT NOT NULL,
        price DOUBLE PRECISION
    );
    CREATE INDEX IF NOT EXISTS bookings_user_idx ON bookings (user_id);
    CREATE INDEX IF NOT EXISTS bookings_place_idx ON bookings (place);
";

const PLACE_COLUMNS: &str = "id, owner, title, address, photos, description, perks, \
    extra_info, price, check_in, check_out, max_guests";

const BOOKING_COLUMNS: &str = "id, place, user_id, check_in, check_out, number_of_guests, \
    name, phone, price";

/// Builds the process-wide pool. Called once at startup.
pub async fn connect(database_url: &str, max_size: u32) -> anyhow::Result<PostgresPool> {
    let manager = PostgresConnectionManager::new_from_stringlike(database_url, NoTls)
        .context("Invalid DATABASE_URL")?;
    let pool = Pool::builder()
        .max_size(max_size)
        .build(manager)
        .await
        .context("Failed to build postgres connection pool")?;
    info!("Postgres connection pool ready with max size: {}", max_size);
    Ok(pool)
}

pub struct PostgresConnectionRepo {
    postgres_connection: PostgresPool,
}

impl PostgresConnectionRepo {
    pub fn new(postgres_connection: PostgresPool) -> Self {
        Self {
            postgres_connection
        }
    }

    async fn get_postgres_connection(
        &self,
    ) -> anyhow::Result<PooledConnection<'_, PostgresConnectionManager<NoTls>>> {
        for _ in 0..RETRY_LIMIT {
            match self.postgres_connection.get().await {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    warn!("Failed to retrieve postgres connection due to: {}, retrying in 3s", e);
                    tokio::time::sleep(tokio::time::Duration::from_secs(3)).await;
                    continue;
                }
            }
        }

        Err(anyhow!("Failed to retrieve a valid connection from postgres pool, BAILING"))
    }

    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        let conn = self.get_postgres_connection().await?;
        conn.batch_execute(SCHEMA)
            .await
            .context("Failed to create tables")?;
        info!("Postgres schema ensured");
        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresConnectionRepo {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let conn = self.get_postgres_connection().await?;
        let id = Uuid::new_v4();

        let res = conn
            .query_one(
                "INSERT INTO users (id, name, email, password) VALUES ($1, $2, $3, $4) \
                 RETURNING id, name, email, password;",
                &[&id, &user.name, &user.email, &user.password_hash],
            )
            .await;

        match res {
            Ok(row) => Ok(parse_row_into_user(&row)),
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => Err(StoreError::Validation(
                format!("email {} is already registered", user.email),
            )),
            Err(e) => {
                warn!("Failed to insert user due to: {}", e);
                Err(anyhow!(e).context("Failed to insert user").into())
            }
        }
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let conn = self.get_postgres_connection().await?;
        let row = conn
            .query_opt(
                "SELECT id, name, email, password FROM users WHERE email = $1 LIMIT 1;",
                &[&email],
            )
            .await
            .context("Failed to look up user by email")?;

        Ok(row.as_ref().map(parse_row_into_user))
    }
}

#[async_trait]
impl PlaceStore for PostgresConnectionRepo {
    async fn create_place(&self, owner: Uuid, draft: PlaceDraft) -> StoreResult<Place> {
        let conn = self.get_postgres_connection().await?;
        let place = Place::new(Uuid::new_v4(), owner, draft);

        conn.execute(
            "INSERT INTO places (id, owner, title, address, photos, description, perks, \
             extra_info, price, check_in, check_out, max_guests) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12);",
            &[
                &place.id,
                &place.owner,
                &place.title,
                &place.address,
                &place.photos,
                &place.description,
                &place.perks,
                &place.extra_info,
                &place.price,
                &place.check_in,
                &place.check_out,
                &place.max_guests,
            ],
        )
        .await
        .with_context(|| format!("Failed to insert place for owner: {}", owner))?;

        Ok(place)
    }

    async fn list_places(&self) -> StoreResult<Vec<Place>> {
        let conn = self.get_postgres_connection().await?;
        let stmt = format!("SELECT {} FROM places;", PLACE_COLUMNS);
        let rows = conn
            .query(&stmt, &[])
            .await
            .context("Failed to list places")?;

        Ok(rows.iter().map(parse_row_into_place).collect())
    }

    async fn find_place(&self, id: Uuid) -> StoreResult<Option<Place>> {
        let conn = self.get_postgres_connection().await?;
        let stmt = format!("SELECT {} FROM places WHERE id = $1 LIMIT 1;", PLACE_COLUMNS);
        let row = conn
            .query_opt(&stmt, &[&id])
            .await
            .with_context(|| format!("Failed to retrieve place with id: {}", id))?;

        Ok(row.as_ref().map(parse_row_into_place))
    }

    async fn list_places_by_owner(&self, owner: Uuid) -> StoreResult<Vec<Place>> {
        let conn = self.get_postgres_connection().await?;
        let stmt = format!("SELECT {} FROM places WHERE owner = $1;", PLACE_COLUMNS);
        let rows = conn
            .query(&stmt, &[&owner])
            .await
            .with_context(|| format!("Failed to list places for owner: {}", owner))?;

        Ok(rows.iter().map(parse_row_into_place).collect())
    }

    async fn update_place(
        &self,
        id: Uuid,
        owner: Uuid,
        changes: PlaceChanges,
    ) -> StoreResult<Option<Place>> {
        let conn = self.get_postgres_connection().await?;
        let changes = changes.normalized();
        let stmt = format!(
            "UPDATE places SET title = COALESCE($3, title), address = COALESCE($4, address), \
             photos = COALESCE($5, photos), description = COALESCE($6, description), \
             perks = COALESCE($7, perks), extra_info = COALESCE($8, extra_info), \
             price = COALESCE($9, price), check_in = COALESCE($10, check_in), \
             check_out = COALESCE($11, check_out), max_guests = COALESCE($12, max_guests) \
             WHERE id = $1 AND owner = $2 RETURNING {};",
            PLACE_COLUMNS
        );

        let row = conn
            .query_opt(
                &stmt,
                &[
                    &id,
                    &owner,
                    &changes.title,
                    &changes.address,
                    &changes.added_photos,
                    &changes.description,
                    &changes.perks,
                    &changes.extra_info,
                    &changes.price,
                    &changes.check_in,
                    &changes.check_out,
                    &changes.max_guests,
                ],
            )
            .await
            .with_context(|| format!("Failed to update place: {}", id))?;

        Ok(row.as_ref().map(parse_row_into_place))
    }

    async fn delete_place(&self, id: Uuid, owner: Uuid) -> StoreResult<u64> {
        let conn = self.get_postgres_connection().await?;
        let deleted = conn
            .execute("DELETE FROM places WHERE id = $1 AND owner = $2;", &[&id, &owner])
            .await
            .with_context(|| format!("Failed to delete place: {}", id))?;

        Ok(deleted)
    }
}

#[async_trait]
impl BookingStore for PostgresConnectionRepo {
    async fn create_booking(&self, user: Uuid, draft: BookingDraft) -> StoreResult<Booking> {
        let conn = self.get_postgres_connection().await?;
        let booking = Booking::new(Uuid::new_v4(), user, draft);

        conn.execute(
            "INSERT INTO bookings (id, place, user_id, check_in, check_out, number_of_guests, \
             name, phone, price) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9);",
            &[
                &booking.id,
                &booking.place,
                &booking.user,
                &booking.check_in,
                &booking.check_out,
                &booking.number_of_guests,
                &booking.name,
                &booking.phone,
                &booking.price,
            ],
        )
        .await
        .with_context(|| format!("Failed to insert booking for user: {}", user))?;

        Ok(booking)
    }

    async fn list_bookings_with_place(&self, user: Uuid) -> StoreResult<Vec<BookingWithPlace>> {
        let conn = self.get_postgres_connection().await?;
        let rows = conn
            .query(
                "SELECT b.id, b.place, b.user_id, b.check_in, b.check_out, b.number_of_guests, \
                 b.name, b.phone, b.price, \
                 p.id AS p_id, p.owner AS p_owner, p.title AS p_title, p.address AS p_address, \
                 p.photos AS p_photos, p.description AS p_description, p.perks AS p_perks, \
                 p.extra_info AS p_extra_info, p.price AS p_price, p.check_in AS p_check_in, \
                 p.check_out AS p_check_out, p.max_guests AS p_max_guests \
                 FROM bookings b LEFT JOIN places p ON p.id = b.place \
                 WHERE b.user_id = $1;",
                &[&user],
            )
            .await
            .with_context(|| format!("Failed to list bookings for user: {}", user))?;

        Ok(rows
            .iter()
            .map(|row| {
                let place = row
                    .get::<_, Option<Uuid>>("p_id")
                    .map(|_| parse_prefixed_place(row, "p_"));
                BookingWithPlace::new(parse_row_into_booking(row), place)
            })
            .collect())
    }

    async fn delete_booking(&self, id: Uuid, user: Uuid) -> StoreResult<u64> {
        let conn = self.get_postgres_connection().await?;
        let deleted = conn
            .execute("DELETE FROM bookings WHERE id = $1 AND user_id = $2;", &[&id, &user])
            .await
            .with_context(|| format!("Failed to delete booking: {}", id))?;

        Ok(deleted)
    }

    async fn booked_ranges(&self, place: Uuid) -> StoreResult<Vec<BookedRange>> {
        let conn = self.get_postgres_connection().await?;
        let stmt = format!("SELECT {} FROM bookings WHERE place = $1;", BOOKING_COLUMNS);
        let rows = conn
            .query(&stmt, &[&place])
            .await
            .with_context(|| format!("Failed to list bookings for place: {}", place))?;

        Ok(rows
            .iter()
            .map(|row| parse_row_into_booking(row).booked_range())
            .collect())
    }
}

fn parse_row_into_user(
    row: &Row,
) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password: row.get("password"),
    }
}

fn parse_row_into_place(
    row: &Row,
) -> Place {
    parse_prefixed_place(row, "")
}

fn parse_prefixed_place(
    row: &Row,
    prefix: &str,
) -> Place {
    let column = |name: &str| format!("{}{}", prefix, name);
    Place {
        id: row.get(column("id").as_str()),
        owner: row.get(column("owner").as_str()),
        title: row.get(column("title").as_str()),
        address: row.get(column("address").as_str()),
        photos: row.get(column("photos").as_str()),
        description: row.get(column("description").as_str()),
        perks: row.get(column("perks").as_str()),
        extra_info: row.get(column("extra_info").as_str()),
        price: row.get(column("price").as_str()),
        check_in: row.get(column("check_in").as_str()),
        check_out: row.get(column("check_out").as_str()),
        max_guests: row.get(column("max_guests").as_str()),
    }
}

fn parse_row_into_booking(
    row: &Row,
) -> Booking {
    Booking {
        id: row.get("id"),
        place: row.get("place"),
        user: row.get("user_id"),
        check_in: row.get("check_in"),
        check_out: row.get("check_out"),
        number_of_guests: row.get("number_of_guests"),
        name: row.get("name"),
        phone: row.get("phone"),
        price: row.get("price"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    // Needs a live database: `DATABASE_URL=postgres://... cargo test -- --ignored`
    async fn repo() -> PostgresConnectionRepo {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let repo = PostgresConnectionRepo::new(connect(&url, 2).await.unwrap());
        repo.ensure_schema().await.unwrap();
        repo
    }

    fn booking_for(place: Uuid) -> BookingDraft {
        BookingDraft {
            place,
            check_in: datetime!(2024-05-01 0:00 UTC),
            check_out: datetime!(2024-05-03 0:00 UTC),
            number_of_guests: Some(2),
            name: "Ada".into(),
            phone: "555-0100".into(),
            price: Some(200.0),
        }
    }

    #[tokio::test]
    #[ignore]
    async fn users_round_trip_and_reject_duplicate_emails() {
        let repo = repo().await;
        let email = format!("{}@test.local", Uuid::new_v4());
        let new_user = || NewUser {
            name: "Ada".into(),
            email: email.clone(),
            password_hash: "hash".into(),
        };

        let created = repo.create_user(new_user()).await.unwrap();
        let found = repo.find_user_by_email(&email).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.password, "hash");

        let err = repo.create_user(new_user()).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    #[ignore]
    async fn place_updates_keep_absent_columns_and_respect_the_owner() {
        let repo = repo().await;
        // Owners are taken from session claims and need no users row.
        let owner = Uuid::new_v4();
        let draft = PlaceDraft {
            title: "Loft".into(),
            address: "1 Main St".into(),
            perks: vec!["wifi".into()],
            price: Some(80.0),
            check_in: Some(14),
            ..Default::default()
        };
        let place = repo.create_place(owner, draft).await.unwrap();

        let stolen = PlaceChanges { title: Some("Stolen".into()), ..Default::default() };
        assert!(repo.update_place(place.id, Uuid::new_v4(), stolen).await.unwrap().is_none());

        let changes = PlaceChanges { title: Some("Attic".into()), ..Default::default() };
        let updated = repo.update_place(place.id, owner, changes).await.unwrap().unwrap();
        assert_eq!(updated.title, "Attic");
        assert_eq!(updated.address, "1 Main St");
        assert_eq!(updated.perks, vec!["wifi"]);
        assert_eq!(updated.price, Some(80.0));
        assert_eq!(updated.check_in, Some(14));

        let owned = repo.list_places_by_owner(owner).await.unwrap();
        assert_eq!(owned, vec![updated]);
    }

    #[tokio::test]
    #[ignore]
    async fn bookings_expand_their_place_until_it_is_deleted() {
        let repo = repo().await;
        let owner = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let place = repo.create_place(owner, PlaceDraft::default()).await.unwrap();
        let booking = repo.create_booking(guest, booking_for(place.id)).await.unwrap();

        let listed = repo.list_bookings_with_place(guest).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, booking.id);
        assert_eq!(listed[0].place.as_ref(), Some(&place));
        assert_eq!(listed[0].check_in, booking.check_in);

        assert_eq!(repo.delete_place(place.id, owner).await.unwrap(), 1);
        let listed = repo.list_bookings_with_place(guest).await.unwrap();
        assert!(listed[0].place.is_none());
        assert_eq!(repo.booked_ranges(place.id).await.unwrap(), vec![booking.booked_range()]);

        assert_eq!(repo.delete_booking(booking.id, owner).await.unwrap(), 0);
        assert_eq!(repo.delete_booking(booking.id, guest).await.unwrap(), 1);
    }
}
