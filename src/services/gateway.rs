//! CRUD pass-through to the hosted backend, served here from SQLite.
//!
//! Each collection follows the same contract: `get` and `update` fail with
//! `NotFound` when nothing matches, `delete` succeeds either way, and every
//! backend failure surfaces as the underlying `sqlx::Error`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tracing::debug;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::remote::{
        DestinationRow, DestinationUpdate, NewDestination, NewProfile, NewRemoteTrip, NewReview,
        Profile, ProfileUpdate, RemoteDestination, RemoteTrip, RemoteTripUpdate, Review,
        ReviewUpdate, TripAccommodationRow, TripActivityRow, TripRow,
    },
};

#[async_trait]
pub trait RemoteCollection: Send + Sync {
    type Record: Send;
    type Insert: Send;
    type Patch: Send;

    async fn list(&self) -> Result<Vec<Self::Record>, AppError>;
    async fn get(&self, id: &str) -> Result<Self::Record, AppError>;
    async fn create(&self, input: Self::Insert) -> Result<Self::Record, AppError>;
    async fn update(&self, id: &str, patch: Self::Patch) -> Result<Self::Record, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct RemoteGateway {
    pool: DbPool,
}

impl RemoteGateway {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn profiles(&self) -> Profiles {
        Profiles {
            pool: self.pool.clone(),
        }
    }

    pub fn trips(&self) -> Trips {
        Trips {
            pool: self.pool.clone(),
        }
    }

    pub fn destinations(&self) -> Destinations {
        Destinations {
            pool: self.pool.clone(),
        }
    }

    pub fn reviews(&self) -> Reviews {
        Reviews {
            pool: self.pool.clone(),
        }
    }
}

pub struct Profiles {
    pool: DbPool,
}

#[async_trait]
impl RemoteCollection for Profiles {
    type Record = Profile;
    type Insert = NewProfile;
    type Patch = ProfileUpdate;

    async fn list(&self) -> Result<Vec<Profile>, AppError> {
        let rows = sqlx::query_as::<_, Profile>("SELECT * FROM profiles ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get(&self, id: &str) -> Result<Profile, AppError> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn create(&self, input: NewProfile) -> Result<Profile, AppError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, Profile>(
            "INSERT INTO profiles (id, name, avatar_url, location, travel_preferences, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(&input.id)
        .bind(&input.name)
        .bind(&input.avatar_url)
        .bind(&input.location)
        .bind(input.travel_preferences.map(Json))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        debug!(profile_id = %row.id, "remote profile created");
        Ok(row)
    }

    async fn update(&self, id: &str, patch: ProfileUpdate) -> Result<Profile, AppError> {
        sqlx::query_as::<_, Profile>(
            "UPDATE profiles SET
                name = COALESCE(?, name),
                avatar_url = COALESCE(?, avatar_url),
                location = COALESCE(?, location),
                travel_preferences = COALESCE(?, travel_preferences),
                updated_at = ?
             WHERE id = ?
             RETURNING *",
        )
        .bind(patch.name)
        .bind(patch.avatar_url)
        .bind(patch.location)
        .bind(patch.travel_preferences.map(Json))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub struct Destinations {
    pool: DbPool,
}

impl Destinations {
    /// Destinations whose name or country contains `query`, ignoring case.
    /// A blank query matches everything.
    pub async fn search(&self, query: &str) -> Result<Vec<RemoteDestination>, AppError> {
        let all = self.list().await?;
        Ok(all
            .into_iter()
            .filter(|destination| destination.matches_query(query))
            .collect())
    }

    async fn with_reviews(
        &self,
        destination: DestinationRow,
    ) -> Result<RemoteDestination, AppError> {
        let reviews = reviews_for(&self.pool, &destination.id).await?;
        Ok(RemoteDestination {
            destination,
            reviews,
        })
    }
}

#[async_trait]
impl RemoteCollection for Destinations {
    type Record = RemoteDestination;
    type Insert = NewDestination;
    type Patch = DestinationUpdate;

    async fn list(&self) -> Result<Vec<RemoteDestination>, AppError> {
        let rows =
            sqlx::query_as::<_, DestinationRow>("SELECT * FROM destinations ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.with_reviews(row).await?);
        }
        Ok(out)
    }

    async fn get(&self, id: &str) -> Result<RemoteDestination, AppError> {
        let row = sqlx::query_as::<_, DestinationRow>("SELECT * FROM destinations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)?;
        self.with_reviews(row).await
    }

    async fn create(&self, input: NewDestination) -> Result<RemoteDestination, AppError> {
        let row = sqlx::query_as::<_, DestinationRow>(
            "INSERT INTO destinations (id, name, country, description, image_url, average_rating, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&input.name)
        .bind(&input.country)
        .bind(&input.description)
        .bind(&input.image_url)
        .bind(input.average_rating)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        debug!(destination_id = %row.id, "remote destination created");
        Ok(RemoteDestination {
            destination: row,
            reviews: Vec::new(),
        })
    }

    async fn update(
        &self,
        id: &str,
        patch: DestinationUpdate,
    ) -> Result<RemoteDestination, AppError> {
        let row = sqlx::query_as::<_, DestinationRow>(
            "UPDATE destinations SET
                name = COALESCE(?, name),
                country = COALESCE(?, country),
                description = COALESCE(?, description),
                image_url = COALESCE(?, image_url),
                average_rating = COALESCE(?, average_rating)
             WHERE id = ?
             RETURNING *",
        )
        .bind(patch.name)
        .bind(patch.country)
        .bind(patch.description)
        .bind(patch.image_url)
        .bind(patch.average_rating)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)?;
        self.with_reviews(row).await
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM destinations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

async fn reviews_for(pool: &DbPool, destination_id: &str) -> Result<Vec<Review>, AppError> {
    let rows = sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE destination_id = ? ORDER BY created_at",
    )
    .bind(destination_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub struct Reviews {
    pool: DbPool,
}

#[async_trait]
impl RemoteCollection for Reviews {
    type Record = Review;
    type Insert = NewReview;
    type Patch = ReviewUpdate;

    async fn list(&self) -> Result<Vec<Review>, AppError> {
        let rows = sqlx::query_as::<_, Review>("SELECT * FROM reviews ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get(&self, id: &str) -> Result<Review, AppError> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn create(&self, input: NewReview) -> Result<Review, AppError> {
        let row = sqlx::query_as::<_, Review>(
            "INSERT INTO reviews (id, destination_id, user_id, rating, comment, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&input.destination_id)
        .bind(&input.user_id)
        .bind(input.rating)
        .bind(&input.comment)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        debug!(review_id = %row.id, destination_id = %row.destination_id, "remote review created");
        Ok(row)
    }

    async fn update(&self, id: &str, patch: ReviewUpdate) -> Result<Review, AppError> {
        sqlx::query_as::<_, Review>(
            "UPDATE reviews SET
                rating = COALESCE(?, rating),
                comment = COALESCE(?, comment)
             WHERE id = ?
             RETURNING *",
        )
        .bind(patch.rating)
        .bind(patch.comment)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub struct Trips {
    pool: DbPool,
}

impl Trips {
    /// Remote trips owned by `user_id`, ordered by start date.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<RemoteTrip>, AppError> {
        let rows = sqlx::query_as::<_, TripRow>(
            "SELECT * FROM trips WHERE user_id = ? ORDER BY start_date ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.joined(row).await?);
        }
        Ok(out)
    }

    async fn joined(&self, trip: TripRow) -> Result<RemoteTrip, AppError> {
        let destination = match &trip.destination_id {
            Some(id) => {
                sqlx::query_as::<_, DestinationRow>("SELECT * FROM destinations WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };
        let activities = sqlx::query_as::<_, TripActivityRow>(
            "SELECT * FROM trip_activities WHERE trip_id = ? ORDER BY position",
        )
        .bind(&trip.id)
        .fetch_all(&self.pool)
        .await?;
        let accommodations = sqlx::query_as::<_, TripAccommodationRow>(
            "SELECT * FROM trip_accommodations WHERE trip_id = ? ORDER BY position",
        )
        .bind(&trip.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(RemoteTrip {
            trip,
            destination,
            activities,
            accommodations,
        })
    }
}

#[async_trait]
impl RemoteCollection for Trips {
    type Record = RemoteTrip;
    type Insert = NewRemoteTrip;
    type Patch = RemoteTripUpdate;

    async fn list(&self) -> Result<Vec<RemoteTrip>, AppError> {
        let rows = sqlx::query_as::<_, TripRow>("SELECT * FROM trips ORDER BY start_date ASC")
            .fetch_all(&self.pool)
            .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.joined(row).await?);
        }
        Ok(out)
    }

    async fn get(&self, id: &str) -> Result<RemoteTrip, AppError> {
        let row = sqlx::query_as::<_, TripRow>("SELECT * FROM trips WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)?;
        self.joined(row).await
    }

    async fn create(&self, input: NewRemoteTrip) -> Result<RemoteTrip, AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TripRow>(
            "INSERT INTO trips (id, user_id, name, destination_id, start_date, end_date, budget, notes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&input.user_id)
        .bind(&input.name)
        .bind(&input.destination_id)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.budget)
        .bind(&input.notes)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for (position, activity) in input.activities.iter().enumerate() {
            sqlx::query(
                "INSERT INTO trip_activities (id, trip_id, position, name, kind, price, duration, location, image_url)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&row.id)
            .bind(position as i64)
            .bind(&activity.name)
            .bind(&activity.kind)
            .bind(activity.price)
            .bind(&activity.duration)
            .bind(&activity.location)
            .bind(&activity.image_url)
            .execute(&mut *tx)
            .await?;
        }

        for (position, accommodation) in input.accommodations.iter().enumerate() {
            sqlx::query(
                "INSERT INTO trip_accommodations (id, trip_id, position, name, kind, price, location, image_url)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&row.id)
            .bind(position as i64)
            .bind(&accommodation.name)
            .bind(&accommodation.kind)
            .bind(accommodation.price)
            .bind(&accommodation.location)
            .bind(&accommodation.image_url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(trip_id = %row.id, "remote trip created");
        self.joined(row).await
    }

    async fn update(&self, id: &str, patch: RemoteTripUpdate) -> Result<RemoteTrip, AppError> {
        let row = sqlx::query_as::<_, TripRow>(
            "UPDATE trips SET
                name = COALESCE(?, name),
                destination_id = COALESCE(?, destination_id),
                start_date = COALESCE(?, start_date),
                end_date = COALESCE(?, end_date),
                budget = COALESCE(?, budget),
                notes = COALESCE(?, notes),
                updated_at = ?
             WHERE id = ?
             RETURNING *",
        )
        .bind(patch.name)
        .bind(patch.destination_id)
        .bind(patch.start_date)
        .bind(patch.end_date)
        .bind(patch.budget)
        .bind(patch.notes)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)?;
        self.joined(row).await
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM trips WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
