//! Records exchanged with the remote data gateway. Column names follow the
//! backend schema (snake_case), unlike the camelCase session models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};

use crate::models::trip::{Accommodation, Activity, Destination, NewTrip};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub travel_preferences: Option<Json<Vec<String>>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub travel_preferences: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub travel_preferences: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DestinationRow {
    pub id: String,
    pub name: String,
    pub country: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub average_rating: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl DestinationRow {
    pub fn to_destination(&self) -> Destination {
        Destination {
            id: self.id.clone(),
            name: self.name.clone(),
            country: self.country.clone(),
            image: self.image_url.clone().unwrap_or_default(),
            description: self.description.clone().unwrap_or_default(),
        }
    }
}

/// A destination together with its reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDestination {
    #[serde(flatten)]
    pub destination: DestinationRow,
    pub reviews: Vec<Review>,
}

impl RemoteDestination {
    /// Case-insensitive substring match on name or country. Blank queries
    /// match every destination.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.destination.name.to_lowercase().contains(&query)
            || self.destination.country.to_lowercase().contains(&query)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDestination {
    pub name: String,
    pub country: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DestinationUpdate {
    pub name: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: String,
    pub destination_id: String,
    pub user_id: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub destination_id: String,
    pub user_id: String,
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewUpdate {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TripRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub destination_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TripActivityRow {
    pub id: String,
    pub trip_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: f64,
    pub duration: String,
    pub location: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TripAccommodationRow {
    pub id: String,
    pub trip_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: f64,
    pub location: String,
    pub image_url: Option<String>,
}

/// A trip row joined with its destination, activities and accommodations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTrip {
    #[serde(flatten)]
    pub trip: TripRow,
    pub destination: Option<DestinationRow>,
    pub activities: Vec<TripActivityRow>,
    pub accommodations: Vec<TripAccommodationRow>,
}

impl RemoteTrip {
    /// Converts into store input. Trips without a destination can't be
    /// represented in the session store and yield `None`. The remote schema
    /// has no flights.
    pub fn into_new_trip(self) -> Option<NewTrip> {
        let destination = self.destination?.to_destination();
        let activities = self
            .activities
            .into_iter()
            .map(|row| Activity {
                id: row.id,
                name: row.name,
                kind: row.kind,
                price: row.price,
                duration: row.duration,
                location: row.location,
                image: row.image_url,
            })
            .collect();
        let accommodations = self
            .accommodations
            .into_iter()
            .map(|row| Accommodation {
                id: row.id,
                name: row.name,
                kind: row.kind,
                price: row.price,
                location: row.location,
                image: row.image_url.unwrap_or_default(),
            })
            .collect();

        Some(NewTrip {
            name: self.trip.name,
            start_date: self.trip.start_date,
            end_date: self.trip.end_date,
            destination,
            accommodations,
            activities,
            flights: Vec::new(),
            budget: self.trip.budget,
            notes: self.trip.notes,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTripActivity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: f64,
    pub duration: String,
    pub location: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTripAccommodation {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: f64,
    pub location: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRemoteTrip {
    pub user_id: String,
    pub name: String,
    pub destination_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: f64,
    pub notes: Option<String>,
    #[serde(default)]
    pub activities: Vec<NewTripActivity>,
    #[serde(default)]
    pub accommodations: Vec<NewTripAccommodation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteTripUpdate {
    pub name: Option<String>,
    pub destination_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    pub notes: Option<String>,
}
