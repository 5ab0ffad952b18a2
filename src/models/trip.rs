use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MILLIS_PER_DAY: i64 = 1000 * 60 * 60 * 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    pub name: String,
    pub country: String,
    pub image: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accommodation {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: f64,
    pub location: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: f64,
    pub duration: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: String,
    pub airline: String,
    pub flight_number: String,
    pub departure_city: String,
    pub arrival_city: String,
    pub departure_time: NaiveDateTime,
    pub arrival_time: NaiveDateTime,
    pub price: f64,
}

/// A planned journey. `id` and `created_at` are owned by the store that
/// created the record and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub destination: Destination,
    #[serde(default)]
    pub accommodations: Vec<Accommodation>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub flights: Vec<Flight>,
    pub budget: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub(crate) fn from_new(input: NewTrip) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            start_date: input.start_date,
            end_date: input.end_date,
            destination: input.destination,
            accommodations: input.accommodations,
            activities: input.activities,
            flights: input.flights,
            budget: input.budget,
            notes: input.notes,
            created_at: Utc::now(),
        }
    }

    /// Whole days between start and end, rounded up.
    ///
    /// Date ordering is not validated: an end date before the start date
    /// yields a negative count, and aggregate sums carry it as-is.
    pub fn travel_days(&self) -> i64 {
        let millis = self
            .end_date
            .signed_duration_since(self.start_date)
            .num_milliseconds();
        ceil_div(millis, MILLIS_PER_DAY)
    }

    /// Shallow merge: every field present in `patch` replaces the stored one.
    pub fn apply(&mut self, patch: TripPatch) {
        let TripPatch {
            name,
            start_date,
            end_date,
            destination,
            accommodations,
            activities,
            flights,
            budget,
            notes,
        } = patch;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(start_date) = start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = end_date {
            self.end_date = end_date;
        }
        if let Some(destination) = destination {
            self.destination = destination;
        }
        if let Some(accommodations) = accommodations {
            self.accommodations = accommodations;
        }
        if let Some(activities) = activities {
            self.activities = activities;
        }
        if let Some(flights) = flights {
            self.flights = flights;
        }
        if let Some(budget) = budget {
            self.budget = budget;
        }
        if let Some(notes) = notes {
            self.notes = notes;
        }
    }
}

fn ceil_div(value: i64, divisor: i64) -> i64 {
    let quotient = value.div_euclid(divisor);
    if value.rem_euclid(divisor) == 0 {
        quotient
    } else {
        quotient + 1
    }
}

/// Trip input without the store-assigned `id` and `createdAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrip {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub destination: Destination,
    #[serde(default)]
    pub accommodations: Vec<Accommodation>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub flights: Vec<Flight>,
    pub budget: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Partial update for a stored trip.
///
/// Has no `id` or `createdAt` field, so serde drops those keys
/// when they show up in a payload. `notes: null` clears the notes while an
/// omitted `notes` keeps them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accommodations: Option<Vec<Accommodation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activities: Option<Vec<Activity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flights: Option<Vec<Flight>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub notes: Option<Option<String>>,
}
