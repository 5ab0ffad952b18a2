use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::models::trip::{Accommodation, Activity, Destination, Flight, Trip};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("sample dates are valid")
}

fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d)
        .and_hms_opt(h, min, 0)
        .expect("sample times are valid")
}

/// Trips every fresh session starts with when seeding is enabled.
pub fn sample_trips() -> Vec<Trip> {
    vec![Trip {
        id: "1".into(),
        name: "Tokyo Adventure".into(),
        start_date: date(2025, 5, 15),
        end_date: date(2025, 5, 25),
        destination: Destination {
            id: "1".into(),
            name: "Tokyo".into(),
            country: "Japan".into(),
            image: "https://images.pexels.com/photos/2506923/pexels-photo-2506923.jpeg".into(),
            description: "Tokyo, Japan's busy capital, mixes the ultramodern and the traditional, from neon-lit skyscrapers to historic temples.".into(),
        },
        accommodations: vec![Accommodation {
            id: "a1".into(),
            name: "Shinjuku Grand Hotel".into(),
            kind: "Hotel".into(),
            price: 150.0,
            location: "Shinjuku, Tokyo".into(),
            image: "https://images.pexels.com/photos/237371/pexels-photo-237371.jpeg".into(),
        }],
        activities: vec![Activity {
            id: "act1".into(),
            name: "Tokyo Tower Visit".into(),
            kind: "Sightseeing".into(),
            price: 30.0,
            duration: "3 hours".into(),
            location: "Minato, Tokyo".into(),
            image: Some("https://images.pexels.com/photos/5007442/pexels-photo-5007442.jpeg".into()),
        }],
        flights: vec![Flight {
            id: "f1".into(),
            airline: "ANA".into(),
            flight_number: "NH105".into(),
            departure_city: "New York".into(),
            arrival_city: "Tokyo".into(),
            departure_time: datetime(2025, 5, 15, 10, 0),
            arrival_time: datetime(2025, 5, 16, 14, 30),
            price: 1200.0,
        }],
        budget: 3000.0,
        notes: None,
        created_at: Utc.from_utc_datetime(&datetime(2024, 3, 10, 12, 0)),
    }]
}
