use std::{collections::HashSet, fmt, fs::File, net::SocketAddr};

use anyhow::Context;
use cucumber::{given, then, when, World as _};
use flyhigh::{
    config::AppConfig,
    db::{init_pool, run_migrations, DbPool},
    models::{
        remote::{NewDestination, NewRemoteTrip, NewTripActivity},
        trip::{Activity, Destination, NewTrip, Trip, TripPatch},
        user::User,
    },
    services::{
        gateway::RemoteCollection,
        trips::{import_remote, TripHandle},
    },
    state::AppState,
};
use serde_json::json;
use tempfile::TempDir;

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    token: Option<String>,
    user: Option<User>,
    saved: Vec<Trip>,
    snapshot: Vec<Trip>,
}

impl AppWorld {
    fn app_state(&self) -> &AppState {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .app()
    }

    fn token(&self) -> &str {
        self.token.as_deref().expect("traveller must be signed in")
    }

    async fn store(&self) -> TripHandle {
        self.app_state()
            .sessions
            .trips(self.token())
            .await
            .expect("session lookup")
            .expect("session must own a trip store")
    }

    fn last_saved(&self) -> &Trip {
        self.saved.last().expect("a trip must have been saved")
    }
}

struct TestState {
    app: AppState,
    config: AppConfig,
    db: DbPool,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new(seed_sample_trips: bool) -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let db_path = root.path().join("bdd.sqlite");
        File::create(&db_path)?;
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cookie_secret: "bdd-cookie-secret".into(),
            seed_sample_trips,
            session_ttl_hours: 1,
        };

        let db = init_pool(&config.database_url).await?;
        run_migrations(&db).await?;

        let app = AppState::new(config.clone(), db.clone());
        Ok(Self {
            app,
            config,
            db,
            _root: root,
        })
    }

    /// Rebuilds the app on the same database, losing all in-memory state.
    fn restart(&mut self) {
        self.app = AppState::new(self.config.clone(), self.db.clone());
    }

    fn app(&self) -> &AppState {
        &self.app
    }
}

fn new_trip(name: &str, country: &str, start: &str, end: &str) -> NewTrip {
    NewTrip {
        name: name.to_string(),
        start_date: start.parse().expect("start date"),
        end_date: end.parse().expect("end date"),
        destination: Destination {
            id: format!("dest-{}", name.to_lowercase()),
            name: name.to_string(),
            country: country.to_string(),
            image: String::new(),
            description: String::new(),
        },
        accommodations: Vec::new(),
        activities: Vec::new(),
        flights: Vec::new(),
        budget: 1500.0,
        notes: None,
    }
}

async fn sign_up(world: &mut AppWorld, email: String, seed: bool) {
    world.state = Some(TestState::new(seed).await.expect("state"));
    let signed = world
        .app_state()
        .sessions
        .register("Traveller", &email, "correct horse")
        .await
        .expect("register traveller");
    world.token = Some(signed.token);
    world.user = Some(signed.user);
    world.saved.clear();
    let store = world.store().await;
    let snapshot = store.read().await.trips().to_vec();
    world.snapshot = snapshot;
}

#[given(regex = r#"^a signed-in traveller \"([^\"]+)\" with sample trips$"#)]
async fn given_traveller_with_samples(world: &mut AppWorld, email: String) {
    sign_up(world, email, true).await;
}

#[given(regex = r#"^a signed-in traveller \"([^\"]+)\" without sample trips$"#)]
async fn given_traveller_without_samples(world: &mut AppWorld, email: String) {
    sign_up(world, email, false).await;
}

#[given(
    regex = r#"^a remote trip \"([^\"]+)\" to \"([^\"]+)\", \"([^\"]+)\" with (\d+) activities for the traveller$"#
)]
async fn given_remote_trip(
    world: &mut AppWorld,
    name: String,
    city: String,
    country: String,
    activities: usize,
) {
    let gateway = &world.app_state().gateway;
    let destination = gateway
        .destinations()
        .create(NewDestination {
            name: city,
            country,
            description: None,
            image_url: None,
            average_rating: None,
        })
        .await
        .expect("create remote destination");
    let user_id = world.user.as_ref().expect("traveller").id.clone();
    gateway
        .trips()
        .create(NewRemoteTrip {
            user_id,
            name,
            destination_id: Some(destination.destination.id),
            start_date: "2025-11-10".parse().expect("date"),
            end_date: "2025-11-17".parse().expect("date"),
            budget: 2500.0,
            notes: None,
            activities: (0..activities)
                .map(|i| NewTripActivity {
                    name: format!("Activity {i}"),
                    kind: "Sightseeing".into(),
                    price: 10.0,
                    duration: "1 hour".into(),
                    location: "Centre".into(),
                    image_url: None,
                })
                .collect(),
            accommodations: Vec::new(),
        })
        .await
        .expect("create remote trip");
}

#[given(regex = r#"^a remote trip without destination for (the traveller|someone else)$"#)]
async fn given_remote_trip_without_destination(world: &mut AppWorld, owner: String) {
    let user_id = if owner == "the traveller" {
        world.user.as_ref().expect("traveller").id.clone()
    } else {
        "someone-else".to_string()
    };
    world
        .app_state()
        .gateway
        .trips()
        .create(NewRemoteTrip {
            user_id,
            name: "Mystery weekend".into(),
            destination_id: None,
            start_date: "2025-03-01".parse().expect("date"),
            end_date: "2025-03-03".parse().expect("date"),
            budget: 400.0,
            notes: None,
            activities: Vec::new(),
            accommodations: Vec::new(),
        })
        .await
        .expect("create remote trip");
}

#[when(regex = r#"^I save (\d+) trips to \"([^\"]+)\" from \"([^\"]+)\" to \"([^\"]+)\"$"#)]
async fn when_save_many(
    world: &mut AppWorld,
    count: usize,
    country: String,
    start: String,
    end: String,
) {
    let store = world.store().await;
    for i in 0..count {
        let trip = store
            .write()
            .await
            .save_trip(new_trip(&format!("Trip {i}"), &country, &start, &end));
        world.saved.push(trip);
    }
}

#[when(regex = r#"^I save a trip \"([^\"]+)\" to \"([^\"]+)\" from \"([^\"]+)\" to \"([^\"]+)\"$"#)]
async fn when_save_trip(
    world: &mut AppWorld,
    name: String,
    country: String,
    start: String,
    end: String,
) {
    let store = world.store().await;
    let trip = store
        .write()
        .await
        .save_trip(new_trip(&name, &country, &start, &end));
    world.saved.push(trip);
}

#[when(regex = r#"^I add an activity \"([^\"]+)\" to the last trip$"#)]
async fn when_add_activity(world: &mut AppWorld, name: String) {
    let store = world.store().await;
    let mut activities = world.last_saved().activities.clone();
    activities.push(Activity {
        id: format!("act-{}", activities.len() + 1),
        name,
        kind: "Sightseeing".into(),
        price: 25.0,
        duration: "2 hours".into(),
        location: "Centre".into(),
        image: None,
    });
    let id = world.last_saved().id.clone();
    let patch = TripPatch {
        activities: Some(activities),
        ..Default::default()
    };
    store.write().await.update_trip(&id, patch).expect("trip exists");
}

#[when(regex = r"^I set the last trip's budget to (\d+) with a forged id and creation time$")]
async fn when_forged_update(world: &mut AppWorld, budget: u32) {
    let store = world.store().await;
    let id = world.last_saved().id.clone();
    let patch: TripPatch = serde_json::from_value(json!({
        "id": "forged-id",
        "createdAt": "2000-01-01T00:00:00Z",
        "budget": budget,
    }))
    .expect("patch payload");
    store.write().await.update_trip(&id, patch);
}

#[when(regex = r#"^I rename trip \"([^\"]+)\" to \"([^\"]+)\"$"#)]
async fn when_rename(world: &mut AppWorld, id: String, name: String) {
    let store = world.store().await;
    let patch = TripPatch {
        name: Some(name),
        ..Default::default()
    };
    store.write().await.update_trip(&id, patch);
}

#[when(regex = r#"^I delete trip \"([^\"]+)\"$"#)]
async fn when_delete(world: &mut AppWorld, id: String) {
    let store = world.store().await;
    store.write().await.delete_trip(&id);
}

#[when("I delete the first saved trip")]
async fn when_delete_first(world: &mut AppWorld) {
    let store = world.store().await;
    let id = world.saved.first().expect("saved trip").id.clone();
    store.write().await.delete_trip(&id);
}

#[when("I import my remote trips")]
async fn when_import(world: &mut AppWorld) {
    let user_id = world.user.as_ref().expect("traveller").id.clone();
    let store = world.store().await;
    let imported = {
        let mut store = store.write().await;
        import_remote(&world.app_state().gateway, &mut store, &user_id)
            .await
            .expect("import remote trips")
    };
    world.saved.extend(imported);
}

#[when("the service restarts")]
async fn when_restart(world: &mut AppWorld) {
    world.state.as_mut().expect("state").restart();
}

#[when("I log out")]
async fn when_logout(world: &mut AppWorld) {
    let token = world.token().to_string();
    let ended = world.app_state().sessions.logout(&token).await;
    assert!(ended.expect("logout"));
}

#[then(regex = r"^the store holds (\d+) trips?$")]
async fn then_store_holds(world: &mut AppWorld, expected: usize) {
    let store = world.store().await;
    let store = store.read().await;
    assert_eq!(store.count(), expected);
    assert_eq!(store.iter().count(), expected);
}

#[then("every trip has a unique id")]
async fn then_unique_ids(world: &mut AppWorld) {
    let store = world.store().await;
    let store = store.read().await;
    let ids: HashSet<_> = store.iter().map(|trip| trip.id.clone()).collect();
    assert_eq!(ids.len(), store.count());
}

#[then(
    regex = r"^the stats are (\d+) trips, (\d+) activities, (-?\d+) travel days and (\d+) countries$"
)]
async fn then_stats(
    world: &mut AppWorld,
    trips: usize,
    activities: usize,
    days: i64,
    countries: usize,
) {
    let store = world.store().await;
    let stats = store.read().await.stats();
    assert_eq!(stats.trips, trips);
    assert_eq!(stats.activities, activities);
    assert_eq!(stats.travel_days, days);
    assert_eq!(stats.countries, countries);
}

#[then(regex = r"^the stats report (\d+) countries$")]
async fn then_countries(world: &mut AppWorld, expected: usize) {
    let store = world.store().await;
    assert_eq!(store.read().await.distinct_countries(), expected);
}

#[then(regex = r"^the stats report (-?\d+) travel days$")]
async fn then_travel_days(world: &mut AppWorld, expected: i64) {
    let store = world.store().await;
    assert_eq!(store.read().await.total_travel_days(), expected);
}

#[then(regex = r"^the last trip has budget (\d+) and its original id and creation time$")]
async fn then_identity_preserved(world: &mut AppWorld, budget: u32) {
    let store = world.store().await;
    let saved = world.last_saved();
    let store = store.read().await;
    let current = store.get_trip_by_id(&saved.id).expect("trip still stored");
    assert_eq!(current.budget, f64::from(budget));
    assert_eq!(current.id, saved.id);
    assert_eq!(current.created_at, saved.created_at);
    assert_eq!(current.name, saved.name);
    assert!(store.get_trip_by_id("forged-id").is_none());
}

#[then("the last trip has no notes")]
async fn then_no_notes(world: &mut AppWorld) {
    let store = world.store().await;
    let id = world.last_saved().id.clone();
    let store = store.read().await;
    assert!(store.get_trip_by_id(&id).expect("stored").notes.is_none());
}

#[then("the collection is unchanged")]
async fn then_unchanged(world: &mut AppWorld) {
    let store = world.store().await;
    assert_eq!(store.read().await.trips(), world.snapshot.as_slice());
}

#[then("the first saved trip is gone")]
async fn then_first_gone(world: &mut AppWorld) {
    let store = world.store().await;
    let id = world.saved.first().expect("saved trip").id.clone();
    assert!(store.read().await.get_trip_by_id(&id).is_none());
}

#[then(regex = r#"^the store contains a trip to \"([^\"]+)\" with (\d+) activities$"#)]
async fn then_contains_trip(world: &mut AppWorld, city: String, activities: usize) {
    let store = world.store().await;
    let store = store.read().await;
    let trip = store
        .iter()
        .find(|trip| trip.destination.name == city)
        .expect("imported trip present");
    assert_eq!(trip.activities.len(), activities);
}

#[then(regex = r#"^I am still signed in as \"([^\"]+)\"$"#)]
async fn then_still_signed_in(world: &mut AppWorld, email: String) {
    let user = world
        .app_state()
        .sessions
        .current_user(world.token())
        .await
        .expect("lookup")
        .expect("session survives");
    assert_eq!(user.email, email);
}

#[then("I am no longer authenticated")]
async fn then_logged_out(world: &mut AppWorld) {
    let sessions = &world.app_state().sessions;
    assert!(!sessions.is_authenticated(world.token()).await.expect("lookup"));
    assert!(sessions.trips(world.token()).await.expect("lookup").is_none());
}

#[then(regex = r#"^I can log in again as \"([^\"]+)\" and start with (\d+) trips?$"#)]
async fn then_login_again(world: &mut AppWorld, email: String, expected: usize) {
    let sessions = world.app_state().sessions.clone();
    let signed = sessions.login(&email, "correct horse").await.expect("login");
    let store = sessions
        .trips(&signed.token)
        .await
        .expect("lookup")
        .expect("fresh store");
    assert_eq!(store.read().await.count(), expected);
    world.token = Some(signed.token);
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
