use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::lifecycle::RequestLifecycle;
use crate::offer::{OfferPool, Passenger, RideOffer};
use crate::random::{RandomSource, SeededRandom};
use crate::ticker::TickerQueue;
use crate::vehicle::VehicleDetails;
use crate::{AppError, CoreConfig, MAX_PAST_RIDES};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Offline,
    Online,
}

impl Availability {
    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    #[default]
    Home,
    PastRides,
    PromiseToPay,
    Settings,
}

/// Where an accepted offer came from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RideSource {
    Banner,
    Ticker,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ActiveRide {
    pub offer: RideOffer,
    pub passenger: Passenger,
    pub source: RideSource,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CompletedRide {
    pub offer: RideOffer,
    pub passenger: Passenger,
}

/// Screen-level coordinator state. Each concern is its own value; the ride
/// request machines are only mutated through `app::App::update`.
#[derive(Debug)]
pub struct Model {
    pub availability: Availability,
    pub page: Page,
    pub menu_open: bool,

    pub ticker: TickerQueue,
    pub lifecycle: RequestLifecycle,
    pub pool: OfferPool,
    pub random: Box<dyn RandomSource>,
    pub config: CoreConfig,

    /// Passenger handed over with a banner accept, held until the close
    /// delay elapses and the accept signal arrives.
    pub pending_passenger: Option<Passenger>,
    pub active_ride: Option<ActiveRide>,
    pub past_rides: VecDeque<CompletedRide>,

    pub vehicle: VehicleDetails,
    pub active_error: Option<AppError>,
}

impl Default for Model {
    fn default() -> Self {
        Self::with_random(Box::new(SeededRandom::from_entropy()))
    }
}

impl Model {
    #[must_use]
    pub fn with_random(random: Box<dyn RandomSource>) -> Self {
        Self::with_config(CoreConfig::default(), random)
    }

    #[must_use]
    pub fn with_config(config: CoreConfig, random: Box<dyn RandomSource>) -> Self {
        Self {
            availability: Availability::Offline,
            page: Page::Home,
            menu_open: false,
            ticker: TickerQueue::new(config.ticker.clone()),
            lifecycle: RequestLifecycle::new(config.lifecycle.clone()),
            pool: OfferPool::sample(),
            random,
            config,
            pending_passenger: None,
            active_ride: None,
            past_rides: VecDeque::new(),
            vehicle: VehicleDetails::default(),
            active_error: None,
        }
    }

    pub fn apply_config(&mut self, config: CoreConfig) {
        self.ticker.set_config(config.ticker.clone());
        self.lifecycle.set_config(config.lifecycle.clone());
        self.config = config;
    }

    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    /// Moves the active ride into history, most recent first.
    pub fn complete_ride(&mut self) -> Option<&CompletedRide> {
        let ride = self.active_ride.take()?;
        self.past_rides.push_front(CompletedRide {
            offer: ride.offer,
            passenger: ride.passenger,
        });
        self.past_rides.truncate(MAX_PAST_RIDES);
        self.past_rides.front()
    }
}
