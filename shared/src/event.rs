use serde::{Deserialize, Serialize};

use crate::capabilities::KvError;
use crate::model::Page;
use crate::offer::Passenger;
use crate::scheduler::TimerId;
use crate::vehicle::{VehicleDetails, VehicleField};
use crate::CoreConfig;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    Noop,

    // Lifecycle
    AppStarted,

    // Availability
    GoOnline,
    GoOffline,

    // Single ride request banner
    SimulateRideRequest,
    AcceptRideRequest { passenger: Passenger },
    DeclineRideRequest,

    // Ticker
    AcceptTickerOffer { index: usize, passenger: Passenger },
    RefreshTicker,
    ToggleTickerView,

    // Ride in progress
    EndRide,

    // Navigation
    ToggleMenu,
    Navigate(Page),
    Back,

    // Settings
    SaveVehicleDetails(VehicleDetails),
    Configure(CoreConfig),
    DismissError,

    // Capability responses
    #[serde(skip)]
    TimerElapsed { id: TimerId },
    #[serde(skip)]
    VehicleFieldLoaded {
        field: VehicleField,
        result: Result<Option<Vec<u8>>, KvError>,
    },
    #[serde(skip)]
    VehicleFieldSaved {
        field: VehicleField,
        result: Result<(), KvError>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::AppStarted => "app_started",
            Self::GoOnline => "go_online",
            Self::GoOffline => "go_offline",
            Self::SimulateRideRequest => "simulate_ride_request",
            Self::AcceptRideRequest { .. } => "accept_ride_request",
            Self::DeclineRideRequest => "decline_ride_request",
            Self::AcceptTickerOffer { .. } => "accept_ticker_offer",
            Self::RefreshTicker => "refresh_ticker",
            Self::ToggleTickerView => "toggle_ticker_view",
            Self::EndRide => "end_ride",
            Self::ToggleMenu => "toggle_menu",
            Self::Navigate(_) => "navigate",
            Self::Back => "back",
            Self::SaveVehicleDetails(_) => "save_vehicle_details",
            Self::Configure(_) => "configure",
            Self::DismissError => "dismiss_error",
            Self::TimerElapsed { .. } => "timer_elapsed",
            Self::VehicleFieldLoaded { .. } => "vehicle_field_loaded",
            Self::VehicleFieldSaved { .. } => "vehicle_field_saved",
        }
    }

    /// Events raised by the driver rather than by a capability response.
    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::Noop
                | Self::AppStarted
                | Self::TimerElapsed { .. }
                | Self::VehicleFieldLoaded { .. }
                | Self::VehicleFieldSaved { .. }
        )
    }
}

impl From<CoreConfig> for Event {
    fn from(config: CoreConfig) -> Self {
        Self::Configure(config)
    }
}
