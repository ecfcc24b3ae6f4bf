#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod capabilities;
pub mod event;
pub mod lifecycle;
pub mod model;
pub mod offer;
pub mod random;
pub mod sampling;
pub mod scheduler;
pub mod ticker;
pub mod vehicle;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::Model;

pub const DEFAULT_ROTATION_VISIBLE_MS: u64 = 5_000;
pub const DEFAULT_ROTATION_EXIT_MS: u64 = 500;
pub const DEFAULT_BATCH_MIN: usize = 3;
pub const DEFAULT_BATCH_MAX: usize = 6;
pub const DEFAULT_MAX_REMOVED_PER_REFRESH: usize = 2;
pub const DEFAULT_MIN_ADDED_PER_REFRESH: usize = 1;
pub const DEFAULT_MAX_ADDED_PER_REFRESH: usize = 2;
pub const DEFAULT_TICK_MS: u64 = 1_000;
pub const DEFAULT_CLOSE_DELAY_MS: u64 = 300;
pub const MAX_PAST_RIDES: usize = 50;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    InvalidState,
    Configuration,
    Storage,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::InvalidState => "INVALID_STATE",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Storage => "STORAGE_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Storage | Self::InvalidState => ErrorSeverity::Transient,
            Self::Validation | Self::Configuration => ErrorSeverity::Permanent,
            Self::Internal => ErrorSeverity::Fatal,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Storage)
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{code}: {message}", code = .kind.code())]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && matches!(self.severity, ErrorSeverity::Transient)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation | ErrorKind::InvalidState | ErrorKind::Configuration => {
                self.message.clone()
            }
            ErrorKind::Storage => {
                "Unable to access vehicle details on this device. Please try again.".into()
            }
            ErrorKind::Internal => "Something went wrong. Please try again.".into(),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{min_field} ({min}) must not exceed {max_field} ({max})")]
    InvertedRange {
        min_field: &'static str,
        max_field: &'static str,
        min: usize,
        max: usize,
    },

    #[error("invalid configuration: {0}")]
    Parse(String),
}

/// Rotation and refresh tuning for the ticker.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct TickerConfig {
    pub visible_ms: u64,
    pub exit_ms: u64,
    pub batch_min: usize,
    pub batch_max: usize,
    pub max_removed_per_refresh: usize,
    pub min_added_per_refresh: usize,
    pub max_added_per_refresh: usize,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            visible_ms: DEFAULT_ROTATION_VISIBLE_MS,
            exit_ms: DEFAULT_ROTATION_EXIT_MS,
            batch_min: DEFAULT_BATCH_MIN,
            batch_max: DEFAULT_BATCH_MAX,
            max_removed_per_refresh: DEFAULT_MAX_REMOVED_PER_REFRESH,
            min_added_per_refresh: DEFAULT_MIN_ADDED_PER_REFRESH,
            max_added_per_refresh: DEFAULT_MAX_ADDED_PER_REFRESH,
        }
    }
}

impl TickerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.visible_ms == 0 {
            return Err(ConfigError::Zero { field: "visible_ms" });
        }
        if self.batch_min == 0 {
            return Err(ConfigError::Zero { field: "batch_min" });
        }
        if self.batch_min > self.batch_max {
            return Err(ConfigError::InvertedRange {
                min_field: "batch_min",
                max_field: "batch_max",
                min: self.batch_min,
                max: self.batch_max,
            });
        }
        if self.min_added_per_refresh > self.max_added_per_refresh {
            return Err(ConfigError::InvertedRange {
                min_field: "min_added_per_refresh",
                max_field: "max_added_per_refresh",
                min: self.min_added_per_refresh,
                max: self.max_added_per_refresh,
            });
        }
        Ok(())
    }
}

/// Countdown tuning for the single-offer banner. A zero close delay closes
/// the banner within the deciding call.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct LifecycleConfig {
    pub tick_ms: u64,
    pub close_delay_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            close_delay_ms: DEFAULT_CLOSE_DELAY_MS,
        }
    }
}

impl LifecycleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::Zero { field: "tick_ms" });
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CoreConfig {
    pub ticker: TickerConfig,
    pub lifecycle: LifecycleConfig,
}

impl CoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ticker.validate()?;
        self.lifecycle.validate()
    }

    /// Parses and validates a shell-supplied configuration. Missing fields
    /// take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// View model
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OfferView {
    pub pickup: String,
    pub destination: String,
    pub fare: String,
    pub distance: String,
    pub duration: String,
    pub timeout_seconds: u32,
}

impl From<&offer::RideOffer> for OfferView {
    fn from(offer: &offer::RideOffer) -> Self {
        Self {
            pickup: offer.pickup().to_string(),
            destination: offer.destination().to_string(),
            fare: offer.fare_descriptor().to_string(),
            distance: offer.distance().to_string(),
            duration: offer.duration().to_string(),
            timeout_seconds: offer.timeout_seconds(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TickerView {
    pub status: ticker::TickerStatus,
    pub view_mode: ticker::ViewMode,
    pub offers: Vec<OfferView>,
    pub current_index: Option<usize>,
    pub count_label: Option<String>,
    pub is_exiting: bool,
    pub is_rotation_active: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LifecycleView {
    pub tag: lifecycle::LifecycleTag,
    pub offer: Option<OfferView>,
    pub remaining_seconds: Option<u32>,
    pub progress: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RideView {
    pub offer: OfferView,
    pub passenger_name: String,
    pub passenger_rating: f32,
    pub passenger_phone: String,
}

impl RideView {
    fn new(offer: &offer::RideOffer, passenger: &offer::Passenger) -> Self {
        Self {
            offer: offer.into(),
            passenger_name: passenger.name.clone(),
            passenger_rating: passenger.rating,
            passenger_phone: passenger.phone.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VehicleView {
    pub number: String,
    pub class: Option<vehicle::VehicleClass>,
    pub model: String,
    pub number_label: String,
    pub class_label: String,
    pub model_label: String,
}

impl From<&vehicle::VehicleDetails> for VehicleView {
    fn from(details: &vehicle::VehicleDetails) -> Self {
        Self {
            number: details.number.clone(),
            class: details.class,
            model: details.model.clone(),
            number_label: details.display_number().to_string(),
            class_label: details.display_class().to_string(),
            model_label: details.display_model().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserFacingError {
    pub code: String,
    pub message: String,
    pub is_retryable: bool,
}

impl From<&AppError> for UserFacingError {
    fn from(error: &AppError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.user_facing_message(),
            is_retryable: error.is_retryable(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ViewModel {
    pub availability: model::Availability,
    pub page: model::Page,
    pub menu_open: bool,
    pub ticker: TickerView,
    pub lifecycle: LifecycleView,
    pub active_ride: Option<RideView>,
    pub past_rides: Vec<RideView>,
    pub vehicle: VehicleView,
    pub error: Option<UserFacingError>,
}

pub mod app {
    use tracing::{debug, error, info, instrument, warn};

    use super::*;
    use crate::capabilities::{decode_text, encode_text, Capabilities, KvError, TimerOutput};
    use crate::lifecycle::{LifecycleSignal, LifecycleTag};
    use crate::model::{ActiveRide, Availability, Model, Page, RideSource};
    use crate::offer::{Passenger, RideOffer};
    use crate::scheduler::TimerOwner;
    use crate::vehicle::{VehicleDetails, VehicleField};

    #[derive(Default)]
    pub struct App;

    impl App {
        /// Turns every timer command the state machines queued into a
        /// capability request.
        fn dispatch_timers(model: &mut Model, caps: &Capabilities) {
            let commands = model
                .ticker
                .take_timer_commands()
                .into_iter()
                .chain(model.lifecycle.take_timer_commands());

            for command in commands {
                debug!(?command, "dispatching timer command");
                caps.timer.dispatch(&command, |output| match output {
                    TimerOutput::Fired { id } => Event::TimerElapsed { id },
                    TimerOutput::Cancelled { .. } => Event::Noop,
                });
            }
        }

        fn go_online(model: &mut Model) {
            if model.availability.is_online() {
                debug!("already online");
                return;
            }
            model.availability = Availability::Online;
            model.ticker.go_online(&model.pool, model.random.as_mut());
            info!(offers = model.ticker.state().len(), "driver online");
        }

        fn go_offline(model: &mut Model) {
            model.availability = Availability::Offline;
            model.ticker.go_offline();
            model.lifecycle.hide();
            model.pending_passenger = None;
            info!("driver offline");
        }

        fn simulate_ride_request(model: &mut Model) -> bool {
            if !model.availability.is_online() {
                debug!("ignoring ride request while offline");
                return false;
            }
            if Self::banner_accept_pending(model) {
                debug!("ignoring ride request while an accepted banner is closing");
                return false;
            }
            if model.pool.is_empty() {
                warn!("offer pool is empty; nothing to present");
                return false;
            }
            let index = model.random.index(model.pool.len());
            let Some(offer) = model.pool.get(index).cloned() else {
                return false;
            };
            model.pending_passenger = None;
            model.lifecycle.present(offer);
            true
        }

        /// A banner accept holds its passenger until the close delay ends.
        fn banner_accept_pending(model: &Model) -> bool {
            model.lifecycle.tag() == LifecycleTag::Accepted || model.pending_passenger.is_some()
        }

        fn reject_if_ride_in_progress(model: &mut Model) -> bool {
            if model.active_ride.is_some() || Self::banner_accept_pending(model) {
                warn!("accept ignored: a ride is already in progress");
                model.set_error(AppError::new(
                    ErrorKind::InvalidState,
                    "Finish the current ride before accepting another.",
                ));
                return true;
            }
            false
        }

        fn accept_ride_request(model: &mut Model, passenger: Passenger) {
            if Self::reject_if_ride_in_progress(model) {
                return;
            }
            match model.lifecycle.accept() {
                Ok(signal) => {
                    model.pending_passenger = Some(passenger);
                    if let Some(signal) = signal {
                        Self::handle_signal(model, signal);
                    }
                }
                Err(e) => Self::contract_violation(model, &e),
            }
        }

        fn decline_ride_request(model: &mut Model) {
            match model.lifecycle.decline() {
                Ok(Some(signal)) => Self::handle_signal(model, signal),
                Ok(None) => {}
                Err(e) => Self::contract_violation(model, &e),
            }
        }

        fn accept_ticker_offer(model: &mut Model, index: usize, passenger: Passenger) {
            if Self::reject_if_ride_in_progress(model) {
                return;
            }
            match model.ticker.accept(index) {
                Ok(Some(offer)) => Self::start_ride(model, offer, passenger, RideSource::Ticker),
                Ok(None) => debug!(index, "ticker is empty; nothing to accept"),
                Err(e) => Self::contract_violation(model, &e),
            }
        }

        fn handle_signal(model: &mut Model, signal: LifecycleSignal) {
            match signal {
                LifecycleSignal::Accepted(offer) => match model.pending_passenger.take() {
                    Some(passenger) => {
                        Self::start_ride(model, offer, passenger, RideSource::Banner);
                    }
                    None => {
                        error!(offer = %offer, "accept signal arrived without a passenger");
                        model.set_error(AppError::new(
                            ErrorKind::Internal,
                            "Accepted ride is missing passenger details",
                        ));
                    }
                },
                LifecycleSignal::Declined { offer, reason } => {
                    model.pending_passenger = None;
                    info!(offer = %offer, ?reason, "ride request declined");
                }
            }
        }

        fn start_ride(model: &mut Model, offer: RideOffer, passenger: Passenger, source: RideSource) {
            info!(offer = %offer, passenger = %passenger, ?source, "ride started");
            model.active_ride = Some(ActiveRide {
                offer,
                passenger,
                source,
            });
        }

        fn end_ride(model: &mut Model) -> bool {
            match model.complete_ride() {
                Some(ride) => {
                    info!(offer = %ride.offer, "ride completed");
                }
                None => {
                    debug!("no ride in progress");
                    return false;
                }
            }
            // The driver stays online; refill the ticker if accepting emptied it.
            model.availability = Availability::Online;
            model.ticker.go_online(&model.pool, model.random.as_mut());
            true
        }

        fn on_timer(model: &mut Model, id: crate::scheduler::TimerId) -> bool {
            match id.owner {
                TimerOwner::Ticker => model.ticker.on_timer(id),
                TimerOwner::Lifecycle => {
                    let before = model.lifecycle.state().clone();
                    if let Some(signal) = model.lifecycle.on_timer(id) {
                        Self::handle_signal(model, signal);
                    }
                    &before != model.lifecycle.state()
                }
            }
        }

        fn contract_violation(model: &mut Model, error: &dyn std::error::Error) {
            error!(error = %error, "ride request contract violation");
            model.set_error(
                AppError::new(ErrorKind::InvalidState, "That ride request is no longer available.")
                    .with_internal(error.to_string()),
            );
        }

        fn configure(model: &mut Model, config: CoreConfig) {
            match config.validate() {
                Ok(()) => {
                    info!(?config, "configuration updated");
                    model.apply_config(config);
                }
                Err(e) => {
                    warn!(error = %e, "rejected configuration");
                    model.set_error(AppError::new(ErrorKind::Configuration, e.to_string()));
                }
            }
        }

        fn load_vehicle_details(model: &mut Model, caps: &Capabilities) {
            for field in VehicleField::ALL {
                let key = match field.key() {
                    Ok(key) => key,
                    Err(e) => {
                        error!(%field, error = %e, "invalid vehicle key");
                        model.set_error(AppError::new(ErrorKind::Internal, e.to_string()));
                        continue;
                    }
                };
                caps.key_value.get(key.raw(), move |result| Event::VehicleFieldLoaded {
                    field,
                    result: result.map_err(|e| KvError::Storage {
                        message: e.to_string(),
                    }),
                });
            }
        }

        fn save_vehicle_details(model: &mut Model, details: VehicleDetails, caps: &Capabilities) {
            let details = match details.validated() {
                Ok(details) => details,
                Err(e) => {
                    warn!(error = %e, "vehicle details rejected");
                    model.set_error(AppError::new(ErrorKind::Validation, e.to_string()));
                    return;
                }
            };

            for field in VehicleField::ALL {
                if let Err(e) = Self::write_vehicle_field(field, &details, caps) {
                    error!(%field, error = %e, "vehicle field not written");
                    model.set_error(AppError::new(ErrorKind::Storage, e.to_string()));
                }
            }
            model.vehicle = details;
        }

        fn storage_error(error: &KvError) -> AppError {
            let app_error = AppError::new(ErrorKind::Storage, error.to_string());
            if error.is_retryable() {
                app_error
            } else {
                app_error.with_severity(ErrorSeverity::Permanent)
            }
        }

        #[instrument(level = "debug", skip_all, fields(%field))]
        fn write_vehicle_field(
            field: VehicleField,
            details: &VehicleDetails,
            caps: &Capabilities,
        ) -> Result<(), KvError> {
            let key = field.key()?;
            let value = encode_text(&details.stored_value(field))?;
            caps.key_value.set(key.raw(), value, move |result| Event::VehicleFieldSaved {
                field,
                result: result.map(|_| ()).map_err(|e| KvError::Storage {
                    message: e.to_string(),
                }),
            });
            Ok(())
        }

        fn on_vehicle_field_loaded(
            model: &mut Model,
            field: VehicleField,
            result: Result<Option<Vec<u8>>, KvError>,
        ) {
            let stored = match result {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(%field, error = %e, "vehicle field load failed");
                    model.set_error(Self::storage_error(&e));
                    return;
                }
            };

            let applied = field
                .key()
                .and_then(|key| decode_text(&key, stored))
                .map_err(|e| e.to_string())
                .and_then(|value| {
                    model
                        .vehicle
                        .apply_stored(field, value)
                        .map_err(|e| e.to_string())
                });

            if let Err(message) = applied {
                warn!(%field, %message, "ignoring unreadable vehicle field");
            }
        }
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            let event_name = event.name();
            if event.is_user_initiated() {
                debug!(event = event_name, "user action");
            }

            let render = match event {
                Event::Noop => false,

                Event::AppStarted => {
                    Self::load_vehicle_details(model, caps);
                    true
                }

                Event::GoOnline => {
                    Self::go_online(model);
                    true
                }

                Event::GoOffline => {
                    Self::go_offline(model);
                    true
                }

                Event::SimulateRideRequest => Self::simulate_ride_request(model),

                Event::AcceptRideRequest { passenger } => {
                    Self::accept_ride_request(model, passenger);
                    true
                }

                Event::DeclineRideRequest => {
                    Self::decline_ride_request(model);
                    true
                }

                Event::AcceptTickerOffer { index, passenger } => {
                    Self::accept_ticker_offer(model, index, passenger);
                    true
                }

                Event::RefreshTicker => {
                    if model.availability.is_online() {
                        model.ticker.refresh(&model.pool, model.random.as_mut());
                    }
                    true
                }

                Event::ToggleTickerView => {
                    model.ticker.toggle_view_mode();
                    true
                }

                Event::EndRide => Self::end_ride(model),

                Event::ToggleMenu => {
                    model.menu_open = !model.menu_open;
                    true
                }

                Event::Navigate(page) => {
                    model.page = page;
                    model.menu_open = false;
                    true
                }

                Event::Back => {
                    model.page = Page::Home;
                    true
                }

                Event::SaveVehicleDetails(details) => {
                    Self::save_vehicle_details(model, details, caps);
                    true
                }

                Event::Configure(config) => {
                    Self::configure(model, config);
                    true
                }

                Event::DismissError => {
                    model.clear_error();
                    true
                }

                Event::TimerElapsed { id } => Self::on_timer(model, id),

                Event::VehicleFieldLoaded { field, result } => {
                    Self::on_vehicle_field_loaded(model, field, result);
                    true
                }

                Event::VehicleFieldSaved { field, result } => match result {
                    Ok(()) => {
                        debug!(%field, "vehicle field saved");
                        false
                    }
                    Err(e) => {
                        error!(%field, error = %e, "vehicle field save failed");
                        model.set_error(Self::storage_error(&e));
                        true
                    }
                },
            };

            Self::dispatch_timers(model, caps);

            if render {
                caps.render.render();
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            let ticker = model.ticker.state();
            let count_label = ticker
                .current_index()
                .filter(|_| ticker.len() > 1)
                .map(|index| format!("{}/{}", index + 1, ticker.len()));

            ViewModel {
                availability: model.availability,
                page: model.page,
                menu_open: model.menu_open,
                ticker: TickerView {
                    status: ticker.status(),
                    view_mode: ticker.view_mode(),
                    offers: ticker.offers().iter().map(OfferView::from).collect(),
                    current_index: ticker.current_index(),
                    count_label,
                    is_exiting: ticker.is_exiting(),
                    is_rotation_active: ticker.is_rotation_active(),
                },
                lifecycle: LifecycleView {
                    tag: model.lifecycle.tag(),
                    offer: model.lifecycle.state().offer().map(OfferView::from),
                    remaining_seconds: model.lifecycle.remaining_seconds(),
                    progress: model.lifecycle.progress(),
                },
                active_ride: model
                    .active_ride
                    .as_ref()
                    .map(|ride| RideView::new(&ride.offer, &ride.passenger)),
                past_rides: model
                    .past_rides
                    .iter()
                    .map(|ride| RideView::new(&ride.offer, &ride.passenger))
                    .collect(),
                vehicle: VehicleView::from(&model.vehicle),
                error: model.active_error.as_ref().map(UserFacingError::from),
            }
        }
    }
}
