use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use thiserror::Error;

pub const DEFAULT_OFFER_TIMEOUT_SECS: u32 = 15;
pub const METER_FARE: &str = "Meter fare";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OfferError {
    #[error("offer timeout must be greater than zero")]
    ZeroTimeout,
    #[error("{field} cannot be empty")]
    EmptyField { field: &'static str },
}

/// One candidate trip. Immutable once built; collections replace offers
/// wholesale and never edit them in place.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RideOffer {
    pickup: String,
    destination: String,
    fare_descriptor: String,
    distance: String,
    duration: String,
    timeout_seconds: NonZeroU32,
}

impl RideOffer {
    pub fn new(
        pickup: impl Into<String>,
        destination: impl Into<String>,
        fare_descriptor: impl Into<String>,
        distance: impl Into<String>,
        duration: impl Into<String>,
        timeout_seconds: u32,
    ) -> Result<Self, OfferError> {
        let pickup = pickup.into();
        let destination = destination.into();
        if pickup.trim().is_empty() {
            return Err(OfferError::EmptyField { field: "pickup" });
        }
        if destination.trim().is_empty() {
            return Err(OfferError::EmptyField { field: "destination" });
        }
        let timeout_seconds = NonZeroU32::new(timeout_seconds).ok_or(OfferError::ZeroTimeout)?;

        Ok(Self {
            pickup,
            destination,
            fare_descriptor: fare_descriptor.into(),
            distance: distance.into(),
            duration: duration.into(),
            timeout_seconds,
        })
    }

    #[must_use]
    pub fn pickup(&self) -> &str {
        &self.pickup
    }

    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    #[must_use]
    pub fn fare_descriptor(&self) -> &str {
        &self.fare_descriptor
    }

    #[must_use]
    pub fn distance(&self) -> &str {
        &self.distance
    }

    #[must_use]
    pub fn duration(&self) -> &str {
        &self.duration
    }

    #[must_use]
    pub fn timeout_seconds(&self) -> u32 {
        self.timeout_seconds.get()
    }
}

impl fmt::Display for RideOffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.pickup, self.destination)
    }
}

/// Passenger metadata supplied by the caller when an offer is accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Passenger {
    pub name: String,
    pub rating: f32,
    pub phone: String,
}

// Phone numbers are personal data; keep them out of logs.
impl fmt::Display for Passenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1})", self.name, self.rating)
    }
}

/// Fixed set of candidate offers the simulator samples from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferPool {
    offers: Vec<RideOffer>,
}

impl OfferPool {
    #[must_use]
    pub fn new(offers: Vec<RideOffer>) -> Self {
        Self { offers }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&RideOffer> {
        self.offers.get(index)
    }

    #[must_use]
    pub fn offers(&self) -> &[RideOffer] {
        &self.offers
    }

    /// Number of different destinations in the pool.
    #[must_use]
    pub fn distinct_destinations(&self) -> usize {
        let mut seen: Vec<&str> = Vec::with_capacity(self.offers.len());
        for offer in &self.offers {
            if !seen.contains(&offer.destination()) {
                seen.push(offer.destination());
            }
        }
        seen.len()
    }

    /// Eight Bengaluru and Hyderabad trips used by the driver simulator.
    #[must_use]
    pub fn sample() -> Self {
        const TRIPS: [(&str, &str, &str, &str); 8] = [
            ("Koramangala, Bengaluru", "Electronic City, Bengaluru", "12.4 km", "25 mins"),
            ("Indiranagar, Bengaluru", "Whitefield, Bengaluru", "16.8 km", "32 mins"),
            ("MG Road, Bengaluru", "Hebbal, Bengaluru", "14.2 km", "28 mins"),
            ("Banjara Hills, Hyderabad", "Hitech City, Hyderabad", "14.2 km", "32 mins"),
            ("Secunderabad, Hyderabad", "Gachibowli, Hyderabad", "21.3 km", "41 mins"),
            ("LB Nagar, Hyderabad", "Shamshabad, Hyderabad", "27.5 km", "45 mins"),
            ("Hussain Sagar, Hyderabad", "Secunderabad, Hyderabad", "6.1 km", "18 mins"),
            ("Hebbal, Bengaluru", "Koramangala, Bengaluru", "15.0 km", "35 mins"),
        ];

        let offers = TRIPS
            .iter()
            .filter_map(|(pickup, destination, distance, duration)| {
                RideOffer::new(
                    *pickup,
                    *destination,
                    METER_FARE,
                    *distance,
                    *duration,
                    DEFAULT_OFFER_TIMEOUT_SECS,
                )
                .ok()
            })
            .collect();

        Self { offers }
    }
}

impl Default for OfferPool {
    fn default() -> Self {
        Self::sample()
    }
}
