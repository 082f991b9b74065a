//! Consent logging beacons.
//!
//! Every decision set is reported to a logging endpoint as
//! `GET <endpoint>?uuid=<visitor id>&consent=<consent map json>`. Only the
//! arrival of a response matters; its status and payload never change what
//! happens next.

pub mod beacon;
pub mod transport;

pub use beacon::{
    consent_beacon_url, BeaconRequest, BeaconResponse, BeaconTransport, Sending,
    DEFAULT_TRACKING_PATH,
};
pub use transport::HttpTransport;
