pub mod ban;

pub use ban::{BanAction, Location, UNKNOWN_LOCATION};
