mod nominatim;
mod server;

pub use nominatim::NominatimGeocoder;
pub use server::{DEFAULT_BASE_URL, reverse_url};
