use locfix_logic::Coordinates;

const fn server_host() -> &'static str {
    if let Some(host) = option_env!("GEOCODE_SERVER_HOST") {
        host
    } else {
        "nominatim.openstreetmap.org"
    }
}

const fn server_secure() -> bool {
    if let Some(secure) = option_env!("GEOCODE_SERVER_SECURE") {
        const_str::eq_ignore_ascii_case!(secure, "true") || const_str::equal!(secure, "1")
    } else {
        true
    }
}

const fn server_http_proto() -> &'static str {
    if server_secure() { "https" } else { "http" }
}

const SERVER_HOST: &str = server_host();
const SERVER_HTTP_PROTO: &str = server_http_proto();

/// Endpoint baked in at compile time from `GEOCODE_SERVER_HOST` / `GEOCODE_SERVER_SECURE`
pub const DEFAULT_BASE_URL: &str = const_str::concat!(SERVER_HTTP_PROTO, "://", SERVER_HOST);

/// Street-level zoom, what the complaint forms display
const ZOOM: u8 = 18;

pub fn reverse_url(base_url: &str, coordinates: Coordinates) -> String {
    let base = base_url.trim_end_matches('/');
    format!(
        "{base}/reverse?format=jsonv2&lat={:.7}&lon={:.7}&zoom={ZOOM}&addressdetails=0",
        coordinates.lat, coordinates.lng
    )
}
