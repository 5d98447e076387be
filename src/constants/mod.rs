/// timezone of the lamp's location. sent to the astronomy api as `tzid`
/// and used to decide when a new calendar day begins for the cache.
pub const TIMEZONE: chrono_tz::Tz = chrono_tz::America::New_York;

/// name of the yaml config file in the platform config directory
pub const CONFIG_FILE_NAME: &str = "lamp-follower.yaml";

/// name of the json cache file in the platform cache directory
pub const CACHE_FILE_NAME: &str = "lamp-follower-cache.json";

pub mod location {
    pub const LATITUDE: f64 = 39.974_112_394_003_61;
    pub const LONGITUDE: f64 = -75.126_615_028_835;
}

pub mod sun_api {
    use std::time::Duration;
    pub const URL: &str = "https://api.sunrise-sunset.org/json";
    /// wait between a failed fetch and its retry
    pub const RETRY_DELAY: Duration = Duration::from_secs(5);
    /// retries after the initial attempt
    pub const MAX_RETRIES: u32 = 1;
}

pub mod follower {
    use std::time::Duration;
    /// how often the enabled follower recomputes brightness
    pub const TICK_INTERVAL: Duration = Duration::from_secs(60);
    /// manual brightness in percent before the first slider input
    pub const DEFAULT_BRIGHTNESS: u8 = 50;
}

/// cache keys, kept compatible with the old web ui's localStorage
pub mod cache_keys {
    pub const SUN_DATA: &str = "sunDataCache";
    pub const FOLLOWER_ENABLED: &str = "sunFollowerEnabled";
}

pub mod net {
    use std::net::{IpAddr, Ipv4Addr};
    pub const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));
    pub const PORT: u16 = 9000;
}
