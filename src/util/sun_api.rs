use crate::constants;
use crate::util::api_request::{self, Method, RequestError};
use crate::util::cache::SharedCache;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

/// the day's astronomical timestamps at the configured location
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub civil_twilight_begin: DateTime<Utc>,
    pub civil_twilight_end: DateTime<Utc>,
}

/// one cached api response, valid only on the local date it was fetched
#[derive(serde::Serialize, serde::Deserialize)]
struct CacheEntry {
    date: String,
    data: SunTimes,
}

/// failed attempt to get the day's sun data
#[derive(Debug)]
pub enum FetchError {
    /// network or http failure while calling the astronomy api
    Request(RequestError),
    /// response body was not the expected json
    Payload(&'static str),
}

impl From<RequestError> for FetchError {
    fn from(error: RequestError) -> Self {
        Self::Request(error)
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request(error) => write!(f, "{error}"),
            Self::Payload(message) => write!(f, "invalid api response: {message}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// raw query against the astronomy api. seam for tests.
pub trait SunEndpoint {
    /// request the current day's data and return the parsed json body
    fn query(&self) -> impl Future<Output = Result<serde_json::Value, FetchError>> + Send;
}

/// the real sunrise-sunset.org endpoint for the configured location
pub struct SunApi;

impl SunEndpoint for SunApi {
    async fn query(&self) -> Result<serde_json::Value, FetchError> {
        use constants::location::{LATITUDE, LONGITUDE};
        let query = [
            ("lat", LATITUDE.to_string()),
            ("lng", LONGITUDE.to_string()),
            // formatted=0 requests iso 8601 timestamps
            ("formatted", "0".to_string()),
            ("tzid", constants::TIMEZONE.name().to_string()),
        ];
        let response = api_request::send(Method::Get, constants::sun_api::URL, Some(&query)).await?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|_| FetchError::Payload("body is not json"))
    }
}

/// fetches sun data at most once per calendar day and keeps it in the cache
pub struct SunDataProvider<E: SunEndpoint> {
    endpoint: E,
    retry_delay: Duration,
}

impl<E: SunEndpoint> SunDataProvider<E> {
    pub fn new(endpoint: E) -> Self {
        Self { endpoint, retry_delay: constants::sun_api::RETRY_DELAY }
    }

    /// cached data for today if present, otherwise a fresh fetch with one
    /// bounded retry after `retry_delay`. a successful fetch overwrites the
    /// cache entry, a cache hit makes no network call at all.
    pub async fn fetch_sun_times(&self, cache: &SharedCache) -> Result<SunTimes, FetchError> {
        let today = today_string();

        {
            let cache = cache.lock().await;
            if let Some(raw) = cache.get(constants::cache_keys::SUN_DATA) {
                if let Ok(entry) = serde_json::from_str::<CacheEntry>(raw) {
                    if entry.date == today {
                        println!("using cached sun data");
                        return Ok(entry.data);
                    }
                }
            }
        }

        println!("fetching new sun data ...");
        let mut attempt = 0;
        let times = loop {
            match self.fetch_remote().await {
                Ok(times) => break times,
                Err(error) if attempt < constants::sun_api::MAX_RETRIES => {
                    attempt += 1;
                    println!("fetching sun data failed ({error}), retrying in {:?} ...", self.retry_delay);
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(error) => return Err(error),
            }
        };

        // a fetch that entered the retry delay can cross local midnight,
        // so the entry is stamped with the write-time date, not the date
        // the cache was checked on
        let entry = CacheEntry { date: today_string(), data: times.clone() };
        // serializing the entry cannot fail
        cache
            .lock()
            .await
            .set(constants::cache_keys::SUN_DATA, &serde_json::to_string(&entry).unwrap());
        Ok(times)
    }

    async fn fetch_remote(&self) -> Result<SunTimes, FetchError> {
        let json = self.endpoint.query().await?;
        parse_response(&json)
    }
}

/// local date at the configured location, the cache validity key
fn date_string(now: DateTime<Utc>) -> String {
    now.with_timezone(&constants::TIMEZONE)
        .format("%Y-%m-%d")
        .to_string()
}

fn today_string() -> String {
    date_string(Utc::now())
}

fn parse_timestamp(results: &serde_json::Value, field: &str) -> Result<DateTime<Utc>, FetchError> {
    let raw = results[field]
        .as_str()
        .ok_or(FetchError::Payload("missing timestamp in results"))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| FetchError::Payload("unparseable timestamp in results"))
}

fn parse_response(json: &serde_json::Value) -> Result<SunTimes, FetchError> {
    if json["status"].as_str() != Some("OK") {
        return Err(FetchError::Payload("status was not OK"));
    }

    let results = &json["results"];
    let times = SunTimes {
        sunrise: parse_timestamp(results, "sunrise")?,
        sunset: parse_timestamp(results, "sunset")?,
        civil_twilight_begin: parse_timestamp(results, "civil_twilight_begin")?,
        civil_twilight_end: parse_timestamp(results, "civil_twilight_end")?,
    };

    // twilight brackets the day, anything else is a broken response
    let ordered = times.civil_twilight_begin <= times.sunrise
        && times.sunrise <= times.sunset
        && times.sunset <= times.civil_twilight_end;
    if !ordered {
        return Err(FetchError::Payload("timestamps are out of order"));
    }

    Ok(times)
}
