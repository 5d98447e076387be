pub mod transition;
pub mod web;

use crate::constants;
use crate::util::cache::{PersistentCache, SharedCache};
use crate::util::lamp_api::{Lamp, LampApi};
use crate::util::sun_api::{FetchError, SunApi, SunDataProvider, SunEndpoint};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

pub type SharedFollower = Arc<Follower<SunApi, LampApi>>;

/// tracks the sun at the configured location: full manual brightness at
/// night, off during the day, fading through the civil twilights.
/// enabled/disabled survive restarts through the cache, the manual slider
/// value does not.
pub struct Follower<E: SunEndpoint, L: Lamp> {
    cache: SharedCache,
    provider: SunDataProvider<E>,
    lamp: L,
    /// last manual slider value in percent. doubles as the follower's
    /// max brightness while enabled.
    manual_brightness: AtomicU8,
    /// a timer task is alive
    ticking: AtomicBool,
}

impl<E, L> Follower<E, L>
where
    E: SunEndpoint + Send + Sync + 'static,
    L: Lamp + Send + Sync + 'static,
{
    pub fn new(cache: PersistentCache, endpoint: E, lamp: L) -> Self {
        Self {
            cache: Arc::new(tokio::sync::Mutex::new(cache)),
            provider: SunDataProvider::new(endpoint),
            lamp,
            manual_brightness: AtomicU8::new(constants::follower::DEFAULT_BRIGHTNESS),
            ticking: AtomicBool::new(false),
        }
    }

    pub fn lamp(&self) -> &L {
        &self.lamp
    }

    pub fn manual_brightness(&self) -> u8 {
        self.manual_brightness.load(Ordering::SeqCst)
    }

    pub async fn enabled(&self) -> bool {
        self.cache.lock().await.get(constants::cache_keys::FOLLOWER_ENABLED) == Some("true")
    }

    async fn persist_enabled(&self, enabled: bool) {
        self.cache
            .lock()
            .await
            .set(constants::cache_keys::FOLLOWER_ENABLED, if enabled { "true" } else { "false" });
    }

    /// persist the flag, apply brightness for the current time and start the
    /// minutely timer. ignored if the follower is already enabled.
    pub async fn enable(self: Arc<Self>) {
        if self.enabled().await {
            println!("follower already enabled, ignoring");
            return;
        }
        self.persist_enabled(true).await;
        println!("follower enabled");
        if let Err(error) = self.apply_brightness_for_now().await {
            println!("skipping initial brightness update: {error}");
        }
        self.start_timer();
    }

    /// persist the flag and restore the manual slider value. the timer
    /// notices the flag and cancels itself on its next tick. ignored if the
    /// follower is already disabled.
    pub async fn disable(&self) {
        if !self.enabled().await {
            println!("follower already disabled, ignoring");
            return;
        }
        self.persist_enabled(false).await;
        println!("follower disabled, restoring manual brightness");
        if let Err(error) = self.lamp.set_brightness(self.manual_brightness()).await {
            println!("restoring manual brightness failed: {error}");
        }
    }

    /// remember the slider value and push it to the lamp. while the follower
    /// is enabled the next tick overrides it, with the new value as max.
    pub async fn set_manual_brightness(&self, percent: u8) {
        let percent = percent.min(100);
        self.manual_brightness.store(percent, Ordering::SeqCst);
        if let Err(error) = self.lamp.set_brightness(percent).await {
            println!("setting manual brightness failed: {error}");
        }
    }

    /// restart the timer if the follower was enabled when the server last ran
    pub async fn resume(self: Arc<Self>) {
        if !self.enabled().await {
            return;
        }
        println!("follower was enabled on last run, resuming");
        if let Err(error) = self.apply_brightness_for_now().await {
            println!("skipping initial brightness update: {error}");
        }
        self.start_timer();
    }

    /// fetch the day's sun data (cache-aware) and push the brightness for the
    /// current time. a failed lamp command is only logged, the next tick
    /// pushes a fresh value anyway.
    async fn apply_brightness_for_now(&self) -> Result<(), FetchError> {
        let times = self.provider.fetch_sun_times(&self.cache).await?;
        let now = chrono::Utc::now();
        let target = transition::brightness_for_time(now, &times, self.manual_brightness());
        println!(
            "[{}] target brightness is {target}%",
            now.with_timezone(&constants::TIMEZONE).format("%H:%M:%S")
        );
        if let Err(error) = self.lamp.set_brightness(target).await {
            println!("pushing brightness failed: {error}");
        }
        Ok(())
    }

    fn start_timer(self: Arc<Self>) {
        use constants::follower::TICK_INTERVAL;

        // only one timer task at a time. callers persist the enabled flag
        // before this swap, so a surviving task is guaranteed to see it set
        // on its next tick.
        if self.ticking.swap(true, Ordering::SeqCst) {
            return;
        }

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(TICK_INTERVAL).await;
                // cooperative cancellation, checked once per tick.
                // `ticking` is cleared under the same lock as the flag read,
                // so enable() on another thread either sees this task still
                // alive and lets it keep running, or sees it gone and spawns
                // a fresh one. it can never observe a timer that has already
                // decided to exit.
                {
                    let cache = self.cache.lock().await;
                    if cache.get(constants::cache_keys::FOLLOWER_ENABLED) != Some("true") {
                        self.ticking.store(false, Ordering::SeqCst);
                        break;
                    }
                }
                // awaiting the update here keeps ticks serialized, a slow
                // fetch delays the next tick instead of overlapping it
                if let Err(error) = self.apply_brightness_for_now().await {
                    println!("skipping this tick's brightness update: {error}");
                }
            }
            println!("follower timer stopped");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::lamp_api::CommandError;
    use chrono::Utc;
    use std::sync::Mutex;

    struct FakeLamp {
        brightness_calls: Mutex<Vec<u8>>,
    }

    impl FakeLamp {
        fn new() -> Self {
            Self { brightness_calls: Mutex::new(vec![]) }
        }
    }

    impl Lamp for FakeLamp {
        async fn set_brightness(&self, percent: u8) -> Result<(), CommandError> {
            self.brightness_calls.lock().unwrap().push(percent);
            Ok(())
        }
        async fn set_color(&self, _name: &str) -> Result<(), CommandError> {
            Ok(())
        }
        async fn set_pattern(&self, _name: &str) -> Result<(), CommandError> {
            Ok(())
        }
    }

    struct FixedSun(serde_json::Value);

    impl SunEndpoint for FixedSun {
        async fn query(&self) -> Result<serde_json::Value, FetchError> {
            Ok(self.0.clone())
        }
    }

    /// response where `now` falls in the middle of the day
    fn daytime_json() -> serde_json::Value {
        let now = Utc::now();
        serde_json::json!({
            "status": "OK",
            "results": {
                "civil_twilight_begin": (now - chrono::Duration::hours(7)).to_rfc3339(),
                "sunrise": (now - chrono::Duration::hours(6)).to_rfc3339(),
                "sunset": (now + chrono::Duration::hours(6)).to_rfc3339(),
                "civil_twilight_end": (now + chrono::Duration::hours(7)).to_rfc3339()
            }
        })
    }

    /// response where `now` falls after the evening twilight
    fn nighttime_json() -> serde_json::Value {
        let now = Utc::now();
        serde_json::json!({
            "status": "OK",
            "results": {
                "civil_twilight_begin": (now - chrono::Duration::hours(16)).to_rfc3339(),
                "sunrise": (now - chrono::Duration::hours(15)).to_rfc3339(),
                "sunset": (now - chrono::Duration::hours(3)).to_rfc3339(),
                "civil_twilight_end": (now - chrono::Duration::hours(2)).to_rfc3339()
            }
        })
    }

    fn follower(json: serde_json::Value) -> Arc<Follower<FixedSun, FakeLamp>> {
        Arc::new(Follower::new(PersistentCache::in_memory(), FixedSun(json), FakeLamp::new()))
    }

    async fn cache_writes<E: SunEndpoint, L: Lamp>(follower: &Follower<E, L>) -> usize {
        follower.cache.lock().await.writes()
    }

    #[tokio::test]
    async fn enable_persists_and_applies_brightness() {
        let follower = follower(daytime_json());
        Arc::clone(&follower).enable().await;

        assert!(follower.enabled().await);
        // daytime, so the follower turned the lamp off
        assert_eq!(*follower.lamp.brightness_calls.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn enable_is_idempotent() {
        let follower = follower(daytime_json());
        Arc::clone(&follower).enable().await;
        let writes = cache_writes(&follower).await;
        let calls = follower.lamp.brightness_calls.lock().unwrap().len();

        Arc::clone(&follower).enable().await;

        assert_eq!(cache_writes(&follower).await, writes);
        assert_eq!(follower.lamp.brightness_calls.lock().unwrap().len(), calls);
    }

    #[tokio::test]
    async fn disable_restores_manual_brightness() {
        let follower = follower(nighttime_json());
        follower.set_manual_brightness(80).await;
        Arc::clone(&follower).enable().await;
        // nighttime, so the follower pushed the full 80%
        assert_eq!(*follower.lamp.brightness_calls.lock().unwrap(), vec![80, 80]);

        follower.disable().await;

        assert!(!follower.enabled().await);
        assert_eq!(follower.lamp.brightness_calls.lock().unwrap().last(), Some(&80));
    }

    #[tokio::test]
    async fn disable_is_idempotent() {
        let follower = follower(daytime_json());
        let writes = cache_writes(&follower).await;

        follower.disable().await;

        assert_eq!(cache_writes(&follower).await, writes);
        assert!(follower.lamp.brightness_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn manual_brightness_is_clamped_and_pushed() {
        let follower = follower(daytime_json());
        follower.set_manual_brightness(255).await;
        assert_eq!(follower.manual_brightness(), 100);
        assert_eq!(*follower.lamp.brightness_calls.lock().unwrap(), vec![100]);
    }

    #[tokio::test]
    async fn resume_without_persisted_flag_does_nothing() {
        let follower = follower(daytime_json());
        Arc::clone(&follower).resume().await;
        assert!(!follower.enabled().await);
        assert!(follower.lamp.brightness_calls.lock().unwrap().is_empty());
    }

    /// advance the paused clock past one tick and let the timer task run
    async fn pass_one_tick() {
        tokio::task::yield_now().await;
        tokio::time::advance(constants::follower::TICK_INTERVAL + std::time::Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn timer_ticks_and_self_cancels() {
        let follower = follower(nighttime_json());
        follower.set_manual_brightness(80).await;
        Arc::clone(&follower).enable().await;
        // one push from the slider, one from enabling
        assert_eq!(*follower.lamp.brightness_calls.lock().unwrap(), vec![80, 80]);

        // each tick recomputes and pushes again
        pass_one_tick().await;
        assert_eq!(follower.lamp.brightness_calls.lock().unwrap().len(), 3);
        pass_one_tick().await;
        assert_eq!(follower.lamp.brightness_calls.lock().unwrap().len(), 4);

        follower.disable().await; // pushes the manual value once more
        assert_eq!(follower.lamp.brightness_calls.lock().unwrap().len(), 5);

        // the timer notices the flag, stops pushing and clears its liveness marker
        pass_one_tick().await;
        assert_eq!(follower.lamp.brightness_calls.lock().unwrap().len(), 5);
        assert!(!follower.ticking.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn reenable_after_timer_exit_restarts_timer() {
        let follower = follower(nighttime_json());
        Arc::clone(&follower).enable().await;
        follower.disable().await;
        // let the old timer observe the flag and exit
        pass_one_tick().await;
        assert!(!follower.ticking.load(Ordering::SeqCst));

        Arc::clone(&follower).enable().await;
        assert!(follower.ticking.load(Ordering::SeqCst));
        let calls = follower.lamp.brightness_calls.lock().unwrap().len();
        pass_one_tick().await;
        // a fresh timer is ticking again
        assert_eq!(follower.lamp.brightness_calls.lock().unwrap().len(), calls + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn quick_toggle_keeps_one_timer_ticking() {
        let follower = follower(nighttime_json());
        Arc::clone(&follower).enable().await;
        follower.disable().await;
        // re-enable before the old timer ever saw the disabled flag
        Arc::clone(&follower).enable().await;
        assert!(follower.ticking.load(Ordering::SeqCst));

        let calls = follower.lamp.brightness_calls.lock().unwrap().len();
        pass_one_tick().await;
        // the surviving timer kept ticking for the new enable
        assert_eq!(follower.lamp.brightness_calls.lock().unwrap().len(), calls + 1);
        assert!(follower.ticking.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn resume_with_persisted_flag_applies_brightness() {
        let follower = follower(nighttime_json());
        follower.persist_enabled(true).await;

        Arc::clone(&follower).resume().await;

        // default manual brightness at night
        assert_eq!(
            *follower.lamp.brightness_calls.lock().unwrap(),
            vec![constants::follower::DEFAULT_BRIGHTNESS]
        );
    }
}
