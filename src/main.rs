mod constants;
mod control;
mod util;

use control::{Follower, SharedFollower};
use std::sync::Arc;
use util::cache::{self, PersistentCache};
use util::lamp_api::LampApi;
use util::secrets;
use util::sun_api::SunApi;

#[tokio::main]
async fn main() {
    // load config file once, api modules read it through `secrets::INSTANCE`
    secrets::INSTANCE.set(secrets::from_file()).unwrap();

    let cache = PersistentCache::open(cache::default_path());
    let follower: SharedFollower = Arc::new(Follower::new(cache, SunApi, LampApi));

    // restore follower mode from the last run
    Arc::clone(&follower).resume().await;

    // never terminates
    control::web::start_server(follower).await;
}
