//! Startup seeding of an empty store.

use nuclick_types::NewProvince;
use tracing::info;

use crate::config::SeedProvince;
use crate::store::{ProvinceStore, StoreError};

/// Insert `seeds` in order if the store holds no provinces yet.
///
/// Returns the number of provinces created. A store that already has
/// provinces is left untouched so restarts do not duplicate them.
pub async fn seed_if_empty<S: ProvinceStore>(
    store: &S,
    seeds: &[SeedProvince],
) -> Result<usize, StoreError> {
    if seeds.is_empty() || !store.list_all().await?.is_empty() {
        return Ok(0);
    }
    for seed in seeds {
        let province = store
            .insert(NewProvince::new(&seed.name, &seed.color_hex)?)
            .await?;
        info!(province = %province.id, name = %province.name, "Seeded province");
    }
    Ok(seeds.len())
}
