//! Collapses duplicate registrations of the same name.
//!
//! A name re-registered after expiry shows up once per registration event.
//! Only the latest registration reflects current chain state, so the
//! profile with the highest emitting block wins.

use rustc_hash::FxHashMap;

use crate::db::models::Profile;

/// Keep one profile per name, preferring the highest
/// `emitted_block_number`. Output is sorted by name so runs are
/// reproducible.
pub fn dedup_latest(profiles: Vec<Profile>) -> Vec<Profile> {
    let mut latest: FxHashMap<String, Profile> = FxHashMap::default();

    for profile in profiles {
        match latest.get(&profile.ens_name) {
            Some(kept) if kept.emitted_block_number >= profile.emitted_block_number => {},
            _ => {
                latest.insert(profile.ens_name.clone(), profile);
            },
        }
    }

    let mut deduped: Vec<Profile> = latest.into_values().collect();
    deduped.sort_by(|a, b| a.ens_name.cmp(&b.ens_name));
    deduped
}
