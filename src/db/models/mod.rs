mod profile;
mod registration;
mod sync_metadata;

pub use profile::Profile;
pub use registration::{EventLog, RegistrationEvent};
pub use sync_metadata::SyncMetadata;

#[cfg(test)]
pub(crate) use profile::sample_profile;
#[cfg(test)]
pub(crate) use registration::encoded_registration_log;
