//! Forward-only schema migrations
//!
//! Each step names the version it produces. A step runs when the document's
//! version is older than its target and the target is not newer than
//! [`CURRENT_VERSION`]. Steps must never drop repository records.

use semver::Version;
use tracing::{info, warn};

use crate::schema::{Configuration, CURRENT_VERSION};

/// A single version-gated transform
pub struct Migration {
    pub target: &'static str,
    pub apply: fn(Configuration) -> Configuration,
}

/// Registered steps, in ascending target order
///
/// 1.0.0 is the first published schema, so nothing is registered yet.
pub const MIGRATIONS: &[Migration] = &[];

/// Bring `config` up to [`CURRENT_VERSION`]
pub fn migrate(config: Configuration) -> Configuration {
    migrate_with(config, MIGRATIONS)
}

pub(crate) fn migrate_with(mut config: Configuration, steps: &[Migration]) -> Configuration {
    if config.version == CURRENT_VERSION {
        return config;
    }

    let current = Version::parse(CURRENT_VERSION).unwrap_or_else(|_| Version::new(1, 0, 0));
    // validate() guarantees a parseable version on anything read from disk
    let from = Version::parse(&config.version).unwrap_or_else(|_| Version::new(0, 0, 0));

    if from > current {
        warn!(
            from = %config.version,
            to = CURRENT_VERSION,
            "configuration written by a newer build, stamping down"
        );
    } else {
        for step in steps {
            let Ok(target) = Version::parse(step.target) else {
                continue;
            };
            if from < target && target <= current {
                info!(from = %config.version, to = step.target, "applying configuration migration");
                config = (step.apply)(config);
            }
        }
    }

    config.version = CURRENT_VERSION.to_string();
    config
}
