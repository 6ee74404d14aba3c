//! Subscriber installation

use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Where and how log output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    /// Human-readable lines, engine at `debug`
    #[default]
    Development,
    /// One JSON object per event, engine at `info`
    Production,
    /// Bare registry; tests install [`init_test_capture`](super::init_test_capture) instead
    Test,
}

impl Profile {
    /// Filter used when `RUST_LOG` is unset
    pub fn default_directive(self) -> &'static str {
        match self {
            Profile::Development => "geoedit=debug",
            Profile::Production => "geoedit=info",
            Profile::Test => "off",
        }
    }

    fn filter(self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install the global subscriber for `profile`
///
/// Only the first call installs anything; `RUST_LOG` overrides the profile's
/// default filter. Returns whether this call installed the subscriber. A
/// subscriber set elsewhere beforehand is left in place.
///
/// # Example
///
/// ```
/// use geoedit_core::logging_facility::{init, Profile};
///
/// init(Profile::Development);
/// assert!(!init(Profile::Production));
/// ```
pub fn init(profile: Profile) -> bool {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return false;
    }
    let installed = match profile {
        Profile::Development => tracing_subscriber::fmt()
            .with_env_filter(profile.filter())
            .finish()
            .try_init(),
        Profile::Production => tracing_subscriber::fmt()
            .json()
            .with_env_filter(profile.filter())
            .finish()
            .try_init(),
        Profile::Test => tracing_subscriber::registry().try_init(),
    };
    installed.is_ok()
}
