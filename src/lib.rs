// Launchpad - waitlist capture and bulk email campaigns for pre-launch products
//
// This library bundles the Launchpad crates behind one dependency. The
// campaign engine and mail primitives are always available; configuration,
// logging, the HTTP server and the test doubles are feature gated.

pub use launchpad_campaign as campaign;
pub use launchpad_mail as mail;

#[cfg(feature = "config")]
pub use launchpad_config as config;

#[cfg(feature = "log")]
pub use launchpad_log as log;

#[cfg(feature = "server")]
pub use launchpad_server as server;

#[cfg(feature = "testing")]
pub use launchpad_testing as testing;

/// Prelude for common imports.
pub mod prelude {
    pub use launchpad_campaign::prelude::*;
    pub use launchpad_mail::prelude::*;

    #[cfg(feature = "config")]
    pub use launchpad_config::LaunchpadConfig;
}
