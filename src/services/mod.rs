pub mod mirror_poller;
pub mod notifier;

pub use mirror_poller::{run_mirror_poller, sweep, PollerConfig, SweepStats};
pub use notifier::{Notifier, TelegramNotifier};
