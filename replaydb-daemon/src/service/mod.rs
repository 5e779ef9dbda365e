pub mod reclaimer;
pub mod watcher;
pub mod worker;
