pub mod dedup;
pub mod mirror;

pub use dedup::select_new;
pub use mirror::MirrorExecutor;
