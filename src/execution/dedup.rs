use crate::models::{Trade, TradePosition};

/// Filter a fetched batch down to the trades strictly newer than `cursor`,
/// returned oldest-first for replay.
///
/// The feed nominally returns newest-first, but ordering around timestamp
/// ties is not guaranteed, so survivors are sorted by position rather than
/// blindly reversed.
///
/// The filter only sees what one fetch returned: when a wallet trades more
/// than the fetch limit between polls, the oldest entries fall outside the
/// page and replaying the rest advances the cursor straight past them. The
/// loss bound is one page per wallet per poll cycle.
pub fn select_new<'a>(batch: &'a [Trade], cursor: &TradePosition) -> Vec<&'a Trade> {
    let mut fresh: Vec<&Trade> = batch
        .iter()
        .filter(|t| t.position() > *cursor)
        .collect();

    fresh.sort_by(|a, b| a.position().cmp(&b.position()));
    fresh
}
