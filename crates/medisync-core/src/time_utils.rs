/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Returns the milliseconds elapsed since `since_ms`, saturating at zero when the
/// clock moved backwards.
pub fn elapsed_since_ms(since_ms: u64, now_ms: u64) -> u64 {
    now_ms.saturating_sub(since_ms)
}
