/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Returns true when an entry inserted at `inserted_unix_ms` with the given
/// `ttl_ms` is no longer valid at `now_unix_ms`.
pub fn is_expired_unix_ms(inserted_unix_ms: u64, ttl_ms: u64, now_unix_ms: u64) -> bool {
    now_unix_ms.saturating_sub(inserted_unix_ms) > ttl_ms
}

#[cfg(test)]
mod tests {
    use super::is_expired_unix_ms;

    #[test]
    fn unit_is_expired_unix_ms_treats_exact_ttl_as_fresh() {
        assert!(!is_expired_unix_ms(1_000, 500, 1_500));
        assert!(is_expired_unix_ms(1_000, 500, 1_501));
        assert!(!is_expired_unix_ms(2_000, 500, 1_000));
    }
}
