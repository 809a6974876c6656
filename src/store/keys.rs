use std::time::Duration;

pub const EXPIRY_TIME: Duration = Duration::from_secs(300);
pub const BLOCK_TIME: Duration = Duration::from_secs(60);
pub const RECLAIM_INTERVAL: Duration = Duration::from_secs(1);

pub const KEY_BYTES: usize = 16;
pub const KEY_LEN: usize = KEY_BYTES * 2;

pub const RECORD_VALUE: &str = "available";

const RECORD_PREFIX: &str = "api_key:";

pub fn record_key(key: &str) -> String {
    format!("{}{}", RECORD_PREFIX, key)
}

pub fn available_set() -> &'static str {
    "available_keys"
}

pub fn expiry_index() -> &'static str {
    "key_expiry_sorted_set"
}

pub fn block_index() -> &'static str {
    "blocked_keys_sorted_set"
}

/// A lease key is exactly 32 lowercase hex characters.
pub fn is_valid_key(key: &str) -> bool {
    key.len() == KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_names_use_prefix() {
        assert_eq!(record_key("abc"), "api_key:abc");
    }

    #[test]
    fn key_validation() {
        assert!(is_valid_key("0123456789abcdef0123456789abcdef"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("nonexistent"));
        assert!(!is_valid_key("0123456789ABCDEF0123456789ABCDEF"));
        assert!(!is_valid_key("0123456789abcdef0123456789abcde"));
        assert!(!is_valid_key("0123456789abcdef0123456789abcdeg"));
    }
}
