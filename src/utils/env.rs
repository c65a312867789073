/// Environment variable namespace shared with the rest of Tideway
const ENV_PREFIX: &str = "TIDEWAY_";

/// Get environment variable with TIDEWAY_ prefix, falling back to unprefixed version
///
/// `get_env_with_prefix("SESSION_REDIS_HOST")` checks `TIDEWAY_SESSION_REDIS_HOST`,
/// then `SESSION_REDIS_HOST`. Empty values count as unset.
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    let lookup = |name: &str| std::env::var(name).ok().filter(|value| !value.is_empty());

    lookup(&format!("{}{}", ENV_PREFIX, key)).or_else(|| lookup(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_with_prefix() {
        unsafe {
            std::env::set_var("TIDEWAY_SESSION_ENV_TEST", "prefixed_value");
            std::env::set_var("SESSION_ENV_TEST", "unprefixed_value");
        }
        assert_eq!(
            get_env_with_prefix("SESSION_ENV_TEST"),
            Some("prefixed_value".to_string())
        );

        unsafe {
            std::env::remove_var("TIDEWAY_SESSION_ENV_TEST");
        }
        assert_eq!(
            get_env_with_prefix("SESSION_ENV_TEST"),
            Some("unprefixed_value".to_string())
        );

        // An empty prefixed value falls through to the unprefixed one
        unsafe {
            std::env::set_var("TIDEWAY_SESSION_ENV_TEST", "");
        }
        assert_eq!(
            get_env_with_prefix("SESSION_ENV_TEST"),
            Some("unprefixed_value".to_string())
        );

        unsafe {
            std::env::remove_var("TIDEWAY_SESSION_ENV_TEST");
            std::env::set_var("SESSION_ENV_TEST", "");
        }
        assert_eq!(get_env_with_prefix("SESSION_ENV_TEST"), None);

        unsafe {
            std::env::remove_var("SESSION_ENV_TEST");
        }
        assert_eq!(get_env_with_prefix("SESSION_ENV_MISSING"), None);
    }
}
