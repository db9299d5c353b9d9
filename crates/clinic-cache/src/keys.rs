//! Key layout.
//!
//! ```text
//! {prefix}:lockout:{client}   hash {failed, started_ms}
//! {prefix}:refresh:{jti}      spent refresh token marker
//! ```

fn build_key(prefix: &str, parts: &[&str]) -> String {
    format!("{}:{}", prefix, parts.join(":"))
}

pub fn lockout(prefix: &str, client: &str) -> String {
    build_key(prefix, &["lockout", client])
}

pub fn spent_refresh(prefix: &str, jti: &str) -> String {
    build_key(prefix, &["refresh", jti])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(lockout("clinic", "10.0.0.5"), "clinic:lockout:10.0.0.5");
        assert_eq!(spent_refresh("clinic", "abc"), "clinic:refresh:abc");
    }

    #[test]
    fn test_ipv6_clients_keep_their_colons() {
        assert_eq!(lockout("clinic", "::1"), "clinic:lockout:::1");
    }
}
