/// Synthesize an id for a participant without an authenticated session.
///
/// The suffix is the full 122 random bits of a v4 UUID. There is no
/// uniqueness check against the live roster; at podcast-sized rosters the
/// collision risk is negligible but not zero.
pub fn new_guest_id() -> String {
    format!("guest-{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_id_suffix_is_a_v4_uuid() {
        let id = new_guest_id();
        let parsed = uuid::Uuid::parse_str(&id["guest-".len()..]).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn guest_id_has_prefix_and_hex_suffix() {
        let id = new_guest_id();
        let suffix = id.strip_prefix("guest-").unwrap();
        assert_eq!(suffix.len(), 32);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(suffix.chars().all(|c| !c.is_ascii_uppercase()));
    }

    #[test]
    fn guest_ids_do_not_repeat() {
        use std::collections::HashSet;
        let ids: HashSet<String> = (0..1000).map(|_| new_guest_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
