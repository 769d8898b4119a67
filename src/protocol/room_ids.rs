use uuid::Uuid;

/// Longest id a v4 UUID can supply (32 hex digits).
pub const MAX_ROOM_ID_LENGTH: usize = 32;
/// Shortest id still carrying at least 16 bits of randomness.
pub const MIN_ROOM_ID_LENGTH: usize = 4;

/// Generate a lowercase hex room id of the requested length.
///
/// Characters come from a v4 UUID rendered without hyphens, so a 7-character id
/// carries 28 bits of randomness. Collisions with live rooms are handled by the
/// room store, which regenerates on conflict.
pub fn generate_room_id(length: usize) -> String {
    let length = length.clamp(MIN_ROOM_ID_LENGTH, MAX_ROOM_ID_LENGTH);
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(length);
    id
}

/// Normalize a user-supplied room id for lookup.
pub fn normalize_room_id(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_lowercase_hex_of_requested_length() {
        for length in [4, 7, 12, 32] {
            let id = generate_room_id(length);
            assert_eq!(id.len(), length);
            assert!(id
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }

    #[test]
    fn out_of_range_lengths_are_clamped() {
        assert_eq!(generate_room_id(1).len(), MIN_ROOM_ID_LENGTH);
        assert_eq!(generate_room_id(64).len(), MAX_ROOM_ID_LENGTH);
    }

    #[test]
    fn normalization_trims_and_lowercases() {
        assert_eq!(normalize_room_id("  A1B2C3D "), "a1b2c3d");
    }
}
