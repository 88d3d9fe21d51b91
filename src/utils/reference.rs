use rand::Rng;
use uuid::Uuid;

const REFERENCE_CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const REFERENCE_LEN: usize = 8;

/// Generate a human-readable booking reference: 8 uppercase base-36 characters.
///
/// 36^8 (about 2.8e12) values; a collision is still possible and surfaces as a
/// conflict from the store rather than being retried here.
pub fn generate_booking_reference() -> String {
    let mut rng = rand::thread_rng();
    (0..REFERENCE_LEN)
        .map(|_| REFERENCE_CHARSET[rng.gen_range(0..REFERENCE_CHARSET.len())] as char)
        .collect()
}

/// Opaque owner token for a reservation lock (122 random bits).
pub fn generate_lock_token() -> String {
    Uuid::new_v4().simple().to_string()
}
