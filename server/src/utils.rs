use rand::Rng;
use shared::{RoomId, ROOM_ID_ALPHABET, ROOM_ID_LEN};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

// Random room id drawn from the room id alphabet
pub fn generate_room_id<R: Rng>(rng: &mut R) -> RoomId {
    let alphabet = ROOM_ID_ALPHABET.as_bytes();
    let code: String = (0..ROOM_ID_LEN)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect();
    RoomId::parse(&code).unwrap_or_else(|_| unreachable!("generated ids use the room id alphabet"))
}

// Ceiling of a non-negative fraction
pub fn div_ceil(numerator: i64, denominator: i64) -> i64 {
    (numerator + denominator - 1) / denominator
}
