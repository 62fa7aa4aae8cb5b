use rand::{rngs::OsRng, Rng};

/// Unambiguous characters only: no `0`, `O`, `1`, `l`, `I`, `L`.
pub const PASSWORD_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz23456789";
pub const PASSWORD_LENGTH: usize = 8;

pub fn generate_password() -> String {
    let mut rng = OsRng;
    (0..PASSWORD_LENGTH)
        .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect()
}
