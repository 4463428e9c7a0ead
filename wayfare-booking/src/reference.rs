use rand::Rng;

/// Uppercase letters and digits without 0, O, 1 or I.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn generate_reference(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// References are stored uppercase; lookups accept any case and surrounding whitespace.
pub fn normalize_reference(reference: &str) -> String {
    reference.trim().to_ascii_uppercase()
}
