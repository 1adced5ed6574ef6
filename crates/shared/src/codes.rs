//! Short human-friendly code generation.

use rand::Rng;

/// Alphabet for invitation codes. Ambiguous glyphs are kept out.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generates an invitation code in `XXX-XXX-XXX` format.
pub fn generate_invitation_code() -> String {
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(11);
    for i in 0..9 {
        if i > 0 && i % 3 == 0 {
            code.push('-');
        }
        let idx = rng.gen_range(0..CODE_ALPHABET.len());
        code.push(CODE_ALPHABET[idx] as char);
    }
    code
}

/// Normalizes user input into canonical code form (uppercase, trimmed).
pub fn normalize_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_format() {
        let code = generate_invitation_code();
        assert_eq!(code.len(), 11);
        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts.len(), 3);
        for part in parts {
            assert_eq!(part.len(), 3);
            assert!(part.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_codes_differ() {
        let a = generate_invitation_code();
        let b = generate_invitation_code();
        let c = generate_invitation_code();
        // 32^9 space; three equal draws would mean a broken generator
        assert!(!(a == b && b == c));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  abc-def-ghj "), "ABC-DEF-GHJ");
    }
}
