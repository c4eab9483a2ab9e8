//! Secret pattern detectors used by the entropy guard.
//!
//! Both detectors work on raw string scanning rather than regex: the hex
//! detector walks char classes, the mnemonic detector tokenizes and checks
//! each word against the canonical English BIP-39 wordlist so ordinary
//! prose does not trip it.

/// Hex digits required after `0x` for a private key match.
const PRIVATE_KEY_HEX_LEN: usize = 64;

/// True when `input` contains a `0x`-prefixed run of at least 64 hex chars
/// — the shape of a raw secp256k1 private key. A 40-char EVM address never
/// matches.
pub fn contains_hex_private_key(input: &str) -> bool {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'0' && (bytes[i + 1] == b'x' || bytes[i + 1] == b'X') {
            let run = bytes[i + 2..]
                .iter()
                .take_while(|b| b.is_ascii_hexdigit())
                .count();
            if run >= PRIVATE_KEY_HEX_LEN {
                return true;
            }
            // The trailing digit of a failed run can start the next prefix
            // ("0xa0x..."), so resume just past this marker, not past the run.
            i += 2;
        } else {
            i += 1;
        }
    }
    false
}

/// True when `input` contains `min_words` consecutive whitespace-separated
/// lowercase words all drawn from the BIP-39 English wordlist.
pub fn contains_mnemonic_phrase(input: &str, min_words: usize) -> bool {
    let mut run = 0usize;
    for token in input.split_whitespace() {
        if is_bip39_word(token) {
            run += 1;
            if run >= min_words {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

fn is_bip39_word(token: &str) -> bool {
    // BIP-39 English words are 3-8 lowercase ASCII letters.
    if !(3..=8).contains(&token.len()) {
        return false;
    }
    if !token.chars().all(|c| c.is_ascii_lowercase()) {
        return false;
    }
    bip39::Language::English
        .word_list()
        .binary_search(&token)
        .is_ok()
}
