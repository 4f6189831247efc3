//! # Packed BCD Conversions
//!
//! DL/T 645 stores addresses and measured values as packed binary-coded
//! decimal, two digits per byte. Strings use the reading order of the meter
//! label, which is the reverse of the wire order: `[0x78, 0x56, 0x34, 0x12]`
//! reads as `"12345678"`.
//!
//! The numeric helpers work on big-endian digit pairs (first byte holds the
//! most significant two digits) and are used after the caller has put the
//! bytes into reading order.

/// Renders `bytes` as a digit string, last byte first, high nibble first.
///
/// Nibbles above 9 are rendered as `A`-`F`; the output is always
/// `2 * bytes.len()` characters long.
pub fn to_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes.iter().rev() {
        out.push(nibble_char(b >> 4));
        out.push(nibble_char(b & 0x0F));
    }
    out
}

/// Parses a digit string back into wire-order bytes.
///
/// Only the leading run of hex characters is considered, capped at an even
/// number of characters no greater than the string length. The run is
/// consumed from its end two characters at a time; a leftover leading
/// character is dropped. The result holds `floor(run / 2)` bytes.
pub fn from_string(s: &str) -> Vec<u8> {
    let raw = s.as_bytes();
    let valid = raw.iter().take_while(|c| c.is_ascii_hexdigit()).count();
    let usable = valid.min(raw.len() / 2 * 2);
    let digits = &raw[usable % 2..usable];

    digits
        .rchunks(2)
        .map(|pair| (hex_value(pair[0]) << 4) | hex_value(pair[1]))
        .collect()
}

/// Whether every nibble of `bytes` is a decimal digit.
pub fn is_valid(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| b >> 4 <= 9 && b & 0x0F <= 9)
}

/// Interprets `bytes` as big-endian BCD.
///
/// Returns 0 when any nibble is not a decimal digit or the value does not fit
/// in a `u64`; callers that must tell zero from malformed input check
/// [`is_valid`] first.
pub fn to_u64(bytes: &[u8]) -> u64 {
    let mut result: u64 = 0;
    for &b in bytes {
        let (hi, lo) = (u64::from(b >> 4), u64::from(b & 0x0F));
        if hi > 9 || lo > 9 {
            return 0;
        }
        result = match result
            .checked_mul(100)
            .and_then(|r| r.checked_add(hi * 10 + lo))
        {
            Some(r) => r,
            None => return 0,
        };
    }
    result
}

/// Encodes `value` as big-endian BCD in exactly `width` bytes.
///
/// Digits that do not fit in `width` bytes are discarded.
pub fn from_u64(value: u64, width: usize) -> Vec<u8> {
    let mut out = vec![0u8; width];
    let mut remainder = value;
    for slot in out.iter_mut().rev() {
        let pair = (remainder % 100) as u8;
        *slot = ((pair / 10) << 4) | (pair % 10);
        remainder /= 100;
    }
    out
}

fn nibble_char(n: u8) -> char {
    char::from_digit(u32::from(n), 16)
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('0')
}

fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_to_string_address() {
        let b = [0x77, 0x32, 0x09, 0x19, 0x04, 0x22];
        assert_eq!(to_string(&b), "220419093277");
        assert_eq!(to_string(&[]), "");
    }

    #[test]
    fn test_to_string_hex_nibbles() {
        assert_eq!(to_string(&[0xAB, 0x0F]), "0FAB");
    }

    #[test]
    fn test_from_string_address() {
        assert_eq!(
            from_string("220419093277"),
            vec![0x77, 0x32, 0x09, 0x19, 0x04, 0x22]
        );
        assert_eq!(from_string("0fab"), vec![0xAB, 0x0F]);
    }

    #[test]
    fn test_from_string_odd_length_drops_trailing() {
        assert_eq!(from_string("1234567"), vec![0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_from_string_stops_at_invalid_char() {
        assert_eq!(from_string("1234zz78"), vec![0x34, 0x12]);
        assert_eq!(from_string("123x5678"), vec![0x23]);
        assert!(from_string("x1234").is_empty());
        assert!(from_string("").is_empty());
    }

    #[test]
    fn test_to_u64_big_endian() {
        assert_eq!(to_u64(&[0x12, 0x34, 0x56, 0x78]), 12_345_678);
        assert_eq!(to_u64(&[0x00, 0x01]), 1);
        assert_eq!(to_u64(&[]), 0);
    }

    #[test]
    fn test_to_u64_invalid_is_zero() {
        assert_eq!(to_u64(&[0x12, 0x3A]), 0);
        assert!(!is_valid(&[0x12, 0x3A]));
        assert!(is_valid(&[0x12, 0x39]));
    }

    #[test]
    fn test_from_u64_width() {
        assert_eq!(from_u64(12_345_678, 4), vec![0x12, 0x34, 0x56, 0x78]);
        assert_eq!(from_u64(1, 2), vec![0x00, 0x01]);
        assert_eq!(from_u64(123_456, 2), vec![0x34, 0x56]);
    }

    proptest! {
        #[test]
        fn prop_string_round_trip(s in "([0-9A-F]{2}){0,16}") {
            prop_assert_eq!(to_string(&from_string(&s)), s);
        }

        #[test]
        fn prop_u64_round_trip(digits in prop::collection::vec((0u8..10, 0u8..10), 0..9)) {
            let bytes: Vec<u8> = digits.iter().map(|(h, l)| (h << 4) | l).collect();
            prop_assert_eq!(from_u64(to_u64(&bytes), bytes.len()), bytes);
        }
    }
}
