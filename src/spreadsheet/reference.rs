//! A1-style cell references.
use regex::Regex;
use std::sync::LazyLock;

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$?([A-Za-z]+)\$?(\d+)$").unwrap_or_else(|e| panic!("Invalid cell reference pattern: {}", e))
});

/// Converts 0-based (row, col) to an A1-style reference, e.g. (1, 2) -> "C2".
pub fn index_to_reference(row: usize, col: usize) -> String {
    let mut letters = Vec::new();
    let mut index = col + 1;
    while index > 0 {
        let remainder = (index - 1) % 26;
        letters.push(b'A' + remainder as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    format!("{}{}", String::from_utf8_lossy(&letters), row + 1)
}

/// Converts an A1-style reference such as "C2" or "$AA$10" to 0-based (row, col).
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let captures = REFERENCE.captures(reference)?;
    let col = captures[1]
        .bytes()
        .try_fold(0usize, |acc, letter| {
            let digit = (letter.to_ascii_uppercase() - b'A') as usize + 1;
            acc.checked_mul(26)?.checked_add(digit)
        })?;
    let row = captures[2].parse::<usize>().ok()?;
    Some((row.checked_sub(1)?, col - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_to_reference_handles_multi_letter_columns() {
        assert_eq!(index_to_reference(0, 0), "A1");
        assert_eq!(index_to_reference(9, 25), "Z10");
        assert_eq!(index_to_reference(0, 26), "AA1");
        assert_eq!(index_to_reference(4, 701), "ZZ5");
        assert_eq!(index_to_reference(0, 702), "AAA1");
    }

    #[test]
    fn reference_to_index_inverts_index_to_reference() {
        assert_eq!(reference_to_index("C2"), Some((1, 2)));
        assert_eq!(reference_to_index("$AA$10"), Some((9, 26)));
        assert_eq!(reference_to_index("zz5"), Some((4, 701)));
        for (row, col) in [(0, 0), (41, 27), (1048575, 16383)] {
            assert_eq!(reference_to_index(&index_to_reference(row, col)), Some((row, col)));
        }
    }

    #[test]
    fn reference_to_index_rejects_garbage() {
        assert_eq!(reference_to_index("A0"), None);
        assert_eq!(reference_to_index("12"), None);
        assert_eq!(reference_to_index("A1:B2"), None);
    }
}
