//! Splitting of embedded stream-map blobs into name/value records

use crate::escape::decode_unicode_escape;

/// One `&`-joined record from a stream map, fields kept in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: Vec<(String, String)>,
    malformed: Vec<String>,
}

impl RawRecord {
    /// Value of `name`. A repeated name resolves to its last occurrence.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Pieces that had no `=` and were skipped.
    pub fn malformed(&self) -> &[String] {
        &self.malformed
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn push_piece(&mut self, piece: &str) {
        match piece.split_once('=') {
            Some((name, value)) => self.fields.push((name.to_string(), value.to_string())),
            None => self.malformed.push(piece.to_string()),
        }
    }
}

/// Parse a stream-map blob: unescape, split records on `,`, fields on `&`
/// and each field on its first `=`.
///
/// Empty chunks (an empty blob, a trailing comma) produce no record.
pub fn parse_records(blob: &str) -> Vec<RawRecord> {
    let decoded = decode_unicode_escape(blob);

    decoded
        .split(',')
        .filter(|chunk| !chunk.trim().is_empty())
        .map(|chunk| {
            let mut record = RawRecord::default();
            for piece in chunk.split('&').filter(|p| !p.is_empty()) {
                record.push_piece(piece);
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(record: &RawRecord) -> Vec<(&str, &str)> {
        record.fields().collect()
    }

    #[test]
    fn test_two_records_in_order() {
        let records = parse_records("a=1&b=2,c=3");
        assert_eq!(records.len(), 2);
        assert_eq!(pairs(&records[0]), vec![("a", "1"), ("b", "2")]);
        assert_eq!(pairs(&records[1]), vec![("c", "3")]);
    }

    #[test]
    fn test_escaped_ampersands_split_fields() {
        let records = parse_records("itag=22\\u0026url=http%3A%2F%2Fx,itag=18\\u0026url=y");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("itag"), Some("22"));
        assert_eq!(records[0].get("url"), Some("http%3A%2F%2Fx"));
        assert_eq!(records[1].get("url"), Some("y"));
    }

    #[test]
    fn test_value_keeps_later_equals_signs() {
        let records = parse_records("sig=abc==&itag=5");
        assert_eq!(records[0].get("sig"), Some("abc=="));
    }

    #[test]
    fn test_field_without_equals_is_skipped() {
        let records = parse_records("itag=5&garbage&url=u");
        assert_eq!(records.len(), 1);
        assert_eq!(pairs(&records[0]), vec![("itag", "5"), ("url", "u")]);
        assert_eq!(records[0].malformed(), &["garbage".to_string()]);
    }

    #[test]
    fn test_empty_blob_yields_nothing() {
        assert!(parse_records("").is_empty());
        assert_eq!(parse_records("a=1,").len(), 1);
    }

    #[test]
    fn test_repeated_name_resolves_to_last() {
        let records = parse_records("a=1&a=2");
        assert_eq!(records[0].get("a"), Some("2"));
    }
}
