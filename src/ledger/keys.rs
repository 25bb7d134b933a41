//! Ledger key layout.
//!
//! Each record kind lives under a fixed prefix so a range scan selects one
//! kind for one file. The file id is hex-encoded inside keys: hex never
//! contains `_`, so `TAG_<file>_` can never match another file's keys.
//! Numeric suffixes are zero-padded to keep lexicographic order numeric.

pub const TAG_PREFIX: &str = "TAG_";
pub const AUDIT_PREFIX: &str = "AUDIT_";
pub const AUDIT_SEQ_PREFIX: &str = "AUDITSEQ_";
pub const DOWNLOAD_PREFIX: &str = "DL_";
pub const DOWNLOAD_SEQ_PREFIX: &str = "DLSEQ_";

fn file_segment(file_id: &str) -> String {
    hex::encode(file_id.as_bytes())
}

pub fn tag_prefix(file_id: &str) -> String {
    format!("{TAG_PREFIX}{}_", file_segment(file_id))
}

pub fn tag_key(file_id: &str, block_index: u64) -> String {
    format!("{}{block_index:020}", tag_prefix(file_id))
}

pub fn audit_prefix(file_id: &str) -> String {
    format!("{AUDIT_PREFIX}{}_", file_segment(file_id))
}

pub fn audit_key(file_id: &str, sequence: u64) -> String {
    format!("{}{sequence:020}", audit_prefix(file_id))
}

pub fn audit_seq_key(file_id: &str) -> String {
    format!("{AUDIT_SEQ_PREFIX}{}", file_segment(file_id))
}

pub fn download_prefix(file_id: &str) -> String {
    format!("{DOWNLOAD_PREFIX}{}_", file_segment(file_id))
}

pub fn download_key(file_id: &str, sequence: u64) -> String {
    format!("{}{sequence:020}", download_prefix(file_id))
}

pub fn download_seq_key(file_id: &str) -> String {
    format!("{DOWNLOAD_SEQ_PREFIX}{}", file_segment(file_id))
}

/// Half-open `[start, end)` range covering every key that starts with
/// `prefix`: the end bound bumps the prefix's last character.
pub fn prefix_range(prefix: &str) -> (String, String) {
    let mut end = prefix.to_string();
    match end.pop().and_then(|c| char::from_u32(c as u32 + 1)) {
        Some(next) => end.push(next),
        None => end.push(char::MAX),
    }
    (prefix.to_string(), end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        assert_eq!(tag_key("F1", 7), "TAG_4631_00000000000000000007");
        assert_eq!(audit_key("F1", 12), "AUDIT_4631_00000000000000000012");
        assert_eq!(audit_seq_key("F1"), "AUDITSEQ_4631");
        assert_eq!(download_key("F1", 1), "DL_4631_00000000000000000001");
    }

    #[test]
    fn prefix_scan_bounds() {
        let (start, end) = prefix_range("TAG_4631_");
        assert_eq!(end, "TAG_4631`");
        assert!(tag_key("F1", u64::MAX) < end);
        assert!(tag_key("F1", 0) >= start);
    }

    #[test]
    fn underscores_in_file_ids_do_not_collide() {
        let (start, end) = prefix_range(&tag_prefix("F1"));
        let other = tag_key("F1_x", 0);
        assert!(!(other >= start && other < end));
    }

    #[test]
    fn numeric_order_is_lexicographic() {
        assert!(audit_key("F1", 9) < audit_key("F1", 10));
    }
}
