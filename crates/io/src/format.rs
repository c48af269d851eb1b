// Text vs. binary PROFSAVE detection

/// Leading bytes of the binary profile variant.
pub const BINARY_SIGNATURE: &[u8] = b"PROFSAVE";

/// How many leading bytes are inspected.
pub const SNIFF_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `KEY VALUE` lines, editable.
    Text,
    /// Binary profile. Detected and rejected, never decoded.
    Binary,
}

/// Classify file content by its first `SNIFF_LEN` bytes: the binary
/// signature or any NUL byte marks the binary variant.
pub fn sniff_format(bytes: &[u8]) -> FileFormat {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];
    if head.starts_with(BINARY_SIGNATURE) || head.contains(&0) {
        FileFormat::Binary
    } else {
        FileFormat::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_profile_is_text() {
        assert_eq!(sniff_format(b"GstRender.VSyncMode 0\n"), FileFormat::Text);
        assert_eq!(sniff_format(b""), FileFormat::Text);
    }

    #[test]
    fn signature_is_binary() {
        assert_eq!(sniff_format(b"PROFSAVE\x01\x02rest"), FileFormat::Binary);
    }

    #[test]
    fn nul_in_head_is_binary() {
        let mut bytes = b"GstRender.VSyncMode 0\n".to_vec();
        bytes.push(0);
        assert_eq!(sniff_format(&bytes), FileFormat::Binary);
    }

    #[test]
    fn nul_after_head_is_ignored() {
        let mut bytes = vec![b'a'; SNIFF_LEN];
        bytes.push(0);
        assert_eq!(sniff_format(&bytes), FileFormat::Text);
    }
}
