// PKCS#7 padding
use thiserror::Error;

/// The only failure a padding check can report. Its message is exactly the
/// diagnostic a padding oracle service prints.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PaddingError {
    #[error("Error While Unpadding!")]
    Unpadding,
}

pub fn pkcs7_pad(bytes: &[u8], block_size: u8) -> Vec<u8> {
    let n_pad = block_size - (bytes.len() % block_size as usize) as u8;
    let mut out = Vec::with_capacity(bytes.len() + n_pad as usize);
    out.extend_from_slice(bytes);
    out.resize(bytes.len() + n_pad as usize, n_pad);
    out
}

pub fn pkcs7_unpad(bytes: &mut Vec<u8>, block_size: u8) -> Result<(), PaddingError> {
    let n_pad = pkcs7_padding_len(bytes, block_size).ok_or(PaddingError::Unpadding)?;
    bytes.truncate(bytes.len() - n_pad as usize);
    Ok(())
}

fn pkcs7_padding_len(bytes: &[u8], block_size: u8) -> Option<u8> {
    let n_pad = *bytes.last()?;
    if n_pad == 0 || n_pad > block_size || n_pad as usize > bytes.len() {
        return None;
    }
    let padded = &bytes[(bytes.len() - n_pad as usize)..];
    padded.iter().all(|&el| el == n_pad).then_some(n_pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case("YELL", 4, "YELL\x04\x04\x04\x04")]
    #[case("YELLOWS!!!", 6, "YELLOWS!!!\x02\x02")]
    #[case("YELLOW SUBMARINE", 20, "YELLOW SUBMARINE\x04\x04\x04\x04")]
    #[case("HELLO WORLD", 16, "HELLO WORLD\x05\x05\x05\x05\x05")]
    fn pkcs7_pad_pads_message(#[case] msg: &str, #[case] block_size: u8, #[case] expected: &str) {
        let padded = pkcs7_pad(msg.as_bytes(), block_size);

        assert_eq!(padded, expected.as_bytes());
    }

    #[test]
    fn pkcs7_pad_adds_full_block_to_aligned_message() {
        let padded = pkcs7_pad(b"YELLOW SUBMARINE", 16);

        assert_eq!(padded.len(), 32);
        assert!(padded[16..].iter().all(|&b| b == 16));
    }

    const OVERSIZED_PADDING: [u8; 17] = [0x11; 17];

    #[test]
    fn pkcs7_unpad_unpads_message() {
        let mut msg = b"ICE ICE BABY\x04\x04\x04\x04".to_vec();

        let unpadded = pkcs7_unpad(&mut msg, 16);

        assert!(unpadded.is_ok());
        assert_eq!(msg, b"ICE ICE BABY");
    }

    #[rstest]
    #[case(b"ICE ICE BABY\x05\x05\x05\x05".as_slice())]
    #[case(b"ICE ICE BABY\x01\x02\x03\x04".as_slice())]
    #[case(b"ICE ICE BABY\x00".as_slice())]
    #[case(b"".as_slice())]
    #[case(&OVERSIZED_PADDING)]
    fn pkcs7_unpad_returns_err_given_invalid_padding(#[case] padded: &[u8]) {
        let mut msg = padded.to_vec();

        let unpadded = pkcs7_unpad(&mut msg, 16);

        assert_eq!(unpadded, Err(PaddingError::Unpadding));
        assert_eq!(msg, padded);
    }

    #[test]
    fn unpadding_error_message_matches_oracle_diagnostic() {
        assert_eq!(PaddingError::Unpadding.to_string(), "Error While Unpadding!");
    }
}
