// Find where the padding of the final block starts
use tracing::debug;

use crate::{
    oracle::{PaddingOracle, Verdict},
    BLOCK_SIZE,
};

use super::{query, AttackError, Target};

/// Number of padding bytes at the end of the final plaintext block.
///
/// Flips (XOR 0xFF) the first `i + 1` bytes of the block feeding the target
/// block for increasing `i`. The first `i` the oracle rejects is the offset
/// of the first padding byte. Issues at most [`BLOCK_SIZE`] queries.
pub fn discover_padding_length<O: PaddingOracle + ?Sized>(
    oracle: &O,
    iv: &[u8; BLOCK_SIZE],
    ciphertext: &[u8],
) -> Result<usize, AttackError> {
    discover_in(oracle, &Target::new(iv, ciphertext)?)
}

pub(crate) fn discover_in<O: PaddingOracle + ?Sized>(
    oracle: &O,
    target: &Target,
) -> Result<usize, AttackError> {
    for i in 0..BLOCK_SIZE {
        let candidate = target.forge(|block| block[..=i].iter_mut().for_each(|b| *b ^= 0xFF));
        let verdict = query(oracle, candidate, "discovery", i)?;
        debug!(flipped = i + 1, ?verdict, "probed padding boundary");
        if verdict == Verdict::Invalid {
            return Ok(BLOCK_SIZE - i);
        }
    }
    Err(AttackError::DiscoveryFailed {
        queries: BLOCK_SIZE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::{
        attack::tests::{GullibleOracle, ScriptedOracle},
        oracle::{local::LocalOracle, EncryptionOracle},
    };

    #[rstest]
    #[case(b"HELLO WORLD".as_slice(), 5)]
    #[case(b"YELLOW SUBMARINE".as_slice(), 16)]
    #[case(b"YELLOW SUBMARINE!".as_slice(), 15)]
    #[case(b"0123456789abcdefWITH ONE PADDIN".as_slice(), 1)]
    #[case(b"".as_slice(), 16)]
    fn discovers_padding_length(#[case] plaintext: &[u8], #[case] expected: usize) {
        let oracle = ScriptedOracle::honest(LocalOracle::random(128).unwrap());
        let (iv, ciphertext) = oracle.inner().encrypt(plaintext).unwrap();

        let padding_length = discover_padding_length(&oracle, &iv, &ciphertext).unwrap();

        assert_eq!(padding_length, expected);
        assert_eq!(oracle.queries(), BLOCK_SIZE - expected + 1);
    }

    #[test]
    fn discovery_fails_explicitly_when_nothing_breaks_the_padding() {
        let result = discover_padding_length(&GullibleOracle, &[0; BLOCK_SIZE], &[0; BLOCK_SIZE]);

        assert!(matches!(
            result,
            Err(AttackError::DiscoveryFailed { queries: BLOCK_SIZE })
        ));
    }

    #[test]
    fn discovery_rejects_partial_blocks() {
        let result = discover_padding_length(&GullibleOracle, &[0; BLOCK_SIZE], &[0; 20]);

        assert!(matches!(
            result,
            Err(AttackError::MalformedCiphertext { len: 20 })
        ));
    }
}
