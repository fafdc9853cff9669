// Recover the message bytes of the final block, last byte first
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::{
    oracle::{PaddingOracle, Verdict},
    BLOCK_SIZE,
};

use super::{query, AttackConfig, AttackError, Target};

/// Recover the `BLOCK_SIZE - padding_length` message bytes that precede the
/// padding of the final block, returned in order.
///
/// Up to 256 queries per recovered byte. With `parallel` set the masks for
/// each byte are probed on the rayon pool; the lowest validating mask still
/// wins, so the result is the same either way.
pub fn recover_bytes<O: PaddingOracle + Sync + ?Sized>(
    oracle: &O,
    iv: &[u8; BLOCK_SIZE],
    ciphertext: &[u8],
    padding_length: usize,
    parallel: bool,
) -> Result<Vec<u8>, AttackError> {
    let target = Target::new(iv, ciphertext)?;
    let config = AttackConfig::default().parallel(parallel);
    recover_in(oracle, &target, padding_length, config)
}

pub(crate) fn recover_in<O: PaddingOracle + Sync + ?Sized>(
    oracle: &O,
    target: &Target,
    padding_length: usize,
    config: AttackConfig,
) -> Result<Vec<u8>, AttackError> {
    if !(1..=BLOCK_SIZE).contains(&padding_length) {
        return Err(AttackError::PaddingLengthOutOfRange(padding_length));
    }

    // Filled back to front; a byte is never revisited once found.
    let mut recovered: Vec<u8> = Vec::with_capacity(BLOCK_SIZE - padding_length);
    for step in 0..BLOCK_SIZE - padding_length {
        let known = padding_length + step;
        let offset = BLOCK_SIZE - known - 1;
        let forced = ForcedPadding {
            offset,
            padding_length: padding_length as u8,
            forced: (known + 1) as u8,
            recovered: &recovered,
        };

        let probe = |mask: u8| -> Option<Result<u8, AttackError>> {
            let candidate = target.forge(|block| forced.apply(block, mask));
            match query(oracle, candidate, "recovery", offset) {
                Ok(Verdict::Valid) => Some(Ok(mask)),
                Ok(Verdict::Invalid) => {
                    trace!(offset, mask, "mask rejected");
                    None
                }
                Err(e) => Some(Err(e)),
            }
        };
        let found = if config.parallel {
            (0..=u8::MAX).into_par_iter().find_map_first(probe)
        } else {
            (0..=u8::MAX).find_map(probe)
        };

        let mask = match found {
            Some(result) => result?,
            None => {
                warn!(step, offset, "no mask produced valid padding");
                return Err(AttackError::RecoveryStalled { step, offset });
            }
        };
        let byte = mask ^ forced.forced;
        debug!(step, offset, byte, "recovered plaintext byte");
        recovered.insert(0, byte);
    }
    Ok(recovered)
}

/// Rewrites the preceding block so that the last `BLOCK_SIZE - offset - 1`
/// plaintext bytes all decrypt to `forced`, and byte `offset` decrypts to its
/// true value XOR the mask.
struct ForcedPadding<'a> {
    offset: usize,
    padding_length: u8,
    forced: u8,
    recovered: &'a [u8],
}

impl ForcedPadding<'_> {
    fn apply(&self, block: &mut [u8; BLOCK_SIZE], mask: u8) {
        block[self.offset] ^= mask;
        let (known, padding) = block[self.offset + 1..].split_at_mut(self.recovered.len());
        known
            .iter_mut()
            .zip(self.recovered)
            .for_each(|(b, plain)| *b ^= plain ^ self.forced);
        padding
            .iter_mut()
            .for_each(|b| *b ^= self.padding_length ^ self.forced);
    }
}
