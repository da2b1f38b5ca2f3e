use crate::{LoopPlayerError, Result};

/// Largest number of output channels a mask can describe.
pub const MAX_OUTPUT_CHANNELS: usize = 256;

const WORD_BITS: usize = u64::BITS as usize;
const WORDS: usize = MAX_OUTPUT_CHANNELS / WORD_BITS;

/// Set of output channels the device currently expects data for.
///
/// Stored inline so it can be copied into the audio callback without touching
/// the heap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OutputChannelMask {
    words: [u64; WORDS],
}

impl OutputChannelMask {
    pub const fn empty() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Mask with channels `0..count` active. Counts above the capacity are
    /// clamped.
    pub fn first_n(count: usize) -> Self {
        let mut mask = Self::empty();
        for index in 0..count.min(MAX_OUTPUT_CHANNELS) {
            mask.set(index, true);
        }
        mask
    }

    pub fn from_indices<I>(indices: I) -> Result<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut mask = Self::empty();
        for index in indices {
            mask.insert(index)?;
        }
        Ok(mask)
    }

    pub fn insert(&mut self, index: usize) -> Result<()> {
        check_index(index)?;
        self.set(index, true);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<()> {
        check_index(index)?;
        self.set(index, false);
        Ok(())
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index < MAX_OUTPUT_CHANNELS && self.words[index / WORD_BITS] & (1 << (index % WORD_BITS)) != 0
    }

    /// Highest active channel index, if any channel is active.
    pub fn highest(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .rev()
            .find(|(_, word)| **word != 0)
            .map(|(slot, word)| slot * WORD_BITS + (WORD_BITS - 1 - word.leading_zeros() as usize))
    }

    /// Number of output channels the renderer has to address: the highest
    /// active index plus one, or zero for an empty mask.
    #[inline]
    pub fn addressable_channels(&self) -> usize {
        self.highest().map_or(0, |highest| highest + 1)
    }

    pub fn active_count(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    /// Active channel indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.addressable_channels()).filter(move |index| self.contains(*index))
    }

    fn set(&mut self, index: usize, active: bool) {
        let bit = 1 << (index % WORD_BITS);
        let word = &mut self.words[index / WORD_BITS];
        if active {
            *word |= bit;
        } else {
            *word &= !bit;
        }
    }
}

fn check_index(index: usize) -> Result<()> {
    if index >= MAX_OUTPUT_CHANNELS {
        return Err(LoopPlayerError::ChannelOutOfRange {
            index,
            capacity: MAX_OUTPUT_CHANNELS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mask_addresses_nothing() {
        let mask = OutputChannelMask::empty();
        assert!(mask.is_empty());
        assert_eq!(mask.highest(), None);
        assert_eq!(mask.addressable_channels(), 0);
    }

    #[test]
    fn sparse_mask_addresses_up_to_highest_bit() {
        let mask = OutputChannelMask::from_indices([1, 3]).unwrap();

        assert_eq!(mask.addressable_channels(), 4);
        assert_eq!(mask.active_count(), 2);
        assert!(!mask.contains(0));
        assert!(mask.contains(3));
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn tracks_channels_beyond_first_word() {
        let mut mask = OutputChannelMask::first_n(2);
        mask.insert(130).unwrap();
        assert_eq!(mask.highest(), Some(130));

        mask.remove(130).unwrap();
        assert_eq!(mask.addressable_channels(), 2);
    }

    #[test]
    fn rejects_indices_past_capacity() {
        let err = OutputChannelMask::from_indices([MAX_OUTPUT_CHANNELS]).unwrap_err();
        assert!(matches!(err, LoopPlayerError::ChannelOutOfRange { .. }));
        assert!(!OutputChannelMask::first_n(usize::MAX).contains(MAX_OUTPUT_CHANNELS));
    }
}
