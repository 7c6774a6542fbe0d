//! # Buffer Cache Layout

use crate::ConfigError;

/// Hard cap on the number of block buffers.
///
/// The buffer data region is carved out of a fixed memory window; growing the
/// pool beyond this requires moving that window.
pub const MAX_BUFFERS: usize = 512;

/// Sizing of the block buffer cache.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Number of buffer slots in the pool.
    pub nr_buffers: usize,
    /// Number of hash chains. Independent of `nr_buffers`; collisions chain.
    pub hashtab_size: usize,
    /// Size of one block payload in bytes.
    pub block_size: usize,
    /// Blocks permanently occupied by file-system metadata
    /// (superblock, inode map and zone map).
    pub reserved_blocks: usize,
}

impl CacheConfig {
    pub const DEFAULT: Self = Self {
        nr_buffers: 256,
        hashtab_size: 227,
        block_size: 1024,
        reserved_blocks: 8,
    };

    /// Checks the pool against the hard cap and the metadata reservation rule.
    ///
    /// Metadata may not pin more than 1/16 of the pool, otherwise the cache
    /// degenerates into a metadata cache.
    ///
    /// # Errors
    /// Returns the first violated invariant.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.nr_buffers == 0 {
            return Err(ConfigError::EmptyPool);
        }
        if self.nr_buffers > MAX_BUFFERS {
            return Err(ConfigError::TooManyBuffers {
                requested: self.nr_buffers,
                max: MAX_BUFFERS,
            });
        }
        if self.hashtab_size == 0 {
            return Err(ConfigError::EmptyHashTable);
        }
        if self.block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        let limit = self.nr_buffers / 16;
        if self.reserved_blocks > limit {
            return Err(ConfigError::MetadataTooLarge {
                reserved: self.reserved_blocks,
                limit,
            });
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

const _: () = {
    assert!(CacheConfig::DEFAULT.validate().is_ok());
};
