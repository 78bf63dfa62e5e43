//! Parallel processing configuration
//!
//! The reference mean and the correction both run cell-parallel on Rayon's
//! global pool. Each cell is still reduced in time order, so the thread count
//! never changes the result.

use crate::errors::{IbeError, Result};
use rayon::ThreadPoolBuilder;

/// Configuration for parallel processing
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Create a configuration that uses all available CPU cores
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    /// Set up the global Rayon thread pool with the specified configuration
    ///
    /// # Errors
    ///
    /// Returns [`IbeError::ThreadPool`] if the thread count is zero or the
    /// global pool was already initialized.
    pub fn setup_global_pool(&self) -> Result<()> {
        let Some(num_threads) = self.num_threads else {
            log::debug!(
                "Using default thread pool ({} threads)",
                rayon::current_num_threads()
            );
            return Ok(());
        };

        if num_threads == 0 {
            return Err(IbeError::ThreadPool(
                "thread count must be at least 1".to_string(),
            ));
        }

        ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| {
                IbeError::ThreadPool(format!(
                    "Failed to initialize thread pool with {num_threads} threads: {e}"
                ))
            })?;

        log::info!("Configured parallel processing with {num_threads} threads");
        Ok(())
    }
}
