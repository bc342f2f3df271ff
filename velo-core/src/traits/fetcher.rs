use crate::errors::VeloResult;

/// Performs the speculative fetch for an admitted cache entry.
///
/// Invoked only from inside worker task bodies. Returns the fetched size
/// in bytes so the cache can correct its estimate.
pub trait IPrefetchFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> VeloResult<u64>;
}
