//! Infinite-scroll continuation.
//!
//! The sentinel at the end of the loaded rows asks the [`PageLoader`] whether
//! it may fetch. The loader only says yes when more pages exist, nothing is in
//! flight, the initial page has landed, and the last fetch did not fail.

/// Why the sentinel may not load the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadGate {
    Open,
    NoMorePages,
    InFlight,
    InitialPending,
    /// A fetch failed; auto-load is off until [`PageLoader::retry`].
    Failed,
}

/// Fetch-gating state for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLoader {
    has_next: bool,
    in_flight: bool,
    initial_loaded: bool,
    failed: bool,
}

impl Default for PageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PageLoader {
    pub fn new() -> Self {
        Self {
            has_next: true,
            in_flight: false,
            initial_loaded: false,
            failed: false,
        }
    }

    pub fn gate(&self) -> LoadGate {
        if self.failed {
            LoadGate::Failed
        } else if self.in_flight {
            LoadGate::InFlight
        } else if !self.initial_loaded {
            LoadGate::InitialPending
        } else if !self.has_next {
            LoadGate::NoMorePages
        } else {
            LoadGate::Open
        }
    }

    /// Sentinel entered the viewport. Returns true and marks a fetch in
    /// flight if the next page should load now.
    pub fn on_sentinel_visible(&mut self) -> bool {
        if self.gate() != LoadGate::Open {
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Claim the initial fetch. False if it already ran, is running, or
    /// failed without a retry.
    pub fn begin_initial(&mut self) -> bool {
        if self.initial_loaded || self.in_flight || self.failed {
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Claim a full refetch of the loaded window. Refused while another
    /// fetch is running or after a failure.
    pub fn begin_refetch(&mut self) -> bool {
        if self.in_flight || self.failed {
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Record a completed fetch.
    pub fn on_loaded(&mut self, has_next: bool) {
        self.in_flight = false;
        self.initial_loaded = true;
        self.has_next = has_next;
        self.failed = false;
    }

    /// Record a failed fetch. Existing rows stay; auto-load stops.
    pub fn on_failed(&mut self) {
        self.in_flight = false;
        self.failed = true;
    }

    /// User-initiated retry after a failure.
    pub fn retry(&mut self) {
        self.failed = false;
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    pub fn initial_loaded(&self) -> bool {
        self.initial_loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_waits_for_initial_load() {
        let mut loader = PageLoader::new();
        assert_eq!(loader.gate(), LoadGate::InitialPending);
        assert!(!loader.on_sentinel_visible());

        assert!(loader.begin_initial());
        assert!(!loader.begin_initial());
        loader.on_loaded(true);
        assert!(loader.on_sentinel_visible());
    }

    #[test]
    fn test_no_duplicate_concurrent_fetch() {
        let mut loader = PageLoader::new();
        loader.begin_initial();
        loader.on_loaded(true);

        assert!(loader.on_sentinel_visible());
        assert_eq!(loader.gate(), LoadGate::InFlight);
        assert!(!loader.on_sentinel_visible());

        loader.on_loaded(false);
        assert_eq!(loader.gate(), LoadGate::NoMorePages);
        assert!(!loader.on_sentinel_visible());
    }

    #[test]
    fn test_failure_stops_until_retry() {
        let mut loader = PageLoader::new();
        loader.begin_initial();
        loader.on_loaded(true);
        loader.on_sentinel_visible();
        loader.on_failed();

        assert_eq!(loader.gate(), LoadGate::Failed);
        assert!(!loader.on_sentinel_visible());
        assert!(!loader.on_sentinel_visible());

        loader.retry();
        assert!(loader.on_sentinel_visible());
    }

    #[test]
    fn test_initial_failure_can_retry() {
        let mut loader = PageLoader::new();
        loader.begin_initial();
        loader.on_failed();
        assert!(!loader.begin_initial());
        loader.retry();
        assert!(loader.begin_initial());
    }

    #[test]
    fn test_refetch_is_exclusive() {
        let mut loader = PageLoader::new();
        loader.begin_initial();
        assert!(!loader.begin_refetch());
        loader.on_loaded(false);
        assert!(loader.begin_refetch());
        assert!(!loader.on_sentinel_visible());
    }
}
