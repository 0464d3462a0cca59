//! Volatile/extended/empty filtering applied before aggregation

use std::fmt;

use crate::fact::Fact;
use crate::reporter::ReportOptions;

/// Reason a fact was kept out of the namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Volatile fact while volatile facts are excluded
    Volatile,
    /// Extension-only fact while extended facts are excluded
    Extended,
    /// Nothing to report
    Empty,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Volatile => write!(f, "volatile"),
            Rejection::Extended => write!(f, "extended"),
            Rejection::Empty => write!(f, "empty"),
        }
    }
}

/// Filtering policy for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactFilter {
    include_volatile: bool,
    include_extended: bool,
}

impl FactFilter {
    #[must_use]
    pub fn new(include_volatile: bool, include_extended: bool) -> Self {
        Self {
            include_volatile,
            include_extended,
        }
    }

    /// Decide whether a real fact may enter the namespace
    ///
    /// # Errors
    /// Returns the [`Rejection`] reason when the fact must be dropped.
    pub fn check(&self, fact: &Fact) -> Result<(), Rejection> {
        if !self.include_volatile && fact.is_volatile() {
            return Err(Rejection::Volatile);
        }
        if !self.include_extended && !fact.is_native() {
            return Err(Rejection::Extended);
        }
        if fact.is_empty() {
            return Err(Rejection::Empty);
        }
        Ok(())
    }
}

impl From<ReportOptions> for FactFilter {
    fn from(options: ReportOptions) -> Self {
        Self::new(options.include_volatile, options.include_extended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn used_bytes() -> Fact {
        Fact::new(["memory", "system", "used_bytes"], 1024u64).volatile()
    }

    #[test]
    fn test_volatile_dropped_only_when_excluded() {
        assert_eq!(
            FactFilter::new(false, true).check(&used_bytes()),
            Err(Rejection::Volatile)
        );
        assert_eq!(FactFilter::new(true, true).check(&used_bytes()), Ok(()));
    }

    #[test]
    fn test_extended_dropped_only_when_excluded() {
        let boot_time = Fact::new(["system_uptime", "boot_time"], 1_700_000_000u64).extended();

        assert_eq!(
            FactFilter::new(true, false).check(&boot_time),
            Err(Rejection::Extended)
        );
        assert_eq!(FactFilter::new(true, true).check(&boot_time), Ok(()));
    }

    #[test]
    fn test_empty_dropped_regardless_of_flags() {
        let domain = Fact::new(["networking", "domain"], "");

        for (volatile, extended) in [(true, true), (true, false), (false, true), (false, false)] {
            assert_eq!(
                FactFilter::new(volatile, extended).check(&domain),
                Err(Rejection::Empty)
            );
        }
    }

    #[test]
    fn test_zero_is_kept() {
        let swap = Fact::new(["memory", "swap", "total_bytes"], 0u64);
        assert_eq!(FactFilter::new(false, false).check(&swap), Ok(()));
    }

    #[test]
    fn test_from_options() {
        let filter = FactFilter::from(ReportOptions {
            include_volatile: false,
            include_extended: true,
        });
        assert_eq!(filter, FactFilter::new(false, true));
    }
}
