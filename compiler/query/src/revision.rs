use std::fmt;

/// Logical time for a compilation session.
///
/// The revision only ever increases, and it increases exactly when an
/// external input changes. Cache entries stamp themselves with the revision
/// they were computed and last validated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(u64);

impl Revision {
    /// Sentinel for "never": predates every real revision.
    pub const ZERO: Revision = Revision(0);
    /// The revision a fresh context starts at.
    pub const START: Revision = Revision(1);

    pub fn next(self) -> Revision {
        Revision(self.0 + 1)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strictly_increasing() {
        let r = Revision::START;
        assert!(r > Revision::ZERO);
        assert!(r.next() > r);
        assert_eq!(r.next().as_u64(), 2);
    }
}
