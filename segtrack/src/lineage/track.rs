use super::object::SegmentedObject;

/// State of the (previous, next) relation between an earlier object `p` and
/// a later object `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum LinkState {
    Unlinked,
    /// `n.previous == p` but `p.next != n`.
    OnewayPrevious,
    /// `p.next == n` but `n.previous != p`.
    OnewayNext,
    /// Confirmed track edge.
    DoubleLinked,
}

impl LinkState {
    pub fn of(p: &SegmentedObject, n: &SegmentedObject) -> Self {
        let forward = p.next == Some(n.id);
        let backward = n.previous == Some(p.id);
        match (forward, backward) {
            (true, true) => LinkState::DoubleLinked,
            (true, false) => LinkState::OnewayNext,
            (false, true) => LinkState::OnewayPrevious,
            (false, false) => LinkState::Unlinked,
        }
    }

    #[inline]
    pub fn is_double(self) -> bool {
        self == LinkState::DoubleLinked
    }
}
