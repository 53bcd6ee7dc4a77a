/// Track state enumeration for the object tracking lifecycle.
///
/// `Retired` is terminal: a retired track never re-enters the matching pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Matched in the most recent frame
    #[default]
    Active,
    /// Momentarily unmatched, still eligible for re-association
    Occluded,
    /// Presumed gone from the scene, handed off for aggregation
    Retired,
}
