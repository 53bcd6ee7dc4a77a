pub mod description;
mod detection;
mod food_tracker;
mod matching;
mod rect;
mod track;
mod track_state;

pub use detection::Detection;
pub use food_tracker::{Assignment, FoodTracker, TrackerConfig};
pub use matching::{AssignmentResult, GreedyMatcher, MatchingStrategy, OptimalMatcher};
pub use rect::Rect;
pub use track::{FoodTrack, reset_track_id_counter};
pub use track_state::TrackState;
