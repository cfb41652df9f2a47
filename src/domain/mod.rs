pub mod item;
pub mod question;
pub mod review;

pub use item::{ReviewState, ReviewStatus, ReviewableItem, Schedulable};
pub use question::{generate_id, normalize_tags, Difficulty, NewQuestion, Question};
pub use review::{ReviewLog, ReviewOutcome};
