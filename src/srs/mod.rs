pub mod due_query;
pub mod intervals;
pub mod scheduler;
pub mod statistics;

pub use due_query::{bucket_for, classify, start_of_day, upcoming_within_days, DueBucket, DueBuckets, UpcomingDays};
pub use intervals::{checked_streak, IntervalTable, ScheduleError};
pub use scheduler::{record_outcome, Scheduler};
pub use statistics::{
  completion_rate, current_streak_days, day_tally, difficulty_breakdown, mastery_breakdown, practice_stats,
  subject_breakdown, DayTally, DifficultyBreakdown, MasteryBreakdown, PracticeStats, SubjectStats,
};
