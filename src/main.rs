use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mistake_notebook::db::{QuestionFilter, QuestionSort};
use mistake_notebook::domain::{
  Difficulty, NewQuestion, Question, ReviewLog, ReviewOutcome, ReviewStatus, Schedulable,
};
use mistake_notebook::services::{backup, review};
use mistake_notebook::srs::{self, DueBuckets};
use mistake_notebook::{config, db, paths};

#[derive(Parser)]
#[command(name = "mistake-notebook")]
#[command(about = "Mistake notebook with Ebbinghaus review scheduling")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Log a question you got wrong
  Add {
    title: String,
    #[arg(long, short)]
    subject: String,
    #[arg(long, short, default_value = "medium", value_parser = parse_difficulty)]
    difficulty: Difficulty,
    #[command(flatten)]
    annotations: Annotations,
  },
  /// List questions matching the given filters
  List {
    #[arg(long, short)]
    subject: Option<String>,
    #[arg(long, short, value_parser = parse_difficulty)]
    difficulty: Option<Difficulty>,
    /// new, active or mastered
    #[arg(long, value_parser = parse_status)]
    status: Option<ReviewStatus>,
    /// Match questions carrying any of these tags
    #[arg(long = "tag", short)]
    tags: Vec<String>,
    /// Search title, content, explanation and notes
    #[arg(long, short)]
    keyword: Option<String>,
    /// Created on or after this date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Created on or before this date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
    /// created, due, title, subject, reviews or streak
    #[arg(long, default_value = "created", value_parser = parse_sort)]
    sort: QuestionSort,
    #[arg(long)]
    desc: bool,
    #[arg(long)]
    limit: Option<usize>,
    #[arg(long, default_value_t = 0)]
    offset: usize,
  },
  /// Show one question with its review history
  Show { id: String },
  /// Change a question's details; omitted fields keep their value
  Edit {
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    subject: Option<String>,
    #[arg(long, value_parser = parse_difficulty)]
    difficulty: Option<Difficulty>,
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    explanation: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    chapter: Option<String>,
    #[arg(long)]
    source: Option<String>,
    /// Replace the tag list (repeatable)
    #[arg(long = "tag")]
    tags: Option<Vec<String>>,
  },
  /// Record a review: correct or wrong
  Review {
    id: String,
    #[arg(value_parser = parse_outcome)]
    outcome: ReviewOutcome,
    /// Time taken to answer, in milliseconds
    #[arg(long)]
    response_ms: Option<i64>,
  },
  /// Overdue, due today, and upcoming questions
  Agenda,
  /// Questions falling due on each of the next few days
  Calendar {
    #[arg(long, default_value_t = config::DEFAULT_CALENDAR_DAYS)]
    days: u32,
  },
  /// Progress statistics
  Stats,
  /// Delete a question and its review history
  Delete { id: String },
  /// Delete every question and review
  Clear {
    /// Confirm wiping the notebook
    #[arg(long)]
    yes: bool,
  },
  /// Export the notebook as JSON
  Export {
    #[arg(long, short)]
    output: Option<PathBuf>,
  },
  /// Merge questions from an export file
  Import { file: PathBuf },
}

/// Optional free-text fields recorded with a question
#[derive(Args)]
struct Annotations {
  /// Full question text
  #[arg(long, default_value = "")]
  content: String,
  /// Correct solution or why the answer was wrong
  #[arg(long, default_value = "")]
  explanation: String,
  #[arg(long, default_value = "")]
  notes: String,
  #[arg(long, default_value = "")]
  chapter: String,
  /// Where the question came from (book, exam, ...)
  #[arg(long, default_value = "")]
  source: String,
  #[arg(long = "tag", short)]
  tags: Vec<String>,
}

fn parse_status(s: &str) -> std::result::Result<ReviewStatus, String> {
  ReviewStatus::from_str(&s.to_lowercase()).ok_or_else(|| format!("expected new, active or mastered, got '{}'", s))
}

fn parse_sort(s: &str) -> std::result::Result<QuestionSort, String> {
  QuestionSort::from_str(&s.to_lowercase())
    .ok_or_else(|| format!("expected created, due, title, subject, reviews or streak, got '{}'", s))
}

fn parse_difficulty(s: &str) -> std::result::Result<Difficulty, String> {
  Difficulty::from_str(&s.to_lowercase()).ok_or_else(|| format!("expected easy, medium or hard, got '{}'", s))
}

fn parse_outcome(s: &str) -> std::result::Result<ReviewOutcome, String> {
  ReviewOutcome::from_str(&s.to_lowercase()).ok_or_else(|| format!("expected correct or wrong, got '{}'", s))
}

fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "mistake_notebook=info".into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let cli = Cli::parse();

  let scheduler = config::load_scheduler();
  let db_path = config::load_database_path();
  let pool = db::init_db(&db_path).with_context(|| format!("Failed to open database {}", db_path.display()))?;
  let mut conn = db::try_lock(&pool)?;

  // One clock reading per command so every query agrees on "today"
  let now = Utc::now();

  match cli.command {
    Command::Add {
      title,
      subject,
      difficulty,
      annotations,
    } => {
      let input = NewQuestion {
        content: annotations.content,
        explanation: annotations.explanation,
        notes: annotations.notes,
        chapter: annotations.chapter,
        source: annotations.source,
        ..NewQuestion::new(title, subject, difficulty)
      }
      .with_tags(annotations.tags);
      let question = review::add_question(&conn, &scheduler, input, now)?;
      println!(
        "Added {} (first review {})",
        question.id(),
        question.review_state().next_due_at().format("%Y-%m-%d")
      );
    }
    Command::List {
      subject,
      difficulty,
      status,
      tags,
      keyword,
      from,
      to,
      sort,
      desc,
      limit,
      offset,
    } => {
      let filter = QuestionFilter {
        subject,
        difficulty,
        status,
        tags,
        keyword,
        created_from: from.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc()),
        created_to: to.and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999)).map(|dt| dt.and_utc()),
        sort,
        descending: desc,
        limit,
        offset,
      };
      let questions = db::query_questions(&conn, &filter)?;
      let total = db::count_questions(&conn, &filter)?;
      if total == 0 {
        println!("No matching questions.");
      }
      for question in &questions {
        print_question_line(question);
      }
      if questions.len() as i64 != total {
        println!("Showing {} of {}", questions.len(), total);
      }
    }
    Command::Show { id } => {
      let Some(question) = db::get_question_by_id(&conn, &id)? else {
        bail!("Question not found: {}", id);
      };
      let state = question.review_state();
      println!("{}", question.title);
      println!("  id:          {}", question.id());
      println!("  subject:     {}", question.subject);
      println!("  difficulty:  {}", question.difficulty.as_str());
      let annotations = [
        ("chapter", &question.chapter),
        ("source", &question.source),
        ("content", &question.content),
        ("explanation", &question.explanation),
        ("notes", &question.notes),
      ];
      for (label, value) in annotations {
        if !value.is_empty() {
          println!("  {:<12} {}", format!("{}:", label), value);
        }
      }
      if !question.tags.is_empty() {
        println!("  tags:        {}", question.tags.join(", "));
      }
      println!("  status:      {}", state.status().as_str());
      println!("  streak:      {}", state.success_streak());
      println!("  reviews:     {}", state.review_count());
      println!("  next due:    {}", format_time(state.next_due_at()));
      if let Some(last) = state.last_reviewed_at() {
        println!("  last review: {}", format_time(last));
      }
      for log in db::get_review_logs_for_question(&conn, &id)? {
        println!(
          "  - {} {}",
          format_time(log.reviewed_at),
          ReviewOutcome::from(log.correct).as_str()
        );
      }
    }
    Command::Edit {
      id,
      title,
      subject,
      difficulty,
      content,
      explanation,
      notes,
      chapter,
      source,
      tags,
    } => {
      let Some(question) = db::get_question_by_id(&conn, &id)? else {
        bail!("Question not found: {}", id);
      };
      let current = question.details();
      let details = NewQuestion {
        title: title.unwrap_or(current.title),
        content: content.unwrap_or(current.content),
        explanation: explanation.unwrap_or(current.explanation),
        notes: notes.unwrap_or(current.notes),
        subject: subject.unwrap_or(current.subject),
        chapter: chapter.unwrap_or(current.chapter),
        source: source.unwrap_or(current.source),
        difficulty: difficulty.unwrap_or(current.difficulty),
        tags: tags.unwrap_or(current.tags),
      };
      db::update_question_details(&conn, &id, &details)?;
      println!("Updated {}", id);
    }
    Command::Review {
      id,
      outcome,
      response_ms,
    } => {
      let recorded = match review::record_review(&mut conn, &scheduler, &id, outcome, now, response_ms) {
        Ok(recorded) => recorded,
        Err(e) => return Err(review_failure(e)),
      };
      let state = recorded.question.review_state();
      println!(
        "{}: {} (streak {}), next review {}",
        outcome.as_str(),
        state.status().as_str(),
        state.success_streak(),
        state.next_due_at().format("%Y-%m-%d")
      );
    }
    Command::Agenda => {
      let questions = db::get_all_questions(&conn)?;
      let buckets = srs::classify(&questions, now);
      print_agenda(&buckets);
    }
    Command::Calendar { days } => {
      let questions = db::get_all_questions(&conn)?;
      for (date, due) in srs::upcoming_within_days(&questions, now, days) {
        println!("{}  {} due", date, due.len());
        for question in due {
          println!("    {}  {}", question.id(), question.title);
        }
      }
    }
    Command::Stats => {
      let questions = db::get_all_questions(&conn)?;
      // Completion and streak walk the whole history; accuracy covers a recent window
      let history = db::get_review_logs(&conn)?;
      let window_start = now - Duration::days(config::PRACTICE_STATS_WINDOW_DAYS);
      let recent = db::get_review_logs_since(&conn, window_start)?;
      print_stats(&questions, &history, &recent, now);
    }
    Command::Delete { id } => {
      if !db::delete_question(&conn, &id)? {
        bail!("Question not found: {}", id);
      }
      println!("Deleted {}", id);
    }
    Command::Clear { yes } => {
      if !yes {
        bail!("Refusing to clear the notebook without --yes");
      }
      let questions = db::get_question_count(&conn)?;
      let reviews = db::get_review_count(&conn)?;
      db::clear_all(&conn)?;
      println!("Cleared {} questions and {} reviews", questions, reviews);
    }
    Command::Export { output } => {
      let path = output.unwrap_or_else(|| {
        PathBuf::from(paths::exports_dir()).join(format!("notebook-{}.json", now.format("%Y%m%d-%H%M%S")))
      });
      let manifest = backup::write_export(&conn, &path, now)?;
      println!(
        "Exported {} questions to {}",
        manifest.questions.len(),
        path.display()
      );
    }
    Command::Import { file } => {
      let result = backup::import_from_file(&mut conn, &scheduler, &file)?;
      println!(
        "Imported {} questions ({} already present), {} reviews",
        result.questions_imported,
        result.skipped_ids.len(),
        result.logs_imported
      );
    }
  }

  Ok(())
}

/// User-facing message on top, the underlying error kept as its source
fn review_failure(e: review::ReviewError) -> anyhow::Error {
  let message = e.user_message();
  anyhow::Error::new(e).context(message)
}

fn format_time(dt: DateTime<Utc>) -> String {
  dt.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn print_question_line(question: &Question) {
  let state = question.review_state();
  println!(
    "{}  [{}] {} ({}, {}, due {})",
    question.id(),
    question.subject,
    question.title,
    question.difficulty.as_str(),
    state.status().as_str(),
    state.next_due_at().format("%Y-%m-%d")
  );
}

fn print_agenda(buckets: &DueBuckets<'_, Question>) {
  let sections = [
    ("Overdue", &buckets.overdue),
    ("Due today", &buckets.due_today),
    ("Upcoming", &buckets.upcoming),
  ];
  for (label, questions) in sections {
    println!("{} ({})", label, questions.len());
    for question in questions.iter() {
      print_question_line(question);
    }
  }
  println!("{} to review now", buckets.due_now_count());
}

fn print_stats(questions: &[Question], history: &[ReviewLog], recent: &[ReviewLog], now: DateTime<Utc>) {
  let mastery = srs::mastery_breakdown(questions);
  let today = now.date_naive();
  let tally = srs::day_tally(questions, history, today);
  let practice = srs::practice_stats(recent, now, config::PRACTICE_STATS_WINDOW_DAYS);
  let difficulty = srs::difficulty_breakdown(questions);

  println!(
    "Questions:   {} ({} new, {} active, {} mastered)",
    mastery.total(),
    mastery.new,
    mastery.active,
    mastery.mastered
  );
  println!("Mastered:    {:.0}%", mastery.mastered_rate() * 100.0);
  println!(
    "Today:       {}/{} reviewed ({:.0}%)",
    tally.reviewed,
    tally.due,
    srs::completion_rate(questions, history, today)
  );
  println!("Streak:      {} days", srs::current_streak_days(questions, history, now));
  println!(
    "Last {} days: {} attempts, {:.0}% correct",
    config::PRACTICE_STATS_WINDOW_DAYS,
    practice.total_attempts,
    practice.accuracy_percent()
  );
  if let Some(avg) = practice.average_response_ms {
    println!("Avg answer:  {:.1}s", avg / 1000.0);
  }
  println!(
    "Difficulty:  {} easy, {} medium, {} hard",
    difficulty.easy, difficulty.medium, difficulty.hard
  );
  for subject in srs::subject_breakdown(questions) {
    println!(
      "  {:<16} {} total, {} mastered, {} pending",
      subject.subject, subject.total, subject.mastered, subject.pending
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_review_failure_keeps_database_cause() {
    let err = review_failure(review::ReviewError::Database(rusqlite::Error::QueryReturnedNoRows));
    assert_eq!(err.to_string(), "Could not save the review");
    assert!(err.chain().count() >= 3);
    assert!(err.root_cause().downcast_ref::<rusqlite::Error>().is_some());
  }

  #[test]
  fn test_review_failure_not_found() {
    let err = review_failure(review::ReviewError::NotFound("q9".into()));
    assert_eq!(err.to_string(), "No question with that id");
    assert!(err.downcast_ref::<review::ReviewError>().is_some());
  }

  #[test]
  fn test_cli_parses_list_filters() {
    let cli = Cli::try_parse_from([
      "mistake-notebook",
      "list",
      "--status",
      "mastered",
      "--tag",
      "algebra",
      "--tag",
      "limits",
      "--sort",
      "due",
      "--desc",
      "--limit",
      "5",
    ])
    .unwrap();
    match cli.command {
      Command::List {
        status,
        tags,
        sort,
        desc,
        limit,
        offset,
        ..
      } => {
        assert_eq!(status, Some(ReviewStatus::Mastered));
        assert_eq!(tags, vec!["algebra", "limits"]);
        assert_eq!(sort, QuestionSort::NextDue);
        assert!(desc);
        assert_eq!(limit, Some(5));
        assert_eq!(offset, 0);
      }
      _ => panic!("expected list"),
    }
  }
}
