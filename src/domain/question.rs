use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ReviewState, ReviewableItem, Schedulable};
use crate::srs::Scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  #[default]
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Easy => "easy",
      Self::Medium => "medium",
      Self::Hard => "hard",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "easy" => Some(Self::Easy),
      "medium" => Some(Self::Medium),
      "hard" => Some(Self::Hard),
      _ => None,
    }
  }
}

/// User-editable fields of a question
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewQuestion {
  pub title: String,
  /// Question text as it appeared in the source
  pub content: String,
  /// Worked solution or why the original answer was wrong
  pub explanation: String,
  pub notes: String,
  pub subject: String,
  pub chapter: String,
  /// Where the question came from (textbook, exam paper, ...)
  pub source: String,
  pub difficulty: Difficulty,
  pub tags: Vec<String>,
}

impl NewQuestion {
  pub fn new(title: impl Into<String>, subject: impl Into<String>, difficulty: Difficulty) -> Self {
    Self {
      title: title.into(),
      subject: subject.into(),
      difficulty,
      ..Self::default()
    }
  }

  pub fn with_tags<I, S>(mut self, tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.tags = tags.into_iter().map(Into::into).collect();
    self
  }
}

/// Trim tags, drop empty ones and duplicates, keeping first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
  let mut seen = std::collections::HashSet::new();
  tags
    .into_iter()
    .map(|t| t.trim().to_string())
    .filter(|t| !t.is_empty() && seen.insert(t.clone()))
    .collect()
}

/// A logged mistake: the schedulable item plus what the user recorded about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
  #[serde(flatten)]
  pub item: ReviewableItem,
  pub title: String,
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub explanation: String,
  #[serde(default)]
  pub notes: String,
  pub subject: String,
  #[serde(default)]
  pub chapter: String,
  #[serde(default)]
  pub source: String,
  pub difficulty: Difficulty,
  #[serde(default)]
  pub tags: Vec<String>,
}

impl Question {
  pub fn new(id: impl Into<String>, input: NewQuestion, now: DateTime<Utc>, scheduler: &Scheduler) -> Self {
    let mut question = Self {
      item: ReviewableItem::new(id, now, scheduler),
      title: String::new(),
      content: String::new(),
      explanation: String::new(),
      notes: String::new(),
      subject: String::new(),
      chapter: String::new(),
      source: String::new(),
      difficulty: Difficulty::default(),
      tags: Vec::new(),
    };
    question.set_details(input);
    question
  }

  /// Copy of the user-editable fields
  pub fn details(&self) -> NewQuestion {
    NewQuestion {
      title: self.title.clone(),
      content: self.content.clone(),
      explanation: self.explanation.clone(),
      notes: self.notes.clone(),
      subject: self.subject.clone(),
      chapter: self.chapter.clone(),
      source: self.source.clone(),
      difficulty: self.difficulty,
      tags: self.tags.clone(),
    }
  }

  /// Replace the user-editable fields. Review state is untouched.
  pub fn set_details(&mut self, details: NewQuestion) {
    self.title = details.title;
    self.content = details.content;
    self.explanation = details.explanation;
    self.notes = details.notes;
    self.subject = details.subject;
    self.chapter = details.chapter;
    self.source = details.source;
    self.difficulty = details.difficulty;
    self.tags = normalize_tags(details.tags);
  }
}

impl Schedulable for Question {
  fn id(&self) -> &str {
    self.item.id()
  }

  fn review_state(&self) -> &ReviewState {
    self.item.review_state()
  }
}

/// Opaque question id: creation time in base 16 followed by random bits.
pub fn generate_id(now: DateTime<Utc>) -> String {
  format!("{:x}{:08x}", now.timestamp_millis(), rand::random::<u32>())
}
