//! Intent classification
//!
//! Messages are matched against an ordered rule table using case-insensitive
//! substring checks. The first rule whose keywords appear wins, so a message
//! containing both "add task" and a number is always an add.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Title patterns tried in order for add-task messages
static TITLE_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// First run of ASCII digits
static ORDINAL_PATTERN: OnceLock<Regex> = OnceLock::new();

fn title_patterns() -> &'static [Regex] {
    TITLE_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"(?i)add task[:\s]+(.+)").expect("Invalid add task pattern"),
            Regex::new(r"(?i)create task[:\s]+(.+)").expect("Invalid create task pattern"),
            Regex::new(r"(?i)add[:\s]+(.+)").expect("Invalid add pattern"),
        ]
    })
}

fn ordinal_pattern() -> &'static Regex {
    ORDINAL_PATTERN.get_or_init(|| Regex::new(r"[0-9]+").expect("Invalid ordinal pattern"))
}

/// A 1-based task position as written in the message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordinal(String);

impl Ordinal {
    /// Numeric value, or `None` when the digits overflow `usize`
    pub fn value(&self) -> Option<usize> {
        self.0.parse().ok()
    }
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trimmed = self.0.trim_start_matches('0');
        if trimmed.is_empty() {
            write!(f, "0")
        } else {
            write!(f, "{}", trimmed)
        }
    }
}

/// Classified meaning of one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// `None` when no title could be extracted
    AddTask(Option<String>),
    ListTasks,
    /// `None` when the message has no number
    CompleteTask(Option<Ordinal>),
    DeleteTask(Option<Ordinal>),
    Chat,
}

impl Intent {
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::AddTask(_) => "add_task",
            Intent::ListTasks => "list_tasks",
            Intent::CompleteTask(_) => "complete_task",
            Intent::DeleteTask(_) => "delete_task",
            Intent::Chat => "chat",
        }
    }
}

/// One row of the rule table
pub struct Rule {
    pub keywords: &'static [&'static str],
    pub build: fn(&str) -> Intent,
}

impl Rule {
    /// True when any keyword occurs in the lowercased message
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

/// Rules in priority order
pub static RULES: &[Rule] = &[
    Rule {
        keywords: &["add task", "create task"],
        build: build_add,
    },
    Rule {
        keywords: &["list task", "show task", "what tasks"],
        build: build_list,
    },
    Rule {
        keywords: &["complete task", "finish task"],
        build: build_complete,
    },
    Rule {
        keywords: &["delete task", "remove task"],
        build: build_delete,
    },
];

fn build_add(message: &str) -> Intent {
    Intent::AddTask(extract_title(message))
}

fn build_list(_message: &str) -> Intent {
    Intent::ListTasks
}

fn build_complete(message: &str) -> Intent {
    Intent::CompleteTask(extract_ordinal(message))
}

fn build_delete(message: &str) -> Intent {
    Intent::DeleteTask(extract_ordinal(message))
}

/// Classify a message; anything unmatched is chat
pub fn classify(message: &str) -> Intent {
    let lowered = message.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| (rule.build)(message))
        .unwrap_or(Intent::Chat)
}

/// Trimmed capture of the first pattern that matches
///
/// A blank capture yields `None` without trying later patterns.
pub fn extract_title(message: &str) -> Option<String> {
    title_patterns()
        .iter()
        .find_map(|re| re.captures(message).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str().trim())
        .filter(|title| !title.is_empty())
        .map(str::to_string)
}

/// First integer literal in the message
pub fn extract_ordinal(message: &str) -> Option<Ordinal> {
    ordinal_pattern()
        .find(message)
        .map(|m| Ordinal(m.as_str().to_string()))
}
