//! Prompt Classification
//!
//! Heuristic scoring of a conversation into one of four task types. The
//! code signal is a table of `(pattern, weight)` entries evaluated
//! independently over the joined message text; complexity and simplicity
//! come from fixed vocabularies.
//!
//! The scores are best-effort. The only guarantees are determinism and the
//! precedence `code > complex > simple > general`.

use crate::api::ChatMessage;
use crate::config::ClassificationConfig;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Weight of each programming keyword present in the text
const KEYWORD_WEIGHT: f64 = 0.1;

/// Weight of each complexity term present in the text
const COMPLEXITY_WEIGHT: f64 = 0.1;

/// Weight of each short-query phrase present in the text
const SIMPLE_WEIGHT: f64 = 0.2;

/// Minimum simple confidence for a prompt to count as simple
const SIMPLE_MIN_CONFIDENCE: f64 = 0.2;

/// Simple prompts span at most this many messages
const SIMPLE_MAX_MESSAGES: usize = 2;

/// Heuristic category of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Code,
    Complex,
    Simple,
    General,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::Code,
        TaskType::Complex,
        TaskType::Simple,
        TaskType::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Code => "code",
            TaskType::Complex => "complex",
            TaskType::Simple => "simple",
            TaskType::General => "general",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structural code pattern and the weight of each match
#[derive(Debug)]
pub struct CodePattern {
    pub name: &'static str,
    pub regex: Regex,
    pub weight: f64,
}

impl CodePattern {
    /// Number of non-overlapping matches in `text`
    pub fn count(&self, text: &str) -> usize {
        self.regex.find_iter(text).count()
    }
}

const CODE_PATTERN_TABLE: &[(&str, &str, f64)] = &[
    ("fenced_block", r"```[\s\S]*?```", 0.3),
    ("inline_code", r"`[^`\n]+`", 0.3),
    ("python_def", r"\bdef\s+\w+\s*\(", 0.3),
    ("class_decl", r"\bclass\s+\w+\s*[(:]", 0.3),
    ("js_function", r"\bfunction\s+\w+\s*\(", 0.3),
    ("public_method", r"\bpublic\s+\w+\s+\w+\s*\(", 0.3),
    ("import", r"\bimport\s+\w+", 0.3),
    ("from_import", r"\bfrom\s+\w+\s+import", 0.3),
    ("c_include", r"#include\s*<\w+>", 0.3),
    ("dollar_assign", r"\$\w+\s*=", 0.3),
    ("sql_select", r"SELECT\s+.*\s+FROM", 0.3),
    ("sql_create_table", r"CREATE\s+TABLE", 0.3),
    ("markup_tag", r"<\w+[^>]*>.*</\w+>", 0.3),
    ("json_object", r#"\{\s*"[\w":\s,\[\]{}]+\s*\}"#, 0.3),
];

const PROGRAMMING_KEYWORDS: &[&str] = &[
    "function", "class", "import", "export", "const", "let", "var", "def", "return", "if",
    "else", "elif", "for", "while", "try", "except", "public", "private", "protected", "static",
    "void", "int", "string", "array", "list", "dict", "object", "null", "undefined", "true",
    "false", "async", "await", "promise", "callback", "lambda", "yield", "select", "insert",
    "update", "delete", "create", "drop", "alter", "html", "css", "javascript", "python", "java",
    "cpp", "sql", "json",
];

const COMPLEXITY_TERMS: &[&str] = &[
    "analyze",
    "analysis",
    "explain",
    "explanation",
    "debug",
    "debugging",
    "reasoning",
    "reason",
    "complex",
    "complicated",
    "algorithm",
    "algorithms",
    "optimize",
    "optimization",
    "architecture",
    "design pattern",
    "patterns",
    "performance",
    "scalability",
    "trade-off",
    "tradeoffs",
    "comparison",
    "evaluate",
    "assessment",
    "review",
    "critique",
    "detailed",
    "comprehensive",
    "step-by-step",
    "methodology",
    "approach",
    "strategy",
    "framework",
    "implementation",
    "solution",
    "problem-solving",
    "troubleshoot",
];

const SIMPLE_PHRASES: &[&str] = &[
    "what is",
    "who is",
    "when is",
    "where is",
    "how much",
    "how many",
    "define",
    "definition",
    "meaning",
    "translate",
    "translation",
    "calculate",
    "convert",
    "list",
    "name",
    "tell me",
    "show me",
];

static CODE_PATTERNS: LazyLock<Vec<CodePattern>> = LazyLock::new(|| {
    CODE_PATTERN_TABLE
        .iter()
        .map(|&(name, pattern, weight)| CodePattern {
            name,
            regex: RegexBuilder::new(pattern)
                .case_insensitive(true)
                .multi_line(true)
                .build()
                .unwrap_or_else(|e| panic!("invalid code pattern {}: {}", name, e)),
            weight,
        })
        .collect()
});

static KEYWORD_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| word_patterns(PROGRAMMING_KEYWORDS));

static COMPLEXITY_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| word_patterns(COMPLEXITY_TERMS));

fn word_patterns(words: &[&str]) -> Vec<Regex> {
    words
        .iter()
        .map(|word| {
            RegexBuilder::new(&format!(r"\b{}\b", regex::escape(word)))
                .case_insensitive(true)
                .build()
                .unwrap_or_else(|e| panic!("invalid vocabulary pattern {}: {}", word, e))
        })
        .collect()
}

/// The structural code patterns, in evaluation order
pub fn code_patterns() -> &'static [CodePattern] {
    &CODE_PATTERNS
}

/// Signals derived from one request's messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptAnalysis {
    /// Characters in the joined message text
    pub total_length: usize,
    pub message_count: usize,
    pub code_confidence: f64,
    pub complexity_confidence: f64,
    pub simple_confidence: f64,
    /// `code_confidence` reached the code threshold
    pub has_code: bool,
    /// `complexity_confidence` reached the complexity threshold
    pub has_complexity: bool,
    /// All simple criteria hold (confidence, length, message count)
    pub is_simple: bool,
    pub task_type: TaskType,
}

/// Scores conversations against the configured thresholds
#[derive(Debug, Clone)]
pub struct PromptClassifier {
    config: ClassificationConfig,
}

impl PromptClassifier {
    pub fn new(config: ClassificationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassificationConfig {
        &self.config
    }

    /// Classify a conversation
    pub fn analyze(&self, messages: &[ChatMessage]) -> PromptAnalysis {
        let text = messages
            .iter()
            .filter(|m| !m.content.is_empty())
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let lower = text.to_lowercase();

        let total_length = text.chars().count();
        let message_count = messages.len();

        let code_confidence = code_score(&text);
        let complexity_confidence =
            clamp(count_present(&COMPLEXITY_PATTERNS, &lower) as f64 * COMPLEXITY_WEIGHT);
        let simple_confidence = clamp(
            SIMPLE_PHRASES
                .iter()
                .filter(|phrase| lower.contains(*phrase))
                .count() as f64
                * SIMPLE_WEIGHT,
        );

        let has_code = code_confidence >= self.config.code_threshold;
        let has_complexity = complexity_confidence >= self.config.complexity_threshold;
        let is_simple = simple_confidence >= SIMPLE_MIN_CONFIDENCE
            && total_length < self.config.simple_query_max_length
            && message_count <= SIMPLE_MAX_MESSAGES;

        let task_type = if has_code {
            TaskType::Code
        } else if has_complexity {
            TaskType::Complex
        } else if is_simple {
            TaskType::Simple
        } else {
            TaskType::General
        };

        PromptAnalysis {
            total_length,
            message_count,
            code_confidence,
            complexity_confidence,
            simple_confidence,
            has_code,
            has_complexity,
            is_simple,
            task_type,
        }
    }
}

fn code_score(text: &str) -> f64 {
    let structural: f64 = CODE_PATTERNS
        .iter()
        .map(|p| p.count(text) as f64 * p.weight)
        .sum();
    let keywords = count_present(&KEYWORD_PATTERNS, text) as f64 * KEYWORD_WEIGHT;
    clamp(structural + keywords)
}

/// Number of vocabulary terms that appear at least once
fn count_present(patterns: &[Regex], text: &str) -> usize {
    patterns.iter().filter(|p| p.is_match(text)).count()
}

fn clamp(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}
