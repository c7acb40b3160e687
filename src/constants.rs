#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Required source file every submission must provide.
pub const ANSWERS_FILENAME: &str = "answers.py";

/// Reference solution accepted in place of `answers.py`.
pub const TEACHER_ANSWERS_FILENAME: &str = "teacher_answers.py";

/// Candidate names for the required source file, in lookup order.
pub const POSSIBLE_ANSWERS_FILENAMES: [&str; 2] = [ANSWERS_FILENAME, TEACHER_ANSWERS_FILENAME];

/// Narrative report every submission is expected to contain.
pub const REPORT_FILENAME: &str = "report.md";

/// Per-submission grade record written next to the student's files.
pub const GRADE_OUTPUT_FILENAME: &str = "grade.json";

/// JUnit XML report produced by pytest.
pub const TEST_REPORT_FILENAME: &str = "test_report.xml";

/// Directory inside a submission that receives the shared tests.
pub const TESTS_DIRNAME: &str = "tests";

/// Extensions recognised as images when scanning reports.
pub const IMAGE_EXTENSIONS: [&str; 7] = [".png", ".jpg", ".jpeg", ".gif", ".bmp", ".tiff", ".webp"];

/// Default wall-clock limit for one submission's test run, in seconds.
pub const EXECUTION_TIMEOUT_SECS: u64 = 120;

/// Default chat model for semantic grading.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Completion token cap for grading requests.
pub const MAX_COMPLETION_TOKENS: u32 = 4096;

/// Completion token cap for image description requests.
pub const MAX_IMAGE_TOKENS: u32 = 500;

/// Default request timeout for semantic grader calls, in seconds.
pub const OPENAI_TIMEOUT_SECS: u64 = 180;

/// Default output directory for aggregated grades.
pub const DEFAULT_GRADES_DIR: &str = "grades";

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILENAME: &str = "grader_config.yml";

/// Cohort summary file name.
pub const GRADES_SUMMARY_FILENAME: &str = "grades_summary.json";

/// Tabular export file name.
pub const GRADES_CSV_FILENAME: &str = "grades_summary.csv";

/// Keywords marking a rubric section as extra credit.
pub const EXTRA_CREDIT_KEYWORDS: [&str; 3] = ["extra", "bonus", "optional"];

/// Fence language whose code blocks are scanned for expected functions.
pub const DEFAULT_FENCE_LANGUAGE: &str = "python";

/// Descriptions longer than this many characters are truncated.
pub const DESCRIPTION_LIMIT: usize = 500;

/// Paragraphs at or below this many characters are never used as a
/// description.
pub const DESCRIPTION_MIN_LEN: usize = 20;

/// Prompt truncation for the setup log.
pub const SETUP_LOG_TRUNCATE: usize = 2_000;

/// Prompt truncation for the test log.
pub const TEST_LOG_TRUNCATE: usize = 3_000;

/// Prompt truncation for the student report.
pub const REPORT_TRUNCATE: usize = 8_000;

/// Prompt truncation for an individual test failure message.
pub const TEST_ERROR_TRUNCATE: usize = 300;

/// CSV truncation for overall feedback.
pub const CSV_FEEDBACK_TRUNCATE: usize = 200;

/// Feedback attached to a rubric section the semantic grader never scored.
pub const SECTION_NOT_GRADED: &str = "Section not found or not graded.";

/// OpenAI-compatible API endpoint used when none is configured.
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
