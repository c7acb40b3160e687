//! Tests for rubric markdown parsing.

use std::fs;

use gradepod::{
    error::GraderError,
    rubric::{Rubric, RubricParser, RubricSection, parse_rubric, parse_rubric_file},
};
use uuid::Uuid;

fn section<'a>(rubric: &'a Rubric, name: &str) -> &'a RubricSection {
    rubric
        .sections()
        .iter()
        .find(|s| s.name() == name)
        .unwrap_or_else(|| panic!("no section named {name}"))
}

const HOMEWORK: &str = r#"# HW3: ECG Analysis (40 pts)

Some preamble about the assignment that is not part of any section.

## Data Loading (10 pts)

Load the ECG recordings from `data/` into a pandas dataframe.

```python
def load_data(path):
    ...
```

Also write a function called `validate_rows` that drops bad samples.

## Visualization and Plots (15 pts)

- plot the raw signal
- plot the filtered signal

Produce clear, labelled figures of the signal before and after filtering.

## Report (15 points)

Summarize your findings in report.md with at least two figures.

## Bonus Analysis (5)

Detect arrhythmias with any method you like and explain it in the report.
"#;

#[test]
fn parses_title_and_declared_points() {
    let rubric = parse_rubric(HOMEWORK, "fallback").expect("parse rubric");

    assert_eq!(rubric.title(), "HW3: ECG Analysis");
    assert_eq!(rubric.declared_points(), Some(40.0));
}

#[test]
fn sections_are_in_document_order() {
    let rubric = parse_rubric(HOMEWORK, "fallback").expect("parse rubric");

    let names: Vec<_> = rubric.sections().iter().map(|s| s.name()).collect();
    assert_eq!(
        names,
        vec!["Data Loading", "Visualization and Plots", "Report", "Bonus Analysis"]
    );
    let points: Vec<_> = rubric.sections().iter().map(|s| s.points()).collect();
    assert_eq!(points, vec![10.0, 15.0, 15.0, 5.0]);
}

#[test]
fn total_excludes_extra_credit() {
    let rubric = parse_rubric(HOMEWORK, "fallback").expect("parse rubric");

    assert!(section(&rubric, "Bonus Analysis").is_extra());
    assert!(!section(&rubric, "Report").is_extra());
    assert_eq!(rubric.total_points(), 40.0);

    let non_extra: f64 = rubric
        .sections()
        .iter()
        .filter(|s| !s.is_extra())
        .map(|s| s.points())
        .sum();
    assert_eq!(rubric.total_points(), non_extra);
}

#[test]
fn expected_functions_come_from_fences_and_prose() {
    let rubric = parse_rubric(HOMEWORK, "fallback").expect("parse rubric");

    let loading = section(&rubric, "Data Loading");
    assert_eq!(loading.expected_functions(), ["load_data", "validate_rows"]);

    let plots = section(&rubric, "Visualization and Plots");
    assert!(plots.expected_functions().is_empty());
}

#[test]
fn description_is_first_prose_paragraph() {
    let rubric = parse_rubric(HOMEWORK, "fallback").expect("parse rubric");

    assert_eq!(
        section(&rubric, "Data Loading").description(),
        "Load the ECG recordings from `data/` into a pandas dataframe."
    );
    assert_eq!(
        section(&rubric, "Visualization and Plots").description(),
        "Produce clear, labelled figures of the signal before and after filtering."
    );
}

#[test]
fn parsing_is_idempotent() {
    let first = parse_rubric(HOMEWORK, "fallback").expect("first parse");
    let second = parse_rubric(HOMEWORK, "fallback").expect("second parse");

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("serialize"),
        serde_json::to_string(&second).expect("serialize")
    );
}

#[test]
fn extra_credit_is_decided_by_keyword_not_qualifier() {
    let text = "# HW\n\n## Filtering (Extra 5 points)\n\n## Extra Credit: Advanced Filter (Extra 5 \
                pts)\n\n## Optional plots (3 pts)\n\n## Core (10 pts)\n";
    let rubric = parse_rubric(text, "fallback").expect("parse rubric");

    assert!(!section(&rubric, "Filtering").is_extra());
    assert_eq!(section(&rubric, "Filtering").points(), 5.0);
    assert!(section(&rubric, "Extra Credit: Advanced Filter").is_extra());
    assert!(section(&rubric, "Optional plots").is_extra());
    assert_eq!(rubric.total_points(), 15.0);
}

#[test]
fn custom_keywords_replace_defaults() {
    let parser = RubricParser::builder()
        .extra_keywords(vec!["stretch".to_string()])
        .build();
    let rubric = parser
        .parse("## Stretch goal (5)\n\n## Bonus (5)\n", "HW")
        .expect("parse rubric");

    assert!(section(&rubric, "Stretch goal").is_extra());
    assert!(!section(&rubric, "Bonus").is_extra());
    assert_eq!(rubric.total_points(), 5.0);
}

#[test]
fn missing_title_uses_fallback() {
    let rubric = parse_rubric("## Setup (5 pts)\n\nInstall the environment and run it.", "hw1")
        .expect("parse rubric");

    assert_eq!(rubric.title(), "hw1");
    assert_eq!(rubric.declared_points(), None);
    assert_eq!(rubric.sections().len(), 1);
}

#[test]
fn text_without_sections_is_a_format_error() {
    let err = parse_rubric("# HW1\n\nJust some prose.\n\n## Notes\n", "fallback")
        .expect_err("no sections");

    assert!(matches!(err, GraderError::RubricFormat(title) if title == "HW1"));
}

#[test]
fn crlf_line_endings_parse_like_lf() {
    let crlf = HOMEWORK.replace('\n', "\r\n");

    let lf = parse_rubric(HOMEWORK, "fallback").expect("lf");
    let windows = parse_rubric(&crlf, "fallback").expect("crlf");

    assert_eq!(lf.sections(), windows.sections());
    assert_eq!(lf.title(), windows.title());
}

#[test]
fn prompt_text_tags_extra_credit() {
    let rubric = parse_rubric(HOMEWORK, "fallback").expect("parse rubric");
    let prompt = rubric.to_prompt_text();

    assert!(prompt.contains("Total Points: 40"));
    assert!(prompt.contains("### Bonus Analysis (5 pts) [EXTRA CREDIT]"));
    assert!(prompt.contains("Expected Functions: load_data, validate_rows"));
}

#[test]
fn file_parse_falls_back_to_directory_name() {
    let root = std::env::temp_dir().join(format!("gradepod-rubric-{}", Uuid::new_v4()));
    let dir = root.join("hw4-signals");
    fs::create_dir_all(&dir).expect("create rubric dir");
    let path = dir.join("README.md");
    fs::write(&path, "## Setup (5 pts)\n\n## Filters (10 pts)\n").expect("write rubric");

    let rubric = parse_rubric_file(&path, &RubricParser::default()).expect("parse file");
    assert_eq!(rubric.title(), "hw4-signals");
    assert_eq!(rubric.total_points(), 15.0);

    let _ = fs::remove_dir_all(root);
}
