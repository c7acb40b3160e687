#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # gradepod
//!
//! Command line entry point. Without a subcommand it grades every
//! submission; `adjust` corrects one saved grade by hand.
//!
//! ```text
//! gradepod --submissions ./hw3-submissions --rubric ./README.md --tests ./tests
//! gradepod --only-view --grades-dir ./grades
//! gradepod adjust --grades-dir ./grades --student ada --section "Data Loading" --points 8
//! ```

use std::path::PathBuf;

use anyhow::Result;
use bpaf::*;
use dotenvy::dotenv;
use gradepod::{
    adjust_grade,
    config::{CliOverrides, FileConfig, GraderConfig, grades_dir},
    grade::SectionEdit,
    pipeline, show_saved_grades,
};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// A manual correction requested on the command line.
#[derive(Debug, Clone)]
struct Adjust {
    /// Directory with saved grades.
    grades_dir:       PathBuf,
    /// Student whose grade changes.
    student:          String,
    /// Section to change.
    section:          String,
    /// New score.
    points:           Option<f64>,
    /// New section feedback.
    feedback:         Option<String>,
    /// New overall feedback.
    overall_feedback: Option<String>,
}

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade submissions, or show saved grades
    Grade(CliOverrides),
    /// Correct a saved grade
    Adjust(Adjust),
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    let config = long("config")
        .help("Path to YAML configuration file (default: ./grader_config.yml if present)")
        .argument::<PathBuf>("FILE")
        .optional();
    let submissions = long("submissions")
        .help("Directory containing one folder per student")
        .argument::<PathBuf>("DIR")
        .optional();
    let rubric = long("rubric")
        .long("readme")
        .help("Assignment markdown containing the rubric")
        .argument::<PathBuf>("FILE")
        .optional();
    let tests = long("tests")
        .help("Shared tests copied into every submission")
        .argument::<PathBuf>("DIR")
        .optional();
    let test_data = long("test-data")
        .help("Test data folder copied into every submission")
        .argument::<PathBuf>("DIR")
        .optional();
    let grades_dir = long("grades-dir")
        .help("Where aggregated grades are written (default: ./grades)")
        .argument::<PathBuf>("DIR")
        .optional();
    let skip_semantic = long("skip-semantic")
        .long("skip-llm")
        .help("Skip LLM grading and use fallback grades")
        .switch();
    let only_view = long("only-view")
        .help("Print saved grades without grading")
        .switch();
    let timeout = long("timeout")
        .help("Seconds allowed for each submission's tests")
        .argument::<u64>("SECS")
        .optional();
    let verbose = short('v')
        .long("verbose")
        .help("Enable verbose output")
        .switch();

    let grade = construct!(CliOverrides {
        config,
        submissions,
        rubric,
        tests,
        test_data,
        grades_dir,
        skip_semantic,
        only_view,
        timeout,
        verbose,
    })
    .map(Cmd::Grade);

    let grades_dir = long("grades-dir")
        .help("Directory with saved grades")
        .argument::<PathBuf>("DIR")
        .fallback(PathBuf::from(gradepod::constants::DEFAULT_GRADES_DIR));
    let student = long("student")
        .help("Student id (submission folder name)")
        .argument::<String>("ID");
    let section = long("section")
        .help("Rubric section name, exactly as graded")
        .argument::<String>("NAME");
    let points = long("points")
        .help("New score for the section")
        .argument::<f64>("N")
        .optional();
    let feedback = long("feedback")
        .help("New feedback for the section")
        .argument::<String>("TEXT")
        .optional();
    let overall_feedback = long("overall-feedback")
        .help("New overall feedback")
        .argument::<String>("TEXT")
        .optional();

    let adjust = construct!(Adjust {
        grades_dir,
        student,
        section,
        points,
        feedback,
        overall_feedback,
    })
    .guard(
        |a| a.points.is_some() || a.feedback.is_some() || a.overall_feedback.is_some(),
        "nothing to change: pass --points, --feedback or --overall-feedback",
    )
    .to_options()
    .command("adjust")
    .help("Correct one section of a saved grade and rewrite the summaries")
    .map(Cmd::Adjust);

    construct!([adjust, grade])
        .to_options()
        .descr("Grade homework with pytest and LLM review against a markdown rubric")
        .run()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let cmd = options();
    let file = match &cmd {
        Cmd::Grade(cli) => FileConfig::discover(cli.config.as_deref())?,
        Cmd::Adjust(_) => FileConfig::discover(None)?,
    };
    let verbose = file.verbose || matches!(&cmd, Cmd::Grade(cli) if cli.verbose);

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(if verbose { Level::DEBUG } else { Level::INFO });
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    match cmd {
        Cmd::Grade(cli) => {
            if cli.only_view || file.only_view {
                show_saved_grades(&grades_dir(&file, &cli))?;
                return Ok(());
            }

            let config = GraderConfig::resolve(file, &cli)?;
            let (grades, _) = pipeline::run(&config).await?;
            tracing::info!("Grading complete: {} submissions processed", grades.len());
        }
        Cmd::Adjust(adjust) => {
            let edit = SectionEdit::builder()
                .section(adjust.section)
                .maybe_points(adjust.points)
                .maybe_feedback(adjust.feedback)
                .build();
            adjust_grade(
                &adjust.grades_dir,
                &adjust.student,
                edit,
                adjust.overall_feedback,
                file.extra_credit,
            )?;
        }
    };

    Ok(())
}
