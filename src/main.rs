use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use learning_gaps::export;
use learning_gaps::metrics;
use learning_gaps::models::{AnalysisResult, Flow};
use learning_gaps::payload::{parse_response, Validated};
use learning_gaps::report;
use learning_gaps::selection::SelectionEvent;
use learning_gaps::session::Session;
use learning_gaps::Config;

#[derive(Parser)]
#[command(name = "learning-gaps")]
#[command(about = "Learning gap analytics over uploaded assessment analyses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FlowArg {
    Questions,
    Modules,
}

impl From<FlowArg> for Flow {
    fn from(value: FlowArg) -> Self {
        match value {
            FlowArg::Questions => Flow::QuestionAnalytics,
            FlowArg::Modules => Flow::ModuleActivity,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print headline numbers for a payload
    Summary {
        #[arg(long)]
        payload: PathBuf,
        /// Inferred from the payload sections when omitted
        #[arg(long, value_enum)]
        flow: Option<FlowArg>,
    },
    /// Print the dashboard view as JSON for a selection
    View {
        #[arg(long)]
        payload: PathBuf,
        #[arg(long, value_enum)]
        flow: Option<FlowArg>,
        #[arg(long)]
        student: Option<String>,
        #[arg(long)]
        module: Option<String>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        payload: PathBuf,
        #[arg(long, value_enum)]
        flow: Option<FlowArg>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export question analytics tables as CSV
    Export {
        #[arg(long)]
        payload: PathBuf,
        #[arg(long, value_enum)]
        flow: Option<FlowArg>,
        #[arg(long)]
        out_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("invalid LEARNING_GAPS_* configuration")?;

    match cli.command {
        Commands::Summary { payload, flow } => {
            let validated = load_payload(&payload, flow)?;
            print_summary(&validated);
        }
        Commands::View {
            payload,
            flow,
            student,
            module,
        } => {
            let validated = load_payload(&payload, flow)?;
            let mut session = Session::new();
            let default_student = match &validated.result {
                AnalysisResult::ModuleActivity(data) => data.student_ids.first().cloned(),
                AnalysisResult::QuestionAnalytics(_) => None,
            };
            let payload_id = session.load(validated.result);

            if let Some(student_id) = student.or(default_student) {
                session.dispatch(payload_id, &SelectionEvent::SelectStudent(student_id));
            }
            if let Some(module) = module {
                session.dispatch(payload_id, &SelectionEvent::SelectModule(module));
            }

            let view = session
                .view()
                .context("no payload loaded into the session")?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Commands::Report { payload, flow, out } => {
            let validated = load_payload(&payload, flow)?;
            let report = report::build_report(&validated.result, &config, Utc::now());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export {
            payload,
            flow,
            out_dir,
        } => {
            let validated = load_payload(&payload, flow)?;
            let AnalysisResult::QuestionAnalytics(data) = &validated.result else {
                bail!("CSV export is only available for question analytics payloads");
            };
            let written = export::export_question_analytics(data, &out_dir)?;
            for path in written {
                println!("Wrote {}.", path.display());
            }
        }
    }

    Ok(())
}

fn load_payload(path: &Path, flow: Option<FlowArg>) -> anyhow::Result<Validated> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let validated = parse_response(&body, flow.map(Flow::from))
        .with_context(|| format!("{} is not a usable analysis payload", path.display()))?;
    Ok(validated)
}

fn print_summary(validated: &Validated) {
    match &validated.result {
        AnalysisResult::QuestionAnalytics(data) => {
            let summary = metrics::cohort_summary(&data.cohort, &data.students);
            println!("Question analytics:");
            println!("- Students: {}", summary.total_students);
            println!("- Questions: {}", summary.total_questions);
            println!("- Average accuracy: {}%", summary.avg_accuracy_pct);
            println!(
                "- Weak questions (cohort): {}",
                data.cohort.weak_questions.len()
            );
        }
        AnalysisResult::ModuleActivity(data) => {
            println!("Module activity:");
            println!("- Students: {}", data.student_ids.len());
            println!("- Attempts: {}", data.all_student_data.len());
            if data.overall_learning_chart.is_empty() {
                println!("No module activity recorded.");
            }
            for module in &data.overall_learning_chart {
                println!(
                    "- {}: {:.2} self-learning hours",
                    module.activity_name, module.self_learning_hours
                );
            }
        }
    }

    if !validated.warnings.is_empty() {
        println!("{} partial data warnings:", validated.warnings.len());
        for warning in &validated.warnings {
            println!("- {warning}");
        }
    }
}
