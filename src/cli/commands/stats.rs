//! qsim stats - Index a bank and report its shape

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::Result;
use crate::search::{BuildResult, IndexStatistics};

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Question bank (JSON array or JSON Lines)
    #[arg(long)]
    pub bank: PathBuf,
}

#[derive(Serialize)]
struct StatsReport {
    bank: String,
    build: BuildResult,
    index: IndexStatistics,
}

pub fn run(ctx: &AppContext, args: &StatsArgs) -> Result<()> {
    let build = ctx.load_bank(&args.bank)?;
    let index = ctx.engine.index_statistics();

    if ctx.is_robot() {
        let report = StatsReport {
            bank: args.bank.display().to_string(),
            build,
            index,
        };
        return emit_json(&robot_ok(report));
    }

    let mut layout = HumanLayout::new();
    layout.title("Index statistics");
    layout.kv("Bank", &args.bank.display().to_string());
    layout.kv("Questions", &index.total_questions.to_string());
    layout.kv("Skipped", &build.skipped.to_string());
    layout.kv("Vectorizer", &index.vectorizer);
    layout.kv("Dimension", &index.vector_dimension.to_string());
    layout.kv("Build time", &format!("{:.2} ms", build.elapsed_ms));

    if !index.by_subject.is_empty() {
        layout.blank().section("By subject");
        for (subject, count) in &index.by_subject {
            layout.kv(subject, &count.to_string());
        }
    }
    if !index.by_type.is_empty() {
        layout.blank().section("By type");
        for (ty, count) in &index.by_type {
            layout.kv(ty, &count.to_string());
        }
    }
    if !index.by_difficulty.is_empty() {
        layout.blank().section("By difficulty");
        for (level, count) in &index.by_difficulty {
            layout.kv(&level.to_string(), &count.to_string());
        }
    }

    emit_human(layout);
    Ok(())
}
