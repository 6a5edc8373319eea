//! qsim validate - Check every record in a bank

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::{QsError, Result};
use crate::import::load_questions;
use crate::search::SkippedRecord;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Question bank (JSON array or JSON Lines)
    #[arg(long)]
    pub bank: PathBuf,
}

#[derive(Serialize)]
struct ValidateReport {
    bank: String,
    total: usize,
    valid: usize,
    invalid: Vec<SkippedRecord>,
    clean: bool,
}

pub fn run(ctx: &AppContext, args: &ValidateArgs) -> Result<()> {
    let records = load_questions(&args.bank)?;
    let invalid: Vec<SkippedRecord> = records
        .iter()
        .filter_map(|record| {
            record.validate().err().map(|err| SkippedRecord {
                id: record.id.clone(),
                reason: err.to_string(),
            })
        })
        .collect();

    let report = ValidateReport {
        bank: args.bank.display().to_string(),
        total: records.len(),
        valid: records.len() - invalid.len(),
        clean: invalid.is_empty(),
        invalid,
    };

    if ctx.is_robot() {
        emit_json(&robot_ok(&report))?;
    } else {
        let mut layout = HumanLayout::new();
        layout.title("Validation");
        layout.kv("Bank", &report.bank);
        layout.kv("Records", &report.total.to_string());
        layout.kv("Valid", &report.valid.to_string());

        if report.invalid.is_empty() {
            layout.section("Status");
            layout.bullet("OK");
        } else {
            layout.section("Invalid records");
            for item in &report.invalid {
                layout.bullet(&format!("{}: {}", item.id, item.reason));
            }
        }
        emit_human(layout);
    }

    if report.clean {
        Ok(())
    } else {
        Err(QsError::InvalidArgument(format!(
            "{} of {} records failed validation",
            report.invalid.len(),
            report.total
        )))
    }
}
