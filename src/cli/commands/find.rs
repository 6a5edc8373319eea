//! qsim find - Rank bank questions against a query question

use std::path::PathBuf;

use clap::Args;

use crate::api::{FindSimilarRequest, FindSimilarResponse};
use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, percent};
use crate::error::{QsError, Result};
use crate::question::{QuestionQuery, QuestionType};
use crate::search::SimilarQuestion;

#[derive(Args, Debug)]
pub struct FindArgs {
    /// Question bank (JSON array or JSON Lines)
    #[arg(long)]
    pub bank: PathBuf,

    /// JSON request body with `query_question`, `top_k`, `similarity_threshold`
    #[arg(long, conflicts_with_all = ["stem", "answer", "question_type", "difficulty", "subject", "id"])]
    pub request: Option<PathBuf>,

    /// Query question text
    #[arg(long)]
    pub stem: Option<String>,

    /// Query correct answer
    #[arg(long)]
    pub answer: Option<String>,

    /// Query question type (e.g. calculation, single_choice)
    #[arg(long = "type")]
    pub question_type: Option<String>,

    /// Query difficulty (1-5)
    #[arg(long)]
    pub difficulty: Option<u8>,

    /// Query subject
    #[arg(long)]
    pub subject: Option<String>,

    /// Id of the query if it is itself in the bank (excluded from results)
    #[arg(long)]
    pub id: Option<String>,

    /// Maximum number of results
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Minimum composite score (0-1)
    #[arg(long)]
    pub threshold: Option<f64>,
}

pub fn run(ctx: &AppContext, args: &FindArgs) -> Result<()> {
    let request = build_request(args)?;
    ctx.load_bank(&args.bank)?;

    let (top_k, threshold) = request.resolve(&ctx.config.search);
    let similar = ctx
        .engine
        .find_similar(&request.query_question, top_k, threshold)?;
    let response = FindSimilarResponse::success(&ctx.engine, similar);

    if ctx.is_robot() {
        return emit_json(&response);
    }

    let mut layout = HumanLayout::new();
    layout.title("Similar questions");
    layout.kv("Query", &request.query_question.stem);
    layout.kv("Bank", &args.bank.display().to_string());
    layout.kv("Top k", &top_k.to_string());
    layout.kv("Threshold", &threshold.to_string());

    let found = response
        .data
        .as_ref()
        .map_or(&[][..], |data| data.similar_questions.as_slice());
    layout.kv("Found", &found.len().to_string());
    layout.blank();

    if found.is_empty() {
        layout.bullet("no question met the threshold");
    }
    for item in found {
        render_match(&mut layout, item);
    }

    emit_human(layout);
    Ok(())
}

fn render_match(layout: &mut HumanLayout, item: &SimilarQuestion) {
    layout.section(&format!(
        "#{} {} ({})",
        item.rank,
        item.question.id,
        percent(item.similarity_score)
    ));
    layout.kv("Stem", &item.question.stem);
    let b = &item.similarity_breakdown;
    layout.kv(
        "Breakdown",
        &format!(
            "text {} / answer {} / type {} / difficulty {} / subject {}",
            percent(b.text_similarity),
            percent(b.answer_similarity),
            percent(b.type_match),
            percent(b.difficulty_proximity),
            percent(b.subject_match)
        ),
    );
    for reason in &item.match_reasons {
        layout.bullet(reason);
    }
    layout.blank();
}

fn build_request(args: &FindArgs) -> Result<FindSimilarRequest> {
    let mut request = if let Some(path) = &args.request {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            QsError::InvalidArgument(format!("read request {}: {err}", path.display()))
        })?;
        FindSimilarRequest::from_json(&raw)?
    } else {
        FindSimilarRequest {
            query_question: query_from_flags(args)?,
            top_k: None,
            similarity_threshold: None,
        }
    };

    if args.top_k.is_some() {
        request.top_k = args.top_k;
    }
    if args.threshold.is_some() {
        request.similarity_threshold = args.threshold;
    }
    Ok(request)
}

fn query_from_flags(args: &FindArgs) -> Result<QuestionQuery> {
    let stem = required(args.stem.as_deref(), "--stem")?;
    let question_type: QuestionType = required(args.question_type.as_deref(), "--type")?.parse()?;
    let difficulty = args
        .difficulty
        .ok_or_else(|| QsError::InvalidArgument("--difficulty is required".to_string()))?;
    let subject = required(args.subject.as_deref(), "--subject")?;

    let query = QuestionQuery::new(
        stem,
        args.answer.clone().unwrap_or_default(),
        question_type,
        difficulty,
        subject,
    );
    Ok(match &args.id {
        Some(id) => query.with_id(id.clone()),
        None => query,
    })
}

fn required<'a>(value: Option<&'a str>, flag: &str) -> Result<&'a str> {
    value.ok_or_else(|| {
        QsError::InvalidArgument(format!("{flag} is required unless --request is given"))
    })
}
