use anyhow::{Context, Result};
use tracing::info;

use crate::ctx::Ctx;
use crate::pipeline::Stage;
use crate::source;

pub struct Stage1Source;

impl Stage1Source {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage1Source {
    fn name(&self) -> &'static str {
        "stage1_source"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let input = ctx.input.as_ref().context("no input file configured")?;
        let extract = source::read_identifiers(input, &ctx.config.source_options())?;

        if extract.malformed > 0 {
            let sample: Vec<String> = extract
                .warnings
                .iter()
                .take(5)
                .map(|w| format!("line {}: '{}'", w.line, w.token))
                .collect();
            ctx.warnings.push(format!(
                "{} row(s) dropped as non-numeric ({})",
                extract.malformed,
                sample.join(", ")
            ));
        }
        if extract.ids.is_empty() {
            ctx.warnings
                .push("source file contains no valid contract identifiers".to_string());
        }

        ctx.report.input_meta.source = Some(input.display().to_string());
        ctx.report.input_meta.rows = Some(extract.rows as u64);
        ctx.report.input_meta.ids = Some(extract.ids.len() as u64);
        ctx.report.input_meta.malformed = Some(extract.malformed as u64);
        ctx.report.input_meta.duplicates = Some(extract.duplicates as u64);
        ctx.report.input_meta.strategy = Some(extract.strategy);

        info!(ids = extract.ids.len(), "source_ready");
        ctx.source = Some(extract);
        Ok(())
    }
}
