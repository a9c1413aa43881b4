use std::collections::HashSet;

use tracing::debug;

use crate::error::RowParseWarning;
use crate::source::{ContractId, ReadStrategy, SourceExtract};

pub const MAX_KEPT_WARNINGS: usize = 100;

pub(super) struct Extractor {
    delimiter: char,
    seen: HashSet<ContractId>,
    ids: Vec<ContractId>,
    rows: usize,
    malformed: usize,
    duplicates: usize,
    warnings: Vec<RowParseWarning>,
}

impl Extractor {
    pub(super) fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            seen: HashSet::new(),
            ids: Vec::new(),
            rows: 0,
            malformed: 0,
            duplicates: 0,
            warnings: Vec::new(),
        }
    }

    pub(super) fn push_line(&mut self, line_no: usize, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        self.rows += 1;

        // The identifier is always the last column.
        let token = match trimmed.rsplit_once(self.delimiter) {
            Some((_, last)) => last.trim(),
            None => trimmed,
        };

        let Some(id) = ContractId::parse(token) else {
            self.malformed += 1;
            debug!(line = line_no, token = token, "row dropped: not a numeric identifier");
            if self.warnings.len() < MAX_KEPT_WARNINGS {
                self.warnings.push(RowParseWarning {
                    line: line_no,
                    token: token.to_string(),
                });
            }
            return;
        };

        if self.seen.insert(id.clone()) {
            self.ids.push(id);
        } else {
            self.duplicates += 1;
        }
    }

    pub(super) fn finish(self, strategy: ReadStrategy) -> SourceExtract {
        SourceExtract {
            ids: self.ids,
            rows: self.rows,
            malformed: self.malformed,
            duplicates: self.duplicates,
            strategy,
            warnings: self.warnings,
        }
    }
}
