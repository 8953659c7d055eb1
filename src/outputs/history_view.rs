use serde::Serialize;

use crate::memory::history::HistoryRecord;
use crate::vision::overlay::score_emoji;

pub const EMPTY_HISTORY: &str = "Aucun tripkik archivé pour le moment.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryLine {
    pub heading: String,
    pub summary: String,
    pub recommendation: String,
}

impl HistoryLine {
    pub fn from_record(record: &HistoryRecord) -> Self {
        let emoji = score_emoji(record.score);
        Self {
            heading: format!("Évaluation du {} à {}", record.date, record.timestamp),
            summary: format!(
                "Score final: {} {} / Durée: {}s",
                record.score, emoji, record.duration_s
            ),
            recommendation: format!("Recommandation IA: {}", record.ia_reco),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HistoryView {
    Empty { message: &'static str },
    Entries(Vec<HistoryLine>),
}

/// `records` are expected most recent first, as `HistoryStore::list` returns them.
pub fn render_history(records: &[HistoryRecord]) -> HistoryView {
    if records.is_empty() {
        return HistoryView::Empty {
            message: EMPTY_HISTORY,
        };
    }
    HistoryView::Entries(records.iter().map(HistoryLine::from_record).collect())
}
