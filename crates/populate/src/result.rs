use crate::engine::{CodePass, FallbackPass};
use crate::model::{PopulationReport, PopulationStats};

/// Fold pass outcomes into the caller-facing report.
///
/// `totalPlaceholders` counts distinct matched and unmatched code tokens plus
/// every fallback row visited, filled or not.
pub fn collect_report(codes: CodePass, fallbacks: &FallbackPass, placeholders_cleared: usize) -> PopulationReport {
    let stats = PopulationStats {
        total_placeholders: codes.matched.len() + codes.unmatched.len() + fallbacks.rows_visited,
        matched: codes.matched.len(),
        unmatched: codes.unmatched.len(),
        fallbacks_inserted: fallbacks.fallbacks_inserted,
        placeholders_cleared,
    };
    PopulationReport {
        stats,
        matched_placeholders: codes.matched,
        unmatched_placeholders: codes.unmatched,
    }
}
