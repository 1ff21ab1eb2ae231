//! System prompt that binds the agent to the dataset.

use manifest_core::Dataset;
use tracing::warn;

use crate::tools::QUERY_TOOL;

/// Build the system message describing `dataset` to the model.
///
/// Carries the column list, row count, a per-column profile and the first
/// `sample_rows` rows verbatim as CSV. Anything beyond the profile is
/// computed through the `query_dataset` tool.
pub fn system_prompt(dataset: &Dataset, sample_rows: usize) -> String {
    let sample = match dataset.sample_csv(sample_rows) {
        Ok(csv) => csv,
        Err(e) => {
            warn!(error = %e, "failed to render dataset sample for prompt");
            String::new()
        }
    };

    let mut prompt = String::new();
    prompt.push_str(
        "You are a data analyst answering questions about a passenger manifest \
         loaded as a single table.\n",
    );
    prompt.push_str(
        "Answer using only the data described below. Be concise. If the data \
         cannot answer the question, say so.\n",
    );
    prompt.push_str(&format!(
        "The sample rows below are illustrative only. Use the `{QUERY_TOOL}` tool \
         to count, filter, group or average over all {} rows before answering.\n\n",
        dataset.row_count()
    ));
    prompt.push_str(&format!("Columns: {}\n", dataset.columns().join(", ")));
    prompt.push_str(&format!("Row count: {}\n\n", dataset.row_count()));
    prompt.push_str("Column profile:\n");
    prompt.push_str(&dataset.summary().to_string());
    prompt.push('\n');
    if !sample.is_empty() {
        prompt.push_str(&format!(
            "\nFirst {} rows (CSV):\n",
            sample_rows.min(dataset.row_count())
        ));
        prompt.push_str(&sample);
    }
    prompt
}
