/*!
 * System prompt rendering and prompt cost.
 */

use crate::language_utils::get_language_name;
use crate::subtitle_processor::SubtitleEntry;

use super::tokens::TokenEstimator;

/// Human readable label for a language code, e.g. "Japanese (ja)"
pub fn language_label(code: &str) -> String {
    match get_language_name(code) {
        Ok(name) => format!("{} ({})", name, code),
        Err(_) => code.to_string(),
    }
}

/// Fill the `{source_language}` and `{target_language}` placeholders
pub fn render_system_prompt(template: &str, source_language: &str, target_language: &str) -> String {
    template
        .replace("{source_language}", &language_label(source_language))
        .replace("{target_language}", &language_label(target_language))
}

/// Fixed per-request cost of the system prompt, used to seed each chunk
pub fn prompt_overhead_tokens(template: &str, estimator: &dyn TokenEstimator) -> u64 {
    // Placeholders expand to labels a bit longer than themselves
    estimator.estimate(template) + estimator.estimate("Portuguese (pt) Portuguese (pt)")
}

/// Tokens of one full request: system prompt plus the serialized entries
pub fn prompt_token_cost(system_prompt: &str, entries: &[SubtitleEntry], estimator: &dyn TokenEstimator) -> u64 {
    estimator.estimate(system_prompt) + entries.iter().map(|e| estimator.estimate_entry(e)).sum::<u64>()
}
