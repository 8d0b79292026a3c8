//! Prompts for LLM-based segment translation.
//!
//! Every instruction sent to a backend is built here so the orchestrator and
//! the backends never hard-code prompt text, and unit tests can inspect the
//! prompts without a live model.
//!
//! Callers can override the system prompt via
//! [`crate::config::TranslationConfig::system_prompt`].

use crate::language::{language_name, Script};

/// System prompt template. `{source}` and `{target}` are replaced with
/// language display names.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a professional translator specialising in financial and wealth-management documents.

Translate the user's text from {source} to {target}.

Rules:
1. Respond with the translated text ONLY, with no notes, explanations or quotes
2. Keep numbers, currency amounts, percentages, dates and account identifiers exactly as written
3. Use the standard {target} terminology for financial concepts
4. Keep line breaks where the source has them
5. Do not wrap the output in code fences"#;

/// Substitute `{source}` / `{target}` in a custom system prompt template.
pub fn render_system_prompt(template: &str, source_lang: &str, target_lang: &str) -> String {
    template
        .replace("{source}", language_name(source_lang))
        .replace("{target}", language_name(target_lang))
}

/// First-attempt instruction for the script-verification policy.
///
/// The segment is embedded in an explicit rule list because a bare segment
/// sometimes comes back untranslated or transliterated.
pub fn script_instruction(source_lang: &str, target_lang: &str, script: Script, text: &str) -> String {
    format!(
        "Translate the following text from {source} to {target}.\n\
         \n\
         Rules:\n\
         1. ONLY respond with the translated text\n\
         2. Keep all formatting and special characters\n\
         3. Use appropriate {target} financial terminology\n\
         4. Write the output in {script} characters, UTF-8 encoded\n\
         5. Do not add any comments, explanations, or notes\n\
         \n\
         Text to translate:\n\
         {text}",
        source = language_name(source_lang),
        target = language_name(target_lang),
    )
}

/// Shorter, more direct instruction used for the single retry.
///
/// Chinese gets the instruction in Chinese, which in practice is the most
/// reliable way to get Han output from a model that answered in English.
pub fn script_retry_instruction(target_lang: &str, script: Script, text: &str) -> String {
    match script {
        Script::Han => format!("将以下文本翻译成中文(不要添加任何解释,只需给出翻译结果):\n\n{text}"),
        _ => format!(
            "Translate into {} using {script} script. Output the translation only:\n\n{text}",
            language_name(target_lang)
        ),
    }
}
