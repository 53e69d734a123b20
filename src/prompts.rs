//! System prompts for chunk translation.
//!
//! Every prompt lives here so the wording can change without touching the
//! retry logic in [`crate::pipeline::translate`]. Callers can override the
//! default via [`crate::config::ConversionConfig::system_prompt`]; an
//! override may use the `{source}` and `{target}` placeholders.

/// Default translation prompt. `{source}` and `{target}` are replaced with
/// language names before use.
pub const DEFAULT_TRANSLATION_PROMPT: &str = r#"You are a professional translator. Translate the user's text from {source} to {target}.

Follow these rules precisely:

1. FIDELITY
   - Translate the full text; do not summarise, omit or add content
   - Keep proper names, acronyms, organisation names and legal references as they are
   - Keep numbers, dates, amounts, percentages and units exactly as written

2. MARKDOWN
   - Preserve every Markdown marker: #, ###, -, 1., **, *, |, links
   - Keep the line structure: one output line per input line
   - Leave any line that is already in {target} unchanged

3. OUTPUT FORMAT
   - Output ONLY the translated text
   - Do NOT wrap it in ```markdown fences
   - Do NOT add notes, explanations or a "Translation:" header"#;

/// Extra rule appended when a whole document is translated in one pass.
pub const PAGE_SENTINEL_RULE: &str = r#"

4. PAGE MARKERS
   - Lines consisting of {sentinel} separate pages
   - Copy every such line to the output exactly as it appears, untranslated"#;

/// Human-readable name for a language code, for use inside prompts.
pub fn language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "pt" => "Portuguese",
        "pt-br" => "Brazilian Portuguese",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        other => other,
    }
}

/// Build the system prompt for a language pair.
///
/// `template` defaults to [`DEFAULT_TRANSLATION_PROMPT`]. When `sentinel` is
/// set, [`PAGE_SENTINEL_RULE`] is appended.
pub fn translation_prompt(
    template: Option<&str>,
    source: &str,
    target: &str,
    sentinel: Option<&str>,
) -> String {
    let mut prompt = template
        .unwrap_or(DEFAULT_TRANSLATION_PROMPT)
        .replace("{source}", language_name(source))
        .replace("{target}", language_name(target));
    if let Some(sentinel) = sentinel {
        prompt.push_str(&PAGE_SENTINEL_RULE.replace("{sentinel}", sentinel));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_names_languages() {
        let p = translation_prompt(None, "en", "pt", None);
        assert!(p.contains("from English to Portuguese"));
        assert!(!p.contains("{source}"));
        assert!(!p.contains("PAGE MARKERS"));
    }

    #[test]
    fn sentinel_rule_is_appended() {
        let p = translation_prompt(None, "en", "pt", Some("[[PAGE_BREAK]]"));
        assert!(p.contains("PAGE MARKERS"));
        assert!(p.contains("[[PAGE_BREAK]]"));
    }

    #[test]
    fn custom_template_placeholders() {
        let p = translation_prompt(Some("{source} => {target}"), "es", "xx", None);
        assert_eq!(p, "Spanish => xx");
    }
}
