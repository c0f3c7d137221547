/*!
 * System prompt construction for chunk translation.
 */

/// System prompt template for Markdown translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for Markdown translation.
    pub const MARKDOWN_TRANSLATOR: &'static str = r#"You are a senior technical translator. Translate the user's Markdown text into {target_language} with native fluency.

## Preserve the Markdown structure exactly
1. Heading markers (#, ##, ...)
2. List markers (-, *, +) and numbering
3. Table layout
4. Link syntax [text](url) and image syntax ![alt](url)
5. Emphasis (**bold**, *italic*)
6. Blank lines and indentation

## Special rules
- Placeholder tokens of the form MD_<kind>_<8 hex digits> stand for code, formulas, URLs, HTML and tables. Copy every token exactly as written and never translate, split or reorder it
- Keep all LaTeX formulas unchanged
- Keep all URLs unchanged
- Match the punctuation style of the original
- Return only the translation, without commentary"#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default Markdown translator template.
    pub fn markdown_translator() -> Self {
        Self::new(Self::MARKDOWN_TRANSLATOR)
    }

    /// Use a configured system prompt when one is set.
    pub fn from_override(system_prompt: Option<&str>) -> Self {
        match system_prompt {
            Some(prompt) if !prompt.trim().is_empty() => Self::new(prompt),
            _ => Self::markdown_translator(),
        }
    }

    /// Instruction shared by every chunk translated into `target_language`
    pub fn base(&self, target_language: &str) -> String {
        self.template.replace("{target_language}", target_language)
    }

    /// Render the instruction for one chunk.
    pub fn render(&self, target_language: &str, section: &str, key_terms: &[String]) -> String {
        let mut prompt = self.base(target_language);

        if !section.is_empty() {
            prompt.push_str(&format!(
                "\n\nThe text below belongs to the section \"{}\" of the document.",
                section
            ));
        }

        if !key_terms.is_empty() {
            prompt.push_str("\n\nImportant terms in this document; translate them consistently:");
            for term in key_terms {
                prompt.push_str("\n- ");
                prompt.push_str(term);
            }
        }

        prompt.push_str("\n\nThis text is part of a long document; keep the translation coherent and the terminology consistent.");
        prompt
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::markdown_translator()
    }
}
