//! Result presentation.
//!
//! [`render`] maps one [`AnalysisResult`] and a [`ViewMode`] to a
//! [`Fragment`]: a short list of blocks holding raw text. Escaping happens in
//! exactly one place per output format ([`Fragment::to_html`],
//! [`Fragment::to_markdown`]), so every mode gets the same treatment.

use crate::analysis::AnalysisResult;
use std::fmt::Write as _;

/// Characters of detected text kept in the summary bullet.
pub const SUMMARY_TEXT_PREVIEW: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// "What is this?" Selected automatically when a result arrives.
    #[default]
    Overview,
    Explain,
    Code,
    Summarize,
}

impl ViewMode {
    pub const ALL: [ViewMode; 4] = [
        ViewMode::Overview,
        ViewMode::Explain,
        ViewMode::Code,
        ViewMode::Summarize,
    ];

    /// Button caption.
    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Overview => "What is this?",
            ViewMode::Explain => "Explain",
            ViewMode::Code => "Convert to Code",
            ViewMode::Summarize => "Summarize",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    Paragraph(String),
    /// Bullet list; `objects` marks the detected-object list.
    List { items: Vec<String>, objects: bool },
    Code(String),
    /// `name: value` pair, e.g. the language of a code block.
    Field { name: String, value: String },
    /// Stand-in text when there is nothing to show.
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    blocks: Vec<Block>,
}

impl Fragment {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn heading(&mut self, text: &str) {
        self.blocks.push(Block::Heading(text.to_string()));
    }

    fn paragraph(&mut self, text: &str) {
        self.blocks.push(Block::Paragraph(text.to_string()));
    }

    fn placeholder(&mut self, text: &str) {
        self.blocks.push(Block::Placeholder(text.to_string()));
    }

    /// HTML markup, every piece of text escaped.
    pub fn to_html(&self) -> String {
        let mut html = String::from(r#"<div class="result-text">"#);
        for block in &self.blocks {
            match block {
                Block::Heading(text) => {
                    let _ = write!(html, "<h3>{}</h3>", escape_html(text));
                }
                Block::Paragraph(text) => {
                    let _ = write!(html, "<p>{}</p>", escape_html(text));
                }
                Block::List { items, objects } => {
                    html.push_str(if *objects {
                        r#"<ul class="object-list">"#
                    } else {
                        "<ul>"
                    });
                    for item in items {
                        let _ = write!(html, "<li>{}</li>", escape_html(item));
                    }
                    html.push_str("</ul>");
                }
                Block::Code(code) => {
                    let _ = write!(
                        html,
                        r#"<div class="code-block"><code>{}</code></div>"#,
                        escape_html(code)
                    );
                }
                Block::Field { name, value } => {
                    let _ = write!(
                        html,
                        "<p><strong>{}:</strong> {}</p>",
                        escape_html(name),
                        escape_html(value)
                    );
                }
                Block::Placeholder(text) => {
                    let _ = write!(html, r#"<p class="placeholder">{}</p>"#, escape_html(text));
                }
            }
        }
        html.push_str("</div>");
        html
    }

    /// CommonMark for the overlay's markdown viewer.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        for block in &self.blocks {
            match block {
                Block::Heading(text) => {
                    let _ = write!(md, "### {}\n\n", escape_markdown(text));
                }
                Block::Paragraph(text) => {
                    let _ = write!(md, "{}\n\n", escape_markdown(text));
                }
                Block::List { items, .. } => {
                    for item in items {
                        let _ = writeln!(md, "- {}", escape_markdown(item));
                    }
                    md.push('\n');
                }
                Block::Code(code) => {
                    let fence = code_fence(code);
                    let _ = write!(md, "{fence}\n{}\n{fence}\n\n", code.trim_end_matches('\n'));
                }
                Block::Field { name, value } => {
                    let _ = write!(
                        md,
                        "**{}:** {}\n\n",
                        escape_markdown(name),
                        escape_markdown(value)
                    );
                }
                Block::Placeholder(text) => {
                    let _ = write!(md, "*{}*\n\n", escape_markdown(text));
                }
            }
        }
        md
    }

    /// Unformatted text, for the clipboard and the terminal.
    pub fn to_plain_text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Heading(text) | Block::Paragraph(text) | Block::Placeholder(text) => {
                    lines.push(text.clone())
                }
                Block::Code(code) => lines.push(code.clone()),
                Block::List { items, .. } => {
                    lines.extend(items.iter().map(|item| format!("- {item}")))
                }
                Block::Field { name, value } => lines.push(format!("{name}: {value}")),
            }
        }
        lines.join("\n")
    }
}

/// Renders `result` under `mode`.
pub fn render(result: &AnalysisResult, mode: ViewMode) -> Fragment {
    match mode {
        ViewMode::Overview => overview(result),
        ViewMode::Explain => explain(result),
        ViewMode::Code => code(result),
        ViewMode::Summarize => summarize(result),
    }
}

fn overview(result: &AnalysisResult) -> Fragment {
    let mut out = Fragment::default();
    if let Some(description) = &result.description {
        out.heading("Description");
        out.paragraph(description);
    }
    if !result.objects().is_empty() {
        out.heading("Detected Objects");
        out.blocks.push(Block::List {
            items: result.objects().to_vec(),
            objects: true,
        });
    }
    if let Some(text) = &result.detected_text {
        out.heading("Detected Text");
        out.paragraph(text);
    }
    out
}

fn explain(result: &AnalysisResult) -> Fragment {
    let mut out = Fragment::default();
    match result.explanation.as_ref().or(result.description.as_ref()) {
        Some(explanation) => {
            out.heading("Explanation");
            out.paragraph(explanation);
        }
        None => out.placeholder("No explanation available"),
    }
    if let Some(text) = &result.detected_text {
        out.heading("Text Content");
        out.paragraph(text);
    }
    out
}

fn code(result: &AnalysisResult) -> Fragment {
    let mut out = Fragment::default();
    match (result.is_code, result.code()) {
        (true, Some(code)) => {
            out.heading("Detected Code");
            out.blocks.push(Block::Code(code.to_string()));
            if let Some(language) = &result.code_version {
                out.blocks.push(Block::Field {
                    name: "Language".to_string(),
                    value: language.clone(),
                });
            }
            if let Some(explanation) = &result.explanation {
                out.heading("Code Explanation");
                out.paragraph(explanation);
            }
        }
        _ => match &result.detected_text {
            Some(text) => {
                out.heading("Text Content (Not Code)");
                out.paragraph(text);
                out.placeholder("This text does not appear to be code.");
            }
            None => out.placeholder("No code detected in the selected region."),
        },
    }
    out
}

fn summarize(result: &AnalysisResult) -> Fragment {
    let mut out = Fragment::default();
    out.heading("Summary");

    let mut items = Vec::new();
    if let Some(description) = &result.description {
        items.push(description.clone());
    }
    if result.is_code {
        let language = result.code_version.as_deref().unwrap_or("code");
        items.push(format!("Contains {language} code."));
    }
    if !result.objects().is_empty() {
        items.push(format!("Detected objects: {}.", result.objects().join(", ")));
    }
    if let Some(text) = &result.detected_text {
        items.push(format!("Text content: {}", preview(text, SUMMARY_TEXT_PREVIEW)));
    }

    if items.is_empty() {
        out.placeholder("No summary available");
    } else {
        out.blocks.push(Block::List {
            items,
            objects: false,
        });
    }
    out
}

/// First `max_chars` characters, with "..." appended when cut.
fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// One line of the metadata strip shown above every mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataItem {
    pub icon: &'static str,
    pub label: &'static str,
    pub value: String,
}

pub fn metadata(result: &AnalysisResult) -> Vec<MetadataItem> {
    let mut items = Vec::new();
    if result.is_code {
        items.push(MetadataItem {
            icon: "📝",
            label: "Code Detected",
            value: result.code_version.clone().unwrap_or_else(|| "Unknown".into()),
        });
    }
    if result.detected_text.is_some() {
        items.push(MetadataItem {
            icon: "📄",
            label: "Text Detected",
            value: "Yes".into(),
        });
    }
    if !result.objects().is_empty() {
        items.push(MetadataItem {
            icon: "🖼",
            label: "Objects",
            value: result.objects().len().to_string(),
        });
    }
    items
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Backslash-escapes CommonMark punctuation and keeps line breaks.
fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '{' | '}' | '[' | ']' | '(' | ')' | '#' | '+' | '-' | '.'
            | '!' | '|' | '<' | '>' | '~' | '&' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("  \n"),
            _ => out.push(c),
        }
    }
    out
}

/// A backtick fence longer than any backtick run inside `code`.
fn code_fence(code: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in code.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_result() -> AnalysisResult {
        AnalysisResult {
            description: Some("A code editor".into()),
            detected_text: Some("fn main() {}".into()),
            objects: Some(vec!["monitor".into(), "keyboard".into()]),
            is_code: true,
            code_version: Some("rust".into()),
            formatted_code: Some("fn main() {}\n".into()),
            explanation: Some("An empty Rust program".into()),
        }
    }

    #[test]
    fn overview_lists_description_objects_then_text() {
        let html = render(&full_result(), ViewMode::Overview).to_html();
        assert_eq!(
            html,
            concat!(
                r#"<div class="result-text">"#,
                "<h3>Description</h3><p>A code editor</p>",
                r#"<h3>Detected Objects</h3><ul class="object-list"><li>monitor</li><li>keyboard</li></ul>"#,
                "<h3>Detected Text</h3><p>fn main() {}</p>",
                "</div>"
            )
        );
    }

    #[test]
    fn overview_omits_absent_sections() {
        let result = AnalysisResult {
            detected_text: Some("hello".into()),
            ..Default::default()
        };
        let fragment = render(&result, ViewMode::Overview);
        assert_eq!(
            fragment.blocks(),
            [
                Block::Heading("Detected Text".into()),
                Block::Paragraph("hello".into())
            ]
        );
        assert!(render(&AnalysisResult::default(), ViewMode::Overview).is_empty());
    }

    #[test]
    fn explain_falls_back_to_description_then_placeholder() {
        let cat = AnalysisResult {
            description: Some("A cat".into()),
            ..Default::default()
        };
        assert_eq!(
            render(&cat, ViewMode::Explain).blocks(),
            [
                Block::Heading("Explanation".into()),
                Block::Paragraph("A cat".into())
            ]
        );

        assert_eq!(
            render(&AnalysisResult::default(), ViewMode::Explain).blocks(),
            [Block::Placeholder("No explanation available".into())]
        );
    }

    #[test]
    fn explain_prefers_explanation_and_appends_text() {
        let fragment = render(&full_result(), ViewMode::Explain);
        assert_eq!(
            fragment.blocks(),
            [
                Block::Heading("Explanation".into()),
                Block::Paragraph("An empty Rust program".into()),
                Block::Heading("Text Content".into()),
                Block::Paragraph("fn main() {}".into()),
            ]
        );
    }

    #[test]
    fn code_block_labelled_with_language_and_no_missing_explanation() {
        let result = AnalysisResult {
            description: Some("x".into()),
            is_code: true,
            code_version: Some("python".into()),
            detected_text: Some("print(1)".into()),
            ..Default::default()
        };
        let fragment = render(&result, ViewMode::Code);
        assert_eq!(
            fragment.blocks(),
            [
                Block::Heading("Detected Code".into()),
                Block::Code("print(1)".into()),
                Block::Field {
                    name: "Language".into(),
                    value: "python".into()
                },
            ]
        );
        assert!(fragment.to_html().contains("<code>print(1)</code>"));
    }

    #[test]
    fn code_prefers_formatted_code_and_appends_explanation() {
        let fragment = render(&full_result(), ViewMode::Code);
        assert_eq!(fragment.blocks()[1], Block::Code("fn main() {}\n".into()));
        assert_eq!(
            fragment.blocks().last(),
            Some(&Block::Paragraph("An empty Rust program".into()))
        );
    }

    #[test]
    fn code_mode_fallbacks() {
        let prose = AnalysisResult {
            detected_text: Some("Meeting at noon".into()),
            ..Default::default()
        };
        let blocks = render(&prose, ViewMode::Code);
        assert_eq!(blocks.blocks()[0], Block::Heading("Text Content (Not Code)".into()));

        let empty_code = AnalysisResult {
            is_code: true,
            ..Default::default()
        };
        assert_eq!(
            render(&empty_code, ViewMode::Code).blocks(),
            [Block::Placeholder("No code detected in the selected region.".into())]
        );
    }

    #[test]
    fn summary_bullets_follow_fixed_order() {
        let fragment = render(&full_result(), ViewMode::Summarize);
        assert_eq!(
            fragment.blocks()[1],
            Block::List {
                items: vec![
                    "A code editor".into(),
                    "Contains rust code.".into(),
                    "Detected objects: monitor, keyboard.".into(),
                    "Text content: fn main() {}".into(),
                ],
                objects: false,
            }
        );
    }

    #[test]
    fn summary_truncates_long_text_by_characters() {
        let text = "é".repeat(150);
        let result = AnalysisResult {
            detected_text: Some(text),
            ..Default::default()
        };
        let fragment = render(&result, ViewMode::Summarize);
        let Block::List { items, .. } = &fragment.blocks()[1] else {
            panic!("expected a bullet list");
        };
        assert_eq!(items[0], format!("Text content: {}...", "é".repeat(100)));

        let exact = "a".repeat(100);
        assert_eq!(preview(&exact, 100), exact);
    }

    #[test]
    fn empty_summary_uses_placeholder() {
        assert_eq!(
            render(&AnalysisResult::default(), ViewMode::Summarize).blocks(),
            [
                Block::Heading("Summary".into()),
                Block::Placeholder("No summary available".into())
            ]
        );
    }

    #[test]
    fn markup_from_the_service_is_escaped_in_every_mode() {
        let hostile = "<img src=x onerror=\"alert('x')\">";
        let result = AnalysisResult {
            description: Some(hostile.into()),
            detected_text: Some(hostile.into()),
            objects: Some(vec![hostile.into()]),
            is_code: true,
            code_version: Some(hostile.into()),
            formatted_code: Some(hostile.into()),
            explanation: Some(hostile.into()),
        };
        for mode in ViewMode::ALL {
            let html = render(&result, mode).to_html();
            assert!(!html.contains("<img"), "{mode:?} leaked markup: {html}");
            assert!(html.contains("&lt;img src=x onerror=&quot;alert(&#39;x&#39;)&quot;&gt;"));
        }
    }

    #[test]
    fn markdown_escapes_text_and_fences_code() {
        let result = AnalysisResult {
            description: Some("*bold* [link](http://x)".into()),
            is_code: true,
            formatted_code: Some("let s = \"```\";".into()),
            ..Default::default()
        };
        let overview = render(&result, ViewMode::Overview).to_markdown();
        assert!(overview.contains(r"\*bold\* \[link\]\(http://x\)"));

        let code = render(&result, ViewMode::Code).to_markdown();
        assert!(code.contains("````\nlet s = \"```\";\n````"));
    }

    #[test]
    fn rendering_is_deterministic() {
        for mode in ViewMode::ALL {
            assert_eq!(render(&full_result(), mode), render(&full_result(), mode));
        }
    }

    #[test]
    fn metadata_strip_counts_what_was_found() {
        let items = metadata(&full_result());
        let summary: Vec<_> = items.iter().map(|i| (i.label, i.value.as_str())).collect();
        assert_eq!(
            summary,
            [("Code Detected", "rust"), ("Text Detected", "Yes"), ("Objects", "2")]
        );
        assert!(metadata(&AnalysisResult::default()).is_empty());
    }
}
