//! The document being edited

use crate::types::{Note, NoteId};
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;

static TITLE_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"\\title\{([^}]+)\}").expect("valid title regex"),
        Regex::new(r"\\section\{([^}]+)\}").expect("valid section regex"),
        Regex::new(r"\\subsection\{([^}]+)\}").expect("valid subsection regex"),
    ]
});

/// Sample article shown to first-time users
pub const STARTER_TEMPLATE: &str = r"\documentclass{article}
\usepackage[utf8]{inputenc}
\usepackage{amsmath}
\usepackage{amsfonts}
\usepackage{amssymb}

\title{Welcome to LaTeX Editor}
\author{Your Name}
\date{\today}

\begin{document}

\maketitle

\section{Introduction}
This is a sample LaTeX document. You can edit this content and compile it to PDF.

\section{Mathematical Expressions}
Here are some examples of mathematical notation:

\subsection{Inline Math}
The quadratic formula is $x = \frac{-b \pm \sqrt{b^2 - 4ac}}{2a}$.

\subsection{Display Math}
\[
\int_{-\infty}^{\infty} e^{-x^2} dx = \sqrt{\pi}
\]

\subsection{Aligned Equations}
\begin{align}
f(x) &= x^2 + 2x + 1 \\
     &= (x + 1)^2
\end{align}

\section{Lists}

\subsection{Itemized List}
\begin{itemize}
    \item First item
    \item Second item
    \item Third item
\end{itemize}

\subsection{Numbered List}
\begin{enumerate}
    \item First numbered item
    \item Second numbered item
    \item Third numbered item
\end{enumerate}

\section{Conclusion}
Start editing this content to create your own LaTeX document!

\end{document}";

/// Title for a note: `\title`, then first `\section`, then first
/// `\subsection`, then a dated default
pub fn suggest_title(text: &str) -> String {
    TITLE_PATTERNS
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("Document {}", Local::now().format("%Y-%m-%d")))
}

/// Text buffer plus the identity of the note it belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorDocument {
    pub text: String,
    /// `None` for a note that has never been saved
    pub note_id: Option<NoteId>,
    pub title: String,
    /// Byte offset of the caret
    pub caret: usize,
    pub dirty: bool,
    /// Bumped on every text change
    pub revision: u64,
}

impl EditorDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_note(note: &Note) -> Self {
        let text = note.body().to_string();
        Self {
            caret: text.len(),
            text,
            note_id: Some(note.id),
            title: note.title.clone(),
            dirty: false,
            revision: 0,
        }
    }

    /// Replace the text, keeping the caret in range
    pub fn set_text(&mut self, text: String) {
        self.text = text;
        self.dirty = true;
        self.revision += 1;
        self.caret = clamp_to_boundary(&self.text, self.caret);
    }

    pub fn set_caret(&mut self, caret: usize) {
        self.caret = clamp_to_boundary(&self.text, caret);
    }

    /// True when there is nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn is_new(&self) -> bool {
        self.note_id.is_none()
    }
}

/// Largest char boundary `<= offset`
fn clamp_to_boundary(text: &str, offset: usize) -> usize {
    let mut at = offset.min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }
    at
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_suggest_title_precedence() {
        assert_eq!(
            suggest_title("\\section{Intro}\\title{Main}"),
            "Main"
        );
        assert_eq!(suggest_title("\\subsection{B}\\section{A}"), "A");
        assert_eq!(suggest_title("\\subsection{Only}"), "Only");
        assert!(suggest_title("no commands").starts_with("Document "));
    }

    #[test]
    fn test_starter_template_title() {
        assert_eq!(suggest_title(STARTER_TEMPLATE), "Welcome to LaTeX Editor");
        assert!(STARTER_TEMPLATE.contains("\\begin{document}"));
    }

    #[test]
    fn test_set_text_marks_dirty_and_clamps_caret() {
        let mut doc = EditorDocument::new();
        doc.set_text("hello".into());
        doc.set_caret(5);
        doc.set_text("hé".into());
        assert!(doc.dirty);
        assert_eq!(doc.revision, 2);
        assert_eq!(doc.caret, 3);

        doc.set_caret(2);
        assert_eq!(doc.caret, 1);
    }

    #[test]
    fn test_from_note() {
        let note = Note {
            id: NoteId::new(),
            title: "Saved".into(),
            content: "\\item".into(),
            latex_content: None,
            user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let doc = EditorDocument::from_note(&note);
        assert_eq!(doc.note_id, Some(note.id));
        assert_eq!(doc.caret, 5);
        assert!(!doc.dirty);
        assert!(!doc.is_blank());
    }
}
