//! LaTeX command vocabulary for autocomplete

/// Character that begins every catalog command
pub const TRIGGER_MARKER: char = '\\';

/// Built-in command snippets, in display order
pub const DEFAULT_COMMANDS: &[&str] = &[
    // Preamble
    "\\documentclass{article}",
    "\\documentclass{report}",
    "\\documentclass{book}",
    "\\usepackage{}",
    "\\usepackage[]{}",
    "\\begin{document}",
    "\\end{document}",
    "\\title{}",
    "\\author{}",
    "\\date{}",
    "\\maketitle",
    "\\tableofcontents",
    // Structure
    "\\section{}",
    "\\subsection{}",
    "\\subsubsection{}",
    "\\paragraph{}",
    "\\label{}",
    "\\ref{}",
    "\\cite{}",
    "\\footnote{}",
    // Environments
    "\\begin{itemize}",
    "\\end{itemize}",
    "\\begin{enumerate}",
    "\\end{enumerate}",
    "\\item",
    "\\begin{equation}",
    "\\end{equation}",
    "\\begin{align}",
    "\\end{align}",
    "\\begin{figure}",
    "\\end{figure}",
    "\\begin{table}",
    "\\end{table}",
    "\\begin{tabular}{}",
    "\\end{tabular}",
    "\\includegraphics[]{}",
    "\\caption{}",
    "\\centering",
    "\\hline",
    // Text formatting
    "\\textbf{}",
    "\\textit{}",
    "\\underline{}",
    "\\emph{}",
    "\\href{}{}",
    "\\url{}",
    "\\newpage",
    "\\noindent",
    "\\vspace{}",
    "\\hspace{}",
    "\\today",
    // Math
    "\\frac{}{}",
    "\\sqrt{}",
    "\\sum_{}^{}",
    "\\int_{}^{}",
    "\\lim_{}",
    "\\left(",
    "\\right)",
    "\\alpha",
    "\\beta",
    "\\gamma",
    "\\delta",
    "\\epsilon",
    "\\theta",
    "\\lambda",
    "\\mu",
    "\\pi",
    "\\sigma",
    "\\omega",
    "\\infty",
    "\\partial",
    "\\nabla",
    "\\cdot",
    "\\times",
    "\\pm",
    "\\leq",
    "\\geq",
    "\\neq",
    "\\approx",
    "\\rightarrow",
    "\\Rightarrow",
    "\\mathbb{}",
    "\\mathrm{}",
];

/// Ordered, duplicate-free list of command snippets
///
/// Fixed once built; the session owns one behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CommandCatalog {
    entries: Vec<String>,
    /// Lowercased copies for case-insensitive matching
    folded: Vec<String>,
}

impl Default for CommandCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_COMMANDS.iter().copied())
    }
}

impl CommandCatalog {
    /// Build a catalog, keeping the first occurrence of any duplicate
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut kept: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry.into();
            if !kept.contains(&entry) {
                kept.push(entry);
            }
        }
        let folded = kept.iter().map(|e| e.to_lowercase()).collect();

        Self {
            entries: kept,
            folded,
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries containing `term` (case-insensitive), in catalog order,
    /// at most `limit` of them
    pub fn filter(&self, term: &str, limit: usize) -> Vec<String> {
        let needle = term.to_lowercase();
        self.entries
            .iter()
            .zip(&self.folded)
            .filter(|(_, folded)| folded.contains(&needle))
            .map(|(entry, _)| entry.clone())
            .take(limit)
            .collect()
    }
}
