//! Follow-up questions about the last analysis.
//!
//! [`ResearchChat`] answers questions about the ranked papers with fixed
//! patterns: a question is first classified into an [`Intent`], then
//! rendered from the analyzed papers. Papers are referred to by their rank,
//! starting at 1.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::AnalyzedPaper;
use crate::vectorize::normalize_text;

const NO_PAPERS: &str = "No papers are currently loaded. Please search for papers first.";

/// Ordinal words recognised as paper references, in match order.
const ORDINALS: &[(&str, usize)] = &[
    ("first", 1),
    ("second", 2),
    ("third", 3),
    ("fourth", 4),
    ("fifth", 5),
    ("sixth", 6),
    ("seventh", 7),
    ("eighth", 8),
    ("ninth", 9),
    ("tenth", 10),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// What a question about a single paper is after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperAspect {
    Findings,
    Methodology,
    Authors,
    Citations,
    General,
}

/// The kind of answer a question calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// A question about the paper at rank `number` (1-based)
    Paper { number: usize, aspect: PaperAspect },
    Overview,
    Methodologies,
    Findings,
    Compare,
    Best,
    Recent,
    Help,
    Fallback,
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Find a paper reference such as "paper 2", "3" or "the second paper".
fn paper_reference(question: &str) -> Option<usize> {
    static REFERENCE: OnceLock<Regex> = OnceLock::new();
    let reference = REFERENCE.get_or_init(|| {
        Regex::new(r"(?:paper\s+)?(\d+)|(?:first|second|third|fourth|fifth)\s+paper")
            .expect("paper reference pattern is valid")
    });

    let captures = reference.captures(question)?;

    if let Some((_, number)) = ORDINALS.iter().find(|(word, _)| question.contains(word)) {
        return Some(*number);
    }

    captures
        .get(1)
        .and_then(|digits| digits.as_str().parse::<usize>().ok())
        .filter(|&n| n > 0)
}

/// Classify a question.
pub fn detect_intent(question: &str) -> Intent {
    let q = normalize_text(question);

    if let Some(number) = paper_reference(&q) {
        let aspect = if contains_any(&q, &["about", "state", "finding", "result", "conclude", "show"]) {
            PaperAspect::Findings
        } else if contains_any(&q, &["method", "methodology", "approach", "how"]) {
            PaperAspect::Methodology
        } else if contains_any(&q, &["author", "who wrote", "researcher"]) {
            PaperAspect::Authors
        } else if contains_any(&q, &["citation", "impact", "influential"]) {
            PaperAspect::Citations
        } else {
            PaperAspect::General
        };
        return Intent::Paper { number, aspect };
    }

    if contains_any(&q, &["summary", "summarize", "overview"]) {
        Intent::Overview
    } else if contains_any(&q, &["method", "methodology", "approach"]) {
        Intent::Methodologies
    } else if contains_any(&q, &["finding", "result", "discover", "conclude"]) {
        Intent::Findings
    } else if contains_any(&q, &["compare", "comparison", "difference", "similar"]) {
        Intent::Compare
    } else if contains_any(&q, &["best", "top", "most important", "recommend"]) {
        Intent::Best
    } else if contains_any(&q, &["recent", "latest", "new"]) {
        Intent::Recent
    } else if contains_any(&q, &["help", "what can you", "how to"]) {
        Intent::Help
    } else {
        Intent::Fallback
    }
}

/// Pattern-matching responder over the last analysis.
#[derive(Debug, Clone, Default)]
pub struct ResearchChat {
    history: Vec<ChatMessage>,
}

impl ResearchChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// The conversation so far, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Answer a question about `papers` (ranked, best first).
    ///
    /// With no papers a fixed prompt to search first is returned and nothing
    /// is recorded.
    pub fn respond(&mut self, question: &str, papers: &[AnalyzedPaper]) -> String {
        if papers.is_empty() {
            return NO_PAPERS.to_string();
        }

        self.history.push(ChatMessage {
            role: ChatRole::User,
            content: question.to_string(),
        });

        let intent = detect_intent(question);
        debug!(?intent, "Answering follow-up question");
        let answer = render(intent, papers);

        self.history.push(ChatMessage {
            role: ChatRole::Assistant,
            content: answer.clone(),
        });
        answer
    }
}

fn render(intent: Intent, papers: &[AnalyzedPaper]) -> String {
    match intent {
        Intent::Paper { number, aspect } => match papers.get(number - 1) {
            Some(paper) => render_paper(number, aspect, paper),
            None => format!(
                "I only have information about {} papers. Paper {} is not in the results.",
                papers.len(),
                number
            ),
        },
        Intent::Overview => {
            let mut out = format!(
                "Research overview: {} papers analyzed.\n\nTop papers:\n",
                papers.len()
            );
            for (i, analyzed) in papers.iter().take(3).enumerate() {
                let paper = &analyzed.scored.paper;
                out.push_str(&format!(
                    "\n{}. {} ({})\n   - {} citations\n   - {}\n",
                    i + 1,
                    paper.title,
                    paper.year,
                    paper.citation_count,
                    analyzed.summary.key_finding
                ));
            }
            out
        }
        Intent::Methodologies => {
            let mut out = String::from("Research methodologies used:\n\n");
            let mut count = 0;
            for (i, analyzed) in papers.iter().take(5).enumerate() {
                let methodology = &analyzed.summary.methodology;
                if !methodology.to_lowercase().contains("not extracted") {
                    out.push_str(&format!("Paper {}: {}\n\n", i + 1, methodology));
                    count += 1;
                }
            }
            if count == 0 {
                out.push_str(
                    "Detailed methodology information is limited in the summaries. \
                     Ask about a specific paper's approach for more detail.",
                );
            }
            out
        }
        Intent::Findings => {
            let mut out = String::from("Key findings from the research:\n\n");
            for (i, analyzed) in papers.iter().take(5).enumerate() {
                out.push_str(&format!("Paper {}: {}\n\n", i + 1, analyzed.summary.key_finding));
            }
            out
        }
        Intent::Compare => "I can help you compare papers. Say which ones, for example \
             'Compare paper 1 and paper 2' or 'What are the differences between the first \
             and second papers?'"
            .to_string(),
        Intent::Best => {
            let top = &papers[0];
            format!(
                "By relevance, {} ({}) ranks first with:\n- {} citations\n- Relevance: {:.2}\n- Confidence: {:.2}",
                top.scored.paper.title,
                top.scored.paper.year,
                top.scored.paper.citation_count,
                top.scored.scores.relevance,
                top.scored.scores.confidence
            )
        }
        Intent::Recent => {
            let mut recent: Vec<&AnalyzedPaper> = papers.iter().collect();
            recent.sort_by(|a, b| b.scored.paper.year.cmp(&a.scored.paper.year));

            let mut out = String::from("Most recent papers:\n\n");
            for (i, analyzed) in recent.iter().take(3).enumerate() {
                out.push_str(&format!(
                    "{}. {} ({})\n   - {} citations\n\n",
                    i + 1,
                    analyzed.scored.paper.title,
                    analyzed.scored.paper.year,
                    analyzed.scored.paper.citation_count
                ));
            }
            out
        }
        Intent::Help => "I can help you explore these papers. Try asking:\n\n\
             About specific papers:\n\
             - \"What is paper 2 about?\"\n\
             - \"Tell me about the second paper\"\n\
             - \"What methodology did paper 3 use?\"\n\n\
             General queries:\n\
             - \"Summarize the findings\"\n\
             - \"Which is the top paper?\"\n\
             - \"Show me recent papers\"\n\n\
             Comparisons:\n\
             - \"Compare paper 1 and paper 2\""
            .to_string(),
        Intent::Fallback => format!(
            "I have {} research papers loaded. You can ask about specific papers \
             (e.g. 'What does paper 2 say?'), methodologies, key findings, citations \
             and impact, or comparisons between papers.",
            papers.len()
        ),
    }
}

fn render_paper(number: usize, aspect: PaperAspect, analyzed: &AnalyzedPaper) -> String {
    let paper = &analyzed.scored.paper;
    let summary = &analyzed.summary;
    let lead_authors = paper.authors.iter().take(3).cloned().collect::<Vec<_>>().join(", ");

    match aspect {
        PaperAspect::Findings => format!(
            "Paper {}: {}\n\nKey finding: {}\n\nImplications: {}\n\nAuthors: {}\nYear: {} | Citations: {}\n\nAbstract: {}",
            number,
            paper.title,
            summary.key_finding,
            summary.implications,
            lead_authors,
            paper.year,
            paper.citation_count,
            excerpt(&paper.abstract_text, 300)
        ),
        PaperAspect::Methodology => format!(
            "Paper {} methodology:\n\n{}\n\nFrom the abstract:\n\n{}",
            number,
            summary.methodology,
            excerpt(&paper.abstract_text, 400)
        ),
        PaperAspect::Authors => {
            let mut out = format!(
                "Paper {} was written by: {}\n\nPublished in {}",
                number,
                paper.authors.join(", "),
                paper.year
            );
            if let Some(venue) = &paper.venue {
                out.push_str(&format!(" at {}", venue));
            }
            out
        }
        PaperAspect::Citations => format!(
            "Paper {} has {} citations and {} influential citations. Relevance: {:.2} | Confidence: {:.2}",
            number,
            paper.citation_count,
            paper.influential_citation_count,
            analyzed.scored.scores.relevance,
            analyzed.scored.scores.confidence
        ),
        PaperAspect::General => format!(
            "Paper {}: {}\n\nAuthors: {}\nYear: {}\nCitations: {}\n\nKey finding: {}\n\n\
             You can ask about the methodology, findings or specific aspects of this paper.",
            number,
            paper.title,
            lead_authors,
            paper.year,
            paper.citation_count,
            summary.key_finding
        ),
    }
}

/// At most `max_chars` characters of `text`, with an ellipsis if cut.
fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaperRecord, PaperScores, ScoredPaper};
    use crate::summary::Summarizer;

    fn analyzed(title: &str, year: i32, citations: u32) -> AnalyzedPaper {
        let mut paper = PaperRecord::new(title, format!("{} shows an effect. More text.", title), year);
        paper.citation_count = citations;
        paper.authors = vec!["A. One".to_string(), "B. Two".to_string()];
        paper.venue = Some("Nature".to_string());
        let scored = ScoredPaper::new(0, paper, PaperScores::new(0.8, 0, 0.7), 0.6, 0.3);
        let summary = Summarizer::default().summarize(&scored);
        AnalyzedPaper { scored, summary }
    }

    fn papers() -> Vec<AnalyzedPaper> {
        vec![
            analyzed("Alpha", 2015, 300),
            analyzed("Beta", 2022, 20),
            analyzed("Gamma", 2019, 5),
        ]
    }

    #[test]
    fn test_detect_paper_references() {
        assert_eq!(
            detect_intent("What is paper 2 about?"),
            Intent::Paper { number: 2, aspect: PaperAspect::Findings }
        );
        assert_eq!(
            detect_intent("Who are the authors of the third paper"),
            Intent::Paper { number: 3, aspect: PaperAspect::Authors }
        );
        assert_eq!(
            detect_intent("citations for 1"),
            Intent::Paper { number: 1, aspect: PaperAspect::Citations }
        );
        assert_eq!(
            detect_intent("What methodology did paper 3 use?"),
            Intent::Paper { number: 3, aspect: PaperAspect::Methodology }
        );
        assert_eq!(
            detect_intent("paper 4"),
            Intent::Paper { number: 4, aspect: PaperAspect::General }
        );
    }

    #[test]
    fn test_detect_general_intents() {
        assert_eq!(detect_intent("Give me an overview"), Intent::Overview);
        assert_eq!(detect_intent("Which methodologies were used?"), Intent::Methodologies);
        assert_eq!(detect_intent("What were the key findings?"), Intent::Findings);
        assert_eq!(detect_intent("compare them"), Intent::Compare);
        assert_eq!(detect_intent("Which is the best?"), Intent::Best);
        assert_eq!(detect_intent("anything recent?"), Intent::Recent);
        assert_eq!(detect_intent("help"), Intent::Help);
        assert_eq!(detect_intent("tell me a joke"), Intent::Fallback);
    }

    #[test]
    fn test_no_papers() {
        let mut chat = ResearchChat::new();
        assert_eq!(chat.respond("overview", &[]), NO_PAPERS);
        assert!(chat.history().is_empty());
    }

    #[test]
    fn test_paper_answers() {
        let mut chat = ResearchChat::new();
        let papers = papers();

        let answer = chat.respond("Who wrote paper 1?", &papers);
        assert!(answer.contains("Paper 1 was written by: A. One, B. Two"));
        assert!(answer.contains("at Nature"));

        let answer = chat.respond("what is paper 7 about", &papers);
        assert!(answer.contains("I only have information about 3 papers. Paper 7"));

        assert_eq!(chat.history().len(), 4);
        assert_eq!(chat.history()[0].role, ChatRole::User);
        assert_eq!(chat.history()[1].role, ChatRole::Assistant);
    }

    #[test]
    fn test_recent_orders_by_year() {
        let answer = ResearchChat::new().respond("show the latest work", &papers());
        let beta = answer.find("Beta").unwrap();
        let gamma = answer.find("Gamma").unwrap();
        let alpha = answer.find("Alpha").unwrap();
        assert!(beta < gamma && gamma < alpha);
    }

    #[test]
    fn test_best_uses_top_ranked() {
        let answer = ResearchChat::new().respond("what do you recommend", &papers());
        assert!(answer.starts_with("By relevance, Alpha (2015)"));
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdef", 3), "abc...");
    }
}
