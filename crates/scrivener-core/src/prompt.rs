//! Article brief wrapped around the corpus in a session's seed turn.

use serde::{Deserialize, Serialize};

/// Output specification appended to the seed message.
pub const ARTICLE_BRIEF: &str = "\
- Task: ArticleGPT specializes in creating SEO-optimized articles specifically tailored for Medium.com. \
The target audience are people who are looking to get started with learning AI & Machine Learning and LLMs for their use-case.

Output Specifications:

* Output Style and Format: Craft articles that fit Medium.com's style, being straightforward and concise. \
Ensure grammatical accuracy, coherence, and stylistic refinement. Use hooks and effective whitespace management \
to maintain reader's attention. Humor and Sarcasm: use rhetorical devices sparingly so the text feels more human-like.
* Tone: The tone is conversational and likable, similar to Morgan Freeman's speech style.
* Titles and Subheadings: Create titles and subheadings that are impactful, concise and effectively capture the content's essence.
* Titles: 5-9 words, with numbers for higher click-through rates. Prefer negative or neutral tones.
* Headlines: Structure in two parts, main and sub-headline.
* Subheadings: Spark curiosity with questions, action words, and numbers; emphasize benefits.
* Content balancing simplicity, engagement, and SEO optimization for Medium.

Sample output:

Title

Subheading 1

paragraph 1: Explain concisely the core of the article. How it can be useful for their use-case. (2-3 sentences)

Subheading 2

paragraph 2: Tell the readers how doing/having three things can dramatically improve results. (1-2 sentences)

[3 bullet points or 3 numbered list to support paragraph 2]

paragraph 3: summarize the bullet points and how it can be useful for the reader. (1-2 sentences)

Subheading 3

paragraph 4: Concluding Anecdote or Opinion: a final 'personal' touch that leaves the reader with a sense of \
individual perspective. (2-3 sentences)";

/// Seed message settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BriefConfig {
    /// Wrap the corpus in the idea-funnel brief. When false the seed is
    /// just the corpus followed by the instruction.
    pub enabled: bool,
    /// Required shape of the final article
    pub output_template: String,
}

impl Default for BriefConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_template: ARTICLE_BRIEF.to_string(),
        }
    }
}

impl BriefConfig {
    /// Build the content of a session's seed turn.
    pub fn seed_message(&self, corpus: &str, instruction: &str) -> String {
        if !self.enabled {
            return format!("{corpus}\n\n{instruction}");
        }
        format!(
            "Use this content as background for the articles you will make: {corpus}.\n\
             First create 10 ideas, then 5, then 3, then 1.\n\
             Finalize the ideas with the planner and make sure to follow the criteria of choosing based on: \
             \"What will be the most dramatic, emotional and entertaining idea\".\n\
             Do not express gratitude in responses.\n\
             The topic of the article will be about: {instruction}\n\
             The final output should look like:\n{}",
            self.output_template
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_contains_corpus_instruction_and_template() {
        let brief = BriefConfig::default();
        let seed = brief.seed_message("CORPUS", "vector databases");
        assert!(seed.starts_with("Use this content as background"));
        assert!(seed.contains("CORPUS"));
        assert!(seed.contains("The topic of the article will be about: vector databases"));
        assert!(seed.contains("Do not express gratitude"));
        assert!(seed.ends_with(ARTICLE_BRIEF));
    }

    #[test]
    fn test_disabled_brief_is_plain() {
        let brief = BriefConfig {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(brief.seed_message("c", "i"), "c\n\ni");
    }
}
