//! The standard article-writing roster.

use super::roles::RoleSpec;

pub const USER_PROXY: &str = "User_Proxy";
pub const PROOF_READER: &str = "Proof_Reader";
pub const WRITER: &str = "Writer";
pub const STYLE_SPECIALIST: &str = "Style_Specialist";
pub const NARRATIVE_DESIGNER: &str = "Narrative_Designer";
pub const EMOTIONAL_STRATEGIST: &str = "Emotional_Strategist";

/// Six roles in rotation order: the human proxy followed by five writers' room roles.
pub fn standard_roster() -> Vec<RoleSpec> {
    vec![
        RoleSpec::human_proxy(
            USER_PROXY,
            "User Proxy. Provides feedback on the article's effectiveness in engaging readers interested in AI and Machine Learning.\n\
             Ensures the article meets overall objectives and resonates with the intended audience.\n\
             Relays audience and management preferences to the team for necessary adjustments.",
        ),
        RoleSpec::generator(
            PROOF_READER,
            "Proofreader. Focuses on grammatical accuracy and stylistic refinement, ensuring that articles meet Medium.com's standards.\n\
             Enhances clarity and coherence while maintaining a conversational, likable tone akin to Morgan Freeman's speech style.\n\
             Assures the use of effective hooks and whitespace management to keep the reader's attention.\n\
             Ensures articles are straightforward, concise, and free of filler words, with minimal use of humor and sarcasm.",
        ),
        RoleSpec::generator(
            WRITER,
            "Writer. Develops SEO-optimized, engaging content tailored for Medium.com's audience interested in AI & Machine Learning.\n\
             Writes with a conversational and likable tone, ensuring simplicity and engagement.\n\
             Crafts impactful, concise titles and subheadings, with titles of 5-9 words incorporating numbers, and negative or neutral tones.\n\
             Structures content with effective subheadings and bullet points to facilitate reader understanding and engagement.",
        ),
        RoleSpec::generator(
            STYLE_SPECIALIST,
            "Style Specialist. Refines tone and style to be conversational and likable, aligning with the Morgan Freeman style.\n\
             Ensures the use of effective rhetoric, including minimal humor and sarcasm, to enhance readability and engagement.\n\
             Collaborates with the Writer and Proofreader to ensure stylistic consistency throughout the article.",
        ),
        RoleSpec::generator(
            NARRATIVE_DESIGNER,
            "Narrative Designer. Structures the article to maintain engagement and curiosity, using questions, action words, and numbers in subheadings.\n\
             Collaborates with the Writer and Emotional Impact Strategist to ensure the narrative is clear, concise, and resonates with the target audience.\n\
             Advises on the narrative flow to maintain reader interest and optimize for SEO.",
        ),
        RoleSpec::generator(
            EMOTIONAL_STRATEGIST,
            "Develops strategies for titles and subheadings that are impactful, concise, and evoke curiosity.\n\
             Advises on incorporating emotional cues that resonate with the audience's interests in AI and Machine Learning.\n\
             Collaborates with the Narrative Designer and Style Specialist to ensure a unified approach in content framing.",
        ),
    ]
}
