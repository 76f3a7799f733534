//! Terminal presentation layer.
//!
//! `TerminalHuman` answers the human gate from a line reader (stdin in the
//! binary) and prints the session's turn stream before every prompt so the
//! operator sees the conversation up to the point they are asked to speak.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use scrivener_core::{GateChoice, HumanInteraction, InteractionError, Turn, TurnKind};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::{broadcast, Mutex};

type Input = Lines<Box<dyn AsyncBufRead + Unpin + Send>>;

pub struct TerminalHuman {
    input: Mutex<Input>,
    feed: Mutex<Option<broadcast::Receiver<Turn>>>,
}

impl TerminalHuman {
    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    pub fn from_reader(reader: impl AsyncBufRead + Unpin + Send + 'static) -> Self {
        let reader: Box<dyn AsyncBufRead + Unpin + Send> = Box::new(reader);
        Self {
            input: Mutex::new(reader.lines()),
            feed: Mutex::new(None),
        }
    }

    /// Follow a session's turn stream.
    pub async fn attach(&self, feed: broadcast::Receiver<Turn>) {
        *self.feed.lock().await = Some(feed);
    }

    /// Print every turn published since the last call.
    pub async fn flush_turns(&self) {
        let mut feed = self.feed.lock().await;
        let Some(rx) = feed.as_mut() else {
            return;
        };
        loop {
            match rx.try_recv() {
                Ok(turn) => println!("{}", render_turn(&turn)),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    println!("({missed} turn(s) not shown, see `scrivener transcript`)")
                }
                Err(_) => break,
            }
        }
    }

    /// Print `prompt` and read one line. `None` at end of input.
    pub async fn read_line(&self, prompt: &str) -> std::io::Result<Option<String>> {
        print!("{prompt}");
        std::io::stdout().flush()?;
        self.input.lock().await.next_line().await
    }

    async fn require_line(&self, prompt: &str) -> Result<String, InteractionError> {
        self.read_line(prompt)
            .await
            .map_err(|e| InteractionError(e.to_string()))?
            .ok_or_else(|| InteractionError("input closed".to_string()))
    }
}

#[async_trait]
impl HumanInteraction for TerminalHuman {
    async fn present_choices(
        &self,
        prompt: &str,
        choices: &[GateChoice],
    ) -> Result<Option<GateChoice>, InteractionError> {
        self.flush_turns().await;
        println!("{prompt}");
        for (i, choice) in choices.iter().enumerate() {
            println!("  {}) {}", i + 1, choice.label());
        }

        loop {
            let line = self.require_line("> ").await?;
            match parse_choice(&line, choices) {
                Some(choice) => return Ok(Some(choice)),
                None => println!("Pick 1-{}.", choices.len()),
            }
        }
    }

    async fn request_freeform(
        &self,
        prompt: &str,
        _timeout: Duration,
    ) -> Result<Option<String>, InteractionError> {
        self.flush_turns().await;
        println!("{prompt}");
        self.require_line("> ").await.map(Some)
    }
}

/// Match operator input against the offered choices.
///
/// An empty line continues, a number picks by position, anything else is
/// parsed as a choice name.
pub fn parse_choice(input: &str, choices: &[GateChoice]) -> Option<GateChoice> {
    let input = input.trim();
    if input.is_empty() {
        return choices.iter().copied().find(|c| *c == GateChoice::Continue);
    }
    if let Ok(n) = input.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| choices.get(i)).copied();
    }
    input
        .parse::<GateChoice>()
        .ok()
        .filter(|choice| choices.contains(choice))
}

/// One turn as printed in the terminal.
pub fn render_turn(turn: &Turn) -> String {
    let content = match (turn.kind, turn.content.is_empty()) {
        (TurnKind::HumanReply, true) => "(continue)",
        (_, true) => "(empty)",
        (_, false) => turn.content.as_str(),
    };
    format!(
        "[{}] {} sending message to {}:\n\n{}\n\n{}",
        turn.seq,
        turn.speaker,
        turn.recipient,
        content,
        "-".repeat(72)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrivener_core::Recipient;

    fn human(input: &'static str) -> TerminalHuman {
        TerminalHuman::from_reader(BufReader::new(input.as_bytes()))
    }

    #[test]
    fn test_parse_choice_by_position_name_and_blank() {
        let all = GateChoice::ALL;
        assert_eq!(parse_choice("", &all), Some(GateChoice::Continue));
        assert_eq!(parse_choice("2", &all), Some(GateChoice::Feedback));
        assert_eq!(parse_choice(" exit ", &all), Some(GateChoice::Exit));
        assert_eq!(parse_choice("4", &all), None);
        assert_eq!(parse_choice("0", &all), None);
        assert_eq!(parse_choice("later", &all), None);
    }

    #[test]
    fn test_parse_choice_respects_offered_subset() {
        let offered = [GateChoice::Feedback, GateChoice::Exit];
        assert_eq!(parse_choice("1", &offered), Some(GateChoice::Feedback));
        assert_eq!(parse_choice("continue", &offered), None);
        assert_eq!(parse_choice("", &offered), None);
    }

    #[test]
    fn test_render_turn_marks_empty_human_reply() {
        let turn = Turn::new(
            3,
            "User_Proxy",
            Recipient::Agent("Proof_Reader".into()),
            TurnKind::HumanReply,
            "",
        );
        let text = render_turn(&turn);
        assert!(text.starts_with("[3] User_Proxy sending message to Proof_Reader:"));
        assert!(text.contains("(continue)"));
    }

    #[tokio::test]
    async fn test_present_choices_skips_invalid_lines() {
        let human = human("maybe\n3\n");
        let choice = human
            .present_choices("Continue?", &GateChoice::ALL)
            .await
            .unwrap();
        assert_eq!(choice, Some(GateChoice::Exit));
    }

    #[tokio::test]
    async fn test_freeform_returns_line() {
        let human = human("shorter intro\n");
        let text = human
            .request_freeform("Feedback:", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(text.as_deref(), Some("shorter intro"));
    }

    #[tokio::test]
    async fn test_end_of_input_is_unavailable() {
        let human = human("");
        let err = human
            .present_choices("Continue?", &GateChoice::ALL)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("input closed"));
    }

    #[tokio::test]
    async fn test_flush_turns_drains_feed() {
        let human = human("");
        let (tx, rx) = broadcast::channel(4);
        human.attach(rx).await;
        tx.send(Turn::new(0, "User_Proxy", Recipient::Broadcast, TurnKind::Instruction, "go"))
            .unwrap();
        human.flush_turns().await;
        assert!(human.feed.lock().await.as_mut().unwrap().try_recv().is_err());
    }
}
