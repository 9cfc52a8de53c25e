//! Line assembly: raw terminal lines in, logical messages out.
//!
//! A line starting with a backtick opens a multi-line block; the block closes
//! on the first line ending with a backtick. Delimiters are stripped and the
//! collected lines are joined with newlines.

const DELIMITER: char = '`';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Collecting,
}

/// A complete logical message and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembled {
    /// A single line typed outside a block.
    Line(String),
    /// The joined body of a backtick block.
    Block(String),
}

#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: Vec<String>,
    mode: Mode,
}

impl LineAssembler {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Lines buffered in an unterminated block.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one raw line. Returns a logical message once one is complete.
    ///
    /// Blank logical messages are dropped here and never reach the caller.
    pub fn push(&mut self, line: &str) -> Option<Assembled> {
        let message = match self.mode {
            Mode::Normal => match line.strip_prefix(DELIMITER) {
                // "`text`" on one line also lands here and opens a block;
                // the trailing backtick stays in the buffer as typed.
                Some(rest) => {
                    self.buffer.push(rest.to_string());
                    self.mode = Mode::Collecting;
                    return None;
                }
                None => Assembled::Line(line.to_string()),
            },
            Mode::Collecting => match line.strip_suffix(DELIMITER) {
                Some(rest) => {
                    self.buffer.push(rest.to_string());
                    self.mode = Mode::Normal;
                    let joined = self.buffer.join("\n");
                    self.buffer.clear();
                    Assembled::Block(joined)
                }
                None => {
                    self.buffer.push(line.to_string());
                    return None;
                }
            },
        };

        let (Assembled::Line(text) | Assembled::Block(text)) = &message;
        if text.trim().is_empty() {
            tracing::debug!("discarding blank message");
            return None;
        }
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(lines: &[&str]) -> Vec<String> {
        let mut asm = LineAssembler::default();
        lines
            .iter()
            .filter_map(|l| asm.push(l))
            .map(|m| match m {
                Assembled::Line(t) | Assembled::Block(t) => t,
            })
            .collect()
    }

    fn block(text: &str) -> Option<Assembled> {
        Some(Assembled::Block(text.to_string()))
    }

    #[test]
    fn test_plain_line_is_emitted_immediately() {
        let mut asm = LineAssembler::default();
        assert_eq!(asm.push("hello"), Some(Assembled::Line("hello".to_string())));
        assert_eq!(asm.mode(), Mode::Normal);
    }

    #[test]
    fn test_block_joins_with_newlines() {
        assert_eq!(feed(&["`a", "b", "c`"]), vec!["a\nb\nc"]);
    }

    #[test]
    fn test_block_state_transitions() {
        let mut asm = LineAssembler::default();
        assert_eq!(asm.push("`line1"), None);
        assert_eq!(asm.mode(), Mode::Collecting);
        assert_eq!(asm.push("middle"), None);
        assert_eq!(asm.mode(), Mode::Collecting);
        assert_eq!(asm.push("line2`"), block("line1\nmiddle\nline2"));
        assert_eq!(asm.mode(), Mode::Normal);
        assert!(asm.buffer.is_empty());
    }

    #[test]
    fn test_one_message_per_block() {
        let out = feed(&["`one", "two`", "plain", "`three", "", "four`"]);
        assert_eq!(out, vec!["one\ntwo", "plain", "three\n\nfour"]);
    }

    #[test]
    fn test_single_line_with_both_delimiters_opens_block() {
        let mut asm = LineAssembler::default();
        assert_eq!(asm.push("`quoted`"), None);
        assert_eq!(asm.mode(), Mode::Collecting);
        assert_eq!(asm.push("end`"), block("quoted`\nend"));
    }

    #[test]
    fn test_command_text_inside_block_stays_a_block() {
        let mut asm = LineAssembler::default();
        assert_eq!(asm.push("`/quit"), None);
        assert_eq!(asm.pending(), 1);
        assert_eq!(asm.push("`"), block("/quit\n"));
        assert_eq!(asm.pending(), 0);
    }

    #[test]
    fn test_lone_backtick_opens_and_closes() {
        assert_eq!(feed(&["`", "body", "`"]), vec!["\nbody\n"]);
    }

    #[test]
    fn test_blank_messages_are_discarded() {
        assert!(feed(&["", "   ", "\t"]).is_empty());
        // an empty block is blank too
        assert!(feed(&["`", "`"]).is_empty());
    }

    #[test]
    fn test_collecting_keeps_inner_lines_raw() {
        // a line starting with a backtick inside a block is just content
        assert_eq!(feed(&["`fn main() {", "`x", "}`"]), vec!["fn main() {\n`x\n}"]);
    }
}
