//! Operator I/O

use std::io::{self, BufRead, Write};

/// Line-oriented operator interaction
pub trait Prompter {
    /// Show a question and read one answer line (without the line ending)
    fn ask(&mut self, question: &str) -> io::Result<String>;

    /// Show a line of output
    fn say(&mut self, line: &str) -> io::Result<()>;
}

/// Prompter over any reader/writer pair, stdin/stdout by default
pub struct StdioPrompter<R, W> {
    input: R,
    output: W,
}

impl StdioPrompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompter bound to the process terminal
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> StdioPrompter<R, W> {
    /// Create a prompter over the given streams
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Recover the output stream
    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Prompter for StdioPrompter<R, W> {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn say(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.output, "{}", line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_answers_in_order() {
        let mut prompter = StdioPrompter::new("first\r\nsecond\n".as_bytes(), Vec::new());
        assert_eq!(prompter.ask("Q1: ").unwrap(), "first");
        assert_eq!(prompter.ask("Q2: ").unwrap(), "second");
        assert!(prompter.ask("Q3: ").is_err());

        prompter.say("done").unwrap();
        let output = String::from_utf8(prompter.into_output()).unwrap();
        assert_eq!(output, "Q1: Q2: Q3: done\n");
    }

    struct ClosedOutput;

    impl Write for ClosedOutput {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_output_failure_is_reported() {
        let mut prompter = StdioPrompter::new(io::empty(), ClosedOutput);
        let err = prompter.say("lost").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(prompter.ask("Q: ").is_err());
    }
}
