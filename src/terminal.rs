//! Terminal implementations of the blocking UI callbacks.

use std::io::{self, BufRead, Cursor, Write};

use shimguard_core::gate::{ConfirmPrompt, LockPrompt, PromptChoice};
use shimguard_core::supervisor::{FaultChoice, FaultReporter, SessionFault};

/// Asks questions on `output` and reads answers from `input`.
///
/// End of input counts as the safe answer (cancel / accept) so a closed
/// stdin can never spin a retry loop.
pub struct TerminalDialog<R, W> {
    input: R,
    output: W,
}

/// Where answers come from, one line at a time.
///
/// Stdin is read without holding its lock between questions, so several
/// dialogs can share the terminal.
pub trait LineSource {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize>;
}

impl LineSource for io::Stdin {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        io::Stdin::read_line(self, buf)
    }
}

impl<T: AsRef<[u8]>> LineSource for Cursor<T> {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        BufRead::read_line(self, buf)
    }
}

impl TerminalDialog<io::Stdin, io::Stderr> {
    pub fn stdio() -> Self {
        TerminalDialog::new(io::stdin(), io::stderr())
    }
}

impl<R: LineSource, W: Write> TerminalDialog<R, W> {
    pub fn new(input: R, output: W) -> Self {
        TerminalDialog { input, output }
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        let _ = write!(self.output, "{} ", question);
        let _ = self.output.flush();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_lowercase()),
        }
    }
}

impl<R: LineSource, W: Write> ConfirmPrompt for TerminalDialog<R, W> {
    fn confirm(&mut self, prompt: &LockPrompt) -> PromptChoice {
        let _ = writeln!(self.output, "\n{}\n{}", prompt.title, prompt.message);
        let question = format!("[{}/{}]", prompt.retry_label, prompt.cancel_label);
        let retry = prompt.retry_label.to_lowercase();

        match self.ask(&question) {
            Some(answer) if answer == "r" || answer == retry => PromptChoice::Retry,
            _ => PromptChoice::Cancel,
        }
    }
}

impl<R: LineSource, W: Write> FaultReporter for TerminalDialog<R, W> {
    fn report(&mut self, fault: &SessionFault) -> FaultChoice {
        let _ = writeln!(self.output, "\nError: {}", fault);

        match self.ask("[Retry/Exit]") {
            Some(answer) if answer == "r" || answer == "retry" => FaultChoice::Retry,
            _ => FaultChoice::Accept,
        }
    }
}
