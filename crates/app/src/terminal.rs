use std::io::{self, BufRead, IsTerminal, Write};

use beatcut_core::{Candidate, PreviewChoice, PreviewSurface};

/// Lists candidate versions on stderr and reads a one-based choice from stdin.
///
/// Empty input, `q`, end of input or a stdin that is not a terminal all count
/// as the surface being unavailable.
#[derive(Debug, Default)]
pub struct TerminalSurface;

impl TerminalSurface {
    fn prompt(candidates: &[Candidate]) -> io::Result<()> {
        let mut err = io::stderr().lock();
        writeln!(err)?;
        for candidate in candidates {
            writeln!(
                err,
                "  [{}] {} {:.2}s - {:.2}s",
                candidate.version + 1,
                candidate.source.display(),
                candidate.start,
                candidate.end
            )?;
        }
        write!(err, "version (1-{}, q to stop asking): ", candidates.len())?;
        err.flush()
    }
}

impl PreviewSurface for TerminalSurface {
    fn offer(&mut self, candidates: &[Candidate]) -> PreviewChoice {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return PreviewChoice::Unavailable;
        }
        if let Err(err) = Self::prompt(candidates) {
            tracing::warn!(%err, "cannot show preview prompt");
            return PreviewChoice::Unavailable;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => PreviewChoice::Unavailable,
            Ok(_) => parse_choice(&line),
        }
    }
}

fn parse_choice(line: &str) -> PreviewChoice {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("q") {
        return PreviewChoice::Unavailable;
    }
    match line.parse::<usize>() {
        // 0 maps past the end so the selector offers again
        Ok(choice) => PreviewChoice::Chosen(choice.checked_sub(1).unwrap_or(usize::MAX)),
        Err(_) => PreviewChoice::Chosen(usize::MAX),
    }
}
