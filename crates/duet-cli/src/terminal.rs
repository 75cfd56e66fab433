//! Terminal-side adapters: notices and streamed rendering.

use std::io::Write;
use std::sync::Mutex;

use colored::Colorize;

use duet_core::notice::Notifier;
use duet_providers::RenderTarget;

/// Prints notices to stderr.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
    }
}

/// Streams an answer to stdout.
///
/// Each render carries the whole answer so far; only the part not yet on
/// screen is written.
pub struct TerminalRenderTarget<W: Write + Send = std::io::Stdout> {
    out: Mutex<W>,
    shown: Mutex<String>,
}

impl TerminalRenderTarget {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalRenderTarget<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            shown: Mutex::new(String::new()),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> RenderTarget for TerminalRenderTarget<W> {
    fn clear(&self) {
        if let Ok(mut shown) = self.shown.lock() {
            shown.clear();
        }
    }

    fn render(&self, text: &str) {
        let (Ok(mut shown), Ok(mut out)) = (self.shown.lock(), self.out.lock()) else {
            return;
        };
        let fresh = match text.strip_prefix(shown.as_str()) {
            Some(suffix) => suffix,
            // The text was rewritten rather than extended: start over.
            None => {
                let _ = writeln!(out);
                text
            }
        };
        let _ = write!(out, "{fresh}");
        let _ = out.flush();
        shown.clear();
        shown.push_str(text);
    }
}
