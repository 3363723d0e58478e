use std::io::IsTerminal;

/// Print a status line to stderr, only when attached to a terminal.
/// Keeps stdout clean for the JSON response.
pub fn status(message: &str) {
    if std::io::stderr().is_terminal() {
        eprintln!("{}", message);
    }
}
