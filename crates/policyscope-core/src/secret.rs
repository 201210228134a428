use secrecy::{ExposeSecret, SecretString};

use crate::error::{Result, RetrieverError};

/// Placeholder written wherever a secret would otherwise appear.
pub const REDACTED: &str = "[REDACTED]";

/// Maximum number of characters of a remote response body kept in errors.
pub const SNIPPET_LEN: usize = 200;

/// Where the client secret comes from.
///
/// The returned value lives only in memory for the duration of the run.
pub trait SecretSource {
    fn read_secret(&self, prompt: &str) -> Result<SecretString>;
}

/// Reads the secret from the controlling terminal with echo disabled.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl SecretSource for TerminalPrompt {
    fn read_secret(&self, prompt: &str) -> Result<SecretString> {
        // rpassword reads from the tty directly; without one this fails
        // instead of silently consuming piped stdin.
        let value = rpassword::prompt_password(prompt).map_err(|e| prompt_error(&e))?;

        Ok(SecretString::from(value))
    }
}

fn prompt_error(e: &std::io::Error) -> RetrieverError {
    RetrieverError::ConfigError(format!(
        "Cannot read client secret (no interactive terminal?): {}",
        e
    ))
}

/// Mode of the controlling terminal, captured before prompting.
///
/// A prompt abandoned mid-read never gets to switch echo back on, so the
/// caller restores the captured mode itself.
pub struct TerminalState {
    #[cfg(unix)]
    saved: Option<(std::fs::File, nix::sys::termios::Termios)>,
}

impl TerminalState {
    /// Snapshot `/dev/tty`. Without a controlling terminal nothing is kept.
    pub fn capture() -> Self {
        TerminalState {
            #[cfg(unix)]
            saved: std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .open("/dev/tty")
                .ok()
                .and_then(|tty| {
                    let mode = nix::sys::termios::tcgetattr(&tty).ok()?;
                    Some((tty, mode))
                }),
        }
    }

    pub fn is_captured(&self) -> bool {
        #[cfg(unix)]
        let captured = self.saved.is_some();
        #[cfg(not(unix))]
        let captured = false;
        captured
    }

    /// Put the captured mode back. A no-op when nothing was captured.
    pub fn restore(&self) {
        #[cfg(unix)]
        if let Some((tty, mode)) = &self.saved {
            use nix::sys::termios::{tcsetattr, SetArg};

            if let Err(e) = tcsetattr(tty, SetArg::TCSANOW, mode) {
                tracing::warn!("Could not restore terminal mode: {}", e);
            }
        }
    }
}

/// Replace every occurrence of `secret` in `text` with [`REDACTED`].
pub fn redact(text: &str, secret: &SecretString) -> String {
    let exposed = secret.expose_secret();
    if exposed.is_empty() {
        return text.to_string();
    }
    text.replace(exposed, REDACTED)
}

/// Trim a response body down to something fit for a one-line error.
pub fn snippet(body: &str) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_LEN {
        return flat;
    }
    let mut cut: String = flat.chars().take(SNIPPET_LEN).collect();
    cut.push_str("...");
    cut
}
