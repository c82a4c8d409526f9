//! Line editing for the chat REPL and masked password prompts

use std::borrow::Cow;

use anyhow::bail;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::history::DefaultHistory;
use rustyline::{ColorMode, Completer, Editor, Helper, Hinter, Validator};

/// Hides typed characters while `masking` is set
#[derive(Default, Completer, Helper, Hinter, Validator)]
struct MaskingHelper {
    masking: bool,
}

impl Highlighter for MaskingHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if self.masking {
            Cow::Owned("*".repeat(line.chars().count()))
        } else {
            Cow::Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        self.masking
    }
}

/// Interactive terminal input.
///
/// When stdin is not a terminal, lines are read as-is, which is what
/// scripted use and the integration tests rely on.
pub struct Terminal {
    editor: Editor<MaskingHelper, DefaultHistory>,
}

impl Terminal {
    pub fn new() -> anyhow::Result<Self> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(MaskingHelper::default()));
        Ok(Self { editor })
    }

    /// Read one line; `None` on end of input or Ctrl-C
    pub fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn remember(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
    }

    /// Read a password without echoing it
    pub fn read_password(&mut self, prompt: &str) -> anyhow::Result<String> {
        self.set_masking(true);
        let result = self.editor.readline(prompt);
        self.set_masking(false);

        match result {
            Ok(password) => Ok(password),
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                bail!("Password entry cancelled")
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set_masking(&mut self, on: bool) {
        if let Some(helper) = self.editor.helper_mut() {
            helper.masking = on;
        }
        // Highlighting is what hides the input, so it must run even without color support
        self.editor
            .set_color_mode(if on { ColorMode::Forced } else { ColorMode::Enabled });
    }
}
