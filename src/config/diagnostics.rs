use super::LoadError;
use std::fmt;

/// A load error tied to a place in a configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    /// 1-based
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: error: {}", self.file, self.line, self.message)
    }
}

/// State of one configuration file parse: the text being read and the
/// errors found so far.
#[derive(Debug)]
pub struct ParseContext<'a> {
    filename: &'a str,
    content: &'a str,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ParseContext<'a> {
    pub fn new(filename: &'a str, content: &'a str) -> Self {
        Self {
            filename,
            content,
            diagnostics: Vec::new(),
        }
    }

    /// Line of a byte offset, 1-based
    pub fn line_of(&self, offset: usize) -> usize {
        let end = offset.min(self.content.len());
        self.content.as_bytes()[..end]
            .iter()
            .filter(|&&b| b == b'\n')
            .count()
            + 1
    }

    /// Record an error at `offset`, or at the end of the file if the
    /// error has no place of its own.
    pub fn error_at(&mut self, offset: Option<usize>, message: impl Into<String>) {
        let line = self.line_of(offset.unwrap_or(self.content.len()));
        self.diagnostics.push(Diagnostic {
            file: self.filename.to_string(),
            line,
            message: message.into(),
        });
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// `Ok` if nothing went wrong, the collected errors otherwise
    pub fn finish(self) -> Result<(), LoadError> {
        if self.diagnostics.is_empty() {
            return Ok(());
        }
        Err(self.into_error())
    }

    pub fn into_error(self) -> LoadError {
        LoadError::Invalid {
            file: self.filename.to_string(),
            diagnostics: self.diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_of() {
        let ctx = ParseContext::new("nsd.toml", "a\nb\n\nc");
        assert_eq!(ctx.line_of(0), 1);
        assert_eq!(ctx.line_of(2), 2);
        assert_eq!(ctx.line_of(5), 4);
        assert_eq!(ctx.line_of(100), 4);
    }

    #[test]
    fn test_finish() {
        let mut ctx = ParseContext::new("nsd.toml", "x = 1\n");
        ctx.error_at(Some(0), "bad x");
        ctx.error_at(None, "last zone has no name");
        assert_eq!(ctx.error_count(), 2);
        assert_eq!(ctx.diagnostics()[1].line, 2);

        let err = ctx.finish().unwrap_err();
        assert_eq!(
            err.to_string(),
            "read nsd.toml failed: 2 errors in configuration file"
        );
        assert_eq!(err.diagnostics()[0].to_string(), "nsd.toml:1: error: bad x");
    }
}
