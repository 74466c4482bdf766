use crate::error::{Result, ScriptError};

/// Longest token the reader accepts before treating the script as corrupt.
pub const MAX_TOKEN_LEN: usize = 8192;

/// Whitespace-delimited reader over an owned copy of the script text.
///
/// Quoted tokens run to the next unpaired `"`; a doubled `""` inside the
/// quotes yields a literal quote. The quotes themselves are not part of the
/// returned token.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    script: Vec<u8>,
    cursor: usize,
    begin: usize,
    token: String,
}

impl Tokenizer {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into().into_bytes(),
            cursor: 0,
            begin: 0,
            token: String::new(),
        }
    }

    pub fn at_end(&self) -> bool {
        self.cursor >= self.script.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Offset of the first executable token (past any OnLoad block).
    pub fn script_begin(&self) -> usize {
        self.begin
    }

    pub fn mark_script_begin(&mut self) {
        self.begin = self.cursor;
    }

    pub fn rewind(&mut self) {
        self.cursor = self.begin;
    }

    pub fn rewind_to_start(&mut self) {
        self.cursor = 0;
    }

    /// Reads the next token, returning `None` once the script is exhausted.
    pub fn next_token(&mut self) -> Result<Option<&str>> {
        while !self.at_end() && self.script[self.cursor].is_ascii_whitespace() {
            self.cursor += 1;
        }
        if self.at_end() {
            return Ok(None);
        }

        let mut bytes = Vec::new();
        if self.script[self.cursor] == b'"' {
            self.cursor += 1;
            while !self.at_end() {
                let byte = self.script[self.cursor];
                if byte == b'"' {
                    self.cursor += 1;
                    if self.script.get(self.cursor) != Some(&b'"') {
                        break;
                    }
                }
                bytes.push(byte);
                self.cursor += 1;
                if bytes.len() > MAX_TOKEN_LEN {
                    return Err(ScriptError::TokenTooLong {
                        limit: MAX_TOKEN_LEN,
                    });
                }
            }
        } else {
            while !self.at_end() && !self.script[self.cursor].is_ascii_whitespace() {
                bytes.push(self.script[self.cursor]);
                self.cursor += 1;
                if bytes.len() > MAX_TOKEN_LEN {
                    return Err(ScriptError::TokenTooLong {
                        limit: MAX_TOKEN_LEN,
                    });
                }
            }
        }

        self.token = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Some(self.token.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(script: &str) -> Vec<String> {
        let mut tokenizer = Tokenizer::new(script);
        let mut out = Vec::new();
        while let Some(token) = tokenizer.next_token().expect("token") {
            out.push(token.to_string());
        }
        out
    }

    #[test]
    fn splits_on_whitespace_and_honours_quotes() {
        let tokens = collect("text  id\t0 0 \"Hello there\"\nwaittext id");
        assert_eq!(
            tokens,
            vec!["text", "id", "0", "0", "Hello there", "waittext", "id"]
        );
    }

    #[test]
    fn doubled_quote_is_literal() {
        let tokens = collect(r#"settext t "say ""hi"" now" end"#);
        assert_eq!(tokens, vec!["settext", "t", r#"say "hi" now"#, "end"]);
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        let tokens = collect("cmd \"echo open");
        assert_eq!(tokens, vec!["cmd", "echo open"]);
    }

    #[test]
    fn empty_quoted_token_is_a_token() {
        let tokens = collect("settext a \"\" b");
        assert_eq!(tokens, vec!["settext", "a", "", "b"]);
    }

    #[test]
    fn overlong_token_is_fatal() {
        let script = "x".repeat(MAX_TOKEN_LEN + 1);
        let mut tokenizer = Tokenizer::new(script);
        assert_eq!(
            tokenizer.next_token(),
            Err(ScriptError::TokenTooLong {
                limit: MAX_TOKEN_LEN
            })
        );
    }

    #[test]
    fn rewind_returns_to_script_begin() {
        let mut tokenizer = Tokenizer::new("skipped first second");
        tokenizer.next_token().expect("token");
        tokenizer.mark_script_begin();
        assert_eq!(tokenizer.next_token().expect("token"), Some("first"));
        assert_eq!(tokenizer.next_token().expect("token"), Some("second"));
        assert!(tokenizer.next_token().expect("token").is_none());
        assert!(tokenizer.at_end());
        tokenizer.rewind();
        assert_eq!(tokenizer.next_token().expect("token"), Some("first"));
    }
}
