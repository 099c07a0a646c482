use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// Unquoted text, not yet analyzed
    Word(String),
    /// Body of a quoted string
    Phrase(String),
    /// `name:` qualifier
    Field(String),
    And,
    Or,
    Not,
    /// `+` prefix (required)
    Plus,
    /// `-` prefix (excluded)
    Minus,
    LeftParen,
    RightParen,
    Eof,
}

pub(crate) struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self { input: input.chars().collect(), position: 0 }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        let Some(ch) = self.peek() else {
            return Ok(Token::Eof);
        };
        match ch {
            '(' => {
                self.position += 1;
                Ok(Token::LeftParen)
            }
            ')' => {
                self.position += 1;
                Ok(Token::RightParen)
            }
            '"' => {
                self.position += 1;
                self.read_quoted()
            }
            '+' | '-' if self.prefixes_operand() => {
                self.position += 1;
                Ok(if ch == '+' { Token::Plus } else { Token::Minus })
            }
            _ => self.read_word(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.position += 1;
        }
    }

    /// `+`/`-` act as operators only when glued to what follows.
    fn prefixes_operand(&self) -> bool {
        self.input
            .get(self.position + 1)
            .is_some_and(|c| !c.is_whitespace() && *c != ')')
    }

    fn read_quoted(&mut self) -> Result<Token> {
        let start = self.position;
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            self.position += 1;
            match ch {
                '"' => return Ok(Token::Phrase(text)),
                '\\' => {
                    if let Some(escaped) = self.peek() {
                        text.push(escaped);
                        self.position += 1;
                    }
                }
                _ => text.push(ch),
            }
        }
        Err(EngineError::QuerySyntax(format!(
            "unbalanced quote starting at offset {}",
            start.saturating_sub(1)
        )))
    }

    fn read_word(&mut self) -> Result<Token> {
        let mut word = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || matches!(ch, '(' | ')' | '"') {
                break;
            }
            if ch == ':' && !word.is_empty() && word.chars().all(|c| c.is_ascii_alphabetic()) {
                self.position += 1;
                return Ok(Token::Field(word));
            }
            if ch == '\\' {
                self.position += 1;
                if let Some(escaped) = self.peek() {
                    word.push(escaped);
                    self.position += 1;
                }
                continue;
            }
            word.push(ch);
            self.position += 1;
        }
        Ok(match word.as_str() {
            "AND" | "&&" => Token::And,
            "OR" | "||" => Token::Or,
            "NOT" => Token::Not,
            _ => Token::Word(word),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let t = lexer.next_token().unwrap();
            if t == Token::Eof {
                break;
            }
            out.push(t);
        }
        out
    }

    #[test]
    fn operators_and_words() {
        assert_eq!(
            lex("fox AND (dog || -cat) NOT +e-mail and"),
            vec![
                Token::Word("fox".into()),
                Token::And,
                Token::LeftParen,
                Token::Word("dog".into()),
                Token::Or,
                Token::Minus,
                Token::Word("cat".into()),
                Token::RightParen,
                Token::Not,
                Token::Plus,
                Token::Word("e-mail".into()),
                Token::Word("and".into()),
            ]
        );
    }

    #[test]
    fn phrases_and_fields() {
        assert_eq!(
            lex(r#"content:"quick \"brown\" fox" 12:30"#),
            vec![
                Token::Field("content".into()),
                Token::Phrase("quick \"brown\" fox".into()),
                Token::Word("12:30".into()),
            ]
        );
        assert!(Lexer::new("\"open").next_token().is_err());
    }

    #[test]
    fn lone_dash_is_a_word() {
        assert_eq!(lex("a - b"), vec![Token::Word("a".into()), Token::Word("-".into()), Token::Word("b".into())]);
    }
}
