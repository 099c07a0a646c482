//! Recursive descent parser for search strings.
//!
//! ```text
//! query    := or_expr EOF
//! or_expr  := and_expr ( OR and_expr )*
//! and_expr := unary ( AND? unary )*
//! unary    := ( NOT | '-' ) primary | '+'? primary
//! primary  := FIELD primary | '(' or_expr ')' | PHRASE | WORD
//! ```
//!
//! Words and phrases go through the same analyzer used at index time. A word
//! that analyzes to several terms (`e-mail`) becomes a phrase; one that
//! analyzes to nothing is dropped.

use super::lexer::{Lexer, Token};
use super::Query;
use crate::error::{EngineError, Result};
use crate::tokenizer::terms;

const CONTENT_FIELD: &str = "content";
const CREATED_DATE_FIELD: &str = "createddate";

/// Parse a search string. A blank string matches every document.
pub fn parse(input: &str) -> Result<Query> {
    if input.trim().is_empty() {
        return Ok(Query::MatchAll);
    }
    let mut parser = Parser::new(input)?;
    let query = parser.parse_or_expr()?;
    match parser.current {
        Token::Eof => {}
        Token::RightParen => return Err(syntax("unbalanced parenthesis")),
        ref other => return Err(syntax(format!("unexpected {other:?}"))),
    }
    query.ok_or_else(|| syntax(format!("{input:?} contains no searchable terms")))
}

fn syntax(msg: impl Into<String>) -> EngineError {
    EngineError::QuerySyntax(msg.into())
}

/// Zero terms drops the clause, one is a term, more is a phrase.
fn analyze(text: &str) -> Option<Query> {
    let mut ts = terms(text);
    match ts.len() {
        0 => None,
        1 => ts.pop().map(Query::Term),
        _ => Some(Query::Phrase(ts)),
    }
}

struct Parser {
    lexer: Lexer,
    current: Token,
}

impl Parser {
    fn new(input: &str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn starts_primary(&self) -> bool {
        matches!(
            self.current,
            Token::Word(_) | Token::Phrase(_) | Token::Field(_) | Token::LeftParen
        )
    }

    fn starts_unary(&self) -> bool {
        self.starts_primary() || matches!(self.current, Token::Not | Token::Plus | Token::Minus)
    }

    fn expect_unary(&self, after: &str) -> Result<()> {
        if self.starts_unary() {
            Ok(())
        } else {
            Err(syntax(format!("expected a clause {after}, found {:?}", self.current)))
        }
    }

    fn parse_or_expr(&mut self) -> Result<Option<Query>> {
        let mut clauses: Vec<Query> = self.parse_and_expr()?.into_iter().collect();
        while self.current == Token::Or {
            self.advance()?;
            clauses.extend(self.parse_and_expr()?);
        }
        Ok(match clauses.len() {
            0 => None,
            1 => clauses.pop(),
            _ => Some(Query::or(clauses)),
        })
    }

    fn parse_and_expr(&mut self) -> Result<Option<Query>> {
        self.expect_unary("here")?;
        let mut must = Vec::new();
        let mut must_not = Vec::new();
        loop {
            let (negated, clause) = self.parse_unary()?;
            match clause {
                Some(c) if negated => must_not.push(c),
                Some(c) => must.push(c),
                None => {}
            }
            if self.current == Token::And {
                self.advance()?;
                self.expect_unary("after AND")?;
            } else if !self.starts_unary() {
                break;
            }
        }
        Ok(match (must.len(), must_not.len()) {
            (0, 0) => None,
            (1, 0) => must.pop(),
            _ => Some(Query::Bool { must, should: vec![], must_not }),
        })
    }

    fn parse_unary(&mut self) -> Result<(bool, Option<Query>)> {
        let negated = match self.current {
            Token::Not | Token::Minus => {
                self.advance()?;
                true
            }
            Token::Plus => {
                self.advance()?;
                false
            }
            _ => false,
        };
        if !self.starts_primary() {
            return Err(syntax(format!("expected a term, found {:?}", self.current)));
        }
        Ok((negated, self.parse_primary()?))
    }

    fn parse_primary(&mut self) -> Result<Option<Query>> {
        match std::mem::replace(&mut self.current, Token::Eof) {
            Token::Word(text) | Token::Phrase(text) => {
                self.advance()?;
                Ok(analyze(&text))
            }
            Token::Field(field) => {
                let lower = field.to_ascii_lowercase();
                if lower == CREATED_DATE_FIELD {
                    return Err(syntax("createdDate is filtered by date range, not text"));
                }
                if lower != CONTENT_FIELD {
                    return Err(syntax(format!("unknown field {field:?}")));
                }
                self.advance()?;
                if !self.starts_primary() {
                    return Err(syntax(format!("field {field:?} has no value")));
                }
                self.parse_primary()
            }
            Token::LeftParen => {
                self.advance()?;
                let inner = self.parse_or_expr()?;
                if self.current != Token::RightParen {
                    return Err(syntax("unbalanced parenthesis"));
                }
                self.advance()?;
                Ok(inner)
            }
            other => Err(syntax(format!("unexpected {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_matches_all() {
        assert_eq!(parse("").unwrap(), Query::MatchAll);
        assert_eq!(parse(" \t\n").unwrap(), Query::MatchAll);
    }

    #[test]
    fn single_term_is_normalized() {
        assert_eq!(parse("Fox!").unwrap(), Query::term("fox"));
        assert_eq!(parse("content:FOX").unwrap(), Query::term("fox"));
    }

    #[test]
    fn adjacency_is_conjunction() {
        assert_eq!(
            parse("quick brown").unwrap(),
            Query::and(vec![Query::term("quick"), Query::term("brown")])
        );
        assert_eq!(
            parse("quick AND brown").unwrap(),
            Query::and(vec![Query::term("quick"), Query::term("brown")])
        );
    }

    #[test]
    fn or_binds_looser_than_and() {
        assert_eq!(
            parse("a b OR c").unwrap(),
            Query::or(vec![Query::and(vec![Query::term("a"), Query::term("b")]), Query::term("c")])
        );
        assert_eq!(
            parse("a (b OR c)").unwrap(),
            Query::and(vec![Query::term("a"), Query::or(vec![Query::term("b"), Query::term("c")])])
        );
    }

    #[test]
    fn negation_and_required() {
        assert_eq!(
            parse("+fox -dog").unwrap(),
            Query::Bool { must: vec![Query::term("fox")], should: vec![], must_not: vec![Query::term("dog")] }
        );
        assert_eq!(parse("NOT dog").unwrap(), Query::not(vec![Query::term("dog")]));
    }

    #[test]
    fn phrases() {
        assert_eq!(parse("\"Quick  Brown\"").unwrap(), Query::phrase(["quick", "brown"]));
        assert_eq!(parse("e-mail").unwrap(), Query::phrase(["e", "mail"]));
        assert_eq!(parse("\"fox\"").unwrap(), Query::term("fox"));
    }

    #[test]
    fn keeps_stopwords() {
        assert_eq!(parse("the").unwrap(), Query::term("the"));
    }

    #[test]
    fn malformed_input_is_rejected() {
        for bad in [
            "\"quick brown",
            "(fox",
            "fox)",
            "fox AND",
            "OR fox",
            "NOT",
            "()",
            "?!",
            "createdDate:20240101",
            "title:fox",
            "content:",
        ] {
            assert!(matches!(parse(bad), Err(EngineError::QuerySyntax(_))), "{bad}");
        }
    }
}
