//! Lexer for the reference expression language using logos

use logos::Logos;

/// Byte range in expression text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Keywords
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Punctuation
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unquote(lex.slice()))]
    String(String),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Integer(i64),

    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),
}

/// Strip the surrounding quotes and resolve backslash escapes
fn unquote(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Tokenize an expression; on failure, returns the span of the first bad token
pub fn tokenize(input: &str) -> Result<Vec<(Token, Span)>, Span> {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| match tok {
            Ok(t) => Ok((t, span)),
            Err(()) => Err(span),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_call_with_arguments() {
        assert_eq!(
            tokens(r#"repeat(items, "x", 3)"#),
            vec![
                Token::Ident("repeat".to_string()),
                Token::ParenOpen,
                Token::Ident("items".to_string()),
                Token::Comma,
                Token::String("x".to_string()),
                Token::Comma,
                Token::Integer(3),
                Token::ParenClose,
            ]
        );
    }

    #[test]
    fn test_member_path_and_float() {
        assert_eq!(
            tokens("a.b 1.5"),
            vec![
                Token::Ident("a".to_string()),
                Token::Dot,
                Token::Ident("b".to_string()),
                Token::Float(1.5),
            ]
        );
    }

    #[test]
    fn test_keywords_vs_identifiers() {
        assert_eq!(
            tokens("true false null truthy"),
            vec![
                Token::True,
                Token::False,
                Token::Null,
                Token::Ident("truthy".to_string()),
            ]
        );
    }

    #[test]
    fn test_string_escapes_and_single_quotes() {
        assert_eq!(
            tokens(r#"'it\'s' "a\"b\n""#),
            vec![
                Token::String("it's".to_string()),
                Token::String("a\"b\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_character_reports_span() {
        assert_eq!(tokenize("a + b"), Err(2..3));
    }
}
