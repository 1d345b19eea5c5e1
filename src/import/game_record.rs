use std::mem;
use nom::{IResult, Parser};
use nom::branch::alt;
use nom::bytes::complete::{escaped_transform, is_not, tag, take, take_till, take_until, take_while, take_while1};
use nom::character::complete::{char, digit1, space0};
use nom::combinator::{map, opt, recognize, rest, value};
use nom::sequence::{delimited, pair, preceded, terminated};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    Unknown,
}

/// One game as written: tag pairs and main-line SAN moves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameRecord {
    pub tags: Vec<(String, String)>,
    pub moves: Vec<String>,
    pub result: Option<GameResult>,
}

impl GameRecord {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Tag(&'a str, String),
    Comment,
    VariationStart,
    VariationEnd,
    Nag,
    MoveNumber,
    Result(GameResult),
    San(&'a str),
}

/// Quoted tag value with `\"` and `\\` escapes
fn tag_value(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\\", tag("\\")), value("\"", tag("\"")), take(1usize))),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )
    .parse(input)
}

fn tag_pair(input: &str) -> IResult<&str, Token<'_>> {
    map(
        delimited(
            pair(char('['), space0),
            pair(
                terminated(take_while1(|c: char| c.is_alphanumeric() || c == '_'), space0),
                tag_value,
            ),
            pair(space0, char(']')),
        ),
        |(name, value)| Token::Tag(name, value),
    )
    .parse(input)
}

fn comment(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        value(Token::Comment, delimited(char('{'), take_until("}"), char('}'))),
        // unterminated brace comment swallows the rest of the input
        value(Token::Comment, preceded(char('{'), rest)),
        value(Token::Comment, preceded(char(';'), take_till(|c: char| c == '\n'))),
        value(Token::Comment, preceded(char('%'), take_till(|c: char| c == '\n'))),
    ))
    .parse(input)
}

fn variation(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        value(Token::VariationStart, char('(')),
        value(Token::VariationEnd, char(')')),
    ))
    .parse(input)
}

fn nag(input: &str) -> IResult<&str, Token<'_>> {
    value(Token::Nag, recognize(pair(char('$'), digit1))).parse(input)
}

/// Castling written with zeros, which would otherwise read as a move number
fn zero_castling(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        value(Token::San("O-O-O"), tag("0-0-0")),
        value(Token::San("O-O"), tag("0-0")),
    ))
    .parse(input)
}

fn result(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        value(Token::Result(GameResult::WhiteWins), tag("1-0")),
        value(Token::Result(GameResult::BlackWins), tag("0-1")),
        value(Token::Result(GameResult::Draw), tag("1/2-1/2")),
        value(Token::Result(GameResult::Unknown), tag("*")),
    ))
    .parse(input)
}

fn move_number(input: &str) -> IResult<&str, Token<'_>> {
    value(Token::MoveNumber, terminated(digit1, take_while(|c: char| c == '.'))).parse(input)
}

fn san(input: &str) -> IResult<&str, Token<'_>> {
    map(
        take_while1(|c: char| !c.is_whitespace() && !"{}()[];$".contains(c)),
        Token::San,
    )
    .parse(input)
}

fn next_token(input: &str) -> IResult<&str, Token<'_>> {
    alt((tag_pair, comment, variation, nag, zero_castling, result, move_number, san)).parse(input)
}

/// Splits PGN-style text into games. Variations, comments and NAGs are
/// skipped; a game ends at its result token or where the next tag section
/// starts.
pub fn parse_games(text: &str) -> Vec<GameRecord> {
    let mut games = Vec::new();
    let mut current = GameRecord::default();
    let mut variation_depth = 0usize;
    let mut input = text;

    loop {
        input = input.trim_start();
        if input.is_empty() {
            break;
        }

        let (remaining, token) = match next_token(input) {
            Ok(parsed) => parsed,
            Err(_) => {
                // stray character, e.g. a lone ']'
                let mut chars = input.chars();
                chars.next();
                input = chars.as_str();
                continue;
            }
        };
        input = remaining;

        match token {
            Token::Tag(name, value) => {
                if !current.moves.is_empty() {
                    games.push(mem::take(&mut current));
                    variation_depth = 0;
                }
                current.tags.push((name.to_string(), value));
            }
            Token::VariationStart => variation_depth += 1,
            Token::VariationEnd => variation_depth = variation_depth.saturating_sub(1),
            Token::San(text) if variation_depth == 0 => current.moves.push(text.to_string()),
            Token::Result(result) if variation_depth == 0 => {
                current.result = Some(result);
                games.push(mem::take(&mut current));
            }
            _ => {}
        }
    }

    if !current.moves.is_empty() {
        games.push(current);
    }
    games
}
