// Date pattern parser (day.js token syntax)

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{anychar, char},
    combinator::{all_consuming, map, value},
    multi::many0,
    sequence::delimited,
    IResult,
};

/// One element of a parsed date pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateToken {
    Year4,
    Year2,
    MonthFull,
    MonthShort,
    Month2,
    Month,
    Day2,
    Day,
    WeekdayFull,
    WeekdayShort,
    Hour24Padded,
    Hour24,
    Hour12Padded,
    Hour12,
    Minute,
    Second,
    MeridiemUpper,
    MeridiemLower,
    Quarter,
    Literal(String),
}

/// Characters that may start a token; everything else is copied verbatim.
const TOKEN_CHARS: &str = "YMDdHhmsAaQL[";

/// Parse a pattern such as `MMM D, YYYY` or `[Q]Q YYYY`.
///
/// Presets (`L`, `LL`, `LLL`, `LLLL`, `LT`) expand to their US-English layouts.
/// Any character that does not form a token is kept as a literal, so the only
/// failure is an internal parser error.
pub fn parse_date_pattern(pattern: &str) -> Option<Vec<DateToken>> {
    match all_consuming(many0(pattern_piece))(pattern) {
        Ok((_, pieces)) => Some(merge_literals(pieces.into_iter().flatten())),
        Err(_) => None,
    }
}

fn pattern_piece(input: &str) -> IResult<&str, Vec<DateToken>> {
    alt((
        preset,
        map(escaped_literal, |s| vec![DateToken::Literal(s.to_string())]),
        map(field_token, |t| vec![t]),
        map(literal_run, |s| vec![DateToken::Literal(s.to_string())]),
        map(anychar, |c| vec![DateToken::Literal(c.to_string())]),
    ))(input)
}

fn preset(input: &str) -> IResult<&str, Vec<DateToken>> {
    use DateToken::*;
    let lit = |s: &str| Literal(s.to_string());
    alt((
        map(tag("LLLL"), move |_| {
            vec![WeekdayFull, lit(", "), MonthFull, lit(" "), Day, lit(", "), Year4, lit(" "), Hour12, lit(":"), Minute, lit(" "), MeridiemUpper]
        }),
        map(tag("LLL"), move |_| {
            vec![MonthFull, lit(" "), Day, lit(", "), Year4, lit(" "), Hour12, lit(":"), Minute, lit(" "), MeridiemUpper]
        }),
        map(tag("LL"), move |_| vec![MonthFull, lit(" "), Day, lit(", "), Year4]),
        map(tag("LT"), move |_| vec![Hour12, lit(":"), Minute, lit(" "), MeridiemUpper]),
        map(tag("L"), move |_| vec![Month2, lit("/"), Day2, lit("/"), Year4]),
    ))(input)
}

/// `[text]` is copied without interpretation.
fn escaped_literal(input: &str) -> IResult<&str, &str> {
    delimited(char('['), take_while(|c| c != ']'), char(']'))(input)
}

fn field_token(input: &str) -> IResult<&str, DateToken> {
    alt((date_field, time_field))(input)
}

// Longest match first within each family
fn date_field(input: &str) -> IResult<&str, DateToken> {
    alt((
        value(DateToken::Year4, tag("YYYY")),
        value(DateToken::Year2, tag("YY")),
        value(DateToken::MonthFull, tag("MMMM")),
        value(DateToken::MonthShort, tag("MMM")),
        value(DateToken::Month2, tag("MM")),
        value(DateToken::Month, tag("M")),
        value(DateToken::Day2, tag("DD")),
        value(DateToken::Day, tag("D")),
        value(DateToken::WeekdayFull, tag("dddd")),
        value(DateToken::WeekdayShort, tag("ddd")),
        value(DateToken::Quarter, tag("Q")),
    ))(input)
}

fn time_field(input: &str) -> IResult<&str, DateToken> {
    alt((
        value(DateToken::Hour24Padded, tag("HH")),
        value(DateToken::Hour24, tag("H")),
        value(DateToken::Hour12Padded, tag("hh")),
        value(DateToken::Hour12, tag("h")),
        value(DateToken::Minute, tag("mm")),
        value(DateToken::Second, tag("ss")),
        value(DateToken::MeridiemUpper, tag("A")),
        value(DateToken::MeridiemLower, tag("a")),
    ))(input)
}

fn literal_run(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !TOKEN_CHARS.contains(c))(input)
}

fn merge_literals(tokens: impl Iterator<Item = DateToken>) -> Vec<DateToken> {
    let mut out: Vec<DateToken> = Vec::new();
    for token in tokens {
        match (out.last_mut(), token) {
            (Some(DateToken::Literal(prev)), DateToken::Literal(next)) => prev.push_str(&next),
            (_, token) => out.push(token),
        }
    }
    out
}
