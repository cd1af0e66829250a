use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::is_not;
use nom::character::complete::{char, multispace0, multispace1};
use nom::combinator::all_consuming;
use nom::error::Error as NError;
use nom::multi::separated_list0;
use nom::sequence::{delimited, preceded};
use nom::{Finish, IResult};

#[derive(PartialEq, Eq, Debug)]
pub enum SExp<A> {
    Atom(A),
    List(Vec<SExp<A>>),
}

/// Strips a label-less outer wrapper, e.g. `((SENT ...))`, leaving the
/// single labelled tree inside. A wrapper is recognized as a `List` of
/// exactly one element which is itself a `List` (an atom can't appear where
/// a label is expected in the inner tree). Returns the s-expression
/// unchanged if it isn't wrapped.
pub fn strip_outer_wrapper<A>(sexp: SExp<A>) -> SExp<A> {
    match sexp {
        SExp::List(mut list) if list.len() == 1 && matches!(list[0], SExp::List(_)) => {
            list.pop().unwrap()
        }
        other => other,
    }
}

impl<T> FromStr for SExp<T>
where
    T: for<'a> From<&'a str>,
{
    type Err = NError<String>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match all_consuming(parse_sexp)(s).finish() {
            Ok((_, sexp)) => Ok(sexp),
            Err(NError { input, code }) => Err(NError {
                input: input.to_string(),
                code,
            }),
        }
    }
}

fn parse_sexp<'a, T>(input: &'a str) -> IResult<&str, SExp<T>>
where
    T: From<&'a str>,
{
    alt((
        delimited(char('('), parse_sexp_list, preceded(multispace0, char(')'))),
        parse_atom,
    ))(input.trim())
}

fn parse_sexp_list<'a, T>(input: &'a str) -> IResult<&str, SExp<T>>
where
    T: From<&'a str>,
{
    separated_list0(multispace1, parse_sexp)(input.trim()).map(|(i, o)| (i, SExp::List(o)))
}

fn parse_atom<'a, T>(input: &'a str) -> IResult<&str, SExp<T>>
where
    T: From<&'a str>,
{
    is_not("() \t")(input.trim()).map(|(i, o)| (i, SExp::Atom(T::from(o))))
}
