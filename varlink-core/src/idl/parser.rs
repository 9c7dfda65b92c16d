//! Recursive-descent parser for the Varlink IDL (§4.2).

use std::collections::HashSet;

use super::interface::{Interface, Member};
use super::scanner::{Token, TokenStream};
use super::type_::{Field, Type};
use crate::error::{Error, Result};

/// Parses a complete interface definition, including the post-parse
/// resolution pass that rejects `CustomRef`s which don't resolve to an
/// `Alias` (§3's invariant).
pub fn parse(src: &str) -> Result<Interface> {
    let mut ts = TokenStream::tokenize(src)?;

    let doc = ts.peek_doc().map(str::to_string);
    ts.expect(Token::KwInterface)?;
    let name = ts.expect_interface_name()?;

    let mut members = Vec::new();
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    while ts.peek().is_some() {
        let member = parse_member(&mut ts)?;
        if !seen.insert(member.name().to_string()) {
            duplicates.push(member.name().to_string());
        }
        members.push(member);
    }
    ts.end()?;

    if !duplicates.is_empty() {
        return Err(Error::Syntax(format!(
            "duplicate member definition(s): {}",
            duplicates.join(", ")
        )));
    }

    let interface = Interface::new(name, doc, members, src.to_string());
    resolve_refs(&interface)?;
    Ok(interface)
}

fn parse_member(ts: &mut TokenStream) -> Result<Member> {
    let doc = ts.peek_doc().map(str::to_string);
    match ts.peek() {
        Some(Token::KwType) => {
            ts.expect(Token::KwType)?;
            let name = ts.expect_member_name()?;
            let ty = parse_type(ts)?;
            Ok(Member::Alias { name, ty, doc })
        }
        Some(Token::KwMethod) => {
            ts.expect(Token::KwMethod)?;
            let name = ts.expect_member_name()?;
            let input = parse_struct_fields(ts)?;
            ts.expect(Token::Arrow)?;
            let output = parse_struct_fields(ts)?;
            Ok(Member::Method { name, input, output, doc })
        }
        Some(Token::KwError) => {
            ts.expect(Token::KwError)?;
            let name = ts.expect_member_name()?;
            let ty = parse_type(ts)?;
            Ok(Member::Error { name, ty, doc })
        }
        other => Err(Error::Syntax(format!(
            "expected 'type', 'method' or 'error', found {}",
            describe_or_eof(other)
        ))),
    }
}

fn parse_type(ts: &mut TokenStream) -> Result<Type> {
    match ts.peek() {
        Some(Token::Question) => {
            ts.expect(Token::Question)?;
            if ts.peek() == Some(&Token::Question) {
                return Err(Error::Syntax("double '??'".into()));
            }
            let inner = parse_type(ts)?;
            if inner.is_maybe() {
                return Err(Error::Syntax("double '??'".into()));
            }
            Ok(Type::Maybe(Box::new(inner)))
        }
        Some(Token::SetOp) => {
            ts.expect(Token::SetOp)?;
            Ok(Type::Set)
        }
        Some(Token::MapOp) => {
            ts.expect(Token::MapOp)?;
            Ok(Type::Map(Box::new(parse_type(ts)?)))
        }
        Some(Token::ArrayOp) => {
            ts.expect(Token::ArrayOp)?;
            Ok(Type::Array(Box::new(parse_type(ts)?)))
        }
        Some(Token::KwObject) => {
            ts.expect(Token::KwObject)?;
            Ok(Type::Object)
        }
        Some(Token::KwBool) => {
            ts.expect(Token::KwBool)?;
            Ok(Type::Bool)
        }
        Some(Token::KwInt) => {
            ts.expect(Token::KwInt)?;
            Ok(Type::Int)
        }
        Some(Token::KwFloat) => {
            ts.expect(Token::KwFloat)?;
            Ok(Type::Float)
        }
        Some(Token::KwString) => {
            ts.expect(Token::KwString)?;
            Ok(Type::String)
        }
        Some(Token::MemberName(_)) => Ok(Type::CustomRef(ts.expect_member_name()?)),
        Some(Token::LParen) => parse_struct(ts),
        other => Err(Error::Syntax(format!(
            "'{}' not a valid type name.",
            describe_or_eof(other)
        ))),
    }
}

/// `struct := "(" (field ("," field)*)? ")"`, discriminating struct vs
/// enum shape on whether the first field carries a `: type` suffix.
fn parse_struct(ts: &mut TokenStream) -> Result<Type> {
    ts.expect(Token::LParen)?;
    if ts.get(|t| *t == Token::RParen).is_some() {
        return Ok(Type::Struct(Vec::new()));
    }

    let first_name = ts.expect_identifier()?;
    if ts.get(|t| *t == Token::Colon).is_some() {
        let first_ty = parse_type(ts)?;
        let mut fields = vec![Field::new(first_name, first_ty)];
        while ts.get(|t| *t == Token::Comma).is_some() {
            let name = ts.expect_identifier()?;
            if ts.get(|t| *t == Token::Colon).is_none() {
                return Err(Error::Syntax(format!(
                    "'{name}' is missing a type; once one field has a type, every field must"
                )));
            }
            fields.push(Field::new(name, parse_type(ts)?));
        }
        ts.expect(Token::RParen)?;
        Ok(Type::Struct(fields))
    } else {
        let mut tags = vec![first_name];
        while ts.get(|t| *t == Token::Comma).is_some() {
            let name = ts.expect_identifier()?;
            if ts.peek() == Some(&Token::Colon) {
                return Err(Error::Syntax(format!(
                    "'{name}' has a type, but earlier fields in this group did not"
                )));
            }
            tags.push(name);
        }
        ts.expect(Token::RParen)?;
        Ok(Type::Enum(tags))
    }
}

fn parse_struct_fields(ts: &mut TokenStream) -> Result<Vec<Field>> {
    match parse_struct(ts)? {
        Type::Struct(fields) => Ok(fields),
        Type::Enum(_) => Err(Error::Syntax(
            "method parameters must be a struct with typed fields, not a tag-only group".into(),
        )),
        _ => unreachable!("parse_struct only ever returns Struct or Enum"),
    }
}

fn describe_or_eof(tok: Option<&Token>) -> String {
    tok.map(Token::describe).unwrap_or_else(|| "end of input".into())
}

fn resolve_refs(interface: &Interface) -> Result<()> {
    fn check(interface: &Interface, ty: &Type, seen: &mut HashSet<String>) -> Result<()> {
        match ty {
            Type::CustomRef(name) => {
                if !seen.insert(name.clone()) {
                    return Err(Error::Syntax(format!(
                        "'{name}' forms a circular type alias chain"
                    )));
                }
                match interface.member(name) {
                    Some(Member::Alias { ty, .. }) => check(interface, ty, seen),
                    _ => Err(Error::Syntax(format!("'{name}' is not a valid type name."))),
                }
            }
            Type::Maybe(inner) | Type::Array(inner) | Type::Map(inner) => {
                check(interface, inner, seen)
            }
            Type::Struct(fields) => {
                for field in fields {
                    check(interface, &field.ty, &mut seen.clone())?;
                }
                Ok(())
            }
            Type::Bool | Type::Int | Type::Float | Type::String | Type::Object | Type::Set
            | Type::Enum(_) => Ok(()),
        }
    }

    for member in interface.members() {
        match member {
            Member::Alias { ty, .. } | Member::Error { ty, .. } => {
                check(interface, ty, &mut HashSet::new())?;
            }
            Member::Method { input, output, .. } => {
                for field in input.iter().chain(output) {
                    check(interface, &field.ty, &mut HashSet::new())?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PING: &str = "\
interface org.example.ping

# Returns whatever string it is given.
method Ping(ping: string) -> (pong: string)
";

    #[test]
    fn parses_name_and_methods() {
        let iface = parse(PING).unwrap();
        assert_eq!(iface.name(), "org.example.ping");
        let (input, output) = iface.method("Ping").unwrap();
        assert_eq!(input, &[Field::new("ping", Type::String)]);
        assert_eq!(output, &[Field::new("pong", Type::String)]);
    }

    #[test]
    fn round_trips_source_text() {
        let iface = parse(PING).unwrap();
        assert_eq!(iface.source(), PING);
    }

    #[test]
    fn rejects_double_optional() {
        let src = "interface org.example.a\ntype T ??string\n";
        let err = parse(src).unwrap_err();
        assert!(matches!(err, Error::Syntax(msg) if msg.contains("double '??'")));
    }

    #[test]
    fn rejects_unknown_custom_ref() {
        let src = "interface org.example.a\nmethod M(x: NoSuchType) -> ()\n";
        let err = parse(src).unwrap_err();
        assert!(matches!(err, Error::Syntax(_)));
    }

    #[test]
    fn rejects_mixed_struct_and_enum_fields() {
        let src = "interface org.example.a\ntype T (a, b: string)\n";
        let err = parse(src).unwrap_err();
        assert!(matches!(err, Error::Syntax(_)));
    }

    #[test]
    fn resolves_alias_chains() {
        let src = "\
interface org.example.a
type Name string
type Greeting Name
method Greet() -> (greeting: Greeting)
";
        let iface = parse(src).unwrap();
        let alias = iface.resolve_alias("Greeting").unwrap();
        assert_eq!(alias, &Type::CustomRef("Name".into()));
        assert_eq!(iface.resolve_alias("Name").unwrap(), &Type::String);
    }

    #[test]
    fn struct_and_set_and_map_types_parse() {
        let src = "\
interface org.example.a
type Tags [string]()
type Meta [string]int
method M() -> (tags: Tags, meta: Meta, items: []string, maybe: ?string)
";
        let iface = parse(src).unwrap();
        assert_eq!(iface.resolve_alias("Tags").unwrap(), &Type::Set);
        assert_eq!(
            iface.resolve_alias("Meta").unwrap(),
            &Type::Map(Box::new(Type::Int))
        );
        let (_, output) = iface.method("M").unwrap();
        assert_eq!(output[2].ty, Type::Array(Box::new(Type::String)));
        assert_eq!(output[3].ty, Type::Maybe(Box::new(Type::String)));
    }
}
