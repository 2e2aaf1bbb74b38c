//! Lexer behavior observed through `parse`/`compile` (the lexer itself has
//! no public surface — spec.md §4.1's token rules are exercised end to end).

use policy_engine::{parse, ErrorKind};

fn lex_err(source: &str) -> ErrorKind {
    parse(source).unwrap_err().kind
}

#[test]
fn rejects_leading_zero_numbers() {
    assert_eq!(lex_err("package p\nx := 007"), ErrorKind::Lex);
}

#[test]
fn rejects_dot_prefixed_numbers() {
    // `.5` is not a valid number start per spec.md §4.1; the lexer treats
    // the leading `.` as a `Dot` token, which the parser then rejects as a
    // malformed expression rather than a lex error, but the source never
    // parses as the number `0.5`.
    assert!(parse("package p\nx := .5").is_err());
}

#[test]
fn rejects_unterminated_string() {
    assert_eq!(lex_err("package p\nx := \"abc"), ErrorKind::Lex);
}

#[test]
fn rejects_invalid_escape() {
    assert_eq!(lex_err(r#"package p
x := "a\qb""#), ErrorKind::Lex);
}

#[test]
fn accepts_unicode_escape() {
    let module = parse(r#"package p
x := "é""#).unwrap();
    assert_eq!(module.rules.len(), 1);
}

#[test]
fn accepts_raw_string_with_brace_escape() {
    let module = parse(r"package p
x := `a\{b}`").unwrap();
    assert_eq!(module.rules.len(), 1);
}

#[test]
fn comments_are_discarded() {
    let module = parse("package p # trailing comment\n# full line comment\nx := 1").unwrap();
    assert_eq!(module.package_path, vec!["p".to_string()]);
    assert_eq!(module.rules.len(), 1);
}

#[test]
fn accepts_scientific_notation() {
    let module = parse("package p\nx := 1.5e10\ny := 2E-3").unwrap();
    assert_eq!(module.rules.len(), 2);
}

#[test]
fn rejects_bang_without_equals() {
    assert_eq!(lex_err("package p\nok { 1 ! 2 }"), ErrorKind::Lex);
}
