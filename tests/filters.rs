//! Filter language tests: tokenizer, parser, pretty-printer.

use quiver_db::filter::{parse_filter, tokenize, BoolOp, CompareOp, FilterNode, TokenKind};
use quiver_db::metadata::FieldValue;

#[test]
fn test_basic_tokenize() {
    let tokens = tokenize("age = 30 AND name = \"Alice\"").unwrap();
    assert_eq!(tokens.len(), 7);

    assert_eq!(tokens[0].text, "age");
    assert_eq!(tokens[0].kind, TokenKind::Ident);
    assert_eq!(tokens[1].text, "=");
    assert_eq!(tokens[1].kind, TokenKind::Comparator);
    assert_eq!(tokens[2].text, "30");
    assert_eq!(tokens[2].kind, TokenKind::Int);
    assert_eq!(tokens[3].text, "AND");
    assert_eq!(tokens[3].kind, TokenKind::BoolOp);
    assert_eq!(tokens[4].text, "name");
    assert_eq!(tokens[4].kind, TokenKind::Ident);
    assert_eq!(tokens[5].text, "=");
    assert_eq!(tokens[5].kind, TokenKind::Comparator);
    assert_eq!(tokens[6].text, "Alice");
    assert_eq!(tokens[6].kind, TokenKind::Str);
}

#[test]
fn test_tokenize_groups() {
    let tokens = tokenize("(age = 30 OR age = 31) AND name = \"Alice\"").unwrap();
    assert_eq!(tokens.len(), 13);

    assert_eq!(tokens[0].kind, TokenKind::LParen);
    assert_eq!(tokens[1].text, "age");
    assert_eq!(tokens[4].text, "OR");
    assert_eq!(tokens[4].kind, TokenKind::BoolOp);
    assert_eq!(tokens[7].text, "31");
    assert_eq!(tokens[7].kind, TokenKind::Int);
    assert_eq!(tokens[8].kind, TokenKind::RParen);
    assert_eq!(tokens[9].text, "AND");
    assert_eq!(tokens[12].text, "Alice");
    assert_eq!(tokens[12].kind, TokenKind::Str);
}

#[test]
fn test_tokenize_not() {
    let tokens = tokenize("NOT age = 30").unwrap();
    assert_eq!(tokens.len(), 4);
    assert_eq!(tokens[0].text, "NOT");
    assert_eq!(tokens[0].kind, TokenKind::BoolOp);
}

#[test]
fn test_tokenize_comparators_longest_match() {
    let tokens = tokenize("a != 1 AND b >= 2 AND c <= 3 AND d > 4 AND e < 5 AND f = 6").unwrap();
    let comparators: Vec<&str> = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Comparator)
        .map(|t| t.text.as_str())
        .collect();
    assert_eq!(comparators, vec!["!=", ">=", "<=", ">", "<", "="]);
}

#[test]
fn test_tokenize_float_and_int_literals() {
    let tokens = tokenize("x = 12.75 OR x = 13").unwrap();
    assert_eq!(tokens[2].kind, TokenKind::Float);
    assert_eq!(tokens[2].text, "12.75");
    assert_eq!(tokens[6].kind, TokenKind::Int);
    assert_eq!(tokens[6].text, "13");
}

#[test]
fn test_ast_construction_not() {
    let ast = parse_filter("NOT age = 30").unwrap();

    match ast {
        FilterNode::Not(child) => match *child {
            FilterNode::Comparison { ref field, op, ref value } => {
                assert_eq!(field, "age");
                assert_eq!(op, CompareOp::Eq);
                assert_eq!(*value, FieldValue::Int(30));
            }
            ref other => panic!("expected comparison under NOT, got {other:?}"),
        },
        other => panic!("expected NOT at root, got {other:?}"),
    }
}

#[test]
fn test_ast_construction_with_and() {
    let ast = parse_filter("age = 30 AND name = \"Alice\"").unwrap();

    match ast {
        FilterNode::Boolean { op, left, right } => {
            assert_eq!(op, BoolOp::And);
            assert_eq!(
                *left,
                FilterNode::comparison("age", CompareOp::Eq, FieldValue::Int(30))
            );
            assert_eq!(
                *right,
                FilterNode::comparison("name", CompareOp::Eq, FieldValue::Str("Alice".into()))
            );
        }
        other => panic!("expected boolean at root, got {other:?}"),
    }
}

#[test]
fn test_ast_construction_with_or() {
    let ast = parse_filter("age = 30 OR name = \"Alice\"").unwrap();

    match ast {
        FilterNode::Boolean { op, .. } => assert_eq!(op, BoolOp::Or),
        other => panic!("expected boolean at root, got {other:?}"),
    }
}

#[test]
fn test_ast_construction_with_group() {
    let ast = parse_filter("(age = 30 OR age = 31) AND name = \"Alice\"").unwrap();

    match ast {
        FilterNode::Boolean { op: BoolOp::And, left, right } => {
            match *left {
                FilterNode::Boolean { op: BoolOp::Or, ref left, ref right } => {
                    assert_eq!(
                        **left,
                        FilterNode::comparison("age", CompareOp::Eq, FieldValue::Int(30))
                    );
                    assert_eq!(
                        **right,
                        FilterNode::comparison("age", CompareOp::Eq, FieldValue::Int(31))
                    );
                }
                ref other => panic!("expected OR group on the left, got {other:?}"),
            }
            assert_eq!(
                *right,
                FilterNode::comparison("name", CompareOp::Eq, FieldValue::Str("Alice".into()))
            );
        }
        other => panic!("expected AND at root, got {other:?}"),
    }
}

#[test]
fn test_nested_not() {
    let ast = parse_filter("NOT NOT age = 30").unwrap();
    match ast {
        FilterNode::Not(inner) => assert!(matches!(*inner, FilterNode::Not(_))),
        other => panic!("expected NOT at root, got {other:?}"),
    }
}

#[test]
fn test_parse_rejects_malformed_input() {
    for bad in [
        "",
        "age",
        "age =",
        "age = ",
        "= 30",
        "(age = 30",
        "age = 30)",
        "age = 30 AND",
        "age = 30 name = \"Bob\"",
        "AND age = 30",
        "age == 30",
        "age ! 30",
        "name = \"unterminated",
    ] {
        assert!(parse_filter(bad).is_err(), "expected parse error for: {bad}");
    }
}

#[test]
fn test_pretty_print_reparse_identity() {
    for src in [
        "age = 30",
        "age != 30",
        "score >= 12.5",
        "name = \"Alice\"",
        "age = 30 AND name = \"Alice\"",
        "age = 30 OR age = 31 AND name = \"Alice\"",
        "NOT age = 30",
        "NOT (age = 30 OR name = \"Bob\")",
        "(a = 1 OR b = 2) AND NOT c = 3",
    ] {
        let ast = parse_filter(src).unwrap();
        let printed = ast.to_string();
        let reparsed = parse_filter(&printed).unwrap();
        assert_eq!(ast, reparsed, "print/reparse mismatch for: {src}");
        // Printing again produces the same text (stable cache key)
        assert_eq!(printed, reparsed.to_string());
    }
}
