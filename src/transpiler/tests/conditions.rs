//! Condition rendering and value escaping.

use chrono::{NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;

use crate::ast::*;
use crate::transpiler::{ConditionToSoql, escape_value};

fn c(op: Operator, v: impl Into<Value>) -> String {
    Condition::compare("k", "Path", op, v).to_soql()
}

#[test]
fn test_comparison_operators() {
    assert_eq!(c(Operator::Eq, 1), "Path = 1");
    assert_eq!(c(Operator::Ne, 1), "Path != 1");
    assert_eq!(c(Operator::Gt, 1), "Path > 1");
    assert_eq!(c(Operator::Gte, 1), "Path >= 1");
    assert_eq!(c(Operator::Lt, 1), "Path < 1");
    assert_eq!(c(Operator::Lte, 1), "Path <= 1");
}

#[test]
fn test_pattern_operators() {
    assert_eq!(c(Operator::Like, "Ac%me"), "Path LIKE 'Ac%me'");
    assert_eq!(c(Operator::StartsWith, "Acme"), "Path LIKE 'Acme%'");
    assert_eq!(c(Operator::EndsWith, "Inc"), "Path LIKE '%Inc'");
}

#[test]
fn test_between_is_inclusive_conjunction() {
    let cond = Condition::between("amount", "Amount", 10, 20);
    assert_eq!(cond.to_soql(), "(Amount >= 10 AND Amount <= 20)");
}

#[test]
fn test_null_checks() {
    assert_eq!(Condition::is_null("o", "OwnerId").to_soql(), "OwnerId = null");
    assert_eq!(Condition::is_not_null("o", "OwnerId").to_soql(), "OwnerId != null");
}

#[test]
fn test_membership_with_mixed_values() {
    let cond = Condition::membership("id", "Id", false, vec![1.into(), "a".into(), true.into()]);
    assert_eq!(cond.to_soql(), "Id IN (1, 'a', true)");
    let cond = Condition::membership("id", "Id", true, vec![]);
    assert_eq!(cond.to_soql(), "Id NOT IN ()");
}

#[test]
fn test_nested_combinators() {
    let won = WhereAst::from(Condition::compare("s", "StageName", Operator::Eq, "Won"));
    let lost = WhereAst::from(Condition::compare("s", "StageName", Operator::Eq, "Lost"));
    let tree = and([
        or([won, lost]),
        not(Condition::is_null("o", "OwnerId").into()),
        raw("IsDeleted = false"),
    ]);
    assert_eq!(
        tree.to_soql(),
        "((StageName = 'Won' OR StageName = 'Lost') AND (NOT OwnerId = null) AND IsDeleted = false)"
    );
}

#[test]
fn test_raw_is_not_escaped() {
    assert_eq!(raw("Name = 'O\\'Brien'").to_soql(), "Name = 'O\\'Brien'");
}

#[test]
fn test_string_escaping() {
    assert_eq!(escape_value(&"O'Brien".into()), "'O\\'Brien'");
    assert_eq!(escape_value(&"back\\slash".into()), "'back\\\\slash'");
    assert_eq!(c(Operator::StartsWith, "O'B"), "Path LIKE 'O\\'B%'");
}

#[test]
fn test_literal_forms() {
    assert_eq!(escape_value(&Value::Null), "null");
    assert_eq!(escape_value(&true.into()), "true");
    assert_eq!(escape_value(&25000.into()), "25000");
    assert_eq!(escape_value(&2.5.into()), "2.5");
    assert_eq!(
        escape_value(&Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap().into()),
        "'2024-05-06T07:08:09.000Z'"
    );
    assert_eq!(
        escape_value(&NaiveDate::from_ymd_opt(2024, 5, 6).unwrap().into()),
        "'2024-05-06'"
    );
    assert_eq!(escape_value(&vec![1, 2].into()), "'1,2'");
}
