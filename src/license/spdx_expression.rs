//! SPDX expression splitter
//!
//! Breaks declared license expressions like "MIT OR Apache-2.0" or
//! "(GPL-2.0-only WITH Classpath-exception-2.0) AND MIT" into their
//! license identifiers. The operators are kept in the tree but never
//! evaluated: every identifier in the expression is reported.

use serde::{Deserialize, Serialize};

/// Deepest parenthesis nesting accepted; deeper input is treated as unparseable
const MAX_NESTING: usize = 32;

/// Parsed SPDX expression tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpdxExpression {
    /// Single license identifier
    License(String),
    /// License with exception (e.g., GPL-2.0-only WITH Classpath-exception-2.0)
    WithException(String, String),
    /// Disjunction of two or more operands
    Or(Vec<SpdxExpression>),
    /// Conjunction of two or more operands
    And(Vec<SpdxExpression>),
}

impl SpdxExpression {
    /// Parse an SPDX expression string.
    ///
    /// Operator chains are split in one pass, so recursion only follows
    /// parenthesis nesting, which is capped at [`MAX_NESTING`].
    pub fn parse(expr: &str) -> Option<Self> {
        Self::parse_nested(expr, 0)
    }

    fn parse_nested(expr: &str, depth: usize) -> Option<Self> {
        if depth > MAX_NESTING {
            return None;
        }
        let mut trimmed = expr.trim();
        if trimmed.is_empty() {
            return None;
        }

        // Strip parentheses only when they wrap the whole expression
        let mut stripped = 0;
        while trimmed.starts_with('(') && trimmed.ends_with(')') && wraps_whole(trimmed) {
            stripped += 1;
            if depth + stripped > MAX_NESTING {
                return None;
            }
            trimmed = trimmed[1..trimmed.len() - 1].trim();
        }
        let depth = depth + stripped;

        // OR binds loosest
        let parts = split_top_level(trimmed, " OR ");
        if parts.len() > 1 {
            return Self::parse_operands(parts, depth).map(Self::Or);
        }

        let parts = split_top_level(trimmed, " AND ");
        if parts.len() > 1 {
            return Self::parse_operands(parts, depth).map(Self::And);
        }

        let parts = split_top_level(trimmed, " WITH ");
        if parts.len() > 1 {
            let license = parts[0].trim();
            if license.is_empty() {
                return None;
            }
            let exception = parts[1..].join(" WITH ");
            return Some(Self::WithException(
                license.to_string(),
                exception.trim().to_string(),
            ));
        }

        Some(Self::License(trimmed.to_string()))
    }

    fn parse_operands(parts: Vec<&str>, depth: usize) -> Option<Vec<Self>> {
        parts
            .into_iter()
            .map(|part| Self::parse_nested(part, depth + 1))
            .collect()
    }

    /// All license identifiers in the expression, left to right
    pub fn license_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Self::License(id) | Self::WithException(id, _) => ids.push(id.as_str()),
                Self::Or(operands) | Self::And(operands) => stack.extend(operands.iter().rev()),
            }
        }
        ids
    }

    /// Whether the expression is a plain identifier without operators
    pub fn is_simple(&self) -> bool {
        matches!(self, Self::License(_))
    }
}

/// Whether the leading '(' closes at the very last character
fn wraps_whole(expr: &str) -> bool {
    let mut depth = 0i32;
    for (i, b) in expr.bytes().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return i == expr.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Split on every occurrence of `op` outside parentheses (case-insensitive)
fn split_top_level<'a>(expr: &'a str, op: &str) -> Vec<&'a str> {
    let bytes = expr.as_bytes();
    let op = op.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {}
        }
        if depth == 0 && bytes.len() - i >= op.len() && bytes[i..i + op.len()].eq_ignore_ascii_case(op) {
            parts.push(&expr[start..i]);
            i += op.len();
            start = i;
            continue;
        }
        i += 1;
    }
    parts.push(&expr[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_identifier() {
        let expr = SpdxExpression::parse("MIT").unwrap();
        assert!(expr.is_simple());
        assert_eq!(expr.license_ids(), vec!["MIT"]);
    }

    #[test]
    fn test_dual_license() {
        let expr = SpdxExpression::parse("MIT OR Apache-2.0").unwrap();
        assert_eq!(expr.license_ids(), vec!["MIT", "Apache-2.0"]);
        assert!(!expr.is_simple());
    }

    #[test]
    fn test_nested_with_exception() {
        let expr =
            SpdxExpression::parse("(GPL-2.0-only WITH Classpath-exception-2.0) AND MIT").unwrap();
        assert_eq!(expr.license_ids(), vec!["GPL-2.0-only", "MIT"]);
    }

    #[test]
    fn test_parenthesized_sides_are_not_stripped_together() {
        let expr = SpdxExpression::parse("(MIT) or (ISC)").unwrap();
        assert_eq!(expr.license_ids(), vec!["MIT", "ISC"]);
    }

    #[test]
    fn test_empty_expression() {
        assert!(SpdxExpression::parse("   ").is_none());
        assert!(SpdxExpression::parse("MIT OR  OR ISC").is_none());
    }

    #[test]
    fn test_long_operator_chain_is_flat() {
        let text = vec!["MIT"; 20_000].join(" OR ");
        let expr = SpdxExpression::parse(&text).unwrap();
        match &expr {
            SpdxExpression::Or(operands) => assert_eq!(operands.len(), 20_000),
            other => panic!("expected a disjunction, got {:?}", other),
        }
        assert_eq!(expr.license_ids().len(), 20_000);

        let mixed = vec!["MIT AND ISC"; 5_000].join(" or ");
        assert_eq!(SpdxExpression::parse(&mixed).unwrap().license_ids().len(), 10_000);
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let deep = format!("{}MIT OR ISC{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(SpdxExpression::parse(&deep).is_none());

        let chained = format!("{}MIT{}", "(MIT OR ".repeat(5_000), ")".repeat(5_000));
        assert!(SpdxExpression::parse(&chained).is_none());

        let shallow = "((MIT OR ISC) AND (Apache-2.0 OR BSD-3-Clause))";
        assert_eq!(
            SpdxExpression::parse(shallow).unwrap().license_ids(),
            vec!["MIT", "ISC", "Apache-2.0", "BSD-3-Clause"]
        );
    }
}
