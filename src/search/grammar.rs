//! Query text normalization / 查询语句预处理
//!
//! The store's parser reads `a AND NOT b` as an empty conjunction. Groups
//! containing `AND NOT` are rewritten into the prefix form (`+a -b`), which
//! the parser handles, before parsing. Everything else passes through.

/// Rewrite `AND NOT` groups into `+`/`-` clauses / 改写 AND NOT 子句
pub fn rewrite_and_not(text: &str) -> String {
    if !text.contains("NOT") {
        return text.to_string();
    }

    let units = split_units(text);
    let groups: Vec<&[String]> = units.split(|unit| unit == "OR").collect();
    if groups.iter().any(|group| group.is_empty()) {
        // dangling OR; let the parser report it
        return text.to_string();
    }

    let wrap = groups.len() > 1;
    groups
        .iter()
        .map(|group| rewrite_group(group, wrap))
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn rewrite_group(units: &[String], wrap: bool) -> String {
    let has_and_not = units.windows(2).any(|w| w[0] == "AND" && w[1] == "NOT");
    if !has_and_not {
        return units.iter().map(|u| rewrite_nested(u)).collect::<Vec<_>>().join(" ");
    }

    let mut clauses = Vec::with_capacity(units.len());
    for (i, unit) in units.iter().enumerate() {
        if unit == "AND" || unit == "NOT" {
            continue;
        }
        let prev = i.checked_sub(1).map(|p| units[p].as_str());
        let next = units.get(i + 1).map(String::as_str);
        let clause = rewrite_nested(unit);

        if clause.starts_with('+') || clause.starts_with('-') {
            clauses.push(clause);
        } else if prev == Some("NOT") {
            clauses.push(format!("-{}", clause));
        } else if prev == Some("AND") || next == Some("AND") {
            clauses.push(format!("+{}", clause));
        } else {
            clauses.push(clause);
        }
    }

    let joined = clauses.join(" ");
    if wrap {
        format!("({})", joined)
    } else {
        joined
    }
}

fn rewrite_nested(unit: &str) -> String {
    match unit.strip_prefix('(').and_then(|u| u.strip_suffix(')')) {
        Some(inner) => format!("({})", rewrite_and_not(inner)),
        None => unit.to_string(),
    }
}

/// Split on whitespace outside quotes and parentheses.
fn split_units(text: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quoted = false;

    for c in text.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            '(' if !quoted => {
                depth += 1;
                current.push(c);
            }
            ')' if !quoted => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && !quoted && depth == 0 => {
                if !current.is_empty() {
                    units.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        units.push(current);
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_not_becomes_prefix_form() {
        assert_eq!(rewrite_and_not("apple AND NOT banana"), "+apple -banana");
        assert_eq!(rewrite_and_not("table:docs AND NOT apple"), "+table:docs -apple");
        assert_eq!(
            rewrite_and_not("apple AND pie AND NOT banana"),
            "+apple +pie -banana"
        );
    }

    #[test]
    fn test_or_groups_and_nesting() {
        assert_eq!(
            rewrite_and_not("apple AND NOT banana OR nothing"),
            "(+apple -banana) OR nothing"
        );
        assert_eq!(
            rewrite_and_not("(apple AND NOT banana) OR nothing"),
            "(+apple -banana) OR nothing"
        );
    }

    #[test]
    fn test_other_queries_pass_through() {
        assert_eq!(rewrite_and_not("apple NOT banana"), "apple NOT banana");
        assert_eq!(rewrite_and_not("apple AND banana"), "apple AND banana");
        assert_eq!(rewrite_and_not("\"AND NOT\" phrase"), "\"AND NOT\" phrase");
        assert_eq!(rewrite_and_not("a OR"), "a OR");
    }
}
