//! Declarative rule tables.
//!
//! A rule is a conjunction of clauses over input categories and a single
//! consequent category of the output variable.  Tables are `const` data so
//! each stage's table can be inspected and tested apart from the evaluator.

/// `variable is category`, or `variable is not category` when `negated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clause {
    pub variable: usize,
    pub category: usize,
    pub negated: bool,
}

impl Clause {
    pub const fn is(variable: usize, category: usize) -> Self {
        Self { variable, category, negated: false }
    }

    pub const fn is_not(variable: usize, category: usize) -> Self {
        Self { variable, category, negated: true }
    }

    /// Truth degree of this clause given per-variable memberships.
    #[inline]
    pub fn degree(&self, memberships: &[Vec<f64>]) -> f64 {
        let mu = memberships[self.variable][self.category];
        if self.negated {
            1.0 - mu
        } else {
            mu
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub antecedent: &'static [Clause],
    pub consequent: usize,
}

impl Rule {
    pub const fn new(antecedent: &'static [Clause], consequent: usize) -> Self {
        Self { antecedent, consequent }
    }

    /// AND of all clauses (minimum).
    pub fn strength(&self, memberships: &[Vec<f64>]) -> f64 {
        self.antecedent
            .iter()
            .map(|c| c.degree(memberships))
            .fold(1.0, f64::min)
    }
}

/// Check that every clause and consequent refers to an existing variable and
/// category.  `shape` lists the category count per input variable.
pub fn validate_table(rules: &[Rule], shape: &[usize], outputs: usize) -> Result<(), String> {
    for (i, rule) in rules.iter().enumerate() {
        if rule.antecedent.is_empty() {
            return Err(format!("rule {i} has an empty antecedent"));
        }
        if rule.consequent >= outputs {
            return Err(format!("rule {i} has consequent {} of {outputs}", rule.consequent));
        }
        for clause in rule.antecedent {
            match shape.get(clause.variable) {
                Some(&n) if clause.category < n => {}
                _ => {
                    return Err(format!(
                        "rule {i} refers to category {} of variable {}",
                        clause.category, clause.variable
                    ))
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[Rule] = &[
        Rule::new(&[Clause::is(0, 0), Clause::is(1, 1)], 0),
        Rule::new(&[Clause::is(0, 1), Clause::is_not(1, 0)], 1),
    ];

    #[test]
    fn strength_is_minimum_with_negation() {
        let memberships = vec![vec![0.2, 0.8], vec![0.3, 0.6]];
        assert_eq!(TABLE[0].strength(&memberships), 0.2);
        // min(0.8, 1 - 0.3)
        assert!((TABLE[1].strength(&memberships) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn validate_catches_bad_references() {
        assert!(validate_table(TABLE, &[2, 2], 2).is_ok());
        assert!(validate_table(TABLE, &[2, 1], 2).is_err());
        assert!(validate_table(TABLE, &[2, 2], 1).is_err());
    }
}
