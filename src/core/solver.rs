//! Ordinal assignment as a small constraint satisfaction problem.
//!
//! One variable per record, its domain the record's candidate ordinals. Variables of the
//! same year are weakly ordered with `x <= y`; every variable of a year must be strictly below
//! every variable of the next distinct year. Bounds are propagated to a fixpoint before a
//! depth-first search over the remaining domains, and both phases share one step budget.

use crate::domain::ports::{OrdinalSolver, OrdinalVariable, SolveError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// How records of the same year are ordered against each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum SameYearOrdering {
    /// `x <= y` only in input order; same-year records may share or increase their ordinal
    #[default]
    NonDecreasing,
    /// `x <= y` for every ordered pair, i.e. one shared ordinal per year (split volumes)
    Equal,
}

#[derive(Debug, Clone, Copy)]
struct Constraint {
    left: usize,
    right: usize,
    strict: bool,
}

/// A constraint seen from the variable assigned later in the search.
#[derive(Debug, Clone, Copy)]
struct Check {
    other: usize,
    other_is_left: bool,
    strict: bool,
}

impl Check {
    fn holds(&self, value: i64, other_value: i64) -> bool {
        let (left, right) = if self.other_is_left {
            (other_value, value)
        } else {
            (value, other_value)
        };
        if self.strict {
            left < right
        } else {
            left <= right
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktrackingSolver {
    ordering: SameYearOrdering,
    max_steps: u64,
}

impl Default for BacktrackingSolver {
    fn default() -> Self {
        Self::new(SameYearOrdering::default(), DEFAULT_MAX_STEPS)
    }
}

impl BacktrackingSolver {
    pub fn new(ordering: SameYearOrdering, max_steps: u64) -> Self {
        Self {
            ordering,
            max_steps,
        }
    }

    fn tick(&self, steps: &mut u64) -> Result<(), SolveError> {
        *steps += 1;
        if *steps > self.max_steps {
            return Err(SolveError::BudgetExhausted { steps: *steps });
        }
        Ok(())
    }

    fn constraints(&self, variables: &[OrdinalVariable]) -> Vec<Constraint> {
        let mut by_year: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (index, variable) in variables.iter().enumerate() {
            by_year.entry(variable.year).or_default().push(index);
        }
        let groups: Vec<&Vec<usize>> = by_year.values().collect();

        let mut constraints = Vec::new();
        for (k, group) in groups.iter().enumerate() {
            for (a, &x) in group.iter().enumerate() {
                for (b, &y) in group.iter().enumerate() {
                    let applies = match self.ordering {
                        SameYearOrdering::Equal => a != b,
                        SameYearOrdering::NonDecreasing => a < b,
                    };
                    if applies {
                        constraints.push(Constraint {
                            left: x,
                            right: y,
                            strict: false,
                        });
                    }
                }
            }
            if let Some(next) = groups.get(k + 1) {
                for &x in group.iter() {
                    for &y in next.iter() {
                        constraints.push(Constraint {
                            left: x,
                            right: y,
                            strict: true,
                        });
                    }
                }
            }
        }
        constraints
    }

    /// Shrinks every domain to values that can still satisfy each single constraint.
    fn propagate(
        &self,
        constraints: &[Constraint],
        domains: &mut [Vec<i64>],
        steps: &mut u64,
    ) -> Result<(), SolveError> {
        loop {
            let mut changed = false;
            for constraint in constraints {
                self.tick(steps)?;
                let gap = i64::from(constraint.strict);

                let lowest_left = *domains[constraint.left]
                    .first()
                    .ok_or(SolveError::Infeasible)?;
                let before = domains[constraint.right].len();
                let floor = lowest_left.saturating_add(gap);
                domains[constraint.right].retain(|value| *value >= floor);
                changed |= domains[constraint.right].len() != before;

                let highest_right = *domains[constraint.right]
                    .last()
                    .ok_or(SolveError::Infeasible)?;
                let before = domains[constraint.left].len();
                let ceiling = highest_right.saturating_sub(gap);
                domains[constraint.left].retain(|value| *value <= ceiling);
                changed |= domains[constraint.left].len() != before;

                if domains[constraint.left].is_empty() {
                    return Err(SolveError::Infeasible);
                }
            }
            if !changed {
                return Ok(());
            }
        }
    }

    fn search(
        &self,
        depth: usize,
        order: &[usize],
        domains: &[Vec<i64>],
        checks: &[Vec<Check>],
        values: &mut [i64],
        steps: &mut u64,
    ) -> Result<bool, SolveError> {
        let Some(&var) = order.get(depth) else {
            return Ok(true);
        };
        for &value in &domains[var] {
            self.tick(steps)?;
            let consistent = checks[var]
                .iter()
                .all(|check| check.holds(value, values[check.other]));
            if consistent {
                values[var] = value;
                if self.search(depth + 1, order, domains, checks, values, steps)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

impl OrdinalSolver for BacktrackingSolver {
    fn solve(&self, variables: &[OrdinalVariable]) -> Result<Vec<i64>, SolveError> {
        if variables.iter().any(|v| v.candidates.is_empty()) {
            return Err(SolveError::Infeasible);
        }
        if variables.is_empty() {
            return Ok(Vec::new());
        }

        let constraints = self.constraints(variables);
        let mut domains: Vec<Vec<i64>> = variables
            .iter()
            .map(|v| v.candidates.iter().copied().collect())
            .collect();
        let mut steps = 0;
        self.propagate(&constraints, &mut domains, &mut steps)?;

        // 依年份、輸入順序搜尋
        let mut order: Vec<usize> = (0..variables.len()).collect();
        order.sort_by_key(|&i| (variables[i].year, i));
        let mut position = vec![0; variables.len()];
        for (pos, &var) in order.iter().enumerate() {
            position[var] = pos;
        }

        let mut checks: Vec<Vec<Check>> = vec![Vec::new(); variables.len()];
        for constraint in &constraints {
            if position[constraint.left] < position[constraint.right] {
                checks[constraint.right].push(Check {
                    other: constraint.left,
                    other_is_left: true,
                    strict: constraint.strict,
                });
            } else {
                checks[constraint.left].push(Check {
                    other: constraint.right,
                    other_is_left: false,
                    strict: constraint.strict,
                });
            }
        }

        let mut values = vec![0; variables.len()];
        if self.search(0, &order, &domains, &checks, &mut values, &mut steps)? {
            tracing::trace!("Ordinal assignment found after {} steps", steps);
            Ok(values)
        } else {
            Err(SolveError::Infeasible)
        }
    }
}
