//! Solver-agnostic MILP artifact.
//!
//! A [`MilpProblem`] owns the `good_lp` variable registry together with a
//! record of every declared variable, a list of named linear constraints and
//! the objective. Backends turn it into an engine-specific model; tests and
//! the exhaustive backend evaluate it directly against a value map.

use good_lp::{constraint, variable, Constraint, Expression, ProblemVariables, Variable};
use crate::error::{SolverError, SolverResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Binary,
    Integer,
    Continuous,
}

/// Bookkeeping for one declared variable.
#[derive(Debug, Clone)]
pub struct VariableInfo {
    pub var: Variable,
    pub name: String,
    pub kind: VariableKind,
    pub lower: f64,
    pub upper: f64,
}

impl VariableInfo {
    fn admits(&self, value: f64, tol: f64) -> bool {
        if value < self.lower - tol || value > self.upper + tol {
            return false;
        }
        match self.kind {
            VariableKind::Continuous => true,
            VariableKind::Binary | VariableKind::Integer => (value - value.round()).abs() <= tol,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    Le,
    Ge,
    Eq,
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Comparison::Le => write!(f, "<="),
            Comparison::Ge => write!(f, ">="),
            Comparison::Eq => write!(f, "=="),
        }
    }
}

/// `lhs (<=|>=|==) rhs` with a constant right-hand side.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub name: String,
    pub lhs: Expression,
    pub cmp: Comparison,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn le(name: impl Into<String>, lhs: Expression, rhs: f64) -> Self {
        Self {
            name: name.into(),
            lhs,
            cmp: Comparison::Le,
            rhs,
        }
    }

    pub fn ge(name: impl Into<String>, lhs: Expression, rhs: f64) -> Self {
        Self {
            name: name.into(),
            lhs,
            cmp: Comparison::Ge,
            rhs,
        }
    }

    pub fn eq(name: impl Into<String>, lhs: Expression, rhs: f64) -> Self {
        Self {
            name: name.into(),
            lhs,
            cmp: Comparison::Eq,
            rhs,
        }
    }

    /// Convert to a `good_lp` constraint.
    pub fn to_constraint(&self) -> Constraint {
        let lhs = self.lhs.clone();
        let rhs = self.rhs;
        match self.cmp {
            Comparison::Le => constraint!(lhs <= rhs),
            Comparison::Ge => constraint!(lhs >= rhs),
            Comparison::Eq => constraint!(lhs == rhs),
        }
    }

    /// Amount by which `values` violate the constraint (0 when satisfied).
    ///
    /// `values` must hold every variable of `lhs`.
    pub fn violation(&self, values: &HashMap<Variable, f64>) -> f64 {
        let lhs = self.lhs.eval_with(values);
        match self.cmp {
            Comparison::Le => (lhs - self.rhs).max(0.0),
            Comparison::Ge => (self.rhs - lhs).max(0.0),
            Comparison::Eq => (lhs - self.rhs).abs(),
        }
    }

    pub fn is_satisfied_by(&self, values: &HashMap<Variable, f64>, tol: f64) -> bool {
        self.violation(values) <= tol
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    Maximize,
    Minimize,
}

/// A mixed-integer linear program ready to be handed to a backend.
pub struct MilpProblem {
    vars: ProblemVariables,
    infos: Vec<VariableInfo>,
    lookup: HashMap<Variable, usize>,
    constraints: Vec<LinearConstraint>,
    choice_groups: Vec<ChoiceGroup>,
    ceilings: Vec<CeilingLink>,
    objective: Expression,
    sense: Sense,
}

/// Binary variables of which exactly one must be set.
#[derive(Debug, Clone)]
pub struct ChoiceGroup {
    pub name: String,
    pub members: Vec<Variable>,
}

/// Integer `activation` pinned to `ceil(quantity)` by a pair of constraints.
#[derive(Debug, Clone)]
pub struct CeilingLink {
    pub activation: Variable,
    pub quantity: Expression,
}

impl Default for MilpProblem {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MilpProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MilpProblem")
            .field("variables", &self.infos.len())
            .field("constraints", &self.constraints.len())
            .field("sense", &self.sense)
            .finish()
    }
}

impl MilpProblem {
    pub fn new() -> Self {
        Self {
            vars: ProblemVariables::new(),
            infos: Vec::new(),
            lookup: HashMap::new(),
            constraints: Vec::new(),
            choice_groups: Vec::new(),
            ceilings: Vec::new(),
            objective: Expression::from(0.0),
            sense: Sense::Maximize,
        }
    }

    fn register(&mut self, var: Variable, name: String, kind: VariableKind, lower: f64, upper: f64) {
        self.lookup.insert(var, self.infos.len());
        self.infos.push(VariableInfo {
            var,
            name,
            kind,
            lower,
            upper,
        });
    }

    /// Declare a binary variable.
    pub fn add_binary(&mut self, name: impl Into<String>) -> Variable {
        let name = name.into();
        let var = self.vars.add(variable().binary().name(name.clone()));
        self.register(var, name, VariableKind::Binary, 0.0, 1.0);
        var
    }

    /// Declare an integer variable in `[lower, upper]`.
    pub fn add_integer(&mut self, name: impl Into<String>, lower: i32, upper: i32) -> Variable {
        let name = name.into();
        let var = self
            .vars
            .add(variable().integer().min(lower).max(upper).name(name.clone()));
        self.register(var, name, VariableKind::Integer, lower as f64, upper as f64);
        var
    }

    /// Declare a continuous variable in `[lower, upper]`.
    pub fn add_continuous(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> Variable {
        let name = name.into();
        let var = self
            .vars
            .add(variable().min(lower).max(upper).name(name.clone()));
        self.register(var, name, VariableKind::Continuous, lower, upper);
        var
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    /// Add `Σ members == 1` and remember the group.
    pub fn add_choice_group(&mut self, name: impl Into<String>, members: Vec<Variable>) {
        let name = name.into();
        let sum = members
            .iter()
            .fold(Expression::from(0.0), |acc, &v| acc + v);
        self.constraints.push(LinearConstraint::eq(name.clone(), sum, 1.0));
        self.choice_groups.push(ChoiceGroup { name, members });
    }

    /// Record that `activation` is the ceiling of `quantity`.
    ///
    /// The constraints enforcing it are added by the caller.
    pub fn annotate_ceiling(&mut self, activation: Variable, quantity: Expression) {
        self.ceilings.push(CeilingLink {
            activation,
            quantity,
        });
    }

    pub fn choice_groups(&self) -> &[ChoiceGroup] {
        &self.choice_groups
    }

    pub fn ceilings(&self) -> &[CeilingLink] {
        &self.ceilings
    }

    pub fn set_objective(&mut self, objective: Expression, sense: Sense) {
        self.objective = objective;
        self.sense = sense;
    }

    pub fn variables(&self) -> &[VariableInfo] {
        &self.infos
    }

    pub fn variable_info(&self, var: Variable) -> Option<&VariableInfo> {
        self.lookup.get(&var).map(|&i| &self.infos[i])
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn constraint(&self, name: &str) -> Option<&LinearConstraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    pub fn objective(&self) -> &Expression {
        &self.objective
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn num_variables(&self) -> usize {
        self.infos.len()
    }

    pub fn num_integer_variables(&self) -> usize {
        self.infos
            .iter()
            .filter(|i| i.kind != VariableKind::Continuous)
            .count()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Copy of `values` with every declared variable present (absent ones read as zero).
    pub fn complete(&self, values: &HashMap<Variable, f64>) -> HashMap<Variable, f64> {
        self.infos
            .iter()
            .map(|info| (info.var, values.get(&info.var).copied().unwrap_or(0.0)))
            .collect()
    }

    /// Objective value at `values`.
    pub fn evaluate(&self, values: &HashMap<Variable, f64>) -> f64 {
        self.objective.eval_with(&self.complete(values))
    }

    /// First violated constraint or variable domain, if any.
    ///
    /// Variables absent from `values` are read as zero.
    pub fn first_violation(&self, values: &HashMap<Variable, f64>, tol: f64) -> Option<String> {
        let values = &self.complete(values);
        for info in &self.infos {
            let v = values.get(&info.var).copied().unwrap_or(0.0);
            if !info.admits(v, tol) {
                return Some(format!("{} = {} outside its domain", info.name, v));
            }
        }
        self.constraints
            .iter()
            .find(|c| !c.is_satisfied_by(values, tol))
            .map(|c| {
                format!(
                    "{}: {} {} {} violated by {}",
                    c.name,
                    c.lhs.eval_with(values),
                    c.cmp,
                    c.rhs,
                    c.violation(values)
                )
            })
    }

    pub fn is_feasible(&self, values: &HashMap<Variable, f64>, tol: f64) -> bool {
        self.first_violation(values, tol).is_none()
    }

    /// Fresh `good_lp` registry declaring the same variables in the same order.
    ///
    /// Handles are positional, so the returned registry yields variables equal
    /// to the ones stored in this problem. With `relax` set, every integer
    /// domain becomes continuous over the same bounds.
    pub fn variable_registry(&self, relax: bool) -> SolverResult<ProblemVariables> {
        let mut vars = ProblemVariables::new();
        for info in &self.infos {
            let def = variable()
                .min(info.lower)
                .max(info.upper)
                .name(info.name.clone());
            let def = match info.kind {
                VariableKind::Continuous => def,
                _ if relax => def,
                VariableKind::Binary | VariableKind::Integer => def.integer(),
            };
            let var = vars.add(def);
            if var != info.var {
                return Err(SolverError::Failed(format!(
                    "variable registry out of order at {}",
                    info.name
                )));
            }
        }
        Ok(vars)
    }
}
