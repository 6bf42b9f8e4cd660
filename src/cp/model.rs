//! Finite-domain model: integer variables, linear and global constraints,
//! and a scalar objective to minimize.

/// Handle to an integer decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntVar(usize);

impl IntVar {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a 0/1 variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoolVar(IntVar);

impl BoolVar {
    pub fn var(self) -> IntVar {
        self.0
    }

    pub fn not(self) -> Literal {
        Literal {
            var: self.0,
            negated: true,
        }
    }
}

/// A boolean variable or its negation, used as an enforcement condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal {
    var: IntVar,
    negated: bool,
}

impl Literal {
    pub fn var(self) -> IntVar {
        self.var
    }

    pub fn not(self) -> Literal {
        Literal {
            var: self.var,
            negated: !self.negated,
        }
    }

    /// Value of the underlying boolean when this literal holds.
    pub fn true_value(self) -> i64 {
        if self.negated {
            0
        } else {
            1
        }
    }
}

impl From<BoolVar> for Literal {
    fn from(b: BoolVar) -> Self {
        Literal {
            var: b.0,
            negated: false,
        }
    }
}

/// Finite set of integer values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Domain {
    /// Explicit sorted, deduplicated values.
    Values(Vec<i64>),
    /// Every integer in `lo..=hi`; empty when `lo > hi`.
    Interval { lo: i64, hi: i64 },
}

impl Domain {
    pub fn from_values(values: impl IntoIterator<Item = i64>) -> Self {
        let mut values: Vec<i64> = values.into_iter().collect();
        values.sort_unstable();
        values.dedup();
        Domain::Values(values)
    }

    pub fn interval(lo: i64, hi: i64) -> Self {
        Domain::Interval { lo, hi }
    }

    pub fn boolean() -> Self {
        Domain::Interval { lo: 0, hi: 1 }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Domain::Values(values) => values.is_empty(),
            Domain::Interval { lo, hi } => lo > hi,
        }
    }

    /// Smallest value. Meaningless on an empty domain.
    pub fn min(&self) -> i64 {
        match self {
            Domain::Values(values) => values.first().copied().unwrap_or(i64::MAX),
            Domain::Interval { lo, .. } => *lo,
        }
    }

    /// Largest value. Meaningless on an empty domain.
    pub fn max(&self) -> i64 {
        match self {
            Domain::Values(values) => values.last().copied().unwrap_or(i64::MIN),
            Domain::Interval { hi, .. } => *hi,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Domain::Values(values) => values.len() as u64,
            Domain::Interval { lo, hi } if lo <= hi => (*hi as i128 - *lo as i128 + 1) as u64,
            Domain::Interval { .. } => 0,
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        match self {
            Domain::Values(values) => values.binary_search(&value).is_ok(),
            Domain::Interval { lo, hi } => *lo <= value && value <= *hi,
        }
    }

    pub fn fixed_value(&self) -> Option<i64> {
        match self {
            Domain::Values(values) if values.len() == 1 => Some(values[0]),
            Domain::Interval { lo, hi } if lo == hi => Some(*lo),
            _ => None,
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed_value().is_some()
    }

    /// Every member of a [`Domain::Values`] domain; `None` for intervals.
    pub fn explicit_values(&self) -> Option<&[i64]> {
        match self {
            Domain::Values(values) => Some(values),
            Domain::Interval { .. } => None,
        }
    }
}

/// Weighted sum of variables plus a constant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    terms: Vec<(IntVar, i64)>,
    constant: i64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(constant: i64) -> Self {
        Self {
            terms: Vec::new(),
            constant,
        }
    }

    /// Sum of the variables with coefficient 1.
    pub fn sum(vars: impl IntoIterator<Item = IntVar>) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v, 1)).collect(),
            constant: 0,
        }
    }

    pub fn term(mut self, var: IntVar, coef: i64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn plus(mut self, constant: i64) -> Self {
        self.constant += constant;
        self
    }

    pub fn add_term(&mut self, var: IntVar, coef: i64) {
        if coef != 0 {
            self.terms.push((var, coef));
        }
    }

    pub fn terms(&self) -> &[(IntVar, i64)] {
        &self.terms
    }

    pub fn offset(&self) -> i64 {
        self.constant
    }

    pub fn evaluate(&self, values: &[i64]) -> i64 {
        self.terms
            .iter()
            .fold(self.constant, |acc, (var, coef)| acc + coef * values[var.index()])
    }
}

impl From<IntVar> for LinearExpr {
    fn from(var: IntVar) -> Self {
        LinearExpr::new().term(var, 1)
    }
}

impl From<BoolVar> for LinearExpr {
    fn from(b: BoolVar) -> Self {
        LinearExpr::new().term(b.var(), 1)
    }
}

/// Comparison between a linear expression and a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Ne,
    Le,
    Ge,
}

impl Relation {
    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Relation::Eq => lhs == rhs,
            Relation::Ne => lhs != rhs,
            Relation::Le => lhs <= rhs,
            Relation::Ge => lhs >= rhs,
        }
    }
}

/// `expr <relation> rhs`, only enforced when every literal holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConstraint {
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: i64,
    pub enforcement: Vec<Literal>,
}

impl LinearConstraint {
    pub fn is_enforced(&self, values: &[i64]) -> bool {
        self.enforcement
            .iter()
            .all(|lit| values[lit.var().index()] == lit.true_value())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Linear(LinearConstraint),
    /// `indicator <=> (var == value)`
    Indicator {
        indicator: BoolVar,
        var: IntVar,
        value: i64,
    },
    AllDifferent(Vec<IntVar>),
    /// `target == max(vars)`
    MaxEquality { target: IntVar, vars: Vec<IntVar> },
    /// `target == min(vars)`
    MinEquality { target: IntVar, vars: Vec<IntVar> },
}

impl Constraint {
    pub fn is_satisfied(&self, values: &[i64]) -> bool {
        let value = |v: &IntVar| values[v.index()];
        match self {
            Constraint::Linear(c) => {
                !c.is_enforced(values) || c.relation.holds(c.expr.evaluate(values), c.rhs)
            }
            Constraint::Indicator {
                indicator,
                var,
                value: expected,
            } => (value(var) == *expected) == (value(&indicator.var()) == 1),
            Constraint::AllDifferent(vars) => {
                let mut seen: Vec<i64> = vars.iter().map(value).collect();
                seen.sort_unstable();
                seen.windows(2).all(|w| w[0] != w[1])
            }
            Constraint::MaxEquality { target, vars } => {
                vars.iter().map(value).max() == Some(value(target))
            }
            Constraint::MinEquality { target, vars } => {
                vars.iter().map(value).min() == Some(value(target))
            }
        }
    }
}

/// Builder-returned handle for attaching enforcement literals.
pub struct LinearHandle<'a> {
    model: &'a mut CpModel,
    index: usize,
}

impl LinearHandle<'_> {
    /// Enforces the constraint only when all `literals` hold.
    pub fn only_enforce_if(self, literals: impl IntoIterator<Item = Literal>) {
        if let Some(Constraint::Linear(c)) = self.model.constraints.get_mut(self.index) {
            c.enforcement.extend(literals);
        }
    }
}

/// A finite-domain constraint model.
///
/// # Example
/// ```
/// use surgeon_call_scheduling::cp::{CpModel, Domain, LinearExpr, Relation};
///
/// let mut model = CpModel::new("example");
/// let x = model.new_int_var(Domain::from_values([1, 3, 5]), "x");
/// let is_three = model.new_indicator(x, 3, "x_is_3");
/// model.add_linear(x, Relation::Ne, 1).only_enforce_if([is_three.not()]);
/// model.minimize(LinearExpr::from(x));
/// assert_eq!(model.variable_count(), 2);
/// assert_eq!(model.constraint_count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CpModel {
    name: String,
    domains: Vec<Domain>,
    names: Vec<String>,
    constraints: Vec<Constraint>,
    objective: Option<LinearExpr>,
}

impl CpModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn new_int_var(&mut self, domain: Domain, name: impl Into<String>) -> IntVar {
        self.domains.push(domain);
        self.names.push(name.into());
        IntVar(self.domains.len() - 1)
    }

    pub fn new_constant(&mut self, value: i64, name: impl Into<String>) -> IntVar {
        self.new_int_var(Domain::interval(value, value), name)
    }

    pub fn new_bool_var(&mut self, name: impl Into<String>) -> BoolVar {
        BoolVar(self.new_int_var(Domain::boolean(), name))
    }

    /// Boolean `b` with `b <=> (var == value)`.
    pub fn new_indicator(&mut self, var: IntVar, value: i64, name: impl Into<String>) -> BoolVar {
        let indicator = self.new_bool_var(name);
        self.constraints.push(Constraint::Indicator {
            indicator,
            var,
            value,
        });
        indicator
    }

    pub fn add_linear(
        &mut self,
        expr: impl Into<LinearExpr>,
        relation: Relation,
        rhs: i64,
    ) -> LinearHandle<'_> {
        self.constraints.push(Constraint::Linear(LinearConstraint {
            expr: expr.into(),
            relation,
            rhs,
            enforcement: Vec::new(),
        }));
        let index = self.constraints.len() - 1;
        LinearHandle { model: self, index }
    }

    /// Posts `target == expr`.
    pub fn add_equality(&mut self, target: IntVar, expr: LinearExpr) {
        let rhs = -expr.offset();
        let mut lhs = LinearExpr::new();
        for (var, coef) in expr.terms() {
            lhs.add_term(*var, *coef);
        }
        lhs.add_term(target, -1);
        self.add_linear(lhs, Relation::Eq, rhs);
    }

    pub fn add_all_different(&mut self, vars: Vec<IntVar>) {
        self.constraints.push(Constraint::AllDifferent(vars));
    }

    pub fn add_max_equality(&mut self, target: IntVar, vars: Vec<IntVar>) {
        self.constraints.push(Constraint::MaxEquality { target, vars });
    }

    pub fn add_min_equality(&mut self, target: IntVar, vars: Vec<IntVar>) {
        self.constraints.push(Constraint::MinEquality { target, vars });
    }

    pub fn minimize(&mut self, objective: LinearExpr) {
        self.objective = Some(objective);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variable_count(&self) -> usize {
        self.domains.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Every declared variable, in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = IntVar> {
        (0..self.domains.len()).map(IntVar)
    }

    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    pub fn domain(&self, var: IntVar) -> &Domain {
        &self.domains[var.index()]
    }

    pub fn var_name(&self, var: IntVar) -> &str {
        &self.names[var.index()]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> Option<&LinearExpr> {
        self.objective.as_ref()
    }

    /// Checks a full assignment against domains and constraints.
    pub fn is_satisfied_by(&self, values: &[i64]) -> bool {
        values.len() == self.domains.len()
            && self
                .domains
                .iter()
                .zip(values)
                .all(|(domain, value)| domain.contains(*value))
            && self.constraints.iter().all(|c| c.is_satisfied(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_domain_is_sorted_and_deduplicated() {
        let d = Domain::from_values([5, 1, 3, 3, -1]);
        assert_eq!(d, Domain::Values(vec![-1, 1, 3, 5]));
        assert_eq!((d.min(), d.max(), d.size()), (-1, 5, 4));
        assert_eq!(d.explicit_values(), Some(&[-1, 1, 3, 5][..]));
        assert!(d.contains(3));
        assert!(!d.contains(2));
        assert!(!d.is_fixed());
    }

    #[test]
    fn test_interval_domain() {
        let d = Domain::interval(2, 2);
        assert_eq!(d.fixed_value(), Some(2));
        assert_eq!(d.explicit_values(), None);
        assert!(Domain::interval(3, 1).is_empty());
        assert_eq!(Domain::boolean().size(), 2);
    }

    #[test]
    fn test_linear_expr_evaluation() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(Domain::interval(0, 10), "x");
        let y = model.new_int_var(Domain::interval(0, 10), "y");
        let expr = LinearExpr::new().term(x, 3).term(y, -2).plus(4);
        assert_eq!(expr.evaluate(&[2, 5]), 0);
        assert_eq!(LinearExpr::sum([x, y]).evaluate(&[2, 5]), 7);
    }

    #[test]
    fn test_indicator_semantics() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(Domain::from_values([1, 2]), "x");
        let b = model.new_indicator(x, 2, "b");
        assert!(model.is_satisfied_by(&[2, 1]));
        assert!(model.is_satisfied_by(&[1, 0]));
        assert!(!model.is_satisfied_by(&[2, 0]));
        assert!(!model.is_satisfied_by(&[1, 1]));
        assert_eq!(b.var().index(), 1);
    }

    #[test]
    fn test_add_equality_and_aggregates() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(Domain::interval(0, 5), "x");
        let y = model.new_int_var(Domain::interval(0, 5), "y");
        let total = model.new_int_var(Domain::interval(0, 10), "total");
        let hi = model.new_int_var(Domain::interval(0, 5), "hi");
        let lo = model.new_int_var(Domain::interval(0, 5), "lo");
        model.add_equality(total, LinearExpr::sum([x, y]).plus(1));
        model.add_max_equality(hi, vec![x, y]);
        model.add_min_equality(lo, vec![x, y]);
        assert!(model.is_satisfied_by(&[1, 4, 6, 4, 1]));
        assert!(!model.is_satisfied_by(&[1, 4, 5, 4, 1]));
        assert!(!model.is_satisfied_by(&[1, 4, 6, 1, 1]));
    }

    #[test]
    fn test_all_different_check() {
        let mut model = CpModel::new("t");
        let vars: Vec<IntVar> = (0..3)
            .map(|i| model.new_int_var(Domain::interval(0, 3), format!("v{}", i)))
            .collect();
        model.add_all_different(vars);
        assert!(model.is_satisfied_by(&[0, 1, 2]));
        assert!(!model.is_satisfied_by(&[0, 2, 0]));
    }

    #[test]
    fn test_out_of_domain_assignment_is_rejected() {
        let mut model = CpModel::new("t");
        model.new_int_var(Domain::from_values([1, 3]), "x");
        assert!(!model.is_satisfied_by(&[2]));
        assert!(!model.is_satisfied_by(&[]));
    }
}
