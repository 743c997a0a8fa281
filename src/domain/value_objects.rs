// Domain value objects representing core modelling concepts

use std::fmt;
use std::str::FromStr;

/// Domain of a decision variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
    /// Continuous non-negative real number (x ∈ ℝ, x ≥ 0)
    Continuous,
    /// Non-negative integer (x ∈ ℤ, x ≥ 0)
    Integer,
    /// Binary variable (x ∈ {0, 1})
    Binary,
}

impl VariableType {
    pub fn is_integral(self) -> bool {
        matches!(self, VariableType::Integer | VariableType::Binary)
    }
}

/// Relational operator of a linear constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    /// Less than or equal (≤)
    LessThanOrEqual,
    /// Equal (=)
    Equal,
    /// Greater than or equal (≥)
    GreaterThanOrEqual,
}

impl ConstraintType {
    /// Whether `lhs` satisfies the relation against `bound` within `tolerance`
    pub fn holds(self, lhs: f64, bound: f64, tolerance: f64) -> bool {
        match self {
            ConstraintType::LessThanOrEqual => lhs <= bound + tolerance,
            ConstraintType::Equal => (lhs - bound).abs() <= tolerance,
            ConstraintType::GreaterThanOrEqual => lhs >= bound - tolerance,
        }
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintType::LessThanOrEqual => write!(f, "<="),
            ConstraintType::Equal => write!(f, "="),
            ConstraintType::GreaterThanOrEqual => write!(f, ">="),
        }
    }
}

/// Direction of optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationType {
    /// Minimize the objective function
    Minimize,
    /// Maximize the objective function
    Maximize,
}

/// Terminal status of a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// Found optimal solution
    Optimal,
    /// Problem has no feasible solution
    Infeasible,
    /// Objective can be improved infinitely
    Unbounded,
    /// Backend failed (unavailable, licensing, numerical trouble, limits)
    Error,
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "Optimal"),
            SolutionStatus::Infeasible => write!(f, "Infeasible"),
            SolutionStatus::Unbounded => write!(f, "Unbounded"),
            SolutionStatus::Error => write!(f, "Error"),
        }
    }
}

/// Solver backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverBackend {
    /// Automatically select the best compiled-in solver
    Auto,
    /// Pure-Rust microlp engine through good_lp
    MicroLp,
    /// COIN-OR CBC solver through good_lp
    CoinCbc,
    /// HiGHS solver
    Highs,
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverBackend::Auto => write!(f, "Auto"),
            SolverBackend::MicroLp => write!(f, "microlp"),
            SolverBackend::CoinCbc => write!(f, "COIN-OR CBC"),
            SolverBackend::Highs => write!(f, "HiGHS"),
        }
    }
}

impl FromStr for SolverBackend {
    type Err = String;

    /// Parse a backend name (case-insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "" => Ok(SolverBackend::Auto),
            "microlp" => Ok(SolverBackend::MicroLp),
            "cbc" | "coin_cbc" | "coin-cbc" => Ok(SolverBackend::CoinCbc),
            "highs" => Ok(SolverBackend::Highs),
            other => Err(format!("unknown solver backend '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_backend_from_str() {
        assert_eq!("auto".parse::<SolverBackend>(), Ok(SolverBackend::Auto));
        assert_eq!("HiGHS".parse::<SolverBackend>(), Ok(SolverBackend::Highs));
        assert_eq!("cbc".parse::<SolverBackend>(), Ok(SolverBackend::CoinCbc));
        assert_eq!(" MicroLP ".parse::<SolverBackend>(), Ok(SolverBackend::MicroLp));
        assert!("gurobi".parse::<SolverBackend>().is_err());
    }

    #[test]
    fn test_constraint_type_holds_with_tolerance() {
        assert!(ConstraintType::LessThanOrEqual.holds(10.0 + 1e-9, 10.0, 1e-6));
        assert!(!ConstraintType::LessThanOrEqual.holds(10.1, 10.0, 1e-6));
        assert!(ConstraintType::GreaterThanOrEqual.holds(0.0, 0.0, 1e-6));
        assert!(ConstraintType::Equal.holds(99.9999999, 100.0, 1e-6));
        assert!(!ConstraintType::Equal.holds(99.0, 100.0, 1e-6));
    }
}
