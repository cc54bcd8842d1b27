use good_lp::{variable, ProblemVariables, Solution, Variable, VariableDefinition};

/// The domain of a decision variable. Every variable in the planning models is non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Binary,
    Integer,
    Continuous,
}

impl VarType {
    fn definition(self, name: String) -> VariableDefinition {
        let def = match self {
            VarType::Binary => variable().binary(),
            VarType::Integer => variable().integer().min(0),
            VarType::Continuous => variable().min(0),
        };
        def.name(name)
    }
}

pub trait AddVars {
    type Out;

    /// Create a variable for any type
    fn vars(&self, problem: &mut ProblemVariables, base_name: &str, vtype: VarType) -> Self::Out;

    /// Binary variables
    fn binary(&self, problem: &mut ProblemVariables, base_name: &str) -> Self::Out {
        self.vars(problem, base_name, VarType::Binary)
    }

    /// Non-negative integer variables
    fn integer(&self, problem: &mut ProblemVariables, base_name: &str) -> Self::Out {
        self.vars(problem, base_name, VarType::Integer)
    }

    /// A continuous non-negative variable
    fn cont(&self, problem: &mut ProblemVariables, base_name: &str) -> Self::Out {
        self.vars(problem, base_name, VarType::Continuous)
    }
}

impl AddVars for () {
    type Out = Variable;

    fn vars(&self, problem: &mut ProblemVariables, base_name: &str, vtype: VarType) -> Self::Out {
        problem.add(vtype.definition(base_name.to_string()))
    }
}

impl AddVars for usize {
    type Out = Vec<Variable>;

    fn vars(&self, problem: &mut ProblemVariables, base_name: &str, vtype: VarType) -> Self::Out {
        (0..*self)
            .map(|i| problem.add(vtype.definition(format!("{}_{}", base_name, i))))
            .collect()
    }
}

impl AddVars for (usize, usize) {
    type Out = Vec<<usize as AddVars>::Out>;

    fn vars(&self, problem: &mut ProblemVariables, base_name: &str, vtype: VarType) -> Self::Out {
        (0..self.0)
            .map(|i| self.1.vars(problem, &format!("{}_{}", base_name, i), vtype))
            .collect()
    }
}

/// Trait that converts solver variables to f64
pub trait ConvertVars {
    type Out;
    fn convert<S: Solution>(&self, solution: &S) -> Self::Out;
}

impl<T: ConvertVars> ConvertVars for Vec<T> {
    type Out = Vec<T::Out>;

    fn convert<S: Solution>(&self, solution: &S) -> Self::Out {
        self.iter().map(|e| e.convert(solution)).collect()
    }
}

impl ConvertVars for Variable {
    type Out = f64;

    fn convert<S: Solution>(&self, solution: &S) -> Self::Out {
        solution.value(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grids_have_the_requested_shape() {
        let mut problem = ProblemVariables::new();
        let x = (3usize, 4usize).integer(&mut problem, "x");
        let y = 2usize.binary(&mut problem, "y");
        let z = ().cont(&mut problem, "z");

        assert_eq!(x.len(), 3);
        assert!(x.iter().all(|row| row.len() == 4));
        assert_eq!(y.len(), 2);
        assert_ne!(x[0][0], z);
        assert_eq!(problem.len(), 3 * 4 + 2 + 1);
    }
}
