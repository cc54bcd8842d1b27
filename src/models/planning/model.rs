use super::sets_and_parameters::{FinalIndex, Parameters, Sets};
use crate::models::utils::{AddVars, ConvertVars};
use derive_more::Display;
use good_lp::{
    constraint, default_solver, Constraint, Expression, IntoAffineExpression, ProblemVariables,
    ResolutionError, Solution, SolverModel, Variable,
};
use itertools::iproduct;
use log::{debug, info, trace};
use serde::Serialize;

#[derive(Debug, Display, Clone, PartialEq)]
pub enum SolveError {
    #[display(fmt = "the planning model is infeasible")]
    Infeasible,
    #[display(fmt = "the planning model is unbounded")]
    Unbounded,
    #[display(fmt = "solver failure: {}", _0)]
    Solver(String),
}

impl std::error::Error for SolveError {}

impl From<ResolutionError> for SolveError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Infeasible => SolveError::Infeasible,
            ResolutionError::Unbounded => SolveError::Unbounded,
            other => SolveError::Solver(other.to_string()),
        }
    }
}

/// Decision variables of the planning model, indexed `[entity][period]`
#[allow(non_snake_case)]
pub struct Variables {
    /// inventory of raw materials at the end of the period
    pub IR: Vec<Vec<Variable>>,
    /// inventory of semi products at the end of the period
    pub IS: Vec<Vec<Variable>>,
    /// inventory of final products at the end of the period
    pub IF: Vec<Vec<Variable>>,
    /// unmet demand of final products
    pub BF: Vec<Vec<Variable>>,
    /// raw material purchases
    pub SR: Vec<Vec<Variable>>,
    /// number of lots purchased, SR = LSR * KSR
    pub KSR: Vec<Vec<Variable>>,
    /// production of semi products
    pub PS: Vec<Vec<Variable>>,
    /// production of final products
    pub PF: Vec<Vec<Variable>>,
    /// 1 if final product i is set up in period t
    pub PFS: Vec<Vec<Variable>>,
    /// 1 if semi product j is set up in period t
    pub PSS: Vec<Vec<Variable>>,
    /// semi products sold to the subcontractor
    pub SSC: Vec<Vec<Variable>>,
    /// semi products bought from the subcontractor
    pub OSC: Vec<Vec<Variable>>,

    pub CIR: Variable,
    pub CIS: Variable,
    pub CIF: Variable,
    pub CSR: Variable,
    pub CPS: Variable,
    pub CPF: Variable,
    /// total revenue
    pub TR: Variable,
    /// total cost
    pub TC: Variable,
}

/// A fully built planning model that has not been handed to a solver yet.
pub struct PlanningModel {
    problem: ProblemVariables,
    constraints: Vec<(String, Constraint)>,
    objective: Expression,
    vars: Variables,
}

#[allow(non_snake_case)]
impl PlanningModel {
    /// Builds the multi-echelon lot sizing model
    pub fn build(sets: &Sets, parameters: &Parameters) -> PlanningModel {
        info!(
            "Building planning model with {} periods, {} final products, {} semi products and {} raw materials",
            sets.T.len(),
            sets.I.len(),
            sets.J.len(),
            sets.K.len()
        );

        let mut problem = ProblemVariables::new();
        let mut constraints: Vec<(String, Constraint)> = Vec::new();

        // assign som variables to save some space later
        let T = &sets.T;
        let I = &sets.I;
        let J = &sets.J;
        let K = &sets.K;
        let p = parameters;

        //*************CREATE VARIABLES*************//

        let IR = (K.len(), T.len()).integer(&mut problem, "IR");
        let IS = (J.len(), T.len()).integer(&mut problem, "IS");
        let IF = (I.len(), T.len()).integer(&mut problem, "IF");
        let BF = (I.len(), T.len()).integer(&mut problem, "BF");

        let SR = (K.len(), T.len()).integer(&mut problem, "SR");
        let KSR = (K.len(), T.len()).integer(&mut problem, "KSR");
        let PS = (J.len(), T.len()).integer(&mut problem, "PS");
        let PF = (I.len(), T.len()).integer(&mut problem, "PF");

        let PFS = (I.len(), T.len()).binary(&mut problem, "PFS");
        let PSS = (J.len(), T.len()).binary(&mut problem, "PSS");

        let SSC = (J.len(), T.len()).integer(&mut problem, "SSC");
        let OSC = (J.len(), T.len()).integer(&mut problem, "OSC");

        let CIR = ().cont(&mut problem, "CIR");
        let CIS = ().cont(&mut problem, "CIS");
        let CIF = ().cont(&mut problem, "CIF");
        let CSR = ().cont(&mut problem, "CSR");
        let CPS = ().cont(&mut problem, "CPS");
        let CPF = ().cont(&mut problem, "CPF");
        let TR = ().cont(&mut problem, "TR");
        let TC = ().cont(&mut problem, "TC");

        let mut add = |name: String, c: Constraint| {
            trace!("adding {name}");
            constraints.push((name, c));
        };

        // ******************** REVENUE AND TOTAL COST ********************

        let lhs = TC.into_expression();
        let rhs = CIR + CIS + CIF + CSR + CPS + CPF;
        add("total_cost".into(), constraint!(lhs == rhs));

        // realized demand is sold at the market price, subcontracted semi products at a ratio of theirs
        let final_sales = iproduct!(I, T)
            .map(|(i, t)| (-p.MPF[*i][*t]) * BF[**i][**t] + p.MPF[*i][*t] * p.D[*i][*t])
            .sum::<Expression>();
        let semi_sales = iproduct!(J, T)
            .map(|(j, t)| (p.SBR * p.MPS[*j][*t]) * SSC[**j][**t])
            .sum::<Expression>();
        let lhs = TR.into_expression();
        add("total_revenue".into(), constraint!(lhs == final_sales + semi_sales));

        // ******************** CAPACITIES ********************

        for t in T {
            let lhs = I.iter().map(|i| PF[**i][**t]).sum::<Expression>();
            let rhs = p.PFCap.into_expression();
            add(format!("final_production_cap_{}", **t), constraint!(lhs <= rhs));

            let lhs = J.iter().map(|j| PS[**j][**t]).sum::<Expression>();
            let rhs = p.PSCap.into_expression();
            add(format!("semi_production_cap_{}", **t), constraint!(lhs <= rhs));

            let lhs = I.iter().map(|i| IF[**i][**t]).sum::<Expression>();
            let rhs = p.IFCap.into_expression();
            add(format!("final_inventory_cap_{}", **t), constraint!(lhs <= rhs));

            let lhs = J.iter().map(|j| IS[**j][**t]).sum::<Expression>();
            let rhs = p.ISCap.into_expression();
            add(format!("semi_inventory_cap_{}", **t), constraint!(lhs <= rhs));

            let lhs = K.iter().map(|k| IR[**k][**t]).sum::<Expression>();
            let rhs = p.IRCap.into_expression();
            add(format!("raw_inventory_cap_{}", **t), constraint!(lhs <= rhs));
        }

        // ******************** SETUPS AND BALANCES ********************

        let (M_final, M_semi) = (p.M_final(), p.M_semi());
        debug!("big-M: final {M_final}, semi {M_semi}");

        for t in T {
            let prev = sets.previous(*t);

            let lhs = I.iter().map(|i| PFS[**i][**t]).sum::<Expression>();
            let rhs = p.PFSL.into_expression();
            add(format!("final_setup_limit_{}", **t), constraint!(lhs <= rhs));

            let lhs = J.iter().map(|j| PSS[**j][**t]).sum::<Expression>();
            let rhs = p.PSSL.into_expression();
            add(format!("semi_setup_limit_{}", **t), constraint!(lhs <= rhs));

            for i in I {
                // no production without a setup
                let lhs = PF[**i][**t].into_expression();
                let rhs = M_final * PFS[**i][**t];
                add(format!("final_setup_{}_{}", **i, **t), constraint!(lhs <= rhs));

                // only demand of this period can go unmet
                let lhs = BF[**i][**t].into_expression();
                let rhs = p.D[*i][*t].into_expression();
                add(format!("final_backlog_{}_{}", **i, **t), constraint!(lhs <= rhs));

                // inventory carried in + production - inventory carried out + backlog = demand
                let mut lhs = PF[**i][**t] - IF[**i][**t] + BF[**i][**t];
                if let Some(prev) = prev {
                    lhs = lhs + IF[**i][*prev];
                }
                let rhs = p.D[*i][*t].into_expression();
                add(format!("final_balance_{}_{}", **i, **t), constraint!(lhs == rhs));
            }

            for j in J {
                let lhs = PS[**j][**t].into_expression();
                let rhs = M_semi * PSS[**j][**t];
                add(format!("semi_setup_{}_{}", **j, **t), constraint!(lhs <= rhs));

                // consumption by final production is covered by stock, production and the subcontractor
                let lhs = I
                    .iter()
                    .map(|i| p.BOMF[*i][*j] * PF[**i][**t])
                    .sum::<Expression>();
                let mut rhs = PS[**j][**t] - IS[**j][**t] + OSC[**j][**t] - SSC[**j][**t];
                if let Some(prev) = prev {
                    rhs = rhs + IS[**j][*prev];
                }
                add(format!("semi_balance_{}_{}", **j, **t), constraint!(lhs == rhs));
            }

            for k in K {
                // raw materials are bought in whole lots
                let lhs = SR[**k][**t].into_expression();
                let rhs = p.LSR * KSR[**k][**t];
                add(format!("lot_size_{}_{}", **k, **t), constraint!(lhs == rhs));

                let lhs = J
                    .iter()
                    .map(|j| p.BOMS[*j][*k] * PS[**j][**t])
                    .sum::<Expression>();
                let mut rhs = SR[**k][**t] - IR[**k][**t];
                if let Some(prev) = prev {
                    rhs = rhs + IR[**k][*prev];
                }
                add(format!("raw_balance_{}_{}", **k, **t), constraint!(lhs == rhs));
            }
        }

        // ******************** COSTS ********************

        let rhs = iproduct!(K, T)
            .map(|(k, t)| p.ICR * IR[**k][**t])
            .sum::<Expression>();
        add("raw_inventory_cost".into(), constraint!(CIR.into_expression() == rhs));

        let rhs = iproduct!(J, T)
            .map(|(j, t)| p.ICS * IS[**j][**t])
            .sum::<Expression>();
        add("semi_inventory_cost".into(), constraint!(CIS.into_expression() == rhs));

        let rhs = iproduct!(I, T)
            .map(|(i, t)| p.ICF * IF[**i][**t])
            .sum::<Expression>();
        add("final_inventory_cost".into(), constraint!(CIF.into_expression() == rhs));

        let rhs = iproduct!(K, T)
            .map(|(k, t)| p.PR[*k][*t] * SR[**k][**t])
            .sum::<Expression>();
        add("raw_supply_cost".into(), constraint!(CSR.into_expression() == rhs));

        let rhs = iproduct!(J, T)
            .map(|(j, t)| {
                let (jj, tt) = (**j, **t);
                p.PVCS * PS[jj][tt] + p.SCPS * PSS[jj][tt] + p.MPS[*j][*t] * OSC[jj][tt]
            })
            .sum::<Expression>();
        add("semi_production_cost".into(), constraint!(CPS.into_expression() == rhs));

        let rhs = iproduct!(I, T)
            .map(|(i, t)| p.PVCF * PF[**i][**t] + p.SCPF * PFS[**i][**t])
            .sum::<Expression>();
        add("final_production_cost".into(), constraint!(CPF.into_expression() == rhs));

        // ******************** OBJECTIVE ********************
        let objective = TR - TC;

        info!(
            "Successfully built planning model with {} variables and {} constraints",
            problem.len(),
            constraints.len()
        );

        PlanningModel {
            problem,
            constraints,
            objective,
            vars: Variables {
                IR,
                IS,
                IF,
                BF,
                SR,
                KSR,
                PS,
                PF,
                PFS,
                PSS,
                SSC,
                OSC,
                CIR,
                CIS,
                CIF,
                CSR,
                CPS,
                CPF,
                TR,
                TC,
            },
        }
    }

    /// Names of the constraints, in the order they were added
    pub fn constraint_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.constraints.iter().map(|(name, _)| name.as_str())
    }

    /// The number of constraints in the model
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn variables(&self) -> &Variables {
        &self.vars
    }

    /// Solve with the default solver
    pub fn solve(self) -> Result<PlanningResult, SolveError> {
        DefaultBackend.solve(self)
    }
}

/// Something that is able to solve a planning model
pub trait Backend {
    fn solve(&self, model: PlanningModel) -> Result<PlanningResult, SolveError>;
}

/// The MILP solver bundled with `good_lp`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBackend;

impl Backend for DefaultBackend {
    fn solve(&self, model: PlanningModel) -> Result<PlanningResult, SolveError> {
        let PlanningModel {
            problem,
            constraints,
            objective,
            vars,
        } = model;

        let mut solver = problem.maximise(objective).using(default_solver);
        for (_, c) in constraints {
            solver.add_constraint(c);
        }

        let solution = solver.solve()?;
        let result = PlanningResult::new(&vars, &solution);
        debug!("Solved planning model, objective = {}", result.objective);
        Ok(result)
    }
}

/// Optimal values of every decision variable, indexed `[entity][period]`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[allow(non_snake_case)]
pub struct PlanningResult {
    pub objective: f64,
    pub IR: Vec<Vec<f64>>,
    pub IS: Vec<Vec<f64>>,
    pub IF: Vec<Vec<f64>>,
    pub BF: Vec<Vec<f64>>,
    pub SR: Vec<Vec<f64>>,
    pub KSR: Vec<Vec<f64>>,
    pub PS: Vec<Vec<f64>>,
    pub PF: Vec<Vec<f64>>,
    pub PFS: Vec<Vec<f64>>,
    pub PSS: Vec<Vec<f64>>,
    pub SSC: Vec<Vec<f64>>,
    pub OSC: Vec<Vec<f64>>,
    pub CIR: f64,
    pub CIS: f64,
    pub CIF: f64,
    pub CSR: f64,
    pub CPS: f64,
    pub CPF: f64,
    pub TR: f64,
    pub TC: f64,
}

#[allow(non_snake_case)]
impl PlanningResult {
    pub fn new<S: Solution>(variables: &Variables, solution: &S) -> PlanningResult {
        let TR = variables.TR.convert(solution);
        let TC = variables.TC.convert(solution);

        PlanningResult {
            objective: TR - TC,
            IR: variables.IR.convert(solution),
            IS: variables.IS.convert(solution),
            IF: variables.IF.convert(solution),
            BF: variables.BF.convert(solution),
            SR: variables.SR.convert(solution),
            KSR: variables.KSR.convert(solution),
            PS: variables.PS.convert(solution),
            PF: variables.PF.convert(solution),
            PFS: variables.PFS.convert(solution),
            PSS: variables.PSS.convert(solution),
            SSC: variables.SSC.convert(solution),
            OSC: variables.OSC.convert(solution),
            CIR: variables.CIR.convert(solution),
            CIS: variables.CIS.convert(solution),
            CIF: variables.CIF.convert(solution),
            CSR: variables.CSR.convert(solution),
            CPS: variables.CPS.convert(solution),
            CPF: variables.CPF.convert(solution),
            TR,
            TC,
        }
    }

    /// Total revenue minus total cost
    pub fn profit(&self) -> f64 {
        self.TR - self.TC
    }

    /// Total production of final product `i` over the horizon
    pub fn production(&self, i: FinalIndex) -> f64 {
        self.PF[*i].iter().sum()
    }
}
