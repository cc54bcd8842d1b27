pub mod model;
pub mod sets_and_parameters;

pub use model::{Backend, DefaultBackend, PlanningModel, PlanningResult, SolveError};
pub use sets_and_parameters::{
    FinalIndex, Override, Parameters, PeriodIndex, RawIndex, SemiIndex, Sets, Tier,
};
