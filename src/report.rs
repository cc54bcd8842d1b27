use std::fmt::{self, Display};

use crate::{models::planning::PlanningResult, problem::Problem};

/// Text report of an optimal production plan, one LaTeX style table per decision
pub struct Report<'a> {
    problem: &'a Problem,
    result: &'a PlanningResult,
}

impl<'a> Report<'a> {
    pub fn new(problem: &'a Problem, result: &'a PlanningResult) -> Self {
        Report { problem, result }
    }

    /// The reported matrices as (name, row labels, values)
    fn sections(&self) -> [(&'static str, &'a [String], &'a [Vec<f64>]); 8] {
        let (p, r) = (self.problem, self.result);
        [
            ("PF", p.finals(), &r.PF),
            ("IF", p.finals(), &r.IF),
            ("PS", p.semis(), &r.PS),
            ("IS", p.semis(), &r.IS),
            ("SR", p.raws(), &r.SR),
            ("IR", p.raws(), &r.IR),
            ("OSC", p.semis(), &r.OSC),
            ("SSC", p.semis(), &r.SSC),
        ]
    }
}

impl Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.result.objective)?;
        for (name, labels, values) in self.sections() {
            writeln!(f, "------------------------{name}--------------------")?;
            for (label, row) in labels.iter().zip(values) {
                write!(f, "{label}")?;
                for value in row {
                    write!(f, " & {}", value.round() as i64)?;
                }
                writeln!(f, " \\\\")?;
            }
        }
        Ok(())
    }
}
