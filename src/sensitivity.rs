//! Sensitivity analysis of the planning model.
//!
//! Every analysis varies a single parameter over a range of levels, re-solves the model
//! at each level and records profit, revenue, cost and the total production of each
//! final product. The base parameters are never modified: each level solves a fresh
//! copy with the perturbation applied.

use std::{fs::File, io::BufWriter, path::Path};

use derive_more::Display;
use float_ord::FloatOrd;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    config::{Levels, SweepConfig},
    models::planning::{
        Backend, FinalIndex, Override, Parameters, PlanningModel, PlanningResult, RawIndex, Sets,
        SolveError, Tier,
    },
    problem::Problem,
};

#[derive(Debug, Display)]
pub enum SweepError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Csv(csv::Error),
}

impl std::error::Error for SweepError {}

impl From<std::io::Error> for SweepError {
    fn from(err: std::io::Error) -> Self {
        SweepError::Io(err)
    }
}

impl From<serde_json::Error> for SweepError {
    fn from(err: serde_json::Error) -> Self {
        SweepError::Json(err)
    }
}

impl From<csv::Error> for SweepError {
    fn from(err: csv::Error) -> Self {
        SweepError::Csv(err)
    }
}

/// Solve the model for `base` with `overrides` applied, without touching `base`.
pub fn solve_with_override<B: Backend>(
    backend: &B,
    sets: &Sets,
    base: &Parameters,
    overrides: &[Override],
) -> Result<PlanningResult, SolveError> {
    let parameters = base.with_overrides(overrides);
    backend.solve(PlanningModel::build(sets, &parameters))
}

/// The parameter varied by an analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Perturbation {
    /// Demand of a final product, in percent of the base demand
    Demand(FinalIndex),
    /// Price of a raw material, in percent of the base price
    RawPrice(RawIndex),
    /// Market price of a final product, in percent of the base price
    FinalPrice(FinalIndex),
    LotSize,
    InventoryCost(Tier),
    SellBuyRatio,
}

impl Perturbation {
    /// Every analysis for the given sets, in the order they are run
    pub fn all(sets: &Sets) -> Vec<Perturbation> {
        let mut all = Vec::new();
        all.extend(sets.I.iter().map(|&i| Perturbation::Demand(i)));
        all.extend(sets.K.iter().map(|&k| Perturbation::RawPrice(k)));
        all.extend(sets.I.iter().map(|&i| Perturbation::FinalPrice(i)));
        all.push(Perturbation::LotSize);
        all.push(Perturbation::InventoryCost(Tier::Raw));
        all.push(Perturbation::InventoryCost(Tier::Semi));
        all.push(Perturbation::InventoryCost(Tier::Final));
        all.push(Perturbation::SellBuyRatio);
        all
    }

    /// Name of the analysis, also used as the file name of its output
    pub fn name(&self, problem: &Problem) -> String {
        match self {
            Perturbation::Demand(i) => format!("Demands SA - {}", problem.finals()[**i]),
            Perturbation::RawPrice(k) => {
                format!("Market Price for Raw Materials SA - {}", problem.raws()[**k])
            }
            Perturbation::FinalPrice(i) => {
                format!("Market Price for Final Products SA - {}", problem.finals()[**i])
            }
            Perturbation::LotSize => "Lot Size SA".to_string(),
            Perturbation::InventoryCost(Tier::Raw) => "ICR SA".to_string(),
            Perturbation::InventoryCost(Tier::Semi) => "ICS SA".to_string(),
            Perturbation::InventoryCost(Tier::Final) => "ICF SA".to_string(),
            Perturbation::SellBuyRatio => "SBR SA".to_string(),
        }
    }

    fn is_relative(&self) -> bool {
        matches!(
            self,
            Perturbation::Demand(_) | Perturbation::RawPrice(_) | Perturbation::FinalPrice(_)
        )
    }

    fn levels<'c>(&self, config: &'c SweepConfig) -> &'c Levels {
        match self {
            Perturbation::Demand(_) | Perturbation::RawPrice(_) | Perturbation::FinalPrice(_) => {
                &config.percent
            }
            Perturbation::LotSize => &config.lot_size,
            Perturbation::InventoryCost(_) => &config.inventory_cost,
            Perturbation::SellBuyRatio => &config.sell_buy_ratio,
        }
    }

    /// The override that realizes this perturbation at `level`
    pub fn at(&self, level: f64) -> Override {
        let factor = 1.0 + level / 100.0;
        match *self {
            Perturbation::Demand(product) => Override::Demand { product, factor },
            Perturbation::RawPrice(material) => Override::RawPrice { material, factor },
            Perturbation::FinalPrice(product) => Override::FinalPrice { product, factor },
            Perturbation::LotSize => Override::LotSize(level),
            Perturbation::InventoryCost(tier) => Override::InventoryCost { tier, rate: level },
            Perturbation::SellBuyRatio => Override::SellBuyRatio(level),
        }
    }

    fn label(&self, level: f64) -> String {
        let level = (level * 1e6).round() / 1e6;
        match self.is_relative() {
            true => format!("{level}%"),
            false => format!("{level}"),
        }
    }
}

/// What the optimal plan looked like at one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub profit: f64,
    pub revenue: f64,
    pub cost: f64,
    /// Total production over the horizon of every final product
    pub production: Vec<f64>,
}

impl Outcome {
    pub fn new(sets: &Sets, result: &PlanningResult) -> Outcome {
        Outcome {
            profit: result.profit(),
            revenue: result.TR,
            cost: result.TC,
            production: sets.I.iter().map(|&i| result.production(i)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub label: String,
    pub level: f64,
    /// `None` if the model could not be solved at this level
    pub outcome: Option<Outcome>,
}

/// The result of varying one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub name: String,
    /// Labels of the final products, in the order of `Outcome::production`
    pub products: Vec<String>,
    pub points: Vec<SweepPoint>,
}

impl Analysis {
    /// The solved point with the highest profit
    pub fn best(&self) -> Option<&SweepPoint> {
        self.points
            .iter()
            .filter(|p| p.outcome.is_some())
            .max_by_key(|p| FloatOrd(p.outcome.as_ref().map_or(f64::NEG_INFINITY, |o| o.profit)))
    }

    /// Number of levels where the solver failed
    pub fn failures(&self) -> usize {
        self.points.iter().filter(|p| p.outcome.is_none()).count()
    }

    /// Write `<name>.json` and `<name>.csv` into `dir`.
    ///
    /// The csv holds the data of both panels: production per product, then profit, revenue
    /// and cost. Failed levels have empty cells.
    pub fn write<P: AsRef<Path>>(&self, dir: P) -> Result<(), SweepError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let file = File::create(dir.join(format!("{}.json", self.name)))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;

        let mut writer = csv::Writer::from_path(dir.join(format!("{}.csv", self.name)))?;
        let mut header = vec!["level".to_string(), "label".to_string()];
        header.extend(self.products.iter().cloned());
        header.extend(["profit", "revenue", "cost"].map(String::from));
        writer.write_record(&header)?;

        for point in &self.points {
            let mut record = vec![point.level.to_string(), point.label.clone()];
            match &point.outcome {
                Some(o) => {
                    record.extend(o.production.iter().map(|v| v.to_string()));
                    record.extend([o.profit, o.revenue, o.cost].map(|v| v.to_string()));
                }
                None => record.extend(vec![String::new(); self.products.len() + 3]),
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Runs sensitivity analyses against fixed base parameters
pub struct Sweep<'a, B> {
    problem: &'a Problem,
    config: &'a SweepConfig,
    sets: Sets,
    base: Parameters,
    backend: B,
}

impl<'a, B: Backend> Sweep<'a, B> {
    pub fn new(problem: &'a Problem, config: &'a SweepConfig, backend: B) -> Self {
        Sweep {
            problem,
            config,
            sets: Sets::new(problem),
            base: Parameters::new(problem),
            backend,
        }
    }

    /// The parameters every analysis starts from
    pub fn base(&self) -> &Parameters {
        &self.base
    }

    /// Vary `perturbation` over its configured levels.
    /// A level where the solver fails is recorded without an outcome and the sweep goes on.
    pub fn run(&self, perturbation: Perturbation) -> Analysis {
        let name = perturbation.name(self.problem);
        let levels = perturbation.levels(self.config).values();
        info!("Running {} over {} levels", name, levels.len());

        let points = levels
            .into_iter()
            .map(|level| {
                let label = perturbation.label(level);
                let outcome = match solve_with_override(
                    &self.backend,
                    &self.sets,
                    &self.base,
                    &[perturbation.at(level)],
                ) {
                    Ok(result) => Some(Outcome::new(&self.sets, &result)),
                    Err(err) => {
                        warn!("{name}: no solution at {label}: {err}");
                        None
                    }
                };
                SweepPoint {
                    label,
                    level,
                    outcome,
                }
            })
            .collect();

        let analysis = Analysis {
            name,
            products: self.problem.finals().to_vec(),
            points,
        };

        if let Some(best) = analysis.best() {
            info!(
                "{}: best profit at {} ({} failed levels)",
                analysis.name,
                best.label,
                analysis.failures()
            );
        }
        analysis
    }

    /// Run every analysis, in the order of [`Perturbation::all`]
    pub fn run_all(&self) -> Vec<Analysis> {
        Perturbation::all(&self.sets)
            .into_iter()
            .map(|p| self.run(p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Scalars,
        models::planning::DefaultBackend,
        problem::tests::{ample, single_chain},
    };
    use std::cell::Cell;

    /// Fails every other solve
    struct Flaky {
        calls: Cell<usize>,
    }

    impl Backend for Flaky {
        fn solve(&self, model: PlanningModel) -> Result<PlanningResult, SolveError> {
            let n = self.calls.get();
            self.calls.set(n + 1);
            match n % 2 {
                1 => Err(SolveError::Infeasible),
                _ => DefaultBackend.solve(model),
            }
        }
    }

    fn small() -> SweepConfig {
        SweepConfig {
            percent: Levels::new(-50.0, 50.0, 50.0),
            lot_size: Levels::new(1.0, 1001.0, 1000.0),
            inventory_cost: Levels::new(1.0, 2.0, 1.0),
            sell_buy_ratio: Levels::new(0.25, 0.5, 0.25),
        }
    }

    #[test]
    fn demand_sweep_scales_production() {
        let problem = single_chain(&[10], ample());
        let config = small();
        let sweep = Sweep::new(&problem, &config, DefaultBackend);

        let analysis = sweep.run(Perturbation::Demand(FinalIndex::from(0)));
        assert_eq!(analysis.name, "Demands SA - a");
        assert_eq!(analysis.products, vec!["a".to_string()]);

        let labels = analysis.points.iter().map(|p| p.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["-50%", "0%", "50%"]);

        let production = analysis
            .points
            .iter()
            .map(|p| p.outcome.as_ref().unwrap().production[0])
            .collect::<Vec<_>>();
        for (got, want) in production.iter().zip([5.0, 10.0, 15.0]) {
            assert!((got - want).abs() < 1e-6, "{production:?}");
        }
        assert_eq!(analysis.best().unwrap().label, "50%");
    }

    #[test]
    fn failed_levels_are_recorded_and_skipped() {
        let problem = single_chain(&[10], ample());
        let config = small();
        let sweep = Sweep::new(
            &problem,
            &config,
            Flaky {
                calls: Cell::new(0),
            },
        );

        let analysis = sweep.run(Perturbation::Demand(FinalIndex::from(0)));
        assert_eq!(analysis.points.len(), 3);
        assert!(analysis.points[0].outcome.is_some());
        assert!(analysis.points[1].outcome.is_none());
        assert!(analysis.points[2].outcome.is_some());
        assert_eq!(analysis.failures(), 1);
        // nothing is carried over from the previous level
        let last = analysis.points[2].outcome.as_ref().unwrap();
        assert!((last.production[0] - 15.0).abs() < 1e-6);
    }

    #[test]
    fn base_parameters_survive_a_full_sweep() {
        let problem = single_chain(&[10], ample());
        let config = small();
        let sweep = Sweep::new(&problem, &config, DefaultBackend);
        let before = sweep.base().clone();

        let analyses = sweep.run_all();
        let names = analyses.iter().map(|a| a.name.as_str()).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "Demands SA - a",
                "Market Price for Raw Materials SA - r",
                "Market Price for Final Products SA - a",
                "Lot Size SA",
                "ICR SA",
                "ICS SA",
                "ICF SA",
                "SBR SA",
            ]
        );
        assert!(analyses.iter().all(|a| a.failures() == 0));
        assert_eq!(sweep.base(), &before);
        assert_eq!(sweep.base(), &Parameters::new(&problem));
    }

    #[test]
    fn solving_with_an_override_matches_solving_the_changed_problem() {
        let problem = single_chain(&[1500], ample());
        let sets = Sets::new(&problem);
        let base = Parameters::new(&problem);

        let overridden =
            solve_with_override(&DefaultBackend, &sets, &base, &[Override::LotSize(1000.0)])
                .unwrap();

        let changed = single_chain(
            &[1500],
            Scalars {
                lot_size: 1000.0,
                ..ample()
            },
        );
        let direct = PlanningModel::build(&sets, &Parameters::new(&changed))
            .solve()
            .unwrap();

        assert!((overridden.objective - direct.objective).abs() < 1e-6);
        assert!((overridden.KSR[0][0] - 2.0).abs() < 1e-6);
        assert_eq!(base.LSR, 1.0);
    }

    #[test]
    fn writes_json_and_csv() {
        let analysis = Analysis {
            name: "ICR SA".to_string(),
            products: vec!["a".to_string(), "b".to_string()],
            points: vec![
                SweepPoint {
                    label: "1".to_string(),
                    level: 1.0,
                    outcome: Some(Outcome {
                        profit: 10.0,
                        revenue: 30.0,
                        cost: 20.0,
                        production: vec![4.0, 6.0],
                    }),
                },
                SweepPoint {
                    label: "2".to_string(),
                    level: 2.0,
                    outcome: None,
                },
            ],
        };

        let dir = tempfile::tempdir().unwrap();
        analysis.write(dir.path()).unwrap();

        let json = std::fs::read_to_string(dir.path().join("ICR SA.json")).unwrap();
        let back: Analysis = serde_json::from_str(&json).unwrap();
        assert_eq!(back, analysis);

        let csv = std::fs::read_to_string(dir.path().join("ICR SA.csv")).unwrap();
        let lines = csv.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "level,label,a,b,profit,revenue,cost");
        assert_eq!(lines[1], "1,1,4,6,10,30,20");
        assert_eq!(lines[2], "2,2,,,,,");
    }
}
